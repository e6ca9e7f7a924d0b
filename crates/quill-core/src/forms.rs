//! Form submissions, field-level errors and the validators shared by services.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
pub const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";
pub const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

/// Key used for errors that do not belong to a single field.
pub const NON_FIELD: &str = "__all__";

/// Field name to messages, serialized as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }
}

/// Result of handling a form: either it was persisted, or it must be shown
/// again with errors.
#[derive(Debug)]
pub enum FormOutcome<T> {
    Saved(T),
    Invalid(FormErrors),
}

impl<T> FormOutcome<T> {
    pub fn is_saved(&self) -> bool {
        matches!(self, FormOutcome::Saved(_))
    }
}

/// An uploaded file as received from a multipart body.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Raw post form: `text`, `group` (id or blank) and an optional image.
#[derive(Debug, Clone, Default)]
pub struct PostSubmission {
    pub text: Option<String>,
    pub group: Option<String>,
    pub image: Option<Upload>,
}

/// Values echoed back to the form on re-render.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PostFormValues {
    pub text: String,
    pub group: Option<i32>,
    pub image: Option<String>,
}

impl PostSubmission {
    pub fn values(&self) -> PostFormValues {
        PostFormValues {
            text: self.text.clone().unwrap_or_default(),
            group: self
                .group
                .as_deref()
                .and_then(|raw| raw.trim().parse().ok()),
            image: self.image.as_ref().map(|upload| upload.filename.clone()),
        }
    }
}

/// Raw comment form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentSubmission {
    #[serde(default)]
    pub text: String,
}

/// Raw group form used by operator tooling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupSubmission {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

/// Raw signup form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignupSubmission {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Trimmed, non-empty text or `None`.
pub fn required_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// A choice field value that is not an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidChoice;

/// Parse a `group` choice: blank means no group, anything else must be an id.
pub fn parse_choice(value: Option<&str>) -> Result<Option<i32>, InvalidChoice> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|_| InvalidChoice),
    }
}

pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}

pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.chars().count() <= 150
        && username
            .chars()
            .all(|ch| ch.is_alphanumeric() || matches!(ch, '@' | '.' | '+' | '-' | '_'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text_trims() {
        assert_eq!(required_text(Some("  hi ")), Some("hi".to_string()));
        assert_eq!(required_text(Some("   ")), None);
        assert_eq!(required_text(None), None);
    }

    #[test]
    fn test_parse_choice() {
        assert_eq!(parse_choice(None), Ok(None));
        assert_eq!(parse_choice(Some(" ")), Ok(None));
        assert_eq!(parse_choice(Some("7")), Ok(Some(7)));
        assert!(parse_choice(Some("seven")).is_err());
    }

    #[test]
    fn test_slug_and_username_rules() {
        assert!(is_valid_slug("cats_and-dogs2"));
        assert!(!is_valid_slug("cats and dogs"));
        assert!(!is_valid_slug(""));

        assert!(is_valid_username("tester"));
        assert!(is_valid_username("тестер.2"));
        assert!(!is_valid_username("bad name"));
        assert!(!is_valid_username(&"a".repeat(151)));
    }

    #[test]
    fn test_form_errors_collect_per_field() {
        let mut errors = FormErrors::new();
        errors.add("text", REQUIRED);
        errors.add("text", "second");
        assert_eq!(errors.field("text").len(), 2);
        assert!(errors.field("image").is_empty());
        assert!(!errors.is_empty());
    }
}
