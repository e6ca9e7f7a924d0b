//! Group seeding for operator tooling.

use crate::domain::{Group, NewGroup};
use crate::error::{DomainError, RepoError};
use crate::forms::{self, FormErrors, FormOutcome, GroupSubmission, REQUIRED};

use super::Repositories;

const TITLE_MAX: usize = 200;
const SLUG_MAX: usize = 40;

#[derive(Clone)]
pub struct GroupService {
    repos: Repositories,
}

impl GroupService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn create(&self, submission: &GroupSubmission) -> Result<FormOutcome<Group>, DomainError> {
        let mut errors = FormErrors::new();

        let title = forms::required_text(Some(&submission.title));
        match &title {
            None => errors.add("title", REQUIRED),
            Some(title) if title.chars().count() > TITLE_MAX => errors.add(
                "title",
                format!("Ensure this value has at most {TITLE_MAX} characters."),
            ),
            Some(_) => {}
        }

        let slug = forms::required_text(Some(&submission.slug));
        match &slug {
            None => errors.add("slug", REQUIRED),
            Some(slug) if slug.len() > SLUG_MAX => errors.add(
                "slug",
                format!("Ensure this value has at most {SLUG_MAX} characters."),
            ),
            Some(slug) if !forms::is_valid_slug(slug) => errors.add(
                "slug",
                "Enter a valid slug consisting of letters, numbers, underscores or hyphens.",
            ),
            Some(_) => {}
        }

        let (Some(title), Some(slug)) = (title, slug) else {
            return Ok(FormOutcome::Invalid(errors));
        };
        if !errors.is_empty() {
            return Ok(FormOutcome::Invalid(errors));
        }

        let created = self
            .repos
            .groups
            .create(NewGroup {
                title,
                slug,
                description: submission.description.trim().to_string(),
            })
            .await;

        match created {
            Ok(group) => {
                tracing::info!(group_id = group.id, slug = %group.slug, "Group created");
                Ok(FormOutcome::Saved(group))
            }
            Err(RepoError::Constraint(_)) => Ok(FormOutcome::Invalid(FormErrors::single(
                "slug",
                "Group with this title or slug already exists.",
            ))),
            Err(e) => Err(e.into()),
        }
    }
}
