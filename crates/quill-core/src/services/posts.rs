//! Post creation and editing.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{Group, NewPost, Post};
use crate::error::DomainError;
use crate::forms::{
    self, FormErrors, FormOutcome, INVALID_CHOICE, INVALID_IMAGE, PostSubmission, REQUIRED,
};
use crate::ports::{ImageProbe, MediaStorage};

use super::Repositories;

/// Directory under the media root that post images are written to.
pub const IMAGE_DIR: &str = "posts";

/// Result of an edit attempt.
#[derive(Debug)]
pub enum EditOutcome {
    Saved(Post),
    Invalid(FormErrors),
    /// The actor does not own the post; nothing was written.
    NotAuthor,
}

/// A submission that passed validation. The image is not stored yet.
struct CleanPost<'a> {
    text: String,
    group_id: Option<i32>,
    image: Option<(&'a [u8], &'static str)>,
}

#[derive(Clone)]
pub struct PostService {
    repos: Repositories,
    media: Arc<dyn MediaStorage>,
    probe: Arc<dyn ImageProbe>,
}

impl PostService {
    pub fn new(
        repos: Repositories,
        media: Arc<dyn MediaStorage>,
        probe: Arc<dyn ImageProbe>,
    ) -> Self {
        Self {
            repos,
            media,
            probe,
        }
    }

    /// Groups offered by the post form.
    pub async fn group_choices(&self) -> Result<Vec<Group>, DomainError> {
        Ok(self.repos.groups.list().await?)
    }

    /// The post `post_id` if it was written by `username`.
    pub async fn find_for_author(&self, username: &str, post_id: i64) -> Result<Post, DomainError> {
        let (_, post) = self.repos.author_post(username, post_id).await?;
        Ok(post)
    }

    pub async fn create(
        &self,
        author_id: Uuid,
        submission: &PostSubmission,
    ) -> Result<FormOutcome<Post>, DomainError> {
        let clean = match self.validate(submission).await? {
            Ok(clean) => clean,
            Err(errors) => return Ok(FormOutcome::Invalid(errors)),
        };

        let image = self.store_image(clean.image).await?;
        let created = self
            .repos
            .posts
            .create(NewPost {
                author_id,
                group_id: clean.group_id,
                text: clean.text,
                image: image.clone(),
            })
            .await;

        match created {
            Ok(post) => {
                tracing::info!(post_id = post.id, author_id = %author_id, "Post created");
                Ok(FormOutcome::Saved(post))
            }
            Err(e) => {
                self.discard_image(image).await;
                Err(e.into())
            }
        }
    }

    /// Apply an edit by `actor_id`. Only the author may edit; a new image
    /// replaces the old path, no image keeps it.
    pub async fn update(
        &self,
        actor_id: Uuid,
        post: Post,
        submission: &PostSubmission,
    ) -> Result<EditOutcome, DomainError> {
        if post.author_id != actor_id {
            tracing::debug!(post_id = post.id, actor_id = %actor_id, "Edit refused, not the author");
            return Ok(EditOutcome::NotAuthor);
        }

        let clean = match self.validate(submission).await? {
            Ok(clean) => clean,
            Err(errors) => return Ok(EditOutcome::Invalid(errors)),
        };

        let image = self.store_image(clean.image).await?;
        let image_path = image.clone().or_else(|| post.image.clone());
        let updated = Post {
            text: clean.text,
            group_id: clean.group_id,
            image: image_path,
            ..post
        };

        match self.repos.posts.update(updated).await {
            Ok(post) => {
                tracing::info!(post_id = post.id, "Post updated");
                Ok(EditOutcome::Saved(post))
            }
            Err(e) => {
                self.discard_image(image).await;
                Err(e.into())
            }
        }
    }

    async fn validate<'a>(
        &self,
        submission: &'a PostSubmission,
    ) -> Result<Result<CleanPost<'a>, FormErrors>, DomainError> {
        let mut errors = FormErrors::new();

        let text = forms::required_text(submission.text.as_deref());
        if text.is_none() {
            errors.add("text", REQUIRED);
        }

        let group_id = match forms::parse_choice(submission.group.as_deref()) {
            Ok(Some(id)) => {
                if self.repos.groups.find_by_id(id).await?.is_none() {
                    errors.add("group", INVALID_CHOICE);
                }
                Some(id)
            }
            Ok(None) => None,
            Err(_) => {
                errors.add("group", INVALID_CHOICE);
                None
            }
        };

        let image = match &submission.image {
            Some(upload) => match self.probe.probe(&upload.bytes) {
                Some(detected) => Some((upload.bytes.as_slice(), detected.extension)),
                None => {
                    tracing::debug!(filename = %upload.filename, "Rejected non-image upload");
                    errors.add("image", INVALID_IMAGE);
                    None
                }
            },
            None => None,
        };

        match text {
            Some(text) if errors.is_empty() => Ok(Ok(CleanPost {
                text,
                group_id,
                image,
            })),
            _ => Ok(Err(errors)),
        }
    }

    async fn store_image(
        &self,
        image: Option<(&[u8], &'static str)>,
    ) -> Result<Option<String>, DomainError> {
        let Some((bytes, extension)) = image else {
            return Ok(None);
        };

        self.media
            .store(IMAGE_DIR, extension, bytes)
            .await
            .map(Some)
            .map_err(|e| DomainError::Internal(e.to_string()))
    }

    async fn discard_image(&self, image: Option<String>) {
        if let Some(path) = image
            && let Err(e) = self.media.remove(&path).await
        {
            tracing::warn!(path = %path, error = %e, "Failed to remove orphaned image");
        }
    }
}
