//! Comment creation. Comments have no edit or delete path.

use uuid::Uuid;

use crate::domain::{Comment, NewComment, Post};
use crate::error::DomainError;
use crate::forms::{self, CommentSubmission, FormErrors, FormOutcome, REQUIRED};

use super::Repositories;

#[derive(Clone)]
pub struct CommentService {
    repos: Repositories,
}

impl CommentService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn add(
        &self,
        author_id: Uuid,
        post: &Post,
        submission: &CommentSubmission,
    ) -> Result<FormOutcome<Comment>, DomainError> {
        let Some(text) = forms::required_text(Some(&submission.text)) else {
            return Ok(FormOutcome::Invalid(FormErrors::single("text", REQUIRED)));
        };

        let comment = self
            .repos
            .comments
            .create(NewComment {
                post_id: post.id,
                author_id,
                text,
            })
            .await?;

        tracing::info!(comment_id = comment.id, post_id = post.id, "Comment added");
        Ok(FormOutcome::Saved(comment))
    }
}
