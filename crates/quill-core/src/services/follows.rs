//! Follow and unfollow.

use uuid::Uuid;

use crate::error::{DomainError, RepoError};

use super::Repositories;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    AlreadyFollowing,
    /// Following yourself is refused without an error.
    SelfFollow,
}

#[derive(Clone)]
pub struct FollowService {
    repos: Repositories,
}

impl FollowService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Subscribe `user_id` to `username`. Repeating the call is a no-op.
    pub async fn follow(&self, user_id: Uuid, username: &str) -> Result<FollowOutcome, DomainError> {
        let author = self.repos.author(username).await?;
        if author.id == user_id {
            return Ok(FollowOutcome::SelfFollow);
        }

        let created = self.repos.follows.create_if_absent(user_id, author.id).await?;
        if created {
            tracing::info!(user_id = %user_id, author_id = %author.id, "Follow created");
            Ok(FollowOutcome::Created)
        } else {
            Ok(FollowOutcome::AlreadyFollowing)
        }
    }

    /// Remove the subscription. A missing pair is reported as `NotFound`.
    pub async fn unfollow(&self, user_id: Uuid, username: &str) -> Result<(), DomainError> {
        let author = self.repos.author(username).await?;

        match self.repos.follows.delete_pair(user_id, author.id).await {
            Ok(()) => {
                tracing::info!(user_id = %user_id, author_id = %author.id, "Follow removed");
                Ok(())
            }
            Err(RepoError::NotFound) => Err(DomainError::not_found("follow", username)),
            Err(e) => Err(e.into()),
        }
    }
}
