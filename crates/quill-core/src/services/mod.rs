//! Services - the query layer the HTTP handlers call.
//!
//! Each service owns the repositories it needs and turns raw submissions
//! into validated writes or read models for one area of the site.

mod accounts;
mod comments;
mod feed;
mod follows;
mod groups;
mod posts;

use std::sync::Arc;

use crate::domain::{Post, User};
use crate::error::DomainError;
use crate::ports::{
    CommentRepository, FollowRepository, GroupRepository, PostRepository, UserRepository,
};

pub use accounts::AccountService;
pub use comments::CommentService;
pub use feed::{FeedService, GroupFeed, PostPage, ProfileFeed};
pub use follows::{FollowOutcome, FollowService};
pub use groups::GroupService;
pub use posts::{EditOutcome, PostService};

/// Every repository the services draw from.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub follows: Arc<dyn FollowRepository>,
}

impl Repositories {
    /// Wire every port to one store that implements all of them.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UserRepository
            + GroupRepository
            + PostRepository
            + CommentRepository
            + FollowRepository
            + 'static,
    {
        Self {
            users: store.clone(),
            groups: store.clone(),
            posts: store.clone(),
            comments: store.clone(),
            follows: store,
        }
    }

    /// Look up an author by username, `NotFound` when there is none.
    pub async fn author(&self, username: &str) -> Result<User, DomainError> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or_else(|| DomainError::not_found("user", username))
    }

    /// Look up a post through its author's username.
    ///
    /// A post that exists but belongs to someone else is reported as missing.
    pub async fn author_post(&self, username: &str, post_id: i64) -> Result<(User, Post), DomainError> {
        let author = self.author(username).await?;
        let post = self
            .posts
            .find_by_id(post_id)
            .await?
            .filter(|post| post.author_id == author.id)
            .ok_or_else(|| DomainError::not_found("post", post_id))?;

        Ok((author, post))
    }
}
