use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    Comment, CommentView, Follow, Group, NewComment, NewGroup, NewPost, Post, PostSummary, User,
};
use crate::error::RepoError;

/// Generic repository trait shared by every record type.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Delete an entity by its ID, cascading the way the schema declares.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository with account-specific lookups.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;

    /// Insert a new user; a taken username is a `Constraint` error.
    async fn create(&self, user: User) -> Result<User, RepoError>;
}

/// Group repository.
#[async_trait]
pub trait GroupRepository: BaseRepository<Group, i32> {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError>;

    /// Insert a new group; a taken title or slug is a `Constraint` error.
    async fn create(&self, group: NewGroup) -> Result<Group, RepoError>;

    /// All groups ordered by title, used for form choices.
    async fn list(&self) -> Result<Vec<Group>, RepoError>;
}

/// Which posts a feed shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFilter {
    All,
    Group(i32),
    Author(Uuid),
    /// Posts by every author the given user follows.
    FollowedBy(Uuid),
}

/// Post repository: writes plus the feed queries.
///
/// Listings are ordered newest first by `pub_date`, ties broken by insertion
/// order (newest insert first).
#[async_trait]
pub trait PostRepository: BaseRepository<Post, i64> {
    async fn create(&self, post: NewPost) -> Result<Post, RepoError>;

    /// Persist `text`, `group_id` and `image`. `pub_date` and the author
    /// are never rewritten.
    async fn update(&self, post: Post) -> Result<Post, RepoError>;

    async fn count(&self, filter: FeedFilter) -> Result<u64, RepoError>;

    async fn list(
        &self,
        filter: FeedFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PostSummary>, RepoError>;

    async fn find_summary(&self, id: i64) -> Result<Option<PostSummary>, RepoError>;
}

/// Comment repository.
#[async_trait]
pub trait CommentRepository: BaseRepository<Comment, i64> {
    async fn create(&self, comment: NewComment) -> Result<Comment, RepoError>;

    /// Comments under a post, oldest first.
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentView>, RepoError>;

    async fn count_for_post(&self, post_id: i64) -> Result<u64, RepoError>;
}

/// Follow repository.
#[async_trait]
pub trait FollowRepository: BaseRepository<Follow, i64> {
    /// Insert the (user, author) pair unless it already exists.
    /// Returns whether a row was created.
    async fn create_if_absent(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError>;

    async fn find_pair(&self, user_id: Uuid, author_id: Uuid)
    -> Result<Option<Follow>, RepoError>;

    /// Delete the pair; `NotFound` when it does not exist.
    async fn delete_pair(&self, user_id: Uuid, author_id: Uuid) -> Result<(), RepoError>;

    async fn count_followers(&self, author_id: Uuid) -> Result<u64, RepoError>;

    async fn count_following(&self, user_id: Uuid) -> Result<u64, RepoError>;
}
