//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod cache;
mod media;
mod repository;

pub use auth::{AuthError, PasswordService, TokenClaims, TokenService};
pub use cache::{Cache, CacheError};
pub use media::{DetectedImage, ImageProbe, MediaError, MediaStorage};
pub use repository::{
    BaseRepository, CommentRepository, FeedFilter, FollowRepository, GroupRepository,
    PostRepository, UserRepository,
};
