//! Domain entities - the core business objects.

mod comment;
mod follow;
mod group;
mod post;
mod user;

pub use comment::{Comment, CommentView, NewComment};
pub use follow::Follow;
pub use group::{Group, GroupRef, NewGroup};
pub use post::{NewPost, Post, PostSummary};
pub use user::{AuthorRef, User};
