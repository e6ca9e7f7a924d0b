use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AuthorRef, GroupRef};

/// Post entity - a user-authored text entry, optionally grouped and imaged.
///
/// `pub_date` is assigned by the store on insert and never rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub author_id: Uuid,
    pub group_id: Option<i32>,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    /// Path of the stored image, relative to the media root.
    pub image: Option<String>,
}

/// Fields of a post that is about to be inserted.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: Uuid,
    pub group_id: Option<i32>,
    pub text: String,
    pub image: Option<String>,
}

/// Read model used by every feed and by the post page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: i64,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author: AuthorRef,
    pub group: Option<GroupRef>,
    pub image: Option<String>,
    pub comments_count: u64,
}
