use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Follow edge: `user_id` subscribes to posts by `author_id`.
///
/// The store keeps (user_id, author_id) unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follow {
    pub id: i64,
    pub user_id: Uuid,
    pub author_id: Uuid,
}
