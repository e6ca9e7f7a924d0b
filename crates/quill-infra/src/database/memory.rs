//! In-memory store - used when no database is configured and in tests.
//!
//! Mirrors the relational schema: unique usernames, group titles and slugs,
//! unique follow pairs, cascading deletes from users and posts, and
//! `group_id` nulled when a group is removed. Data is lost on restart.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use quill_core::domain::{
    Comment, CommentView, Follow, Group, NewComment, NewGroup, NewPost, Post, PostSummary, User,
};
use quill_core::error::RepoError;
use quill_core::ports::{
    BaseRepository, CommentRepository, FeedFilter, FollowRepository, GroupRepository,
    PostRepository, UserRepository,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    groups: BTreeMap<i32, Group>,
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
    follows: BTreeMap<i64, Follow>,
    next_group_id: i32,
    next_post_id: i64,
    next_comment_id: i64,
    next_follow_id: i64,
}

impl Tables {
    fn matches(&self, post: &Post, filter: FeedFilter) -> bool {
        match filter {
            FeedFilter::All => true,
            FeedFilter::Group(group_id) => post.group_id == Some(group_id),
            FeedFilter::Author(author_id) => post.author_id == author_id,
            FeedFilter::FollowedBy(user_id) => self
                .follows
                .values()
                .any(|f| f.user_id == user_id && f.author_id == post.author_id),
        }
    }

    /// Matching posts, newest first with the higher id winning ties.
    fn feed(&self, filter: FeedFilter) -> Vec<&Post> {
        let mut posts: Vec<&Post> = self
            .posts
            .values()
            .filter(|post| self.matches(post, filter))
            .collect();
        posts.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        posts
    }

    fn summary(&self, post: &Post) -> Result<PostSummary, RepoError> {
        let author = self
            .users
            .get(&post.author_id)
            .map(User::to_author)
            .ok_or_else(|| RepoError::Query(format!("author {} missing", post.author_id)))?;

        Ok(PostSummary {
            id: post.id,
            text: post.text.clone(),
            pub_date: post.pub_date,
            author,
            group: post
                .group_id
                .and_then(|id| self.groups.get(&id))
                .map(Group::to_ref),
            image: post.image.clone(),
            comments_count: self.comment_count(post.id),
        })
    }

    fn comment_count(&self, post_id: i64) -> u64 {
        self.comments
            .values()
            .filter(|c| c.post_id == post_id)
            .count() as u64
    }

    fn remove_post(&mut self, post_id: i64) -> Option<Post> {
        let post = self.posts.remove(&post_id)?;
        self.comments.retain(|_, c| c.post_id != post_id);
        Some(post)
    }
}

/// Repository implementation over process memory, guarded by one async lock.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        tables.users.remove(&id).ok_or(RepoError::NotFound)?;

        let authored: Vec<i64> = tables
            .posts
            .values()
            .filter(|p| p.author_id == id)
            .map(|p| p.id)
            .collect();
        for post_id in authored {
            tables.remove_post(post_id);
        }
        tables.comments.retain(|_, c| c.author_id != id);
        tables
            .follows
            .retain(|_, f| f.user_id != id && f.author_id != id);

        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(RepoError::Constraint(format!(
                "username {} already exists",
                user.username
            )));
        }

        tables.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl BaseRepository<Group, i32> for InMemoryStore {
    async fn find_by_id(&self, id: i32) -> Result<Option<Group>, RepoError> {
        Ok(self.tables.read().await.groups.get(&id).cloned())
    }

    async fn delete(&self, id: i32) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        tables.groups.remove(&id).ok_or(RepoError::NotFound)?;

        for post in tables.posts.values_mut() {
            if post.group_id == Some(id) {
                post.group_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl GroupRepository for InMemoryStore {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.groups.values().find(|g| g.slug == slug).cloned())
    }

    async fn create(&self, group: NewGroup) -> Result<Group, RepoError> {
        let mut tables = self.tables.write().await;
        if tables
            .groups
            .values()
            .any(|g| g.title == group.title || g.slug == group.slug)
        {
            return Err(RepoError::Constraint(format!(
                "group {} already exists",
                group.slug
            )));
        }

        tables.next_group_id += 1;
        let group = Group {
            id: tables.next_group_id,
            title: group.title,
            slug: group.slug,
            description: group.description,
        };
        tables.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn list(&self) -> Result<Vec<Group>, RepoError> {
        let tables = self.tables.read().await;
        let mut groups: Vec<Group> = tables.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }
}

#[async_trait]
impl BaseRepository<Post, i64> for InMemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Post>, RepoError> {
        Ok(self.tables.read().await.posts.get(&id).cloned())
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        tables.remove_post(id).map(|_| ()).ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl PostRepository for InMemoryStore {
    async fn create(&self, post: NewPost) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&post.author_id) {
            return Err(RepoError::Constraint("unknown author".to_string()));
        }
        if let Some(group_id) = post.group_id
            && !tables.groups.contains_key(&group_id)
        {
            return Err(RepoError::Constraint("unknown group".to_string()));
        }

        tables.next_post_id += 1;
        let post = Post {
            id: tables.next_post_id,
            author_id: post.author_id,
            group_id: post.group_id,
            text: post.text,
            pub_date: Utc::now(),
            image: post.image,
        };
        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        if let Some(group_id) = post.group_id
            && !tables.groups.contains_key(&group_id)
        {
            return Err(RepoError::Constraint("unknown group".to_string()));
        }

        let stored = tables.posts.get_mut(&post.id).ok_or(RepoError::NotFound)?;
        stored.text = post.text;
        stored.group_id = post.group_id;
        stored.image = post.image;
        Ok(stored.clone())
    }

    async fn count(&self, filter: FeedFilter) -> Result<u64, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.feed(filter).len() as u64)
    }

    async fn list(
        &self,
        filter: FeedFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PostSummary>, RepoError> {
        let tables = self.tables.read().await;
        tables
            .feed(filter)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|post| tables.summary(post))
            .collect()
    }

    async fn find_summary(&self, id: i64) -> Result<Option<PostSummary>, RepoError> {
        let tables = self.tables.read().await;
        tables
            .posts
            .get(&id)
            .map(|post| tables.summary(post))
            .transpose()
    }
}

#[async_trait]
impl BaseRepository<Comment, i64> for InMemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Comment>, RepoError> {
        Ok(self.tables.read().await.comments.get(&id).cloned())
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        tables
            .comments
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl CommentRepository for InMemoryStore {
    async fn create(&self, comment: NewComment) -> Result<Comment, RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&comment.post_id) {
            return Err(RepoError::Constraint("unknown post".to_string()));
        }
        if !tables.users.contains_key(&comment.author_id) {
            return Err(RepoError::Constraint("unknown author".to_string()));
        }

        tables.next_comment_id += 1;
        let comment = Comment {
            id: tables.next_comment_id,
            post_id: comment.post_id,
            author_id: comment.author_id,
            text: comment.text,
            created: Utc::now(),
        };
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentView>, RepoError> {
        let tables = self.tables.read().await;
        tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .map(|c| {
                let author = tables
                    .users
                    .get(&c.author_id)
                    .map(User::to_author)
                    .ok_or_else(|| RepoError::Query(format!("author {} missing", c.author_id)))?;

                Ok(CommentView {
                    id: c.id,
                    text: c.text.clone(),
                    created: c.created,
                    author,
                })
            })
            .collect()
    }

    async fn count_for_post(&self, post_id: i64) -> Result<u64, RepoError> {
        Ok(self.tables.read().await.comment_count(post_id))
    }
}

#[async_trait]
impl BaseRepository<Follow, i64> for InMemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Follow>, RepoError> {
        Ok(self.tables.read().await.follows.get(&id).cloned())
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        tables
            .follows
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl FollowRepository for InMemoryStore {
    async fn create_if_absent(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) || !tables.users.contains_key(&author_id) {
            return Err(RepoError::Constraint("unknown user".to_string()));
        }
        if tables
            .follows
            .values()
            .any(|f| f.user_id == user_id && f.author_id == author_id)
        {
            return Ok(false);
        }

        tables.next_follow_id += 1;
        let id = tables.next_follow_id;
        tables.follows.insert(
            id,
            Follow {
                id,
                user_id,
                author_id,
            },
        );
        Ok(true)
    }

    async fn find_pair(&self, user_id: Uuid, author_id: Uuid) -> Result<Option<Follow>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .values()
            .find(|f| f.user_id == user_id && f.author_id == author_id)
            .cloned())
    }

    async fn delete_pair(&self, user_id: Uuid, author_id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        let before = tables.follows.len();
        tables
            .follows
            .retain(|_, f| !(f.user_id == user_id && f.author_id == author_id));

        if tables.follows.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn count_followers(&self, author_id: Uuid) -> Result<u64, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .values()
            .filter(|f| f.author_id == author_id)
            .count() as u64)
    }

    async fn count_following(&self, user_id: Uuid) -> Result<u64, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .values()
            .filter(|f| f.user_id == user_id)
            .count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed_user(store: &InMemoryStore, name: &str) -> User {
        UserRepository::create(store, User::new(name.to_string(), "hash".to_string()))
            .await
            .unwrap()
    }

    async fn seed_post(store: &InMemoryStore, author: &User, group_id: Option<i32>) -> Post {
        PostRepository::create(
            store,
            NewPost {
                author_id: author.id,
                group_id,
                text: "text".to_string(),
                image: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_username_is_constraint() {
        let store = InMemoryStore::new();
        seed_user(&store, "tester").await;

        let result =
            UserRepository::create(&store, User::new("tester".to_string(), "x".to_string())).await;
        assert!(matches!(result, Err(RepoError::Constraint(_))));
    }

    #[tokio::test]
    async fn test_feed_newest_first_with_insert_tiebreak() {
        let store = InMemoryStore::new();
        let author = seed_user(&store, "tester").await;
        let first = seed_post(&store, &author, None).await;
        let second = seed_post(&store, &author, None).await;

        // Force identical timestamps so only the id decides.
        {
            let mut tables = store.tables.write().await;
            let stamp = tables.posts[&first.id].pub_date;
            if let Some(post) = tables.posts.get_mut(&second.id) {
                post.pub_date = stamp;
            }
        }

        let items = PostRepository::list(&store, FeedFilter::All, 0, 10)
            .await
            .unwrap();
        assert_eq!(items[0].id, second.id);
        assert_eq!(items[1].id, first.id);
    }

    #[tokio::test]
    async fn test_deleting_group_nulls_posts() {
        let store = InMemoryStore::new();
        let author = seed_user(&store, "tester").await;
        let group = GroupRepository::create(
            &store,
            NewGroup {
                title: "Cats".to_string(),
                slug: "cats".to_string(),
                description: String::new(),
            },
        )
        .await
        .unwrap();
        let post = seed_post(&store, &author, Some(group.id)).await;

        BaseRepository::<Group, i32>::delete(&store, group.id)
            .await
            .unwrap();

        let post = BaseRepository::<Post, i64>::find_by_id(&store, post.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(post.group_id, None);
    }

    #[tokio::test]
    async fn test_deleting_user_cascades() {
        let store = InMemoryStore::new();
        let author = seed_user(&store, "author").await;
        let reader = seed_user(&store, "reader").await;
        let post = seed_post(&store, &author, None).await;
        CommentRepository::create(
            &store,
            NewComment {
                post_id: post.id,
                author_id: reader.id,
                text: "nice".to_string(),
            },
        )
        .await
        .unwrap();
        store.create_if_absent(reader.id, author.id).await.unwrap();

        BaseRepository::<User, Uuid>::delete(&store, author.id)
            .await
            .unwrap();

        assert_eq!(PostRepository::count(&store, FeedFilter::All).await.unwrap(), 0);
        assert_eq!(store.count_for_post(post.id).await.unwrap(), 0);
        assert_eq!(store.count_following(reader.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_follow_pair_is_unique() {
        let store = InMemoryStore::new();
        let user = seed_user(&store, "reader").await;
        let author = seed_user(&store, "author").await;

        assert!(store.create_if_absent(user.id, author.id).await.unwrap());
        assert!(!store.create_if_absent(user.id, author.id).await.unwrap());
        assert_eq!(store.count_followers(author.id).await.unwrap(), 1);

        store.delete_pair(user.id, author.id).await.unwrap();
        assert!(matches!(
            store.delete_pair(user.id, author.id).await,
            Err(RepoError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_writes_by_unknown_user_are_refused() {
        let store = InMemoryStore::new();
        let author = seed_user(&store, "author").await;
        let post = seed_post(&store, &author, None).await;
        let ghost = Uuid::new_v4();

        let comment = CommentRepository::create(
            &store,
            NewComment {
                post_id: post.id,
                author_id: ghost,
                text: "orphan".to_string(),
            },
        )
        .await;
        assert!(matches!(comment, Err(RepoError::Constraint(_))));
        assert!(matches!(
            store.create_if_absent(ghost, author.id).await,
            Err(RepoError::Constraint(_))
        ));
        assert!(matches!(
            store.create_if_absent(author.id, ghost).await,
            Err(RepoError::Constraint(_))
        ));

        assert!(store.list_for_post(post.id).await.unwrap().is_empty());
        assert_eq!(store.count_followers(author.id).await.unwrap(), 0);
    }
}
