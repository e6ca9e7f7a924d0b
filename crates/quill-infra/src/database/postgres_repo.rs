//! PostgreSQL repository implementations.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbConn, EntityTrait, FromQueryResult, NotSet, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, QueryTrait, Select, Set, Unchanged,
};
use uuid::Uuid;

use quill_core::domain::{
    AuthorRef, Comment, CommentView, Follow, Group, GroupRef, NewComment, NewGroup, NewPost,
    Post, PostSummary, User,
};
use quill_core::error::RepoError;
use quill_core::ports::{
    CommentRepository, FeedFilter, FollowRepository, GroupRepository, PostRepository,
    UserRepository,
};
use quill_core::services::Repositories;

use super::entity::{comment, follow, group, post, user};
use super::postgres_base::{PostgresBaseRepository, map_db_err};

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<user::Entity>;

/// PostgreSQL group repository.
pub type PostgresGroupRepository = PostgresBaseRepository<group::Entity>;

/// PostgreSQL post repository.
pub type PostgresPostRepository = PostgresBaseRepository<post::Entity>;

/// PostgreSQL comment repository.
pub type PostgresCommentRepository = PostgresBaseRepository<comment::Entity>;

/// PostgreSQL follow repository.
pub type PostgresFollowRepository = PostgresBaseRepository<follow::Entity>;

/// Every repository backed by one connection pool.
pub fn postgres_repositories(db: DbConn) -> Repositories {
    Repositories {
        users: Arc::new(PostgresUserRepository::new(db.clone())),
        groups: Arc::new(PostgresGroupRepository::new(db.clone())),
        posts: Arc::new(PostgresPostRepository::new(db.clone())),
        comments: Arc::new(PostgresCommentRepository::new(db.clone())),
        follows: Arc::new(PostgresFollowRepository::new(db)),
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(username = %username, "Finding user by username");

        let result = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn create(&self, user: User) -> Result<User, RepoError> {
        let active: user::ActiveModel = user.into();
        let model = active.insert(&self.db).await.map_err(map_db_err)?;

        tracing::debug!(user_id = %model.id, "User inserted");
        Ok(model.into())
    }
}

#[async_trait]
impl GroupRepository for PostgresGroupRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError> {
        let result = group::Entity::find()
            .filter(group::Column::Slug.eq(slug))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn create(&self, group: NewGroup) -> Result<Group, RepoError> {
        let active = group::ActiveModel {
            id: NotSet,
            title: Set(group.title),
            slug: Set(group.slug),
            description: Set(group.description),
        };
        let model = active.insert(&self.db).await.map_err(map_db_err)?;

        tracing::debug!(group_id = model.id, "Group inserted");
        Ok(model.into())
    }

    async fn list(&self) -> Result<Vec<Group>, RepoError> {
        let result = group::Entity::find()
            .order_by_asc(group::Column::Title)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

/// Per-post comment totals from a grouped count.
#[derive(Debug, FromQueryResult)]
struct CommentCount {
    post_id: i64,
    count: i64,
}

fn feed_query(filter: FeedFilter) -> Select<post::Entity> {
    let query = post::Entity::find();
    match filter {
        FeedFilter::All => query,
        FeedFilter::Group(group_id) => query.filter(post::Column::GroupId.eq(group_id)),
        FeedFilter::Author(author_id) => query.filter(post::Column::AuthorId.eq(author_id)),
        FeedFilter::FollowedBy(user_id) => query.filter(
            post::Column::AuthorId.in_subquery(
                follow::Entity::find()
                    .select_only()
                    .column(follow::Column::AuthorId)
                    .filter(follow::Column::UserId.eq(user_id))
                    .into_query(),
            ),
        ),
    }
}

fn unique<T: Copy + Eq + std::hash::Hash>(values: impl Iterator<Item = T>) -> Vec<T> {
    let mut seen = HashSet::new();
    values.filter(|value| seen.insert(*value)).collect()
}

async fn authors(db: &DbConn, ids: Vec<Uuid>) -> Result<HashMap<Uuid, AuthorRef>, RepoError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let users = user::Entity::find()
        .filter(user::Column::Id.is_in(ids))
        .all(db)
        .await
        .map_err(map_db_err)?;

    Ok(users
        .into_iter()
        .map(|user| {
            (
                user.id,
                AuthorRef {
                    id: user.id,
                    username: user.username,
                },
            )
        })
        .collect())
}

/// Attach author, group and comment count to each post, keeping the order.
async fn summarize(db: &DbConn, posts: Vec<post::Model>) -> Result<Vec<PostSummary>, RepoError> {
    if posts.is_empty() {
        return Ok(Vec::new());
    }

    let authors = authors(db, unique(posts.iter().map(|p| p.author_id))).await?;

    let group_ids = unique(posts.iter().filter_map(|p| p.group_id));
    let groups: HashMap<i32, GroupRef> = if group_ids.is_empty() {
        HashMap::new()
    } else {
        group::Entity::find()
            .filter(group::Column::Id.is_in(group_ids))
            .all(db)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(|g| {
                (
                    g.id,
                    GroupRef {
                        id: g.id,
                        title: g.title,
                        slug: g.slug,
                    },
                )
            })
            .collect()
    };

    let counts: HashMap<i64, i64> = comment::Entity::find()
        .select_only()
        .column(comment::Column::PostId)
        .column_as(Expr::col(comment::Column::Id).count(), "count")
        .filter(comment::Column::PostId.is_in(posts.iter().map(|p| p.id).collect::<Vec<_>>()))
        .group_by(comment::Column::PostId)
        .into_model::<CommentCount>()
        .all(db)
        .await
        .map_err(map_db_err)?
        .into_iter()
        .map(|row| (row.post_id, row.count))
        .collect();

    posts
        .into_iter()
        .map(|post| {
            let author = authors
                .get(&post.author_id)
                .cloned()
                .ok_or_else(|| RepoError::Query(format!("author {} missing", post.author_id)))?;

            Ok(PostSummary {
                id: post.id,
                text: post.text,
                pub_date: post.pub_date.into(),
                author,
                group: post.group_id.and_then(|id| groups.get(&id).cloned()),
                image: post.image,
                comments_count: counts.get(&post.id).copied().unwrap_or(0).max(0) as u64,
            })
        })
        .collect()
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn create(&self, post: NewPost) -> Result<Post, RepoError> {
        let active = post::ActiveModel {
            id: NotSet,
            author_id: Set(post.author_id),
            group_id: Set(post.group_id),
            text: Set(post.text),
            pub_date: Set(Utc::now().into()),
            image: Set(post.image),
        };
        let model = active.insert(&self.db).await.map_err(map_db_err)?;

        tracing::debug!(post_id = model.id, "Post inserted");
        Ok(model.into())
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        let active = post::ActiveModel {
            id: Unchanged(post.id),
            text: Set(post.text),
            group_id: Set(post.group_id),
            image: Set(post.image),
            ..Default::default()
        };
        let model = active.update(&self.db).await.map_err(map_db_err)?;

        tracing::debug!(post_id = model.id, "Post updated");
        Ok(model.into())
    }

    async fn count(&self, filter: FeedFilter) -> Result<u64, RepoError> {
        feed_query(filter).count(&self.db).await.map_err(map_db_err)
    }

    async fn list(
        &self,
        filter: FeedFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<PostSummary>, RepoError> {
        let posts = feed_query(filter)
            .order_by_desc(post::Column::PubDate)
            .order_by_desc(post::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        summarize(&self.db, posts).await
    }

    async fn find_summary(&self, id: i64) -> Result<Option<PostSummary>, RepoError> {
        let Some(post) = post::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(map_db_err)?
        else {
            return Ok(None);
        };

        Ok(summarize(&self.db, vec![post]).await?.pop())
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn create(&self, comment: NewComment) -> Result<Comment, RepoError> {
        let active = comment::ActiveModel {
            id: NotSet,
            post_id: Set(comment.post_id),
            author_id: Set(comment.author_id),
            text: Set(comment.text),
            created: Set(Utc::now().into()),
        };
        let model = active.insert(&self.db).await.map_err(map_db_err)?;

        tracing::debug!(comment_id = model.id, post_id = model.post_id, "Comment inserted");
        Ok(model.into())
    }

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentView>, RepoError> {
        let comments = comment::Entity::find()
            .filter(comment::Column::PostId.eq(post_id))
            .order_by_asc(comment::Column::Created)
            .order_by_asc(comment::Column::Id)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        let authors = authors(&self.db, unique(comments.iter().map(|c| c.author_id))).await?;

        comments
            .into_iter()
            .map(|comment| {
                let author = authors.get(&comment.author_id).cloned().ok_or_else(|| {
                    RepoError::Query(format!("author {} missing", comment.author_id))
                })?;

                Ok(CommentView {
                    id: comment.id,
                    text: comment.text,
                    created: comment.created.into(),
                    author,
                })
            })
            .collect()
    }

    async fn count_for_post(&self, post_id: i64) -> Result<u64, RepoError> {
        comment::Entity::find()
            .filter(comment::Column::PostId.eq(post_id))
            .count(&self.db)
            .await
            .map_err(map_db_err)
    }
}

#[async_trait]
impl FollowRepository for PostgresFollowRepository {
    async fn create_if_absent(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let active = follow::ActiveModel {
            id: NotSet,
            user_id: Set(user_id),
            author_id: Set(author_id),
        };

        let inserted = follow::Entity::insert(active)
            .on_conflict(
                OnConflict::columns([follow::Column::UserId, follow::Column::AuthorId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(inserted > 0)
    }

    async fn find_pair(&self, user_id: Uuid, author_id: Uuid) -> Result<Option<Follow>, RepoError> {
        let result = follow::Entity::find()
            .filter(follow::Column::UserId.eq(user_id))
            .filter(follow::Column::AuthorId.eq(author_id))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn delete_pair(&self, user_id: Uuid, author_id: Uuid) -> Result<(), RepoError> {
        let result = follow::Entity::delete_many()
            .filter(follow::Column::UserId.eq(user_id))
            .filter(follow::Column::AuthorId.eq(author_id))
            .exec(&self.db)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn count_followers(&self, author_id: Uuid) -> Result<u64, RepoError> {
        follow::Entity::find()
            .filter(follow::Column::AuthorId.eq(author_id))
            .count(&self.db)
            .await
            .map_err(map_db_err)
    }

    async fn count_following(&self, user_id: Uuid) -> Result<u64, RepoError> {
        follow::Entity::find()
            .filter(follow::Column::UserId.eq(user_id))
            .count(&self.db)
            .await
            .map_err(map_db_err)
    }
}
