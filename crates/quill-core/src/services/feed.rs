//! Feed assembly: the home, group, profile and subscription listings and
//! the single-post page.

use serde::Serialize;
use uuid::Uuid;

use crate::domain::{AuthorRef, CommentView, Group, PostSummary};
use crate::error::DomainError;
use crate::pagination::{PAGE_SIZE, Page, Paginator};
use crate::ports::FeedFilter;

use super::Repositories;

/// Group page context.
#[derive(Debug, Clone, Serialize)]
pub struct GroupFeed {
    pub group: Group,
    pub page: Page<PostSummary>,
}

/// Profile page context.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileFeed {
    pub author: AuthorRef,
    pub page: Page<PostSummary>,
    /// Whether the viewer follows this author. Always false for anonymous
    /// viewers and for the author looking at their own profile.
    pub following: bool,
    pub followers_count: u64,
    pub following_count: u64,
}

/// Single post with its comments, oldest first.
#[derive(Debug, Clone, Serialize)]
pub struct PostPage {
    pub author: AuthorRef,
    pub post: PostSummary,
    pub comments: Vec<CommentView>,
}

#[derive(Clone)]
pub struct FeedService {
    repos: Repositories,
}

impl FeedService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// One page of posts under `filter`, with `requested` clamped to the
    /// valid range.
    pub async fn page(
        &self,
        filter: FeedFilter,
        requested: Option<&str>,
    ) -> Result<Page<PostSummary>, DomainError> {
        let count = self.repos.posts.count(filter).await?;
        let paginator = Paginator::new(count, PAGE_SIZE);
        let number = paginator.resolve(requested);

        let items = self
            .repos
            .posts
            .list(filter, paginator.offset(number), paginator.per_page())
            .await?;

        tracing::debug!(?filter, number, count, "Feed page assembled");
        Ok(paginator.page(number, items))
    }

    pub async fn home(&self, requested: Option<&str>) -> Result<Page<PostSummary>, DomainError> {
        self.page(FeedFilter::All, requested).await
    }

    pub async fn group(&self, slug: &str, requested: Option<&str>) -> Result<GroupFeed, DomainError> {
        let group = self
            .repos
            .groups
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| DomainError::not_found("group", slug))?;

        let page = self.page(FeedFilter::Group(group.id), requested).await?;
        Ok(GroupFeed { group, page })
    }

    pub async fn profile(
        &self,
        username: &str,
        viewer: Option<Uuid>,
        requested: Option<&str>,
    ) -> Result<ProfileFeed, DomainError> {
        let author = self.repos.author(username).await?;
        let page = self.page(FeedFilter::Author(author.id), requested).await?;

        let following = match viewer {
            Some(viewer) if viewer != author.id => self
                .repos
                .follows
                .find_pair(viewer, author.id)
                .await?
                .is_some(),
            _ => false,
        };

        Ok(ProfileFeed {
            author: author.to_author(),
            page,
            following,
            followers_count: self.repos.follows.count_followers(author.id).await?,
            following_count: self.repos.follows.count_following(author.id).await?,
        })
    }

    /// Posts by every author `viewer` follows.
    pub async fn subscriptions(
        &self,
        viewer: Uuid,
        requested: Option<&str>,
    ) -> Result<Page<PostSummary>, DomainError> {
        self.page(FeedFilter::FollowedBy(viewer), requested).await
    }

    pub async fn post(&self, username: &str, post_id: i64) -> Result<PostPage, DomainError> {
        let (author, post) = self.repos.author_post(username, post_id).await?;

        let post = self
            .repos
            .posts
            .find_summary(post.id)
            .await?
            .ok_or_else(|| DomainError::not_found("post", post_id))?;
        let comments = self.repos.comments.list_for_post(post.id).await?;

        Ok(PostPage {
            author: author.to_author(),
            post,
            comments,
        })
    }
}
