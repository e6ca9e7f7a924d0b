//! Read-only pages: the home, group, profile and subscription feeds and the
//! single-post page.

use actix_web::{HttpRequest, HttpResponse, http::header::ContentType, web};
use serde::Serialize;

use quill_core::domain::PostSummary;
use quill_core::forms::FormErrors;
use quill_core::pagination::Page;
use quill_core::services::PostPage;
use quill_shared::ApiResponse;
use quill_shared::dto::PageQuery;

use crate::middleware::auth::{CurrentUser, OptionalUser};
use crate::middleware::error::AppResult;
use crate::page_cache::PageCache;
use crate::state::AppState;

#[derive(Serialize)]
pub struct FeedContext {
    pub page: Page<PostSummary>,
}

/// Comment form shown under a post.
#[derive(Debug, Default, Serialize)]
pub struct CommentForm {
    pub text: String,
    pub errors: FormErrors,
}

#[derive(Serialize)]
pub struct PostContext {
    #[serde(flatten)]
    pub page: PostPage,
    pub form: CommentForm,
}

/// GET /
///
/// Served from the page cache while the entry for this exact target lives.
pub async fn index(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let key = PageCache::key(target);

    if let Some(body) = state.page_cache.get(&key).await {
        tracing::debug!(key = %key, "Home feed served from cache");
        return Ok(HttpResponse::Ok()
            .content_type(ContentType::json())
            .body(body));
    }

    let page = state.feed.home(query.page.as_deref()).await?;
    let body = serde_json::to_string(&ApiResponse::ok(FeedContext { page }))?;
    state.page_cache.store(&key, &body).await;

    Ok(HttpResponse::Ok()
        .content_type(ContentType::json())
        .body(body))
}

/// GET /group/{slug}
pub async fn group_posts(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let feed = state.feed.group(&path, query.page.as_deref()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(feed)))
}

/// GET /{username}
pub async fn profile(
    state: web::Data<AppState>,
    viewer: OptionalUser,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let feed = state
        .feed
        .profile(&path, viewer.user_id(), query.page.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(feed)))
}

/// GET /follow
pub async fn follow_index(
    state: web::Data<AppState>,
    user: CurrentUser,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let page = state
        .feed
        .subscriptions(user.user_id, query.page.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(FeedContext { page })))
}

/// GET /{username}/{post_id}
pub async fn post_detail(
    state: web::Data<AppState>,
    path: web::Path<(String, i64)>,
) -> AppResult<HttpResponse> {
    let (username, post_id) = path.into_inner();
    let page = state.feed.post(&username, post_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(PostContext {
        page,
        form: CommentForm::default(),
    })))
}
