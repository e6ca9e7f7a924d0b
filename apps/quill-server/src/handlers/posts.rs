//! Post create and edit forms.

use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use serde::Serialize;

use quill_core::domain::{Group, Post};
use quill_core::forms::{FormErrors, FormOutcome, PostFormValues};
use quill_core::services::EditOutcome;
use quill_shared::ApiResponse;

use super::multipart::read_post_submission;
use super::{post_path, redirect};
use crate::middleware::auth::CurrentUser;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// Context of the create and edit forms.
#[derive(Serialize)]
pub struct PostFormContext {
    pub form: PostFormValues,
    pub errors: FormErrors,
    pub groups: Vec<Group>,
    pub is_edit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<i64>,
}

impl PostFormContext {
    fn prefilled(post: &Post, groups: Vec<Group>) -> Self {
        Self {
            form: PostFormValues {
                text: post.text.clone(),
                group: post.group_id,
                image: post.image.clone(),
            },
            errors: FormErrors::new(),
            groups,
            is_edit: true,
            post_id: Some(post.id),
        }
    }
}

/// GET /new
pub async fn new_form(state: web::Data<AppState>, _user: CurrentUser) -> AppResult<HttpResponse> {
    let groups = state.posts.group_choices().await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(PostFormContext {
        form: PostFormValues::default(),
        errors: FormErrors::new(),
        groups,
        is_edit: false,
        post_id: None,
    })))
}

/// POST /new
pub async fn create(
    state: web::Data<AppState>,
    user: CurrentUser,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let submission = read_post_submission(payload).await?;

    match state.posts.create(user.user_id, &submission).await? {
        FormOutcome::Saved(_) => Ok(redirect("/")),
        FormOutcome::Invalid(errors) => {
            let groups = state.posts.group_choices().await?;
            Ok(HttpResponse::Ok().json(ApiResponse::invalid(PostFormContext {
                form: submission.values(),
                errors,
                groups,
                is_edit: false,
                post_id: None,
            })))
        }
    }
}

/// GET /{username}/{post_id}/edit
///
/// Anyone but the author is sent to the read-only post page.
pub async fn edit_form(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<(String, i64)>,
) -> AppResult<HttpResponse> {
    let (username, post_id) = path.into_inner();
    let post = state.posts.find_for_author(&username, post_id).await?;

    if post.author_id != user.user_id {
        return Ok(redirect(&post_path(&username, post_id)?));
    }

    let groups = state.posts.group_choices().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(PostFormContext::prefilled(&post, groups))))
}

/// POST /{username}/{post_id}/edit
///
/// Non-authors are redirected to the post page without the body being read.
pub async fn update(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<(String, i64)>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let (username, post_id) = path.into_inner();
    let post = state.posts.find_for_author(&username, post_id).await?;

    if post.author_id != user.user_id {
        return Ok(redirect(&post_path(&username, post_id)?));
    }

    let submission = read_post_submission(payload).await?;

    match state.posts.update(user.user_id, post, &submission).await? {
        EditOutcome::Saved(_) | EditOutcome::NotAuthor => {
            Ok(redirect(&post_path(&username, post_id)?))
        }
        EditOutcome::Invalid(errors) => {
            let groups = state.posts.group_choices().await?;
            Ok(HttpResponse::Ok().json(ApiResponse::invalid(PostFormContext {
                form: submission.values(),
                errors,
                groups,
                is_edit: true,
                post_id: Some(post_id),
            })))
        }
    }
}
