//! Comment submission.

use actix_web::{HttpResponse, web};

use quill_core::forms::{CommentSubmission, FormOutcome};
use quill_shared::ApiResponse;

use super::feed::{CommentForm, PostContext};
use super::{post_path, redirect};
use crate::middleware::auth::CurrentUser;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// POST /{username}/{post_id}/comment
///
/// An invalid form re-renders the post page with the errors.
pub async fn add_comment(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<(String, i64)>,
    form: web::Form<CommentSubmission>,
) -> AppResult<HttpResponse> {
    let (username, post_id) = path.into_inner();
    let post = state.posts.find_for_author(&username, post_id).await?;

    match state.comments.add(user.user_id, &post, &form).await? {
        FormOutcome::Saved(_) => Ok(redirect(&post_path(&username, post_id)?)),
        FormOutcome::Invalid(errors) => {
            let page = state.feed.post(&username, post_id).await?;
            Ok(HttpResponse::Ok().json(ApiResponse::invalid(PostContext {
                page,
                form: CommentForm {
                    text: form.into_inner().text,
                    errors,
                },
            })))
        }
    }
}
