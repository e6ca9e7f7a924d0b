//! Follow and unfollow. Both answer with a redirect to the profile.

use actix_web::{HttpResponse, web};

use quill_core::services::FollowOutcome;

use super::{profile_path, redirect};
use crate::middleware::auth::CurrentUser;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// POST /{username}/follow
pub async fn follow(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let username = path.into_inner();

    let outcome = state.follows.follow(user.user_id, &username).await?;
    if outcome == FollowOutcome::SelfFollow {
        tracing::debug!(username = %username, "Ignored self-follow");
    }

    Ok(redirect(&profile_path(&username)?))
}

/// POST /{username}/unfollow
pub async fn unfollow(
    state: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let username = path.into_inner();

    state.follows.unfollow(user.user_id, &username).await?;
    Ok(redirect(&profile_path(&username)?))
}
