//! Authentication handlers.

use actix_web::cookie::{Cookie, SameSite};
use actix_web::{HttpResponse, http::header, web};
use serde::Serialize;

use quill_core::domain::User;
use quill_core::forms::{FormErrors, FormOutcome, INVALID_LOGIN, NON_FIELD, SignupSubmission};
use quill_shared::ApiResponse;
use quill_shared::dto::{AuthResponse, LoginRequest, NextQuery, UserResponse};

use crate::middleware::auth::SESSION_COOKIE;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Serialize)]
pub struct SignupContext {
    pub username: String,
    pub errors: FormErrors,
}

#[derive(Serialize)]
pub struct LoginContext {
    pub username: String,
    pub next: Option<String>,
    pub errors: FormErrors,
}

fn user_response(user: User) -> UserResponse {
    UserResponse {
        id: user.id.to_string(),
        username: user.username,
        created_at: user.created_at.to_rfc3339(),
    }
}

/// `next` when it stays on this site, `/` otherwise.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/",
    }
}

/// POST /auth/signup
pub async fn signup(
    state: web::Data<AppState>,
    form: web::Form<SignupSubmission>,
) -> AppResult<HttpResponse> {
    match state.accounts.signup(&form).await? {
        FormOutcome::Saved(user) => {
            Ok(HttpResponse::Created().json(ApiResponse::ok(user_response(user))))
        }
        FormOutcome::Invalid(errors) => Ok(HttpResponse::Ok().json(ApiResponse::invalid(
            SignupContext {
                username: form.into_inner().username,
                errors,
            },
        ))),
    }
}

/// GET /auth/login
pub async fn login_form(query: web::Query<NextQuery>) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::ok(LoginContext {
        username: String::new(),
        next: query.into_inner().next,
        errors: FormErrors::new(),
    }))
}

/// POST /auth/login
///
/// Sets the session cookie and redirects to `next`. The token is also in the
/// body for API clients.
pub async fn login(
    state: web::Data<AppState>,
    form: web::Form<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = form.into_inner();

    let Some(user) = state.accounts.authenticate(&req.username, &req.password).await? else {
        tracing::debug!(username = %req.username, "Login refused");
        return Ok(HttpResponse::Ok().json(ApiResponse::invalid(LoginContext {
            username: req.username,
            next: req.next,
            errors: FormErrors::single(NON_FIELD, INVALID_LOGIN),
        })));
    };

    let token = state
        .tokens
        .generate_token(user.id, &user.username)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let redirect_to = safe_next(req.next.as_deref()).to_string();
    let cookie = Cookie::build(SESSION_COOKIE, token.clone())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish();

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, redirect_to.as_str()))
        .cookie(cookie)
        .json(AuthResponse {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in: state.tokens.expiration_seconds().max(0) as u64,
            redirect_to,
        }))
}

/// POST /auth/logout
pub async fn logout() -> HttpResponse {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();

    HttpResponse::Found()
        .insert_header((header::LOCATION, "/"))
        .cookie(cookie)
        .finish()
}
