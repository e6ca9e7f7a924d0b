//! Session extractors.
//!
//! The session token is read from the `quill_session` cookie or, for API
//! clients, from an `Authorization: Bearer` header.

use actix_web::{FromRequest, HttpRequest, HttpResponse, dev::Payload, http::header, web};
use futures::future::LocalBoxFuture;
use std::sync::Arc;
use url::form_urlencoded;
use uuid::Uuid;

use quill_core::ports::{AuthError, TokenClaims, TokenService};

use crate::middleware::error::AppError;
use crate::state::AppState;

/// Name of the session cookie set on login.
pub const SESSION_COOKIE: &str = "quill_session";

/// Path of the login page.
pub const LOGIN_PATH: &str = "/auth/login";

/// The signed-in user. Rejects with a redirect to the login page when the
/// token is missing, invalid or belongs to a deleted account.
///
/// ```ignore
/// async fn create(user: CurrentUser) -> impl Responder {
///     format!("Hello, {}!", user.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub username: String,
}

impl From<TokenClaims> for CurrentUser {
    fn from(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.username,
        }
    }
}

/// Login URL that returns to `next` afterwards.
pub fn login_url(next: &str) -> String {
    let next: String = form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("{LOGIN_PATH}?next={next}")
}

/// Rejection of [`CurrentUser`]: the request carried no usable session.
#[derive(Debug, thiserror::Error)]
#[error("Login required: {reason}")]
pub struct LoginRequired {
    /// Path and query of the refused request.
    pub next: String,
    pub reason: AuthError,
}

impl actix_web::ResponseError for LoginRequired {
    fn status_code(&self) -> actix_web::http::StatusCode {
        actix_web::http::StatusCode::FOUND
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::Found()
            .insert_header((header::LOCATION, login_url(&self.next)))
            .finish()
    }
}

/// Bearer header first, then the session cookie. Other `Authorization`
/// schemes, such as Basic auth added by a proxy, are skipped.
fn session_token(req: &HttpRequest) -> Result<String, AuthError> {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    if let Some(token) = bearer {
        return Ok(token.to_string());
    }

    req.cookie(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or(AuthError::MissingAuth)
}

fn authenticate(req: &HttpRequest) -> Result<CurrentUser, AuthError> {
    let Some(tokens) = req.app_data::<web::Data<Arc<dyn TokenService>>>() else {
        tracing::error!("TokenService not found in app data");
        return Err(AuthError::InvalidToken(
            "Server configuration error".to_string(),
        ));
    };

    let token = session_token(req)?;
    tokens.validate_token(&token).map(CurrentUser::from)
}

/// Outer error: the account lookup failed. Inner error: no usable session.
type SessionResult = Result<Result<CurrentUser, AuthError>, AppError>;

/// Validate the token, then check that its account still exists.
fn resolve_session(req: &HttpRequest) -> impl Future<Output = SessionResult> + 'static {
    let claims = authenticate(req);
    let state = req.app_data::<web::Data<AppState>>().cloned();

    async move {
        let user = match claims {
            Ok(user) => user,
            Err(reason) => return Ok(Err(reason)),
        };
        let Some(state) = state else {
            return Err(AppError::Internal("AppState not found in app data".to_string()));
        };

        if state.accounts.is_active(user.user_id).await? {
            Ok(Ok(user))
        } else {
            tracing::debug!(user_id = %user.user_id, "Session for a deleted account");
            Ok(Err(AuthError::InvalidToken("account no longer exists".to_string())))
        }
    }
}

impl FromRequest for CurrentUser {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let next = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.path().to_string());
        let session = resolve_session(req);

        Box::pin(async move {
            match session.await? {
                Ok(user) => Ok(user),
                Err(reason) => {
                    tracing::debug!(next = %next, reason = %reason, "Redirecting to login");
                    Err(LoginRequired { next, reason }.into())
                }
            }
        })
    }
}

/// Optional session - anonymous when the token is missing or invalid, or
/// its account is gone.
pub struct OptionalUser(pub Option<CurrentUser>);

impl OptionalUser {
    pub fn user_id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|user| user.user_id)
    }
}

impl FromRequest for OptionalUser {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let session = resolve_session(req);
        Box::pin(async move { Ok(OptionalUser(session.await?.ok())) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_url_encodes_next() {
        assert_eq!(login_url("/new"), "/auth/login?next=%2Fnew");
        assert_eq!(
            login_url("/follow?page=2"),
            "/auth/login?next=%2Ffollow%3Fpage%3D2"
        );
    }

    #[test]
    fn test_non_bearer_header_falls_back_to_cookie() {
        use actix_web::cookie::Cookie;
        use actix_web::test::TestRequest;

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Basic cHJveHk6cHJveHk="))
            .cookie(Cookie::new(SESSION_COOKIE, "session-token"))
            .to_http_request();
        assert_eq!(session_token(&req).unwrap(), "session-token");

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer header-token"))
            .cookie(Cookie::new(SESSION_COOKIE, "session-token"))
            .to_http_request();
        assert_eq!(session_token(&req).unwrap(), "header-token");

        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Basic cHJveHk6cHJveHk="))
            .to_http_request();
        assert!(matches!(session_token(&req), Err(AuthError::MissingAuth)));
    }

    #[test]
    fn test_login_required_redirects() {
        use actix_web::ResponseError;

        let rejection = LoginRequired {
            next: "/new".to_string(),
            reason: AuthError::MissingAuth,
        };
        let response = rejection.error_response();

        assert_eq!(response.status(), actix_web::http::StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/auth/login?next=%2Fnew"
        );
    }
}
