//! HTTP handlers and route configuration.

mod auth;
mod comments;
mod feed;
mod follows;
mod health;
pub mod multipart;
mod posts;

use actix_web::{HttpResponse, http::header, web};
use url::Url;

use crate::middleware::error::{AppError, AppResult};

/// Configure all application routes.
///
/// Literal paths are registered before the `{username}` patterns they would
/// otherwise be captured by.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Operator routes
        .route("/health", web::get().to(health::health_check))
        // Auth routes
        .service(
            web::scope("/auth")
                .route("/signup", web::post().to(auth::signup))
                .service(
                    web::resource("/login")
                        .route(web::get().to(auth::login_form))
                        .route(web::post().to(auth::login)),
                )
                .route("/logout", web::post().to(auth::logout)),
        )
        // Feeds and forms
        .route("/", web::get().to(feed::index))
        .route("/group/{slug}", web::get().to(feed::group_posts))
        .service(
            web::resource("/new")
                .route(web::get().to(posts::new_form))
                .route(web::post().to(posts::create)),
        )
        .route("/follow", web::get().to(feed::follow_index))
        // Per-user routes
        .route("/{username}", web::get().to(feed::profile))
        .route("/{username}/follow", web::post().to(follows::follow))
        .route("/{username}/unfollow", web::post().to(follows::unfollow))
        .route("/{username}/{post_id}", web::get().to(feed::post_detail))
        .service(
            web::resource("/{username}/{post_id}/edit")
                .route(web::get().to(posts::edit_form))
                .route(web::post().to(posts::update)),
        )
        .route(
            "/{username}/{post_id}/comment",
            web::post().to(comments::add_comment),
        );
}

/// 302 to `location`.
pub(crate) fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

/// Site-relative path built from raw segments, percent-encoded as needed.
pub(crate) fn site_path(segments: &[&str]) -> AppResult<String> {
    let mut url = Url::parse("http://quill.local/").map_err(|e| AppError::Internal(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| AppError::Internal("base URL cannot hold a path".to_string()))?
        .clear()
        .extend(segments);

    Ok(url.path().to_string())
}

pub(crate) fn profile_path(username: &str) -> AppResult<String> {
    site_path(&[username])
}

pub(crate) fn post_path(username: &str, post_id: i64) -> AppResult<String> {
    site_path(&[username, &post_id.to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_path() {
        assert_eq!(post_path("tester", 3).unwrap(), "/tester/3");
    }

    #[test]
    fn test_profile_path_encodes_segment() {
        assert_eq!(profile_path("a b").unwrap(), "/a%20b");
        assert_eq!(profile_path("лев").unwrap(), "/%D0%BB%D0%B5%D0%B2");
    }
}
