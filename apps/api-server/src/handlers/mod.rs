//! HTTP handlers and route configuration.

mod auth;
mod comments;
mod forms;
mod health;
mod posts;
mod presenter;
mod taxonomy;
mod users;

#[cfg(test)]
mod tests;

use actix_web::web;
use uuid::Uuid;

use quill_core::domain::User;
use quill_core::validation::Validator;

use crate::middleware::{AppError, AppResult, Identity, RateLimit};
use crate::state::AppState;

const MAX_JSON_BYTES: usize = 256 * 1024;

/// Path ids that are not UUIDs cannot name a row, so they are plain 404s.
fn parse_id(raw: &str, entity: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(format!("{entity} with id {raw} not found")))
}

/// Password fields are taken verbatim, never trimmed.
fn secret(v: &mut Validator, field: &str, value: Option<&str>) -> Option<String> {
    match value.filter(|s| !s.is_empty()) {
        Some(s) => Some(s.to_string()),
        None => {
            v.required(field, None);
            None
        }
    }
}

/// Query string booleans: absent, empty, `0` and `false` are false.
fn flag(raw: Option<&str>) -> bool {
    raw.map(str::trim)
        .is_some_and(|s| !s.is_empty() && s != "0" && !s.eq_ignore_ascii_case("false"))
}

/// The account behind a token; a deleted account invalidates its tokens.
async fn current_user(state: &AppState, identity: &Identity) -> AppResult<User> {
    state
        .users
        .find_by_id(identity.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Unauthenticated.".to_string()))
}

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(MAX_JSON_BYTES)
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .service(
        web::scope("/api")
            .route("/health", web::get().to(health::health_check))
            // Credentials
            .service(
                web::resource("/register")
                    .wrap(RateLimit::new("register"))
                    .route(web::post().to(auth::register)),
            )
            .service(
                web::resource("/login")
                    .wrap(RateLimit::new("login"))
                    .route(web::post().to(auth::login)),
            )
            .route("/logout", web::post().to(auth::logout))
            // Current user
            .route("/user", web::get().to(users::show))
            .service(
                web::resource("/user/profile")
                    .route(web::put().to(users::update_profile))
                    // Form clients tunnel PUT through POST.
                    .route(web::post().to(users::update_profile)),
            )
            .route("/user/password", web::put().to(users::update_password))
            .route("/user/stats", web::get().to(users::stats))
            .route("/user/posts", web::get().to(users::posts))
            // Taxonomy
            .route("/categories", web::get().to(taxonomy::categories))
            .route("/tags", web::get().to(taxonomy::tags))
            // Posts
            .service(
                web::resource("/posts")
                    .route(web::get().to(posts::index))
                    .route(web::post().to(posts::store)),
            )
            .service(
                web::resource("/posts/{id}")
                    .route(web::get().to(posts::show))
                    .route(web::put().to(posts::update))
                    .route(web::post().to(posts::update))
                    .route(web::delete().to(posts::destroy)),
            )
            .route("/posts/{id}/like", web::post().to(posts::like))
            .route("/posts/{id}/unlike", web::post().to(posts::unlike))
            .service(
                web::resource("/posts/{id}/comments")
                    .route(web::get().to(comments::index))
                    .route(web::post().to(comments::store)),
            )
            .service(
                web::resource("/comments/{id}")
                    .route(web::put().to(comments::update))
                    .route(web::delete().to(comments::destroy)),
            ),
    );
}
