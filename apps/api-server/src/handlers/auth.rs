//! Registration, login and logout.

use actix_web::{HttpResponse, web};
use chrono::Utc;

use quill_core::domain::User;
use quill_core::validation::Validator;
use quill_shared::MessageResponse;
use quill_shared::dto::{AuthResponse, LoginRequest, RegisterRequest};

use super::{presenter, secret};
use crate::middleware::{AppError, AppResult, Identity};
use crate::state::AppState;

const MIN_PASSWORD_CHARS: usize = 8;

fn issue(state: &AppState, user: User) -> AppResult<AuthResponse> {
    let token = state.tokens.generate_token(user.id, &user.email)?;
    Ok(AuthResponse {
        user: presenter::user(user, state.storage.as_ref()),
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.tokens.expiration_seconds().max(0) as u64,
    })
}

/// POST /api/register
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let mut v = Validator::new();

    let name = v.required("name", req.name.as_deref());
    if let Some(name) = &name {
        v.max_chars("name", name, 255);
    }
    let username = v.required("username", req.username.as_deref());
    if let Some(username) = &username {
        v.max_chars("username", username, 255);
    }
    let email = v.required("email", req.email.as_deref());
    if let Some(email) = &email {
        if v.email("email", email) {
            v.max_chars("email", email, 255);
        }
    }
    let password = secret(&mut v, "password", req.password.as_deref());
    if let Some(password) = &password {
        if v.min_chars("password", password, MIN_PASSWORD_CHARS) {
            v.confirmed("password", password, req.password_confirmation.as_deref());
        }
    }

    if let Some(username) = username.as_deref().filter(|_| !v.has_error("username")) {
        if state.users.find_by_username(username).await?.is_some() {
            v.fail("username", "The username has already been taken.");
        }
    }
    if let Some(email) = email.as_deref().filter(|_| !v.has_error("email")) {
        if state.users.find_by_email(email).await?.is_some() {
            v.fail("email", "The email has already been taken.");
        }
    }
    v.finish()?;

    let (Some(name), Some(username), Some(email), Some(password)) =
        (name, username, email, password)
    else {
        return Err(AppError::Internal("validated fields missing".to_string()));
    };

    let hash = state.passwords.hash(&password)?;
    let user = state
        .users
        .save(User::new(name, username, email, hash))
        .await?;
    tracing::info!(user_id = %user.id, "User registered");

    Ok(HttpResponse::Created().json(issue(&state, user)?))
}

/// POST /api/login
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let mut v = Validator::new();
    let email = v.required("email", req.email.as_deref());
    let password = secret(&mut v, "password", req.password.as_deref());
    v.finish()?;

    let (Some(email), Some(password)) = (email, password) else {
        return Err(AppError::Internal("validated fields missing".to_string()));
    };

    let rejected = || AppError::Unauthorized("Invalid login details".to_string());
    let user = state.users.find_by_email(&email).await?.ok_or_else(rejected)?;
    if !state.passwords.verify(&password, &user.password_hash)? {
        tracing::info!(email = %quill_core::domain::mask_email(&email), "Failed login");
        return Err(rejected());
    }
    let user = upgrade_hash(&state, user, &password).await;

    Ok(HttpResponse::Ok().json(issue(&state, user)?))
}

/// Re-hash a verified password made with older cost settings. Failures only
/// cost the upgrade, never the login.
async fn upgrade_hash(state: &AppState, user: User, password: &str) -> User {
    if !state.passwords.needs_rehash(&user.password_hash) {
        return user;
    }
    let hash = match state.passwords.hash(password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::warn!(user_id = %user.id, error = %e, "Password rehash failed");
            return user;
        }
    };

    let mut upgraded = user.clone();
    upgraded.password_hash = hash;
    match state.users.save(upgraded).await {
        Ok(saved) => {
            tracing::info!(user_id = %saved.id, "Password hash upgraded");
            saved
        }
        Err(e) => {
            tracing::warn!(user_id = %user.id, error = %e, "Storing upgraded hash failed");
            user
        }
    }
}

/// POST /api/logout
///
/// Revokes only the presented token; other sessions stay signed in.
pub async fn logout(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    let ttl = identity.claims().remaining_lifetime(Utc::now().timestamp());
    state.revocations.revoke(&identity.token_id, ttl).await?;
    tracing::info!(user_id = %identity.user_id, "Logged out");

    Ok(HttpResponse::Ok().json(MessageResponse::new("Logged out successfully")))
}
