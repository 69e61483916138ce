//! The signed-in user's profile, password and dashboard.

use actix_web::{HttpRequest, HttpResponse, web};

use quill_core::domain::{MAX_IMAGE_KB, ProfileChanges, SocialLink, UploadedFile, User};
use quill_core::pagination::{DEFAULT_PER_PAGE, PageRequest};
use quill_core::validation::Validator;
use quill_shared::MessageResponse;
use quill_shared::dto::{PageQuery, UpdatePasswordRequest, UpdateProfileRequest, UserStatsResponse};

use super::forms::read_form;
use super::posts::discard_file;
use super::{current_user, presenter, secret};
use crate::middleware::{AppError, AppResult, Identity};
use crate::state::AppState;

const AVATAR_DIR: &str = "avatars";

/// GET /api/user
pub async fn show(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    let user = current_user(&state, &identity).await?;
    Ok(HttpResponse::Ok().json(presenter::user(user, state.storage.as_ref())))
}

/// Absent optional fields keep their stored value, blank ones clear it.
fn keep_or_replace(v: &Validator, submitted: Option<&str>, stored: &Option<String>) -> Option<String> {
    match submitted {
        None => stored.clone(),
        Some(raw) => v.optional(Some(raw)),
    }
}

async fn validate_profile(
    state: &AppState,
    user: &User,
    req: UpdateProfileRequest,
    avatar: Option<UploadedFile>,
) -> AppResult<(ProfileChanges, Option<(UploadedFile, &'static str)>)> {
    let mut v = Validator::new();

    let name = v.required("name", req.name.as_deref());
    if let Some(name) = &name {
        v.max_chars("name", name, 255);
    }

    let username = v.required("username", req.username.as_deref());
    if let Some(username) = &username {
        if v.max_chars("username", username, 255) {
            let taken = state.users.find_by_username(username).await?;
            if taken.is_some_and(|other| other.id != user.id) {
                v.fail("username", "The username has already been taken.");
            }
        }
    }

    let email = v.required("email", req.email.as_deref());
    if let Some(email) = &email {
        if v.email("email", email) && v.max_chars("email", email, 255) {
            let taken = state.users.find_by_email(email).await?;
            if taken.is_some_and(|other| other.id != user.id) {
                v.fail("email", "The email has already been taken.");
            }
        }
    }

    let bio = keep_or_replace(&v, req.bio.as_deref(), &user.bio);
    if let Some(bio) = &bio {
        v.max_chars("bio", bio, 500);
    }

    let website = keep_or_replace(&v, req.website.as_deref(), &user.website);
    if let Some(website) = &website {
        if v.url("website", website) {
            v.max_chars("website", website, 255);
        }
    }

    let social_links = match req.social_links {
        None => user.social_links.clone(),
        Some(links) => {
            let mut valid = Vec::with_capacity(links.len());
            for (i, link) in links.iter().enumerate() {
                let platform_field = format!("social_links.{i}.platform");
                let url_field = format!("social_links.{i}.url");
                let platform = v.required(&platform_field, link.platform.as_deref());
                let url = v.required(&url_field, link.url.as_deref());
                let url = url.filter(|u| v.url(&url_field, u));
                if let (Some(platform), Some(url)) = (platform, url) {
                    valid.push(SocialLink { platform, url });
                }
            }
            valid
        }
    };

    let avatar = match avatar {
        None => None,
        Some(file) => match file.image_extension("avatar", MAX_IMAGE_KB) {
            Ok(extension) => Some((file, extension)),
            Err(message) => {
                v.fail("avatar", message);
                None
            }
        },
    };

    v.finish()?;

    match (name, username, email) {
        (Some(name), Some(username), Some(email)) => Ok((
            ProfileChanges {
                name,
                username,
                email,
                bio,
                website,
                social_links,
            },
            avatar,
        )),
        _ => Err(AppError::Internal("validated fields missing".to_string())),
    }
}

/// PUT /api/user/profile (JSON or multipart with an `avatar` file)
pub async fn update_profile(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
    identity: Identity,
) -> AppResult<HttpResponse> {
    let mut user = current_user(&state, &identity).await?;
    let mut form = read_form::<UpdateProfileRequest>(&req, payload).await?;

    let avatar = form.take_file("avatar");
    let (changes, avatar) = validate_profile(&state, &user, form.data, avatar).await?;

    let stored = match avatar {
        Some((file, extension)) => Some(state.storage.put(AVATAR_DIR, &file, extension).await?),
        None => None,
    };
    let replaced = match &stored {
        Some(path) => user.avatar.replace(path.clone()),
        None => None,
    };
    user.apply_profile(changes);
    let user = match state.users.save(user).await {
        Ok(user) => user,
        Err(e) => {
            discard_file(&state, stored.as_deref()).await;
            return Err(e.into());
        }
    };
    discard_file(&state, replaced.as_deref()).await;
    tracing::info!(user_id = %user.id, "Profile updated");

    Ok(HttpResponse::Ok().json(presenter::user(user, state.storage.as_ref())))
}

/// PUT /api/user/password
pub async fn update_password(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<UpdatePasswordRequest>,
) -> AppResult<HttpResponse> {
    let mut user = current_user(&state, &identity).await?;
    let req = body.into_inner();
    let mut v = Validator::new();

    if let Some(current) = secret(&mut v, "current_password", req.current_password.as_deref()) {
        if !state.passwords.verify(&current, &user.password_hash)? {
            v.fail("current_password", "The password is incorrect.");
        }
    }
    let password = secret(&mut v, "password", req.password.as_deref());
    if let Some(password) = &password {
        if v.min_chars("password", password, 8) {
            v.confirmed("password", password, req.password_confirmation.as_deref());
        }
    }
    v.finish()?;

    let Some(password) = password else {
        return Err(AppError::Internal("validated fields missing".to_string()));
    };
    user.password_hash = state.passwords.hash(&password)?;
    user.touch();
    state.users.save(user).await?;

    Ok(HttpResponse::Ok().json(MessageResponse::new("Password updated successfully")))
}

/// GET /api/user/stats
pub async fn stats(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    let stats = state.posts.author_stats(identity.user_id).await?;
    Ok(HttpResponse::Ok().json(UserStatsResponse {
        posts: stats.posts,
        likes: stats.likes,
        comments: stats.comments,
    }))
}

/// GET /api/user/posts
pub async fn posts(
    state: web::Data<AppState>,
    identity: Identity,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let page = PageRequest::new(query.page, DEFAULT_PER_PAGE);
    let results = state.posts.paginate_by_author(identity.user_id, page).await?;

    let storage = state.storage.as_ref();
    Ok(HttpResponse::Ok().json(presenter::paginated(results, |s| {
        presenter::user_post(s, storage)
    })))
}
