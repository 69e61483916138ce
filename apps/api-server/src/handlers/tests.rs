//! End-to-end handler tests against the in-memory state.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{App, http::StatusCode, http::header, test, web};
use async_trait::async_trait;
use serde_json::{Value, json};
use uuid::Uuid;

use quill_core::domain::{
    AuthorStats, Category, Post, PostChanges, PostDetails, PostFilter, PostStatus, PostSummary,
    Tag, User,
};
use quill_core::error::RepoError;
use quill_core::pagination::{Page, PageRequest};
use quill_core::ports::{BaseRepository, PasswordService, PostRepository, UserRepository};
use quill_infra::{
    Argon2PasswordService, InMemoryStorage, JwtConfig, PasswordConfig, RateLimitConfig,
};
use quill_shared::ErrorResponse;

use super::configure_routes;
use crate::state::AppState;

const PASSWORD: &str = "password123";

const CHEAP_HASHING: PasswordConfig = PasswordConfig {
    memory_kib: 1024,
    iterations: 1,
    parallelism: 1,
};

fn state_with_limit(max_requests: u32) -> AppState {
    AppState::in_memory(
        JwtConfig {
            secret: "handler-test-secret".into(),
            expiration_hours: 1,
            issuer: "quill-test".into(),
        },
        CHEAP_HASHING,
        RateLimitConfig {
            max_requests,
            window: Duration::from_secs(60),
        },
    )
    .unwrap()
}

fn state() -> AppState {
    state_with_limit(1_000)
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state.clone()))
                .configure(configure_routes),
        )
        .await
    };
}

/// A stored user plus a bearer token for them.
async fn member(state: &AppState, username: &str) -> (User, String) {
    let hash = state.passwords.hash(PASSWORD).unwrap();
    let user = state
        .users
        .save(User::new(
            username.to_string(),
            username.to_string(),
            format!("{username}@example.com"),
            hash,
        ))
        .await
        .unwrap();
    let token = state.tokens.generate_token(user.id, &user.email).unwrap();
    (user, token)
}

fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {token}"))
}

async fn category(state: &AppState) -> Category {
    state
        .categories
        .save(Category::new("Technology", None))
        .await
        .unwrap()
}

async fn post(state: &AppState, author: &User, category: &Category, status: PostStatus) -> Post {
    let title = format!("{} post by {}", status, author.username);
    let post = Post::new(
        author.id,
        PostChanges {
            title: title.clone(),
            content: "Body text".into(),
            category_id: category.id,
            status,
            tags: None,
        },
        quill_core::slug::slugify(&title),
    );
    state.posts.save(post).await.unwrap()
}

/// Storage the test keeps a handle on, so it can count what is left behind.
fn observed_storage(state: &mut AppState) -> Arc<InMemoryStorage> {
    let storage = Arc::new(InMemoryStorage::new("http://localhost"));
    state.storage = storage.clone();
    storage
}

fn slug_taken() -> RepoError {
    RepoError::Constraint("duplicate key value violates unique constraint \"posts_slug_key\"".into())
}

/// Reads go to the real posts table; every write loses a unique-key race.
struct ContendedPosts(Arc<dyn PostRepository>);

#[async_trait]
impl BaseRepository<Post, Uuid> for ContendedPosts {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        self.0.find_by_id(id).await
    }

    async fn save(&self, _post: Post) -> Result<Post, RepoError> {
        Err(slug_taken())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.0.delete(id).await
    }
}

#[async_trait]
impl PostRepository for ContendedPosts {
    async fn paginate(
        &self,
        filter: &PostFilter,
        page: PageRequest,
    ) -> Result<Page<PostDetails>, RepoError> {
        self.0.paginate(filter, page).await
    }

    async fn find_details(&self, id: Uuid) -> Result<Option<PostDetails>, RepoError> {
        self.0.find_details(id).await
    }

    async fn slug_exists(&self, slug: &str, except: Option<Uuid>) -> Result<bool, RepoError> {
        self.0.slug_exists(slug, except).await
    }

    async fn save_with_tags(
        &self,
        _post: Post,
        _tag_ids: Option<&[Uuid]>,
    ) -> Result<Post, RepoError> {
        Err(slug_taken())
    }

    async fn increment_view_count(&self, id: Uuid) -> Result<(), RepoError> {
        self.0.increment_view_count(id).await
    }

    async fn adjust_like_count(&self, id: Uuid, delta: i64) -> Result<i64, RepoError> {
        self.0.adjust_like_count(id, delta).await
    }

    async fn paginate_by_author(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<PostSummary>, RepoError> {
        self.0.paginate_by_author(user_id, page).await
    }

    async fn author_stats(&self, user_id: Uuid) -> Result<AuthorStats, RepoError> {
        self.0.author_stats(user_id).await
    }

    async fn all(&self) -> Result<Vec<Post>, RepoError> {
        self.0.all().await
    }
}

/// Reads go to the real users table; every save hits a unique email.
struct ContendedUsers(Arc<dyn UserRepository>);

#[async_trait]
impl BaseRepository<User, Uuid> for ContendedUsers {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        self.0.find_by_id(id).await
    }

    async fn save(&self, _user: User) -> Result<User, RepoError> {
        Err(RepoError::Constraint("users_email_key".into()))
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.0.delete(id).await
    }
}

#[async_trait]
impl UserRepository for ContendedUsers {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        self.0.find_by_email(email).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        self.0.find_by_username(username).await
    }

    async fn all(&self) -> Result<Vec<User>, RepoError> {
        self.0.all().await
    }
}

fn multipart(boundary: &str, fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((name, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"upload\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}

// ── Auth ──

#[actix_rt::test]
async fn register_then_fetch_current_user() {
    let state = state();
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/api/register")
        .set_json(json!({
            "name": "Ada Lovelace",
            "username": "ada",
            "email": "ada@example.com",
            "password": PASSWORD,
            "password_confirmation": PASSWORD,
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["user"].get("password_hash").is_none());
    let token = body["token"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri("/api/user")
        .insert_header(bearer(&token))
        .to_request();
    let me: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(me["username"], "ada");
    assert_eq!(me["social_links"], json!([]));
}

#[actix_rt::test]
async fn register_reports_every_invalid_field() {
    let state = state();
    member(&state, "taken").await;
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/api/register")
        .set_json(json!({
            "username": "taken",
            "email": "not-an-email",
            "password": "short",
            "password_confirmation": "short",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: ErrorResponse = test::read_body_json(resp).await;
    assert_eq!(body.first_error("name"), Some("The name field is required."));
    assert_eq!(
        body.first_error("username"),
        Some("The username has already been taken.")
    );
    assert_eq!(
        body.first_error("email"),
        Some("The email field must be a valid email address.")
    );
    assert_eq!(
        body.first_error("password"),
        Some("The password field must be at least 8 characters.")
    );
}

#[actix_rt::test]
async fn login_with_wrong_password_is_unauthorized() {
    let state = state();
    member(&state, "ada").await;
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/api/login")
        .set_json(json!({ "email": "ada@example.com", "password": "wrong-password" }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );

    let req = test::TestRequest::post()
        .uri("/api/login")
        .set_json(json!({ "email": "ada@example.com", "password": PASSWORD }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
}

#[actix_rt::test]
async fn login_upgrades_hashes_from_older_settings() {
    let state = state();
    let older = Argon2PasswordService::new(PasswordConfig {
        memory_kib: 2048,
        ..CHEAP_HASHING
    })
    .unwrap();
    let legacy = state
        .users
        .save(User::new(
            "Old Timer".into(),
            "oldtimer".into(),
            "old@example.com".into(),
            older.hash(PASSWORD).unwrap(),
        ))
        .await
        .unwrap();
    let (current, _) = member(&state, "ada").await;
    let app = app!(state);

    for email in ["old@example.com", "ada@example.com"] {
        let req = test::TestRequest::post()
            .uri("/api/login")
            .set_json(json!({ "email": email, "password": PASSWORD }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    let upgraded = state.users.find_by_id(legacy.id).await.unwrap().unwrap();
    assert_ne!(upgraded.password_hash, legacy.password_hash);
    assert!(upgraded.password_hash.contains("m=1024,"));
    assert!(state.passwords.verify(PASSWORD, &upgraded.password_hash).unwrap());

    let untouched = state.users.find_by_id(current.id).await.unwrap().unwrap();
    assert_eq!(untouched.password_hash, current.password_hash);
}

#[actix_rt::test]
async fn logout_revokes_only_the_presented_token() {
    let state = state();
    let (user, token) = member(&state, "ada").await;
    let other_session = state.tokens.generate_token(user.id, &user.email).unwrap();
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/api/logout")
        .insert_header(bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], "Logged out successfully");

    let req = test::TestRequest::get()
        .uri("/api/user")
        .insert_header(bearer(&token))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );

    let req = test::TestRequest::get()
        .uri("/api/user")
        .insert_header(bearer(&other_session))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn login_is_rate_limited_per_client() {
    let state = state_with_limit(2);
    let app = app!(state);

    let attempt = || {
        test::TestRequest::post()
            .uri("/api/login")
            .set_json(json!({ "email": "nobody@example.com", "password": "whatever1" }))
            .to_request()
    };

    for _ in 0..2 {
        let resp = test::call_service(&app, attempt()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
    let resp = test::call_service(&app, attempt()).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(resp.headers().contains_key("Retry-After"));
}

// ── Posts ──

#[actix_rt::test]
async fn creating_posts_requires_a_token() {
    let state = state();
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .set_json(json!({ "title": "Nope" }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[actix_rt::test]
async fn duplicate_titles_get_numbered_slugs() {
    let state = state();
    let (_, token) = member(&state, "ada").await;
    let category = category(&state).await;
    let tag = state.tags.save(Tag::new("Rust")).await.unwrap();
    let app = app!(state);

    let mut slugs = Vec::new();
    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/api/posts")
            .insert_header(bearer(&token))
            .set_json(json!({
                "title": "Hello World",
                "content": "First!",
                "category_id": category.id,
                "status": "published",
                "tags": [tag.id, tag.id],
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["tags"].as_array().unwrap().len(), 1);
        assert_eq!(body["category"]["name"], "Technology");
        slugs.push(body["slug"].as_str().unwrap().to_string());
    }

    assert_eq!(slugs, vec!["hello-world", "hello-world-2"]);
}

#[actix_rt::test]
async fn post_validation_checks_references() {
    let state = state();
    let (_, token) = member(&state, "ada").await;
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header(bearer(&token))
        .set_json(json!({
            "title": "Hello",
            "content": "Body",
            "category_id": Uuid::new_v4(),
            "status": "archived",
            "tags": ["nope"],
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: ErrorResponse = test::read_body_json(resp).await;
    assert_eq!(
        body.first_error("category_id"),
        Some("The selected category id is invalid.")
    );
    assert_eq!(body.first_error("status"), Some("The selected status is invalid."));
    assert_eq!(body.first_error("tags.0"), Some("The selected tags.0 is invalid."));
}

#[actix_rt::test]
async fn drafts_are_hidden_from_everyone_but_the_author() {
    let state = state();
    let (author, author_token) = member(&state, "ada").await;
    let (_, reader_token) = member(&state, "bob").await;
    let category = category(&state).await;
    let draft = post(&state, &author, &category, PostStatus::Draft).await;
    post(&state, &author, &category, PostStatus::Published).await;
    let app = app!(state);

    let uri = format!("/api/posts/{}", draft.id);
    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header(bearer(&reader_token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header(bearer(&author_token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "draft");

    let req = test::TestRequest::get().uri("/api/posts").to_request();
    let listing: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listing["total"], 1);

    let req = test::TestRequest::get()
        .uri("/api/posts")
        .insert_header(bearer(&author_token))
        .to_request();
    let listing: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listing["total"], 2);

    let req = test::TestRequest::get()
        .uri("/api/posts?public=1")
        .insert_header(bearer(&author_token))
        .to_request();
    let listing: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listing["total"], 1);
}

#[actix_rt::test]
async fn viewing_a_post_counts_the_view() {
    let state = state();
    let (author, _) = member(&state, "ada").await;
    let category = category(&state).await;
    let published = post(&state, &author, &category, PostStatus::Published).await;
    let app = app!(state);

    let uri = format!("/api/posts/{}", published.id);
    test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    let body: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri(&uri).to_request()).await;

    assert_eq!(body["view_count"], 2);
}

#[actix_rt::test]
async fn only_the_author_may_edit_or_delete() {
    let state = state();
    let (author, _) = member(&state, "ada").await;
    let (_, intruder) = member(&state, "mallory").await;
    let category = category(&state).await;
    let published = post(&state, &author, &category, PostStatus::Published).await;
    let app = app!(state);

    let uri = format!("/api/posts/{}", published.id);
    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header(bearer(&intruder))
        .set_json(json!({
            "title": "Mine now",
            "content": "x",
            "category_id": category.id,
            "status": "published",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: ErrorResponse = test::read_body_json(resp).await;
    assert_eq!(body.detail.as_deref(), Some("Unauthorized"));

    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header(bearer(&intruder))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
}

#[actix_rt::test]
async fn update_renames_slug_and_replaces_tags() {
    let state = state();
    let (author, token) = member(&state, "ada").await;
    let category = category(&state).await;
    let rust = state.tags.save(Tag::new("Rust")).await.unwrap();
    let web_tag = state.tags.save(Tag::new("Web")).await.unwrap();
    let published = post(&state, &author, &category, PostStatus::Published).await;
    state
        .posts
        .save_with_tags(published.clone(), Some(&[rust.id][..]))
        .await
        .unwrap();
    let app = app!(state);

    let req = test::TestRequest::put()
        .uri(&format!("/api/posts/{}", published.id))
        .insert_header(bearer(&token))
        .set_json(json!({
            "title": "A Brand New Title",
            "content": "Edited",
            "category_id": category.id,
            "status": "draft",
            "tags": [web_tag.id],
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["slug"], "a-brand-new-title");
    assert_eq!(body["status"], "draft");
    assert_eq!(body["tags"][0]["name"], "Web");
    assert_eq!(body["tags"].as_array().unwrap().len(), 1);
}

#[actix_rt::test]
async fn multipart_post_stores_featured_image() {
    let state = state();
    let (_, token) = member(&state, "ada").await;
    let category = category(&state).await;
    let tag = state.tags.save(Tag::new("Rust")).await.unwrap();
    let app = app!(state);

    let category_id = category.id.to_string();
    let tag_id = tag.id.to_string();
    let boundary = "quill-test-boundary";
    let body = multipart(
        boundary,
        &[
            ("title", "With Picture"),
            ("content", "Look"),
            ("category_id", &category_id),
            ("status", "published"),
            ("tags[]", &tag_id),
        ],
        Some(("featured_image", "image/png", &b"\x89PNG fake"[..])),
    );
    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header(bearer(&token))
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        ))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = test::read_body_json(resp).await;
    let path = body["featured_image"].as_str().unwrap();
    assert!(path.starts_with("posts/") && path.ends_with(".png"));
    assert_eq!(
        body["featured_image_url"],
        format!("http://localhost/storage/{path}")
    );
    assert_eq!(body["tags"][0]["id"], tag_id);
}

fn post_form(category_id: &str, tag_id: &str) -> (String, Vec<u8>) {
    let boundary = "race-boundary";
    let body = multipart(
        boundary,
        &[
            ("title", "Raced"),
            ("content", "Body"),
            ("category_id", category_id),
            ("status", "published"),
            ("tags[]", tag_id),
        ],
        Some(("featured_image", "image/jpeg", &b"\xff\xd8\xff fake"[..])),
    );
    (format!("multipart/form-data; boundary={boundary}"), body)
}

#[actix_rt::test]
async fn failed_post_writes_leave_no_post_tags_or_files() {
    let mut state = state();
    let (author, token) = member(&state, "ada").await;
    let category = category(&state).await;
    let tag = state.tags.save(Tag::new("Rust")).await.unwrap();
    let existing = post(&state, &author, &category, PostStatus::Published).await;
    let storage = observed_storage(&mut state);
    state.posts = Arc::new(ContendedPosts(state.posts.clone()));
    let app = app!(state);

    let (content_type, body) = post_form(&category.id.to_string(), &tag.id.to_string());
    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header(bearer(&token))
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    let (content_type, body) = post_form(&category.id.to_string(), &tag.id.to_string());
    let req = test::TestRequest::post()
        .uri(&format!("/api/posts/{}", existing.id))
        .insert_header(bearer(&token))
        .insert_header((header::CONTENT_TYPE, content_type))
        .set_payload(body)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    assert_eq!(storage.len().await, 0);
    let details = state.posts.find_details(existing.id).await.unwrap().unwrap();
    assert_eq!(details.post.title, existing.title);
    assert!(details.tags.is_empty());
    assert_eq!(state.posts.all().await.unwrap().len(), 1);
}

#[actix_rt::test]
async fn non_image_upload_is_rejected() {
    let state = state();
    let (_, token) = member(&state, "ada").await;
    let category = category(&state).await;
    let app = app!(state);

    let category_id = category.id.to_string();
    let boundary = "b0undary";
    let body = multipart(
        boundary,
        &[
            ("title", "Doc"),
            ("content", "x"),
            ("category_id", &category_id),
            ("status", "draft"),
        ],
        Some(("featured_image", "application/pdf", &b"%PDF-1.4"[..])),
    );
    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header(bearer(&token))
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        ))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: ErrorResponse = test::read_body_json(resp).await;
    assert_eq!(
        body.first_error("featured_image"),
        Some("The featured image field must be an image.")
    );
}

#[actix_rt::test]
async fn likes_never_drop_below_zero() {
    let state = state();
    let (author, token) = member(&state, "ada").await;
    let category = category(&state).await;
    let published = post(&state, &author, &category, PostStatus::Published).await;
    let app = app!(state);

    let call = |action: &str| {
        test::TestRequest::post()
            .uri(&format!("/api/posts/{}/{action}", published.id))
            .insert_header(bearer(&token))
            .to_request()
    };

    let body: Value = test::call_and_read_body_json(&app, call("like")).await;
    assert_eq!(body["likes"], 1);
    let body: Value = test::call_and_read_body_json(&app, call("unlike")).await;
    assert_eq!(body["likes"], 0);
    let body: Value = test::call_and_read_body_json(&app, call("unlike")).await;
    assert_eq!(body["likes"], 0);
}

#[actix_rt::test]
async fn unknown_or_malformed_post_ids_are_not_found() {
    let state = state();
    let app = app!(state);

    for uri in [
        format!("/api/posts/{}", Uuid::new_v4()),
        "/api/posts/123".to_string(),
    ] {
        let req = test::TestRequest::get().uri(&uri).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }
}

#[actix_rt::test]
async fn garbage_category_filter_matches_nothing() {
    let state = state();
    let (author, _) = member(&state, "ada").await;
    let category = category(&state).await;
    post(&state, &author, &category, PostStatus::Published).await;
    let app = app!(state);

    let req = test::TestRequest::get()
        .uri("/api/posts?category_id=abc")
        .to_request();
    let listing: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listing["total"], 0);

    let req = test::TestRequest::get()
        .uri(&format!("/api/posts?category_id={}&search=BODY", category.id))
        .to_request();
    let listing: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listing["total"], 1);
}

#[actix_rt::test]
async fn junk_page_numbers_fall_back_to_first_page() {
    let state = state();
    let (author, token) = member(&state, "ada").await;
    let category = category(&state).await;
    post(&state, &author, &category, PostStatus::Published).await;
    let app = app!(state);

    for uri in ["/api/posts?page=-1", "/api/posts?page=abc", "/api/posts?page=0"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK, "{uri}");
        let listing: Value = test::read_body_json(resp).await;
        assert_eq!(listing["current_page"], 1, "{uri}");
        assert_eq!(listing["data"].as_array().unwrap().len(), 1, "{uri}");
    }

    let req = test::TestRequest::get()
        .uri("/api/user/posts?page=-5")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let listing: Value = test::read_body_json(resp).await;
    assert_eq!(listing["current_page"], 1);
}

#[actix_rt::test]
async fn enormous_page_number_is_an_empty_page() {
    let state = state();
    let (author, _) = member(&state, "ada").await;
    let category = category(&state).await;
    post(&state, &author, &category, PostStatus::Published).await;
    let app = app!(state);

    let req = test::TestRequest::get()
        .uri("/api/posts?page=18446744073709551615")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let listing: Value = test::read_body_json(resp).await;
    assert!(listing["data"].as_array().unwrap().is_empty());
    assert_eq!(listing["total"], 1);
    assert_eq!(listing["last_page"], 1);
    assert!(listing["from"].is_null());
}

// ── Comments ──

#[actix_rt::test]
async fn replies_to_replies_join_the_root_thread() {
    let state = state();
    let (author, token) = member(&state, "ada").await;
    let category = category(&state).await;
    let published = post(&state, &author, &category, PostStatus::Published).await;
    let app = app!(state);

    let uri = format!("/api/posts/{}/comments", published.id);
    let comment = |body: Value| {
        test::TestRequest::post()
            .uri(&uri)
            .insert_header(bearer(&token))
            .set_json(body)
            .to_request()
    };

    let root: Value = test::call_and_read_body_json(&app, comment(json!({ "content": "Root" }))).await;
    let reply: Value = test::call_and_read_body_json(
        &app,
        comment(json!({ "content": "Reply", "parent_id": root["id"] })),
    )
    .await;
    let nested: Value = test::call_and_read_body_json(
        &app,
        comment(json!({ "content": "Nested", "parent_id": reply["id"] })),
    )
    .await;

    assert_eq!(reply["parent_id"], root["id"]);
    assert_eq!(nested["parent_id"], root["id"]);
    assert_eq!(nested["user"]["username"], "ada");

    let threads: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    let threads = threads.as_array().unwrap();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0]["replies"].as_array().unwrap().len(), 2);
    assert_eq!(threads[0]["replies"][0]["content"], "Reply");
}

#[actix_rt::test]
async fn parent_must_belong_to_the_same_post() {
    let state = state();
    let (author, token) = member(&state, "ada").await;
    let category = category(&state).await;
    let first = post(&state, &author, &category, PostStatus::Published).await;
    let second = post(&state, &author, &category, PostStatus::Draft).await;
    let foreign = state
        .comments
        .save(quill_core::domain::Comment::new(
            second.id,
            author.id,
            None,
            "Elsewhere".into(),
        ))
        .await
        .unwrap();
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri(&format!("/api/posts/{}/comments", first.id))
        .insert_header(bearer(&token))
        .set_json(json!({ "content": "Hi", "parent_id": foreign.id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: ErrorResponse = test::read_body_json(resp).await;
    assert_eq!(
        body.first_error("parent_id"),
        Some("The selected parent id is invalid.")
    );
}

#[actix_rt::test]
async fn comment_owner_edits_and_deletes() {
    let state = state();
    let (author, token) = member(&state, "ada").await;
    let (_, intruder) = member(&state, "mallory").await;
    let category = category(&state).await;
    let published = post(&state, &author, &category, PostStatus::Published).await;
    let comment = state
        .comments
        .save(quill_core::domain::Comment::new(
            published.id,
            author.id,
            None,
            "Original".into(),
        ))
        .await
        .unwrap();
    let app = app!(state);

    let uri = format!("/api/comments/{}", comment.id);
    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header(bearer(&intruder))
        .set_json(json!({ "content": "Defaced" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header(bearer(&token))
        .set_json(json!({ "content": "x".repeat(1001) }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNPROCESSABLE_ENTITY
    );

    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header(bearer(&token))
        .set_json(json!({ "content": "Edited" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["content"], "Edited");

    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header(bearer(&token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    assert!(state.comments.find_by_id(comment.id).await.unwrap().is_none());
}

// ── Users ──

#[actix_rt::test]
async fn profile_update_with_avatar_and_links() {
    let state = state();
    let (_, token) = member(&state, "ada").await;
    let app = app!(state);

    let boundary = "profile-boundary";
    let body = multipart(
        boundary,
        &[
            ("name", "Ada L."),
            ("username", "ada"),
            ("email", "ada@example.com"),
            ("bio", "Analyst"),
            ("social_links[0][platform]", "github"),
            ("social_links[0][url]", "https://github.com/ada"),
        ],
        Some(("avatar", "image/jpeg", &b"\xff\xd8\xff jpeg"[..])),
    );
    let req = test::TestRequest::put()
        .uri("/api/user/profile")
        .insert_header(bearer(&token))
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        ))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["name"], "Ada L.");
    assert_eq!(body["bio"], "Analyst");
    assert_eq!(body["social_links"][0]["platform"], "github");
    let avatar = body["avatar"].as_str().unwrap();
    assert!(avatar.starts_with("avatars/") && avatar.ends_with(".jpg"));
    assert_eq!(body["avatar_url"], format!("http://localhost/storage/{avatar}"));
}

#[actix_rt::test]
async fn failed_profile_save_discards_new_avatar() {
    let mut state = state();
    let (user, token) = member(&state, "ada").await;
    let storage = observed_storage(&mut state);
    state.users = Arc::new(ContendedUsers(state.users.clone()));
    let app = app!(state);

    let boundary = "avatar-race";
    let body = multipart(
        boundary,
        &[
            ("name", "Ada"),
            ("username", "ada"),
            ("email", "ada@example.com"),
        ],
        Some(("avatar", "image/png", &b"\x89PNG avatar"[..])),
    );
    let req = test::TestRequest::post()
        .uri("/api/user/profile")
        .insert_header(bearer(&token))
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        ))
        .set_payload(body)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

    assert_eq!(storage.len().await, 0);
    let stored = state.users.find_by_id(user.id).await.unwrap().unwrap();
    assert!(stored.avatar.is_none());
}

#[actix_rt::test]
async fn profile_rejects_taken_email_and_bad_links() {
    let state = state();
    let (_, token) = member(&state, "ada").await;
    member(&state, "bob").await;
    let app = app!(state);

    let req = test::TestRequest::put()
        .uri("/api/user/profile")
        .insert_header(bearer(&token))
        .set_json(json!({
            "name": "Ada",
            "username": "ada",
            "email": "bob@example.com",
            "social_links": [{ "platform": "", "url": "ftp://nope" }],
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: ErrorResponse = test::read_body_json(resp).await;
    assert_eq!(body.first_error("email"), Some("The email has already been taken."));
    assert_eq!(
        body.first_error("social_links.0.platform"),
        Some("The social links.0.platform field is required.")
    );
    assert_eq!(
        body.first_error("social_links.0.url"),
        Some("The social links.0.url field must be a valid URL.")
    );
}

#[actix_rt::test]
async fn password_change_requires_current_password() {
    let state = state();
    let (_, token) = member(&state, "ada").await;
    let app = app!(state);

    let req = test::TestRequest::put()
        .uri("/api/user/password")
        .insert_header(bearer(&token))
        .set_json(json!({
            "current_password": "not-it",
            "password": "new-password",
            "password_confirmation": "new-password",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: ErrorResponse = test::read_body_json(resp).await;
    assert_eq!(
        body.first_error("current_password"),
        Some("The password is incorrect.")
    );

    let req = test::TestRequest::put()
        .uri("/api/user/password")
        .insert_header(bearer(&token))
        .set_json(json!({
            "current_password": PASSWORD,
            "password": "new-password",
            "password_confirmation": "new-password",
        }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/api/login")
        .set_json(json!({ "email": "ada@example.com", "password": "new-password" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn dashboard_stats_and_posts() {
    let state = state();
    let (author, token) = member(&state, "ada").await;
    let (reader, _) = member(&state, "bob").await;
    let category = category(&state).await;
    let published = post(&state, &author, &category, PostStatus::Published).await;
    post(&state, &author, &category, PostStatus::Draft).await;
    state.posts.adjust_like_count(published.id, 3).await.unwrap();
    state
        .comments
        .save(quill_core::domain::Comment::new(
            published.id,
            reader.id,
            None,
            "Nice".into(),
        ))
        .await
        .unwrap();
    let app = app!(state);

    let req = test::TestRequest::get()
        .uri("/api/user/stats")
        .insert_header(bearer(&token))
        .to_request();
    let stats: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(stats, json!({ "posts": 2, "likes": 3, "comments": 1 }));

    let req = test::TestRequest::get()
        .uri("/api/user/posts")
        .insert_header(bearer(&token))
        .to_request();
    let page: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(page["total"], 2);
    let row = page["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["id"] == json!(published.id))
        .unwrap();
    assert_eq!(row["comments_count"], 1);
    assert_eq!(row["likes_count"], 3);
    assert_eq!(row["is_liked"], false);
}

#[actix_rt::test]
async fn taxonomy_lists_are_public_and_sorted() {
    let state = state();
    state.categories.save(Category::new("Travel", None)).await.unwrap();
    state.categories.save(Category::new("Art", None)).await.unwrap();
    state.tags.save(Tag::new("Zig")).await.unwrap();
    state.tags.save(Tag::new("Async")).await.unwrap();
    let app = app!(state);

    let categories: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/categories").to_request())
            .await;
    assert_eq!(categories[0]["name"], "Art");
    assert_eq!(categories[1]["slug"], "travel");

    let tags: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/api/tags").to_request())
            .await;
    assert_eq!(tags[0]["name"], "Async");
}
