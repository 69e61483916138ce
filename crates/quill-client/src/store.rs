//! The signed-in session.

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;

use quill_shared::dto::{AuthResponse, LoginRequest, RegisterRequest, UserResponse};
use quill_shared::{ErrorResponse, MessageResponse};

use crate::{ClientError, TokenStorage};

/// Client with `Authorization: Bearer` preset when a token is known.
fn build_client(token: Option<&str>) -> Result<reqwest::Client, ClientError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    if let Some(token) = token {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ClientError::InvalidToken)?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Ok(reqwest::Client::builder()
        .user_agent(concat!("quill-client/", env!("CARGO_PKG_VERSION")))
        .default_headers(headers)
        .build()?)
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let problem = response.json::<ErrorResponse>().await.ok();
    Err(ClientError::Api {
        status: status.as_u16(),
        problem,
    })
}

/// Session state plus the actions that change it.
///
/// The token is read from `storage` on construction, so a restarted
/// application stays signed in; `is_logged_in` only turns true once the
/// server has confirmed the session through login, register or
/// [`AuthStore::fetch_user`].
pub struct AuthStore<S: TokenStorage> {
    base_url: String,
    http: reqwest::Client,
    storage: S,
    user: Option<UserResponse>,
    token: Option<String>,
    is_authenticated: bool,
}

impl<S: TokenStorage> AuthStore<S> {
    /// `base_url` is the API root, e.g. `http://localhost:8080/api`.
    pub fn new(base_url: impl Into<String>, storage: S) -> Result<Self, ClientError> {
        let token = storage.load()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: build_client(token.as_deref())?,
            storage,
            user: None,
            token,
            is_authenticated: false,
        })
    }

    pub fn user(&self) -> Option<&UserResponse> {
        self.user.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.is_authenticated
    }

    /// HTTP client for any other API call; carries the current token.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn login(&mut self, credentials: &LoginRequest) -> Result<AuthResponse, ClientError> {
        let response = self.http.post(self.url("/login")).json(credentials).send().await?;
        let auth: AuthResponse = decode(response).await?;
        self.sign_in(&auth)?;
        tracing::debug!(user_id = %auth.user.id, "Logged in");
        Ok(auth)
    }

    pub async fn register(&mut self, data: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        let response = self.http.post(self.url("/register")).json(data).send().await?;
        let auth: AuthResponse = decode(response).await?;
        self.sign_in(&auth)?;
        tracing::debug!(user_id = %auth.user.id, "Registered");
        Ok(auth)
    }

    /// Local state is only cleared once the server accepted the logout.
    pub async fn logout(&mut self) -> Result<(), ClientError> {
        let response = self.http.post(self.url("/logout")).send().await?;
        let _: MessageResponse = decode(response).await?;

        self.user = None;
        self.token = None;
        self.is_authenticated = false;
        self.storage.clear()?;
        self.http = build_client(None)?;
        Ok(())
    }

    pub async fn fetch_user(&mut self) -> Result<UserResponse, ClientError> {
        let response = self.http.get(self.url("/user")).send().await?;
        let user: UserResponse = decode(response).await?;
        self.user = Some(user.clone());
        self.is_authenticated = true;
        Ok(user)
    }

    fn sign_in(&mut self, auth: &AuthResponse) -> Result<(), ClientError> {
        let http = build_client(Some(&auth.token))?;
        self.user = Some(auth.user.clone());
        self.token = Some(auth.token.clone());
        self.is_authenticated = true;
        self.storage.save(&auth.token)?;
        self.http = http;
        Ok(())
    }
}
