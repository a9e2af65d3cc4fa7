//! API client for communicating with the bank's REST API.
//!
//! This module provides the `ApiClient` struct. Every request goes through
//! `ApiClient::execute`, which decides whether to attach the session's
//! credential and reacts to a 401 by clearing the session.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join3;
use reqwest::{header, multipart, Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::auth::Session;
use crate::models::assistant::ChatRequest;
use crate::models::{
    AssistantReply, Card, Favorite, FavoriteKind, LoginResponse, MfaChallenge, NewFavorite,
    ProductApplication, Profile, ProfileUpdate, RegisterRequest, ServicePayment, Transaction,
    TransferRequest,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Path fragments of endpoints that must never carry a credential.
const EXEMPT_PATH_MARKERS: [&str; 2] = ["/auth/login", "/auth/register"];

/// File name and MIME type for voice messages sent to the assistant.
const VOICE_FILE_NAME: &str = "voice.m4a";
const VOICE_MIME_TYPE: &str = "audio/m4a";

/// API client for the bank server.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling
/// and the session is shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Arc<Session>,
}

impl ApiClient {
    /// Create a new API client bound to `session`.
    pub fn new(base_url: &str, session: Arc<Session>) -> Result<Self, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    /// Create a new ApiClient bound to another session, sharing the
    /// connection pool.
    pub fn with_session(&self, session: Arc<Session>) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            session,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether requests to `path` are sent without a credential.
    pub fn is_exempt(path: &str) -> bool {
        EXEMPT_PATH_MARKERS.iter().any(|marker| path.contains(marker))
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    /// Send a request, attaching the credential unless `path` is exempt.
    ///
    /// A 401 clears the session before `ApiError::Unauthorized` is returned.
    /// The generation used for that clear is taken together with the token,
    /// so a login that lands while the request is in flight survives.
    /// Transport failures are returned unchanged and leave the credential
    /// alone. No retries.
    async fn execute(&self, path: &str, builder: RequestBuilder) -> Result<Response, ApiError> {
        let (token, sent_under) = self.session.snapshot().await;
        let builder = if Self::is_exempt(path) {
            debug!(path, "Exempt endpoint, sending without credential");
            builder
        } else if let Some(token) = token {
            builder.bearer_auth(token)
        } else {
            debug!(path, "No credential stored, sending unauthenticated");
            builder
        };

        let response = builder.send().await.map_err(|e| {
            warn!(path, error = %e, "Request failed before a response arrived");
            ApiError::Network(e)
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            warn!(path, "Server rejected credential");
            self.session.invalidate(sent_under).await;
            return Err(ApiError::from_status(status, &body));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(path, status = status.as_u16(), "Request returned an error status");
            return Err(ApiError::from_status(status, &body));
        }
        Ok(response)
    }

    /// Decode a JSON body. An empty body decodes as JSON `null`.
    async fn read_json<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, ApiError> {
        let text = response.text().await?;
        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e))
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.execute(path, self.request(Method::GET, path)).await?;
        Self::read_json(path, response).await
    }

    async fn send_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let builder = self.request(method, path).json(body);
        let response = self.execute(path, builder).await?;
        Self::read_json(path, response).await
    }

    async fn send_empty<T: DeserializeOwned>(&self, method: Method, path: &str) -> Result<T, ApiError> {
        let response = self.execute(path, self.request(method, path)).await?;
        Self::read_json(path, response).await
    }

    // ===== Authentication =====

    /// Exchange phone and password for an access token.
    /// The token is returned, not stored; see `LoginFlow`.
    pub async fn login(&self, phone: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let path = "/auth/login";
        let builder = self
            .request(Method::POST, path)
            .form(&[("username", phone), ("password", password)]);
        let response = self.execute(path, builder).await?;
        Self::read_json(path, response).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<Value, ApiError> {
        self.send_json(Method::POST, "/auth/register", request).await
    }

    pub async fn generate_mfa(&self) -> Result<MfaChallenge, ApiError> {
        self.send_empty(Method::POST, "/mfa/generate").await
    }

    pub async fn verify_mfa(&self, code: &str) -> Result<Value, ApiError> {
        self.send_json(Method::POST, "/mfa/verify", &json!({ "code": code })).await
    }

    // ===== Profile =====

    pub async fn me(&self) -> Result<Profile, ApiError> {
        self.get("/settings/me").await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile, ApiError> {
        self.send_json(Method::PATCH, "/settings/me", update).await
    }

    // ===== Cards =====

    pub async fn cards(&self) -> Result<Vec<Card>, ApiError> {
        self.get("/accounts/").await
    }

    pub async fn create_card(&self, currency: &str) -> Result<Value, ApiError> {
        self.send_json(Method::POST, "/accounts/create", &json!({ "currency": currency }))
            .await
    }

    pub async fn block_card(&self, id: i64) -> Result<Value, ApiError> {
        self.send_empty(Method::PATCH, &format!("/accounts/{}/block", id)).await
    }

    pub async fn unblock_card(&self, id: i64) -> Result<Value, ApiError> {
        self.send_empty(Method::PATCH, &format!("/accounts/{}/unblock", id)).await
    }

    // ===== History =====

    pub async fn history(&self) -> Result<Vec<Transaction>, ApiError> {
        self.get("/transactions/").await
    }

    /// Cards, history and profile fetched concurrently for the home screen.
    /// Each part fails independently.
    pub async fn dashboard(
        &self,
    ) -> (
        Result<Vec<Card>, ApiError>,
        Result<Vec<Transaction>, ApiError>,
        Result<Profile, ApiError>,
    ) {
        join3(self.cards(), self.history(), self.me()).await
    }

    // ===== Transfers =====

    pub async fn transfer_p2p(&self, request: &TransferRequest) -> Result<Value, ApiError> {
        self.send_json(Method::POST, "/transfers/p2p", request).await
    }

    pub async fn favorites(&self) -> Result<Vec<Favorite>, ApiError> {
        // The endpoint answers `null` when nothing has been saved yet
        let favorites: Option<Vec<Favorite>> = self.get("/transfers/favorites").await?;
        Ok(favorites.unwrap_or_default())
    }

    pub async fn add_favorite(
        &self,
        name: &str,
        value: &str,
        kind: FavoriteKind,
    ) -> Result<Value, ApiError> {
        let body = NewFavorite {
            name: name.to_string(),
            value: value.to_string(),
            kind,
        };
        self.send_json(Method::POST, "/transfers/favorites", &body).await
    }

    pub async fn delete_favorite(&self, id: i64) -> Result<Value, ApiError> {
        self.send_empty(Method::DELETE, &format!("/transfers/favorites/{}", id))
            .await
    }

    // ===== Payments =====

    pub async fn pay_service(&self, payment: &ServicePayment) -> Result<Value, ApiError> {
        self.send_json(Method::POST, "/services/pay", payment).await
    }

    // ===== Assistant =====

    pub async fn chat(&self, message: &str) -> Result<AssistantReply, ApiError> {
        self.send_json(Method::POST, "/ai/chat", &ChatRequest { message })
            .await
    }

    /// Upload a recorded voice message for transcription and a reply.
    pub async fn send_voice(&self, audio: Vec<u8>) -> Result<AssistantReply, ApiError> {
        let path = "/ai/voice";
        let part = multipart::Part::bytes(audio)
            .file_name(VOICE_FILE_NAME)
            .mime_str(VOICE_MIME_TYPE)?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .execute(path, self.request(Method::POST, path).multipart(form))
            .await?;
        Self::read_json(path, response).await
    }

    // ===== Credit products =====

    pub async fn apply_product(&self, application: &ProductApplication) -> Result<Value, ApiError> {
        self.send_json(Method::POST, application.endpoint(), &application.body())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenStore;

    #[test]
    fn test_exempt_paths() {
        assert!(ApiClient::is_exempt("/auth/login"));
        assert!(ApiClient::is_exempt("/auth/register"));
        assert!(ApiClient::is_exempt("/v2/auth/login?next=home"));
        assert!(!ApiClient::is_exempt("/settings/me"));
        assert!(!ApiClient::is_exempt("/accounts/"));
        assert!(!ApiClient::is_exempt("/auth/refresh"));
    }

    #[test]
    fn test_url_joining() {
        let session = Arc::new(Session::new(TokenStore::in_memory()));
        let client = ApiClient::new("https://bank.example/", session).expect("client");
        assert_eq!(client.base_url(), "https://bank.example");
        assert_eq!(client.url("/accounts/"), "https://bank.example/accounts/");
        assert_eq!(client.url("ai/chat"), "https://bank.example/ai/chat");
    }
}
