use std::collections::HashSet;
use std::env;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::AuthSession;
use crate::client_logger::ClientLogger;
use crate::error::{Error, Result, UNKNOWN_ERROR_MESSAGE};
use crate::observability::{
    CHAT_BUSY, CHAT_DURATION, CHAT_ERRORS, CHAT_REQUESTS, CHAT_RETRYABLE_ERRORS, RATE_DURATION,
    RATE_ERRORS, RATE_REQUESTS,
};
use crate::types::{
    ChatRequest, ChatResponse, RateRequest, RateResponse, SearchSettings, citation_file_path,
};

const DEFAULT_BASE_URL: &str = "http://localhost:8000/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const BASE_URL_ENV: &str = "CITECHAT_BASE_URL";

const CHAT_ENDPOINT: &str = "chat";
const RATE_ENDPOINT: &str = "rate";

/// The operations a chat session needs from the backend.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    /// Submit one dialog turn.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse>;

    /// Submit feedback on an answered turn.
    async fn rate(&self, request: &RateRequest) -> Result<RateResponse>;

    /// Where the document behind a citation can be fetched.
    fn citation_url(&self, citation_id: &str) -> Result<Url>;
}

/// Client for the question-answering backend.
#[derive(Clone)]
pub struct ChatClient {
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
    access_token: Option<String>,
    in_flight: Arc<Mutex<HashSet<String>>>,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("authenticated", &self.access_token.is_some())
            .finish()
    }
}

impl ChatClient {
    /// Create a new client.
    ///
    /// The base URL can be provided directly or read from the CITECHAT_BASE_URL environment
    /// variable; without either the client talks to a backend on localhost.
    pub fn new(base_url: Option<String>) -> Result<Self> {
        Self::with_options(base_url, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(base_url: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let base_url = base_url
            .or_else(|| env::var(BASE_URL_ENV).ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = parse_base_url(&base_url)?;

        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            base_url,
            timeout,
            access_token: None,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            logger: None,
        })
    }

    /// Authenticate requests as the session's active account.
    ///
    /// Fails when nobody is signed in.
    pub fn with_auth(self, auth: &AuthSession) -> Result<Self> {
        let account = auth.require_active()?;
        self.with_access_token(Some(account.access_token.clone()))
    }

    /// Authenticate requests with an explicit bearer token, or not at all.
    pub fn with_access_token(mut self, token: Option<String>) -> Result<Self> {
        if let Some(token) = &token {
            HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                Error::authentication("access token contains characters not allowed in a header")
            })?;
        }
        self.access_token = token;
        Ok(self)
    }

    /// Report every call to `logger`.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The backend this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Search capabilities of the backend.
    ///
    /// The backend does not expose these, so the client reports the deployed defaults.
    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings::default()
    }

    /// The `/content/<id>` path of a citation's document.
    pub fn citation_file_path(&self, citation_id: &str) -> String {
        citation_file_path(citation_id)
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = &self.access_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                Error::authentication("access token contains characters not allowed in a header")
            })?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Response> {
        let url = self.endpoint(path)?;
        self.client
            .post(url)
            .headers(self.default_headers()?)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(
                        format!("Request timed out: {}", e),
                        Some(self.timeout.as_secs_f64()),
                    )
                } else if e.is_connect() {
                    Error::connection(format!("Connection error: {}", e), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {}", e), Some(Box::new(e)))
                }
            })
    }

    async fn read_body(response: Response) -> Result<String> {
        response.text().await.map_err(|e| {
            Error::http_client(
                format!("Failed to read response: {}", e),
                Some(Box::new(e)),
            )
        })
    }

    /// Submit one dialog turn to `/chat`.
    ///
    /// Only one request per conversation may be pending; a second one fails with
    /// [`Error::Busy`] without reaching the backend.  A non-success status yields
    /// [`Error::Chat`] carrying the backend's retry hint.
    pub async fn submit_chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let _guard = match InFlightGuard::acquire(&self.in_flight, &request.dialog.conversation_id)
        {
            Ok(guard) => guard,
            Err(err) => {
                CHAT_BUSY.click();
                return Err(err);
            }
        };
        CHAT_REQUESTS.click();
        let start = Instant::now();
        if let Some(logger) = &self.logger {
            logger.log_chat_request(request);
        }

        let result = self.chat_round_trip(request).await;
        CHAT_DURATION.add(start.elapsed().as_secs_f64());
        match &result {
            Ok(response) => {
                if let Some(logger) = &self.logger {
                    logger.log_chat_response(request, response);
                }
            }
            Err(err) => {
                CHAT_ERRORS.click();
                if err.is_retryable() {
                    CHAT_RETRYABLE_ERRORS.click();
                }
                if let Some(logger) = &self.logger {
                    logger.log_error(CHAT_ENDPOINT, err);
                }
            }
        }
        result
    }

    async fn chat_round_trip(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let response = self.post(CHAT_ENDPOINT, request).await?;
        let status = response.status();
        let body = Self::read_body(response).await?;
        if !status.is_success() {
            return Err(classify_chat_failure(&body));
        }
        parse_body(&body)
    }

    /// Submit feedback on an answered turn to `/rate`.
    ///
    /// A non-success status yields a plain [`Error::Api`].
    pub async fn submit_rating(&self, request: &RateRequest) -> Result<RateResponse> {
        RATE_REQUESTS.click();
        let start = Instant::now();
        if let Some(logger) = &self.logger {
            logger.log_rate_request(request);
        }

        let result = self.rate_round_trip(request).await;
        RATE_DURATION.add(start.elapsed().as_secs_f64());
        match &result {
            Ok(response) => {
                if let Some(logger) = &self.logger {
                    logger.log_rate_response(request, response);
                }
            }
            Err(err) => {
                RATE_ERRORS.click();
                if let Some(logger) = &self.logger {
                    logger.log_error(RATE_ENDPOINT, err);
                }
            }
        }
        result
    }

    async fn rate_round_trip(&self, request: &RateRequest) -> Result<RateResponse> {
        let response = self.post(RATE_ENDPOINT, request).await?;
        let status = response.status();
        let body = Self::read_body(response).await?;
        if !status.is_success() {
            return Err(classify_rate_failure(status.as_u16(), &body));
        }
        parse_body(&body)
    }

    /// Resolve a citation to the URL of its document.
    pub fn citation_url(&self, citation_id: &str) -> Result<Url> {
        let path = citation_file_path(citation_id);
        self.endpoint(path.trim_start_matches('/'))
    }
}

#[async_trait::async_trait]
impl ChatBackend for ChatClient {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        self.submit_chat(request).await
    }

    async fn rate(&self, request: &RateRequest) -> Result<RateResponse> {
        self.submit_rating(request).await
    }

    fn citation_url(&self, citation_id: &str) -> Result<Url> {
        ChatClient::citation_url(self, citation_id)
    }
}

/// Turn the body of a failed `/chat` call into a classified error.
///
/// The message is the body's `error` field and the retry hint its `show_retry` field.  A body
/// that is not a chat response yields the generic message and no retry.
pub fn classify_chat_failure(body: &str) -> Error {
    match serde_json::from_str::<ChatResponse>(body) {
        Ok(parsed) => Error::chat(
            parsed
                .error
                .unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string()),
            parsed.show_retry.unwrap_or(false),
        ),
        Err(_) => Error::chat(UNKNOWN_ERROR_MESSAGE, false),
    }
}

/// Turn the body of a failed `/rate` call into a plain error.
pub fn classify_rate_failure(status_code: u16, body: &str) -> Error {
    let message = serde_json::from_str::<RateResponse>(body)
        .ok()
        .and_then(|parsed| parsed.error)
        .unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string());
    Error::api(status_code, message)
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| {
        Error::serialization(
            format!("Failed to parse response: {}", e),
            Some(Box::new(e)),
        )
    })
}

fn parse_base_url(base_url: &str) -> Result<Url> {
    // Endpoints are joined relative to the base, which needs a trailing slash to keep its path.
    let mut url = Url::parse(base_url)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Marks a conversation as having a chat request in flight until dropped.
#[derive(Debug)]
struct InFlightGuard {
    in_flight: Arc<Mutex<HashSet<String>>>,
    conversation_id: String,
}

impl InFlightGuard {
    fn acquire(in_flight: &Arc<Mutex<HashSet<String>>>, conversation_id: &str) -> Result<Self> {
        let mut pending = in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !pending.insert(conversation_id.to_string()) {
            return Err(Error::busy(conversation_id));
        }
        Ok(Self {
            in_flight: Arc::clone(in_flight),
            conversation_id: conversation_id.to_string(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut pending = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        pending.remove(&self.conversation_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DialogRequest;

    #[test]
    fn test_client_creation() {
        let client = ChatClient::new(Some("https://qa.example.com".to_string())).unwrap();
        assert_eq!(client.base_url().as_str(), "https://qa.example.com/");
        assert_eq!(client.timeout(), DEFAULT_TIMEOUT);

        let client = ChatClient::with_options(
            Some("https://qa.example.com/api".to_string()),
            Some(Duration::from_secs(30)),
        )
        .unwrap();
        assert_eq!(client.base_url().as_str(), "https://qa.example.com/api/");
        assert_eq!(client.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn rejects_bad_base_url() {
        let err = ChatClient::new(Some("not a url".to_string())).unwrap_err();
        assert!(matches!(err, Error::Url { .. }));
    }

    #[test]
    fn endpoints_join_under_base() {
        let client = ChatClient::new(Some("https://qa.example.com/api".to_string())).unwrap();
        assert_eq!(
            client.endpoint(CHAT_ENDPOINT).unwrap().as_str(),
            "https://qa.example.com/api/chat"
        );
        assert_eq!(
            client.citation_url("guide.pdf").unwrap().as_str(),
            "https://qa.example.com/api/content/guide.pdf"
        );
        assert_eq!(client.citation_file_path("guide.pdf"), "/content/guide.pdf");
    }

    #[test]
    fn bearer_header() {
        let client = ChatClient::new(Some("http://localhost/".to_string()))
            .unwrap()
            .with_access_token(Some("abc".to_string()))
            .unwrap();
        let headers = client.default_headers().unwrap();
        assert_eq!(headers.get(header::AUTHORIZATION).unwrap(), "Bearer abc");

        let err = ChatClient::new(Some("http://localhost/".to_string()))
            .unwrap()
            .with_access_token(Some("bad\ntoken".to_string()))
            .unwrap_err();
        assert!(err.is_authentication());
    }

    #[test]
    fn chat_failure_retryable() {
        let err = classify_chat_failure(r#"{"error":"no documents","show_retry":true}"#);
        assert!(err.is_chat());
        assert!(err.is_retryable());
        assert_eq!(err.message(), "no documents");
    }

    #[test]
    fn chat_failure_without_hint() {
        let err = classify_chat_failure(r#"{"error":"no documents"}"#);
        assert!(!err.is_retryable());

        let err = classify_chat_failure("<html>bad gateway</html>");
        assert!(!err.is_retryable());
        assert_eq!(err.message(), UNKNOWN_ERROR_MESSAGE);
    }

    #[test]
    fn rate_failure_message() {
        let err = classify_rate_failure(422, r#"{"error":"rating rejected"}"#);
        assert_eq!(err.status_code(), Some(422));
        assert_eq!(err.message(), "rating rejected");
        assert!(!err.is_retryable());

        let err = classify_rate_failure(500, "");
        assert_eq!(err.message(), UNKNOWN_ERROR_MESSAGE);
    }

    #[test]
    fn search_settings_default() {
        let client = ChatClient::new(Some("http://localhost/".to_string())).unwrap();
        assert!(client.search_settings().vectorization_enabled);
    }

    #[test]
    fn failure_with_unknown_classification_keeps_retry() {
        let err = classify_chat_failure(
            r#"{"error": "Nothing found.", "show_retry": true, "suggested_classification": "hybrid"}"#,
        );
        assert!(err.is_retryable());
        assert_eq!(err.message(), "Nothing found.");
    }

    #[test]
    fn guard_releases_on_drop() {
        let in_flight = Arc::new(Mutex::new(HashSet::new()));
        let guard = InFlightGuard::acquire(&in_flight, "c1").unwrap();
        assert!(InFlightGuard::acquire(&in_flight, "c1").unwrap_err().is_busy());
        let other = InFlightGuard::acquire(&in_flight, "c2").unwrap();
        drop(guard);
        assert!(InFlightGuard::acquire(&in_flight, "c1").is_ok());
        drop(other);
    }

    #[tokio::test]
    async fn second_request_in_conversation_is_busy() {
        let client = ChatClient::new(Some("http://127.0.0.1:9/".to_string())).unwrap();
        let request = ChatRequest::new(DialogRequest::new("u", "conv", "d1"), "hello");
        let _pending = InFlightGuard::acquire(&client.in_flight, "conv").unwrap();

        let err = client.submit_chat(&request).await.unwrap_err();
        assert!(err.is_busy());

        // Clones share the guard.
        let err = client.clone().submit_chat(&request).await.unwrap_err();
        assert!(err.is_busy());
    }
}
