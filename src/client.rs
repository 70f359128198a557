use std::env;
use std::fmt;
use std::pin::Pin;
use std::time::{Duration, Instant};

use futures::Stream;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, StatusCode, header};
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::sse::process_sse;
use crate::types::{DreamRequest, DreamResponse, StreamEvent};

/// Environment variable consulted when no endpoint is given explicitly.
pub const ENDPOINT_ENV: &str = "DREAM_API_URL";

/// Endpoint used when neither an explicit endpoint nor the environment names one.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const EVENT_STREAM: &str = "text/event-stream";

/// A stream of parsed events from a streamed reply.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// The two shapes a reply can take.
pub enum Reply {
    /// The body is an event stream that has not been read yet.
    Stream(EventStream),
    /// The body was a single JSON object.
    Json(DreamResponse),
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Stream(_) => f.write_str("Reply::Stream(..)"),
            Reply::Json(response) => f.debug_tuple("Reply::Json").field(response).finish(),
        }
    }
}

/// Something that can answer a dream submission.
///
/// [`DreamClient`] talks to the real service over HTTP; tests substitute
/// scripted implementations.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// Send one submission and return the reply without consuming a streamed body.
    async fn submit(&self, request: DreamRequest) -> Result<Reply>;
}

/// Client for the Dream AI endpoint.
#[derive(Debug, Clone)]
pub struct DreamClient {
    client: ReqwestClient,
    endpoint: Url,
    timeout: Option<Duration>,
}

impl DreamClient {
    /// Create a new client.
    ///
    /// The endpoint can be provided directly or read from the `DREAM_API_URL`
    /// environment variable, falling back to [`DEFAULT_ENDPOINT`].
    pub fn new(endpoint: Option<String>) -> Result<Self> {
        Self::with_options(endpoint, None)
    }

    /// Create a new client with a whole-request timeout.
    ///
    /// `None` leaves requests unbounded so long streams are not cut off; only
    /// connecting is bounded.
    pub fn with_options(endpoint: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let endpoint = match endpoint {
            Some(endpoint) => endpoint,
            None => env::var(ENDPOINT_ENV).unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string()),
        };
        let endpoint = submission_url(&endpoint)?;

        let mut builder = ReqwestClient::builder().connect_timeout(DEFAULT_CONNECT_TIMEOUT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            Error::http_client(
                format!("Failed to build HTTP client: {e}"),
                Some(Box::new(e)),
            )
        })?;

        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    /// The URL submissions are posted to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Create and return default headers for submissions.
    fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream, application/json"),
        );
        headers
    }

    fn request_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {e}"),
                self.timeout.map(|t| t.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
        } else {
            Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
        }
    }
}

#[async_trait::async_trait]
impl Backend for DreamClient {
    async fn submit(&self, request: DreamRequest) -> Result<Reply> {
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(Self::default_headers())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                self.request_error(e)
            })?;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        let status = response.status();
        if is_event_stream(response.headers()) {
            tracing::debug!(%status, endpoint = %self.endpoint, "received streamed reply");
            let events = process_sse(response.bytes_stream());
            return Ok(Reply::Stream(Box::pin(events)));
        }

        let body = response.bytes().await.map_err(|e| {
            CLIENT_REQUEST_ERRORS.click();
            if e.is_timeout() {
                self.request_error(e)
            } else {
                Error::streaming(
                    format!("Failed to read response body: {e}"),
                    Some(Box::new(e)),
                )
            }
        })?;
        tracing::debug!(%status, bytes = body.len(), "received JSON reply");
        parse_json_reply(status, &body).map(Reply::Json)
    }
}

/// Normalize an endpoint into the URL submissions are posted to.
///
/// Submissions go to `{endpoint}/`, so a trailing slash is ensured on the path.
pub fn submission_url(endpoint: &str) -> Result<Url> {
    let mut url = Url::parse(endpoint.trim())?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(Error::validation(
            format!("endpoint must be an http(s) URL, got '{endpoint}'"),
            Some("endpoint".to_string()),
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Returns true if the headers declare an event-stream body.
pub fn is_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains(EVENT_STREAM))
}

/// Parse a one-shot reply body.
///
/// The HTTP status does not decide the outcome: the service reports its own
/// errors as JSON with 4xx/5xx codes.  Only a body that is not a reply at all
/// falls back to the status code.
fn parse_json_reply(status: StatusCode, body: &[u8]) -> Result<DreamResponse> {
    match serde_json::from_slice::<DreamResponse>(body) {
        Ok(response) => Ok(response),
        Err(e) if status.is_success() => Err(Error::serialization(
            format!("Failed to parse response: {e}"),
            Some(Box::new(e)),
        )),
        Err(_) => Err(Error::api(
            status.as_u16(),
            String::from_utf8_lossy(body).into_owned(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseStatus;

    #[test]
    fn test_client_creation() {
        let client = DreamClient::new(Some("http://localhost:5000".to_string())).unwrap();
        assert_eq!(client.endpoint().as_str(), "http://localhost:5000/");
        assert_eq!(client.timeout, None);

        let client = DreamClient::with_options(
            Some("https://dreams.example.com/api".to_string()),
            Some(Duration::from_secs(30)),
        )
        .unwrap();
        assert_eq!(client.endpoint().as_str(), "https://dreams.example.com/api/");
        assert_eq!(client.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn submission_url_keeps_existing_slash() {
        let url = submission_url("http://127.0.0.1:8080/dream/").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/dream/");
    }

    #[test]
    fn submission_url_rejects_bad_endpoints() {
        assert!(matches!(
            submission_url("not a url"),
            Err(Error::Url { .. })
        ));
        assert!(submission_url("ftp://example.com").unwrap_err().is_validation());
        assert!(submission_url("mailto:dreams@example.com").unwrap_err().is_validation());
    }

    #[test]
    fn event_stream_detection() {
        let mut headers = HeaderMap::new();
        assert!(!is_event_stream(&headers));
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/event-stream; charset=utf-8"),
        );
        assert!(is_event_stream(&headers));
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        assert!(!is_event_stream(&headers));
    }

    #[test]
    fn error_reply_with_error_status_parses() {
        let body = br#"{"status":"error","message":"Please share your dream first"}"#;
        let response = parse_json_reply(StatusCode::BAD_REQUEST, body).unwrap();
        assert_eq!(response.status, ResponseStatus::Error);
    }

    #[test]
    fn garbage_body_with_success_status_is_serialization_error() {
        let err = parse_json_reply(StatusCode::OK, b"<html>").unwrap_err();
        assert!(err.is_serialization());
    }

    #[test]
    fn garbage_body_with_error_status_is_api_error() {
        let err = parse_json_reply(StatusCode::BAD_GATEWAY, b"upstream down").unwrap_err();
        assert_eq!(err.status_code(), Some(502));
        assert!(err.to_string().contains("upstream down"));
    }
}
