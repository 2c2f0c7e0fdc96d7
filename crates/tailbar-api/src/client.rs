// Local API HTTP client
//
// Wraps hyper's HTTP/1.1 client connection with the daemon's virtual-host
// addressing, body decoding by content type, and the two exchange shapes
// the daemon uses: single-document responses and newline-delimited
// streams. Typed endpoint helpers live at the bottom of this file.

use std::time::Duration;

use futures_core::Stream;
use futures_util::StreamExt;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{ACCEPT, CONTENT_TYPE, HOST, HeaderMap, USER_AGENT};
use hyper::{Method, Request, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::Error;
use crate::models::{IpnStatus, Notify, Prefs};
use crate::patch::PrefsPatch;
use crate::stream::DocumentStream;
use crate::transport::{LOCAL_API_HOST, TransportConfig};

const USER_AGENT_VALUE: &str = concat!("tailbar/", env!("CARGO_PKG_VERSION"));

// ── Routes ──────────────────────────────────────────────────────────

pub mod routes {
    pub const STATUS: &str = "/localapi/v0/status";
    pub const PREFS: &str = "/localapi/v0/prefs";
    pub const WATCH_IPN_BUS: &str = "/localapi/v0/watch-ipn-bus";
}

/// Bit flags for the watch endpoint's `mask` query parameter.
pub mod watch_opts {
    pub const ENGINE_UPDATES: u64 = 1 << 0;
    pub const INITIAL_STATE: u64 = 1 << 1;
    pub const INITIAL_PREFS: u64 = 1 << 2;
    pub const INITIAL_NETMAP: u64 = 1 << 3;
    pub const NO_PRIVATE_KEYS: u64 = 1 << 4;

    /// Ask for a full state/prefs/netmap replacement as the first record.
    pub const INITIAL: u64 = INITIAL_STATE | INITIAL_PREFS | INITIAL_NETMAP | NO_PRIVATE_KEYS;
}

// ── Document ────────────────────────────────────────────────────────

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    /// Body declared a JSON content type.
    Json(Value),
    /// Anything else, passed through as text.
    Text(String),
}

impl Document {
    /// Decode `bytes` as JSON when `json` is set, as text otherwise.
    pub(crate) fn decode(bytes: &[u8], json: bool) -> Result<Self, Error> {
        if json {
            serde_json::from_slice(bytes)
                .map(Self::Json)
                .map_err(|e| Error::Deserialization {
                    message: e.to_string(),
                    body: String::from_utf8_lossy(bytes).into_owned(),
                })
        } else {
            Ok(Self::Text(String::from_utf8_lossy(bytes).into_owned()))
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            Self::Text(_) => None,
        }
    }

    /// Deserialize a JSON document into `T`.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, Error> {
        match self {
            Self::Json(value) => {
                let body = value.to_string();
                serde_json::from_value(value).map_err(|e| Error::Deserialization {
                    message: e.to_string(),
                    body,
                })
            }
            Self::Text(body) => Err(Error::Deserialization {
                message: "expected a JSON document".into(),
                body,
            }),
        }
    }
}

// ── LocalClient ─────────────────────────────────────────────────────

/// Raw HTTP client for the daemon's local API.
///
/// The client itself is a cheap, reusable session object: it holds only
/// the transport configuration and opens a fresh socket connection per
/// exchange. Streams own their connection until they are dropped.
#[derive(Debug, Clone)]
pub struct LocalClient {
    transport: TransportConfig,
}

impl LocalClient {
    pub fn new(transport: TransportConfig) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &TransportConfig {
        &self.transport
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send one request and return the decoded body.
    ///
    /// Bodies declared as JSON are parsed; everything else is returned as
    /// text. Non-success statuses become [`Error::Status`].
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Document, Error> {
        debug!("{method} {path}");

        let request = build_request(method, path, body)?;
        let exchange = async {
            let mut sender = self.transport.connect().await?;
            let response = sender.send_request(request).await?;
            let (parts, body) = response.into_parts();
            let bytes = body.collect().await?.to_bytes();

            check_status(parts.status, &bytes)?;
            Document::decode(&bytes, is_json(&parts.headers))
        };

        with_timeout(self.transport.timeout, exchange).await
    }

    /// Open a streaming request and return its records lazily.
    ///
    /// The request timeout covers connecting and receiving the response
    /// head only; the body may stay open indefinitely.
    pub async fn stream(
        &self,
        method: Method,
        path: &str,
        cancel: CancellationToken,
    ) -> Result<DocumentStream, Error> {
        debug!("{method} {path} (stream)");

        let request = build_request(method, path, None)?;
        let open = async {
            let mut sender = self.transport.connect().await?;
            let response = sender.send_request(request).await?;
            let (parts, body) = response.into_parts();

            if !parts.status.is_success() {
                let bytes = body.collect().await?.to_bytes();
                return Err(status_error(parts.status, &bytes));
            }

            Ok(DocumentStream::new(
                sender,
                body,
                is_json(&parts.headers),
                cancel,
            ))
        };

        with_timeout(self.transport.timeout, open).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.request(Method::GET, path, None).await?.into_typed()
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `GET /localapi/v0/status`
    pub async fn status(&self) -> Result<IpnStatus, Error> {
        self.get_json(routes::STATUS).await
    }

    /// `GET /localapi/v0/prefs`
    pub async fn prefs(&self) -> Result<Prefs, Error> {
        self.get_json(routes::PREFS).await
    }

    /// `PATCH /localapi/v0/prefs` -- returns the daemon's updated prefs.
    pub async fn edit_prefs(&self, patch: &PrefsPatch) -> Result<Prefs, Error> {
        let body = patch.to_json();
        self.request(Method::PATCH, routes::PREFS, Some(&body))
            .await?
            .into_typed()
    }

    /// `GET /localapi/v0/watch-ipn-bus` -- one [`Notify`] per line.
    pub async fn watch_ipn_bus(
        &self,
        mask: u64,
        cancel: CancellationToken,
    ) -> Result<impl Stream<Item = Result<Notify, Error>> + Send + 'static, Error> {
        let path = format!("{}?mask={mask}", routes::WATCH_IPN_BUS);
        let records = self.stream(Method::GET, &path, cancel).await?;
        Ok(records.map(|record| record.and_then(Document::into_typed)))
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn build_request(
    method: Method,
    path: &str,
    body: Option<&Value>,
) -> Result<Request<Full<Bytes>>, Error> {
    let builder = Request::builder()
        .method(method)
        .uri(path)
        .header(HOST, LOCAL_API_HOST)
        .header(USER_AGENT, USER_AGENT_VALUE)
        .header(ACCEPT, "application/json");

    let request = match body {
        Some(value) => {
            let bytes = serde_json::to_vec(value)
                .map_err(|e| Error::InvalidRequest(format!("unencodable body: {e}")))?;
            builder
                .header(CONTENT_TYPE, "application/json")
                .body(Full::new(Bytes::from(bytes)))
        }
        None => builder.body(Full::new(Bytes::new())),
    };

    request.map_err(|e| Error::InvalidRequest(e.to_string()))
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| {
            let mime = mime.trim();
            mime.eq_ignore_ascii_case("application/json") || mime.ends_with("+json")
        })
}

/// Map a non-success status to [`Error::Status`], preferring the daemon's
/// `{"error": "..."}` message when it sends one.
fn check_status(status: StatusCode, body: &[u8]) -> Result<(), Error> {
    if status.is_success() {
        Ok(())
    } else {
        Err(status_error(status, body))
    }
}

fn status_error(status: StatusCode, body: &[u8]) -> Error {
    let message = serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_owned());

    Error::Status {
        status: status.as_u16(),
        message,
    }
}

async fn with_timeout<T>(
    timeout: Duration,
    fut: impl Future<Output = Result<T, Error>>,
) -> Result<T, Error> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| Error::Timeout {
            timeout_secs: timeout.as_secs(),
        })?
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;
    use serde_json::json;

    #[test]
    fn json_content_type_detection() {
        let mut headers = HeaderMap::new();
        assert!(!is_json(&headers));

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        assert!(is_json(&headers));

        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        assert!(is_json(&headers));

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert!(!is_json(&headers));
    }

    #[test]
    fn decode_respects_declared_type() {
        let doc = Document::decode(br#"{"ok":true}"#, true).unwrap();
        assert_eq!(doc, Document::Json(json!({"ok": true})));

        let doc = Document::decode(br#"{"ok":true}"#, false).unwrap();
        assert_eq!(doc, Document::Text(r#"{"ok":true}"#.into()));

        let err = Document::decode(b"not json", true).unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn text_document_cannot_be_typed() {
        let err = Document::Text("hello".into())
            .into_typed::<Prefs>()
            .unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn status_error_prefers_daemon_message() {
        let err = check_status(StatusCode::FORBIDDEN, br#"{"error":"access denied"}"#).unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert!(err.to_string().contains("access denied"));

        let err = check_status(StatusCode::INTERNAL_SERVER_ERROR, b"boom\n").unwrap_err();
        assert!(err.to_string().ends_with("boom"));

        assert!(check_status(StatusCode::OK, b"").is_ok());
    }

    #[test]
    fn request_targets_virtual_host() {
        let req = build_request(Method::PATCH, routes::PREFS, Some(&json!({"a": 1}))).unwrap();
        assert_eq!(req.uri().path(), "/localapi/v0/prefs");
        assert_eq!(req.headers()[HOST], LOCAL_API_HOST);
        assert_eq!(req.headers()[CONTENT_TYPE], "application/json");
    }
}
