use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;

/// Describes one logical request independently of any single attempt.
///
/// The fetch loop rebuilds the physical `reqwest::Request` from this
/// descriptor on every attempt, so bodies are owned data that can be
/// replayed without cloning restrictions.
#[derive(Clone, Debug)]
pub struct RequestSpec {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub payload: Payload,
}

/// Request body variants the executor knows how to replay.
#[derive(Clone, Debug)]
pub enum Payload {
    Empty,
    /// URL-encoded form fields.
    Form(Vec<(String, String)>),
    Json(serde_json::Value),
    Bytes(Vec<u8>),
}

impl RequestSpec {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            payload: Payload::Empty,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }
}
