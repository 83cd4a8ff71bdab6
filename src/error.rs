use std::path::PathBuf;

/// Failure classification for a resilient fetch call.
///
/// Retryable conditions are absorbed by the retry loop; what surfaces
/// here is the final failing attempt's classification.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The attempt's own deadline elapsed and no retry budget remained.
    #[error("request timed out after {attempts} attempt(s)")]
    Timeout { attempts: u32 },
    /// Network or request execution error from `reqwest`.
    #[error("transport error after {attempts} attempt(s): {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },
    /// Non-success HTTP status code with the drained response body.
    #[error("http error {status} {status_text}")]
    Http {
        status: u16,
        status_text: String,
        body: ErrorBody,
        attempts: u32,
    },
    /// The caller's cancellation signal fired. Never retried.
    #[error("request cancelled by caller")]
    Cancelled,
    /// The retry policy failed validation before the first attempt.
    #[error("invalid retry policy: {0}")]
    InvalidPolicy(String),
    /// Fallback when the attempt loop ends without a recorded failure.
    #[error("retries exhausted after {attempts} attempt(s)")]
    RetriesExhausted { attempts: u32 },
}

/// Body of a terminal error response, decided once at read time.
#[derive(Clone, Debug, PartialEq)]
pub enum ErrorBody {
    Json(serde_json::Value),
    Text(String),
    Empty,
}

/// Error type returned by the OCR.space client layer.
#[derive(Debug, thiserror::Error)]
pub enum OcrSpaceError {
    /// Missing or unusable configuration (API key, endpoint).
    #[error("configuration error: {0}")]
    Config(String),
    /// The provider answered, but with a domain-level failure: bad
    /// response shape, non-success exit code, or no readable text.
    #[error("ocr.space: {message}")]
    Service {
        message: String,
        /// Raw response payload, when one was decoded.
        raw: Option<serde_json::Value>,
    },
    /// Core fetch failure, kind preserved for pattern matching.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// The image file could not be read for payload conversion.
    #[error("failed to read image file {}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Response decoding or protocol-shape validation error.
    #[error("decode error: {0}")]
    Decode(String),
}
