//! `ocrspace-http` is an async HTTP client for the OCR.space parse API.
//!
//! The crate is built around a reusable resilient request core:
//! - [`fetch_with_retry`] issues one logical request with a per-attempt
//!   timeout, exponential-backoff retries, and typed failure
//!   classification ([`FetchError`]).
//! - [`cancel::merge`] composes a caller-owned cancellation token with
//!   an attempt's internal timeout token.
//!
//! [`OcrSpaceClient`] layers the OCR.space domain on top: form
//! construction, response validation, and mapping into
//! [`OcrSpaceError`].

pub mod cancel;
mod error;
mod fetch;
mod image;
mod ocr;
mod options;
mod policy;
mod request;
mod wire;

pub use error::{ErrorBody, FetchError, OcrSpaceError};
pub use fetch::fetch_with_retry;
pub use image::file_to_base64;
pub use ocr::{OcrResult, OcrSpaceClient, OCRSPACE_PARSE_ENDPOINT};
pub use options::{OcrEngine, ParseOptions};
pub use policy::{default_retryable, RetryPolicy, RetryPredicate};
pub use request::{Payload, RequestSpec};

/// Re-exported so callers can create cancellation tokens without
/// depending on `tokio-util` themselves.
pub use tokio_util::sync::CancellationToken;

pub type Result<T> = std::result::Result<T, OcrSpaceError>;
