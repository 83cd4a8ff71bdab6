use std::fmt;
use std::path::Path;
use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};
use tokio_util::sync::CancellationToken;

use crate::{
    fetch::fetch_with_retry,
    image,
    request::{Payload, RequestSpec},
    wire, OcrSpaceError, ParseOptions, RetryPolicy,
};

/// Default parse endpoint of the hosted OCR.space API.
pub const OCRSPACE_PARSE_ENDPOINT: &str = "https://api.ocr.space/parse/image";

const API_KEY_ENV: &str = "OCRSPACE_API_KEY";
const ENDPOINT_ENV: &str = "OCRSPACE_ENDPOINT";

/// Extracted text plus the provider's raw response payload.
#[derive(Clone, Debug, PartialEq)]
pub struct OcrResult {
    pub text: String,
    pub raw: serde_json::Value,
}

#[derive(Clone)]
/// HTTP client for the OCR.space `parse/image` endpoint.
pub struct OcrSpaceClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    policy: RetryPolicy,
}

impl fmt::Debug for OcrSpaceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OcrSpaceClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("policy", &self.policy)
            .finish()
    }
}

impl OcrSpaceClient {
    /// Creates a client for the hosted OCR.space API.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: OCRSPACE_PARSE_ENDPOINT.to_owned(),
            api_key: api_key.into(),
            policy: Self::default_policy(),
        }
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `OCRSPACE_API_KEY` — API key (required, must be non-empty)
    /// - `OCRSPACE_ENDPOINT` — parse endpoint override (optional)
    ///
    /// There is no demo-key fallback: a missing key is a configuration
    /// error.
    pub fn from_env() -> Result<Self, OcrSpaceError> {
        let api_key = std::env::var(API_KEY_ENV).map_err(|_| {
            OcrSpaceError::Config(format!("missing {API_KEY_ENV} environment variable"))
        })?;
        if api_key.trim().is_empty() {
            return Err(OcrSpaceError::Config(format!(
                "{API_KEY_ENV} is set but empty"
            )));
        }

        let mut client = Self::new(api_key);
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            if !endpoint.trim().is_empty() {
                client = client.with_endpoint(endpoint);
            }
        }
        Ok(client)
    }

    /// Points the client at a different parse endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Replaces the retry policy for subsequent calls.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Attaches a caller-owned cancellation token to the retry policy.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.policy = self.policy.with_cancellation(token);
        self
    }

    /// OCR calls tolerate slower responses and more transient failures
    /// than the generic defaults.
    fn default_policy() -> RetryPolicy {
        RetryPolicy::default()
            .with_timeout(Duration::from_millis(20_000))
            .with_max_retries(3)
            .with_base_backoff(Duration::from_millis(700))
    }

    /// Reads an image file and extracts its text.
    pub async fn parse_file(
        &self,
        path: impl AsRef<Path>,
        options: &ParseOptions,
    ) -> Result<OcrResult, OcrSpaceError> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "starting OCR for image file");
        let base64_image = image::file_to_base64(path).await?;
        self.parse_base64(&base64_image, options).await
    }

    /// Extracts text from an already base64-encoded image.
    pub async fn parse_base64(
        &self,
        base64_image: &str,
        options: &ParseOptions,
    ) -> Result<OcrResult, OcrSpaceError> {
        tracing::debug!(engine = options.engine.form_value(), "calling OCR.space parse API");
        let spec = self.build_parse_request(base64_image, options)?;

        let response = fetch_with_retry(&self.http, &spec, &self.policy)
            .await
            .map_err(|error| {
                tracing::error!(%error, "OCR.space request failed");
                OcrSpaceError::from(error)
            })?;

        let body = response.text().await.map_err(|error| {
            OcrSpaceError::Decode(format!("failed to read parse response body: {error}"))
        })?;
        let raw: serde_json::Value = serde_json::from_str(&body).map_err(|error| {
            OcrSpaceError::Decode(format!("invalid parse response JSON: {error}"))
        })?;
        let parsed: wire::ParseResponse = serde_json::from_value(raw.clone()).map_err(|error| {
            OcrSpaceError::Decode(format!("unexpected parse response layout: {error}"))
        })?;
        tracing::debug!(
            processing_time_ms = parsed.processing_time_ms.as_deref().unwrap_or("unknown"),
            "OCR.space raw response received"
        );

        Self::extract_text(parsed, raw)
    }

    fn build_parse_request(
        &self,
        base64_image: &str,
        options: &ParseOptions,
    ) -> Result<RequestSpec, OcrSpaceError> {
        let api_key = HeaderValue::from_str(&self.api_key).map_err(|_| {
            OcrSpaceError::Config(
                "API key contains characters not permitted in an HTTP header".to_owned(),
            )
        })?;

        let fields = vec![
            (
                "base64Image".to_owned(),
                format!("data:image/jpeg;base64,{base64_image}"),
            ),
            ("language".to_owned(), options.language.clone()),
            ("OCREngine".to_owned(), options.engine.form_value().to_owned()),
            (
                "detectOrientation".to_owned(),
                bool_field(options.detect_orientation),
            ),
            ("scale".to_owned(), bool_field(options.scale)),
            ("isTable".to_owned(), bool_field(options.is_table)),
        ];

        Ok(RequestSpec::post(&self.endpoint)
            .with_header(HeaderName::from_static("apikey"), api_key)
            .with_payload(Payload::Form(fields)))
    }

    fn extract_text(
        parsed: wire::ParseResponse,
        raw: serde_json::Value,
    ) -> Result<OcrResult, OcrSpaceError> {
        let Some(exit_code) = parsed.exit_code else {
            return Err(OcrSpaceError::Service {
                message: "unexpected OCR API response shape".to_owned(),
                raw: Some(raw),
            });
        };

        if exit_code != 1 || parsed.is_errored_on_processing {
            let detail = parsed
                .error_message
                .map(|message| message.joined())
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| "unknown OCR failure".to_owned());
            return Err(OcrSpaceError::Service {
                message: format!("OCR failed: {detail}"),
                raw: Some(raw),
            });
        }

        let text = parsed
            .parsed_results
            .first()
            .and_then(|result| result.parsed_text.as_deref())
            .map(str::trim)
            .unwrap_or_default()
            .to_owned();

        if text.is_empty() {
            return Err(OcrSpaceError::Service {
                message: "no readable text found".to_owned(),
                raw: Some(raw),
            });
        }

        Ok(OcrResult { text, raw })
    }
}

fn bool_field(value: bool) -> String {
    if value { "true" } else { "false" }.to_owned()
}
