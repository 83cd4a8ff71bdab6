//! serde mirror of the OCR.space parse response.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct ParseResponse {
    /// `1` on success. Absent on malformed provider responses, which is
    /// how shape validation detects them.
    #[serde(rename = "OCRExitCode")]
    pub exit_code: Option<i32>,
    #[serde(rename = "IsErroredOnProcessing", default)]
    pub is_errored_on_processing: bool,
    #[serde(rename = "ErrorMessage")]
    pub error_message: Option<ErrorMessage>,
    #[serde(rename = "ParsedResults", default)]
    pub parsed_results: Vec<ParsedResult>,
    #[serde(rename = "ProcessingTimeInMilliseconds")]
    pub processing_time_ms: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ParsedResult {
    #[serde(rename = "ParsedText")]
    pub parsed_text: Option<String>,
}

/// The provider emits either a single message or an array of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ErrorMessage {
    Single(String),
    Many(Vec<String>),
}

impl ErrorMessage {
    pub fn joined(&self) -> String {
        match self {
            Self::Single(message) => message.clone(),
            Self::Many(messages) => messages.join("; "),
        }
    }
}
