use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::OcrSpaceError;

/// Reads an image file and encodes it as base64 for form submission.
pub async fn file_to_base64(path: impl AsRef<Path>) -> Result<String, OcrSpaceError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| OcrSpaceError::Image {
            path: path.to_owned(),
            source,
        })?;
    Ok(STANDARD.encode(bytes))
}
