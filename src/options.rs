/// OCR engine selector for the parse endpoint.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OcrEngine {
    Engine1,
    Engine2,
    Engine3,
}

impl OcrEngine {
    /// Value sent in the `OCREngine` form field.
    pub fn form_value(self) -> &'static str {
        match self {
            Self::Engine1 => "1",
            Self::Engine2 => "2",
            Self::Engine3 => "3",
        }
    }
}

/// Per-call OCR tuning options.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseOptions {
    /// ISO 639-2 language hint, e.g. `"eng"`.
    pub language: String,
    pub engine: OcrEngine,
    /// Ask the provider to auto-rotate the input.
    pub detect_orientation: bool,
    /// Upscale low-resolution input before recognition.
    pub scale: bool,
    /// Preserve table structure in the extracted text.
    pub is_table: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            language: "eng".to_owned(),
            engine: OcrEngine::Engine2,
            detect_orientation: false,
            scale: true,
            is_table: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{OcrEngine, ParseOptions};

    #[test]
    fn defaults_match_the_parse_form() {
        let options = ParseOptions::default();
        assert_eq!(options.language, "eng");
        assert_eq!(options.engine, OcrEngine::Engine2);
        assert!(!options.detect_orientation);
        assert!(options.scale);
        assert!(!options.is_table);
    }

    #[test]
    fn engine_form_values() {
        assert_eq!(OcrEngine::Engine1.form_value(), "1");
        assert_eq!(OcrEngine::Engine2.form_value(), "2");
        assert_eq!(OcrEngine::Engine3.form_value(), "3");
    }
}
