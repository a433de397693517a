//! Tesseract CLI recognizer tuned for PAN cards.

use std::ffi::OsStr;

use async_trait::async_trait;
use tracing::debug;

use super::{OcrEngine, run_program};
use crate::error::OcrError;
use crate::uploads::ImageRef;

/// PANs only contain uppercase letters and digits.
const CHAR_WHITELIST: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Recognition language passed to `-l`.
const LANGUAGE: &str = "eng";

/// Runs `tesseract <image> stdout` with settings suited to a single block of
/// card text: English, uniform block segmentation, LSTM engine only.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    binary: String,
}

impl TesseractEngine {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn args<'a>(&'a self, image: &'a ImageRef, whitelist: &'a str) -> Vec<&'a OsStr> {
        vec![
            image.path().as_os_str(),
            OsStr::new("stdout"),
            OsStr::new("-l"),
            OsStr::new(LANGUAGE),
            OsStr::new("--psm"),
            OsStr::new("6"),
            OsStr::new("--oem"),
            OsStr::new("1"),
            OsStr::new("-c"),
            OsStr::new(whitelist),
            OsStr::new("-c"),
            OsStr::new("preserve_interword_spaces=1"),
        ]
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize(&self, image: &ImageRef) -> Result<String, OcrError> {
        let whitelist = format!("tessedit_char_whitelist={CHAR_WHITELIST}");
        let stdout = run_program(&self.binary, &self.args(image, &whitelist)).await?;
        let text = String::from_utf8(stdout).map_err(|_| OcrError::InvalidOutput)?;
        debug!(image = %image.path().display(), chars = text.len(), "Tesseract finished");
        Ok(text)
    }
}
