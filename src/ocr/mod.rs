//! Card image reading: preprocessing, text recognition and PAN extraction.
//!
//! Both the preprocessor and the recognizer are external programs reached
//! through traits, so tests and alternative engines can replace them.

pub mod preprocess;
pub mod reader;
pub mod tesseract;

use async_trait::async_trait;

use crate::error::OcrError;
use crate::uploads::ImageRef;

pub use preprocess::{ConvertPreprocessor, NoPreprocess};
pub use reader::{PanReader, PanReadout};
pub use tesseract::TesseractEngine;

/// Turns an image into raw recognized text.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Engine name for logs.
    fn name(&self) -> &str;

    /// Recognize all text in the image. Lines are separated by `\n`.
    async fn recognize(&self, image: &ImageRef) -> Result<String, OcrError>;
}

/// Prepares an image for recognition, producing a new artifact.
#[async_trait]
pub trait ImagePreprocessor: Send + Sync {
    /// Returns the processed image. Returning the input unchanged is allowed.
    async fn preprocess(&self, image: &ImageRef) -> Result<ImageRef, OcrError>;
}

/// Run an external program to completion, returning its stdout.
pub(crate) async fn run_program(
    program: &str,
    args: &[&std::ffi::OsStr],
) -> Result<Vec<u8>, OcrError> {
    let output = tokio::process::Command::new(program)
        .args(args)
        .stdin(std::process::Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| OcrError::Spawn {
            program: program.to_string(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(OcrError::CommandFailed {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output.stdout)
}
