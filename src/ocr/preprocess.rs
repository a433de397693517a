//! Image preprocessing ahead of OCR.

use std::ffi::OsStr;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use super::{ImagePreprocessor, run_program};
use crate::error::OcrError;
use crate::uploads::ImageRef;

/// Produces a high-contrast binary image with ImageMagick `convert`: fit
/// within 2000x2000 without enlarging, grayscale, normalize, sharpen, then
/// threshold at mid-gray.
#[derive(Debug, Clone)]
pub struct ConvertPreprocessor {
    binary: String,
}

impl ConvertPreprocessor {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

/// `card.png` -> `card_processed.jpg`, next to the input.
pub fn processed_path(image: &ImageRef) -> PathBuf {
    let stem = image
        .path()
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    image.path().with_file_name(format!("{stem}_processed.jpg"))
}

#[async_trait]
impl ImagePreprocessor for ConvertPreprocessor {
    async fn preprocess(&self, image: &ImageRef) -> Result<ImageRef, OcrError> {
        let output = processed_path(image);
        let args: [&OsStr; 11] = [
            image.path().as_os_str(),
            OsStr::new("-resize"),
            OsStr::new("2000x2000>"),
            OsStr::new("-colorspace"),
            OsStr::new("Gray"),
            OsStr::new("-normalize"),
            OsStr::new("-sharpen"),
            OsStr::new("0x1"),
            OsStr::new("-threshold"),
            OsStr::new("50%"),
            output.as_os_str(),
        ];
        run_program(&self.binary, &args).await?;
        debug!(output = %output.display(), "Preprocessed image saved");
        Ok(ImageRef::new(output))
    }
}

/// Passes images through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPreprocess;

#[async_trait]
impl ImagePreprocessor for NoPreprocess {
    async fn preprocess(&self, image: &ImageRef) -> Result<ImageRef, OcrError> {
        Ok(image.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processed_path_sits_next_to_input() {
        let image = ImageRef::new("/data/uploads/1700000000-abcd.png");
        assert_eq!(
            processed_path(&image),
            PathBuf::from("/data/uploads/1700000000-abcd_processed.jpg")
        );
    }

    #[tokio::test]
    async fn no_preprocess_returns_input() {
        let image = ImageRef::new("/tmp/x.png");
        assert_eq!(NoPreprocess.preprocess(&image).await.unwrap(), image);
    }
}
