//! Card reading: preprocess, recognize, extract, clean up.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::{ImagePreprocessor, OcrEngine};
use crate::error::OcrError;
use crate::pan::PanNumber;
use crate::pan::extract::{ExtractionStage, extract_pan_with_stage};
use crate::uploads::ImageRef;

/// What was read off a card image.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanReadout {
    /// The extracted PAN, or None when manual entry is needed.
    pub pan_number: Option<PanNumber>,
    /// Which extraction stage matched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<ExtractionStage>,
    /// Raw recognized text.
    pub full_text: String,
}

/// Reads PAN cards by chaining a preprocessor, an OCR engine and the PAN
/// extraction pipeline.
pub struct PanReader {
    preprocessor: Arc<dyn ImagePreprocessor>,
    engine: Arc<dyn OcrEngine>,
}

impl PanReader {
    pub fn new(preprocessor: Arc<dyn ImagePreprocessor>, engine: Arc<dyn OcrEngine>) -> Self {
        Self {
            preprocessor,
            engine,
        }
    }

    /// Read a card image.
    ///
    /// A failed preprocess falls back to the original image. The processed
    /// artifact is removed afterwards whether or not recognition succeeded.
    pub async fn read(&self, image: &ImageRef) -> Result<PanReadout, OcrError> {
        let processed = match self.preprocessor.preprocess(image).await {
            Ok(processed) => processed,
            Err(e) => {
                warn!(
                    image = %image.path().display(),
                    error = %e,
                    "Preprocessing failed, using original image"
                );
                image.clone()
            }
        };

        let recognized = self.engine.recognize(&processed).await;

        if processed != *image {
            remove_artifact(&processed).await;
        }

        let full_text = recognized?;
        let extraction = extract_pan_with_stage(&full_text);
        info!(
            engine = self.engine.name(),
            found = extraction.is_some(),
            stage = ?extraction.as_ref().map(|(_, stage)| *stage),
            "PAN card processed"
        );

        let (pan_number, stage) = match extraction {
            Some((pan, stage)) => (Some(pan), Some(stage)),
            None => (None, None),
        };
        Ok(PanReadout {
            pan_number,
            stage,
            full_text,
        })
    }
}

/// Best-effort delete; failures are logged, never propagated.
async fn remove_artifact(image: &ImageRef) {
    if let Err(e) = tokio::fs::remove_file(image.path()).await {
        warn!(path = %image.path().display(), error = %e, "Failed to delete processed image");
    }
}
