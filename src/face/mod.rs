//! Face matching between a live capture and the PAN card photo.
//!
//! Detection and embedding happen in an external collaborator behind
//! [`FaceEmbedder`]; this module only compares descriptors.

pub mod http;
pub mod models;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::FaceError;
use crate::uploads::ImageRef;

pub use http::HttpFaceEmbedder;
pub use models::{ModelBundle, ModelStatus, ModelStore};

/// Distance below which two descriptors belong to the same person.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.6;

/// Length of a face recognition descriptor.
pub const DESCRIPTOR_DIM: usize = 128;

/// Which of the two compared images a result refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceSide {
    /// The webcam capture.
    LiveCapture,
    /// The photo on the PAN card.
    Reference,
}

impl std::fmt::Display for FaceSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LiveCapture => write!(f, "webcam image"),
            Self::Reference => write!(f, "PAN card image"),
        }
    }
}

/// Fixed-length embedding of one detected face.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceDescriptor(Vec<f32>);

impl FaceDescriptor {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Euclidean distance to another descriptor of the same length.
    pub fn distance(&self, other: &FaceDescriptor) -> Result<f32, FaceError> {
        if self.len() != other.len() {
            return Err(FaceError::DimensionMismatch {
                expected: self.len(),
                got: other.len(),
            });
        }
        let sum: f32 = self
            .0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        Ok(sum.sqrt())
    }
}

/// Outcome of comparing two images.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum FaceMatch {
    Match { distance: f32 },
    NoMatch { distance: f32 },
    NoFaceDetected { side: FaceSide },
}

/// `Match` iff `distance < threshold`.
pub fn classify(distance: f32, threshold: f32) -> FaceMatch {
    if distance < threshold {
        FaceMatch::Match { distance }
    } else {
        FaceMatch::NoMatch { distance }
    }
}

/// Detects faces in an image and embeds the first one found.
#[async_trait]
pub trait FaceEmbedder: Send + Sync {
    /// Descriptor of the first detected face, or None when there is no face.
    /// Additional faces are ignored.
    async fn first_face(&self, image: &ImageRef) -> Result<Option<FaceDescriptor>, FaceError>;
}

/// Stand-in used when no embedding service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledEmbedder;

#[async_trait]
impl FaceEmbedder for DisabledEmbedder {
    async fn first_face(&self, _image: &ImageRef) -> Result<Option<FaceDescriptor>, FaceError> {
        Err(FaceError::ServiceNotConfigured)
    }
}

/// Compares a live capture against a reference photo.
pub struct FaceMatcher {
    embedder: Arc<dyn FaceEmbedder>,
    threshold: f32,
}

impl FaceMatcher {
    pub fn new(embedder: Arc<dyn FaceEmbedder>, threshold: f32) -> Self {
        Self {
            embedder,
            threshold,
        }
    }

    /// Embed both images concurrently, then compare.
    ///
    /// A missing face short-circuits to `NoFaceDetected` before any distance
    /// is computed; the live capture is checked first.
    pub async fn compare(
        &self,
        live: &ImageRef,
        reference: &ImageRef,
    ) -> Result<FaceMatch, FaceError> {
        let (live_face, reference_face) = tokio::join!(
            self.embedder.first_face(live),
            self.embedder.first_face(reference)
        );

        let Some(live_face) = live_face? else {
            return Ok(FaceMatch::NoFaceDetected {
                side: FaceSide::LiveCapture,
            });
        };
        let Some(reference_face) = reference_face? else {
            return Ok(FaceMatch::NoFaceDetected {
                side: FaceSide::Reference,
            });
        };

        let distance = live_face.distance(&reference_face)?;
        let outcome = classify(distance, self.threshold);
        info!(
            distance,
            threshold = self.threshold,
            matched = matches!(outcome, FaceMatch::Match { .. }),
            "Face comparison"
        );
        Ok(outcome)
    }
}
