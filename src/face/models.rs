//! Face model bundles served to the browser client.
//!
//! The client loads three bundles before it enables the face step: the tiny
//! face detector, the 68-point landmark net and the recognition net. Each is
//! a weights manifest plus one or more binary shards.

use std::path::PathBuf;

use serde::Serialize;
use tokio::fs;
use tracing::{info, warn};

use crate::error::FaceError;

/// A downloadable model file.
#[derive(Debug, Clone, Copy)]
pub struct ModelFile {
    pub name: &'static str,
    /// Approximate size in bytes for shards; manifests are not checked.
    pub expected_size: Option<u64>,
}

const fn manifest(name: &'static str) -> ModelFile {
    ModelFile {
        name,
        expected_size: None,
    }
}

const fn shard(name: &'static str, expected_size: u64) -> ModelFile {
    ModelFile {
        name,
        expected_size: Some(expected_size),
    }
}

const DETECTOR_FILES: &[ModelFile] = &[
    manifest("tiny_face_detector_model-weights_manifest.json"),
    shard("tiny_face_detector_model-shard1", 190_000),
];

const LANDMARK_FILES: &[ModelFile] = &[
    manifest("face_landmark_68_model-weights_manifest.json"),
    shard("face_landmark_68_model-shard1", 350_000),
];

const RECOGNITION_FILES: &[ModelFile] = &[
    manifest("face_recognition_model-weights_manifest.json"),
    shard("face_recognition_model-shard1", 2_000_000),
    shard("face_recognition_model-shard2", 2_000_000),
];

/// Shards smaller than this fraction of their expected size are reported.
const MIN_SIZE_RATIO: f64 = 0.9;

/// One of the three model bundles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelBundle {
    TinyFaceDetector,
    FaceLandmark68,
    FaceRecognition,
}

impl ModelBundle {
    pub const ALL: [ModelBundle; 3] = [
        ModelBundle::TinyFaceDetector,
        ModelBundle::FaceLandmark68,
        ModelBundle::FaceRecognition,
    ];

    pub fn files(&self) -> &'static [ModelFile] {
        match self {
            Self::TinyFaceDetector => DETECTOR_FILES,
            Self::FaceLandmark68 => LANDMARK_FILES,
            Self::FaceRecognition => RECOGNITION_FILES,
        }
    }
}

impl std::fmt::Display for ModelBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::TinyFaceDetector => "tiny_face_detector",
            Self::FaceLandmark68 => "face_landmark_68",
            Self::FaceRecognition => "face_recognition",
        };
        write!(f, "{s}")
    }
}

/// Presence of one bundle on disk.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleStatus {
    pub bundle: ModelBundle,
    pub ready: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
}

/// Presence of all bundles.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelStatus {
    pub ready: bool,
    pub bundles: Vec<BundleStatus>,
}

/// Directory holding the model files.
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Path of a known model file. Unknown names return None, so callers
    /// can't be tricked into serving anything else from disk.
    pub fn file_path(&self, name: &str) -> Option<PathBuf> {
        ModelBundle::ALL
            .iter()
            .flat_map(|b| b.files())
            .find(|f| f.name == name)
            .map(|f| self.dir.join(f.name))
    }

    /// Which bundles are fully present.
    pub async fn status(&self) -> ModelStatus {
        let mut bundles = Vec::with_capacity(ModelBundle::ALL.len());
        for bundle in ModelBundle::ALL {
            let mut missing = Vec::new();
            for file in bundle.files() {
                if fs::metadata(self.dir.join(file.name)).await.is_err() {
                    missing.push(file.name.to_string());
                }
            }
            bundles.push(BundleStatus {
                bundle,
                ready: missing.is_empty(),
                missing,
            });
        }
        ModelStatus {
            ready: bundles.iter().all(|b| b.ready),
            bundles,
        }
    }

    /// Fail unless every bundle is present.
    pub async fn ensure_ready(&self) -> Result<(), FaceError> {
        let status = self.status().await;
        if status.ready {
            return Ok(());
        }
        Err(FaceError::ModelsNotReady {
            missing: status
                .bundles
                .into_iter()
                .filter(|b| !b.ready)
                .map(|b| b.bundle.to_string())
                .collect(),
        })
    }

    /// Download every model file from `base_url`, replacing existing copies.
    pub async fn download_all(
        &self,
        client: &reqwest::Client,
        base_url: &str,
    ) -> Result<(), FaceError> {
        fs::create_dir_all(&self.dir).await?;

        let files: Vec<&ModelFile> = ModelBundle::ALL.iter().flat_map(|b| b.files()).collect();

        for file in &files {
            let path = self.dir.join(file.name);
            if fs::metadata(&path).await.is_ok() {
                fs::remove_file(&path).await?;
                info!(file = file.name, "Removed existing model file");
            }
        }

        for file in files {
            self.download_file(client, base_url, file).await?;
        }
        info!(dir = %self.dir.display(), "All face models downloaded");
        Ok(())
    }

    async fn download_file(
        &self,
        client: &reqwest::Client,
        base_url: &str,
        file: &ModelFile,
    ) -> Result<(), FaceError> {
        let url = format!("{}/{}", base_url.trim_end_matches('/'), file.name);
        info!(url = %url, "Downloading model file");

        let download_err = |reason: String| FaceError::Download {
            file: file.name.to_string(),
            reason,
        };

        let resp = client
            .get(&url)
            .send()
            .await
            .map_err(|e| download_err(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(download_err(format!("HTTP {}", resp.status())));
        }
        let bytes = resp.bytes().await.map_err(|e| download_err(e.to_string()))?;

        let path = self.dir.join(file.name);
        if let Err(e) = fs::write(&path, &bytes).await {
            let _ = fs::remove_file(&path).await;
            return Err(e.into());
        }

        let size = bytes.len() as u64;
        if is_undersized(file, size) {
            warn!(
                file = file.name,
                size,
                expected = file.expected_size,
                "Model file is smaller than expected"
            );
        } else {
            info!(file = file.name, size, "Model file downloaded");
        }
        Ok(())
    }
}

fn is_undersized(file: &ModelFile, size: u64) -> bool {
    file.expected_size
        .is_some_and(|expected| (size as f64) < expected as f64 * MIN_SIZE_RATIO)
}
