//! Face embedding over HTTP.
//!
//! The service receives one image as multipart field `image` and answers
//! `{"descriptors": [[f32; 128], ...]}`, one entry per detected face in
//! detection order. An empty list means no face was found.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

use super::{DESCRIPTOR_DIM, FaceDescriptor, FaceEmbedder};
use crate::error::FaceError;
use crate::uploads::ImageRef;

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    descriptors: Vec<Vec<f32>>,
}

/// Client for an external face detection + embedding service.
pub struct HttpFaceEmbedder {
    client: reqwest::Client,
    url: String,
}

impl HttpFaceEmbedder {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

/// First descriptor of a service response, checked for length.
fn first_descriptor(response: EmbedResponse) -> Result<Option<FaceDescriptor>, FaceError> {
    let Some(first) = response.descriptors.into_iter().next() else {
        return Ok(None);
    };
    if first.len() != DESCRIPTOR_DIM {
        return Err(FaceError::DimensionMismatch {
            expected: DESCRIPTOR_DIM,
            got: first.len(),
        });
    }
    Ok(Some(FaceDescriptor::new(first)))
}

#[async_trait]
impl FaceEmbedder for HttpFaceEmbedder {
    async fn first_face(&self, image: &ImageRef) -> Result<Option<FaceDescriptor>, FaceError> {
        let bytes = tokio::fs::read(image.path()).await?;
        let part = Part::bytes(bytes).file_name(image.file_name().to_string());
        let form = Form::new().part("image", part);

        let resp = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| FaceError::RequestFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(FaceError::RequestFailed(format!("{status}: {body}")));
        }

        let parsed: EmbedResponse = resp
            .json()
            .await
            .map_err(|e| FaceError::InvalidResponse(e.to_string()))?;
        debug!(image = image.file_name(), faces = parsed.descriptors.len(), "Faces embedded");
        first_descriptor(parsed)
    }
}
