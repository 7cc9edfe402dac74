//! Sightings backend client
//!
//! `GET {API_URL}/sightings` and multipart `POST {API_URL}/sightings`.

use super::submission_pipeline::SubmissionPayload;
use crate::models::{decode_sightings, Sighting, SightingId};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("icewatch/", env!("CARGO_PKG_VERSION"));
const IMAGE_FILE_NAME: &str = "sighting.png";
const IMAGE_MIME: &str = "image/png";

/// Default HTTP request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Backend client errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BackendError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Backend acknowledgement of a new sighting
#[derive(Debug, Clone, PartialEq)]
pub struct Acknowledgement {
    /// HTTP status of the accepted post
    pub status: u16,
    /// Server-assigned id, when the response body carried one
    pub server_id: Option<SightingId>,
}

/// Transport used by the repository and the submission pipeline
#[async_trait]
pub trait SightingsBackend: Send + Sync {
    async fn fetch_sightings(&self) -> Result<Vec<Sighting>, BackendError>;

    async fn post_sighting(&self, payload: SubmissionPayload) -> Result<Acknowledgement, BackendError>;
}

/// HTTP implementation over reqwest
pub struct HttpBackend {
    http_client: reqwest::Client,
    sightings_url: String,
}

impl HttpBackend {
    /// `api_url` is the backend base URL, with or without a trailing slash
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            sightings_url: format!("{}/sightings", api_url.trim_end_matches('/')),
        })
    }

    pub fn sightings_url(&self) -> &str {
        &self.sightings_url
    }
}

#[async_trait]
impl SightingsBackend for HttpBackend {
    async fn fetch_sightings(&self) -> Result<Vec<Sighting>, BackendError> {
        tracing::debug!(url = %self.sightings_url, "Fetching sightings");

        let response = self
            .http_client
            .get(&self.sightings_url)
            .send()
            .await
            .map_err(|e| BackendError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(BackendError::ApiError(status.as_u16(), error_text));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| BackendError::NetworkError(e.to_string()))?;

        let decoded = decode_sightings(&body).map_err(BackendError::ParseError)?;

        tracing::debug!(
            count = decoded.sightings.len(),
            skipped = decoded.skipped,
            "Fetched sightings"
        );

        Ok(decoded.sightings)
    }

    async fn post_sighting(&self, payload: SubmissionPayload) -> Result<Acknowledgement, BackendError> {
        let SubmissionPayload {
            description,
            lat,
            lng,
            device_id,
            image,
        } = payload;

        let image_part = Part::bytes(image)
            .file_name(IMAGE_FILE_NAME)
            .mime_str(IMAGE_MIME)
            .map_err(|e| BackendError::NetworkError(e.to_string()))?;

        let form = Form::new()
            .text("description", description)
            .text("lat", lat.to_string())
            .text("lng", lng.to_string())
            .text("deviceId", device_id)
            .part("image", image_part);

        tracing::debug!(url = %self.sightings_url, "Posting sighting");

        let response = self
            .http_client
            .post(&self.sightings_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| BackendError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(BackendError::ApiError(status.as_u16(), error_text));
        }

        // The body is informational only; an unreadable one still counts as accepted
        let body = response.text().await.unwrap_or_default();

        Ok(Acknowledgement {
            status: status.as_u16(),
            server_id: server_id_from_body(&body),
        })
    }
}

/// Pull `id` (or `sighting.id`) out of a JSON acknowledgement body, if present
fn server_id_from_body(body: &str) -> Option<SightingId> {
    let value: Value = serde_json::from_str(body).ok()?;
    let id = value
        .get("id")
        .or_else(|| value.get("sighting").and_then(|s| s.get("id")))?;

    match id {
        Value::Number(n) => Some(SightingId::new(n.to_string())),
        Value::String(s) if !s.is_empty() => Some(SightingId::new(s.clone())),
        _ => None,
    }
}
