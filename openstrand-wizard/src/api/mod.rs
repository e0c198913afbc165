// Catalog API collaborator
//
// The wizard consumes exactly four remote operations. `HttpCatalogApi` talks to the
// real service; `DemoCatalogApi` is a deterministic in-memory backend for smoke runs
// and tests.

pub mod client;
pub mod demo;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::requests::{SubmitCatalogDatasetRequest, VerifyDraftRequest};
use crate::models::responses::{DatasetSummary, SubmitAck, UploadDatasetResponse, VerificationResult};
use crate::models::state::DatasetFile;

pub use client::HttpCatalogApi;
pub use demo::DemoCatalogApi;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx response.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The service answered 2xx but refused the request (`success: false`).
    #[error("{0}")]
    Rejected(String),

    /// Connection, TLS or timeout failure.
    #[error("Network error: {0}")]
    Transport(String),

    /// The response body did not match the expected shape.
    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Message safe to show in a notification.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Http { status, message } if message.trim().is_empty() => {
                format!("The server returned HTTP {}.", status)
            }
            ApiError::Http { message, .. } => message.clone(),
            ApiError::Rejected(message) => message.clone(),
            ApiError::Transport(_) => {
                "Unable to reach the OpenStrand API. Check your connection and try again."
                    .to_string()
            }
            ApiError::Decode(_) => "The server sent an unexpected response.".to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

/// Remote operations the wizard depends on.
/// Production code uses `HttpCatalogApi`; tests use stubs.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Upload the raw file; returns the new dataset id and a metadata guess.
    async fn upload_dataset(&self, file: &DatasetFile) -> Result<UploadDatasetResponse, ApiError>;

    /// Read-only schema/profile snapshot of an uploaded dataset.
    async fn get_dataset_summary(&self, dataset_id: &str) -> Result<DatasetSummary, ApiError>;

    /// Duplicate + policy check of the draft.
    async fn verify_catalog_dataset_draft(
        &self,
        request: &VerifyDraftRequest,
    ) -> Result<VerificationResult, ApiError>;

    /// Publish the dataset to the catalog.
    async fn submit_catalog_dataset(
        &self,
        request: &SubmitCatalogDatasetRequest,
    ) -> Result<SubmitAck, ApiError>;
}
