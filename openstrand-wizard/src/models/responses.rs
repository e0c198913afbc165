// API response models
// Shapes returned by the OpenStrand catalog API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::state::{PlanTier, Visibility};

// =========================
// Generic wrapper
// =========================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            message: None,
        }
    }

    /// Best human-readable explanation carried by a failed envelope.
    pub fn failure_message(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "The server rejected the request.".to_string())
    }
}

// =========================
// Upload
// =========================

/// Metadata the backend inferred from the uploaded file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataGuess {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub plan_required: Option<PlanTier>,
    #[serde(default)]
    pub license: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadDatasetResponse {
    pub dataset_id: String,
    #[serde(default)]
    pub metadata: MetadataGuess,
}

// =========================
// Summary
// =========================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    pub row_count: u64,
    pub column_count: u64,
    #[serde(default)]
    pub columns: Vec<ColumnSummary>,
}

// =========================
// Verification
// =========================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Ok,
    Duplicate,
    Flagged,
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VerificationStatus::Ok => "ok",
            VerificationStatus::Duplicate => "duplicate",
            VerificationStatus::Flagged => "flagged",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateMatch {
    pub id: String,
    pub name: String,
    /// 0.0..=1.0
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub status: VerificationStatus,
    #[serde(default)]
    pub duplicates: Vec<DuplicateMatch>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl VerificationResult {
    pub fn ok() -> Self {
        Self {
            status: VerificationStatus::Ok,
            duplicates: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn best_match(&self) -> Option<&DuplicateMatch> {
        self.duplicates
            .iter()
            .max_by(|a, b| a.similarity.total_cmp(&b.similarity))
    }
}

// =========================
// Submit
// =========================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAck {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}
