// API request models

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::state::{DatasetMetadata, PlanTier, Visibility};

/// Draft sent to the duplicate/policy check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyDraftRequest {
    pub dataset_id: String,
    pub name: String,
    pub description: String,
    pub tags: BTreeSet<String>,
    pub license: String,
    pub visibility: Visibility,
}

impl VerifyDraftRequest {
    pub fn from_metadata(dataset_id: &str, metadata: &DatasetMetadata) -> Self {
        Self {
            dataset_id: dataset_id.to_string(),
            name: metadata.name.trim().to_string(),
            description: metadata.description.trim().to_string(),
            tags: metadata.tags.clone(),
            license: metadata.license.trim().to_string(),
            visibility: metadata.visibility,
        }
    }
}

/// Final catalog submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitCatalogDatasetRequest {
    pub dataset_id: String,
    pub name: String,
    pub description: String,
    pub visibility: Visibility,
    pub plan_required: PlanTier,
    pub tags: BTreeSet<String>,
    pub license: String,
    pub allow_strand_usage: bool,
    pub force_duplicate: bool,
}

impl SubmitCatalogDatasetRequest {
    pub fn from_metadata(dataset_id: &str, metadata: &DatasetMetadata, force_duplicate: bool) -> Self {
        Self {
            dataset_id: dataset_id.to_string(),
            name: metadata.name.trim().to_string(),
            description: metadata.description.trim().to_string(),
            visibility: metadata.visibility,
            plan_required: metadata.plan_required,
            tags: metadata.tags.clone(),
            license: metadata.license.trim().to_string(),
            allow_strand_usage: metadata.allow_strand_usage,
            force_duplicate,
        }
    }
}
