// Wizard state (in-memory)
//
// NOTE: This is NOT persisted. A fresh `WizardState::default()` is created per wizard
// session and discarded on publish or cancel. It is only ever mutated through
// `wizard::reducer::reduce`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use uuid::Uuid;

use super::responses::{DatasetSummary, VerificationResult, VerificationStatus};
use crate::error::ValidationError;
use crate::wizard::steps::WizardStep;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Unlisted,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Unlisted => "unlisted",
            Visibility::Private => "private",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Some(Visibility::Public),
            "unlisted" => Some(Visibility::Unlisted),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }
}

/// Minimum subscription plan a consumer needs to access the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    #[default]
    Free,
    Basic,
    Pro,
    Team,
    Enterprise,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Basic => "basic",
            PlanTier::Pro => "pro",
            PlanTier::Team => "team",
            PlanTier::Enterprise => "enterprise",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Some(PlanTier::Free),
            "basic" => Some(PlanTier::Basic),
            "pro" => Some(PlanTier::Pro),
            "team" => Some(PlanTier::Team),
            "enterprise" => Some(PlanTier::Enterprise),
            _ => None,
        }
    }
}

pub const DEFAULT_LICENSE: &str = "CC-BY-4.0";

/// User-editable catalog fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetadata {
    pub name: String,
    pub description: String,
    pub visibility: Visibility,
    pub plan_required: PlanTier,
    pub license: String,
    pub tags: BTreeSet<String>,
    pub allow_strand_usage: bool,
}

impl Default for DatasetMetadata {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            visibility: Visibility::Public,
            plan_required: PlanTier::Free,
            license: DEFAULT_LICENSE.to_string(),
            tags: BTreeSet::new(),
            allow_strand_usage: true,
        }
    }
}

/// A file the user picked on the source step.
#[derive(Clone, PartialEq, Eq)]
pub struct DatasetFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for DatasetFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl DatasetFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, ValidationError> {
        if bytes.is_empty() {
            return Err(ValidationError::EmptyFile);
        }
        let file_name = file_name.into();
        let content_type = guess_content_type(&file_name).to_string();
        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }

    /// Read a dataset file from disk.
    pub async fn from_path(path: &Path) -> anyhow::Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read {:?}: {}", path, e))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "dataset".to_string());
        Ok(Self::new(file_name, bytes)?)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// File name without its extension, used as a fallback dataset name.
    pub fn stem(&self) -> &str {
        match self.file_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.file_name,
        }
    }
}

fn guess_content_type(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, e)| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => "text/csv",
        "tsv" => "text/tab-separated-values",
        "json" => "application/json",
        "ndjson" | "jsonl" => "application/x-ndjson",
        "parquet" => "application/vnd.apache.parquet",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}

/// The one asynchronous operation in flight, if any.
///
/// Replaces four independent busy booleans so that "at most one request at a time"
/// is structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Activity {
    #[default]
    Idle,
    Uploading,
    LoadingSummary,
    Verifying,
    Publishing,
}

impl Activity {
    pub fn is_idle(&self) -> bool {
        matches!(self, Activity::Idle)
    }

    /// Whether navigation and edits must wait. The summary fetch is informational only.
    pub fn is_blocking(&self) -> bool {
        !matches!(self, Activity::Idle | Activity::LoadingSummary)
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Activity::Idle => "idle",
            Activity::Uploading => "uploading",
            Activity::LoadingSummary => "loading summary",
            Activity::Verifying => "verifying",
            Activity::Publishing => "publishing",
        };
        write!(f, "{}", s)
    }
}

/// Fields the user has set explicitly. Upload guesses never overwrite these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EditedFields {
    pub visibility: bool,
    pub plan_required: bool,
    pub license: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WizardState {
    pub step: WizardStep,
    pub file: Option<DatasetFile>,
    pub dataset_id: Option<String>,
    pub metadata: DatasetMetadata,
    pub summary: Option<DatasetSummary>,
    pub verification: Option<VerificationResult>,
    pub acknowledged: bool,
    pub force_clone: bool,
    pub activity: Activity,
    pub edited: EditedFields,
    /// Identifies the summary fetch holding `Activity::LoadingSummary`.
    pub summary_ticket: Option<Uuid>,
}

impl WizardState {
    pub fn is_uploading(&self) -> bool {
        self.activity == Activity::Uploading
    }

    pub fn is_loading_summary(&self) -> bool {
        self.activity == Activity::LoadingSummary
    }

    pub fn is_verifying(&self) -> bool {
        self.activity == Activity::Verifying
    }

    pub fn is_publishing(&self) -> bool {
        self.activity == Activity::Publishing
    }

    pub fn verification_status(&self) -> Option<VerificationStatus> {
        self.verification.as_ref().map(|v| v.status)
    }

    /// True when the current verification result forces an explicit duplicate override.
    pub fn requires_force_clone(&self) -> bool {
        self.verification_status() == Some(VerificationStatus::Duplicate)
    }

    /// True when the user must acknowledge findings before publishing.
    /// A missing verification counts as "not ok".
    pub fn requires_acknowledgement(&self) -> bool {
        self.verification_status() != Some(VerificationStatus::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_pristine() {
        let s = WizardState::default();
        assert_eq!(s.step, WizardStep::Source);
        assert!(s.file.is_none());
        assert!(s.dataset_id.is_none());
        assert!(s.verification.is_none());
        assert!(!s.acknowledged);
        assert!(!s.force_clone);
        assert!(s.activity.is_idle());
        assert_eq!(s.metadata.license, DEFAULT_LICENSE);
        assert!(s.metadata.allow_strand_usage);
    }

    #[test]
    fn dataset_file_rejects_empty_bytes() {
        let err = DatasetFile::new("empty.csv", Vec::new()).unwrap_err();
        assert_eq!(err, ValidationError::EmptyFile);
    }

    #[test]
    fn dataset_file_guesses_content_type_and_stem() {
        let f = DatasetFile::new("Rainfall 2023.CSV", b"a,b\n1,2\n".to_vec()).unwrap();
        assert_eq!(f.content_type, "text/csv");
        assert_eq!(f.stem(), "Rainfall 2023");

        let f = DatasetFile::new("dump", vec![1, 2, 3]).unwrap();
        assert_eq!(f.content_type, "application/octet-stream");
        assert_eq!(f.stem(), "dump");
    }

    #[test]
    fn enum_parsing_is_case_insensitive() {
        assert_eq!(Visibility::parse(" Unlisted "), Some(Visibility::Unlisted));
        assert_eq!(Visibility::parse("secret"), None);
        assert_eq!(PlanTier::parse("PRO"), Some(PlanTier::Pro));
        assert_eq!(PlanTier::parse(""), None);
    }

    #[test]
    fn only_summary_loading_leaves_input_open() {
        assert!(!Activity::Idle.is_blocking());
        assert!(!Activity::LoadingSummary.is_blocking());
        assert!(Activity::Uploading.is_blocking());
        assert!(Activity::Verifying.is_blocking());
        assert!(Activity::Publishing.is_blocking());
    }

    #[test]
    fn missing_verification_requires_acknowledgement() {
        let s = WizardState::default();
        assert!(s.requires_acknowledgement());
        assert!(!s.requires_force_clone());
    }
}
