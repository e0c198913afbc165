// In-memory catalog backend
//
// Deterministic stand-in for the OpenStrand API used by `--smoke` and the tests. Not
// durable. It profiles delimited/JSON uploads, verifies drafts against the datasets it
// has published (plus any seeded entries), and can be told to fail the next call of an
// operation.

use async_trait::async_trait;
use chrono::NaiveDate;
use log::info;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use super::{ApiError, CatalogApi};
use crate::models::requests::{SubmitCatalogDatasetRequest, VerifyDraftRequest};
use crate::models::responses::{
    ColumnSummary, DatasetSummary, DuplicateMatch, MetadataGuess, SubmitAck,
    UploadDatasetResponse, VerificationResult, VerificationStatus,
};
use crate::models::state::DatasetFile;

pub const DUPLICATE_THRESHOLD: f64 = 0.85;
pub const FLAG_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DemoOperation {
    Upload,
    Summary,
    Verify,
    Submit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedEntry {
    pub id: String,
    pub name: String,
}

#[derive(Default)]
struct DemoInner {
    next_id: u64,
    uploads: HashMap<String, DatasetSummary>,
    published: Vec<PublishedEntry>,
    submissions: Vec<SubmitCatalogDatasetRequest>,
    failures: HashMap<DemoOperation, String>,
    calls: HashMap<DemoOperation, u32>,
}

#[derive(Default)]
pub struct DemoCatalogApi {
    inner: Mutex<DemoInner>,
}

impl DemoCatalogApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an already-published catalog entry.
    pub fn with_published(self, id: &str, name: &str) -> Self {
        self.lock().published.push(PublishedEntry {
            id: id.to_string(),
            name: name.to_string(),
        });
        self
    }

    /// Make the next call of `op` fail with `message`.
    pub fn fail_next(&self, op: DemoOperation, message: &str) {
        self.lock().failures.insert(op, message.to_string());
    }

    pub fn call_count(&self, op: DemoOperation) -> u32 {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn published(&self) -> Vec<PublishedEntry> {
        self.lock().published.clone()
    }

    pub fn submissions(&self) -> Vec<SubmitCatalogDatasetRequest> {
        self.lock().submissions.clone()
    }

    fn lock(&self) -> MutexGuard<'_, DemoInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Count the call and pop any scripted failure for it.
    fn enter(&self, op: DemoOperation) -> Result<MutexGuard<'_, DemoInner>, ApiError> {
        let mut inner = self.lock();
        *inner.calls.entry(op).or_insert(0) += 1;
        if let Some(message) = inner.failures.remove(&op) {
            return Err(ApiError::Http {
                status: 503,
                message,
            });
        }
        Ok(inner)
    }
}

#[async_trait]
impl CatalogApi for DemoCatalogApi {
    async fn upload_dataset(&self, file: &DatasetFile) -> Result<UploadDatasetResponse, ApiError> {
        let mut inner = self.enter(DemoOperation::Upload)?;
        let summary = profile(file)?;
        inner.next_id += 1;
        let dataset_id = format!("ds_{}", inner.next_id);
        inner.uploads.insert(dataset_id.clone(), summary);
        info!(
            "[PHASE: demo_api] [STEP: upload] Stored {} ({} bytes) as {}",
            file.file_name,
            file.len(),
            dataset_id
        );

        Ok(UploadDatasetResponse {
            dataset_id,
            metadata: guess_metadata(file),
        })
    }

    async fn get_dataset_summary(&self, dataset_id: &str) -> Result<DatasetSummary, ApiError> {
        let inner = self.enter(DemoOperation::Summary)?;
        inner.uploads.get(dataset_id).cloned().ok_or_else(|| not_found(dataset_id))
    }

    async fn verify_catalog_dataset_draft(
        &self,
        request: &VerifyDraftRequest,
    ) -> Result<VerificationResult, ApiError> {
        let inner = self.enter(DemoOperation::Verify)?;
        if !inner.uploads.contains_key(&request.dataset_id) {
            return Err(not_found(&request.dataset_id));
        }
        Ok(verify_draft(request, &inner.published))
    }

    async fn submit_catalog_dataset(
        &self,
        request: &SubmitCatalogDatasetRequest,
    ) -> Result<SubmitAck, ApiError> {
        let mut inner = self.enter(DemoOperation::Submit)?;
        if !inner.uploads.contains_key(&request.dataset_id) {
            return Err(not_found(&request.dataset_id));
        }
        let duplicate = find_matches(&request.name, &inner.published)
            .iter()
            .any(|m| m.similarity >= DUPLICATE_THRESHOLD);
        if duplicate && !request.force_duplicate {
            return Err(ApiError::Http {
                status: 409,
                message: "A matching dataset already exists in the catalog.".to_string(),
            });
        }

        inner.published.push(PublishedEntry {
            id: request.dataset_id.clone(),
            name: request.name.clone(),
        });
        inner.submissions.push(request.clone());
        Ok(SubmitAck {
            id: Some(request.dataset_id.clone()),
            status: Some("published".to_string()),
        })
    }
}

fn not_found(dataset_id: &str) -> ApiError {
    ApiError::Http {
        status: 404,
        message: format!("Dataset {} was not found.", dataset_id),
    }
}

// =============================================================================
// Verification
// =============================================================================

fn name_tokens(name: &str) -> BTreeSet<String> {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Token Jaccard similarity, rounded to two decimals.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let ta = name_tokens(a);
    let tb = name_tokens(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let inter = ta.intersection(&tb).count() as f64;
    let union = ta.union(&tb).count() as f64;
    ((inter / union) * 100.0).round() / 100.0
}

fn find_matches(name: &str, published: &[PublishedEntry]) -> Vec<DuplicateMatch> {
    let mut matches: Vec<DuplicateMatch> = published
        .iter()
        .map(|p| DuplicateMatch {
            id: p.id.clone(),
            name: p.name.clone(),
            similarity: name_similarity(name, &p.name),
        })
        .filter(|m| m.similarity >= FLAG_THRESHOLD)
        .collect();
    matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    matches
}

fn verify_draft(request: &VerifyDraftRequest, published: &[PublishedEntry]) -> VerificationResult {
    let duplicates = find_matches(&request.name, published);

    let mut warnings = Vec::new();
    if request.description.trim().is_empty() {
        warnings.push("Add a description so others can find this dataset.".to_string());
    }
    if request.tags.is_empty() {
        warnings.push("Add at least one tag.".to_string());
    }
    if request.license.trim().is_empty() {
        warnings.push("No license selected; the catalog default will apply.".to_string());
    }

    let status = if duplicates.iter().any(|m| m.similarity >= DUPLICATE_THRESHOLD) {
        VerificationStatus::Duplicate
    } else if !duplicates.is_empty() || !warnings.is_empty() {
        VerificationStatus::Flagged
    } else {
        VerificationStatus::Ok
    };

    VerificationResult {
        status,
        duplicates,
        warnings,
    }
}

// =============================================================================
// Profiling
// =============================================================================

fn guess_metadata(file: &DatasetFile) -> MetadataGuess {
    let name = file
        .stem()
        .split(['_', '-', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    let mut tags = BTreeSet::new();
    if let Some((_, ext)) = file.file_name.rsplit_once('.') {
        tags.insert(ext.to_ascii_lowercase());
    }

    MetadataGuess {
        name: Some(name).filter(|n| !n.is_empty()),
        tags,
        ..MetadataGuess::default()
    }
}

fn profile(file: &DatasetFile) -> Result<DatasetSummary, ApiError> {
    let text = std::str::from_utf8(&file.bytes).ok();
    match (file.content_type.as_str(), text) {
        ("text/csv", Some(t)) => Ok(profile_delimited(t, ',')),
        ("text/tab-separated-values", Some(t)) => Ok(profile_delimited(t, '\t')),
        ("application/json", Some(t)) => profile_json_array(t),
        ("application/x-ndjson", Some(t)) => profile_ndjson(t),
        (_, None) if file.content_type.starts_with("text/") => Err(ApiError::Http {
            status: 422,
            message: "The file is not valid UTF-8 text.".to_string(),
        }),
        _ => Ok(DatasetSummary {
            row_count: 0,
            column_count: 0,
            columns: Vec::new(),
        }),
    }
}

/// Split one delimited line, honouring double quotes.
fn split_line(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            c if c == delimiter && !in_quotes => fields.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    fields.push(current);
    fields.into_iter().map(|f| f.trim().to_string()).collect()
}

fn profile_delimited(text: &str, delimiter: char) -> DatasetSummary {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let Some(header) = lines.next() else {
        return DatasetSummary {
            row_count: 0,
            column_count: 0,
            columns: Vec::new(),
        };
    };
    let names = split_line(header, delimiter);
    let mut values: Vec<Vec<String>> = vec![Vec::new(); names.len()];
    let mut rows = 0u64;
    for line in lines {
        rows += 1;
        for (i, v) in split_line(line, delimiter).into_iter().enumerate() {
            if let Some(col) = values.get_mut(i) {
                col.push(v);
            }
        }
    }

    let columns: Vec<ColumnSummary> = names
        .into_iter()
        .zip(values)
        .map(|(name, vals)| ColumnSummary {
            name,
            column_type: infer_type(&vals).to_string(),
        })
        .collect();

    DatasetSummary {
        row_count: rows,
        column_count: columns.len() as u64,
        columns,
    }
}

fn infer_type(values: &[String]) -> &'static str {
    let present: Vec<&str> = values
        .iter()
        .map(|v| v.as_str())
        .filter(|v| !v.is_empty())
        .collect();
    if present.is_empty() {
        return "string";
    }
    if present.iter().all(|v| v.parse::<i64>().is_ok()) {
        "integer"
    } else if present.iter().all(|v| v.parse::<f64>().is_ok()) {
        "number"
    } else if present.iter().all(|v| {
        matches!(
            v.to_ascii_lowercase().as_str(),
            "true" | "false" | "yes" | "no"
        )
    }) {
        "boolean"
    } else if present
        .iter()
        .all(|v| NaiveDate::parse_from_str(v, "%Y-%m-%d").is_ok())
    {
        "date"
    } else {
        "string"
    }
}

fn json_type(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
        _ => "string",
    }
}

fn profile_records(records: &[serde_json::Map<String, serde_json::Value>]) -> DatasetSummary {
    let columns: Vec<ColumnSummary> = records
        .first()
        .map(|first| {
            first
                .iter()
                .map(|(k, v)| ColumnSummary {
                    name: k.clone(),
                    column_type: json_type(v).to_string(),
                })
                .collect()
        })
        .unwrap_or_default();
    DatasetSummary {
        row_count: records.len() as u64,
        column_count: columns.len() as u64,
        columns,
    }
}

fn profile_json_array(text: &str) -> Result<DatasetSummary, ApiError> {
    let records: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(text)
        .map_err(|e| ApiError::Http {
            status: 422,
            message: format!("Expected a JSON array of objects: {}", e),
        })?;
    Ok(profile_records(&records))
}

fn profile_ndjson(text: &str) -> Result<DatasetSummary, ApiError> {
    let records = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .enumerate()
        .map(|(i, l)| {
            serde_json::from_str(l).map_err(|e| ApiError::Http {
                status: 422,
                message: format!("Line {} is not a JSON object: {}", i + 1, e),
            })
        })
        .collect::<Result<Vec<serde_json::Map<String, serde_json::Value>>, ApiError>>()?;
    Ok(profile_records(&records))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv(name: &str, body: &str) -> DatasetFile {
        DatasetFile::new(name, body.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn csv_profile_infers_column_types() {
        let s = profile_delimited(
            "id,score,active,day,label\n1,2.5,true,2024-01-02,\"a, b\"\n2,3,no,2024-02-03,c\n",
            ',',
        );
        assert_eq!(s.row_count, 2);
        assert_eq!(s.column_count, 5);
        let types: Vec<&str> = s.columns.iter().map(|c| c.column_type.as_str()).collect();
        assert_eq!(types, vec!["integer", "number", "boolean", "date", "string"]);
    }

    #[test]
    fn quoted_fields_keep_delimiters() {
        assert_eq!(
            split_line("a,\"b, c\",\"say \"\"hi\"\"\"", ','),
            vec!["a", "b, c", "say \"hi\""]
        );
    }

    #[test]
    fn json_and_ndjson_profiles() {
        let s = profile_json_array(r#"[{"a":1,"b":"x"},{"a":2,"b":"y"}]"#).unwrap();
        assert_eq!(s.row_count, 2);
        assert_eq!(s.columns[0].column_type, "integer");

        let s = profile_ndjson("{\"v\":1.5}\n\n{\"v\":2}\n").unwrap();
        assert_eq!(s.row_count, 2);
        assert_eq!(s.columns[0].column_type, "number");

        assert!(profile_ndjson("{\"v\":1}\nnot json\n").is_err());
    }

    #[test]
    fn similarity_is_token_jaccard() {
        assert_eq!(name_similarity("Rainfall 2023", "rainfall-2023"), 1.0);
        assert_eq!(name_similarity("Rainfall 2023", "Rainfall 2024"), 0.33);
        assert_eq!(name_similarity("", "anything"), 0.0);
    }

    #[test]
    fn metadata_guess_titles_file_stem() {
        let g = guess_metadata(&csv("city_rainfall-daily.csv", "a\n1\n"));
        assert_eq!(g.name.as_deref(), Some("City Rainfall Daily"));
        assert!(g.tags.contains("csv"));
    }

    #[tokio::test]
    async fn verify_reports_duplicates_and_warnings() {
        let api = DemoCatalogApi::new().with_published("ds_900", "Rainfall Daily 2023");
        let up = api.upload_dataset(&csv("rainfall.csv", "a\n1\n")).await.unwrap();

        let mut req = VerifyDraftRequest {
            dataset_id: up.dataset_id.clone(),
            name: "rainfall daily 2023".to_string(),
            description: "Daily totals".to_string(),
            tags: ["weather".to_string()].into_iter().collect(),
            license: "CC-BY-4.0".to_string(),
            visibility: Default::default(),
        };
        let v = api.verify_catalog_dataset_draft(&req).await.unwrap();
        assert_eq!(v.status, VerificationStatus::Duplicate);
        assert_eq!(v.duplicates[0].id, "ds_900");

        req.name = "Wind speeds".to_string();
        req.description.clear();
        let v = api.verify_catalog_dataset_draft(&req).await.unwrap();
        assert_eq!(v.status, VerificationStatus::Flagged);
        assert!(v.duplicates.is_empty());
        assert_eq!(v.warnings.len(), 1);

        req.description = "Hourly wind".to_string();
        let v = api.verify_catalog_dataset_draft(&req).await.unwrap();
        assert_eq!(v.status, VerificationStatus::Ok);
    }

    #[tokio::test]
    async fn submit_refuses_duplicates_without_force() {
        let api = DemoCatalogApi::new().with_published("ds_900", "Rainfall");
        let up = api.upload_dataset(&csv("r.csv", "a\n1\n")).await.unwrap();
        let meta = crate::models::state::DatasetMetadata {
            name: "Rainfall".to_string(),
            ..Default::default()
        };

        let req = SubmitCatalogDatasetRequest::from_metadata(&up.dataset_id, &meta, false);
        let err = api.submit_catalog_dataset(&req).await.unwrap_err();
        assert!(matches!(err, ApiError::Http { status: 409, .. }));

        let req = SubmitCatalogDatasetRequest::from_metadata(&up.dataset_id, &meta, true);
        api.submit_catalog_dataset(&req).await.unwrap();
        assert_eq!(api.published().len(), 2);
        assert_eq!(api.submissions().len(), 1);
    }

    #[tokio::test]
    async fn scripted_failures_fire_once() {
        let api = DemoCatalogApi::new();
        api.fail_next(DemoOperation::Upload, "storage offline");
        let file = csv("a.csv", "a\n1\n");

        let err = api.upload_dataset(&file).await.unwrap_err();
        assert_eq!(err.user_message(), "storage offline");
        let ok = api.upload_dataset(&file).await.unwrap();
        assert_eq!(ok.dataset_id, "ds_1");
        assert_eq!(api.call_count(DemoOperation::Upload), 2);
    }

    #[tokio::test]
    async fn unknown_dataset_is_not_found() {
        let api = DemoCatalogApi::new();
        let err = api.get_dataset_summary("ds_404").await.unwrap_err();
        assert!(matches!(err, ApiError::Http { status: 404, .. }));
    }
}
