// Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

use crate::error::ValidationError;

pub const MAX_NAME_LEN: usize = 120;
pub const MAX_TAG_LEN: usize = 32;

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").expect("static tag regex"))
}

fn license_re() -> &'static Regex {
    // SPDX-style identifiers ("CC-BY-4.0", "MIT", "Apache-2.0", "LicenseRef-internal").
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9.+-]*$").expect("static license regex"))
}

/// Dataset name: required, trimmed, bounded.
pub fn validate_dataset_name(name: &str) -> Result<(), ValidationError> {
    let n = name.trim();
    if n.is_empty() {
        return Err(ValidationError::MissingName);
    }
    if n.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong { max: MAX_NAME_LEN });
    }
    Ok(())
}

/// License identifier. Blank is allowed (the backend applies its default).
pub fn validate_license(license: &str) -> Result<(), ValidationError> {
    let l = license.trim();
    if l.is_empty() {
        return Ok(());
    }
    if l.len() > 64 || !license_re().is_match(l) {
        return Err(ValidationError::InvalidLicense(l.to_string()));
    }
    Ok(())
}

/// Normalize a user-entered tag: trim, lowercase, inner whitespace to '-'.
pub fn normalize_tag(raw: &str) -> Result<String, ValidationError> {
    let collapsed = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase();
    let tag = collapsed.trim_start_matches('#').to_string();
    if tag.is_empty() || tag.chars().count() > MAX_TAG_LEN || !tag_re().is_match(&tag) {
        return Err(ValidationError::InvalidTag(raw.trim().to_string()));
    }
    Ok(tag)
}
