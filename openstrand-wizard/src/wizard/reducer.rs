// Wizard reducer
//
// The closed set of state transitions. `reduce` is pure: it owns the old state and
// returns the new one, so every invariant on `WizardState` is enforced here and only
// here.
//
// Invariants:
// - `verification` is cleared whenever the file or `dataset_id` changes, and whenever a
//   field the verification looked at is edited to a different value.
// - `acknowledged` resets every time `verification` changes.
// - `force_clone` can only be set while the verification status is `duplicate`, and is
//   dropped when a new verification is not `duplicate`.

use log::debug;
use uuid::Uuid;

use crate::models::responses::{
    DatasetSummary, MetadataGuess, UploadDatasetResponse, VerificationResult, VerificationStatus,
};
use crate::models::state::{Activity, DatasetFile, PlanTier, Visibility, WizardState};
use crate::utils::validation::normalize_tag;

#[derive(Debug, Clone, PartialEq)]
pub enum WizardAction {
    SelectFile(DatasetFile),
    ClearFile,

    SetName(String),
    SetDescription(String),
    SetVisibility(Visibility),
    SetPlanRequired(PlanTier),
    SetLicense(String),
    /// Expects an already-normalized tag.
    AddTag(String),
    RemoveTag(String),
    SetAllowStrandUsage(bool),

    SetAcknowledged(bool),
    SetForceClone(bool),

    Begin(Activity),
    /// Clears the busy slot if it still holds this activity.
    Finish(Activity),
    /// Hands the busy slot to the summary fetch identified by the ticket.
    SummaryStarted(Uuid),
    /// Releases the busy slot if that summary fetch still owns it.
    SummarySettled(Uuid),

    UploadSucceeded(UploadDatasetResponse),
    SummaryLoaded(DatasetSummary),
    VerificationCompleted(VerificationResult),

    StepForward,
    StepBack,

    Reset,
}

impl WizardAction {
    pub fn name(&self) -> &'static str {
        match self {
            WizardAction::SelectFile(_) => "SELECT_FILE",
            WizardAction::ClearFile => "CLEAR_FILE",
            WizardAction::SetName(_) => "SET_NAME",
            WizardAction::SetDescription(_) => "SET_DESCRIPTION",
            WizardAction::SetVisibility(_) => "SET_VISIBILITY",
            WizardAction::SetPlanRequired(_) => "SET_PLAN_REQUIRED",
            WizardAction::SetLicense(_) => "SET_LICENSE",
            WizardAction::AddTag(_) => "ADD_TAG",
            WizardAction::RemoveTag(_) => "REMOVE_TAG",
            WizardAction::SetAllowStrandUsage(_) => "SET_ALLOW_STRAND_USAGE",
            WizardAction::SetAcknowledged(_) => "SET_ACKNOWLEDGED",
            WizardAction::SetForceClone(_) => "SET_FORCE_CLONE",
            WizardAction::Begin(_) => "BEGIN",
            WizardAction::Finish(_) => "FINISH",
            WizardAction::SummaryStarted(_) => "SUMMARY_STARTED",
            WizardAction::SummarySettled(_) => "SUMMARY_SETTLED",
            WizardAction::UploadSucceeded(_) => "UPLOAD_SUCCEEDED",
            WizardAction::SummaryLoaded(_) => "SUMMARY_LOADED",
            WizardAction::VerificationCompleted(_) => "VERIFICATION_COMPLETED",
            WizardAction::StepForward => "STEP_FORWARD",
            WizardAction::StepBack => "STEP_BACK",
            WizardAction::Reset => "RESET",
        }
    }
}

pub fn reduce(mut state: WizardState, action: WizardAction) -> WizardState {
    debug!("[PHASE: wizard] [STEP: reduce] {}", action.name());

    match action {
        WizardAction::SelectFile(file) => {
            state.file = Some(file);
            forget_upload(&mut state);
        }
        WizardAction::ClearFile => {
            state.file = None;
            forget_upload(&mut state);
        }

        WizardAction::SetName(name) => {
            if state.metadata.name != name {
                state.metadata.name = name;
                invalidate_verification(&mut state);
            }
        }
        WizardAction::SetDescription(description) => {
            if state.metadata.description != description {
                state.metadata.description = description;
                invalidate_verification(&mut state);
            }
        }
        WizardAction::SetVisibility(visibility) => {
            state.edited.visibility = true;
            if state.metadata.visibility != visibility {
                state.metadata.visibility = visibility;
                invalidate_verification(&mut state);
            }
        }
        WizardAction::SetPlanRequired(plan) => {
            state.edited.plan_required = true;
            state.metadata.plan_required = plan;
        }
        WizardAction::SetLicense(license) => {
            state.edited.license = true;
            if state.metadata.license != license {
                state.metadata.license = license;
                invalidate_verification(&mut state);
            }
        }
        WizardAction::AddTag(tag) => {
            if state.metadata.tags.insert(tag) {
                invalidate_verification(&mut state);
            }
        }
        WizardAction::RemoveTag(tag) => {
            if state.metadata.tags.remove(&tag) {
                invalidate_verification(&mut state);
            }
        }
        WizardAction::SetAllowStrandUsage(allow) => {
            state.metadata.allow_strand_usage = allow;
        }

        WizardAction::SetAcknowledged(value) => {
            // Consent only makes sense against a result the user has seen.
            state.acknowledged = value && state.verification.is_some();
        }
        WizardAction::SetForceClone(value) => {
            state.force_clone = value && state.requires_force_clone();
        }

        WizardAction::Begin(activity) => {
            state.activity = activity;
        }
        WizardAction::Finish(activity) => {
            if state.activity == activity {
                state.activity = Activity::Idle;
            }
        }
        WizardAction::SummaryStarted(ticket) => {
            state.activity = Activity::LoadingSummary;
            state.summary_ticket = Some(ticket);
        }
        WizardAction::SummarySettled(ticket) => {
            if state.summary_ticket == Some(ticket) {
                state.summary_ticket = None;
                if state.activity == Activity::LoadingSummary {
                    state.activity = Activity::Idle;
                }
            }
        }

        WizardAction::UploadSucceeded(upload) => {
            forget_upload(&mut state);
            state.dataset_id = Some(upload.dataset_id);
            apply_metadata_guess(&mut state, upload.metadata);
        }
        WizardAction::SummaryLoaded(summary) => {
            state.summary = Some(summary);
        }
        WizardAction::VerificationCompleted(result) => {
            state.force_clone = state.force_clone && result.status == VerificationStatus::Duplicate;
            state.acknowledged = false;
            state.verification = Some(result);
        }

        WizardAction::StepForward => {
            state.step = state.step.next();
        }
        WizardAction::StepBack => {
            state.step = state.step.prev();
        }

        WizardAction::Reset => {
            state = WizardState::default();
        }
    }

    state
}

fn invalidate_verification(state: &mut WizardState) {
    state.verification = None;
    state.acknowledged = false;
    state.force_clone = false;
}

/// Drop everything derived from a previous upload.
fn forget_upload(state: &mut WizardState) {
    state.dataset_id = None;
    state.summary = None;
    invalidate_verification(state);
}

/// Fill in what the user has not typed yet; never overwrite user input.
fn apply_metadata_guess(state: &mut WizardState, guess: MetadataGuess) {
    let edited = state.edited;
    let meta = &mut state.metadata;
    if meta.name.trim().is_empty() {
        if let Some(name) = guess.name.filter(|n| !n.trim().is_empty()) {
            meta.name = name;
        }
    }
    if meta.description.trim().is_empty() {
        if let Some(description) = guess.description.filter(|d| !d.trim().is_empty()) {
            meta.description = description;
        }
    }
    if !edited.license || meta.license.trim().is_empty() {
        if let Some(license) = guess.license.filter(|l| !l.trim().is_empty()) {
            meta.license = license;
        }
    }
    if !edited.visibility {
        if let Some(visibility) = guess.visibility {
            meta.visibility = visibility;
        }
    }
    if !edited.plan_required {
        if let Some(plan) = guess.plan_required {
            meta.plan_required = plan;
        }
    }
    for raw in guess.tags {
        if let Ok(tag) = normalize_tag(&raw) {
            meta.tags.insert(tag);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::responses::DuplicateMatch;
    use crate::wizard::steps::WizardStep;

    fn file(name: &str) -> DatasetFile {
        DatasetFile::new(name, b"id,value\n1,2\n".to_vec()).unwrap()
    }

    fn duplicate() -> VerificationResult {
        VerificationResult {
            status: VerificationStatus::Duplicate,
            duplicates: vec![DuplicateMatch {
                id: "ds_9".to_string(),
                name: "Rainfall".to_string(),
                similarity: 0.92,
            }],
            warnings: Vec::new(),
        }
    }

    fn flagged() -> VerificationResult {
        VerificationResult {
            status: VerificationStatus::Flagged,
            duplicates: Vec::new(),
            warnings: vec!["Description is empty".to_string()],
        }
    }

    fn uploaded(id: &str) -> WizardState {
        let s = reduce(WizardState::default(), WizardAction::SelectFile(file("a.csv")));
        reduce(
            s,
            WizardAction::UploadSucceeded(UploadDatasetResponse {
                dataset_id: id.to_string(),
                metadata: MetadataGuess::default(),
            }),
        )
    }

    fn verified_duplicate_with_consent() -> WizardState {
        let s = reduce(uploaded("ds_1"), WizardAction::VerificationCompleted(duplicate()));
        let s = reduce(s, WizardAction::SetAcknowledged(true));
        reduce(s, WizardAction::SetForceClone(true))
    }

    #[test]
    fn new_dataset_id_resets_verification_and_consent() {
        let s = verified_duplicate_with_consent();
        assert!(s.acknowledged && s.force_clone);

        let s = reduce(
            s,
            WizardAction::UploadSucceeded(UploadDatasetResponse {
                dataset_id: "ds_2".to_string(),
                metadata: MetadataGuess::default(),
            }),
        );
        assert_eq!(s.dataset_id.as_deref(), Some("ds_2"));
        assert!(s.verification.is_none());
        assert!(!s.acknowledged);
        assert!(!s.force_clone);
    }

    #[test]
    fn selecting_a_new_file_forgets_previous_upload() {
        let s = verified_duplicate_with_consent();
        let s = reduce(s, WizardAction::SelectFile(file("b.csv")));
        assert_eq!(s.file.as_ref().map(|f| f.file_name.as_str()), Some("b.csv"));
        assert!(s.dataset_id.is_none());
        assert!(s.summary.is_none());
        assert!(s.verification.is_none());
        assert!(!s.acknowledged);
        assert!(!s.force_clone);
    }

    #[test]
    fn new_verification_resets_acknowledgement() {
        let s = verified_duplicate_with_consent();
        let s = reduce(s, WizardAction::VerificationCompleted(duplicate()));
        assert!(!s.acknowledged);
        // Still a duplicate: the override survives.
        assert!(s.force_clone);
    }

    #[test]
    fn force_clone_dropped_when_no_longer_duplicate() {
        let s = verified_duplicate_with_consent();
        let s = reduce(s, WizardAction::VerificationCompleted(flagged()));
        assert!(!s.force_clone);
        assert!(!s.acknowledged);
        assert_eq!(s.verification_status(), Some(VerificationStatus::Flagged));
    }

    #[test]
    fn force_clone_ignored_unless_duplicate() {
        let s = reduce(uploaded("ds_1"), WizardAction::VerificationCompleted(flagged()));
        let s = reduce(s, WizardAction::SetForceClone(true));
        assert!(!s.force_clone);

        let s = reduce(WizardState::default(), WizardAction::SetForceClone(true));
        assert!(!s.force_clone);
    }

    #[test]
    fn acknowledgement_requires_a_result() {
        let s = reduce(uploaded("ds_1"), WizardAction::SetAcknowledged(true));
        assert!(!s.acknowledged);
    }

    #[test]
    fn editing_verified_fields_invalidates_only_on_change() {
        let s = reduce(uploaded("ds_1"), WizardAction::SetName("Rainfall".to_string()));
        let s = reduce(s, WizardAction::VerificationCompleted(flagged()));
        let s = reduce(s, WizardAction::SetAcknowledged(true));

        // Same value: nothing changes.
        let same = reduce(s.clone(), WizardAction::SetName("Rainfall".to_string()));
        assert!(same.verification.is_some());
        assert!(same.acknowledged);

        // Plan and strand usage are not part of the verified draft.
        let same = reduce(s.clone(), WizardAction::SetPlanRequired(PlanTier::Pro));
        assert!(same.verification.is_some());

        let changed = reduce(s.clone(), WizardAction::SetName("Rainfall v2".to_string()));
        assert!(changed.verification.is_none());
        assert!(!changed.acknowledged);

        let tagged = reduce(s, WizardAction::AddTag("weather".to_string()));
        assert!(tagged.verification.is_none());
    }

    #[test]
    fn metadata_guess_never_overwrites_user_input() {
        let s = reduce(WizardState::default(), WizardAction::SetName("Mine".to_string()));
        let s = reduce(
            s,
            WizardAction::UploadSucceeded(UploadDatasetResponse {
                dataset_id: "ds_1".to_string(),
                metadata: MetadataGuess {
                    name: Some("Guessed".to_string()),
                    description: Some("Guessed description".to_string()),
                    tags: ["Climate Data".to_string(), "bad/tag".to_string()]
                        .into_iter()
                        .collect(),
                    ..MetadataGuess::default()
                },
            }),
        );
        assert_eq!(s.metadata.name, "Mine");
        assert_eq!(s.metadata.description, "Guessed description");
        assert!(s.metadata.tags.contains("climate-data"));
        assert_eq!(s.metadata.tags.len(), 1);
    }

    #[test]
    fn metadata_guess_fills_untouched_settings() {
        let guess = MetadataGuess {
            visibility: Some(Visibility::Unlisted),
            plan_required: Some(PlanTier::Team),
            license: Some("ODbL-1.0".to_string()),
            ..MetadataGuess::default()
        };
        let upload = |state: WizardState| {
            reduce(
                state,
                WizardAction::UploadSucceeded(UploadDatasetResponse {
                    dataset_id: "ds_1".to_string(),
                    metadata: guess.clone(),
                }),
            )
        };

        let s = upload(WizardState::default());
        assert_eq!(s.metadata.visibility, Visibility::Unlisted);
        assert_eq!(s.metadata.plan_required, PlanTier::Team);
        assert_eq!(s.metadata.license, "ODbL-1.0");

        // Explicit choices win, even when they equal the defaults.
        let s = reduce(WizardState::default(), WizardAction::SetVisibility(Visibility::Public));
        let s = reduce(s, WizardAction::SetPlanRequired(PlanTier::Free));
        let s = reduce(s, WizardAction::SetLicense("CC-BY-4.0".to_string()));
        let s = upload(s);
        assert_eq!(s.metadata.visibility, Visibility::Public);
        assert_eq!(s.metadata.plan_required, PlanTier::Free);
        assert_eq!(s.metadata.license, "CC-BY-4.0");
    }

    #[test]
    fn finish_only_clears_its_own_activity() {
        let s = reduce(WizardState::default(), WizardAction::Begin(Activity::Uploading));
        let s = reduce(s, WizardAction::Finish(Activity::Verifying));
        assert_eq!(s.activity, Activity::Uploading);
        let s = reduce(s, WizardAction::Finish(Activity::Uploading));
        assert!(s.activity.is_idle());
    }

    #[test]
    fn stale_summary_ticket_does_not_release_the_slot() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let s = reduce(uploaded("ds_1"), WizardAction::SummaryStarted(first));
        assert_eq!(s.activity, Activity::LoadingSummary);

        // Reset, then a new fetch takes the slot before the old one settles.
        let s = reduce(s, WizardAction::Reset);
        let s = reduce(s, WizardAction::SummaryStarted(second));
        let s = reduce(s, WizardAction::SummarySettled(first));
        assert_eq!(s.activity, Activity::LoadingSummary);

        let s = reduce(s, WizardAction::SummarySettled(second));
        assert!(s.activity.is_idle());
        assert!(s.summary_ticket.is_none());
    }

    #[test]
    fn steps_move_within_bounds() {
        let s = reduce(WizardState::default(), WizardAction::StepBack);
        assert_eq!(s.step, WizardStep::Source);
        let s = reduce(s, WizardAction::StepForward);
        let s = reduce(s, WizardAction::StepForward);
        assert_eq!(s.step, WizardStep::Verification);
        let s = reduce(s, WizardAction::StepBack);
        assert_eq!(s.step, WizardStep::Metadata);
    }

    #[test]
    fn reset_returns_default_state() {
        let s = verified_duplicate_with_consent();
        let s = reduce(s, WizardAction::StepForward);
        let s = reduce(s, WizardAction::Begin(Activity::Publishing));
        assert_eq!(reduce(s, WizardAction::Reset), WizardState::default());
    }
}
