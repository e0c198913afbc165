// Step transition controller
//
// Gates navigation between the four steps, runs the side effect each step needs
// (upload, verification, publish) and reports every outcome through the `Notifier`.
//
// Concurrency rules:
// - At most one remote operation is in flight (`Activity` != Idle). Starting another
//   one returns `WizardError::Busy`.
// - The summary fetch after an upload runs as its own task. While only the summary is
//   loading, navigation and edits stay open.
// - The activity tag is cleared by `ActivityGuard` on every exit path, including a
//   dropped future.
// - The state lock is never held across an `.await`.

use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::reducer::{reduce, WizardAction};
use super::steps::WizardStep;
use crate::api::{ApiError, CatalogApi};
use crate::error::{ValidationError, WizardError};
use crate::models::requests::{SubmitCatalogDatasetRequest, VerifyDraftRequest};
use crate::models::responses::{DatasetSummary, SubmitAck, VerificationResult, VerificationStatus};
use crate::models::state::{Activity, DatasetFile, PlanTier, Visibility, WizardState};
use crate::notify::{Navigator, Notice, Notifier};
use crate::settings::DEFAULT_POST_PUBLISH_ROUTE;
use crate::utils::validation::{normalize_tag, validate_dataset_name, validate_license};

pub struct WizardController {
    api: Arc<dyn CatalogApi>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    post_publish_route: String,
    session_id: Uuid,
    state: Arc<Mutex<WizardState>>,
    summary_task: Mutex<Option<JoinHandle<()>>>,
}

fn lock_state(state: &Mutex<WizardState>) -> MutexGuard<'_, WizardState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

fn apply(state: &Mutex<WizardState>, action: WizardAction) {
    let mut guard = lock_state(state);
    let current = std::mem::take(&mut *guard);
    *guard = reduce(current, action);
}

/// Releases the busy slot when dropped.
struct ActivityGuard {
    state: Arc<Mutex<WizardState>>,
    release: WizardAction,
}

impl Drop for ActivityGuard {
    fn drop(&mut self) {
        apply(&self.state, self.release.clone());
    }
}

/// What a summary fetch needs, detached from the controller so it can run as a task.
#[derive(Clone)]
struct SummaryFetch {
    api: Arc<dyn CatalogApi>,
    notifier: Arc<dyn Notifier>,
    state: Arc<Mutex<WizardState>>,
}

impl WizardController {
    pub fn new(
        api: Arc<dyn CatalogApi>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let session_id = Uuid::new_v4();
        info!(
            "[PHASE: wizard] [STEP: init] Wizard session started (session_id={})",
            session_id
        );
        Self {
            api,
            notifier,
            navigator,
            post_publish_route: DEFAULT_POST_PUBLISH_ROUTE.to_string(),
            session_id,
            state: Arc::new(Mutex::new(WizardState::default())),
            summary_task: Mutex::new(None),
        }
    }

    pub fn with_post_publish_route(mut self, route: impl Into<String>) -> Self {
        self.post_publish_route = route.into();
        self
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> WizardState {
        self.lock().clone()
    }

    pub fn step(&self) -> WizardStep {
        self.lock().step
    }

    fn lock(&self) -> MutexGuard<'_, WizardState> {
        lock_state(&self.state)
    }

    fn dispatch(&self, action: WizardAction) {
        apply(&self.state, action);
    }

    /// Wait for the summary fetch started by the last upload, if one is still running.
    pub async fn summary_settled(&self) {
        let task = self
            .summary_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(
                    "[PHASE: wizard] [STEP: summary] Summary task ended abnormally: {} (session_id={})",
                    e, self.session_id
                );
            }
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn can_advance(&self) -> bool {
        let s = self.lock();
        if s.activity.is_blocking() {
            return false;
        }
        match s.step {
            WizardStep::Source => s.activity.is_idle() && s.file.is_some(),
            WizardStep::Metadata => validate_dataset_name(&s.metadata.name).is_ok(),
            // An unverified draft needs the busy slot for the check.
            WizardStep::Verification => {
                s.dataset_id.is_some() && (s.verification.is_some() || s.activity.is_idle())
            }
            WizardStep::Publish => false,
        }
    }

    pub fn can_retreat(&self) -> bool {
        let s = self.lock();
        !s.activity.is_blocking() && !s.step.is_first()
    }

    pub fn can_publish(&self) -> bool {
        let s = self.lock();
        s.activity.is_idle() && s.step == WizardStep::Publish && publish_request(&s).is_ok()
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Apply a user edit. Refused while an upload, verification or publish is running.
    /// File changes are only accepted on the source step.
    fn edit(&self, action: WizardAction) -> Result<(), WizardError> {
        let mut guard = self.lock();
        let (activity, step) = (guard.activity, guard.step);
        let file_change = matches!(action, WizardAction::SelectFile(_) | WizardAction::ClearFile);
        if file_change && step != WizardStep::Source {
            drop(guard);
            return Err(self.wrong_step(action.name(), step));
        }
        if activity.is_blocking() {
            drop(guard);
            warn!(
                "[PHASE: wizard] [STEP: edit] Ignoring {} while {} (session_id={})",
                action.name(),
                activity,
                self.session_id
            );
            return Err(WizardError::Busy(activity));
        }
        let current = std::mem::take(&mut *guard);
        *guard = reduce(current, action);
        Ok(())
    }

    pub fn select_file(&self, file: DatasetFile) -> Result<(), WizardError> {
        info!(
            "[PHASE: wizard] [STEP: source] Selecting {} ({} bytes, {})",
            file.file_name,
            file.len(),
            file.content_type
        );
        self.edit(WizardAction::SelectFile(file))
    }

    pub fn clear_file(&self) -> Result<(), WizardError> {
        self.edit(WizardAction::ClearFile)
    }

    pub fn set_name(&self, name: impl Into<String>) -> Result<(), WizardError> {
        self.edit(WizardAction::SetName(name.into()))
    }

    pub fn set_description(&self, description: impl Into<String>) -> Result<(), WizardError> {
        self.edit(WizardAction::SetDescription(description.into()))
    }

    pub fn set_visibility(&self, visibility: Visibility) -> Result<(), WizardError> {
        self.edit(WizardAction::SetVisibility(visibility))
    }

    pub fn set_plan_required(&self, plan: PlanTier) -> Result<(), WizardError> {
        self.edit(WizardAction::SetPlanRequired(plan))
    }

    pub fn set_license(&self, license: impl Into<String>) -> Result<(), WizardError> {
        self.edit(WizardAction::SetLicense(license.into()))
    }

    /// Normalize and add a tag. Invalid tags are reported and not added.
    pub fn add_tag(&self, raw: &str) -> Result<(), WizardError> {
        let tag = normalize_tag(raw).map_err(|e| self.reject(e))?;
        self.edit(WizardAction::AddTag(tag))
    }

    pub fn remove_tag(&self, tag: &str) -> Result<(), WizardError> {
        let tag = normalize_tag(tag).unwrap_or_else(|_| tag.to_string());
        self.edit(WizardAction::RemoveTag(tag))
    }

    pub fn set_allow_strand_usage(&self, allow: bool) -> Result<(), WizardError> {
        self.edit(WizardAction::SetAllowStrandUsage(allow))
    }

    pub fn set_acknowledged(&self, value: bool) -> Result<(), WizardError> {
        self.edit(WizardAction::SetAcknowledged(value))
    }

    pub fn set_force_clone(&self, value: bool) -> Result<(), WizardError> {
        self.edit(WizardAction::SetForceClone(value))
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Primary "Next" action. Returns the step the wizard is on afterwards.
    pub async fn advance(&self) -> Result<WizardStep, WizardError> {
        let (step, activity) = {
            let s = self.lock();
            (s.step, s.activity)
        };
        if activity.is_blocking() {
            return Err(self.busy("advance", activity));
        }

        match step {
            WizardStep::Source => self.upload_and_continue().await,
            WizardStep::Metadata => {
                let (name, license) = {
                    let s = self.lock();
                    (s.metadata.name.clone(), s.metadata.license.clone())
                };
                validate_dataset_name(&name).map_err(|e| self.reject(e))?;
                validate_license(&license).map_err(|e| self.reject(e))?;
                Ok(self.step_forward())
            }
            WizardStep::Verification => {
                let unverified = self.lock().verification.is_none();
                if unverified {
                    // Stay put so the user reads the result before moving on.
                    self.run_verification().await?;
                    Ok(WizardStep::Verification)
                } else {
                    Ok(self.step_forward())
                }
            }
            WizardStep::Publish => Err(self.wrong_step("advance", step)),
        }
    }

    /// "Back". A no-op on the first step; never clears collected data.
    pub fn retreat(&self) -> Result<WizardStep, WizardError> {
        let (step, activity) = {
            let s = self.lock();
            (s.step, s.activity)
        };
        if activity.is_blocking() {
            return Err(self.busy("retreat", activity));
        }
        if step.is_first() {
            return Ok(step);
        }
        self.dispatch(WizardAction::StepBack);
        let step = self.step();
        debug!("[PHASE: wizard] [STEP: {}] Moved back", step);
        Ok(step)
    }

    /// Abandon the submission and start over.
    pub fn cancel(&self) -> Result<(), WizardError> {
        let activity = self.lock().activity;
        if activity.is_blocking() {
            return Err(self.busy("cancel", activity));
        }
        self.dispatch(WizardAction::Reset);
        info!(
            "[PHASE: wizard] [STEP: cancel] Wizard reset (session_id={})",
            self.session_id
        );
        self.notifier.notify(Notice::info(
            "Submission cancelled",
            "Nothing was published.",
        ));
        Ok(())
    }

    fn step_forward(&self) -> WizardStep {
        self.dispatch(WizardAction::StepForward);
        let step = self.step();
        debug!("[PHASE: wizard] [STEP: {}] Moved forward", step);
        step
    }

    // =========================================================================
    // Remote operations
    // =========================================================================

    async fn upload_and_continue(&self) -> Result<WizardStep, WizardError> {
        let file = self.lock().file.clone();
        let file = file.ok_or_else(|| self.reject(ValidationError::MissingFile))?;
        let guard = self.begin("upload", Activity::Uploading)?;
        let correlation_id = Uuid::new_v4();

        info!(
            "[PHASE: wizard] [STEP: upload] Uploading {} ({} bytes) (session_id={}, correlation_id={})",
            file.file_name,
            file.len(),
            self.session_id,
            correlation_id
        );

        let upload = match self.api.upload_dataset(&file).await {
            Ok(upload) => upload,
            Err(e) => return Err(self.remote_failure("upload", "Upload failed", correlation_id, e)),
        };

        let dataset_id = upload.dataset_id.clone();
        info!(
            "[PHASE: wizard] [STEP: upload] Upload complete, dataset_id={} (correlation_id={})",
            dataset_id, correlation_id
        );
        self.dispatch(WizardAction::UploadSucceeded(upload));
        self.dispatch(WizardAction::StepForward);
        self.notifier.notify(Notice::success(
            "Upload complete",
            format!("{} was uploaded.", file.file_name),
        ));

        // Hand the busy slot straight to the summary fetch; the upload guard then has
        // nothing left to clear.
        self.dispatch(WizardAction::SummaryStarted(correlation_id));
        let summary_guard = ActivityGuard {
            state: self.state.clone(),
            release: WizardAction::SummarySettled(correlation_id),
        };
        drop(guard);

        let fetch = self.summary_fetch();
        let task = tokio::spawn(async move {
            let _guard = summary_guard;
            let _ = fetch.run(&dataset_id, correlation_id).await;
        });
        *self.summary_task.lock().unwrap_or_else(|e| e.into_inner()) = Some(task);

        Ok(self.step())
    }

    /// Re-fetch the dataset summary. Failures are reported but never block navigation.
    pub async fn refresh_summary(&self) -> Result<DatasetSummary, WizardError> {
        let dataset_id = self.lock().dataset_id.clone();
        let dataset_id = dataset_id.ok_or_else(|| self.reject(ValidationError::MissingDataset))?;
        let ticket = Uuid::new_v4();
        let _guard = self.claim(
            "summary",
            WizardAction::SummaryStarted(ticket),
            WizardAction::SummarySettled(ticket),
        )?;
        self.summary_fetch().run(&dataset_id, ticket).await
    }

    fn summary_fetch(&self) -> SummaryFetch {
        SummaryFetch {
            api: self.api.clone(),
            notifier: self.notifier.clone(),
            state: self.state.clone(),
        }
    }

    /// Run the duplicate/policy check against the current draft. Always replaces the
    /// previous result on success; a failure leaves the previous result untouched.
    pub async fn run_verification(&self) -> Result<VerificationResult, WizardError> {
        let request = {
            let s = self.lock();
            let request = s
                .dataset_id
                .as_deref()
                .map(|id| VerifyDraftRequest::from_metadata(id, &s.metadata));
            request
        };
        let request = request.ok_or_else(|| self.reject(ValidationError::MissingDataset))?;
        let _guard = self.begin("verify", Activity::Verifying)?;
        let correlation_id = Uuid::new_v4();

        info!(
            "[PHASE: wizard] [STEP: verify] Verifying draft for {} (session_id={}, correlation_id={})",
            request.dataset_id, self.session_id, correlation_id
        );

        let result = match self.api.verify_catalog_dataset_draft(&request).await {
            Ok(result) => result,
            Err(e) => {
                return Err(self.remote_failure("verify", "Verification failed", correlation_id, e))
            }
        };

        info!(
            "[PHASE: wizard] [STEP: verify] Status {} with {} match(es), {} warning(s) (correlation_id={})",
            result.status,
            result.duplicates.len(),
            result.warnings.len(),
            correlation_id
        );
        self.dispatch(WizardAction::VerificationCompleted(result.clone()));
        self.notifier.notify(verification_notice(&result));
        Ok(result)
    }

    /// Terminal action on the publish step.
    pub async fn publish(&self) -> Result<SubmitAck, WizardError> {
        let (step, activity) = {
            let s = self.lock();
            (s.step, s.activity)
        };
        if step != WizardStep::Publish {
            return Err(self.wrong_step("publish", step));
        }
        if !activity.is_idle() {
            return Err(self.busy("publish", activity));
        }

        let request = publish_request(&self.lock());
        let request = request.map_err(|e| self.reject(e))?;
        let guard = self.begin("publish", Activity::Publishing)?;
        let correlation_id = Uuid::new_v4();

        info!(
            "[PHASE: wizard] [STEP: publish] Submitting {} (force_duplicate={}, session_id={}, correlation_id={})",
            request.dataset_id, request.force_duplicate, self.session_id, correlation_id
        );

        let ack = match self.api.submit_catalog_dataset(&request).await {
            Ok(ack) => ack,
            Err(e) => return Err(self.remote_failure("publish", "Publish failed", correlation_id, e)),
        };

        drop(guard);
        info!(
            "[PHASE: wizard] [STEP: publish] Published {} (catalog id={}, correlation_id={})",
            request.name,
            ack.id.as_deref().unwrap_or("-"),
            correlation_id
        );
        self.notifier.notify(Notice::success(
            "Dataset published",
            format!("{} is now in the catalog.", request.name),
        ));
        self.dispatch(WizardAction::Reset);
        self.navigator.navigate(&self.post_publish_route);
        Ok(ack)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Claim the busy slot. Fails if another operation already holds it.
    fn begin(&self, operation: &'static str, activity: Activity) -> Result<ActivityGuard, WizardError> {
        self.claim(
            operation,
            WizardAction::Begin(activity),
            WizardAction::Finish(activity),
        )
    }

    fn claim(
        &self,
        operation: &'static str,
        take: WizardAction,
        release: WizardAction,
    ) -> Result<ActivityGuard, WizardError> {
        let mut guard = self.lock();
        if !guard.activity.is_idle() {
            let current = guard.activity;
            drop(guard);
            return Err(self.busy(operation, current));
        }
        let state = std::mem::take(&mut *guard);
        *guard = reduce(state, take);
        Ok(ActivityGuard {
            state: self.state.clone(),
            release,
        })
    }

    fn reject(&self, error: ValidationError) -> WizardError {
        warn!(
            "[PHASE: wizard] [STEP: validate] {} (session_id={})",
            error, self.session_id
        );
        self.notifier
            .notify(Notice::error("Cannot continue", error.to_string()));
        WizardError::Validation(error)
    }

    fn remote_failure(
        &self,
        operation: &'static str,
        title: &str,
        correlation_id: Uuid,
        error: ApiError,
    ) -> WizardError {
        warn!(
            "[PHASE: wizard] [STEP: {}] {} (session_id={}, correlation_id={})",
            operation, error, self.session_id, correlation_id
        );
        self.notifier.notify(Notice::error(title, error.user_message()));
        WizardError::Remote {
            operation,
            source: error,
        }
    }

    fn busy(&self, operation: &'static str, activity: Activity) -> WizardError {
        warn!(
            "[PHASE: wizard] [STEP: {}] Refused while {} (session_id={})",
            operation, activity, self.session_id
        );
        WizardError::Busy(activity)
    }

    fn wrong_step(&self, operation: &'static str, step: WizardStep) -> WizardError {
        warn!(
            "[PHASE: wizard] [STEP: {}] '{}' is not available here (session_id={})",
            step, operation, self.session_id
        );
        WizardError::WrongStep { operation, step }
    }
}

impl SummaryFetch {
    async fn run(&self, dataset_id: &str, correlation_id: Uuid) -> Result<DatasetSummary, WizardError> {
        debug!(
            "[PHASE: wizard] [STEP: summary] Fetching summary for {} (correlation_id={})",
            dataset_id, correlation_id
        );
        match self.api.get_dataset_summary(dataset_id).await {
            Ok(summary) => {
                // The dataset may have been replaced while the request was out.
                let current = lock_state(&self.state).dataset_id.clone();
                if current.as_deref() != Some(dataset_id) {
                    debug!(
                        "[PHASE: wizard] [STEP: summary] Dropping stale summary for {}",
                        dataset_id
                    );
                    return Ok(summary);
                }
                info!(
                    "[PHASE: wizard] [STEP: summary] {} rows, {} columns (correlation_id={})",
                    summary.row_count, summary.column_count, correlation_id
                );
                apply(&self.state, WizardAction::SummaryLoaded(summary.clone()));
                Ok(summary)
            }
            Err(e) => {
                warn!(
                    "[PHASE: wizard] [STEP: summary] Summary unavailable: {} (correlation_id={})",
                    e, correlation_id
                );
                self.notifier
                    .notify(Notice::warning("Summary unavailable", e.user_message()));
                Err(WizardError::Remote {
                    operation: "summary",
                    source: e,
                })
            }
        }
    }
}

/// Publish preconditions, in the order the user is told about them.
fn publish_request(state: &WizardState) -> Result<SubmitCatalogDatasetRequest, ValidationError> {
    let dataset_id = state
        .dataset_id
        .as_deref()
        .ok_or(ValidationError::MissingDataset)?;
    validate_dataset_name(&state.metadata.name)?;
    validate_license(&state.metadata.license)?;
    if state.requires_acknowledgement() && !state.acknowledged {
        return Err(ValidationError::AcknowledgementRequired);
    }
    if state.requires_force_clone() && !state.force_clone {
        return Err(ValidationError::ForceCloneRequired);
    }
    Ok(SubmitCatalogDatasetRequest::from_metadata(
        dataset_id,
        &state.metadata,
        state.force_clone,
    ))
}

fn verification_notice(result: &VerificationResult) -> Notice {
    match result.status {
        VerificationStatus::Ok => Notice::success(
            "Verification passed",
            "No duplicates or policy issues were found.",
        ),
        VerificationStatus::Duplicate => {
            let detail = result
                .best_match()
                .map(|m| format!("{} ({:.0}% similar)", m.name, m.similarity * 100.0))
                .unwrap_or_else(|| "an existing dataset".to_string());
            Notice::warning(
                "Possible duplicate",
                format!("This dataset looks like {}.", detail),
            )
        }
        VerificationStatus::Flagged => {
            let detail = if result.warnings.is_empty() {
                format!("{} similar dataset(s) found.", result.duplicates.len())
            } else {
                result.warnings.join(" ")
            };
            Notice::warning("Review findings", detail)
        }
    }
}
