// Wizard error taxonomy
//
// Two families only: client validation (caught before any network call) and remote
// failures (one of the four API operations rejected). Both are surfaced to the user as
// transient notifications; neither is fatal.

use thiserror::Error;

use crate::api::ApiError;
use crate::models::state::Activity;
use crate::wizard::steps::WizardStep;

/// Synchronous validation failures. Messages are user-facing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Select a dataset file before continuing.")]
    MissingFile,

    #[error("The selected file is empty.")]
    EmptyFile,

    #[error("Dataset name is required.")]
    MissingName,

    #[error("Dataset name cannot exceed {max} characters.")]
    NameTooLong { max: usize },

    #[error("License identifier '{0}' is not valid.")]
    InvalidLicense(String),

    #[error("Tag '{0}' is not valid. Use letters, numbers, '-' or '_'.")]
    InvalidTag(String),

    #[error("Upload the dataset before continuing.")]
    MissingDataset,

    #[error("Acknowledge the verification findings before publishing.")]
    AcknowledgementRequired,

    #[error("A similar dataset already exists. Confirm 'force clone' to publish anyway.")]
    ForceCloneRequired,
}

/// Errors returned by controller operations.
///
/// By the time a controller method returns one of these, the user-visible part has
/// already been pushed through the `Notifier`.
#[derive(Debug, Error)]
pub enum WizardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{operation} failed: {source}")]
    Remote {
        operation: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("Another operation is in progress ({0})")]
    Busy(Activity),

    #[error("'{operation}' is not available on the {step} step")]
    WrongStep {
        operation: &'static str,
        step: WizardStep,
    },
}

impl WizardError {
    pub fn is_validation(&self) -> bool {
        matches!(self, WizardError::Validation(_))
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, WizardError::Remote { .. })
    }
}
