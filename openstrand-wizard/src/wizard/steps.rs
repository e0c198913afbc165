// Fixed step list for the dataset submission wizard.
//
// Exactly four steps, in order. The step-specific behaviour lives in the controller;
// this module only names them and answers "what is next / previous".

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WizardStep {
    #[default]
    Source,
    Metadata,
    Verification,
    Publish,
}

pub const STEPS: [WizardStep; 4] = [
    WizardStep::Source,
    WizardStep::Metadata,
    WizardStep::Verification,
    WizardStep::Publish,
];

impl WizardStep {
    pub fn index(&self) -> usize {
        match self {
            WizardStep::Source => 0,
            WizardStep::Metadata => 1,
            WizardStep::Verification => 2,
            WizardStep::Publish => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        STEPS.get(index).copied()
    }

    pub fn id(&self) -> &'static str {
        match self {
            WizardStep::Source => "source",
            WizardStep::Metadata => "metadata",
            WizardStep::Verification => "verification",
            WizardStep::Publish => "publish",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            WizardStep::Source => "Upload Dataset",
            WizardStep::Metadata => "Describe Dataset",
            WizardStep::Verification => "Verify",
            WizardStep::Publish => "Publish",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            WizardStep::Source => "Choose the file to add to the catalog.",
            WizardStep::Metadata => "Name, describe and tag the dataset, then pick who can use it.",
            WizardStep::Verification => {
                "Check the draft for duplicates and policy issues before publishing."
            }
            WizardStep::Publish => "Review the submission and publish it to the catalog.",
        }
    }

    /// Label of the primary button on this step.
    pub fn next_label(&self) -> &'static str {
        match self {
            WizardStep::Source => "Upload & Continue",
            WizardStep::Verification => "Continue",
            WizardStep::Publish => "Publish",
            _ => "Next",
        }
    }

    pub fn next(&self) -> WizardStep {
        match self {
            WizardStep::Source => WizardStep::Metadata,
            WizardStep::Metadata => WizardStep::Verification,
            WizardStep::Verification => WizardStep::Publish,
            WizardStep::Publish => WizardStep::Publish,
        }
    }

    /// Previous step; the first step maps to itself.
    pub fn prev(&self) -> WizardStep {
        match self {
            WizardStep::Source => WizardStep::Source,
            WizardStep::Metadata => WizardStep::Source,
            WizardStep::Verification => WizardStep::Metadata,
            WizardStep::Publish => WizardStep::Verification,
        }
    }

    pub fn is_first(&self) -> bool {
        *self == WizardStep::Source
    }

    pub fn is_last(&self) -> bool {
        *self == WizardStep::Publish
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}
