// Dataset submission wizard
//
// steps      -> the fixed four-step list
// reducer    -> closed action set + pure transition function
// controller -> gating, side effects and notifications around the reducer

pub mod controller;
pub mod reducer;
pub mod steps;

pub use controller::WizardController;
pub use reducer::{reduce, WizardAction};
pub use steps::{WizardStep, STEPS};
