//! Error types for wizard navigation, steps and tabs.

use thiserror::Error;

use crate::tabs::TabId;

/// Errors raised by the stepper, the tab registry and the wizard coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("step '{0}' is defined more than once")]
    DuplicateStep(String),

    #[error("step '{0}' does not exist")]
    UnknownStep(String),

    #[error("step '{0}' is disabled")]
    StepDisabled(String),

    #[error("no pending navigation request for step '{0}'")]
    NoPendingRequest(String),

    #[error("request for step '{requested}' was superseded by a request for '{current}'")]
    Superseded { requested: String, current: String },

    #[error("tab {0} does not exist")]
    TabNotFound(TabId),
}

impl WizardError {
    /// Whether this error only means a later navigation request won.
    pub fn is_superseded(&self) -> bool {
        matches!(self, WizardError::Superseded { .. })
    }
}
