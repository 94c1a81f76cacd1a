//! Multi-step wizard navigation with unsaved-changes guards.

pub mod flow;
pub mod guard;
pub mod prompt;
pub mod stepper;
pub mod tracker;

pub use flow::{NavigationOutcome, Wizard};
pub use guard::{LeaveCheck, NavigationGuard, PendingNavigation};
pub use prompt::{
    ChannelPrompt, ConfirmLeavePrompt, ConfirmRequest, PromptError, PromptOutcome, PromptTicket,
    TerminalPrompt,
};
pub use stepper::{Step, StepIntent, Stepper};
pub use tracker::{DirtyFlag, FormBaseline, UnsavedChangesTracker, WorkUnit};
