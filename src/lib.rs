//! casewizard - navigation guards for case and authorization wizards.
//!
//! Tracks progress through multi-step workflows, detects unsaved edits and
//! asks before discarding them. Work items open in deduplicated tabs and
//! outcomes are reported on a toast channel.

pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod notifications;
pub mod session;
pub mod tabs;
pub mod wizard;

pub use context::{AppContext, WorkItemKind, WorkItemRef};
pub use error::WizardError;
