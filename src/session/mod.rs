//! Scripted wizard sessions.
//!
//! A session script is a TOML file describing one work item, its steps and
//! a list of user actions to replay:
//!
//! ```toml
//! [work_item]
//! kind = "case"
//! number = "100"
//!
//! [[steps]]
//! id = "intake"
//! label = "Intake"
//!
//! [[steps]]
//! id = "review"
//! label = "Clinical review"
//!
//! [[actions]]
//! action = "edit"
//!
//! [[actions]]
//! action = "go_to"
//! step = "review"
//! answer = "confirm"
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::context::{WorkItemKind, WorkItemRef};
use crate::wizard::Step;

mod runner;

pub use runner::{run_session, ActionOutcome, ActionResult, SessionReport};

#[derive(Debug, Clone, Deserialize)]
pub struct SessionScript {
    pub work_item: WorkItemEntry,
    pub steps: Vec<Step>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkItemEntry {
    pub kind: WorkItemKind,
    pub number: String,
}

impl WorkItemEntry {
    pub fn to_ref(&self) -> WorkItemRef {
        WorkItemRef::new(self.kind, self.number.clone())
    }
}

/// Scripted answer to a leave confirmation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptedAnswer {
    Confirm,
    Cancel,
    /// Close the dialog without choosing.
    #[default]
    Dismiss,
    /// The dialog cannot be opened.
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Change the form on the current step.
    Edit,
    /// Commit the form on the current step.
    Save,
    GoTo {
        step: String,
        #[serde(default)]
        answer: ScriptedAnswer,
    },
    Next {
        #[serde(default)]
        answer: ScriptedAnswer,
    },
    Back {
        #[serde(default)]
        answer: ScriptedAnswer,
    },
    Disable {
        step: String,
    },
    Enable {
        step: String,
    },
    /// Open another work item's tab.
    OpenTab {
        kind: WorkItemKind,
        number: String,
    },
    CloseTab {
        name: String,
    },
    SelectTab {
        name: String,
    },
    /// Close this session's work item.
    Close {
        #[serde(default)]
        answer: ScriptedAnswer,
    },
}

impl Action {
    /// Answer to feed the prompt if this action triggers one.
    pub fn answer(&self) -> Option<ScriptedAnswer> {
        match self {
            Action::GoTo { answer, .. }
            | Action::Next { answer }
            | Action::Back { answer }
            | Action::Close { answer } => Some(*answer),
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Action::Edit => "edit".to_string(),
            Action::Save => "save".to_string(),
            Action::GoTo { step, .. } => format!("go to {step}"),
            Action::Next { .. } => "next".to_string(),
            Action::Back { .. } => "back".to_string(),
            Action::Disable { step } => format!("disable {step}"),
            Action::Enable { step } => format!("enable {step}"),
            Action::OpenTab { kind, number } => format!("open {}-{number}", kind.prefix()),
            Action::CloseTab { name } => format!("close tab {name}"),
            Action::SelectTab { name } => format!("select tab {name}"),
            Action::Close { .. } => "close".to_string(),
        }
    }
}

impl SessionScript {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse session script")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read session script {}", path.display()))?;
        Self::from_toml_str(&content)
    }
}
