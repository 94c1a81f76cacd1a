//! Shared application services.
//!
//! The tab registry and the toast channel live for the whole process. They
//! are built once and handed to every wizard explicitly.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::notifications::ToastNotifier;
use crate::tabs::TabRegistry;

/// Kind of work item a wizard operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkItemKind {
    Case,
    Authorization,
    Activity,
}

impl WorkItemKind {
    /// Prefix used in tab names.
    pub fn prefix(&self) -> &'static str {
        match self {
            WorkItemKind::Case => "Case",
            WorkItemKind::Authorization => "Auth",
            WorkItemKind::Activity => "Activity",
        }
    }

    fn route_segment(&self) -> &'static str {
        match self {
            WorkItemKind::Case => "cases",
            WorkItemKind::Authorization => "authorizations",
            WorkItemKind::Activity => "activities",
        }
    }
}

/// Reference to the record behind a tab. Opaque to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItemRef {
    pub kind: WorkItemKind,
    pub number: String,
    pub route: String,
}

impl WorkItemRef {
    pub fn new(kind: WorkItemKind, number: impl Into<String>) -> Self {
        let number = number.into();
        let route = format!("/{}/{}", kind.route_segment(), number);
        Self {
            kind,
            number,
            route,
        }
    }

    /// Tab dedup key, e.g. `Case-100`.
    pub fn tab_name(&self) -> String {
        format!("{}-{}", self.kind.prefix(), self.number)
    }
}

impl fmt::Display for WorkItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tab_name())
    }
}

pub type SharedTabs = Arc<Mutex<TabRegistry<WorkItemRef>>>;

/// Process-lifetime services shared by all wizards.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub tabs: SharedTabs,
    pub toasts: Arc<ToastNotifier>,
}

impl AppContext {
    pub fn from_config(config: Config) -> Self {
        let toasts = Arc::new(ToastNotifier::from_config(&config));
        Self::new(config, toasts)
    }

    pub fn new(config: Config, toasts: Arc<ToastNotifier>) -> Self {
        Self {
            config: Arc::new(config),
            tabs: Arc::new(Mutex::new(TabRegistry::new())),
            toasts,
        }
    }

    /// Lock the tab registry. Never hold the guard across an await.
    pub fn tabs(&self) -> MutexGuard<'_, TabRegistry<WorkItemRef>> {
        self.tabs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_item_names_and_routes() {
        let case = WorkItemRef::new(WorkItemKind::Case, "100");
        assert_eq!(case.tab_name(), "Case-100");
        assert_eq!(case.route, "/cases/100");

        let auth = WorkItemRef::new(WorkItemKind::Authorization, "A-7");
        assert_eq!(auth.to_string(), "Auth-A-7");
        assert_eq!(auth.route, "/authorizations/A-7");
    }

    #[test]
    fn test_context_clones_share_registry() {
        let ctx = AppContext::new(Config::default(), Arc::new(ToastNotifier::disabled()));
        let other = ctx.clone();

        let item = WorkItemRef::new(WorkItemKind::Activity, "3");
        ctx.tabs().add_or_select(item.tab_name(), item);

        assert_eq!(other.tabs().len(), 1);
    }
}
