//! Wizard coordinator: wires stepper, guard, tabs and toasts together.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use super::guard::{LeaveCheck, NavigationGuard};
use super::stepper::{Step, StepIntent, Stepper};
use super::tracker::WorkUnit;
use crate::context::{AppContext, WorkItemRef};
use crate::error::WizardError;
use crate::tabs::AddOrSelect;

/// What happened to a navigation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NavigationOutcome {
    /// Target step unknown, disabled or already active; nothing happened.
    Ignored,
    /// The user chose to stay.
    Stayed,
    /// A later request replaced this one before it was allowed.
    Superseded,
    Moved { from: Option<String>, to: String },
}

/// One open case/authorization wizard.
pub struct Wizard {
    item: WorkItemRef,
    stepper: Arc<Mutex<Stepper>>,
    guard: NavigationGuard,
    ctx: AppContext,
}

impl Wizard {
    pub fn new(
        item: WorkItemRef,
        steps: Vec<Step>,
        guard: NavigationGuard,
        ctx: AppContext,
    ) -> Result<Self, WizardError> {
        Ok(Self {
            item,
            stepper: Arc::new(Mutex::new(Stepper::new(steps)?)),
            guard,
            ctx,
        })
    }

    pub fn item(&self) -> &WorkItemRef {
        &self.item
    }

    /// Open (or bring forward) this work item's tab.
    pub fn open(&self) -> AddOrSelect {
        let result = self
            .ctx
            .tabs()
            .add_or_select(self.item.tab_name(), self.item.clone());
        if result.created {
            tracing::info!(item = %self.item, tab = %result.id, "Opened work item");
        }
        result
    }

    pub fn active_step(&self) -> Option<Step> {
        self.stepper().active().cloned()
    }

    pub fn steps(&self) -> Vec<Step> {
        self.stepper().steps().to_vec()
    }

    pub fn set_step_disabled(&self, id: &str, disabled: bool) -> Result<(), WizardError> {
        self.stepper().set_disabled(id, disabled)
    }

    /// Navigate to step `target`, leaving `unit`.
    ///
    /// The request and the dirty check happen when this is called, not when
    /// the returned future is first polled, so rapid successive calls are
    /// ordered by call time. The last call wins, and a request replaced
    /// before its prompt opens never prompts.
    pub fn go_to(
        &self,
        target: &str,
        unit: &dyn WorkUnit,
    ) -> impl Future<Output = Result<NavigationOutcome, WizardError>> + Send + '_ {
        self.navigate(self.begin(target, unit))
    }

    /// Navigate to the next enabled step.
    pub fn next(
        &self,
        unit: &dyn WorkUnit,
    ) -> impl Future<Output = Result<NavigationOutcome, WizardError>> + Send + '_ {
        let target = self.stepper().next_enabled().map(|s| s.id.clone());
        self.go_to_optional(target, unit)
    }

    /// Navigate to the previous enabled step.
    pub fn back(
        &self,
        unit: &dyn WorkUnit,
    ) -> impl Future<Output = Result<NavigationOutcome, WizardError>> + Send + '_ {
        let target = self.stepper().previous_enabled().map(|s| s.id.clone());
        self.go_to_optional(target, unit)
    }

    /// Close the work item's tab, asking first if `unit` has unsaved changes.
    /// Resolves to whether the tab was closed.
    pub fn close(&self, unit: &dyn WorkUnit) -> impl Future<Output = bool> + Send + '_ {
        let check = self.guard.can_deactivate(Some(unit), "/");
        async move {
            if !check.await {
                tracing::debug!(item = %self.item, "Close cancelled");
                return false;
            }

            let name = self.item.tab_name();
            let removed = {
                let mut tabs = self.ctx.tabs();
                let id = tabs.find_by_name(&name).map(|t| t.id);
                id.and_then(|id| tabs.remove(id)).is_some()
            };
            if removed {
                tracing::info!(item = %self.item, "Closed work item");
                self.ctx.toasts.info(format!("{name} closed"));
            }
            true
        }
    }

    fn go_to_optional(
        &self,
        target: Option<String>,
        unit: &dyn WorkUnit,
    ) -> impl Future<Output = Result<NavigationOutcome, WizardError>> + Send + '_ {
        self.navigate(target.and_then(|t| self.begin(&t, unit)))
    }

    async fn navigate(
        &self,
        begun: Option<(StepIntent, LeaveCheck)>,
    ) -> Result<NavigationOutcome, WizardError> {
        match begun {
            None => Ok(NavigationOutcome::Ignored),
            Some((intent, check)) => {
                let allowed = check.await;
                self.finish(&intent, allowed)
            }
        }
    }

    fn begin(&self, target: &str, unit: &dyn WorkUnit) -> Option<(StepIntent, LeaveCheck)> {
        let intent = self.stepper().request_step(target)?;
        let route = format!("{}/{}", self.item.route, intent.step.id);

        let stepper = Arc::clone(&self.stepper);
        let seq = intent.seq;
        let check = self
            .guard
            .can_deactivate(Some(unit), route)
            .unless_superseded(move || lock(&stepper).pending().map(|p| p.seq) != Some(seq));
        Some((intent, check))
    }

    fn finish(&self, intent: &StepIntent, allowed: bool) -> Result<NavigationOutcome, WizardError> {
        let (from, result) = {
            let mut stepper = self.stepper();
            if !allowed {
                if !stepper.cancel_request(intent) {
                    tracing::debug!(
                        item = %self.item,
                        step = %intent.step.id,
                        "Navigation superseded"
                    );
                    return Ok(NavigationOutcome::Superseded);
                }
                tracing::debug!(
                    item = %self.item,
                    step = %intent.step.id,
                    "Stayed on current step"
                );
                return Ok(NavigationOutcome::Stayed);
            }
            let from = stepper.active_id().map(str::to_string);
            (from, stepper.confirm_intent(intent))
        };

        match result {
            Ok(()) => {}
            Err(e) if e.is_superseded() => {
                tracing::debug!(item = %self.item, error = %e, "Navigation superseded");
                return Ok(NavigationOutcome::Superseded);
            }
            Err(e) => return Err(e),
        }

        self.open();
        self.ctx
            .toasts
            .info(format!("{}: {}", self.item.tab_name(), intent.step.label));
        tracing::info!(
            item = %self.item,
            from = ?from,
            to = %intent.step.id,
            "Moved to step"
        );

        Ok(NavigationOutcome::Moved {
            from,
            to: intent.step.id.clone(),
        })
    }

    fn stepper(&self) -> MutexGuard<'_, Stepper> {
        lock(&self.stepper)
    }
}

fn lock(stepper: &Mutex<Stepper>) -> MutexGuard<'_, Stepper> {
    stepper.lock().unwrap_or_else(PoisonError::into_inner)
}
