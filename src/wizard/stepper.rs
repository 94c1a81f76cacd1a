//! Ordered wizard steps with an active-step pointer.
//!
//! The stepper never moves itself. `request_step` only emits a navigation
//! intent; the owning wizard runs its leave checks and then calls
//! `confirm_intent` (or `cancel_request` when the user chose to stay).
//!
//! Only one request is in flight at a time. A new request supersedes an
//! unresolved one (last request wins); confirming the superseded intent
//! afterwards fails with [`WizardError::Superseded`].

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::WizardError;

/// A wizard step. Only `disabled` changes after configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub disabled: bool,
}

impl Step {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            disabled: false,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

/// Navigation intent emitted by [`Stepper::request_step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepIntent {
    /// Request sequence number, increasing per stepper.
    pub seq: u64,
    pub step: Step,
}

pub struct Stepper {
    steps: Vec<Step>,
    active: Option<String>,
    pending: Option<StepIntent>,
    next_seq: u64,
    listener: Option<mpsc::UnboundedSender<StepIntent>>,
}

impl Stepper {
    /// Build a stepper. The first enabled step starts active.
    pub fn new(steps: Vec<Step>) -> Result<Self, WizardError> {
        for (i, step) in steps.iter().enumerate() {
            if steps[..i].iter().any(|s| s.id == step.id) {
                return Err(WizardError::DuplicateStep(step.id.clone()));
            }
        }

        let active = steps.iter().find(|s| !s.disabled).map(|s| s.id.clone());

        Ok(Self {
            steps,
            active,
            pending: None,
            next_seq: 1,
            listener: None,
        })
    }

    /// Forward every emitted intent to `tx` as well as returning it.
    pub fn with_listener(mut self, tx: mpsc::UnboundedSender<StepIntent>) -> Self {
        self.listener = Some(tx);
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn active(&self) -> Option<&Step> {
        self.active.as_deref().and_then(|id| self.step(id))
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn pending(&self) -> Option<&StepIntent> {
        self.pending.as_ref()
    }

    pub fn set_disabled(&mut self, id: &str, disabled: bool) -> Result<(), WizardError> {
        let step = self
            .steps
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| WizardError::UnknownStep(id.to_string()))?;
        step.disabled = disabled;
        Ok(())
    }

    /// Ask to move to `id`.
    ///
    /// Unknown and disabled steps, and the step that is already active, are
    /// ignored: no state change, no event.
    pub fn request_step(&mut self, id: &str) -> Option<StepIntent> {
        if self.active.as_deref() == Some(id) {
            tracing::debug!(step = %id, "Ignoring request for the active step");
            return None;
        }

        let step = match self.step(id) {
            Some(s) if !s.disabled => s.clone(),
            Some(_) => {
                tracing::debug!(step = %id, "Ignoring request for disabled step");
                return None;
            }
            None => {
                tracing::debug!(step = %id, "Ignoring request for unknown step");
                return None;
            }
        };

        let intent = StepIntent {
            seq: self.next_seq,
            step,
        };
        self.next_seq += 1;

        if let Some(previous) = self.pending.replace(intent.clone()) {
            tracing::debug!(
                superseded = %previous.step.id,
                step = %id,
                "Navigation request superseded"
            );
        }

        if let Some(tx) = &self.listener {
            // Listener going away does not affect navigation
            let _ = tx.send(intent.clone());
        }

        Some(intent)
    }

    /// Accept the pending request for `id` and make it the active step.
    pub fn confirm_step(&mut self, id: &str) -> Result<(), WizardError> {
        let seq = match &self.pending {
            Some(p) if p.step.id == id => p.seq,
            Some(p) => {
                return Err(WizardError::Superseded {
                    requested: id.to_string(),
                    current: p.step.id.clone(),
                })
            }
            None => return Err(WizardError::NoPendingRequest(id.to_string())),
        };
        self.apply(id, seq)
    }

    /// Accept a specific intent. Fails if a later request replaced it.
    pub fn confirm_intent(&mut self, intent: &StepIntent) -> Result<(), WizardError> {
        match &self.pending {
            Some(p) if p.seq == intent.seq => {}
            Some(p) => {
                return Err(WizardError::Superseded {
                    requested: intent.step.id.clone(),
                    current: p.step.id.clone(),
                })
            }
            // A newer request was issued and already settled
            None if intent.seq + 1 < self.next_seq => {
                return Err(WizardError::Superseded {
                    requested: intent.step.id.clone(),
                    current: self.active.clone().unwrap_or_default(),
                })
            }
            None => return Err(WizardError::NoPendingRequest(intent.step.id.clone())),
        }
        self.apply(&intent.step.id, intent.seq)
    }

    /// Drop `intent` if it is still the pending request. Returns whether it was.
    pub fn cancel_request(&mut self, intent: &StepIntent) -> bool {
        if self.pending.as_ref().is_some_and(|p| p.seq == intent.seq) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Next enabled step after the active one.
    pub fn next_enabled(&self) -> Option<&Step> {
        let start = self.active_index().map_or(0, |i| i + 1);
        self.steps[start..].iter().find(|s| !s.disabled)
    }

    /// Closest enabled step before the active one.
    pub fn previous_enabled(&self) -> Option<&Step> {
        let end = self.active_index()?;
        self.steps[..end].iter().rev().find(|s| !s.disabled)
    }

    fn active_index(&self) -> Option<usize> {
        let id = self.active.as_deref()?;
        self.steps.iter().position(|s| s.id == id)
    }

    fn apply(&mut self, id: &str, seq: u64) -> Result<(), WizardError> {
        // Business rules may have disabled the step while the guard was pending
        match self.step(id) {
            None => {
                self.pending = None;
                return Err(WizardError::UnknownStep(id.to_string()));
            }
            Some(s) if s.disabled => {
                self.pending = None;
                return Err(WizardError::StepDisabled(id.to_string()));
            }
            Some(_) => {}
        }

        self.pending = None;
        let previous = self.active.replace(id.to_string());
        tracing::debug!(seq, from = ?previous, to = %id, "Active step changed");
        Ok(())
    }
}
