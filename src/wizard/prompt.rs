//! Leave-confirmation prompts.
//!
//! Two flavors share one contract: [`ChannelPrompt`] hands the question to
//! an asynchronous UI modal, [`TerminalPrompt`] asks on the terminal and
//! blocks a worker thread until answered.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::config::ConfirmPromptConfig;

/// What the confirmation dialog shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmRequest {
    pub title: String,
    pub message: String,
    pub confirm_label: String,
    pub cancel_label: String,
}

impl From<&ConfirmPromptConfig> for ConfirmRequest {
    fn from(config: &ConfirmPromptConfig) -> Self {
        Self {
            title: config.title.clone(),
            message: config.message.clone(),
            confirm_label: config.confirm_label.clone(),
            cancel_label: config.cancel_label.clone(),
        }
    }
}

impl Default for ConfirmRequest {
    fn default() -> Self {
        Self::from(&ConfirmPromptConfig::default())
    }
}

/// How the user answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptOutcome {
    Confirmed,
    Cancelled,
    /// Closed without an explicit choice.
    Dismissed,
}

impl PromptOutcome {
    /// Whether navigation may proceed. Only an explicit confirm allows it.
    pub fn allows_leave(self) -> bool {
        matches!(self, PromptOutcome::Confirmed)
    }
}

impl From<bool> for PromptOutcome {
    fn from(confirmed: bool) -> Self {
        if confirmed {
            PromptOutcome::Confirmed
        } else {
            PromptOutcome::Cancelled
        }
    }
}

/// The dialog could not be shown at all.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("confirmation dialog is not attached")]
    Unavailable,
    #[error("an earlier confirmation is still waiting for an answer")]
    Busy,
    #[error("terminal prompt failed: {0}")]
    Terminal(#[from] dialoguer::Error),
    #[error("prompt task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Modal that resolves to the user's leave/stay choice.
#[async_trait]
pub trait ConfirmLeavePrompt: Send + Sync {
    async fn confirm(&self, request: &ConfirmRequest) -> Result<PromptOutcome, PromptError>;
}

/// A question waiting for the UI to answer.
#[derive(Debug)]
pub struct PromptTicket {
    pub request: ConfirmRequest,
    responder: oneshot::Sender<bool>,
}

impl PromptTicket {
    /// Answer the question. Dropping the ticket instead counts as dismissal.
    pub fn respond(self, confirmed: bool) {
        // The guard may have timed out and stopped listening
        let _ = self.responder.send(confirmed);
    }
}

/// Asynchronous modal backed by a channel to the UI layer.
#[derive(Clone)]
pub struct ChannelPrompt {
    tx: mpsc::Sender<PromptTicket>,
}

impl ChannelPrompt {
    /// Create the prompt and the receiver the UI reads tickets from.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<PromptTicket>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ConfirmLeavePrompt for ChannelPrompt {
    async fn confirm(&self, request: &ConfirmRequest) -> Result<PromptOutcome, PromptError> {
        let (responder, answer) = oneshot::channel();
        let ticket = PromptTicket {
            request: request.clone(),
            responder,
        };

        self.tx
            .send(ticket)
            .await
            .map_err(|_| PromptError::Unavailable)?;

        Ok(match answer.await {
            Ok(confirmed) => PromptOutcome::from(confirmed),
            Err(_) => PromptOutcome::Dismissed,
        })
    }
}

/// Blocking terminal confirmation.
///
/// The blocking read cannot be cancelled. When a timeout abandons it, the
/// question stays on the terminal until answered, and every confirmation
/// asked in the meantime fails with [`PromptError::Busy`]. Clones share the
/// terminal and the in-flight marker.
#[derive(Debug, Clone, Default)]
pub struct TerminalPrompt {
    in_flight: Arc<AtomicBool>,
}

impl TerminalPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a question is still waiting on the terminal.
    pub fn is_waiting(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn claim(&self) -> Result<InFlight, PromptError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PromptError::Busy);
        }
        Ok(InFlight(self.in_flight.clone()))
    }
}

/// Clears the in-flight marker when the blocking read ends.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConfirmLeavePrompt for TerminalPrompt {
    async fn confirm(&self, request: &ConfirmRequest) -> Result<PromptOutcome, PromptError> {
        let in_flight = self.claim()?;
        let prompt = format!(
            "{}: {} [y = {}, n = {}]",
            request.title, request.message, request.confirm_label, request.cancel_label
        );

        let answer = tokio::task::spawn_blocking(move || {
            let _in_flight = in_flight;
            dialoguer::Confirm::new()
                .with_prompt(prompt)
                .default(false)
                .interact_opt()
        })
        .await??;

        Ok(match answer {
            Some(confirmed) => PromptOutcome::from(confirmed),
            None => PromptOutcome::Dismissed,
        })
    }
}
