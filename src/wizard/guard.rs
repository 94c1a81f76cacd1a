//! Navigation guard: decides whether the router may leave a unit of work.
//!
//! Clean units leave immediately without any UI. Dirty units get exactly
//! one confirmation prompt, and anything other than an explicit "leave"
//! (cancel, dismissal, prompt failure, timeout) keeps the user where they are.

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{self, BoxFuture, FutureExt};

use super::prompt::{ConfirmLeavePrompt, ConfirmRequest};
use super::tracker::{UnsavedChangesTracker, WorkUnit};
use crate::config::WizardConfig;
use crate::notifications::ToastNotifier;

#[derive(Clone)]
pub struct NavigationGuard {
    prompt: Arc<dyn ConfirmLeavePrompt>,
    request: ConfirmRequest,
    timeout: Option<Duration>,
    toasts: Option<Arc<ToastNotifier>>,
}

impl NavigationGuard {
    pub fn new(prompt: Arc<dyn ConfirmLeavePrompt>) -> Self {
        Self {
            prompt,
            request: ConfirmRequest::default(),
            timeout: None,
            toasts: None,
        }
    }

    /// Guard using the prompt texts and timeout from config.
    pub fn from_config(prompt: Arc<dyn ConfirmLeavePrompt>, config: &WizardConfig) -> Self {
        Self {
            request: ConfirmRequest::from(&config.confirm),
            timeout: config.confirm_timeout(),
            ..Self::new(prompt)
        }
    }

    /// Report prompt failures and timeouts as toasts.
    pub fn with_toasts(mut self, toasts: Arc<ToastNotifier>) -> Self {
        self.toasts = Some(toasts);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn request(&self) -> &ConfirmRequest {
        &self.request
    }

    /// Check whether `unit` may be left for `target`.
    ///
    /// `has_pending_changes` is read once, here. The returned check does not
    /// borrow the unit.
    pub fn can_leave(
        &self,
        unit: Option<&dyn UnsavedChangesTracker>,
        target: impl Into<String>,
    ) -> LeaveCheck {
        let dirty = unit.is_some_and(|u| u.has_pending_changes());
        if !dirty {
            return LeaveCheck::Ready(true);
        }

        let target = target.into();
        tracing::debug!(route = %target, "Unsaved changes, asking before leaving");

        LeaveCheck::Deferred(PendingNavigation {
            target,
            request: self.request.clone(),
            prompt: self.prompt.clone(),
            timeout: self.timeout,
            toasts: self.toasts.clone(),
            superseded: None,
        })
    }

    /// Router deactivation hook: takes whatever is being deactivated.
    pub fn can_deactivate(
        &self,
        unit: Option<&dyn WorkUnit>,
        target: impl Into<String>,
    ) -> LeaveCheck {
        self.can_leave(unit.and_then(|u| u.unsaved_changes()), target)
    }
}

/// Result of a guard check: decided now, or waiting on the user.
pub enum LeaveCheck {
    Ready(bool),
    Deferred(PendingNavigation),
}

impl LeaveCheck {
    /// The decision if it was made without prompting.
    pub fn immediate(&self) -> Option<bool> {
        match self {
            LeaveCheck::Ready(allowed) => Some(*allowed),
            LeaveCheck::Deferred(_) => None,
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, LeaveCheck::Deferred(_))
    }

    /// Stay without prompting if `superseded` holds when resolution starts.
    pub fn unless_superseded(
        self,
        superseded: impl Fn() -> bool + Send + Sync + 'static,
    ) -> Self {
        match self {
            LeaveCheck::Deferred(mut pending) => {
                pending.superseded = Some(Box::new(superseded));
                LeaveCheck::Deferred(pending)
            }
            ready => ready,
        }
    }
}

impl IntoFuture for LeaveCheck {
    type Output = bool;
    type IntoFuture = BoxFuture<'static, bool>;

    fn into_future(self) -> Self::IntoFuture {
        match self {
            LeaveCheck::Ready(allowed) => future::ready(allowed).boxed(),
            LeaveCheck::Deferred(pending) => pending.resolve().boxed(),
        }
    }
}

/// An in-flight leave decision. Consumed by [`PendingNavigation::resolve`].
pub struct PendingNavigation {
    target: String,
    request: ConfirmRequest,
    prompt: Arc<dyn ConfirmLeavePrompt>,
    timeout: Option<Duration>,
    toasts: Option<Arc<ToastNotifier>>,
    superseded: Option<Box<dyn Fn() -> bool + Send + Sync>>,
}

impl PendingNavigation {
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn request(&self) -> &ConfirmRequest {
        &self.request
    }

    /// Show the prompt and resolve to leave (`true`) or stay (`false`).
    pub async fn resolve(self) -> bool {
        if self.superseded.as_ref().is_some_and(|f| f()) {
            tracing::debug!(route = %self.target, "Leave request replaced before prompting");
            return false;
        }

        let prompt = self.prompt.confirm(&self.request);

        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, prompt).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::info!(route = %self.target, ?limit, "Leave confirmation timed out");
                    self.toast_info("No answer to the leave confirmation; staying on this page");
                    return false;
                }
            },
            None => prompt.await,
        };

        match result {
            Ok(outcome) => {
                tracing::debug!(route = %self.target, ?outcome, "Leave confirmation answered");
                outcome.allows_leave()
            }
            Err(e) => {
                tracing::warn!(route = %self.target, error = %e, "Leave confirmation failed");
                if let Some(toasts) = &self.toasts {
                    toasts.error("Could not open the leave confirmation; staying on this page");
                }
                false
            }
        }
    }

    fn toast_info(&self, text: &str) {
        if let Some(toasts) = &self.toasts {
            toasts.info(text);
        }
    }
}

impl IntoFuture for PendingNavigation {
    type Output = bool;
    type IntoFuture = BoxFuture<'static, bool>;

    fn into_future(self) -> Self::IntoFuture {
        self.resolve().boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::ToastKind;
    use crate::wizard::prompt::{PromptError, PromptOutcome};
    use crate::wizard::tracker::DirtyFlag;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Prompt that answers from a fixed script and counts invocations.
    struct MockPrompt {
        answer: Option<PromptOutcome>,
        calls: AtomicUsize,
    }

    impl MockPrompt {
        fn answering(outcome: PromptOutcome) -> Arc<Self> {
            Arc::new(Self {
                answer: Some(outcome),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                answer: None,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl ConfirmLeavePrompt for MockPrompt {
        async fn confirm(&self, _request: &ConfirmRequest) -> Result<PromptOutcome, PromptError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.ok_or(PromptError::Unavailable)
        }
    }

    /// Prompt that never answers.
    struct SilentPrompt;

    #[async_trait::async_trait]
    impl ConfirmLeavePrompt for SilentPrompt {
        async fn confirm(&self, _request: &ConfirmRequest) -> Result<PromptOutcome, PromptError> {
            future::pending().await
        }
    }

    struct Page {
        flag: Option<DirtyFlag>,
    }

    impl WorkUnit for Page {
        fn unsaved_changes(&self) -> Option<&dyn UnsavedChangesTracker> {
            self.flag.as_ref().map(|f| f as &dyn UnsavedChangesTracker)
        }
    }

    fn dirty() -> DirtyFlag {
        let flag = DirtyFlag::new();
        flag.mark_dirty();
        flag
    }

    fn toast_log(toasts: &ToastNotifier) -> Arc<Mutex<Vec<ToastKind>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        toasts.subscribe(move |m| sink.lock().unwrap().push(m.kind));
        seen
    }

    #[tokio::test]
    async fn test_clean_unit_leaves_without_prompt() {
        let prompt = MockPrompt::answering(PromptOutcome::Cancelled);
        let guard = NavigationGuard::new(prompt.clone());
        let clean = DirtyFlag::new();

        for _ in 0..3 {
            let check = guard.can_leave(Some(&clean), "/cases/1/review");
            assert_eq!(check.immediate(), Some(true));
            assert!(check.await);
        }
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_absent_unit_or_capability_leaves() {
        let prompt = MockPrompt::answering(PromptOutcome::Cancelled);
        let guard = NavigationGuard::new(prompt.clone());

        assert_eq!(guard.can_leave(None, "/").immediate(), Some(true));
        assert_eq!(guard.can_deactivate(None, "/").immediate(), Some(true));

        let page = Page { flag: None };
        assert_eq!(guard.can_deactivate(Some(&page), "/").immediate(), Some(true));
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dirty_unit_gets_users_choice() {
        for (outcome, expected) in [
            (PromptOutcome::Confirmed, true),
            (PromptOutcome::Cancelled, false),
            (PromptOutcome::Dismissed, false),
        ] {
            let prompt = MockPrompt::answering(outcome);
            let guard = NavigationGuard::new(prompt.clone());
            let page = Page { flag: Some(dirty()) };

            let check = guard.can_deactivate(Some(&page), "/cases");
            assert!(check.is_deferred());
            assert_eq!(check.await, expected);
            assert_eq!(prompt.calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn test_dirty_state_read_once_at_entry() {
        let prompt = MockPrompt::answering(PromptOutcome::Confirmed);
        let guard = NavigationGuard::new(prompt.clone());
        let flag = dirty();

        let check = guard.can_leave(Some(&flag), "/next");
        flag.mark_clean();

        assert!(check.await);
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_prompt_failure_fails_closed_with_error_toast() {
        let toasts = Arc::new(ToastNotifier::new());
        let seen = toast_log(&toasts);
        let guard = NavigationGuard::new(MockPrompt::failing()).with_toasts(toasts);

        assert!(!guard.can_leave(Some(&dirty()), "/x").await);
        assert_eq!(*seen.lock().unwrap(), vec![ToastKind::Error]);
    }

    #[tokio::test]
    async fn test_timeout_means_stay() {
        let toasts = Arc::new(ToastNotifier::new());
        let seen = toast_log(&toasts);
        let guard = NavigationGuard::new(Arc::new(SilentPrompt))
            .with_timeout(Duration::from_millis(20))
            .with_toasts(toasts);

        assert!(!guard.can_leave(Some(&dirty()), "/x").await);
        assert_eq!(*seen.lock().unwrap(), vec![ToastKind::Info]);
    }

    #[tokio::test]
    async fn test_superseded_check_skips_prompt() {
        let prompt = MockPrompt::answering(PromptOutcome::Confirmed);
        let guard = NavigationGuard::new(prompt.clone());

        let stale = guard.can_leave(Some(&dirty()), "/a").unless_superseded(|| true);
        assert!(!stale.await);
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 0);

        let current = guard.can_leave(Some(&dirty()), "/b").unless_superseded(|| false);
        assert!(current.await);
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 1);

        let clean = guard.can_leave(None, "/c").unless_superseded(|| true);
        assert_eq!(clean.immediate(), Some(true));
    }

    #[tokio::test]
    async fn test_request_uses_configured_texts() {
        let mut config = WizardConfig::default();
        config.confirm.title = "Discard authorization edits?".into();

        let guard = NavigationGuard::from_config(MockPrompt::failing(), &config);
        let LeaveCheck::Deferred(pending) = guard.can_leave(Some(&dirty()), "/auth/9") else {
            panic!("dirty unit should defer");
        };

        assert_eq!(pending.target(), "/auth/9");
        assert_eq!(pending.request().title, "Discard authorization edits?");
    }
}
