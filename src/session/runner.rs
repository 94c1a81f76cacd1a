//! Replays a session script through a real wizard.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;

use super::{Action, ScriptedAnswer, SessionScript};
use crate::context::{AppContext, WorkItemRef};
use crate::notifications::ToastMessage;
use crate::wizard::{
    ConfirmLeavePrompt, ConfirmRequest, FormBaseline, NavigationGuard, NavigationOutcome,
    PromptError, PromptOutcome, Step, TerminalPrompt, UnsavedChangesTracker, WorkUnit, Wizard,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    Done,
    Navigation(NavigationOutcome),
    Closed(bool),
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionResult {
    pub index: usize,
    pub action: String,
    pub outcome: ActionOutcome,
}

/// Final state after replaying a script.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub work_item: String,
    pub steps: Vec<Step>,
    pub active_step: Option<String>,
    pub results: Vec<ActionResult>,
    pub tabs: Vec<String>,
    pub selected_tab: Option<String>,
    pub toasts: Vec<ToastMessage>,
}

/// Prompt answered from the script.
#[derive(Default)]
struct ScriptedPrompt {
    answers: Mutex<VecDeque<ScriptedAnswer>>,
}

impl ScriptedPrompt {
    /// Queue the answer for the next prompt, discarding unused ones.
    fn arm(&self, answer: ScriptedAnswer) {
        let mut answers = self.answers.lock().unwrap_or_else(|e| e.into_inner());
        answers.clear();
        answers.push_back(answer);
    }
}

#[async_trait]
impl ConfirmLeavePrompt for ScriptedPrompt {
    async fn confirm(&self, request: &ConfirmRequest) -> Result<PromptOutcome, PromptError> {
        let answer = self
            .answers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_default();
        tracing::debug!(title = %request.title, ?answer, "Scripted confirmation");

        match answer {
            ScriptedAnswer::Confirm => Ok(PromptOutcome::Confirmed),
            ScriptedAnswer::Cancel => Ok(PromptOutcome::Cancelled),
            ScriptedAnswer::Dismiss => Ok(PromptOutcome::Dismissed),
            ScriptedAnswer::Fail => Err(PromptError::Unavailable),
        }
    }
}

/// The form on the current step; edits bump a revision counter.
struct StepPage {
    form: FormBaseline<u32>,
}

impl StepPage {
    fn new() -> Self {
        Self {
            form: FormBaseline::new(0),
        }
    }
}

impl WorkUnit for StepPage {
    fn unsaved_changes(&self) -> Option<&dyn UnsavedChangesTracker> {
        Some(&self.form)
    }
}

/// Replay `script` against `ctx`.
///
/// With `interactive`, leave confirmations are asked on the terminal and the
/// scripted answers are ignored.
pub async fn run_session(
    script: &SessionScript,
    ctx: &AppContext,
    interactive: bool,
) -> Result<SessionReport> {
    let scripted = Arc::new(ScriptedPrompt::default());
    let prompt: Arc<dyn ConfirmLeavePrompt> = if interactive {
        Arc::new(TerminalPrompt::new())
    } else {
        scripted.clone()
    };
    let guard =
        NavigationGuard::from_config(prompt, &ctx.config.wizard).with_toasts(ctx.toasts.clone());

    let item = script.work_item.to_ref();
    let wizard = Wizard::new(item.clone(), script.steps.clone(), guard, ctx.clone())
        .with_context(|| format!("Invalid steps for {item}"))?;
    wizard.open();

    let collected = Arc::new(Mutex::new(Vec::new()));
    let sink = collected.clone();
    let subscription = ctx.toasts.subscribe(move |m: &ToastMessage| {
        sink.lock().unwrap_or_else(|e| e.into_inner()).push(m.clone());
    });

    tracing::info!(item = %item, actions = script.actions.len(), "Replaying session");

    let mut page = StepPage::new();
    let mut results = Vec::with_capacity(script.actions.len());

    for (index, action) in script.actions.iter().enumerate() {
        if let Some(answer) = action.answer() {
            scripted.arm(answer);
        }

        let outcome = apply(action, &wizard, &mut page, ctx).await;
        if let ActionOutcome::Failed(reason) = &outcome {
            tracing::warn!(index, action = %action.describe(), %reason, "Action failed");
        }

        results.push(ActionResult {
            index,
            action: action.describe(),
            outcome,
        });
    }

    ctx.toasts.unsubscribe(subscription);

    let (tabs, selected_tab) = {
        let registry = ctx.tabs();
        (
            registry.tabs().iter().map(|t| t.name.clone()).collect(),
            registry.selected_tab().map(|t| t.name.clone()),
        )
    };
    let toasts = std::mem::take(&mut *collected.lock().unwrap_or_else(|e| e.into_inner()));

    Ok(SessionReport {
        work_item: item.tab_name(),
        steps: wizard.steps(),
        active_step: wizard.active_step().map(|s| s.id),
        results,
        tabs,
        selected_tab,
        toasts,
    })
}

async fn apply(
    action: &Action,
    wizard: &Wizard,
    page: &mut StepPage,
    ctx: &AppContext,
) -> ActionOutcome {
    match action {
        Action::Edit => {
            page.form.edit(|rev| *rev += 1);
            ActionOutcome::Done
        }
        Action::Save => {
            page.form.commit();
            ctx.toasts
                .success(format!("{} saved", wizard.item().tab_name()));
            ActionOutcome::Done
        }
        Action::GoTo { step, .. } => {
            let result = wizard.go_to(step, &*page).await;
            navigation(result, page)
        }
        Action::Next { .. } => {
            let result = wizard.next(&*page).await;
            navigation(result, page)
        }
        Action::Back { .. } => {
            let result = wizard.back(&*page).await;
            navigation(result, page)
        }
        Action::Disable { step } => done_or_failed(wizard.set_step_disabled(step, true)),
        Action::Enable { step } => done_or_failed(wizard.set_step_disabled(step, false)),
        Action::OpenTab { kind, number } => {
            let other = WorkItemRef::new(*kind, number.clone());
            ctx.tabs().add_or_select(other.tab_name(), other);
            ActionOutcome::Done
        }
        Action::CloseTab { name } => {
            let mut tabs = ctx.tabs();
            match tabs.find_by_name(name).map(|t| t.id) {
                Some(id) => {
                    tabs.remove(id);
                    ActionOutcome::Done
                }
                None => ActionOutcome::Failed(format!("no open tab named {name}")),
            }
        }
        Action::SelectTab { name } => {
            let mut tabs = ctx.tabs();
            match tabs.find_by_name(name).map(|t| t.id) {
                Some(id) => done_or_failed(tabs.select(id)),
                None => ActionOutcome::Failed(format!("no open tab named {name}")),
            }
        }
        Action::Close { .. } => {
            let closed = wizard.close(&*page).await;
            if closed {
                page.form.dispose();
            }
            ActionOutcome::Closed(closed)
        }
    }
}

fn navigation(
    result: Result<NavigationOutcome, crate::error::WizardError>,
    page: &mut StepPage,
) -> ActionOutcome {
    match result {
        Ok(outcome) => {
            if matches!(outcome, NavigationOutcome::Moved { .. }) {
                // Leaving the step tears its form down; the next step starts clean
                page.form.dispose();
                *page = StepPage::new();
            }
            ActionOutcome::Navigation(outcome)
        }
        Err(e) => ActionOutcome::Failed(e.to_string()),
    }
}

fn done_or_failed(result: Result<(), crate::error::WizardError>) -> ActionOutcome {
    match result {
        Ok(()) => ActionOutcome::Done,
        Err(e) => ActionOutcome::Failed(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::notifications::{ToastKind, ToastNotifier};

    fn ctx() -> AppContext {
        AppContext::new(Config::default(), Arc::new(ToastNotifier::new()))
    }

    const SCRIPT: &str = r#"
[work_item]
kind = "case"
number = "100"

[[steps]]
id = "intake"
label = "Intake"

[[steps]]
id = "review"
label = "Clinical review"

[[steps]]
id = "decision"
label = "Decision"
disabled = true

[[actions]]
action = "edit"

[[actions]]
action = "go_to"
step = "review"
answer = "cancel"

[[actions]]
action = "go_to"
step = "review"
answer = "fail"

[[actions]]
action = "go_to"
step = "review"
answer = "confirm"

[[actions]]
action = "go_to"
step = "decision"

[[actions]]
action = "open_tab"
kind = "authorization"
number = "7"

[[actions]]
action = "select_tab"
name = "Case-404"
"#;

    #[tokio::test]
    async fn test_replay_session() {
        let ctx = ctx();
        let script = SessionScript::from_toml_str(SCRIPT).unwrap();

        let report = run_session(&script, &ctx, false).await.unwrap();

        let outcomes: Vec<_> = report.results.iter().map(|r| r.outcome.clone()).collect();
        assert_eq!(outcomes[0], ActionOutcome::Done);
        assert_eq!(outcomes[1], ActionOutcome::Navigation(NavigationOutcome::Stayed));
        assert_eq!(outcomes[2], ActionOutcome::Navigation(NavigationOutcome::Stayed));
        assert_eq!(
            outcomes[3],
            ActionOutcome::Navigation(NavigationOutcome::Moved {
                from: Some("intake".into()),
                to: "review".into()
            })
        );
        assert_eq!(outcomes[4], ActionOutcome::Navigation(NavigationOutcome::Ignored));
        assert!(matches!(outcomes[6], ActionOutcome::Failed(_)));

        assert_eq!(report.active_step.as_deref(), Some("review"));
        let disabled: Vec<_> = report.steps.iter().map(|s| s.disabled).collect();
        assert_eq!(disabled, vec![false, false, true]);
        assert_eq!(report.tabs, vec!["Case-100", "Auth-7"]);
        assert_eq!(report.selected_tab.as_deref(), Some("Auth-7"));

        // Prompt failure surfaces as an error toast; the move as an info toast
        let kinds: Vec<_> = report.toasts.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![ToastKind::Error, ToastKind::Info]);
        assert_eq!(ctx.toasts.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_saved_page_leaves_without_prompt() {
        let script = SessionScript::from_toml_str(
            r#"
[work_item]
kind = "activity"
number = "12"

[[steps]]
id = "notes"
label = "Notes"

[[steps]]
id = "summary"
label = "Summary"

[[actions]]
action = "edit"

[[actions]]
action = "save"

[[actions]]
action = "next"
answer = "cancel"

[[actions]]
action = "close"
"#,
        )
        .unwrap();
        let ctx = ctx();

        let report = run_session(&script, &ctx, false).await.unwrap();

        assert!(matches!(
            report.results[2].outcome,
            ActionOutcome::Navigation(NavigationOutcome::Moved { .. })
        ));
        assert_eq!(report.results[3].outcome, ActionOutcome::Closed(true));
        assert!(report.tabs.is_empty());
        assert_eq!(report.toasts[0].kind, ToastKind::Success);
    }

    #[tokio::test]
    async fn test_active_step_request_keeps_edits() {
        let script = SessionScript::from_toml_str(
            r#"
[work_item]
kind = "case"
number = "5"

[[steps]]
id = "intake"
label = "Intake"

[[steps]]
id = "review"
label = "Review"

[[actions]]
action = "edit"

[[actions]]
action = "go_to"
step = "intake"
answer = "confirm"

[[actions]]
action = "next"
answer = "cancel"
"#,
        )
        .unwrap();

        let report = run_session(&script, &ctx(), false).await.unwrap();

        assert_eq!(
            report.results[1].outcome,
            ActionOutcome::Navigation(NavigationOutcome::Ignored)
        );
        // Still dirty, so the scripted cancel keeps the user on intake
        assert_eq!(
            report.results[2].outcome,
            ActionOutcome::Navigation(NavigationOutcome::Stayed)
        );
        assert_eq!(report.active_step.as_deref(), Some("intake"));
        assert!(report.toasts.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_steps_rejected() {
        let script = SessionScript::from_toml_str(
            r#"
[work_item]
kind = "case"
number = "1"

[[steps]]
id = "a"
label = "A"

[[steps]]
id = "a"
label = "A again"
"#,
        )
        .unwrap();

        assert!(run_session(&script, &ctx(), false).await.is_err());
    }
}
