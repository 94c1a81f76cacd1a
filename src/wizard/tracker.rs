//! Unsaved-changes capability and the trackers steps use to implement it.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Capability of a unit of work that can hold uncommitted edits.
///
/// Must be side-effect free and must not panic, including right after
/// creation and while the unit is being torn down.
pub trait UnsavedChangesTracker {
    fn has_pending_changes(&self) -> bool {
        false
    }
}

/// Whatever the router is about to deactivate.
///
/// Units that do not track edits keep the default and are always allowed
/// to leave.
pub trait WorkUnit {
    fn unsaved_changes(&self) -> Option<&dyn UnsavedChangesTracker> {
        None
    }
}

const CLEAN: u8 = 0;
const DIRTY: u8 = 1;
const DISPOSED: u8 = 2;

/// Explicit dirty flag, shared between a step and its child widgets.
///
/// Cloning yields another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct DirtyFlag {
    state: Arc<AtomicU8>,
}

impl DirtyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_dirty(&self) {
        // Disposed flags stay disposed
        let _ = self
            .state
            .compare_exchange(CLEAN, DIRTY, Ordering::AcqRel, Ordering::Acquire);
    }

    pub fn mark_clean(&self) {
        let _ = self
            .state
            .compare_exchange(DIRTY, CLEAN, Ordering::AcqRel, Ordering::Acquire);
    }

    pub fn dispose(&self) {
        self.state.store(DISPOSED, Ordering::Release);
    }

    pub fn is_disposed(&self) -> bool {
        self.state.load(Ordering::Acquire) == DISPOSED
    }
}

impl UnsavedChangesTracker for DirtyFlag {
    fn has_pending_changes(&self) -> bool {
        self.state.load(Ordering::Acquire) == DIRTY
    }
}

/// Form state compared against the last committed baseline.
#[derive(Debug, Clone)]
pub struct FormBaseline<T> {
    state: Option<(T, T)>,
}

impl<T: PartialEq + Clone> FormBaseline<T> {
    pub fn new(value: T) -> Self {
        Self {
            state: Some((value.clone(), value)),
        }
    }

    /// Current (possibly edited) value; `None` once disposed.
    pub fn current(&self) -> Option<&T> {
        self.state.as_ref().map(|(_, current)| current)
    }

    pub fn baseline(&self) -> Option<&T> {
        self.state.as_ref().map(|(baseline, _)| baseline)
    }

    /// Apply an edit to the current value. Ignored after disposal.
    pub fn edit(&mut self, f: impl FnOnce(&mut T)) {
        if let Some((_, current)) = self.state.as_mut() {
            f(current);
        }
    }

    /// Make the current value the new baseline (after a successful save).
    pub fn commit(&mut self) {
        if let Some((baseline, current)) = self.state.as_mut() {
            *baseline = current.clone();
        }
    }

    /// Throw away edits.
    pub fn revert(&mut self) {
        if let Some((baseline, current)) = self.state.as_mut() {
            *current = baseline.clone();
        }
    }

    pub fn dispose(&mut self) {
        self.state = None;
    }
}

impl<T: PartialEq> UnsavedChangesTracker for FormBaseline<T> {
    fn has_pending_changes(&self) -> bool {
        self.state
            .as_ref()
            .is_some_and(|(baseline, current)| baseline != current)
    }
}
