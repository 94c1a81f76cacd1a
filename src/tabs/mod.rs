//! Registry of named work tabs.
//!
//! Tabs are deduplicated by name: asking for a name that is already open
//! selects the existing tab instead of opening a second one.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::WizardError;

/// Process-unique tab identifier. Allocated from a monotonic counter and
/// never reused, even after the tab is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(u64);

impl TabId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An open work tab.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tab<C> {
    pub id: TabId,
    /// Dedup key.
    pub name: String,
    pub content: C,
}

/// Result of [`TabRegistry::add_or_select`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOrSelect {
    pub created: bool,
    pub id: TabId,
}

/// Ordered set of open tabs plus the selected-tab pointer.
#[derive(Debug, Clone)]
pub struct TabRegistry<C> {
    tabs: Vec<Tab<C>>,
    selected: Option<TabId>,
    next_id: u64,
}

impl<C> Default for TabRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> TabRegistry<C> {
    pub fn new() -> Self {
        Self {
            tabs: Vec::new(),
            selected: None,
            next_id: 1,
        }
    }

    /// Open a tab for `name`, or select the one already open.
    ///
    /// An existing tab keeps the content it was created with; `content` is
    /// dropped in that case. Use [`TabRegistry::replace_content`] to update it.
    pub fn add_or_select(&mut self, name: impl Into<String>, content: C) -> AddOrSelect {
        let name = name.into();

        if let Some(existing) = self.tabs.iter().find(|t| t.name == name) {
            let id = existing.id;
            self.selected = Some(id);
            tracing::debug!(tab = %id, name = %name, "Selected existing tab");
            return AddOrSelect { created: false, id };
        }

        let id = TabId(self.next_id);
        self.next_id += 1;
        tracing::debug!(tab = %id, name = %name, "Opened tab");
        self.tabs.push(Tab { id, name, content });
        self.selected = Some(id);

        AddOrSelect { created: true, id }
    }

    /// Remove a tab. Unknown ids are ignored.
    ///
    /// When the selected tab is removed, selection falls to the first
    /// remaining tab, or to none if the registry is now empty.
    pub fn remove(&mut self, id: TabId) -> Option<Tab<C>> {
        let index = self.tabs.iter().position(|t| t.id == id)?;
        let removed = self.tabs.remove(index);

        if self.selected == Some(id) {
            self.selected = self.tabs.first().map(|t| t.id);
        }

        tracing::debug!(
            tab = %id,
            name = %removed.name,
            selected = ?self.selected.map(TabId::get),
            "Closed tab"
        );
        Some(removed)
    }

    /// Select a tab by id. Fails without touching the selection when the
    /// id is not open.
    pub fn select(&mut self, id: TabId) -> Result<(), WizardError> {
        if !self.tabs.iter().any(|t| t.id == id) {
            return Err(WizardError::TabNotFound(id));
        }
        self.selected = Some(id);
        Ok(())
    }

    /// Swap the content of an open tab, returning the previous content.
    pub fn replace_content(&mut self, id: TabId, content: C) -> Result<C, WizardError> {
        let tab = self
            .tabs
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(WizardError::TabNotFound(id))?;
        Ok(std::mem::replace(&mut tab.content, content))
    }

    pub fn get(&self, id: TabId) -> Option<&Tab<C>> {
        self.tabs.iter().find(|t| t.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Tab<C>> {
        self.tabs.iter().find(|t| t.name == name)
    }

    pub fn selected(&self) -> Option<TabId> {
        self.selected
    }

    pub fn selected_tab(&self) -> Option<&Tab<C>> {
        self.selected.and_then(|id| self.get(id))
    }

    /// Tabs in display order.
    pub fn tabs(&self) -> &[Tab<C>] {
        &self.tabs
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_creates_and_selects() {
        let mut registry = TabRegistry::new();
        let result = registry.add_or_select("Case-100", "intake");

        assert!(result.created);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.selected(), Some(result.id));
    }

    #[test]
    fn test_same_name_reuses_tab_and_keeps_first_content() {
        let mut registry = TabRegistry::new();
        let first = registry.add_or_select("Case-100", "X");
        registry.add_or_select("Auth-7", "A");
        let second = registry.add_or_select("Case-100", "Y");

        assert!(!second.created);
        assert_eq!(second.id, first.id);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.selected(), Some(first.id));
        assert_eq!(registry.get(first.id).unwrap().content, "X");
    }

    #[test]
    fn test_remove_selected_falls_back_to_first() {
        let mut registry = TabRegistry::new();
        let a = registry.add_or_select("a", ());
        let b = registry.add_or_select("b", ());
        let c = registry.add_or_select("c", ());
        assert_eq!(registry.selected(), Some(c.id));

        registry.remove(c.id);
        assert_eq!(registry.selected(), Some(a.id));

        registry.remove(a.id);
        assert_eq!(registry.selected(), Some(b.id));

        registry.remove(b.id);
        assert_eq!(registry.selected(), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_unselected_keeps_selection() {
        let mut registry = TabRegistry::new();
        let a = registry.add_or_select("a", ());
        let b = registry.add_or_select("b", ());

        assert!(registry.remove(a.id).is_some());
        assert_eq!(registry.selected(), Some(b.id));
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut registry: TabRegistry<()> = TabRegistry::new();
        assert!(registry.remove(TabId::new(42)).is_none());
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut registry = TabRegistry::new();
        let a = registry.add_or_select("a", ());
        registry.remove(a.id);
        let again = registry.add_or_select("a", ());

        assert!(again.created);
        assert!(again.id > a.id);
    }

    #[test]
    fn test_select_missing_fails_loudly() {
        let mut registry = TabRegistry::new();
        let a = registry.add_or_select("a", ());

        let err = registry.select(TabId::new(99)).unwrap_err();
        assert_eq!(err, WizardError::TabNotFound(TabId::new(99)));
        assert_eq!(registry.selected(), Some(a.id));
    }

    #[test]
    fn test_replace_content() {
        let mut registry = TabRegistry::new();
        let a = registry.add_or_select("a", 1);

        assert_eq!(registry.replace_content(a.id, 2), Ok(1));
        assert_eq!(registry.get(a.id).unwrap().content, 2);
        assert!(registry.replace_content(TabId::new(9), 3).is_err());
    }
}
