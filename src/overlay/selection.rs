//! Info-window selection state for annotations.

use std::collections::HashMap;

/// Which annotations currently show their info window.
///
/// Selecting one clears every other entry, matching the single-callout UI,
/// but state is still tracked per id.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    shown: HashMap<String, bool>,
}

impl Selection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` selected. Idempotent.
    pub fn select(&mut self, id: &str) {
        for (other, shown) in &mut self.shown {
            if other != id {
                *shown = false;
            }
        }
        self.shown.insert(id.to_string(), true);
    }

    pub fn deselect(&mut self, id: &str) {
        if let Some(shown) = self.shown.get_mut(id) {
            *shown = false;
        }
    }

    /// Drop all state for a removed annotation.
    pub fn forget(&mut self, id: &str) {
        self.shown.remove(id);
    }

    /// False for unknown ids.
    #[must_use]
    pub fn is_selected(&self, id: &str) -> bool {
        self.shown.get(id).copied().unwrap_or(false)
    }

    /// The currently shown id, if any.
    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.shown.iter().find(|(_, shown)| **shown).map(|(id, _)| id.as_str())
    }
}
