//! Ordered registry of computed-field functions.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::item::Item;

/// Write action a computed function is applied for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// No stored record, or the primary key changed
    Create,
    /// Overwriting a stored record
    Push,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Create => write!(f, "create"),
            Action::Push => write!(f, "push"),
        }
    }
}

/// A computed-field function: `(candidate, stored, action) -> partial fields`.
///
/// Must be pure; the returned fields are merged over the candidate.
pub type ComputedFn = Arc<dyn Fn(&Item, Option<&Item>, Action) -> Item + Send + Sync>;

/// Tagged computed functions, applied in registration order.
#[derive(Clone, Default)]
pub struct ComputedFieldRegistry {
    entries: Vec<(String, ComputedFn)>,
    next_auto: usize,
}

impl ComputedFieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `func` under `tag`, or under a generated `computed-{n}` tag.
    ///
    /// An existing tag is replaced in place and keeps its position.
    pub fn register<F>(&mut self, func: F, tag: Option<&str>) -> String
    where
        F: Fn(&Item, Option<&Item>, Action) -> Item + Send + Sync + 'static,
    {
        self.register_arc(Arc::new(func), tag)
    }

    pub fn register_arc(&mut self, func: ComputedFn, tag: Option<&str>) -> String {
        let tag = match tag {
            Some(tag) => tag.to_string(),
            None => loop {
                let candidate = format!("computed-{}", self.next_auto);
                self.next_auto += 1;
                if !self.contains(&candidate) {
                    break candidate;
                }
            },
        };

        match self.entries.iter_mut().find(|(t, _)| *t == tag) {
            Some(entry) => entry.1 = func,
            None => self.entries.push((tag.clone(), func)),
        }
        tag
    }

    pub fn get(&self, tag: &str) -> Option<ComputedFn> {
        self.entries
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, f)| Arc::clone(f))
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.entries.iter().any(|(t, _)| t == tag)
    }

    /// Removes a tag. Returns whether it was registered.
    pub fn delete(&mut self, tag: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(t, _)| t != tag);
        self.entries.len() != before
    }

    /// Tags in application order.
    pub fn tags(&self) -> Vec<&str> {
        self.entries.iter().map(|(t, _)| t.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs every function in order over the candidate record.
    ///
    /// Each function sees the output of the previous ones; its fields
    /// overwrite the working record (last write wins per field).
    pub fn apply(&self, candidate: &Item, stored: Option<&Item>, action: Action) -> Item {
        let mut working = candidate.clone();
        for (_, func) in &self.entries {
            for (field, value) in func(&working, stored, action) {
                working.insert(field, value);
            }
        }
        working
    }
}

impl fmt::Debug for ComputedFieldRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedFieldRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}
