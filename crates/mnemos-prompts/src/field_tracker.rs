//! Field-usage tracking wrapper (spec.md §4.C9): each `build()` call
//! declares the request variant's field names; section formatters mark a
//! field as soon as they read it. After the build, any declared field
//! that was never marked is reported as a warning, not a failure.

use std::cell::RefCell;
use std::collections::HashSet;

pub struct FieldTracker {
    variant: &'static str,
    declared: HashSet<&'static str>,
    used: RefCell<HashSet<&'static str>>,
}

impl FieldTracker {
    #[must_use]
    pub fn new(variant: &'static str, declared: &[&'static str]) -> Self {
        Self { variant, declared: declared.iter().copied().collect(), used: RefCell::new(HashSet::new()) }
    }

    pub fn mark(&self, field: &'static str) {
        self.used.borrow_mut().insert(field);
    }

    /// Logs (but does not fail on) any declared field that was never
    /// marked as read during this build.
    pub fn report_unread(&self) {
        let used = self.used.borrow();
        let mut unread: Vec<&'static str> = self.declared.iter().filter(|f| !used.contains(*f)).copied().collect();
        if unread.is_empty() {
            return;
        }
        unread.sort_unstable();
        tracing::warn!(variant = self.variant, unread = ?unread, "prompt builder left declared fields unread");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fully_marked_fields_report_nothing() {
        let tracker = FieldTracker::new("Standard", &["prompt", "rules"]);
        tracker.mark("prompt");
        tracker.mark("rules");
        tracker.report_unread();
    }

    #[test]
    fn unmarked_declared_fields_are_collected() {
        let tracker = FieldTracker::new("Standard", &["prompt", "intent"]);
        tracker.mark("prompt");
        assert!(!tracker.used.borrow().contains("intent"));
    }
}
