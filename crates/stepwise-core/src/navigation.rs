#![forbid(unsafe_code)]

//! Step navigation.
//!
//! [`Navigation`] tracks the current step index over a trace of `len` steps
//! and clamps every move to `[0, len - 1]`. It knows nothing about the trace
//! contents; callers pass in the one external condition that blocks forward
//! movement (a pending prediction prompt).
//!
//! # Invariants
//!
//! 1. `current < len` whenever `len > 0`; `current == 0` when `len == 0`
//! 2. Every operation is a no-op rather than an error at the boundaries

use crate::trace::TraceDocument;

/// Current position within a trace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Navigation {
    current: usize,
    len: usize,
}

impl Navigation {
    /// Position 0 of a trace with `len` steps.
    #[must_use]
    pub const fn new(len: usize) -> Self {
        Self { current: 0, len }
    }

    /// Re-arm for a freshly loaded trace.
    pub fn load(&mut self, len: usize) {
        self.len = len;
        self.current = 0;
    }

    #[must_use]
    pub const fn current(&self) -> usize {
        self.current
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Index of the last step, if any.
    #[must_use]
    pub const fn last(&self) -> Option<usize> {
        self.len.checked_sub(1)
    }

    #[must_use]
    pub const fn at_start(&self) -> bool {
        self.current == 0
    }

    #[must_use]
    pub fn at_end(&self) -> bool {
        self.last().is_none_or(|last| self.current >= last)
    }

    /// Advance one step. Blocked at the last step and while a prediction
    /// prompt is pending. Returns whether the position changed.
    pub fn next(&mut self, prediction_pending: bool) -> bool {
        if prediction_pending || self.at_end() {
            return false;
        }
        self.current += 1;
        true
    }

    /// Retreat one step. Returns whether the position changed.
    pub fn prev(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.current -= 1;
        true
    }

    /// Jump to the last step. Returns whether the position changed.
    pub fn jump_to_end(&mut self) -> bool {
        match self.last() {
            Some(last) if last != self.current => {
                self.current = last;
                true
            }
            _ => false,
        }
    }

    /// Jump to `index`, clamped to the last step. Returns whether the
    /// position changed.
    pub fn go_to(&mut self, index: usize) -> bool {
        let Some(last) = self.last() else {
            return false;
        };
        let target = index.min(last);
        let moved = target != self.current;
        self.current = target;
        moved
    }

    /// Return to step 0. Returns whether the position changed.
    pub fn reset(&mut self) -> bool {
        let moved = self.current != 0;
        self.current = 0;
        moved
    }

    /// Terminal state: the current step is `ALGORITHM_COMPLETE`, or there is
    /// nothing to play.
    #[must_use]
    pub fn is_complete(&self, trace: Option<&TraceDocument>) -> bool {
        match trace {
            Some(trace) => trace.step(self.current).is_none_or(|s| s.is_complete()),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::Step;
    use serde_json::json;

    #[test]
    fn next_and_prev_clamp() {
        let mut nav = Navigation::new(3);
        assert!(!nav.prev());
        assert!(nav.next(false));
        assert!(nav.next(false));
        assert!(!nav.next(false));
        assert_eq!(nav.current(), 2);
        assert!(nav.prev());
        assert_eq!(nav.current(), 1);
    }

    #[test]
    fn pending_prediction_blocks_next_only() {
        let mut nav = Navigation::new(3);
        nav.next(false);
        assert!(!nav.next(true));
        assert_eq!(nav.current(), 1);
        assert!(nav.prev());
    }

    #[test]
    fn empty_trace_is_inert() {
        let mut nav = Navigation::new(0);
        assert!(!nav.next(false));
        assert!(!nav.prev());
        assert!(!nav.jump_to_end());
        assert!(!nav.reset());
        assert_eq!(nav.current(), 0);
        assert!(nav.at_end());
    }

    #[test]
    fn single_step_trace_jump_and_reset_are_noops() {
        let mut nav = Navigation::new(1);
        assert!(!nav.jump_to_end());
        assert!(!nav.reset());
        assert!(!nav.next(false));
        assert_eq!(nav.current(), 0);
    }

    #[test]
    fn jump_then_prev_then_next_round_trips() {
        let mut nav = Navigation::new(5);
        assert!(nav.jump_to_end());
        nav.prev();
        nav.next(false);
        assert_eq!(nav.current(), 4);
    }

    #[test]
    fn go_to_clamps() {
        let mut nav = Navigation::new(4);
        assert!(nav.go_to(2));
        assert!(!nav.go_to(2));
        assert!(nav.go_to(99));
        assert_eq!(nav.current(), 3);
        assert!(!Navigation::new(0).go_to(1));
    }

    #[test]
    fn load_rewinds() {
        let mut nav = Navigation::new(5);
        nav.jump_to_end();
        nav.load(2);
        assert_eq!(nav.current(), 0);
        assert_eq!(nav.len(), 2);
    }

    #[test]
    fn completion_follows_current_step() {
        let trace = TraceDocument::from_steps(vec![
            Step::new("INITIAL_STATE", json!({})),
            Step::new("ALGORITHM_COMPLETE", json!({})),
        ]);
        let mut nav = Navigation::new(trace.len());
        assert!(!nav.is_complete(Some(&trace)));
        nav.next(false);
        assert!(nav.is_complete(Some(&trace)));
        assert!(nav.is_complete(None));
        assert!(Navigation::new(0).is_complete(Some(&TraceDocument::default())));
    }
}
