#![forbid(unsafe_code)]

//! Highlight resolution.
//!
//! The highlighted entity is derived, never stored: it is recomputed from the
//! current step every time it is asked for. The only state here is the
//! pointer hover override, which wins over the step-derived value and lives
//! until it is cleared or replaced.

use crate::trace::{EntityId, Step};

/// Entity examined by the step's active (last) call frame.
#[must_use]
pub fn auto_highlight(step: Option<&Step>) -> Option<EntityId> {
    step?.active_frame()?.entity_id()
}

/// Hover override plus derivation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Highlight {
    hover: Option<EntityId>,
}

impl Highlight {
    #[must_use]
    pub const fn new() -> Self {
        Self { hover: None }
    }

    /// Set (`Some`) or clear (`None`) the hover override.
    pub fn hover(&mut self, target: Option<EntityId>) {
        if self.hover != target {
            tracing::trace!(?target, "hover changed");
        }
        self.hover = target;
    }

    #[must_use]
    pub const fn hover_target(&self) -> Option<EntityId> {
        self.hover
    }

    /// The entity to emphasize for `step`.
    #[must_use]
    pub fn effective(&self, step: Option<&Step>) -> Option<EntityId> {
        self.hover.or_else(|| auto_highlight(step))
    }
}
