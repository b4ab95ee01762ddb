#![forbid(unsafe_code)]

//! Trace storage with request sequencing.
//!
//! The store owns the loaded [`TraceDocument`] together with the loading
//! flag and the last load error. Loads are two-phase:
//!
//! 1. [`TraceStore::begin_load`] clears all state and hands out a fresh
//!    [`RequestId`].
//! 2. [`TraceStore::finish_load`] applies the response for that id.
//!
//! Request ids increase monotonically. A response whose id is not the most
//! recently issued one is stale and is dropped without touching the store,
//! so the last *issued* request wins regardless of arrival order.

use std::fmt;
use std::sync::Arc;

use crate::trace::{Step, TraceDocument};

/// Fallback message when an error response body cannot be decoded.
pub const UNPARSEABLE_ERROR_BODY: &str = "Failed to parse error response";

/// Identity of one load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Why a load failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadErrorKind {
    /// The request never produced an HTTP response.
    Transport,
    /// The backend answered with a non-success status.
    Status,
    /// A success response whose body is not a trace document.
    Decode,
}

/// A failed trace load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    pub kind: LoadErrorKind,
    /// HTTP status, when a response was received.
    pub status: Option<u16>,
    /// Server-provided or locally generated message.
    pub message: String,
}

impl LoadError {
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: LoadErrorKind::Transport,
            status: None,
            message: message.into(),
        }
    }

    /// A non-success response. `server_message` is the body's `error` field,
    /// or `None` when the body could not be decoded.
    #[must_use]
    pub fn status(status: u16, server_message: Option<String>) -> Self {
        Self {
            kind: LoadErrorKind::Status,
            status: Some(status),
            message: server_message.unwrap_or_else(|| UNPARSEABLE_ERROR_BODY.to_owned()),
        }
    }

    #[must_use]
    pub fn decode(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: LoadErrorKind::Decode,
            status: Some(status),
            message: message.into(),
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, self.status) {
            (LoadErrorKind::Status, Some(status)) => {
                write!(f, "backend returned {status}: {}", self.message)
            }
            (LoadErrorKind::Decode, _) => write!(f, "malformed trace: {}", self.message),
            _ => write!(f, "backend unreachable: {}", self.message),
        }
    }
}

impl std::error::Error for LoadError {}

/// Result of applying a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The trace was installed.
    Loaded,
    /// The error was recorded.
    Failed,
    /// A newer request was issued; the response was dropped.
    Stale,
}

/// Step lookup failure: the index does not address a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepLookupError {
    /// No trace is loaded.
    NoTrace,
    /// The index is outside the loaded trace.
    OutOfRange { index: usize, len: usize },
}

impl fmt::Display for StepLookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoTrace => write!(f, "no trace loaded"),
            Self::OutOfRange { index, len } => {
                write!(f, "step {} of {len} could not be loaded", index + 1)
            }
        }
    }
}

impl std::error::Error for StepLookupError {}

/// Owner of the loaded trace.
#[derive(Debug, Default)]
pub struct TraceStore {
    trace: Option<Arc<TraceDocument>>,
    loading: bool,
    error: Option<LoadError>,
    issued: u64,
}

impl TraceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new load: clear trace and error, raise `loading`, and return
    /// the id the response must be delivered with.
    pub fn begin_load(&mut self) -> RequestId {
        self.issued += 1;
        self.trace = None;
        self.error = None;
        self.loading = true;
        let id = RequestId(self.issued);
        tracing::debug!(request = %id, "trace load started");
        id
    }

    /// Apply the response for `id`.
    pub fn finish_load(
        &mut self,
        id: RequestId,
        response: Result<TraceDocument, LoadError>,
    ) -> LoadOutcome {
        if id.0 != self.issued {
            tracing::debug!(request = %id, latest = self.issued, "dropping stale trace response");
            return LoadOutcome::Stale;
        }
        self.loading = false;
        match response {
            Ok(doc) => {
                tracing::info!(request = %id, steps = doc.len(), "trace loaded");
                self.trace = Some(Arc::new(doc));
                self.error = None;
                LoadOutcome::Loaded
            }
            Err(err) => {
                tracing::warn!(request = %id, error = %err, "trace load failed");
                self.trace = None;
                self.error = Some(err);
                LoadOutcome::Failed
            }
        }
    }

    /// Install a document directly, bypassing the request cycle.
    pub fn replace(&mut self, doc: TraceDocument) {
        self.issued += 1;
        self.loading = false;
        self.error = None;
        self.trace = Some(Arc::new(doc));
    }

    #[must_use]
    pub fn trace(&self) -> Option<&Arc<TraceDocument>> {
        self.trace.as_ref()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub fn error(&self) -> Option<&LoadError> {
        self.error.as_ref()
    }

    /// Number of steps (0 when nothing is loaded).
    #[must_use]
    pub fn len(&self) -> usize {
        self.trace.as_ref().map_or(0, |t| t.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a step.
    pub fn step(&self, index: usize) -> Result<&Step, StepLookupError> {
        let trace = self.trace.as_ref().ok_or(StepLookupError::NoTrace)?;
        trace.step(index).ok_or(StepLookupError::OutOfRange {
            index,
            len: trace.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::Step;
    use serde_json::json;

    fn doc(n: usize) -> TraceDocument {
        TraceDocument::from_steps((0..n).map(|_| Step::new("X", json!({}))).collect())
    }

    #[test]
    fn begin_load_clears_previous_state() {
        let mut store = TraceStore::new();
        let id = store.begin_load();
        assert_eq!(store.finish_load(id, Ok(doc(3))), LoadOutcome::Loaded);
        assert_eq!(store.len(), 3);

        store.begin_load();
        assert!(store.is_loading());
        assert!(store.trace().is_none());
        assert!(store.error().is_none());
    }

    #[test]
    fn stale_response_never_overwrites_newer_request() {
        let mut store = TraceStore::new();
        let first = store.begin_load();
        let second = store.begin_load();
        assert!(second > first);

        assert_eq!(store.finish_load(second, Ok(doc(2))), LoadOutcome::Loaded);
        assert_eq!(store.finish_load(first, Ok(doc(9))), LoadOutcome::Stale);
        assert_eq!(store.len(), 2);
        assert!(!store.is_loading());
    }

    #[test]
    fn stale_response_does_not_end_newer_load() {
        let mut store = TraceStore::new();
        let first = store.begin_load();
        let _second = store.begin_load();
        assert_eq!(
            store.finish_load(first, Err(LoadError::transport("refused"))),
            LoadOutcome::Stale
        );
        assert!(store.is_loading());
        assert!(store.error().is_none());
    }

    #[test]
    fn failure_records_error_and_stops_loading() {
        let mut store = TraceStore::new();
        let id = store.begin_load();
        let err = LoadError::status(400, Some("intervals required".into()));
        assert_eq!(store.finish_load(id, Err(err.clone())), LoadOutcome::Failed);
        assert_eq!(store.error(), Some(&err));
        assert!(!store.is_loading());
        assert_eq!(
            err.to_string(),
            "backend returned 400: intervals required"
        );
    }

    #[test]
    fn unparseable_error_body_uses_fallback_message() {
        let err = LoadError::status(502, None);
        assert_eq!(err.message, UNPARSEABLE_ERROR_BODY);
        assert_eq!(err.status, Some(502));
    }

    #[test]
    fn step_lookup_distinguishes_missing_trace_and_range() {
        let mut store = TraceStore::new();
        assert_eq!(store.step(0), Err(StepLookupError::NoTrace));
        store.replace(doc(2));
        assert!(store.step(1).is_ok());
        assert_eq!(
            store.step(5),
            Err(StepLookupError::OutOfRange { index: 5, len: 2 })
        );
    }

    #[test]
    fn replace_supersedes_in_flight_request() {
        let mut store = TraceStore::new();
        let id = store.begin_load();
        store.replace(doc(4));
        assert_eq!(store.finish_load(id, Ok(doc(1))), LoadOutcome::Stale);
        assert_eq!(store.len(), 4);
    }
}
