#![forbid(unsafe_code)]

//! Core: trace model, step navigation, highlighting, prediction quiz and
//! keyboard shortcuts.
//!
//! Everything in this crate is synchronous, deterministic and free of I/O.
//! Hosts feed it decoded [`trace::TraceDocument`]s and [`event::Event`]s.

pub mod badge;
pub mod event;
pub mod highlight;
pub mod keyboard;
pub mod navigation;
pub mod prediction;
pub mod store;
pub mod trace;

pub use event::{Event, FocusTarget, KeyCode, KeyEvent, KeyEventKind, Modifiers};
pub use highlight::Highlight;
pub use keyboard::{Dispatch, KeyboardDispatcher, NavAction};
pub use navigation::Navigation;
pub use prediction::{PredictionEngine, PredictionStats, Prompt};
pub use store::{LoadError, LoadOutcome, RequestId, StepLookupError, TraceStore};
pub use trace::{EntityId, Step, StepKind, TraceDocument};
