#![forbid(unsafe_code)]

//! Stepwise Runtime
//!
//! The runtime ties `stepwise-core` state to a host. It owns the message
//! loop; applications only describe state transitions and side effects.
//!
//! # Key Components
//!
//! - [`Model`] - Trait for application state and behavior
//! - [`Cmd`] - Commands for side effects
//! - [`KeyListeners`] / [`ScopedListener`] - Key listeners tied to an owner's lifetime
//! - [`ProgramSimulator`] - Deterministic driver for tests
//! - [`StepProgram`] - Host-driven runner with threaded tasks
//! - [`Frame`] - Line-oriented render target

pub mod frame;
pub mod listener;
pub mod program;
pub mod simulator;
pub mod step_program;

pub use frame::Frame;
pub use listener::{Emitted, KeyListeners, ListenerGuard, Reaction, ScopedListener};
pub use program::{Cmd, Model, TaskSpec};
pub use simulator::{CmdRecord, ProgramSimulator};
pub use step_program::{StepProgram, StepResult};
