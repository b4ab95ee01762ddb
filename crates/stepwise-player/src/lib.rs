#![forbid(unsafe_code)]

//! Stepwise terminal player.
//!
//! Plays algorithm traces served by the Stepwise backend one step at a time,
//! with an optional prediction quiz before each decision step.

pub mod app;
pub mod cli;
pub mod logging;
pub mod terminal;
pub mod view;

pub use app::{PlayerConfig, TracePlayer};
