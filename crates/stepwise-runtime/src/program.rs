#![forbid(unsafe_code)]

//! Elm-style model and commands.
//!
//! A [`Model`] owns application state. Hosts convert input into messages,
//! call [`Model::update`], execute the returned [`Cmd`], and render with
//! [`Model::view`]. Side effects never happen inside `update`; they are
//! described as commands and performed by the host.

use std::fmt;

use stepwise_core::event::Event;

use crate::frame::Frame;
use crate::listener::KeyListeners;

/// Application state and behavior.
pub trait Model: Sized {
    /// The message type for this model.
    ///
    /// Must be convertible from host events.
    type Message: From<Event> + Send + 'static;

    /// Initialize the model with startup commands.
    ///
    /// Called once when the program starts. Return commands to execute
    /// initial side effects like loading data.
    fn init(&mut self) -> Cmd<Self::Message> {
        Cmd::none()
    }

    /// Update the model in response to a message.
    fn update(&mut self, msg: Self::Message) -> Cmd<Self::Message>;

    /// Render the current state to a frame.
    fn view(&self, frame: &mut Frame);

    /// Attach or refresh key listeners.
    ///
    /// Called after `init()` and after every `update()`. Implementations hold
    /// their listeners in scoped guards, so re-attaching is cheap and
    /// dropping the model detaches everything.
    fn listen(&mut self, keys: &KeyListeners<Self::Message>) {
        let _ = keys;
    }
}

/// Metadata for background tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskSpec {
    /// Optional task name for logging.
    pub name: Option<String>,
}

impl TaskSpec {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

/// Side effect requested by `update`.
pub enum Cmd<M> {
    /// No operation.
    None,
    /// Quit the application.
    Quit,
    /// Execute commands in order, stopping after `Quit`.
    Batch(Vec<Cmd<M>>),
    /// Send a message to the model.
    Msg(M),
    /// Write a log line through the host.
    Log(String),
    /// Run a blocking operation off the event loop; its return value comes
    /// back as a message.
    Task(TaskSpec, Box<dyn FnOnce() -> M + Send>),
}

impl<M> Default for Cmd<M> {
    fn default() -> Self {
        Self::None
    }
}

impl<M: fmt::Debug> fmt::Debug for Cmd<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Quit => write!(f, "Quit"),
            Self::Batch(cmds) => f.debug_tuple("Batch").field(cmds).finish(),
            Self::Msg(m) => f.debug_tuple("Msg").field(m).finish(),
            Self::Log(s) => f.debug_tuple("Log").field(s).finish(),
            Self::Task(spec, _) => f.debug_struct("Task").field("spec", spec).finish(),
        }
    }
}

impl<M> Cmd<M> {
    /// Create a no-op command.
    #[inline]
    pub fn none() -> Self {
        Self::None
    }

    /// Create a quit command.
    #[inline]
    pub fn quit() -> Self {
        Self::Quit
    }

    /// Create a message command.
    #[inline]
    pub fn msg(m: M) -> Self {
        Self::Msg(m)
    }

    /// Create a log command.
    #[inline]
    pub fn log(msg: impl Into<String>) -> Self {
        Self::Log(msg.into())
    }

    /// Create a batch of commands, collapsing trivial batches.
    pub fn batch(cmds: Vec<Self>) -> Self {
        let mut cmds: Vec<Self> = cmds.into_iter().filter(|c| !c.is_none()).collect();
        match cmds.len() {
            0 => Self::None,
            1 => cmds.pop().unwrap_or(Self::None),
            _ => Self::Batch(cmds),
        }
    }

    /// Create a background task command.
    pub fn task<F>(f: F) -> Self
    where
        F: FnOnce() -> M + Send + 'static,
    {
        Self::Task(TaskSpec::default(), Box::new(f))
    }

    /// Create a named background task command.
    pub fn task_named<F>(name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce() -> M + Send + 'static,
    {
        Self::Task(TaskSpec::named(name), Box::new(f))
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Return a stable name for tracing.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Quit => "Quit",
            Self::Batch(_) => "Batch",
            Self::Msg(_) => "Msg",
            Self::Log(_) => "Log",
            Self::Task(..) => "Task",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_collapses_empty_and_single() {
        let empty: Cmd<()> = Cmd::batch(vec![]);
        assert!(empty.is_none());

        let single: Cmd<()> = Cmd::batch(vec![Cmd::None, Cmd::quit()]);
        assert_eq!(single.type_name(), "Quit");

        let many: Cmd<()> = Cmd::batch(vec![Cmd::log("a"), Cmd::quit()]);
        assert_eq!(many.type_name(), "Batch");
    }

    #[test]
    fn task_debug_hides_closure() {
        let cmd: Cmd<u8> = Cmd::task_named("load", || 1);
        assert_eq!(
            format!("{cmd:?}"),
            "Task { spec: TaskSpec { name: Some(\"load\") } }"
        );
    }
}
