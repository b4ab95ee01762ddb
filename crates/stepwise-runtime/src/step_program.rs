#![forbid(unsafe_code)]

//! Host-driven program runner.
//!
//! [`StepProgram`] drives a [`Model`] through init / event / update / view
//! cycles. The host owns the event loop:
//!
//! 1. Push events via [`StepProgram::push_event`].
//! 2. Call [`StepProgram::step`] to process queued events, collect finished
//!    background tasks, and render if anything changed.
//! 3. Read the rendered frame via [`StepProgram::take_frame`].
//!
//! Background tasks run on their own threads; their messages are delivered
//! on the step that follows completion, so `update` always runs on the host
//! thread.
//!
//! # Example
//!
//! ```ignore
//! use stepwise_runtime::step_program::StepProgram;
//! use stepwise_core::event::Event;
//!
//! let mut prog = StepProgram::new(MyModel::default(), 80, 24);
//! prog.init();
//!
//! prog.push_event(Event::Tick);
//! let result = prog.step();
//! if result.rendered {
//!     let frame = prog.take_frame();
//! }
//! ```

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use stepwise_core::event::Event;

use crate::frame::Frame;
use crate::listener::KeyListeners;
use crate::program::{Cmd, Model, TaskSpec};

/// Result of a single [`StepProgram::step`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepResult {
    /// Whether the program is still running (false after `Cmd::Quit`).
    pub running: bool,
    /// Whether a frame was rendered during this step.
    pub rendered: bool,
    /// Number of host events processed during this step.
    pub events_processed: u32,
    /// Number of task results delivered during this step.
    pub tasks_completed: u32,
    /// Whether a key listener suppressed the default action of any key.
    pub prevented_default: bool,
    /// Current frame index (monotonically increasing).
    pub frame_idx: u64,
}

/// Host-driven program runner with threaded background tasks.
///
/// # Lifecycle
///
/// 1. [`StepProgram::new`]: create with model and initial size.
/// 2. [`StepProgram::init`]: call once to initialize the model and render the first frame.
/// 3. [`StepProgram::step`]: call repeatedly from the host loop.
pub struct StepProgram<M: Model> {
    model: M,
    keys: KeyListeners<M::Message>,
    events: VecDeque<Event>,
    task_tx: Sender<M::Message>,
    task_rx: Receiver<M::Message>,
    in_flight: usize,
    running: bool,
    initialized: bool,
    dirty: bool,
    frame_idx: u64,
    width: u16,
    height: u16,
    frame: Option<Frame>,
    logs: Vec<String>,
}

impl<M: Model> StepProgram<M> {
    /// Create a new step program with the given model and initial size.
    #[must_use]
    pub fn new(model: M, width: u16, height: u16) -> Self {
        let (task_tx, task_rx) = mpsc::channel();
        Self {
            model,
            keys: KeyListeners::new(),
            events: VecDeque::new(),
            task_tx,
            task_rx,
            in_flight: 0,
            running: true,
            initialized: false,
            dirty: true,
            frame_idx: 0,
            width,
            height,
            frame: None,
            logs: Vec::new(),
        }
    }

    /// Initialize the model and render the first frame.
    ///
    /// Must be called exactly once before [`step`](Self::step).
    pub fn init(&mut self) {
        assert!(!self.initialized, "StepProgram::init() called twice");
        self.initialized = true;
        let cmd = self.model.init();
        self.model.listen(&self.keys);
        self.execute_cmd(cmd);
        if self.running {
            self.render_frame();
        }
    }

    /// Process queued events and finished tasks, then render if dirty.
    pub fn step(&mut self) -> StepResult {
        assert!(self.initialized, "StepProgram::step() called before init()");

        let mut result = StepResult {
            running: self.running,
            rendered: false,
            events_processed: 0,
            tasks_completed: 0,
            prevented_default: false,
            frame_idx: self.frame_idx,
        };
        if !self.running {
            return result;
        }

        // 1. Host events.
        while let Some(event) = self.events.pop_front() {
            result.events_processed += 1;
            result.prevented_default |= self.handle_event(event);
            if !self.running {
                break;
            }
        }

        // 2. Task results.
        while self.running {
            match self.task_rx.try_recv() {
                Ok(msg) => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    result.tasks_completed += 1;
                    self.dispatch(msg);
                }
                Err(_) => break,
            }
        }

        // 3. Render if dirty.
        if self.running && self.dirty {
            self.render_frame();
            result.rendered = true;
        }

        result.running = self.running;
        result.frame_idx = self.frame_idx;
        result
    }

    /// Block until a background task finishes or `timeout` elapses.
    ///
    /// The finished task's message is dispatched immediately. Returns `false`
    /// on timeout or when no task is in flight.
    pub fn wait_for_task(&mut self, timeout: Duration) -> bool {
        if self.in_flight == 0 {
            return false;
        }
        match self.task_rx.recv_timeout(timeout) {
            Ok(msg) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                self.dispatch(msg);
                true
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Queue a host event for the next [`step`](Self::step).
    pub fn push_event(&mut self, event: Event) {
        self.events.push_back(event);
    }

    /// Queue a resize; applied on the next step.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.push_event(Event::Resize { width, height });
    }

    /// Take the most recently rendered frame.
    pub fn take_frame(&mut self) -> Option<Frame> {
        self.frame.take()
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    /// Take log lines emitted via `Cmd::Log`.
    pub fn take_logs(&mut self) -> Vec<String> {
        std::mem::take(&mut self.logs)
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Number of background tasks that have not reported back.
    pub fn tasks_in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn frame_idx(&self) -> u64 {
        self.frame_idx
    }

    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    // --- Private helpers ---

    /// Returns whether a key listener prevented the default action.
    fn handle_event(&mut self, event: Event) -> bool {
        if let Event::Resize { width, height } = &event {
            self.width = *width;
            self.height = *height;
        }
        let mut prevented = false;
        if let Event::Key(key) = &event {
            let emitted = self.keys.emit(key);
            prevented = emitted.default_prevented;
            for msg in emitted.messages {
                self.dispatch(msg);
                if !self.running {
                    return prevented;
                }
            }
        }
        self.dispatch(M::Message::from(event));
        prevented
    }

    fn dispatch(&mut self, msg: M::Message) {
        if !self.running {
            return;
        }
        let cmd = self.model.update(msg);
        self.model.listen(&self.keys);
        self.dirty = true;
        self.execute_cmd(cmd);
    }

    fn render_frame(&mut self) {
        let mut frame = Frame::new(self.width, self.height);
        self.model.view(&mut frame);
        self.frame = Some(frame);
        self.dirty = false;
        self.frame_idx += 1;
    }

    fn spawn_task(&mut self, spec: TaskSpec, f: Box<dyn FnOnce() -> M::Message + Send>) {
        let tx = self.task_tx.clone();
        let mut builder = thread::Builder::new();
        if let Some(name) = &spec.name {
            builder = builder.name(name.clone());
        }
        tracing::debug!(task = ?spec.name, "spawning task");
        match builder.spawn(move || {
            // The receiver only disappears when the program is dropped.
            let _ = tx.send(f());
        }) {
            Ok(_) => self.in_flight += 1,
            Err(err) => {
                tracing::error!(task = ?spec.name, error = %err, "failed to spawn task thread");
            }
        }
    }

    fn execute_cmd(&mut self, cmd: Cmd<M::Message>) {
        match cmd {
            Cmd::None => {}
            Cmd::Quit => {
                self.running = false;
            }
            Cmd::Msg(m) => self.dispatch(m),
            Cmd::Batch(cmds) => {
                for c in cmds {
                    self.execute_cmd(c);
                    if !self.running {
                        break;
                    }
                }
            }
            Cmd::Log(text) => {
                tracing::info!(target: "stepwise::app", "{text}");
                self.logs.push(text);
            }
            Cmd::Task(spec, f) => self.spawn_task(spec, f),
        }
    }
}
