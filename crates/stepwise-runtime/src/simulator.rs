#![forbid(unsafe_code)]

//! Deterministic program simulator for testing.
//!
//! `ProgramSimulator` runs a [`Model`] without a terminal or threads, enabling
//! deterministic frame assertions, event injection, and control over when
//! background tasks complete.
//!
//! # Example
//!
//! ```ignore
//! use stepwise_runtime::simulator::ProgramSimulator;
//!
//! let mut sim = ProgramSimulator::new(Counter { value: 0 });
//! sim.init();
//! sim.send(Msg::Increment);
//! assert_eq!(sim.model().value, 1);
//!
//! let frame = sim.capture_frame(80, 24);
//! assert!(frame.contains("Count: 1"));
//! ```
//!
//! By default tasks run inline as soon as they are issued. With
//! [`defer_tasks`](ProgramSimulator::defer_tasks) they queue up instead and
//! tests resolve them one by one with [`run_task`](ProgramSimulator::run_task),
//! in any order. This is how out-of-order responses are reproduced.

use stepwise_core::event::Event;

use crate::frame::Frame;
use crate::listener::KeyListeners;
use crate::program::{Cmd, Model, TaskSpec};

/// Record of a command that was executed during simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CmdRecord {
    None,
    Quit,
    /// Message sent to model (not stored, just noted).
    Msg,
    Batch(usize),
    Log(String),
    /// Background task executed, or queued when deferring.
    Task(Option<String>),
}

type Job<Msg> = (TaskSpec, Box<dyn FnOnce() -> Msg + Send>);

/// Deterministic simulator for [`Model`] testing.
pub struct ProgramSimulator<M: Model> {
    model: M,
    keys: KeyListeners<M::Message>,
    frames: Vec<Frame>,
    command_log: Vec<CmdRecord>,
    running: bool,
    logs: Vec<String>,
    defer_tasks: bool,
    pending: Vec<Job<M::Message>>,
    default_prevented: bool,
}

impl<M: Model> ProgramSimulator<M> {
    /// Create a new simulator with the given model.
    ///
    /// The model is not initialized until [`init`](Self::init) is called.
    pub fn new(model: M) -> Self {
        Self {
            model,
            keys: KeyListeners::new(),
            frames: Vec::new(),
            command_log: Vec::new(),
            running: true,
            logs: Vec::new(),
            defer_tasks: false,
            pending: Vec::new(),
            default_prevented: false,
        }
    }

    /// Queue tasks instead of running them inline.
    #[must_use]
    pub fn defer_tasks(mut self) -> Self {
        self.defer_tasks = true;
        self
    }

    /// Call `Model::init()`, attach listeners, and execute the startup commands.
    pub fn init(&mut self) {
        let cmd = self.model.init();
        self.model.listen(&self.keys);
        self.execute_cmd(cmd);
    }

    /// Inject host events.
    ///
    /// Key events are offered to the attached key listeners first; any
    /// messages they produce are dispatched in order. Every event is then
    /// converted via `From<Event>` and dispatched through `Model::update()`.
    pub fn inject_events(&mut self, events: &[Event]) {
        for event in events {
            if !self.running {
                break;
            }
            self.default_prevented = false;
            if let Event::Key(key) = event {
                let emitted = self.keys.emit(key);
                self.default_prevented = emitted.default_prevented;
                for msg in emitted.messages {
                    self.send(msg);
                }
            }
            self.send(M::Message::from(event.clone()));
        }
    }

    /// Inject a single host event.
    pub fn inject_event(&mut self, event: Event) {
        self.inject_events(&[event]);
    }

    /// Send a specific message to the model.
    pub fn send(&mut self, msg: M::Message) {
        if !self.running {
            return;
        }
        let cmd = self.model.update(msg);
        self.model.listen(&self.keys);
        self.execute_cmd(cmd);
    }

    /// Render the current state into a fresh frame and keep it.
    pub fn capture_frame(&mut self, width: u16, height: u16) -> &Frame {
        let mut frame = Frame::new(width, height);
        self.model.view(&mut frame);
        self.frames.push(frame);
        &self.frames[self.frames.len() - 1]
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    /// Returns `false` after a `Cmd::Quit` has been executed.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether a listener suppressed the default action of the last key.
    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// The registry listeners are attached to.
    pub fn key_listeners(&self) -> &KeyListeners<M::Message> {
        &self.keys
    }

    /// Log messages emitted via `Cmd::Log`.
    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    pub fn command_log(&self) -> &[CmdRecord] {
        &self.command_log
    }

    /// Names of queued tasks, in issue order.
    pub fn pending_tasks(&self) -> Vec<Option<&str>> {
        self.pending
            .iter()
            .map(|(spec, _)| spec.name.as_deref())
            .collect()
    }

    /// Run the queued task at `index` and dispatch its message.
    ///
    /// Returns `false` if there is no such task.
    pub fn run_task(&mut self, index: usize) -> bool {
        if index >= self.pending.len() {
            return false;
        }
        let (_, f) = self.pending.remove(index);
        self.send(f());
        true
    }

    /// Run queued tasks in issue order until none are left.
    pub fn run_all_tasks(&mut self) {
        while self.run_task(0) {}
    }

    /// Execute a command without IO.
    fn execute_cmd(&mut self, cmd: Cmd<M::Message>) {
        match cmd {
            Cmd::None => {
                self.command_log.push(CmdRecord::None);
            }
            Cmd::Quit => {
                self.running = false;
                self.command_log.push(CmdRecord::Quit);
            }
            Cmd::Msg(m) => {
                self.command_log.push(CmdRecord::Msg);
                self.send(m);
            }
            Cmd::Batch(cmds) => {
                self.command_log.push(CmdRecord::Batch(cmds.len()));
                for c in cmds {
                    self.execute_cmd(c);
                    if !self.running {
                        break;
                    }
                }
            }
            Cmd::Log(text) => {
                self.command_log.push(CmdRecord::Log(text.clone()));
                self.logs.push(text);
            }
            Cmd::Task(spec, f) => {
                self.command_log.push(CmdRecord::Task(spec.name.clone()));
                if self.defer_tasks {
                    self.pending.push((spec, f));
                } else {
                    self.send(f());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::{Reaction, ScopedListener};
    use pretty_assertions::assert_eq;
    use stepwise_core::event::{KeyCode, KeyEvent};

    // ---------- Test model ----------

    #[derive(Default)]
    struct Counter {
        value: i32,
        armed: bool,
        scope: ScopedListener<bool, CounterMsg>,
    }

    #[derive(Debug, PartialEq)]
    enum CounterMsg {
        Increment,
        Arm,
        Set(i32),
        Load(i32),
        Quit,
        Noop,
    }

    impl From<Event> for CounterMsg {
        fn from(event: Event) -> Self {
            match event {
                Event::Key(k) if k.is_char('q') => Self::Quit,
                Event::Key(k) if k.is_char('a') => Self::Arm,
                _ => Self::Noop,
            }
        }
    }

    impl Model for Counter {
        type Message = CounterMsg;

        fn update(&mut self, msg: CounterMsg) -> Cmd<CounterMsg> {
            match msg {
                CounterMsg::Increment => {
                    self.value += 1;
                    Cmd::log(format!("value={}", self.value))
                }
                CounterMsg::Arm => {
                    self.armed = true;
                    Cmd::none()
                }
                CounterMsg::Set(v) => {
                    self.value = v;
                    Cmd::none()
                }
                CounterMsg::Load(v) => Cmd::task_named(format!("load-{v}"), move || {
                    CounterMsg::Set(v)
                }),
                CounterMsg::Quit => Cmd::quit(),
                CounterMsg::Noop => Cmd::none(),
            }
        }

        fn view(&self, frame: &mut Frame) {
            frame.line(format!("Count: {}", self.value));
        }

        fn listen(&mut self, keys: &KeyListeners<CounterMsg>) {
            self.scope.sync(keys, self.armed, |armed| {
                move |key: &KeyEvent| {
                    if armed && key.code == KeyCode::Right {
                        Reaction {
                            message: Some(CounterMsg::Increment),
                            prevent_default: true,
                        }
                    } else {
                        Reaction::ignored()
                    }
                }
            });
        }
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code))
    }

    #[test]
    fn listener_follows_dependency_changes() {
        let mut sim = ProgramSimulator::new(Counter::default());
        sim.init();
        assert_eq!(sim.key_listeners().len(), 1);

        sim.inject_event(key(KeyCode::Right));
        assert_eq!(sim.model().value, 0);
        assert!(!sim.default_prevented());

        sim.inject_event(key(KeyCode::Char('a')));
        sim.inject_event(key(KeyCode::Right));
        assert_eq!(sim.model().value, 1);
        assert!(sim.default_prevented());
        assert_eq!(sim.key_listeners().len(), 1);
        assert_eq!(sim.logs(), ["value=1"]);
    }

    #[test]
    fn quit_stops_processing() {
        let mut sim = ProgramSimulator::new(Counter::default());
        sim.init();
        sim.inject_events(&[key(KeyCode::Char('q')), key(KeyCode::Char('a'))]);
        assert!(!sim.is_running());
        assert!(!sim.model().armed);
    }

    #[test]
    fn deferred_tasks_resolve_in_any_order() {
        let mut sim = ProgramSimulator::new(Counter::default()).defer_tasks();
        sim.init();
        sim.send(CounterMsg::Load(1));
        sim.send(CounterMsg::Load(2));
        assert_eq!(sim.pending_tasks(), vec![Some("load-1"), Some("load-2")]);

        assert!(sim.run_task(1));
        assert_eq!(sim.model().value, 2);
        assert!(sim.run_task(0));
        assert_eq!(sim.model().value, 1);
        assert!(!sim.run_task(0));
    }

    #[test]
    fn inline_tasks_run_immediately() {
        let mut sim = ProgramSimulator::new(Counter::default());
        sim.init();
        sim.send(CounterMsg::Load(7));
        assert_eq!(sim.model().value, 7);
        assert!(sim.pending_tasks().is_empty());
        assert!(sim.capture_frame(20, 2).contains("Count: 7"));
        assert_eq!(sim.frames().len(), 1);
    }

    #[test]
    fn dropping_simulator_detaches_listeners() {
        let mut sim = ProgramSimulator::new(Counter::default());
        sim.init();
        let keys = sim.key_listeners().clone();
        assert_eq!(keys.len(), 1);
        drop(sim);
        assert!(keys.is_empty());
    }
}
