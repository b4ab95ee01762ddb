#![forbid(unsafe_code)]

//! The trace player model.
//!
//! [`TracePlayer`] owns every piece of playback state and wires the core
//! components together: the store feeds navigation, navigation feeds the
//! highlight and the prediction engine, and the keyboard dispatcher is kept
//! attached to the host's key-listener registry through a scoped listener
//! whose dependencies are `(is_complete, modal_open, text focus)`.
//!
//! All backend calls run as background tasks; their results come back as
//! messages tagged with the request they answer.

use std::sync::Arc;

use serde_json::{Value, json};
use stepwise_client::{AlgorithmInfo, AlgorithmSummary, ClientError, TraceRequest, TraceSource};
use stepwise_core::event::{Event, FocusTarget, KeyCode, KeyEvent, Modifiers};
use stepwise_core::highlight::Highlight;
use stepwise_core::keyboard::{KeyboardDispatcher, NavAction};
use stepwise_core::navigation::Navigation;
use stepwise_core::prediction::{AnswerOutcome, PredictionEngine, Prompt};
use stepwise_core::store::{LoadError, LoadOutcome, RequestId, TraceStore};
use stepwise_core::trace::{EntityId, Step, TraceDocument};
use stepwise_runtime::frame::Frame;
use stepwise_runtime::listener::{KeyListeners, Reaction, ScopedListener};
use stepwise_runtime::program::{Cmd, Model};

use crate::view;

/// Registry name of the algorithm served by the legacy endpoint.
pub const INTERVAL_COVERAGE: &str = "interval-coverage";

/// The built-in example: four intervals, one of them covered.
#[must_use]
pub fn default_intervals() -> Vec<Value> {
    vec![
        json!({"id": 1, "start": 540, "end": 660, "color": "blue"}),
        json!({"id": 2, "start": 600, "end": 720, "color": "green"}),
        json!({"id": 3, "start": 540, "end": 720, "color": "amber"}),
        json!({"id": 4, "start": 900, "end": 960, "color": "purple"}),
    ]
}

/// Request for the built-in example.
#[must_use]
pub fn default_request() -> TraceRequest {
    TraceRequest::Intervals {
        intervals: default_intervals(),
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Player messages.
#[derive(Debug)]
pub enum Msg {
    /// Raw key press, for keys outside the navigation table.
    Key(KeyEvent),
    /// Navigation requested by the keyboard dispatcher.
    Nav(NavAction),
    /// Pointer over an entity (`Some`) or off all entities (`None`).
    Hover(Option<EntityId>),
    /// Host text input gained or lost focus.
    InputFocus(bool),
    AlgorithmsLoaded(Result<Vec<AlgorithmSummary>, ClientError>),
    TraceLoaded(RequestId, Result<TraceDocument, LoadError>),
    InfoLoaded(String, Result<AlgorithmInfo, ClientError>),
    TogglePrediction,
    /// Answer the pending prompt with a choice id and advance.
    Answer(String),
    /// Dismiss the pending prompt without scoring and advance.
    SkipPrediction,
    /// Load the first example of a registered algorithm.
    SelectAlgorithm(String),
    /// Issue an arbitrary trace request.
    Load(TraceRequest),
    /// Re-issue the last request.
    Reload,
    OpenInfo,
    CloseInfo,
    Quit,
    Noop,
}

impl From<Event> for Msg {
    fn from(event: Event) -> Self {
        match event {
            Event::Key(key) => Self::Key(key),
            Event::Hover(target) => Self::Hover(target),
            Event::InputFocus(focused) => Self::InputFocus(focused),
            Event::Resize { .. } | Event::Tick => Self::Noop,
        }
    }
}

// ---------------------------------------------------------------------------
// Sub-state
// ---------------------------------------------------------------------------

/// Startup and per-session options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerConfig {
    /// Algorithm to load after the registry arrives; `None` plays the
    /// built-in example.
    pub algorithm: Option<String>,
    /// Initial prediction mode.
    pub predict: bool,
    /// Backend location, shown in the error view.
    pub api_url: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            algorithm: None,
            predict: true,
            api_url: stepwise_client::config::DEFAULT_API_URL.to_owned(),
        }
    }
}

/// Algorithm documentation dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum InfoDialog {
    #[default]
    Closed,
    Loading(String),
    Open(AlgorithmInfo),
    Failed { algorithm: String, message: String },
}

impl InfoDialog {
    #[must_use]
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Closed)
    }
}

/// Selection and feedback for the prompt on screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromptUi {
    /// Step the state belongs to; stale state is discarded.
    pub step_index: Option<usize>,
    /// Index into the prompt's choices.
    pub selected: Option<usize>,
    /// Feedback shown; the next submit records the answer.
    pub revealed: bool,
}

/// Dependencies of the navigation key listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NavKeyDeps {
    dispatcher: KeyboardDispatcher,
    text_focus: bool,
}

// ---------------------------------------------------------------------------
// TracePlayer
// ---------------------------------------------------------------------------

/// Top-level application state.
pub struct TracePlayer {
    source: Arc<dyn TraceSource>,
    config: PlayerConfig,
    store: TraceStore,
    nav: Navigation,
    highlight: Highlight,
    prediction: PredictionEngine,
    prompt_ui: PromptUi,
    last_outcome: Option<AnswerOutcome>,
    algorithms: Vec<AlgorithmSummary>,
    registry_pending: bool,
    selected_algorithm: Option<String>,
    last_request: Option<TraceRequest>,
    info: InfoDialog,
    /// Buffer of the "go to step" input while it is open.
    goto_input: Option<String>,
    host_input_focus: bool,
    /// The dispatcher already turned the key in flight into a navigation.
    key_navigated: bool,
    nav_keys: ScopedListener<NavKeyDeps, Msg>,
}

impl TracePlayer {
    #[must_use]
    pub fn new(source: Arc<dyn TraceSource>, config: PlayerConfig) -> Self {
        let prediction = PredictionEngine::new(config.predict);
        Self {
            source,
            config,
            store: TraceStore::new(),
            nav: Navigation::default(),
            highlight: Highlight::new(),
            prediction,
            prompt_ui: PromptUi::default(),
            last_outcome: None,
            algorithms: Vec::new(),
            registry_pending: false,
            selected_algorithm: None,
            last_request: None,
            info: InfoDialog::Closed,
            goto_input: None,
            host_input_focus: false,
            key_navigated: false,
            nav_keys: ScopedListener::new(),
        }
    }

    // --- Read access for the view and tests ---

    #[must_use]
    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &TraceStore {
        &self.store
    }

    #[must_use]
    pub fn trace(&self) -> Option<&TraceDocument> {
        self.store.trace().map(Arc::as_ref)
    }

    #[must_use]
    pub fn navigation(&self) -> &Navigation {
        &self.nav
    }

    #[must_use]
    pub fn current_step(&self) -> Option<&Step> {
        self.store.step(self.nav.current()).ok()
    }

    /// Entity to emphasize: hover first, then the active call frame.
    #[must_use]
    pub fn highlighted(&self) -> Option<EntityId> {
        self.highlight.effective(self.current_step())
    }

    #[must_use]
    pub fn hover_target(&self) -> Option<EntityId> {
        self.highlight.hover_target()
    }

    #[must_use]
    pub fn prediction(&self) -> &PredictionEngine {
        &self.prediction
    }

    #[must_use]
    pub fn prompt(&self) -> Option<&Prompt> {
        self.prediction.prompt()
    }

    #[must_use]
    pub fn prompt_ui(&self) -> PromptUi {
        self.prompt_ui
    }

    /// Result of the most recent answer.
    #[must_use]
    pub fn last_outcome(&self) -> Option<&AnswerOutcome> {
        self.last_outcome.as_ref()
    }

    #[must_use]
    pub fn algorithms(&self) -> &[AlgorithmSummary] {
        &self.algorithms
    }

    #[must_use]
    pub fn selected_algorithm(&self) -> Option<&str> {
        self.selected_algorithm.as_deref()
    }

    #[must_use]
    pub fn info(&self) -> &InfoDialog {
        &self.info
    }

    #[must_use]
    pub fn goto_input(&self) -> Option<&str> {
        self.goto_input.as_deref()
    }

    /// Still waiting for the registry or a trace.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.store.is_loading() || self.registry_pending
    }

    /// The trace is finished (or there is nothing to play).
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.nav.is_complete(self.trace())
    }

    /// A blocking dialog is up.
    #[must_use]
    pub fn modal_open(&self) -> bool {
        self.prediction.is_pending() || self.info.is_open()
    }

    fn text_focus(&self) -> bool {
        self.goto_input.is_some() || self.host_input_focus
    }

    // --- Loading ---

    fn fetch_algorithms(&mut self) -> Cmd<Msg> {
        self.registry_pending = true;
        let source = Arc::clone(&self.source);
        Cmd::task_named("fetch-algorithms", move || {
            Msg::AlgorithmsLoaded(source.list_algorithms())
        })
    }

    fn load(&mut self, request: TraceRequest) -> Cmd<Msg> {
        let id = self.store.begin_load();
        tracing::info!(request = %id, algorithm = ?request.algorithm(), "loading trace");
        self.nav.load(0);
        self.prediction.skip();
        self.prediction.reset_stats();
        self.last_outcome = None;
        self.last_request = Some(request.clone());

        let source = Arc::clone(&self.source);
        Cmd::task_named("fetch-trace", move || {
            Msg::TraceLoaded(id, source.fetch_trace(&request).map_err(LoadError::from))
        })
    }

    /// Request for a registered algorithm, falling back to the built-in
    /// example when it declares no inputs.
    fn request_for(&self, name: &str) -> Option<TraceRequest> {
        let summary = self.algorithms.iter().find(|a| a.name == name)?;
        Some(summary.example_request().unwrap_or_else(|| {
            tracing::warn!(algorithm = name, "no example input; using the interval example");
            default_request()
        }))
    }

    fn select_algorithm(&mut self, name: String) -> Cmd<Msg> {
        let Some(request) = self.request_for(&name) else {
            tracing::warn!(algorithm = %name, "unknown algorithm");
            return Cmd::none();
        };
        self.info = InfoDialog::Closed;
        self.selected_algorithm = Some(name);
        self.load(request)
    }

    fn cycle_algorithm(&mut self, forward: bool) -> Cmd<Msg> {
        let len = self.algorithms.len();
        if len == 0 {
            return Cmd::none();
        }
        let current = self
            .selected_algorithm
            .as_deref()
            .and_then(|name| self.algorithms.iter().position(|a| a.name == name));
        let next = match (current, forward) {
            (None, _) => 0,
            (Some(i), true) => (i + 1) % len,
            (Some(i), false) => (i + len - 1) % len,
        };
        let name = self.algorithms[next].name.clone();
        self.select_algorithm(name)
    }

    fn on_algorithms_loaded(&mut self, result: Result<Vec<AlgorithmSummary>, ClientError>) -> Cmd<Msg> {
        self.registry_pending = false;
        match result {
            Ok(list) => {
                tracing::info!(count = list.len(), "algorithm registry loaded");
                self.algorithms = list;
            }
            Err(err) => {
                tracing::warn!(error = %err, "algorithm registry unavailable; using defaults");
                self.algorithms.clear();
            }
        }

        if let Some(name) = self.config.algorithm.clone() {
            if let Some(request) = self.request_for(&name) {
                self.selected_algorithm = Some(name);
                return self.load(request);
            }
            tracing::warn!(algorithm = %name, "configured algorithm is not registered");
        }
        self.selected_algorithm = self
            .algorithms
            .iter()
            .any(|a| a.name == INTERVAL_COVERAGE)
            .then(|| INTERVAL_COVERAGE.to_owned());
        self.load(default_request())
    }

    fn on_trace_loaded(&mut self, id: RequestId, result: Result<TraceDocument, LoadError>) {
        match self.store.finish_load(id, result) {
            LoadOutcome::Loaded => {
                self.nav.load(self.store.len());
                self.prediction.reset_stats();
            }
            LoadOutcome::Failed | LoadOutcome::Stale => {}
        }
    }

    // --- Info dialog ---

    fn info_target(&self) -> Option<String> {
        self.selected_algorithm
            .clone()
            .or_else(|| self.trace().and_then(|t| t.metadata.algorithm.clone()))
    }

    fn open_info(&mut self) -> Cmd<Msg> {
        let Some(name) = self.info_target() else {
            tracing::debug!("no algorithm to describe");
            return Cmd::none();
        };
        self.info = InfoDialog::Loading(name.clone());
        let source = Arc::clone(&self.source);
        Cmd::task_named("fetch-info", move || {
            let result = source.algorithm_info(&name);
            Msg::InfoLoaded(name, result)
        })
    }

    fn on_info_loaded(&mut self, name: String, result: Result<AlgorithmInfo, ClientError>) {
        if !matches!(&self.info, InfoDialog::Loading(pending) if *pending == name) {
            tracing::debug!(algorithm = %name, "dropping info for a closed dialog");
            return;
        }
        self.info = match result {
            Ok(info) => InfoDialog::Open(info),
            Err(err) => {
                tracing::warn!(algorithm = %name, error = %err, "algorithm info unavailable");
                InfoDialog::Failed {
                    algorithm: name,
                    message: err.to_string(),
                }
            }
        };
    }

    // --- Navigation and prediction ---

    fn navigate(&mut self, action: NavAction) {
        let moved = match action {
            NavAction::Next => self.nav.next(self.prediction.is_pending()),
            NavAction::Prev => self.nav.prev(),
            NavAction::JumpToEnd => self.nav.jump_to_end(),
            NavAction::Reset => {
                self.prediction.reset_stats();
                self.last_outcome = None;
                self.nav.reset()
            }
        };
        if moved {
            tracing::debug!(?action, step = self.nav.current(), "navigated");
        }
    }

    fn answer(&mut self, choice_id: &str) {
        if let Some(outcome) = self.prediction.answer(choice_id) {
            self.last_outcome = Some(outcome);
            self.nav.next(false);
        }
    }

    fn skip_prediction(&mut self) {
        if self.prediction.skip() {
            self.nav.next(false);
        }
    }

    /// Re-derive the prompt from (trace, step, mode) and drop UI state that
    /// belongs to a different prompt.
    fn refresh_prediction(&mut self) {
        let trace = self.store.trace().cloned();
        self.prediction.evaluate(trace.as_deref(), self.nav.current());
        let step_index = self.prediction.prompt().map(|p| p.step_index);
        if self.prompt_ui.step_index != step_index {
            self.prompt_ui = PromptUi {
                step_index,
                ..PromptUi::default()
            };
        }
    }

    // --- Keys ---

    /// `navigated` is set when the dispatcher already acted on this key. The
    /// dispatcher only acts with no dialog, prompt or input open, so such a
    /// key skips that routing even if its navigation just opened a prompt.
    fn on_key(&mut self, key: KeyEvent, navigated: bool) -> Cmd<Msg> {
        if !key.is_press() {
            return Cmd::none();
        }
        if key.ctrl() && key.is_char('c') {
            return Cmd::quit();
        }
        if navigated {
            return self.on_shortcut_key(key);
        }
        if self.goto_input.is_some() {
            self.on_goto_key(key);
            return Cmd::none();
        }
        if self.prediction.is_pending() {
            self.on_prompt_key(key);
            return Cmd::none();
        }
        if self.info.is_open() {
            if matches!(key.code, KeyCode::Escape | KeyCode::Char('i' | 'q')) {
                self.info = InfoDialog::Closed;
            }
            return Cmd::none();
        }
        if key.target == FocusTarget::TextInput
            || self.host_input_focus
            || key
                .modifiers
                .intersects(Modifiers::CTRL | Modifiers::ALT | Modifiers::SUPER)
        {
            return Cmd::none();
        }
        self.on_shortcut_key(key)
    }

    fn on_shortcut_key(&mut self, key: KeyEvent) -> Cmd<Msg> {
        if self.store.error().is_some() && matches!(key.code, KeyCode::Char('r') | KeyCode::Enter) {
            return self.reload();
        }
        match key.code {
            KeyCode::Char('q') => Cmd::quit(),
            KeyCode::Char('p') => {
                let on = self.prediction.toggle();
                tracing::info!(prediction = on, "prediction mode toggled");
                Cmd::none()
            }
            KeyCode::Char('i') => self.open_info(),
            KeyCode::Char('l') => self.reload(),
            KeyCode::Char('g') if !self.nav.is_empty() => {
                self.goto_input = Some(String::new());
                Cmd::none()
            }
            KeyCode::Tab => self.cycle_algorithm(!key.modifiers.contains(Modifiers::SHIFT)),
            _ => Cmd::none(),
        }
    }

    fn on_goto_key(&mut self, key: KeyEvent) {
        let Some(buffer) = self.goto_input.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Char(c) if c.is_ascii_digit() && buffer.len() < 9 => buffer.push(c),
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Escape => self.goto_input = None,
            KeyCode::Enter => {
                // Steps are shown 1-based.
                if let Ok(n) = buffer.parse::<usize>() {
                    self.nav.go_to(n.saturating_sub(1));
                }
                self.goto_input = None;
            }
            _ => {}
        }
    }

    fn on_prompt_key(&mut self, key: KeyEvent) {
        let Some(prompt) = self.prediction.prompt() else {
            return;
        };

        if self.prompt_ui.revealed {
            if matches!(key.code, KeyCode::Enter | KeyCode::Escape | KeyCode::Char('s' | 'S')) {
                self.commit_selection();
            }
            return;
        }

        match key.code {
            KeyCode::Enter => {
                if self.prompt_ui.selected.is_some() {
                    self.prompt_ui.revealed = true;
                }
            }
            KeyCode::Escape | KeyCode::Char('s' | 'S') => self.skip_prediction(),
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                if index < prompt.choices.len() {
                    self.prompt_ui.selected = Some(index);
                }
            }
            KeyCode::Char(c) => {
                let c = c.to_ascii_lowercase();
                if let Some(index) = prompt.choices.iter().position(|choice| {
                    choice
                        .id
                        .chars()
                        .next()
                        .is_some_and(|first| first.to_ascii_lowercase() == c)
                }) {
                    self.prompt_ui.selected = Some(index);
                }
            }
            _ => {}
        }
    }

    fn commit_selection(&mut self) {
        let choice = self
            .prompt_ui
            .selected
            .and_then(|i| self.prediction.prompt()?.choices.get(i))
            .map(|c| c.id.clone());
        if let Some(choice) = choice {
            self.answer(&choice);
        }
    }

    fn reload(&mut self) -> Cmd<Msg> {
        let request = self.last_request.clone().unwrap_or_else(default_request);
        self.load(request)
    }
}

impl Model for TracePlayer {
    type Message = Msg;

    fn init(&mut self) -> Cmd<Msg> {
        self.fetch_algorithms()
    }

    fn update(&mut self, msg: Msg) -> Cmd<Msg> {
        let navigated = std::mem::take(&mut self.key_navigated);
        let cmd = match msg {
            Msg::Key(key) => self.on_key(key, navigated),
            Msg::Nav(action) => {
                self.key_navigated = true;
                self.navigate(action);
                Cmd::none()
            }
            Msg::Hover(target) => {
                self.highlight.hover(target);
                Cmd::none()
            }
            Msg::InputFocus(focused) => {
                self.host_input_focus = focused;
                Cmd::none()
            }
            Msg::AlgorithmsLoaded(result) => self.on_algorithms_loaded(result),
            Msg::TraceLoaded(id, result) => {
                self.on_trace_loaded(id, result);
                Cmd::none()
            }
            Msg::InfoLoaded(name, result) => {
                self.on_info_loaded(name, result);
                Cmd::none()
            }
            Msg::TogglePrediction => {
                self.prediction.toggle();
                Cmd::none()
            }
            Msg::Answer(choice) => {
                self.answer(&choice);
                Cmd::none()
            }
            Msg::SkipPrediction => {
                self.skip_prediction();
                Cmd::none()
            }
            Msg::SelectAlgorithm(name) => self.select_algorithm(name),
            Msg::Load(request) => self.load(request),
            Msg::Reload => self.reload(),
            Msg::OpenInfo => self.open_info(),
            Msg::CloseInfo => {
                self.info = InfoDialog::Closed;
                Cmd::none()
            }
            Msg::Quit => Cmd::quit(),
            Msg::Noop => Cmd::none(),
        };
        self.refresh_prediction();
        cmd
    }

    fn view(&self, frame: &mut Frame) {
        view::render(self, frame);
    }

    fn listen(&mut self, keys: &KeyListeners<Msg>) {
        let deps = NavKeyDeps {
            dispatcher: KeyboardDispatcher::new(self.is_complete(), self.modal_open()),
            text_focus: self.text_focus(),
        };
        let attached = self.nav_keys.sync(keys, deps, |deps| {
            move |key: &KeyEvent| {
                let key = if deps.text_focus {
                    key.with_target(FocusTarget::TextInput)
                } else {
                    *key
                };
                let dispatch = deps.dispatcher.dispatch(&key);
                Reaction {
                    message: dispatch.action.map(Msg::Nav),
                    prevent_default: dispatch.prevent_default,
                }
            }
        });
        if attached {
            tracing::trace!(?deps, "navigation keys re-attached");
        }
    }
}
