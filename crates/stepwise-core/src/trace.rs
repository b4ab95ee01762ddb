#![forbid(unsafe_code)]

//! Trace document model.
//!
//! A [`TraceDocument`] is the immutable recording of one algorithm run as the
//! backend serializes it:
//!
//! ```json
//! {
//!   "result": ...,
//!   "trace": { "steps": [...], "total_steps": 12, "duration": 0.004 },
//!   "metadata": { "algorithm": "interval-coverage", "prediction_points": [...] }
//! }
//! ```
//!
//! Step payloads are algorithm-specific and kept as raw JSON. The only fields
//! the player reads structurally are `call_stack_state` (for highlighting)
//! and the legacy interval-coverage prediction markers.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Identifier of a highlightable entity (an interval, an array cell, ...).
///
/// `0` is a valid id; absence is always modelled with `Option`.
pub type EntityId = i64;

/// Step type tag.
///
/// The set is open: algorithms introduce new tags freely, so unknown tags are
/// preserved in [`StepKind::Other`] rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StepKind {
    InitialState,
    ExaminingInterval,
    DecisionMade,
    AlgorithmComplete,
    Other(String),
}

impl StepKind {
    pub const INITIAL_STATE: &'static str = "INITIAL_STATE";
    pub const EXAMINING_INTERVAL: &'static str = "EXAMINING_INTERVAL";
    pub const DECISION_MADE: &'static str = "DECISION_MADE";
    pub const ALGORITHM_COMPLETE: &'static str = "ALGORITHM_COMPLETE";

    /// The wire tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::InitialState => Self::INITIAL_STATE,
            Self::ExaminingInterval => Self::EXAMINING_INTERVAL,
            Self::DecisionMade => Self::DECISION_MADE,
            Self::AlgorithmComplete => Self::ALGORITHM_COMPLETE,
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for StepKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            Self::INITIAL_STATE => Self::InitialState,
            Self::EXAMINING_INTERVAL => Self::ExaminingInterval,
            Self::DECISION_MADE => Self::DecisionMade,
            Self::ALGORITHM_COMPLETE => Self::AlgorithmComplete,
            _ => Self::Other(tag),
        }
    }
}

impl From<&str> for StepKind {
    fn from(tag: &str) -> Self {
        Self::from(tag.to_owned())
    }
}

impl From<StepKind> for String {
    fn from(kind: StepKind) -> Self {
        match kind {
            StepKind::Other(tag) => tag,
            known => known.as_str().to_owned(),
        }
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded state snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Type tag.
    #[serde(rename = "type")]
    pub kind: StepKind,

    /// Human-readable narration.
    #[serde(default)]
    pub description: String,

    /// Backend step counter, if sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<u64>,

    /// Seconds since the trace started, if sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,

    /// Algorithm-specific payload.
    #[serde(default, deserialize_with = "null_as_empty_map")]
    pub data: Map<String, Value>,
}

impl Step {
    /// Build a step from a tag and a JSON payload.
    ///
    /// Non-object payloads are treated as empty.
    #[must_use]
    pub fn new(kind: impl Into<StepKind>, data: Value) -> Self {
        let data = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            kind: kind.into(),
            description: String::new(),
            step: None,
            timestamp: None,
            data,
        }
    }

    /// Attach a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Look up a payload field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name).filter(|v| !v.is_null())
    }

    /// True for the terminal `ALGORITHM_COMPLETE` step.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.kind == StepKind::AlgorithmComplete
    }

    /// The simulated recursion stack, outermost frame first.
    ///
    /// Frames that do not decode are kept as empty frames so that positions
    /// (and therefore "last frame is active") stay intact.
    #[must_use]
    pub fn call_stack(&self) -> Vec<CallFrame> {
        match self.field("call_stack_state") {
            Some(Value::Array(frames)) => frames.iter().map(CallFrame::from_value).collect(),
            _ => Vec::new(),
        }
    }

    /// The active (innermost) frame.
    #[must_use]
    pub fn active_frame(&self) -> Option<CallFrame> {
        match self.field("call_stack_state") {
            Some(Value::Array(frames)) => frames.last().map(CallFrame::from_value),
            _ => None,
        }
    }
}

fn null_as_empty_map<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Reference to the entity a frame is examining.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(default)]
    pub id: Option<EntityId>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One active or returned recursive invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallFrame {
    #[serde(default)]
    pub current_interval: Option<EntityRef>,

    #[serde(default)]
    pub depth: Option<Value>,

    #[serde(default)]
    pub decision: Option<Value>,

    #[serde(default)]
    pub return_value: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CallFrame {
    fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_else(|err| {
            tracing::trace!(%err, "undecodable call frame");
            Self::default()
        })
    }

    /// Id of the entity under examination, if any.
    #[must_use]
    pub fn entity_id(&self) -> Option<EntityId> {
        self.current_interval.as_ref().and_then(|r| r.id)
    }
}

/// One answer offered at a prediction point.
///
/// Decodes from `{id, label}` or from a bare string, which serves as both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ChoiceRepr")]
pub struct Choice {
    pub id: String,
    pub label: String,
}

impl Choice {
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ChoiceRepr {
    Bare(String),
    Full {
        id: String,
        #[serde(default)]
        label: String,
    },
}

impl From<ChoiceRepr> for Choice {
    fn from(repr: ChoiceRepr) -> Self {
        match repr {
            ChoiceRepr::Bare(id) => Self {
                label: id.clone(),
                id,
            },
            ChoiceRepr::Full { id, label } => Self { id, label },
        }
    }
}

/// A quiz question the trace declares for one of its steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionPoint {
    pub step_index: usize,
    pub question: String,
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Descriptive trace metadata.
///
/// Only the typed fields are interpreted; everything else passes through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_size: Option<u64>,

    /// Points that fail to decode are dropped; the rest of the document
    /// still loads.
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "lenient_points"
    )]
    pub prediction_points: Vec<PredictionPoint>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn lenient_points<'de, D>(deserializer: D) -> Result<Vec<PredictionPoint>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => items,
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(other) => {
            tracing::warn!(value = %other, "prediction_points is not a list; ignoring");
            return Ok(Vec::new());
        }
    };
    Ok(items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(point) => Some(point),
            Err(err) => {
                tracing::warn!(index, %err, "dropping undecodable prediction point");
                None
            }
        })
        .collect())
}

/// The `trace` member of a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceBody {
    #[serde(default)]
    pub steps: Vec<Step>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_steps: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

/// A complete, immutable algorithm trace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(default)]
    pub trace: TraceBody,

    #[serde(default)]
    pub metadata: Metadata,
}

impl TraceDocument {
    /// Build a document from steps alone.
    #[must_use]
    pub fn from_steps(steps: Vec<Step>) -> Self {
        Self {
            trace: TraceBody {
                total_steps: Some(steps.len()),
                steps,
                duration: None,
            },
            ..Self::default()
        }
    }

    /// Attach metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Decode a document from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.trace.steps
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.trace.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trace.steps.is_empty()
    }

    #[must_use]
    pub fn step(&self, index: usize) -> Option<&Step> {
        self.trace.steps.get(index)
    }

    /// The prediction point declared for `index`, if any.
    #[must_use]
    pub fn prediction_point(&self, index: usize) -> Option<&PredictionPoint> {
        self.metadata
            .prediction_points
            .iter()
            .find(|p| p.step_index == index)
    }

    /// Name to show in headers: display name, then algorithm id.
    #[must_use]
    pub fn title(&self) -> &str {
        self.metadata
            .display_name
            .as_deref()
            .or(self.metadata.algorithm.as_deref())
            .unwrap_or("Algorithm Trace")
    }
}
