#![forbid(unsafe_code)]

//! Prediction quiz.
//!
//! At a *prediction point* the player pauses and asks the learner to guess
//! the algorithm's next decision before revealing it. Eligibility is a pure
//! function of `(trace, current step)`; [`PredictionEngine::evaluate`] is
//! re-run by the owner whenever the step, the trace, or the mode changes.
//!
//! # Eligibility
//!
//! 1. A point declared in `metadata.prediction_points` for the current step
//!    is eligible when a successor step exists to reveal the answer.
//! 2. Otherwise the interval-coverage shape applies: the current step is
//!    `EXAMINING_INTERVAL` with `interval` and `comparison` fields **and** the
//!    successor is `DECISION_MADE`. The successor's `decision` is the answer.
//!
//! # Lifecycle
//!
//! `Idle -> Pending -> Idle`. Answering and skipping both return to idle;
//! the owner then advances navigation. Only answers touch the statistics.

use serde_json::Value;

use crate::trace::{Choice, PredictionPoint, Step, StepKind, TraceDocument};

/// Where a prompt came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptSource {
    /// Declared by the trace metadata.
    Declared,
    /// Inferred from the interval-coverage step shape.
    Inferred,
}

/// A question posed at a prediction point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub step_index: usize,
    pub question: String,
    pub choices: Vec<Choice>,
    pub hint: Option<String>,
    /// `None` when the trace never states the answer; such prompts can be
    /// answered but never scored correct.
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
    pub source: PromptSource,
}

impl Prompt {
    fn from_point(point: &PredictionPoint) -> Self {
        Self {
            step_index: point.step_index,
            question: point.question.clone(),
            choices: point.choices.clone(),
            hint: point.hint.clone(),
            correct_answer: Some(point.correct_answer.clone()),
            explanation: point.explanation.clone(),
            source: PromptSource::Declared,
        }
    }

    /// Whether `choice_id` is the right answer.
    #[must_use]
    pub fn is_correct(&self, choice_id: &str) -> bool {
        self.correct_answer.as_deref() == Some(choice_id)
    }

    /// Label of the correct choice, falling back to its id.
    #[must_use]
    pub fn correct_label(&self) -> Option<&str> {
        let answer = self.correct_answer.as_deref()?;
        Some(
            self.choices
                .iter()
                .find(|c| c.id == answer)
                .map_or(answer, |c| c.label.as_str()),
        )
    }
}

/// Running quiz score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PredictionStats {
    pub total: u32,
    pub correct: u32,
}

impl PredictionStats {
    /// Rounded accuracy percentage; `None` before the first answer.
    #[must_use]
    pub fn accuracy(&self) -> Option<u32> {
        if self.total == 0 {
            return None;
        }
        let pct = f64::from(self.correct) * 100.0 / f64::from(self.total);
        Some(pct.round() as u32)
    }
}

/// Result of [`PredictionEngine::answer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub step_index: usize,
    pub correct: bool,
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
}

/// Compute the prompt for step `index`, if it is a prediction point.
#[must_use]
pub fn prediction_prompt(trace: &TraceDocument, index: usize) -> Option<Prompt> {
    let step = trace.step(index)?;
    let successor = trace.step(index + 1);

    if let Some(point) = trace.prediction_point(index) {
        return successor.map(|_| Prompt::from_point(point));
    }

    let successor = successor.filter(|s| s.kind == StepKind::DecisionMade)?;
    inferred_prompt(index, step, successor)
}

/// True when `step` carries the interval-coverage "decision pending" shape.
#[must_use]
pub fn looks_like_decision_point(step: &Step) -> bool {
    step.kind == StepKind::ExaminingInterval
        && step.field("interval").is_some()
        && step.field("comparison").is_some()
}

const KEEP: &str = "keep";
const COVERED: &str = "covered";

fn inferred_prompt(index: usize, step: &Step, successor: &Step) -> Option<Prompt> {
    if !looks_like_decision_point(step) {
        return None;
    }

    let interval = step.field("interval")?;
    let end = interval.get("end").map(display_value);
    let max_end = step.field("max_end").map(display_value);
    let correct_answer = successor
        .field("decision")
        .and_then(Value::as_str)
        .map(str::to_owned);

    let question = match interval.get("id") {
        Some(id) => format!(
            "Interval {} ends at {}. Will it be kept or is it covered?",
            display_value(id),
            end.as_deref().unwrap_or("?")
        ),
        None => "Will this interval be kept or is it covered?".to_owned(),
    };

    let end_text = end.unwrap_or_else(|| "?".to_owned());
    let hint = match &max_end {
        None => "This is the first interval (max_end = -∞). Will it extend coverage?".to_owned(),
        Some(max) => format!("Compare interval.end ({end_text}) with max_end ({max})"),
    };
    let max_text = max_end.unwrap_or_else(|| "-∞".to_owned());
    let explanation = correct_answer.as_deref().map(|answer| {
        if answer == KEEP {
            format!("KEEP: interval.end ({end_text}) > max_end ({max_text}), extending coverage")
        } else {
            format!("COVERED: interval.end ({end_text}) <= max_end ({max_text}), already covered")
        }
    });

    Some(Prompt {
        step_index: index,
        question,
        choices: vec![
            Choice::new(KEEP, "Keep: it extends coverage"),
            Choice::new(COVERED, "Covered: it is already covered"),
        ],
        hint: Some(hint),
        correct_answer,
        explanation,
        source: PromptSource::Inferred,
    })
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Quiz state machine.
#[derive(Debug, Clone)]
pub struct PredictionEngine {
    enabled: bool,
    pending: Option<Prompt>,
    stats: PredictionStats,
}

impl Default for PredictionEngine {
    fn default() -> Self {
        Self::new(true)
    }
}

impl PredictionEngine {
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self {
            enabled,
            pending: None,
            stats: PredictionStats {
                total: 0,
                correct: 0,
            },
        }
    }

    /// Whether prediction mode is on.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    #[must_use]
    pub fn prompt(&self) -> Option<&Prompt> {
        self.pending.as_ref()
    }

    #[must_use]
    pub const fn stats(&self) -> PredictionStats {
        self.stats
    }

    /// Recompute the pending prompt from its inputs.
    ///
    /// A prompt already pending for the same step is left as is.
    pub fn evaluate(&mut self, trace: Option<&TraceDocument>, current: usize) {
        let next = match trace {
            Some(trace) if self.enabled => prediction_prompt(trace, current),
            _ => None,
        };
        let unchanged = matches!(
            (&self.pending, &next),
            (Some(old), Some(new)) if old.step_index == new.step_index
        );
        if unchanged {
            return;
        }
        if let Some(prompt) = &next {
            tracing::debug!(step = prompt.step_index, source = ?prompt.source, "prediction prompt shown");
        }
        self.pending = next;
    }

    /// Turn prediction mode on or off. Hides any pending prompt; statistics
    /// are kept.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.pending = None;
    }

    /// Flip prediction mode. Returns the new mode.
    pub fn toggle(&mut self) -> bool {
        self.set_enabled(!self.enabled);
        self.enabled
    }

    /// Record an answer for the pending prompt and close it.
    ///
    /// Returns `None` (and changes nothing) when no prompt is pending.
    pub fn answer(&mut self, choice_id: &str) -> Option<AnswerOutcome> {
        let prompt = self.pending.take()?;
        let correct = prompt.is_correct(choice_id);
        self.stats.total += 1;
        if correct {
            self.stats.correct += 1;
        }
        tracing::debug!(
            step = prompt.step_index,
            choice = choice_id,
            correct,
            total = self.stats.total,
            "prediction answered"
        );
        Some(AnswerOutcome {
            step_index: prompt.step_index,
            correct,
            correct_answer: prompt.correct_answer,
            explanation: prompt.explanation,
        })
    }

    /// Close the pending prompt without scoring. Returns whether one was open.
    pub fn skip(&mut self) -> bool {
        let skipped = self.pending.take();
        if let Some(prompt) = &skipped {
            tracing::debug!(step = prompt.step_index, "prediction skipped");
        }
        skipped.is_some()
    }

    pub fn reset_stats(&mut self) {
        self.stats = PredictionStats::default();
    }
}
