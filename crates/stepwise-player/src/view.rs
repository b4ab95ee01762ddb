#![forbid(unsafe_code)]

//! Text rendering of the player.
//!
//! `render` picks exactly one top-level state (loading, error, empty,
//! invalid step, playback) and writes it into the frame. Dialogs stack
//! below the playback panel; the frame clips whatever does not fit.

use serde_json::Value;
use stepwise_core::badge::{AccuracyTier, step_badge};
use stepwise_core::prediction::Prompt;
use stepwise_core::store::StepLookupError;
use stepwise_core::trace::{CallFrame, Step, TraceDocument};
use stepwise_runtime::frame::Frame;

use crate::app::{InfoDialog, PromptUi, TracePlayer};

const RULE: &str = "────────────────────────────────────────────────────────────────────────────────";

/// Render the whole player.
pub fn render(player: &TracePlayer, frame: &mut Frame) {
    if player.is_loading() {
        frame.line("Loading trace from backend...");
        return;
    }

    if let Some(err) = player.store().error() {
        frame.line("Backend Not Available");
        frame.blank();
        frame.line(format!("Backend error: {err}."));
        frame.line(format!(
            "Please ensure the backend is running at {}.",
            player.config().api_url
        ));
        frame.blank();
        frame.line("[r/Enter] Retry connection   [q] Quit");
        return;
    }

    let Some(trace) = player.trace() else {
        frame.line("No trace loaded.");
        return;
    };

    let index = player.navigation().current();
    let step = match player.store().step(index) {
        Ok(step) => step,
        Err(StepLookupError::NoTrace) => {
            frame.line("No trace loaded.");
            return;
        }
        Err(StepLookupError::OutOfRange { .. }) => {
            invalid_step(index, frame);
            return;
        }
    };

    header(player, trace, frame);
    frame.line(RULE);
    step_panel(player, step, frame);

    if step.is_complete() {
        frame.line(RULE);
        completion(player, trace, step, frame);
    }

    if let Some(prompt) = player.prompt() {
        frame.line(RULE);
        prompt_panel(prompt, player.prompt_ui(), frame);
    } else if let Some(outcome) = player.last_outcome() {
        let verdict = if outcome.correct { "correct" } else { "incorrect" };
        frame.line(format!("Last prediction: {verdict}"));
    }

    if player.info().is_open() {
        frame.line(RULE);
        info_panel(player.info(), frame);
    }

    if let Some(input) = player.goto_input() {
        frame.line(RULE);
        frame.line(format!("Go to step: {input}_   [Enter] jump  [Esc] cancel"));
    }
}

/// Shown when navigation points past the loaded steps.
fn invalid_step(index: usize, frame: &mut Frame) {
    frame.line("Invalid Step Data");
    frame.blank();
    frame.line(format!(
        "Step {} could not be loaded. The trace data may be malformed.",
        index + 1
    ));
    frame.line("[r] Reset to start");
}

fn header(player: &TracePlayer, trace: &TraceDocument, frame: &mut Frame) {
    let mode = if player.prediction().is_enabled() {
        "Predict"
    } else {
        "Watch"
    };
    frame.line(format!("{}  [{mode}]", trace.title()));

    let nav = player.navigation();
    let mut status = format!("Step {} of {}", nav.current() + 1, nav.len());
    let stats = player.prediction().stats();
    if let Some(accuracy) = stats.accuracy() {
        status.push_str(&format!(
            "   Predictions {}/{} ({accuracy}%)",
            stats.correct, stats.total
        ));
    }
    frame.line(status);

    if !player.algorithms().is_empty() {
        let names: Vec<String> = player
            .algorithms()
            .iter()
            .map(|a| {
                if player.selected_algorithm() == Some(a.name.as_str()) {
                    format!("[{}]", a.label())
                } else {
                    a.label().to_owned()
                }
            })
            .collect();
        frame.line(format!("Algorithms: {}", names.join("  ")));
    }

    frame.line(
        "←/→/Space step  r/Home reset  End last  g go to  p mode  i info  Tab algorithm  q quit",
    );
}

fn step_panel(player: &TracePlayer, step: &Step, frame: &mut Frame) {
    let badge = step_badge(Some(&step.kind));
    frame.line(format!("[{}] {}", badge.label, step.description));

    let highlighted = player.highlighted();
    match (highlighted, player.hover_target()) {
        (Some(id), Some(_)) => frame.line(format!("Highlight: {id} (hover)")),
        (Some(id), None) => frame.line(format!("Highlight: {id}")),
        (None, _) => frame.line("Highlight: none"),
    };

    let stack = step.call_stack();
    if stack.is_empty() {
        return;
    }
    frame.line("Call stack:");
    let active = stack.len() - 1;
    for (i, call) in stack.iter().enumerate() {
        let marker = if i == active { '▶' } else { ' ' };
        let emphasis = if call.entity_id().is_some() && call.entity_id() == highlighted {
            '*'
        } else {
            ' '
        };
        frame.line(format!("{marker}{emphasis} {}", frame_summary(call)));
    }
}

fn frame_summary(call: &CallFrame) -> String {
    let mut parts = Vec::new();
    if let Some(depth) = &call.depth {
        parts.push(format!("depth {}", compact(depth)));
    }
    match call.entity_id() {
        Some(id) => parts.push(format!("interval {id}")),
        None => parts.push("interval -".to_owned()),
    }
    if let Some(decision) = &call.decision {
        parts.push(format!("decision {}", compact(decision)));
    }
    if let Some(ret) = &call.return_value {
        parts.push(format!("returns {}", compact(ret)));
    }
    parts.join("  ")
}

fn compact(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn completion(player: &TracePlayer, trace: &TraceDocument, step: &Step, frame: &mut Frame) {
    frame.line("Algorithm Complete!");

    let mut counts = Vec::new();
    if let Some(n) = trace.metadata.input_size {
        counts.push(format!("input {n}"));
    }
    if let Some(kept) = step.field("kept_count") {
        counts.push(format!("kept {}", compact(kept)));
    }
    if let Some(removed) = step.field("removed_count") {
        counts.push(format!("removed {}", compact(removed)));
    }
    if !counts.is_empty() {
        frame.line(counts.join("  "));
    }

    let stats = player.prediction().stats();
    if let Some(accuracy) = stats.accuracy() {
        frame.line(format!(
            "Prediction accuracy: {accuracy}% ({}/{})",
            stats.correct, stats.total
        ));
        frame.line(AccuracyTier::from_percent(accuracy).message());
    }

    match step.field("result").or(trace.result.as_ref()) {
        Some(Value::Array(items)) if items.is_empty() => frame.line("Final result: nothing remaining"),
        Some(result) => frame.line(format!("Final result: {}", compact(result))),
        None => true,
    };
    frame.line("[r] Restart   [Esc] Back one step");
}

fn prompt_panel(prompt: &Prompt, ui: PromptUi, frame: &mut Frame) {
    frame.line(format!("Prediction: {}", prompt.question));
    for (i, choice) in prompt.choices.iter().enumerate() {
        let cursor = if ui.selected == Some(i) { '>' } else { ' ' };
        let label = if choice.label.is_empty() {
            &choice.id
        } else {
            &choice.label
        };
        frame.line(format!("{cursor} [{}] {label}", i + 1));
    }

    if ui.revealed {
        let chosen = ui
            .selected
            .and_then(|i| prompt.choices.get(i))
            .map(|c| c.id.as_str());
        if chosen.is_some_and(|id| prompt.is_correct(id)) {
            frame.line("Correct!");
        } else {
            match prompt.correct_label() {
                Some(label) => frame.line(format!("Incorrect. The answer is: {label}")),
                None => frame.line("Incorrect."),
            };
        }
        if let Some(explanation) = &prompt.explanation {
            frame.line(explanation);
        }
        frame.line("[Enter] Continue");
    } else {
        if let Some(hint) = &prompt.hint {
            frame.line(format!("Hint: {hint}"));
        }
        frame.line("[1-9] choose  [Enter] submit  [s/Esc] skip");
    }
}

fn info_panel(info: &InfoDialog, frame: &mut Frame) {
    match info {
        InfoDialog::Closed => {}
        InfoDialog::Loading(name) => {
            frame.line(format!("Loading info for {name}..."));
        }
        InfoDialog::Open(info) => {
            frame.line(format!("About {}  [Esc/i] close", info.algorithm));
            for line in info.info.lines() {
                if !frame.line(line) {
                    break;
                }
            }
        }
        InfoDialog::Failed { algorithm, message } => {
            frame.line(format!("No info for {algorithm}: {message}  [Esc/i] close"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn invalid_step_offers_reset() {
        let mut frame = Frame::new(80, 6);
        invalid_step(6, &mut frame);
        assert_eq!(
            frame.lines(),
            [
                "Invalid Step Data",
                "",
                "Step 7 could not be loaded. The trace data may be malformed.",
                "[r] Reset to start",
            ]
        );
    }

    #[test]
    fn invalid_step_clips_to_small_frames() {
        let mut frame = Frame::new(20, 2);
        invalid_step(0, &mut frame);
        assert_eq!(frame.lines(), ["Invalid Step Data", ""]);
    }

    #[test]
    fn compact_strips_string_quotes() {
        assert_eq!(compact(&Value::from("keep")), "keep");
        assert_eq!(compact(&serde_json::json!([1, 2])), "[1,2]");
    }
}
