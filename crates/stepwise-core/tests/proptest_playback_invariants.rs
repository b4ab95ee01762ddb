//! Property-based invariant tests for playback state.
//!
//! 1. `next()` k times from 0 lands on `min(k, N-1)`.
//! 2. `prev()` k times from `N-1` lands on `max(N-1-k, 0)`.
//! 3. Arbitrary navigation never leaves `[0, N-1]`.
//! 4. Quiz totals count answers only; correct counts matching answers only.
//! 5. Highlight never conflates id 0 with absence.

use proptest::prelude::*;
use serde_json::json;
use stepwise_core::highlight::{Highlight, auto_highlight};
use stepwise_core::navigation::Navigation;
use stepwise_core::prediction::PredictionEngine;
use stepwise_core::trace::{Step, TraceDocument};

// ── Helpers ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum Op {
    Next,
    Prev,
    End,
    Reset,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Next),
        Just(Op::Prev),
        Just(Op::End),
        Just(Op::Reset),
    ]
}

#[derive(Debug, Clone, Copy)]
enum QuizOp {
    AnswerRight,
    AnswerWrong,
    Skip,
}

fn quiz_strategy() -> impl Strategy<Value = QuizOp> {
    prop_oneof![
        Just(QuizOp::AnswerRight),
        Just(QuizOp::AnswerWrong),
        Just(QuizOp::Skip),
    ]
}

fn quiz_trace() -> TraceDocument {
    TraceDocument::from_steps(vec![
        Step::new(
            "EXAMINING_INTERVAL",
            json!({"interval": {"id": 2, "end": 720}, "max_end": 660, "comparison": "end>max_end"}),
        ),
        Step::new("DECISION_MADE", json!({"decision": "keep"})),
    ])
}

// ═════════════════════════════════════════════════════════════════════════
// 1-2. Composition of next/prev
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn next_k_times_clamps(n in 1usize..64, k in 0usize..128) {
        let mut nav = Navigation::new(n);
        for _ in 0..k {
            nav.next(false);
        }
        prop_assert_eq!(nav.current(), k.min(n - 1));
    }

    #[test]
    fn prev_k_times_clamps(n in 1usize..64, k in 0usize..128) {
        let mut nav = Navigation::new(n);
        nav.jump_to_end();
        for _ in 0..k {
            nav.prev();
        }
        prop_assert_eq!(nav.current(), (n - 1).saturating_sub(k));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Bounds under arbitrary sequences
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn navigation_stays_in_bounds(n in 0usize..32, ops in prop::collection::vec(op_strategy(), 0..64)) {
        let mut nav = Navigation::new(n);
        for op in ops {
            match op {
                Op::Next => { nav.next(false); }
                Op::Prev => { nav.prev(); }
                Op::End => { nav.jump_to_end(); }
                Op::Reset => { nav.reset(); }
            }
            prop_assert!(nav.current() < n.max(1), "index {} escaped len {}", nav.current(), n);
        }
    }

    #[test]
    fn reset_always_returns_to_zero(n in 0usize..32, ops in prop::collection::vec(op_strategy(), 0..32)) {
        let mut nav = Navigation::new(n);
        for op in ops {
            if let Op::Next = op { nav.next(false); } else { nav.jump_to_end(); }
        }
        nav.reset();
        prop_assert_eq!(nav.current(), 0);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Quiz accounting
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn totals_count_answers_only(ops in prop::collection::vec(quiz_strategy(), 0..48)) {
        let trace = quiz_trace();
        let mut engine = PredictionEngine::new(true);
        let mut answers = 0u32;
        let mut right = 0u32;

        for op in ops {
            engine.evaluate(Some(&trace), 0);
            prop_assert!(engine.is_pending());
            match op {
                QuizOp::AnswerRight => {
                    engine.answer("keep");
                    answers += 1;
                    right += 1;
                }
                QuizOp::AnswerWrong => {
                    engine.answer("covered");
                    answers += 1;
                }
                QuizOp::Skip => {
                    engine.skip();
                }
            }
            prop_assert!(!engine.is_pending());
        }

        let stats = engine.stats();
        prop_assert_eq!(stats.total, answers);
        prop_assert_eq!(stats.correct, right);
        prop_assert!(stats.correct <= stats.total);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Highlight
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn active_frame_id_is_reported_verbatim(ids in prop::collection::vec(0i64..8, 1..6)) {
        let frames: Vec<_> = ids.iter().map(|id| json!({"current_interval": {"id": id}})).collect();
        let step = Step::new("CALL_START", json!({"call_stack_state": frames}));
        prop_assert_eq!(auto_highlight(Some(&step)), ids.last().copied());
    }

    #[test]
    fn hover_always_wins(hover in 0i64..8, auto in 0i64..8) {
        let step = Step::new("CALL_START", json!({"call_stack_state": [{"current_interval": {"id": auto}}]}));
        let mut hl = Highlight::new();
        hl.hover(Some(hover));
        prop_assert_eq!(hl.effective(Some(&step)), Some(hover));
    }
}
