#![forbid(unsafe_code)]

//! Step classification and score feedback for display.

use crate::trace::StepKind;

/// Coarse category of a step, derived from substrings of its tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BadgeCategory {
    Decision,
    Coverage,
    Examine,
    Recursion,
    BaseCase,
    Sort,
    State,
    Other,
    Unknown,
}

/// Badge shown next to a step description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepBadge {
    pub category: BadgeCategory,
    pub label: String,
}

/// Classify a step tag. Checks run in priority order; the first match wins.
#[must_use]
pub fn step_badge(kind: Option<&StepKind>) -> StepBadge {
    let Some(kind) = kind.filter(|k| !k.as_str().is_empty()) else {
        return StepBadge {
            category: BadgeCategory::Unknown,
            label: "UNKNOWN".to_owned(),
        };
    };
    let tag = kind.as_str().to_uppercase();

    let (category, label) = if tag.contains("DECISION") {
        (BadgeCategory::Decision, "DECISION")
    } else if tag.contains("MAX_END") {
        (BadgeCategory::Coverage, "COVERAGE")
    } else if tag.contains("EXAMINING") {
        (BadgeCategory::Examine, "EXAMINE")
    } else if tag.contains("CALL_START") || tag.contains("CALL_RETURN") {
        (BadgeCategory::Recursion, "RECURSION")
    } else if tag.contains("BASE_CASE") {
        (BadgeCategory::BaseCase, "BASE CASE")
    } else if tag.contains("SORT") {
        (BadgeCategory::Sort, "SORT")
    } else if tag.contains("INITIAL") || tag.contains("COMPLETE") {
        (BadgeCategory::State, "STATE")
    } else {
        return StepBadge {
            category: BadgeCategory::Other,
            label: tag.replace('_', " "),
        };
    };

    StepBadge {
        category,
        label: label.to_owned(),
    }
}

/// Encouragement tier for a final accuracy percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccuracyTier {
    Excellent,
    Great,
    GoodStart,
    KeepPracticing,
}

impl AccuracyTier {
    #[must_use]
    pub const fn from_percent(accuracy: u32) -> Self {
        if accuracy >= 90 {
            Self::Excellent
        } else if accuracy >= 70 {
            Self::Great
        } else if accuracy >= 50 {
            Self::GoodStart
        } else {
            Self::KeepPracticing
        }
    }

    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent! You've mastered this algorithm!",
            Self::Great => "Great job! You understand the core logic.",
            Self::GoodStart => "Good start! Keep practicing to improve.",
            Self::KeepPracticing => {
                "Keep practicing! Try the step-by-step mode to understand each decision."
            }
        }
    }
}
