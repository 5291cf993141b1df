//! Personality elements: the four dimensions an assessment walks through.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::ValidationError;

/// Number of elements in the standard catalogue.
pub const DEFAULT_ELEMENT_COUNT: u32 = 4;

/// 1-based identifier of a personality element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(u32);

impl ElementId {
    pub const FIRST: ElementId = ElementId(1);

    /// Creates an element id, rejecting zero.
    pub fn new(id: u32) -> Result<Self, ValidationError> {
        if id == 0 {
            return Err(ValidationError::out_of_range(
                "element_id",
                1,
                i64::from(u32::MAX),
                0,
            ));
        }
        Ok(Self(id))
    }

    /// Clamps any requested id into `1..=element_count`.
    pub fn clamped(requested: i64, element_count: u32) -> Self {
        let max = i64::from(element_count.max(1));
        Self(requested.clamp(1, max) as u32)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// 0-based position, for indexing per-element buckets.
    pub fn index(&self) -> usize {
        (self.0 - 1) as usize
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A personality dimension with its pool of canned opening questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalityElement {
    pub name: String,
    pub description: String,
    /// Label used in data-collection progress output, e.g. "Energy (I/E)".
    #[serde(default)]
    pub display_name: Option<String>,
    pub initial_questions: Vec<String>,
}

impl PersonalityElement {
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

fn element(name: &str, display: &str, description: &str, questions: &[&str]) -> PersonalityElement {
    PersonalityElement {
        name: name.to_string(),
        description: description.to_string(),
        display_name: Some(display.to_string()),
        initial_questions: questions.iter().map(|q| q.to_string()).collect(),
    }
}

/// Built-in catalogue used when no elements file is configured.
pub static BUILTIN_ELEMENTS: Lazy<Vec<PersonalityElement>> = Lazy::new(|| {
    vec![
        element(
            "energy",
            "Energy (I/E)",
            "Where a person draws energy from: the outer world of people and activity, \
             or the inner world of thoughts and reflection.",
            &[
                "After a long, busy week, how do you prefer to spend your free evening?",
                "When you join a group where you know nobody, what do you usually do first?",
                "Think of a recent day that left you feeling recharged. What were you doing?",
            ],
        ),
        element(
            "mind",
            "Mind (N/S)",
            "How a person takes in information: through concrete facts and experience, \
             or through patterns, possibilities and imagination.",
            &[
                "When you learn something new, do you prefer step-by-step instructions or the big picture first?",
                "Describe how you would explain a favourite place to someone who has never been there.",
                "When planning a trip, what do you find yourself thinking about most?",
            ],
        ),
        element(
            "nature",
            "Nature (T/F)",
            "How a person makes decisions: by weighing logic and consistency, \
             or by weighing values and the impact on people.",
            &[
                "A friend asks for honest feedback on a plan you think will fail. How do you respond?",
                "Think of a hard decision you made recently. What mattered most in the end?",
                "When two teammates disagree, what do you pay attention to first?",
            ],
        ),
        element(
            "tactics",
            "Tactics (J/P)",
            "How a person approaches work and planning: with structure and closure, \
             or with flexibility and openness to change.",
            &[
                "How do you usually handle a deadline that is two weeks away?",
                "Your weekend plans get cancelled at the last minute. How do you feel and what do you do?",
                "Do you prefer to-do lists, or deciding what to do as the day unfolds? Why?",
            ],
        ),
    ]
});
