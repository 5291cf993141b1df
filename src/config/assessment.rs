//! Assessment shape configuration

use serde::Deserialize;
use std::path::PathBuf;

use super::error::ValidationError;
use crate::domain::assessment::{
    DATA_COLLECTION_QUESTIONS_PER_SET, DATA_COLLECTION_TOTAL_SETS, DEFAULT_ELEMENT_COUNT,
};

/// Assessment configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AssessmentConfig {
    /// Questions per element phase in standard mode
    #[serde(default = "default_questions_per_phase")]
    pub questions_per_phase: u32,

    /// Number of personality elements
    #[serde(default = "default_element_count")]
    pub element_count: u32,

    /// Pseudo-user whose sessions run in data-collection mode
    #[serde(default = "default_data_collection_user")]
    pub data_collection_user: String,

    /// Questions per set in data-collection mode
    #[serde(default = "default_questions_per_set")]
    pub data_collection_questions_per_set: u32,

    /// Sets per data-collection session
    #[serde(default = "default_total_sets")]
    pub data_collection_total_sets: u32,

    /// Candidate answers generated per question
    #[serde(default = "default_option_count")]
    pub option_count: usize,

    /// Optional YAML catalogue replacing the built-in elements
    #[serde(default)]
    pub elements_file: Option<PathBuf>,
}

impl AssessmentConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.questions_per_phase == 0 {
            return Err(ValidationError::MustBePositive("questions_per_phase"));
        }
        if self.element_count == 0 {
            return Err(ValidationError::MustBePositive("element_count"));
        }
        if self.data_collection_questions_per_set == 0 {
            return Err(ValidationError::MustBePositive(
                "data_collection_questions_per_set",
            ));
        }
        if self.data_collection_total_sets == 0 {
            return Err(ValidationError::MustBePositive("data_collection_total_sets"));
        }
        if self.option_count == 0 {
            return Err(ValidationError::MustBePositive("option_count"));
        }
        if self.data_collection_user.trim().is_empty() {
            return Err(ValidationError::MissingRequired("DATA_COLLECTION_USER"));
        }
        Ok(())
    }
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            questions_per_phase: default_questions_per_phase(),
            element_count: default_element_count(),
            data_collection_user: default_data_collection_user(),
            data_collection_questions_per_set: default_questions_per_set(),
            data_collection_total_sets: default_total_sets(),
            option_count: default_option_count(),
            elements_file: None,
        }
    }
}

fn default_questions_per_phase() -> u32 {
    8
}

fn default_element_count() -> u32 {
    DEFAULT_ELEMENT_COUNT
}

fn default_data_collection_user() -> String {
    "data_collection_user".to_string()
}

fn default_questions_per_set() -> u32 {
    DATA_COLLECTION_QUESTIONS_PER_SET
}

fn default_total_sets() -> u32 {
    DATA_COLLECTION_TOTAL_SETS
}

fn default_option_count() -> usize {
    3
}
