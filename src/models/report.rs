// src/models/report.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::question::{Question, QuestionId};

/// One answered (or skipped) question inside a report.
/// Prompt, correct option and explanation are denormalized copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub id: QuestionId,
    pub question: String,
    /// Absent when the student skipped the question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<String>,
    pub correct: String,
    #[serde(default)]
    pub explanation: String,
}

impl AttemptRecord {
    pub fn from_question(question: &Question, selected: Option<String>) -> Self {
        Self {
            id: question.id.clone(),
            question: question.prompt.clone(),
            selected,
            correct: question.correct_option.clone(),
            explanation: question.explanation.clone(),
        }
    }

    /// Skipped questions count as failed.
    pub fn is_correct(&self) -> bool {
        self.selected.as_deref() == Some(self.correct.as_str())
    }
}

/// The persisted record of one completed exam session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Reports written before subjects were tracked load as "unknown".
    #[serde(default = "unknown_subject")]
    pub subject: String,
    pub score: u32,
    pub total: u32,
    pub details: Vec<AttemptRecord>,
}

fn unknown_subject() -> String {
    "unknown".to_string()
}

impl Report {
    /// Checks `score <= total == details.len()`.
    pub fn is_consistent(&self) -> bool {
        self.score <= self.total && self.total as usize == self.details.len()
    }
}
