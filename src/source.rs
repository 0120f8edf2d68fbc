// src/source.rs

//! Question pool loading: remote collection first, bundled list second.

use std::{collections::HashSet, sync::Arc};

use serde::Deserialize;
use thiserror::Error;

use crate::{
    models::{
        catalog::ExamScope,
        question::{BundledQuestion, Question, QuestionId},
    },
    repository::ContentRepository,
};

/// The fallback list compiled into the binary.
const BUNDLED_QUESTIONS: &str = include_str!("../data/fallback_questions.json");

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SourceError {
    #[error("Questions are not available.")]
    ContentUnavailable,
}

/// One lesson's worth of bundled questions.
#[derive(Debug, Clone, Deserialize)]
pub struct BundledLesson {
    pub class: String,
    pub subject: String,
    pub lesson: String,
    pub questions: Vec<BundledQuestion>,
}

/// Static question list used when the remote collection fails or is empty.
#[derive(Debug, Clone, Default)]
pub struct FallbackBundle {
    lessons: Vec<BundledLesson>,
}

impl FallbackBundle {
    /// Parses the list shipped with the binary.
    pub fn bundled() -> Result<Self, serde_json::Error> {
        Self::from_json(BUNDLED_QUESTIONS)
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let lessons: Vec<BundledLesson> = serde_json::from_str(raw)?;
        Ok(Self { lessons })
    }

    /// Bundled questions for `scope`, normalized to the common shape.
    pub fn questions_for(&self, scope: &ExamScope) -> Vec<Question> {
        let candidates = self
            .lessons
            .iter()
            .filter(|l| l.class == scope.class && l.subject == scope.subject)
            .filter(|l| scope.includes_lesson(&l.lesson))
            .flat_map(|l| l.questions.iter().cloned())
            .filter_map(|q| {
                let id = q.id.clone();
                Question::try_from(q)
                    .inspect_err(|e| tracing::warn!("Skipping bundled question {}: {}", id, e))
                    .ok()
            });

        dedup_by_id(candidates)
    }
}

/// Keeps the first question for each id.
fn dedup_by_id(questions: impl IntoIterator<Item = Question>) -> Vec<Question> {
    let mut seen: HashSet<QuestionId> = HashSet::new();
    questions
        .into_iter()
        .filter(|q| {
            let fresh = seen.insert(q.id.clone());
            if !fresh {
                tracing::warn!("Dropping duplicate question id {}", q.id);
            }
            fresh
        })
        .collect()
}

/// Supplies the candidate pool for an exam scope.
#[derive(Clone)]
pub struct QuestionSource {
    repo: Arc<dyn ContentRepository>,
    fallback: Arc<FallbackBundle>,
}

impl QuestionSource {
    pub fn new(repo: Arc<dyn ContentRepository>, fallback: FallbackBundle) -> Self {
        Self {
            repo,
            fallback: Arc::new(fallback),
        }
    }

    /// Fetches the pool once from the remote collection; falls back to the
    /// bundled list on error or when nothing valid came back.
    pub async fn load_pool(&self, scope: &ExamScope) -> Result<Vec<Question>, SourceError> {
        let remote = match self.repo.fetch_questions(scope).await {
            Ok(docs) => {
                let questions = docs.into_iter().filter_map(|doc| {
                    let id = doc.id;
                    Question::try_from(doc)
                        .inspect_err(|e| tracing::warn!("Skipping remote question {}: {}", id, e))
                        .ok()
                });
                dedup_by_id(questions)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to load questions for {}/{}, using fallback: {}",
                    scope.class,
                    scope.subject,
                    e
                );
                Vec::new()
            }
        };

        if !remote.is_empty() {
            return Ok(remote);
        }

        let fallback = self.fallback.questions_for(scope);
        if fallback.is_empty() {
            tracing::warn!("No questions for {}/{} in either source", scope.class, scope.subject);
            return Err(SourceError::ContentUnavailable);
        }

        tracing::info!(
            "Serving {} bundled questions for {}/{}",
            fallback.len(),
            scope.class,
            scope.subject
        );
        Ok(fallback)
    }
}
