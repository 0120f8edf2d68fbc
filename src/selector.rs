// src/selector.rs

use std::collections::HashSet;

use rand::{Rng, seq::SliceRandom};

use crate::models::{
    question::{Question, QuestionId},
    report::Report,
};

/// Every question id that appears in any historical report.
pub fn attempted_ids(history: &[Report]) -> HashSet<QuestionId> {
    history
        .iter()
        .flat_map(|r| r.details.iter().map(|d| d.id.clone()))
        .collect()
}

/// Ids answered wrongly (or skipped) in the most recent report only.
pub fn failed_ids(history: &[Report]) -> HashSet<QuestionId> {
    history
        .last()
        .map(|last| {
            last.details
                .iter()
                .filter(|d| !d.is_correct())
                .map(|d| d.id.clone())
                .collect()
        })
        .unwrap_or_default()
}

/// Picks the questions for a new session.
///
/// Keeps questions failed in the latest report plus questions never seen,
/// shuffles them uniformly and truncates to `limit`.
pub fn select_questions<R: Rng + ?Sized>(
    pool: Vec<Question>,
    history: &[Report],
    limit: usize,
    rng: &mut R,
) -> Vec<Question> {
    let attempted = attempted_ids(history);
    let failed = failed_ids(history);

    let mut retained: Vec<Question> = pool
        .into_iter()
        .filter(|q| failed.contains(&q.id) || !attempted.contains(&q.id))
        .collect();

    retained.shuffle(rng);
    retained.truncate(limit);

    tracing::debug!(
        "Selected {} questions ({} attempted, {} failed in last report)",
        retained.len(),
        attempted.len(),
        failed.len()
    );
    retained
}
