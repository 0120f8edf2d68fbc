// src/session.rs

//! One exam attempt:
//! `InProgress(index, answers) → Submitting(report) → Submitted(report)`.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::config::SESSION_IDLE_MINUTES;
use crate::models::{
    question::Question,
    report::{AttemptRecord, Report},
};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error("Questions are not available.")]
    NoQuestions,
    #[error("Exam already submitted")]
    AlreadySubmitted,
    #[error("Exam submission already in progress")]
    SubmissionInProgress,
    #[error("Exam submission has not been started")]
    NotSubmitting,
    #[error("'{0}' is not an option of the current question")]
    InvalidOption(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    InProgress,
    /// The report is being written; the session is frozen.
    Submitting(Report),
    Submitted(Report),
}

#[derive(Debug, Clone)]
pub struct ExamSession {
    id: Uuid,
    owner: String,
    subject: String,
    questions: Vec<Question>,
    current: usize,
    answers: BTreeMap<usize, String>,
    state: SessionState,
    last_seen: DateTime<Utc>,
}

impl ExamSession {
    /// Starts a session. An empty selection is refused rather than
    /// producing a quiz with nothing in it.
    pub fn new(owner: &str, subject: &str, questions: Vec<Question>) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::NoQuestions);
        }

        Ok(Self {
            id: Uuid::new_v4(),
            owner: owner.to_string(),
            subject: subject.to_string(),
            questions,
            current: 0,
            answers: BTreeMap::new(),
            state: SessionState::InProgress,
            last_seen: Utc::now(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.current]
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 == self.total()
    }

    pub fn selected(&self, index: usize) -> Option<&str> {
        self.answers.get(&index).map(String::as_str)
    }

    pub fn answered(&self) -> usize {
        self.answers.len()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self.state, SessionState::Submitted(_))
    }

    pub fn last_seen(&self) -> DateTime<Utc> {
        self.last_seen
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_seen = now;
    }

    /// Untouched for longer than `ttl`. A session being submitted is never idle.
    pub fn is_idle(&self, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
        !matches!(self.state, SessionState::Submitting(_)) && now - self.last_seen > ttl
    }

    fn ensure_in_progress(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::InProgress => Ok(()),
            SessionState::Submitting(_) => Err(SessionError::SubmissionInProgress),
            SessionState::Submitted(_) => Err(SessionError::AlreadySubmitted),
        }
    }

    /// Replaces any earlier choice for the current question.
    pub fn select(&mut self, option: &str) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        if !self.current_question().has_option(option) {
            return Err(SessionError::InvalidOption(option.to_string()));
        }
        self.answers.insert(self.current, option.to_string());
        Ok(())
    }

    pub fn next(&mut self) -> Result<usize, SessionError> {
        self.ensure_in_progress()?;
        self.current = (self.current + 1).min(self.total() - 1);
        Ok(self.current)
    }

    pub fn previous(&mut self) -> Result<usize, SessionError> {
        self.ensure_in_progress()?;
        self.current = self.current.saturating_sub(1);
        Ok(self.current)
    }

    /// Number of positions whose choice equals the correct option exactly.
    pub fn score(&self) -> usize {
        self.questions
            .iter()
            .enumerate()
            .filter(|(i, q)| self.selected(*i) == Some(q.correct_option.as_str()))
            .count()
    }

    /// Builds the report for the current answers without ending the session.
    /// Fails once the session has been submitted.
    pub fn draft_report(&self, now: DateTime<Utc>) -> Result<Report, SessionError> {
        self.ensure_in_progress()?;

        let details: Vec<AttemptRecord> = self
            .questions
            .iter()
            .enumerate()
            .map(|(i, q)| AttemptRecord::from_question(q, self.answers.get(&i).cloned()))
            .collect();

        Ok(Report {
            id: Uuid::new_v4(),
            timestamp: now,
            subject: self.subject.clone(),
            score: self.score() as u32,
            total: self.total() as u32,
            details,
        })
    }

    /// Freezes the session with its report while the report is written.
    /// Only one submission can be in flight.
    pub fn begin_submit(&mut self, now: DateTime<Utc>) -> Result<Report, SessionError> {
        let report = self.draft_report(now)?;
        self.state = SessionState::Submitting(report.clone());
        Ok(report)
    }

    /// Returns to `InProgress` after a failed write. Answers are kept.
    pub fn abort_submit(&mut self) {
        if matches!(self.state, SessionState::Submitting(_)) {
            self.state = SessionState::InProgress;
        }
    }

    /// Ends the session once its report is stored.
    pub fn finish_submit(&mut self) -> Result<Report, SessionError> {
        let report = match &self.state {
            SessionState::Submitting(report) => report.clone(),
            SessionState::Submitted(_) => return Err(SessionError::AlreadySubmitted),
            SessionState::InProgress => return Err(SessionError::NotSubmitting),
        };
        self.state = SessionState::Submitted(report.clone());
        Ok(report)
    }

    /// Drafts and seals the report in one step.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<Report, SessionError> {
        self.begin_submit(now)?;
        self.finish_submit()
    }
}

/// Open sessions keyed by id.
///
/// Sessions untouched for longer than the idle TTL are dropped by
/// `evict_idle`, which runs on every insert and from the periodic sweep.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, ExamSession>>,
    idle_ttl: TimeDelta,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_idle_ttl(TimeDelta::minutes(SESSION_IDLE_MINUTES))
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_ttl(idle_ttl: TimeDelta) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_ttl,
        }
    }

    pub async fn insert(&self, session: ExamSession) -> Uuid {
        let id = session.id();
        let mut sessions = self.sessions.lock().await;
        evict(&mut sessions, Utc::now(), self.idle_ttl);
        sessions.insert(id, session);
        id
    }

    /// Locks the registry for a short read or update. Do not hold the
    /// guard across I/O.
    pub async fn lock(&self) -> SessionGuard<'_> {
        SessionGuard {
            inner: self.sessions.lock().await,
            idle_ttl: self.idle_ttl,
        }
    }

    /// Drops idle sessions, returning how many went.
    pub async fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        evict(&mut *self.sessions.lock().await, now, self.idle_ttl)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

fn evict(sessions: &mut HashMap<Uuid, ExamSession>, now: DateTime<Utc>, ttl: TimeDelta) -> usize {
    let before = sessions.len();
    sessions.retain(|_, s| !s.is_idle(now, ttl));
    let evicted = before - sessions.len();
    if evicted > 0 {
        tracing::info!("Evicted {} idle exam sessions", evicted);
    }
    evicted
}

pub struct SessionGuard<'a> {
    inner: MutexGuard<'a, HashMap<Uuid, ExamSession>>,
    idle_ttl: TimeDelta,
}

impl SessionGuard<'_> {
    /// The session, if it exists, belongs to `owner` and has not gone idle.
    /// Marks it as seen.
    pub fn get_mut(&mut self, id: &Uuid, owner: &str) -> Option<&mut ExamSession> {
        let now = Utc::now();
        let ttl = self.idle_ttl;
        self.inner
            .get_mut(id)
            .filter(|s| s.owner() == owner && !s.is_idle(now, ttl))
            .map(|s| {
                s.touch(now);
                s
            })
    }

    /// Removes the session if it belongs to `owner`.
    pub fn remove(&mut self, id: &Uuid, owner: &str) -> Option<ExamSession> {
        match self.inner.get(id) {
            Some(s) if s.owner() == owner => self.inner.remove(id),
            _ => None,
        }
    }
}
