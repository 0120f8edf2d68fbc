// src/handlers/exam.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::EXAM_QUESTION_COUNT,
    error::AppError,
    models::{
        catalog::ExamScope,
        question::{PublicQuestion, Question},
        report::Report,
    },
    selector::select_questions,
    session::{ExamSession, SessionError, SessionGuard, SessionState},
    state::AppState,
    utils::jwt::Claims,
};

/// What the student sees of an in-progress session.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub index: usize,
    pub total: usize,
    pub question: PublicQuestion,
    pub selected: Option<String>,
    pub answered: usize,
    pub is_last: bool,
}

impl From<&ExamSession> for SessionView {
    fn from(session: &ExamSession) -> Self {
        let index = session.current_index();
        Self {
            session_id: session.id(),
            index,
            total: session.total(),
            question: PublicQuestion::from(session.current_question()),
            selected: session.selected(index).map(str::to_string),
            answered: session.answered(),
            is_last: session.is_last(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub option: String,
}

/// Result of a submission: the stored report plus the questions with their answers.
#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub report: Report,
    pub questions: Vec<Question>,
}

fn session_not_found() -> AppError {
    AppError::NotFound("Session not found".to_string())
}

/// Runs `f` against the caller's session and returns the refreshed view.
async fn with_session<F>(
    state: &AppState,
    id: &Uuid,
    claims: &Claims,
    f: F,
) -> Result<Json<SessionView>, AppError>
where
    F: FnOnce(&mut ExamSession) -> Result<(), AppError>,
{
    let mut guard: SessionGuard<'_> = state.sessions.lock().await;
    let session = guard.get_mut(id, &claims.sub).ok_or_else(session_not_found)?;
    f(session)?;
    Ok(Json(SessionView::from(&*session)))
}

/// Starts an exam session for a scope.
///
/// * Loads the pool (remote collection, bundled list as fallback).
/// * Drops questions already mastered according to the caller's reports.
/// * Shuffles and keeps at most `EXAM_QUESTION_COUNT`.
pub async fn start_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(scope): Json<ExamScope>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = scope.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let pool = state.questions.load_pool(&scope).await?;
    let history = state.reports.load_all(&claims.sub).await;
    let pool_size = pool.len();
    let selected = select_questions(pool, &history, EXAM_QUESTION_COUNT, &mut rand::rng());

    let session = ExamSession::new(&claims.sub, &scope.subject, selected)?;
    let view = SessionView::from(&session);
    state.sessions.insert(session).await;

    tracing::info!(
        "Session {} started for {}: {} of {} questions",
        view.session_id,
        claims.sub,
        view.total,
        pool_size
    );

    Ok((StatusCode::CREATED, Json(view)))
}

/// Returns the current question of a session.
pub async fn get_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    with_session(&state, &id, &claims, |_| Ok(())).await
}

/// Records the selected option for the current question, replacing any earlier one.
pub async fn answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    with_session(&state, &id, &claims, |s| Ok(s.select(&req.option)?)).await
}

pub async fn next(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    with_session(&state, &id, &claims, |s| s.next().map(|_| ()).map_err(AppError::from)).await
}

pub async fn previous(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    with_session(&state, &id, &claims, |s| s.previous().map(|_| ()).map_err(AppError::from))
        .await
}

/// Scores the session and appends the report to the caller's slot.
///
/// The session is frozen in `Submitting` while the report is written, so a
/// second submission is rejected without keeping the registry locked
/// during the write. If the write fails the session reopens for another try.
pub async fn submit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let (report, questions) = {
        let mut guard = state.sessions.lock().await;
        let session = guard.get_mut(&id, &claims.sub).ok_or_else(session_not_found)?;
        let report = session.begin_submit(Utc::now())?;
        (report, session.questions().to_vec())
    };

    if let Err(e) = state.reports.save(&claims.sub, &report).await {
        if let Some(session) = state.sessions.lock().await.get_mut(&id, &claims.sub) {
            session.abort_submit();
        }
        return Err(e.into());
    }

    {
        let mut guard = state.sessions.lock().await;
        if let Some(session) = guard.get_mut(&id, &claims.sub) {
            session.finish_submit()?;
        }
        guard.remove(&id, &claims.sub);
    }

    tracing::info!(
        "Session {} submitted by {}: {}/{}",
        id,
        claims.sub,
        report.score,
        report.total
    );

    Ok(Json(SubmissionResponse { report, questions }))
}

/// Abandons a session. Nothing is written and the session cannot be resumed.
/// A session whose report is being written cannot be cancelled.
pub async fn cancel(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut guard = state.sessions.lock().await;
    let session = guard.get_mut(&id, &claims.sub).ok_or_else(session_not_found)?;
    if matches!(session.state(), SessionState::Submitting(_)) {
        return Err(SessionError::SubmissionInProgress.into());
    }
    guard.remove(&id, &claims.sub);
    drop(guard);

    tracing::info!("Session {} cancelled by {}", id, claims.sub);
    Ok(StatusCode::NO_CONTENT)
}
