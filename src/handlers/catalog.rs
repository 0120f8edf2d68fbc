// src/handlers/catalog.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{error::AppError, models::catalog::Level, repository::ContentRepository};

/// Lists all classes.
pub async fn list_classes(
    State(repo): State<Arc<dyn ContentRepository>>,
) -> Result<impl IntoResponse, AppError> {
    let classes = repo.list_nodes(&Level::Classes).await?;
    Ok(Json(classes))
}

/// Lists the subjects of a class.
pub async fn list_subjects(
    State(repo): State<Arc<dyn ContentRepository>>,
    Path(class): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let subjects = repo.list_nodes(&Level::Subjects { class }).await?;
    Ok(Json(subjects))
}

/// Lists the lessons of a subject. Exam setup offers these as the optional lesson filter.
pub async fn list_lessons(
    State(repo): State<Arc<dyn ContentRepository>>,
    Path((class, subject)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let lessons = repo.list_nodes(&Level::Lessons { class, subject }).await?;
    Ok(Json(lessons))
}
