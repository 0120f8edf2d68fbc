// src/handlers/admin.rs

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    config::MAX_UPLOAD_QUESTIONS,
    error::AppError,
    models::{
        catalog::{CreateNodeRequest, LessonRef, Level, RenameNodeRequest},
        question::{NewQuestion, UploadQuestion},
    },
    repository::ContentRepository,
};

type Repo = Arc<dyn ContentRepository>;

async fn create_node(
    repo: &Repo,
    level: Level,
    payload: CreateNodeRequest,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name cannot be blank".to_string()));
    }

    repo.create_node(&level, name, name).await?;
    tracing::info!("{} '{}' created", level.label(), name);

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": name }))))
}

async fn rename_node(
    repo: &Repo,
    level: Level,
    id: &str,
    payload: RenameNodeRequest,
) -> Result<StatusCode, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name cannot be blank".to_string()));
    }

    if !repo.rename_node(&level, id, name).await? {
        return Err(AppError::NotFound(format!("{} not found", level.label())));
    }
    Ok(StatusCode::OK)
}

async fn delete_node(repo: &Repo, level: Level, id: &str) -> Result<StatusCode, AppError> {
    if !repo.delete_node(&level, id).await? {
        return Err(AppError::NotFound(format!("{} not found", level.label())));
    }
    tracing::info!("{} '{}' deleted", level.label(), id);
    Ok(StatusCode::NO_CONTENT)
}

/// Creates a class. Admin only.
pub async fn create_class(
    State(repo): State<Repo>,
    Json(payload): Json<CreateNodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    create_node(&repo, Level::Classes, payload).await
}

pub async fn rename_class(
    State(repo): State<Repo>,
    Path(id): Path<String>,
    Json(payload): Json<RenameNodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    rename_node(&repo, Level::Classes, &id, payload).await
}

/// Deletes a class with all its subjects, lessons and questions.
pub async fn delete_class(
    State(repo): State<Repo>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    delete_node(&repo, Level::Classes, &id).await
}

pub async fn create_subject(
    State(repo): State<Repo>,
    Path(class): Path<String>,
    Json(payload): Json<CreateNodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    create_node(&repo, Level::Subjects { class }, payload).await
}

pub async fn rename_subject(
    State(repo): State<Repo>,
    Path((class, id)): Path<(String, String)>,
    Json(payload): Json<RenameNodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    rename_node(&repo, Level::Subjects { class }, &id, payload).await
}

pub async fn delete_subject(
    State(repo): State<Repo>,
    Path((class, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    delete_node(&repo, Level::Subjects { class }, &id).await
}

pub async fn create_lesson(
    State(repo): State<Repo>,
    Path((class, subject)): Path<(String, String)>,
    Json(payload): Json<CreateNodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    create_node(&repo, Level::Lessons { class, subject }, payload).await
}

pub async fn rename_lesson(
    State(repo): State<Repo>,
    Path((class, subject, id)): Path<(String, String, String)>,
    Json(payload): Json<RenameNodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    rename_node(&repo, Level::Lessons { class, subject }, &id, payload).await
}

pub async fn delete_lesson(
    State(repo): State<Repo>,
    Path((class, subject, id)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, AppError> {
    delete_node(&repo, Level::Lessons { class, subject }, &id).await
}

/// Parses and validates an upload body. Any bad element rejects the whole batch.
pub fn parse_upload(body: &[u8]) -> Result<Vec<NewQuestion>, AppError> {
    let parsed: serde_json::Value = serde_json::from_slice(body)
        .map_err(|_| AppError::BadRequest("Invalid JSON".to_string()))?;

    let serde_json::Value::Array(items) = parsed else {
        return Err(AppError::BadRequest("File should be an array".to_string()));
    };
    if items.is_empty() {
        return Err(AppError::BadRequest("File contains no questions".to_string()));
    }
    if items.len() > MAX_UPLOAD_QUESTIONS {
        return Err(AppError::BadRequest(format!(
            "At most {} questions per upload",
            MAX_UPLOAD_QUESTIONS
        )));
    }

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value::<UploadQuestion>(item)
                .map_err(|e| e.to_string())
                .and_then(UploadQuestion::into_new_question)
                .map_err(|e| {
                    AppError::BadRequest(format!("Invalid question schema at index {}: {}", i, e))
                })
        })
        .collect()
}

/// Uploads a JSON array of questions into a lesson. Admin only.
pub async fn upload_questions(
    State(repo): State<Repo>,
    Path((class, subject, lesson)): Path<(String, String, String)>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let questions = parse_upload(&body)?;
    let lesson = LessonRef {
        class,
        subject,
        lesson,
    };

    let inserted = repo.insert_questions(&lesson, &questions).await?;
    tracing::info!(
        "Uploaded {} questions into {}/{}/{}",
        inserted,
        lesson.class,
        lesson.subject,
        lesson.lesson
    );

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "inserted": inserted })),
    ))
}
