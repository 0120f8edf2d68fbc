// src/repository/postgres.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json};

use crate::{
    error::AppError,
    models::{
        catalog::{CatalogNode, ExamScope, LessonRef, Level},
        question::{NewQuestion, QuestionDocument},
    },
    repository::ContentRepository,
};

/// `ContentRepository` backed by the PostgreSQL tables in `migrations/`.
#[derive(Clone)]
pub struct PgContentRepository {
    pool: PgPool,
}

impl PgContentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps constraint violations on insert to user-facing errors.
fn map_insert_error(e: sqlx::Error, level: &Level, id: &str) -> AppError {
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() {
            return AppError::Conflict(format!("{} '{}' already exists", level.label(), id));
        }
        if db.is_foreign_key_violation() {
            return AppError::NotFound("Parent not found".to_string());
        }
    }
    tracing::error!("Failed to create {}: {:?}", level.label(), e);
    AppError::InternalServerError(e.to_string())
}

#[async_trait]
impl ContentRepository for PgContentRepository {
    async fn list_nodes(&self, level: &Level) -> Result<Vec<CatalogNode>, AppError> {
        let nodes = match level {
            Level::Classes => {
                sqlx::query_as::<_, CatalogNode>("SELECT id, name FROM classes ORDER BY id")
                    .fetch_all(&self.pool)
                    .await
            }
            Level::Subjects { class } => {
                sqlx::query_as::<_, CatalogNode>(
                    "SELECT id, name FROM subjects WHERE class_id = $1 ORDER BY id",
                )
                .bind(class)
                .fetch_all(&self.pool)
                .await
            }
            Level::Lessons { class, subject } => {
                sqlx::query_as::<_, CatalogNode>(
                    "SELECT id, name FROM lessons WHERE class_id = $1 AND subject_id = $2 ORDER BY id",
                )
                .bind(class)
                .bind(subject)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| {
            tracing::error!("Failed to list {}: {:?}", level.label(), e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(nodes)
    }

    async fn create_node(&self, level: &Level, id: &str, name: &str) -> Result<(), AppError> {
        let query = match level {
            Level::Classes => sqlx::query("INSERT INTO classes (id, name) VALUES ($1, $2)")
                .bind(id)
                .bind(name),
            Level::Subjects { class } => {
                sqlx::query("INSERT INTO subjects (class_id, id, name) VALUES ($1, $2, $3)")
                    .bind(class)
                    .bind(id)
                    .bind(name)
            }
            Level::Lessons { class, subject } => sqlx::query(
                "INSERT INTO lessons (class_id, subject_id, id, name) VALUES ($1, $2, $3, $4)",
            )
            .bind(class)
            .bind(subject)
            .bind(id)
            .bind(name),
        };

        query
            .execute(&self.pool)
            .await
            .map_err(|e| map_insert_error(e, level, id))?;

        Ok(())
    }

    async fn rename_node(&self, level: &Level, id: &str, name: &str) -> Result<bool, AppError> {
        let query = match level {
            Level::Classes => sqlx::query("UPDATE classes SET name = $1 WHERE id = $2")
                .bind(name)
                .bind(id),
            Level::Subjects { class } => {
                sqlx::query("UPDATE subjects SET name = $1 WHERE class_id = $2 AND id = $3")
                    .bind(name)
                    .bind(class)
                    .bind(id)
            }
            Level::Lessons { class, subject } => sqlx::query(
                "UPDATE lessons SET name = $1 WHERE class_id = $2 AND subject_id = $3 AND id = $4",
            )
            .bind(name)
            .bind(class)
            .bind(subject)
            .bind(id),
        };

        let result = query.execute(&self.pool).await.map_err(|e| {
            tracing::error!("Failed to rename {}: {:?}", level.label(), e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_node(&self, level: &Level, id: &str) -> Result<bool, AppError> {
        // Descendants go with ON DELETE CASCADE.
        let query = match level {
            Level::Classes => sqlx::query("DELETE FROM classes WHERE id = $1").bind(id),
            Level::Subjects { class } => {
                sqlx::query("DELETE FROM subjects WHERE class_id = $1 AND id = $2")
                    .bind(class)
                    .bind(id)
            }
            Level::Lessons { class, subject } => sqlx::query(
                "DELETE FROM lessons WHERE class_id = $1 AND subject_id = $2 AND id = $3",
            )
            .bind(class)
            .bind(subject)
            .bind(id),
        };

        let result = query.execute(&self.pool).await.map_err(|e| {
            tracing::error!("Failed to delete {}: {:?}", level.label(), e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_questions(
        &self,
        lesson: &LessonRef,
        questions: &[NewQuestion],
    ) -> Result<usize, AppError> {
        if questions.is_empty() {
            return Ok(0);
        }

        // Single multi-row INSERT, so the batch lands entirely or not at all.
        let mut query_builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO questions (class_id, subject_id, lesson_id, question, options, \
             correct_answer, explanation, difficulty_level, image_url) ",
        );
        query_builder.push_values(questions, |mut row, q| {
            row.push_bind(lesson.class.clone())
                .push_bind(lesson.subject.clone())
                .push_bind(lesson.lesson.clone())
                .push_bind(q.question.clone())
                .push_bind(Json(q.options.clone()))
                .push_bind(q.correct_answer.clone())
                .push_bind(q.explanation.clone())
                .push_bind(q.difficulty.as_str())
                .push_bind(q.image_url.clone());
        });

        let result = query_builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| match e.as_database_error() {
                Some(db) if db.is_foreign_key_violation() => {
                    AppError::NotFound("Lesson not found".to_string())
                }
                _ => {
                    tracing::error!("Failed to insert questions: {:?}", e);
                    AppError::InternalServerError(e.to_string())
                }
            })?;

        Ok(result.rows_affected() as usize)
    }

    async fn fetch_questions(&self, scope: &ExamScope) -> Result<Vec<QuestionDocument>, AppError> {
        let docs = sqlx::query_as::<_, QuestionDocument>(
            r#"
            SELECT
                id,
                lesson_id,
                question,
                options,
                correct_answer,
                explanation,
                difficulty_level,
                image_url
            FROM questions
            WHERE class_id = $1
              AND subject_id = $2
              AND (cardinality($3::TEXT[]) = 0 OR lesson_id = ANY($3))
            ORDER BY id
            "#,
        )
        .bind(&scope.class)
        .bind(&scope.subject)
        .bind(&scope.lessons)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch questions: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(docs)
    }
}
