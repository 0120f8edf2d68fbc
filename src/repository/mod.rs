// src/repository/mod.rs

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        catalog::{CatalogNode, ExamScope, LessonRef, Level},
        question::{NewQuestion, QuestionDocument},
    },
};

pub mod postgres;

pub use postgres::PgContentRepository;

/// The hierarchical content store: classes → subjects → lessons → questions.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Lists the nodes of one level, ordered by id.
    async fn list_nodes(&self, level: &Level) -> Result<Vec<CatalogNode>, AppError>;

    /// Creates a node. Fails with `Conflict` if the id is taken and
    /// `NotFound` if the parent does not exist.
    async fn create_node(&self, level: &Level, id: &str, name: &str) -> Result<(), AppError>;

    /// Returns false if no such node exists.
    async fn rename_node(&self, level: &Level, id: &str, name: &str) -> Result<bool, AppError>;

    /// Deletes a node and everything below it. Returns false if no such node exists.
    async fn delete_node(&self, level: &Level, id: &str) -> Result<bool, AppError>;

    /// Inserts a batch atomically and returns how many were stored.
    async fn insert_questions(
        &self,
        lesson: &LessonRef,
        questions: &[NewQuestion],
    ) -> Result<usize, AppError>;

    /// Raw question documents for a scope, in insertion order.
    async fn fetch_questions(&self, scope: &ExamScope) -> Result<Vec<QuestionDocument>, AppError>;
}
