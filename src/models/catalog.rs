// src/models/catalog.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A class, subject or lesson in the content hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CatalogNode {
    pub id: String,
    pub name: String,
}

/// Which list of the hierarchy an operation addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Level {
    Classes,
    Subjects { class: String },
    Lessons { class: String, subject: String },
}

impl Level {
    pub fn label(&self) -> &'static str {
        match self {
            Level::Classes => "Class",
            Level::Subjects { .. } => "Subject",
            Level::Lessons { .. } => "Lesson",
        }
    }
}

/// Address of a single lesson.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LessonRef {
    pub class: String,
    pub subject: String,
    pub lesson: String,
}

/// The slice of the question collection an exam is drawn from.
/// An empty `lessons` list means every lesson of the subject.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
pub struct ExamScope {
    #[validate(length(min = 1, max = 100))]
    pub class: String,
    #[validate(length(min = 1, max = 100))]
    pub subject: String,
    #[serde(default)]
    pub lessons: Vec<String>,
}

impl ExamScope {
    pub fn includes_lesson(&self, lesson: &str) -> bool {
        self.lessons.is_empty() || self.lessons.iter().any(|l| l == lesson)
    }
}

/// DTO for creating a catalog node. The name doubles as the node id.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateNodeRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters."))]
    pub name: String,
}

/// DTO for renaming a catalog node.
#[derive(Debug, Deserialize, Validate)]
pub struct RenameNodeRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters."))]
    pub name: String,
}
