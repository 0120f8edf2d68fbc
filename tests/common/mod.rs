// tests/common/mod.rs

#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicI64, Ordering},
    },
};

use async_trait::async_trait;
use exam_portal::{
    config::Config,
    error::AppError,
    models::{
        catalog::{CatalogNode, ExamScope, LessonRef, Level},
        question::{NewQuestion, QuestionDocument},
        report::Report,
    },
    repository::ContentRepository,
    routes,
    source::FallbackBundle,
    state::AppState,
    store::{MemoryReportStore, ReportStore, StoreError},
    utils::jwt::Claims,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use sqlx::types::Json;
use tokio::sync::{Mutex, Notify};

pub const JWT_SECRET: &str = "test_secret_for_integration_tests";

type Parent = (String, String);

/// Content repository kept in memory, with a switch to make fetches fail.
#[derive(Default)]
pub struct MemoryContentRepository {
    nodes: Mutex<BTreeMap<Parent, BTreeMap<String, String>>>,
    questions: Mutex<Vec<(LessonRef, QuestionDocument)>>,
    next_id: AtomicI64,
    fail_fetch: AtomicBool,
}

impl MemoryContentRepository {
    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }
}

fn parent_of(level: &Level) -> Parent {
    match level {
        Level::Classes => (String::new(), String::new()),
        Level::Subjects { class } => (class.clone(), String::new()),
        Level::Lessons { class, subject } => (class.clone(), subject.clone()),
    }
}

/// The level a node's parent lives in, and the parent's id.
fn grandparent_of(level: &Level) -> Option<(Parent, String)> {
    match level {
        Level::Classes => None,
        Level::Subjects { class } => Some(((String::new(), String::new()), class.clone())),
        Level::Lessons { class, subject } => Some(((class.clone(), String::new()), subject.clone())),
    }
}

#[async_trait]
impl ContentRepository for MemoryContentRepository {
    async fn list_nodes(&self, level: &Level) -> Result<Vec<CatalogNode>, AppError> {
        let nodes = self.nodes.lock().await;
        Ok(nodes
            .get(&parent_of(level))
            .map(|children| {
                children
                    .iter()
                    .map(|(id, name)| CatalogNode {
                        id: id.clone(),
                        name: name.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create_node(&self, level: &Level, id: &str, name: &str) -> Result<(), AppError> {
        let mut nodes = self.nodes.lock().await;
        if let Some((gp, parent_id)) = grandparent_of(level) {
            let parent_exists = nodes.get(&gp).is_some_and(|c| c.contains_key(&parent_id));
            if !parent_exists {
                return Err(AppError::NotFound("Parent not found".to_string()));
            }
        }
        let children = nodes.entry(parent_of(level)).or_default();
        if children.contains_key(id) {
            return Err(AppError::Conflict(format!("{} '{}' already exists", level.label(), id)));
        }
        children.insert(id.to_string(), name.to_string());
        Ok(())
    }

    async fn rename_node(&self, level: &Level, id: &str, name: &str) -> Result<bool, AppError> {
        let mut nodes = self.nodes.lock().await;
        match nodes.get_mut(&parent_of(level)).and_then(|c| c.get_mut(id)) {
            Some(existing) => {
                *existing = name.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_node(&self, level: &Level, id: &str) -> Result<bool, AppError> {
        let mut nodes = self.nodes.lock().await;
        let removed = nodes
            .get_mut(&parent_of(level))
            .and_then(|c| c.remove(id))
            .is_some();
        if !removed {
            return Ok(false);
        }

        let mut questions = self.questions.lock().await;
        match level {
            Level::Classes => {
                nodes.retain(|(class, _), _| class != id);
                questions.retain(|(l, _)| l.class != id);
            }
            Level::Subjects { class } => {
                nodes.remove(&(class.clone(), id.to_string()));
                questions.retain(|(l, _)| !(l.class == *class && l.subject == id));
            }
            Level::Lessons { class, subject } => {
                questions.retain(|(l, _)| {
                    !(l.class == *class && l.subject == *subject && l.lesson == id)
                });
            }
        }
        Ok(true)
    }

    async fn insert_questions(
        &self,
        lesson: &LessonRef,
        new_questions: &[NewQuestion],
    ) -> Result<usize, AppError> {
        let nodes = self.nodes.lock().await;
        let exists = nodes
            .get(&(lesson.class.clone(), lesson.subject.clone()))
            .is_some_and(|c| c.contains_key(&lesson.lesson));
        if !exists {
            return Err(AppError::NotFound("Lesson not found".to_string()));
        }

        let mut questions = self.questions.lock().await;
        for q in new_questions {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            questions.push((
                lesson.clone(),
                QuestionDocument {
                    id,
                    lesson_id: lesson.lesson.clone(),
                    question: q.question.clone(),
                    options: Json(q.options.clone()),
                    correct_answer: q.correct_answer.clone(),
                    explanation: q.explanation.clone(),
                    difficulty_level: q.difficulty.as_str().to_string(),
                    image_url: q.image_url.clone(),
                },
            ));
        }
        Ok(new_questions.len())
    }

    async fn fetch_questions(&self, scope: &ExamScope) -> Result<Vec<QuestionDocument>, AppError> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(AppError::InternalServerError("connection refused".to_string()));
        }
        let questions = self.questions.lock().await;
        Ok(questions
            .iter()
            .filter(|(l, _)| l.class == scope.class && l.subject == scope.subject)
            .filter(|(l, _)| scope.includes_lesson(&l.lesson))
            .map(|(_, doc)| doc.clone())
            .collect())
    }
}

/// Report store whose writes wait until `release` is called.
#[derive(Default)]
pub struct GatedReportStore {
    inner: MemoryReportStore,
    entered: Notify,
    released: Notify,
}

impl GatedReportStore {
    /// Resolves once a write has started.
    pub async fn wait_for_write(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.released.notify_one();
    }
}

#[async_trait]
impl ReportStore for GatedReportStore {
    async fn save(&self, student: &str, report: &Report) -> Result<(), StoreError> {
        self.entered.notify_one();
        self.released.notified().await;
        self.inner.save(student, report).await
    }

    async fn load_all(&self, student: &str) -> Vec<Report> {
        self.inner.load_all(student).await
    }
}

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub content: Arc<MemoryContentRepository>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}

/// Issues a token the way the identity provider does.
pub fn token(subject: &str, role: &str) -> String {
    let claims = Claims {
        sub: subject.to_string(),
        role: role.to_string(),
        exp: (chrono::Utc::now().timestamp() + 600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("Failed to sign token")
}

pub fn bearer(subject: &str) -> String {
    format!("Bearer {}", token(subject, "student"))
}

pub fn admin_bearer() -> String {
    format!("Bearer {}", token("admin", "admin"))
}

/// Spawns the app on a random port with an in-memory report store.
pub async fn spawn_app() -> TestApp {
    spawn_app_with_store(Arc::new(MemoryReportStore::new())).await
}

/// Spawns the app on a random port for testing.
pub async fn spawn_app_with_store(reports: Arc<dyn ReportStore>) -> TestApp {
    let config = Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        rust_log: "error".to_string(),
        reports_dir: PathBuf::from("unused"),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
    };

    let content = Arc::new(MemoryContentRepository::default());
    let fallback = FallbackBundle::bundled().expect("Bundled questions must parse");
    let state = AppState::new(config, content.clone(), fallback, reports);
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        client: reqwest::Client::new(),
        content,
    }
}

/// Creates class/subject/lesson and uploads `count` questions whose answer is "A".
pub async fn seed_lesson(app: &TestApp, class: &str, subject: &str, lesson: &str, count: usize) {
    let admin = admin_bearer();
    let steps = [
        ("/api/admin/classes".to_string(), class),
        (format!("/api/admin/classes/{}/subjects", class), subject),
        (
            format!("/api/admin/classes/{}/subjects/{}/lessons", class, subject),
            lesson,
        ),
    ];
    for (path, name) in steps {
        let status = app
            .client
            .post(app.url(&path))
            .header("Authorization", &admin)
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await
            .expect("Failed to create node")
            .status()
            .as_u16();
        assert!(status == 201 || status == 409, "unexpected status {}", status);
    }

    let questions: Vec<serde_json::Value> = (0..count)
        .map(|i| {
            serde_json::json!({
                "question": format!("{} question {}", lesson, i),
                "options": ["A", "B", "C", "D"],
                "answer": "A",
                "explanation": "A is right",
                "difficulty": "easy"
            })
        })
        .collect();

    let resp = app
        .client
        .post(app.url(&format!(
            "/api/admin/classes/{}/subjects/{}/lessons/{}/questions",
            class, subject, lesson
        )))
        .header("Authorization", &admin)
        .json(&questions)
        .send()
        .await
        .expect("Failed to upload questions");
    assert_eq!(resp.status().as_u16(), 201);
}
