// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    repository::ContentRepository,
    session::SessionRegistry,
    source::{FallbackBundle, QuestionSource},
    store::ReportStore,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub content: Arc<dyn ContentRepository>,
    pub questions: QuestionSource,
    pub reports: Arc<dyn ReportStore>,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    /// Wires the question source to the same repository the admin routes write to.
    pub fn new(
        config: Config,
        content: Arc<dyn ContentRepository>,
        fallback: FallbackBundle,
        reports: Arc<dyn ReportStore>,
    ) -> Self {
        Self {
            config,
            questions: QuestionSource::new(content.clone(), fallback),
            content,
            reports,
            sessions: Arc::new(SessionRegistry::new()),
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<dyn ContentRepository> {
    fn from_ref(state: &AppState) -> Self {
        state.content.clone()
    }
}

impl FromRef<AppState> for Arc<dyn ReportStore> {
    fn from_ref(state: &AppState) -> Self {
        state.reports.clone()
    }
}
