// src/handlers/reports.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, response::IntoResponse};

use crate::{error::AppError, store::ReportStore, utils::jwt::Claims};

/// Lists the caller's past reports, oldest first.
/// An unreadable slot shows up as an empty history.
pub async fn list_reports(
    State(store): State<Arc<dyn ReportStore>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let reports = store.load_all(&claims.sub).await;
    Ok(Json(reports))
}
