// src/store.rs

//! Report persistence.
//!
//! Every student owns one slot holding the JSON array of their reports.
//! The slot is read and written as a whole. Listing fails open (a missing
//! or corrupt slot is an empty history); appending never drops what is
//! already stored.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::{fs, sync::Mutex};
use url::form_urlencoded;

use crate::models::report::Report;

/// File name of a student's slot inside their directory.
pub const SLOT_FILE: &str = "exam_reports.json";

/// Longest path component a slot directory is split into.
const SLOT_SEGMENT_LEN: usize = 200;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid report slot '{0}'")]
    InvalidSlot(String),

    #[error("failed to serialize reports: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("report storage failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Append-only store of completed exam reports, one slot per student.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Appends `report` to the student's slot.
    async fn save(&self, student: &str, report: &Report) -> Result<(), StoreError>;

    /// All of the student's reports, oldest first.
    async fn load_all(&self, student: &str) -> Vec<Report>;
}

/// Relative directory of a student's slot.
///
/// The key is percent-encoded (dots included), so every non-empty key maps
/// to its own path and none can climb out of the store root. Keys longer
/// than one path component are split over nested directories.
pub fn slot_dir(student: &str) -> Result<PathBuf, StoreError> {
    if student.is_empty() {
        return Err(StoreError::InvalidSlot(student.to_string()));
    }

    let encoded = form_urlencoded::byte_serialize(student.as_bytes())
        .collect::<String>()
        .replace('.', "%2E");

    Ok(encoded
        .as_bytes()
        .chunks(SLOT_SEGMENT_LEN)
        .map(|segment| String::from_utf8_lossy(segment).into_owned())
        .collect())
}

/// Stores each slot as `<root>/<encoded student>/exam_reports.json`.
pub struct JsonFileReportStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileReportStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn slot_path(&self, student: &str) -> Result<PathBuf, StoreError> {
        Ok(self.root.join(slot_dir(student)?).join(SLOT_FILE))
    }

    async fn read_slot(path: &Path) -> Vec<Report> {
        let raw = match fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read report slot {}: {}", path.display(), e);
                return Vec::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!("Report slot {} is corrupt, treating as empty: {}", path.display(), e);
            Vec::new()
        })
    }

    /// Current contents of a slot about to be rewritten.
    ///
    /// Only a missing slot counts as empty. A corrupt one is renamed to
    /// `exam_reports.json.corrupt-<millis>` first; any other read error
    /// aborts the write.
    async fn read_slot_for_append(path: &Path) -> Result<Vec<Report>, StoreError> {
        let raw = match fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&raw) {
            Ok(reports) => Ok(reports),
            Err(e) => {
                let aside =
                    path.with_extension(format!("json.corrupt-{}", Utc::now().timestamp_millis()));
                tracing::warn!(
                    "Report slot {} is corrupt ({}), moving it to {}",
                    path.display(),
                    e,
                    aside.display()
                );
                fs::rename(path, &aside).await?;
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl ReportStore for JsonFileReportStore {
    async fn save(&self, student: &str, report: &Report) -> Result<(), StoreError> {
        let path = self.slot_path(student)?;
        let _guard = self.write_lock.lock().await;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut reports = Self::read_slot_for_append(&path).await?;
        reports.push(report.clone());
        let content = serde_json::to_string(&reports)?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &path).await?;

        tracing::debug!("Saved report {} for {} ({} total)", report.id, student, reports.len());
        Ok(())
    }

    async fn load_all(&self, student: &str) -> Vec<Report> {
        match self.slot_path(student) {
            Ok(path) => Self::read_slot(&path).await,
            Err(e) => {
                tracing::warn!("{}", e);
                Vec::new()
            }
        }
    }
}

/// In-process store, for tests and embedding.
#[derive(Default)]
pub struct MemoryReportStore {
    slots: Mutex<HashMap<String, Vec<Report>>>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn save(&self, student: &str, report: &Report) -> Result<(), StoreError> {
        slot_dir(student)?;
        self.slots
            .lock()
            .await
            .entry(student.to_string())
            .or_default()
            .push(report.clone());
        Ok(())
    }

    async fn load_all(&self, student: &str) -> Vec<Report> {
        self.slots
            .lock()
            .await
            .get(student)
            .cloned()
            .unwrap_or_default()
    }
}
