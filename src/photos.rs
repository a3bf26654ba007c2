// Captured photo log

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::capture::traits::PhotoSink;
use crate::capture::types::CapturedPhoto;
use crate::paths::PathSubstitutions;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoItem {
    /// Stored in reduced `{{Symbol}}` form
    pub photo_file_path: String,
    pub lot_number: Option<String>,
    pub captured_at: DateTime<Utc>,
}

/// In-memory list of captured photos, newest last
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhotoLog {
    items: Vec<PhotoItem>,
}

impl PhotoLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, item: PhotoItem) {
        self.items.push(item);
    }

    /// Remove every item with this path; returns how many went
    pub fn delete(&mut self, photo_file_path: &str) -> usize {
        let before = self.items.len();
        self.items
            .retain(|item| item.photo_file_path != photo_file_path);
        before - self.items.len()
    }

    pub fn items(&self) -> &[PhotoItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Photo sink that appends to a shared log, tagging each photo with the lot
/// number accepted earlier in the session
#[derive(Debug, Clone)]
pub struct PhotoLogSink {
    log: Arc<Mutex<PhotoLog>>,
    lot_number: Arc<Mutex<Option<String>>>,
    paths: PathSubstitutions,
}

impl PhotoLogSink {
    pub fn new(
        log: Arc<Mutex<PhotoLog>>,
        lot_number: Arc<Mutex<Option<String>>>,
        paths: PathSubstitutions,
    ) -> Self {
        Self {
            log,
            lot_number,
            paths,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[async_trait]
impl PhotoSink for PhotoLogSink {
    async fn on_captured(&self, photo: CapturedPhoto) -> Result<()> {
        let item = PhotoItem {
            photo_file_path: self.paths.reduce(photo.image.as_str()),
            lot_number: lock(&self.lot_number).clone(),
            captured_at: photo.captured_at,
        };
        info!(
            step_id = %photo.step_id,
            path = %item.photo_file_path,
            lot = ?item.lot_number,
            "Photo logged"
        );
        lock(&self.log).add(item);
        Ok(())
    }
}
