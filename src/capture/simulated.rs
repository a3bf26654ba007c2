// Simulated camera - no hardware, deterministic output

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::capture::errors::CameraError;
use crate::capture::traits::Camera;
use crate::capture::types::*;

#[derive(Debug, Default)]
struct SimulatedState {
    pending_failures: VecDeque<String>,
    shots: u32,
    preview_paused: bool,
    preview_resumes: u32,
    flash: Option<FlashState>,
    focus_points: Vec<FocusPoint>,
}

/// Camera that writes nothing and names its photos sequentially
#[derive(Debug)]
pub struct SimulatedCamera {
    output_dir: PathBuf,
    shot_latency: Duration,
    emulated: bool,
    state: Mutex<SimulatedState>,
}

impl SimulatedCamera {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            shot_latency: Duration::from_millis(120),
            emulated: true,
            state: Mutex::new(SimulatedState::default()),
        }
    }

    pub fn with_shot_latency(mut self, latency: Duration) -> Self {
        self.shot_latency = latency;
        self
    }

    pub fn with_emulated(mut self, emulated: bool) -> Self {
        self.emulated = emulated;
        self
    }

    /// Make the next shot fail with `reason`
    pub fn fail_next_shot(&self, reason: &str) {
        self.lock().pending_failures.push_back(reason.to_string());
    }

    pub fn shots_taken(&self) -> u32 {
        self.lock().shots
    }

    pub fn preview_resumes(&self) -> u32 {
        self.lock().preview_resumes
    }

    pub fn last_flash(&self) -> Option<FlashState> {
        self.lock().flash
    }

    pub fn focus_points(&self) -> Vec<FocusPoint> {
        self.lock().focus_points.clone()
    }

    fn lock(&self) -> MutexGuard<'_, SimulatedState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl Camera for SimulatedCamera {
    async fn take_photo(&self, options: ShotOptions) -> Result<ImageRef, CameraError> {
        tokio::time::sleep(self.shot_latency).await;

        let mut state = self.lock();
        if let Some(reason) = state.pending_failures.pop_front() {
            return Err(CameraError::ShotFailed(reason));
        }
        state.shots += 1;
        state.preview_paused = options.pause_after_capture;

        let path = self.output_dir.join(format!("photo-{:03}.jpg", state.shots));
        debug!(path = %path.display(), quality = options.quality, "Simulated photo taken");
        Ok(ImageRef(path.to_string_lossy().into_owned()))
    }

    fn resume_preview(&self) -> Result<(), CameraError> {
        let mut state = self.lock();
        if !state.preview_paused {
            return Err(CameraError::PreviewNotPaused);
        }
        state.preview_paused = false;
        state.preview_resumes += 1;
        Ok(())
    }

    fn focus_at(&self, point: FocusPoint) {
        self.lock().focus_points.push(point);
    }

    fn set_flash(&self, mode: FlashState) {
        self.lock().flash = Some(mode);
    }

    fn is_emulated(&self) -> bool {
        self.emulated
    }
}
