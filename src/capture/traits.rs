// Traits for the collaborators the capture workflow drives

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::capture::animation::{Animation, Channel};
use crate::capture::errors::{CameraError, CaptureFailure};
use crate::capture::state_machine::TimerId;
use crate::capture::types::*;

/// Decision callback for barcode steps
pub trait DecodeHandler: Send {
    /// Return true when the scan satisfies the step
    fn on_decode(&mut self, scan: &BarcodeScan) -> bool;
}

impl<F> DecodeHandler for F
where
    F: FnMut(&BarcodeScan) -> bool + Send,
{
    fn on_decode(&mut self, scan: &BarcodeScan) -> bool {
        self(scan)
    }
}

/// Receives the photo taken by a photo step
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PhotoSink: Send + Sync {
    async fn on_captured(&self, photo: CapturedPhoto) -> Result<()>;
}

/// Camera capability
#[async_trait]
pub trait Camera: Send + Sync {
    /// Take a single photo
    async fn take_photo(&self, options: ShotOptions) -> Result<ImageRef, CameraError>;

    /// Resume a preview paused after a shot
    fn resume_preview(&self) -> Result<(), CameraError>;

    /// Focus hint at a normalized point
    fn focus_at(&self, point: FocusPoint);

    /// Switch the flash mode
    fn set_flash(&self, mode: FlashState);

    /// Whether the device is an emulator
    fn is_emulated(&self) -> bool;
}

/// Rendering side of the animation contract
#[async_trait]
pub trait Animator: Send + Sync {
    /// Play every track of the group in parallel, resolving once all settle
    async fn play(&self, animation: &Animation);

    /// Current progress of a channel, for rendering reads only
    fn value(&self, channel: Channel) -> f32;
}

/// One-shot timers that re-enter the workflow when they fire
pub trait Scheduler: Send {
    fn schedule(&mut self, id: TimerId, after: Duration);

    fn cancel(&mut self, id: TimerId);

    fn cancel_all(&mut self);

    /// Timers scheduled and neither fired nor cancelled
    fn outstanding(&self) -> usize;
}

/// Host notifications
#[cfg_attr(test, automock)]
pub trait SessionHost: Send + Sync {
    fn on_step_completed(&self, record: &StepRecord);

    fn on_capture_failure(&self, failure: &CaptureFailure);

    /// Called exactly once when the last step completes; never on teardown
    fn on_finished(&self);
}
