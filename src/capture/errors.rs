use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid step list; the session refuses to start
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepConfigError {
    #[error("capture outline cannot set both a height fraction and a width fraction")]
    AmbiguousOutline,
    #[error("capture outline needs either a height fraction or a width fraction")]
    MissingOutlineExtent,
    #[error("outline fraction must be within (0, 1], got {0}")]
    InvalidFraction(f32),
    #[error("outline aspect ratio must be positive, got {0}")]
    InvalidAspectRatio(f32),
    #[error("capture step list is empty")]
    EmptyStepList,
    #[error("duplicate capture step id: {0}")]
    DuplicateStepId(String),
}

/// Failure reported by the camera collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("camera is not mounted")]
    NotMounted,
    #[error("camera preview is not paused")]
    PreviewNotPaused,
    #[error("photo capture failed: {0}")]
    ShotFailed(String),
}

/// Capture problem surfaced to the host; the workflow itself recovers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum CaptureFailure {
    #[error("step {step_id}: camera failed to take a photo: {reason}")]
    Camera { step_id: String, reason: String },
    #[error("step {step_id}: captured photo could not be stored: {reason}")]
    Storage { step_id: String, reason: String },
}

/// Errors raised while building a capture session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid capture step configuration: {0}")]
    Config(#[from] StepConfigError),
    #[error("capture session is missing its {0} collaborator")]
    MissingCollaborator(&'static str),
}
