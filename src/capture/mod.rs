// Capture Module - guided multi-step camera workflow
//
// The workflow is a pure state machine (`state_machine`) driven by a session
// (`session`) that executes effects against injected collaborators.

pub mod types;
pub mod errors;
pub mod traits;
pub mod animation;
pub mod state_machine;
pub mod scheduler;
pub mod session;
pub mod simulated;

#[cfg(test)]
pub mod mocks;

#[cfg(test)]
mod tests;

pub use errors::{CameraError, CaptureFailure, SessionError, StepConfigError};
pub use session::{CaptureSession, SessionHandle, SessionOutcome, SessionReport};
pub use state_machine::{CaptureView, Effect, EngineState, Event, Timings, WorkflowMachine};
pub use types::{
    BarcodeScan, CaptureStep, CapturedPhoto, FlashPolicy, FlashState, FocusPoint, ImageRef,
    Outline, OutlineExtent, Phase, StepOutcome, StepRecord, Symbology,
};
