// Capture Guide Library - guided barcode and photo capture workflow
// This exposes the core components for testing and integration

pub mod barcode;
pub mod capture;
pub mod checksum;
pub mod cli;
pub mod config;
pub mod kit;
pub mod paths;
pub mod photos;
pub mod telemetry;

// Re-export key types for easy access
pub use barcode::{lot_number_from_payload, validate_lot_number, LotNumberError, LotNumberScanner};
pub use capture::{
    CaptureSession, CaptureStep, CaptureView, Phase, SessionHandle, SessionReport, StepRecord,
    Timings, WorkflowMachine,
};
pub use checksum::{append_check_digit, compute_check_digit, validate};
pub use config::{config, init_config, CaptureGuideConfig};
pub use paths::PathSubstitutions;
pub use photos::{PhotoItem, PhotoLog};
pub use telemetry::{create_operation_span, generate_session_id, init_telemetry};
