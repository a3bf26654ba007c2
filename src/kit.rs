//! The standard two-step kit workflow: scan the kit QR code, then photograph
//! the rapid diagnostic test.

use std::sync::Arc;
use std::time::Duration;

use crate::barcode::LotNumberScanner;
use crate::capture::errors::StepConfigError;
use crate::capture::traits::PhotoSink;
use crate::capture::types::{CaptureStep, FlashPolicy, Outline, OutlineExtent, Symbology};

pub const QR_STEP_ID: &str = "kit-qr";
pub const RDT_STEP_ID: &str = "rdt-photo";

/// Kit QR step; skippable so a damaged label does not block the test photo
pub fn qr_step(scanner: LotNumberScanner, grace: Duration) -> Result<CaptureStep, StepConfigError> {
    Ok(CaptureStep::barcode(QR_STEP_ID, Symbology::Qr, scanner)
        .with_message("Scan the QR code on the test kit")
        .with_outline(Outline::new(1.0, OutlineExtent::Width(0.5))?)
        .with_grace_period(grace)
        .skippable(true))
}

/// Test strip photo under a tall narrow outline with user-controlled flash
pub fn rdt_step(sink: Arc<dyn PhotoSink>) -> Result<CaptureStep, StepConfigError> {
    Ok(CaptureStep::photo(RDT_STEP_ID, sink)
        .with_message("Line the test up inside the outline and take a photo")
        .with_outline(Outline::new(0.421, OutlineExtent::Height(0.8))?)
        .with_flash(FlashPolicy::Manual))
}

pub fn kit_steps(
    scanner: LotNumberScanner,
    sink: Arc<dyn PhotoSink>,
    grace: Duration,
) -> Result<Vec<CaptureStep>, StepConfigError> {
    Ok(vec![qr_step(scanner, grace)?, rdt_step(sink)?])
}
