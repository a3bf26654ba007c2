// Core types for guided capture steps

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capture::errors::StepConfigError;
use crate::capture::traits::{DecodeHandler, PhotoSink};

/// Barcode symbologies a step can ask the decoder for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbology {
    Qr,
    DataMatrix,
    Pdf417,
    Aztec,
    Code128,
    Code39,
    Ean13,
    Ean8,
    UpcA,
    UpcE,
}

/// How the camera flash is driven while a step is on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashPolicy {
    /// User cycles the flash state with a toggle
    Manual,
    AlwaysOn,
    AlwaysOff,
    #[default]
    Auto,
}

/// Flash state exposed to the user under the manual policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashState {
    On,
    Off,
    Auto,
}

impl FlashState {
    /// Next state in the `Off -> On -> Auto -> Off` cycle
    pub fn cycled(self) -> Self {
        match self {
            FlashState::Off => FlashState::On,
            FlashState::On => FlashState::Auto,
            FlashState::Auto => FlashState::Off,
        }
    }
}

impl FlashPolicy {
    /// Flash mode the camera should use for this policy
    pub fn effective(self, manual_state: FlashState) -> FlashState {
        match self {
            FlashPolicy::Manual => manual_state,
            FlashPolicy::AlwaysOn => FlashState::On,
            FlashPolicy::AlwaysOff => FlashState::Off,
            FlashPolicy::Auto => FlashState::Auto,
        }
    }
}

/// Which viewport dimension drives the outline size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlineExtent {
    /// Fraction of the viewport height
    Height(f32),
    /// Fraction of the viewport width
    Width(f32),
}

/// Capture area drawn over the viewfinder
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    aspect_ratio: f32,
    extent: OutlineExtent,
}

/// Pixel size of an outline frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: f32,
    pub height: f32,
}

impl Outline {
    pub fn new(aspect_ratio: f32, extent: OutlineExtent) -> Result<Self, StepConfigError> {
        if !aspect_ratio.is_finite() || aspect_ratio <= 0.0 {
            return Err(StepConfigError::InvalidAspectRatio(aspect_ratio));
        }
        let fraction = match extent {
            OutlineExtent::Height(f) | OutlineExtent::Width(f) => f,
        };
        if !fraction.is_finite() || fraction <= 0.0 || fraction > 1.0 {
            return Err(StepConfigError::InvalidFraction(fraction));
        }
        Ok(Self {
            aspect_ratio,
            extent,
        })
    }

    /// Build an outline from optional height/width fractions.
    ///
    /// Exactly one fraction must be present.
    pub fn from_fractions(
        aspect_ratio: f32,
        height_fraction: Option<f32>,
        width_fraction: Option<f32>,
    ) -> Result<Self, StepConfigError> {
        let extent = match (height_fraction, width_fraction) {
            (Some(h), None) => OutlineExtent::Height(h),
            (None, Some(w)) => OutlineExtent::Width(w),
            (Some(_), Some(_)) => return Err(StepConfigError::AmbiguousOutline),
            (None, None) => return Err(StepConfigError::MissingOutlineExtent),
        };
        Self::new(aspect_ratio, extent)
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn extent(&self) -> OutlineExtent {
        self.extent
    }

    /// Frame size inside a viewport of the given pixel dimensions
    pub fn frame(&self, viewport_width: f32, viewport_height: f32) -> FrameSize {
        match self.extent {
            OutlineExtent::Height(h) => {
                let height = viewport_height * h;
                FrameSize {
                    width: height * self.aspect_ratio,
                    height,
                }
            }
            OutlineExtent::Width(w) => {
                let width = viewport_width * w;
                FrameSize {
                    width,
                    height: width / self.aspect_ratio,
                }
            }
        }
    }
}

/// A decode result delivered by the camera's barcode reader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarcodeScan {
    pub symbology: Symbology,
    pub data: String,
}

impl BarcodeScan {
    pub fn new(symbology: Symbology, data: impl Into<String>) -> Self {
        Self {
            symbology,
            data: data.into(),
        }
    }
}

/// Reference to an image produced by the camera
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef(pub String);

impl ImageRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Photo handed to a step's sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedPhoto {
    pub step_id: String,
    pub image: ImageRef,
    pub is_emulated: bool,
    pub captured_at: DateTime<Utc>,
}

/// Options passed to the camera for a single shot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShotOptions {
    pub quality: f32,
    pub pause_after_capture: bool,
}

impl ShotOptions {
    pub fn for_device(is_emulated: bool) -> Self {
        Self {
            quality: if is_emulated { 0.95 } else { 1.0 },
            pause_after_capture: true,
        }
    }
}

/// Normalized point inside the capture viewport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocusPoint {
    pub x: f32,
    pub y: f32,
}

impl FocusPoint {
    /// Normalize a pixel location against the viewport size
    pub fn from_viewport(x: f32, y: f32, width: f32, height: f32) -> Option<Self> {
        if width <= 0.0 || height <= 0.0 {
            return None;
        }
        let point = Self {
            x: x / width,
            y: y / height,
        };
        point.is_within_viewport().then_some(point)
    }

    pub fn is_within_viewport(&self) -> bool {
        (0.0..=1.0).contains(&self.x) && (0.0..=1.0).contains(&self.y)
    }
}

/// Phase of the workflow for the current step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Entry animation running; step-ending actions suppressed
    Entering,
    /// Step fully interactive
    Active,
    /// Accepted scan being confirmed by the success animation
    ScanConfirming,
    /// Exit animation running
    Exiting,
    /// Terminal
    Finished,
}

/// Colour state of the capture outline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlineTint {
    #[default]
    Neutral,
    Success,
}

/// How a step ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    Scanned { payload: Option<String> },
    Captured { image: ImageRef },
    Skipped,
}

/// Artifact emitted for each completed step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub index: usize,
    pub step_id: String,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// Discriminant of a step, without its callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKindTag {
    Barcode,
    Photo,
}

/// Barcode scan step
pub struct BarcodeStep {
    pub symbology: Symbology,
    pub grace_period: Option<Duration>,
    pub handler: Box<dyn DecodeHandler>,
}

impl fmt::Debug for BarcodeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BarcodeStep")
            .field("symbology", &self.symbology)
            .field("grace_period", &self.grace_period)
            .finish_non_exhaustive()
    }
}

/// Photo shot step
pub struct PhotoStep {
    pub sink: Arc<dyn PhotoSink>,
}

impl fmt::Debug for PhotoStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhotoStep").finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum StepKind {
    Barcode(BarcodeStep),
    Photo(PhotoStep),
}

/// One unit of the guided sequence
#[derive(Debug)]
pub struct CaptureStep {
    pub id: String,
    pub message: Option<String>,
    pub skippable: bool,
    pub outline: Option<Outline>,
    pub flash_policy: FlashPolicy,
    pub kind: StepKind,
}

impl CaptureStep {
    pub fn barcode(
        id: impl Into<String>,
        symbology: Symbology,
        handler: impl DecodeHandler + 'static,
    ) -> Self {
        Self::with_kind(
            id,
            StepKind::Barcode(BarcodeStep {
                symbology,
                grace_period: None,
                handler: Box::new(handler),
            }),
        )
    }

    pub fn photo(id: impl Into<String>, sink: Arc<dyn PhotoSink>) -> Self {
        Self::with_kind(id, StepKind::Photo(PhotoStep { sink }))
    }

    fn with_kind(id: impl Into<String>, kind: StepKind) -> Self {
        Self {
            id: id.into(),
            message: None,
            skippable: false,
            outline: None,
            flash_policy: FlashPolicy::default(),
            kind,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn skippable(mut self, skippable: bool) -> Self {
        self.skippable = skippable;
        self
    }

    pub fn with_outline(mut self, outline: Outline) -> Self {
        self.outline = Some(outline);
        self
    }

    pub fn with_flash(mut self, policy: FlashPolicy) -> Self {
        self.flash_policy = policy;
        self
    }

    /// Set the barcode grace period. Zero disables it; ignored on photo steps.
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        if let StepKind::Barcode(barcode) = &mut self.kind {
            barcode.grace_period = (!grace.is_zero()).then_some(grace);
        }
        self
    }

    pub fn tag(&self) -> StepKindTag {
        match self.kind {
            StepKind::Barcode(_) => StepKindTag::Barcode,
            StepKind::Photo(_) => StepKindTag::Photo,
        }
    }

    /// Callback-free description consumed by the state machine
    pub fn profile(&self) -> StepProfile {
        StepProfile {
            id: self.id.clone(),
            kind: self.tag(),
            message: self.message.clone(),
            skippable: self.skippable,
            flash_policy: self.flash_policy,
            grace_period: match &self.kind {
                StepKind::Barcode(barcode) => barcode.grace_period,
                StepKind::Photo(_) => None,
            },
        }
    }
}

/// Step data the state machine needs to drive a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepProfile {
    pub id: String,
    pub kind: StepKindTag,
    pub message: Option<String>,
    pub skippable: bool,
    pub flash_policy: FlashPolicy,
    pub grace_period: Option<Duration>,
}
