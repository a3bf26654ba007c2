// Guided capture workflow state machine
//
// The engine is a pure function over an explicit state snapshot:
// `transition(state, event) -> (state, effects)`. Timers, animations and
// camera calls are returned as `Effect` descriptors and executed by the
// session driver, which feeds their completions back in as `Event`s.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::capture::animation::Animation;
use crate::capture::errors::{CaptureFailure, StepConfigError};
use crate::capture::types::*;

/// Durations of every timed transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timings {
    pub entry_fade: Duration,
    pub exit_fade: Duration,
    pub success_animation: Duration,
    /// Pause between the success animation and the exit fade
    pub success_hold: Duration,
    pub focus_indicator: Duration,
    pub shutter_delay: Duration,
    pub shutter_rise: Duration,
    pub shutter_fall: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            entry_fade: Duration::from_millis(500),
            exit_fade: Duration::from_millis(500),
            success_animation: Duration::from_millis(400),
            success_hold: Duration::from_millis(300),
            focus_indicator: Duration::from_millis(2000),
            shutter_delay: Duration::from_millis(200),
            shutter_rise: Duration::from_millis(50),
            shutter_fall: Duration::from_millis(500),
        }
    }
}

/// Identifier of a one-shot timer owned by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerId(pub u64);

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    EntryAnimationDone { step: usize },
    /// The step's decode handler accepted a scan
    ScanAccepted { step: usize, payload: String },
    TimerElapsed { timer: TimerId },
    SkipRequested,
    CaptureRequested,
    PhotoTaken {
        step: usize,
        image: ImageRef,
        is_emulated: bool,
    },
    PhotoFailed { step: usize, reason: String },
    /// The photo sink settled; `error` is set when it failed
    PhotoStored {
        step: usize,
        image: ImageRef,
        error: Option<String>,
    },
    SuccessAnimationDone { step: usize },
    ExitAnimationDone { step: usize },
    CameraReady,
    FlashToggled,
    FocusRequested { point: FocusPoint },
    Teardown,
}

impl Event {
    /// Short label for logs and transition history
    pub fn label(&self) -> &'static str {
        match self {
            Event::EntryAnimationDone { .. } => "entry_animation_done",
            Event::ScanAccepted { .. } => "scan_accepted",
            Event::TimerElapsed { .. } => "timer_elapsed",
            Event::SkipRequested => "skip_requested",
            Event::CaptureRequested => "capture_requested",
            Event::PhotoTaken { .. } => "photo_taken",
            Event::PhotoFailed { .. } => "photo_failed",
            Event::PhotoStored { .. } => "photo_stored",
            Event::SuccessAnimationDone { .. } => "success_animation_done",
            Event::ExitAnimationDone { .. } => "exit_animation_done",
            Event::CameraReady => "camera_ready",
            Event::FlashToggled => "flash_toggled",
            Event::FocusRequested { .. } => "focus_requested",
            Event::Teardown => "teardown",
        }
    }
}

/// Side effects requested by a transition, executed in order by the driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    Animate(Animation),
    StartTimer { timer: TimerId, after: Duration },
    CancelTimer(TimerId),
    ResumePreview,
    SetFlash(FlashState),
    FocusCamera(FocusPoint),
    TakePhoto { step: usize },
    DeliverPhoto {
        step: usize,
        image: ImageRef,
        is_emulated: bool,
    },
    ReportFailure(CaptureFailure),
    StepCompleted(StepRecord),
    /// Sequence finished; notify the host
    Finished,
}

/// Transient tap-to-focus marker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocusIndicator {
    pub point: FocusPoint,
    pub timer: TimerId,
}

/// Engine-owned state snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    phase: Phase,
    step_index: usize,
    scan_accepted: bool,
    accepted_payload: Option<String>,
    camera_ready: bool,
    capturing: bool,
    preview_paused: bool,
    flash_state: FlashState,
    outline_tint: OutlineTint,
    pending_grace: Option<TimerId>,
    pending_hold: Option<TimerId>,
    focus: Option<FocusIndicator>,
    torn_down: bool,
    next_timer: u64,
}

impl EngineState {
    fn initial() -> Self {
        Self {
            phase: Phase::Entering,
            step_index: 0,
            scan_accepted: false,
            accepted_payload: None,
            camera_ready: false,
            capturing: false,
            preview_paused: false,
            flash_state: FlashState::On,
            outline_tint: OutlineTint::Neutral,
            pending_grace: None,
            pending_hold: None,
            focus: None,
            torn_down: false,
            next_timer: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn scan_accepted(&self) -> bool {
        self.scan_accepted
    }

    pub fn accepted_payload(&self) -> Option<&str> {
        self.accepted_payload.as_deref()
    }

    pub fn camera_ready(&self) -> bool {
        self.camera_ready
    }

    pub fn capturing(&self) -> bool {
        self.capturing
    }

    pub fn preview_paused(&self) -> bool {
        self.preview_paused
    }

    pub fn flash_state(&self) -> FlashState {
        self.flash_state
    }

    pub fn outline_tint(&self) -> OutlineTint {
        self.outline_tint
    }

    pub fn pending_grace(&self) -> Option<TimerId> {
        self.pending_grace
    }

    pub fn pending_hold(&self) -> Option<TimerId> {
        self.pending_hold
    }

    pub fn focus(&self) -> Option<FocusIndicator> {
        self.focus
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Finished because the host tore the workflow down
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Timers the engine still considers live
    pub fn live_timers(&self) -> Vec<TimerId> {
        self.pending_grace
            .into_iter()
            .chain(self.pending_hold)
            .chain(self.focus.map(|f| f.timer))
            .collect()
    }

    fn allocate_timer(&mut self) -> TimerId {
        self.next_timer += 1;
        TimerId(self.next_timer)
    }
}

/// Result of applying one event
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: EngineState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn unchanged(state: &EngineState) -> Self {
        Self {
            state: state.clone(),
            effects: Vec::new(),
        }
    }

    fn start_timer(&mut self, after: Duration) -> TimerId {
        let timer = self.state.allocate_timer();
        self.effects.push(Effect::StartTimer { timer, after });
        timer
    }

    fn cancel(&mut self, timer: Option<TimerId>) {
        if let Some(timer) = timer {
            self.effects.push(Effect::CancelTimer(timer));
        }
    }

    fn cancel_step_timers(&mut self) {
        let grace = self.state.pending_grace.take();
        let hold = self.state.pending_hold.take();
        self.cancel(grace);
        self.cancel(hold);
    }
}

/// Read-only projection of the state for rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureView {
    pub phase: Phase,
    pub step_index: usize,
    pub step_id: String,
    pub step_count: usize,
    pub message: Option<String>,
    pub capturing: bool,
    /// Present only for steps under the manual flash policy
    pub flash: Option<FlashState>,
    pub outline_tint: OutlineTint,
    pub skip_enabled: bool,
    pub capture_enabled: bool,
    pub busy: bool,
    pub focus: Option<FocusPoint>,
}

/// The capture workflow over an immutable step plan
#[derive(Debug, Clone)]
pub struct WorkflowMachine {
    steps: Vec<StepProfile>,
    timings: Timings,
}

impl WorkflowMachine {
    pub fn new(steps: Vec<StepProfile>, timings: Timings) -> Result<Self, StepConfigError> {
        if steps.is_empty() {
            return Err(StepConfigError::EmptyStepList);
        }
        let mut seen = HashSet::new();
        for step in &steps {
            if !seen.insert(step.id.as_str()) {
                return Err(StepConfigError::DuplicateStepId(step.id.clone()));
            }
        }
        Ok(Self { steps, timings })
    }

    pub fn steps(&self) -> &[StepProfile] {
        &self.steps
    }

    pub fn timings(&self) -> &Timings {
        &self.timings
    }

    /// Whether a decode on the current step would be evaluated at all.
    /// During entry only steps with a grace period defer a scan.
    pub fn accepts_scan(&self, state: &EngineState) -> bool {
        match state.phase {
            Phase::Active => true,
            Phase::Entering => self.steps[state.step_index].grace_period.is_some(),
            _ => false,
        }
    }

    /// Initial state with the entry of step 0 under way
    pub fn start(&self) -> Transition {
        let mut t = Transition::unchanged(&EngineState::initial());
        self.enter_step(&mut t);
        t
    }

    /// Apply one event. Events that do not apply to the current phase or step
    /// leave the state untouched and produce no effects.
    pub fn transition(&self, state: &EngineState, event: &Event) -> Transition {
        let mut t = Transition::unchanged(state);
        if state.phase == Phase::Finished {
            return t;
        }

        let index = state.step_index;
        let profile = &self.steps[index];
        let is_barcode = profile.kind == StepKindTag::Barcode;
        let is_photo = profile.kind == StepKindTag::Photo;

        match (state.phase, event) {
            (_, Event::Teardown) => {
                t.cancel_step_timers();
                let focus = t.state.focus.take().map(|f| f.timer);
                t.cancel(focus);
                t.state.phase = Phase::Finished;
                t.state.torn_down = true;
            }
            (_, Event::CameraReady) => {
                t.state.camera_ready = true;
            }
            (_, Event::FocusRequested { point }) if point.is_within_viewport() => {
                let previous = t.state.focus.take().map(|f| f.timer);
                t.cancel(previous);
                t.effects.push(Effect::FocusCamera(*point));
                let timer = t.start_timer(self.timings.focus_indicator);
                t.state.focus = Some(FocusIndicator {
                    point: *point,
                    timer,
                });
            }
            (_, Event::TimerElapsed { timer })
                if state.focus.map(|f| f.timer) == Some(*timer) =>
            {
                t.state.focus = None;
            }

            (Phase::Entering, Event::EntryAnimationDone { step }) if *step == index => {
                t.state.phase = Phase::Active;
                if let Some(grace) = profile.grace_period.filter(|_| is_barcode) {
                    let timer = t.start_timer(grace);
                    t.state.pending_grace = Some(timer);
                }
            }
            // Recorded only when a grace timer will confirm it
            (Phase::Entering, Event::ScanAccepted { step, payload })
                if *step == index && is_barcode && profile.grace_period.is_some() =>
            {
                t.state.scan_accepted = true;
                t.state.accepted_payload = Some(payload.clone());
            }

            (Phase::Active, Event::ScanAccepted { step, payload })
                if *step == index && is_barcode =>
            {
                t.state.scan_accepted = true;
                t.state.accepted_payload = Some(payload.clone());
                if t.state.pending_grace.is_none() {
                    self.confirm_scan(&mut t);
                }
            }
            (Phase::Active, Event::TimerElapsed { timer })
                if state.pending_grace == Some(*timer) =>
            {
                t.state.pending_grace = None;
                if t.state.scan_accepted {
                    self.confirm_scan(&mut t);
                }
            }
            (Phase::Active, Event::SkipRequested) if profile.skippable && !state.capturing => {
                self.begin_exit(&mut t, StepOutcome::Skipped);
            }
            (Phase::Active, Event::CaptureRequested)
                if is_photo && state.camera_ready && !state.capturing =>
            {
                t.state.capturing = true;
                t.effects
                    .push(Effect::Animate(Animation::shutter(&self.timings)));
                t.effects.push(Effect::TakePhoto { step: index });
            }
            (
                Phase::Active,
                Event::PhotoTaken {
                    step,
                    image,
                    is_emulated,
                },
            ) if *step == index && state.capturing => {
                t.state.preview_paused = true;
                t.effects.push(Effect::DeliverPhoto {
                    step: index,
                    image: image.clone(),
                    is_emulated: *is_emulated,
                });
            }
            (Phase::Active, Event::PhotoFailed { step, reason })
                if *step == index && state.capturing =>
            {
                t.state.capturing = false;
                t.effects
                    .push(Effect::ReportFailure(CaptureFailure::Camera {
                        step_id: profile.id.clone(),
                        reason: reason.clone(),
                    }));
            }
            (Phase::Active, Event::PhotoStored { step, image, error })
                if *step == index && state.capturing =>
            {
                t.state.capturing = false;
                if let Some(reason) = error {
                    t.effects
                        .push(Effect::ReportFailure(CaptureFailure::Storage {
                            step_id: profile.id.clone(),
                            reason: reason.clone(),
                        }));
                }
                self.begin_exit(
                    &mut t,
                    StepOutcome::Captured {
                        image: image.clone(),
                    },
                );
            }
            (Phase::Active, Event::FlashToggled) if profile.flash_policy == FlashPolicy::Manual => {
                t.state.flash_state = state.flash_state.cycled();
                t.effects.push(Effect::SetFlash(t.state.flash_state));
            }

            (Phase::ScanConfirming, Event::SuccessAnimationDone { step }) if *step == index => {
                t.state.outline_tint = OutlineTint::Success;
                let timer = t.start_timer(self.timings.success_hold);
                t.state.pending_hold = Some(timer);
            }
            (Phase::ScanConfirming, Event::TimerElapsed { timer })
                if state.pending_hold == Some(*timer) =>
            {
                t.state.pending_hold = None;
                let payload = t.state.accepted_payload.clone();
                self.begin_exit(&mut t, StepOutcome::Scanned { payload });
            }

            (Phase::Exiting, Event::ExitAnimationDone { step }) if *step == index => {
                t.state.outline_tint = OutlineTint::Neutral;
                t.state.scan_accepted = false;
                t.state.accepted_payload = None;
                if index + 1 < self.steps.len() {
                    t.state.step_index = index + 1;
                    self.enter_step(&mut t);
                } else {
                    let focus = t.state.focus.take().map(|f| f.timer);
                    t.cancel(focus);
                    t.state.phase = Phase::Finished;
                    t.effects.push(Effect::Finished);
                }
            }

            _ => {}
        }

        t
    }

    /// Rendering projection of `state`
    pub fn view(&self, state: &EngineState) -> CaptureView {
        let profile = &self.steps[state.step_index];
        let active = state.phase == Phase::Active;
        CaptureView {
            phase: state.phase,
            step_index: state.step_index,
            step_id: profile.id.clone(),
            step_count: self.steps.len(),
            message: profile.message.clone(),
            capturing: state.capturing,
            flash: (profile.flash_policy == FlashPolicy::Manual).then_some(state.flash_state),
            outline_tint: state.outline_tint,
            skip_enabled: active && profile.skippable && !state.capturing,
            capture_enabled: active
                && profile.kind == StepKindTag::Photo
                && state.camera_ready
                && !state.capturing,
            busy: !state.camera_ready || state.capturing || !active,
            focus: state.focus.map(|f| f.point),
        }
    }

    fn enter_step(&self, t: &mut Transition) {
        let profile = &self.steps[t.state.step_index];
        t.state.phase = Phase::Entering;
        if t.state.preview_paused {
            t.state.preview_paused = false;
            t.effects.push(Effect::ResumePreview);
        }
        t.effects.push(Effect::SetFlash(
            profile.flash_policy.effective(t.state.flash_state),
        ));
        t.effects.push(Effect::Animate(Animation::step_entry(
            t.state.step_index,
            &self.timings,
        )));
    }

    fn confirm_scan(&self, t: &mut Transition) {
        let grace = t.state.pending_grace.take();
        t.cancel(grace);
        t.state.phase = Phase::ScanConfirming;
        t.effects.push(Effect::Animate(Animation::scan_success(
            t.state.step_index,
            &self.timings,
        )));
    }

    fn begin_exit(&self, t: &mut Transition, outcome: StepOutcome) {
        t.cancel_step_timers();
        let index = t.state.step_index;
        t.state.phase = Phase::Exiting;
        t.effects.push(Effect::StepCompleted(StepRecord {
            index,
            step_id: self.steps[index].id.clone(),
            outcome,
        }));
        t.effects
            .push(Effect::Animate(Animation::step_exit(index, &self.timings)));
    }
}
