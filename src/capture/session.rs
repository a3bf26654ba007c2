// Capture session driver
//
// Owns the engine state, feeds host inputs and collaborator completions
// through `WorkflowMachine::transition`, and executes the resulting effects.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, info_span, trace, warn, Instrument};

use crate::capture::animation::TimelineAnimator;
use crate::capture::errors::{CaptureFailure, SessionError};
use crate::capture::scheduler::TokioScheduler;
use crate::capture::state_machine::{
    CaptureView, Effect, EngineState, Event, Timings, Transition, WorkflowMachine,
};
use crate::capture::traits::{Animator, Camera, Scheduler, SessionHost};
use crate::capture::types::*;
use crate::telemetry::generate_session_id;

/// Host-side input to a running session
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Raw decode result from the scanner
    Scan(BarcodeScan),
    Event(Event),
}

/// Cloneable remote for a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    session_id: String,
    inputs: mpsc::UnboundedSender<Input>,
    view: watch::Receiver<CaptureView>,
}

impl SessionHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Returns false once the session has ended
    pub fn send(&self, input: Input) -> bool {
        self.inputs.send(input).is_ok()
    }

    pub fn scan(&self, scan: BarcodeScan) -> bool {
        self.send(Input::Scan(scan))
    }

    pub fn skip(&self) -> bool {
        self.send(Input::Event(Event::SkipRequested))
    }

    pub fn capture(&self) -> bool {
        self.send(Input::Event(Event::CaptureRequested))
    }

    pub fn toggle_flash(&self) -> bool {
        self.send(Input::Event(Event::FlashToggled))
    }

    pub fn focus(&self, point: FocusPoint) -> bool {
        self.send(Input::Event(Event::FocusRequested { point }))
    }

    pub fn camera_ready(&self) -> bool {
        self.send(Input::Event(Event::CameraReady))
    }

    pub fn teardown(&self) -> bool {
        self.send(Input::Event(Event::Teardown))
    }

    /// Latest rendering projection
    pub fn view(&self) -> CaptureView {
        self.view.borrow().clone()
    }

    /// Receiver notified on every view change
    pub fn watch(&self) -> watch::Receiver<CaptureView> {
        self.view.clone()
    }
}

/// Host notifications routed to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHost;

impl SessionHost for TracingHost {
    fn on_step_completed(&self, record: &StepRecord) {
        info!(step = record.index, step_id = %record.step_id, outcome = ?record.outcome, "Step completed");
    }

    fn on_capture_failure(&self, failure: &CaptureFailure) {
        warn!(%failure, "Capture failure");
    }

    fn on_finished(&self) {
        info!("Capture sequence finished");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    Completed,
    TornDown,
}

/// One phase or step change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionRecord {
    pub from: Phase,
    pub to: Phase,
    pub step: usize,
    pub event: String,
    pub at: DateTime<Utc>,
}

/// Summary returned when a session ends
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub session_id: String,
    pub outcome: SessionOutcome,
    pub records: Vec<StepRecord>,
    pub history: Vec<TransitionRecord>,
    /// Timers the scheduler still held when the machine finished
    pub outstanding_timers: usize,
    pub final_state: EngineState,
}

impl SessionReport {
    pub fn is_completed(&self) -> bool {
        self.outcome == SessionOutcome::Completed
    }
}

pub struct CaptureSessionBuilder {
    steps: Vec<CaptureStep>,
    timings: Timings,
    camera: Option<Arc<dyn Camera>>,
    animator: Option<Arc<dyn Animator>>,
    host: Option<Arc<dyn SessionHost>>,
}

impl CaptureSessionBuilder {
    pub fn camera(mut self, camera: Arc<dyn Camera>) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn animator(mut self, animator: Arc<dyn Animator>) -> Self {
        self.animator = Some(animator);
        self
    }

    pub fn host(mut self, host: Arc<dyn SessionHost>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    /// Validate the step plan and wire the channels. The session does nothing
    /// until `run` is awaited.
    pub fn build(self) -> Result<(CaptureSession, SessionHandle), SessionError> {
        let camera = self
            .camera
            .ok_or(SessionError::MissingCollaborator("camera"))?;
        let animator = self
            .animator
            .unwrap_or_else(|| Arc::new(TimelineAnimator::new()));
        let host = self.host.unwrap_or_else(|| Arc::new(TracingHost));

        let profiles = self.steps.iter().map(CaptureStep::profile).collect();
        let machine = WorkflowMachine::new(profiles, self.timings)?;
        let start = machine.start();

        let session_id = generate_session_id();
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(machine.view(&start.state));

        let session = CaptureSession {
            id: session_id.clone(),
            state: start.state,
            pending_effects: start.effects,
            machine,
            steps: self.steps,
            camera,
            animator,
            host,
            scheduler: Box::new(TokioScheduler::new(event_tx.clone())),
            inputs: input_rx,
            events_tx: event_tx,
            events: event_rx,
            view: view_tx,
            tasks: JoinSet::new(),
            records: Vec::new(),
            history: Vec::new(),
        };
        let handle = SessionHandle {
            session_id,
            inputs: input_tx,
            view: view_rx,
        };
        Ok((session, handle))
    }
}

/// A single guided capture run over an ordered list of steps
pub struct CaptureSession {
    id: String,
    machine: WorkflowMachine,
    state: EngineState,
    pending_effects: Vec<Effect>,
    steps: Vec<CaptureStep>,
    camera: Arc<dyn Camera>,
    animator: Arc<dyn Animator>,
    host: Arc<dyn SessionHost>,
    scheduler: Box<dyn Scheduler>,
    inputs: mpsc::UnboundedReceiver<Input>,
    events_tx: mpsc::UnboundedSender<Event>,
    events: mpsc::UnboundedReceiver<Event>,
    view: watch::Sender<CaptureView>,
    tasks: JoinSet<()>,
    records: Vec<StepRecord>,
    history: Vec<TransitionRecord>,
}

impl CaptureSession {
    pub fn builder(steps: Vec<CaptureStep>) -> CaptureSessionBuilder {
        CaptureSessionBuilder {
            steps,
            timings: Timings::default(),
            camera: None,
            animator: None,
            host: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Drive the workflow until it finishes or the host tears it down.
    /// Dropping every `SessionHandle` counts as teardown.
    pub async fn run(self) -> SessionReport {
        let span = info_span!(
            "capture_session",
            session.id = %self.id,
            steps = self.steps.len()
        );
        self.drive().instrument(span).await
    }

    async fn drive(mut self) -> SessionReport {
        info!(steps = self.steps.len(), "Capture session started");
        for effect in std::mem::take(&mut self.pending_effects) {
            self.execute(effect);
        }

        while !self.state.is_finished() {
            tokio::select! {
                input = self.inputs.recv() => match input {
                    Some(Input::Scan(scan)) => self.handle_scan(scan),
                    Some(Input::Event(event)) => self.apply(event),
                    None => {
                        info!("All session handles dropped, tearing down");
                        self.apply(Event::Teardown);
                    }
                },
                Some(event) = self.events.recv() => self.apply(event),
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            warn!(error = %e, "Collaborator task panicked");
                        }
                    }
                }
            }
        }

        let outstanding_timers = self.scheduler.outstanding();
        if outstanding_timers > 0 {
            warn!(outstanding_timers, "Timers still live after finish");
        }
        self.scheduler.cancel_all();
        self.tasks.abort_all();

        let outcome = if self.state.is_torn_down() {
            SessionOutcome::TornDown
        } else {
            SessionOutcome::Completed
        };
        info!(?outcome, records = self.records.len(), "Capture session ended");

        SessionReport {
            session_id: self.id,
            outcome,
            records: self.records,
            history: self.history,
            outstanding_timers,
            final_state: self.state,
        }
    }

    /// Filter a raw decode and consult the step's handler
    fn handle_scan(&mut self, scan: BarcodeScan) {
        if !self.machine.accepts_scan(&self.state) {
            trace!(phase = ?self.state.phase(), "Scan ignored in current phase");
            return;
        }
        let index = self.state.step_index();
        let StepKind::Barcode(barcode) = &mut self.steps[index].kind else {
            return;
        };
        if scan.symbology != barcode.symbology || scan.data.is_empty() {
            trace!(symbology = ?scan.symbology, "Scan ignored");
            return;
        }

        let accepted = barcode.handler.on_decode(&scan);
        debug!(step = index, accepted, "Decode handler consulted");
        if accepted {
            self.apply(Event::ScanAccepted {
                step: index,
                payload: scan.data,
            });
        }
    }

    fn apply(&mut self, event: Event) {
        let transition = self.machine.transition(&self.state, &event);
        self.commit(transition, event.label());
    }

    fn commit(&mut self, transition: Transition, event: &str) {
        let Transition { state, effects } = transition;
        let (from, from_step) = (self.state.phase(), self.state.step_index());

        if state.phase() != from || state.step_index() != from_step {
            info!(
                from = ?from,
                to = ?state.phase(),
                step = state.step_index(),
                event,
                "Capture phase transition"
            );
            self.history.push(TransitionRecord {
                from,
                to: state.phase(),
                step: state.step_index(),
                event: event.to_string(),
                at: Utc::now(),
            });
        }

        self.state = state;
        for effect in effects {
            self.execute(effect);
        }
        self.view.send_replace(self.machine.view(&self.state));
    }

    fn execute(&mut self, effect: Effect) {
        trace!(?effect, "Executing effect");
        match effect {
            Effect::Animate(animation) => {
                let animator = Arc::clone(&self.animator);
                let events = self.events_tx.clone();
                self.tasks.spawn(async move {
                    animator.play(&animation).await;
                    if let Some(done) = animation.on_complete {
                        let _ = events.send(done);
                    }
                });
            }
            Effect::StartTimer { timer, after } => self.scheduler.schedule(timer, after),
            Effect::CancelTimer(timer) => self.scheduler.cancel(timer),
            Effect::ResumePreview => {
                if let Err(e) = self.camera.resume_preview() {
                    warn!(error = %e, "Failed to resume camera preview");
                }
            }
            Effect::SetFlash(mode) => self.camera.set_flash(mode),
            Effect::FocusCamera(point) => self.camera.focus_at(point),
            Effect::TakePhoto { step } => {
                let camera = Arc::clone(&self.camera);
                let events = self.events_tx.clone();
                self.tasks.spawn(async move {
                    let is_emulated = camera.is_emulated();
                    let options = ShotOptions::for_device(is_emulated);
                    let event = match camera.take_photo(options).await {
                        Ok(image) => Event::PhotoTaken {
                            step,
                            image,
                            is_emulated,
                        },
                        Err(e) => Event::PhotoFailed {
                            step,
                            reason: e.to_string(),
                        },
                    };
                    let _ = events.send(event);
                });
            }
            Effect::DeliverPhoto {
                step,
                image,
                is_emulated,
            } => self.deliver_photo(step, image, is_emulated),
            Effect::ReportFailure(failure) => {
                warn!(%failure, "Reporting capture failure to host");
                self.host.on_capture_failure(&failure);
            }
            Effect::StepCompleted(record) => {
                self.host.on_step_completed(&record);
                self.records.push(record);
            }
            Effect::Finished => self.host.on_finished(),
        }
    }

    fn deliver_photo(&mut self, step: usize, image: ImageRef, is_emulated: bool) {
        let events = self.events_tx.clone();
        let capture_step = &self.steps[step];
        let StepKind::Photo(photo) = &capture_step.kind else {
            warn!(step, "Photo delivered to a non-photo step");
            let _ = events.send(Event::PhotoStored {
                step,
                image,
                error: Some("step has no photo sink".to_string()),
            });
            return;
        };

        let sink = Arc::clone(&photo.sink);
        let photo = CapturedPhoto {
            step_id: capture_step.id.clone(),
            image: image.clone(),
            is_emulated,
            captured_at: Utc::now(),
        };
        self.tasks.spawn(async move {
            let error = sink.on_captured(photo).await.err().map(|e| format!("{e:#}"));
            let _ = events.send(Event::PhotoStored { step, image, error });
        });
    }
}
