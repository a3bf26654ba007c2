// Test doubles for the capture workflow

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::capture::animation::{Animation, Channel};
use crate::capture::errors::CaptureFailure;
use crate::capture::state_machine::{Effect, EngineState, Event, TimerId, Timings, WorkflowMachine};
use crate::capture::traits::{Animator, PhotoSink, Scheduler, SessionHost};
use crate::capture::types::*;

/// Scheduler that only counts; timers fire when a test says so
#[derive(Debug, Default)]
pub struct CountingScheduler {
    live: BTreeMap<TimerId, Duration>,
    pub scheduled: usize,
    pub cancelled: usize,
}

impl CountingScheduler {
    pub fn is_live(&self, timer: TimerId) -> bool {
        self.live.contains_key(&timer)
    }

    pub fn duration_of(&self, timer: TimerId) -> Option<Duration> {
        self.live.get(&timer).copied()
    }

    /// Mark a timer as fired
    pub fn fire(&mut self, timer: TimerId) -> bool {
        self.live.remove(&timer).is_some()
    }
}

impl Scheduler for CountingScheduler {
    fn schedule(&mut self, id: TimerId, after: Duration) {
        self.scheduled += 1;
        self.live.insert(id, after);
    }

    fn cancel(&mut self, id: TimerId) {
        if self.live.remove(&id).is_some() {
            self.cancelled += 1;
        }
    }

    fn cancel_all(&mut self) {
        self.cancelled += self.live.len();
        self.live.clear();
    }

    fn outstanding(&self) -> usize {
        self.live.len()
    }
}

pub fn barcode_profile(id: &str, grace: Option<Duration>) -> StepProfile {
    StepProfile {
        id: id.to_string(),
        kind: StepKindTag::Barcode,
        message: Some(format!("Scan {id}")),
        skippable: false,
        flash_policy: FlashPolicy::Auto,
        grace_period: grace,
    }
}

pub fn photo_profile(id: &str) -> StepProfile {
    StepProfile {
        id: id.to_string(),
        kind: StepKindTag::Photo,
        message: None,
        skippable: false,
        flash_policy: FlashPolicy::Manual,
        grace_period: None,
    }
}

pub fn skippable(mut profile: StepProfile) -> StepProfile {
    profile.skippable = true;
    profile
}

/// Runs the pure machine synchronously, applying timer effects to a
/// counting scheduler and queueing animation completions
pub struct MachineHarness {
    pub machine: WorkflowMachine,
    pub state: EngineState,
    pub scheduler: CountingScheduler,
    pub effects: Vec<Effect>,
    pending_animations: VecDeque<Event>,
}

impl MachineHarness {
    pub fn new(steps: Vec<StepProfile>) -> Self {
        let machine = WorkflowMachine::new(steps, Timings::default()).expect("valid steps");
        let start = machine.start();
        let mut harness = Self {
            machine,
            state: start.state.clone(),
            scheduler: CountingScheduler::default(),
            effects: Vec::new(),
            pending_animations: VecDeque::new(),
        };
        harness.absorb(start.effects);
        harness
    }

    /// Apply one event, returning only the effects it produced
    pub fn send(&mut self, event: Event) -> Vec<Effect> {
        let transition = self.machine.transition(&self.state, &event);
        self.state = transition.state;
        self.absorb(transition.effects.clone());
        transition.effects
    }

    /// Complete the oldest queued animation
    pub fn finish_animation(&mut self) -> Option<Vec<Effect>> {
        let event = self.pending_animations.pop_front()?;
        Some(self.send(event))
    }

    /// Complete queued animations until none are left
    pub fn settle(&mut self) {
        while self.finish_animation().is_some() {}
    }

    pub fn fire(&mut self, timer: TimerId) -> Vec<Effect> {
        assert!(self.scheduler.fire(timer), "timer {timer:?} is not live");
        self.send(Event::TimerElapsed { timer })
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn records(&self) -> Vec<StepRecord> {
        self.effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::StepCompleted(record) => Some(record.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn finished_count(&self) -> usize {
        self.effects
            .iter()
            .filter(|effect| matches!(effect, Effect::Finished))
            .count()
    }

    fn absorb(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match &effect {
                Effect::StartTimer { timer, after } => self.scheduler.schedule(*timer, *after),
                Effect::CancelTimer(timer) => self.scheduler.cancel(*timer),
                Effect::Animate(animation) => {
                    if let Some(done) = &animation.on_complete {
                        self.pending_animations.push_back(done.clone());
                    }
                }
                _ => {}
            }
            self.effects.push(effect);
        }
    }
}

/// Animator that settles immediately
#[derive(Debug, Default)]
pub struct InstantAnimator {
    played: Mutex<Vec<Animation>>,
}

impl InstantAnimator {
    pub fn played(&self) -> Vec<Animation> {
        self.played.lock().expect("animator lock").clone()
    }
}

#[async_trait]
impl Animator for InstantAnimator {
    async fn play(&self, animation: &Animation) {
        self.played.lock().expect("animator lock").push(animation.clone());
    }

    fn value(&self, channel: Channel) -> f32 {
        channel.resting()
    }
}

/// Host that records every notification
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub records: Mutex<Vec<StepRecord>>,
    pub failures: Mutex<Vec<CaptureFailure>>,
    pub finished: Mutex<usize>,
}

impl RecordingHost {
    pub fn records(&self) -> Vec<StepRecord> {
        self.records.lock().expect("host lock").clone()
    }

    pub fn failures(&self) -> Vec<CaptureFailure> {
        self.failures.lock().expect("host lock").clone()
    }

    pub fn finished(&self) -> usize {
        *self.finished.lock().expect("host lock")
    }
}

impl SessionHost for RecordingHost {
    fn on_step_completed(&self, record: &StepRecord) {
        self.records.lock().expect("host lock").push(record.clone());
    }

    fn on_capture_failure(&self, failure: &CaptureFailure) {
        self.failures.lock().expect("host lock").push(failure.clone());
    }

    fn on_finished(&self) {
        *self.finished.lock().expect("host lock") += 1;
    }
}

/// Sink that stores photos, optionally failing
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub photos: Mutex<Vec<CapturedPhoto>>,
    pub fail_with: Option<String>,
}

impl CollectingSink {
    pub fn failing(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            photos: Mutex::new(Vec::new()),
            fail_with: Some(reason.to_string()),
        })
    }

    pub fn photos(&self) -> Vec<CapturedPhoto> {
        self.photos.lock().expect("sink lock").clone()
    }
}

#[async_trait]
impl PhotoSink for CollectingSink {
    async fn on_captured(&self, photo: CapturedPhoto) -> anyhow::Result<()> {
        self.photos.lock().expect("sink lock").push(photo);
        match &self.fail_with {
            Some(reason) => Err(anyhow::anyhow!("{reason}")),
            None => Ok(()),
        }
    }
}
