// Tests for the capture workflow state machine

use std::time::Duration;

use super::errors::{CaptureFailure, StepConfigError};
use super::mocks::*;
use super::state_machine::*;
use super::traits::Scheduler;
use super::types::*;

const GRACE: Duration = Duration::from_millis(1500);

fn image(name: &str) -> ImageRef {
    ImageRef(name.to_string())
}

/// Drive the current step to completion the way a user would
fn complete_current_step(h: &mut MachineHarness) {
    h.settle();
    assert_eq!(h.phase(), Phase::Active);
    let index = h.state.step_index();
    match h.machine.steps()[index].kind {
        StepKindTag::Barcode => {
            h.send(Event::ScanAccepted {
                step: index,
                payload: format!("payload-{index}"),
            });
            if let Some(grace) = h.state.pending_grace() {
                h.fire(grace);
            }
            assert_eq!(h.phase(), Phase::ScanConfirming);
            h.settle();
            let hold = h.state.pending_hold().expect("hold timer after success");
            h.fire(hold);
        }
        StepKindTag::Photo => {
            h.send(Event::CameraReady);
            h.send(Event::CaptureRequested);
            h.send(Event::PhotoTaken {
                step: index,
                image: image("shot.jpg"),
                is_emulated: true,
            });
            h.send(Event::PhotoStored {
                step: index,
                image: image("shot.jpg"),
                error: None,
            });
        }
    }
    assert_eq!(h.phase(), Phase::Exiting);
    h.settle();
}

#[test]
fn test_machine_rejects_empty_step_list() {
    let result = WorkflowMachine::new(Vec::new(), Timings::default());
    assert!(matches!(result, Err(StepConfigError::EmptyStepList)));
}

#[test]
fn test_machine_rejects_duplicate_step_ids() {
    let result = WorkflowMachine::new(
        vec![barcode_profile("qr", None), photo_profile("qr")],
        Timings::default(),
    );
    assert!(matches!(result, Err(StepConfigError::DuplicateStepId(id)) if id == "qr"));
}

#[test]
fn test_start_enters_first_step_with_entry_animation() {
    let h = MachineHarness::new(vec![barcode_profile("qr", Some(GRACE))]);

    assert_eq!(h.phase(), Phase::Entering);
    assert_eq!(h.state.step_index(), 0);
    assert_eq!(h.state.flash_state(), FlashState::On);
    assert!(h.effects.iter().any(|e| matches!(
        e,
        Effect::Animate(a) if a.on_complete == Some(Event::EntryAnimationDone { step: 0 })
    )));
    assert!(h.effects.contains(&Effect::SetFlash(FlashState::Auto)));
    assert_eq!(h.scheduler.outstanding(), 0);
}

#[test]
fn test_mixed_steps_finish_exactly_once() {
    let mut h = MachineHarness::new(vec![
        barcode_profile("qr", Some(GRACE)),
        photo_profile("rdt"),
        barcode_profile("box", None),
    ]);

    for expected in 0..3 {
        assert_eq!(h.state.step_index(), expected);
        assert_eq!(h.finished_count(), 0);
        complete_current_step(&mut h);
    }

    assert_eq!(h.phase(), Phase::Finished);
    assert!(!h.state.is_torn_down());
    assert_eq!(h.finished_count(), 1);
    assert_eq!(h.records().len(), 3);
    assert_eq!(h.scheduler.outstanding(), 0);

    // Anything after Finished is ignored
    for event in [
        Event::SkipRequested,
        Event::CaptureRequested,
        Event::ExitAnimationDone { step: 2 },
        Event::Teardown,
    ] {
        let before = h.state.clone();
        assert!(h.send(event).is_empty());
        assert_eq!(h.state, before);
    }
    assert_eq!(h.finished_count(), 1);
}

#[test]
fn test_step_records_carry_outcomes() {
    let mut h = MachineHarness::new(vec![barcode_profile("qr", None), photo_profile("rdt")]);
    complete_current_step(&mut h);
    complete_current_step(&mut h);

    let records = h.records();
    assert_eq!(records[0].step_id, "qr");
    assert_eq!(
        records[0].outcome,
        StepOutcome::Scanned {
            payload: Some("payload-0".to_string())
        }
    );
    assert_eq!(records[1].step_id, "rdt");
    assert_eq!(
        records[1].outcome,
        StepOutcome::Captured {
            image: image("shot.jpg")
        }
    );
}

#[test]
fn test_skip_only_applies_to_active_skippable_steps() {
    let mut h = MachineHarness::new(vec![
        skippable(barcode_profile("qr", Some(GRACE))),
        barcode_profile("box", None),
    ]);

    // Entering: no-op
    let before = h.state.clone();
    assert!(h.send(Event::SkipRequested).is_empty());
    assert_eq!(h.state, before);

    h.settle();
    assert_eq!(h.phase(), Phase::Active);
    let grace = h.state.pending_grace().expect("grace timer");
    assert!(h.scheduler.is_live(grace));

    h.send(Event::SkipRequested);
    assert_eq!(h.phase(), Phase::Exiting);
    assert!(!h.scheduler.is_live(grace));
    assert_eq!(h.records()[0].outcome, StepOutcome::Skipped);

    // Exiting: no-op
    let before = h.state.clone();
    assert!(h.send(Event::SkipRequested).is_empty());
    assert_eq!(h.state, before);

    h.settle();
    assert_eq!(h.state.step_index(), 1);
    assert_eq!(h.phase(), Phase::Active);

    // Not skippable
    let before = h.state.clone();
    assert!(h.send(Event::SkipRequested).is_empty());
    assert_eq!(h.state, before);
}

#[test]
fn test_skip_ignored_during_scan_confirmation() {
    let mut h = MachineHarness::new(vec![skippable(barcode_profile("qr", None))]);
    h.settle();
    h.send(Event::ScanAccepted {
        step: 0,
        payload: "A".to_string(),
    });
    assert_eq!(h.phase(), Phase::ScanConfirming);

    let before = h.state.clone();
    assert!(h.send(Event::SkipRequested).is_empty());
    assert_eq!(h.state, before);
}

#[test]
fn test_scan_during_grace_is_recorded_and_idempotent() {
    let mut h = MachineHarness::new(vec![barcode_profile("qr", Some(GRACE))]);
    h.settle();
    let grace = h.state.pending_grace().expect("grace timer");
    assert_eq!(h.scheduler.duration_of(grace), Some(GRACE));

    let scan = Event::ScanAccepted {
        step: 0,
        payload: "LOT".to_string(),
    };
    assert!(h.send(scan.clone()).is_empty());
    assert_eq!(h.phase(), Phase::Active);
    assert!(h.state.scan_accepted());

    let once = h.state.clone();
    assert!(h.send(scan).is_empty());
    assert_eq!(h.state, once);

    h.fire(grace);
    assert_eq!(h.phase(), Phase::ScanConfirming);
}

#[test]
fn test_grace_expiry_without_scan_keeps_step_active() {
    let mut h = MachineHarness::new(vec![barcode_profile("qr", Some(GRACE))]);
    h.settle();
    let grace = h.state.pending_grace().expect("grace timer");

    let effects = h.fire(grace);
    assert!(effects.is_empty());
    assert_eq!(h.phase(), Phase::Active);
    assert_eq!(h.state.pending_grace(), None);

    h.send(Event::ScanAccepted {
        step: 0,
        payload: "LOT".to_string(),
    });
    assert_eq!(h.phase(), Phase::ScanConfirming);
}

#[test]
fn test_scan_while_entering_confirms_when_grace_fires() {
    let mut h = MachineHarness::new(vec![
        barcode_profile("qr", Some(GRACE)),
        photo_profile("rdt"),
    ]);

    h.send(Event::ScanAccepted {
        step: 0,
        payload: "QR,LOT".to_string(),
    });
    assert_eq!(h.phase(), Phase::Entering);
    assert!(h.state.scan_accepted());

    h.settle();
    assert_eq!(h.phase(), Phase::Active);
    let grace = h.state.pending_grace().expect("grace timer");

    h.fire(grace);
    assert_eq!(h.phase(), Phase::ScanConfirming);
    h.settle();
    assert_eq!(h.state.outline_tint(), OutlineTint::Success);

    let hold = h.state.pending_hold().expect("hold timer");
    assert_eq!(h.scheduler.duration_of(hold), Some(Duration::from_millis(300)));
    h.fire(hold);
    assert_eq!(h.phase(), Phase::Exiting);

    h.finish_animation();
    assert_eq!(h.phase(), Phase::Entering);
    assert_eq!(h.state.step_index(), 1);
    assert_eq!(h.state.outline_tint(), OutlineTint::Neutral);
    assert!(!h.state.scan_accepted());
}

#[test]
fn test_scan_without_grace_confirms_immediately() {
    let mut h = MachineHarness::new(vec![barcode_profile("qr", None)]);
    h.settle();
    assert_eq!(h.state.pending_grace(), None);

    let effects = h.send(Event::ScanAccepted {
        step: 0,
        payload: "A".to_string(),
    });
    assert_eq!(h.phase(), Phase::ScanConfirming);
    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::Animate(a) if a.on_complete == Some(Event::SuccessAnimationDone { step: 0 })
    )));
}

#[test]
fn test_scan_for_photo_step_is_ignored() {
    let mut h = MachineHarness::new(vec![photo_profile("rdt")]);
    h.settle();
    let before = h.state.clone();
    assert!(h
        .send(Event::ScanAccepted {
            step: 0,
            payload: "A".to_string()
        })
        .is_empty());
    assert_eq!(h.state, before);
}

#[test]
fn test_capture_requires_ready_camera_and_no_capture_in_flight() {
    let mut h = MachineHarness::new(vec![photo_profile("rdt")]);
    h.settle();

    let before = h.state.clone();
    assert!(h.send(Event::CaptureRequested).is_empty());
    assert_eq!(h.state, before);

    h.send(Event::CameraReady);
    let effects = h.send(Event::CaptureRequested);
    assert!(h.state.capturing());
    assert!(effects.contains(&Effect::TakePhoto { step: 0 }));

    let before = h.state.clone();
    assert!(h.send(Event::CaptureRequested).is_empty());
    assert_eq!(h.state, before);
}

#[test]
fn test_camera_failure_resets_capturing_and_stays_active() {
    let mut h = MachineHarness::new(vec![photo_profile("rdt")]);
    h.settle();
    h.send(Event::CameraReady);
    h.send(Event::CaptureRequested);

    let effects = h.send(Event::PhotoFailed {
        step: 0,
        reason: "lens cap".to_string(),
    });
    assert!(!h.state.capturing());
    assert_eq!(h.phase(), Phase::Active);
    assert_eq!(
        effects,
        vec![Effect::ReportFailure(CaptureFailure::Camera {
            step_id: "rdt".to_string(),
            reason: "lens cap".to_string()
        })]
    );

    // Retry succeeds
    h.send(Event::CaptureRequested);
    assert!(h.state.capturing());
}

#[test]
fn test_photo_delivery_then_storage_advances() {
    let mut h = MachineHarness::new(vec![photo_profile("rdt"), barcode_profile("qr", None)]);
    h.settle();
    h.send(Event::CameraReady);
    h.send(Event::CaptureRequested);

    let effects = h.send(Event::PhotoTaken {
        step: 0,
        image: image("a.jpg"),
        is_emulated: false,
    });
    assert!(h.state.preview_paused());
    assert!(h.state.capturing());
    assert_eq!(
        effects,
        vec![Effect::DeliverPhoto {
            step: 0,
            image: image("a.jpg"),
            is_emulated: false
        }]
    );

    h.send(Event::PhotoStored {
        step: 0,
        image: image("a.jpg"),
        error: None,
    });
    assert!(!h.state.capturing());
    assert_eq!(h.phase(), Phase::Exiting);

    let effects = h.finish_animation().expect("exit animation");
    assert_eq!(effects.first(), Some(&Effect::ResumePreview));
    assert!(!h.state.preview_paused());
}

#[test]
fn test_sink_failure_is_reported_and_step_still_advances() {
    let mut h = MachineHarness::new(vec![photo_profile("rdt")]);
    h.settle();
    h.send(Event::CameraReady);
    h.send(Event::CaptureRequested);
    h.send(Event::PhotoTaken {
        step: 0,
        image: image("a.jpg"),
        is_emulated: true,
    });

    let effects = h.send(Event::PhotoStored {
        step: 0,
        image: image("a.jpg"),
        error: Some("disk full".to_string()),
    });
    assert!(effects.contains(&Effect::ReportFailure(CaptureFailure::Storage {
        step_id: "rdt".to_string(),
        reason: "disk full".to_string()
    })));
    assert_eq!(h.phase(), Phase::Exiting);
    h.settle();
    assert_eq!(h.finished_count(), 1);
}

#[test]
fn test_teardown_mid_grace_leaves_no_live_timer() {
    let mut h = MachineHarness::new(vec![barcode_profile("qr", Some(GRACE))]);
    h.settle();
    h.send(Event::FocusRequested {
        point: FocusPoint { x: 0.5, y: 0.5 },
    });
    assert_eq!(h.scheduler.outstanding(), 2);

    h.send(Event::Teardown);
    assert_eq!(h.scheduler.outstanding(), 0);
    assert_eq!(h.phase(), Phase::Finished);
    assert!(h.state.is_torn_down());
    assert_eq!(h.finished_count(), 0);
    assert!(h.state.live_timers().is_empty());
}

#[test]
fn test_stale_events_are_ignored() {
    let mut h = MachineHarness::new(vec![barcode_profile("qr", Some(GRACE)), photo_profile("rdt")]);
    h.settle();

    for event in [
        Event::EntryAnimationDone { step: 0 },
        Event::ExitAnimationDone { step: 0 },
        Event::SuccessAnimationDone { step: 0 },
        Event::ScanAccepted {
            step: 1,
            payload: "A".to_string(),
        },
        Event::TimerElapsed {
            timer: TimerId(999),
        },
        Event::PhotoStored {
            step: 0,
            image: image("a.jpg"),
            error: None,
        },
    ] {
        let before = h.state.clone();
        assert!(h.send(event.clone()).is_empty(), "{event:?} had effects");
        assert_eq!(h.state, before);
    }
}

#[test]
fn test_flash_cycles_only_on_active_manual_steps() {
    let mut h = MachineHarness::new(vec![barcode_profile("qr", None), photo_profile("rdt")]);
    h.settle();

    let before = h.state.clone();
    assert!(h.send(Event::FlashToggled).is_empty());
    assert_eq!(h.state, before);

    complete_current_step(&mut h);
    assert_eq!(h.state.step_index(), 1);
    assert!(h.effects.contains(&Effect::SetFlash(FlashState::On)));

    let mut seen = Vec::new();
    for _ in 0..3 {
        h.send(Event::FlashToggled);
        seen.push(h.state.flash_state());
    }
    assert_eq!(seen, vec![FlashState::Auto, FlashState::Off, FlashState::On]);
}

#[test]
fn test_focus_replaces_previous_indicator() {
    let mut h = MachineHarness::new(vec![photo_profile("rdt")]);
    h.settle();

    h.send(Event::FocusRequested {
        point: FocusPoint { x: 0.2, y: 0.3 },
    });
    let first = h.state.focus().expect("focus indicator");
    assert_eq!(
        h.scheduler.duration_of(first.timer),
        Some(Duration::from_millis(2000))
    );

    let effects = h.send(Event::FocusRequested {
        point: FocusPoint { x: 0.7, y: 0.7 },
    });
    let second = h.state.focus().expect("focus indicator");
    assert!(effects.contains(&Effect::CancelTimer(first.timer)));
    assert!(effects.contains(&Effect::FocusCamera(FocusPoint { x: 0.7, y: 0.7 })));
    assert_eq!(h.scheduler.outstanding(), 1);

    h.fire(second.timer);
    assert_eq!(h.state.focus(), None);
}

#[test]
fn test_focus_outside_viewport_is_ignored() {
    let mut h = MachineHarness::new(vec![photo_profile("rdt")]);
    h.settle();
    let before = h.state.clone();
    assert!(h
        .send(Event::FocusRequested {
            point: FocusPoint { x: 1.5, y: 0.5 },
        })
        .is_empty());
    assert_eq!(h.state, before);
}

#[test]
fn test_view_projection() {
    let mut h = MachineHarness::new(vec![
        skippable(barcode_profile("qr", None)),
        photo_profile("rdt"),
    ]);

    let view = h.machine.view(&h.state);
    assert_eq!(view.phase, Phase::Entering);
    assert_eq!(view.step_count, 2);
    assert_eq!(view.message.as_deref(), Some("Scan qr"));
    assert!(view.busy);
    assert!(!view.skip_enabled);
    assert_eq!(view.flash, None);

    h.settle();
    h.send(Event::CameraReady);
    let view = h.machine.view(&h.state);
    assert!(view.skip_enabled);
    assert!(!view.capture_enabled);
    assert!(!view.busy);

    complete_current_step(&mut h);
    h.settle();
    let view = h.machine.view(&h.state);
    assert_eq!(view.step_id, "rdt");
    assert!(view.capture_enabled);
    assert_eq!(view.flash, Some(FlashState::On));

    h.send(Event::CaptureRequested);
    let view = h.machine.view(&h.state);
    assert!(view.capturing);
    assert!(view.busy);
    assert!(!view.capture_enabled);
}

#[test]
fn test_scan_while_entering_without_grace_is_dropped() {
    let mut h = MachineHarness::new(vec![barcode_profile("qr", None)]);
    assert!(!h.machine.accepts_scan(&h.state));
    h.send(Event::ScanAccepted {
        step: 0,
        payload: "A".to_string(),
    });
    assert_eq!(h.phase(), Phase::Entering);
    assert!(!h.state.scan_accepted());

    h.finish_animation();
    assert_eq!(h.phase(), Phase::Active);
    assert!(!h.state.scan_accepted());
    assert_eq!(h.scheduler.outstanding(), 0);

    // A fresh scan once active confirms straight away
    assert!(h.machine.accepts_scan(&h.state));
    h.send(Event::ScanAccepted {
        step: 0,
        payload: "B".to_string(),
    });
    assert_eq!(h.phase(), Phase::ScanConfirming);
}
