//! Animation descriptors and a tokio-clock animator.
//!
//! The state machine never renders anything. It describes each transition as
//! an [`Animation`]: a group of tracks played in parallel, with an optional
//! event fed back into the workflow once the whole group has settled.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::capture::state_machine::{Event, Timings};
use crate::capture::traits::Animator;

/// Named progress values read by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Outline and prompt opacity
    OutlineOpacity,
    /// Dimmed mask inside the capture area
    MaskOpacity,
    /// 0 = resting outline width, 1 = success width
    OutlineWidth,
    /// 0 = neutral colour, 1 = success colour
    OutlineColor,
    /// White flash over the preview after a shot
    Shutter,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::OutlineOpacity,
        Channel::MaskOpacity,
        Channel::OutlineWidth,
        Channel::OutlineColor,
        Channel::Shutter,
    ];

    /// Value before any animation has touched the channel
    pub fn resting(self) -> f32 {
        match self {
            Channel::MaskOpacity => 1.0,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationKind {
    StepEntry,
    StepExit,
    ScanSuccess,
    Shutter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Track {
    /// Move a channel from its current value to `to`
    Tween {
        channel: Channel,
        to: f32,
        duration: Duration,
    },
    /// Rise from 0 to 1 and fall back to 0
    Pulse {
        channel: Channel,
        delay: Duration,
        rise: Duration,
        fall: Duration,
    },
}

impl Track {
    pub fn channel(&self) -> Channel {
        match self {
            Track::Tween { channel, .. } | Track::Pulse { channel, .. } => *channel,
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Track::Tween { duration, .. } => *duration,
            Track::Pulse {
                delay, rise, fall, ..
            } => *delay + *rise + *fall,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animation {
    pub kind: AnimationKind,
    pub tracks: Vec<Track>,
    /// Fed back into the workflow when every track has settled
    pub on_complete: Option<Event>,
}

impl Animation {
    pub fn step_entry(step: usize, timings: &Timings) -> Self {
        Self {
            kind: AnimationKind::StepEntry,
            tracks: vec![
                Track::Tween {
                    channel: Channel::OutlineOpacity,
                    to: 1.0,
                    duration: timings.entry_fade,
                },
                Track::Tween {
                    channel: Channel::MaskOpacity,
                    to: 0.0,
                    duration: timings.entry_fade,
                },
                Track::Tween {
                    channel: Channel::OutlineColor,
                    to: 0.0,
                    duration: Duration::ZERO,
                },
            ],
            on_complete: Some(Event::EntryAnimationDone { step }),
        }
    }

    pub fn step_exit(step: usize, timings: &Timings) -> Self {
        Self {
            kind: AnimationKind::StepExit,
            tracks: vec![
                Track::Tween {
                    channel: Channel::OutlineOpacity,
                    to: 0.0,
                    duration: timings.exit_fade,
                },
                Track::Tween {
                    channel: Channel::MaskOpacity,
                    to: 1.0,
                    duration: timings.exit_fade,
                },
            ],
            on_complete: Some(Event::ExitAnimationDone { step }),
        }
    }

    pub fn scan_success(step: usize, timings: &Timings) -> Self {
        let half = timings.success_animation / 2;
        Self {
            kind: AnimationKind::ScanSuccess,
            tracks: vec![
                Track::Pulse {
                    channel: Channel::OutlineWidth,
                    delay: Duration::ZERO,
                    rise: half,
                    fall: timings.success_animation - half,
                },
                Track::Tween {
                    channel: Channel::MaskOpacity,
                    to: 1.0,
                    duration: timings.success_animation,
                },
                Track::Tween {
                    channel: Channel::OutlineColor,
                    to: 1.0,
                    duration: timings.success_animation,
                },
            ],
            on_complete: Some(Event::SuccessAnimationDone { step }),
        }
    }

    /// Fire-and-forget flash shown while a photo is taken
    pub fn shutter(timings: &Timings) -> Self {
        Self {
            kind: AnimationKind::Shutter,
            tracks: vec![Track::Pulse {
                channel: Channel::Shutter,
                delay: timings.shutter_delay,
                rise: timings.shutter_rise,
                fall: timings.shutter_fall,
            }],
            on_complete: None,
        }
    }

    /// Time until the slowest track settles
    pub fn duration(&self) -> Duration {
        self.tracks
            .iter()
            .map(Track::duration)
            .max()
            .unwrap_or(Duration::ZERO)
    }
}

#[derive(Debug, Clone, Copy)]
enum Segment {
    Tween {
        from: f32,
        to: f32,
        start: Instant,
        duration: Duration,
    },
    Pulse {
        start: Instant,
        delay: Duration,
        rise: Duration,
        fall: Duration,
    },
}

fn progress(elapsed: Duration, duration: Duration) -> f32 {
    if duration.is_zero() || elapsed >= duration {
        1.0
    } else {
        elapsed.as_secs_f32() / duration.as_secs_f32()
    }
}

impl Segment {
    fn value_at(&self, now: Instant) -> f32 {
        match *self {
            Segment::Tween {
                from,
                to,
                start,
                duration,
            } => {
                let t = progress(now.saturating_duration_since(start), duration);
                from + (to - from) * t
            }
            Segment::Pulse {
                start,
                delay,
                rise,
                fall,
            } => {
                let elapsed = now.saturating_duration_since(start);
                if elapsed < delay {
                    0.0
                } else if elapsed < delay + rise {
                    progress(elapsed - delay, rise)
                } else if elapsed < delay + rise + fall {
                    1.0 - progress(elapsed - delay - rise, fall)
                } else {
                    0.0
                }
            }
        }
    }
}

/// Linear-interpolation animator driven by the tokio clock
#[derive(Debug, Default)]
pub struct TimelineAnimator {
    segments: Mutex<HashMap<Channel, Segment>>,
}

impl TimelineAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every channel, for renderers that poll
    pub fn values(&self) -> HashMap<Channel, f32> {
        Channel::ALL
            .iter()
            .map(|channel| (*channel, self.value(*channel)))
            .collect()
    }

    fn begin(&self, animation: &Animation) {
        let now = Instant::now();
        let mut segments = match self.segments.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for track in &animation.tracks {
            let channel = track.channel();
            let segment = match track {
                Track::Tween { to, duration, .. } => Segment::Tween {
                    from: segments
                        .get(&channel)
                        .map(|s| s.value_at(now))
                        .unwrap_or_else(|| channel.resting()),
                    to: *to,
                    start: now,
                    duration: *duration,
                },
                Track::Pulse {
                    delay, rise, fall, ..
                } => Segment::Pulse {
                    start: now,
                    delay: *delay,
                    rise: *rise,
                    fall: *fall,
                },
            };
            segments.insert(channel, segment);
        }
    }
}

#[async_trait]
impl Animator for TimelineAnimator {
    async fn play(&self, animation: &Animation) {
        self.begin(animation);
        tokio::time::sleep(animation.duration()).await;
    }

    fn value(&self, channel: Channel) -> f32 {
        let segments = match self.segments.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        segments
            .get(&channel)
            .map(|segment| segment.value_at(Instant::now()))
            .unwrap_or_else(|| channel.resting())
    }
}
