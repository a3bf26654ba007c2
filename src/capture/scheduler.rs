// Tokio-backed one-shot timers for the capture session

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::capture::state_machine::{Event, TimerId};
use crate::capture::traits::Scheduler;

/// Spawns one sleeping task per timer; firing sends `Event::TimerElapsed`
#[derive(Debug)]
pub struct TokioScheduler {
    events: mpsc::UnboundedSender<Event>,
    timers: HashMap<TimerId, JoinHandle<()>>,
}

impl TokioScheduler {
    pub fn new(events: mpsc::UnboundedSender<Event>) -> Self {
        Self {
            events,
            timers: HashMap::new(),
        }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, id: TimerId, after: Duration) {
        self.timers.retain(|_, handle| !handle.is_finished());

        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            // Receiver gone means the session already ended
            let _ = events.send(Event::TimerElapsed { timer: id });
        });
        if let Some(previous) = self.timers.insert(id, handle) {
            previous.abort();
        }
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(handle) = self.timers.remove(&id) {
            handle.abort();
        }
    }

    fn cancel_all(&mut self) {
        for (timer, handle) in self.timers.drain() {
            debug!(timer = timer.0, "Cancelling timer");
            handle.abort();
        }
    }

    fn outstanding(&self) -> usize {
        self.timers
            .values()
            .filter(|handle| !handle.is_finished())
            .count()
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
