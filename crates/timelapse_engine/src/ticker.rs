use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use timelapse_logging::tl_debug;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{EngineEvent, SubmissionId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickerSettings {
    pub interval: Duration,
    /// Each tick adds a uniform random increment in `[0, max_increment)`.
    pub max_increment: f32,
}

impl Default for TickerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            max_increment: 10.0,
        }
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelEventSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Owns a running progress ticker. The ticker stops when the guard is dropped.
#[derive(Debug)]
pub struct TickerGuard {
    submission: SubmissionId,
    cancel: CancellationToken,
}

impl TickerGuard {
    pub fn submission(&self) -> SubmissionId {
        self.submission
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for TickerGuard {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Starts emitting `EngineEvent::ProgressTick` for `submission` every interval.
pub fn spawn_ticker(
    runtime: &tokio::runtime::Handle,
    submission: SubmissionId,
    settings: TickerSettings,
    sink: Arc<dyn EventSink>,
) -> TickerGuard {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    runtime.spawn(async move {
        let mut ticks = interval_at(Instant::now() + settings.interval, settings.interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticks.tick() => {
                    sink.emit(EngineEvent::ProgressTick {
                        submission,
                        increment: random_increment(settings.max_increment),
                    });
                }
            }
        }
        tl_debug!("Progress ticker for submission {} stopped", submission);
    });

    TickerGuard { submission, cancel }
}

fn random_increment(max_increment: f32) -> f32 {
    if max_increment.is_finite() && max_increment > 0.0 {
        rand::thread_rng().gen_range(0.0..max_increment)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::random_increment;

    #[test]
    fn increments_stay_in_range() {
        for _ in 0..1000 {
            let value = random_increment(10.0);
            assert!((0.0..10.0).contains(&value));
        }
    }

    #[test]
    fn degenerate_maximum_yields_zero() {
        assert_eq!(random_increment(0.0), 0.0);
        assert_eq!(random_increment(-1.0), 0.0);
        assert_eq!(random_increment(f32::NAN), 0.0);
    }
}
