//! Cancellable single-shot timers
//!
//! The controller never sleeps. It asks a [`Scheduler`] to deliver a
//! [`TimerEvent`] later and keeps the returned [`TimerHandle`]. Cancelling
//! (or dropping) the handle guarantees the event is never delivered by the
//! scheduler; the epoch carried in the event additionally lets the
//! controller discard anything already in flight.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// What a timer is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Readiness was not signalled in time
    LoadTimeout,
    /// Start the next connection attempt
    Retry,
    /// Probe the alternate stream
    HealthCheck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerEvent {
    pub kind: TimerKind,
    /// Controller epoch at scheduling time
    pub epoch: u64,
}

/// Handle to a scheduled timer; cancels it when dropped
#[derive(Debug)]
pub struct TimerHandle {
    token: CancellationToken,
}

impl TimerHandle {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Source of delayed timer events
pub trait Scheduler: Send {
    fn schedule(&mut self, delay: Duration, event: TimerEvent) -> TimerHandle;
}

/// Scheduler that sleeps on the tokio timer and delivers into a channel
pub struct TokioScheduler {
    tx: mpsc::UnboundedSender<TimerEvent>,
}

impl TokioScheduler {
    pub fn new(tx: mpsc::UnboundedSender<TimerEvent>) -> Self {
        Self { tx }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, delay: Duration, event: TimerEvent) -> TimerHandle {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let tx = self.tx.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _ = tx.send(event);
                }
            }
        });

        TimerHandle::new(token)
    }
}

/// A timer recorded by [`ManualScheduler`]
#[derive(Debug, Clone)]
pub struct ScheduledTimer {
    pub delay: Duration,
    pub event: TimerEvent,
    token: CancellationToken,
}

impl ScheduledTimer {
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Scheduler that only records requests; the caller decides when they fire
///
/// Clones share the same timer list.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    timers: Arc<Mutex<Vec<ScheduledTimer>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every timer ever scheduled, cancelled ones included
    pub fn all(&self) -> Vec<ScheduledTimer> {
        self.timers.lock().clone()
    }

    /// Timers that are still live
    pub fn pending(&self) -> Vec<ScheduledTimer> {
        self.timers
            .lock()
            .iter()
            .filter(|t| !t.is_cancelled())
            .cloned()
            .collect()
    }

    /// Remove and return the oldest live timer of the given kind
    ///
    /// The returned event is what the scheduler would deliver if the timer
    /// elapsed now.
    pub fn fire(&self, kind: TimerKind) -> Option<TimerEvent> {
        let mut timers = self.timers.lock();
        let index = timers
            .iter()
            .position(|t| t.event.kind == kind && !t.is_cancelled())?;
        Some(timers.remove(index).event)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, delay: Duration, event: TimerEvent) -> TimerHandle {
        let token = CancellationToken::new();
        self.timers.lock().push(ScheduledTimer {
            delay,
            event,
            token: token.clone(),
        });
        TimerHandle::new(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: TimerKind) -> TimerEvent {
        TimerEvent { kind, epoch: 1 }
    }

    #[test]
    fn test_manual_scheduler_fires_in_order() {
        let mut scheduler = ManualScheduler::new();
        let _a = scheduler.schedule(Duration::from_secs(1), event(TimerKind::Retry));
        let _b = scheduler.schedule(Duration::from_secs(15), event(TimerKind::LoadTimeout));

        assert_eq!(scheduler.pending().len(), 2);
        assert_eq!(scheduler.fire(TimerKind::Retry), Some(event(TimerKind::Retry)));
        assert_eq!(scheduler.fire(TimerKind::Retry), None);
        assert_eq!(scheduler.pending().len(), 1);
    }

    #[test]
    fn test_dropped_handle_cancels() {
        let mut scheduler = ManualScheduler::new();
        let handle = scheduler.schedule(Duration::from_secs(3), event(TimerKind::Retry));
        drop(handle);

        assert!(scheduler.pending().is_empty());
        assert!(scheduler.all()[0].is_cancelled());
        assert_eq!(scheduler.fire(TimerKind::Retry), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_delivers() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = TokioScheduler::new(tx);

        let _handle = scheduler.schedule(Duration::from_secs(3), event(TimerKind::Retry));
        assert_eq!(rx.recv().await, Some(event(TimerKind::Retry)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_cancel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = TokioScheduler::new(tx);

        let handle = scheduler.schedule(Duration::from_secs(1), event(TimerKind::Retry));
        handle.cancel();
        assert!(handle.is_cancelled());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }
}
