//! Timer slots
//!
//! One outstanding timer per concern (image dwell, drift tick, rate revert).
//! A slot spawns a tokio task that posts a message back to the controller's
//! internal channel; re-arming or cancelling aborts the previous task.
//!
//! Aborting a task does not retract a message it already sent, so every arm
//! gets a fresh [`TimerTicket`] and the controller calls [`TimerSlot::accept`]
//! before acting on a timer message.

use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::trace;

/// Identifies one arming of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTicket(u64);

#[derive(Debug)]
pub struct TimerSlot {
    name: &'static str,
    generation: u64,
    handle: Option<JoinHandle<()>>,
    /// Deadline of an armed one-shot timer
    deadline: Option<Instant>,
    repeating: bool,
}

impl TimerSlot {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            generation: 0,
            handle: None,
            deadline: None,
            repeating: false,
        }
    }

    /// Fire `make(ticket)` once after `delay`, replacing any armed timer
    pub fn arm<M, F>(&mut self, delay: Duration, tx: &UnboundedSender<M>, make: F) -> TimerTicket
    where
        M: Send + 'static,
        F: FnOnce(TimerTicket) -> M + Send + 'static,
    {
        let ticket = self.rearm();
        let tx = tx.clone();
        let deadline = Instant::now() + delay;
        self.deadline = Some(deadline);
        self.repeating = false;
        trace!("Arming {} timer for {:?}", self.name, delay);

        // Deadline is fixed here, not when the task is first polled
        let sleep = tokio::time::sleep_until(deadline);
        self.handle = Some(tokio::spawn(async move {
            sleep.await;
            let _ = tx.send(make(ticket));
        }));
        ticket
    }

    /// Fire `make(ticket)` every `period`, first after one full period
    ///
    /// Ticks missed while the runtime was busy are skipped, not queued.
    pub fn arm_interval<M, F>(
        &mut self,
        period: Duration,
        tx: &UnboundedSender<M>,
        make: F,
    ) -> TimerTicket
    where
        M: Send + 'static,
        F: Fn(TimerTicket) -> M + Send + 'static,
    {
        let ticket = self.rearm();
        let tx = tx.clone();
        self.deadline = None;
        self.repeating = true;
        trace!("Arming {} interval every {:?}", self.name, period);

        let first = Instant::now() + period;
        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(first, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if tx.send(make(ticket)).is_err() {
                    break;
                }
            }
        }));
        ticket
    }

    /// Cancel the armed timer, returning the time a one-shot had left
    pub fn cancel(&mut self) -> Option<Duration> {
        let remaining = self.remaining();
        if let Some(handle) = self.handle.take() {
            handle.abort();
            trace!("Cancelled {} timer", self.name);
        }
        self.deadline = None;
        self.repeating = false;
        self.generation += 1;
        remaining
    }

    /// Whether a message carrying `ticket` should be acted on
    ///
    /// A one-shot is disarmed by accepting its message; an interval stays armed.
    pub fn accept(&mut self, ticket: TimerTicket) -> bool {
        if ticket.0 != self.generation || self.handle.is_none() {
            return false;
        }
        if !self.repeating {
            self.handle = None;
            self.deadline = None;
        }
        true
    }

    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }

    /// Time left on an armed one-shot
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    fn rearm(&mut self) -> TimerTicket {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.generation += 1;
        TimerTicket(self.generation)
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_one_shot_fires_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut slot = TimerSlot::new("dwell");

        let ticket = slot.arm(Duration::from_secs(5), &tx, |t| t);
        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(slot.remaining(), Some(Duration::from_secs(1)));

        tokio::time::advance(Duration::from_secs(1)).await;
        let fired = rx.recv().await.unwrap();
        assert_eq!(fired, ticket);
        assert!(slot.accept(fired));
        assert!(!slot.is_armed());
        assert!(!slot.accept(fired));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_reports_remaining_and_suppresses() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut slot = TimerSlot::new("dwell");

        slot.arm(Duration::from_secs(5), &tx, |t| t);
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(slot.cancel(), Some(Duration::from_secs(3)));

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(slot.cancel(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_invalidates_previous_ticket() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut slot = TimerSlot::new("dwell");

        let first = slot.arm(Duration::from_millis(10), &tx, |t| t);
        tokio::time::advance(Duration::from_millis(10)).await;
        // Message already posted before the re-arm
        let stale = rx.recv().await.unwrap();
        let second = slot.arm(Duration::from_secs(1), &tx, |t| t);

        assert_eq!(stale, first);
        assert!(!slot.accept(stale));
        assert!(slot.is_armed());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(rx.recv().await.unwrap(), second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_ticks_until_cancelled() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut slot = TimerSlot::new("drift");

        let ticket = slot.arm_interval(Duration::from_secs(120), &tx, |t| t);
        tokio::time::advance(Duration::from_secs(119)).await;
        assert!(rx.try_recv().is_err());

        for _ in 0..3 {
            tokio::time::advance(Duration::from_secs(1)).await;
            let fired = rx.recv().await.unwrap();
            assert!(slot.accept(fired));
            assert_eq!(fired, ticket);
            tokio::time::advance(Duration::from_secs(119)).await;
        }

        slot.cancel();
        tokio::time::advance(Duration::from_secs(600)).await;
        assert!(rx.try_recv().is_err());
        assert!(!slot.accept(ticket));
    }
}
