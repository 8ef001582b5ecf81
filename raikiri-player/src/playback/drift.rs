//! Drift Corrector
//!
//! Long adaptive-streamed playback lets the element's audio and video drift
//! apart. While a video plays, a fixed-interval tick applies one corrective
//! action: a tiny forward seek, or a short playback-rate bump that reverts on
//! its own.
//!
//! The corrector decides *what* to do; the controller applies the returned
//! [`DriftAction`] to the video sink. Ticks are posted to the controller's
//! internal channel through the constructor's message builders.

use super::scheduler::{TimerSlot, TimerTicket};
use super::sink::AttachmentId;
use crate::config::{DriftConfig, DriftStrategy};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Correction for the controller to apply to the video sink
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriftAction {
    /// Seek to this absolute position
    Seek(f64),
    /// Set the element's playback rate
    SetRate(f64),
}

/// Element state sampled at tick time
#[derive(Debug, Clone, Copy)]
pub struct DriftConditions {
    pub playing: bool,
    pub ready: bool,
    pub duration: Option<f64>,
    pub position: f64,
}

impl DriftConditions {
    fn allow_correction(&self) -> bool {
        self.playing && self.ready && self.duration.is_some_and(|d| d > 0.0)
    }
}

pub struct DriftCorrector<M> {
    config: DriftConfig,
    tx: UnboundedSender<M>,
    make_tick: fn(TimerTicket) -> M,
    make_revert: fn(TimerTicket) -> M,
    tick: TimerSlot,
    revert: TimerSlot,
    attachment: Option<AttachmentId>,
    base_rate: f64,
}

impl<M: Send + 'static> DriftCorrector<M> {
    pub fn new(
        config: DriftConfig,
        tx: UnboundedSender<M>,
        make_tick: fn(TimerTicket) -> M,
        make_revert: fn(TimerTicket) -> M,
    ) -> Self {
        Self {
            config,
            tx,
            make_tick,
            make_revert,
            tick: TimerSlot::new("drift"),
            revert: TimerSlot::new("drift-revert"),
            attachment: None,
            base_rate: 1.0,
        }
    }

    /// Begin periodic correction for the video on `attachment`
    ///
    /// Restarting for the attachment already running is a no-op, so a
    /// resume does not reset the interval phase.
    pub fn start(&mut self, attachment: AttachmentId) {
        if self.config.strategy == DriftStrategy::Disabled {
            return;
        }
        if self.attachment == Some(attachment) && self.tick.is_armed() {
            return;
        }
        self.stop();
        self.attachment = Some(attachment);
        debug!(
            "Drift correction every {:?} ({:?})",
            self.config.interval(),
            self.config.strategy
        );
        let make = self.make_tick;
        self.tick
            .arm_interval(self.config.interval(), &self.tx, move |ticket| make(ticket));
    }

    /// Cancel the tick and any pending revert; idempotent
    ///
    /// Returns the rate to restore when a bump was in effect.
    pub fn stop(&mut self) -> Option<f64> {
        self.tick.cancel();
        self.attachment = None;
        if self.revert.is_armed() {
            self.revert.cancel();
            return Some(self.base_rate);
        }
        None
    }

    /// Handle a tick message; `None` when stale or skipped
    pub fn on_tick(&mut self, ticket: TimerTicket, conditions: DriftConditions) -> Option<DriftAction> {
        if !self.tick.accept(ticket) {
            return None;
        }
        if !conditions.allow_correction() {
            debug!("Drift tick skipped: element not playing");
            return None;
        }

        match self.config.strategy {
            DriftStrategy::SeekNudge => {
                let target = conditions.position + self.config.nudge_secs;
                debug!("Drift nudge at {:.3}s", conditions.position);
                Some(DriftAction::Seek(target))
            }
            DriftStrategy::RateBump => {
                if self.revert.is_armed() {
                    return None;
                }
                let make = self.make_revert;
                self.revert
                    .arm(self.config.rate_bump(), &self.tx, move |ticket| make(ticket));
                debug!("Drift rate bump x{}", self.config.rate_factor);
                Some(DriftAction::SetRate(self.base_rate * self.config.rate_factor))
            }
            DriftStrategy::Disabled => None,
        }
    }

    /// Handle a revert message; restores the base rate
    pub fn on_revert(&mut self, ticket: TimerTicket) -> Option<DriftAction> {
        if !self.revert.accept(ticket) {
            return None;
        }
        Some(DriftAction::SetRate(self.base_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[derive(Debug)]
    enum Msg {
        Tick(TimerTicket),
        Revert(TimerTicket),
    }

    fn playing() -> DriftConditions {
        DriftConditions {
            playing: true,
            ready: true,
            duration: Some(3600.0),
            position: 100.0,
        }
    }

    fn corrector(
        strategy: DriftStrategy,
    ) -> (DriftCorrector<Msg>, mpsc::UnboundedReceiver<Msg>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let config = DriftConfig {
            strategy,
            ..DriftConfig::default()
        };
        (DriftCorrector::new(config, tx, Msg::Tick, Msg::Revert), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_seek_nudge_on_each_tick() {
        let (mut drift, mut rx) = corrector(DriftStrategy::SeekNudge);
        drift.start(1);

        tokio::time::advance(Duration::from_secs(120)).await;
        let Msg::Tick(ticket) = rx.recv().await.unwrap() else {
            panic!("expected tick");
        };
        match drift.on_tick(ticket, playing()) {
            Some(DriftAction::Seek(target)) => assert!((target - 100.001).abs() < 1e-9),
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_skipped_when_not_playing() {
        let (mut drift, mut rx) = corrector(DriftStrategy::SeekNudge);
        drift.start(1);

        tokio::time::advance(Duration::from_secs(120)).await;
        let Msg::Tick(ticket) = rx.recv().await.unwrap() else {
            panic!("expected tick");
        };
        let paused = DriftConditions {
            playing: false,
            ..playing()
        };
        assert_eq!(drift.on_tick(ticket, paused), None);

        let no_duration = DriftConditions {
            duration: None,
            ..playing()
        };
        assert_eq!(drift.on_tick(ticket, no_duration), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_bump_reverts() {
        let (mut drift, mut rx) = corrector(DriftStrategy::RateBump);
        drift.start(1);

        tokio::time::advance(Duration::from_secs(120)).await;
        let Msg::Tick(ticket) = rx.recv().await.unwrap() else {
            panic!("expected tick");
        };
        assert_eq!(drift.on_tick(ticket, playing()), Some(DriftAction::SetRate(1.02)));

        tokio::time::advance(Duration::from_millis(500)).await;
        let Msg::Revert(ticket) = rx.recv().await.unwrap() else {
            panic!("expected revert");
        };
        assert_eq!(drift.on_revert(ticket), Some(DriftAction::SetRate(1.0)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_pending_revert() {
        let (mut drift, mut rx) = corrector(DriftStrategy::RateBump);
        drift.start(1);

        tokio::time::advance(Duration::from_secs(120)).await;
        let Msg::Tick(ticket) = rx.recv().await.unwrap() else {
            panic!("expected tick");
        };
        drift.on_tick(ticket, playing());

        assert_eq!(drift.stop(), Some(1.0));
        assert_eq!(drift.stop(), None);

        tokio::time::advance(Duration::from_secs(600)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_never_arms() {
        let (mut drift, mut rx) = corrector(DriftStrategy::Disabled);
        drift.start(1);

        tokio::time::advance(Duration::from_secs(600)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_same_attachment_keeps_phase() {
        let (mut drift, mut rx) = corrector(DriftStrategy::SeekNudge);
        drift.start(1);
        tokio::time::advance(Duration::from_secs(100)).await;
        drift.start(1);
        tokio::time::advance(Duration::from_secs(20)).await;
        assert!(matches!(rx.recv().await, Some(Msg::Tick(_))));
    }
}
