//! Transport and queue commands

use super::core::{ActiveBackend, PlaybackController, Transport};
use super::core::Internal;
use super::Command;
use crate::error::Result;
use crate::playback::queue_store::Advance;
use raikiri_common::events::{PlaybackStatus, PlayerEvent, QueueChangeTrigger};
use raikiri_common::{QueueContext, QueueItem};
use tracing::{debug, info};

impl PlaybackController {
    pub(super) fn handle_command(&mut self, command: Command) -> Result<()> {
        match command {
            Command::SetQueue {
                items,
                start_index,
                context,
            } => self.set_queue(items, start_index, context),
            Command::Play => {
                self.play();
                Ok(())
            }
            Command::Pause => {
                self.pause();
                Ok(())
            }
            Command::Toggle => {
                if self.status == PlaybackStatus::Playing
                    || (self.status == PlaybackStatus::Loading && !self.pause_requested)
                {
                    self.pause();
                } else {
                    self.play();
                }
                Ok(())
            }
            Command::Next => {
                self.next();
                Ok(())
            }
            Command::Previous => {
                self.previous();
                Ok(())
            }
            Command::Stop => {
                self.stop();
                Ok(())
            }
            Command::JumpTo(index) => self.jump_to(index),
            Command::Seek(percent) => {
                self.seek(percent);
                Ok(())
            }
            Command::SeekBy(seconds) => {
                self.seek_by(seconds);
                Ok(())
            }
            Command::RemoveAt(index) => self.remove_at(index),
            Command::SetMuted(muted) => {
                self.set_muted(muted);
                Ok(())
            }
        }
    }

    fn set_queue(
        &mut self,
        items: Vec<QueueItem>,
        start_index: i64,
        context: QueueContext,
    ) -> Result<()> {
        let count = items.len();
        let start = self.queue.set_queue(items, start_index, context)?;
        info!("Queue replaced: {} items, start {:?}", count, start);

        self.emit_queue_changed(QueueChangeTrigger::Replaced);
        self.pause_requested = false;
        match start {
            Some(_) => self.begin_load(),
            None => self.unload(PlaybackStatus::Idle),
        }
        Ok(())
    }

    fn play(&mut self) {
        match self.status {
            PlaybackStatus::Playing => {}
            PlaybackStatus::Loading => self.pause_requested = false,
            PlaybackStatus::Paused => self.resume(),
            PlaybackStatus::Ended => {
                if self.queue.is_empty() {
                    return;
                }
                debug!("Restarting queue from the beginning");
                if self.queue.jump_to(0).is_ok() {
                    self.emit_queue_changed(QueueChangeTrigger::PositionChanged);
                    self.begin_load();
                }
            }
            PlaybackStatus::Idle => {
                // Retry a failed item, or load the current one
                if self.queue.current_index().is_some() {
                    self.begin_load();
                }
            }
        }
    }

    fn resume(&mut self) {
        match self.active_backend() {
            Some(ActiveBackend::Image) => {
                let remaining = self.dwell_remaining.take();
                let delay = match remaining {
                    Some(left) if !self.config.resume_full_dwell => left,
                    _ => self.config.dwell(),
                };
                self.dwell.arm(delay, &self.internal_tx, Internal::DwellElapsed);
            }
            Some(ActiveBackend::Audio(_)) | Some(ActiveBackend::Video(Some(_))) => {
                self.direct_element(Transport::Play)
            }
            _ => return,
        }
        self.set_status(PlaybackStatus::Playing);
        self.emit_progress();
    }

    fn pause(&mut self) {
        match self.status {
            PlaybackStatus::Loading => {
                debug!("Pause requested while loading");
                self.pause_requested = true;
            }
            PlaybackStatus::Playing => {
                match self.active_backend() {
                    Some(ActiveBackend::Image) => {
                        self.dwell_remaining = self.dwell.cancel();
                    }
                    _ => self.direct_element(Transport::Pause),
                }
                self.set_status(PlaybackStatus::Paused);
                self.emit_progress();
            }
            _ => {}
        }
    }

    fn next(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        match self.queue.next() {
            Advance::Moved(index) => {
                debug!("Next -> [{}]", index);
                self.emit_queue_changed(QueueChangeTrigger::PositionChanged);
                self.pause_requested = false;
                self.begin_load();
            }
            Advance::EndOfQueue => {
                if self.status != PlaybackStatus::Ended {
                    self.enter_ended();
                }
            }
        }
    }

    fn previous(&mut self) {
        if let Some(index) = self.queue.prev() {
            debug!("Previous -> [{}]", index);
            self.emit_queue_changed(QueueChangeTrigger::PositionChanged);
            self.pause_requested = false;
            self.begin_load();
        }
    }

    fn jump_to(&mut self, index: usize) -> Result<()> {
        self.queue.jump_to(index)?;
        debug!("Jump -> [{}]", index);
        self.emit_queue_changed(QueueChangeTrigger::PositionChanged);
        self.pause_requested = false;
        self.begin_load();
        Ok(())
    }

    fn stop(&mut self) {
        info!("Stopping playback");
        self.queue.clear();
        self.emit_queue_changed(QueueChangeTrigger::Cleared);
        self.unload(PlaybackStatus::Idle);
    }

    /// Tear down the current item without loading another
    fn unload(&mut self, status: PlaybackStatus) {
        self.teardown();
        self.active = None;
        self.pause_requested = false;
        self.last_error = None;
        self.set_status(status);
    }

    /// Seek to `percent` of the authoritative duration
    fn seek(&mut self, percent: f64) {
        let Some(duration) = self.authoritative_duration() else {
            debug!("Seek ignored: no known duration");
            return;
        };
        let percent = if percent.is_nan() { 0.0 } else { percent.clamp(0.0, 100.0) };
        self.seek_to(duration * percent / 100.0);
    }

    /// Seek relative to the current position, staying short of the end
    fn seek_by(&mut self, seconds: f64) {
        let Some(duration) = self.authoritative_duration() else {
            debug!("Seek ignored: no known duration");
            return;
        };
        if !seconds.is_finite() {
            return;
        }
        let upper = (duration - self.config.seek_epsilon_secs).max(0.0);
        let target = (self.current_position() + seconds).clamp(0.0, upper);
        self.seek_to(target);
    }

    fn seek_to(&mut self, target: f64) {
        match self.active_backend() {
            Some(ActiveBackend::Audio(_)) => {
                self.audio.seek(target);
                self.audio_status.position = target;
            }
            Some(ActiveBackend::Video(Some(_))) => {
                self.video.seek(target);
                self.video_status.position = target;
            }
            _ => return,
        }
        debug!("Seek to {:.2}s", target);
        self.emit_progress();
    }

    fn remove_at(&mut self, index: usize) -> Result<()> {
        let removal = self.queue.remove_at(index)?;
        debug!("Removed [{}] {}", index, removal.removed.path);
        self.emit_queue_changed(QueueChangeTrigger::ItemRemoved);

        if self.queue.is_empty() {
            self.unload(PlaybackStatus::Idle);
            return Ok(());
        }

        if removal.was_current {
            if self.status.is_active() {
                self.begin_load();
            } else {
                // Nothing is playing; forget the removed item
                self.teardown();
                self.active = None;
                self.last_error = None;
            }
        }
        Ok(())
    }

    fn set_muted(&mut self, muted: bool) {
        if self.muted == muted {
            return;
        }
        self.muted = muted;
        self.audio.set_muted(muted);
        self.video.set_muted(muted);
        self.state.broadcast_event(PlayerEvent::MutedChanged {
            muted,
            timestamp: chrono::Utc::now(),
        });
    }
}
