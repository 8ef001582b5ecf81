//! MPRIS / SMTC / Now Playing backend via `souvlaki`

use super::{ControlCallback, NowPlaying, NowPlayingMetadata, TransportControl, TransportState, SEEK_STEP_SECS};
use crate::error::{Error, Result};
use souvlaki::{
    MediaControlEvent, MediaControls, MediaMetadata, MediaPlayback, MediaPosition, PlatformConfig,
    SeekDirection,
};
use std::time::Duration;

const DISPLAY_NAME: &str = "Raikiri";
const DBUS_NAME: &str = "raikiri_player";

pub struct SouvlakiNowPlaying {
    controls: MediaControls,
}

impl SouvlakiNowPlaying {
    #[cfg(not(target_os = "windows"))]
    pub fn new() -> Result<Self> {
        let controls = MediaControls::new(PlatformConfig {
            display_name: DISPLAY_NAME,
            dbus_name: DBUS_NAME,
            hwnd: None,
        })
        .map_err(|e| Error::OsIntegrationUnsupported(format!("{:?}", e)))?;
        Ok(Self { controls })
    }

    // Windows needs a window handle, and the player is headless
    #[cfg(target_os = "windows")]
    pub fn new() -> Result<Self> {
        Err(Error::OsIntegrationUnsupported(
            "media controls need a window handle on Windows".to_string(),
        ))
    }
}

impl NowPlaying for SouvlakiNowPlaying {
    fn attach(&mut self, on_control: ControlCallback) -> Result<()> {
        self.controls
            .attach(move |event| {
                if let Some(control) = transport_control(event) {
                    on_control(control);
                }
            })
            .map_err(|e| Error::OsIntegrationUnsupported(format!("{:?}", e)))
    }

    fn set_metadata(&mut self, metadata: &NowPlayingMetadata) -> Result<()> {
        self.controls
            .set_metadata(MediaMetadata {
                title: Some(metadata.title.as_str()),
                artist: metadata.artist.as_deref(),
                album: metadata.album.as_deref(),
                cover_url: metadata.artwork_url.as_deref(),
                duration: metadata.duration,
            })
            .map_err(|e| Error::OsIntegrationUnsupported(format!("{:?}", e)))
    }

    fn set_playback(&mut self, state: TransportState, position: Option<Duration>) -> Result<()> {
        let progress = position.map(MediaPosition);
        let playback = match state {
            TransportState::Stopped => MediaPlayback::Stopped,
            TransportState::Paused => MediaPlayback::Paused { progress },
            TransportState::Playing => MediaPlayback::Playing { progress },
        };
        self.controls
            .set_playback(playback)
            .map_err(|e| Error::OsIntegrationUnsupported(format!("{:?}", e)))
    }

    fn clear(&mut self) -> Result<()> {
        self.controls
            .set_metadata(MediaMetadata::default())
            .map_err(|e| Error::OsIntegrationUnsupported(format!("{:?}", e)))
    }
}

fn transport_control(event: MediaControlEvent) -> Option<TransportControl> {
    let signed = |direction: SeekDirection, secs: f64| match direction {
        SeekDirection::Forward => secs,
        SeekDirection::Backward => -secs,
    };
    match event {
        MediaControlEvent::Play => Some(TransportControl::Play),
        MediaControlEvent::Pause => Some(TransportControl::Pause),
        MediaControlEvent::Toggle => Some(TransportControl::Toggle),
        MediaControlEvent::Next => Some(TransportControl::Next),
        MediaControlEvent::Previous => Some(TransportControl::Previous),
        MediaControlEvent::Stop => Some(TransportControl::Stop),
        MediaControlEvent::SetPosition(position) => {
            Some(TransportControl::SeekTo(position.0.as_secs_f64()))
        }
        MediaControlEvent::SeekBy(direction, delta) => {
            Some(TransportControl::SeekBy(signed(direction, delta.as_secs_f64())))
        }
        MediaControlEvent::Seek(direction) => {
            Some(TransportControl::SeekBy(signed(direction, SEEK_STEP_SECS)))
        }
        MediaControlEvent::SetVolume(_)
        | MediaControlEvent::OpenUri(_)
        | MediaControlEvent::Raise
        | MediaControlEvent::Quit => None,
    }
}
