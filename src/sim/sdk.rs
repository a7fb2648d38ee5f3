use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use flume::{Receiver, Sender};
use tracing::debug;

use super::{EventLine, Transport, lock};
use crate::audio::{
    controllers::premium::{
        PlaybackApi, SdkEvent, SdkState, SdkTrack, TrackWindow, WebPlaybackSdk,
    },
    error::LoadError,
};

/// Simulated web playback SDK acting as one playback device.
pub struct SimSdk {
    loaded: bool,
    connect_failure: Mutex<Option<SdkEvent>>,
    events: EventLine<SdkEvent>,
    transport: Transport,
    volume: Mutex<f32>,
}

fn snapshot(track_id: Option<String>, paused: bool, ended: bool, position: Duration) -> SdkState {
    let current_track = track_id.map(|id| SdkTrack { id });
    let previous_tracks = match (&current_track, ended) {
        (Some(track), true) => vec![track.clone()],
        _ => vec![],
    };

    SdkState {
        paused,
        position_ms: position.as_millis() as u64,
        track_window: TrackWindow {
            current_track,
            previous_tracks,
            next_tracks: vec![],
        },
    }
}

fn send_state(tx: &Sender<SdkEvent>, state: SdkState) {
    let _ = tx.send(SdkEvent::PlayerStateChanged(Some(state)));
}

impl SimSdk {
    pub const DEVICE_ID: &'static str = "sim-device";

    pub fn new() -> Self {
        Self::build(true, None)
    }

    pub fn with_track_length(length: Duration) -> Self {
        Self::build(true, Some(length))
    }

    pub fn unavailable() -> Self {
        Self::build(false, None)
    }

    fn build(loaded: bool, track_length: Option<Duration>) -> Self {
        Self {
            loaded,
            connect_failure: Mutex::new(None),
            events: EventLine::new(),
            transport: Transport::new(track_length),
            volume: Mutex::new(1.0),
        }
    }

    /// Makes the next `connect` report `event` instead of a ready device.
    pub fn fail_connect(&self, event: SdkEvent) {
        *lock(&self.connect_failure) = Some(event);
    }

    pub fn mark_unavailable(&self, track_id: &str) {
        self.transport.mark_unavailable(track_id);
    }

    pub fn emit(&self, event: SdkEvent) {
        self.events.send(event);
    }

    /// Plays the current track out. The SDK reports this as a pause with
    /// the track moved into the previous-tracks window.
    pub fn finish(&self) {
        let current = self.transport.current();
        if self.transport.finish() {
            self.push_state(snapshot(current, true, true, Duration::ZERO));
        }
    }

    pub fn disconnect(&self) {
        self.events.close();
    }

    pub async fn wait_idle(&self) {
        self.events.wait_idle().await;
    }

    pub fn current_track(&self) -> Option<String> {
        self.transport.current()
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    pub fn volume(&self) -> f32 {
        *lock(&self.volume)
    }

    fn push_state(&self, state: SdkState) {
        if let Some(tx) = self.events.sender() {
            send_state(&tx, state);
        }
    }

    fn push_current(&self, paused: bool) {
        self.push_state(snapshot(
            self.transport.current(),
            paused,
            false,
            self.transport.position(),
        ));
    }

    fn start(&self, track_id: &str) {
        self.transport.cue(track_id);
        self.resume();
    }
}

impl Default for SimSdk {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebPlaybackSdk for SimSdk {
    fn script_loaded(&self) -> bool {
        self.loaded
    }

    async fn sdk_ready(&self) {}

    fn connect(&self, name: &str, _access_token: &str) -> Receiver<SdkEvent> {
        debug!(name, "sim_sdk_connect");
        let rx = self.events.open();

        match lock(&self.connect_failure).take() {
            Some(event) => self.events.send(event),
            None => self.events.send(SdkEvent::Ready {
                device_id: Self::DEVICE_ID.to_string(),
            }),
        }
        rx
    }

    fn resume(&self) {
        let on_end = self.events.sender();
        let current = self.transport.current();
        let started = self.transport.play(move || {
            if let Some(tx) = on_end {
                send_state(&tx, snapshot(current, true, true, Duration::ZERO));
            }
        });
        if started {
            self.push_current(false);
        }
    }

    fn pause(&self) {
        if self.transport.pause() {
            self.push_current(true);
        }
    }

    fn set_volume(&self, volume: f32) {
        *lock(&self.volume) = volume;
    }

    fn seek(&self, millis: u64) {
        self.transport.seek(Duration::from_millis(millis));
        self.push_current(!self.transport.is_playing());
    }
}

/// Web API stand-in that starts tracks on a [`SimSdk`] device.
pub struct SimPlaybackApi {
    sdk: Arc<SimSdk>,
}

impl SimPlaybackApi {
    pub fn new(sdk: Arc<SimSdk>) -> Self {
        Self { sdk }
    }
}

#[async_trait]
impl PlaybackApi for SimPlaybackApi {
    async fn start_playback(&self, device_id: &str, uri: &str) -> Result<(), LoadError> {
        if device_id != SimSdk::DEVICE_ID {
            return Err(LoadError::NetworkFailure(format!(
                "device {device_id} not found"
            )));
        }

        let track_id = uri.rsplit(':').next().unwrap_or(uri);
        if !self.sdk.transport.is_available(track_id) {
            return Err(LoadError::UnknownTrackId(track_id.to_string()));
        }

        self.sdk.start(track_id);
        Ok(())
    }
}
