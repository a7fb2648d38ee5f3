use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use flume::Receiver;
use tracing::{debug, info, warn};

use super::ControllerCore;
use crate::audio::{
    error::{InitError, LoadError},
    service::ServiceTag,
    traits::{PlaybackControl, TrackEndCallback, Volume},
};

pub const PLAYER_NAME: &str = "Embed Controller";

pub fn track_uri(track_id: &str) -> String {
    format!("spotify:track:{track_id}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdkTrack {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackWindow {
    pub current_track: Option<SdkTrack>,
    pub previous_tracks: Vec<SdkTrack>,
    pub next_tracks: Vec<SdkTrack>,
}

/// Player state snapshot as pushed by the playback SDK.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SdkState {
    pub paused: bool,
    pub position_ms: u64,
    pub track_window: TrackWindow,
}

impl SdkState {
    fn current_in_previous(&self) -> bool {
        match &self.track_window.current_track {
            Some(current) => self
                .track_window
                .previous_tracks
                .iter()
                .any(|track| track.id == current.id),
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SdkEvent {
    Ready { device_id: String },
    NotReady { device_id: String },
    InitializationError(String),
    AuthenticationError(String),
    AccountError(String),
    PlaybackError(String),
    /// `None` once playback moved to another device.
    PlayerStateChanged(Option<SdkState>),
}

/// Host side of the web playback SDK.
#[async_trait]
pub trait WebPlaybackSdk: Send + Sync + 'static {
    fn script_loaded(&self) -> bool;
    /// Resolves once the SDK's global ready hook fired.
    async fn sdk_ready(&self);
    fn connect(&self, name: &str, access_token: &str) -> Receiver<SdkEvent>;

    fn resume(&self);
    fn pause(&self);
    fn set_volume(&self, volume: f32);
    fn seek(&self, millis: u64);
}

/// The REST call that starts a track on a given playback device.
#[async_trait]
pub trait PlaybackApi: Send + Sync + 'static {
    async fn start_playback(&self, device_id: &str, uri: &str) -> Result<(), LoadError>;
}

/// Infers end-of-track from consecutive state snapshots; the SDK has no
/// dedicated event. A track ended when it shows up in its own
/// `previous_tracks` and the player went from playing to paused.
#[derive(Debug, Default)]
pub struct TrackEndDetector {
    last: Option<SdkState>,
}

impl TrackEndDetector {
    pub fn observe(&mut self, state: Option<SdkState>) -> bool {
        let ended = match (&self.last, &state) {
            (Some(last), Some(state)) => {
                state.current_in_previous() && !last.paused && state.paused
            }
            _ => false,
        };
        self.last = state;
        ended
    }
}

pub struct PremiumController<S: WebPlaybackSdk, P: PlaybackApi> {
    sdk: Arc<S>,
    api: Arc<P>,
    access_token: Option<String>,
    core: Arc<ControllerCore>,
    device_id: Arc<Mutex<Option<String>>>,
}

impl<S: WebPlaybackSdk, P: PlaybackApi> PremiumController<S, P> {
    pub fn new(sdk: Arc<S>, api: Arc<P>, access_token: Option<String>) -> Self {
        Self {
            sdk,
            api,
            access_token,
            core: ControllerCore::new(ServiceTag::PremiumAudio),
            device_id: Arc::new(Mutex::new(None)),
        }
    }

    pub fn device_id(&self) -> Option<String> {
        self.device_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn ensure_ready(&self, op: &str) -> bool {
        if !self.core.is_ready() {
            warn!(service = %self.core.service, op, "controller_not_ready");
        }
        self.core.is_ready()
    }
}

fn init_failure(event: &SdkEvent) -> Option<InitError> {
    match event {
        SdkEvent::InitializationError(message) => Some(InitError::Initialization(message.clone())),
        SdkEvent::AuthenticationError(message) => {
            Some(InitError::AuthenticationFailed(message.clone()))
        }
        SdkEvent::AccountError(message) => Some(InitError::AccountIneligible(message.clone())),
        SdkEvent::NotReady { device_id } => Some(InitError::DeviceWentOffline(device_id.clone())),
        _ => None,
    }
}

async fn listen(
    core: Arc<ControllerCore>,
    device: Arc<Mutex<Option<String>>>,
    events: Receiver<SdkEvent>,
) {
    let mut detector = TrackEndDetector::default();

    while let Ok(event) = events.recv_async().await {
        if let Some(error) = init_failure(&event) {
            if core.init.settle(Err(error)) {
                continue;
            }
        }

        match event {
            SdkEvent::Ready { device_id } => {
                debug!(service = %core.service, device_id = device_id.as_str(), "device_ready");
                *device.lock().unwrap_or_else(PoisonError::into_inner) = Some(device_id);
                core.init.settle(Ok(()));
            }
            SdkEvent::NotReady { device_id } => {
                warn!(service = %core.service, device_id = device_id.as_str(), "device_offline");
            }
            SdkEvent::PlayerStateChanged(state) => {
                if detector.observe(state) {
                    core.fire_track_end();
                }
            }
            SdkEvent::InitializationError(message)
            | SdkEvent::AuthenticationError(message)
            | SdkEvent::AccountError(message)
            | SdkEvent::PlaybackError(message) => {
                warn!(service = %core.service, message = message.as_str(), "playback_error");
            }
        }
    }

    core.shutdown();
    debug!(service = %core.service, "sdk_events_closed");
}

#[async_trait]
impl<S: WebPlaybackSdk, P: PlaybackApi> PlaybackControl for PremiumController<S, P> {
    fn service(&self) -> ServiceTag {
        self.core.service
    }

    async fn init(&self) -> Result<(), InitError> {
        let access_token = self
            .access_token
            .as_deref()
            .ok_or_else(|| InitError::AuthenticationFailed("access token not set".to_string()))?;

        if !self.sdk.script_loaded() {
            return Err(InitError::ScriptUnavailable(self.core.service));
        }

        self.sdk.sdk_ready().await;
        let events = self.sdk.connect(PLAYER_NAME, access_token);
        let ready = self.core.init.arm();
        tokio::spawn(listen(self.core.clone(), self.device_id.clone(), events));

        self.core.finish_init(ready).await
    }

    async fn load(&self, track_id: &str) -> Result<(), LoadError> {
        if !self.core.is_ready() {
            return Err(LoadError::NotInitialized);
        }
        let device_id = self.device_id().ok_or(LoadError::NotInitialized)?;

        self.api
            .start_playback(&device_id, &track_uri(track_id))
            .await?;
        // starting a track on a device also plays it
        self.sdk.pause();

        info!(service = %self.core.service, track_id, "track_started_paused");
        Ok(())
    }

    fn play(&self) {
        if self.ensure_ready("play") {
            self.sdk.resume();
        }
    }

    fn pause(&self) {
        if self.ensure_ready("pause") {
            self.sdk.pause();
        }
    }

    fn set_volume(&self, volume: Volume) {
        if self.ensure_ready("set_volume") {
            self.sdk.set_volume(volume.as_fraction());
        }
    }

    fn skip_to(&self, seconds: f64) {
        if self.ensure_ready("skip_to") {
            self.sdk.seek((seconds.max(0.0) * 1000.0) as u64);
        }
    }

    fn set_on_track_end(&self, callback: TrackEndCallback) {
        self.core.set_on_track_end(callback);
    }
}
