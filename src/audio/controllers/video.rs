use std::sync::Arc;

use async_trait::async_trait;
use flume::Receiver;
use tracing::{debug, info, warn};

use super::{ControllerCore, Pending};
use crate::audio::{
    error::{InitError, LoadError},
    service::ServiceTag,
    traits::{PlaybackControl, TrackEndCallback, Volume},
};

/// Frame loaded before any track is cued (cassette sound).
pub const DEFAULT_VIDEO_ID: &str = "CVDHQokn7mQ";

/// Player states as numbered by the iframe API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

impl PlayerState {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(PlayerState::Unstarted),
            0 => Some(PlayerState::Ended),
            1 => Some(PlayerState::Playing),
            2 => Some(PlayerState::Paused),
            3 => Some(PlayerState::Buffering),
            5 => Some(PlayerState::Cued),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IframeEvent {
    Ready,
    Error(i32),
    StateChange(PlayerState),
}

#[derive(Debug, Clone)]
pub struct PlayerOptions {
    pub width: u32,
    pub height: u32,
    pub video_id: String,
}

impl Default for PlayerOptions {
    fn default() -> Self {
        Self {
            width: 300,
            height: 200,
            video_id: DEFAULT_VIDEO_ID.to_string(),
        }
    }
}

/// Host side of the video iframe API.
#[async_trait]
pub trait IframeApi: Send + Sync + 'static {
    fn script_loaded(&self) -> bool;
    /// Resolves once the API's ready hook fired.
    async fn api_ready(&self);
    fn create_player(&self, insert_tag: &str, options: &PlayerOptions) -> Receiver<IframeEvent>;

    fn cue_video_by_id(&self, video_id: &str);
    fn play_video(&self);
    fn pause_video(&self);
    fn un_mute(&self);
    fn set_volume(&self, volume: u8);
    fn seek_to(&self, seconds: f64, allow_seek_ahead: bool);
}

/// Error codes that mean the video itself cannot be played here.
fn is_unplayable_video(code: i32) -> bool {
    matches!(code, 100 | 101 | 150)
}

pub struct VideoController<A: IframeApi> {
    api: Arc<A>,
    options: PlayerOptions,
    core: Arc<ControllerCore>,
    cued: Arc<Pending<Result<(), i32>>>,
}

impl<A: IframeApi> VideoController<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self::with_options(api, PlayerOptions::default())
    }

    pub fn with_options(api: Arc<A>, options: PlayerOptions) -> Self {
        Self {
            api,
            options,
            core: ControllerCore::new(ServiceTag::StreamingVideo),
            cued: Arc::new(Pending::new()),
        }
    }

    fn ensure_ready(&self, op: &str) -> bool {
        if !self.core.is_ready() {
            warn!(service = %self.core.service, op, "controller_not_ready");
        }
        self.core.is_ready()
    }
}

async fn listen(
    core: Arc<ControllerCore>,
    cued: Arc<Pending<Result<(), i32>>>,
    events: Receiver<IframeEvent>,
) {
    while let Ok(event) = events.recv_async().await {
        match event {
            IframeEvent::Ready => {
                core.init.settle(Ok(()));
            }
            IframeEvent::Error(code) => {
                if core
                    .init
                    .settle(Err(InitError::Initialization(format!("player error {code}"))))
                {
                    continue;
                }
                if !cued.settle(Err(code)) {
                    warn!(service = %core.service, code, "playback_error");
                }
            }
            IframeEvent::StateChange(PlayerState::Ended) => core.fire_track_end(),
            IframeEvent::StateChange(PlayerState::Cued) => {
                cued.settle(Ok(()));
            }
            IframeEvent::StateChange(state) => {
                debug!(service = %core.service, ?state, "player_state_changed");
            }
        }
    }

    core.shutdown();
    cued.cancel();
    debug!(service = %core.service, "player_events_closed");
}

#[async_trait]
impl<A: IframeApi> PlaybackControl for VideoController<A> {
    fn service(&self) -> ServiceTag {
        self.core.service
    }

    async fn init(&self) -> Result<(), InitError> {
        if !self.api.script_loaded() {
            return Err(InitError::ScriptUnavailable(self.core.service));
        }

        self.api.api_ready().await;
        let events = self
            .api
            .create_player(self.core.service.insert_tag(), &self.options);
        let ready = self.core.init.arm();
        tokio::spawn(listen(self.core.clone(), self.cued.clone(), events));

        self.core.finish_init(ready).await
    }

    async fn load(&self, track_id: &str) -> Result<(), LoadError> {
        if !self.core.is_ready() {
            return Err(LoadError::NotInitialized);
        }

        let cued = self.cued.arm();
        if !self.core.is_ready() {
            self.cued.cancel();
            return Err(LoadError::Interrupted);
        }
        self.api.cue_video_by_id(track_id);

        match cued.await {
            Ok(Ok(())) => {
                info!(service = %self.core.service, track_id, "track_cued");
                Ok(())
            }
            Ok(Err(code)) if is_unplayable_video(code) => {
                Err(LoadError::UnknownTrackId(track_id.to_string()))
            }
            Ok(Err(code)) => Err(LoadError::NetworkFailure(format!("player error {code}"))),
            Err(_) => Err(LoadError::Interrupted),
        }
    }

    fn play(&self) {
        if self.ensure_ready("play") {
            // the frame autoplays muted; without this playback is silent
            self.api.un_mute();
            self.api.play_video();
        }
    }

    fn pause(&self) {
        if self.ensure_ready("pause") {
            self.api.pause_video();
        }
    }

    fn set_volume(&self, volume: Volume) {
        if self.ensure_ready("set_volume") {
            self.api.set_volume(volume.level());
        }
    }

    fn skip_to(&self, seconds: f64) {
        if self.ensure_ready("skip_to") {
            self.api.seek_to(seconds.max(0.0), true);
        }
    }

    fn set_on_track_end(&self, callback: TrackEndCallback) {
        self.core.set_on_track_end(callback);
    }
}
