use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use flume::Receiver;
use tracing::{debug, info, warn};

use super::{ControllerCore, Pending};
use crate::audio::{
    error::{InitError, LoadError},
    service::ServiceTag,
    traits::{PlaybackControl, TrackEndCallback, Volume},
};

pub const TRACK_BASE_URL: &str = "https://soundcloud.com/";
const PLACEHOLDER_TRACK: &str = "tonemanufacture/cassette-tone-preview";

/// Source the widget frame is created with before any track is loaded.
pub fn widget_src() -> String {
    format!(
        "https://w.soundcloud.com/player/?url={TRACK_BASE_URL}{PLACEHOLDER_TRACK}\
         &show_artwork=false&liking=false&sharing=false&auto_play=false"
    )
}

/// Ids look like `artist/track`, without a leading slash.
pub fn track_url(track_id: &str) -> String {
    format!("{TRACK_BASE_URL}{}", track_id.trim_start_matches('/'))
}

#[derive(Debug, Clone, PartialEq)]
pub enum WidgetEvent {
    Ready,
    Error,
    Finish,
    /// Completion callback of `load`.
    Loaded,
}

/// Host side of the audio widget API. The widget is constructible as soon
/// as its script is on the page.
pub trait WidgetApi: Send + Sync + 'static {
    fn script_loaded(&self) -> bool;
    fn create_widget(&self, insert_tag: &str, src: &str) -> Receiver<WidgetEvent>;

    fn load(&self, url: &str);
    fn play(&self);
    fn pause(&self);
    fn set_volume(&self, volume: u8);
    fn seek_to(&self, millis: u64);
}

pub struct WidgetController<W: WidgetApi> {
    widget: Arc<W>,
    core: Arc<ControllerCore>,
    loaded: Arc<Pending<bool>>,
    has_sound: AtomicBool,
}

impl<W: WidgetApi> WidgetController<W> {
    pub fn new(widget: Arc<W>) -> Self {
        Self {
            widget,
            core: ControllerCore::new(ServiceTag::CrowdAudio),
            loaded: Arc::new(Pending::new()),
            has_sound: AtomicBool::new(false),
        }
    }

    fn ensure_ready(&self, op: &str) -> bool {
        if !self.core.is_ready() {
            warn!(service = %self.core.service, op, "controller_not_ready");
        }
        self.core.is_ready()
    }
}

async fn listen(core: Arc<ControllerCore>, loaded: Arc<Pending<bool>>, events: Receiver<WidgetEvent>) {
    while let Ok(event) = events.recv_async().await {
        match event {
            WidgetEvent::Ready => {
                core.init.settle(Ok(()));
            }
            WidgetEvent::Error => {
                if core
                    .init
                    .settle(Err(InitError::Initialization("widget error".to_string())))
                {
                    continue;
                }
                if !loaded.settle(false) {
                    warn!(service = %core.service, "playback_error");
                }
            }
            WidgetEvent::Finish => core.fire_track_end(),
            WidgetEvent::Loaded => {
                loaded.settle(true);
            }
        }
    }

    core.shutdown();
    loaded.cancel();
    debug!(service = %core.service, "widget_events_closed");
}

#[async_trait]
impl<W: WidgetApi> PlaybackControl for WidgetController<W> {
    fn service(&self) -> ServiceTag {
        self.core.service
    }

    async fn init(&self) -> Result<(), InitError> {
        if !self.widget.script_loaded() {
            return Err(InitError::ScriptUnavailable(self.core.service));
        }

        let events = self
            .widget
            .create_widget(self.core.service.insert_tag(), &widget_src());
        let ready = self.core.init.arm();
        tokio::spawn(listen(self.core.clone(), self.loaded.clone(), events));

        self.core.finish_init(ready).await
    }

    async fn load(&self, track_id: &str) -> Result<(), LoadError> {
        if !self.core.is_ready() {
            return Err(LoadError::NotInitialized);
        }

        self.has_sound.store(false, Ordering::Release);
        let loaded = self.loaded.arm();
        if !self.core.is_ready() {
            self.loaded.cancel();
            return Err(LoadError::Interrupted);
        }
        self.widget.load(&track_url(track_id));

        match loaded.await {
            Ok(true) => {
                self.widget.pause();
                self.has_sound.store(true, Ordering::Release);
                info!(service = %self.core.service, track_id, "track_loaded");
                Ok(())
            }
            Ok(false) => Err(LoadError::UnknownTrackId(track_id.to_string())),
            Err(_) => Err(LoadError::Interrupted),
        }
    }

    fn play(&self) {
        if !self.ensure_ready("play") {
            return;
        }
        if self.has_sound.load(Ordering::Acquire) {
            self.widget.play();
        } else {
            warn!(service = %self.core.service, "no_sound_loaded");
        }
    }

    fn pause(&self) {
        if self.ensure_ready("pause") {
            self.widget.pause();
        }
    }

    fn set_volume(&self, volume: Volume) {
        if self.ensure_ready("set_volume") {
            self.widget.set_volume(volume.level());
        }
    }

    fn skip_to(&self, seconds: f64) {
        if self.ensure_ready("skip_to") {
            self.widget.seek_to((seconds.max(0.0) * 1000.0) as u64);
        }
    }

    fn set_on_track_end(&self, callback: TrackEndCallback) {
        self.core.set_on_track_end(callback);
    }
}
