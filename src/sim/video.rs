use std::{
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicU8, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use flume::Receiver;
use tracing::debug;

use super::{EventLine, Transport, lock};
use crate::audio::controllers::video::{IframeApi, IframeEvent, PlayerOptions, PlayerState};

/// Simulated video iframe. Frames start muted, like an autoplaying embed.
pub struct SimIframeApi {
    loaded: bool,
    stalled: AtomicBool,
    creation_error: Mutex<Option<i32>>,
    events: EventLine<IframeEvent>,
    transport: Transport,
    muted: AtomicBool,
    volume: AtomicU8,
}

impl SimIframeApi {
    pub fn new() -> Self {
        Self::build(true, None)
    }

    pub fn with_track_length(length: Duration) -> Self {
        Self::build(true, Some(length))
    }

    /// The iframe script never made it onto the page.
    pub fn unavailable() -> Self {
        Self::build(false, None)
    }

    fn build(loaded: bool, track_length: Option<Duration>) -> Self {
        Self {
            loaded,
            stalled: AtomicBool::new(false),
            creation_error: Mutex::new(None),
            events: EventLine::new(),
            transport: Transport::new(track_length),
            muted: AtomicBool::new(true),
            volume: AtomicU8::new(100),
        }
    }

    /// Makes the next player construction report `code` instead of ready.
    pub fn fail_creation(&self, code: i32) {
        *lock(&self.creation_error) = Some(code);
    }

    /// Players get constructed but never report ready.
    pub fn stall(&self) {
        self.stalled.store(true, Ordering::Relaxed);
    }

    pub fn mark_unavailable(&self, video_id: &str) {
        self.transport.mark_unavailable(video_id);
    }

    pub fn emit(&self, event: IframeEvent) {
        self.events.send(event);
    }

    /// Plays the current video out to its end.
    pub fn finish(&self) {
        if self.transport.finish() {
            self.events.send(IframeEvent::StateChange(PlayerState::Ended));
        }
    }

    pub fn disconnect(&self) {
        self.events.close();
    }

    pub async fn wait_idle(&self) {
        self.events.wait_idle().await;
    }

    pub fn current_video(&self) -> Option<String> {
        self.transport.current()
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    pub fn is_audible(&self) -> bool {
        self.is_playing() && !self.muted.load(Ordering::Relaxed)
    }

    pub fn volume(&self) -> u8 {
        self.volume.load(Ordering::Relaxed)
    }

    pub fn position_secs(&self) -> f64 {
        self.transport.position().as_secs_f64()
    }
}

impl Default for SimIframeApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IframeApi for SimIframeApi {
    fn script_loaded(&self) -> bool {
        self.loaded
    }

    async fn api_ready(&self) {}

    fn create_player(&self, insert_tag: &str, options: &PlayerOptions) -> Receiver<IframeEvent> {
        debug!(
            insert_tag,
            width = options.width,
            height = options.height,
            "sim_iframe_created"
        );
        let rx = self.events.open();
        self.transport.cue(&options.video_id);
        if self.stalled.load(Ordering::Relaxed) {
            return rx;
        }

        match lock(&self.creation_error).take() {
            Some(code) => self.events.send(IframeEvent::Error(code)),
            None => self.events.send(IframeEvent::Ready),
        }
        rx
    }

    fn cue_video_by_id(&self, video_id: &str) {
        if !self.transport.is_available(video_id) {
            self.events.send(IframeEvent::Error(100));
            return;
        }
        self.transport.cue(video_id);
        self.events.send(IframeEvent::StateChange(PlayerState::Cued));
    }

    fn play_video(&self) {
        let on_end = self.events.sender();
        let started = self.transport.play(move || {
            if let Some(tx) = on_end {
                let _ = tx.send(IframeEvent::StateChange(PlayerState::Ended));
            }
        });
        if started {
            self.events.send(IframeEvent::StateChange(PlayerState::Playing));
        }
    }

    fn pause_video(&self) {
        if self.transport.pause() {
            self.events.send(IframeEvent::StateChange(PlayerState::Paused));
        }
    }

    fn un_mute(&self) {
        self.muted.store(false, Ordering::Relaxed);
    }

    fn set_volume(&self, volume: u8) {
        self.volume.store(volume, Ordering::Relaxed);
    }

    fn seek_to(&self, seconds: f64, _allow_seek_ahead: bool) {
        self.transport.seek(Duration::from_secs_f64(seconds));
    }
}
