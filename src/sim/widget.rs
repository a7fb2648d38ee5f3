use std::{
    sync::{
        Mutex,
        atomic::{AtomicU8, Ordering},
    },
    time::Duration,
};

use flume::Receiver;
use tracing::debug;

use super::{EventLine, Transport, lock};
use crate::audio::controllers::widget::{TRACK_BASE_URL, WidgetApi, WidgetEvent, track_url};

/// Simulated audio widget.
pub struct SimWidgetApi {
    loaded: bool,
    fail_creation: Mutex<bool>,
    events: EventLine<WidgetEvent>,
    transport: Transport,
    volume: AtomicU8,
}

impl SimWidgetApi {
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
            fail_creation: Mutex::new(false),
            events: EventLine::new(),
            transport: Transport::new(track_length),
            volume: AtomicU8::new(100),
        }
    }

    pub fn fail_creation(&self) {
        *lock(&self.fail_creation) = true;
    }

    pub fn mark_unavailable(&self, track_id: &str) {
        self.transport.mark_unavailable(&track_url(track_id));
    }

    pub fn emit(&self, event: WidgetEvent) {
        self.events.send(event);
    }

    pub fn finish(&self) {
        if self.transport.finish() {
            self.events.send(WidgetEvent::Finish);
        }
    }

    pub fn disconnect(&self) {
        self.events.close();
    }

    pub async fn wait_idle(&self) {
        self.events.wait_idle().await;
    }

    pub fn current_url(&self) -> Option<String> {
        self.transport
            .current()
            .filter(|url| url.starts_with(TRACK_BASE_URL))
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    pub fn volume(&self) -> u8 {
        self.volume.load(Ordering::Relaxed)
    }

    pub fn position_millis(&self) -> u64 {
        self.transport.position().as_millis() as u64
    }
}

impl Default for SimWidgetApi {
    fn default() -> Self {
        Self::new()
    }
}

impl WidgetApi for SimWidgetApi {
    fn script_loaded(&self) -> bool {
        self.loaded
    }

    fn create_widget(&self, insert_tag: &str, src: &str) -> Receiver<WidgetEvent> {
        debug!(insert_tag, src, "sim_widget_created");
        let rx = self.events.open();
        self.transport.cue(src);

        if std::mem::take(&mut *lock(&self.fail_creation)) {
            self.events.send(WidgetEvent::Error);
        } else {
            self.events.send(WidgetEvent::Ready);
        }
        rx
    }

    fn load(&self, url: &str) {
        if !self.transport.is_available(url) {
            self.events.send(WidgetEvent::Error);
            return;
        }
        self.transport.cue(url);
        self.events.send(WidgetEvent::Loaded);
    }

    fn play(&self) {
        let on_end = self.events.sender();
        self.transport.play(move || {
            if let Some(tx) = on_end {
                let _ = tx.send(WidgetEvent::Finish);
            }
        });
    }

    fn pause(&self) {
        self.transport.pause();
    }

    fn set_volume(&self, volume: u8) {
        self.volume.store(volume, Ordering::Relaxed);
    }

    fn seek_to(&self, millis: u64) {
        self.transport.seek(Duration::from_millis(millis));
    }
}
