use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use flume::Sender;
use tracing::{debug, info, warn};

use crate::{
    audio::{
        commands::AudioCommand,
        config::AudioConfig,
        error::PlaybackError,
        progress::TrackProgress,
        queue::{PlaylistEntry, QueueManager},
        registry::AdapterRegistry,
        service::ServiceTag,
        state::PlaybackState,
        traits::{PlaybackControl, TrackEndCallback, Volume},
    },
    event::events::Event,
};

/// Owns the playlist cursor and routes every transport command to the
/// controller of the current entry's service. At most one controller is
/// active at a time; the previous one is paused before another loads.
pub struct AudioSystem {
    registry: Arc<AdapterRegistry>,
    queue: QueueManager,
    config: AudioConfig,
    active: Option<ServiceTag>,
    state: PlaybackState,
    volume: Volume,
    progress: TrackProgress,
    loaded_index: Option<usize>,
    generation: Arc<AtomicU64>,
    event_tx: Sender<Event>,
}

impl AudioSystem {
    pub fn new(
        registry: Arc<AdapterRegistry>,
        queue: QueueManager,
        config: AudioConfig,
        event_tx: Sender<Event>,
    ) -> Self {
        let volume = Volume::clamped(config.volume as i32);
        Self {
            registry,
            queue,
            config,
            active: None,
            state: PlaybackState::Idle,
            volume,
            progress: TrackProgress::new(),
            loaded_index: None,
            generation: Arc::new(AtomicU64::new(0)),
            event_tx,
        }
    }

    /// Routes every controller's end-of-track signal into the event loop as
    /// `Event::TrackEnded(service, generation)`, stamped with the load
    /// generation current when the signal fired.
    pub fn install_auto_advance(&self) {
        let event_tx = self.event_tx.clone();
        let generation = self.generation.clone();
        self.registry.install_track_end(move |service| {
            let event_tx = event_tx.clone();
            let generation = generation.clone();
            let callback: TrackEndCallback = Arc::new(move || {
                let current = generation.load(Ordering::Acquire);
                let _ = event_tx.send(Event::TrackEnded(service, current));
            });
            callback
        });
    }

    /// Pushes the configured volume to every ready controller.
    pub fn apply_initial_volume(&self) {
        self.registry.set_volume_all(self.volume);
    }

    pub fn current_track_index(&self) -> usize {
        self.queue.current_track_index()
    }

    pub fn current_entry(&self) -> &PlaylistEntry {
        self.queue.current()
    }

    pub fn queue(&self) -> &QueueManager {
        &self.queue
    }

    pub fn active_service(&self) -> Option<ServiceTag> {
        self.active
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn volume(&self) -> Volume {
        self.volume
    }

    /// Bumped by every load attempt that reaches a controller.
    pub fn load_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn position(&self) -> Duration {
        self.progress.position()
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    fn active_controller(&self) -> Result<&Arc<dyn PlaybackControl>, PlaybackError> {
        let service = self.active.ok_or(PlaybackError::NoActiveAdapter)?;
        self.registry.get_ready(service)
    }

    fn pause_active(&mut self) {
        if let Ok(controller) = self.active_controller() {
            controller.pause();
            if self.state == PlaybackState::Playing {
                self.state = PlaybackState::Paused;
            }
            self.progress.pause();
        }
    }

    /// Loads the current entry into its controller and leaves it paused.
    ///
    /// An entry whose service has no ready controller fails without touching
    /// the active controller. A failed load leaves nothing active.
    pub async fn load_current(&mut self) -> Result<(), PlaybackError> {
        let entry = self.queue.current().clone();
        let index = self.queue.current_track_index();
        let controller = match self.registry.get_ready(entry.service) {
            Ok(controller) => controller.clone(),
            Err(e) => {
                warn!(index, service = %entry.service, error = %e, "entry_unsupported");
                return Err(e);
            }
        };

        self.pause_active();
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.active = Some(entry.service);
        self.loaded_index = None;
        self.state = PlaybackState::Loading;
        self.progress.reset();
        info!(index, service = %entry.service, track_id = %entry.track_id, "loading_track");

        match controller.load(&entry.track_id).await {
            Ok(()) => {
                controller.set_volume(self.volume);
                self.loaded_index = Some(index);
                self.state = PlaybackState::Paused;
                Ok(())
            }
            Err(e) => {
                warn!(index, service = %entry.service, error = %e, "track_load_failed");
                self.active = None;
                self.state = PlaybackState::Idle;
                Err(e.into())
            }
        }
    }

    /// Advances cyclically, loads the new entry and starts it.
    pub async fn next(&mut self) -> Result<(), PlaybackError> {
        self.queue.advance();
        self.switch_track().await
    }

    /// Steps back cyclically, loads the new entry and starts it.
    pub async fn prev(&mut self) -> Result<(), PlaybackError> {
        self.queue.retreat();
        self.switch_track().await
    }

    async fn switch_track(&mut self) -> Result<(), PlaybackError> {
        self.pause_active();
        self.load_current().await?;
        self.play()
    }

    /// Starts the loaded track. Refused while the cursor sits on an entry
    /// that never loaded, so a stale track cannot resume under it.
    pub fn play(&mut self) -> Result<(), PlaybackError> {
        let controller = self.active_controller()?;
        let index = self.queue.current_track_index();
        if self.loaded_index != Some(index) {
            return Err(PlaybackError::EntryNotLoaded(index));
        }
        controller.play();
        self.state = PlaybackState::Playing;
        self.progress.resume();
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), PlaybackError> {
        self.active_controller()?.pause();
        self.state = PlaybackState::Paused;
        self.progress.pause();
        Ok(())
    }

    pub fn toggle_play(&mut self) -> Result<(), PlaybackError> {
        if self.is_playing() {
            self.pause()
        } else {
            self.play()
        }
    }

    /// Clamps `level` into 0-100 and forwards it to the active controller.
    /// The level sticks and is re-applied to whatever loads next.
    pub fn set_volume(&mut self, level: i32) -> Result<Volume, PlaybackError> {
        let volume = Volume::clamped(level);
        self.active_controller()?.set_volume(volume);
        self.volume = volume;
        Ok(volume)
    }

    pub fn skip_to(&mut self, seconds: f64) -> Result<(), PlaybackError> {
        if seconds.is_nan() {
            return Err(PlaybackError::InvalidPosition(seconds.to_string()));
        }
        let position = Duration::try_from_secs_f64(seconds.max(0.0))
            .map_err(|_| PlaybackError::InvalidPosition(seconds.to_string()))?;
        self.active_controller()?.skip_to(position.as_secs_f64());
        self.progress.seek(position);
        Ok(())
    }

    /// Auto-advance. Signals from a controller that is no longer active, or
    /// from a track loaded before the current one, are stale and dropped.
    pub async fn on_track_ended(
        &mut self,
        service: ServiceTag,
        generation: u64,
    ) -> Result<(), PlaybackError> {
        if self.active != Some(service) || generation != self.load_generation() {
            debug!(
                service = %service,
                generation,
                active = ?self.active,
                current = self.load_generation(),
                "stale_track_end_ignored"
            );
            return Ok(());
        }
        info!(service = %service, index = self.queue.current_track_index(), "track_ended");
        self.next().await
    }

    pub async fn handle_command(&mut self, command: AudioCommand) -> Result<(), PlaybackError> {
        match command {
            AudioCommand::LoadCurrent => self.load_current().await,
            AudioCommand::Next => self.next().await,
            AudioCommand::Previous => self.prev().await,
            AudioCommand::Play => self.play(),
            AudioCommand::Pause => self.pause(),
            AudioCommand::TogglePlay => self.toggle_play(),
            AudioCommand::SetVolume(level) => self.set_volume(level).map(|_| ()),
            AudioCommand::VolumeUp => {
                let level = self.volume.step_up(self.config.volume_step).level();
                self.set_volume(level as i32).map(|_| ())
            }
            AudioCommand::VolumeDown => {
                let level = self.volume.step_down(self.config.volume_step).level();
                self.set_volume(level as i32).map(|_| ())
            }
            AudioCommand::Seek(seconds) => self.skip_to(seconds),
            AudioCommand::SeekForward => {
                let target = self.progress.offset(self.config.seek_step_secs as f64);
                self.skip_to(target)
            }
            AudioCommand::SeekBackward => {
                let target = self.progress.offset(-(self.config.seek_step_secs as f64));
                self.skip_to(target)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{
        controllers::{
            IframeEvent, PremiumController, SdkEvent, VideoController, WidgetController,
            WidgetEvent,
        },
        error::LoadError,
    };
    use crate::sim::{
        sdk::{SimPlaybackApi, SimSdk},
        video::SimIframeApi,
        widget::SimWidgetApi,
    };

    struct Harness {
        system: AudioSystem,
        video: Arc<SimIframeApi>,
        widget: Arc<SimWidgetApi>,
        sdk: Arc<SimSdk>,
        events: flume::Receiver<Event>,
    }

    impl Harness {
        fn playing_count(&self) -> usize {
            [
                self.video.is_playing(),
                self.widget.is_playing(),
                self.sdk.is_playing(),
            ]
            .into_iter()
            .filter(|playing| *playing)
            .count()
        }
    }

    async fn harness(entries: Vec<PlaylistEntry>, video: SimIframeApi) -> Harness {
        let video = Arc::new(video);
        let widget = Arc::new(SimWidgetApi::new());
        let sdk = Arc::new(SimSdk::new());

        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(VideoController::new(video.clone())));
        registry.register(Arc::new(WidgetController::new(widget.clone())));
        registry.register(Arc::new(PremiumController::new(
            sdk.clone(),
            Arc::new(SimPlaybackApi::new(sdk.clone())),
            Some("token".to_string()),
        )));
        registry.init_all(None).await;

        let (event_tx, events) = flume::unbounded();
        let queue = QueueManager::new(entries).unwrap();
        let system = AudioSystem::new(Arc::new(registry), queue, AudioConfig::default(), event_tx);
        system.install_auto_advance();

        Harness {
            system,
            video,
            widget,
            sdk,
            events,
        }
    }

    fn mixed_playlist() -> Vec<PlaylistEntry> {
        vec![
            PlaylistEntry::new(ServiceTag::StreamingVideo, "zNTaVTMoNTk"),
            PlaylistEntry::new(ServiceTag::CrowdAudio, "billwurtz/outside"),
            PlaylistEntry::new(ServiceTag::PremiumAudio, "3n3Ppam7vgaVa1iaRUc9Lp"),
        ]
    }

    #[tokio::test]
    async fn test_transport_before_load_has_no_target() {
        let mut h = harness(mixed_playlist(), SimIframeApi::new()).await;

        assert_eq!(h.system.play(), Err(PlaybackError::NoActiveAdapter));
        assert_eq!(h.system.pause(), Err(PlaybackError::NoActiveAdapter));
        assert_eq!(h.system.set_volume(50), Err(PlaybackError::NoActiveAdapter));
        assert_eq!(h.system.skip_to(3.0), Err(PlaybackError::NoActiveAdapter));
        assert_eq!(h.system.state(), PlaybackState::Idle);
    }

    #[tokio::test]
    async fn test_load_current_leaves_track_paused() {
        let mut h = harness(mixed_playlist(), SimIframeApi::new()).await;

        h.system.load_current().await.unwrap();
        assert_eq!(h.system.active_service(), Some(ServiceTag::StreamingVideo));
        assert_eq!(h.system.state(), PlaybackState::Paused);
        assert_eq!(h.video.current_video().as_deref(), Some("zNTaVTMoNTk"));
        assert_eq!(h.playing_count(), 0);

        h.system.play().unwrap();
        assert!(h.video.is_audible());
        assert_eq!(h.system.state(), PlaybackState::Playing);
    }

    #[tokio::test]
    async fn test_unready_service_is_unsupported() {
        let mut h = harness(mixed_playlist(), SimIframeApi::unavailable()).await;

        let result = h.system.load_current().await;
        assert!(matches!(
            result,
            Err(PlaybackError::UnsupportedService(ServiceTag::StreamingVideo, _))
        ));
        assert_eq!(h.system.current_track_index(), 0);
        assert_eq!(h.system.active_service(), None);
    }

    #[tokio::test]
    async fn test_next_wraps_and_keeps_one_player_sounding() {
        let mut h = harness(mixed_playlist(), SimIframeApi::new()).await;
        h.system.load_current().await.unwrap();
        h.system.play().unwrap();

        for step in 1..=6 {
            h.system.next().await.unwrap();
            assert_eq!(h.system.current_track_index(), step % 3);
            assert_eq!(h.playing_count(), 1);
        }
        assert_eq!(h.system.active_service(), Some(ServiceTag::StreamingVideo));
        assert!(h.video.is_playing());
    }

    #[tokio::test]
    async fn test_prev_from_first_wraps_to_last() {
        let mut h = harness(mixed_playlist(), SimIframeApi::new()).await;
        h.system.load_current().await.unwrap();

        h.system.prev().await.unwrap();
        assert_eq!(h.system.current_track_index(), 2);
        assert_eq!(h.system.active_service(), Some(ServiceTag::PremiumAudio));
        assert!(h.sdk.is_playing());
        assert!(!h.video.is_playing());
    }

    #[tokio::test]
    async fn test_unsupported_entry_can_be_skipped() {
        let mut h = harness(
            vec![
                PlaylistEntry::new(ServiceTag::CrowdAudio, "billwurtz/outside"),
                PlaylistEntry::new(ServiceTag::StreamingVideo, "zNTaVTMoNTk"),
                PlaylistEntry::new(ServiceTag::CrowdAudio, "billwurtz/outside"),
            ],
            SimIframeApi::unavailable(),
        )
        .await;
        h.system.load_current().await.unwrap();
        h.system.play().unwrap();

        assert!(h.system.next().await.is_err());
        assert_eq!(h.system.current_track_index(), 1);
        assert_eq!(h.system.active_service(), Some(ServiceTag::CrowdAudio));
        assert_eq!(h.playing_count(), 0);

        assert_eq!(h.system.play(), Err(PlaybackError::EntryNotLoaded(1)));
        assert_eq!(h.playing_count(), 0);

        h.system.next().await.unwrap();
        assert_eq!(h.system.current_track_index(), 2);
        assert!(h.widget.is_playing());
    }

    #[tokio::test]
    async fn test_failed_load_clears_active() {
        let video = SimIframeApi::new();
        video.mark_unavailable("zNTaVTMoNTk");
        let mut h = harness(mixed_playlist(), video).await;

        assert_eq!(
            h.system.load_current().await,
            Err(PlaybackError::Load(LoadError::UnknownTrackId(
                "zNTaVTMoNTk".to_string()
            )))
        );
        assert_eq!(h.system.active_service(), None);
        assert_eq!(h.system.state(), PlaybackState::Idle);
        assert_eq!(h.system.play(), Err(PlaybackError::NoActiveAdapter));
    }

    #[tokio::test]
    async fn test_volume_is_clamped_and_carried_over() {
        let mut h = harness(mixed_playlist(), SimIframeApi::new()).await;
        h.system.load_current().await.unwrap();

        assert_eq!(h.system.set_volume(150), Ok(Volume::MAX));
        assert_eq!(h.video.volume(), 100);
        assert_eq!(h.system.set_volume(-1), Ok(Volume::MUTE));
        assert_eq!(h.video.volume(), 0);

        h.system.set_volume(40).unwrap();
        h.system.next().await.unwrap();
        assert_eq!(h.widget.volume(), 40);

        h.system.handle_command(AudioCommand::VolumeUp).await.unwrap();
        assert_eq!(h.system.volume().level(), 45);
        assert_eq!(h.widget.volume(), 45);
    }

    #[tokio::test]
    async fn test_track_end_signal_reaches_event_loop() {
        let mut h = harness(mixed_playlist(), SimIframeApi::new()).await;
        h.system.load_current().await.unwrap();
        h.system.play().unwrap();

        h.video.finish();
        let event = h.events.recv_async().await.unwrap();
        let generation = h.system.load_generation();
        assert_eq!(event, Event::TrackEnded(ServiceTag::StreamingVideo, generation));

        h.system
            .on_track_ended(ServiceTag::StreamingVideo, generation)
            .await
            .unwrap();
        assert_eq!(h.system.current_track_index(), 1);
        assert!(h.widget.is_playing());
    }

    #[tokio::test]
    async fn test_stale_track_end_is_ignored() {
        let mut h = harness(mixed_playlist(), SimIframeApi::new()).await;
        h.system.load_current().await.unwrap();

        let generation = h.system.load_generation();
        h.system
            .on_track_ended(ServiceTag::CrowdAudio, generation)
            .await
            .unwrap();
        assert_eq!(h.system.current_track_index(), 0);
        assert_eq!(h.system.state(), PlaybackState::Paused);
    }

    #[tokio::test]
    async fn test_queued_end_of_replaced_track_on_same_service_is_dropped() {
        let mut h = harness(
            vec![
                PlaylistEntry::new(ServiceTag::StreamingVideo, "a"),
                PlaylistEntry::new(ServiceTag::StreamingVideo, "b"),
                PlaylistEntry::new(ServiceTag::CrowdAudio, "x/y"),
            ],
            SimIframeApi::new(),
        )
        .await;
        h.system.load_current().await.unwrap();
        h.system.play().unwrap();

        h.video.finish();
        let Event::TrackEnded(service, generation) = h.events.recv_async().await.unwrap() else {
            panic!("expected a track end");
        };

        h.system.next().await.unwrap();
        assert_eq!(h.system.current_track_index(), 1);

        h.system.on_track_ended(service, generation).await.unwrap();
        assert_eq!(h.system.current_track_index(), 1);
        assert_eq!(h.video.current_video().as_deref(), Some("b"));
        assert!(h.video.is_playing());
    }

    #[tokio::test]
    async fn test_vendor_errors_leave_orchestrator_alone() {
        let mut h = harness(mixed_playlist(), SimIframeApi::new()).await;
        h.system.load_current().await.unwrap();
        h.system.play().unwrap();

        h.video.emit(IframeEvent::Error(5));
        h.widget.emit(WidgetEvent::Error);
        h.sdk.emit(SdkEvent::PlaybackError("stream dropped".to_string()));
        h.video.wait_idle().await;
        h.widget.wait_idle().await;
        h.sdk.wait_idle().await;

        assert_eq!(h.system.state(), PlaybackState::Playing);
        assert_eq!(h.system.active_service(), Some(ServiceTag::StreamingVideo));
        assert_eq!(h.system.current_track_index(), 0);
        assert!(h.video.is_playing());
        assert!(h.events.is_empty());

        h.system.next().await.unwrap();
        assert_eq!(h.system.current_track_index(), 1);
        assert!(h.widget.is_playing());
        h.system.next().await.unwrap();
        assert_eq!(h.system.active_service(), Some(ServiceTag::PremiumAudio));
        assert!(h.sdk.is_playing());
    }

    #[tokio::test]
    async fn test_unrepresentable_seek_is_rejected() {
        let mut h = harness(mixed_playlist(), SimIframeApi::new()).await;
        h.system.load_current().await.unwrap();
        h.system.skip_to(7.0).unwrap();

        for seconds in [f64::INFINITY, f64::NAN, 1e30] {
            assert!(matches!(
                h.system.skip_to(seconds),
                Err(PlaybackError::InvalidPosition(_))
            ));
        }
        assert_eq!(h.video.position_secs(), 7.0);
        assert_eq!(h.system.position(), Duration::from_secs(7));

        h.system.skip_to(f64::NEG_INFINITY).unwrap();
        assert_eq!(h.video.position_secs(), 0.0);
    }

    #[tokio::test]
    async fn test_relative_seek_uses_playhead() {
        let mut h = harness(mixed_playlist(), SimIframeApi::new()).await;
        h.system.load_current().await.unwrap();

        h.system.skip_to(20.0).unwrap();
        h.system.handle_command(AudioCommand::SeekBackward).await.unwrap();
        assert_eq!(h.video.position_secs(), 15.0);
        h.system.handle_command(AudioCommand::SeekForward).await.unwrap();
        h.system.handle_command(AudioCommand::SeekForward).await.unwrap();
        assert_eq!(h.video.position_secs(), 25.0);

        h.system.skip_to(2.0).unwrap();
        h.system.handle_command(AudioCommand::SeekBackward).await.unwrap();
        assert_eq!(h.video.position_secs(), 0.0);
    }

    #[tokio::test]
    async fn test_toggle_play() {
        let mut h = harness(mixed_playlist(), SimIframeApi::new()).await;
        h.system.load_current().await.unwrap();

        h.system.handle_command(AudioCommand::TogglePlay).await.unwrap();
        assert!(h.video.is_playing());
        h.system.handle_command(AudioCommand::TogglePlay).await.unwrap();
        assert!(!h.video.is_playing());
        assert_eq!(h.system.state(), PlaybackState::Paused);
    }
}
