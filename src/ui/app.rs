use std::sync::Arc;

use color_eyre::eyre::{OptionExt, Result};
use flume::{Receiver, Sender};
use tracing::info;

use crate::{
    audio::{
        controllers::{PremiumController, VideoController, WidgetController},
        queue::QueueManager,
        registry::AdapterRegistry,
        system::AudioSystem,
    },
    config::Settings,
    event::events::Event,
    sim::{
        sdk::{SimPlaybackApi, SimSdk},
        video::SimIframeApi,
        widget::SimWidgetApi,
    },
};

use super::{
    tui::{self, TerminalEvent},
    util::{handler::EventHandler, status_line},
};

pub struct App {
    pub event_rx: Receiver<Event>,
    pub event_tx: Sender<Event>,
    pub audio_system: AudioSystem,
    pub last_error: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub async fn new() -> Result<Self> {
        Self::with_settings(Settings::from_env()?).await
    }

    /// Builds the simulated embeds and their controllers, then initializes
    /// every controller before the playlist is touched.
    pub async fn with_settings(settings: Settings) -> Result<Self> {
        let (event_tx, event_rx) = flume::unbounded();
        let track_length = settings.sim_track_length;

        let sdk = Arc::new(SimSdk::with_track_length(track_length));
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(VideoController::new(Arc::new(
            SimIframeApi::with_track_length(track_length),
        ))));
        registry.register(Arc::new(WidgetController::new(Arc::new(
            SimWidgetApi::with_track_length(track_length),
        ))));
        registry.register(Arc::new(PremiumController::new(
            sdk.clone(),
            Arc::new(SimPlaybackApi::new(sdk)),
            settings.access_token.clone(),
        )));
        registry.init_all(settings.init_timeout()).await;
        info!(ready = ?registry.ready_services(), "adapters_initialized");

        let queue = QueueManager::new(settings.playlist).ok_or_eyre("playlist is empty")?;
        let audio_system = AudioSystem::new(
            Arc::new(registry),
            queue,
            settings.audio,
            event_tx.clone(),
        );
        audio_system.install_auto_advance();
        audio_system.apply_initial_volume();

        Ok(Self {
            event_rx,
            event_tx,
            audio_system,
            last_error: None,
            should_quit: false,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut tui = tui::Tui::new()?;
        tui.enter()?;

        EventHandler::handle_event(self, TerminalEvent::Init).await;
        while !self.should_quit {
            tui.draw_status(&status_line(&self.audio_system, self.last_error.as_deref()))?;
            EventHandler::handle_events(self, &tui).await;
        }

        tui.exit()?;
        Ok(())
    }
}
