use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::warn;

use crate::{
    audio::{commands::AudioCommand, error::PlaybackError},
    event::events::Event,
    ui::{
        app::App,
        tui::{TerminalEvent, Tui},
    },
};

pub struct EventHandler;

impl EventHandler {
    pub async fn handle_events(app: &mut App, tui: &Tui) {
        let event_rx = app.event_rx.clone();
        tokio::select! {
            Some(evt) = tui.next() => Self::handle_event(app, evt).await,
            Ok(evt) = event_rx.recv_async() => Self::handle_action(app, evt).await,
            else => app.should_quit = true,
        }

        while let Ok(evt) = app.event_rx.try_recv() {
            Self::handle_action(app, evt).await;
        }
    }

    pub async fn handle_event(app: &mut App, evt: TerminalEvent) {
        match evt {
            TerminalEvent::Init => Self::handle_action(app, Event::Initialize).await,
            TerminalEvent::Closed => app.should_quit = true,
            TerminalEvent::Key(key) => {
                if let Some(action) = Self::map_key(key) {
                    Self::handle_action(app, action).await;
                }
            }
            TerminalEvent::Tick | TerminalEvent::Resize(_, _) => {}
        }
    }

    pub async fn handle_action(app: &mut App, evt: Event) {
        let result = match evt {
            Event::Initialize => app.audio_system.load_current().await,
            Event::TrackEnded(service, generation) => {
                app.audio_system.on_track_ended(service, generation).await
            }
            Event::Audio(command) => app.audio_system.handle_command(command).await,
            Event::Quit => {
                app.should_quit = true;
                return;
            }
        };
        Self::record(app, result);
    }

    fn record(app: &mut App, result: Result<(), PlaybackError>) {
        match result {
            Ok(()) => app.last_error = None,
            Err(e) => {
                warn!(error = %e, index = app.audio_system.current_track_index(), "command_failed");
                app.last_error = Some(e.to_string());
            }
        }
    }

    pub fn map_key(key: KeyEvent) -> Option<Event> {
        let command = match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Some(Event::Quit);
            }
            KeyCode::Char('q') | KeyCode::Esc => return Some(Event::Quit),
            KeyCode::Char('n') => AudioCommand::Next,
            KeyCode::Char('p') => AudioCommand::Previous,
            KeyCode::Char(' ') => AudioCommand::TogglePlay,
            KeyCode::Char('+') | KeyCode::Char('=') => AudioCommand::VolumeUp,
            KeyCode::Char('-') => AudioCommand::VolumeDown,
            KeyCode::Right => AudioCommand::SeekForward,
            KeyCode::Left => AudioCommand::SeekBackward,
            KeyCode::Char('0') => AudioCommand::Seek(0.0),
            _ => return None,
        };
        Some(Event::Audio(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_key_bindings() {
        assert_eq!(
            EventHandler::map_key(key(KeyCode::Char('n'))),
            Some(Event::Audio(AudioCommand::Next))
        );
        assert_eq!(
            EventHandler::map_key(key(KeyCode::Char(' '))),
            Some(Event::Audio(AudioCommand::TogglePlay))
        );
        assert_eq!(
            EventHandler::map_key(key(KeyCode::Left)),
            Some(Event::Audio(AudioCommand::SeekBackward))
        );
        assert_eq!(EventHandler::map_key(key(KeyCode::Esc)), Some(Event::Quit));
        assert_eq!(
            EventHandler::map_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Event::Quit)
        );
        assert_eq!(EventHandler::map_key(key(KeyCode::Char('x'))), None);
    }
}
