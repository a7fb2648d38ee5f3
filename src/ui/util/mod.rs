pub mod handler;

use crate::audio::{state::PlaybackState, system::AudioSystem};

pub fn state_icon(state: PlaybackState) -> &'static str {
    match state {
        PlaybackState::Idle => "·",
        PlaybackState::Loading => "…",
        PlaybackState::Paused => "⏸",
        PlaybackState::Playing => "▶",
    }
}

fn format_position(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// `[2/7] ▶ soundcloud billwurtz/outside 0:12 | vol 80`, plus the last error.
pub fn status_line(system: &AudioSystem, last_error: Option<&str>) -> String {
    let entry = system.current_entry();
    let mut line = format!(
        "[{}/{}] {} {} {} {} | vol {}",
        system.current_track_index() + 1,
        system.queue().len(),
        state_icon(system.state()),
        entry.service,
        entry.track_id,
        format_position(system.position().as_secs()),
        system.volume().level(),
    );
    if let Some(error) = last_error {
        line.push_str(" | ");
        line.push_str(error);
    }
    line
}
