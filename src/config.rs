use std::{path::PathBuf, time::Duration};

use color_eyre::eyre::{Result, WrapErr, eyre};
use tracing::{debug, info};

use crate::audio::{config::AudioConfig, queue::PlaylistEntry, service::ServiceTag};

pub const PLAYLIST_VAR: &str = "MIXTAPE_PLAYLIST";
pub const ACCESS_TOKEN_VAR: &str = "SPOTIFY_ACCESS_TOKEN";
pub const INIT_TIMEOUT_VAR: &str = "MIXTAPE_INIT_TIMEOUT_SECS";
pub const SIM_TRACK_SECS_VAR: &str = "MIXTAPE_SIM_TRACK_SECS";

const KEYRING_SERVICE: &str = "mixtape";
const KEYRING_USER: &str = "spotify-access-token";
const DEFAULT_SIM_TRACK_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Settings {
    pub playlist: Vec<PlaylistEntry>,
    pub access_token: Option<String>,
    pub sim_track_length: Duration,
    pub audio: AudioConfig,
}

impl Settings {
    /// Reads the process environment. `.env` must already be loaded.
    pub fn from_env() -> Result<Self> {
        let playlist = match std::env::var_os(PLAYLIST_VAR) {
            Some(path) => load_playlist(PathBuf::from(path))?,
            None => demo_playlist(),
        };

        let access_token = non_empty(std::env::var(ACCESS_TOKEN_VAR).ok()).or_else(token_from_keyring);
        if access_token.is_none() {
            info!("no premium access token configured");
        }

        let init_timeout_secs = parse_secs(INIT_TIMEOUT_VAR)?;
        let sim_track_secs = parse_secs(SIM_TRACK_SECS_VAR)?.unwrap_or(DEFAULT_SIM_TRACK_SECS);

        Ok(Self {
            playlist,
            access_token,
            sim_track_length: Duration::from_secs(sim_track_secs),
            audio: AudioConfig {
                init_timeout_secs,
                ..AudioConfig::default()
            },
        })
    }

    pub fn init_timeout(&self) -> Option<Duration> {
        self.audio.init_timeout_secs.map(Duration::from_secs)
    }
}

/// Reads a JSON playlist: `[{"service": "youtube", "id": "..."}]`.
pub fn load_playlist(path: PathBuf) -> Result<Vec<PlaylistEntry>> {
    let raw = std::fs::read_to_string(&path)
        .wrap_err_with(|| format!("failed to read playlist {}", path.display()))?;
    let playlist = parse_playlist(&raw)
        .wrap_err_with(|| format!("invalid playlist {}", path.display()))?;
    info!(path = %path.display(), entries = playlist.len(), "playlist_loaded");
    Ok(playlist)
}

pub fn parse_playlist(raw: &str) -> Result<Vec<PlaylistEntry>> {
    let playlist: Vec<PlaylistEntry> = serde_json::from_str(raw)?;
    if playlist.is_empty() {
        return Err(eyre!("playlist is empty"));
    }
    Ok(playlist)
}

pub fn demo_playlist() -> Vec<PlaylistEntry> {
    vec![
        PlaylistEntry::new(ServiceTag::CrowdAudio, "koan-sound/hustle-hammer"),
        PlaylistEntry::new(ServiceTag::StreamingVideo, "zNTaVTMoNTk"),
        PlaylistEntry::new(ServiceTag::CrowdAudio, "billwurtz/outside"),
        PlaylistEntry::new(ServiceTag::StreamingVideo, "2ubIhBZG9NA"),
        PlaylistEntry::new(ServiceTag::CrowdAudio, "angrysausage/toby-fox-undertale-64"),
        PlaylistEntry::new(ServiceTag::StreamingVideo, "ng5NA-j7y7A"),
        PlaylistEntry::new(ServiceTag::PremiumAudio, "4MsC3bu5B8WQGHQjOoH2NG"),
    ]
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_secs(var: &str) -> Result<Option<u64>> {
    match non_empty(std::env::var(var).ok()) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .wrap_err_with(|| format!("{var} must be a whole number of seconds")),
        None => Ok(None),
    }
}

#[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
fn token_from_keyring() -> Option<String> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)
        .inspect_err(|e| debug!(error = %e, "keyring_unavailable"))
        .ok()?;
    match entry.get_password() {
        Ok(token) => non_empty(Some(token)),
        Err(e) => {
            debug!(error = %e, "keyring_token_missing");
            None
        }
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn token_from_keyring() -> Option<String> {
    debug!(service = KEYRING_SERVICE, user = KEYRING_USER, "keyring_unsupported");
    None
}
