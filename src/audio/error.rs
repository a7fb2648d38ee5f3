use thiserror::Error;

use crate::audio::service::ServiceTag;

/// Raised by an adapter's `init()`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InitError {
    #[error("Embed script for {0} is not available")]
    ScriptUnavailable(ServiceTag),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Account is not eligible for playback: {0}")]
    AccountIneligible(String),

    #[error("Playback device went offline: {0}")]
    DeviceWentOffline(String),

    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("Initialization timed out after {0}ms")]
    TimedOut(u64),
}

impl InitError {
    /// Missing credentials or subscription; expected for the premium service.
    pub fn is_account_problem(&self) -> bool {
        matches!(
            self,
            InitError::AuthenticationFailed(_) | InitError::AccountIneligible(_)
        )
    }
}

/// Raised by an adapter's `load()`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("Unknown track id: {0}")]
    UnknownTrackId(String),

    #[error("Network error: {0}")]
    NetworkFailure(String),

    #[error("Player is not initialized")]
    NotInitialized,

    #[error("Player went away while loading")]
    Interrupted,
}

/// Raised by the playlist orchestrator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("Service '{0}' not supported: {1}")]
    UnsupportedService(ServiceTag, String),

    #[error("No active player")]
    NoActiveAdapter,

    #[error("Entry {0} is not loaded")]
    EntryNotLoaded(usize),

    #[error("Cannot seek to {0}s")]
    InvalidPosition(String),

    #[error(transparent)]
    Load(#[from] LoadError),
}
