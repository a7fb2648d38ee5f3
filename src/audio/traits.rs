use crate::audio::{
    error::{InitError, LoadError},
    service::ServiceTag,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

/// Invoked once per natural completion of the loaded track.
pub type TrackEndCallback = Arc<dyn Fn() + Send + Sync>;

/// Volume on the uniform 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Volume(u8);

impl Volume {
    pub const MAX: Volume = Volume(100);
    pub const MUTE: Volume = Volume(0);

    /// Out-of-range levels are clamped, never forwarded to a vendor.
    pub fn clamped(level: i32) -> Self {
        let clamped = level.clamp(0, 100);
        if clamped != level {
            warn!(requested = level, applied = clamped, "volume_clamped");
        }
        Volume(clamped as u8)
    }

    pub fn level(&self) -> u8 {
        self.0
    }

    pub fn as_fraction(&self) -> f32 {
        self.0 as f32 / 100.0
    }

    pub fn step_up(&self, amount: u8) -> Self {
        Volume(self.0.saturating_add(amount).min(100))
    }

    pub fn step_down(&self, amount: u8) -> Self {
        Volume(self.0.saturating_sub(amount))
    }
}

impl Default for Volume {
    fn default() -> Self {
        Volume::MAX
    }
}

/// Playback surface every service controller implements.
///
/// `init` runs at most once per instance. `load` leaves the track cued and
/// paused, and only returns once the vendor confirmed it. The remaining
/// transitions are fire-and-forget; on a controller whose `init` failed they
/// log and do nothing.
#[async_trait]
pub trait PlaybackControl: Send + Sync {
    fn service(&self) -> ServiceTag;

    async fn init(&self) -> Result<(), InitError>;
    async fn load(&self, track_id: &str) -> Result<(), LoadError>;

    fn play(&self);
    fn pause(&self);
    fn set_volume(&self, volume: Volume);
    fn skip_to(&self, seconds: f64);

    /// Replaces the end-of-track notification target.
    fn set_on_track_end(&self, callback: TrackEndCallback);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_clamps_out_of_range() {
        assert_eq!(Volume::clamped(150), Volume::MAX);
        assert_eq!(Volume::clamped(-1), Volume::MUTE);
        assert_eq!(Volume::clamped(42).level(), 42);
    }

    #[test]
    fn test_volume_steps_saturate() {
        assert_eq!(Volume::clamped(98).step_up(5), Volume::MAX);
        assert_eq!(Volume::clamped(3).step_down(5), Volume::MUTE);
        assert_eq!(Volume::clamped(50).as_fraction(), 0.5);
    }
}
