use std::time::{Duration, Instant};

/// Playhead estimate for the active track. Vendors are never polled for their
/// position, so relative seeks are computed from this.
#[derive(Debug, Default)]
pub struct TrackProgress {
    position: Duration,
    resumed_at: Option<Instant>,
}

impl TrackProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.position = Duration::ZERO;
        self.resumed_at = None;
    }

    pub fn resume(&mut self) {
        if self.resumed_at.is_none() {
            self.resumed_at = Some(Instant::now());
        }
    }

    pub fn pause(&mut self) {
        self.position = self.position();
        self.resumed_at = None;
    }

    pub fn seek(&mut self, position: Duration) {
        self.position = position;
        if self.resumed_at.is_some() {
            self.resumed_at = Some(Instant::now());
        }
    }

    pub fn position(&self) -> Duration {
        match self.resumed_at {
            Some(at) => self.position + at.elapsed(),
            None => self.position,
        }
    }

    /// `position() + delta`, floored at zero.
    pub fn offset(&self, delta_secs: f64) -> f64 {
        (self.position().as_secs_f64() + delta_secs).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paused_playhead_stands_still() {
        let mut progress = TrackProgress::new();
        progress.seek(Duration::from_secs(12));
        assert_eq!(progress.position(), Duration::from_secs(12));
        assert_eq!(progress.offset(5.0), 17.0);
        assert_eq!(progress.offset(-20.0), 0.0);

        progress.reset();
        assert_eq!(progress.position(), Duration::ZERO);
    }

    #[test]
    fn test_running_playhead_advances() {
        let mut progress = TrackProgress::new();
        progress.resume();
        std::thread::sleep(Duration::from_millis(20));
        progress.pause();

        let frozen = progress.position();
        assert!(frozen >= Duration::from_millis(20));
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(progress.position(), frozen);
    }
}
