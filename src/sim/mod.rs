//! In-process stand-ins for the vendor embeds.
//!
//! Each simulated embed keeps a [`Transport`] (what is cued, whether it is
//! playing, where the playhead is) and pushes vendor-shaped events on the
//! channel handed out at construction time. Tests drive them directly with
//! `finish()` / `emit()`; the binary lets tracks run out on a timer.

pub mod sdk;
pub mod video;
pub mod widget;

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use flume::{Receiver, Sender};

const TICK: Duration = Duration::from_millis(250);

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Outgoing vendor event channel.
pub(crate) struct EventLine<E> {
    tx: Mutex<Option<Sender<E>>>,
}

impl<E> EventLine<E> {
    pub(crate) fn new() -> Self {
        Self {
            tx: Mutex::new(None),
        }
    }

    pub(crate) fn open(&self) -> Receiver<E> {
        let (tx, rx) = flume::unbounded();
        *lock(&self.tx) = Some(tx);
        rx
    }

    pub(crate) fn sender(&self) -> Option<Sender<E>> {
        lock(&self.tx).clone()
    }

    pub(crate) fn send(&self, event: E) {
        if let Some(tx) = lock(&self.tx).as_ref() {
            let _ = tx.send(event);
        }
    }

    pub(crate) fn close(&self) {
        lock(&self.tx).take();
    }

    /// Yields until the consumer drained every queued event.
    pub(crate) async fn wait_idle(&self) {
        loop {
            let drained = lock(&self.tx).as_ref().is_none_or(|tx| tx.is_empty());
            if drained {
                break;
            }
            tokio::task::yield_now().await;
        }
        tokio::task::yield_now().await;
    }
}

#[derive(Debug, Default)]
struct TransportState {
    current: Option<String>,
    playing: bool,
    position: Duration,
    resumed_at: Option<Instant>,
    generation: u64,
}

impl TransportState {
    fn position(&self) -> Duration {
        match self.resumed_at {
            Some(at) if self.playing => self.position + at.elapsed(),
            _ => self.position,
        }
    }
}

/// Playhead of one simulated embed.
pub(crate) struct Transport {
    state: Arc<Mutex<TransportState>>,
    track_length: Option<Duration>,
    unavailable: Mutex<HashSet<String>>,
}

impl Transport {
    pub(crate) fn new(track_length: Option<Duration>) -> Self {
        Self {
            state: Arc::new(Mutex::new(TransportState::default())),
            track_length,
            unavailable: Mutex::new(HashSet::new()),
        }
    }

    pub(crate) fn mark_unavailable(&self, id: &str) {
        lock(&self.unavailable).insert(id.to_string());
    }

    pub(crate) fn is_available(&self, id: &str) -> bool {
        !lock(&self.unavailable).contains(id)
    }

    pub(crate) fn cue(&self, id: &str) {
        let mut state = lock(&self.state);
        state.generation += 1;
        state.current = Some(id.to_string());
        state.playing = false;
        state.position = Duration::ZERO;
        state.resumed_at = None;
    }

    /// Starts the cued track. `on_end` runs if the track plays out.
    pub(crate) fn play<F>(&self, on_end: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let generation = {
            let mut state = lock(&self.state);
            if state.current.is_none() || state.playing {
                return false;
            }
            state.generation += 1;
            state.playing = true;
            state.resumed_at = Some(Instant::now());
            state.generation
        };

        if let Some(length) = self.track_length {
            tokio::spawn(run_out(self.state.clone(), generation, length, on_end));
        }
        true
    }

    pub(crate) fn pause(&self) -> bool {
        let mut state = lock(&self.state);
        if !state.playing {
            return false;
        }
        state.position = state.position();
        state.generation += 1;
        state.playing = false;
        state.resumed_at = None;
        true
    }

    pub(crate) fn seek(&self, position: Duration) {
        let mut state = lock(&self.state);
        state.position = position;
        if state.playing {
            state.resumed_at = Some(Instant::now());
        }
    }

    /// Ends the current track as if it played out.
    pub(crate) fn finish(&self) -> bool {
        let mut state = lock(&self.state);
        if state.current.is_none() {
            return false;
        }
        state.generation += 1;
        state.playing = false;
        state.position = Duration::ZERO;
        state.resumed_at = None;
        true
    }

    pub(crate) fn current(&self) -> Option<String> {
        lock(&self.state).current.clone()
    }

    pub(crate) fn is_playing(&self) -> bool {
        lock(&self.state).playing
    }

    pub(crate) fn position(&self) -> Duration {
        lock(&self.state).position()
    }
}

async fn run_out<F>(state: Arc<Mutex<TransportState>>, generation: u64, length: Duration, on_end: F)
where
    F: FnOnce() + Send + 'static,
{
    loop {
        tokio::time::sleep(TICK).await;
        {
            let mut state = lock(&state);
            if state.generation != generation {
                return;
            }
            if state.position() < length {
                continue;
            }
            state.generation += 1;
            state.playing = false;
            state.position = Duration::ZERO;
            state.resumed_at = None;
        }
        on_end();
        return;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_play_needs_a_cued_track() {
        let transport = Transport::new(None);
        assert!(!transport.play(|| {}));
        transport.cue("a");
        assert!(transport.play(|| {}));
        assert!(!transport.play(|| {}));
        assert!(transport.pause());
        assert!(!transport.pause());
    }

    #[test]
    fn test_seek_moves_paused_playhead() {
        let transport = Transport::new(None);
        transport.cue("a");
        transport.seek(Duration::from_secs(12));
        assert_eq!(transport.position(), Duration::from_secs(12));
        assert!(transport.finish());
        assert_eq!(transport.position(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_track_runs_out() {
        let transport = Transport::new(Some(Duration::from_millis(10)));
        let ended = Arc::new(AtomicBool::new(false));
        let flag = ended.clone();
        transport.cue("a");
        transport.play(move || flag.store(true, Ordering::SeqCst));

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(ended.load(Ordering::SeqCst));
        assert!(!transport.is_playing());
    }

    #[tokio::test]
    async fn test_pause_cancels_run_out() {
        let transport = Transport::new(Some(Duration::from_millis(10)));
        let ended = Arc::new(AtomicBool::new(false));
        let flag = ended.clone();
        transport.cue("a");
        transport.play(move || flag.store(true, Ordering::SeqCst));
        transport.pause();

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(!ended.load(Ordering::SeqCst));
    }
}
