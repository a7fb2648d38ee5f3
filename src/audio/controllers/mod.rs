//! Service controllers.
//!
//! Each controller drives one vendor embed through a small vendor trait and
//! turns that vendor's readiness, error and end-of-track signals into the
//! uniform [`PlaybackControl`](crate::audio::traits::PlaybackControl) surface.
//! Vendor events arrive on a channel drained by a listener task spawned in
//! `init()`; callers waiting on `init()` or `load()` park on a [`Pending`]
//! slot that the listener settles.

pub mod premium;
pub mod video;
pub mod widget;

pub use premium::{PremiumController, SdkEvent, SdkState, SdkTrack, TrackWindow, WebPlaybackSdk};
pub use video::{IframeApi, IframeEvent, PlayerOptions, PlayerState, VideoController};
pub use widget::{WidgetApi, WidgetController, WidgetEvent};

use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use arc_swap::ArcSwap;
use tokio::sync::oneshot;
use tracing::info;

use crate::audio::{error::InitError, service::ServiceTag, traits::TrackEndCallback};

pub(crate) struct Pending<T> {
    slot: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> Pending<T> {
    pub(crate) fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Registers a new waiter, dropping any previous one.
    pub(crate) fn arm(&self) -> oneshot::Receiver<T> {
        let (tx, rx) = oneshot::channel();
        *self.lock() = Some(tx);
        rx
    }

    /// Hands `value` to the current waiter. Returns false if nobody waits.
    pub(crate) fn settle(&self, value: T) -> bool {
        match self.lock().take() {
            Some(tx) => {
                let _ = tx.send(value);
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub(crate) fn is_armed(&self) -> bool {
        self.lock().is_some()
    }

    pub(crate) fn cancel(&self) {
        self.lock().take();
    }

    fn lock(&self) -> MutexGuard<'_, Option<oneshot::Sender<T>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// State every controller shares with its listener task.
pub(crate) struct ControllerCore {
    pub(crate) service: ServiceTag,
    pub(crate) init: Pending<Result<(), InitError>>,
    ready: AtomicBool,
    on_track_end: ArcSwap<TrackEndCallback>,
}

impl ControllerCore {
    pub(crate) fn new(service: ServiceTag) -> Arc<Self> {
        let default_callback: TrackEndCallback =
            Arc::new(move || info!(service = %service, "track_ended"));

        Arc::new(Self {
            service,
            init: Pending::new(),
            ready: AtomicBool::new(false),
            on_track_end: ArcSwap::from_pointee(default_callback),
        })
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub(crate) fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// The vendor event channel closed; nothing will be settled anymore.
    pub(crate) fn shutdown(&self) {
        self.ready.store(false, Ordering::Release);
        self.init.cancel();
    }

    pub(crate) fn set_on_track_end(&self, callback: TrackEndCallback) {
        self.on_track_end.store(Arc::new(callback));
    }

    pub(crate) fn fire_track_end(&self) {
        let callback = self.on_track_end.load_full();
        (*callback)();
    }

    /// Waits for the listener to settle `init`, then records readiness.
    pub(crate) async fn finish_init(
        &self,
        ready: oneshot::Receiver<Result<(), InitError>>,
    ) -> Result<(), InitError> {
        let result = ready.await.unwrap_or_else(|_| {
            Err(InitError::Initialization(
                "player closed before it became ready".to_string(),
            ))
        });

        match &result {
            Ok(()) => {
                self.mark_ready();
                info!(service = %self.service, "controller_ready");
            }
            Err(e) => {
                info!(service = %self.service, error = %e, "controller_init_failed");
            }
        }
        result
    }
}
