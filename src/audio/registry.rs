use std::{collections::HashMap, sync::Arc, time::Duration};

use futures::future::join_all;
use tracing::{info, warn};

use crate::audio::{
    error::{InitError, PlaybackError},
    service::ServiceTag,
    traits::{PlaybackControl, TrackEndCallback, Volume},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Pending,
    Ready,
    Failed(InitError),
}

struct Slot {
    controller: Arc<dyn PlaybackControl>,
    readiness: Readiness,
}

/// One controller per service, built once at startup.
#[derive(Default)]
pub struct AdapterRegistry {
    slots: HashMap<ServiceTag, Slot>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a controller under its own service tag, replacing any previous one.
    pub fn register(&mut self, controller: Arc<dyn PlaybackControl>) {
        let service = controller.service();
        self.slots.insert(
            service,
            Slot {
                controller,
                readiness: Readiness::Pending,
            },
        );
    }

    /// Initializes every pending controller concurrently. One controller
    /// failing never keeps the others from being attempted.
    pub async fn init_all(&mut self, timeout: Option<Duration>) {
        let pending: Vec<(ServiceTag, Arc<dyn PlaybackControl>)> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.readiness == Readiness::Pending)
            .map(|(service, slot)| (*service, slot.controller.clone()))
            .collect();

        let results = join_all(pending.into_iter().map(|(service, controller)| async move {
            let result = match timeout {
                Some(limit) => tokio::time::timeout(limit, controller.init())
                    .await
                    .unwrap_or(Err(InitError::TimedOut(limit.as_millis() as u64))),
                None => controller.init().await,
            };
            (service, result)
        }))
        .await;

        for (service, result) in results {
            let readiness = match result {
                Ok(()) => {
                    info!(service = %service, "adapter_ready");
                    Readiness::Ready
                }
                Err(e) if e.is_account_problem() => {
                    info!(service = %service, error = %e, "account_not_available");
                    Readiness::Failed(e)
                }
                Err(e) => {
                    warn!(service = %service, error = %e, "adapter_init_failed");
                    Readiness::Failed(e)
                }
            };
            if let Some(slot) = self.slots.get_mut(&service) {
                slot.readiness = readiness;
            }
        }
    }

    pub fn readiness(&self, service: ServiceTag) -> Option<&Readiness> {
        self.slots.get(&service).map(|slot| &slot.readiness)
    }

    pub fn is_ready(&self, service: ServiceTag) -> bool {
        matches!(self.readiness(service), Some(Readiness::Ready))
    }

    pub fn ready_services(&self) -> Vec<ServiceTag> {
        ServiceTag::ALL
            .into_iter()
            .filter(|service| self.is_ready(*service))
            .collect()
    }

    /// The controller for `service`, if it exists and initialized.
    pub fn get_ready(&self, service: ServiceTag) -> Result<&Arc<dyn PlaybackControl>, PlaybackError> {
        match self.slots.get(&service) {
            None => Err(PlaybackError::UnsupportedService(
                service,
                "no controller registered".to_string(),
            )),
            Some(Slot {
                readiness: Readiness::Ready,
                controller,
            }) => Ok(controller),
            Some(Slot {
                readiness: Readiness::Pending,
                ..
            }) => Err(PlaybackError::UnsupportedService(
                service,
                "controller not initialized".to_string(),
            )),
            Some(Slot {
                readiness: Readiness::Failed(e),
                ..
            }) => Err(PlaybackError::UnsupportedService(service, e.to_string())),
        }
    }

    /// Points every controller's end-of-track signal at `make(service)`.
    pub fn install_track_end<F>(&self, make: F)
    where
        F: Fn(ServiceTag) -> TrackEndCallback,
    {
        for (service, slot) in &self.slots {
            slot.controller.set_on_track_end(make(*service));
        }
    }

    pub fn set_volume_all(&self, volume: Volume) {
        for service in self.ready_services() {
            if let Ok(controller) = self.get_ready(service) {
                controller.set_volume(volume);
            }
        }
    }
}
