//! Global display preferences
//!
//! Currently only the particle cap. Observers hold a `watch::Receiver`;
//! dropping it unsubscribes.

use crate::storage::{KeyValueStore, KeyValueStoreExt};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

pub const PARTICLE_MAX_COUNT_KEY: &str = "imc-particle-max-count";
pub const DEFAULT_MAX_PARTICLES: u32 = 4;
pub const MIN_PARTICLES: u32 = 1;
pub const MAX_PARTICLES: u32 = 20;

pub struct ParticleSettings {
    store: Arc<dyn KeyValueStore>,
    current: watch::Sender<u32>,
}

impl ParticleSettings {
    /// Read the saved cap, falling back to the default on a missing or bad value
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let saved = match store.get_json::<u32>(PARTICLE_MAX_COUNT_KEY) {
            Ok(Some(v)) => v,
            Ok(None) => DEFAULT_MAX_PARTICLES,
            Err(e) => {
                warn!(target: "settings", error = %e, "Unreadable particle setting, using default");
                DEFAULT_MAX_PARTICLES
            }
        };
        let (current, _) = watch::channel(clamp(saved));
        Self { store, current }
    }

    pub fn max_particles(&self) -> u32 {
        *self.current.borrow()
    }

    /// Persist then notify observers; returns the stored (clamped) value
    pub fn set_max_particles(&self, requested: u32) -> u32 {
        let value = clamp(requested);
        if let Err(e) = self.store.put_json(PARTICLE_MAX_COUNT_KEY, &value) {
            warn!(target: "settings", error = %e, "Failed to persist particle setting");
        }
        self.current.send_replace(value);
        info!(target: "settings", max_particles = value, "Particle cap updated");
        value
    }

    pub fn subscribe(&self) -> watch::Receiver<u32> {
        self.current.subscribe()
    }

    pub fn observers(&self) -> usize {
        self.current.receiver_count()
    }
}

fn clamp(value: u32) -> u32 {
    value.clamp(MIN_PARTICLES, MAX_PARTICLES)
}
