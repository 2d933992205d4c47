// Event streaming for Dashboard
//
// Merges overlay readings and settings changes into one SSE stream per client.

use crate::overlay::{OverlayRefresher, ProbeReading};
use crate::settings::ParticleSettings;
use axum::response::sse::Event;
use serde::Serialize;
use std::convert::Infallible;
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tokio_stream::{Stream, StreamExt};
use tracing::warn;

/// Event sent to Dashboard clients
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum DashboardEvent {
    /// A probe produced a new reading
    OverlayUpdate(ProbeReading),
    /// The particle cap changed
    ParticleSettings {
        #[serde(rename = "maxParticles")]
        max_particles: u32,
    },
}

impl DashboardEvent {
    fn name(&self) -> &'static str {
        match self {
            DashboardEvent::OverlayUpdate(_) => "overlay",
            DashboardEvent::ParticleSettings { .. } => "settings",
        }
    }

    fn into_sse(self) -> Option<Event> {
        match serde_json::to_string(&self) {
            Ok(json) => Some(Event::default().event(self.name()).data(json)),
            Err(e) => {
                warn!(target: "dashboard", error = %e, "Failed to serialize event");
                None
            }
        }
    }
}

/// Live stream for one client. The settings stream yields the current value
/// first, so a fresh client learns the cap without a separate request.
pub fn dashboard_events(
    overlay: &OverlayRefresher,
    settings: &ParticleSettings,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let readings = BroadcastStream::new(overlay.subscribe()).filter_map(|result| match result {
        Ok(reading) => Some(DashboardEvent::OverlayUpdate(reading)),
        Err(e) => {
            // Lagged clients skip ahead; the next reading of each probe catches them up
            warn!(target: "dashboard", error = %e, "Overlay stream lagged");
            None
        }
    });
    let particles = WatchStream::new(settings.subscribe())
        .map(|max_particles| DashboardEvent::ParticleSettings { max_particles });

    readings
        .merge(particles)
        .filter_map(DashboardEvent::into_sse)
        .map(Ok)
}
