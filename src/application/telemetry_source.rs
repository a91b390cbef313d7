// Source trait for live telemetry transports
use crate::application::fleet_service::{FleetClosed, FleetHandle};
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Fleet(#[from] FleetClosed),
}

/// A transport that decodes samples and hands them to the fleet.
///
/// Implementations own reconnects and must call
/// [`FleetHandle::be_ready_to_reset`] once per reconnect. `run` only returns
/// when the fleet is gone or the source gives up for good.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn run(&self, fleet: FleetHandle) -> Result<(), FeedError>;
}
