// Application state for HTTP handlers
use crate::application::fleet_service::FleetHandle;

#[derive(Clone)]
pub struct AppState {
    pub fleet: FleetHandle,
}
