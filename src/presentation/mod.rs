// Presentation layer - HTTP views over the fleet
pub mod app_state;
pub mod handlers;
