// Application layer - Reconciliation and the task that drives it
pub mod fleet_service;
pub mod reconciler;
pub mod telemetry_source;
