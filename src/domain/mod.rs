// Domain layer - Vehicle telemetry state and history aggregation
pub mod aggregation;
pub mod notification;
pub mod registry;
pub mod vehicle;
