// Live vehicle telemetry reconciliation and history downsampling
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
