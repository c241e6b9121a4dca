// Domain layer - Records, window and view models
pub mod dashboard;
pub mod error;
pub mod record;
pub mod stock;
pub mod telemetry;
pub mod weather;
pub mod window;
