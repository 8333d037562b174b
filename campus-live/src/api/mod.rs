//! HTTP API handlers for campus-live

pub mod alerts;
pub mod health;
pub mod spaces;
pub mod sse;
pub mod telemetry;

pub use alerts::post_alert;
pub use health::health_routes;
pub use spaces::{get_space, get_space_history, list_spaces};
pub use sse::event_stream;
pub use telemetry::post_telemetry;
