//! Web server and API implementation.
//!
//! This module provides the HTTP surface of the gateway.

mod handlers;
mod metrics;
mod state;

pub use handlers::{create_router, health_check, metrics_handler};
pub use metrics::ServiceMetrics;
pub use state::{AppState, ProfileEndpoints};
