//! HTTP middleware and gateway metrics.
//!
//! Layer order: Request → CORS → Tracing → body limit → route

pub mod cors;
pub mod metrics;
pub mod tracing;

pub use cors::create_cors_layer;
pub use metrics::{CallTimer, GatewayMetrics};
pub use self::tracing::{TracingLayer, REQUEST_ID_HEADER};
