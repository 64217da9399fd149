//! AbuseGuard observability
//!
//! Shared tracing setup for every AbuseGuard binary:
//! - pretty or JSON structured logs selected by environment
//! - trace id propagation (`traceparent` / `x-trace-id`) across HTTP hops
//! - domain events for detection, alerting and notification outcomes
//! - actix-web middleware logging each request with its duration

pub mod trace_context;
pub mod domain_events;
pub mod middleware;
pub mod init;
pub mod macros;

pub use trace_context::*;
pub use domain_events::*;
pub use middleware::*;
pub use init::*;

// Re-export tracing for convenience
pub use tracing::{debug, error, info, warn, trace, span, Level, Instrument};
pub use tracing::instrument;
