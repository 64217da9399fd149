//! Shared domain types for the abuse detection and alerting services.

pub mod activity;
pub mod alert;
pub mod auth;
pub mod notification;
pub mod stats;
pub mod violation;

pub use activity::*;
pub use alert::*;
pub use notification::*;
pub use stats::*;
pub use violation::*;
