//! Abuse detection and alerting engine.
//!
//! User actions flow through [`ActivityRecorder`] into the event log, the
//! [`ViolationScanner`] compares trailing-window counts against the
//! injected [`abuseguard_config::ThresholdPolicy`], and the first violation
//! becomes an [`abuseguard_models::Alert`] that administrators are notified
//! about and later review, resolve or dismiss.

pub mod engine;
pub mod errors;
pub mod lifecycle;
pub mod memory;
pub mod notifications;
pub mod recorder;
pub mod scanner;
pub mod severity;
pub mod stats;
pub mod stores;

pub use engine::AbuseDetectionEngine;
pub use errors::{AbuseError, AbuseResult};
pub use lifecycle::AlertLifecycleManager;
pub use memory::{InMemoryActivityStore, InMemoryAlertStore, InMemoryNotificationStore, StaticAdministratorDirectory};
pub use notifications::{FanoutReport, NotificationFanout};
pub use recorder::ActivityRecorder;
pub use scanner::ViolationScanner;
pub use severity::classify;
pub use stats::StatsAggregator;
pub use stores::{ActivityEventStore, AdministratorDirectory, AlertStore, NotificationStore};

/// Service name attached to domain events emitted by the engine.
pub const SERVICE_NAME: &str = "abuse-engine";
