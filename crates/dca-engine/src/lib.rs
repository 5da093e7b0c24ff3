//! DCA trigger scheduler.
//!
//! Ties the ladder builders to the outside world through collaborator ports:
//! a portfolio, a price feed, an order gateway, an evaluation source and a
//! notifier. Two trigger modes are supported:
//!
//! - time based: one VERY_LONG cycle immediately, then one per interval
//! - signal based: a cycle per evaluation update, unanimous notes only
//!
//! The [`paper`] module provides in-memory collaborators for dry runs.

pub mod config;
pub mod cycle;
pub mod error;
pub mod paper;
pub mod ports;
pub mod scheduler;
pub mod trigger;

pub use config::{EngineSettings, SchedulerConfig};
pub use cycle::{
    CycleOutcome, CyclePhase, CycleReport, ExitSignalAction, RejectedEntry, SchedulerStatus,
};
pub use error::{EngineError, EngineResult};
pub use paper::{ChannelEvaluationFeed, LogNotifier, PaperConfig, PaperExchange};
pub use ports::{
    BoxFuture, CreationRequest, EvaluationSource, Notification, NotificationCategory, Notifier,
    OrderGateway, Portfolio, PriceFeed, SubmitError, SubmittedOrder,
};
pub use scheduler::{SchedulerDeps, TriggerScheduler};
pub use trigger::{notes_summary, unanimity, ActivationTopic, EvaluationUpdate, TriggerMode};
