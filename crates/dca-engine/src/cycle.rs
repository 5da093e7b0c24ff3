//! Cycle phases and reports.

use chrono::{DateTime, Utc};
use dca_core::{ClientOrderId, DirectionalState, OrderGroup, OrderSpec};
use dca_ladder::EntryOutcome;
use serde::Serialize;
use std::fmt;

use crate::ports::SubmitError;

/// Coarse scheduler status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerStatus {
    Stopped,
    Running,
}

/// Where the scheduler is within its cycle loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Waiting,
    Evaluating,
    EntryBuild,
    ExitBuild,
    Submitting,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Waiting => "waiting",
            Self::Evaluating => "evaluating",
            Self::EntryBuild => "entry_build",
            Self::ExitBuild => "exit_build",
            Self::Submitting => "submitting",
        };
        f.write_str(name)
    }
}

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Neutral state, nothing to do.
    Skipped,
    /// SELL-side entries are computed upstream but not forwarded to execution.
    EntriesSuppressed,
    /// At least one entry accepted by the gateway.
    Created,
    MissingAmount,
    NoFunds,
    NoVolume,
    CreationFailed,
    /// A collaborator failed; the next cycle still runs.
    Failed(String),
}

impl CycleOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::EntriesSuppressed => "entries_suppressed",
            Self::Created => "created",
            Self::MissingAmount => "missing_amount",
            Self::NoFunds => "no_funds",
            Self::NoVolume => "no_volume",
            Self::CreationFailed => "creation_failed",
            Self::Failed(_) => "failed",
        }
    }

    pub(crate) fn from_entry_outcome(outcome: &EntryOutcome) -> Self {
        match outcome {
            EntryOutcome::Built(_) => Self::Created,
            EntryOutcome::NotSupported(_) => Self::Skipped,
            EntryOutcome::MissingAmount(_) => Self::MissingAmount,
            EntryOutcome::NoFunds(_) => Self::NoFunds,
            EntryOutcome::NoVolume(_) => Self::NoVolume,
            EntryOutcome::CreationFailed(_) => Self::CreationFailed,
        }
    }

    pub(crate) fn from_submit_error(error: &SubmitError) -> Self {
        match error {
            SubmitError::MissingFunds(_) => Self::NoFunds,
            SubmitError::MissingMinimalVolume(_) => Self::NoVolume,
            SubmitError::CreationError(_) => Self::CreationFailed,
        }
    }
}

/// Signal-based exits are not implemented; every non-neutral cycle reports
/// this inert step explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitSignalAction {
    NotApplicable,
    Deferred,
}

/// A creation request the gateway refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedEntry {
    pub entry: ClientOrderId,
    pub error: SubmitError,
}

/// Everything one cycle did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub symbol: String,
    pub state: DirectionalState,
    pub started_at: DateTime<Utc>,
    pub outcome: CycleOutcome,
    pub entries: Vec<OrderSpec>,
    pub exits: Vec<OrderSpec>,
    pub groups: Vec<OrderGroup>,
    pub submitted: Vec<ClientOrderId>,
    pub rejected: Vec<RejectedEntry>,
    pub cancelled: Vec<ClientOrderId>,
    pub skipped_tiers: Vec<u32>,
    pub exit_action: ExitSignalAction,
    pub notified: bool,
}

impl CycleReport {
    pub(crate) fn new(symbol: &str, state: DirectionalState, started_at: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.to_string(),
            state,
            started_at,
            outcome: CycleOutcome::Skipped,
            entries: Vec::new(),
            exits: Vec::new(),
            groups: Vec::new(),
            submitted: Vec::new(),
            rejected: Vec::new(),
            cancelled: Vec::new(),
            skipped_tiers: Vec::new(),
            exit_action: ExitSignalAction::NotApplicable,
            notified: false,
        }
    }

    pub fn is_created(&self) -> bool {
        self.outcome == CycleOutcome::Created
    }
}
