//! Scheduler configuration.

use dca_core::SymbolMarket;
use dca_ladder::{ExitConfig, LadderConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{EngineError, EngineResult};
use crate::trigger::TriggerMode;

/// Trigger scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub trigger_mode: TriggerMode,

    /// Time-based interval between cycles (default one week).
    #[serde(default = "default_minutes_before_next_buy")]
    pub minutes_before_next_buy: u64,

    /// Evaluation channel for the signal-based mode. Checked at start.
    #[serde(default = "default_activation_topic")]
    pub activation_topic: String,

    /// Exchange name used in notifications.
    #[serde(default = "default_exchange_name")]
    pub exchange_name: String,

    /// Cryptocurrency passed to the evaluation subscription.
    #[serde(default)]
    pub cryptocurrency: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            trigger_mode: TriggerMode::default(),
            minutes_before_next_buy: default_minutes_before_next_buy(),
            activation_topic: default_activation_topic(),
            exchange_name: default_exchange_name(),
            cryptocurrency: String::new(),
        }
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.minutes_before_next_buy.saturating_mul(60))
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.minutes_before_next_buy == 0 {
            return Err(EngineError::InvalidConfig(
                "minutes_before_next_buy must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything a scheduler needs to know about its strategy.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub market: SymbolMarket,
    pub ladder: LadderConfig,
    pub exits: ExitConfig,
    pub scheduler: SchedulerConfig,
}

impl EngineSettings {
    pub fn validate(&self) -> EngineResult<()> {
        self.market.validate()?;
        self.ladder.validate()?;
        self.exits.validate()?;
        self.scheduler.validate()
    }
}

fn default_minutes_before_next_buy() -> u64 {
    10080
}
fn default_activation_topic() -> String {
    "evaluation_cycle".to_string()
}
fn default_exchange_name() -> String {
    "paper".to_string()
}
