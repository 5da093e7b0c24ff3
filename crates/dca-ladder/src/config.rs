//! Entry ladder and exit chain configuration.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::amount::AmountDescriptor;
use crate::error::{LadderError, LadderResult};

/// Upper bound for `secondary_entry_count`.
pub const MAX_SECONDARY_ENTRIES: u32 = 50;

/// Upper bound for `secondary_exit_count`.
pub const MAX_SECONDARY_EXITS: u32 = 50;

/// Entry ladder configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LadderConfig {
    /// Use a market order for the primary entry instead of an offset limit.
    #[serde(default)]
    pub use_market_entry: bool,

    /// Primary limit offset from the quote, as a fraction (0.05 = 5%).
    #[serde(default = "default_offset")]
    pub entry_offset: Decimal,

    /// Primary entry amount. Missing means no entry can be built.
    #[serde(default)]
    pub entry_amount: Option<AmountDescriptor>,

    #[serde(default)]
    pub use_secondary_entries: bool,

    /// Number of secondary limit entries below (BUY) the primary.
    #[serde(default)]
    pub secondary_entry_count: u32,

    /// Additional offset per secondary entry, as a fraction.
    #[serde(default = "default_offset")]
    pub secondary_entry_offset: Decimal,

    #[serde(default)]
    pub secondary_entry_amount: Option<AmountDescriptor>,

    /// Cancel same-side open orders once new entries exist.
    #[serde(default = "default_true")]
    pub cancel_open_orders_at_each_entry: bool,
}

impl Default for LadderConfig {
    fn default() -> Self {
        Self {
            use_market_entry: false,
            entry_offset: default_offset(),
            entry_amount: None,
            use_secondary_entries: false,
            secondary_entry_count: 0,
            secondary_entry_offset: default_offset(),
            secondary_entry_amount: None,
            cancel_open_orders_at_each_entry: true,
        }
    }
}

impl LadderConfig {
    /// Secondary entries are placed only when enabled with a positive count.
    pub fn secondaries_enabled(&self) -> bool {
        self.use_secondary_entries && self.secondary_entry_count > 0
    }

    pub fn validate(&self) -> LadderResult<()> {
        check_fraction("entry_offset", self.entry_offset)?;
        check_fraction("secondary_entry_offset", self.secondary_entry_offset)?;
        check_count(
            "secondary_entry_count",
            self.secondary_entry_count,
            MAX_SECONDARY_ENTRIES,
        )?;
        if self.secondaries_enabled() {
            let deepest = self.entry_offset
                + self.secondary_entry_offset * Decimal::from(self.secondary_entry_count);
            if deepest >= Decimal::ONE {
                return Err(LadderError::InvalidConfig(format!(
                    "deepest secondary entry offset {deepest} would price BUY entries at or below zero"
                )));
            }
        }
        Ok(())
    }
}

/// Exit chain configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExitConfig {
    #[serde(default)]
    pub use_stop_loss: bool,

    /// Stop distance from the fill price, as a fraction.
    #[serde(default = "default_stop_loss_offset")]
    pub stop_loss_offset: Decimal,

    #[serde(default)]
    pub use_take_profit: bool,

    /// First take-profit distance from the fill price, as a fraction.
    #[serde(default = "default_offset")]
    pub take_profit_offset: Decimal,

    /// Split exits into several tiers.
    #[serde(default)]
    pub use_secondary_exits: bool,

    #[serde(default)]
    pub secondary_exit_count: u32,

    /// Additional take-profit distance per tier, as a fraction.
    #[serde(default = "default_offset")]
    pub secondary_exit_offset: Decimal,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            use_stop_loss: false,
            stop_loss_offset: default_stop_loss_offset(),
            use_take_profit: false,
            take_profit_offset: default_offset(),
            use_secondary_exits: false,
            secondary_exit_count: 0,
            secondary_exit_offset: default_offset(),
        }
    }
}

impl ExitConfig {
    pub fn any_exit_enabled(&self) -> bool {
        self.use_stop_loss || self.use_take_profit
    }

    /// Number of exit tiers requested (before exchange minimums): the first
    /// exit plus one per secondary exit.
    pub fn desired_tiers(&self) -> u32 {
        if self.use_secondary_exits {
            self.secondary_exit_count.saturating_add(1)
        } else {
            1
        }
    }

    pub fn validate(&self) -> LadderResult<()> {
        check_fraction("stop_loss_offset", self.stop_loss_offset)?;
        check_fraction("take_profit_offset", self.take_profit_offset)?;
        check_fraction("secondary_exit_offset", self.secondary_exit_offset)?;
        check_count(
            "secondary_exit_count",
            self.secondary_exit_count,
            MAX_SECONDARY_EXITS,
        )?;
        if self.use_stop_loss && self.stop_loss_offset >= Decimal::ONE {
            return Err(LadderError::InvalidConfig(format!(
                "stop_loss_offset {} would price long stops at or below zero",
                self.stop_loss_offset
            )));
        }
        Ok(())
    }
}

fn check_fraction(name: &str, value: Decimal) -> LadderResult<()> {
    if value.is_sign_negative() {
        return Err(LadderError::InvalidConfig(format!(
            "{name} must not be negative, got {value}"
        )));
    }
    Ok(())
}

fn check_count(name: &str, value: u32, max: u32) -> LadderResult<()> {
    if value > max {
        return Err(LadderError::InvalidConfig(format!(
            "{name} must be at most {max}, got {value}"
        )));
    }
    Ok(())
}

fn default_true() -> bool {
    true
}
fn default_offset() -> Decimal {
    dec!(0.05)
}
fn default_stop_loss_offset() -> Decimal {
    dec!(0.10)
}
