//! Directional state produced upstream once per cycle.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::OrderSide;

/// Directional bias with intensity.
///
/// `VeryLong`/`VeryShort` come from unanimous signals, `Long`/`Short` from
/// mixed ones. `Neutral` never creates orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DirectionalState {
    #[default]
    Neutral,
    Long,
    VeryLong,
    Short,
    VeryShort,
}

impl DirectionalState {
    /// Entry side for this state, `None` for `Neutral`.
    pub fn entry_side(&self) -> Option<OrderSide> {
        match self {
            Self::Neutral => None,
            Self::Long | Self::VeryLong => Some(OrderSide::Buy),
            Self::Short | Self::VeryShort => Some(OrderSide::Sell),
        }
    }

    pub fn is_neutral(&self) -> bool {
        matches!(self, Self::Neutral)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Neutral => "NEUTRAL",
            Self::Long => "LONG",
            Self::VeryLong => "VERY_LONG",
            Self::Short => "SHORT",
            Self::VeryShort => "VERY_SHORT",
        }
    }
}

impl fmt::Display for DirectionalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DirectionalState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "NEUTRAL" => Ok(Self::Neutral),
            "LONG" => Ok(Self::Long),
            "VERY_LONG" => Ok(Self::VeryLong),
            "SHORT" => Ok(Self::Short),
            "VERY_SHORT" => Ok(Self::VeryShort),
            other => Err(CoreError::InvalidState(other.to_string())),
        }
    }
}
