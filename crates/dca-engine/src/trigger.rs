//! Trigger modes, activation topics and the unanimity rule.

use dca_core::DirectionalState;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;

/// How cycles are triggered. Mutually exclusive per scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    /// Recurring timer; every cycle buys.
    #[default]
    TimeBased,
    /// Evaluation updates, triggering on unanimous extremes only.
    #[serde(alias = "maximum_evaluators_signals_based")]
    SignalBased,
}

impl fmt::Display for TriggerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimeBased => f.write_str("time_based"),
            Self::SignalBased => f.write_str("signal_based"),
        }
    }
}

/// Evaluation channel a signal-based scheduler registers on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationTopic {
    EvaluationCycle,
    FullCandles,
    InConstructionCandles,
}

impl ActivationTopic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EvaluationCycle => "evaluation_cycle",
            Self::FullCandles => "full_candles",
            Self::InConstructionCandles => "in_construction_candles",
        }
    }
}

impl FromStr for ActivationTopic {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().replace(' ', "_").to_ascii_lowercase().as_str() {
            "evaluation_cycle" => Ok(Self::EvaluationCycle),
            "full_candles" => Ok(Self::FullCandles),
            "in_construction_candles" => Ok(Self::InConstructionCandles),
            _ => Err(EngineError::UnknownTopic(s.to_string())),
        }
    }
}

impl fmt::Display for ActivationTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One update from the evaluation aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationUpdate {
    /// One note per contributing evaluation; `None` when it has no valid value.
    pub notes: Vec<Option<Decimal>>,
}

impl EvaluationUpdate {
    pub fn new(notes: impl IntoIterator<Item = Option<Decimal>>) -> Self {
        Self {
            notes: notes.into_iter().collect(),
        }
    }

    pub fn valid_notes(&self) -> Vec<Decimal> {
        self.notes.iter().flatten().copied().collect()
    }
}

/// All notes at -1 → `VeryLong`, all at 1 → `VeryShort`, anything else → `Neutral`.
pub fn unanimity(notes: &[Decimal]) -> DirectionalState {
    if notes.is_empty() {
        return DirectionalState::Neutral;
    }
    if notes.iter().all(|n| *n == Decimal::NEGATIVE_ONE) {
        DirectionalState::VeryLong
    } else if notes.iter().all(|n| *n == Decimal::ONE) {
        DirectionalState::VeryShort
    } else {
        DirectionalState::Neutral
    }
}

/// Comma-joined notes, as reported by `current_state`.
pub fn notes_summary(notes: &[Decimal]) -> String {
    notes
        .iter()
        .map(|n| n.normalize().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_unanimous_extremes() {
        assert_eq!(unanimity(&[dec!(-1), dec!(-1.0)]), DirectionalState::VeryLong);
        assert_eq!(unanimity(&[dec!(1), dec!(1)]), DirectionalState::VeryShort);
    }

    #[test]
    fn test_mixed_is_neutral() {
        assert_eq!(unanimity(&[dec!(-1), dec!(-0.9)]), DirectionalState::Neutral);
        assert_eq!(unanimity(&[dec!(-1), dec!(1)]), DirectionalState::Neutral);
        assert_eq!(unanimity(&[]), DirectionalState::Neutral);
    }

    #[test]
    fn test_invalid_notes_ignored() {
        let update = EvaluationUpdate::new([Some(dec!(-1)), None, Some(dec!(-1))]);
        assert_eq!(update.valid_notes(), vec![dec!(-1), dec!(-1)]);
        assert_eq!(notes_summary(&update.valid_notes()), "-1,-1");
    }

    #[test]
    fn test_topics() {
        assert_eq!(
            "evaluation_cycle".parse::<ActivationTopic>().unwrap(),
            ActivationTopic::EvaluationCycle
        );
        assert_eq!(
            "full candles".parse::<ActivationTopic>().unwrap(),
            ActivationTopic::FullCandles
        );
        assert!(matches!(
            "tick".parse::<ActivationTopic>(),
            Err(EngineError::UnknownTopic(_))
        ));
    }

    #[test]
    fn test_trigger_mode_serde() {
        let mode: TriggerMode = serde_json::from_str("\"maximum_evaluators_signals_based\"").unwrap();
        assert_eq!(mode, TriggerMode::SignalBased);
        assert_eq!(TriggerMode::TimeBased.to_string(), "time_based");
    }
}
