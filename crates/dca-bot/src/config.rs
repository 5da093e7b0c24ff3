//! Application configuration.
//!
//! Layered: a TOML file, then `DCA__`-prefixed environment variables
//! (`DCA__SCHEDULER__MINUTES_BEFORE_NEXT_BUY=60`).

use ::config::{Config, Environment, File, FileFormat};
use dca_core::SymbolMarket;
use dca_engine::{EngineSettings, PaperConfig, SchedulerConfig};
use dca_ladder::{ExitConfig, LadderConfig};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Print the Prometheus exposition on shutdown.
    #[serde(default)]
    pub dump_metrics: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dump_metrics: false,
        }
    }
}

fn default_log_level() -> String {
    dca_telemetry::DEFAULT_DIRECTIVE.to_string()
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Traded symbol and its exchange precision.
    pub market: SymbolMarket,
    #[serde(default)]
    pub ladder: LadderConfig,
    #[serde(default)]
    pub exits: ExitConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Paper exchange starting balances and price.
    pub paper: PaperConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load from a TOML file plus environment overrides.
    pub fn load(path: &str) -> AppResult<Self> {
        Self::from_source(File::new(path, FileFormat::Toml))
    }

    /// Load from TOML text plus environment overrides.
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        Self::from_source(File::from_str(content, FileFormat::Toml))
    }

    fn from_source<S>(file: S) -> AppResult<Self>
    where
        S: ::config::Source + Send + Sync + 'static,
    {
        let config: Self = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("DCA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        self.engine_settings().validate()?;
        let paper = &self.paper;
        if !paper.initial_price.is_positive() {
            return Err(AppError::Config(format!(
                "paper.initial_price must be positive, got {}",
                paper.initial_price
            )));
        }
        if paper.base_balance < Decimal::ZERO || paper.quote_balance < Decimal::ZERO {
            return Err(AppError::Config("paper balances must not be negative".to_string()));
        }
        if self.telemetry.log_level.trim().is_empty() {
            return Err(AppError::Config("telemetry.log_level must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            market: self.market.clone(),
            ladder: self.ladder.clone(),
            exits: self.exits.clone(),
            scheduler: self.scheduler.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dca_engine::TriggerMode;
    use dca_ladder::AmountDescriptor;
    use rust_decimal_macros::dec;

    const MINIMAL: &str = r#"
[market]
symbol = "BTC/USDT"
tick_size = "0.01"
lot_size = "0.0001"

[paper]
quote_balance = "1000"
initial_price = "30000"
"#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = AppConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.market.symbol, "BTC/USDT");
        assert_eq!(config.scheduler.trigger_mode, TriggerMode::TimeBased);
        assert_eq!(config.scheduler.minutes_before_next_buy, 10080);
        assert!(config.ladder.entry_amount.is_none());
        assert!(config.ladder.cancel_open_orders_at_each_entry);
        assert_eq!(config.telemetry.log_level, "info,dca=debug");
        assert!(!config.paper.backtesting);
    }

    #[test]
    fn test_full_sections_parse() {
        let content = format!(
            "{MINIMAL}\n{}",
            r#"
[ladder]
entry_offset = "0.02"
entry_amount = "25%"
use_secondary_entries = true
secondary_entry_count = 2
secondary_entry_amount = "0.001"

[exits]
use_stop_loss = true
use_take_profit = true
use_secondary_exits = true
secondary_exit_count = 1

[scheduler]
trigger_mode = "maximum_evaluators_signals_based"
activation_topic = "full_candles"
"#
        );
        let config = AppConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.ladder.entry_offset, dec!(0.02));
        assert_eq!(
            config.ladder.entry_amount,
            Some(AmountDescriptor::PercentOfAvailable(dec!(0.25)))
        );
        assert!(config.ladder.secondaries_enabled());
        assert_eq!(config.exits.desired_tiers(), 2);
        assert_eq!(config.scheduler.trigger_mode, TriggerMode::SignalBased);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let negative_offset = format!("{MINIMAL}\n[ladder]\nentry_offset = \"-0.1\"\n");
        assert!(AppConfig::from_toml_str(&negative_offset).is_err());

        let zero_interval = format!("{MINIMAL}\n[scheduler]\nminutes_before_next_buy = 0\n");
        assert!(AppConfig::from_toml_str(&zero_interval).is_err());

        let bad_amount = format!("{MINIMAL}\n[ladder]\nentry_amount = \"150%\"\n");
        assert!(AppConfig::from_toml_str(&bad_amount).is_err());
    }

    #[test]
    fn test_environment_overrides_file() {
        std::env::set_var("DCA__PAPER__QUOTE_BALANCE", "2500");
        let config = AppConfig::from_toml_str(MINIMAL);
        std::env::remove_var("DCA__PAPER__QUOTE_BALANCE");

        assert_eq!(config.unwrap().paper.quote_balance, dec!(2500));
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::from_toml_str(MINIMAL).unwrap();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("minutes_before_next_buy"));
        assert!(toml_str.contains("BTC/USDT"));
    }
}
