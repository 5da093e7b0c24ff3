//! Main application wiring.

use std::sync::Arc;

use dca_core::DirectionalState;
use dca_engine::{
    ChannelEvaluationFeed, CycleReport, EvaluationUpdate, LogNotifier, PaperExchange,
    SchedulerDeps, TriggerScheduler,
};
use dca_ladder::{BalanceAmountResolver, ExchangePrecision};
use dca_telemetry::Metrics;
use tokio::sync::mpsc;
use tracing::info;

use crate::config::AppConfig;
use crate::error::AppResult;

/// Evaluation updates buffered before the scheduler applies back-pressure.
const EVALUATION_BUFFER: usize = 64;

/// Scheduler wired to the paper exchange.
pub struct Application {
    config: AppConfig,
    exchange: Arc<PaperExchange>,
    scheduler: TriggerScheduler,
    /// Kept open so the signal loop does not see a closed feed.
    evaluations: mpsc::Sender<EvaluationUpdate>,
}

impl Application {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let exchange = Arc::new(PaperExchange::new(config.market.clone(), &config.paper));
        let (feed, evaluations) = ChannelEvaluationFeed::new(EVALUATION_BUFFER);

        let deps = SchedulerDeps {
            portfolio: exchange.clone(),
            prices: exchange.clone(),
            gateway: exchange.clone(),
            evaluations: Arc::new(feed),
            notifier: Arc::new(LogNotifier),
            precision: Arc::new(ExchangePrecision),
            amounts: Arc::new(BalanceAmountResolver),
        };
        let scheduler = TriggerScheduler::new(config.engine_settings(), deps)?;

        Ok(Self {
            config,
            exchange,
            scheduler,
            evaluations,
        })
    }

    pub fn scheduler(&self) -> &TriggerScheduler {
        &self.scheduler
    }

    pub fn exchange(&self) -> &Arc<PaperExchange> {
        &self.exchange
    }

    /// Sender feeding the signal-based trigger.
    pub fn evaluation_sender(&self) -> mpsc::Sender<EvaluationUpdate> {
        self.evaluations.clone()
    }

    /// Run a single cycle with `state` and return its report.
    pub async fn run_once(&self, state: DirectionalState) -> AppResult<CycleReport> {
        let report = self
            .scheduler
            .trigger_cycle(&self.config.market.symbol, state)
            .await?;
        Ok(report)
    }

    /// Run the configured trigger loop until Ctrl-C.
    pub async fn run(self) -> AppResult<()> {
        info!(
            symbol = %self.config.market.symbol,
            trigger_mode = %self.config.scheduler.trigger_mode,
            exchange = %self.config.scheduler.exchange_name,
            "Starting application"
        );
        self.scheduler.start()?;

        tokio::signal::ctrl_c().await?;
        info!("Shutdown signal received");

        self.scheduler.stop().await;
        let (state, notes) = self.scheduler.current_state();
        info!(
            %state,
            notes = notes.as_deref().unwrap_or("-"),
            open_orders = self.exchange.active_orders().len(),
            pending_exits = self.exchange.pending_orders().len(),
            "Shutting down"
        );

        if self.config.telemetry.dump_metrics {
            println!("{}", Metrics::render()?);
        }
        Ok(())
    }
}
