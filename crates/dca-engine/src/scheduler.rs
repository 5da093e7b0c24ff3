//! Trigger scheduler: decides when a cycle runs and with what state.
//!
//! # Lifecycle
//!
//! ```text
//! Stopped --start()--> Running --stop()--> Stopped (terminal)
//!
//! Running loop:
//!   Waiting → Evaluating → EntryBuild → ExitBuild → Submitting → Waiting
//! ```
//!
//! Cycles never overlap: the timer loop, the signal loop and manual
//! [`TriggerScheduler::trigger_cycle`] calls all take the same async mutex.
//! Shutdown is only observed between cycles, so a cycle that has started
//! always submits what it built.

use chrono::Utc;
use dca_core::{DirectionalState, OrderSide};
use dca_ladder::{
    AmountResolver, EntryLadderBuilder, EntryOutcome, EntryRequest, ExitChainBuilder,
    PrecisionAdapter,
};
use dca_telemetry::Metrics;
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::EngineSettings;
use crate::cycle::{
    CycleOutcome, CyclePhase, CycleReport, ExitSignalAction, RejectedEntry, SchedulerStatus,
};
use crate::error::{EngineError, EngineResult};
use crate::ports::{
    CreationRequest, EvaluationSource, Notification, Notifier, OrderGateway, Portfolio, PriceFeed,
};
use crate::trigger::{notes_summary, unanimity, ActivationTopic, EvaluationUpdate, TriggerMode};

/// Collaborators wired into a scheduler.
#[derive(Clone)]
pub struct SchedulerDeps {
    pub portfolio: Arc<dyn Portfolio>,
    pub prices: Arc<dyn PriceFeed>,
    pub gateway: Arc<dyn OrderGateway>,
    pub evaluations: Arc<dyn EvaluationSource>,
    pub notifier: Arc<dyn Notifier>,
    pub precision: Arc<dyn PrecisionAdapter>,
    pub amounts: Arc<dyn AmountResolver>,
}

struct Inner {
    settings: EngineSettings,
    deps: SchedulerDeps,
    /// Held for the whole cycle: one cycle in flight at a time.
    cycle_lock: AsyncMutex<()>,
    shutdown: CancellationToken,
    terminated: AtomicBool,
    status: RwLock<SchedulerStatus>,
    phase: RwLock<CyclePhase>,
    last_state: RwLock<Option<DirectionalState>>,
    last_notes: RwLock<Option<Vec<Decimal>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// DCA trigger scheduler. Cheap to clone; clones share one scheduler.
#[derive(Clone)]
pub struct TriggerScheduler {
    inner: Arc<Inner>,
}

impl TriggerScheduler {
    pub fn new(settings: EngineSettings, deps: SchedulerDeps) -> EngineResult<Self> {
        settings.validate()?;
        Ok(Self {
            inner: Arc::new(Inner {
                settings,
                deps,
                cycle_lock: AsyncMutex::new(()),
                shutdown: CancellationToken::new(),
                terminated: AtomicBool::new(false),
                status: RwLock::new(SchedulerStatus::Stopped),
                phase: RwLock::new(CyclePhase::Waiting),
                last_state: RwLock::new(None),
                last_notes: RwLock::new(None),
                task: Mutex::new(None),
            }),
        })
    }

    /// Start the trigger loop for the configured mode.
    ///
    /// Configuration problems (time-based trigger while backtesting, unknown
    /// activation topic) are logged and returned; the scheduler stays stopped.
    pub fn start(&self) -> EngineResult<()> {
        let inner = &self.inner;
        if inner.terminated.load(Ordering::SeqCst) {
            return Err(EngineError::Terminated);
        }
        let mut task = inner.task.lock();
        if *inner.status.read() == SchedulerStatus::Running {
            return Err(EngineError::AlreadyRunning);
        }

        let scheduler = &inner.settings.scheduler;
        let topic = match scheduler.trigger_mode {
            TriggerMode::TimeBased => {
                if inner.deps.portfolio.is_backtesting() {
                    error!(
                        trigger_mode = %scheduler.trigger_mode,
                        "Time based trigger does not support backtesting, configure another trigger mode"
                    );
                    return Err(EngineError::UnsupportedTriggerMode(format!(
                        "{} in backtesting",
                        scheduler.trigger_mode
                    )));
                }
                None
            }
            TriggerMode::SignalBased => match scheduler.activation_topic.parse::<ActivationTopic>() {
                Ok(topic) => Some(topic),
                Err(e) => {
                    error!(topic = %scheduler.activation_topic, "Unknown registration topic");
                    return Err(e);
                }
            },
        };

        // Set before spawning: the loop may stop itself right away.
        *inner.status.write() = SchedulerStatus::Running;
        Metrics::scheduler_running(true);
        let handle = match topic {
            None => tokio::spawn(Arc::clone(inner).run_time_based()),
            Some(topic) => tokio::spawn(Arc::clone(inner).run_signal_based(topic)),
        };
        *task = Some(handle);
        info!(
            symbol = %inner.settings.market.symbol,
            trigger_mode = %scheduler.trigger_mode,
            "DCA scheduler started"
        );
        Ok(())
    }

    /// Stop accepting cycles and wait for the loop to finish.
    ///
    /// A cycle already running completes. Calling this again is a no-op.
    pub async fn stop(&self) {
        let inner = &self.inner;
        inner.terminated.store(true, Ordering::SeqCst);
        inner.shutdown.cancel();
        let handle = inner.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Scheduler task ended abnormally");
            }
        }
        inner.mark_stopped();
    }

    /// Run one cycle now with `state`, outside the trigger loop.
    pub async fn trigger_cycle(
        &self,
        symbol: &str,
        state: DirectionalState,
    ) -> EngineResult<CycleReport> {
        if self.inner.terminated.load(Ordering::SeqCst) {
            return Err(EngineError::Terminated);
        }
        if symbol != self.inner.settings.market.symbol {
            return Err(EngineError::UnknownSymbol(symbol.to_string()));
        }
        Ok(self.inner.run_cycle(state).await)
    }

    /// Last state name and the notes that produced it (`"-1,-1"`).
    pub fn current_state(&self) -> (String, Option<String>) {
        let state = (*self.inner.last_state.read()).unwrap_or_default();
        let notes = self.inner.last_notes.read().as_deref().map(notes_summary);
        (state.name().to_string(), notes)
    }

    pub fn status(&self) -> SchedulerStatus {
        *self.inner.status.read()
    }

    pub fn phase(&self) -> CyclePhase {
        *self.inner.phase.read()
    }
}

impl Inner {
    fn set_phase(&self, phase: CyclePhase) {
        *self.phase.write() = phase;
    }

    fn mark_stopped(&self) {
        *self.status.write() = SchedulerStatus::Stopped;
        self.set_phase(CyclePhase::Waiting);
        Metrics::scheduler_running(false);
    }

    /// Buy now, then every interval, until shutdown.
    async fn run_time_based(self: Arc<Self>) {
        let interval = self.settings.scheduler.interval();
        loop {
            if self.shutdown.is_cancelled() {
                break;
            }
            self.run_cycle(DirectionalState::VeryLong).await;

            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => break,
                () = tokio::time::sleep(interval) => {}
            }
        }
        info!("Time based DCA loop stopped");
        self.mark_stopped();
    }

    async fn run_signal_based(self: Arc<Self>, topic: ActivationTopic) {
        let settings = &self.settings;
        let subscription = self.deps.evaluations.subscribe(
            &settings.market.symbol,
            &settings.scheduler.cryptocurrency,
            topic,
        );
        let mut updates = tokio::select! {
            biased;
            () = self.shutdown.cancelled() => {
                self.mark_stopped();
                return;
            }
            result = subscription => match result {
                Ok(updates) => updates,
                Err(e) => {
                    error!(error = %e, %topic, "Failed to subscribe to evaluations");
                    self.mark_stopped();
                    return;
                }
            },
        };
        debug!(%topic, "Subscribed to evaluations");

        loop {
            let update = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => break,
                update = updates.recv() => match update {
                    Some(update) => update,
                    None => {
                        info!("Evaluation feed closed");
                        break;
                    }
                },
            };
            self.handle_evaluation(update).await;
        }
        info!("Signal based DCA loop stopped");
        self.mark_stopped();
    }

    async fn handle_evaluation(&self, update: EvaluationUpdate) {
        let notes = update.valid_notes();
        if notes.is_empty() {
            debug!("Evaluation update without valid notes ignored");
            return;
        }
        let state = unanimity(&notes);
        *self.last_notes.write() = Some(notes);
        self.run_cycle(state).await;
    }

    async fn run_cycle(&self, state: DirectionalState) -> CycleReport {
        let _cycle = self.cycle_lock.lock().await;
        let started = Instant::now();
        let symbol = self.settings.market.symbol.as_str();
        *self.last_state.write() = Some(state);
        self.set_phase(CyclePhase::Evaluating);
        debug!(%symbol, %state, exchange = %self.settings.scheduler.exchange_name, "DCA triggered");

        let mut report = CycleReport::new(symbol, state, Utc::now());
        if let Some(side) = state.entry_side() {
            if let Err(e) = self.process_entries(side, &mut report).await {
                error!(%symbol, %state, error = %e, "DCA cycle failed");
                report.outcome = CycleOutcome::Failed(e.to_string());
            }
            report.exit_action = self.process_exits(state);
        }
        self.set_phase(CyclePhase::Waiting);

        Metrics::cycle_completed(
            report.outcome.label(),
            started.elapsed().as_secs_f64() * 1000.0,
        );
        info!(
            %symbol,
            %state,
            outcome = report.outcome.label(),
            entries = report.entries.len(),
            submitted = report.submitted.len(),
            cancelled = report.cancelled.len(),
            "DCA cycle complete"
        );
        report
    }

    async fn process_entries(&self, side: OrderSide, report: &mut CycleReport) -> EngineResult<()> {
        if side == OrderSide::Sell {
            debug!(state = %report.state, "SELL entry side not supported for now, state ignored");
            report.outcome = CycleOutcome::EntriesSuppressed;
            return Ok(());
        }

        self.build_and_submit(side, report).await?;

        if self.deps.portfolio.is_backtesting() {
            return Ok(());
        }
        let notification = Notification::entry_trigger(
            &self.settings.market.symbol,
            side,
            &self.settings.scheduler.exchange_name,
        );
        match self.deps.notifier.notify(notification).await {
            Ok(()) => report.notified = true,
            Err(e) => {
                warn!(error = %e, "Impossible to send notification");
                Metrics::notification_failed();
            }
        }
        Ok(())
    }

    /// Signal-based exits: deferred, nothing is done.
    fn process_exits(&self, state: DirectionalState) -> ExitSignalAction {
        debug!(%state, "Signal based exits are not implemented");
        ExitSignalAction::Deferred
    }

    async fn build_and_submit(&self, side: OrderSide, report: &mut CycleReport) -> EngineResult<()> {
        let EngineSettings {
            market,
            ladder,
            exits,
            ..
        } = &self.settings;
        let deps = &self.deps;

        self.set_phase(CyclePhase::EntryBuild);
        let quote = deps.prices.current_price(&market.symbol).await?;
        let available_funds = deps.portfolio.available_funds(market, side).await?;
        let open_orders = if ladder.cancel_open_orders_at_each_entry {
            deps.gateway.open_orders(&market.symbol, side).await?
        } else {
            Vec::new()
        };

        let outcome = EntryLadderBuilder::new(
            ladder,
            market,
            deps.precision.as_ref(),
            deps.amounts.as_ref(),
        )
        .build(&EntryRequest {
            state: report.state,
            quote,
            available_funds,
            is_futures: deps.portfolio.is_futures(),
            open_orders: &open_orders,
        });
        let EntryOutcome::Built(entry_ladder) = outcome else {
            report.outcome = CycleOutcome::from_entry_outcome(&outcome);
            return Ok(());
        };
        for _ in &entry_ladder.entries {
            Metrics::entry_built(side.as_label());
        }
        Metrics::secondary_skipped(entry_ladder.skipped_tiers.len());
        report.entries = entry_ladder.entries.clone();
        report.skipped_tiers = entry_ladder.skipped_tiers.clone();

        self.set_phase(CyclePhase::ExitBuild);
        let exit_builder = ExitChainBuilder::new(exits, market, deps.precision.as_ref());
        let requests: Vec<CreationRequest> = entry_ladder
            .entries
            .iter()
            .map(|entry| {
                let chain = exit_builder.build(entry, entry.price);
                for leg in &chain.exits {
                    Metrics::exit_leg_built(leg.role.as_label());
                }
                CreationRequest {
                    entry: entry.clone(),
                    exits: chain.exits,
                    groups: chain.groups,
                    bundle_exits: chain.bundle_with_entry,
                }
            })
            .collect();

        self.set_phase(CyclePhase::Submitting);
        for request in requests {
            let entry_id = request.entry.cloid.clone();
            report.exits.extend(request.exits.iter().cloned());
            report.groups.extend(request.groups.iter().cloned());
            match deps.gateway.submit(request).await {
                Ok(_) => {
                    Metrics::entry_submitted(side.as_label());
                    report.submitted.push(entry_id);
                }
                Err(e) => {
                    Metrics::submit_failed(e.reason());
                    match CycleOutcome::from_submit_error(&e) {
                        CycleOutcome::CreationFailed => {
                            error!(entry = %entry_id, error = %e, "Failed to create order")
                        }
                        _ => debug!(entry = %entry_id, error = %e, "Order not created"),
                    }
                    report.rejected.push(RejectedEntry {
                        entry: entry_id,
                        error: e,
                    });
                }
            }
        }

        if report.submitted.is_empty() {
            report.outcome = report
                .rejected
                .first()
                .map(|r| CycleOutcome::from_submit_error(&r.error))
                .unwrap_or(CycleOutcome::CreationFailed);
            return Ok(());
        }
        report.outcome = CycleOutcome::Created;

        // Previous cycle's orders go only once new ones exist.
        for order in entry_ladder.stale_orders {
            let cloid = order.cloid.clone();
            match deps.gateway.cancel(order).await {
                Ok(()) => {
                    Metrics::stale_cancelled();
                    report.cancelled.push(cloid);
                }
                Err(e) => warn!(order = %cloid, error = %e, "Failed to cancel previous order"),
            }
        }
        Ok(())
    }
}
