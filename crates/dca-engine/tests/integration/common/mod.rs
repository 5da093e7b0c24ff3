//! Shared fixtures for scheduler tests.

pub mod mocks;

use dca_core::{Price, Size, SymbolMarket};
use dca_engine::{
    ChannelEvaluationFeed, EngineSettings, EvaluationSource, EvaluationUpdate, Notifier,
    OrderGateway, PaperConfig, PaperExchange, SchedulerConfig, SchedulerDeps, TriggerScheduler,
};
use dca_ladder::{
    AmountDescriptor, BalanceAmountResolver, ExchangePrecision, ExitConfig, LadderConfig,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use mocks::RecordingNotifier;

pub const SYMBOL: &str = "BTC/USDT";

pub fn btc_market() -> SymbolMarket {
    SymbolMarket::new(SYMBOL, Price::new(dec!(0.01)), Size::new(dec!(0.0001)))
        .unwrap()
        .with_minimums(Size::new(dec!(0.0001)), dec!(10))
}

/// Single 0.01 BTC limit entry, 5% under the quote.
pub fn buy_ladder() -> LadderConfig {
    LadderConfig {
        entry_offset: dec!(0.05),
        entry_amount: Some(AmountDescriptor::Fixed(Size::new(dec!(0.01)))),
        ..LadderConfig::default()
    }
}

pub fn settings(ladder: LadderConfig, exits: ExitConfig, scheduler: SchedulerConfig) -> EngineSettings {
    EngineSettings {
        market: btc_market(),
        ladder,
        exits,
        scheduler,
    }
}

/// Paper exchange quoting 30000 with `quote_balance` USDT.
pub fn paper(quote_balance: Decimal, backtesting: bool) -> Arc<PaperExchange> {
    Arc::new(PaperExchange::new(
        btc_market(),
        &PaperConfig {
            base_balance: Decimal::ZERO,
            quote_balance,
            initial_price: Price::new(dec!(30000)),
            is_futures: false,
            backtesting,
        },
    ))
}

pub fn deps(
    exchange: Arc<PaperExchange>,
    gateway: Arc<dyn OrderGateway>,
    evaluations: Arc<dyn EvaluationSource>,
    notifier: Arc<dyn Notifier>,
) -> SchedulerDeps {
    SchedulerDeps {
        portfolio: exchange.clone(),
        prices: exchange,
        gateway,
        evaluations,
        notifier,
        precision: Arc::new(ExchangePrecision),
        amounts: Arc::new(BalanceAmountResolver),
    }
}

/// Scheduler wired to one paper exchange, a channel feed and a recording
/// notifier.
pub struct Harness {
    pub scheduler: TriggerScheduler,
    pub exchange: Arc<PaperExchange>,
    pub notifier: Arc<RecordingNotifier>,
    pub updates: mpsc::Sender<EvaluationUpdate>,
}

impl Harness {
    pub fn new(settings: EngineSettings, exchange: Arc<PaperExchange>) -> Self {
        let (feed, updates) = ChannelEvaluationFeed::new(16);
        let notifier = Arc::new(RecordingNotifier::default());
        let scheduler = TriggerScheduler::new(
            settings,
            deps(exchange.clone(), exchange.clone(), Arc::new(feed), notifier.clone()),
        )
        .unwrap();
        Self {
            scheduler,
            exchange,
            notifier,
            updates,
        }
    }
}

/// Poll `check` every 10ms until it holds or two seconds pass.
pub async fn wait_until(mut check: impl FnMut() -> bool) -> bool {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .is_ok()
}
