//! In-memory collaborators: paper exchange, channel evaluation feed and a
//! logging notifier.
//!
//! The paper exchange keeps balances and orders and fills only on request
//! through [`PaperExchange::fill`]. Chained exits wait as `Pending` until
//! their entry fills, and one-cancels-the-other groups are enforced on every
//! fill and cancel.

use dca_core::{ClientOrderId, OpenOrder, OrderSide, OrderStatus, Price, SymbolMarket};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};
use crate::ports::{
    BoxFuture, CreationRequest, EvaluationSource, Notification, Notifier, OrderGateway, Portfolio,
    PriceFeed, SubmitError, SubmittedOrder,
};
use crate::trigger::{ActivationTopic, EvaluationUpdate};

/// Paper exchange starting state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaperConfig {
    /// Base asset balance (e.g. BTC).
    #[serde(default)]
    pub base_balance: Decimal,
    /// Quote asset balance (e.g. USDT).
    #[serde(default)]
    pub quote_balance: Decimal,
    pub initial_price: Price,
    #[serde(default)]
    pub is_futures: bool,
    #[serde(default)]
    pub backtesting: bool,
}

#[derive(Debug)]
struct PaperState {
    price: Price,
    base_balance: Decimal,
    quote_balance: Decimal,
    orders: Vec<OpenOrder>,
    requests: Vec<CreationRequest>,
}

impl PaperState {
    fn is_entry(&self, cloid: &ClientOrderId) -> bool {
        self.requests.iter().any(|r| &r.entry.cloid == cloid)
    }

    fn exits_of(&self, entry: &ClientOrderId) -> Vec<ClientOrderId> {
        self.requests
            .iter()
            .find(|r| &r.entry.cloid == entry)
            .map(|r| r.exits.iter().map(|e| e.cloid.clone()).collect())
            .unwrap_or_default()
    }

    fn siblings_of(&self, cloid: &ClientOrderId) -> Vec<ClientOrderId> {
        self.requests
            .iter()
            .flat_map(|r| r.groups.iter())
            .find(|g| g.contains(cloid))
            .map(|g| g.siblings_to_cancel(cloid))
            .unwrap_or_default()
    }

    /// Move a live order to `status`. False when it is not live.
    fn transition(&mut self, cloid: &ClientOrderId, status: OrderStatus) -> bool {
        match self.orders.iter_mut().find(|o| &o.cloid == cloid && o.is_live()) {
            Some(order) => {
                order.status = status;
                true
            }
            None => false,
        }
    }

    /// Cancel what depends on `done`: the chained exits of an entry, or the
    /// other members of an exit's group.
    fn cancel_dependents(&mut self, done: &ClientOrderId) -> Vec<ClientOrderId> {
        let dependents = if self.is_entry(done) {
            self.exits_of(done)
        } else {
            self.siblings_of(done)
        };
        let mut cancelled = Vec::new();
        for cloid in dependents {
            if self.transition(&cloid, OrderStatus::Cancelled) {
                cancelled.push(cloid);
            }
        }
        cancelled
    }

    /// Put an entry's pending exits on the book.
    fn release_exits(&mut self, entry: &ClientOrderId) -> usize {
        let exits = self.exits_of(entry);
        let mut released = 0;
        for order in self.orders.iter_mut() {
            if order.is_pending() && exits.contains(&order.cloid) {
                order.status = OrderStatus::Open;
                released += 1;
            }
        }
        released
    }

    /// Spot balances after `order` executes at its own price.
    fn settle(&mut self, order: &OpenOrder) {
        let notional = order.quantity.notional(order.price);
        match order.side {
            OrderSide::Buy => {
                self.quote_balance -= notional;
                self.base_balance += order.quantity.inner();
            }
            OrderSide::Sell => {
                self.quote_balance += notional;
                self.base_balance -= order.quantity.inner();
            }
        }
    }
}

/// Paper exchange for one market.
#[derive(Debug)]
pub struct PaperExchange {
    market: SymbolMarket,
    is_futures: bool,
    backtesting: bool,
    state: Mutex<PaperState>,
}

impl PaperExchange {
    pub fn new(market: SymbolMarket, config: &PaperConfig) -> Self {
        Self {
            market,
            is_futures: config.is_futures,
            backtesting: config.backtesting,
            state: Mutex::new(PaperState {
                price: config.initial_price,
                base_balance: config.base_balance,
                quote_balance: config.quote_balance,
                orders: Vec::new(),
                requests: Vec::new(),
            }),
        }
    }

    pub fn set_price(&self, price: Price) {
        self.state.lock().price = price;
    }

    /// All orders ever accepted, including cancelled ones.
    pub fn orders(&self) -> Vec<OpenOrder> {
        self.state.lock().orders.clone()
    }

    pub fn active_orders(&self) -> Vec<OpenOrder> {
        self.state
            .lock()
            .orders
            .iter()
            .filter(|o| o.is_active())
            .cloned()
            .collect()
    }

    /// Chained exits waiting for their entry to fill.
    pub fn pending_orders(&self) -> Vec<OpenOrder> {
        self.state
            .lock()
            .orders
            .iter()
            .filter(|o| o.is_pending())
            .cloned()
            .collect()
    }

    /// Fill an active order at its own price.
    ///
    /// An entry fill releases its chained exits onto the book. An exit fill
    /// cancels the rest of its group. Returns the orders cancelled as a
    /// consequence. Futures fills leave balances untouched.
    pub fn fill(&self, cloid: &ClientOrderId) -> EngineResult<Vec<ClientOrderId>> {
        let mut state = self.state.lock();
        let Some(order) = state
            .orders
            .iter_mut()
            .find(|o| &o.cloid == cloid && o.is_active())
        else {
            return Err(EngineError::Collaborator(format!("order {cloid} is not open")));
        };
        order.status = OrderStatus::Closed;
        let filled = order.clone();
        if !self.is_futures {
            state.settle(&filled);
        }

        if state.is_entry(cloid) {
            let released = state.release_exits(cloid);
            info!(
                order = %cloid,
                quantity = %filled.quantity,
                price = %filled.price,
                released,
                "Paper entry filled"
            );
            return Ok(Vec::new());
        }

        let cancelled = state.cancel_dependents(cloid);
        info!(
            order = %cloid,
            quantity = %filled.quantity,
            price = %filled.price,
            cancelled = cancelled.len(),
            "Paper exit filled"
        );
        Ok(cancelled)
    }

    /// Creation requests accepted so far, in submission order.
    pub fn requests(&self) -> Vec<CreationRequest> {
        self.state.lock().requests.clone()
    }

    /// Free funds for `side`, after what open entry orders lock.
    fn free_funds(&self, state: &PaperState, side: OrderSide) -> Decimal {
        let entries = state
            .orders
            .iter()
            .filter(|o| o.is_active() && o.side == side && state.is_entry(&o.cloid));
        if self.is_futures {
            let max_size = if state.price.is_positive() {
                state.quote_balance / state.price.inner()
            } else {
                Decimal::ZERO
            };
            return max_size - entries.map(|o| o.quantity.inner()).sum::<Decimal>();
        }
        match side {
            OrderSide::Buy => {
                state.quote_balance - entries.map(|o| o.quantity.notional(o.price)).sum::<Decimal>()
            }
            OrderSide::Sell => {
                state.base_balance - entries.map(|o| o.quantity.inner()).sum::<Decimal>()
            }
        }
    }

    fn accept(&self, request: CreationRequest) -> Result<SubmittedOrder, SubmitError> {
        let mut state = self.state.lock();
        let entry = &request.entry;
        if entry.symbol != self.market.symbol {
            return Err(SubmitError::CreationError(format!(
                "unknown symbol {}",
                entry.symbol
            )));
        }
        if !entry.quantity.is_positive() || !entry.price.is_positive() {
            return Err(SubmitError::CreationError(format!(
                "invalid entry {} @ {}",
                entry.quantity, entry.price
            )));
        }
        if !self.market.meets_minimums(entry.quantity, entry.price) {
            return Err(SubmitError::MissingMinimalVolume(format!(
                "{} @ {} below minimums",
                entry.quantity, entry.price
            )));
        }
        let cost = if self.is_futures || entry.side == OrderSide::Sell {
            entry.quantity.inner()
        } else {
            entry.quantity.notional(entry.price)
        };
        let free = self.free_funds(&state, entry.side);
        if cost > free {
            return Err(SubmitError::MissingFunds(format!("cost {cost} > free {free}")));
        }

        let submitted = SubmittedOrder {
            entry: OpenOrder::from_spec(entry),
            exits: request
                .exits
                .iter()
                .map(|spec| OpenOrder {
                    status: OrderStatus::Pending,
                    ..OpenOrder::from_spec(spec)
                })
                .collect(),
        };
        state.orders.push(submitted.entry.clone());
        state.orders.extend(submitted.exits.iter().cloned());
        debug!(
            entry = %entry.cloid,
            side = %entry.side,
            quantity = %entry.quantity,
            price = %entry.price,
            exits = submitted.exits.len(),
            "Paper order accepted"
        );
        state.requests.push(request);
        Ok(submitted)
    }
}

impl Portfolio for PaperExchange {
    fn available_funds<'a>(
        &'a self,
        market: &'a SymbolMarket,
        side: OrderSide,
    ) -> BoxFuture<'a, EngineResult<Decimal>> {
        Box::pin(async move {
            if market.symbol != self.market.symbol {
                return Err(EngineError::UnknownSymbol(market.symbol.clone()));
            }
            let state = self.state.lock();
            Ok(self.free_funds(&state, side).max(Decimal::ZERO))
        })
    }

    fn is_futures(&self) -> bool {
        self.is_futures
    }

    fn is_backtesting(&self) -> bool {
        self.backtesting
    }
}

impl PriceFeed for PaperExchange {
    fn current_price<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, EngineResult<Price>> {
        Box::pin(async move {
            if symbol != self.market.symbol {
                return Err(EngineError::UnknownSymbol(symbol.to_string()));
            }
            Ok(self.state.lock().price)
        })
    }
}

impl OrderGateway for PaperExchange {
    fn submit(
        &self,
        request: CreationRequest,
    ) -> BoxFuture<'_, Result<SubmittedOrder, SubmitError>> {
        Box::pin(async move { self.accept(request) })
    }

    fn open_orders<'a>(
        &'a self,
        symbol: &'a str,
        side: OrderSide,
    ) -> BoxFuture<'a, EngineResult<Vec<OpenOrder>>> {
        Box::pin(async move {
            Ok(self
                .state
                .lock()
                .orders
                .iter()
                .filter(|o| o.symbol == symbol && o.side == side && o.is_active())
                .cloned()
                .collect())
        })
    }

    fn cancel(&self, order: OpenOrder) -> BoxFuture<'_, EngineResult<()>> {
        Box::pin(async move {
            let mut state = self.state.lock();
            if !state.transition(&order.cloid, OrderStatus::Cancelled) {
                return Err(EngineError::Collaborator(format!(
                    "order {} is not open",
                    order.cloid
                )));
            }
            let dependents = state.cancel_dependents(&order.cloid);
            debug!(
                order = %order.cloid,
                dependents = dependents.len(),
                "Paper order cancelled"
            );
            Ok(())
        })
    }
}

/// Evaluation source backed by an mpsc channel. Single subscriber.
#[derive(Debug)]
pub struct ChannelEvaluationFeed {
    receiver: Mutex<Option<mpsc::Receiver<EvaluationUpdate>>>,
}

impl ChannelEvaluationFeed {
    /// Feed plus the sender used to publish updates into it.
    pub fn new(capacity: usize) -> (Self, mpsc::Sender<EvaluationUpdate>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                receiver: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

impl EvaluationSource for ChannelEvaluationFeed {
    fn subscribe<'a>(
        &'a self,
        symbol: &'a str,
        cryptocurrency: &'a str,
        topic: ActivationTopic,
    ) -> BoxFuture<'a, EngineResult<mpsc::Receiver<EvaluationUpdate>>> {
        Box::pin(async move {
            let receiver = self.receiver.lock().take();
            receiver
                .inspect(|_| debug!(%symbol, %cryptocurrency, %topic, "Evaluation feed subscribed"))
                .ok_or_else(|| EngineError::Collaborator("evaluation feed already subscribed".to_string()))
        })
    }
}

/// Notifier that writes alerts to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) -> BoxFuture<'_, EngineResult<()>> {
        Box::pin(async move {
            info!(
                title = %notification.title,
                body = %notification.body,
                category = ?notification.category,
                "Notification"
            );
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dca_core::{OrderSpec, OrderType, Size};
    use rust_decimal_macros::dec;

    fn exchange(quote: Decimal) -> PaperExchange {
        let market = SymbolMarket::new("BTC/USDT", Price::new(dec!(0.1)), Size::new(dec!(0.0001)))
            .unwrap()
            .with_minimums(Size::new(dec!(0.0001)), dec!(10));
        PaperExchange::new(
            market,
            &PaperConfig {
                base_balance: dec!(0),
                quote_balance: quote,
                initial_price: Price::new(dec!(30000)),
                is_futures: false,
                backtesting: false,
            },
        )
    }

    fn request(qty: Decimal, price: Decimal) -> CreationRequest {
        CreationRequest {
            entry: OrderSpec::entry(
                "BTC/USDT",
                OrderSide::Buy,
                OrderType::Limit,
                Size::new(qty),
                Price::new(price),
                1,
            )
            .unwrap(),
            exits: Vec::new(),
            groups: Vec::new(),
            bundle_exits: true,
        }
    }

    #[tokio::test]
    async fn test_submit_locks_funds() {
        let ex = exchange(dec!(1000));
        let market = ex.market.clone();
        ex.submit(request(dec!(0.01), dec!(28500))).await.unwrap();

        let free = ex.available_funds(&market, OrderSide::Buy).await.unwrap();
        assert_eq!(free, dec!(715));
        assert_eq!(ex.open_orders("BTC/USDT", OrderSide::Buy).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_rejections() {
        let ex = exchange(dec!(100));
        assert!(matches!(
            ex.submit(request(dec!(0.01), dec!(28500))).await,
            Err(SubmitError::MissingFunds(_))
        ));
        assert!(matches!(
            ex.submit(request(dec!(0.0002), dec!(28500))).await,
            Err(SubmitError::MissingMinimalVolume(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_releases_funds() {
        let ex = exchange(dec!(1000));
        let market = ex.market.clone();
        let accepted = ex.submit(request(dec!(0.01), dec!(28500))).await.unwrap();
        ex.cancel(accepted.entry.clone()).await.unwrap();

        assert_eq!(
            ex.available_funds(&market, OrderSide::Buy).await.unwrap(),
            dec!(1000)
        );
        assert!(ex.cancel(accepted.entry).await.is_err());
    }

    #[tokio::test]
    async fn test_channel_feed_single_subscriber() {
        let (feed, tx) = ChannelEvaluationFeed::new(4);
        let mut rx = feed
            .subscribe("BTC/USDT", "Bitcoin", ActivationTopic::EvaluationCycle)
            .await
            .unwrap();
        tx.send(EvaluationUpdate::new([Some(dec!(-1))])).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().valid_notes(), vec![dec!(-1)]);
        assert!(feed
            .subscribe("BTC/USDT", "Bitcoin", ActivationTopic::EvaluationCycle)
            .await
            .is_err());
    }
}
