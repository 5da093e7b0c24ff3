//! Collaborator ports consumed by the scheduler.
//!
//! Trait objects with boxed futures so that exchanges, feeds and notifiers
//! can be swapped for in-memory implementations in tests.

use dca_core::{OpenOrder, OrderGroup, OrderSide, OrderSpec, Price, SymbolMarket};
use rust_decimal::Decimal;
use serde::Serialize;
use std::pin::Pin;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::error::EngineResult;
use crate::trigger::{ActivationTopic, EvaluationUpdate};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Balance and market-type queries.
pub trait Portfolio: Send + Sync {
    /// Funds usable for an entry on `side`: quote asset for spot BUY, base
    /// quantity for SELL and futures.
    fn available_funds<'a>(
        &'a self,
        market: &'a SymbolMarket,
        side: OrderSide,
    ) -> BoxFuture<'a, EngineResult<Decimal>>;

    fn is_futures(&self) -> bool;

    /// Running against historical data.
    fn is_backtesting(&self) -> bool {
        false
    }
}

/// Current reference price for a symbol.
pub trait PriceFeed: Send + Sync {
    fn current_price<'a>(&'a self, symbol: &'a str) -> BoxFuture<'a, EngineResult<Price>>;
}

/// An entry with its chained exits, submitted as one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreationRequest {
    pub entry: OrderSpec,
    pub exits: Vec<OrderSpec>,
    pub groups: Vec<OrderGroup>,
    /// Exits may be sent in the same exchange request as the entry.
    pub bundle_exits: bool,
}

/// Orders the gateway accepted for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedOrder {
    pub entry: OpenOrder,
    pub exits: Vec<OpenOrder>,
}

/// Why the gateway refused a creation request.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitError {
    #[error("Missing funds: {0}")]
    MissingFunds(String),

    #[error("Missing minimal exchange trade volume: {0}")]
    MissingMinimalVolume(String),

    #[error("Order creation error: {0}")]
    CreationError(String),
}

impl SubmitError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingFunds(_) => "missing_funds",
            Self::MissingMinimalVolume(_) => "missing_minimal_volume",
            Self::CreationError(_) => "creation_error",
        }
    }
}

/// Order submission, open-orders query and cancellation.
pub trait OrderGateway: Send + Sync {
    fn submit(&self, request: CreationRequest) -> BoxFuture<'_, Result<SubmittedOrder, SubmitError>>;

    /// Active orders on `symbol` and `side`.
    fn open_orders<'a>(
        &'a self,
        symbol: &'a str,
        side: OrderSide,
    ) -> BoxFuture<'a, EngineResult<Vec<OpenOrder>>>;

    fn cancel(&self, order: OpenOrder) -> BoxFuture<'_, EngineResult<()>>;
}

/// Source of evaluation aggregate updates.
pub trait EvaluationSource: Send + Sync {
    fn subscribe<'a>(
        &'a self,
        symbol: &'a str,
        cryptocurrency: &'a str,
        topic: ActivationTopic,
    ) -> BoxFuture<'a, EngineResult<mpsc::Receiver<EvaluationUpdate>>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    PriceAlerts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub category: NotificationCategory,
}

impl Notification {
    /// Alert sent after an entry cycle: `DCA entry trigger for : #ETH/USDT`.
    pub fn entry_trigger(symbol: &str, side: OrderSide, exchange: &str) -> Self {
        let action = match side {
            OrderSide::Buy => "BUYING",
            OrderSide::Sell => "SELLING",
        };
        Self {
            title: format!("DCA entry trigger for : #{symbol}"),
            body: format!("{action} on {exchange}"),
            category: NotificationCategory::PriceAlerts,
        }
    }
}

/// Best-effort notification sink.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification) -> BoxFuture<'_, EngineResult<()>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_notification_text() {
        let n = Notification::entry_trigger("BTC/USDT", OrderSide::Buy, "binance");
        assert_eq!(n.title, "DCA entry trigger for : #BTC/USDT");
        assert_eq!(n.body, "BUYING on binance");
        assert_eq!(n.category, NotificationCategory::PriceAlerts);
    }

    #[test]
    fn test_submit_error_reason() {
        assert_eq!(
            SubmitError::MissingFunds("x".into()).reason(),
            "missing_funds"
        );
        assert_eq!(
            SubmitError::CreationError("x".into()).reason(),
            "creation_error"
        );
    }
}
