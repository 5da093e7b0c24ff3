//! Traded symbol and its exchange precision rules.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};
use crate::{Price, Size};

/// Market rules for one symbol (`BASE/QUOTE`).
///
/// Tick and lot sizes drive price/quantity flooring; the minimums decide
/// whether an order can exist at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolMarket {
    /// Symbol, e.g. `BTC/USDT`.
    pub symbol: String,
    /// Minimum price increment.
    pub tick_size: Price,
    /// Minimum quantity increment.
    pub lot_size: Size,
    /// Minimum order quantity.
    #[serde(default)]
    pub min_quantity: Size,
    /// Minimum order value in the quote asset.
    #[serde(default)]
    pub min_notional: Decimal,
    /// Largest quantity accepted in one order.
    #[serde(default)]
    pub max_quantity: Option<Size>,
}

impl SymbolMarket {
    /// Create a market with no minimums and no maximum.
    pub fn new(symbol: &str, tick_size: Price, lot_size: Size) -> Result<Self> {
        let market = Self {
            symbol: symbol.to_string(),
            tick_size,
            lot_size,
            min_quantity: Size::ZERO,
            min_notional: Decimal::ZERO,
            max_quantity: None,
        };
        market.validate()?;
        Ok(market)
    }

    #[must_use]
    pub fn with_minimums(mut self, min_quantity: Size, min_notional: Decimal) -> Self {
        self.min_quantity = min_quantity;
        self.min_notional = min_notional;
        self
    }

    #[must_use]
    pub fn with_max_quantity(mut self, max_quantity: Size) -> Self {
        self.max_quantity = Some(max_quantity);
        self
    }

    /// Check that the symbol parses and the increments are sane.
    pub fn validate(&self) -> Result<()> {
        self.split_symbol()?;
        if self.tick_size.inner().is_sign_negative() {
            return Err(CoreError::InvalidMarket(format!(
                "negative tick size {}",
                self.tick_size
            )));
        }
        if self.lot_size.inner().is_sign_negative() {
            return Err(CoreError::InvalidMarket(format!(
                "negative lot size {}",
                self.lot_size
            )));
        }
        if let Some(max) = self.max_quantity {
            if !max.is_positive() || max < self.min_quantity {
                return Err(CoreError::InvalidMarket(format!(
                    "max quantity {max} below min quantity {}",
                    self.min_quantity
                )));
            }
        }
        Ok(())
    }

    /// Base asset (`BTC` in `BTC/USDT`).
    pub fn base(&self) -> &str {
        self.split_symbol().map(|(b, _)| b).unwrap_or(&self.symbol)
    }

    /// Quote asset (`USDT` in `BTC/USDT`).
    pub fn quote(&self) -> &str {
        self.split_symbol().map(|(_, q)| q).unwrap_or(&self.symbol)
    }

    fn split_symbol(&self) -> Result<(&str, &str)> {
        match self.symbol.split_once('/') {
            Some((base, quote)) if !base.is_empty() && !quote.is_empty() => Ok((base, quote)),
            _ => Err(CoreError::InvalidSymbol(self.symbol.clone())),
        }
    }

    /// Whether `quantity` at `price` passes the quantity and notional minimums.
    pub fn meets_minimums(&self, quantity: Size, price: Price) -> bool {
        quantity.is_positive()
            && quantity >= self.min_quantity
            && quantity.notional(price) >= self.min_notional
    }
}

impl fmt::Display for SymbolMarket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}
