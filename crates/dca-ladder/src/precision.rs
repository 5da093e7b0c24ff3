//! Exchange precision: tick/lot flooring and minimum checks.

use dca_core::{Price, Size, SymbolMarket};
use rust_decimal::Decimal;

/// Precision rules applied to every order before it is built.
pub trait PrecisionAdapter: Send + Sync {
    /// Floor `price` to the market tick.
    fn adapt_price(&self, market: &SymbolMarket, price: Price) -> Price;

    /// Floor `quantity` to the market lot.
    fn adapt_quantity(&self, market: &SymbolMarket, quantity: Size) -> Size;

    /// Largest `n <= desired` such that `quantity / n` still passes the market
    /// minimums at every price in `[lowest, highest]`. Zero when even one
    /// order is infeasible.
    fn feasible_split_count(
        &self,
        lowest: Price,
        highest: Price,
        quantity: Size,
        desired: u32,
        market: &SymbolMarket,
    ) -> u32;

    /// Adapt one order to the market. Orders above the maximum quantity are
    /// split into several; an empty result means the order cannot exist.
    fn check_and_adapt(
        &self,
        market: &SymbolMarket,
        quantity: Size,
        price: Price,
    ) -> Vec<(Size, Price)>;
}

/// Precision adapter driven by the `SymbolMarket` rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExchangePrecision;

impl PrecisionAdapter for ExchangePrecision {
    fn adapt_price(&self, market: &SymbolMarket, price: Price) -> Price {
        price.floor_to_tick(market.tick_size)
    }

    fn adapt_quantity(&self, market: &SymbolMarket, quantity: Size) -> Size {
        quantity.floor_to_lot(market.lot_size)
    }

    fn feasible_split_count(
        &self,
        lowest: Price,
        highest: Price,
        quantity: Size,
        desired: u32,
        market: &SymbolMarket,
    ) -> u32 {
        if !lowest.is_positive() || highest < lowest || !quantity.is_positive() {
            return 0;
        }
        // Notional is smallest at the lowest price.
        (1..=desired)
            .rev()
            .find(|n| {
                let per_tier = self.adapt_quantity(market, quantity / Decimal::from(*n));
                market.meets_minimums(per_tier, lowest)
            })
            .unwrap_or(0)
    }

    fn check_and_adapt(
        &self,
        market: &SymbolMarket,
        quantity: Size,
        price: Price,
    ) -> Vec<(Size, Price)> {
        let price = self.adapt_price(market, price);
        let quantity = self.adapt_quantity(market, quantity);
        if !price.is_positive() || !market.meets_minimums(quantity, price) {
            return Vec::new();
        }

        let max = match market.max_quantity {
            Some(max) if quantity > max => self.adapt_quantity(market, max),
            _ => return vec![(quantity, price)],
        };
        if !market.meets_minimums(max, price) {
            return Vec::new();
        }

        let mut orders = Vec::new();
        let mut left = quantity;
        while left > max {
            orders.push((max, price));
            left = left - max;
        }
        let left = self.adapt_quantity(market, left);
        if market.meets_minimums(left, price) {
            orders.push((left, price));
        }
        orders
    }
}
