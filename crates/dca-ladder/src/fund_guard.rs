//! Running balance of funds committed within one cycle.
//!
//! The guard is a plain value: each tier receives it, checks affordability,
//! and hands back the updated guard for the next tier.

use dca_core::{OrderSide, OrderSpec, Price, Size};
use rust_decimal::Decimal;

/// Unit in which an order consumes funds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostBasis {
    /// Quote asset: `quantity * price`. Spot BUY orders.
    Notional,
    /// Base asset: `quantity`. SELL orders and futures.
    Quantity,
}

impl CostBasis {
    pub fn for_side(side: OrderSide, is_futures: bool) -> Self {
        match (side, is_futures) {
            (OrderSide::Buy, false) => Self::Notional,
            _ => Self::Quantity,
        }
    }

    #[inline]
    pub fn cost(&self, quantity: Size, price: Price) -> Decimal {
        match self {
            Self::Notional => quantity.notional(price),
            Self::Quantity => quantity.inner(),
        }
    }
}

/// Funds still usable after the orders committed so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FundGuard {
    available: Decimal,
    committed: Decimal,
    basis: CostBasis,
}

impl FundGuard {
    pub fn new(available: Decimal, basis: CostBasis) -> Self {
        Self {
            available,
            committed: Decimal::ZERO,
            basis,
        }
    }

    /// Guard with `orders` already committed.
    pub fn from_committed(available: Decimal, orders: &[OrderSpec], basis: CostBasis) -> Self {
        orders
            .iter()
            .fold(Self::new(available, basis), |guard, order| {
                guard.commit(order.quantity, order.price)
            })
    }

    pub fn available(&self) -> Decimal {
        self.available
    }

    pub fn committed(&self) -> Decimal {
        self.committed
    }

    pub fn basis(&self) -> CostBasis {
        self.basis
    }

    pub fn remaining(&self) -> Decimal {
        self.available - self.committed
    }

    /// `true` when the order fits in what is left. Exactly using up the rest is allowed.
    pub fn can_afford(&self, quantity: Size, price: Price) -> bool {
        self.basis.cost(quantity, price) <= self.remaining()
    }

    #[must_use]
    pub fn commit(self, quantity: Size, price: Price) -> Self {
        Self {
            committed: self.committed + self.basis.cost(quantity, price),
            ..self
        }
    }
}

/// Funds left after `committed` orders on `side`.
pub fn remaining(
    available: Decimal,
    committed: &[OrderSpec],
    side: OrderSide,
    is_futures: bool,
) -> Decimal {
    FundGuard::from_committed(available, committed, CostBasis::for_side(side, is_futures))
        .remaining()
}

/// Whether an order of `quantity` at `price` fits in `remaining`.
pub fn can_afford(remaining: Decimal, quantity: Size, price: Price, basis: CostBasis) -> bool {
    basis.cost(quantity, price) <= remaining
}

#[cfg(test)]
mod tests {
    use super::*;
    use dca_core::OrderType;
    use rust_decimal_macros::dec;

    fn buy(qty: Decimal, price: Decimal) -> OrderSpec {
        OrderSpec::entry(
            "BTC/USDT",
            OrderSide::Buy,
            OrderType::Limit,
            Size::new(qty),
            Price::new(price),
            1,
        )
        .unwrap()
    }

    #[test]
    fn test_cost_basis_per_side() {
        assert_eq!(CostBasis::for_side(OrderSide::Buy, false), CostBasis::Notional);
        assert_eq!(CostBasis::for_side(OrderSide::Sell, false), CostBasis::Quantity);
        assert_eq!(CostBasis::for_side(OrderSide::Buy, true), CostBasis::Quantity);
    }

    #[test]
    fn test_remaining_spot_buy() {
        let orders = vec![buy(dec!(0.01), dec!(28500)), buy(dec!(0.01), dec!(27000))];
        // 1000 - 285 - 270
        assert_eq!(
            remaining(dec!(1000), &orders, OrderSide::Buy, false),
            dec!(445)
        );
    }

    #[test]
    fn test_remaining_futures_uses_quantity() {
        let orders = vec![buy(dec!(0.01), dec!(28500))];
        assert_eq!(remaining(dec!(1), &orders, OrderSide::Buy, true), dec!(0.99));
    }

    #[test]
    fn test_can_afford_allows_exact() {
        let guard = FundGuard::new(dec!(100), CostBasis::Notional);
        assert!(guard.can_afford(Size::new(dec!(1)), Price::new(dec!(100))));
        assert!(!guard.can_afford(Size::new(dec!(1.01)), Price::new(dec!(100))));
        assert!(can_afford(
            dec!(100),
            Size::new(dec!(1)),
            Price::new(dec!(100)),
            CostBasis::Notional
        ));
    }

    #[test]
    fn test_commit_reduces_remaining() {
        let guard = FundGuard::new(dec!(100), CostBasis::Notional);
        let guard = guard.commit(Size::new(dec!(0.5)), Price::new(dec!(100)));
        assert_eq!(guard.remaining(), dec!(50));
        assert_eq!(guard.committed(), dec!(50));
        assert!(!guard.can_afford(Size::new(dec!(0.6)), Price::new(dec!(100))));
    }
}
