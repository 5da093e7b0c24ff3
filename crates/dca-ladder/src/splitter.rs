//! Split a total quantity into equal tiers the exchange will accept.

use dca_core::{Price, Size, SymbolMarket};
use rust_decimal::Decimal;

use crate::precision::PrecisionAdapter;

/// One tier of a split quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tier {
    /// 1-based tier index.
    pub index: u32,
    pub quantity: Size,
}

/// Split `total` into at most `desired` tiers valid over `[lowest, highest]`.
///
/// - `desired <= 1` yields the whole quantity as a single tier, unadapted.
/// - Tiers are equal and lot-floored; the last tier takes the flooring remainder.
/// - Empty when no split, not even one tier, satisfies the minimums.
pub fn split_quantity(
    total: Size,
    desired: u32,
    lowest: Price,
    highest: Price,
    market: &SymbolMarket,
    precision: &dyn PrecisionAdapter,
) -> Vec<Tier> {
    if desired <= 1 {
        return vec![Tier {
            index: 1,
            quantity: total,
        }];
    }

    let count = precision.feasible_split_count(lowest, highest, total, desired, market);
    if count == 0 {
        return Vec::new();
    }

    let per_tier = precision.adapt_quantity(market, total / Decimal::from(count));
    let allotted = per_tier * Decimal::from(count - 1);
    let last = precision.adapt_quantity(market, total - allotted);

    (1..=count)
        .map(|index| Tier {
            index,
            quantity: if index == count { last } else { per_tier },
        })
        .collect()
}
