//! Exit chain construction: stop-loss / take-profit legs and their OCO groups.

use dca_core::{
    OrderGroup, OrderGroupId, OrderRole, OrderSide, OrderSpec, OrderType, Price, SymbolMarket,
};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::config::ExitConfig;
use crate::precision::PrecisionAdapter;
use crate::splitter::split_quantity;

/// Reference prices of an exit chain, before tick adaptation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitPrices {
    pub stop: Price,
    pub first_take_profit: Price,
    pub last_take_profit: Price,
}

impl ExitPrices {
    /// Price band handed to the splitter.
    pub fn band(&self) -> (Price, Price) {
        let prices = [self.stop, self.first_take_profit, self.last_take_profit];
        let lowest = prices.iter().copied().min().unwrap_or(self.stop);
        let highest = prices.iter().copied().max().unwrap_or(self.stop);
        (lowest, highest)
    }
}

/// Exit legs for one entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExitChain {
    pub exits: Vec<OrderSpec>,
    pub groups: Vec<OrderGroup>,
    pub tier_count: u32,
    /// A single tier: exits may ride along in the entry's creation request.
    pub bundle_with_entry: bool,
}

impl ExitChain {
    pub fn is_empty(&self) -> bool {
        self.exits.is_empty()
    }

    pub fn legs(&self, role: OrderRole) -> impl Iterator<Item = &OrderSpec> {
        self.exits.iter().filter(move |e| e.role == role)
    }

    pub fn group_of(&self, exit: &OrderSpec) -> Option<&OrderGroup> {
        self.groups.iter().find(|g| g.contains(&exit.cloid))
    }
}

/// Builds exit chains for entries.
pub struct ExitChainBuilder<'a> {
    config: &'a ExitConfig,
    market: &'a SymbolMarket,
    precision: &'a dyn PrecisionAdapter,
}

impl<'a> ExitChainBuilder<'a> {
    pub fn new(
        config: &'a ExitConfig,
        market: &'a SymbolMarket,
        precision: &'a dyn PrecisionAdapter,
    ) -> Self {
        Self {
            config,
            market,
            precision,
        }
    }

    /// Stop, first and last take-profit prices around `fill_price`.
    pub fn reference_prices(&self, exit_side: OrderSide, fill_price: Price) -> ExitPrices {
        let flag = side_flag(exit_side);
        let cfg = self.config;
        let last_offset =
            cfg.take_profit_offset + cfg.secondary_exit_offset * Decimal::from(cfg.secondary_exit_count);
        ExitPrices {
            stop: fill_price.offset_by(-cfg.stop_loss_offset * flag),
            first_take_profit: fill_price.offset_by(cfg.take_profit_offset * flag),
            last_take_profit: fill_price.offset_by(last_offset * flag),
        }
    }

    /// Take-profit price of `tier` (1-based), before tick adaptation.
    pub fn take_profit_price(&self, exit_side: OrderSide, fill_price: Price, tier: u32) -> Price {
        let cfg = self.config;
        let offset = if tier <= 1 {
            cfg.take_profit_offset
        } else {
            cfg.take_profit_offset + cfg.secondary_exit_offset * Decimal::from(tier)
        };
        fill_price.offset_by(offset * side_flag(exit_side))
    }

    /// Build the exit chain protecting `entry`, assumed filled at `fill_price`.
    ///
    /// Deterministic: identical inputs give identical legs, ids and groups.
    pub fn build(&self, entry: &OrderSpec, fill_price: Price) -> ExitChain {
        if !self.config.any_exit_enabled() {
            return ExitChain::default();
        }
        let exit_side = entry.side.opposite();
        let prices = self.reference_prices(exit_side, fill_price);
        let (lowest, highest) = prices.band();

        let tiers = split_quantity(
            entry.quantity,
            self.config.desired_tiers(),
            lowest,
            highest,
            self.market,
            self.precision,
        );
        if tiers.is_empty() {
            debug!(
                entry = %entry.cloid,
                quantity = %entry.quantity,
                "Exit quantity cannot be split into valid orders, entry left unprotected"
            );
            return ExitChain::default();
        }

        let tier_count = tiers.len() as u32;
        let stop_price = self.precision.adapt_price(self.market, prices.stop);
        let mut chain = ExitChain {
            tier_count,
            bundle_with_entry: tier_count == 1,
            ..ExitChain::default()
        };

        for tier in tiers {
            let take_profit_price = self.precision.adapt_price(
                self.market,
                self.take_profit_price(exit_side, fill_price, tier.index),
            );
            let stop_leg = self.config.use_stop_loss && stop_price.is_positive();
            let take_profit_leg = self.config.use_take_profit && take_profit_price.is_positive();
            let group = (stop_leg && take_profit_leg)
                .then(|| OrderGroupId::for_tier(&entry.cloid, tier.index));

            let mut legs = Vec::with_capacity(2);
            if stop_leg {
                legs.push((OrderRole::StopLoss, OrderType::Stop, stop_price));
            }
            if take_profit_leg {
                legs.push((OrderRole::TakeProfit, OrderType::Limit, take_profit_price));
            }

            let mut members = Vec::with_capacity(legs.len());
            for (role, order_type, price) in legs {
                match OrderSpec::exit(
                    entry,
                    role,
                    order_type,
                    tier.quantity,
                    price,
                    tier.index,
                    group.clone(),
                ) {
                    Ok(leg) => {
                        members.push(leg.cloid.clone());
                        chain.exits.push(leg);
                    }
                    Err(e) => warn!(
                        entry = %entry.cloid,
                        tier = tier.index,
                        %role,
                        error = %e,
                        "Failed to build exit leg"
                    ),
                }
            }

            if let Some(id) = group {
                if members.len() == 2 {
                    chain
                        .groups
                        .push(OrderGroup::one_cancels_the_other(id, members));
                } else {
                    // One leg failed: the survivor must not point at a missing group.
                    for leg in chain.exits.iter_mut().filter(|l| members.contains(&l.cloid)) {
                        leg.group = None;
                    }
                }
            }
        }

        debug!(
            entry = %entry.cloid,
            legs = chain.exits.len(),
            groups = chain.groups.len(),
            tiers = chain.tier_count,
            "Built exit chain"
        );
        chain
    }
}

/// +1 when exiting by selling (long position), -1 when exiting by buying.
fn side_flag(exit_side: OrderSide) -> Decimal {
    match exit_side {
        OrderSide::Sell => Decimal::ONE,
        OrderSide::Buy => Decimal::NEGATIVE_ONE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precision::ExchangePrecision;
    use dca_core::Size;
    use rust_decimal_macros::dec;

    fn market() -> SymbolMarket {
        SymbolMarket::new("ETH/USDT", Price::new(dec!(0.01)), Size::new(dec!(0.001)))
            .unwrap()
            .with_minimums(Size::new(dec!(0.001)), dec!(5))
    }

    fn entry(side: OrderSide, qty: Decimal, price: Decimal) -> OrderSpec {
        OrderSpec::entry(
            "ETH/USDT",
            side,
            OrderType::Limit,
            Size::new(qty),
            Price::new(price),
            1,
        )
        .unwrap()
    }

    fn both_legs() -> ExitConfig {
        ExitConfig {
            use_stop_loss: true,
            stop_loss_offset: dec!(0.10),
            use_take_profit: true,
            take_profit_offset: dec!(0.05),
            ..ExitConfig::default()
        }
    }

    #[test]
    fn test_no_exits_when_disabled() {
        let cfg = ExitConfig::default();
        let m = market();
        let builder = ExitChainBuilder::new(&cfg, &m, &ExchangePrecision);
        let e = entry(OrderSide::Buy, dec!(0.1), dec!(1900));
        assert!(builder.build(&e, e.price).is_empty());
    }

    #[test]
    fn test_single_tier_grouped() {
        let cfg = both_legs();
        let m = market();
        let builder = ExitChainBuilder::new(&cfg, &m, &ExchangePrecision);
        let e = entry(OrderSide::Buy, dec!(0.1), dec!(1900));
        let chain = builder.build(&e, e.price);

        assert_eq!(chain.tier_count, 1);
        assert!(chain.bundle_with_entry);
        assert_eq!(chain.exits.len(), 2);
        assert_eq!(chain.groups.len(), 1);

        let stop = chain.legs(OrderRole::StopLoss).next().unwrap();
        let tp = chain.legs(OrderRole::TakeProfit).next().unwrap();
        assert_eq!(stop.price, Price::new(dec!(1710)));
        assert_eq!(stop.order_type, OrderType::Stop);
        assert_eq!(stop.side, OrderSide::Sell);
        assert_eq!(tp.price, Price::new(dec!(1995)));
        assert_eq!(tp.order_type, OrderType::Limit);
        assert_eq!(stop.group, tp.group);
        assert_eq!(stop.parent.as_ref(), Some(&e.cloid));
        assert_eq!(stop.cloid.as_str(), format!("{}-sl1", e.cloid));
    }

    #[test]
    fn test_short_entry_exit_prices() {
        let cfg = both_legs();
        let m = market();
        let builder = ExitChainBuilder::new(&cfg, &m, &ExchangePrecision);
        let e = entry(OrderSide::Sell, dec!(0.1), dec!(2100));
        let chain = builder.build(&e, e.price);

        let stop = chain.legs(OrderRole::StopLoss).next().unwrap();
        let tp = chain.legs(OrderRole::TakeProfit).next().unwrap();
        assert_eq!(stop.side, OrderSide::Buy);
        assert_eq!(stop.price, Price::new(dec!(2310)));
        assert_eq!(tp.price, Price::new(dec!(1995)));
    }

    #[test]
    fn test_stop_only_has_no_group() {
        let cfg = ExitConfig {
            use_stop_loss: true,
            ..ExitConfig::default()
        };
        let m = market();
        let builder = ExitChainBuilder::new(&cfg, &m, &ExchangePrecision);
        let e = entry(OrderSide::Buy, dec!(0.1), dec!(1900));
        let chain = builder.build(&e, e.price);
        assert_eq!(chain.exits.len(), 1);
        assert!(chain.groups.is_empty());
        assert!(chain.exits[0].group.is_none());
    }

    #[test]
    fn test_multi_tier_groups_per_tier() {
        let cfg = ExitConfig {
            use_secondary_exits: true,
            secondary_exit_count: 2,
            secondary_exit_offset: dec!(0.05),
            ..both_legs()
        };
        let m = market();
        let builder = ExitChainBuilder::new(&cfg, &m, &ExchangePrecision);
        let e = entry(OrderSide::Buy, dec!(0.3), dec!(2000));
        let chain = builder.build(&e, e.price);

        assert_eq!(chain.tier_count, 3);
        assert!(!chain.bundle_with_entry);
        assert_eq!(chain.groups.len(), 3);
        for group in &chain.groups {
            let members: Vec<&OrderSpec> = chain
                .exits
                .iter()
                .filter(|x| group.contains(&x.cloid))
                .collect();
            assert_eq!(members.len(), 2);
            assert_eq!(members[0].tier, members[1].tier);
        }

        // Stop does not ladder; take-profits do.
        let stops: Vec<Price> = chain.legs(OrderRole::StopLoss).map(|x| x.price).collect();
        assert!(stops.iter().all(|p| *p == Price::new(dec!(1800))));
        let tps: Vec<Price> = chain.legs(OrderRole::TakeProfit).map(|x| x.price).collect();
        assert_eq!(
            tps,
            vec![
                Price::new(dec!(2100)),
                Price::new(dec!(2300)),
                Price::new(dec!(2400))
            ]
        );

        let total: Size = chain.legs(OrderRole::TakeProfit).map(|x| x.quantity).sum();
        assert_eq!(total, e.quantity);
    }

    #[test]
    fn test_unsplittable_quantity_leaves_entry_unprotected() {
        let cfg = ExitConfig {
            use_secondary_exits: true,
            secondary_exit_count: 2,
            ..both_legs()
        };
        let m = market().with_minimums(Size::new(dec!(0.01)), dec!(5));
        let builder = ExitChainBuilder::new(&cfg, &m, &ExchangePrecision);
        let e = entry(OrderSide::Buy, dec!(0.005), dec!(2000));
        let chain = builder.build(&e, e.price);
        assert!(chain.is_empty());
        assert_eq!(chain.tier_count, 0);
    }

    #[test]
    fn test_build_is_deterministic() {
        let cfg = ExitConfig {
            use_secondary_exits: true,
            secondary_exit_count: 1,
            ..both_legs()
        };
        let m = market();
        let builder = ExitChainBuilder::new(&cfg, &m, &ExchangePrecision);
        let e = entry(OrderSide::Buy, dec!(0.2), dec!(1900));
        assert_eq!(builder.build(&e, e.price), builder.build(&e, e.price));
    }
}
