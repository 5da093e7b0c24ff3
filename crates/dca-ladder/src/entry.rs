//! Entry ladder construction.
//!
//! One primary entry at the offset quote (or at market), then up to
//! `secondary_entry_count` deeper limit entries. Every tier is gated by the
//! [`FundGuard`] value threaded from one tier to the next, so a tier that no
//! longer fits is skipped while later, cheaper tiers may still be placed.

use dca_core::{
    DirectionalState, OpenOrder, OrderSide, OrderSpec, OrderType, Price, Size, SymbolMarket,
};
use rust_decimal::Decimal;
use tracing::{debug, error, warn};

use crate::amount::{AmountContext, AmountResolver};
use crate::config::LadderConfig;
use crate::fund_guard::{CostBasis, FundGuard};
use crate::precision::PrecisionAdapter;

/// Inputs gathered by the caller at cycle start.
#[derive(Debug, Clone, Copy)]
pub struct EntryRequest<'a> {
    pub state: DirectionalState,
    pub quote: Price,
    /// Funds snapshot for the entry side (quote asset for spot BUY).
    pub available_funds: Decimal,
    pub is_futures: bool,
    pub open_orders: &'a [OpenOrder],
}

/// Result of one tier-construction step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierResult {
    /// One or more orders built (several when the exchange maximum splits it).
    Placed(Vec<OrderSpec>),
    /// Cost exceeds the remaining funds.
    Unaffordable,
    /// Below exchange minimums once adapted.
    Unrepresentable,
    /// Passed funds and precision checks but the order could not be built.
    Invalid,
}

impl TierResult {
    /// Whether construction got past the funds and precision gates.
    pub fn attempted(&self) -> bool {
        matches!(self, Self::Placed(_) | Self::Invalid)
    }
}

/// Entries built for one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryLadder {
    pub side: OrderSide,
    pub entries: Vec<OrderSpec>,
    /// Same-side open orders to cancel once the new entries are created.
    pub stale_orders: Vec<OpenOrder>,
    /// Tiers skipped for lack of funds.
    pub skipped_tiers: Vec<u32>,
}

/// Tagged outcome of [`EntryLadderBuilder::build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    Built(EntryLadder),
    /// The state does not map to an entry side.
    NotSupported(DirectionalState),
    /// The amount descriptor is missing or resolves to nothing.
    MissingAmount(OrderSide),
    /// Nothing affordable.
    NoFunds(OrderSide),
    /// Affordable, but below exchange minimums.
    NoVolume(OrderSide),
    /// At least one entry should have been creatable but none was built.
    CreationFailed(OrderSide),
}

impl EntryOutcome {
    pub fn entries(&self) -> &[OrderSpec] {
        match self {
            Self::Built(ladder) => &ladder.entries,
            _ => &[],
        }
    }

    /// `true` once any entry got past the funds and precision gates.
    pub fn any_attempted(&self) -> bool {
        matches!(self, Self::Built(_) | Self::CreationFailed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Built(_) => "built",
            Self::NotSupported(_) => "not_supported",
            Self::MissingAmount(_) => "missing_amount",
            Self::NoFunds(_) => "no_funds",
            Self::NoVolume(_) => "no_volume",
            Self::CreationFailed(_) => "creation_failed",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct TierAttempt {
    tier: u32,
    order_type: OrderType,
    quantity: Size,
    price: Price,
}

#[derive(Debug, Default)]
struct Progress {
    entries: Vec<OrderSpec>,
    skipped_tiers: Vec<u32>,
    attempted: bool,
    funds_short: bool,
}

impl Progress {
    fn record(&mut self, tier: u32, result: TierResult) {
        self.attempted |= result.attempted();
        match result {
            TierResult::Placed(mut orders) => self.entries.append(&mut orders),
            TierResult::Unaffordable => {
                self.funds_short = true;
                self.skipped_tiers.push(tier);
            }
            TierResult::Unrepresentable | TierResult::Invalid => {}
        }
    }
}

/// Builds the entry ladder for one cycle.
pub struct EntryLadderBuilder<'a> {
    config: &'a LadderConfig,
    market: &'a SymbolMarket,
    precision: &'a dyn PrecisionAdapter,
    amounts: &'a dyn AmountResolver,
}

impl<'a> EntryLadderBuilder<'a> {
    pub fn new(
        config: &'a LadderConfig,
        market: &'a SymbolMarket,
        precision: &'a dyn PrecisionAdapter,
        amounts: &'a dyn AmountResolver,
    ) -> Self {
        Self {
            config,
            market,
            precision,
            amounts,
        }
    }

    pub fn build(&self, request: &EntryRequest<'_>) -> EntryOutcome {
        let Some(side) = request.state.entry_side() else {
            debug!(state = %request.state, "Entry ladder not supported for state");
            return EntryOutcome::NotSupported(request.state);
        };
        let symbol = self.market.symbol.as_str();

        let ctx = AmountContext {
            side,
            price: request.quote,
            available_funds: request.available_funds,
            is_futures: request.is_futures,
        };
        let Some(quantity) = self
            .config
            .entry_amount
            .as_ref()
            .and_then(|amount| self.amounts.resolve(amount, &ctx))
        else {
            error!(
                %symbol,
                %side,
                amount = ?self.config.entry_amount,
                "Missing entry order quantity"
            );
            return EntryOutcome::MissingAmount(side);
        };
        // Resolved against the cycle-start snapshot, before the primary commits funds.
        let secondary_quantity = if self.config.secondaries_enabled() {
            let resolved = self
                .config
                .secondary_entry_amount
                .as_ref()
                .and_then(|amount| self.amounts.resolve(amount, &ctx));
            if resolved.is_none() {
                error!(
                    %symbol,
                    %side,
                    amount = ?self.config.secondary_entry_amount,
                    "Missing secondary entry order quantity"
                );
            }
            resolved
        } else {
            None
        };

        let basis = CostBasis::for_side(side, request.is_futures);
        let mut guard = FundGuard::new(request.available_funds, basis);
        let mut progress = Progress::default();

        let primary = TierAttempt {
            tier: 1,
            order_type: if self.config.use_market_entry {
                OrderType::Market
            } else {
                OrderType::Limit
            },
            quantity,
            price: self.primary_price(side, request.quote),
        };
        let (next, result) = self.place_tier(guard, side, primary);
        guard = next;
        progress.record(primary.tier, result);

        if let Some(quantity) = secondary_quantity {
            let count = self.config.secondary_entry_count;
            for step in 1..=count {
                let attempt = TierAttempt {
                    tier: step + 1,
                    order_type: OrderType::Limit,
                    quantity,
                    price: self.secondary_price(side, request.quote, step),
                };
                let (next, result) = self.place_tier(guard, side, attempt);
                guard = next;
                if result == TierResult::Unaffordable {
                    debug!(
                        %symbol,
                        tier = attempt.tier,
                        remaining = %guard.remaining(),
                        "Not enough available funds to create {step}/{count} secondary order"
                    );
                }
                progress.record(attempt.tier, result);
            }
        }

        if progress.entries.is_empty() {
            return if progress.attempted {
                error!(%symbol, %side, "Entry orders should have been created but none was built");
                EntryOutcome::CreationFailed(side)
            } else if progress.funds_short {
                debug!(%symbol, %side, available = %request.available_funds, "Not enough funds for any entry");
                EntryOutcome::NoFunds(side)
            } else {
                debug!(%symbol, %side, "Entry quantity below exchange minimums");
                EntryOutcome::NoVolume(side)
            };
        }

        let stale_orders = if self.config.cancel_open_orders_at_each_entry {
            request
                .open_orders
                .iter()
                .filter(|o| o.symbol == self.market.symbol && o.side == side && o.is_active())
                .cloned()
                .collect()
        } else {
            Vec::new()
        };

        EntryOutcome::Built(EntryLadder {
            side,
            entries: progress.entries,
            stale_orders,
            skipped_tiers: progress.skipped_tiers,
        })
    }

    /// Offset limit price, or the quote itself for a market entry.
    pub fn primary_price(&self, side: OrderSide, quote: Price) -> Price {
        if self.config.use_market_entry {
            return quote;
        }
        self.precision
            .adapt_price(self.market, quote.offset_by(away(side, self.config.entry_offset)))
    }

    /// Price of secondary entry `step` (1-based).
    pub fn secondary_price(&self, side: OrderSide, quote: Price, step: u32) -> Price {
        let offset =
            self.config.entry_offset + self.config.secondary_entry_offset * Decimal::from(step);
        self.precision
            .adapt_price(self.market, quote.offset_by(away(side, offset)))
    }

    /// One tier: funds gate, precision gate, then build. Returns the guard
    /// with the built orders committed.
    fn place_tier(
        &self,
        guard: FundGuard,
        side: OrderSide,
        attempt: TierAttempt,
    ) -> (FundGuard, TierResult) {
        if !guard.can_afford(attempt.quantity, attempt.price) {
            return (guard, TierResult::Unaffordable);
        }
        let adapted = self
            .precision
            .check_and_adapt(self.market, attempt.quantity, attempt.price);
        if adapted.is_empty() {
            debug!(
                symbol = %self.market.symbol,
                tier = attempt.tier,
                quantity = %attempt.quantity,
                price = %attempt.price,
                "Entry below exchange minimums"
            );
            return (guard, TierResult::Unrepresentable);
        }

        let mut guard = guard;
        let mut orders = Vec::with_capacity(adapted.len());
        for (quantity, price) in adapted {
            match OrderSpec::entry(
                &self.market.symbol,
                side,
                attempt.order_type,
                quantity,
                price,
                attempt.tier,
            ) {
                Ok(order) => {
                    guard = guard.commit(quantity, price);
                    orders.push(order);
                }
                Err(e) => warn!(
                    symbol = %self.market.symbol,
                    tier = attempt.tier,
                    %quantity,
                    %price,
                    error = %e,
                    "Failed to build entry order"
                ),
            }
        }
        if orders.is_empty() {
            return (guard, TierResult::Invalid);
        }
        (guard, TierResult::Placed(orders))
    }
}

/// Signed offset moving the price away from the market: down for BUY, up for SELL.
fn away(side: OrderSide, offset: Decimal) -> Decimal {
    match side {
        OrderSide::Buy => -offset,
        OrderSide::Sell => offset,
    }
}
