//! Entry ladder and exit chain construction for the DCA engine.
//!
//! Everything here is synchronous and side-effect free apart from logging:
//! the scheduler gathers balances, quotes and open orders, then asks these
//! builders what to submit.
//!
//! # Architecture
//!
//! ```text
//! (state, quote, funds) → EntryLadderBuilder
//!                          ├─ AmountResolver: primary/secondary quantities
//!                          ├─ FundGuard: per-tier affordability (value passed tier to tier)
//!                          └─ PrecisionAdapter: tick/lot/minimum checks
//!                               ↓ entries
//! entry + fill price     → ExitChainBuilder
//!                          ├─ split_quantity: exit tiers
//!                          └─ stop-loss / take-profit legs + OCO groups
//! ```

pub mod amount;
pub mod config;
pub mod entry;
pub mod error;
pub mod exit;
pub mod fund_guard;
pub mod precision;
pub mod splitter;

pub use amount::{AmountContext, AmountDescriptor, AmountResolver, BalanceAmountResolver};
pub use config::{ExitConfig, LadderConfig, MAX_SECONDARY_ENTRIES, MAX_SECONDARY_EXITS};
pub use entry::{EntryLadder, EntryLadderBuilder, EntryOutcome, EntryRequest, TierResult};
pub use error::{LadderError, LadderResult};
pub use exit::{ExitChain, ExitChainBuilder, ExitPrices};
pub use fund_guard::{can_afford, remaining, CostBasis, FundGuard};
pub use precision::{ExchangePrecision, PrecisionAdapter};
pub use splitter::{split_quantity, Tier};
