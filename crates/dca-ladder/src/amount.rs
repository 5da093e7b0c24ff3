//! Order amount descriptors and their resolution to base quantities.

use dca_core::{OrderSide, Price, Size};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LadderError;
use crate::fund_guard::CostBasis;

/// User-facing amount: a fixed quantity, a share of available funds, or all of them.
///
/// Parsed from strings such as `"0.5"`, `"10%"` or `"all"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AmountDescriptor {
    /// Base-asset quantity.
    Fixed(Size),
    /// Fraction of available funds, in `(0, 1]`.
    PercentOfAvailable(Decimal),
    AllAvailable,
}

impl FromStr for AmountDescriptor {
    type Err = LadderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        if raw.eq_ignore_ascii_case("all") {
            return Ok(Self::AllAvailable);
        }
        if let Some(percent) = raw.strip_suffix('%') {
            let value = Decimal::from_str(percent.trim())
                .map_err(|e| LadderError::InvalidAmount(format!("{raw}: {e}")))?;
            if value <= Decimal::ZERO || value > Decimal::ONE_HUNDRED {
                return Err(LadderError::InvalidAmount(format!(
                    "{raw}: percentage must be in (0, 100]"
                )));
            }
            return Ok(Self::PercentOfAvailable(value / Decimal::ONE_HUNDRED));
        }
        let value = Decimal::from_str(raw)
            .map_err(|e| LadderError::InvalidAmount(format!("{raw}: {e}")))?;
        if value <= Decimal::ZERO {
            return Err(LadderError::InvalidAmount(format!(
                "{raw}: quantity must be positive"
            )));
        }
        Ok(Self::Fixed(Size::new(value)))
    }
}

impl TryFrom<String> for AmountDescriptor {
    type Error = LadderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AmountDescriptor> for String {
    fn from(value: AmountDescriptor) -> Self {
        value.to_string()
    }
}

impl fmt::Display for AmountDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(size) => write!(f, "{size}"),
            Self::PercentOfAvailable(fraction) => {
                write!(f, "{}%", (*fraction * Decimal::ONE_HUNDRED).normalize())
            }
            Self::AllAvailable => f.write_str("all"),
        }
    }
}

/// What the resolver needs to know about the current cycle.
#[derive(Debug, Clone, Copy)]
pub struct AmountContext {
    pub side: OrderSide,
    /// Reference price used to convert quote funds into base quantity.
    pub price: Price,
    /// Available funds, in the unit given by `CostBasis::for_side`.
    pub available_funds: Decimal,
    pub is_futures: bool,
}

/// Turns an amount descriptor into a concrete base quantity.
pub trait AmountResolver: Send + Sync {
    /// `None` when the descriptor resolves to nothing usable.
    fn resolve(&self, descriptor: &AmountDescriptor, ctx: &AmountContext) -> Option<Size>;
}

/// Resolves amounts against the available balance.
///
/// Fixed quantities are capped at what the balance can pay for.
#[derive(Debug, Clone, Copy, Default)]
pub struct BalanceAmountResolver;

impl BalanceAmountResolver {
    fn quantity_budget(ctx: &AmountContext) -> Option<Decimal> {
        match CostBasis::for_side(ctx.side, ctx.is_futures) {
            CostBasis::Notional => {
                if !ctx.price.is_positive() {
                    return None;
                }
                Some(ctx.available_funds / ctx.price.inner())
            }
            CostBasis::Quantity => Some(ctx.available_funds),
        }
    }
}

impl AmountResolver for BalanceAmountResolver {
    fn resolve(&self, descriptor: &AmountDescriptor, ctx: &AmountContext) -> Option<Size> {
        let budget = Self::quantity_budget(ctx)?;
        let quantity = match descriptor {
            AmountDescriptor::Fixed(size) => size.inner().min(budget),
            AmountDescriptor::PercentOfAvailable(fraction) => budget * *fraction,
            AmountDescriptor::AllAvailable => budget,
        };
        (quantity > Decimal::ZERO).then(|| Size::new(quantity))
    }
}
