//! Order-related types and identifiers.
//!
//! Provides order side and type, the order specifications produced by the
//! ladder builders, one-cancels-the-other groups, and the view of exchange
//! orders that survive from previous cycles.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::{Price, Size};

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    /// Lowercase name, used as a metric label.
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Market order. The spec price is only the reference quote.
    Market,
    /// Limit order.
    Limit,
    /// Stop order, triggered at its price.
    Stop,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Market => write!(f, "market"),
            Self::Limit => write!(f, "limit"),
            Self::Stop => write!(f, "stop"),
        }
    }
}

/// What an order is for within a ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderRole {
    Entry,
    StopLoss,
    TakeProfit,
}

impl OrderRole {
    fn id_tag(&self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::StopLoss => "sl",
            Self::TakeProfit => "tp",
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::StopLoss => "stop_loss",
            Self::TakeProfit => "take_profit",
        }
    }
}

impl fmt::Display for OrderRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Client order ID.
///
/// Entries get a fresh id; exit legs derive theirs from the parent entry so
/// that rebuilding an exit chain yields the same identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientOrderId(String);

impl ClientOrderId {
    /// Create a new unique client order ID.
    ///
    /// Format: `dca_{timestamp_ms}_{uuid_short}`
    pub fn new() -> Self {
        let ts = chrono::Utc::now().timestamp_millis();
        let uuid_short = &Uuid::new_v4().to_string()[..8];
        Self(format!("dca_{ts}_{uuid_short}"))
    }

    /// Derive a child id: `{parent}-{tag}{tier}`.
    pub fn derived(parent: &ClientOrderId, tag: &str, tier: u32) -> Self {
        Self(format!("{}-{tag}{tier}", parent.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClientOrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ClientOrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ClientOrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of an order group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderGroupId(String);

impl OrderGroupId {
    /// Group id for one tier of an entry's exit chain: `{entry}-oco{tier}`.
    pub fn for_tier(entry: &ClientOrderId, tier: u32) -> Self {
        Self(format!("{}-oco{tier}", entry.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Group semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    /// Any member filling or being cancelled cancels the others.
    OneCancelsTheOther,
}

/// A set of exit orders linked by `GroupKind`.
///
/// Membership is fixed at construction; there are no mutators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderGroup {
    id: OrderGroupId,
    kind: GroupKind,
    members: Vec<ClientOrderId>,
}

impl OrderGroup {
    /// Create a one-cancels-the-other group.
    pub fn one_cancels_the_other(id: OrderGroupId, members: Vec<ClientOrderId>) -> Self {
        Self {
            id,
            kind: GroupKind::OneCancelsTheOther,
            members,
        }
    }

    pub fn id(&self) -> &OrderGroupId {
        &self.id
    }

    pub fn kind(&self) -> GroupKind {
        self.kind
    }

    pub fn members(&self) -> &[ClientOrderId] {
        &self.members
    }

    pub fn contains(&self, cloid: &ClientOrderId) -> bool {
        self.members.contains(cloid)
    }

    /// Members to cancel once `done` has filled or been cancelled.
    ///
    /// Returns nothing when `done` is not a member.
    pub fn siblings_to_cancel(&self, done: &ClientOrderId) -> Vec<ClientOrderId> {
        if !self.contains(done) {
            return Vec::new();
        }
        self.members.iter().filter(|m| *m != done).cloned().collect()
    }
}

/// Specification of one order, before submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec {
    pub cloid: ClientOrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub role: OrderRole,
    pub quantity: Size,
    /// Limit/stop price. For market orders this is the reference quote.
    pub price: Price,
    /// Ladder tier, 1-based.
    pub tier: u32,
    /// Entry this order protects. `None` for entries.
    pub parent: Option<ClientOrderId>,
    pub group: Option<OrderGroupId>,
}

impl OrderSpec {
    /// Build an entry order spec with a fresh client order id.
    pub fn entry(
        symbol: &str,
        side: OrderSide,
        order_type: OrderType,
        quantity: Size,
        price: Price,
        tier: u32,
    ) -> Result<Self> {
        validate(quantity, price)?;
        Ok(Self {
            cloid: ClientOrderId::new(),
            symbol: symbol.to_string(),
            side,
            order_type,
            role: OrderRole::Entry,
            quantity,
            price,
            tier,
            parent: None,
            group: None,
        })
    }

    /// Build an exit leg attached to `parent`.
    pub fn exit(
        parent: &OrderSpec,
        role: OrderRole,
        order_type: OrderType,
        quantity: Size,
        price: Price,
        tier: u32,
        group: Option<OrderGroupId>,
    ) -> Result<Self> {
        validate(quantity, price)?;
        Ok(Self {
            cloid: ClientOrderId::derived(&parent.cloid, role.id_tag(), tier),
            symbol: parent.symbol.clone(),
            side: parent.side.opposite(),
            order_type,
            role,
            quantity,
            price,
            tier,
            parent: Some(parent.cloid.clone()),
            group,
        })
    }

    pub fn is_entry(&self) -> bool {
        self.role == OrderRole::Entry
    }
}

fn validate(quantity: Size, price: Price) -> Result<()> {
    if !quantity.is_positive() {
        return Err(CoreError::InvalidSize(format!(
            "order quantity must be positive, got {quantity}"
        )));
    }
    if !price.is_positive() {
        return Err(CoreError::InvalidPrice(format!(
            "order price must be positive, got {price}"
        )));
    }
    Ok(())
}

/// Exchange-side status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Chained exit waiting for its parent entry to fill.
    Pending,
    Open,
    Closed,
    Cancelled,
}

/// An order known to the exchange, as read back from the open-orders query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOrder {
    pub cloid: ClientOrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub price: Price,
    pub quantity: Size,
    pub status: OrderStatus,
}

impl OpenOrder {
    /// Record a freshly submitted spec as an open order.
    pub fn from_spec(spec: &OrderSpec) -> Self {
        Self {
            cloid: spec.cloid.clone(),
            symbol: spec.symbol.clone(),
            side: spec.side,
            order_type: spec.order_type,
            price: spec.price,
            quantity: spec.quantity,
            status: OrderStatus::Open,
        }
    }

    /// Working on the book.
    pub fn is_active(&self) -> bool {
        self.status == OrderStatus::Open
    }

    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    /// Still able to execute, now or once its parent fills.
    pub fn is_live(&self) -> bool {
        matches!(self.status, OrderStatus::Open | OrderStatus::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry() -> OrderSpec {
        OrderSpec::entry(
            "BTC/USDT",
            OrderSide::Buy,
            OrderType::Limit,
            Size::new(dec!(0.5)),
            Price::new(dec!(1900)),
            1,
        )
        .unwrap()
    }

    #[test]
    fn test_order_side_opposite() {
        assert_eq!(OrderSide::Buy.opposite(), OrderSide::Sell);
        assert_eq!(OrderSide::Sell.opposite(), OrderSide::Buy);
    }

    #[test]
    fn test_client_order_id_format() {
        let id1 = ClientOrderId::new();
        let id2 = ClientOrderId::new();
        assert!(id1.as_str().starts_with("dca_"));
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_entry_rejects_non_positive_values() {
        let zero_qty = OrderSpec::entry(
            "BTC/USDT",
            OrderSide::Buy,
            OrderType::Limit,
            Size::ZERO,
            Price::new(dec!(1)),
            1,
        );
        assert!(matches!(zero_qty, Err(CoreError::InvalidSize(_))));

        let negative_price = OrderSpec::entry(
            "BTC/USDT",
            OrderSide::Buy,
            OrderType::Limit,
            Size::new(dec!(1)),
            Price::new(dec!(-1)),
            1,
        );
        assert!(matches!(negative_price, Err(CoreError::InvalidPrice(_))));
    }

    #[test]
    fn test_exit_references_parent() {
        let parent = entry();
        let exit = OrderSpec::exit(
            &parent,
            OrderRole::StopLoss,
            OrderType::Stop,
            Size::new(dec!(0.5)),
            Price::new(dec!(1710)),
            1,
            None,
        )
        .unwrap();

        assert_eq!(exit.side, OrderSide::Sell);
        assert_eq!(exit.parent.as_ref(), Some(&parent.cloid));
        assert_eq!(exit.cloid.as_str(), format!("{}-sl1", parent.cloid));
        assert!(!exit.is_entry());
    }

    #[test]
    fn test_group_siblings() {
        let a = ClientOrderId::from("a");
        let b = ClientOrderId::from("b");
        let group = OrderGroup::one_cancels_the_other(
            OrderGroupId::for_tier(&ClientOrderId::from("e"), 1),
            vec![a.clone(), b.clone()],
        );

        assert_eq!(group.id().as_str(), "e-oco1");
        assert_eq!(group.siblings_to_cancel(&a), vec![b.clone()]);
        assert_eq!(group.siblings_to_cancel(&b), vec![a]);
        assert!(group
            .siblings_to_cancel(&ClientOrderId::from("x"))
            .is_empty());
    }

    #[test]
    fn test_open_order_activity() {
        let mut order = OpenOrder::from_spec(&entry());
        assert!(order.is_active());
        order.status = OrderStatus::Cancelled;
        assert!(!order.is_active());
        order.status = OrderStatus::Closed;
        assert!(!order.is_active());
        order.status = OrderStatus::Pending;
        assert!(!order.is_active());
        assert!(order.is_pending());
    }
}
