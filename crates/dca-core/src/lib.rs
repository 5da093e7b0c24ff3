//! Core domain types for the DCA order-ladder engine.
//!
//! This crate provides the vocabulary shared by the builders and the scheduler:
//! - `Price`, `Size`: Precision-safe numeric types
//! - `DirectionalState`: Per-cycle directional bias produced upstream
//! - `OrderSpec`, `OrderGroup`: Order specifications and one-cancels-the-other groups
//! - `SymbolMarket`: Exchange precision rules for a traded symbol

pub mod decimal;
pub mod error;
pub mod market;
pub mod order;
pub mod state;

pub use decimal::{Price, Size};
pub use error::{CoreError, Result};
pub use market::SymbolMarket;
pub use order::{
    ClientOrderId, GroupKind, OpenOrder, OrderGroup, OrderGroupId, OrderRole, OrderSide,
    OrderSpec, OrderStatus, OrderType,
};
pub use state::DirectionalState;
