//! Shared types for the marketplace order core
//!
//! Common types used by the server and its clients: the order state
//! machine, checkout request/report DTOs and notification payloads.

pub mod cart;
pub mod message;
pub mod order;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use cart::{
    CartLine, CheckoutFailure, CheckoutFailureCode, CheckoutReport, CheckoutRequest, GroupOutcome,
    GroupResult,
};
pub use message::NotifyEvent;
pub use order::{LifecycleAction, OrderStatus};
