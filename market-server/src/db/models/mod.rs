//! Database Models
//!
//! Row structs and the API-facing order shapes assembled from them.

pub mod order;

pub use order::{NewOrderItem, Order, OrderItem, OrderRow};
