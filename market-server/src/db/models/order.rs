//! Order models
//!
//! An order and its items are created together and the items never change
//! afterwards; `unit_price_cents` is the catalog price at checkout time, not
//! a live reference. `redemption_token` is issued once at creation and is
//! immutable across all later transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::order::OrderStatus;
use sqlx::FromRow;

/// Raw order row as persisted
#[derive(Debug, Clone, FromRow)]
pub struct OrderRow {
    pub id: String,
    pub partner_id: String,
    pub customer_id: String,
    pub status: String,
    pub total_amount_cents: i64,
    pub redemption_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl OrderRow {
    /// Assemble the API-facing order
    ///
    /// A stored status outside the five-state enum is a data-integrity
    /// error, reported as the `Err` string.
    pub fn into_order(self, items: Vec<OrderItem>) -> Result<Order, String> {
        let status: OrderStatus = self.status.parse()?;
        Ok(Order {
            id: self.id,
            partner_id: self.partner_id,
            customer_id: self.customer_id,
            status,
            total_amount_cents: self.total_amount_cents,
            redemption_token: self.redemption_token,
            created_at: self.created_at,
            updated_at: self.updated_at,
            items,
        })
    }
}

/// Order line item, a price snapshot taken at checkout
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrderItem {
    pub order_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl OrderItem {
    pub fn subtotal_cents(&self) -> i64 {
        self.quantity * self.unit_price_cents
    }
}

/// Input for creating an order item (no order id yet)
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl NewOrderItem {
    pub fn subtotal_cents(&self) -> i64 {
        self.quantity * self.unit_price_cents
    }
}

/// Full order as exposed by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub partner_id: String,
    pub customer_id: String,
    pub status: OrderStatus,
    pub total_amount_cents: i64,
    pub redemption_token: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub items: Vec<OrderItem>,
}
