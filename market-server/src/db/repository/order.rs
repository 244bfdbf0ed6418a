//! Order Repository
//!
//! Source of truth for orders. Status changes use compare-and-swap on the
//! current status (`update_status` with an expected value) so concurrent
//! transition attempts are rejected instead of last-write-wins.

use super::{RepoError, RepoResult};
use crate::db::models::{NewOrderItem, Order, OrderItem, OrderRow};
use chrono::Utc;
use shared::order::OrderStatus;
use sqlx::SqlitePool;
use uuid::Uuid;

const ORDER_COLUMNS: &str = "id, partner_id, customer_id, status, total_amount_cents, \
                             redemption_token, created_at, updated_at";

#[derive(Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create an order with its items in one transaction
    ///
    /// The total is computed from the item snapshots; the redemption token
    /// is issued here, once, and the schema enforces its uniqueness.
    pub async fn create_order(
        &self,
        partner_id: &str,
        customer_id: &str,
        items: &[NewOrderItem],
    ) -> RepoResult<Order> {
        let order_id = Uuid::new_v4().to_string();
        let redemption_token = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let status = OrderStatus::InQueue;
        let total_amount_cents: i64 = items.iter().map(NewOrderItem::subtotal_cents).sum();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO orders (id, partner_id, customer_id, status, total_amount_cents, \
             redemption_token, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&order_id)
        .bind(partner_id)
        .bind(customer_id)
        .bind(status.as_str())
        .bind(total_amount_cents)
        .bind(&redemption_token)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        for item in items {
            sqlx::query(
                "INSERT INTO order_items (order_id, product_id, quantity, unit_price_cents) \
                 VALUES (?, ?, ?, ?)",
            )
            .bind(&order_id)
            .bind(&item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let items = items
            .iter()
            .map(|i| OrderItem {
                order_id: order_id.clone(),
                product_id: i.product_id.clone(),
                quantity: i.quantity,
                unit_price_cents: i.unit_price_cents,
            })
            .collect();

        Ok(Order {
            id: order_id,
            partner_id: partner_id.to_string(),
            customer_id: customer_id.to_string(),
            status,
            total_amount_cents,
            redemption_token,
            created_at,
            updated_at: None,
            items,
        })
    }

    /// Find order by id, with items
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Order>> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            None => Ok(None),
            Some(row) => {
                let items = self.items_for(id).await?;
                Ok(Some(row.into_order(items).map_err(RepoError::Integrity)?))
            }
        }
    }

    /// All orders placed by a customer, newest first
    pub async fn find_by_customer(&self, customer_id: &str) -> RepoResult<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_id = ? ORDER BY created_at DESC"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        self.assemble(rows).await
    }

    /// All orders addressed to a partner, newest first
    pub async fn find_by_partner(&self, partner_id: &str) -> RepoResult<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE partner_id = ? ORDER BY created_at DESC"
        ))
        .bind(partner_id)
        .fetch_all(&self.pool)
        .await?;

        self.assemble(rows).await
    }

    /// Compare-and-swap status update
    ///
    /// The row is updated only if its status still equals `expected`.
    /// Returns `None` when the CAS misses (concurrent writer got there
    /// first, or the order no longer exists).
    pub async fn update_status(
        &self,
        id: &str,
        expected: OrderStatus,
        new: OrderStatus,
    ) -> RepoResult<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "UPDATE orders SET status = ?, updated_at = ? WHERE id = ? AND status = ? \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(new.as_str())
        .bind(Utc::now())
        .bind(id)
        .bind(expected.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            None => Ok(None),
            Some(row) => {
                let items = self.items_for(id).await?;
                Ok(Some(row.into_order(items).map_err(RepoError::Integrity)?))
            }
        }
    }

    /// Hard-delete a completed order (items cascade)
    ///
    /// The status guard lives in the statement itself so the check and the
    /// delete are one atomic step. Returns false when nothing was deleted.
    pub async fn delete_completed(&self, id: &str) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = ? AND status = ?")
            .bind(id)
            .bind(OrderStatus::Completed.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn items_for(&self, order_id: &str) -> RepoResult<Vec<OrderItem>> {
        let items: Vec<OrderItem> = sqlx::query_as(
            "SELECT order_id, product_id, quantity, unit_price_cents \
             FROM order_items WHERE order_id = ? ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn assemble(&self, rows: Vec<OrderRow>) -> RepoResult<Vec<Order>> {
        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            let items = self.items_for(&row.id).await?;
            orders.push(row.into_order(items).map_err(RepoError::Integrity)?);
        }
        Ok(orders)
    }
}
