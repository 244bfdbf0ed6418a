//! OrderLifecycle - state machine engine and sole writer of order status
//!
//! # Transition Flow
//!
//! ```text
//! apply(actor, order_id, action)
//!     ├─ 1. Load order (read current status)
//!     ├─ 2. Ownership check (owning partner only)
//!     ├─ 3. Validate action against the status just read
//!     ├─ 4. CAS update: WHERE status = <read status>
//!     │      └─ miss → Conflict (concurrent writer won)
//!     └─ 5. Broadcast order_update to both parties (best-effort)
//! ```
//!
//! Deletion is cleanup, not a transition: permitted only on `completed`
//! orders and emits no event.

use shared::message::NotifyEvent;
use shared::order::{LifecycleAction, OrderStatus};
use thiserror::Error;

use crate::auth::{CurrentUser, Role};
use crate::db::models::Order;
use crate::db::repository::{OrderRepository, RepoError};
use crate::notify::NotifyHub;
use crate::utils::AppError;

/// Lifecycle engine errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Not the owning partner of this order")]
    Unauthorized,

    #[error("Invalid transition: {action} from {status}")]
    InvalidTransition {
        action: LifecycleAction,
        status: OrderStatus,
    },

    #[error("Only completed orders can be deleted (status: {0})")]
    NotDeletable(OrderStatus),

    #[error("Concurrent transition on this order, retry")]
    Conflict,

    #[error("Storage error: {0}")]
    Storage(#[from] RepoError),
}

impl From<LifecycleError> for AppError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::NotFound(id) => AppError::not_found(format!("Order {id} not found")),
            LifecycleError::Unauthorized => {
                AppError::forbidden("Not the owning partner of this order")
            }
            e @ LifecycleError::InvalidTransition { .. } => {
                AppError::invalid_transition(e.to_string())
            }
            e @ LifecycleError::NotDeletable(_) => AppError::invalid_transition(e.to_string()),
            e @ LifecycleError::Conflict => AppError::conflict(e.to_string()),
            LifecycleError::Storage(e) => AppError::database(e.to_string()),
        }
    }
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// 订单状态机引擎
///
/// All status mutation goes through [`apply`](OrderLifecycle::apply), never
/// direct field writes, so per-order serialization has one chokepoint.
#[derive(Clone)]
pub struct OrderLifecycle {
    repo: OrderRepository,
    hub: NotifyHub,
}

impl OrderLifecycle {
    pub fn new(repo: OrderRepository, hub: NotifyHub) -> Self {
        Self { repo, hub }
    }

    /// Apply a partner-requested lifecycle action to an order
    ///
    /// Exactly one of two failures can come out of a legal-looking request:
    /// [`LifecycleError::InvalidTransition`] when the table forbids the
    /// action from the observed status, or [`LifecycleError::Conflict`]
    /// when a concurrent transition won the CAS race. Either way stored
    /// state is left untouched.
    pub async fn apply(
        &self,
        actor: &CurrentUser,
        order_id: &str,
        action: LifecycleAction,
    ) -> LifecycleResult<Order> {
        let order = self
            .repo
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(order_id.to_string()))?;

        // 只有归属合作方可以流转订单
        if actor.role != Role::Partner || actor.id != order.partner_id {
            tracing::warn!(
                target: "security",
                actor = %actor.id,
                order_id,
                action = %action,
                "ownership_violation"
            );
            return Err(LifecycleError::Unauthorized);
        }

        let next = order
            .status
            .apply(action)
            .ok_or(LifecycleError::InvalidTransition {
                action,
                status: order.status,
            })?;

        let updated = self
            .repo
            .update_status(order_id, order.status, next)
            .await?
            // CAS miss: someone moved the order between our read and write
            .ok_or(LifecycleError::Conflict)?;

        tracing::info!(
            order_id,
            from = %order.status,
            to = %next,
            actor = %actor.id,
            "order transition applied"
        );

        // 通知失败绝不影响已提交的流转
        self.emit_update(&updated);

        Ok(updated)
    }

    /// Hard-delete a completed order (administrative cleanup)
    pub async fn delete(&self, actor: &CurrentUser, order_id: &str) -> LifecycleResult<()> {
        let order = self
            .repo
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(order_id.to_string()))?;

        if actor.role != Role::Partner || actor.id != order.partner_id {
            return Err(LifecycleError::Unauthorized);
        }

        if order.status != OrderStatus::Completed {
            return Err(LifecycleError::NotDeletable(order.status));
        }

        // Guarded delete: a transition racing in after our read makes the
        // delete a no-op rather than removing a non-completed order.
        if !self.repo.delete_completed(order_id).await? {
            return Err(LifecycleError::Conflict);
        }

        tracing::info!(order_id, actor = %actor.id, "completed order deleted");
        Ok(())
    }

    /// Fan out an `order_update` hint to the partner and the customer
    pub fn emit_update(&self, order: &Order) {
        let event = NotifyEvent::order_update(&order.id);
        let to_partner = self.hub.publish(&order.partner_id, &event);
        let to_customer = self.hub.publish(&order.customer_id, &event);
        tracing::debug!(
            order_id = %order.id,
            to_partner,
            to_customer,
            "order update broadcast"
        );
    }
}
