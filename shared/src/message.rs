//! 实时通知负载类型
//!
//! Events are refetch hints, not state transfer: the receiver re-reads the
//! authoritative order from the store instead of trusting the payload.

use serde::{Deserialize, Serialize};

/// Event delivered over a live connection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotifyEvent {
    /// An order the receiver can see was created or changed status
    OrderUpdate { order_id: String },
}

impl NotifyEvent {
    pub fn order_update(order_id: impl Into<String>) -> Self {
        NotifyEvent::OrderUpdate {
            order_id: order_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_update_wire_shape() {
        let event = NotifyEvent::order_update("order-42");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "type": "order_update", "order_id": "order-42" })
        );
    }
}
