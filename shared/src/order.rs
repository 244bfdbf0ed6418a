//! 订单状态机共享类型
//!
//! The five order states and the partner actions that move between them.
//! The wire/storage format is lowercase snake_case; any other persisted
//! value is a data-integrity error.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Order Status
// ============================================================================

/// 订单状态
///
/// ```text
/// in_queue --accept--> in_process --mark_ready--> ready --complete--> completed
/// in_queue --cancel--> cancelled   (also allowed from in_process)
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// 排队中 - 新建订单的初始状态
    InQueue,
    /// 制作中
    InProcess,
    /// 待取货
    Ready,
    /// 已完成
    Completed,
    /// 已取消
    Cancelled,
}

impl OrderStatus {
    /// Storage representation (matches the serde snake_case rename)
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::InQueue => "in_queue",
            OrderStatus::InProcess => "in_process",
            OrderStatus::Ready => "ready",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal states permit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Resulting status if `action` is legal from `self`, `None` otherwise
    pub fn apply(&self, action: LifecycleAction) -> Option<OrderStatus> {
        match (self, action) {
            (OrderStatus::InQueue, LifecycleAction::Accept) => Some(OrderStatus::InProcess),
            (OrderStatus::InProcess, LifecycleAction::MarkReady) => Some(OrderStatus::Ready),
            (OrderStatus::Ready, LifecycleAction::Complete) => Some(OrderStatus::Completed),
            (OrderStatus::InQueue | OrderStatus::InProcess, LifecycleAction::Cancel) => {
                Some(OrderStatus::Cancelled)
            }
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_queue" => Ok(OrderStatus::InQueue),
            "in_process" => Ok(OrderStatus::InProcess),
            "ready" => Ok(OrderStatus::Ready),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

// ============================================================================
// Lifecycle Actions
// ============================================================================

/// 合作方可请求的生命周期操作
///
/// Deletion of a completed order is cleanup, not a transition, and is
/// intentionally not part of this enum.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Accept,
    MarkReady,
    Complete,
    Cancel,
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleAction::Accept => "accept",
            LifecycleAction::MarkReady => "mark_ready",
            LifecycleAction::Complete => "complete",
            LifecycleAction::Cancel => "cancel",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_path_is_accepted() {
        assert_eq!(
            OrderStatus::InQueue.apply(LifecycleAction::Accept),
            Some(OrderStatus::InProcess)
        );
        assert_eq!(
            OrderStatus::InProcess.apply(LifecycleAction::MarkReady),
            Some(OrderStatus::Ready)
        );
        assert_eq!(
            OrderStatus::Ready.apply(LifecycleAction::Complete),
            Some(OrderStatus::Completed)
        );
    }

    #[test]
    fn cancel_only_before_ready() {
        assert_eq!(
            OrderStatus::InQueue.apply(LifecycleAction::Cancel),
            Some(OrderStatus::Cancelled)
        );
        assert_eq!(
            OrderStatus::InProcess.apply(LifecycleAction::Cancel),
            Some(OrderStatus::Cancelled)
        );
        assert_eq!(OrderStatus::Ready.apply(LifecycleAction::Cancel), None);
        assert_eq!(OrderStatus::Completed.apply(LifecycleAction::Cancel), None);
        assert_eq!(OrderStatus::Cancelled.apply(LifecycleAction::Cancel), None);
    }

    #[test]
    fn no_skipping_states() {
        // complete is only valid from ready
        assert_eq!(OrderStatus::InQueue.apply(LifecycleAction::Complete), None);
        assert_eq!(OrderStatus::InProcess.apply(LifecycleAction::Complete), None);
        // mark_ready only from in_process
        assert_eq!(OrderStatus::InQueue.apply(LifecycleAction::MarkReady), None);
        // accept only from in_queue
        assert_eq!(OrderStatus::InProcess.apply(LifecycleAction::Accept), None);
        assert_eq!(OrderStatus::Ready.apply(LifecycleAction::Accept), None);
    }

    #[test]
    fn terminal_states_reject_everything() {
        for action in [
            LifecycleAction::Accept,
            LifecycleAction::MarkReady,
            LifecycleAction::Complete,
            LifecycleAction::Cancel,
        ] {
            assert_eq!(OrderStatus::Completed.apply(action), None);
            assert_eq!(OrderStatus::Cancelled.apply(action), None);
        }
    }

    #[test]
    fn wire_format_round_trip() {
        for status in [
            OrderStatus::InQueue,
            OrderStatus::InProcess,
            OrderStatus::Ready,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            let parsed: OrderStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
            // serde agrees with as_str
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
        assert!("IN_QUEUE".parse::<OrderStatus>().is_err());
    }
}
