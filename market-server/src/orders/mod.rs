//! 订单生命周期模块
//!
//! - [`OrderLifecycle`] - 状态机引擎，订单状态的唯一写入方

pub mod lifecycle;

pub use lifecycle::{LifecycleError, OrderLifecycle};
