//! Checkout request and report types
//!
//! A cart may span several partners. The server partitions it into one
//! checkout group per partner and reports one outcome per group, so the
//! client can clear exactly the lines whose group succeeded.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// 购物车行 - 客户端持有，结账时提交
///
/// The client-supplied `unit_price_cents` is display state only; the server
/// re-reads price and availability from the catalog before creating orders.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CartLine {
    /// Product ID
    pub product_id: String,
    /// Partner the product belongs to (per the client's catalog view)
    pub partner_id: String,
    /// Quantity (a line with quantity 0 is removed client-side, never sent)
    #[validate(range(min = 1))]
    pub quantity: i64,
    /// Price the client last saw, in cents. Never trusted.
    pub unit_price_cents: i64,
}

/// 结账请求
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1), nested)]
    pub lines: Vec<CartLine>,
}

/// Why a single partner group failed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutFailureCode {
    /// Product no longer exists in the catalog
    ProductNotFound,
    /// Product exists but is flagged unavailable
    ProductUnavailable,
    /// Catalog lookup timed out or failed (transient, retry the checkout)
    CatalogUnavailable,
    /// Line was filed under a partner the product does not belong to
    PartnerMismatch,
    /// Order store write failed
    StoreError,
}

/// A failed checkout group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutFailure {
    pub code: CheckoutFailureCode,
    /// Offending product, when the failure is about one line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    pub message: String,
}

/// Outcome of one partner group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupOutcome<O> {
    pub partner_id: String,
    #[serde(flatten)]
    pub result: GroupResult<O>,
}

/// Created order or typed failure, per group
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupResult<O> {
    Order(O),
    Failure(CheckoutFailure),
}

/// 结账报告 - 每个合作方分组一个结果
///
/// Group order is unspecified; groups are keyed by `partner_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutReport<O> {
    pub outcomes: Vec<GroupOutcome<O>>,
}

impl<O> CheckoutReport<O> {
    /// Partner ids whose group produced an order (client clears those lines)
    pub fn succeeded_partners(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.result, GroupResult::Order(_)))
            .map(|o| o.partner_id.as_str())
            .collect()
    }

    pub fn is_full_success(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| matches!(o.result, GroupResult::Order(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn zero_quantity_line_is_rejected() {
        let line = CartLine {
            product_id: "p1".into(),
            partner_id: "partner-1".into(),
            quantity: 0,
            unit_price_cents: 100,
        };
        assert!(line.validate().is_err());
    }

    #[test]
    fn empty_cart_is_rejected() {
        let req = CheckoutRequest { lines: vec![] };
        assert!(req.validate().is_err());
    }

    #[test]
    fn report_partitions_success_and_failure() {
        let report = CheckoutReport {
            outcomes: vec![
                GroupOutcome {
                    partner_id: "partner-1".into(),
                    result: GroupResult::Order("order-1".to_string()),
                },
                GroupOutcome {
                    partner_id: "partner-2".into(),
                    result: GroupResult::Failure(CheckoutFailure {
                        code: CheckoutFailureCode::ProductUnavailable,
                        product_id: Some("p9".into()),
                        message: "Product p9 is not available".into(),
                    }),
                },
            ],
        };
        assert_eq!(report.succeeded_partners(), vec!["partner-1"]);
        assert!(!report.is_full_success());
    }
}
