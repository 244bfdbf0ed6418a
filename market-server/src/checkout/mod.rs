//! Checkout Orchestrator
//!
//! Turns a multi-partner cart into one durable order per partner.
//!
//! # Checkout Flow
//!
//! ```text
//! checkout(customer, request)
//!     ├─ 1. Partition cart lines by partner_id
//!     ├─ 2. Fan out per group (bounded concurrency), each group:
//!     │      ├─ re-fetch every product from the catalog
//!     │      ├─ reject: missing / unavailable / wrong partner / timeout
//!     │      ├─ accumulate total from the FRESH unit prices
//!     │      └─ create one order (status in_queue, snapshot items, token)
//!     ├─ 3. Collect one outcome per group (failures never abort siblings)
//!     └─ 4. Broadcast order_update for each created order (best-effort)
//! ```
//!
//! A cart spanning N partners must not let one partner's stale or
//! unavailable item block orders to the other N-1 partners, so each group
//! succeeds or fails on its own and the report says which did what.

use futures::StreamExt;
use futures::stream;
use shared::cart::{
    CartLine, CheckoutFailure, CheckoutFailureCode, CheckoutReport, CheckoutRequest, GroupOutcome,
    GroupResult,
};
use shared::message::NotifyEvent;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::auth::CurrentUser;
use crate::catalog::{CatalogError, CatalogGateway};
use crate::db::models::{NewOrderItem, Order};
use crate::db::repository::OrderRepository;
use crate::notify::NotifyHub;

/// Upper bound on partner groups processed at once
const MAX_GROUP_CONCURRENCY: usize = 8;

/// 结账编排器
#[derive(Clone)]
pub struct CheckoutOrchestrator {
    catalog: Arc<dyn CatalogGateway>,
    repo: OrderRepository,
    hub: NotifyHub,
}

/// Partition cart lines into one group per partner
///
/// A pure partition on partner identity: group order is irrelevant (sorted
/// here for determinism), line order within a group is preserved so item
/// rows keep the cart's ordering.
pub fn group_by_partner(lines: &[CartLine]) -> Vec<(String, Vec<CartLine>)> {
    let mut groups: BTreeMap<String, Vec<CartLine>> = BTreeMap::new();
    for line in lines {
        groups
            .entry(line.partner_id.clone())
            .or_default()
            .push(line.clone());
    }
    groups.into_iter().collect()
}

impl CheckoutOrchestrator {
    pub fn new(catalog: Arc<dyn CatalogGateway>, repo: OrderRepository, hub: NotifyHub) -> Self {
        Self { catalog, repo, hub }
    }

    /// Check out a cart for `customer`, one outcome per partner group
    pub async fn checkout(
        &self,
        customer: &CurrentUser,
        request: CheckoutRequest,
    ) -> CheckoutReport<Order> {
        let groups = group_by_partner(&request.lines);
        tracing::info!(
            customer = %customer.id,
            groups = groups.len(),
            lines = request.lines.len(),
            "checkout started"
        );

        let outcomes = stream::iter(groups)
            .map(|(partner_id, lines)| {
                let customer_id = customer.id.clone();
                async move {
                    let result = match self.build_order(&customer_id, &partner_id, &lines).await {
                        Ok(order) => {
                            self.announce(&order);
                            GroupResult::Order(order)
                        }
                        Err(failure) => {
                            tracing::warn!(
                                partner_id = %partner_id,
                                code = ?failure.code,
                                "checkout group failed: {}",
                                failure.message
                            );
                            GroupResult::Failure(failure)
                        }
                    };
                    GroupOutcome { partner_id, result }
                }
            })
            .buffer_unordered(MAX_GROUP_CONCURRENCY)
            .collect::<Vec<_>>()
            .await;

        CheckoutReport { outcomes }
    }

    /// Validate one partner group against the catalog and create its order
    ///
    /// No durable write happens unless every line passes; the order row and
    /// its item snapshots are committed in a single transaction.
    async fn build_order(
        &self,
        customer_id: &str,
        partner_id: &str,
        lines: &[CartLine],
    ) -> Result<Order, CheckoutFailure> {
        let mut items = Vec::with_capacity(lines.len());

        for line in lines {
            let product = match self.catalog.get_product(&line.product_id).await {
                Ok(product) => product,
                Err(CatalogError::NotFound(id)) => {
                    return Err(CheckoutFailure {
                        code: CheckoutFailureCode::ProductNotFound,
                        product_id: Some(id.clone()),
                        message: format!("Product {id} not found"),
                    });
                }
                Err(CatalogError::Unavailable(msg)) => {
                    return Err(CheckoutFailure {
                        code: CheckoutFailureCode::CatalogUnavailable,
                        product_id: Some(line.product_id.clone()),
                        message: msg,
                    });
                }
            };

            if product.partner_id != partner_id {
                return Err(CheckoutFailure {
                    code: CheckoutFailureCode::PartnerMismatch,
                    product_id: Some(product.id),
                    message: "Product does not belong to this partner".to_string(),
                });
            }

            if !product.is_available {
                return Err(CheckoutFailure {
                    code: CheckoutFailureCode::ProductUnavailable,
                    product_id: Some(product.id.clone()),
                    message: format!("Product {} is not available", product.name),
                });
            }

            // snapshot the freshly fetched price, never line.unit_price_cents
            items.push(NewOrderItem {
                product_id: product.id,
                quantity: line.quantity,
                unit_price_cents: product.price_cents,
            });
        }

        self.repo
            .create_order(partner_id, customer_id, &items)
            .await
            .map_err(|e| CheckoutFailure {
                code: CheckoutFailureCode::StoreError,
                product_id: None,
                message: e.to_string(),
            })
    }

    /// Creation event to partner and customer; delivery is best-effort
    fn announce(&self, order: &Order) {
        let event = NotifyEvent::order_update(&order.id);
        self.hub.publish(&order.partner_id, &event);
        self.hub.publish(&order.customer_id, &event);
    }
}
