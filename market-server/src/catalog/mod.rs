//! Catalog Gateway
//!
//! 结账时对商品价格/可用性的唯一事实来源。客户端提交的价格永远
//! 不被信任；每条购物车行都要在这里重新取价。
//!
//! The gateway may be remote and slow, so every lookup is bounded by a
//! timeout; a timeout or backend failure surfaces as
//! [`CatalogError::Unavailable`], which checkout reports per group as a
//! transient, retriable failure.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::time::Duration;
use thiserror::Error;

use crate::db::repository::ProductRepository;

/// Product record as the catalog reports it
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CatalogProduct {
    pub id: String,
    pub partner_id: String,
    pub name: String,
    pub price_cents: i64,
    pub is_available: bool,
}

/// Catalog lookup failures
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Product not found: {0}")]
    NotFound(String),

    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
}

/// Read-only product lookup by id
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    async fn get_product(&self, id: &str) -> Result<CatalogProduct, CatalogError>;
}

/// Catalog gateway backed by the local catalog mirror
pub struct DbCatalog {
    products: ProductRepository,
    timeout: Duration,
}

impl DbCatalog {
    pub fn new(products: ProductRepository, timeout: Duration) -> Self {
        Self { products, timeout }
    }
}

#[async_trait]
impl CatalogGateway for DbCatalog {
    async fn get_product(&self, id: &str) -> Result<CatalogProduct, CatalogError> {
        let lookup = self.products.find_by_id(id);
        match tokio::time::timeout(self.timeout, lookup).await {
            Err(_elapsed) => Err(CatalogError::Unavailable(format!(
                "catalog lookup timed out after {:?}",
                self.timeout
            ))),
            Ok(Err(e)) => Err(CatalogError::Unavailable(e.to_string())),
            Ok(Ok(None)) => Err(CatalogError::NotFound(id.to_string())),
            Ok(Ok(Some(product))) => Ok(product),
        }
    }
}
