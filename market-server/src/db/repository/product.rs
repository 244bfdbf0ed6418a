//! Product Repository
//!
//! Read-only lookups over the catalog mirror. The external catalog service
//! owns writes to this table; checkout treats a row here as authoritative
//! at call time.

use super::RepoResult;
use crate::catalog::CatalogProduct;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find product by id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<CatalogProduct>> {
        let product: Option<CatalogProduct> = sqlx::query_as(
            "SELECT id, partner_id, name, price_cents, is_available FROM products WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;

    #[tokio::test]
    async fn lookup_round_trip() {
        let db = DbService::open_in_memory().await.unwrap();
        sqlx::query(
            "INSERT INTO products (id, partner_id, name, price_cents, is_available) \
             VALUES ('p1', 'partner-1', 'Espresso', 250, 1)",
        )
        .execute(&db.pool)
        .await
        .unwrap();

        let repo = ProductRepository::new(db.pool);
        let product = repo.find_by_id("p1").await.unwrap().unwrap();
        assert_eq!(product.partner_id, "partner-1");
        assert_eq!(product.price_cents, 250);
        assert!(product.is_available);

        assert!(repo.find_by_id("missing").await.unwrap().is_none());
    }
}
