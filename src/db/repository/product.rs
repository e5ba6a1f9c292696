//! Product Repository
//!
//! Product CRUD plus the stock ledger primitive: an atomic conditional
//! decrement of `quantity_in_stock`. The check and the decrement are one
//! storage round trip, so two concurrent sales can never both pass the
//! stock check before either deducts.

use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use surrealdb::sql::{Datetime, Thing};

use super::{BaseRepository, RepoError, RepoResult};
use crate::db::models::{Product, ProductCreate, ProductUpdate};

const PRODUCT_TABLE: &str = "product";

/// The conditional-decrement statement, as one line of a larger
/// transaction. `$pid{idx}` / `$qty{idx}` are bound per item; the updated
/// row lands in `$p{idx}`. An empty result means the product was missing,
/// inactive, foreign-owned or short on stock - the caller must treat all of
/// those as one failure.
pub(crate) fn reserve_stock_statement(idx: usize) -> String {
    format!(
        "LET $p{idx} = (UPDATE product \
         SET quantity_in_stock -= $qty{idx}, updated_at = time::now() \
         WHERE id = $pid{idx} AND owner = $owner AND is_active = true \
         AND quantity_in_stock >= $qty{idx} \
         RETURN AFTER);\n"
    )
}

// =============================================================================
// Product Repository
// =============================================================================

#[derive(Clone)]
pub struct ProductRepository {
    base: BaseRepository,
}

impl ProductRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Atomically reserve `quantity` units of a product.
    ///
    /// Returns the post-update product snapshot (with current prices for
    /// downstream costing), or `None` when the conditional update matched
    /// nothing. Never partially applies.
    pub async fn reserve_stock(
        &self,
        owner: &Thing,
        product_id: &Thing,
        quantity: i64,
    ) -> RepoResult<Option<Product>> {
        if quantity <= 0 {
            return Err(RepoError::Validation(
                "quantity must be a positive integer".into(),
            ));
        }

        let mut result = self
            .base
            .db()
            .query(
                "UPDATE product \
                 SET quantity_in_stock -= $qty, updated_at = time::now() \
                 WHERE id = $pid AND owner = $owner AND is_active = true \
                 AND quantity_in_stock >= $qty \
                 RETURN AFTER",
            )
            .bind(("pid", product_id.clone()))
            .bind(("owner", owner.clone()))
            .bind(("qty", quantity))
            .await?
            .check()?;
        let updated: Vec<Product> = result.take(0)?;
        Ok(updated.into_iter().next())
    }

    /// Find all active products for an owner
    pub async fn find_all(&self, owner: &Thing) -> RepoResult<Vec<Product>> {
        let mut result = self
            .base
            .db()
            .query(
                "SELECT * FROM product \
                 WHERE owner = $owner AND is_active = true \
                 ORDER BY name",
            )
            .bind(("owner", owner.clone()))
            .await?
            .check()?;
        let products: Vec<Product> = result.take(0)?;
        Ok(products)
    }

    /// Find one active product; foreign or inactive records read as absent
    pub async fn find_by_id(&self, owner: &Thing, id: &Thing) -> RepoResult<Option<Product>> {
        let mut result = self
            .base
            .db()
            .query(
                "SELECT * FROM product \
                 WHERE id = $id AND owner = $owner AND is_active = true",
            )
            .bind(("id", id.clone()))
            .bind(("owner", owner.clone()))
            .await?
            .check()?;
        let products: Vec<Product> = result.take(0)?;
        Ok(products.into_iter().next())
    }

    /// Create a new product
    pub async fn create(&self, owner: &Thing, data: ProductCreate) -> RepoResult<Product> {
        let now = Datetime::default();
        let product = Product {
            id: None,
            owner: owner.clone(),
            name: data.name,
            sku: data.sku,
            cost_price: data.cost_price,
            selling_price: data.selling_price,
            quantity_in_stock: data.quantity_in_stock,
            is_active: true,
            created_at: now.clone(),
            updated_at: now,
        };

        let created: Option<Product> = self
            .base
            .db()
            .create(PRODUCT_TABLE)
            .content(product)
            .await?;

        created.ok_or_else(|| RepoError::Database("Failed to create product".to_string()))
    }

    /// Partially update a product
    pub async fn update(
        &self,
        owner: &Thing,
        id: &Thing,
        data: ProductUpdate,
    ) -> RepoResult<Product> {
        // Build dynamic SET clauses so untouched fields stay untouched
        let mut set_parts: Vec<&str> = vec!["updated_at = time::now()"];

        if data.name.is_some() {
            set_parts.push("name = $name");
        }
        if data.sku.is_some() {
            set_parts.push("sku = $sku");
        }
        if data.cost_price.is_some() {
            set_parts.push("cost_price = $cost_price");
        }
        if data.selling_price.is_some() {
            set_parts.push("selling_price = $selling_price");
        }
        if data.quantity_in_stock.is_some() {
            set_parts.push("quantity_in_stock = $quantity_in_stock");
        }

        let query_str = format!(
            "UPDATE product SET {} \
             WHERE id = $id AND owner = $owner AND is_active = true \
             RETURN AFTER",
            set_parts.join(", ")
        );

        let mut query = self
            .base
            .db()
            .query(query_str)
            .bind(("id", id.clone()))
            .bind(("owner", owner.clone()));

        if let Some(v) = data.name {
            query = query.bind(("name", v));
        }
        if let Some(v) = data.sku {
            query = query.bind(("sku", v));
        }
        if let Some(v) = data.cost_price {
            query = query.bind(("cost_price", v));
        }
        if let Some(v) = data.selling_price {
            query = query.bind(("selling_price", v));
        }
        if let Some(v) = data.quantity_in_stock {
            query = query.bind(("quantity_in_stock", v));
        }

        let mut result = query.await?.check()?;
        let products: Vec<Product> = result.take(0)?;

        products
            .into_iter()
            .next()
            .ok_or_else(|| RepoError::NotFound(format!("Product {} not found", id)))
    }

    /// Soft delete: mark inactive, keep the record. There is no
    /// reactivation path; inactive is terminal.
    pub async fn soft_delete(&self, owner: &Thing, id: &Thing) -> RepoResult<()> {
        let mut result = self
            .base
            .db()
            .query(
                "UPDATE product \
                 SET is_active = false, updated_at = time::now() \
                 WHERE id = $id AND owner = $owner AND is_active = true \
                 RETURN AFTER",
            )
            .bind(("id", id.clone()))
            .bind(("owner", owner.clone()))
            .await?
            .check()?;
        let products: Vec<Product> = result.take(0)?;

        if products.is_empty() {
            return Err(RepoError::NotFound(format!("Product {} not found", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::db::repository::owner_thing;

    async fn setup() -> (Surreal<Db>, Thing) {
        let db = db::connect_memory().await.unwrap();
        (db, owner_thing("owner1"))
    }

    fn sample_product(sku: &str, stock: i64) -> ProductCreate {
        ProductCreate {
            name: "Bag of rice".to_string(),
            sku: sku.to_string(),
            cost_price: 100.0,
            selling_price: 150.0,
            quantity_in_stock: stock,
        }
    }

    #[tokio::test]
    async fn test_reserve_stock_decrements_and_returns_snapshot() {
        let (db, owner) = setup().await;
        let repo = ProductRepository::new(db);
        let product = repo.create(&owner, sample_product("RICE-1", 10)).await.unwrap();
        let id = product.id.unwrap();

        let updated = repo.reserve_stock(&owner, &id, 4).await.unwrap().unwrap();
        assert_eq!(updated.quantity_in_stock, 6);
        assert_eq!(updated.cost_price, 100.0);
        assert_eq!(updated.selling_price, 150.0);
    }

    #[tokio::test]
    async fn test_reserve_stock_insufficient_leaves_quantity_unchanged() {
        let (db, owner) = setup().await;
        let repo = ProductRepository::new(db);
        let product = repo.create(&owner, sample_product("RICE-1", 3)).await.unwrap();
        let id = product.id.unwrap();

        let reserved = repo.reserve_stock(&owner, &id, 4).await.unwrap();
        assert!(reserved.is_none());

        let current = repo.find_by_id(&owner, &id).await.unwrap().unwrap();
        assert_eq!(current.quantity_in_stock, 3);
    }

    #[tokio::test]
    async fn test_reserve_stock_rejects_non_positive_quantity() {
        let (db, owner) = setup().await;
        let repo = ProductRepository::new(db);
        let product = repo.create(&owner, sample_product("RICE-1", 3)).await.unwrap();
        let id = product.id.unwrap();

        assert!(matches!(
            repo.reserve_stock(&owner, &id, 0).await,
            Err(RepoError::Validation(_))
        ));
        assert!(matches!(
            repo.reserve_stock(&owner, &id, -2).await,
            Err(RepoError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_reserve_stock_ignores_foreign_and_inactive_products() {
        let (db, owner) = setup().await;
        let repo = ProductRepository::new(db.clone());
        let product = repo.create(&owner, sample_product("RICE-1", 10)).await.unwrap();
        let id = product.id.unwrap();

        let stranger = owner_thing("owner2");
        assert!(repo.reserve_stock(&stranger, &id, 1).await.unwrap().is_none());

        repo.soft_delete(&owner, &id).await.unwrap();
        assert!(repo.reserve_stock(&owner, &id, 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_sku_per_owner_is_rejected() {
        let (db, owner) = setup().await;
        let repo = ProductRepository::new(db);
        repo.create(&owner, sample_product("RICE-1", 10)).await.unwrap();

        let result = repo.create(&owner, sample_product("RICE-1", 5)).await;
        assert!(matches!(result, Err(RepoError::Duplicate(_))));

        // same SKU under a different owner is fine
        let other = owner_thing("owner2");
        assert!(repo.create(&other, sample_product("RICE-1", 5)).await.is_ok());
    }

    #[tokio::test]
    async fn test_soft_delete_hides_product_from_reads() {
        let (db, owner) = setup().await;
        let repo = ProductRepository::new(db);
        let product = repo.create(&owner, sample_product("RICE-1", 10)).await.unwrap();
        let id = product.id.unwrap();

        repo.soft_delete(&owner, &id).await.unwrap();

        assert!(repo.find_by_id(&owner, &id).await.unwrap().is_none());
        assert!(repo.find_all(&owner).await.unwrap().is_empty());

        // already-deleted products cannot be deleted again
        assert!(matches!(
            repo.soft_delete(&owner, &id).await,
            Err(RepoError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_is_owner_scoped() {
        let (db, owner) = setup().await;
        let repo = ProductRepository::new(db);
        let product = repo.create(&owner, sample_product("RICE-1", 10)).await.unwrap();
        let id = product.id.unwrap();

        let stranger = owner_thing("owner2");
        let result = repo
            .update(
                &stranger,
                &id,
                ProductUpdate {
                    selling_price: Some(999.0),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(RepoError::NotFound(_))));

        // owner's own update goes through and leaves other fields alone
        let updated = repo
            .update(
                &owner,
                &id,
                ProductUpdate {
                    selling_price: Some(180.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.selling_price, 180.0);
        assert_eq!(updated.cost_price, 100.0);
        assert_eq!(updated.quantity_in_stock, 10);
    }
}
