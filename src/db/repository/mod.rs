//! Repository Module
//!
//! Data access for the product and sale tables. All operations are
//! owner-scoped: a record belonging to another owner behaves exactly like a
//! missing record.

pub mod product;
pub mod sale;

pub use product::ProductRepository;
pub use sale::{SaleLineInput, SaleRepository};

use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use surrealdb::sql::Thing;
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// Business failure from the sale transaction, naming the offending
    /// product. Covers missing, inactive, foreign-owned and out-of-stock
    /// products alike so callers cannot probe other owners' catalogs.
    #[error("{0}")]
    InsufficientStock(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<surrealdb::Error> for RepoError {
    fn from(err: surrealdb::Error) -> Self {
        let msg = err.to_string();

        // THROWN by the sale transaction when a conditional decrement
        // matched nothing; surface it as the business error it is.
        if let Some(pos) = msg.find(sale::INSUFFICIENT_STOCK) {
            return RepoError::InsufficientStock(msg[pos..].to_string());
        }

        // Unique index violation (owner+sku)
        if msg.contains("already contains") {
            return RepoError::Duplicate(msg);
        }

        RepoError::Database(msg)
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Engine-level conflicts that are safe to retry. Business failures are
/// never classified as retryable.
pub fn is_retryable(err: &RepoError) -> bool {
    matches!(
        err,
        RepoError::Database(msg)
            if msg.contains("can be retried") || msg.contains("Resource busy")
    )
}

/// Strip a `table:` prefix from an id if present
pub fn strip_table_prefix<'a>(table: &str, id: &'a str) -> &'a str {
    match id.strip_prefix(table) {
        Some(rest) => rest.strip_prefix(':').unwrap_or(id),
        None => id,
    }
}

/// Build a record id for `table`, accepting both `"table:abc"` and `"abc"`
pub fn make_thing(table: &str, id: &str) -> Thing {
    Thing::from((table, strip_table_prefix(table, id)))
}

/// Record id for the owning user resolved by the auth layer
pub fn owner_thing(user_id: &str) -> Thing {
    make_thing("user", user_id)
}

/// Base repository with database reference
#[derive(Clone)]
pub struct BaseRepository {
    db: Surreal<Db>,
}

impl BaseRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Surreal<Db> {
        &self.db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_table_prefix() {
        assert_eq!(strip_table_prefix("product", "product:abc"), "abc");
        assert_eq!(strip_table_prefix("product", "abc"), "abc");
        // a different table's prefix is not stripped
        assert_eq!(strip_table_prefix("product", "sale:abc"), "sale:abc");
    }

    #[test]
    fn test_make_thing_roundtrip() {
        let thing = make_thing("product", "product:abc");
        assert_eq!(thing.tb, "product");
        assert_eq!(thing.id.to_raw(), "abc");
    }

    #[test]
    fn test_retryable_classification() {
        let conflict = RepoError::Database(
            "Failed to commit transaction due to a read or write conflict. This transaction can be retried".into(),
        );
        assert!(is_retryable(&conflict));

        let stock = RepoError::InsufficientStock("Insufficient stock".into());
        assert!(!is_retryable(&stock));

        let other = RepoError::Database("table does not exist".into());
        assert!(!is_retryable(&other));
    }
}
