//! Product Model

use serde::{Deserialize, Serialize};
use surrealdb::sql::{Datetime, Thing};

pub type ProductId = Thing;

/// Product owned by a business account
///
/// `quantity_in_stock` is the only contended field: it is decremented
/// exclusively through the repository's conditional update, never by a
/// read-then-write sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Option<ProductId>,
    /// Record link to the owning user
    pub owner: Thing,
    pub name: String,
    /// Unique per owner
    pub sku: String,
    pub cost_price: f64,
    pub selling_price: f64,
    pub quantity_in_stock: i64,
    /// Soft-delete flag; inactive products are invisible and unsellable
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: Datetime,
    pub updated_at: Datetime,
}

fn default_true() -> bool {
    true
}

/// Fields accepted when creating a product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    pub sku: String,
    pub cost_price: f64,
    pub selling_price: f64,
    pub quantity_in_stock: i64,
}

/// Partial product update; `None` fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub cost_price: Option<f64>,
    pub selling_price: Option<f64>,
    pub quantity_in_stock: Option<i64>,
}
