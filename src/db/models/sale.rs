//! Sale Model
//!
//! A sale is written once by the sale transaction and never mutated. Line
//! items are snapshots: they capture the product's name, SKU and prices at
//! sale time and stay fixed through later product edits.

use serde::{Deserialize, Serialize};
use surrealdb::sql::{Datetime, Thing};

pub type SaleId = Thing;

/// One product+quantity line within a sale, with its financial snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleItem {
    /// Record link to the sold product
    pub product: Thing,
    pub product_name: String,
    pub sku: String,
    pub quantity: i64,
    pub unit_cost_price: f64,
    pub unit_selling_price: f64,
    pub line_revenue: f64,
    pub line_cost: f64,
    /// May be negative; negative-margin sales are not rejected
    pub line_gross_profit: f64,
}

/// Immutable sale record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sale {
    pub id: Option<SaleId>,
    /// Record link to the owning user
    pub owner: Thing,
    pub items: Vec<SaleItem>,
    pub total_revenue: f64,
    pub total_cost: f64,
    pub gross_profit: f64,
    pub sale_date: Datetime,
    pub created_at: Datetime,
    pub updated_at: Datetime,
}

/// Owner-level aggregation over all committed sales
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SalesSummary {
    #[serde(default)]
    pub total_revenue: f64,
    #[serde(default)]
    pub total_cost: f64,
    #[serde(default)]
    pub gross_profit: f64,
    #[serde(default)]
    pub total_sales_count: i64,
}
