//! Database Models

pub mod product;
pub mod sale;

pub use product::{Product, ProductCreate, ProductId, ProductUpdate};
pub use sale::{Sale, SaleId, SaleItem, SalesSummary};
