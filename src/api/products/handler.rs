//! Product API Handlers

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::convert::{datetime_to_string, option_thing_to_string, thing_to_string};
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{Product, ProductCreate, ProductUpdate};
use crate::db::repository::{ProductRepository, RepoError, make_thing, owner_thing};
use crate::utils::{AppError, AppResult};

// =============================================================================
// Payloads
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductPayload {
    #[validate(length(min = 1, message = "Product name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "SKU is required"))]
    pub sku: String,
    #[validate(range(min = 0.0, message = "Cost price cannot be negative"))]
    pub cost_price: f64,
    #[validate(range(min = 0.0, message = "Selling price cannot be negative"))]
    pub selling_price: f64,
    #[validate(range(min = 0, message = "Stock quantity cannot be negative"))]
    pub quantity_in_stock: i64,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductPayload {
    #[validate(length(min = 1, message = "Product name is required"))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "SKU is required"))]
    pub sku: Option<String>,
    #[validate(range(min = 0.0, message = "Cost price cannot be negative"))]
    pub cost_price: Option<f64>,
    #[validate(range(min = 0.0, message = "Selling price cannot be negative"))]
    pub selling_price: Option<f64>,
    #[validate(range(min = 0, message = "Stock quantity cannot be negative"))]
    pub quantity_in_stock: Option<i64>,
}

/// Flatten validator output into the API's field -> reason map,
/// with field names in the payload's camelCase form.
fn collect_validation_errors(errors: validator::ValidationErrors) -> BTreeMap<String, String> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let reason = errs
                .first()
                .and_then(|e| e.message.as_ref())
                .map(|m| m.to_string())
                .unwrap_or_else(|| "Invalid value".to_string());
            (snake_to_camel(&field), reason)
        })
        .collect()
}

fn snake_to_camel(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;
    for c in field.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

// =============================================================================
// Wire DTOs
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDto {
    pub id: Option<String>,
    pub user: String,
    pub name: String,
    pub sku: String,
    pub cost_price: f64,
    pub selling_price: f64,
    pub quantity_in_stock: i64,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Product> for ProductDto {
    fn from(p: Product) -> Self {
        Self {
            id: option_thing_to_string(&p.id),
            user: thing_to_string(&p.owner),
            name: p.name,
            sku: p.sku,
            cost_price: p.cost_price,
            selling_price: p.selling_price,
            quantity_in_stock: p.quantity_in_stock,
            is_active: p.is_active,
            created_at: datetime_to_string(&p.created_at),
            updated_at: datetime_to_string(&p.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub success: bool,
    pub data: ProductDto,
}

#[derive(Debug, Serialize)]
pub struct ListProductsResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<ProductDto>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

// =============================================================================
// Product Handlers
// =============================================================================

/// GET /api/products - all active products for the caller
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<ListProductsResponse>> {
    let repo = ProductRepository::new(state.get_db());
    let products = repo.find_all(&owner_thing(&user.id)).await?;

    Ok(Json(ListProductsResponse {
        success: true,
        count: products.len(),
        data: products.into_iter().map(Into::into).collect(),
    }))
}

/// GET /api/products/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ProductResponse>> {
    let repo = ProductRepository::new(state.get_db());
    let product = repo
        .find_by_id(&owner_thing(&user.id), &make_thing("product", &id))
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    Ok(Json(ProductResponse {
        success: true,
        data: product.into(),
    }))
}

/// POST /api/products - create a product
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<CreateProductPayload>,
) -> AppResult<(StatusCode, Json<ProductResponse>)> {
    payload
        .validate()
        .map_err(|e| AppError::validation(collect_validation_errors(e)))?;

    let repo = ProductRepository::new(state.get_db());
    let product = repo
        .create(
            &owner_thing(&user.id),
            ProductCreate {
                name: payload.name,
                sku: payload.sku,
                cost_price: payload.cost_price,
                selling_price: payload.selling_price,
                quantity_in_stock: payload.quantity_in_stock,
            },
        )
        .await
        .map_err(|e| match e {
            RepoError::Duplicate(_) => {
                AppError::conflict("Product with this SKU already exists")
            }
            other => other.into(),
        })?;

    Ok((
        StatusCode::CREATED,
        Json(ProductResponse {
            success: true,
            data: product.into(),
        }),
    ))
}

/// PUT /api/products/{id} - partial update
pub async fn update(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateProductPayload>,
) -> AppResult<Json<ProductResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(collect_validation_errors(e)))?;

    let repo = ProductRepository::new(state.get_db());
    let product = repo
        .update(
            &owner_thing(&user.id),
            &make_thing("product", &id),
            ProductUpdate {
                name: payload.name,
                sku: payload.sku,
                cost_price: payload.cost_price,
                selling_price: payload.selling_price,
                quantity_in_stock: payload.quantity_in_stock,
            },
        )
        .await
        .map_err(|e| match e {
            RepoError::NotFound(_) => AppError::not_found("Product not found"),
            RepoError::Duplicate(_) => {
                AppError::conflict("Product with this SKU already exists")
            }
            other => other.into(),
        })?;

    Ok(Json(ProductResponse {
        success: true,
        data: product.into(),
    }))
}

/// DELETE /api/products/{id} - soft delete
pub async fn delete(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let repo = ProductRepository::new(state.get_db());
    repo.soft_delete(&owner_thing(&user.id), &make_thing("product", &id))
        .await
        .map_err(|e| match e {
            RepoError::NotFound(_) => AppError::not_found("Product not found"),
            other => other.into(),
        })?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Product deleted successfully",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_use_camel_case_keys() {
        let payload = CreateProductPayload {
            name: "".to_string(),
            sku: "".to_string(),
            cost_price: -1.0,
            selling_price: 10.0,
            quantity_in_stock: -5,
        };

        let errors = collect_validation_errors(payload.validate().unwrap_err());
        assert_eq!(errors["name"], "Product name is required");
        assert_eq!(errors["sku"], "SKU is required");
        assert_eq!(errors["costPrice"], "Cost price cannot be negative");
        assert_eq!(errors["quantityInStock"], "Stock quantity cannot be negative");
        assert!(!errors.contains_key("sellingPrice"));
    }

    #[test]
    fn test_snake_to_camel() {
        assert_eq!(snake_to_camel("quantity_in_stock"), "quantityInStock");
        assert_eq!(snake_to_camel("name"), "name");
    }
}
