//! Sale API Handlers
//!
//! Payload validation happens here, before anything touches the store, and
//! reports every bad field at once as a field -> reason map. The repository
//! only ever sees well-formed line items.

use std::collections::{BTreeMap, BTreeSet};

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::api::convert::{datetime_to_string, option_thing_to_string, thing_to_string};
use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{Sale, SaleItem};
use crate::db::repository::{SaleLineInput, SaleRepository, make_thing, owner_thing};
use crate::utils::{AppError, AppResult};

// =============================================================================
// Payloads
// =============================================================================

/// POST /api/sales request body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSalePayload {
    #[serde(default)]
    pub items: Vec<SaleItemPayload>,
    pub sale_date: Option<String>,
}

/// One requested line item. Loosely typed on purpose: a missing or
/// fractional quantity must surface as a field error, not a decode failure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleItemPayload {
    pub product_id: Option<String>,
    pub quantity: Option<f64>,
}

/// GET /api/sales query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ListSalesQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

// =============================================================================
// Validation
// =============================================================================

/// Parse an ISO date string: full RFC 3339, or a bare `YYYY-MM-DD` taken as
/// midnight UTC (end of day when `end_of_day`, so date-only upper bounds
/// stay inclusive).
fn parse_date(value: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    let time = if end_of_day {
        date.and_hms_milli_opt(23, 59, 59, 999)?
    } else {
        date.and_hms_opt(0, 0, 0)?
    };
    Some(time.and_utc())
}

/// Validate the create-sale payload into repository inputs.
///
/// Collects every field failure instead of stopping at the first one; keys
/// follow the payload shape (`items[2].quantity`, `saleDate`).
fn validate_create_payload(
    payload: &CreateSalePayload,
) -> Result<(Vec<SaleLineInput>, DateTime<Utc>), BTreeMap<String, String>> {
    let mut errors = BTreeMap::new();
    let mut lines = Vec::with_capacity(payload.items.len());
    let mut seen = BTreeSet::new();

    if payload.items.is_empty() {
        errors.insert(
            "items".to_string(),
            "At least one sale item is required".to_string(),
        );
    }

    for (i, item) in payload.items.iter().enumerate() {
        let id = item
            .product_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.contains(char::is_whitespace));

        let product = match id {
            None => {
                errors.insert(
                    format!("items[{i}].productId"),
                    "Valid productId is required".to_string(),
                );
                None
            }
            Some(id) => {
                let thing = make_thing("product", id);
                if seen.insert(thing.clone()) {
                    Some(thing)
                } else {
                    errors.insert(
                        format!("items[{i}].productId"),
                        "Duplicate product in sale items is not allowed".to_string(),
                    );
                    None
                }
            }
        };

        let quantity = match item.quantity {
            None => {
                errors.insert(
                    format!("items[{i}].quantity"),
                    "Quantity is required".to_string(),
                );
                None
            }
            Some(q) if !q.is_finite() || q.fract() != 0.0 || q < 1.0 => {
                errors.insert(
                    format!("items[{i}].quantity"),
                    "Quantity must be a positive integer".to_string(),
                );
                None
            }
            Some(q) => Some(q as i64),
        };

        if let (Some(product), Some(quantity)) = (product, quantity) {
            lines.push(SaleLineInput { product, quantity });
        }
    }

    let sale_date = match payload.sale_date.as_deref() {
        None => Utc::now(),
        Some(raw) => match parse_date(raw, false) {
            None => {
                errors.insert(
                    "saleDate".to_string(),
                    "Sale date must be a valid date".to_string(),
                );
                Utc::now()
            }
            Some(dt) if dt > Utc::now() => {
                errors.insert(
                    "saleDate".to_string(),
                    "Sale date cannot be in the future".to_string(),
                );
                dt
            }
            Some(dt) => dt,
        },
    };

    if errors.is_empty() {
        Ok((lines, sale_date))
    } else {
        Err(errors)
    }
}

// =============================================================================
// Wire DTOs
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleItemDto {
    pub product: String,
    pub product_name: String,
    pub sku: String,
    pub quantity: i64,
    pub unit_cost_price: f64,
    pub unit_selling_price: f64,
    pub line_revenue: f64,
    pub line_cost: f64,
    pub line_gross_profit: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleDto {
    pub id: Option<String>,
    pub user: String,
    pub items: Vec<SaleItemDto>,
    pub total_revenue: f64,
    pub total_cost: f64,
    pub gross_profit: f64,
    pub sale_date: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<SaleItem> for SaleItemDto {
    fn from(item: SaleItem) -> Self {
        Self {
            product: thing_to_string(&item.product),
            product_name: item.product_name,
            sku: item.sku,
            quantity: item.quantity,
            unit_cost_price: item.unit_cost_price,
            unit_selling_price: item.unit_selling_price,
            line_revenue: item.line_revenue,
            line_cost: item.line_cost,
            line_gross_profit: item.line_gross_profit,
        }
    }
}

impl From<Sale> for SaleDto {
    fn from(sale: Sale) -> Self {
        Self {
            id: option_thing_to_string(&sale.id),
            user: thing_to_string(&sale.owner),
            items: sale.items.into_iter().map(Into::into).collect(),
            total_revenue: sale.total_revenue,
            total_cost: sale.total_cost,
            gross_profit: sale.gross_profit,
            sale_date: datetime_to_string(&sale.sale_date),
            created_at: datetime_to_string(&sale.created_at),
            updated_at: datetime_to_string(&sale.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateSaleResponse {
    pub success: bool,
    pub data: SaleDto,
}

#[derive(Debug, Serialize)]
pub struct ListSalesResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<SaleDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummaryResponse {
    pub success: bool,
    pub total_revenue: f64,
    pub total_cost: f64,
    pub gross_profit: f64,
    pub total_sales_count: i64,
}

// =============================================================================
// Sale Handlers
// =============================================================================

/// POST /api/sales - record a sale
pub async fn create(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(payload): Json<CreateSalePayload>,
) -> AppResult<(StatusCode, Json<CreateSaleResponse>)> {
    let (lines, sale_date) = validate_create_payload(&payload).map_err(AppError::validation)?;

    let owner = owner_thing(&user.id);
    let repo = SaleRepository::new(state.get_db());
    let sale = repo.create_sale(&owner, &lines, sale_date).await?;

    tracing::info!(
        user = %user.id,
        sale = %sale.id.as_ref().map(thing_to_string).unwrap_or_default(),
        items = sale.items.len(),
        revenue = sale.total_revenue,
        "Sale recorded"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateSaleResponse {
            success: true,
            data: sale.into(),
        }),
    ))
}

/// GET /api/sales?from=&to= - list sales, newest first
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
    Query(query): Query<ListSalesQuery>,
) -> AppResult<Json<ListSalesResponse>> {
    let from = match query.from.as_deref() {
        None => None,
        Some(raw) => Some(parse_date(raw, false).ok_or_else(|| AppError::invalid("Invalid from date"))?),
    };
    let to = match query.to.as_deref() {
        None => None,
        Some(raw) => Some(parse_date(raw, true).ok_or_else(|| AppError::invalid("Invalid to date"))?),
    };

    let owner = owner_thing(&user.id);
    let repo = SaleRepository::new(state.get_db());
    let sales = repo.list(&owner, from, to).await?;

    Ok(Json(ListSalesResponse {
        success: true,
        count: sales.len(),
        data: sales.into_iter().map(Into::into).collect(),
    }))
}

/// GET /api/sales/summary - totals over all of the owner's sales
pub async fn summary(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<SalesSummaryResponse>> {
    let owner = owner_thing(&user.id);
    let repo = SaleRepository::new(state.get_db());
    let summary = repo.summarize(&owner).await?;

    Ok(Json(SalesSummaryResponse {
        success: true,
        total_revenue: summary.total_revenue,
        total_cost: summary.total_cost,
        gross_profit: summary.gross_profit,
        total_sales_count: summary.total_sales_count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(product_id: Option<&str>, quantity: Option<f64>) -> SaleItemPayload {
        SaleItemPayload {
            product_id: product_id.map(str::to_string),
            quantity,
        }
    }

    #[test]
    fn test_valid_payload_produces_lines() {
        let payload = CreateSalePayload {
            items: vec![item(Some("product:abc"), Some(3.0)), item(Some("def"), Some(1.0))],
            sale_date: None,
        };

        let (lines, _) = validate_create_payload(&payload).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].product.id.to_raw(), "abc");
        assert_eq!(lines[0].quantity, 3);
        assert_eq!(lines[1].product.id.to_raw(), "def");
    }

    #[test]
    fn test_empty_items_rejected() {
        let payload = CreateSalePayload {
            items: vec![],
            sale_date: None,
        };

        let errors = validate_create_payload(&payload).unwrap_err();
        assert_eq!(errors["items"], "At least one sale item is required");
    }

    #[test]
    fn test_bad_fields_are_all_reported() {
        let payload = CreateSalePayload {
            items: vec![
                item(None, None),
                item(Some("product:abc"), Some(2.5)),
                item(Some("product:abc"), Some(1.0)),
            ],
            sale_date: Some("not-a-date".to_string()),
        };

        let errors = validate_create_payload(&payload).unwrap_err();
        assert_eq!(errors["items[0].productId"], "Valid productId is required");
        assert_eq!(errors["items[0].quantity"], "Quantity is required");
        assert_eq!(
            errors["items[1].quantity"],
            "Quantity must be a positive integer"
        );
        assert_eq!(
            errors["items[2].productId"],
            "Duplicate product in sale items is not allowed"
        );
        assert_eq!(errors["saleDate"], "Sale date must be a valid date");
    }

    #[test]
    fn test_duplicate_detection_ignores_table_prefix() {
        // "product:abc" and "abc" are the same record
        let payload = CreateSalePayload {
            items: vec![item(Some("product:abc"), Some(1.0)), item(Some("abc"), Some(1.0))],
            sale_date: None,
        };

        let errors = validate_create_payload(&payload).unwrap_err();
        assert_eq!(
            errors["items[1].productId"],
            "Duplicate product in sale items is not allowed"
        );
    }

    #[test]
    fn test_non_positive_and_fractional_quantities_rejected() {
        for bad in [0.0, -1.0, 0.5, f64::NAN, f64::INFINITY] {
            let payload = CreateSalePayload {
                items: vec![item(Some("product:abc"), Some(bad))],
                sale_date: None,
            };
            let errors = validate_create_payload(&payload).unwrap_err();
            assert_eq!(
                errors["items[0].quantity"],
                "Quantity must be a positive integer",
                "quantity {bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_future_sale_date_rejected() {
        let tomorrow = (Utc::now() + chrono::Duration::days(1)).to_rfc3339();
        let payload = CreateSalePayload {
            items: vec![item(Some("product:abc"), Some(1.0))],
            sale_date: Some(tomorrow),
        };

        let errors = validate_create_payload(&payload).unwrap_err();
        assert_eq!(errors["saleDate"], "Sale date cannot be in the future");
    }

    #[test]
    fn test_date_only_sale_date_is_accepted() {
        let payload = CreateSalePayload {
            items: vec![item(Some("product:abc"), Some(1.0))],
            sale_date: Some("2020-06-15".to_string()),
        };

        let (_, date) = validate_create_payload(&payload).unwrap();
        assert_eq!(date.to_rfc3339(), "2020-06-15T00:00:00+00:00");
    }

    #[test]
    fn test_date_only_upper_bound_reaches_end_of_day() {
        let bound = parse_date("2020-06-15", true).unwrap();
        assert!(bound > parse_date("2020-06-15T23:00:00Z", false).unwrap());
    }
}
