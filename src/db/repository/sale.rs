//! Sale Repository
//!
//! The sale transaction engine. `create_sale` runs one storage transaction
//! that reserves stock for every line item and inserts the sale record;
//! any failed reservation aborts the whole transaction, so stock is never
//! left deducted without a matching sale.

use chrono::{DateTime, Utc};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use surrealdb::sql::{Datetime, Thing};

use super::{BaseRepository, RepoError, RepoResult, is_retryable, product};
use crate::db::models::{Sale, SalesSummary};

/// Marker carried by the THROW inside the sale transaction. Error
/// classification matches on it, so it must stay in sync with
/// `build_sale_transaction`.
pub(crate) const INSUFFICIENT_STOCK: &str =
    "Insufficient stock or product not found for product:";

/// Engine-level conflict retries before giving up
const MAX_TXN_RETRIES: u32 = 3;

/// One requested line item: which product, how many units
#[derive(Debug, Clone)]
pub struct SaleLineInput {
    pub product: Thing,
    pub quantity: i64,
}

/// Build the all-or-nothing sale transaction for `n` line items.
///
/// Per item: the stock ledger's conditional decrement, then a THROW when it
/// matched nothing - THROW aborts the surrounding transaction, rolling back
/// every prior decrement. The line-item snapshots are computed from the
/// post-update rows (`$p{i}`), so unit prices come from the ledger and not
/// from anything the caller supplied.
fn build_sale_transaction(n: usize) -> String {
    let mut sql = String::from("BEGIN TRANSACTION;\n");

    for i in 0..n {
        sql.push_str(&product::reserve_stock_statement(i));
        sql.push_str(&format!(
            "IF array::len($p{i}) != 1 {{ THROW \"{INSUFFICIENT_STOCK} \" + <string>$pid{i} }};\n"
        ));
    }

    let lines: Vec<String> = (0..n)
        .map(|i| {
            format!(
                "{{ product: $pid{i}, \
                   product_name: $p{i}[0].name, \
                   sku: $p{i}[0].sku, \
                   quantity: $qty{i}, \
                   unit_cost_price: $p{i}[0].cost_price, \
                   unit_selling_price: $p{i}[0].selling_price, \
                   line_revenue: $p{i}[0].selling_price * $qty{i}, \
                   line_cost: $p{i}[0].cost_price * $qty{i}, \
                   line_gross_profit: ($p{i}[0].selling_price - $p{i}[0].cost_price) * $qty{i} }}"
            )
        })
        .collect();
    sql.push_str(&format!("LET $items = [{}];\n", lines.join(", ")));

    sql.push_str(
        "LET $created = (CREATE sale CONTENT { \
           owner: $owner, \
           items: $items, \
           total_revenue: math::sum($items.line_revenue), \
           total_cost: math::sum($items.line_cost), \
           gross_profit: math::sum($items.line_revenue) - math::sum($items.line_cost), \
           sale_date: $sale_date, \
           created_at: time::now(), \
           updated_at: time::now() \
         } RETURN AFTER);\n\
         RETURN $created[0];\n\
         COMMIT TRANSACTION;",
    );

    sql
}

/// Pick the most meaningful error out of an aborted transaction's
/// per-statement errors. The thrown business error wins over index
/// violations, which win over retryable conflicts and generic noise.
fn classify_transaction_errors(
    errors: std::collections::HashMap<usize, surrealdb::Error>,
) -> RepoError {
    fn priority(err: &RepoError) -> u8 {
        match err {
            RepoError::InsufficientStock(_) => 0,
            RepoError::Duplicate(_) => 1,
            _ if is_retryable(err) => 2,
            RepoError::Database(msg) if !msg.contains("was not executed") => 3,
            _ => 4,
        }
    }

    let mut ranked: Vec<(usize, RepoError)> = errors
        .into_iter()
        .map(|(idx, err)| (idx, RepoError::from(err)))
        .collect();
    ranked.sort_by_key(|(idx, err)| (priority(err), *idx));

    match ranked.into_iter().next() {
        Some((_, err)) => err,
        None => RepoError::Database("Transaction failed without an error".to_string()),
    }
}

// =============================================================================
// Sale Repository
// =============================================================================

#[derive(Clone)]
pub struct SaleRepository {
    base: BaseRepository,
}

impl SaleRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Record a multi-item sale as one all-or-nothing unit of work.
    ///
    /// Engine-reported transaction conflicts are retried a bounded number
    /// of times; business failures (insufficient stock, bad input) are
    /// terminal for the request and never retried.
    pub async fn create_sale(
        &self,
        owner: &Thing,
        items: &[SaleLineInput],
        sale_date: DateTime<Utc>,
    ) -> RepoResult<Sale> {
        if items.is_empty() {
            return Err(RepoError::Validation(
                "At least one sale item is required".into(),
            ));
        }
        if items.iter().any(|item| item.quantity <= 0) {
            return Err(RepoError::Validation(
                "quantity must be a positive integer".into(),
            ));
        }

        let mut attempt = 0;
        loop {
            match self.try_create_sale(owner, items, sale_date).await {
                Err(e) if is_retryable(&e) && attempt < MAX_TXN_RETRIES => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %e, "Sale transaction conflict, retrying");
                    tokio::time::sleep(std::time::Duration::from_millis(10 * attempt as u64))
                        .await;
                }
                other => return other,
            }
        }
    }

    async fn try_create_sale(
        &self,
        owner: &Thing,
        items: &[SaleLineInput],
        sale_date: DateTime<Utc>,
    ) -> RepoResult<Sale> {
        let n = items.len();
        let sql = build_sale_transaction(n);

        let mut query = self
            .base
            .db()
            .query(sql)
            .bind(("owner", owner.clone()))
            .bind(("sale_date", Datetime::from(sale_date)));

        for (i, item) in items.iter().enumerate() {
            query = query
                .bind((format!("pid{i}"), item.product.clone()))
                .bind((format!("qty{i}"), item.quantity));
        }

        let mut response = query.await?;

        // On an aborted transaction every statement reports an error, most
        // of them the generic "query was not executed" one. Drain them all
        // and surface the root cause, not whichever came first by index.
        let errors = response.take_errors();
        if !errors.is_empty() {
            return Err(classify_transaction_errors(errors));
        }

        // Statements inside the transaction: 2 per item, $items, $created,
        // RETURN - the created sale sits in the final slot.
        let created: Option<Sale> = response.take(2 * n + 2)?;
        created.ok_or_else(|| RepoError::Database("Sale record was not created".to_string()))
    }

    /// List an owner's sales, newest first, with optional inclusive bounds
    pub async fn list(
        &self,
        owner: &Thing,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> RepoResult<Vec<Sale>> {
        let mut sql = String::from("SELECT * FROM sale WHERE owner = $owner");
        if from.is_some() {
            sql.push_str(" AND sale_date >= $from");
        }
        if to.is_some() {
            sql.push_str(" AND sale_date <= $to");
        }
        sql.push_str(" ORDER BY sale_date DESC");

        let mut query = self.base.db().query(sql).bind(("owner", owner.clone()));
        if let Some(f) = from {
            query = query.bind(("from", Datetime::from(f)));
        }
        if let Some(t) = to {
            query = query.bind(("to", Datetime::from(t)));
        }

        let mut response = query.await?.check()?;
        let sales: Vec<Sale> = response.take(0)?;
        Ok(sales)
    }

    /// Aggregate revenue/cost/profit over all of an owner's sales.
    /// Zeroed summary when the owner has no sales.
    pub async fn summarize(&self, owner: &Thing) -> RepoResult<SalesSummary> {
        let mut response = self
            .base
            .db()
            .query(
                "SELECT math::sum(total_revenue) AS total_revenue, \
                        math::sum(total_cost) AS total_cost, \
                        math::sum(gross_profit) AS gross_profit, \
                        count() AS total_sales_count \
                 FROM sale WHERE owner = $owner GROUP ALL",
            )
            .bind(("owner", owner.clone()))
            .await?
            .check()?;
        let rows: Vec<SalesSummary> = response.take(0)?;
        Ok(rows.into_iter().next().unwrap_or_default())
    }
}
