//! Bill charge repository for PostgreSQL operations

use crate::error::{Result, SyncError};
use crate::transform::BillCharge;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

pub const DEFAULT_BATCH_SIZE: usize = 100;

const INSERT_PREFIX: &str = "INSERT INTO bill_charges (quote_id, customer_id, customer_name, \
     customer_taxvat, customer_email, store_name, total_amount, installments, paid_at, due_at, \
     is_paid, payment_method, status, quote_items) ";

pub struct BillChargeRepository {
    pool: PgPool,
}

impl BillChargeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bill_charges")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| SyncError::Database(format!("Failed to count bill charges: {}", e)))?;
        Ok(count)
    }

    /// Replace the table contents with `charges`, written in batches inside
    /// one transaction.
    pub async fn replace_all(&self, charges: &[BillCharge], batch_size: usize) -> Result<u64> {
        let batch_size = batch_size.max(1);
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| SyncError::Database(format!("Failed to open transaction: {}", e)))?;

        let cleared = sqlx::query("DELETE FROM bill_charges")
            .execute(&mut *tx)
            .await
            .map_err(|e| SyncError::Database(format!("Failed to clear bill charges: {}", e)))?
            .rows_affected();
        info!("🗑️  Cleared {} existing bill charges", cleared);

        let mut written = 0;
        for (idx, batch) in charges.chunks(batch_size).enumerate() {
            written += build_insert(batch)
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    SyncError::Database(format!("Failed to insert batch {}: {}", idx + 1, e))
                })?
                .rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| SyncError::Database(format!("Failed to commit bill charges: {}", e)))?;

        info!("✅ Stored {} bill charges", written);
        Ok(written)
    }
}

fn build_insert(charges: &[BillCharge]) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(INSERT_PREFIX);
    builder.push_values(charges, |mut row, charge| {
        row.push_bind(charge.quote_id.clone())
            .push_bind(charge.customer_id.clone())
            .push_bind(charge.customer_name.clone())
            .push_bind(charge.customer_taxvat.clone())
            .push_bind(charge.customer_email.clone())
            .push_bind(charge.store_name.clone())
            .push_bind(charge.total_amount)
            .push_bind(charge.installments)
            .push_bind(charge.paid_at.clone())
            .push_unseparated("::timestamptz")
            .push_bind(charge.due_at.clone())
            .push_unseparated("::timestamptz")
            .push_bind(charge.is_paid)
            .push_bind(charge.payment_method.clone())
            .push_bind(charge.status.clone())
            .push_bind(charge.quote_items.clone());
    });
    builder
}
