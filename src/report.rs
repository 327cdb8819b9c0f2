//! Sales summary over downloaded bill charges.

use crate::transform::BillCharge;
use itertools::Itertools;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreTotal {
    pub store_name: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesSummary {
    pub total_records: usize,
    /// Currency units (API amounts are cents).
    pub total_amount: f64,
    pub paid_count: usize,
    /// Percentage of paid records, 0 when there are none.
    pub paid_percentage: f64,
    pub store_totals: Vec<StoreTotal>,
}

impl SalesSummary {
    pub fn from_charges(charges: &[BillCharge]) -> Self {
        let total_records = charges.len();
        let total_amount = charges.iter().map(|c| c.total_amount / 100.0).sum();
        let paid_count = charges.iter().filter(|c| c.is_paid).count();
        let paid_percentage = if total_records == 0 {
            0.0
        } else {
            paid_count as f64 / total_records as f64 * 100.0
        };

        let mut by_store: HashMap<&str, f64> = HashMap::new();
        for charge in charges {
            *by_store.entry(charge.store_name.as_str()).or_insert(0.0) += charge.total_amount / 100.0;
        }

        let store_totals = by_store
            .into_iter()
            .map(|(store_name, total)| StoreTotal {
                store_name: store_name.to_string(),
                total,
            })
            .sorted_by(|a, b| desc_then_name(a.total, b.total, &a.store_name, &b.store_name))
            .collect();

        Self {
            total_records,
            total_amount,
            paid_count,
            paid_percentage,
            store_totals,
        }
    }
}

impl fmt::Display for SalesSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total Records: {}", self.total_records)?;
        writeln!(f, "Total Amount:  {}", format_brl(self.total_amount))?;
        writeln!(
            f,
            "Paid Records:  {} ({:.1}%)",
            self.paid_count, self.paid_percentage
        )?;
        writeln!(f)?;
        writeln!(f, "Sales by store")?;
        for store in &self.store_totals {
            writeln!(f, "  {:<40} {:>18}", store.store_name, format_brl(store.total))?;
        }
        Ok(())
    }
}

/// Descending by value, ascending by name on ties.
pub(crate) fn desc_then_name(a: f64, b: f64, name_a: &str, name_b: &str) -> Ordering {
    b.partial_cmp(&a)
        .unwrap_or(Ordering::Equal)
        .then_with(|| name_a.cmp(name_b))
}

/// Render an amount as `R$ 1,234.56`.
pub fn format_brl(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let units = (cents / 100).to_string();
    let grouped = units
        .as_bytes()
        .rchunks(3)
        .rev()
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .join(",");
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("R$ {}{}.{:02}", sign, grouped, cents % 100)
}
