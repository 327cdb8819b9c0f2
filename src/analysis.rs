//! Sales Export Analysis
//!
//! Loads a CSV export of sales, keeps finalized sales inside a date range and
//! aggregates them per unit, consultant and procedure.

use crate::error::{Result, SyncError};
use crate::report::{desc_then_name, format_brl};
use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

pub const FINAL_STATUS: &str = "Finalizado";
pub const BACK_OFFICE_CONSULTANT: &str = "BKO VENDAS";
const TOP_PROCEDURES: usize = 10;

#[derive(Debug, Deserialize)]
struct RawSaleRow {
    #[serde(rename = "Data venda")]
    sale_date: String,
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "Consultor")]
    consultant: String,
    #[serde(rename = "Valor líquido")]
    net_value: String,
    #[serde(rename = "Unidade")]
    unit: String,
    #[serde(rename = "Procedimento")]
    procedure: String,
    #[serde(rename = "ID orçamento")]
    quote_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaleRow {
    pub sale_date: NaiveDate,
    pub status: String,
    pub consultant: String,
    pub net_value: f64,
    pub unit: String,
    pub procedure: String,
    pub quote_id: String,
}

impl TryFrom<RawSaleRow> for SaleRow {
    type Error = SyncError;

    fn try_from(raw: RawSaleRow) -> Result<Self> {
        Ok(Self {
            sale_date: parse_sale_date(&raw.sale_date)?,
            status: raw.status.trim().to_string(),
            consultant: raw.consultant.trim().to_string(),
            net_value: parse_money(&raw.net_value)?,
            unit: raw.unit.trim().to_string(),
            procedure: raw.procedure.trim().to_string(),
            quote_id: raw.quote_id.trim().to_string(),
        })
    }
}

pub fn load_sales_csv(path: impl AsRef<Path>) -> Result<Vec<SaleRow>> {
    let path = path.as_ref();
    info!("Loading sales export from {}", path.display());
    let file = std::fs::File::open(path)?;
    parse_sales_csv(file)
}

pub fn parse_sales_csv<R: Read>(reader: R) -> Result<Vec<SaleRow>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (idx, result) in rdr.deserialize::<RawSaleRow>().enumerate() {
        let raw = result?;
        let row = SaleRow::try_from(raw)
            .map_err(|e| SyncError::Analysis(format!("row {}: {}", idx + 1, e)))?;
        rows.push(row);
    }

    debug!("Parsed {} sales rows", rows.len());
    Ok(rows)
}

fn parse_sale_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%d/%m/%Y %H:%M:%S").map(|dt| dt.date()))
        .map_err(|_| SyncError::Analysis(format!("unrecognised sale date '{}'", raw)))
}

/// Accepts `1234.56`, `1.234,56` and an optional `R$` prefix.
fn parse_money(raw: &str) -> Result<f64> {
    let cleaned = raw.trim().trim_start_matches("R$").trim();
    if cleaned.is_empty() {
        return Ok(0.0);
    }

    let normalized = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else {
        cleaned.to_string()
    };

    normalized
        .parse::<f64>()
        .map_err(|_| SyncError::Analysis(format!("invalid net value '{}'", raw)))
}

/// Keep finalized, non back-office sales within `[start, end]`.
pub fn filter_sales(rows: Vec<SaleRow>, start: NaiveDate, end: NaiveDate) -> Result<Vec<SaleRow>> {
    if start > end {
        return Err(SyncError::InvalidDateRange(format!(
            "start date {} is after end date {}",
            start, end
        )));
    }

    Ok(rows
        .into_iter()
        .filter(|row| row.status == FINAL_STATUS)
        .filter(|row| row.consultant != BACK_OFFICE_CONSULTANT)
        .filter(|row| row.sale_date >= start && row.sale_date <= end)
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    pub name: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsultantStats {
    pub consultant: String,
    pub total: f64,
    /// Distinct quotes sold.
    pub quotes: usize,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesAnalysis {
    pub total_value: f64,
    pub average_ticket: f64,
    pub sale_count: usize,
    pub by_unit: Vec<GroupTotal>,
    pub by_consultant: Vec<ConsultantStats>,
    pub top_procedures: Vec<GroupTotal>,
}

impl SalesAnalysis {
    /// `None` when there is nothing to analyse.
    pub fn compute(rows: &[SaleRow]) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }

        let total_value: f64 = rows.iter().map(|r| r.net_value).sum();
        let sale_count = rows.len();

        let mut by_consultant = rows
            .iter()
            .into_group_map_by(|r| r.consultant.clone())
            .into_iter()
            .map(|(consultant, sales)| {
                let total: f64 = sales.iter().map(|r| r.net_value).sum();
                let quotes = sales
                    .iter()
                    .map(|r| r.quote_id.as_str())
                    .collect::<HashSet<_>>()
                    .len();
                ConsultantStats {
                    consultant,
                    total: round2(total),
                    quotes,
                    average: round2(total / sales.len() as f64),
                }
            })
            .collect::<Vec<_>>();
        by_consultant.sort_by(|a, b| desc_then_name(a.total, b.total, &a.consultant, &b.consultant));

        let mut top_procedures = group_totals(rows, |r| r.procedure.as_str());
        top_procedures.truncate(TOP_PROCEDURES);

        Some(Self {
            total_value,
            average_ticket: total_value / sale_count as f64,
            sale_count,
            by_unit: group_totals(rows, |r| r.unit.as_str()),
            by_consultant,
            top_procedures,
        })
    }
}

fn group_totals<'a, F>(rows: &'a [SaleRow], key: F) -> Vec<GroupTotal>
where
    F: Fn(&'a SaleRow) -> &'a str,
{
    let mut totals: HashMap<&str, f64> = HashMap::new();
    for row in rows {
        *totals.entry(key(row)).or_insert(0.0) += row.net_value;
    }

    totals
        .into_iter()
        .map(|(name, total)| GroupTotal {
            name: name.to_string(),
            total,
        })
        .sorted_by(|a, b| desc_then_name(a.total, b.total, &a.name, &b.name))
        .collect()
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

impl fmt::Display for SalesAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total value:    {}", format_brl(self.total_value))?;
        writeln!(f, "Average ticket: {}", format_brl(self.average_ticket))?;
        writeln!(f, "Total sales:    {}", self.sale_count)?;

        writeln!(f, "\nBy unit")?;
        for unit in &self.by_unit {
            writeln!(f, "  {:<40} {:>18}", unit.name, format_brl(unit.total))?;
        }

        writeln!(f, "\nBy consultant")?;
        for c in &self.by_consultant {
            writeln!(
                f,
                "  {:<40} {:>18} {:>6} {:>18}",
                c.consultant,
                format_brl(c.total),
                c.quotes,
                format_brl(c.average)
            )?;
        }

        writeln!(f, "\nTop procedures")?;
        for p in &self.top_procedures {
            writeln!(f, "  {:<40} {:>18}", p.name, format_brl(p.total))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_money() {
        assert_eq!(parse_money("1234.56").unwrap(), 1234.56);
        assert_eq!(parse_money("R$ 1.234,56").unwrap(), 1234.56);
        assert_eq!(parse_money("").unwrap(), 0.0);
        assert!(parse_money("abc").is_err());
    }

    #[test]
    fn test_parse_sale_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(parse_sale_date("2024-03-09").unwrap(), expected);
        assert_eq!(parse_sale_date("2024-03-09 14:22:00").unwrap(), expected);
        assert_eq!(parse_sale_date("09/03/2024").unwrap(), expected);
        assert!(parse_sale_date("March 9").is_err());
    }

    #[test]
    fn test_filter_rejects_inverted_range() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!(matches!(
            filter_sales(Vec::new(), start, end),
            Err(SyncError::InvalidDateRange(_))
        ));
    }

    #[test]
    fn test_compute_empty_is_none() {
        assert!(SalesAnalysis::compute(&[]).is_none());
    }
}
