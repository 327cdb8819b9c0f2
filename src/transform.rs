//! Flattens raw bill charge records into table rows.

use crate::collector::Record;
use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One row of the `bill_charges` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillCharge {
    pub quote_id: String,
    pub customer_id: String,
    pub customer_name: String,
    pub customer_taxvat: Option<String>,
    pub customer_email: Option<String>,
    pub store_name: String,
    /// Raw API amount, in cents.
    pub total_amount: f64,
    pub installments: Option<i32>,
    pub paid_at: Option<String>,
    pub due_at: Option<String>,
    pub is_paid: bool,
    pub payment_method: String,
    pub status: String,
    /// Bill items serialized as JSON text.
    pub quote_items: String,
}

impl BillCharge {
    pub fn from_record(record: &Record) -> Result<Self> {
        let quote = required(record, "/quote")?;
        let customer = required(quote, "/customer")?;

        let items = quote
            .pointer("/bill/items")
            .cloned()
            .unwrap_or(Value::Array(Vec::new()));

        Ok(Self {
            quote_id: id_field(quote, "/id")?,
            customer_id: id_field(customer, "/id")?,
            customer_name: string_field(customer, "/name")?,
            customer_taxvat: optional_string(customer, "/taxvat"),
            customer_email: optional_string(customer, "/email"),
            store_name: string_field(record, "/store/name")?,
            total_amount: number_field(record, "/amount")?,
            installments: quote
                .pointer("/bill/installmentsQuantity")
                .and_then(Value::as_i64)
                .and_then(|n| i32::try_from(n).ok()),
            paid_at: optional_string(record, "/paidAt"),
            due_at: optional_string(record, "/dueAt"),
            is_paid: required(record, "/isPaid")?
                .as_bool()
                .ok_or_else(|| SyncError::Transform("isPaid is not a boolean".to_string()))?,
            payment_method: string_field(record, "/paymentMethod/name")?,
            status: string_field(quote, "/status")?,
            quote_items: serde_json::to_string(&items)?,
        })
    }
}

/// Convert a whole result set, stopping at the first bad record.
pub fn transform_all(records: &[Record]) -> Result<Vec<BillCharge>> {
    records
        .iter()
        .enumerate()
        .map(|(idx, record)| {
            BillCharge::from_record(record).map_err(|e| match e {
                SyncError::Transform(msg) => SyncError::Transform(format!("record {}: {}", idx, msg)),
                other => other,
            })
        })
        .collect()
}

fn required<'a>(value: &'a Value, pointer: &str) -> Result<&'a Value> {
    match value.pointer(pointer) {
        Some(v) if !v.is_null() => Ok(v),
        _ => Err(SyncError::Transform(format!("missing field {}", pointer))),
    }
}

fn string_field(value: &Value, pointer: &str) -> Result<String> {
    required(value, pointer)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| SyncError::Transform(format!("field {} is not a string", pointer)))
}

/// Ids come back as strings or numbers depending on the entity.
fn id_field(value: &Value, pointer: &str) -> Result<String> {
    match required(value, pointer)? {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(SyncError::Transform(format!(
            "field {} is not an id: {}",
            pointer, other
        ))),
    }
}

fn number_field(value: &Value, pointer: &str) -> Result<f64> {
    let raw = required(value, pointer)?;
    raw.as_f64()
        .or_else(|| raw.as_str().and_then(|s| s.trim().parse().ok()))
        .ok_or_else(|| SyncError::Transform(format!("field {} is not a number", pointer)))
}

fn optional_string(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "quote": {
                "id": 981,
                "customer": {"id": "c-1", "name": "Ana Souza", "taxvat": "123.456.789-00", "email": null},
                "status": "approved",
                "bill": {
                    "total": 45000,
                    "installmentsQuantity": 3,
                    "items": [{"amount": 45000, "description": "Peeling", "quantity": 1}]
                }
            },
            "store": {"name": "Unidade Centro"},
            "amount": 15000,
            "paidAt": "2024-05-02T10:00:00Z",
            "dueAt": null,
            "isPaid": true,
            "paymentMethod": {"name": "credit_card"}
        })
    }

    #[test]
    fn test_flatten_record() {
        let charge = BillCharge::from_record(&sample()).unwrap();
        assert_eq!(charge.quote_id, "981");
        assert_eq!(charge.customer_name, "Ana Souza");
        assert_eq!(charge.customer_taxvat.as_deref(), Some("123.456.789-00"));
        assert_eq!(charge.customer_email, None);
        assert_eq!(charge.store_name, "Unidade Centro");
        assert_eq!(charge.total_amount, 15000.0);
        assert_eq!(charge.installments, Some(3));
        assert_eq!(charge.due_at, None);
        assert!(charge.is_paid);
        assert_eq!(charge.payment_method, "credit_card");
        assert_eq!(charge.status, "approved");

        let items: Value = serde_json::from_str(&charge.quote_items).unwrap();
        assert_eq!(items[0]["description"], "Peeling");
    }

    #[test]
    fn test_missing_required_field() {
        let mut record = sample();
        record["store"] = Value::Null;
        let err = BillCharge::from_record(&record).unwrap_err();
        assert!(err.to_string().contains("/store/name"));
    }

    #[test]
    fn test_transform_all_reports_index() {
        let mut bad = sample();
        bad.as_object_mut().unwrap().remove("isPaid");
        let err = transform_all(&[sample(), bad]).unwrap_err();
        assert!(err.to_string().contains("record 1"));
    }
}
