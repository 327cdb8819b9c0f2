//! The `fetchBillCharges` query and its variables.

use serde_json::{json, Value};

pub const DEFAULT_PAGE_SIZE: u32 = 200;

pub const BILL_CHARGES_QUERY: &str = r#"query ($filters: BillChargeFiltersInput, $pagination: PaginationInput) {
    fetchBillCharges(filters: $filters, pagination: $pagination) {
        data {
            quote {
                id
                customer {
                    id
                    name
                    taxvat
                    email
                }
                status
                bill {
                    total
                    installmentsQuantity
                    items {
                        amount
                        description
                        quantity
                    }
                }
            }
            store {
                name
            }
            amount
            paidAt
            dueAt
            isPaid
            paymentMethod {
                name
            }
        }
        meta {
            currentPage
            lastPage
        }
    }
}"#;

/// Variables for one page of charges paid within `[start, end]`.
pub fn bill_charge_variables(start: &str, end: &str, page: u32, per_page: u32) -> Value {
    json!({
        "filters": {
            "paidAtRange": {
                "start": start,
                "end": end
            }
        },
        "pagination": {
            "currentPage": page,
            "perPage": per_page
        }
    })
}
