//! Paginated Collector
//!
//! Walks the `fetchBillCharges` pages one cursor at a time and accumulates
//! every page's records into a single ordered result set.

use crate::collector::progress::{NoopProgress, ProgressEvent, ProgressSink};
use crate::collector::query::{bill_charge_variables, BILL_CHARGES_QUERY};
use crate::error::CollectError;
use crate::graphql::{GraphqlExecutor, Outcome};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// An opaque billing entry as returned by the API.
pub type Record = Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMeta {
    pub current_page: u32,
    pub last_page: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<Record>,
    pub meta: PageMeta,
}

impl Page {
    /// Pull `data.fetchBillCharges.{data, meta}` out of a response payload.
    pub fn from_payload(mut payload: Value) -> std::result::Result<Self, String> {
        let meta = payload
            .pointer("/data/fetchBillCharges/meta")
            .ok_or_else(|| "missing data.fetchBillCharges.meta".to_string())?;
        let meta = PageMeta {
            current_page: page_number(meta, "currentPage")?,
            last_page: page_number(meta, "lastPage")?,
        };

        let items = match payload
            .pointer_mut("/data/fetchBillCharges/data")
            .map(Value::take)
        {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(format!(
                    "data.fetchBillCharges.data is not a list: {}",
                    other
                ))
            }
            None => return Err("missing data.fetchBillCharges.data".to_string()),
        };

        Ok(Self { items, meta })
    }

    pub fn is_last(&self) -> bool {
        self.meta.current_page >= self.meta.last_page
    }
}

fn page_number(meta: &Value, field: &str) -> std::result::Result<u32, String> {
    meta.get(field)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| format!("meta.{} is missing or not a page number", field))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    /// Pause between successive page requests.
    pub page_delay: Duration,
    /// How many times an exhausted page is requested again before the run
    /// fails. `None` keeps retrying the same page forever.
    pub max_page_retries: Option<u32>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            page_delay: Duration::from_secs(1),
            max_page_retries: Some(3),
        }
    }
}

pub struct BillChargeCollector {
    executor: GraphqlExecutor,
    config: CollectorConfig,
    progress: Arc<dyn ProgressSink>,
}

impl BillChargeCollector {
    pub fn new(executor: GraphqlExecutor, config: CollectorConfig) -> Self {
        Self {
            executor,
            config,
            progress: Arc::new(NoopProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Fetch every page of charges paid between `start_date` and `end_date`.
    ///
    /// Returns the records of all pages in page order, or a typed failure. A
    /// failed run never returns partial data.
    pub async fn collect(
        &self,
        start_date: &str,
        end_date: &str,
        credential: &str,
        page_size: u32,
    ) -> std::result::Result<Vec<Record>, CollectError> {
        let cancel = self.executor.cancellation().clone();
        let mut cursor: u32 = 1;
        let mut records: Vec<Record> = Vec::new();
        let mut page_rounds: u32 = 0;

        info!(
            "Collecting bill charges from {} to {} ({} per page)",
            start_date, end_date, page_size
        );

        loop {
            if cancel.is_cancelled() {
                return Err(CollectError::Cancelled { page: cursor });
            }

            let variables = bill_charge_variables(start_date, end_date, cursor, page_size);
            let outcome = self
                .executor
                .execute(BILL_CHARGES_QUERY, &variables, credential)
                .await;

            match outcome {
                Outcome::Success(payload) => {
                    let page = Page::from_payload(payload).map_err(|detail| {
                        CollectError::Structural {
                            page: cursor,
                            detail,
                        }
                    })?;
                    page_rounds = 0;

                    if page.meta.current_page != cursor {
                        debug!(
                            "Requested page {} but server reported page {}",
                            cursor, page.meta.current_page
                        );
                    }

                    let done = page.is_last();
                    let page_items = page.items.len();
                    records.extend(page.items);

                    self.progress.report(&ProgressEvent::Page {
                        current_page: page.meta.current_page,
                        last_page: page.meta.last_page,
                        page_items,
                        total_items: records.len(),
                        start_date: start_date.to_string(),
                        end_date: end_date.to_string(),
                    });

                    if done {
                        break;
                    }

                    cursor += 1;
                    self.pause(cursor).await?;
                }
                Outcome::FatalError(messages) => {
                    return Err(CollectError::Graphql {
                        page: cursor,
                        messages,
                    });
                }
                Outcome::Exhausted { attempts } => {
                    page_rounds += 1;
                    warn!(
                        "Page {} failed after {} attempts (round {})",
                        cursor, attempts, page_rounds
                    );

                    if let Some(limit) = self.config.max_page_retries {
                        if page_rounds > limit {
                            return Err(CollectError::NetworkExhausted {
                                page: cursor,
                                rounds: page_rounds,
                            });
                        }
                    }

                    self.progress.report(&ProgressEvent::Retrying {
                        page: cursor,
                        round: page_rounds,
                    });
                    self.pause(cursor).await?;
                }
                Outcome::Cancelled => {
                    return Err(CollectError::Cancelled { page: cursor });
                }
            }
        }

        self.progress.report(&ProgressEvent::Completed {
            pages: cursor,
            total_items: records.len(),
        });

        Ok(records)
    }

    /// Courtesy delay before requesting `next_page`; cut short by cancellation.
    async fn pause(&self, next_page: u32) -> std::result::Result<(), CollectError> {
        let cancel = self.executor.cancellation();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CollectError::Cancelled { page: next_page }),
            _ = tokio::time::sleep(self.config.page_delay) => Ok(()),
        }
    }
}
