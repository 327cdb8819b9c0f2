//! Progress reporting for collection runs.

use serde::Serialize;
use std::fmt;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// A page was appended to the result set.
    Page {
        current_page: u32,
        last_page: u32,
        page_items: usize,
        total_items: usize,
        start_date: String,
        end_date: String,
    },
    /// Retries for a page ran out; the same page is being requested again.
    Retrying { page: u32, round: u32 },
    Completed { pages: u32, total_items: usize },
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::Page {
                current_page,
                last_page,
                total_items,
                start_date,
                end_date,
                ..
            } => write!(
                f,
                "📥 Downloading sales report - page {} of {} - from {} to {} ({} records so far)",
                current_page, last_page, start_date, end_date, total_items
            ),
            ProgressEvent::Retrying { page, round } => write!(
                f,
                "❌ Failed to download page {}, trying again (round {})...",
                page, round
            ),
            ProgressEvent::Completed { total_items, .. } => write!(
                f,
                "✅ Download finished! {} records downloaded.",
                total_items
            ),
        }
    }
}

/// Receives progress events from the collector.
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: &ProgressEvent);
}

/// Logs each event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Retrying { .. } => warn!("{}", event),
            _ => info!("{}", event),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&self, _event: &ProgressEvent) {}
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent) + Send + Sync,
{
    fn report(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Forwards events into a channel; a dropped receiver is ignored.
impl ProgressSink for UnboundedSender<ProgressEvent> {
    fn report(&self, event: &ProgressEvent) {
        let _ = self.send(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_message() {
        let event = ProgressEvent::Page {
            current_page: 2,
            last_page: 5,
            page_items: 200,
            total_items: 400,
            start_date: "2024-01-01".to_string(),
            end_date: "2024-01-31".to_string(),
        };
        let msg = event.to_string();
        assert!(msg.contains("page 2 of 5"));
        assert!(msg.contains("2024-01-01"));
        assert!(msg.contains("400 records"));
    }

    #[test]
    fn test_closure_sink_receives_events() {
        let seen = std::sync::Mutex::new(Vec::new());
        let sink = |event: &ProgressEvent| seen.lock().unwrap().push(event.clone());

        sink.report(&ProgressEvent::Retrying { page: 3, round: 1 });
        sink.report(&ProgressEvent::Completed { pages: 3, total_items: 9 });

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ProgressEvent::Retrying { page: 3, round: 1 },
                ProgressEvent::Completed { pages: 3, total_items: 9 },
            ]
        );
    }

    #[test]
    fn test_channel_sink_survives_dropped_receiver() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        tx.report(&ProgressEvent::Completed { pages: 1, total_items: 0 });
    }
}
