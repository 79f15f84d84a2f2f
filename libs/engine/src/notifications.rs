use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Event, RecordId};

/// Hook invoked by `Events` after a creation has been committed.
pub trait Notifier: Send + Sync {
    fn notify(&self, created: &Event) -> Result<()>;
}

#[derive(Default)]
pub struct DevNullNotifier {}

impl Notifier for DevNullNotifier {
    fn notify(&self, _created: &Event) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceSummary {
    pub title: String,
    pub description: String,
    pub date: String,
    pub id: RecordId,
}

/// Payload pushed to connected channels as `invoice:created`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceCreated {
    pub message: String,
    pub invoice: InvoiceSummary,
    pub timestamp: DateTime<Utc>,
}

impl InvoiceCreated {
    pub fn new(created: &Event, timestamp: DateTime<Utc>) -> Self {
        Self {
            message: format!("New invoice created: {}", created.data.title),
            invoice: InvoiceSummary {
                title: created.data.title.clone(),
                description: created.data.description.clone(),
                date: created.data.date.clone(),
                id: created.id.clone(),
            },
            timestamp,
        }
    }
}

impl From<&Event> for InvoiceCreated {
    fn from(created: &Event) -> Self {
        Self::new(created, Utc::now())
    }
}
