//! Background persistence of diagnosis records.
//!
//! Delivery is at-most-once: a record is handed to the repository exactly one time and a
//! failed write is logged, never retried. Dropping every [`HistoryWriter`] closes the channel
//! and lets the worker finish the queued records before exiting.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::domain::DiagnosisRecord;
use super::repository::{HistoryRepository, HistoryRow};

/// Handle used to queue records for the history worker.
#[derive(Debug, Clone)]
pub struct HistoryWriter {
    sender: mpsc::UnboundedSender<DiagnosisRecord>,
}

impl HistoryWriter {
    /// Starts the worker on the current tokio runtime.
    pub fn spawn<H>(repository: Arc<H>) -> (Self, JoinHandle<()>)
    where
        H: HistoryRepository + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = tokio::spawn(drain(repository, receiver));
        (Self { sender }, handle)
    }

    /// Queues `record`. Returns `false` when the worker is gone and the record was dropped.
    pub fn enqueue(&self, record: DiagnosisRecord) -> bool {
        let diagnosis_id = record.id.clone();
        match self.sender.send(record) {
            Ok(()) => true,
            Err(_) => {
                warn!(%diagnosis_id, "history worker stopped; diagnosis not recorded");
                false
            }
        }
    }
}

async fn drain<H>(repository: Arc<H>, mut receiver: mpsc::UnboundedReceiver<DiagnosisRecord>)
where
    H: HistoryRepository,
{
    while let Some(record) = receiver.recv().await {
        let diagnosis_id = record.id.clone();
        let row = match HistoryRow::from_record(&record) {
            Ok(row) => row,
            Err(error) => {
                warn!(%diagnosis_id, %error, "failed to serialise diagnosis history");
                continue;
            }
        };

        match repository.append(row) {
            Ok(()) => debug!(%diagnosis_id, "diagnosis history stored"),
            Err(error) => warn!(%diagnosis_id, %error, "failed to store diagnosis history"),
        }
    }
}
