use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::{spawn_blocking, JoinHandle};
use tracing::{debug, error};

use crate::cache::CacheNotifier;
use crate::identity::{Caller, IdentityProvider};
use crate::reconciler::Reconciler;
use crate::storage::Store;
use crate::types::AccountId;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Delete,
    Default
}

/// A single row of the operations file.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationRow {
    pub operation: OperationKind,
    /// Session token of the caller. Empty for an anonymous caller.
    pub session: Option<String>,
    /// Space separated transaction ids for `delete`, an account id for `default`.
    pub target: String
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize
}

/// Streams an operations file through the reconciler, in file order.
pub struct BatchEngine<S, I, N> {
    reconciler: Reconciler<S, I, N>,
    backpressure: usize
}

impl<S: Store, I: IdentityProvider, N: CacheNotifier> BatchEngine<S, I, N> {
    pub fn new(reconciler: Reconciler<S, I, N>) -> Self {
        Self {
            reconciler,
            backpressure: 256
        }
    }

    /// Reads operations from the CSV at `path` and executes each one.
    ///
    /// Rows that fail to deserialize are logged and skipped. A missing file is logged and
    /// results in an empty summary.
    pub async fn run(&self, path: &Path) -> anyhow::Result<BatchSummary> {
        let (sender, receiver) = mpsc::channel::<OperationRow>(self.backpressure);
        let csv_handle = self.spawn_csv_reader(path.to_path_buf(), sender);
        let summary = self.process_operations(receiver).await;

        if let Err(error) = csv_handle.await {
            error!("CSV ingestion failed: {error}");
        }

        summary
    }

    fn spawn_csv_reader(&self, path: PathBuf, sender: mpsc::Sender<OperationRow>) -> JoinHandle<()> {
        spawn_blocking(move || {
            let file = match File::open(&path) {
                Ok(file) => file,
                Err(error) => {
                    error!("Error opening CSV at path: {} | {error}", path.display());
                    return;
                }
            };

            let mut reader = ReaderBuilder::new()
                .trim(Trim::All)
                .flexible(true)
                .from_reader(BufReader::new(file));

            for result in reader.deserialize::<OperationRow>() {
                match result {
                    Ok(row) => {
                        if sender.blocking_send(row).is_err() {
                            break;
                        }
                    }
                    Err(error) => {
                        error!("CSV deserialization error: {error}");
                    }
                }
            }
        })
    }

    async fn process_operations(&self, mut receiver: mpsc::Receiver<OperationRow>) -> anyhow::Result<BatchSummary> {
        let mut summary = BatchSummary::default();

        while let Some(row) = receiver.recv().await {
            debug!("Executing {:?} on [{}]", row.operation, row.target);

            //NOTE: Stores block (SQLite does real I/O), so every operation runs off the async workers.
            let reconciler = self.reconciler.clone();
            let succeeded = spawn_blocking(move || execute(&reconciler, row)).await?;

            if succeeded {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
        }

        Ok(summary)
    }
}

fn execute<S: Store, I: IdentityProvider, N: CacheNotifier>(reconciler: &Reconciler<S, I, N>, row: OperationRow) -> bool {
    let caller = row.session.map(Caller::with_session).unwrap_or_default();

    match row.operation {
        OperationKind::Delete => reconciler
            .bulk_delete_transactions(&caller, row.target.split_whitespace())
            .is_success(),
        OperationKind::Default => reconciler
            .update_default_account(&caller, &AccountId::from(row.target.as_str()))
            .is_success()
    }
}
