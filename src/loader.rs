use std::str::FromStr;

use log::{debug, info, warn};

use crate::{
    query::{InsertQuery, Row},
    store::{Store, StoreError},
};

/// Upper bound on rows reserved ahead of time for one batch buffer.
const MAX_PREALLOCATED_ROWS: usize = 4096;

/// What happens to already committed batches when a later one fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadPolicy {
    /// Every batch commits on its own. A failure leaves earlier batches persisted.
    #[default]
    KeepCommitted,
    /// One transaction spans the whole load. A failure rolls back every batch.
    AllOrNothing,
}

impl FromStr for LoadPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep-committed" | "keep_committed" => Ok(Self::KeepCommitted),
            "all-or-nothing" | "all_or_nothing" => Ok(Self::AllOrNothing),
            other => Err(format!("unknown load policy {other:?}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("batch size must be at least 1")]
    InvalidBatchSize,
    #[error("batch #{batch_index} failed with {rows_committed} rows committed before it: {cause}")]
    InsertFailed {
        batch_index: usize,
        rows_committed: usize,
        cause: StoreError,
    },
    #[error("load transaction failed: {0}")]
    Transaction(StoreError),
}

impl LoadError {
    /// Rows that remain persisted after this failure.
    #[must_use]
    pub const fn rows_committed(&self) -> usize {
        match self {
            Self::InsertFailed { rows_committed, .. } => *rows_committed,
            Self::InvalidBatchSize | Self::Transaction(_) => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub batches: usize,
    pub rows: usize,
}

/// Writes a dataset into a table in consecutive batches of at most `batch_size` rows.
///
/// Batches are submitted in input order, each one only after the previous completed.
/// The final partial batch is always flushed.
#[derive(Debug, Clone)]
pub struct BatchLoader {
    batch_size: usize,
    policy: LoadPolicy,
    expected_rows: Option<usize>,
}

impl BatchLoader {
    #[must_use]
    pub const fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            policy: LoadPolicy::KeepCommitted,
            expected_rows: None,
        }
    }

    #[must_use]
    pub const fn with_policy(mut self, policy: LoadPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Enables coarse progress logging against the given total.
    #[must_use]
    pub const fn with_expected_rows(mut self, expected_rows: usize) -> Self {
        self.expected_rows = Some(expected_rows);
        self
    }

    /// # Errors
    ///
    /// `InvalidBatchSize` before anything is written, `InsertFailed` for the first batch
    /// the store refuses (later batches are never attempted) or `Transaction` when the
    /// all-or-nothing transaction cannot be opened or committed.
    pub fn load<S, I>(&self, store: &mut S, table: &str, dataset: I) -> Result<LoadReport, LoadError>
    where
        S: Store + ?Sized,
        I: IntoIterator<Item = Row>,
    {
        if self.batch_size == 0 {
            return Err(LoadError::InvalidBatchSize);
        }

        match self.policy {
            LoadPolicy::KeepCommitted => self.load_batches(store, table, dataset),
            LoadPolicy::AllOrNothing => {
                store.begin().map_err(LoadError::Transaction)?;

                match self.load_batches(store, table, dataset) {
                    Ok(report) => {
                        store.commit().map_err(LoadError::Transaction)?;
                        Ok(report)
                    }
                    Err(LoadError::InsertFailed {
                        batch_index, cause, ..
                    }) => {
                        if let Err(err) = store.rollback() {
                            warn!("Rollback after batch #{batch_index} failed: {err}");
                        }
                        Err(LoadError::InsertFailed {
                            batch_index,
                            rows_committed: 0,
                            cause,
                        })
                    }
                    Err(err) => Err(err),
                }
            }
        }
    }

    fn load_batches<S, I>(
        &self,
        store: &mut S,
        table: &str,
        dataset: I,
    ) -> Result<LoadReport, LoadError>
    where
        S: Store + ?Sized,
        I: IntoIterator<Item = Row>,
    {
        let rows = dataset.into_iter();
        let capacity = self
            .batch_size
            .min(rows.size_hint().1.unwrap_or(usize::MAX))
            .min(MAX_PREALLOCATED_ROWS);

        let mut report = LoadReport::default();
        let mut batch = Vec::with_capacity(capacity);

        for row in rows {
            batch.push(row);

            if batch.len() == self.batch_size {
                let full = std::mem::replace(&mut batch, Vec::with_capacity(capacity));
                self.flush(store, table, full, &mut report)?;
            }
        }

        if !batch.is_empty() {
            self.flush(store, table, batch, &mut report)?;
        }

        info!(
            "Loaded {} rows into {} in {} batches",
            report.rows, table, report.batches
        );

        Ok(report)
    }

    fn flush<S>(
        &self,
        store: &mut S,
        table: &str,
        rows: Vec<Row>,
        report: &mut LoadReport,
    ) -> Result<(), LoadError>
    where
        S: Store + ?Sized,
    {
        let batch_index = report.batches;
        let query = InsertQuery {
            table: table.to_string(),
            rows,
        };

        let inserted = store
            .run_insert_query(&query)
            .map_err(|cause| LoadError::InsertFailed {
                batch_index,
                rows_committed: report.rows,
                cause,
            })?;

        let previous_rows = report.rows;
        report.batches += 1;
        report.rows += inserted;
        debug!("Batch #{batch_index}: {inserted} rows");

        if let Some(expected_rows) = self.expected_rows {
            let step = (expected_rows / 10).max(1);
            if report.rows / step > previous_rows / step {
                info!("Progress: {}/{} rows", report.rows, expected_rows);
            }
        }

        Ok(())
    }
}

/// Loads `dataset` into `table` with batches of `batch_size`, keeping committed batches on failure.
///
/// # Errors
///
/// See [`BatchLoader::load`].
pub fn load<S, I>(
    store: &mut S,
    dataset: I,
    table: &str,
    batch_size: usize,
) -> Result<LoadReport, LoadError>
where
    S: Store + ?Sized,
    I: IntoIterator<Item = Row>,
{
    BatchLoader::new(batch_size).load(store, table, dataset)
}
