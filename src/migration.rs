use log::info;

use crate::{
    dataset::SequenceDataset,
    loader::{BatchLoader, LoadError, LoadPolicy, LoadReport},
    query::CreateTableQuery,
    schema::TableSchema,
    store::{Store, StoreError},
};

const DEFAULT_ROWS: usize = 1_000_000;
const DEFAULT_BATCH_SIZE: usize = 1000;

const THINGS_BANNER: &str = "\
The inserted values are numbers stored into the default `String` migration column, \
which is `varchar`. Queries bind unicode string literals (N'val') against it, so the \
server converts the column on every comparison and cannot seek its index. \
This table exists to measure that cost.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("table {table} already exists")]
    SchemaConflict { table: String },
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrationError {
    #[error("schema step failed: {0}")]
    Schema(#[from] SchemaError),
    #[error("load step failed: {0}")]
    Load(#[from] LoadError),
}

impl MigrationError {
    /// Rows left in the table by the failed run.
    #[must_use]
    pub const fn rows_committed(&self) -> usize {
        match self {
            Self::Schema(_) => 0,
            Self::Load(err) => err.rows_committed(),
        }
    }
}

/// Creates the table described by `schema` together with its indices.
///
/// Not idempotent: an existing table is a `SchemaConflict`.
///
/// # Errors
///
/// `InvalidSchema` for bad names, `SchemaConflict` when the table exists, `Store` otherwise.
pub fn define_schema<S: Store + ?Sized>(
    store: &mut S,
    schema: &TableSchema,
) -> Result<(), SchemaError> {
    schema.validate().map_err(SchemaError::InvalidSchema)?;

    if store.is_table_exist(&schema.name)? {
        return Err(SchemaError::SchemaConflict {
            table: schema.name.clone(),
        });
    }

    let query = CreateTableQuery {
        schema: schema.clone(),
    };
    store.run_create_table_query(&query).map_err(|err| match err {
        StoreError::Rejected(msg) if msg.contains("already exists") => {
            SchemaError::SchemaConflict {
                table: schema.name.clone(),
            }
        }
        err => SchemaError::Store(err),
    })?;

    info!("Created table {}", schema.name);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationReport {
    pub batches: usize,
    pub rows: usize,
}

impl From<LoadReport> for MigrationReport {
    fn from(report: LoadReport) -> Self {
        Self {
            batches: report.batches,
            rows: report.rows,
        }
    }
}

/// Create a table, then seed its first field with `"0".."rows-1"`.
#[derive(Debug, Clone)]
pub struct Migration {
    pub schema: TableSchema,
    pub rows: usize,
    pub batch_size: usize,
    pub policy: LoadPolicy,
}

impl Default for Migration {
    fn default() -> Self {
        Self::things(DEFAULT_ROWS, DEFAULT_BATCH_SIZE)
    }
}

impl Migration {
    #[must_use]
    pub fn things(rows: usize, batch_size: usize) -> Self {
        Self::new(TableSchema::things(), rows, batch_size)
    }

    #[must_use]
    pub const fn new(schema: TableSchema, rows: usize, batch_size: usize) -> Self {
        Self {
            schema,
            rows,
            batch_size,
            policy: LoadPolicy::KeepCommitted,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: LoadPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// # Errors
    ///
    /// `Load(InvalidBatchSize)` before any schema change for a zero batch size,
    /// `Schema` when the table cannot be created (nothing is loaded then),
    /// `Load` when a batch fails.
    pub fn run<S: Store + ?Sized>(
        &self,
        store: &mut S,
    ) -> Result<MigrationReport, MigrationError> {
        let Some(seed_field) = self.schema.fields.keys().next() else {
            return Err(SchemaError::InvalidSchema(format!(
                "table {} has no fields",
                self.schema.name
            ))
            .into());
        };

        if self.batch_size == 0 {
            return Err(LoadError::InvalidBatchSize.into());
        }

        define_schema(store, &self.schema)?;

        info!(
            "Inserting {} sample rows into [{}]. {}",
            self.rows, self.schema.name, THINGS_BANNER
        );

        let report = BatchLoader::new(self.batch_size)
            .with_policy(self.policy)
            .with_expected_rows(self.rows)
            .load(
                store,
                &self.schema.name,
                SequenceDataset::new(seed_field.as_str(), self.rows),
            )?;

        info!("Done.");
        Ok(report.into())
    }
}

#[cfg(test)]
mod test {
    use std::sync::{Mutex, Once};

    use super::*;
    use crate::{loader::test::RecordingStore, store::SqliteStore};

    /// Keeps log lines per test thread so assertions only see their own run.
    struct CaptureLog;

    static CAPTURED: Mutex<Vec<(String, String)>> = Mutex::new(Vec::new());

    impl log::Log for CaptureLog {
        fn enabled(&self, _metadata: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            let thread = std::thread::current().name().unwrap_or("").to_string();
            CAPTURED
                .lock()
                .unwrap()
                .push((thread, record.args().to_string()));
        }

        fn flush(&self) {}
    }

    fn capture_logs() {
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            log::set_logger(&CaptureLog).unwrap();
            log::set_max_level(log::LevelFilter::Info);
        });
    }

    fn logged_by_this_test() -> Vec<String> {
        let thread = std::thread::current().name().unwrap_or("").to_string();
        CAPTURED
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| *t == thread)
            .map(|(_, line)| line.clone())
            .collect()
    }

    #[test]
    fn test_define_schema_twice_conflicts() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let schema = TableSchema::things();

        assert!(define_schema(&mut store, &schema).is_ok());
        assert_eq!(
            Err(SchemaError::SchemaConflict {
                table: "things".into()
            }),
            define_schema(&mut store, &schema)
        );
    }

    #[test]
    fn test_define_schema_rejects_invalid() {
        let mut store = RecordingStore::default();
        let mut schema = TableSchema::things();
        schema.name = "things;".into();

        assert!(matches!(
            define_schema(&mut store, &schema),
            Err(SchemaError::InvalidSchema(_))
        ));
        assert!(store.tables.is_empty());
    }

    #[test]
    fn test_conflict_loads_nothing() {
        let mut store = RecordingStore::default();
        store.tables.push("things".into());

        let err = Migration::things(10, 3).run(&mut store).unwrap_err();

        assert!(matches!(
            err,
            MigrationError::Schema(SchemaError::SchemaConflict { .. })
        ));
        assert_eq!(0, err.rows_committed());
        assert_eq!(0, store.attempts);
    }

    #[test]
    fn test_conflict_does_not_announce_insert() {
        capture_logs();
        let mut store = RecordingStore::default();
        store.tables.push("things".into());

        assert!(Migration::things(10, 3).run(&mut store).is_err());

        assert!(logged_by_this_test()
            .iter()
            .all(|line| !line.starts_with("Inserting")));
    }

    #[test]
    fn test_successful_run_announces_insert_after_create() {
        capture_logs();
        let mut store = RecordingStore::default();

        Migration::things(10, 3).run(&mut store).unwrap();

        let lines = logged_by_this_test();
        let created = lines.iter().position(|l| l == "Created table things");
        let inserting = lines.iter().position(|l| l.starts_with("Inserting 10 sample rows"));
        assert!(created.is_some());
        assert!(inserting.is_some());
        assert!(created < inserting);
    }

    #[test]
    fn test_run_reports_batches() {
        let mut store = RecordingStore::default();

        let report = Migration::things(10, 3).run(&mut store).unwrap();

        assert_eq!(MigrationReport { batches: 4, rows: 10 }, report);
        assert_eq!(vec!["things".to_string()], store.tables);
    }

    #[test]
    fn test_load_failure_surfaces_committed_rows() {
        let mut store = RecordingStore::failing_on(1, StoreError::Rejected("boom".into()));

        let err = Migration::things(25, 10).run(&mut store).unwrap_err();

        assert_eq!(10, err.rows_committed());
        assert_eq!(
            "load step failed: batch #1 failed with 10 rows committed before it: statement rejected: boom",
            err.to_string()
        );
    }

    #[test]
    fn test_zero_batch_size_leaves_no_table() {
        let mut store = SqliteStore::open_in_memory().unwrap();

        let err = Migration::things(10, 0).run(&mut store).unwrap_err();

        assert_eq!(MigrationError::Load(LoadError::InvalidBatchSize), err);
        assert!(!store.is_table_exist("things").unwrap());

        // A corrected rerun goes through.
        let report = Migration::things(10, 3).run(&mut store).unwrap();
        assert_eq!(10, report.rows);
    }

    #[test]
    fn test_default_is_million_things() {
        let migration = Migration::default();

        assert_eq!(1_000_000, migration.rows);
        assert_eq!(1000, migration.batch_size);
        assert_eq!(LoadPolicy::KeepCommitted, migration.policy);
        assert_eq!(TableSchema::things(), migration.schema);
    }
}
