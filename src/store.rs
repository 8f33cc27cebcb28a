use std::path::Path;

use indexmap::IndexMap;
use log::{debug, warn};
use sqlite::{Connection, State};

use crate::{
    common::quote_identifier,
    query::{CreateTableQuery, FieldSelector, InsertQuery, SelectQuery},
    value::Value,
};

const SQLITE_IOERR: isize = 10;
const SQLITE_CORRUPT: isize = 11;
const SQLITE_CANTOPEN: isize = 14;
const SQLITE_MISUSE: isize = 21;
const SQLITE_NOTADB: isize = 26;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The session is no longer usable.
    #[error("connection lost: {0}")]
    ConnectionLost(String),
    /// The statement was refused: constraint, type or syntax error.
    #[error("statement rejected: {0}")]
    Rejected(String),
}

impl StoreError {
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::ConnectionLost(msg) | Self::Rejected(msg) => msg,
        }
    }
}

impl From<sqlite::Error> for StoreError {
    fn from(err: sqlite::Error) -> Self {
        let message = err.message.clone().unwrap_or_else(|| err.to_string());

        // Extended result codes keep the primary code in the low byte.
        match err.code.map(|code| code & 0xff) {
            Some(SQLITE_IOERR | SQLITE_CORRUPT | SQLITE_CANTOPEN | SQLITE_MISUSE | SQLITE_NOTADB) => {
                Self::ConnectionLost(message)
            }
            _ => Self::Rejected(message),
        }
    }
}

/// A schema-migration capable session. One instance is one unit of work.
pub trait Store {
    /// # Errors
    ///
    /// When the lookup itself fails.
    fn is_table_exist(&self, table_name: &str) -> Result<bool, StoreError>;

    /// Creates the table and its indices together.
    ///
    /// # Errors
    ///
    /// When the table (or an index) cannot be created.
    fn run_create_table_query(&mut self, query: &CreateTableQuery) -> Result<(), StoreError>;

    /// Writes the whole batch in one bulk insert. Returns the number of rows written.
    ///
    /// # Errors
    ///
    /// When the insert is refused or the session breaks. No row of the batch is kept then.
    fn run_insert_query(&mut self, query: &InsertQuery) -> Result<usize, StoreError>;

    /// Rows ordered by id, keyed by `table.field`.
    ///
    /// # Errors
    ///
    /// On query failure.
    fn run_select_query(
        &self,
        query: &SelectQuery,
    ) -> Result<Vec<IndexMap<String, Value>>, StoreError>;

    /// # Errors
    ///
    /// On query failure.
    fn count_rows(&self, table_name: &str) -> Result<usize, StoreError>;

    /// # Errors
    ///
    /// When a transaction cannot be opened.
    fn begin(&mut self) -> Result<(), StoreError>;

    /// # Errors
    ///
    /// When the open transaction cannot be committed.
    fn commit(&mut self) -> Result<(), StoreError>;

    /// # Errors
    ///
    /// When the open transaction cannot be rolled back.
    fn rollback(&mut self) -> Result<(), StoreError>;
}

/// `Store` over a single SQLite connection. The connection closes when the store is dropped.
pub struct SqliteStore {
    connection: Connection,
    location: String,
}

impl SqliteStore {
    /// # Errors
    ///
    /// When the database file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let location = path.as_ref().display().to_string();
        let connection = sqlite::open(path.as_ref()).map_err(|err| {
            StoreError::ConnectionLost(err.message.unwrap_or_else(|| "cannot open".into()))
        })?;
        debug!("Opened {location}");

        Ok(Self {
            connection,
            location,
        })
    }

    /// # Errors
    ///
    /// When SQLite cannot allocate the database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::open(":memory:")
    }

    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Releases the connection.
    pub fn close(self) {
        debug!("Closing {}", self.location);
        drop(self);
    }

    fn query_single_i64(&self, sql: &str) -> Result<i64, StoreError> {
        let mut statement = self.connection.prepare(sql)?;
        match statement.next()? {
            State::Row => Ok(statement.read::<i64, _>(0)?),
            State::Done => Err(StoreError::Rejected(format!("no result for {sql}"))),
        }
    }
}

impl Store for SqliteStore {
    fn is_table_exist(&self, table_name: &str) -> Result<bool, StoreError> {
        let mut statement = self
            .connection
            .prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?")?;
        statement.bind((1, table_name))?;

        Ok(matches!(statement.next()?, State::Row))
    }

    fn run_create_table_query(&mut self, query: &CreateTableQuery) -> Result<(), StoreError> {
        let mut statements = vec![query.schema.create_table_sql()];
        statements.extend(query.schema.create_index_sqls());

        self.begin()?;
        for sql in &statements {
            debug!("{sql}");
            if let Err(err) = self.connection.execute(sql) {
                if let Err(rollback_err) = self.rollback() {
                    warn!(
                        "Rollback after failed create of {} failed: {rollback_err}",
                        query.schema.name
                    );
                }
                return Err(err.into());
            }
        }
        self.commit()
    }

    fn run_insert_query(&mut self, query: &InsertQuery) -> Result<usize, StoreError> {
        if query.rows.is_empty() {
            return Ok(0);
        }

        let sql = query
            .to_sql()
            .ok_or_else(|| StoreError::Rejected("rows carry no columns".into()))?;
        self.connection.execute(&sql)?;

        Ok(query.rows.len())
    }

    fn run_select_query(
        &self,
        query: &SelectQuery,
    ) -> Result<Vec<IndexMap<String, Value>>, StoreError> {
        let mut statement = self.connection.prepare(query.to_sql())?;
        let full_names: Vec<String> = statement
            .column_names()
            .iter()
            .map(|name| {
                FieldSelector {
                    name: name.clone(),
                    source: query.from.clone(),
                }
                .full_name()
            })
            .collect();

        let mut rows = vec![];
        while let State::Row = statement.next()? {
            let mut row = IndexMap::new();
            for (column_idx, full_name) in full_names.iter().enumerate() {
                let value = statement.read::<sqlite::Value, _>(column_idx)?;
                row.insert(full_name.clone(), Value::from(value));
            }
            rows.push(row);
        }

        Ok(rows)
    }

    fn count_rows(&self, table_name: &str) -> Result<usize, StoreError> {
        let count = self.query_single_i64(&format!(
            "SELECT COUNT(*) FROM {}",
            quote_identifier(table_name)
        ))?;

        usize::try_from(count).map_err(|_| StoreError::Rejected(format!("bad count {count}")))
    }

    fn begin(&mut self) -> Result<(), StoreError> {
        Ok(self.connection.execute("BEGIN")?)
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        Ok(self.connection.execute("COMMIT")?)
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        Ok(self.connection.execute("ROLLBACK")?)
    }
}
