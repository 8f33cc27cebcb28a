use indexmap::{IndexMap, IndexSet};

use crate::{common::quote_identifier, schema::TableSchema, value::Value};

/// A row before insertion: column name to value, in column order. The `id` is never set here.
pub type Row = IndexMap<String, Value>;

pub struct FieldSelector {
    pub name: String,
    pub source: String,
}

impl FieldSelector {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.source, self.name)
    }
}

pub struct CreateTableQuery {
    pub schema: TableSchema,
}

/// Multi-row insert of an ordered batch into one table.
pub struct InsertQuery {
    pub table: String,
    pub rows: Vec<Row>,
}

impl InsertQuery {
    /// Union of the row keys in order of first appearance.
    #[must_use]
    pub fn columns(&self) -> IndexSet<&str> {
        self.rows
            .iter()
            .flat_map(|row| row.keys().map(String::as_str))
            .collect()
    }

    /// A single `INSERT ... VALUES (..), (..)` statement. Missing values are written as NULL.
    /// Returns `None` when there is nothing to insert or no column to insert into.
    #[must_use]
    pub fn to_sql(&self) -> Option<String> {
        if self.rows.is_empty() {
            return None;
        }

        let columns = self.columns();
        if columns.is_empty() {
            return None;
        }

        let mut sql = format!("INSERT INTO {} (", quote_identifier(&self.table));
        sql.push_str(
            &columns
                .iter()
                .map(|column| quote_identifier(column))
                .collect::<Vec<_>>()
                .join(", "),
        );
        sql.push_str(") VALUES ");

        for (row_idx, row) in self.rows.iter().enumerate() {
            if row_idx > 0 {
                sql.push_str(", ");
            }
            sql.push('(');
            for (column_idx, column) in columns.iter().enumerate() {
                if column_idx > 0 {
                    sql.push_str(", ");
                }
                row.get(*column)
                    .unwrap_or(&Value::NULL)
                    .write_sql_literal(&mut sql);
            }
            sql.push(')');
        }

        Some(sql)
    }
}

/// Reads rows ordered by primary key.
pub struct SelectQuery {
    pub from: String,
    pub limit: Option<usize>,
}

impl SelectQuery {
    #[must_use]
    pub fn to_sql(&self) -> String {
        let mut sql = format!(
            "SELECT * FROM {} ORDER BY {}",
            quote_identifier(&self.from),
            quote_identifier(crate::schema::ID_FIELD)
        );
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        sql
    }
}
