use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::common::{is_identifier, quote_identifier};

/// Name of the implicit auto-increment primary key column.
pub const ID_FIELD: &str = "id";

/// Width of Sequel's default `String` migration column.
pub const DEFAULT_VARCHAR_LEN: u32 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Text,
    Varchar(u32),
    Integer,
}

impl FieldType {
    #[must_use]
    pub fn sql_type(&self) -> String {
        match self {
            Self::Text => "text".to_string(),
            Self::Varchar(len) => format!("varchar({len})"),
            Self::Integer => "integer".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub field_type: FieldType,
    pub required: bool,
    #[serde(default)]
    pub indexed: bool,
    #[serde(default)]
    pub unique: bool,
}

impl FieldSchema {
    #[must_use]
    pub const fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            indexed: false,
            unique: false,
        }
    }

    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub const fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    /// Unique implies indexed.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.indexed = true;
        self.unique = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub fields: IndexMap<String, FieldSchema>,
}

impl TableSchema {
    /// The `things` table: `id` primary key plus a required, indexed `name` string.
    #[must_use]
    pub fn things() -> Self {
        Self {
            name: "things".into(),
            fields: IndexMap::from([(
                "name".into(),
                FieldSchema::new(FieldType::Varchar(DEFAULT_VARCHAR_LEN))
                    .required()
                    .indexed(),
            )]),
        }
    }

    /// # Errors
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if !is_identifier(&self.name) {
            return Err(format!("invalid table name {:?}", self.name));
        }
        if self.fields.is_empty() {
            return Err(format!("table {} has no fields", self.name));
        }

        for field_name in self.fields.keys() {
            if !is_identifier(field_name) {
                return Err(format!("invalid field name {field_name:?}"));
            }
            if field_name.eq_ignore_ascii_case(ID_FIELD) {
                return Err(format!(
                    "field {field_name:?} collides with the primary key column"
                ));
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn index_name(&self, field_name: &str) -> String {
        format!("{}_{}_index", self.name, field_name)
    }

    #[must_use]
    pub fn create_table_sql(&self) -> String {
        let mut columns = vec![format!(
            "{} INTEGER PRIMARY KEY AUTOINCREMENT",
            quote_identifier(ID_FIELD)
        )];

        for (field_name, field_schema) in &self.fields {
            let mut column = format!(
                "{} {}",
                quote_identifier(field_name),
                field_schema.field_type.sql_type()
            );
            if field_schema.required {
                column.push_str(" NOT NULL");
            }
            columns.push(column);
        }

        format!(
            "CREATE TABLE {} ({})",
            quote_identifier(&self.name),
            columns.join(", ")
        )
    }

    /// One `CREATE INDEX` per indexed field, in field order.
    #[must_use]
    pub fn create_index_sqls(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(_, field_schema)| field_schema.indexed)
            .map(|(field_name, field_schema)| {
                format!(
                    "CREATE {}INDEX {} ON {} ({})",
                    if field_schema.unique { "UNIQUE " } else { "" },
                    quote_identifier(&self.index_name(field_name)),
                    quote_identifier(&self.name),
                    quote_identifier(field_name)
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_things_schema_sql() {
        let schema = TableSchema::things();

        assert!(schema.validate().is_ok());
        assert_eq!(
            "CREATE TABLE \"things\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \"name\" varchar(255) NOT NULL)",
            schema.create_table_sql()
        );
        assert_eq!(
            vec!["CREATE INDEX \"things_name_index\" ON \"things\" (\"name\")".to_string()],
            schema.create_index_sqls()
        );
    }

    #[test]
    fn test_unique_and_plain_fields() {
        let schema = TableSchema {
            name: "t".into(),
            fields: IndexMap::from([
                ("a".into(), FieldSchema::new(FieldType::Integer)),
                ("b".into(), FieldSchema::new(FieldType::Text).unique()),
            ]),
        };

        assert_eq!(
            "CREATE TABLE \"t\" (\"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \"a\" integer, \"b\" text)",
            schema.create_table_sql()
        );
        assert_eq!(
            vec!["CREATE UNIQUE INDEX \"t_b_index\" ON \"t\" (\"b\")".to_string()],
            schema.create_index_sqls()
        );
    }

    #[test]
    fn test_validate_rejects_bad_schemas() {
        let mut schema = TableSchema::things();
        schema.name = "bad name".into();
        assert!(schema.validate().is_err());

        let mut schema = TableSchema::things();
        schema.fields.clear();
        assert!(schema.validate().is_err());

        let mut schema = TableSchema::things();
        schema
            .fields
            .insert("ID".into(), FieldSchema::new(FieldType::Integer));
        assert!(schema.validate().is_err());

        let mut schema = TableSchema::things();
        schema
            .fields
            .insert("x y".into(), FieldSchema::new(FieldType::Integer));
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_schema_from_json() {
        let raw = r#"{
            "name": "people",
            "fields": {
                "email": { "field_type": "Text", "required": true, "indexed": true, "unique": true },
                "age": { "field_type": "Integer", "required": false }
            }
        }"#;

        let schema: TableSchema = serde_json::from_str(raw).unwrap();

        assert_eq!("people", schema.name);
        assert_eq!(
            vec!["email", "age"],
            schema.fields.keys().map(String::as_str).collect::<Vec<_>>()
        );
        assert!(schema.fields["email"].unique);
        assert!(!schema.fields["age"].indexed);
    }

    #[test]
    fn test_varchar_json_form() {
        let json = serde_json::to_string(&FieldType::Varchar(255)).unwrap();
        assert_eq!(r#"{"Varchar":255}"#, json);
    }
}
