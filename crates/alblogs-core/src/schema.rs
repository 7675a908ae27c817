//! SQLite schema derived from a field list.
//!
//! Each field becomes one column, in field order. A handful of fields known
//! to be numeric get a native numeric type; everything else is declared
//! without a type so SQLite stores the raw text untouched.
//!
//! Duplicate suppression is a property of the schema: the unique index is the
//! deduplication key and the insert statement ignores rows that violate it.

use crate::fields::FieldSchema;

pub const TABLE_NAME: &str = "logs";
pub const INDEX_NAME: &str = "idx0";

const INTEGER_FIELDS: &[&str] = &[
    "elb_status_code",
    "target_status_code",
    "received_bytes",
    "sent_bytes",
    "matched_rule_priority",
];

const REAL_FIELDS: &[&str] = &[
    "request_processing_time",
    "target_processing_time",
    "response_processing_time",
];

/// The field pair that identifies one logged request.
const REQUEST_IDENTITY: [&str; 2] = ["request_creation_time", "trace_id"];

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    /// Free-form value, declared without a type.
    Text,
}

impl ColumnType {
    /// Classify a field by exact name.
    pub fn for_field(name: &str) -> Self {
        if INTEGER_FIELDS.contains(&name) {
            ColumnType::Integer
        } else if REAL_FIELDS.contains(&name) {
            ColumnType::Real
        } else {
            ColumnType::Text
        }
    }

    /// Declared type in DDL, if any.
    pub fn declared_type(self) -> Option<&'static str> {
        match self {
            ColumnType::Integer => Some("INTEGER"),
            ColumnType::Real => Some("REAL"),
            ColumnType::Text => None,
        }
    }
}

/// Which columns the unique index covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueKey {
    /// `(request_creation_time, trace_id)`.
    RequestIdentity,
    /// Every column. Rows that agree on every value collapse into one, even
    /// if they were distinct requests.
    WholeRow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

/// Generated statements for one field list.
#[derive(Debug, Clone)]
pub struct TableSchema {
    columns: Vec<Column>,
    unique_key: UniqueKey,
    create_table: String,
    create_index: String,
    insert: String,
}

impl TableSchema {
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Number of values every record must carry.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn unique_key(&self) -> UniqueKey {
        self.unique_key
    }

    /// Column names covered by the unique index, in index order.
    pub fn unique_columns(&self) -> Vec<&str> {
        match self.unique_key {
            UniqueKey::RequestIdentity => REQUEST_IDENTITY.to_vec(),
            UniqueKey::WholeRow => self.columns.iter().map(|c| c.name.as_str()).collect(),
        }
    }

    pub fn create_table_sql(&self) -> &str {
        &self.create_table
    }

    pub fn create_index_sql(&self) -> &str {
        &self.create_index
    }

    /// Insert statement with one positional parameter per column.
    pub fn insert_sql(&self) -> &str {
        &self.insert
    }

    /// Statements that initialize a store, in execution order.
    pub fn init_statements(&self) -> [&str; 2] {
        [&self.create_table, &self.create_index]
    }
}

/// Compiles a [`FieldSchema`] into a [`TableSchema`].
pub struct SchemaBuilder;

impl SchemaBuilder {
    pub fn build(fields: &FieldSchema) -> TableSchema {
        let columns: Vec<Column> = fields
            .names()
            .iter()
            .map(|name| Column {
                name: name.clone(),
                column_type: ColumnType::for_field(name),
            })
            .collect();

        let unique_key = if fields.contains_all(&REQUEST_IDENTITY) {
            UniqueKey::RequestIdentity
        } else {
            UniqueKey::WholeRow
        };

        let column_defs: Vec<String> = columns
            .iter()
            .map(|c| match c.column_type.declared_type() {
                Some(ty) => format!("    {} {}", quote_ident(&c.name), ty),
                None => format!("    {}", quote_ident(&c.name)),
            })
            .collect();
        let create_table = format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
            TABLE_NAME,
            column_defs.join(",\n")
        );

        let mut schema = TableSchema {
            columns,
            unique_key,
            create_table,
            create_index: String::new(),
            insert: String::new(),
        };

        let index_cols = quoted_list(schema.unique_columns());
        schema.create_index = format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({})",
            INDEX_NAME, TABLE_NAME, index_cols
        );

        let all_cols = quoted_list(schema.columns.iter().map(|c| c.name.as_str()));
        let placeholders = vec!["?"; schema.columns.len()].join(", ");
        schema.insert = format!(
            "INSERT OR IGNORE INTO {} ({}) VALUES ({})",
            TABLE_NAME, all_cols, placeholders
        );

        schema
    }
}

// Names are validated by FieldSchema, so no escaping is needed.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name)
}

fn quoted_list<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names
        .into_iter()
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema_of(names: &[&str]) -> TableSchema {
        SchemaBuilder::build(&FieldSchema::new(names.iter().copied()).unwrap())
    }

    #[test]
    fn test_column_types_by_exact_name() {
        for name in INTEGER_FIELDS {
            assert_eq!(ColumnType::for_field(name), ColumnType::Integer);
        }
        for name in REAL_FIELDS {
            assert_eq!(ColumnType::for_field(name), ColumnType::Real);
        }
        for name in ["time", "elb_status", "sent_bytes_total", "trace_id", "Sent_bytes"] {
            assert_eq!(ColumnType::for_field(name), ColumnType::Text);
        }
    }

    #[test]
    fn test_types_independent_of_order() {
        let forward = ["user_agent", "sent_bytes", "target_processing_time", "elb"];
        let mut reversed = forward;
        reversed.reverse();

        for names in [&forward[..], &reversed[..]] {
            let schema = schema_of(names);
            for col in schema.columns() {
                assert_eq!(col.column_type, ColumnType::for_field(&col.name));
            }
        }
    }

    #[test]
    fn test_create_table_preserves_order_and_types() {
        let schema = schema_of(&["type", "elb_status_code", "request_processing_time"]);
        assert_eq!(
            schema.create_table_sql(),
            "CREATE TABLE IF NOT EXISTS logs (\n    \"type\",\n    \"elb_status_code\" INTEGER,\n    \"request_processing_time\" REAL\n)"
        );
    }

    #[test]
    fn test_unique_index_on_request_identity() {
        let schema = schema_of(&["type", "time", "request_creation_time", "trace_id"]);
        assert_eq!(schema.unique_key(), UniqueKey::RequestIdentity);
        assert_eq!(
            schema.create_index_sql(),
            "CREATE UNIQUE INDEX IF NOT EXISTS idx0 ON logs (\"request_creation_time\", \"trace_id\")"
        );
    }

    #[test]
    fn test_unique_index_falls_back_to_whole_row() {
        let schema = schema_of(&["type", "time", "trace_id"]);
        assert_eq!(schema.unique_key(), UniqueKey::WholeRow);
        assert_eq!(schema.unique_columns(), vec!["type", "time", "trace_id"]);
        assert_eq!(
            schema.create_index_sql(),
            "CREATE UNIQUE INDEX IF NOT EXISTS idx0 ON logs (\"type\", \"time\", \"trace_id\")"
        );
    }

    #[test]
    fn test_insert_ignores_conflicts() {
        let schema = schema_of(&["a", "b", "c"]);
        assert_eq!(
            schema.insert_sql(),
            "INSERT OR IGNORE INTO logs (\"a\", \"b\", \"c\") VALUES (?, ?, ?)"
        );
        assert_eq!(schema.width(), 3);
    }

    #[test]
    fn test_init_statements_order() {
        let schema = schema_of(&["a"]);
        let [first, second] = schema.init_statements();
        assert!(first.starts_with("CREATE TABLE"));
        assert!(second.starts_with("CREATE UNIQUE INDEX"));
    }
}
