//! Schema snapshot models.
//!
//! The gateway owns the real schema; the client holds an immutable snapshot
//! fetched once per connection via `get_tables`. The gateway serializes its
//! full table records (sensitivities, budgets, usage markers); the client
//! deserializes only the names and declared types and ignores the rest.

use serde::{Deserialize, Serialize};

/// A column of a gateway-managed table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Column name.
    pub name: String,
    /// Declared type as reported by the gateway (e.g., "INTEGER", "Varchar").
    #[serde(default, alias = "ctype")]
    pub data_type: String,
}

/// A gateway-managed table: name plus ordered columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name.
    pub name: String,
    /// Columns in gateway-declared order.
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    /// Check whether the table declares a column with the given name.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c.name == column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_gateway_payload_with_extra_fields() {
        // The gateway serializes full table records; everything beyond
        // name/columns/ctype must be ignored.
        let payload = serde_json::json!([{
            "name": "orders",
            "privacy_budget": 0.0,
            "columns": [
                {"name": "amount", "ctype": "REAL", "sensitivity": 0.0,
                 "usage": null, "table_name": "orders"},
                {"name": "qty", "ctype": "INTEGER", "sensitivity": 0.0,
                 "usage": null, "table_name": "orders"}
            ]
        }]);

        let tables: Vec<TableSchema> = serde_json::from_value(payload).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "orders");
        assert_eq!(tables[0].columns[0].data_type, "REAL");
        assert!(tables[0].has_column("qty"));
        assert!(!tables[0].has_column("total"));
    }
}
