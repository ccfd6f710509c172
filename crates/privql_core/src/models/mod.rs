//! Data models for the privql client.
//!
//! This module contains all core data structures:
//! - `schema` - TableSchema/ColumnSchema snapshots from the gateway
//! - `privacy` - SensitivityMap, BudgetMap, and input normalization
//! - `query` - QueryRequest, NoisedRow, OutputEntry

pub mod privacy;
pub mod query;
pub mod schema;

pub use privacy::{parse_or_default, BudgetMap, SensitivityMap};
pub use query::{NoisedRow, OutputEntry, QueryRequest};
pub use schema::{ColumnSchema, TableSchema};
