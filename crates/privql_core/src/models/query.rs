//! Query execution models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// One perturbed result row: column label (or aggregate expression) to
/// noised value. The gateway is the sole authority on the noise applied.
pub type NoisedRow = HashMap<String, f64>;

/// A single budgeted query, existing only for the duration of one
/// `execute_sql` call. The id is for log correlation only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Unique request identifier.
    pub id: Uuid,
    /// Raw SQL text, forwarded verbatim to the gateway.
    pub sql: String,
    /// Privacy budget the caller is willing to spend on this query.
    pub budget: f64,
}

impl QueryRequest {
    /// Create a new query request.
    pub fn new(sql: impl Into<String>, budget: f64) -> Self {
        Self { id: Uuid::new_v4(), sql: sql.into(), budget }
    }
}

/// One rendered query result in the output log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputEntry {
    /// The SQL that was executed.
    pub sql: String,
    /// The budget spent on it.
    pub budget: f64,
    /// Perturbed rows returned by the gateway.
    pub rows: Vec<NoisedRow>,
    /// When the result arrived.
    pub executed_at: DateTime<Utc>,
}

impl OutputEntry {
    /// Create an entry from a completed query.
    pub fn new(request: &QueryRequest, rows: Vec<NoisedRow>) -> Self {
        Self {
            sql: request.sql.clone(),
            budget: request.budget,
            rows,
            executed_at: Utc::now(),
        }
    }

    /// Text rendering of this entry, one line per result row.
    pub fn render(&self) -> String {
        let mut out = format!("Executed: {} (budget {})", self.sql, self.budget);
        for row in &self.rows {
            // Sort labels so the rendering is stable across runs.
            let mut cells: Vec<(&String, &f64)> = row.iter().collect();
            cells.sort_by(|a, b| a.0.cmp(b.0));
            let line: Vec<String> =
                cells.into_iter().map(|(label, value)| format!("{label}={value}")).collect();
            out.push_str("\n  ");
            out.push_str(&line.join(", "));
        }
        out
    }
}
