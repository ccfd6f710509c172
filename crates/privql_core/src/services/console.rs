//! Ad-hoc query execution against the gateway.
//!
//! The console holds the two input fields (SQL text and spending budget) so
//! that their clearing rules live with the execution outcome: cleared on
//! success, retained on failure for retry. It does no budget bookkeeping of
//! its own; the gateway alone decides whether a query is affordable.

use crate::error::PrivqlError;
use crate::models::{parse_or_default, OutputEntry, QueryRequest};
use crate::services::gateway::Gateway;
use crate::state::{Phase, Session};

/// Submits budgeted SQL and appends results to the session output log.
///
/// `execute` takes `&mut self`, so one console has at most one request in
/// flight by construction.
pub struct QueryConsole {
    sql_input: String,
    budget_input: String,
}

impl QueryConsole {
    /// Create a console with empty input fields.
    pub fn new() -> Self {
        Self { sql_input: String::new(), budget_input: String::new() }
    }

    /// Set the SQL input field.
    pub fn set_sql(&mut self, sql: impl Into<String>) {
        self.sql_input = sql.into();
    }

    /// Set the budget input field (opaque string until execution).
    pub fn set_budget(&mut self, budget: impl Into<String>) {
        self.budget_input = budget.into();
    }

    /// Current SQL input.
    pub fn sql_input(&self) -> &str {
        &self.sql_input
    }

    /// Current budget input.
    pub fn budget_input(&self) -> &str {
        &self.budget_input
    }

    /// Execute the current inputs as one gateway call.
    ///
    /// A missing or malformed budget is a validation error and makes zero
    /// gateway calls. On success the rendered result is appended to the
    /// session output log and both inputs are cleared; on failure the log is
    /// untouched and the inputs are retained for retry. Returns `Ok(None)`
    /// when a success arrived after a reset and was discarded.
    pub async fn execute<G: Gateway>(
        &mut self,
        session: &Session,
        gateway: &G,
    ) -> Result<Option<OutputEntry>, PrivqlError> {
        if session.phase() != Phase::SensitivitiesSet {
            return Err(PrivqlError::internal(format!(
                "execute called while {}",
                session.phase()
            )));
        }

        let raw_budget = self.budget_input.trim();
        if raw_budget.is_empty() {
            return Err(PrivqlError::validation("budget", "provide the budget for the query"));
        }
        let budget = parse_or_default("budget", raw_budget, 0.0)?;

        let request = QueryRequest::new(self.sql_input.clone(), budget);
        tracing::debug!(query_id = %request.id, budget, "Executing query");

        let epoch = session.epoch();
        let rows = gateway.execute_sql(&request.sql, request.budget).await.map_err(|e| {
            tracing::warn!(query_id = %request.id, error = %e, "Query failed");
            e
        })?;

        if !session.is_current(epoch) {
            tracing::debug!(query_id = %request.id, "Discarding result from a stale epoch");
            return Ok(None);
        }

        let entry = OutputEntry::new(&request, rows);
        session.append_output(entry.clone())?;
        self.sql_input.clear();
        self.budget_input.clear();

        tracing::debug!(query_id = %request.id, rows = entry.rows.len(), "Query completed");
        Ok(Some(entry))
    }
}

impl Default for QueryConsole {
    fn default() -> Self {
        Self::new()
    }
}
