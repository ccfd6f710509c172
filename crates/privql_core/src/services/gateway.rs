//! The gateway boundary.
//!
//! The privacy-enforcing query service owns the database connection, the
//! sensitivity table, the budget ledger, and query execution. The client
//! reaches it only through these seven named calls; it never caches
//! authoritative copies of anything the gateway owns.

use crate::error::PrivqlError;
use crate::models::{BudgetMap, NoisedRow, SensitivityMap, TableSchema};

use std::future::Future;

/// The privacy-enforcing backend, reached via single-shot remote calls.
///
/// All methods return `Send` futures so callers may drive them from spawned
/// tasks. Implementations live behind a transport ([`crate::services::rpc::RpcClient`])
/// or, in tests, a scripted mock.
pub trait Gateway: Send + Sync {
    /// Open a connection to the database at `database_path`.
    ///
    /// Returns the gateway's success message. The client holds no further
    /// data about the connection beyond "one exists".
    fn connect(
        &self,
        database_path: &str,
    ) -> impl Future<Output = Result<String, PrivqlError>> + Send;

    /// Fetch the full schema snapshot: ordered tables with ordered columns.
    fn get_tables(&self) -> impl Future<Output = Result<Vec<TableSchema>, PrivqlError>> + Send;

    /// Submit per-column sensitivity bounds.
    fn set_sensitivities(
        &self,
        sensitivities: &SensitivityMap,
    ) -> impl Future<Output = Result<String, PrivqlError>> + Send;

    /// Submit per-table privacy budgets.
    fn set_budgets(
        &self,
        budgets: &BudgetMap,
    ) -> impl Future<Output = Result<String, PrivqlError>> + Send;

    /// Execute one SQL query, spending `budget` against the tables it touches.
    ///
    /// The gateway is the sole authority on whether the query is permitted
    /// under remaining budget.
    fn execute_sql(
        &self,
        query: &str,
        budget: f64,
    ) -> impl Future<Output = Result<Vec<NoisedRow>, PrivqlError>> + Send;

    /// Discard accepted sensitivities and budgets.
    ///
    /// The gateway treats "reset with nothing to reset" as a success.
    fn reset_sensitivities(&self) -> impl Future<Output = Result<(), PrivqlError>> + Send;

    /// Discard the database connection. Also a success when there is none.
    fn reset_connection(&self) -> impl Future<Output = Result<(), PrivqlError>> + Send;
}
