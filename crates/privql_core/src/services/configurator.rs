//! Sensitivity and budget configuration.
//!
//! Owns the raw-string drafts between schema load and submission. Values stay
//! opaque strings while the user types; normalization to numbers happens only
//! inside [`Configurator::submit`], so transient invalid or empty input is
//! never an error until the user actually submits.

use crate::error::PrivqlError;
use crate::models::{parse_or_default, BudgetMap, SensitivityMap, TableSchema};
use crate::services::gateway::Gateway;
use crate::state::Session;

use std::collections::BTreeMap;

/// Builds and validates the sensitivity and budget maps before submission.
///
/// Authority over the values transfers to the gateway once both submission
/// calls succeed; until then the drafts here are the only copy.
pub struct Configurator {
    tables: Vec<TableSchema>,
    /// table -> column -> raw input. BTreeMaps keep validation errors
    /// deterministic: the first offending cell in name order is reported.
    cells: BTreeMap<String, BTreeMap<String, String>>,
    /// table -> raw budget input.
    budgets: BTreeMap<String, String>,
    loaded: bool,
    /// Sensitivities were accepted by the gateway but budgets were not;
    /// the next submit re-sends both.
    sensitivities_accepted: bool,
}

impl Configurator {
    /// Create an empty configurator. Call [`Configurator::load_schema`]
    /// before anything else.
    pub fn new() -> Self {
        Self {
            tables: Vec::new(),
            cells: BTreeMap::new(),
            budgets: BTreeMap::new(),
            loaded: false,
            sensitivities_accepted: false,
        }
    }

    /// Fetch the schema snapshot and initialize every draft to the empty
    /// string (an untouched cell submits as an explicit `0.0`).
    ///
    /// Runs once on entering the configuration phase. A failure leaves the
    /// configurator unusable but retryable; a successful reload replaces the
    /// drafts wholesale.
    pub async fn load_schema<G: Gateway>(
        &mut self,
        gateway: &G,
    ) -> Result<&[TableSchema], PrivqlError> {
        let tables = gateway.get_tables().await?;

        self.cells = tables
            .iter()
            .map(|table| {
                let columns = table
                    .columns
                    .iter()
                    .map(|column| (column.name.clone(), String::new()))
                    .collect();
                (table.name.clone(), columns)
            })
            .collect();
        self.budgets = tables.iter().map(|table| (table.name.clone(), String::new())).collect();
        self.tables = tables;
        self.loaded = true;
        self.sensitivities_accepted = false;

        tracing::info!(table_count = self.tables.len(), "Schema loaded");
        Ok(&self.tables)
    }

    /// Whether a schema snapshot has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// The loaded schema snapshot, in gateway-declared order.
    pub fn tables(&self) -> &[TableSchema] {
        &self.tables
    }

    /// Current raw draft for one sensitivity cell.
    pub fn cell(&self, table: &str, column: &str) -> Option<&str> {
        self.cells.get(table)?.get(column).map(String::as_str)
    }

    /// Current raw draft for one table budget.
    pub fn budget(&self, table: &str) -> Option<&str> {
        self.budgets.get(table).map(String::as_str)
    }

    /// Whether the previous submit stopped after sensitivities were accepted.
    pub fn sensitivities_accepted(&self) -> bool {
        self.sensitivities_accepted
    }

    /// Record a raw sensitivity value for `table.column`. No parsing happens
    /// here; the string may be transiently invalid or empty.
    pub fn set_cell(
        &mut self,
        table: &str,
        column: &str,
        raw: impl Into<String>,
    ) -> Result<(), PrivqlError> {
        let columns = self.cells.get_mut(table).ok_or_else(|| {
            PrivqlError::validation(table, "unknown table")
        })?;
        let cell = columns.get_mut(column).ok_or_else(|| {
            PrivqlError::validation(format!("{table}.{column}"), "unknown column")
        })?;
        *cell = raw.into();
        Ok(())
    }

    /// Record a raw budget value for `table`.
    pub fn set_budget(&mut self, table: &str, raw: impl Into<String>) -> Result<(), PrivqlError> {
        let budget = self
            .budgets
            .get_mut(table)
            .ok_or_else(|| PrivqlError::validation(table, "unknown table"))?;
        *budget = raw.into();
        Ok(())
    }

    /// Normalize every draft into the wire maps.
    ///
    /// Applied independently per cell, so a partially filled table mixes
    /// explicit zeros (blank cells) and user values. The first malformed cell
    /// aborts with a validation error naming it; nothing is submitted.
    pub fn normalized(&self) -> Result<(SensitivityMap, BudgetMap), PrivqlError> {
        let mut sensitivities = SensitivityMap::new();
        for (table, columns) in &self.cells {
            let mut converted = std::collections::HashMap::new();
            for (column, raw) in columns {
                let value = parse_or_default(&format!("{table}.{column}"), raw, 0.0)?;
                converted.insert(column.clone(), value);
            }
            sensitivities.insert(table.clone(), converted);
        }

        let mut budgets = BudgetMap::new();
        for (table, raw) in &self.budgets {
            budgets.insert(table.clone(), parse_or_default(table, raw, 0.0)?);
        }

        Ok((sensitivities, budgets))
    }

    /// Submit the normalized maps: sensitivities first, then budgets, as two
    /// strictly sequential gateway calls.
    ///
    /// - Validation failure: no gateway call is made, session unchanged.
    /// - Sensitivity call fails: budgets are never attempted, session stays
    ///   `Connected`.
    /// - Budget call fails: returns `InconsistentSubmission`; drafts are kept
    ///   so the user can retry without re-typing, and the retry re-sends both
    ///   maps (gateway idempotence assumed).
    /// - Both succeed: the session moves to `SensitivitiesSet`. Returns
    ///   `Ok(false)` when the outcome arrived after a reset and was discarded.
    pub async fn submit<G: Gateway>(
        &mut self,
        session: &Session,
        gateway: &G,
    ) -> Result<bool, PrivqlError> {
        if !self.loaded {
            return Err(PrivqlError::internal("submit called before schema load"));
        }

        let (sensitivities, budgets) = self.normalized()?;
        let epoch = session.epoch();

        gateway.set_sensitivities(&sensitivities).await?;
        self.sensitivities_accepted = true;

        if let Err(e) = gateway.set_budgets(&budgets).await {
            tracing::warn!(error = %e, "Budgets not accepted after sensitivities were");
            return Err(PrivqlError::inconsistent_submission(e.to_string()));
        }

        if !session.is_current(epoch) {
            tracing::debug!("Discarding submission outcome from a stale epoch");
            return Ok(false);
        }

        session.confirm_sensitivities()?;
        tracing::info!(table_count = self.tables.len(), "Sensitivities and budgets confirmed");
        Ok(true)
    }

    /// Reset every draft to the empty string, keeping the loaded schema.
    /// Used when accepted sensitivities are discarded but the connection
    /// survives.
    pub fn clear_values(&mut self) {
        for columns in self.cells.values_mut() {
            for cell in columns.values_mut() {
                cell.clear();
            }
        }
        for budget in self.budgets.values_mut() {
            budget.clear();
        }
        self.sensitivities_accepted = false;
    }

    /// Drop the schema snapshot and all drafts. Used when the connection
    /// itself is discarded; the next connection loads a fresh snapshot.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for Configurator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::gateway::testing::{demo_tables, MockGateway};
    use crate::state::Phase;

    async fn connected_session() -> Session {
        let session = Session::new();
        session.mark_connected().unwrap();
        session
    }

    async fn loaded_configurator(gateway: &MockGateway) -> Configurator {
        let mut configurator = Configurator::new();
        configurator.load_schema(gateway).await.unwrap();
        configurator
    }

    #[tokio::test]
    async fn load_schema_initializes_every_draft_to_blank() {
        let gateway = MockGateway::with_tables(demo_tables());
        let configurator = loaded_configurator(&gateway).await;

        assert!(configurator.is_loaded());
        assert_eq!(configurator.cell("orders", "amount"), Some(""));
        assert_eq!(configurator.cell("users", "age"), Some(""));
        assert_eq!(configurator.budget("orders"), Some(""));
    }

    #[tokio::test]
    async fn unknown_tables_and_columns_are_rejected() {
        let gateway = MockGateway::with_tables(demo_tables());
        let mut configurator = loaded_configurator(&gateway).await;

        assert!(configurator.set_cell("nope", "amount", "1").is_err());
        assert!(configurator.set_cell("orders", "nope", "1").is_err());
        assert!(configurator.set_budget("nope", "1").is_err());
    }

    #[tokio::test]
    async fn blank_cells_submit_as_explicit_zeros() {
        let gateway = MockGateway::with_tables(demo_tables());
        let session = connected_session().await;
        let mut configurator = loaded_configurator(&gateway).await;

        configurator.set_cell("orders", "amount", "2.5").unwrap();
        configurator.set_budget("orders", "10").unwrap();

        assert!(configurator.submit(&session, &gateway).await.unwrap());
        assert_eq!(session.phase(), Phase::SensitivitiesSet);

        let sensitivities = gateway.sensitivities_received.lock()[0].clone();
        assert_eq!(sensitivities["orders"]["amount"], 2.5);
        assert_eq!(sensitivities["orders"]["qty"], 0.0);
        assert_eq!(sensitivities["users"]["age"], 0.0);

        let budgets = gateway.budgets_received.lock()[0].clone();
        assert_eq!(budgets["orders"], 10.0);
        assert_eq!(budgets["users"], 0.0);
    }

    #[tokio::test]
    async fn malformed_input_fails_before_any_gateway_call() {
        let gateway = MockGateway::with_tables(demo_tables());
        let session = connected_session().await;
        let mut configurator = loaded_configurator(&gateway).await;

        configurator.set_cell("orders", "amount", "abc").unwrap();
        let calls_before = gateway.calls().len();

        let err = configurator.submit(&session, &gateway).await.unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("orders.amount"));
        assert_eq!(gateway.calls().len(), calls_before);
        assert_eq!(session.phase(), Phase::Connected);
    }

    #[tokio::test]
    async fn a_failed_sensitivity_call_never_attempts_budgets() {
        let gateway = MockGateway::with_tables(demo_tables());
        let session = connected_session().await;
        let mut configurator = loaded_configurator(&gateway).await;
        gateway.fail("set_sensitivities");

        let err = configurator.submit(&session, &gateway).await.unwrap_err();
        assert_eq!(err.category(), "Rejected");
        assert_eq!(gateway.call_count("set_budgets"), 0);
        assert_eq!(session.phase(), Phase::Connected);
        assert!(!configurator.sensitivities_accepted());
    }

    #[tokio::test]
    async fn a_failed_budget_call_is_an_inconsistent_submission() {
        let gateway = MockGateway::with_tables(demo_tables());
        let session = connected_session().await;
        let mut configurator = loaded_configurator(&gateway).await;
        configurator.set_cell("orders", "amount", "2.5").unwrap();
        gateway.fail("set_budgets");

        let err = configurator.submit(&session, &gateway).await.unwrap_err();
        assert!(err.is_inconsistent_submission());
        assert_eq!(session.phase(), Phase::Connected);
        // Drafts survive so the user retries without re-typing.
        assert_eq!(configurator.cell("orders", "amount"), Some("2.5"));
        assert!(configurator.sensitivities_accepted());
    }

    #[tokio::test]
    async fn retrying_after_an_inconsistent_submission_resends_both_maps() {
        let gateway = MockGateway::with_tables(demo_tables());
        let session = connected_session().await;
        let mut configurator = loaded_configurator(&gateway).await;
        configurator.set_cell("orders", "amount", "2.5").unwrap();
        configurator.set_budget("orders", "10").unwrap();

        gateway.fail("set_budgets");
        assert!(configurator.submit(&session, &gateway).await.is_err());

        gateway.succeed("set_budgets");
        assert!(configurator.submit(&session, &gateway).await.unwrap());

        assert_eq!(session.phase(), Phase::SensitivitiesSet);
        assert_eq!(gateway.call_count("set_sensitivities"), 2);
        assert_eq!(gateway.call_count("set_budgets"), 2);
        // Identical maps both times.
        let received = gateway.sensitivities_received.lock();
        assert_eq!(received[0], received[1]);
    }

    #[tokio::test]
    async fn clear_values_blanks_drafts_but_keeps_the_schema() {
        let gateway = MockGateway::with_tables(demo_tables());
        let mut configurator = loaded_configurator(&gateway).await;
        configurator.set_cell("orders", "amount", "2.5").unwrap();
        configurator.set_budget("orders", "10").unwrap();

        configurator.clear_values();
        assert!(configurator.is_loaded());
        assert_eq!(configurator.cell("orders", "amount"), Some(""));
        assert_eq!(configurator.budget("orders"), Some(""));
    }
}
