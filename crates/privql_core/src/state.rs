//! Session state management.
//!
//! Exactly one `Session` exists per running client. It owns the workflow
//! phase, the append-only output log, and an epoch counter used to discard
//! responses that arrive after a reset. All workflow services and the global
//! control surface act on the same shared handle.

use crate::error::PrivqlError;
use crate::models::OutputEntry;

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Workflow phase of the client.
///
/// The three reachable states, as an explicit enum rather than a pair of
/// booleans whose cross product would admit a fourth, unreachable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No connection to the gateway-managed database.
    Disconnected,
    /// Connected; sensitivities and budgets not yet accepted.
    Connected,
    /// Sensitivities and budgets accepted; queries may run.
    SensitivitiesSet,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Disconnected => write!(f, "disconnected"),
            Phase::Connected => write!(f, "connected"),
            Phase::SensitivitiesSet => write!(f, "ready"),
        }
    }
}

/// The single piece of process-wide workflow state.
///
/// Forward transitions (`mark_connected`, `confirm_sensitivities`) are only
/// legal from their source phase; calling them from anywhere else is a
/// programming error reported as `PrivqlError::Internal`. Backward
/// transitions (the resets) are legal from any phase and never fail.
pub struct Session {
    /// Current workflow phase.
    phase: RwLock<Phase>,
    /// Append-only log of rendered query results, scoped to the
    /// `SensitivitiesSet` phase.
    output: RwLock<Vec<OutputEntry>>,
    /// Bumped on every reset; in-flight responses from an older epoch
    /// must be discarded by their initiators.
    epoch: AtomicU64,
}

impl Session {
    /// Create a new session in the `Disconnected` phase.
    pub fn new() -> Self {
        Self {
            phase: RwLock::new(Phase::Disconnected),
            output: RwLock::new(Vec::new()),
            epoch: AtomicU64::new(0),
        }
    }

    /// Get the current phase.
    pub fn phase(&self) -> Phase {
        *self.phase.read()
    }

    /// Get the current epoch.
    ///
    /// Capture this before issuing a gateway call; pass it to
    /// [`Session::is_current`] before applying the response.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Check whether a captured epoch is still current.
    ///
    /// Returns false if any reset fired since the epoch was captured, in
    /// which case the response that carried it must be discarded.
    pub fn is_current(&self, epoch: u64) -> bool {
        self.epoch() == epoch
    }

    // ========== Forward Transitions ==========

    /// `Disconnected -> Connected`, after the gateway accepted a connection.
    pub fn mark_connected(&self) -> Result<(), PrivqlError> {
        let mut phase = self.phase.write();
        if *phase != Phase::Disconnected {
            return Err(PrivqlError::internal(format!(
                "mark_connected called while {phase}"
            )));
        }
        *phase = Phase::Connected;
        tracing::info!(phase = %Phase::Connected, "Session transition");
        Ok(())
    }

    /// `Connected -> SensitivitiesSet`, after both submission calls succeeded.
    pub fn confirm_sensitivities(&self) -> Result<(), PrivqlError> {
        let mut phase = self.phase.write();
        if *phase != Phase::Connected {
            return Err(PrivqlError::internal(format!(
                "confirm_sensitivities called while {phase}"
            )));
        }
        *phase = Phase::SensitivitiesSet;
        tracing::info!(phase = %Phase::SensitivitiesSet, "Session transition");
        Ok(())
    }

    // ========== Backward Transitions ==========

    /// Discard accepted sensitivities/budgets: regress to `Connected`.
    ///
    /// A no-op while `Disconnected` (there is nothing to reset). Clears the
    /// output log and invalidates in-flight responses.
    pub fn reset_sensitivities(&self) {
        let mut phase = self.phase.write();
        if *phase == Phase::Disconnected {
            tracing::debug!("Sensitivity reset while disconnected; nothing to do");
            return;
        }
        *phase = Phase::Connected;
        self.output.write().clear();
        self.epoch.fetch_add(1, Ordering::AcqRel);
        tracing::info!(phase = %Phase::Connected, "Session reset to connected");
    }

    /// Discard the connection: regress to `Disconnected` from any phase.
    ///
    /// Implies the effects of [`Session::reset_sensitivities`]. Idempotent.
    pub fn reset_connection(&self) {
        let mut phase = self.phase.write();
        *phase = Phase::Disconnected;
        self.output.write().clear();
        self.epoch.fetch_add(1, Ordering::AcqRel);
        tracing::info!(phase = %Phase::Disconnected, "Session reset to disconnected");
    }

    // ========== Output Log ==========

    /// Append a query result to the output log.
    ///
    /// Only legal while `SensitivitiesSet`; the log is append-only and never
    /// reordered.
    pub fn append_output(&self, entry: OutputEntry) -> Result<(), PrivqlError> {
        let phase = self.phase.read();
        if *phase != Phase::SensitivitiesSet {
            return Err(PrivqlError::internal(format!(
                "append_output called while {phase}"
            )));
        }
        self.output.write().push(entry);
        Ok(())
    }

    /// Snapshot of the output log, in submission order.
    pub fn output(&self) -> Vec<OutputEntry> {
        self.output.read().clone()
    }

    /// Number of entries in the output log.
    pub fn output_len(&self) -> usize {
        self.output.read().len()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QueryRequest;

    fn entry() -> OutputEntry {
        OutputEntry::new(&QueryRequest::new("SELECT 1", 1.0), vec![])
    }

    #[test]
    fn forward_transitions_follow_the_phase_order() {
        let session = Session::new();
        assert_eq!(session.phase(), Phase::Disconnected);

        session.mark_connected().unwrap();
        assert_eq!(session.phase(), Phase::Connected);

        session.confirm_sensitivities().unwrap();
        assert_eq!(session.phase(), Phase::SensitivitiesSet);
    }

    #[test]
    fn forward_transitions_from_the_wrong_phase_are_errors() {
        let session = Session::new();
        assert!(session.confirm_sensitivities().is_err());

        session.mark_connected().unwrap();
        assert!(session.mark_connected().is_err());
    }

    #[test]
    fn reset_sensitivities_regresses_to_connected_and_clears_output() {
        let session = Session::new();
        session.mark_connected().unwrap();
        session.confirm_sensitivities().unwrap();
        session.append_output(entry()).unwrap();
        assert_eq!(session.output_len(), 1);

        session.reset_sensitivities();
        assert_eq!(session.phase(), Phase::Connected);
        assert_eq!(session.output_len(), 0);
    }

    #[test]
    fn reset_sensitivities_while_disconnected_is_a_noop() {
        let session = Session::new();
        let epoch = session.epoch();
        session.reset_sensitivities();
        assert_eq!(session.phase(), Phase::Disconnected);
        assert_eq!(session.epoch(), epoch);
    }

    #[test]
    fn reset_connection_is_unconditional_and_idempotent() {
        let session = Session::new();
        session.mark_connected().unwrap();
        session.confirm_sensitivities().unwrap();
        session.append_output(entry()).unwrap();

        session.reset_connection();
        assert_eq!(session.phase(), Phase::Disconnected);
        assert_eq!(session.output_len(), 0);

        // Second reset in a row must not error or change anything visible.
        session.reset_connection();
        assert_eq!(session.phase(), Phase::Disconnected);
    }

    #[test]
    fn resets_invalidate_captured_epochs() {
        let session = Session::new();
        session.mark_connected().unwrap();

        let epoch = session.epoch();
        assert!(session.is_current(epoch));

        session.reset_connection();
        assert!(!session.is_current(epoch));
    }

    #[test]
    fn output_is_only_writable_while_ready() {
        let session = Session::new();
        assert!(session.append_output(entry()).is_err());

        session.mark_connected().unwrap();
        assert!(session.append_output(entry()).is_err());

        session.confirm_sensitivities().unwrap();
        assert!(session.append_output(entry()).is_ok());
    }
}
