//! Global control surface.
//!
//! Process-wide reset triggers, registered once at startup and active no
//! matter which part of the workflow currently has focus. Triggers flow
//! through a command channel into one dispatcher, so a hotkey and a button
//! share the identical reset path. Resets are authoritative: the local
//! transition applies even when the gateway call fails, and any response
//! in flight at reset time is discarded via the session epoch.

use crate::services::gateway::Gateway;
use crate::state::Session;

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A reset command issued by a global trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Discard accepted sensitivities and budgets; regress to `Connected`.
    ResetSensitivities,
    /// Discard the connection entirely; regress to `Disconnected`.
    ResetConnection,
}

/// Key chords bound to [`ControlCommand::ResetSensitivities`].
pub const RESET_SENSITIVITIES_CHORDS: [&str; 2] = ["ctrl+r", "cmd+r"];

/// Key chords bound to [`ControlCommand::ResetConnection`].
pub const RESET_CONNECTION_CHORDS: [&str; 2] = ["ctrl+shift+r", "cmd+shift+r"];

/// Map a key chord onto its reset command, if any.
pub fn command_for_chord(chord: &str) -> Option<ControlCommand> {
    let chord = chord.to_ascii_lowercase();
    if RESET_SENSITIVITIES_CHORDS.contains(&chord.as_str()) {
        Some(ControlCommand::ResetSensitivities)
    } else if RESET_CONNECTION_CHORDS.contains(&chord.as_str()) {
        Some(ControlCommand::ResetConnection)
    } else {
        None
    }
}

/// Apply one reset: gateway first, then the local session transition.
///
/// Safe to invoke from any phase, including before any connection exists;
/// the gateway treats "reset with nothing to reset" as a success, and a
/// failed gateway call is logged but never blocks the local reset.
pub async fn apply<G: Gateway>(session: &Session, gateway: &G, command: ControlCommand) {
    match command {
        ControlCommand::ResetSensitivities => {
            if let Err(e) = gateway.reset_sensitivities().await {
                tracing::warn!(error = %e, "Gateway sensitivity reset failed; resetting locally");
            }
            session.reset_sensitivities();
        }
        ControlCommand::ResetConnection => {
            if let Err(e) = gateway.reset_connection().await {
                tracing::warn!(error = %e, "Gateway connection reset failed; resetting locally");
            }
            session.reset_connection();
        }
    }
}

/// Handle for feeding commands into the dispatcher.
#[derive(Clone)]
pub struct ControlHandle {
    tx: mpsc::UnboundedSender<ControlCommand>,
}

impl ControlHandle {
    /// Queue a reset command. Never blocks; a dropped dispatcher makes this
    /// a silent no-op (the process is shutting down).
    pub fn trigger(&self, command: ControlCommand) {
        tracing::debug!(?command, "Control trigger");
        let _ = self.tx.send(command);
    }

    /// Queue the command bound to `chord`, if any. Returns whether the chord
    /// was recognized.
    pub fn trigger_chord(&self, chord: &str) -> bool {
        match command_for_chord(chord) {
            Some(command) => {
                self.trigger(command);
                true
            }
            None => false,
        }
    }
}

/// Teardown guard for the dispatcher task. Dropping it unregisters the
/// control surface.
pub struct ControlGuard {
    task: JoinHandle<()>,
}

impl Drop for ControlGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// The process-wide reset dispatcher.
pub struct ControlSurface;

impl ControlSurface {
    /// Register the control surface once at process start.
    ///
    /// Spawns the dispatcher task; commands sent through the returned handle
    /// are applied in order, one at a time.
    pub fn spawn<G: Gateway + 'static>(
        session: Arc<Session>,
        gateway: Arc<G>,
    ) -> (ControlHandle, ControlGuard) {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                apply(session.as_ref(), gateway.as_ref(), command).await;
            }
        });

        (ControlHandle { tx }, ControlGuard { task })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::gateway::testing::MockGateway;
    use crate::state::Phase;
    use std::time::Duration;

    #[test]
    fn chords_map_onto_their_commands() {
        assert_eq!(command_for_chord("ctrl+r"), Some(ControlCommand::ResetSensitivities));
        assert_eq!(command_for_chord("Cmd+Shift+R"), Some(ControlCommand::ResetConnection));
        assert_eq!(command_for_chord("ctrl+q"), None);
    }

    #[tokio::test]
    async fn reset_sensitivities_regresses_and_calls_the_gateway() {
        let session = Session::new();
        session.mark_connected().unwrap();
        session.confirm_sensitivities().unwrap();
        let gateway = MockGateway::new();

        apply(&session, &gateway, ControlCommand::ResetSensitivities).await;

        assert_eq!(session.phase(), Phase::Connected);
        assert_eq!(gateway.call_count("reset_sensitivities"), 1);
    }

    #[tokio::test]
    async fn resets_before_any_connection_exist_are_harmless() {
        let session = Session::new();
        let gateway = MockGateway::new();

        apply(&session, &gateway, ControlCommand::ResetSensitivities).await;
        assert_eq!(session.phase(), Phase::Disconnected);

        apply(&session, &gateway, ControlCommand::ResetConnection).await;
        apply(&session, &gateway, ControlCommand::ResetConnection).await;
        assert_eq!(session.phase(), Phase::Disconnected);
        assert_eq!(gateway.call_count("reset_connection"), 2);
    }

    #[tokio::test]
    async fn a_failed_gateway_reset_still_resets_locally() {
        let session = Session::new();
        session.mark_connected().unwrap();
        let gateway = MockGateway::new();
        gateway.fail("reset_connection");

        apply(&session, &gateway, ControlCommand::ResetConnection).await;
        assert_eq!(session.phase(), Phase::Disconnected);
    }

    #[tokio::test]
    async fn the_dispatcher_applies_triggered_commands() {
        let session = Arc::new(Session::new());
        session.mark_connected().unwrap();
        let gateway = Arc::new(MockGateway::new());

        let (handle, _guard) = ControlSurface::spawn(session.clone(), gateway.clone());
        assert!(handle.trigger_chord("ctrl+shift+r"));

        // The dispatcher runs on its own task; poll until it has applied.
        for _ in 0..100 {
            if session.phase() == Phase::Disconnected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(session.phase(), Phase::Disconnected);
        assert_eq!(gateway.call_count("reset_connection"), 1);
    }
}
