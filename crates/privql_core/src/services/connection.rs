//! Connection establishment.
//!
//! The gateway owns the actual database handle; on success the client records
//! nothing beyond the phase transition.

use crate::error::PrivqlError;
use crate::services::gateway::Gateway;
use crate::state::Session;

/// Service for opening the gateway's database connection.
pub struct ConnectionService;

impl ConnectionService {
    /// Ask the gateway to connect to the database at `raw_path`.
    ///
    /// An empty path is rejected before any gateway call. On success the
    /// session moves to `Connected` and the gateway's success message is
    /// returned. Returns `Ok(None)` when the response arrived after a reset
    /// and was discarded.
    pub async fn connect<G: Gateway>(
        session: &Session,
        gateway: &G,
        raw_path: &str,
    ) -> Result<Option<String>, PrivqlError> {
        let path = raw_path.trim();
        if path.is_empty() {
            return Err(PrivqlError::validation(
                "database_path",
                "a database path or URI is required",
            ));
        }

        let epoch = session.epoch();
        let message = gateway.connect(path).await?;

        if !session.is_current(epoch) {
            tracing::debug!(path, "Discarding connect response from a stale epoch");
            return Ok(None);
        }

        session.mark_connected()?;
        tracing::info!(path, "Connected to database");
        Ok(Some(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::gateway::testing::MockGateway;
    use crate::state::Phase;

    #[tokio::test]
    async fn connect_transitions_the_session() {
        let session = Session::new();
        let gateway = MockGateway::new();

        let message =
            ConnectionService::connect(&session, &gateway, "demo.db").await.unwrap().unwrap();
        assert_eq!(message, "Connected");
        assert_eq!(session.phase(), Phase::Connected);
    }

    #[tokio::test]
    async fn a_blank_path_never_reaches_the_gateway() {
        let session = Session::new();
        let gateway = MockGateway::new();

        let err = ConnectionService::connect(&session, &gateway, "   ").await.unwrap_err();
        assert!(err.is_validation());
        assert!(gateway.calls().is_empty());
        assert_eq!(session.phase(), Phase::Disconnected);
    }

    #[tokio::test]
    async fn a_declined_connect_leaves_the_session_unchanged() {
        let session = Session::new();
        let gateway = MockGateway::new();
        gateway.fail("connect");

        let err = ConnectionService::connect(&session, &gateway, "demo.db").await.unwrap_err();
        assert_eq!(err.category(), "Rejected");
        assert_eq!(session.phase(), Phase::Disconnected);
    }
}
