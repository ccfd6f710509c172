//! Gateway transport: newline-delimited JSON over TCP.
//!
//! One request envelope per line, one response line per request:
//!
//! ```text
//! -> {"id": 7, "method": "execute_sql", "params": {"query": "...", "budget": 1.5}}
//! <- {"id": 7, "result": [{"sum(amount)": 103.2}]}
//! <- {"id": 7, "error": {"message": "Insufficient budget!"}}
//! ```
//!
//! The client keeps a single stream and a single request in flight at a time.
//! Every call carries a bounded deadline; expiry surfaces as a timeout error
//! rather than hanging the workflow.

use crate::error::PrivqlError;
use crate::models::{BudgetMap, NoisedRow, SensitivityMap, TableSchema};
use crate::services::gateway::Gateway;

use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::Mutex;
use tokio_util::codec::{Framed, LinesCodec};

/// Default per-call deadline.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct Request<'a, P: Serialize> {
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Deserialize)]
struct Response {
    id: u64,
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<WireError>,
}

#[derive(Deserialize)]
struct WireError {
    message: String,
}

/// Gateway client over a single framed TCP stream.
pub struct RpcClient {
    framed: Mutex<Framed<TcpStream, LinesCodec>>,
    next_id: AtomicU64,
    timeout: Duration,
}

impl RpcClient {
    /// Connect to a gateway listening at `addr`.
    pub async fn connect_to(addr: impl ToSocketAddrs) -> Result<Self, PrivqlError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| PrivqlError::connection_with_source("failed to reach gateway", e))?;

        Ok(Self {
            framed: Mutex::new(Framed::new(stream, LinesCodec::new())),
            next_id: AtomicU64::new(1),
            timeout: DEFAULT_RPC_TIMEOUT,
        })
    }

    /// Override the per-call deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Issue one call and decode its response.
    async fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &'static str,
        params: P,
    ) -> Result<R, PrivqlError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let line = serde_json::to_string(&Request { id, method, params })?;

        tracing::debug!(id, method, "Issuing gateway call");

        let mut framed = self.framed.lock().await;
        let reply = tokio::time::timeout(self.timeout, Self::round_trip(&mut framed, line))
            .await
            .map_err(|_| PrivqlError::timeout(method, self.timeout.as_secs()))??;
        drop(framed);

        let response: Response = serde_json::from_str(&reply)?;
        if response.id != id {
            return Err(PrivqlError::protocol(format!(
                "response id {} does not match request id {id}",
                response.id
            )));
        }
        if let Some(err) = response.error {
            tracing::warn!(id, method, error = %err.message, "Gateway rejected call");
            return Err(PrivqlError::rejected(err.message));
        }

        tracing::debug!(id, method, "Gateway call resolved");
        serde_json::from_value(response.result.unwrap_or(serde_json::Value::Null))
            .map_err(PrivqlError::from)
    }

    async fn round_trip(
        framed: &mut Framed<TcpStream, LinesCodec>,
        line: String,
    ) -> Result<String, PrivqlError> {
        framed
            .send(line)
            .await
            .map_err(|e| PrivqlError::connection_with_source("failed to send request", e))?;

        match framed.next().await {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(e)) => Err(PrivqlError::connection_with_source("failed to read response", e)),
            None => Err(PrivqlError::connection("gateway closed the connection")),
        }
    }
}

impl Gateway for RpcClient {
    async fn connect(&self, database_path: &str) -> Result<String, PrivqlError> {
        self.call("connect", serde_json::json!({ "database_path": database_path })).await
    }

    async fn get_tables(&self) -> Result<Vec<TableSchema>, PrivqlError> {
        self.call("get_tables", serde_json::json!({})).await
    }

    async fn set_sensitivities(
        &self,
        sensitivities: &SensitivityMap,
    ) -> Result<String, PrivqlError> {
        self.call("set_sensitivities", serde_json::json!({ "sensitivities": sensitivities })).await
    }

    async fn set_budgets(&self, budgets: &BudgetMap) -> Result<String, PrivqlError> {
        self.call("set_budgets", serde_json::json!({ "budgets": budgets })).await
    }

    async fn execute_sql(&self, query: &str, budget: f64) -> Result<Vec<NoisedRow>, PrivqlError> {
        self.call("execute_sql", serde_json::json!({ "query": query, "budget": budget })).await
    }

    async fn reset_sensitivities(&self) -> Result<(), PrivqlError> {
        self.call("reset_sensitivities", serde_json::json!({})).await
    }

    async fn reset_connection(&self) -> Result<(), PrivqlError> {
        self.call("reset_connection", serde_json::json!({})).await
    }
}
