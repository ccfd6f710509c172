//! privql - interactive client for a differential-privacy SQL gateway.

mod app;

use app::PrivqlApp;
use privql_core::logging::{init_logging, log_dir, LogConfig};
use privql_core::services::{ControlSurface, RpcClient};
use privql_core::state::Session;
use std::sync::Arc;

const DEFAULT_GATEWAY_ADDR: &str = "127.0.0.1:7878";

#[tokio::main]
async fn main() {
    // Initialize logging before anything touches the session.
    let _logging_guard = init_logging(LogConfig::new(log_dir()));

    let addr = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_GATEWAY_ADDR.to_string());
    tracing::info!(%addr, "Starting privql");

    let gateway = match RpcClient::connect_to(addr.as_str()).await {
        Ok(client) => Arc::new(client),
        Err(e) => {
            let info = e.to_error_info();
            eprintln!("{}: {}", info.error_type, info.message);
            if let Some(hint) = info.hint {
                eprintln!("hint: {hint}");
            }
            std::process::exit(1);
        }
    };

    let session = Arc::new(Session::new());

    // Register the global reset triggers once, for the life of the process.
    let (control, _control_guard) = ControlSurface::spawn(session.clone(), gateway.clone());

    let mut app = PrivqlApp::new(session, gateway, control);
    if let Err(e) = app.run().await {
        tracing::error!(error = %e, "REPL terminated");
        std::process::exit(1);
    }
}
