//! Workflow services for the privql client.
//!
//! This module contains all service layer abstractions:
//! - `gateway` - The seven-call boundary to the privacy-enforcing backend
//! - `rpc` - Newline-delimited JSON transport implementing the boundary
//! - `connection` - Connection establishment
//! - `configurator` - Sensitivity/budget drafts, validation, two-step submit
//! - `console` - Budgeted query execution and the output log
//! - `control` - Process-wide reset triggers

pub mod configurator;
pub mod connection;
pub mod console;
pub mod control;
pub mod gateway;
pub mod rpc;

pub use configurator::Configurator;
pub use connection::ConnectionService;
pub use console::QueryConsole;
pub use control::{command_for_chord, ControlCommand, ControlGuard, ControlHandle, ControlSurface};
pub use gateway::Gateway;
pub use rpc::RpcClient;
