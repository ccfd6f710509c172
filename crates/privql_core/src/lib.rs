//! Core types and workflow orchestration for the privql client.
//!
//! privql operates a differential-privacy-protected SQL source: connect to a
//! database, declare per-column sensitivities and per-table privacy budgets,
//! then run budgeted queries whose answers the backend perturbs. This crate
//! provides that workflow:
//!
//! - **error**: Error handling with gateway-specific detail
//! - **models**: Schema snapshots, sensitivity/budget maps, query results
//! - **services**: Gateway boundary, transport, configurator, query console,
//!   global reset triggers
//! - **state**: The single session state machine
//! - **logging**: Structured logging setup

pub mod error;
pub mod logging;
pub mod models;
pub mod services;
pub mod state;


pub use error::{ErrorInfo, PrivqlError};
pub use models::{
    parse_or_default, BudgetMap, ColumnSchema, NoisedRow, OutputEntry, QueryRequest,
    SensitivityMap, TableSchema,
};
pub use services::{
    command_for_chord, Configurator, ConnectionService, ControlCommand, ControlGuard,
    ControlHandle, ControlSurface, Gateway, QueryConsole, RpcClient,
};
pub use state::{Phase, Session};
