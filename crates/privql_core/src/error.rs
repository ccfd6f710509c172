//! Error types for the privql client.
//!
//! Every failure in the workflow maps onto one of these variants. Validation
//! errors are caught before any gateway call; the remaining variants describe
//! how a gateway call went wrong. No error here is fatal: each one returns
//! control to an unchanged, still-interactive session.

use thiserror::Error;

/// Main error type for the privql client.
#[derive(Debug, Error)]
pub enum PrivqlError {
    /// Malformed or missing user input, caught before any gateway call.
    #[error("Invalid input for {field}: {message}")]
    Validation {
        /// The offending field (e.g., `orders.amount` or `budget`).
        field: String,
        /// Human-readable error message.
        message: String,
    },

    /// The gateway was unreachable or the transport failed.
    #[error("Connection error: {message}")]
    Connection {
        /// Human-readable error message.
        message: String,
        /// Optional underlying error source.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The gateway declined a request (insufficient budget, malformed SQL, ...).
    #[error("Rejected by gateway: {message}")]
    Rejected {
        /// Error message reported by the gateway.
        message: String,
    },

    /// Sensitivities were accepted but the budget submission failed.
    ///
    /// The gateway is left in a recognized intermediate state; re-invoking
    /// the submission re-sends both maps and is idempotent-safe.
    #[error("Sensitivities accepted but budgets were not: {message}")]
    InconsistentSubmission {
        /// Error message from the failed budget submission.
        message: String,
    },

    /// A gateway response could not be decoded or did not match its request.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Human-readable error message.
        message: String,
        /// Optional underlying error source.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A gateway call exceeded its deadline.
    #[error("Timed out after {timeout_secs}s waiting for {operation}")]
    Timeout {
        /// The RPC operation that timed out.
        operation: String,
        /// The deadline that was exceeded, in seconds.
        timeout_secs: u64,
    },

    /// Unexpected internal error (illegal state transition, poisoned invariant).
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
    },
}

impl PrivqlError {
    // ========== Constructors ==========

    /// Create a new validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    /// Create a new connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into(), source: None }
    }

    /// Create a new connection error with source.
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection { message: message.into(), source: Some(Box::new(source)) }
    }

    /// Create a new gateway-rejection error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected { message: message.into() }
    }

    /// Create a new inconsistent-submission error.
    pub fn inconsistent_submission(message: impl Into<String>) -> Self {
        Self::InconsistentSubmission { message: message.into() }
    }

    /// Create a new protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol { message: message.into(), source: None }
    }

    /// Create a new timeout error.
    pub fn timeout(operation: impl Into<String>, timeout_secs: u64) -> Self {
        Self::Timeout { operation: operation.into(), timeout_secs }
    }

    /// Create a new internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    // ========== Methods ==========

    /// Check if this error was caught before any gateway call.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Check if this error left the gateway with a half-applied submission.
    pub fn is_inconsistent_submission(&self) -> bool {
        matches!(self, Self::InconsistentSubmission { .. })
    }

    /// Get the error category name.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "Validation",
            Self::Connection { .. } => "Connection",
            Self::Rejected { .. } => "Rejected",
            Self::InconsistentSubmission { .. } => "Submission",
            Self::Protocol { .. } => "Protocol",
            Self::Timeout { .. } => "Timeout",
            Self::Internal { .. } => "Internal",
        }
    }

    /// Get actionable hint for the user.
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::Validation { .. } => Some("Correct the field and try again"),
            Self::Connection { .. } => Some("Check that the privacy gateway is running"),
            Self::Rejected { .. } => None,
            Self::InconsistentSubmission { .. } => {
                Some("Submit again; already-entered values are kept")
            }
            Self::Protocol { .. } => Some("Client and gateway versions may not match"),
            Self::Timeout { .. } => Some("The gateway may be overloaded; try again"),
            Self::Internal { .. } => Some("Please report this issue"),
        }
    }

    /// Convert to user-displayable error info.
    pub fn to_error_info(&self) -> ErrorInfo {
        let error_type = format!("{} Error", self.category());
        let message = self.to_string();
        let hint = self.hint().map(String::from);

        let technical_detail = match self {
            Self::Connection { source: Some(source), .. }
            | Self::Protocol { source: Some(source), .. } => Some(source.to_string()),
            Self::Timeout { operation, .. } => Some(format!("Operation: {operation}")),
            _ => None,
        };

        ErrorInfo { error_type, message, hint, technical_detail }
    }
}

/// User-displayable error information.
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Category name (e.g., "Connection Error").
    pub error_type: String,
    /// User-friendly message.
    pub message: String,
    /// Actionable suggestion.
    pub hint: Option<String>,
    /// Technical detail for "Show Details" expansion.
    pub technical_detail: Option<String>,
}

// ========== Error Conversions ==========

/// Convert from std::io::Error to PrivqlError.
impl From<std::io::Error> for PrivqlError {
    fn from(err: std::io::Error) -> Self {
        PrivqlError::Connection { message: err.to_string(), source: Some(Box::new(err)) }
    }
}

/// Convert from serde_json::Error to PrivqlError.
impl From<serde_json::Error> for PrivqlError {
    fn from(err: serde_json::Error) -> Self {
        PrivqlError::Protocol {
            message: format!("JSON error: {err}"),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_carry_the_field() {
        let err = PrivqlError::validation("orders.amount", "not a number");
        assert!(err.is_validation());
        assert_eq!(err.category(), "Validation");
        assert!(err.to_string().contains("orders.amount"));
    }

    #[test]
    fn inconsistent_submission_hints_at_retry() {
        let err = PrivqlError::inconsistent_submission("budget ledger unavailable");
        assert!(err.is_inconsistent_submission());
        let info = err.to_error_info();
        assert_eq!(info.error_type, "Submission Error");
        assert!(info.hint.unwrap().contains("Submit again"));
    }

    #[test]
    fn io_errors_map_to_connection() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = PrivqlError::from(io);
        assert_eq!(err.category(), "Connection");
        assert!(err.to_error_info().technical_detail.is_some());
    }

    #[test]
    fn timeout_reports_the_operation() {
        let err = PrivqlError::timeout("execute_sql", 30);
        assert_eq!(err.category(), "Timeout");
        let info = err.to_error_info();
        assert_eq!(info.technical_detail.as_deref(), Some("Operation: execute_sql"));
    }
}
