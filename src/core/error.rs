use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building invoices or talking to AFIP.
///
/// Partial rejection of individual invoices is *not* an error — the
/// service accepted the call, so it surfaces as a terminal state on
/// the authorizer instead (see `BillAuthorizer::authorized`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FacturaError {
    /// A local invariant on an invoice or batch was violated.
    /// Never reaches the network.
    #[error("invalid attribute `{field}`: {reason}")]
    InvalidAttribute {
        /// Name of the offending field.
        field: &'static str,
        /// Human-readable description of the violation.
        reason: String,
    },

    /// The private key or certificate file needed for the WSAA login
    /// does not exist.
    #[error("missing credential file: {}", .0.display())]
    MissingCertificate(PathBuf),

    /// The WSAA login failed or returned an unusable token.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The service reported a structured error block before any detail
    /// processing. Code and message are preserved verbatim.
    #[error("service error {code}: {message}")]
    Service { code: i64, message: String },

    /// Network or protocol-level failure reaching the service, or a
    /// reply whose shape could not be interpreted.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Reading or writing the daily token cache failed.
    #[error("token cache error: {0}")]
    Cache(String),
}

impl FacturaError {
    /// Shorthand for an [`FacturaError::InvalidAttribute`].
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidAttribute {
            field,
            reason: reason.into(),
        }
    }
}
