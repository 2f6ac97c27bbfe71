use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::core::FacturaError;

/// A WSAA ticket de acceso: token/signature pair plus its metadata.
///
/// Owned by the cache; never mutated, only replaced wholesale when a
/// new day starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthToken {
    /// Opaque login token.
    pub token: String,
    /// Signature accompanying the token.
    pub sign: String,
    /// Expiration reported by WSAA, when the authenticator surfaces it.
    pub expires_at: Option<DateTime<FixedOffset>>,
    /// CUIT the ticket was issued for.
    pub cuit: String,
}

/// The `Auth` header merged into every WSFE request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthHeader {
    #[serde(rename = "Token")]
    pub token: String,
    #[serde(rename = "Sign")]
    pub sign: String,
    #[serde(rename = "Cuit")]
    pub cuit: String,
}

/// The flat key-value document persisted per taxpayer per day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CacheRecord {
    pub token: String,
    pub sign: String,
}

/// Paths to the private key and certificate used by the WSAA login.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub private_key: PathBuf,
    pub certificate: PathBuf,
}

impl Credentials {
    pub fn new(private_key: impl Into<PathBuf>, certificate: impl Into<PathBuf>) -> Self {
        Self {
            private_key: private_key.into(),
            certificate: certificate.into(),
        }
    }

    /// Fail with [`FacturaError::MissingCertificate`] if either file is
    /// absent. Checked before every login attempt.
    pub fn check(&self) -> Result<(), FacturaError> {
        for path in [&self.private_key, &self.certificate] {
            if !path.exists() {
                return Err(FacturaError::MissingCertificate(path.clone()));
            }
        }
        Ok(())
    }
}
