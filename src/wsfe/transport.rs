use serde_json::Value;

use crate::core::FacturaError;

/// Performs the remote WSFE call. The SOAP/TLS plumbing (and any retry
/// or timeout policy) lives behind this trait — the core never retries.
///
/// `body` is the fully built request envelope; the returned value is
/// the reply as a snake-cased key-value tree, the shape SOAP client
/// libraries conventionally produce.
pub trait Transport: Send + Sync {
    fn call(&self, url: &str, operation: &str, body: &Value) -> Result<Value, FacturaError>;
}

/// Answers "what was the last invoice number the service authorized for
/// this bill-type code?" — in WSFE terms, `FECompUltimoAutorizado`.
pub trait Reference: Send + Sync {
    fn last_authorized_number(&self, bill_type_code: u32) -> Result<u64, FacturaError>;
}
