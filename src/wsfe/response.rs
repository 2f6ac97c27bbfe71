use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::FacturaError;

/// Result code the service attaches to the header and to each detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResultCode {
    /// `A` — approved.
    Approved,
    /// `R` — rejected.
    Rejected,
    /// Anything else (e.g. `P` for partial) preserved verbatim.
    Other(String),
}

impl ResultCode {
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

impl From<String> for ResultCode {
    fn from(code: String) -> Self {
        match code.as_str() {
            "A" => Self::Approved,
            "R" => Self::Rejected,
            _ => Self::Other(code),
        }
    }
}

impl From<ResultCode> for String {
    fn from(code: ResultCode) -> Self {
        match code {
            ResultCode::Approved => "A".to_string(),
            ResultCode::Rejected => "R".to_string(),
            ResultCode::Other(other) => other,
        }
    }
}

/// An observation the service attaches to a rejected detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
}

/// Per-invoice result, in request order.
#[derive(Debug, Clone, Deserialize)]
pub struct DetailResponse {
    /// Result code for this invoice.
    pub resultado: ResultCode,
    /// Invoice number this result refers to.
    #[serde(default)]
    pub cbte_desde: Option<u64>,
    /// The authorization code, present on approval.
    #[serde(default)]
    pub cae: Option<String>,
    /// CAE expiration date (`YYYYMMDD`), present on approval.
    #[serde(default)]
    pub cae_fch_vto: Option<String>,
    /// Observations explaining a rejection.
    #[serde(default, deserialize_with = "deserialize_observations")]
    pub observaciones: Vec<Observation>,
}

impl DetailResponse {
    pub fn approved(&self) -> bool {
        self.resultado.is_approved()
    }
}

/// The normalized authorization outcome.
#[derive(Debug, Clone)]
pub struct AuthorizationResponse {
    /// Header-level result.
    pub header_result: ResultCode,
    /// Processing timestamp reported by the service.
    pub authorized_on: String,
    /// The raw `fe_cab_resp` block, for callers that need fields this
    /// crate does not model.
    pub header: Value,
    /// Per-invoice results, one per detail record, preserving request
    /// order.
    pub details: Vec<DetailResponse>,
}

impl AuthorizationResponse {
    /// True iff the header result is approved and every single detail
    /// result is approved.
    pub fn authorized(&self) -> bool {
        self.header_result.is_approved() && self.details.iter().all(DetailResponse::approved)
    }
}

// The reply nests detail results (and observations, and errors) as a
// single record or a list depending on count. Everything below
// normalizes that to ordered lists.

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::One(item) => vec![item],
        }
    }
}

#[derive(Debug, Deserialize)]
struct SolicitarEnvelope {
    fecae_solicitar_response: SolicitarResponse,
}

#[derive(Debug, Deserialize)]
struct SolicitarResponse {
    fecae_solicitar_result: SolicitarResult,
}

#[derive(Debug, Deserialize)]
struct SolicitarResult {
    #[serde(default)]
    errors: Option<ErrorBlock>,
    #[serde(default)]
    fe_cab_resp: Option<Value>,
    #[serde(default)]
    fe_det_resp: Option<DetBlock>,
}

#[derive(Debug, Deserialize)]
struct ErrorBlock {
    err: OneOrMany<ServiceFault>,
}

#[derive(Debug, Deserialize)]
struct ServiceFault {
    code: i64,
    #[serde(default)]
    msg: String,
}

#[derive(Debug, Deserialize)]
struct DetBlock {
    fecae_det_response: OneOrMany<DetailResponse>,
}

#[derive(Debug, Deserialize)]
struct HeaderFields {
    resultado: ResultCode,
    #[serde(default)]
    fch_proceso: String,
}

#[derive(Debug, Deserialize)]
struct ObservationBlock {
    obs: OneOrMany<Observation>,
}

fn deserialize_observations<'de, D>(deserializer: D) -> Result<Vec<Observation>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let block = Option::<ObservationBlock>::deserialize(deserializer)?;
    Ok(block.map(|b| b.obs.into_vec()).unwrap_or_default())
}

/// Normalize the raw `FECAESolicitar` reply.
///
/// A service-level error block aborts before any detail processing and
/// surfaces as [`FacturaError::Service`] with code and message
/// preserved verbatim. Replies whose shape cannot be interpreted are
/// transport failures.
pub fn parse_response(raw: &Value) -> Result<AuthorizationResponse, FacturaError> {
    let envelope: SolicitarEnvelope = serde_json::from_value(raw.clone())
        .map_err(|e| FacturaError::Transport(format!("malformed FECAESolicitar reply: {e}")))?;
    let result = envelope.fecae_solicitar_response.fecae_solicitar_result;

    if let Some(block) = result.errors {
        if let Some(fault) = block.err.into_vec().into_iter().next() {
            return Err(FacturaError::Service {
                code: fault.code,
                message: fault.msg,
            });
        }
    }

    let header_raw = result
        .fe_cab_resp
        .ok_or_else(|| FacturaError::Transport("reply missing fe_cab_resp".into()))?;
    let header: HeaderFields = serde_json::from_value(header_raw.clone())
        .map_err(|e| FacturaError::Transport(format!("malformed fe_cab_resp: {e}")))?;

    let details = result
        .fe_det_resp
        .ok_or_else(|| FacturaError::Transport("reply missing fe_det_resp".into()))?
        .fecae_det_response
        .into_vec();

    Ok(AuthorizationResponse {
        header_result: header.resultado,
        authorized_on: header.fch_proceso,
        header: header_raw,
        details,
    })
}
