use chrono::{Local, NaiveDate};
use tracing::{debug, info};

use crate::auth::AuthTokenCache;
use crate::core::{
    assign_numbers, validate, BillType, FacturaError, Invoice, InvoiceType, SequenceLocks,
    TaxpayerConfig,
};

use super::request::{CaeRequest, FeCabReq, FeCaeDetRequest, FeCaeReq, FeDetReq, ServicePeriod};
use super::response::{parse_response, AuthorizationResponse};
use super::transport::{Reference, Transport};

/// Where a batch stands in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationState {
    /// Accumulating validated invoices.
    Building,
    /// Request sent, reply not yet interpreted.
    Submitted,
    /// Header and every detail approved.
    Authorized,
    /// The service accepted the call but rejected at least one invoice.
    /// Not an error — inspect the per-invoice results.
    PartiallyRejected,
    /// A transport, authentication, or service-level failure aborted
    /// the call.
    Errored,
}

/// Orchestrates one batch of invoices through `FECAESolicitar`.
///
/// All invoices in a batch share one bill-type/invoice-type pair; batch
/// order determines sequential numbering for entries without an
/// explicit number.
pub struct BillAuthorizer {
    config: TaxpayerConfig,
    bill_type: BillType,
    invoice_type: InvoiceType,
    batch: Vec<Invoice>,
    service_from: Option<NaiveDate>,
    service_to: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
    issue_date: Option<NaiveDate>,
    state: AuthorizationState,
    response: Option<AuthorizationResponse>,
}

impl BillAuthorizer {
    pub fn new(config: TaxpayerConfig, bill_type: BillType, invoice_type: InvoiceType) -> Self {
        Self {
            config,
            bill_type,
            invoice_type,
            batch: Vec::new(),
            service_from: None,
            service_to: None,
            due_date: None,
            issue_date: None,
            state: AuthorizationState::Building,
            response: None,
        }
    }

    /// Service period start for service-concept invoices. Defaults to
    /// the issue date.
    pub fn service_from(mut self, date: NaiveDate) -> Self {
        self.service_from = Some(date);
        self
    }

    /// Service period end. Defaults to the issue date.
    pub fn service_to(mut self, date: NaiveDate) -> Self {
        self.service_to = Some(date);
        self
    }

    /// Payment due date for service-concept invoices. Defaults to the
    /// issue date.
    pub fn due_date(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    /// Pin `CbteFch` (and the service-period defaults) instead of using
    /// the current date.
    pub fn issue_date(mut self, date: NaiveDate) -> Self {
        self.issue_date = Some(date);
        self
    }

    /// The WSFE `CbteTipo` code for this batch.
    pub fn bill_type_code(&self) -> u32 {
        self.bill_type.wsfe_code(self.invoice_type)
    }

    /// Validate and add an invoice to the batch. Fails fast: an invoice
    /// that violates an invariant is never added, and nothing can be
    /// added once the batch has been submitted.
    pub fn add_invoice(&mut self, invoice: Invoice) -> Result<(), FacturaError> {
        if self.state != AuthorizationState::Building {
            return Err(FacturaError::invalid(
                "state",
                "cannot add invoices after authorize",
            ));
        }
        validate(&invoice, &self.config)?;
        self.batch.push(invoice);
        Ok(())
    }

    /// The batch, with assigned numbers visible after authorization.
    pub fn invoices(&self) -> &[Invoice] {
        &self.batch
    }

    pub fn state(&self) -> AuthorizationState {
        self.state
    }

    /// The normalized response, available once submitted.
    pub fn response(&self) -> Option<&AuthorizationResponse> {
        self.response.as_ref()
    }

    /// True iff the header result and every per-invoice result came
    /// back approved. Before submission this is simply false.
    pub fn authorized(&self) -> bool {
        self.state == AuthorizationState::Authorized
    }

    /// File the authorization request: assign numbers, build the wire
    /// request, merge the auth header, invoke the transport, and
    /// normalize the reply.
    ///
    /// The bill-type-code lock is held from the last-number query
    /// through the transport call, so concurrent batches on the same
    /// code never receive overlapping numbers.
    ///
    /// Returns `Ok(authorized)`. Transport, authentication, and
    /// service-level errors propagate and leave the batch `Errored`;
    /// per-invoice rejection does not.
    pub fn authorize(
        &mut self,
        auth: &AuthTokenCache,
        locks: &SequenceLocks,
        transport: &dyn Transport,
        reference: &dyn Reference,
    ) -> Result<bool, FacturaError> {
        if self.state != AuthorizationState::Building {
            return Err(FacturaError::invalid(
                "state",
                "batch has already been submitted",
            ));
        }
        if self.batch.is_empty() {
            return Err(FacturaError::invalid(
                "batch",
                "must contain at least one invoice",
            ));
        }

        match self.submit(auth, locks, transport, reference) {
            Ok(authorized) => Ok(authorized),
            Err(e) => {
                self.state = AuthorizationState::Errored;
                Err(e)
            }
        }
    }

    fn submit(
        &mut self,
        auth: &AuthTokenCache,
        locks: &SequenceLocks,
        transport: &dyn Transport,
        reference: &dyn Reference,
    ) -> Result<bool, FacturaError> {
        let code = self.bill_type_code();
        let slot = locks.slot(code);
        let _serial = slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        let header = auth.auth_header(&self.config.cuit)?;
        let last = reference.last_authorized_number(code)?;
        assign_numbers(&mut self.batch, last);

        let today = self.issue_date.unwrap_or_else(|| Local::now().date_naive());
        let period = ServicePeriod {
            from: self.service_from.unwrap_or(today),
            to: self.service_to.unwrap_or(today),
            due: self.due_date.unwrap_or(today),
        };

        let request = CaeRequest {
            auth: header,
            request: FeCaeReq {
                header: FeCabReq {
                    count: self.batch.len() as u32,
                    bill_type_code: code,
                    sale_point: self.config.sale_point,
                },
                detail: FeDetReq {
                    requests: self
                        .batch
                        .iter()
                        .map(|invoice| FeCaeDetRequest::for_invoice(invoice, today, period))
                        .collect(),
                },
            },
        };
        let body = serde_json::to_value(&request)
            .map_err(|e| FacturaError::Transport(format!("encoding request: {e}")))?;

        debug!(
            bill_type_code = code,
            count = self.batch.len(),
            "submitting FECAESolicitar"
        );
        self.state = AuthorizationState::Submitted;
        let raw = transport.call(
            self.config.environment.wsfe_url(),
            "FECAESolicitar",
            &body,
        )?;

        let response = parse_response(&raw)?;
        self.state = if response.authorized() {
            AuthorizationState::Authorized
        } else {
            AuthorizationState::PartiallyRejected
        };
        info!(
            bill_type_code = code,
            state = ?self.state,
            processed_on = %response.authorized_on,
            "authorization reply interpreted"
        );
        self.response = Some(response);
        Ok(self.state == AuthorizationState::Authorized)
    }
}
