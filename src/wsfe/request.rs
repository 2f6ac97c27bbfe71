use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::auth::AuthHeader;
use crate::core::Invoice;

/// Format a date the way every WSFE date field expects it.
pub(crate) fn wsfe_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// The full `FECAESolicitar` request envelope.
#[derive(Debug, Clone, Serialize)]
pub struct CaeRequest {
    #[serde(rename = "Auth")]
    pub auth: AuthHeader,
    #[serde(rename = "FeCAEReq")]
    pub request: FeCaeReq,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeCaeReq {
    #[serde(rename = "FeCabReq")]
    pub header: FeCabReq,
    #[serde(rename = "FeDetReq")]
    pub detail: FeDetReq,
}

/// Request header: batch size, bill-type code, and sale point.
#[derive(Debug, Clone, Serialize)]
pub struct FeCabReq {
    #[serde(rename = "CantReg")]
    pub count: u32,
    #[serde(rename = "CbteTipo")]
    pub bill_type_code: u32,
    #[serde(rename = "PtoVta")]
    pub sale_point: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeDetReq {
    #[serde(rename = "FECAEDetRequest")]
    pub requests: Vec<FeCaeDetRequest>,
}

/// One detail record per invoice in the batch.
#[derive(Debug, Clone, Serialize)]
pub struct FeCaeDetRequest {
    #[serde(rename = "Concepto")]
    pub concept: u32,
    #[serde(rename = "DocTipo")]
    pub document_type: u32,
    #[serde(rename = "DocNro")]
    pub document_number: String,
    #[serde(rename = "CbteDesde")]
    pub invoice_from: u64,
    #[serde(rename = "CbteHasta")]
    pub invoice_to: u64,
    #[serde(rename = "CbteFch")]
    pub invoice_date: String,
    #[serde(rename = "ImpTotal")]
    pub total: Decimal,
    #[serde(rename = "ImpTotConc")]
    pub untaxed_total: Decimal,
    #[serde(rename = "ImpNeto")]
    pub net: Decimal,
    #[serde(rename = "ImpOpEx")]
    pub exempt: Decimal,
    #[serde(rename = "ImpIVA")]
    pub vat: Decimal,
    #[serde(rename = "ImpTrib")]
    pub other_taxes: Decimal,
    #[serde(rename = "MonId")]
    pub currency: String,
    #[serde(rename = "MonCotiz")]
    pub exchange_rate: Decimal,
    #[serde(rename = "Iva", skip_serializing_if = "Option::is_none")]
    pub vat_breakdown: Option<IvaField>,
    #[serde(rename = "FchServDesde", skip_serializing_if = "Option::is_none")]
    pub service_from: Option<String>,
    #[serde(rename = "FchServHasta", skip_serializing_if = "Option::is_none")]
    pub service_to: Option<String>,
    #[serde(rename = "FchVtoPago", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IvaField {
    #[serde(rename = "AlicIva")]
    pub lines: Vec<AlicIva>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlicIva {
    #[serde(rename = "Id")]
    pub id: u32,
    #[serde(rename = "BaseImp")]
    pub base: Decimal,
    #[serde(rename = "Importe")]
    pub amount: Decimal,
}

/// Dates the authorizer applies to service-concept invoices.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ServicePeriod {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub due: NaiveDate,
}

impl FeCaeDetRequest {
    /// Build the detail record for one invoice. `invoice_number` has
    /// already been assigned by the sequencer; `today` is the issue
    /// date; `period` applies only when the concept is not goods.
    pub(crate) fn for_invoice(
        invoice: &Invoice,
        today: NaiveDate,
        period: ServicePeriod,
    ) -> Self {
        use crate::core::Concept;

        // Breakdown travels only when there is a taxed amount to explain.
        let vat_breakdown = if !invoice.total_taxed().is_zero()
            && !invoice.vat_breakdown().is_empty()
        {
            Some(IvaField {
                lines: invoice
                    .vat_breakdown()
                    .iter()
                    .map(|line| AlicIva {
                        id: line.rate.id(),
                        base: line.base,
                        amount: line.amount,
                    })
                    .collect(),
            })
        } else {
            None
        };

        let service_dates = invoice.concept() != Concept::Goods;

        Self {
            concept: invoice.concept().code(),
            document_type: invoice.document_type().code(),
            document_number: invoice.document_number().to_string(),
            invoice_from: invoice.invoice_number(),
            invoice_to: invoice.invoice_number(),
            invoice_date: wsfe_date(today),
            total: invoice.total_final(),
            untaxed_total: dec!(0.00),
            net: invoice.net_amount(),
            exempt: invoice.exempt_amount(),
            vat: invoice.vat_sum(),
            other_taxes: invoice.other_taxes(),
            currency: invoice.currency().code().to_string(),
            exchange_rate: dec!(1),
            vat_breakdown,
            service_from: service_dates.then(|| wsfe_date(period.from)),
            service_to: service_dates.then(|| wsfe_date(period.to)),
            due_date: service_dates.then(|| wsfe_date(period.due)),
        }
    }
}
