use rust_decimal::Decimal;

use super::error::FacturaError;
use super::types::{Invoice, TaxpayerConfig};

/// Validate an invoice against the per-invoice and per-taxpayer
/// invariants. Runs at `InvoiceBuilder::build` and again when the
/// invoice joins a batch; an invoice that fails is never added.
pub fn validate(invoice: &Invoice, config: &TaxpayerConfig) -> Result<(), FacturaError> {
    if invoice.document_number.trim().is_empty() {
        return Err(FacturaError::invalid(
            "document_number",
            "must not be empty",
        ));
    }

    if !config.own_vat_condition.accepts(invoice.buyer_vat_condition) {
        return Err(FacturaError::invalid(
            "buyer_vat_condition",
            format!(
                "{:?} is not a legal counterpart for {:?}, expected one of {:?}",
                invoice.buyer_vat_condition,
                config.own_vat_condition,
                config.own_vat_condition.counterparts()
            ),
        ));
    }

    non_negative("total_taxed", invoice.total_taxed)?;
    non_negative("exempt_amount", invoice.exempt_amount)?;
    non_negative("other_taxes", invoice.other_taxes)?;
    for line in &invoice.vat {
        non_negative("vat.base", line.base)?;
        non_negative("vat.amount", line.amount)?;
    }

    Ok(())
}

fn non_negative(field: &'static str, value: Decimal) -> Result<(), FacturaError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(FacturaError::invalid(
            field,
            format!("must not be negative, got {value}"),
        ));
    }
    Ok(())
}
