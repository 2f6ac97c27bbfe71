use rust_decimal::Decimal;

use super::error::FacturaError;
use super::tax::round2;
use super::types::*;
use super::validation;

/// Builder for [`Invoice`] values, seeded with the taxpayer's defaults.
///
/// The VAT breakdown is keyed by rate: adding a line for a rate that is
/// already present replaces the earlier line, so a rate appears at most
/// once per invoice.
///
/// ```
/// use factura::*;
/// use rust_decimal_macros::dec;
///
/// # let config = TaxpayerConfig {
/// #     cuit: "20085617517".into(),
/// #     sale_point: 4,
/// #     own_vat_condition: VatCondition::ResponsableInscripto,
/// #     default_concept: Concept::Services,
/// #     default_currency: Currency::Peso,
/// #     default_document_type: DocumentType::Cuit,
/// #     environment: Environment::Test,
/// # };
/// let invoice = InvoiceBuilder::new(&config)
///     .total_taxed(dec!(121.00))
///     .document(DocumentType::Dni, "36025649")
///     .buyer_vat_condition(VatCondition::ConsumidorFinal)
///     .vat_line(VatRate::TwentyOne, dec!(100.00), dec!(21.00))
///     .build()
///     .unwrap();
/// assert_eq!(invoice.total_final(), dec!(121.00));
/// ```
pub struct InvoiceBuilder<'a> {
    config: &'a TaxpayerConfig,
    total_taxed: Decimal,
    document_type: DocumentType,
    document_number: Option<String>,
    buyer_vat_condition: Option<VatCondition>,
    concept: Concept,
    currency: Currency,
    exempt_amount: Decimal,
    other_taxes: Decimal,
    vat: Vec<VatLine>,
    invoice_number: u64,
}

impl<'a> InvoiceBuilder<'a> {
    pub fn new(config: &'a TaxpayerConfig) -> Self {
        Self {
            config,
            total_taxed: Decimal::ZERO,
            document_type: config.default_document_type,
            document_number: None,
            buyer_vat_condition: None,
            concept: config.default_concept,
            currency: config.default_currency,
            exempt_amount: Decimal::ZERO,
            other_taxes: Decimal::ZERO,
            vat: Vec::new(),
            invoice_number: 0,
        }
    }

    /// Total taxed amount (importe gravado).
    pub fn total_taxed(mut self, amount: Decimal) -> Self {
        self.total_taxed = amount;
        self
    }

    /// Buyer identity document. Required.
    pub fn document(mut self, kind: DocumentType, number: impl Into<String>) -> Self {
        self.document_type = kind;
        self.document_number = Some(number.into());
        self
    }

    /// Buyer VAT condition. Required; must be a legal counterpart of
    /// the configured own condition.
    pub fn buyer_vat_condition(mut self, condition: VatCondition) -> Self {
        self.buyer_vat_condition = Some(condition);
        self
    }

    pub fn concept(mut self, concept: Concept) -> Self {
        self.concept = concept;
        self
    }

    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn exempt_amount(mut self, amount: Decimal) -> Self {
        self.exempt_amount = amount;
        self
    }

    pub fn other_taxes(mut self, amount: Decimal) -> Self {
        self.other_taxes = amount;
        self
    }

    /// Explicit invoice number. Leave unset (0) to have the sequencer
    /// assign the next number from the authorized sequence.
    pub fn invoice_number(mut self, number: u64) -> Self {
        self.invoice_number = number;
        self
    }

    /// Add a VAT breakdown line. Replaces any earlier line with the
    /// same rate.
    pub fn vat_line(mut self, rate: VatRate, base: Decimal, amount: Decimal) -> Self {
        let line = VatLine { rate, base, amount };
        match self.vat.iter_mut().find(|l| l.rate == rate) {
            Some(existing) => *existing = line,
            None => self.vat.push(line),
        }
        self
    }

    /// Round all monetary fields, run validation, and produce the
    /// immutable invoice.
    pub fn build(self) -> Result<Invoice, FacturaError> {
        let document_number = self
            .document_number
            .ok_or_else(|| FacturaError::invalid("document_number", "must be present"))?;
        let buyer_vat_condition = self
            .buyer_vat_condition
            .ok_or_else(|| FacturaError::invalid("buyer_vat_condition", "must be present"))?;

        let invoice = Invoice {
            total_taxed: round2(self.total_taxed),
            document_type: self.document_type,
            document_number,
            buyer_vat_condition,
            concept: self.concept,
            currency: self.currency,
            exempt_amount: round2(self.exempt_amount),
            other_taxes: round2(self.other_taxes),
            vat: self
                .vat
                .into_iter()
                .map(|line| VatLine {
                    rate: line.rate,
                    base: round2(line.base),
                    amount: round2(line.amount),
                })
                .collect(),
            invoice_number: self.invoice_number,
        };

        validation::validate(&invoice, self.config)?;
        Ok(invoice)
    }
}
