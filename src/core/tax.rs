use rust_decimal::{Decimal, RoundingStrategy};

use super::types::Invoice;

/// Round a monetary value to 2 decimals, half away from zero.
///
/// The result keeps scale 2, so zero serializes as `0.00` on the wire.
pub(crate) fn round2(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

impl Invoice {
    /// Net (taxed base) amount: the sum of `base` over the VAT
    /// breakdown, rounded to 2 decimals. 0 for an empty breakdown.
    pub fn net_amount(&self) -> Decimal {
        round2(self.vat.iter().map(|line| line.base).sum())
    }

    /// VAT sum, derived as `total_taxed - net_amount` rather than by
    /// summing the breakdown `amount` fields. The two can diverge when
    /// the breakdown does not reconcile with the taxed total; the
    /// subtraction is the authoritative derivation.
    pub fn vat_sum(&self) -> Decimal {
        round2(self.total_taxed - self.net_amount())
    }

    /// Final total: `total_taxed + exempt_amount + other_taxes`,
    /// rounded to 2 decimals.
    pub fn total_final(&self) -> Decimal {
        round2(self.total_taxed + self.exempt_amount + self.other_taxes)
    }
}
