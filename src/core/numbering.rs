use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use super::types::Invoice;

/// Assign sequential numbers to the un-numbered invoices of a batch.
///
/// `last_authorized` is the last number the service authorized for the
/// bill-type code. The invoice at zero-based position `i` receives
/// `last_authorized + 1 + i` if its explicit number is 0; invoices with
/// an explicit number keep it but still consume their position in the
/// sequence (offset is index-based, not count-based, matching the
/// request builder).
///
/// Call exactly once per batch, after validation and before building
/// the wire request — numbers are embedded immutably into the detail
/// records.
pub fn assign_numbers(batch: &mut [Invoice], last_authorized: u64) {
    for (index, invoice) in batch.iter_mut().enumerate() {
        if invoice.invoice_number() == 0 {
            invoice.set_invoice_number(last_authorized + 1 + index as u64);
        }
    }
}

/// Per-bill-type-code serialization of number assignment.
///
/// Two batches that share a bill-type code and run concurrently would
/// both read the same last-authorized number and collide. The
/// authorizer holds the code's lock from the `Reference` query through
/// the transport call, so each batch sees the numbers the previous one
/// obtained authorization for.
#[derive(Debug, Default)]
pub struct SequenceLocks {
    slots: Mutex<HashMap<u32, Arc<Mutex<()>>>>,
}

impl SequenceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for a bill-type code, created on first use.
    pub fn slot(&self, bill_type_code: u32) -> Arc<Mutex<()>> {
        let mut slots = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(bill_type_code).or_default())
    }
}
