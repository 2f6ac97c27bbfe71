//! # factura
//!
//! Electronic invoicing for the Argentine tax authority (AFIP):
//! WSFE batch authorization (`FECAESolicitar`), the WSAA daily
//! authentication-token cache, and invoice tax arithmetic.
//!
//! All monetary values use [`rust_decimal::Decimal`] — never floating point.
//! Wire field names follow the WSFE v1 service exactly (`CbteTipo`,
//! `ImpNeto`, `FchVtoPago`, ...).
//!
//! The pieces that talk to the outside world — the SOAP transport, the CMS
//! signing of the WSAA login, and the last-authorized-number lookup — are
//! traits ([`Transport`], [`Authenticator`], [`Reference`]) so the
//! authorization pipeline stays testable without a connection to AFIP.
//!
//! ## Quick Start
//!
//! ```rust
//! use factura::*;
//! use rust_decimal_macros::dec;
//!
//! let config = TaxpayerConfig {
//!     cuit: "20085617517".into(),
//!     sale_point: 4,
//!     own_vat_condition: VatCondition::ResponsableInscripto,
//!     default_concept: Concept::Services,
//!     default_currency: Currency::Peso,
//!     default_document_type: DocumentType::Cuit,
//!     environment: Environment::Test,
//! };
//!
//! let invoice = InvoiceBuilder::new(&config)
//!     .total_taxed(dec!(4400.00))
//!     .document(DocumentType::Cuit, "30711543267")
//!     .buyer_vat_condition(VatCondition::ResponsableInscripto)
//!     .vat_line(VatRate::TwentyOne, dec!(3619.91), dec!(780.09))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(invoice.net_amount(), dec!(3619.91));
//! assert_eq!(invoice.vat_sum(), dec!(780.09));
//! assert_eq!(invoice.total_final(), dec!(4400.00));
//! ```
//!
//! An authorization round-trip then looks like:
//!
//! ```rust,ignore
//! let mut bill = BillAuthorizer::new(config, BillType::BillA, InvoiceType::Invoice);
//! bill.add_invoice(invoice)?;
//! bill.authorize(&auth_cache, &sequence_locks, &transport, &reference)?;
//! assert!(bill.authorized());
//! ```

pub mod auth;
pub mod core;
pub mod wsfe;

// Re-export everything at the crate root for convenience
pub use crate::auth::*;
pub use crate::core::*;
pub use crate::wsfe::*;
