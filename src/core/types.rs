use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// WSAA/WSFE endpoints per environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Homologación (testing) servers.
    Test,
    /// Production servers.
    Production,
}

impl Environment {
    /// WSAA login endpoint for this environment.
    pub fn wsaa_url(&self) -> &'static str {
        match self {
            Self::Test => "https://wsaahomo.afip.gov.ar/ws/services/LoginCms",
            Self::Production => "https://wsaa.afip.gov.ar/ws/services/LoginCms",
        }
    }

    /// WSFE v1 service endpoint for this environment.
    pub fn wsfe_url(&self) -> &'static str {
        match self {
            Self::Test => "https://wswhomo.afip.gov.ar/wsfev1/service.asmx",
            Self::Production => "https://servicios1.afip.gov.ar/wsfev1/service.asmx",
        }
    }
}

/// Fiscal registration status of a party (condición frente al IVA).
///
/// The seller's own condition governs which buyer conditions are legal
/// counterparts and which bill letter applies to the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VatCondition {
    ResponsableInscripto,
    ResponsableMonotributo,
    ConsumidorFinal,
    Exento,
}

impl VatCondition {
    /// Buyer conditions a seller with this condition may invoice.
    ///
    /// A final consumer cannot issue invoices, so its counterpart set
    /// is empty.
    pub fn counterparts(&self) -> &'static [VatCondition] {
        use VatCondition::*;
        match self {
            ResponsableInscripto | ResponsableMonotributo | Exento => &[
                ResponsableInscripto,
                ResponsableMonotributo,
                ConsumidorFinal,
                Exento,
            ],
            ConsumidorFinal => &[],
        }
    }

    /// Whether `buyer` is a legal counterpart for this own condition.
    pub fn accepts(&self, buyer: VatCondition) -> bool {
        self.counterparts().contains(&buyer)
    }
}

/// Bill letter distinguishing invoice classes by the seller/buyer
/// VAT-condition pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillType {
    /// "A" — responsable inscripto to responsable inscripto/monotributo.
    BillA,
    /// "B" — responsable inscripto to final consumer or exempt.
    BillB,
    /// "C" — issued by monotributo or exempt sellers.
    BillC,
}

impl BillType {
    /// WSFE `CbteTipo` code for this bill letter and document kind.
    pub fn wsfe_code(&self, invoice_type: InvoiceType) -> u32 {
        use InvoiceType::*;
        match (self, invoice_type) {
            (Self::BillA, Invoice) => 1,
            (Self::BillA, DebitNote) => 2,
            (Self::BillA, CreditNote) => 3,
            (Self::BillA, Receipt) => 4,
            (Self::BillB, Invoice) => 6,
            (Self::BillB, DebitNote) => 7,
            (Self::BillB, CreditNote) => 8,
            (Self::BillB, Receipt) => 9,
            (Self::BillC, Invoice) => 11,
            (Self::BillC, DebitNote) => 12,
            (Self::BillC, CreditNote) => 13,
            (Self::BillC, Receipt) => 15,
        }
    }
}

/// Kind of document within a bill letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceType {
    Invoice,
    DebitNote,
    CreditNote,
    Receipt,
}

/// Classification of the transaction. Services (and mixed) require the
/// service-period fields on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Concept {
    Goods,
    Services,
    GoodsAndServices,
}

impl Concept {
    /// WSFE `Concepto` code.
    pub fn code(&self) -> u32 {
        match self {
            Self::Goods => 1,
            Self::Services => 2,
            Self::GoodsAndServices => 3,
        }
    }
}

/// Invoice currency. The WSFE `MonId` codes are AFIP's own table, not
/// ISO 4217.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Currency {
    Peso,
    Dollar,
    Euro,
    Real,
}

impl Currency {
    /// WSFE `MonId` code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Peso => "PES",
            Self::Dollar => "DOL",
            Self::Euro => "060",
            Self::Real => "012",
        }
    }
}

/// Identity document kind of the buyer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Cuit,
    Cuil,
    Dni,
}

impl DocumentType {
    /// WSFE `DocTipo` code.
    pub fn code(&self) -> u32 {
        match self {
            Self::Cuit => 80,
            Self::Cuil => 86,
            Self::Dni => 96,
        }
    }
}

/// VAT rate identifiers of the WSFE `AlicIva` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VatRate {
    /// 0%
    Zero,
    /// 2.5%
    TwoPointFive,
    /// 5%
    Five,
    /// 10.5%
    TenPointFive,
    /// 21% — the general rate.
    TwentyOne,
    /// 27%
    TwentySeven,
}

impl VatRate {
    /// WSFE `AlicIva.Id` code.
    pub fn id(&self) -> u32 {
        match self {
            Self::Zero => 3,
            Self::TwoPointFive => 9,
            Self::Five => 8,
            Self::TenPointFive => 4,
            Self::TwentyOne => 5,
            Self::TwentySeven => 6,
        }
    }

    /// Parse from an `AlicIva.Id` code.
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            3 => Some(Self::Zero),
            9 => Some(Self::TwoPointFive),
            8 => Some(Self::Five),
            4 => Some(Self::TenPointFive),
            5 => Some(Self::TwentyOne),
            6 => Some(Self::TwentySeven),
            _ => None,
        }
    }

    /// Rate as a percentage.
    pub fn percentage(&self) -> Decimal {
        match self {
            Self::Zero => dec!(0),
            Self::TwoPointFive => dec!(2.5),
            Self::Five => dec!(5),
            Self::TenPointFive => dec!(10.5),
            Self::TwentyOne => dec!(21),
            Self::TwentySeven => dec!(27),
        }
    }
}

/// One `{rate, base, amount}` triple of the VAT breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatLine {
    /// Rate identifier. A rate appears at most once per invoice.
    pub rate: VatRate,
    /// Taxed base for this rate.
    pub base: Decimal,
    /// VAT amount for this rate.
    pub amount: Decimal,
}

/// Process-wide taxpayer configuration, passed explicitly into the
/// authorizer and the token cache. There is no global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxpayerConfig {
    /// Taxpayer id (CUIT), digits only.
    pub cuit: String,
    /// Point of sale scoping the invoice-numbering sequence.
    pub sale_point: u32,
    /// The seller's own VAT condition.
    pub own_vat_condition: VatCondition,
    /// Default concept for new invoices.
    pub default_concept: Concept,
    /// Default currency for new invoices.
    pub default_currency: Currency,
    /// Default buyer document type for new invoices.
    pub default_document_type: DocumentType,
    /// Which AFIP servers to talk to.
    pub environment: Environment,
}

/// An invoice awaiting authorization. Immutable after construction —
/// build one with [`InvoiceBuilder`](crate::core::InvoiceBuilder).
///
/// All monetary fields are rounded to 2 decimals at construction.
/// `invoice_number` 0 means "assign automatically from the sequence".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub(crate) total_taxed: Decimal,
    pub(crate) document_type: DocumentType,
    pub(crate) document_number: String,
    pub(crate) buyer_vat_condition: VatCondition,
    pub(crate) concept: Concept,
    pub(crate) currency: Currency,
    pub(crate) exempt_amount: Decimal,
    pub(crate) other_taxes: Decimal,
    pub(crate) vat: Vec<VatLine>,
    pub(crate) invoice_number: u64,
}

impl Invoice {
    /// Total taxed amount (importe gravado).
    pub fn total_taxed(&self) -> Decimal {
        self.total_taxed
    }

    pub fn document_type(&self) -> DocumentType {
        self.document_type
    }

    pub fn document_number(&self) -> &str {
        &self.document_number
    }

    pub fn buyer_vat_condition(&self) -> VatCondition {
        self.buyer_vat_condition
    }

    pub fn concept(&self) -> Concept {
        self.concept
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Exempt amount (importe exento), 0 by default.
    pub fn exempt_amount(&self) -> Decimal {
        self.exempt_amount
    }

    /// Other national taxes (tributos), 0 by default.
    pub fn other_taxes(&self) -> Decimal {
        self.other_taxes
    }

    /// The VAT breakdown, one line per rate.
    pub fn vat_breakdown(&self) -> &[VatLine] {
        &self.vat
    }

    /// Explicit invoice number, or 0 if one is to be assigned.
    pub fn invoice_number(&self) -> u64 {
        self.invoice_number
    }

    /// Numbering is the only sanctioned mutation after construction.
    pub(crate) fn set_invoice_number(&mut self, number: u64) {
        self.invoice_number = number;
    }
}
