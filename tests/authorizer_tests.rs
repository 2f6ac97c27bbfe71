use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use factura::*;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tempfile::TempDir;

// --- Mock collaborators ---

struct MockTransport {
    reply: Value,
    fail: bool,
    calls: Mutex<Vec<(String, String, Value)>>,
}

impl MockTransport {
    fn replying(reply: Value) -> Self {
        Self {
            reply,
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            reply: Value::Null,
            fail: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn only_call(&self) -> (String, String, Value) {
        let calls = self.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        calls[0].clone()
    }
}

impl Transport for MockTransport {
    fn call(&self, url: &str, operation: &str, body: &Value) -> Result<Value, FacturaError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), operation.to_string(), body.clone()));
        if self.fail {
            return Err(FacturaError::Transport("connection refused".into()));
        }
        Ok(self.reply.clone())
    }
}

struct MockReference {
    last: u64,
}

impl Reference for MockReference {
    fn last_authorized_number(&self, _bill_type_code: u32) -> Result<u64, FacturaError> {
        Ok(self.last)
    }
}

struct MockAuthenticator {
    logins: Arc<AtomicUsize>,
}

impl Authenticator for MockAuthenticator {
    fn login(
        &self,
        _private_key: &Path,
        _certificate: &Path,
        _environment: Environment,
    ) -> Result<AuthToken, FacturaError> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        Ok(AuthToken {
            token: "wsaa-token".into(),
            sign: "wsaa-sign".into(),
            expires_at: None,
            cuit: "20085617517".into(),
        })
    }
}

// --- Fixtures ---

fn config() -> TaxpayerConfig {
    TaxpayerConfig {
        cuit: "20085617517".into(),
        sale_point: 4,
        own_vat_condition: VatCondition::ResponsableInscripto,
        default_concept: Concept::Services,
        default_currency: Currency::Peso,
        default_document_type: DocumentType::Cuit,
        environment: Environment::Test,
    }
}

fn cache(dir: &TempDir, logins: &Arc<AtomicUsize>) -> AuthTokenCache {
    let key = dir.path().join("testing.key");
    let cert = dir.path().join("testing.crt");
    fs::write(&key, "key").unwrap();
    fs::write(&cert, "cert").unwrap();
    AuthTokenCache::new(
        dir.path().join("wsaa"),
        Credentials::new(key, cert),
        Environment::Test,
        Box::new(MockAuthenticator {
            logins: Arc::clone(logins),
        }),
    )
    .with_date_source(|| NaiveDate::from_ymd_opt(2026, 8, 25).unwrap())
}

fn invoice_a(total: rust_decimal::Decimal) -> Invoice {
    let cfg = config();
    InvoiceBuilder::new(&cfg)
        .total_taxed(total)
        .document(DocumentType::Cuit, "30711543267")
        .buyer_vat_condition(VatCondition::ResponsableInscripto)
        .vat_line(VatRate::TwentyOne, dec!(3619.91), dec!(780.09))
        .build()
        .unwrap()
}

fn bill() -> BillAuthorizer {
    BillAuthorizer::new(config(), BillType::BillA, InvoiceType::Invoice)
        .issue_date(NaiveDate::from_ymd_opt(2026, 8, 25).unwrap())
}

fn reply(header_result: &str, details: Value) -> Value {
    json!({
        "fecae_solicitar_response": {
            "fecae_solicitar_result": {
                "fe_cab_resp": {
                    "resultado": header_result,
                    "fch_proceso": "20260825103000",
                    "cbte_tipo": 1,
                    "pto_vta": 4
                },
                "fe_det_resp": { "fecae_det_response": details }
            }
        }
    })
}

fn approved_detail(number: u64) -> Value {
    json!({
        "resultado": "A",
        "cbte_desde": number,
        "cae": "76101234567890",
        "cae_fch_vto": "20260904"
    })
}

// --- Tests ---

#[test]
fn single_invoice_approved() {
    let dir = TempDir::new().unwrap();
    let logins = Arc::new(AtomicUsize::new(0));
    let transport = MockTransport::replying(reply("A", approved_detail(4534)));
    let locks = SequenceLocks::new();

    let mut bill = bill();
    bill.add_invoice(invoice_a(dec!(4400.00))).unwrap();
    let authorized = bill
        .authorize(
            &cache(&dir, &logins),
            &locks,
            &transport,
            &MockReference { last: 4533 },
        )
        .unwrap();

    assert!(authorized);
    assert!(bill.authorized());
    assert_eq!(bill.state(), AuthorizationState::Authorized);
    assert_eq!(bill.invoices()[0].invoice_number(), 4534);

    let response = bill.response().unwrap();
    assert_eq!(response.header_result, ResultCode::Approved);
    assert_eq!(response.authorized_on, "20260825103000");
    assert_eq!(response.details.len(), 1);
    assert_eq!(response.details[0].cae.as_deref(), Some("76101234567890"));
}

#[test]
fn request_body_uses_exact_wire_names() {
    let dir = TempDir::new().unwrap();
    let logins = Arc::new(AtomicUsize::new(0));
    let transport = MockTransport::replying(reply("A", approved_detail(4534)));
    let locks = SequenceLocks::new();

    let mut bill = bill();
    bill.add_invoice(invoice_a(dec!(4400.00))).unwrap();
    bill.authorize(
        &cache(&dir, &logins),
        &locks,
        &transport,
        &MockReference { last: 4533 },
    )
    .unwrap();

    let (url, operation, body) = transport.only_call();
    assert_eq!(url, Environment::Test.wsfe_url());
    assert_eq!(operation, "FECAESolicitar");

    assert_eq!(body["Auth"]["Token"], "wsaa-token");
    assert_eq!(body["Auth"]["Sign"], "wsaa-sign");
    assert_eq!(body["Auth"]["Cuit"], "20085617517");

    let header = &body["FeCAEReq"]["FeCabReq"];
    assert_eq!(header["CantReg"], 1);
    assert_eq!(header["CbteTipo"], 1);
    assert_eq!(header["PtoVta"], 4);

    let detail = &body["FeCAEReq"]["FeDetReq"]["FECAEDetRequest"][0];
    assert_eq!(detail["DocNro"], "30711543267");
    assert_eq!(detail["DocTipo"], 80);
    assert_eq!(detail["CbteDesde"], 4534);
    assert_eq!(detail["CbteHasta"], 4534);
    assert_eq!(detail["CbteFch"], "20260825");
    assert_eq!(detail["Concepto"], 2);
    assert_eq!(detail["MonId"], "PES");
    assert_eq!(detail["MonCotiz"], "1");
    assert_eq!(detail["ImpNeto"], "3619.91");
    assert_eq!(detail["ImpIVA"], "780.09");
    assert_eq!(detail["ImpTotal"], "4400.00");
    assert_eq!(detail["ImpTotConc"], "0.00");
    assert_eq!(detail["ImpOpEx"], "0.00");
    assert_eq!(detail["ImpTrib"], "0.00");
    assert_eq!(detail["Iva"]["AlicIva"][0]["Id"], 5);
    assert_eq!(detail["Iva"]["AlicIva"][0]["BaseImp"], "3619.91");
    assert_eq!(detail["Iva"]["AlicIva"][0]["Importe"], "780.09");
}

#[test]
fn service_period_fields_follow_concept() {
    let dir = TempDir::new().unwrap();
    let logins = Arc::new(AtomicUsize::new(0));
    let cfg = config();
    let locks = SequenceLocks::new();

    // Services: the period fields travel, defaulting to the issue date.
    let transport = MockTransport::replying(reply("A", approved_detail(4534)));
    let mut services = bill();
    services.add_invoice(invoice_a(dec!(4400.00))).unwrap();
    services
        .authorize(
            &cache(&dir, &logins),
            &locks,
            &transport,
            &MockReference { last: 4533 },
        )
        .unwrap();
    let (_, _, body) = transport.only_call();
    let detail = &body["FeCAEReq"]["FeDetReq"]["FECAEDetRequest"][0];
    assert_eq!(detail["FchServDesde"], "20260825");
    assert_eq!(detail["FchServHasta"], "20260825");
    assert_eq!(detail["FchVtoPago"], "20260825");

    // Goods: no period fields at all.
    let transport = MockTransport::replying(reply("A", approved_detail(4535)));
    let goods_invoice = InvoiceBuilder::new(&cfg)
        .total_taxed(dec!(121.00))
        .concept(Concept::Goods)
        .document(DocumentType::Cuit, "30711543267")
        .buyer_vat_condition(VatCondition::ResponsableInscripto)
        .vat_line(VatRate::TwentyOne, dec!(100.00), dec!(21.00))
        .build()
        .unwrap();
    let mut goods = bill();
    goods.add_invoice(goods_invoice).unwrap();
    goods
        .authorize(
            &cache(&dir, &logins),
            &locks,
            &transport,
            &MockReference { last: 4534 },
        )
        .unwrap();
    let (_, _, body) = transport.only_call();
    let detail = &body["FeCAEReq"]["FeDetReq"]["FECAEDetRequest"][0];
    assert!(detail.get("FchServDesde").is_none());
    assert!(detail.get("FchServHasta").is_none());
    assert!(detail.get("FchVtoPago").is_none());
}

#[test]
fn explicit_service_period_overrides_defaults() {
    let dir = TempDir::new().unwrap();
    let logins = Arc::new(AtomicUsize::new(0));
    let transport = MockTransport::replying(reply("A", approved_detail(4534)));
    let locks = SequenceLocks::new();

    let mut bill = bill()
        .service_from(NaiveDate::from_ymd_opt(2026, 8, 1).unwrap())
        .service_to(NaiveDate::from_ymd_opt(2026, 8, 31).unwrap())
        .due_date(NaiveDate::from_ymd_opt(2026, 9, 10).unwrap());
    bill.add_invoice(invoice_a(dec!(4400.00))).unwrap();
    bill.authorize(
        &cache(&dir, &logins),
        &locks,
        &transport,
        &MockReference { last: 4533 },
    )
    .unwrap();

    let (_, _, body) = transport.only_call();
    let detail = &body["FeCAEReq"]["FeDetReq"]["FECAEDetRequest"][0];
    assert_eq!(detail["FchServDesde"], "20260801");
    assert_eq!(detail["FchServHasta"], "20260831");
    assert_eq!(detail["FchVtoPago"], "20260910");
}

#[test]
fn zero_taxed_total_omits_vat_breakdown() {
    let dir = TempDir::new().unwrap();
    let logins = Arc::new(AtomicUsize::new(0));
    let transport = MockTransport::replying(reply("A", approved_detail(4534)));
    let locks = SequenceLocks::new();
    let cfg = config();

    let exempt_only = InvoiceBuilder::new(&cfg)
        .exempt_amount(dec!(100.00))
        .document(DocumentType::Dni, "36025649")
        .buyer_vat_condition(VatCondition::ConsumidorFinal)
        .build()
        .unwrap();

    let mut bill = BillAuthorizer::new(cfg, BillType::BillB, InvoiceType::Invoice)
        .issue_date(NaiveDate::from_ymd_opt(2026, 8, 25).unwrap());
    bill.add_invoice(exempt_only).unwrap();
    bill.authorize(
        &cache(&dir, &logins),
        &locks,
        &transport,
        &MockReference { last: 4533 },
    )
    .unwrap();

    let (_, _, body) = transport.only_call();
    let header = &body["FeCAEReq"]["FeCabReq"];
    assert_eq!(header["CbteTipo"], 6);
    let detail = &body["FeCAEReq"]["FeDetReq"]["FECAEDetRequest"][0];
    assert!(detail.get("Iva").is_none());
    assert_eq!(detail["ImpOpEx"], "100.00");
    assert_eq!(detail["ImpTotal"], "100.00");
}

#[test]
fn two_invoice_reply_preserves_order() {
    let dir = TempDir::new().unwrap();
    let logins = Arc::new(AtomicUsize::new(0));
    let transport = MockTransport::replying(reply(
        "A",
        json!([approved_detail(4534), approved_detail(4535)]),
    ));
    let locks = SequenceLocks::new();

    let mut bill = bill();
    bill.add_invoice(invoice_a(dec!(4400.00))).unwrap();
    bill.add_invoice(invoice_a(dec!(4400.00))).unwrap();
    bill.authorize(
        &cache(&dir, &logins),
        &locks,
        &transport,
        &MockReference { last: 4533 },
    )
    .unwrap();

    let numbers: Vec<u64> = bill.invoices().iter().map(Invoice::invoice_number).collect();
    assert_eq!(numbers, vec![4534, 4535]);

    let response = bill.response().unwrap();
    assert_eq!(response.details.len(), 2);
    assert_eq!(response.details[0].cbte_desde, Some(4534));
    assert_eq!(response.details[1].cbte_desde, Some(4535));
    assert!(bill.authorized());
}

#[test]
fn explicit_invoice_number_travels_unchanged() {
    let dir = TempDir::new().unwrap();
    let logins = Arc::new(AtomicUsize::new(0));
    let transport = MockTransport::replying(reply("A", approved_detail(500)));
    let locks = SequenceLocks::new();
    let cfg = config();

    let numbered = InvoiceBuilder::new(&cfg)
        .total_taxed(dec!(4400.00))
        .invoice_number(500)
        .document(DocumentType::Cuit, "30711543267")
        .buyer_vat_condition(VatCondition::ResponsableInscripto)
        .vat_line(VatRate::TwentyOne, dec!(3619.91), dec!(780.09))
        .build()
        .unwrap();

    let mut bill = bill();
    bill.add_invoice(numbered).unwrap();
    bill.authorize(
        &cache(&dir, &logins),
        &locks,
        &transport,
        &MockReference { last: 4533 },
    )
    .unwrap();

    let (_, _, body) = transport.only_call();
    let detail = &body["FeCAEReq"]["FeDetReq"]["FECAEDetRequest"][0];
    assert_eq!(detail["CbteDesde"], 500);
    assert_eq!(detail["CbteHasta"], 500);
}

#[test]
fn rejected_detail_means_partial_rejection_not_error() {
    let dir = TempDir::new().unwrap();
    let logins = Arc::new(AtomicUsize::new(0));
    let transport = MockTransport::replying(reply(
        "A",
        json!([
            approved_detail(4534),
            {
                "resultado": "R",
                "cbte_desde": 4535,
                "observaciones": { "obs": { "code": 10048, "msg": "Factura rechazada" } }
            }
        ]),
    ));
    let locks = SequenceLocks::new();

    let mut bill = bill();
    bill.add_invoice(invoice_a(dec!(4400.00))).unwrap();
    bill.add_invoice(invoice_a(dec!(4400.00))).unwrap();
    let authorized = bill
        .authorize(
            &cache(&dir, &logins),
            &locks,
            &transport,
            &MockReference { last: 4533 },
        )
        .unwrap();

    assert!(!authorized);
    assert!(!bill.authorized());
    assert_eq!(bill.state(), AuthorizationState::PartiallyRejected);

    let response = bill.response().unwrap();
    assert!(!response.authorized());
    assert!(response.details[0].approved());
    assert!(!response.details[1].approved());
    assert_eq!(response.details[1].observaciones[0].code, 10048);
}

#[test]
fn rejected_header_is_partial_rejection_too() {
    let dir = TempDir::new().unwrap();
    let logins = Arc::new(AtomicUsize::new(0));
    let transport = MockTransport::replying(reply(
        "R",
        json!({ "resultado": "R", "cbte_desde": 4534 }),
    ));
    let locks = SequenceLocks::new();

    let mut bill = bill();
    bill.add_invoice(invoice_a(dec!(4400.00))).unwrap();
    let authorized = bill
        .authorize(
            &cache(&dir, &logins),
            &locks,
            &transport,
            &MockReference { last: 4533 },
        )
        .unwrap();

    assert!(!authorized);
    assert_eq!(bill.state(), AuthorizationState::PartiallyRejected);
}

#[test]
fn service_error_block_aborts_with_code_and_message() {
    let dir = TempDir::new().unwrap();
    let logins = Arc::new(AtomicUsize::new(0));
    let transport = MockTransport::replying(json!({
        "fecae_solicitar_response": {
            "fecae_solicitar_result": {
                "errors": {
                    "err": {
                        "code": 10016,
                        "msg": "CUIT representada no incluida en Token"
                    }
                }
            }
        }
    }));
    let locks = SequenceLocks::new();

    let mut bill = bill();
    bill.add_invoice(invoice_a(dec!(4400.00))).unwrap();
    let err = bill
        .authorize(
            &cache(&dir, &logins),
            &locks,
            &transport,
            &MockReference { last: 4533 },
        )
        .unwrap_err();

    match err {
        FacturaError::Service { code, message } => {
            assert_eq!(code, 10016);
            assert_eq!(message, "CUIT representada no incluida en Token");
        }
        other => panic!("expected service error, got {other:?}"),
    }
    assert_eq!(bill.state(), AuthorizationState::Errored);
    assert!(bill.response().is_none());
    assert!(!bill.authorized());
}

#[test]
fn transport_failure_propagates_and_marks_errored() {
    let dir = TempDir::new().unwrap();
    let logins = Arc::new(AtomicUsize::new(0));
    let transport = MockTransport::failing();
    let locks = SequenceLocks::new();

    let mut bill = bill();
    bill.add_invoice(invoice_a(dec!(4400.00))).unwrap();
    let err = bill
        .authorize(
            &cache(&dir, &logins),
            &locks,
            &transport,
            &MockReference { last: 4533 },
        )
        .unwrap_err();

    assert!(matches!(err, FacturaError::Transport(_)));
    assert_eq!(bill.state(), AuthorizationState::Errored);
    assert!(bill.response().is_none());
}

#[test]
fn empty_batch_never_reaches_the_network() {
    let dir = TempDir::new().unwrap();
    let logins = Arc::new(AtomicUsize::new(0));
    let transport = MockTransport::replying(reply("A", approved_detail(1)));
    let locks = SequenceLocks::new();

    let mut bill = bill();
    let err = bill
        .authorize(
            &cache(&dir, &logins),
            &locks,
            &transport,
            &MockReference { last: 0 },
        )
        .unwrap_err();

    assert!(matches!(
        err,
        FacturaError::InvalidAttribute { field: "batch", .. }
    ));
    assert!(transport.calls.lock().unwrap().is_empty());
    assert_eq!(logins.load(Ordering::SeqCst), 0);
}

#[test]
fn invalid_invoice_is_never_added() {
    let cfg = config();
    let bad = InvoiceBuilder::new(&cfg)
        .total_taxed(dec!(100))
        .document(DocumentType::Cuit, "")
        .buyer_vat_condition(VatCondition::ResponsableInscripto);
    assert!(bad.build().is_err());

    // Same invariant enforced at add time for invoices validated
    // against a different configuration.
    let mut other = cfg.clone();
    other.own_vat_condition = VatCondition::ConsumidorFinal;
    let invoice = invoice_a(dec!(4400.00));
    let mut bill = BillAuthorizer::new(other, BillType::BillC, InvoiceType::Invoice);
    assert!(bill.add_invoice(invoice).is_err());
    assert!(bill.invoices().is_empty());
}

#[test]
fn authorized_is_false_before_submission() {
    let mut bill = bill();
    assert!(!bill.authorized());
    assert_eq!(bill.state(), AuthorizationState::Building);
    bill.add_invoice(invoice_a(dec!(4400.00))).unwrap();
    assert!(!bill.authorized());
    assert!(bill.response().is_none());
}

#[test]
fn batch_is_sealed_after_submission() {
    let dir = TempDir::new().unwrap();
    let logins = Arc::new(AtomicUsize::new(0));
    let transport = MockTransport::replying(reply("A", approved_detail(4534)));
    let locks = SequenceLocks::new();

    let mut bill = bill();
    bill.add_invoice(invoice_a(dec!(4400.00))).unwrap();
    bill.authorize(
        &cache(&dir, &logins),
        &locks,
        &transport,
        &MockReference { last: 4533 },
    )
    .unwrap();

    assert!(bill.add_invoice(invoice_a(dec!(100.00))).is_err());
    assert!(matches!(
        bill.authorize(
            &cache(&dir, &logins),
            &locks,
            &transport,
            &MockReference { last: 4534 },
        ),
        Err(FacturaError::InvalidAttribute { field: "state", .. })
    ));
}

#[test]
fn token_cache_is_shared_across_batches() {
    let dir = TempDir::new().unwrap();
    let logins = Arc::new(AtomicUsize::new(0));
    let auth = cache(&dir, &logins);
    let locks = SequenceLocks::new();

    for last in [4533u64, 4534] {
        let transport = MockTransport::replying(reply("A", approved_detail(last + 1)));
        let mut bill = bill();
        bill.add_invoice(invoice_a(dec!(4400.00))).unwrap();
        bill.authorize(&auth, &locks, &transport, &MockReference { last })
            .unwrap();
    }

    assert_eq!(logins.load(Ordering::SeqCst), 1);
}
