#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! End-to-end validation tests against the fixture PKI in `testdata/`.
//!
//! The fixtures form a small RSA hierarchy (root -> intermediate ->
//! leaf/leaf-revoked, with a CRL issued by the intermediate), an EC
//! hierarchy (P-384 root -> P-256 leaf), a 1024-bit self-signed
//! certificate, and a cross-signed pair that forms a cycle. All have fixed
//! validity windows, so tests pin the evaluation time instead of using the
//! wall clock.

use std::path::PathBuf;

use certvet_lib::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn testdata(name: &str) -> PathBuf {
    let mut p = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    p.pop(); // up from certvet-lib to workspace root
    p.push("testdata");
    p.push(name);
    p
}

fn read(name: &str) -> Vec<u8> {
    std::fs::read(testdata(name)).unwrap()
}

/// First DER certificate from a PEM fixture.
fn read_der(name: &str) -> Vec<u8> {
    decode_pem_bundle(&read(name)).unwrap().remove(0)
}

fn store_with(names: &[&str]) -> TrustStore {
    let mut store = TrustStore::new();
    for name in names {
        store.add_der(&read_der(name)).unwrap();
    }
    store
}

struct AlwaysGood;
impl RevocationCheck for AlwaysGood {
    fn check(
        &self,
        _cert: &Certificate,
        _issuer: &Certificate,
        _now: i64,
    ) -> Result<RevocationStatus, certvet_lib::RevocationError> {
        Ok(RevocationStatus::Good)
    }
}

const MID_2024: i64 = 1717200000; // 2024-06-01T00:00:00Z
const EXPIRY_SOON: i64 = 1741996800; // 2025-03-15; leaf expires 2025-04-01
const YEAR_2027: i64 = 1798761600; // 2027-01-01; leaf is expired
const CRL_CURRENT: i64 = 1780272000; // 2026-06-01; inside the CRL window
const FAR_FUTURE: i64 = 4102444800; // 2100-01-01; everything is expired

fn check_status(report: &Report, name: &str) -> Status {
    report
        .checks
        .iter()
        .find(|c| c.name == name)
        .map(|c| c.status)
        .unwrap_or_else(|| panic!("no check named {:?} in report", name))
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

#[test]
fn decoding_is_deterministic() {
    let der = read_der("leaf.pem");
    let a = decode(&der, FormatHint::Der).unwrap();
    let b = decode(&der, FormatHint::Der).unwrap();
    assert_eq!(a, b);
}

#[test]
fn pem_and_der_decode_to_the_same_certificate() {
    let from_pem = decode(&read("leaf.pem"), FormatHint::Auto).unwrap();
    let from_der = decode(&read_der("leaf.pem"), FormatHint::Auto).unwrap();
    assert_eq!(from_pem, from_der);
    assert_eq!(from_pem.common_name(), Some("example.com"));
    assert_eq!(
        from_pem.san_dns_names(),
        vec!["example.com", "www.example.com", "*.example.com"]
    );
}

// ---------------------------------------------------------------------------
// Full pipeline
// ---------------------------------------------------------------------------

#[test]
fn valid_rsa_chain_passes_every_check() {
    let report = validate(
        &read("leaf.pem"),
        FormatHint::Auto,
        &[read_der("intermediate.pem")],
        &store_with(&["root.pem"]),
        MID_2024,
        Some("www.example.com"),
        &AlwaysGood,
    )
    .unwrap();

    assert!(report.valid, "issues: {:?}", report.issues);
    assert!(report.issues.is_empty());
    assert!(report.warnings.is_empty());
    assert_eq!(report.checks.len(), 7);
    assert!(report.checks.iter().all(|c| c.status == Status::Pass));
    assert_eq!(report.subject, "O = Example Corp, CN = example.com");
    assert_eq!(report.signature_algorithm, "sha256WithRSAEncryption");
    assert_eq!(report.valid_until, "2025-04-01T00:00:00Z");
}

#[test]
fn valid_ec_chain_passes() {
    let report = validate(
        &read("ec-leaf.pem"),
        FormatHint::Auto,
        &[],
        &store_with(&["ec-root.pem"]),
        MID_2024,
        Some("ec.example.com"),
        &AlwaysGood,
    )
    .unwrap();

    assert!(report.valid, "issues: {:?}", report.issues);
    assert_eq!(report.signature_algorithm, "ecdsa-with-SHA384");
}

#[test]
fn example_from_the_leaf_expiry_window() {
    // Leaf valid 2024-01-01..2025-04-01, evaluated 2025-03-15 with a good
    // revocation answer and a matching hostname: valid, one warning.
    let report = validate(
        &read("leaf.pem"),
        FormatHint::Auto,
        &[read_der("intermediate.pem")],
        &store_with(&["root.pem"]),
        EXPIRY_SOON,
        Some("example.com"),
        &AlwaysGood,
    )
    .unwrap();

    assert!(report.valid);
    assert!(report.issues.is_empty());
    assert_eq!(report.warnings, vec!["Certificate expires in 17 days"]);
    assert_eq!(check_status(&report, "Time Validity"), Status::Warning);
}

#[test]
fn expired_leaf_is_invalid() {
    let report = validate(
        &read("leaf.pem"),
        FormatHint::Auto,
        &[read_der("intermediate.pem")],
        &store_with(&["root.pem"]),
        YEAR_2027,
        None,
        &AlwaysGood,
    )
    .unwrap();

    assert!(!report.valid);
    assert_eq!(check_status(&report, "Time Validity"), Status::Fail);
    assert!(report.issues.iter().any(|i| i.contains("expired")));
}

#[test]
fn expired_self_signed_certificate_is_invalid() {
    let report = validate(
        &read("root.pem"),
        FormatHint::Auto,
        &[],
        &store_with(&["root.pem"]),
        FAR_FUTURE,
        None,
        &AlwaysGood,
    )
    .unwrap();

    assert!(!report.valid);
    assert_eq!(check_status(&report, "Time Validity"), Status::Fail);
}

#[test]
fn tampered_signature_is_invalid() {
    // The certificate's DER ends with the signature BitString; flipping its
    // last byte corrupts the signature without disturbing the TBS bytes.
    let mut der = read_der("leaf.pem");
    let last = der.len() - 1;
    der[last] ^= 0x01;

    let report = validate(
        &der,
        FormatHint::Der,
        &[read_der("intermediate.pem")],
        &store_with(&["root.pem"]),
        MID_2024,
        None,
        &AlwaysGood,
    )
    .unwrap();

    assert!(!report.valid);
    assert_eq!(
        check_status(&report, "Signature Chain Integrity"),
        Status::Fail
    );
}

#[test]
fn untrusted_chain_reports_chain_failure() {
    let report = validate(
        &read("leaf.pem"),
        FormatHint::Auto,
        &[],
        &TrustStore::new(),
        MID_2024,
        None,
        &AlwaysGood,
    )
    .unwrap();

    assert!(!report.valid);
    assert!(report.checks.is_empty());
    assert!(report.issues[0].contains("no path to a trust anchor"));
}

#[test]
fn cross_signed_cycle_reports_chain_failure() {
    let report = validate(
        &read("cycle-a.pem"),
        FormatHint::Auto,
        &[read_der("cycle-b.pem"), read_der("cycle-a.pem")],
        &store_with(&["root.pem"]),
        MID_2024,
        None,
        &AlwaysGood,
    )
    .unwrap();

    assert!(!report.valid);
    assert!(report.issues[0].contains("no path to a trust anchor"));
}

#[test]
fn weak_rsa_key_is_invalid() {
    let report = validate(
        &read("weak-rsa.pem"),
        FormatHint::Auto,
        &[],
        &store_with(&["weak-rsa.pem"]),
        MID_2024,
        None,
        &AlwaysGood,
    )
    .unwrap();

    assert!(!report.valid);
    assert_eq!(check_status(&report, "Key Strength"), Status::Fail);
    assert!(report.issues.iter().any(|i| i.contains("1024-bit")));
}

#[test]
fn hostname_mismatch_is_invalid() {
    let report = validate(
        &read("leaf.pem"),
        FormatHint::Auto,
        &[read_der("intermediate.pem")],
        &store_with(&["root.pem"]),
        MID_2024,
        Some("a.b.example.com"),
        &AlwaysGood,
    )
    .unwrap();

    assert!(!report.valid);
    assert_eq!(check_status(&report, "Name Matching"), Status::Fail);
    // Everything else still ran and passed; a report shows every problem.
    assert_eq!(check_status(&report, "Time Validity"), Status::Pass);
    assert_eq!(check_status(&report, "Trust Anchor"), Status::Pass);
}

// ---------------------------------------------------------------------------
// Revocation
// ---------------------------------------------------------------------------

#[test]
fn revoked_certificate_is_invalid() {
    let crl = CrlRevocationChecker::from_pem_file(&testdata("intermediate.crl.pem")).unwrap();
    let report = validate(
        &read("leaf-revoked.pem"),
        FormatHint::Auto,
        &[read_der("intermediate.pem")],
        &store_with(&["root.pem"]),
        CRL_CURRENT,
        None,
        &crl,
    )
    .unwrap();

    assert!(!report.valid);
    assert_eq!(check_status(&report, "Revocation"), Status::Fail);
    assert!(report.issues.iter().any(|i| i.contains("keyCompromise")));
}

#[test]
fn unlisted_serial_does_not_fail_revocation() {
    // leaf.pem (serial 10:00) is covered by the CRL but not listed; the
    // intermediate has no applicable CRL, which degrades to a warning. The
    // leaf is past its notAfter at this evaluation time, so the only
    // failure must be Time Validity, never Revocation.
    let crl = CrlRevocationChecker::from_pem_file(&testdata("intermediate.crl.pem")).unwrap();
    let report = validate(
        &read("leaf.pem"),
        FormatHint::Auto,
        &[read_der("intermediate.pem")],
        &store_with(&["root.pem"]),
        CRL_CURRENT,
        None,
        &crl,
    )
    .unwrap();

    assert_eq!(check_status(&report, "Revocation"), Status::Warning);
    assert_eq!(check_status(&report, "Time Validity"), Status::Fail);
    assert_eq!(report.issues.len(), 1);
}

#[test]
fn no_revocation_source_warns_but_stays_valid() {
    let report = validate(
        &read("leaf.pem"),
        FormatHint::Auto,
        &[read_der("intermediate.pem")],
        &store_with(&["root.pem"]),
        MID_2024,
        Some("example.com"),
        &NoRevocationCheck,
    )
    .unwrap();

    assert!(report.valid);
    assert_eq!(check_status(&report, "Revocation"), Status::Warning);
    assert!(report
        .warnings
        .iter()
        .any(|w| w.contains("no revocation source")));
}

// ---------------------------------------------------------------------------
// Report serialization
// ---------------------------------------------------------------------------

#[test]
fn report_json_matches_the_stable_schema() {
    let report = validate(
        &read("leaf.pem"),
        FormatHint::Auto,
        &[read_der("intermediate.pem")],
        &store_with(&["root.pem"]),
        MID_2024,
        Some("www.example.com"),
        &AlwaysGood,
    )
    .unwrap();

    let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    for field in [
        "valid",
        "subject",
        "issuer",
        "validFrom",
        "validUntil",
        "serialNumber",
        "signatureAlgorithm",
        "checks",
        "issues",
        "warnings",
    ] {
        assert!(value.get(field).is_some(), "missing field {:?}", field);
    }
    assert_eq!(value["checks"].as_array().unwrap().len(), 7);
    assert_eq!(value["checks"][0]["status"], "pass");
    assert_eq!(value["serialNumber"], "10:00");
}
