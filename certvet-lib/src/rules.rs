//! The rule engine.
//!
//! Runs a fixed, ordered checklist against a certification path and turns
//! the outcomes into a [`Report`]. Every check always runs and contributes
//! exactly one [`Finding`]; nothing short-circuits, so a report shows every
//! problem at once rather than the first one found.

use crate::cert::{Certificate, EcCurve, PublicKey};
use crate::chain::CertificationPath;
use crate::report::{Finding, Report};
use crate::revocation::{RevocationCheck, RevocationStatus};
use crate::trust::TrustStore;
use crate::util;
use crate::verify::verify_signature;
use crate::RevocationError;

/// Minimum RSA modulus size in bits.
const MIN_RSA_BITS: u32 = 2048;

/// Leaf expiry within this many days produces a warning.
const EXPIRY_WARNING_DAYS: i64 = 30;

/// The checks the engine runs, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    TimeValidity,
    SignatureChainIntegrity,
    TrustAnchor,
    KeyStrength,
    NameMatching,
    KeyUsage,
    Revocation,
}

impl CheckKind {
    /// The stable check name used in serialized reports.
    pub fn name(&self) -> &'static str {
        match self {
            CheckKind::TimeValidity => "Time Validity",
            CheckKind::SignatureChainIntegrity => "Signature Chain Integrity",
            CheckKind::TrustAnchor => "Trust Anchor",
            CheckKind::KeyStrength => "Key Strength",
            CheckKind::NameMatching => "Name Matching",
            CheckKind::KeyUsage => "Key Usage",
            CheckKind::Revocation => "Revocation",
        }
    }
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Evaluate the full checklist against a built path.
pub fn evaluate(
    path: &CertificationPath,
    now: i64,
    expected_hostname: Option<&str>,
    trust_store: &TrustStore,
    revocation: &dyn RevocationCheck,
) -> Report {
    let findings = vec![
        check_time_validity(path, now),
        check_signature_chain(path),
        check_trust_anchor(path, trust_store),
        check_key_strength(path),
        check_name_matching(path.leaf(), expected_hostname),
        check_key_usage(path.leaf()),
        check_revocation(path, now, revocation),
    ];
    Report::new(path.leaf(), findings)
}

/// Every certificate must be within its validity window. A leaf close to
/// expiry warns even when everything is currently valid.
fn check_time_validity(path: &CertificationPath, now: i64) -> Finding {
    let mut problems = Vec::new();
    for (i, cert) in path.iter().enumerate() {
        if now < cert.not_before.timestamp {
            problems.push(format!(
                "certificate at depth {} (\"{}\") is not valid before {}",
                i, cert.subject, cert.not_before
            ));
        }
        if now > cert.not_after.timestamp {
            problems.push(format!(
                "certificate at depth {} (\"{}\") expired on {}",
                i, cert.subject, cert.not_after
            ));
        }
    }
    if !problems.is_empty() {
        return Finding::fail(CheckKind::TimeValidity, problems.join("; "));
    }

    let leaf = path.leaf();
    let remaining_days = (leaf.not_after.timestamp - now) / 86_400;
    if remaining_days <= EXPIRY_WARNING_DAYS {
        return Finding::warning(
            CheckKind::TimeValidity,
            format!("Certificate expires in {} days", remaining_days),
        );
    }

    Finding::pass(
        CheckKind::TimeValidity,
        "all certificates are within their validity period".into(),
    )
}

/// Each certificate's signature must verify against its issuer's key. A
/// self-signed anchor is checked against its own key; a cross-signed anchor
/// is trusted directly, since its issuer lies outside the path.
fn check_signature_chain(path: &CertificationPath) -> Finding {
    let mut problems = Vec::new();
    for (i, cert) in path.iter().enumerate() {
        if i + 1 == path.len() && !cert.is_self_signed() {
            continue;
        }
        let issuer = path.issuer_of(i);
        if let Err(e) = verify_signature(
            &cert.raw_tbs,
            &cert.signature_algorithm,
            &cert.signature,
            &issuer.public_key,
        ) {
            problems.push(format!(
                "\"{}\" -> \"{}\": {}",
                cert.subject, issuer.subject, e
            ));
        }
    }
    if !problems.is_empty() {
        return Finding::fail(CheckKind::SignatureChainIntegrity, problems.join("; "));
    }
    Finding::pass(
        CheckKind::SignatureChainIntegrity,
        "every signature verifies against its issuer's key".into(),
    )
}

/// The path must end at a certificate in the trust store. Guaranteed by
/// path construction, but re-checked so a report never claims anchoring
/// that the store cannot confirm.
fn check_trust_anchor(path: &CertificationPath, trust_store: &TrustStore) -> Finding {
    let anchor = path.anchor();
    if trust_store.contains(anchor) {
        Finding::pass(
            CheckKind::TrustAnchor,
            format!("anchored at trusted root \"{}\"", anchor.subject),
        )
    } else {
        Finding::fail(
            CheckKind::TrustAnchor,
            format!("\"{}\" is not in the trust store", anchor.subject),
        )
    }
}

/// RSA keys below 2048 bits and curves outside P-256/P-384 fail. A key the
/// engine cannot size at all also fails (fail-closed).
fn check_key_strength(path: &CertificationPath) -> Finding {
    let mut problems = Vec::new();
    for (i, cert) in path.iter().enumerate() {
        match &cert.public_key {
            PublicKey::Rsa { .. } => {
                let bits = cert.public_key.bits().unwrap_or(0);
                if bits < MIN_RSA_BITS {
                    problems.push(format!(
                        "certificate at depth {} (\"{}\") has a {}-bit RSA key (minimum {})",
                        i, cert.subject, bits, MIN_RSA_BITS
                    ));
                }
            }
            PublicKey::Ec { curve, .. } => {
                if let EcCurve::Other(oid) = curve {
                    problems.push(format!(
                        "certificate at depth {} (\"{}\") uses unsupported curve {}",
                        i, cert.subject, oid
                    ));
                }
            }
            PublicKey::Other { oid } => {
                problems.push(format!(
                    "certificate at depth {} (\"{}\") uses unsupported key algorithm {}",
                    i, cert.subject, oid
                ));
            }
        }
    }
    if !problems.is_empty() {
        return Finding::fail(CheckKind::KeyStrength, problems.join("; "));
    }
    Finding::pass(
        CheckKind::KeyStrength,
        "all keys meet the strength floor".into(),
    )
}

/// Match the expected hostname against the leaf's SAN DNS entries, falling
/// back to the subject CN (legacy, warning-level) only when the leaf has no
/// SAN DNS entries at all.
fn check_name_matching(leaf: &Certificate, expected_hostname: Option<&str>) -> Finding {
    let Some(hostname) = expected_hostname else {
        return Finding::pass(
            CheckKind::NameMatching,
            "no hostname to match".into(),
        );
    };

    let dns_names: Vec<String> = leaf
        .san_dns_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let (matched, used_cn_fallback) =
        util::hostname_match_with_fallback(&dns_names, leaf.common_name(), hostname);

    if matched && used_cn_fallback {
        return Finding::warning(
            CheckKind::NameMatching,
            format!(
                "hostname \"{}\" matched the subject CN; certificate has no subjectAltName DNS entries",
                hostname
            ),
        );
    }
    if matched {
        return Finding::pass(
            CheckKind::NameMatching,
            format!("hostname \"{}\" matches the certificate", hostname),
        );
    }

    let mut names = dns_names;
    if names.is_empty() {
        if let Some(cn) = leaf.common_name() {
            names.push(cn.to_string());
        }
    }
    Finding::fail(
        CheckKind::NameMatching,
        format!(
            "hostname \"{}\" does not match certificate names [{}]",
            hostname,
            names.join(", ")
        ),
    )
}

/// The leaf must assert `digitalSignature` and, when an EKU is present, be
/// usable for server authentication. Absent extensions leave the key
/// unrestricted and pass.
fn check_key_usage(leaf: &Certificate) -> Finding {
    let mut problems = Vec::new();

    if let Some(ku) = &leaf.extensions.key_usage {
        if !ku.digital_signature {
            problems.push("Key Usage does not assert digitalSignature".to_string());
        }
    }
    if let Some(eku) = &leaf.extensions.extended_key_usage {
        if !eku.server_auth && !eku.any {
            problems.push("Extended Key Usage does not permit serverAuth".to_string());
        }
    }

    if !problems.is_empty() {
        return Finding::fail(CheckKind::KeyUsage, problems.join("; "));
    }
    Finding::pass(
        CheckKind::KeyUsage,
        "key usage permits server authentication".into(),
    )
}

/// Query the revocation source for every non-root certificate. A positive
/// revocation fails; unknown status and lookup timeouts degrade to a
/// warning, never a failure.
fn check_revocation(
    path: &CertificationPath,
    now: i64,
    revocation: &dyn RevocationCheck,
) -> Finding {
    let mut failures = Vec::new();
    let mut warnings = Vec::new();

    for i in 0..path.len().saturating_sub(1) {
        let cert = &path[i];
        let issuer = path.issuer_of(i);
        match revocation.check(cert, issuer, now) {
            Ok(RevocationStatus::Good) => {}
            Ok(RevocationStatus::Revoked { reason }) => {
                failures.push(format!(
                    "certificate at depth {} ({}) is revoked (reason: {})",
                    i,
                    cert.short_name(),
                    reason
                ));
            }
            Ok(RevocationStatus::Unknown { reason }) => {
                warnings.push(format!(
                    "revocation status of {} is unknown: {}",
                    cert.short_name(),
                    reason
                ));
            }
            Err(RevocationError::Timeout) => {
                warnings.push(format!(
                    "revocation lookup for {} timed out",
                    cert.short_name()
                ));
            }
            Err(RevocationError::Unavailable(detail)) => {
                warnings.push(format!(
                    "revocation source unavailable for {}: {}",
                    cert.short_name(),
                    detail
                ));
            }
        }
    }

    if !failures.is_empty() {
        return Finding::fail(CheckKind::Revocation, failures.join("; "));
    }
    if !warnings.is_empty() {
        return Finding::warning(CheckKind::Revocation, warnings.join("; "));
    }
    Finding::pass(
        CheckKind::Revocation,
        "no certificate on the path is revoked".into(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::{ExtendedKeyUsage, KeyUsage};
    use crate::chain::build_path;
    use crate::decode::{decode, FormatHint};
    use crate::report::Status;
    use crate::revocation::NoRevocationCheck;

    fn load(name: &str) -> Certificate {
        let path = format!("{}/../testdata/{}", env!("CARGO_MANIFEST_DIR"), name);
        let data = std::fs::read(path).unwrap();
        decode(&data, FormatHint::Pem).unwrap()
    }

    fn full_path() -> (CertificationPath, TrustStore) {
        let leaf = load("leaf.pem");
        let intermediates = vec![load("intermediate.pem")];
        let mut store = TrustStore::new();
        store.add(load("root.pem"));
        let path = build_path(&leaf, &intermediates, &store).unwrap();
        (path, store)
    }

    const MID_2024: i64 = 1717200000; // 2024-06-01T00:00:00Z
    const EXPIRY_SOON: i64 = 1741996800; // 2025-03-15T00:00:00Z, leaf expires 2025-04-01
    const AFTER_EXPIRY: i64 = 1798761600; // 2027-01-01T00:00:00Z

    #[test]
    fn finding_order_is_fixed() {
        let (path, store) = full_path();
        let report = evaluate(&path, MID_2024, None, &store, &NoRevocationCheck);
        let names: Vec<&str> = report.findings.iter().map(|f| f.kind.name()).collect();
        assert_eq!(
            names,
            vec![
                "Time Validity",
                "Signature Chain Integrity",
                "Trust Anchor",
                "Key Strength",
                "Name Matching",
                "Key Usage",
                "Revocation"
            ]
        );
    }

    #[test]
    fn expiring_leaf_warns_with_remaining_days() {
        let (path, _) = full_path();
        let finding = check_time_validity(&path, EXPIRY_SOON);
        assert_eq!(finding.status, Status::Warning);
        assert_eq!(finding.detail, "Certificate expires in 17 days");
    }

    #[test]
    fn expiry_warning_window_is_inclusive() {
        let (path, _) = full_path();
        // Leaf expires 2025-04-01T00:00:00Z; exactly 30 days out.
        let thirty_days_before = 1743465600 - 30 * 86_400;
        let finding = check_time_validity(&path, thirty_days_before);
        assert_eq!(finding.status, Status::Warning);
        assert_eq!(finding.detail, "Certificate expires in 30 days");

        let finding = check_time_validity(&path, thirty_days_before - 86_400);
        assert_eq!(finding.status, Status::Pass);
    }

    #[test]
    fn expired_leaf_fails_time_validity() {
        let (path, _) = full_path();
        let finding = check_time_validity(&path, AFTER_EXPIRY);
        assert_eq!(finding.status, Status::Fail);
        assert!(finding.detail.contains("expired"));
    }

    #[test]
    fn tampered_signature_fails_chain_integrity() {
        let (path, store) = full_path();
        let mut leaf = path.leaf().clone();
        let last = leaf.signature.len() - 1;
        leaf.signature[last] ^= 0x01;
        let tampered = build_path(&leaf, &[load("intermediate.pem")], &store).unwrap();
        let finding = check_signature_chain(&tampered);
        assert_eq!(finding.status, Status::Fail);
    }

    #[test]
    fn cross_signed_anchor_is_not_verified_against_itself() {
        // Trusting the intermediate directly makes it the anchor, but it is
        // signed by the root, not by itself. Its signature must be skipped
        // rather than checked against its own key.
        let leaf = load("leaf.pem");
        let mut store = TrustStore::new();
        store.add(load("intermediate.pem"));
        let path = build_path(&leaf, &[], &store).unwrap();
        assert_eq!(path.len(), 2);
        assert!(!path.anchor().is_self_signed());
        let finding = check_signature_chain(&path);
        assert_eq!(finding.status, Status::Pass);
    }

    #[test]
    fn weak_rsa_key_fails_key_strength() {
        let weak = load("weak-rsa.pem");
        let mut store = TrustStore::new();
        store.add(weak.clone());
        let path = build_path(&weak, &[], &store).unwrap();
        let finding = check_key_strength(&path);
        assert_eq!(finding.status, Status::Fail);
        assert!(finding.detail.contains("1024-bit"));
    }

    #[test]
    fn hostname_matching_against_leaf_san() {
        let leaf = load("leaf.pem");
        assert_eq!(
            check_name_matching(&leaf, Some("www.example.com")).status,
            Status::Pass
        );
        assert_eq!(
            check_name_matching(&leaf, Some("a.b.example.com")).status,
            Status::Fail
        );
        assert_eq!(check_name_matching(&leaf, None).status, Status::Pass);
    }

    #[test]
    fn missing_key_usage_is_unrestricted() {
        let mut leaf = load("leaf.pem");
        leaf.extensions.key_usage = None;
        leaf.extensions.extended_key_usage = None;
        assert_eq!(check_key_usage(&leaf).status, Status::Pass);
    }

    #[test]
    fn key_usage_without_digital_signature_fails() {
        let mut leaf = load("leaf.pem");
        leaf.extensions.key_usage = Some(KeyUsage {
            key_encipherment: true,
            ..KeyUsage::default()
        });
        assert_eq!(check_key_usage(&leaf).status, Status::Fail);
    }

    #[test]
    fn eku_without_server_auth_fails() {
        let mut leaf = load("leaf.pem");
        leaf.extensions.extended_key_usage = Some(ExtendedKeyUsage {
            client_auth: true,
            ..ExtendedKeyUsage::default()
        });
        assert_eq!(check_key_usage(&leaf).status, Status::Fail);
    }

    struct TimingOut;
    impl RevocationCheck for TimingOut {
        fn check(
            &self,
            _cert: &Certificate,
            _issuer: &Certificate,
            _now: i64,
        ) -> Result<RevocationStatus, RevocationError> {
            Err(RevocationError::Timeout)
        }
    }

    #[test]
    fn revocation_timeout_warns_but_does_not_invalidate() {
        let (path, store) = full_path();
        let report = evaluate(&path, MID_2024, Some("example.com"), &store, &TimingOut);
        assert!(report.valid);
        assert!(report.warnings.iter().any(|w| w.contains("timed out")));
    }

    #[test]
    fn unknown_revocation_status_warns() {
        let (path, _) = full_path();
        let finding = check_revocation(&path, MID_2024, &NoRevocationCheck);
        assert_eq!(finding.status, Status::Warning);
    }
}
