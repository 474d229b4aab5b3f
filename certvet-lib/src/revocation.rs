//! Revocation checking.
//!
//! Revocation is injected behind the [`RevocationCheck`] trait so the rule
//! engine never blocks on or hard-depends on a network source. A lookup that
//! cannot produce an answer (no source configured, CRL unavailable, timed
//! out) yields [`RevocationStatus::Unknown`], which the rule engine degrades
//! to a warning. Only a positive revocation entry fails the validation.

use crate::cert::Certificate;
use crate::verify::verify_signature;
use crate::{DecodeError, RevocationError};
use x509_parser::prelude::*;

/// Outcome of a revocation lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevocationStatus {
    /// A current, authentic source covers this certificate and does not
    /// list it.
    Good,
    /// The certificate is listed as revoked.
    Revoked {
        /// RFC 5280 reason code, spelled as in Section 5.3.1.
        reason: String,
    },
    /// No authoritative answer is available.
    Unknown {
        /// Why no answer was available, for the report's warning text.
        reason: String,
    },
}

/// A source of revocation answers.
///
/// Implementations must be safe to call from multiple validations at once;
/// the engine treats them as read-only.
pub trait RevocationCheck: Sync {
    /// Look up the revocation status of `cert`, issued by `issuer`, as of
    /// Unix time `now`.
    fn check(
        &self,
        cert: &Certificate,
        issuer: &Certificate,
        now: i64,
    ) -> Result<RevocationStatus, RevocationError>;
}

/// The no-op checker: always answers unknown.
#[derive(Debug, Default)]
pub struct NoRevocationCheck;

impl RevocationCheck for NoRevocationCheck {
    fn check(
        &self,
        _cert: &Certificate,
        _issuer: &Certificate,
        _now: i64,
    ) -> Result<RevocationStatus, RevocationError> {
        Ok(RevocationStatus::Unknown {
            reason: "no revocation source configured".into(),
        })
    }
}

/// Checks certificates against a set of locally supplied CRLs.
///
/// A CRL only counts as an answer when its issuer name matches the
/// certificate's issuer, its validity window covers `now`, and its
/// signature verifies against the issuer's public key. CRLs failing any of
/// those are skipped, so a stale or forged CRL degrades to unknown rather
/// than vouching for anything.
#[derive(Debug, Default)]
pub struct CrlRevocationChecker {
    crl_ders: Vec<Vec<u8>>,
}

impl CrlRevocationChecker {
    pub fn new() -> Self {
        CrlRevocationChecker { crl_ders: Vec::new() }
    }

    /// Add a DER-encoded CRL.
    pub fn add_der(&mut self, der: Vec<u8>) {
        self.crl_ders.push(der);
    }

    /// Add all CRLs from a PEM input (`X509 CRL` blocks).
    pub fn add_pem(&mut self, input: &[u8]) -> Result<usize, DecodeError> {
        let mut added = 0;
        for pem_result in Pem::iter_from_buffer(input) {
            let pem =
                pem_result.map_err(|e| DecodeError::MalformedPem(format!("CRL PEM: {}", e)))?;
            if pem.label == "X509 CRL" {
                self.crl_ders.push(pem.contents);
                added += 1;
            }
        }
        if added == 0 {
            return Err(DecodeError::MalformedPem("no CRLs found in PEM input".into()));
        }
        Ok(added)
    }

    /// Load CRLs from a PEM file.
    pub fn from_pem_file(path: &std::path::Path) -> Result<Self, DecodeError> {
        let data = std::fs::read(path)?;
        let mut checker = CrlRevocationChecker::new();
        checker.add_pem(&data)?;
        Ok(checker)
    }

    pub fn len(&self) -> usize {
        self.crl_ders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crl_ders.is_empty()
    }
}

impl RevocationCheck for CrlRevocationChecker {
    fn check(
        &self,
        cert: &Certificate,
        issuer: &Certificate,
        now: i64,
    ) -> Result<RevocationStatus, RevocationError> {
        let mut skipped: Option<String> = None;

        for crl_der in &self.crl_ders {
            let (_, crl) = match CertificateRevocationList::from_der(crl_der) {
                Ok(parsed) => parsed,
                Err(_) => {
                    skipped.get_or_insert_with(|| "CRL failed to parse".into());
                    continue;
                }
            };

            if crl.tbs_cert_list.issuer.as_raw() != cert.raw_issuer.as_slice() {
                continue;
            }

            // RFC 5280 Section 6.3.3: the CRL must be current.
            if now < crl.last_update().timestamp() {
                skipped.get_or_insert_with(|| "CRL is not yet valid".into());
                continue;
            }
            if let Some(next_update) = crl.next_update() {
                if now > next_update.timestamp() {
                    skipped.get_or_insert_with(|| "CRL has expired".into());
                    continue;
                }
            }

            // The CRL must be signed by the certificate's issuer.
            let alg = crate::cert::SignatureAlgorithm::from_oid(
                &crl.signature_algorithm.algorithm.to_id_string(),
            );
            if verify_signature(
                crl.tbs_cert_list.as_ref(),
                &alg,
                &crl.signature_value.data,
                &issuer.public_key,
            )
            .is_err()
            {
                skipped.get_or_insert_with(|| "CRL signature did not verify".into());
                continue;
            }

            for revoked in crl.iter_revoked_certificates() {
                if revoked.raw_serial() == cert.serial.as_slice() {
                    let reason = revoked
                        .reason_code()
                        .map(|(_, rc)| format_reason(&rc))
                        .unwrap_or("unspecified");
                    return Ok(RevocationStatus::Revoked {
                        reason: reason.to_string(),
                    });
                }
            }
            return Ok(RevocationStatus::Good);
        }

        Ok(RevocationStatus::Unknown {
            reason: skipped.unwrap_or_else(|| {
                format!(
                    "no applicable CRL for issuer \"{}\"",
                    cert.issuer
                )
            }),
        })
    }
}

/// RFC 5280 Section 5.3.1 reason code names.
fn format_reason(rc: &x509_parser::x509::ReasonCode) -> &'static str {
    match rc.0 {
        0 => "unspecified",
        1 => "keyCompromise",
        2 => "cACompromise",
        3 => "affiliationChanged",
        4 => "superseded",
        5 => "cessationOfOperation",
        6 => "certificateHold",
        // 7 is unused
        8 => "removeFromCRL",
        9 => "privilegeWithdrawn",
        10 => "aACompromise",
        _ => "unspecified",
    }
}
