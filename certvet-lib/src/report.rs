//! The validation report.
//!
//! [`Report`] is the engine's only output: an immutable verdict plus the
//! per-check findings that produced it. The serialized shape (field names,
//! check names, status spellings) is a stable external contract; changing
//! any of them breaks downstream consumers.

use crate::cert::Certificate;
use crate::rules::CheckKind;
use crate::ChainError;
use serde::Serialize;

/// Outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pass,
    Fail,
    Warning,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Pass => "pass",
            Status::Fail => "fail",
            Status::Warning => "warning",
        };
        write!(f, "{}", s)
    }
}

/// One check's result, with the detail message that explains it.
#[derive(Debug, Clone)]
pub struct Finding {
    pub kind: CheckKind,
    pub status: Status,
    pub detail: String,
}

impl Finding {
    pub fn pass(kind: CheckKind, detail: String) -> Self {
        Finding {
            kind,
            status: Status::Pass,
            detail,
        }
    }

    pub fn fail(kind: CheckKind, detail: String) -> Self {
        Finding {
            kind,
            status: Status::Fail,
            detail,
        }
    }

    pub fn warning(kind: CheckKind, detail: String) -> Self {
        Finding {
            kind,
            status: Status::Warning,
            detail,
        }
    }
}

/// A check entry as it appears in the serialized report: name and status
/// only, details live in `issues`/`warnings`.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub status: Status,
}

/// The complete validation verdict for one certificate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// True iff no check failed.
    pub valid: bool,
    pub subject: String,
    pub issuer: String,
    pub valid_from: String,
    pub valid_until: String,
    pub serial_number: String,
    pub signature_algorithm: String,
    pub checks: Vec<CheckResult>,
    /// Detail messages of failed checks, in check order.
    pub issues: Vec<String>,
    /// Detail messages of warning checks, plus decoder warnings.
    pub warnings: Vec<String>,
    /// The findings behind `checks`, with details. Not part of the
    /// serialized contract.
    #[serde(skip)]
    pub findings: Vec<Finding>,
    /// SHA-256 fingerprint of the leaf's DER, for the text rendering. Not
    /// part of the serialized contract.
    #[serde(skip)]
    pub fingerprint_sha256: String,
    /// Leaf key summary ("RSA (2048 bits)"), for the text rendering. Not
    /// part of the serialized contract.
    #[serde(skip)]
    pub key_algorithm: String,
}

fn key_summary(leaf: &Certificate) -> String {
    match leaf.public_key.bits() {
        Some(bits) => format!("{} ({} bits)", leaf.public_key.algorithm_name(), bits),
        None => leaf.public_key.algorithm_name().to_string(),
    }
}

impl Report {
    /// Assemble a report from the leaf's summary fields and the rule
    /// engine's findings.
    pub fn new(leaf: &Certificate, findings: Vec<Finding>) -> Self {
        let checks = findings
            .iter()
            .map(|f| CheckResult {
                name: f.kind.name().to_string(),
                status: f.status,
            })
            .collect();
        let issues = findings
            .iter()
            .filter(|f| f.status == Status::Fail)
            .map(|f| f.detail.clone())
            .collect();
        let mut warnings: Vec<String> = findings
            .iter()
            .filter(|f| f.status == Status::Warning)
            .map(|f| f.detail.clone())
            .collect();
        warnings.extend(leaf.decode_warnings.iter().cloned());

        Report {
            valid: findings.iter().all(|f| f.status != Status::Fail),
            subject: leaf.subject.to_oneline(),
            issuer: leaf.issuer.to_oneline(),
            valid_from: leaf.not_before.iso8601.clone(),
            valid_until: leaf.not_after.iso8601.clone(),
            serial_number: leaf.serial_hex(),
            signature_algorithm: leaf.signature_algorithm.name().to_string(),
            checks,
            issues,
            warnings,
            findings,
            fingerprint_sha256: leaf.fingerprint_sha256(),
            key_algorithm: key_summary(leaf),
        }
    }

    /// A report for a certificate that decoded but could not be chained to
    /// a trust anchor: invalid, no check results, one explanatory issue.
    pub fn from_chain_failure(leaf: &Certificate, error: &ChainError) -> Self {
        Report {
            valid: false,
            subject: leaf.subject.to_oneline(),
            issuer: leaf.issuer.to_oneline(),
            valid_from: leaf.not_before.iso8601.clone(),
            valid_until: leaf.not_after.iso8601.clone(),
            serial_number: leaf.serial_hex(),
            signature_algorithm: leaf.signature_algorithm.name().to_string(),
            checks: Vec::new(),
            issues: vec![error.to_string()],
            warnings: leaf.decode_warnings.clone(),
            findings: Vec::new(),
            fingerprint_sha256: leaf.fingerprint_sha256(),
            key_algorithm: key_summary(leaf),
        }
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{}",
            if self.valid { "VALID" } else { "INVALID" }
        )?;
        writeln!(f, "  Subject:    {}", self.subject)?;
        writeln!(f, "  Issuer:     {}", self.issuer)?;
        writeln!(f, "  Valid from: {}", self.valid_from)?;
        writeln!(f, "  Valid to:   {}", self.valid_until)?;
        writeln!(f, "  Serial:     {}", self.serial_number)?;
        writeln!(f, "  Algorithm:  {}", self.signature_algorithm)?;
        writeln!(f, "  Key:        {}", self.key_algorithm)?;
        writeln!(f, "  SHA-256:    {}", self.fingerprint_sha256)?;
        if !self.checks.is_empty() {
            writeln!(f, "  Checks:")?;
            for check in &self.checks {
                writeln!(f, "    [{}] {}", check.status, check.name)?;
            }
        }
        for issue in &self.issues {
            writeln!(f, "  Issue: {}", issue)?;
        }
        for warning in &self.warnings {
            writeln!(f, "  Warning: {}", warning)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{decode, FormatHint};

    fn load(name: &str) -> Certificate {
        let path = format!("{}/../testdata/{}", env!("CARGO_MANIFEST_DIR"), name);
        let data = std::fs::read(path).unwrap();
        decode(&data, FormatHint::Pem).unwrap()
    }

    #[test]
    fn verdict_is_and_of_non_failing_checks() {
        let leaf = load("leaf.pem");
        let report = Report::new(
            &leaf,
            vec![
                Finding::pass(CheckKind::TimeValidity, "ok".into()),
                Finding::warning(CheckKind::Revocation, "unknown".into()),
            ],
        );
        assert!(report.valid);
        assert_eq!(report.warnings, vec!["unknown".to_string()]);

        let report = Report::new(
            &leaf,
            vec![Finding::fail(CheckKind::TrustAnchor, "untrusted".into())],
        );
        assert!(!report.valid);
        assert_eq!(report.issues, vec!["untrusted".to_string()]);
    }

    #[test]
    fn json_uses_stable_field_names_and_spellings() {
        let leaf = load("leaf.pem");
        let report = Report::new(
            &leaf,
            vec![Finding::warning(CheckKind::TimeValidity, "soon".into())],
        );
        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["valid"], true);
        assert!(value["validFrom"].is_string());
        assert!(value["validUntil"].is_string());
        assert!(value["serialNumber"].is_string());
        assert!(value["signatureAlgorithm"].is_string());
        assert_eq!(value["checks"][0]["name"], "Time Validity");
        assert_eq!(value["checks"][0]["status"], "warning");
    }

    #[test]
    fn text_rendering_includes_the_key_summary() {
        let leaf = load("leaf.pem");
        let report = Report::new(&leaf, Vec::new());
        assert_eq!(report.key_algorithm, "RSA (2048 bits)");
        assert!(report.to_string().contains("Key:        RSA (2048 bits)"));
    }

    #[test]
    fn chain_failure_report_has_no_checks() {
        let leaf = load("leaf.pem");
        let err = ChainError::NoPathToTrustAnchor("no issuer".into());
        let report = Report::from_chain_failure(&leaf, &err);
        assert!(!report.valid);
        assert!(report.checks.is_empty());
        assert_eq!(report.issues.len(), 1);
    }
}
