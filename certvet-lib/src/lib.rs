//! certvet-lib: X.509 certificate validation engine.
//!
//! Takes an untrusted PEM- or DER-encoded certificate, an optional set of
//! intermediate certificates, and a trust store, and produces a structured
//! [`Report`] describing every check that passed, failed, or warned.
//!
//! The pipeline is a pure function chain: raw bytes flow through the
//! [`decode`] module into an immutable [`Certificate`], the [`chain`] module
//! builds a [`CertificationPath`] against a [`TrustStore`], and the [`rules`]
//! module evaluates the path (consulting [`verify`] for signatures and an
//! injected [`RevocationCheck`] for revocation) into a [`Report`]. No stage
//! mutates shared state, so independent validations may run concurrently.

pub mod cert;
pub mod chain;
pub mod decode;
pub mod oid;
pub mod report;
pub mod revocation;
pub mod rules;
pub mod trust;
pub mod util;
pub mod verify;

pub use cert::{
    AiaEntry, BasicConstraints, Certificate, DateTime, DistinguishedName, EcCurve,
    ExtendedKeyUsage, Extensions, KeyUsage, PublicKey, SanEntry, SignatureAlgorithm,
};
pub use chain::{build_path, CertificationPath, MAX_PATH_LEN};
pub use decode::{decode, decode_pem_bundle, FormatHint};
pub use report::{CheckResult, Finding, Report, Status};
pub use revocation::{
    CrlRevocationChecker, NoRevocationCheck, RevocationCheck, RevocationStatus,
};
pub use rules::{evaluate, CheckKind};
pub use trust::{find_system_ca_bundle, TrustStore};
pub use verify::verify_signature;

/// Errors from certificate decoding (malformed input — always reported to
/// the caller, never recovered).
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// PEM markers missing, wrong label, or invalid base64.
    #[error("malformed PEM: {0}")]
    MalformedPem(String),

    /// A declared DER length exceeds the available bytes.
    #[error("truncated DER input")]
    Truncated,

    /// The encoding violates DER canonical form. Non-canonical DER is
    /// rejected outright: it is itself a tampering signal.
    #[error("invalid DER encoding: {0}")]
    InvalidEncoding(String),

    /// A field whose encoding the engine does not recognize and cannot
    /// safely ignore (e.g. an unrecognized critical extension).
    #[error("unsupported field: {0}")]
    UnsupportedField(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from cryptographic signature verification. These are never
/// silently ignored; the rule engine surfaces each one as a Finding.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// The issuer's key type does not match the signature algorithm.
    #[error("key type does not match signature algorithm {algorithm}")]
    AlgorithmMismatch { algorithm: String },

    /// The signature does not verify against the issuer's public key.
    #[error("signature verification failed")]
    SignatureInvalid,

    /// The signature algorithm is outside the supported set. Fail-closed:
    /// an unsupported algorithm is never treated as a pass.
    #[error("unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The issuer's public key could not be used (bad modulus, bad point
    /// encoding, out-of-range size).
    #[error("invalid public key: {0}")]
    InvalidKey(String),
}

/// Errors from certification path construction.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// No sequence of issuers reaches a certificate in the trust store.
    #[error("no path to a trust anchor: {0}")]
    NoPathToTrustAnchor(String),

    /// The candidate path exceeded the depth bound of [`MAX_PATH_LEN`].
    #[error("certification path exceeds maximum length of {max}")]
    PathTooLong { max: usize },

    /// A non-leaf certificate is not a CA, or a pathLenConstraint is
    /// violated by the chain below it.
    #[error("basic constraints violation: {0}")]
    BasicConstraintsViolation(String),
}

/// Errors from a revocation lookup. A timeout is recovered locally by the
/// rule engine, degrading the status to unknown (warning) rather than
/// failing the validation.
#[derive(Debug, thiserror::Error)]
pub enum RevocationError {
    #[error("revocation lookup timed out")]
    Timeout,

    #[error("revocation source unavailable: {0}")]
    Unavailable(String),
}

/// Validate a certificate end to end: decode, build a path, evaluate rules.
///
/// Intermediates are DER-encoded; entries that fail to decode are skipped
/// (they can only remove candidate paths, never forge one). A decode failure
/// of the subject certificate itself is returned to the caller. A chain
/// failure is not an error at this level: it is surfaced as an invalid
/// [`Report`] with an explanatory issue, so callers always get a verdict for
/// input that was at least well-formed.
#[allow(clippy::too_many_arguments)]
pub fn validate(
    input: &[u8],
    hint: FormatHint,
    intermediates_der: &[Vec<u8>],
    trust_store: &TrustStore,
    now: i64,
    expected_hostname: Option<&str>,
    revocation: &dyn RevocationCheck,
) -> Result<Report, DecodeError> {
    let leaf = decode(input, hint)?;

    let intermediates: Vec<Certificate> = intermediates_der
        .iter()
        .filter_map(|der| decode(der, FormatHint::Der).ok())
        .collect();

    match build_path(&leaf, &intermediates, trust_store) {
        Ok(path) => Ok(evaluate(&path, now, expected_hostname, trust_store, revocation)),
        Err(e) => Ok(Report::from_chain_failure(&leaf, &e)),
    }
}
