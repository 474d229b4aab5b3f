//! Certificate data model.
//!
//! [`Certificate`] is an immutable value produced by the decoder. It keeps
//! the exact to-be-signed byte range (`raw_tbs`) alongside the parsed
//! fields: signature verification always runs over the original bytes,
//! never over a re-encoding.

use crate::oid;
use crate::util;
use serde::Serialize;

/// A decoded X.509 certificate. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// Certificate version (1, 2, or 3).
    pub version: u32,
    /// Serial number, big-endian bytes as encoded.
    pub serial: Vec<u8>,
    /// Subject distinguished name.
    pub subject: DistinguishedName,
    /// Issuer distinguished name.
    pub issuer: DistinguishedName,
    /// Validity start.
    pub not_before: DateTime,
    /// Validity end.
    pub not_after: DateTime,
    /// Algorithm the issuer used to sign this certificate.
    pub signature_algorithm: SignatureAlgorithm,
    /// Subject public key.
    pub public_key: PublicKey,
    /// Parsed X.509v3 extensions.
    pub extensions: Extensions,
    /// Raw DER of the subject and issuer Name structures, for exact
    /// chain-linkage comparison.
    pub raw_subject: Vec<u8>,
    pub raw_issuer: Vec<u8>,
    /// The exact TBSCertificate byte range that was signed.
    pub raw_tbs: Vec<u8>,
    /// Raw signature bytes.
    pub signature: Vec<u8>,
    /// Raw DER of the entire certificate.
    pub raw_der: Vec<u8>,
    /// Non-fatal decode findings (unrecognized non-critical extensions).
    pub decode_warnings: Vec<String>,
}

impl Certificate {
    /// Whether subject and issuer name encodings are identical.
    pub fn is_self_signed(&self) -> bool {
        self.raw_subject == self.raw_issuer
    }

    /// Serial number as colon-separated uppercase hex, leading zero bytes
    /// stripped but keeping at least one byte.
    pub fn serial_hex(&self) -> String {
        let raw = &self.serial;
        let stripped = match raw.iter().position(|&b| b != 0) {
            Some(pos) => &raw[pos..],
            None => &raw[raw.len().saturating_sub(1)..],
        };
        util::hex_colon_upper(stripped)
    }

    /// SHA-256 fingerprint of the raw DER, colon-separated uppercase hex.
    pub fn fingerprint_sha256(&self) -> String {
        use digest::Digest;
        util::hex_colon_upper(&sha2::Sha256::digest(&self.raw_der))
    }

    /// DNS names from the Subject Alternative Name extension, in order.
    pub fn san_dns_names(&self) -> Vec<&str> {
        self.extensions
            .subject_alt_names
            .iter()
            .filter_map(|e| match e {
                SanEntry::Dns(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Subject Common Name, if present.
    pub fn common_name(&self) -> Option<&str> {
        self.subject
            .components
            .iter()
            .find(|(k, _)| k == "CN")
            .map(|(_, v)| v.as_str())
    }

    /// A short human-readable identifier: CN, then O, then "Unknown".
    pub fn short_name(&self) -> &str {
        self.common_name()
            .or_else(|| {
                self.subject
                    .components
                    .iter()
                    .find(|(k, _)| k == "O")
                    .map(|(_, v)| v.as_str())
            })
            .unwrap_or("Unknown")
    }
}

/// Distinguished name with ordered (attribute, value) components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistinguishedName {
    /// Ordered list of (attribute_type, value) pairs. Attribute types use
    /// short names where known (e.g., "CN", "O", "C").
    pub components: Vec<(String, String)>,
}

impl DistinguishedName {
    /// Format as a comma-separated one-line string, OpenSSL style:
    /// `C = US, O = Org, CN = example.com`.
    ///
    /// Values containing commas, equals signs, or backslashes are escaped
    /// to keep the output unambiguous.
    pub fn to_oneline(&self) -> String {
        let mut result = String::new();
        for (i, (k, v)) in self.components.iter().enumerate() {
            if i > 0 {
                result.push_str(", ");
            }
            result.push_str(k);
            result.push_str(" = ");
            for ch in v.chars() {
                match ch {
                    '\\' => result.push_str("\\\\"),
                    ',' => result.push_str("\\,"),
                    '=' => result.push_str("\\="),
                    _ => result.push(ch),
                }
            }
        }
        result
    }
}

impl std::fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_oneline())
    }
}

/// UTC timestamp with a precomputed ISO 8601 rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateTime {
    /// ISO 8601 formatted string (e.g., "2025-04-01T00:00:00Z").
    pub iso8601: String,
    /// Unix timestamp.
    pub timestamp: i64,
}

impl DateTime {
    /// Build from a Unix timestamp.
    pub fn from_unix(ts: i64) -> Self {
        let iso = match time::OffsetDateTime::from_unix_timestamp(ts) {
            Ok(dt) => format!(
                "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
                dt.year(),
                u8::from(dt.month()),
                dt.day(),
                dt.hour(),
                dt.minute(),
                dt.second()
            ),
            Err(_) => format!("{}", ts),
        };
        DateTime {
            iso8601: iso,
            timestamp: ts,
        }
    }
}

impl std::fmt::Display for DateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.iso8601)
    }
}

/// Signature algorithm of a certificate (or CRL).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    RsaSha256,
    RsaSha384,
    RsaSha512,
    EcdsaSha256,
    EcdsaSha384,
    /// Anything outside the supported set, kept as its OID string.
    Other(String),
}

impl SignatureAlgorithm {
    /// Map a dotted-decimal OID to the algorithm.
    pub fn from_oid(oid_str: &str) -> Self {
        match oid_str {
            oid::SHA256_WITH_RSA => SignatureAlgorithm::RsaSha256,
            oid::SHA384_WITH_RSA => SignatureAlgorithm::RsaSha384,
            oid::SHA512_WITH_RSA => SignatureAlgorithm::RsaSha512,
            oid::ECDSA_WITH_SHA256 => SignatureAlgorithm::EcdsaSha256,
            oid::ECDSA_WITH_SHA384 => SignatureAlgorithm::EcdsaSha384,
            other => SignatureAlgorithm::Other(other.to_string()),
        }
    }

    /// Conventional algorithm name (OpenSSL spelling).
    pub fn name(&self) -> &str {
        match self {
            SignatureAlgorithm::RsaSha256 => "sha256WithRSAEncryption",
            SignatureAlgorithm::RsaSha384 => "sha384WithRSAEncryption",
            SignatureAlgorithm::RsaSha512 => "sha512WithRSAEncryption",
            SignatureAlgorithm::EcdsaSha256 => "ecdsa-with-SHA256",
            SignatureAlgorithm::EcdsaSha384 => "ecdsa-with-SHA384",
            SignatureAlgorithm::Other(oid) => oid,
        }
    }

    /// Whether this algorithm expects an RSA issuer key.
    pub fn is_rsa(&self) -> bool {
        matches!(
            self,
            SignatureAlgorithm::RsaSha256
                | SignatureAlgorithm::RsaSha384
                | SignatureAlgorithm::RsaSha512
        )
    }

    /// Whether this algorithm expects an EC issuer key.
    pub fn is_ecdsa(&self) -> bool {
        matches!(
            self,
            SignatureAlgorithm::EcdsaSha256 | SignatureAlgorithm::EcdsaSha384
        )
    }
}

impl std::fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Named elliptic curve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcCurve {
    P256,
    P384,
    Other(String),
}

impl EcCurve {
    pub fn from_oid(oid_str: &str) -> Self {
        match oid_str {
            oid::CURVE_P256 => EcCurve::P256,
            oid::CURVE_P384 => EcCurve::P384,
            other => EcCurve::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            EcCurve::P256 => "P-256",
            EcCurve::P384 => "P-384",
            EcCurve::Other(oid) => oid,
        }
    }
}

/// Subject public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    Rsa {
        /// Modulus, big-endian (may carry a leading zero byte from the DER
        /// positive-integer encoding).
        modulus: Vec<u8>,
        /// Public exponent, big-endian.
        exponent: Vec<u8>,
    },
    Ec {
        curve: EcCurve,
        /// SEC1-encoded point.
        point: Vec<u8>,
    },
    /// An algorithm the engine does not model, kept as its OID string.
    Other { oid: String },
}

impl PublicKey {
    /// Key size in bits: RSA modulus bits, or the curve's field size.
    pub fn bits(&self) -> Option<u32> {
        match self {
            PublicKey::Rsa { modulus, .. } => {
                let significant = match modulus.iter().position(|&b| b != 0) {
                    Some(pos) => &modulus[pos..],
                    None => return Some(0),
                };
                let leading = significant[0].leading_zeros();
                Some(significant.len() as u32 * 8 - leading)
            }
            PublicKey::Ec { curve, .. } => match curve {
                EcCurve::P256 => Some(256),
                EcCurve::P384 => Some(384),
                EcCurve::Other(_) => None,
            },
            PublicKey::Other { .. } => None,
        }
    }

    /// Algorithm family name for display.
    pub fn algorithm_name(&self) -> &str {
        match self {
            PublicKey::Rsa { .. } => "RSA",
            PublicKey::Ec { .. } => "EC",
            PublicKey::Other { oid } => oid,
        }
    }
}

/// Key Usage extension bits (RFC 5280 Section 4.2.1.3).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyUsage {
    pub digital_signature: bool,
    pub non_repudiation: bool,
    pub key_encipherment: bool,
    pub data_encipherment: bool,
    pub key_agreement: bool,
    pub key_cert_sign: bool,
    pub crl_sign: bool,
}

/// Extended Key Usage extension (RFC 5280 Section 4.2.1.12).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedKeyUsage {
    pub any: bool,
    pub server_auth: bool,
    pub client_auth: bool,
    pub code_signing: bool,
    pub email_protection: bool,
    pub time_stamping: bool,
    pub ocsp_signing: bool,
    /// OIDs outside the named set.
    pub other: Vec<String>,
}

/// Basic Constraints extension (RFC 5280 Section 4.2.1.9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicConstraints {
    pub is_ca: bool,
    pub path_len_constraint: Option<u32>,
}

/// Subject Alternative Name entry. Order within the extension is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum SanEntry {
    Dns(String),
    Email(String),
    Ip(String),
    Uri(String),
    Other(String),
}

/// Authority Information Access entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AiaEntry {
    /// Access method: "OCSP" or "CA Issuers".
    pub method: String,
    /// Access location (usually a URI).
    pub location: String,
}

/// The extension set the engine models.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extensions {
    pub key_usage: Option<KeyUsage>,
    pub extended_key_usage: Option<ExtendedKeyUsage>,
    /// Present-but-empty SAN is distinguished from absent SAN by
    /// `san_present`.
    pub subject_alt_names: Vec<SanEntry>,
    pub san_present: bool,
    pub basic_constraints: Option<BasicConstraints>,
    pub subject_key_id: Option<Vec<u8>>,
    pub authority_key_id: Option<Vec<u8>>,
    pub crl_distribution_points: Vec<String>,
    pub authority_info_access: Vec<AiaEntry>,
}
