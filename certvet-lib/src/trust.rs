//! Trust store: the set of trusted root certificates.
//!
//! Loaded once (PEM bundle, directory, or the system store discovered via
//! `openssl-probe` and the `SSL_CERT_FILE`/`SSL_CERT_DIR` environment
//! variables), then read-only for the lifetime of validations. All query
//! methods take `&self`, so concurrent validations can share one store.

use crate::cert::Certificate;
use crate::decode::{decode_der, decode_pem_bundle};
use crate::DecodeError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Well-known CA bundle file paths, in order of preference.
const KNOWN_CA_BUNDLE_PATHS: &[&str] = &[
    "/etc/ssl/certs/ca-certificates.crt", // Debian/Ubuntu
    "/etc/pki/tls/certs/ca-bundle.crt",   // RHEL/CentOS/Fedora
    "/etc/ssl/ca-bundle.pem",             // openSUSE
    "/etc/ssl/cert.pem",                  // macOS, Alpine
];

/// Well-known CA certificate directory paths.
const KNOWN_CA_DIR_PATHS: &[&str] = &["/etc/ssl/certs"];

/// Check if a file looks like a PEM certificate file.
///
/// Matches `.pem`, `.crt`, `.cer` extensions and OpenSSL hash-linked files
/// (`XXXXXXXX.N` where the extension is a single digit).
fn is_pem_cert_file(path: &Path) -> bool {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(e) => e,
        None => return false,
    };
    matches!(ext, "pem" | "crt" | "cer")
        || (ext.len() == 1 && ext.bytes().next().is_some_and(|b| b.is_ascii_digit()))
}

/// A set of trusted root certificates, keyed by subject name for issuer
/// lookup and by subject key identifier for the chain-building tie-break.
pub struct TrustStore {
    /// Map from raw DER-encoded subject name to trusted certificates.
    certs_by_subject: HashMap<Vec<u8>, Vec<Certificate>>,
    count: usize,
}

impl std::fmt::Debug for TrustStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrustStore")
            .field("count", &self.count)
            .finish()
    }
}

impl TrustStore {
    /// Create an empty trust store.
    pub fn new() -> Self {
        TrustStore {
            certs_by_subject: HashMap::new(),
            count: 0,
        }
    }

    /// Load the system trust store.
    ///
    /// Searches the same locations OpenSSL does:
    /// 1. `SSL_CERT_FILE` environment variable
    /// 2. Path discovered by `openssl-probe`
    /// 3. Well-known bundle file paths
    /// 4. `SSL_CERT_DIR` environment variable
    /// 5. Directory discovered by `openssl-probe`
    /// 6. Well-known certificate directories
    pub fn system() -> Result<Self, DecodeError> {
        let mut store = TrustStore::new();

        if let Some(bundle_path) = find_system_ca_bundle() {
            if let Ok(data) = std::fs::read(&bundle_path) {
                let added = store.add_pem_bundle(&data)?;
                if added > 0 {
                    return Ok(store);
                }
            }
        }

        let probe = openssl_probe::probe();
        let dir_candidates = std::env::var("SSL_CERT_DIR")
            .ok()
            .into_iter()
            .chain(
                probe
                    .cert_dir
                    .iter()
                    .map(|p| p.to_string_lossy().into_owned()),
            )
            .chain(KNOWN_CA_DIR_PATHS.iter().map(|s| (*s).to_string()));

        for dir in dir_candidates {
            if let Ok(added) = store.add_pem_directory(Path::new(&dir)) {
                if added > 0 {
                    return Ok(store);
                }
            }
        }

        if store.is_empty() {
            return Err(DecodeError::MalformedPem(
                "no system trust store found".into(),
            ));
        }
        Ok(store)
    }

    /// Create a trust store from a PEM bundle.
    pub fn from_pem(pem_data: &[u8]) -> Result<Self, DecodeError> {
        let mut store = TrustStore::new();
        store.add_pem_bundle(pem_data)?;
        Ok(store)
    }

    /// Create a trust store from a PEM file path.
    pub fn from_pem_file(path: &Path) -> Result<Self, DecodeError> {
        let data = std::fs::read(path).map_err(|e| {
            DecodeError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;
        Self::from_pem(&data)
    }

    /// Add a decoded certificate as a trust anchor.
    pub fn add(&mut self, cert: Certificate) {
        self.certs_by_subject
            .entry(cert.raw_subject.clone())
            .or_default()
            .push(cert);
        self.count += 1;
    }

    /// Add a DER-encoded certificate as a trust anchor.
    pub fn add_der(&mut self, der: &[u8]) -> Result<(), DecodeError> {
        let cert = decode_der(der)?;
        self.add(cert);
        Ok(())
    }

    /// Add all certificates from a PEM bundle. Returns the number added;
    /// entries that fail to decode are skipped (some bundles carry
    /// non-certificate blocks or certificates outside the engine's
    /// supported feature set).
    pub fn add_pem_bundle(&mut self, pem_data: &[u8]) -> Result<usize, DecodeError> {
        let ders = decode_pem_bundle(pem_data)?;
        let mut added = 0;
        for der in ders {
            if self.add_der(&der).is_ok() {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Load certificates from a directory of PEM files (like OpenSSL's
    /// `-CApath`).
    pub fn add_pem_directory(&mut self, dir: &Path) -> Result<usize, DecodeError> {
        let mut total = 0;
        let entries = std::fs::read_dir(dir).map_err(|e| {
            DecodeError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", dir.display(), e),
            ))
        })?;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && is_pem_cert_file(&path) {
                if let Ok(data) = std::fs::read(&path) {
                    if let Ok(added) = self.add_pem_bundle(&data) {
                        total += added;
                    }
                }
            }
        }
        Ok(total)
    }

    /// Trusted certificates whose subject matches the given raw issuer name.
    pub fn find_by_subject(&self, subject_raw: &[u8]) -> &[Certificate] {
        self.certs_by_subject
            .get(subject_raw)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether this exact certificate (by DER bytes) is a trust anchor.
    pub fn contains(&self, cert: &Certificate) -> bool {
        self.find_by_subject(&cert.raw_subject)
            .iter()
            .any(|c| c.raw_der == cert.raw_der)
    }

    /// Number of certificates in the store.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

impl Default for TrustStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Find the system CA bundle path (same locations OpenSSL uses).
pub fn find_system_ca_bundle() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("SSL_CERT_FILE") {
        let p = PathBuf::from(&path);
        if p.exists() {
            return Some(p);
        }
    }

    let probe = openssl_probe::probe();
    if let Some(file) = probe.cert_file {
        if file.exists() {
            return Some(file);
        }
    }

    for candidate in KNOWN_CA_BUNDLE_PATHS {
        let p = PathBuf::from(candidate);
        if p.exists() {
            return Some(p);
        }
    }
    None
}
