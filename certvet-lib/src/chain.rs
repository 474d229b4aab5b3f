//! Certification path construction.
//!
//! Builds an ordered path from a leaf certificate to a trust anchor by
//! repeatedly selecting an issuer whose subject name matches the current
//! certificate's issuer name, drawn from the provided intermediates and
//! then the trust store. When several candidates share a subject, the one
//! whose subject key identifier matches the current certificate's
//! authority key identifier wins. A certificate is never used twice on one
//! path, so cross-signed loops terminate instead of cycling.

use crate::cert::Certificate;
use crate::trust::TrustStore;
use crate::ChainError;

/// Maximum number of certificates on a path, leaf and anchor included.
pub const MAX_PATH_LEN: usize = 10;

/// An ordered certification path: `certs[0]` is the leaf, the last element
/// is the trust anchor. A trusted self-signed leaf yields a single-element
/// path.
#[derive(Debug, Clone)]
pub struct CertificationPath {
    certs: Vec<Certificate>,
}

impl CertificationPath {
    pub fn leaf(&self) -> &Certificate {
        &self.certs[0]
    }

    pub fn anchor(&self) -> &Certificate {
        &self.certs[self.certs.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.certs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Certificate> {
        self.certs.iter()
    }

    /// The issuer of `certs[index]`: the next certificate on the path, or
    /// the anchor itself for the anchor's own (self-signed) position.
    pub fn issuer_of(&self, index: usize) -> &Certificate {
        if index + 1 < self.certs.len() {
            &self.certs[index + 1]
        } else {
            &self.certs[index]
        }
    }
}

impl std::ops::Index<usize> for CertificationPath {
    type Output = Certificate;

    fn index(&self, index: usize) -> &Certificate {
        &self.certs[index]
    }
}

/// Build a certification path from `leaf` to an anchor in `trust_store`,
/// drawing issuers from `intermediates` and the store itself.
pub fn build_path(
    leaf: &Certificate,
    intermediates: &[Certificate],
    trust_store: &TrustStore,
) -> Result<CertificationPath, ChainError> {
    let mut certs: Vec<Certificate> = Vec::new();
    let mut current = leaf.clone();

    loop {
        if trust_store.contains(&current) {
            certs.push(current);
            break;
        }

        if current.is_self_signed() {
            // Self-signed but not an anchor: nothing above it can help.
            return Err(ChainError::NoPathToTrustAnchor(format!(
                "self-signed certificate \"{}\" is not in the trust store",
                current.subject
            )));
        }

        if certs.len() + 1 >= MAX_PATH_LEN {
            return Err(ChainError::PathTooLong { max: MAX_PATH_LEN });
        }

        let next = match select_issuer(&current, intermediates, trust_store, &certs) {
            Some(cert) => cert.clone(),
            None => {
                return Err(ChainError::NoPathToTrustAnchor(format!(
                    "no certificate found for issuer \"{}\"",
                    current.issuer
                )))
            }
        };
        certs.push(current);
        current = next;
    }

    let path = CertificationPath { certs };
    check_basic_constraints(&path)?;
    Ok(path)
}

/// Pick the issuer candidate for `current`: provided intermediates before
/// trust anchors, key-identifier matches before plain name matches, and
/// never a certificate already on the path.
fn select_issuer<'a>(
    current: &Certificate,
    intermediates: &'a [Certificate],
    trust_store: &'a TrustStore,
    used: &[Certificate],
) -> Option<&'a Certificate> {
    let candidates = intermediates
        .iter()
        .filter(|c| c.raw_subject == current.raw_issuer)
        .chain(trust_store.find_by_subject(&current.raw_issuer).iter())
        .filter(|c| !used.iter().any(|u| u.raw_der == c.raw_der));

    let mut fallback = None;
    for candidate in candidates {
        if let (Some(aki), Some(ski)) = (
            &current.extensions.authority_key_id,
            &candidate.extensions.subject_key_id,
        ) {
            if aki == ski {
                return Some(candidate);
            }
        }
        if fallback.is_none() {
            fallback = Some(candidate);
        }
    }
    fallback
}

/// Enforce RFC 5280 Basic Constraints along the path: every issuing
/// certificate must assert `cA=TRUE`, and a `pathLenConstraint` bounds the
/// number of non-self-issued intermediates beneath its holder.
fn check_basic_constraints(path: &CertificationPath) -> Result<(), ChainError> {
    for i in 1..path.len() {
        let issuer = &path[i];

        let bc = match &issuer.extensions.basic_constraints {
            Some(bc) => bc,
            None => {
                return Err(ChainError::BasicConstraintsViolation(format!(
                    "\"{}\" issued a certificate but carries no Basic Constraints",
                    issuer.subject
                )))
            }
        };
        if !bc.is_ca {
            return Err(ChainError::BasicConstraintsViolation(format!(
                "\"{}\" issued a certificate but is not a CA",
                issuer.subject
            )));
        }

        if let Some(max_below) = bc.path_len_constraint {
            // Certificates between this issuer and the leaf, exclusive of
            // both, minus self-issued ones (RFC 5280 Section 6.1.4 (l)).
            let below = path.certs[1..i]
                .iter()
                .filter(|c| !c.is_self_signed())
                .count();
            if below as u32 > max_below {
                return Err(ChainError::BasicConstraintsViolation(format!(
                    "\"{}\" has pathLenConstraint {} but {} intermediates below it",
                    issuer.subject, max_below, below
                )));
            }
        }
    }
    Ok(())
}
