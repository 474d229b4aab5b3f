//! Cryptographic signature verification.
//!
//! A pure function from (TBS bytes, algorithm, signature, issuer key) to a
//! verdict. No state is held, so independent verifications are safe to run
//! concurrently. Anything outside the supported algorithm set is an
//! explicit [`VerifyError::UnsupportedAlgorithm`] — never a silent pass.
//!
//! Supported: RSA PKCS#1 v1.5 with SHA-256/384/512, and ECDSA (DER-encoded
//! signatures) with SHA-256/SHA-384 over P-256 and P-384.

use crate::cert::{EcCurve, PublicKey, SignatureAlgorithm};
use crate::VerifyError;
use digest::Digest;
use sha2::{Sha256, Sha384, Sha512};
use signature::hazmat::PrehashVerifier;

/// Verify `signature` over `tbs` with the issuer's public key.
pub fn verify_signature(
    tbs: &[u8],
    algorithm: &SignatureAlgorithm,
    signature: &[u8],
    issuer_key: &PublicKey,
) -> Result<(), VerifyError> {
    if let SignatureAlgorithm::Other(oid) = algorithm {
        return Err(VerifyError::UnsupportedAlgorithm(oid.clone()));
    }

    match issuer_key {
        PublicKey::Rsa { modulus, exponent } if algorithm.is_rsa() => {
            verify_rsa(tbs, signature, modulus, exponent, algorithm)
        }
        PublicKey::Ec { curve, point } if algorithm.is_ecdsa() => {
            verify_ecdsa(tbs, signature, curve, point, algorithm)
        }
        _ => Err(VerifyError::AlgorithmMismatch {
            algorithm: algorithm.name().to_string(),
        }),
    }
}

fn verify_rsa(
    tbs: &[u8],
    signature: &[u8],
    modulus: &[u8],
    exponent: &[u8],
    algorithm: &SignatureAlgorithm,
) -> Result<(), VerifyError> {
    let key = rsa::RsaPublicKey::new(
        rsa::BigUint::from_bytes_be(modulus),
        rsa::BigUint::from_bytes_be(exponent),
    )
    .map_err(|e| VerifyError::InvalidKey(e.to_string()))?;

    let (scheme, digest) = match algorithm {
        SignatureAlgorithm::RsaSha256 => (
            rsa::Pkcs1v15Sign::new::<Sha256>(),
            Sha256::digest(tbs).to_vec(),
        ),
        SignatureAlgorithm::RsaSha384 => (
            rsa::Pkcs1v15Sign::new::<Sha384>(),
            Sha384::digest(tbs).to_vec(),
        ),
        SignatureAlgorithm::RsaSha512 => (
            rsa::Pkcs1v15Sign::new::<Sha512>(),
            Sha512::digest(tbs).to_vec(),
        ),
        other => {
            return Err(VerifyError::UnsupportedAlgorithm(other.name().to_string()));
        }
    };

    key.verify(scheme, &digest, signature)
        .map_err(|_| VerifyError::SignatureInvalid)
}

fn verify_ecdsa(
    tbs: &[u8],
    signature: &[u8],
    curve: &EcCurve,
    point: &[u8],
    algorithm: &SignatureAlgorithm,
) -> Result<(), VerifyError> {
    let prehash = match algorithm {
        SignatureAlgorithm::EcdsaSha256 => Sha256::digest(tbs).to_vec(),
        SignatureAlgorithm::EcdsaSha384 => Sha384::digest(tbs).to_vec(),
        other => {
            return Err(VerifyError::UnsupportedAlgorithm(other.name().to_string()));
        }
    };

    match curve {
        EcCurve::P256 => {
            let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(point)
                .map_err(|e| VerifyError::InvalidKey(e.to_string()))?;
            let sig = p256::ecdsa::Signature::from_der(signature)
                .map_err(|_| VerifyError::SignatureInvalid)?;
            key.verify_prehash(&prehash, &sig)
                .map_err(|_| VerifyError::SignatureInvalid)
        }
        EcCurve::P384 => {
            let key = p384::ecdsa::VerifyingKey::from_sec1_bytes(point)
                .map_err(|e| VerifyError::InvalidKey(e.to_string()))?;
            let sig = p384::ecdsa::Signature::from_der(signature)
                .map_err(|_| VerifyError::SignatureInvalid)?;
            key.verify_prehash(&prehash, &sig)
                .map_err(|_| VerifyError::SignatureInvalid)
        }
        EcCurve::Other(oid) => Err(VerifyError::UnsupportedAlgorithm(format!(
            "ECDSA over unsupported curve {}",
            oid
        ))),
    }
}
