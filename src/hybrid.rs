//! Two-phase embedding of the alternate public key and alternate signature.
//!
//! The alternate signature cannot cover itself, so it is computed over the
//! body as it stands after the alternate public key and algorithm are added
//! and before the signature value extension exists:
//!
//! 1. insert subjectAltPublicKeyInfo ([`ALT_PUBLIC_KEY_OID`](crate::cert::extensions::ALT_PUBLIC_KEY_OID));
//! 2. insert altSignatureAlgorithm ([`ALT_SIGNATURE_ALGORITHM_OID`](crate::cert::extensions::ALT_SIGNATURE_ALGORITHM_OID));
//! 3. encode that body, which is the alternate signing input;
//! 4. sign the input with the secondary key;
//! 5. insert altSignatureValue ([`ALT_SIGNATURE_OID`]) as a bare `BIT STRING`.
//!
//! A verifier recovers the signing input from a finished body with
//! [`alt_signing_input`], which drops the signature value extension and
//! re-encodes. The alternate extensions are appended after the base
//! extensions and the value extension is always the last one, so the removal
//! leaves the phase-1 body byte for byte.

use tracing::{debug, warn};

use crate::cert::extensions::{
    ALT_EXTENSIONS, ALT_SIGNATURE_OID, AltPublicKey, AltSignatureAlgorithm, AltSignatureValue,
    Extension,
};
use crate::error::HybridCertError;
use crate::key::KeyMaterial;
use crate::tbs_certificate::TbsCertificate;

/// Adds the alternate public key, algorithm and signature of `secondary` to `tbs`.
///
/// # Errors
/// * [`HybridCertError::AltKeyAlreadyPresent`] if `tbs` already carries any
///   of the alternate extensions.
/// * [`HybridCertError::SignerUnavailable`] if `secondary` cannot sign.
pub fn embed_alt_signature(
    tbs: &TbsCertificate,
    secondary: &dyn KeyMaterial,
) -> Result<TbsCertificate, HybridCertError> {
    if ALT_EXTENSIONS.iter().any(|oid| tbs.extensions.contains(oid)) {
        warn!("refusing to embed a second alternate signature");
        return Err(HybridCertError::AltKeyAlreadyPresent);
    }

    let mut extensions = tbs.extensions.clone();
    extensions.insert(Extension::from_typed(
        &AltPublicKey(secondary.public_key()),
        false,
    )?)?;
    extensions.insert(Extension::from_typed(
        &AltSignatureAlgorithm(secondary.algorithm()),
        false,
    )?)?;
    let phase1 = tbs.with_extensions(extensions);

    let input = alt_signing_input(&phase1)?;
    let signature = secondary.sign(&input)?;
    debug!(
        algorithm = ?secondary.algorithm(),
        input_len = input.len(),
        signature_len = signature.len(),
        "computed alternate signature"
    );

    let mut extensions = phase1.extensions.clone();
    extensions.insert(Extension::from_typed(&AltSignatureValue(signature), false)?)?;
    Ok(phase1.with_extensions(extensions))
}

/// Returns the bytes the alternate signature of `tbs` is computed over: the
/// DER body with the alternate signature value extension removed. The
/// algorithm extension stays in.
pub fn alt_signing_input(tbs: &TbsCertificate) -> Result<Vec<u8>, HybridCertError> {
    tbs.with_extensions(tbs.extensions.without(&ALT_SIGNATURE_OID))
        .to_der()
}
