//! Independent verification of the primary and alternate signatures.
//!
//! The primary signature is checked against the DER encoding of the whole
//! body. The alternate signature is checked against the body re-encoded
//! without its altSignatureValue extension (see
//! [`crate::hybrid::alt_signing_input`]). Neither check reads anything the
//! other produces, so they can run on separate threads.
//!
//! A rejected certificate is reported as an error naming the reason; an
//! accepted one comes with a [`VerificationReport`] that records what happened
//! to the alternate signature.

use bon::Builder;
use tracing::{debug, warn};

use crate::cert::Certificate;
use crate::cert::extensions::{ALT_EXTENSIONS, ALT_PUBLIC_KEY_OID, AltPublicKey, AltSignature};
use crate::error::HybridCertError;
use crate::hybrid::alt_signing_input;
use crate::key::PublicKey;

/// How much of a hybrid certificate must verify for it to be accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerificationPolicy {
    /// Check the primary signature only, as a legacy verifier would.
    ClassicalOnly,
    /// Require both signatures.
    #[default]
    HybridStrict,
    /// Require the primary signature; check the alternate one when present
    /// and report its outcome without rejecting on it.
    HybridBestEffort,
}

/// Outcome of the alternate signature check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AltSignatureStatus {
    /// The policy did not ask for it.
    NotChecked,
    Valid,
    /// At least one of the alternate extensions is absent.
    Missing,
    /// Present but undecodable, or the signature does not verify.
    Invalid,
}

/// States a certificate passes through during one verification.
///
/// An accepted verification returns its trail in the report; a rejected one
/// logs it at `warn` level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationState {
    Unverified,
    PrimaryChecked,
    AltChecked(AltSignatureStatus),
    Accepted,
    Rejected,
}

/// Result of an accepted verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub policy: VerificationPolicy,
    pub alt_signature: AltSignatureStatus,
    /// Audit trail, ending in [`VerificationState::Accepted`].
    pub states: Vec<VerificationState>,
}

impl VerificationReport {
    /// True when the alternate signature was checked and holds.
    pub fn alt_verified(&self) -> bool {
        self.alt_signature == AltSignatureStatus::Valid
    }
}

/// A reusable verifier configuration.
#[derive(Debug, Clone, Copy, Default, Builder)]
pub struct DualVerifier {
    #[builder(default)]
    pub policy: VerificationPolicy,
    /// Run the primary and alternate checks on two threads.
    #[builder(default)]
    pub parallel: bool,
}

impl DualVerifier {
    /// Verifies `cert` against the primary public key under this policy.
    ///
    /// # Errors
    /// * [`HybridCertError::PrimarySignatureInvalid`] under every policy when
    ///   the primary signature does not hold.
    /// * [`HybridCertError::AltExtensionMissing`] and
    ///   [`HybridCertError::AltSignatureInvalid`] under
    ///   [`VerificationPolicy::HybridStrict`].
    pub fn verify(
        &self,
        cert: &Certificate,
        primary_public_key: &PublicKey,
    ) -> Result<VerificationReport, HybridCertError> {
        let policy = self.policy;
        let primary = || check_primary_signature(cert, primary_public_key);
        let alt = || match policy {
            VerificationPolicy::ClassicalOnly => AltSignatureStatus::NotChecked,
            _ => check_alt_signature(cert),
        };

        let (primary_result, alt_signature) = if self.parallel {
            rayon::join(primary, alt)
        } else {
            (primary(), alt())
        };

        let mut states = vec![VerificationState::Unverified];

        if let Err(err) = primary_result {
            states.push(VerificationState::Rejected);
            warn!(error = %err, ?states, "rejecting certificate: primary signature");
            return Err(err);
        }
        states.push(VerificationState::PrimaryChecked);

        if policy != VerificationPolicy::ClassicalOnly {
            states.push(VerificationState::AltChecked(alt_signature));
        }

        match (policy, alt_signature) {
            (VerificationPolicy::HybridStrict, AltSignatureStatus::Missing) => {
                states.push(VerificationState::Rejected);
                warn!(?states, "rejecting certificate: alternate extensions missing");
                Err(HybridCertError::AltExtensionMissing)
            }
            (VerificationPolicy::HybridStrict, AltSignatureStatus::Invalid) => {
                states.push(VerificationState::Rejected);
                warn!(?states, "rejecting certificate: alternate signature");
                Err(HybridCertError::AltSignatureInvalid)
            }
            _ => {
                if alt_signature == AltSignatureStatus::Invalid {
                    warn!("accepting certificate with an invalid alternate signature");
                }
                states.push(VerificationState::Accepted);
                debug!(?policy, ?alt_signature, "certificate accepted");
                Ok(VerificationReport {
                    policy,
                    alt_signature,
                    states,
                })
            }
        }
    }
}

/// Verifies `cert` with a sequential [`DualVerifier`] using `policy`.
pub fn verify(
    cert: &Certificate,
    primary_public_key: &PublicKey,
    policy: VerificationPolicy,
) -> Result<VerificationReport, HybridCertError> {
    DualVerifier::builder()
        .policy(policy)
        .build()
        .verify(cert, primary_public_key)
}

/// Checks the primary signature over the full body.
pub fn check_primary_signature(
    cert: &Certificate,
    primary_public_key: &PublicKey,
) -> Result<(), HybridCertError> {
    if cert.signature_algorithm() != cert.tbs().signature_algorithm() {
        debug!("outer and inner signature algorithms differ");
        return Err(HybridCertError::PrimarySignatureInvalid);
    }

    let tbs_der = cert.tbs().to_der()?;
    if primary_public_key.verify(cert.signature_algorithm(), &tbs_der, cert.signature()) {
        Ok(())
    } else {
        Err(HybridCertError::PrimarySignatureInvalid)
    }
}

/// Checks the alternate signature against the alternate public key carried
/// in the certificate.
///
/// Reports [`AltSignatureStatus::Missing`] unless all three alternate
/// extensions are present.
pub fn check_alt_signature(cert: &Certificate) -> AltSignatureStatus {
    let extensions = cert.tbs().extensions();
    if !ALT_EXTENSIONS.iter().all(|oid| extensions.contains(oid)) {
        return AltSignatureStatus::Missing;
    }

    let checked = || -> Result<bool, HybridCertError> {
        let Some(alt_key_ext) = extensions.get(&ALT_PUBLIC_KEY_OID) else {
            return Ok(false);
        };
        let AltPublicKey(alt_key) = alt_key_ext.to_typed::<AltPublicKey>()?;
        let Some(alt_signature) = AltSignature::from_extensions(extensions)? else {
            return Ok(false);
        };
        let input = alt_signing_input(cert.tbs())?;
        Ok(alt_key.verify(alt_signature.algorithm, &input, &alt_signature.signature))
    };

    match checked() {
        Ok(true) => AltSignatureStatus::Valid,
        Ok(false) => AltSignatureStatus::Invalid,
        Err(err) => {
            debug!(error = %err, "alternate extensions do not decode");
            AltSignatureStatus::Invalid
        }
    }
}
