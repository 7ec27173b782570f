use der::flagset::FlagSet;
use sha1::Sha1;
use tracing::debug;

use crate::cert::Certificate;
use crate::cert::extensions::AuthorityKeyIdentifier;
use crate::cert::extensions::BasicConstraints;
use crate::cert::extensions::ExtendedKeyUsage;
use crate::cert::extensions::ExtendedKeyUsageOption;
use crate::cert::extensions::Extension;
use crate::cert::extensions::ExtensionSet;
use crate::cert::extensions::KeyUsage;
use crate::cert::extensions::KeyUsages;
use crate::cert::params::Validity;
use crate::cert::params::{CertificationRequestInfo, DistinguishedName};
use crate::error::HybridCertError;
use crate::hybrid::embed_alt_signature;
use crate::key::KeyMaterial;
use crate::tbs_certificate::TbsCertificate;

/// Represents an entity capable of issuing certificates.
///
/// An issuer always has a primary key. When it also has an alternate key the
/// certificates it issues are hybrid: the alternate public key and alternate
/// signature are embedded before the primary signature is made.
pub trait Issuer {
    /// Returns the distinguished name of the issuer.
    fn issuer_name(&self) -> DistinguishedName;

    /// Returns the key that makes the primary signature.
    fn primary_key(&self) -> &dyn KeyMaterial;

    /// Returns the key that makes the alternate signature, if any.
    fn alternate_key(&self) -> Option<&dyn KeyMaterial>;

    /// Returns the serial number of the issuer's own certificate, if it has one.
    fn serial_number(&self) -> Option<Vec<u8>>;

    /// Issues a certificate based on the provided certification request information.
    ///
    /// Runs the full pipeline: body assembly, alternate signature embedding
    /// (when the issuer has an alternate key) and primary signing. Nothing is
    /// returned unless every stage succeeds.
    ///
    /// The alternate public key written into the issued certificate is the
    /// issuer's [`alternate_key`](Issuer::alternate_key), not a key of the
    /// subject. `cert_request` has no alternate key of its own, so an issued
    /// leaf carries the key that verifies its alternate signature, the same
    /// way the primary signature is checked with the issuer's primary key.
    /// Only a self-signed certificate carries its subject's alternate key.
    fn issue(
        &self,
        cert_request: &CertificationRequestInfo,
        validity: Validity,
    ) -> Result<Certificate, HybridCertError> {
        let primary = self.primary_key();
        let issuer_dn = self.issuer_name();

        let mut extensions = ExtensionSet::from_extensions(cert_request.extensions.iter().cloned())?;
        for extension in derived_extensions(self, cert_request, &issuer_dn)? {
            extensions.insert(extension)?;
        }

        let tbs = TbsCertificate::builder()
            .issuer(issuer_dn)
            .subject(cert_request.subject.clone())
            .serial_number(cert_request.serial_number.clone())
            .validity(validity)
            .subject_public_key(cert_request.subject_public_key.clone())
            .signature_algorithm(primary.algorithm())
            .extensions(extensions)
            .build()?;

        // The issuer's alternate key, not the subject's.
        let tbs = match self.alternate_key() {
            Some(alternate) => embed_alt_signature(&tbs, alternate)?,
            None => tbs,
        };
        debug!(
            subject = %cert_request.subject.common_name,
            hybrid = self.alternate_key().is_some(),
            "issuing certificate"
        );

        Certificate::assemble(tbs, primary)
    }
}

fn derived_extensions<I: Issuer + ?Sized>(
    issuer: &I,
    cert_request: &CertificationRequestInfo,
    issuer_dn: &DistinguishedName,
) -> Result<Vec<Extension>, HybridCertError> {
    let mut extensions = vec![Extension::from_typed(
        &BasicConstraints {
            is_ca: cert_request.is_ca,
            max_path_length: None,
        },
        true,
    )?];

    if let Some(issuer_serial) = issuer.serial_number() {
        let public_key_info = issuer.primary_key().public_key().to_spki()?;
        let key_id = <Sha1 as sha1::Digest>::digest(public_key_info.subject_public_key.raw_bytes());
        let authority_key_id = AuthorityKeyIdentifier {
            key_identifier: key_id.to_vec(),
            authority_cert_issuer: issuer_dn.clone(),
            authority_cert_serial_number: issuer_serial,
        };
        extensions.push(Extension::from_typed(&authority_key_id, false)?);
    }

    let mut key_usage_flags: FlagSet<KeyUsages> = FlagSet::default();

    if cert_request.is_ca {
        key_usage_flags |= KeyUsages::KeyCertSign;
        key_usage_flags |= KeyUsages::CRLSign;
    }

    for usage in &cert_request.usages {
        match usage {
            ExtendedKeyUsageOption::ClientAuth
            | ExtendedKeyUsageOption::ServerAuth
            | ExtendedKeyUsageOption::EmailProtection => {
                key_usage_flags |= KeyUsages::DigitalSignature;
                key_usage_flags |= KeyUsages::KeyEncipherment;
            }
            ExtendedKeyUsageOption::CodeSigning
            | ExtendedKeyUsageOption::TimeStamping
            | ExtendedKeyUsageOption::OcspSigning
            | ExtendedKeyUsageOption::Any => {
                key_usage_flags |= KeyUsages::DigitalSignature;
            }
        }
    }

    if !key_usage_flags.is_empty() {
        extensions.push(Extension::from_typed(&KeyUsage(key_usage_flags), true)?);
    }

    if !cert_request.usages.is_empty() {
        let extended_key_usage = ExtendedKeyUsage {
            usage: cert_request.usages.clone(),
        };
        extensions.push(Extension::from_typed(&extended_key_usage, true)?);
    }

    Ok(extensions)
}
