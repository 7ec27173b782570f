pub mod extensions;
pub mod params;

use crate::error::HybridCertError;
pub type Result<T> = std::result::Result<T, HybridCertError>;
use der::{Decode, Encode};
use extensions::{ALT_EXTENSIONS, ALT_PUBLIC_KEY_OID, ALT_SIGNATURE_OID, AltPublicKey, AltSignature};
use params::{CertificationRequestInfo, DistinguishedName, Validity};
use time::OffsetDateTime;
use tracing::{debug, warn};
use x509_cert::certificate::CertificateInner;

use crate::issuer::Issuer;
use crate::key::{KeyMaterial, PublicKey, SignatureAlgorithm};
use crate::tbs_certificate::TbsCertificate;

/// Represents a signed X.509 certificate.
///
/// The primary signature covers the DER encoding of the complete body,
/// alternate extensions included. Values are immutable once assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    tbs: TbsCertificate,
    signature_algorithm: SignatureAlgorithm,
    signature: Vec<u8>,
}

impl Certificate {
    /// Signs `tbs` with the primary key and wraps it into a certificate.
    ///
    /// # Errors
    /// * [`HybridCertError::InvalidInput`] if the key's algorithm differs from
    ///   the algorithm recorded in the body.
    /// * [`HybridCertError::SignerUnavailable`] if the key cannot sign.
    pub fn assemble(tbs: TbsCertificate, primary: &dyn KeyMaterial) -> Result<Self> {
        let signature_algorithm = primary.algorithm();
        if signature_algorithm != tbs.signature_algorithm() {
            return Err(HybridCertError::InvalidInput(format!(
                "primary key signs with {:?} but the body declares {:?}",
                signature_algorithm,
                tbs.signature_algorithm()
            )));
        }

        let tbs_der = tbs.to_der()?;
        let signature = primary.sign(&tbs_der)?;
        debug!(
            algorithm = ?signature_algorithm,
            hybrid = tbs.extensions().contains(&ALT_SIGNATURE_OID),
            "assembled certificate"
        );

        Ok(Self {
            tbs,
            signature_algorithm,
            signature,
        })
    }

    pub fn tbs(&self) -> &TbsCertificate {
        &self.tbs
    }

    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        self.signature_algorithm
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Reports whether the certificate carries all three alternate extensions.
    pub fn is_hybrid(&self) -> bool {
        let extensions = self.tbs.extensions();
        ALT_EXTENSIONS.iter().all(|oid| extensions.contains(oid))
    }

    /// Decodes the alternate public key extension, if present.
    pub fn alt_public_key(&self) -> Result<Option<PublicKey>> {
        self.tbs
            .extensions()
            .get(&ALT_PUBLIC_KEY_OID)
            .map(|ext| ext.to_typed::<AltPublicKey>().map(|alt| alt.0))
            .transpose()
    }

    /// Decodes the alternate signature algorithm and value, if both are present.
    pub fn alt_signature(&self) -> Result<Option<AltSignature>> {
        AltSignature::from_extensions(self.tbs.extensions())
    }

    /// Fails with [`HybridCertError::CertificateError`] unless `at` lies inside
    /// the validity window.
    pub fn check_validity(&self, at: OffsetDateTime) -> Result<()> {
        let validity = self.tbs.validity();
        if validity.contains(at) {
            Ok(())
        } else {
            Err(HybridCertError::CertificateError(format!(
                "{at} is outside the validity window {} to {}",
                validity.not_before, validity.not_after
            )))
        }
    }

    /// Converts the certificate into its `x509_cert` form.
    pub fn to_x509(&self) -> Result<CertificateInner> {
        Ok(CertificateInner {
            tbs_certificate: self.tbs.to_tbs_certificate_inner()?,
            signature_algorithm: self.signature_algorithm.into(),
            signature: der::asn1::BitString::from_bytes(&self.signature)?,
        })
    }

    /// Encodes the certificate into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.to_x509()?
            .to_der()
            .map_err(|e| HybridCertError::EncodingError(e.to_string()))
    }

    /// Decodes a DER certificate.
    ///
    /// # Errors
    /// * [`HybridCertError::EncodingMismatch`] if the decoded certificate
    ///   does not re-encode to `bytes`.
    /// * [`HybridCertError::MalformedExtension`] on duplicate extensions or an
    ///   unknown critical extension.
    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        let inner = CertificateInner::from_der(bytes)?;
        let tbs = TbsCertificate::from_tbs_certificate_inner(&inner.tbs_certificate)?;
        let signature = inner.signature.as_bytes().ok_or_else(|| {
            HybridCertError::DecodingError("signature has unused bits".to_string())
        })?;
        let cert = Self {
            tbs,
            signature_algorithm: SignatureAlgorithm::try_from(&inner.signature_algorithm)?,
            signature: signature.to_vec(),
        };

        if cert.to_der()? != bytes {
            warn!("certificate does not re-encode to its input");
            return Err(HybridCertError::EncodingMismatch(
                "certificate does not re-encode to its input".to_string(),
            ));
        }
        Ok(cert)
    }

    /// Creates a new self-signed certificate.
    ///
    /// The primary signature is made with `primary`; when `alternate` is given
    /// the certificate is hybrid and carries its public key and signature.
    pub fn new_self_signed(
        cert_info: &CertificationRequestInfo,
        primary: &dyn KeyMaterial,
        alternate: Option<&dyn KeyMaterial>,
    ) -> Result<Self> {
        let self_issuer = SelfIssuer {
            name: cert_info.subject.clone(),
            primary,
            alternate,
        };
        self_issuer.issue(cert_info, Validity::for_days(365))
    }
}

// Helper struct for self-signed certificates
struct SelfIssuer<'a> {
    name: DistinguishedName,
    primary: &'a dyn KeyMaterial,
    alternate: Option<&'a dyn KeyMaterial>,
}

impl Issuer for SelfIssuer<'_> {
    fn issuer_name(&self) -> DistinguishedName {
        self.name.clone()
    }

    fn primary_key(&self) -> &dyn KeyMaterial {
        self.primary
    }

    fn alternate_key(&self) -> Option<&dyn KeyMaterial> {
        self.alternate
    }

    fn serial_number(&self) -> Option<Vec<u8>> {
        None
    }
}

/// An issued certificate together with the keys that let it issue others.
#[derive(Debug, Clone)]
pub struct CertificateWithKeys<K: KeyMaterial> {
    pub cert: Certificate,
    pub primary: K,
    pub alternate: Option<K>,
}

impl<K: KeyMaterial> Issuer for CertificateWithKeys<K> {
    fn issuer_name(&self) -> DistinguishedName {
        // The name of the issuer is the subject of the certificate
        self.cert.tbs().subject().clone()
    }

    fn primary_key(&self) -> &dyn KeyMaterial {
        &self.primary
    }

    fn alternate_key(&self) -> Option<&dyn KeyMaterial> {
        self.alternate.as_ref().map(|key| key as &dyn KeyMaterial)
    }

    fn serial_number(&self) -> Option<Vec<u8>> {
        Some(self.cert.tbs().serial_number().to_vec())
    }
}
