use std::time::SystemTime;

use bon::bon;
use der::asn1::{GeneralizedTime, UtcTime};
use der::{Decode, Encode};
use time::OffsetDateTime;
use x509_cert::Version;
use x509_cert::certificate::TbsCertificateInner;
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::Time;

use crate::cert::extensions::ExtensionSet;
use crate::cert::params::{DistinguishedName, Validity};
use crate::error::HybridCertError;
use crate::key::{PublicKey, SignatureAlgorithm};

type Result<T> = std::result::Result<T, HybridCertError>;

/// Represents the "To Be Signed" (TBS) portion of an X.509 certificate.
///
/// A value of this type is immutable: the hybrid pipeline produces a new body
/// at every stage instead of editing one in place. Its DER encoding is
/// canonical, so equal values always encode to equal bytes.
///
/// # Fields
/// * `serial_number` - The unique identifier for the certificate.
/// * `signature_algorithm` - The primary signature algorithm.
/// * `issuer` - The distinguished name of the certificate issuer.
/// * `validity` - The certificate's validity period.
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key` - The primary public key of the certificate subject.
/// * `extensions` - Extensions, in encoding order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TbsCertificate {
    pub(crate) serial_number: Vec<u8>,
    pub(crate) signature_algorithm: SignatureAlgorithm,
    pub(crate) issuer: DistinguishedName,
    pub(crate) validity: Validity,
    pub(crate) subject: DistinguishedName,
    pub(crate) subject_public_key: PublicKey,
    pub(crate) extensions: ExtensionSet,
}

#[bon]
impl TbsCertificate {
    /// Assembles a new body.
    ///
    /// The serial number is a big-endian unsigned integer. It is stored in its
    /// DER content form (minimal, with a zero byte ahead of a set high bit)
    /// and must be non-zero and encode in at most 20 bytes. Validity bounds
    /// are truncated to whole seconds. The signature algorithm defaults to the natural
    /// algorithm of `subject_public_key`, which is right for self-signed
    /// certificates.
    ///
    /// # Errors
    /// [`HybridCertError::InvalidValidityWindow`] if the window ends before it
    /// starts.
    #[builder]
    pub fn new(
        issuer: DistinguishedName,
        subject: DistinguishedName,
        #[builder(default = vec![1])] serial_number: Vec<u8>,
        validity: Validity,
        subject_public_key: PublicKey,
        signature_algorithm: Option<SignatureAlgorithm>,
        #[builder(default)] extensions: ExtensionSet,
    ) -> Result<Self> {
        if validity.not_before > validity.not_after {
            return Err(HybridCertError::InvalidValidityWindow {
                not_before: validity.not_before,
                not_after: validity.not_after,
            });
        }

        let validity = Validity {
            not_before: truncate_to_seconds(validity.not_before)?,
            not_after: truncate_to_seconds(validity.not_after)?,
        };

        let signature_algorithm =
            signature_algorithm.unwrap_or_else(|| subject_public_key.default_signature_algorithm());

        Ok(Self {
            serial_number: normalize_serial(serial_number)?,
            signature_algorithm,
            issuer,
            validity,
            subject,
            subject_public_key,
            extensions,
        })
    }
}

impl TbsCertificate {
    pub fn serial_number(&self) -> &[u8] {
        &self.serial_number
    }

    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        self.signature_algorithm
    }

    pub fn issuer(&self) -> &DistinguishedName {
        &self.issuer
    }

    pub fn validity(&self) -> &Validity {
        &self.validity
    }

    pub fn subject(&self) -> &DistinguishedName {
        &self.subject
    }

    pub fn subject_public_key(&self) -> &PublicKey {
        &self.subject_public_key
    }

    pub fn extensions(&self) -> &ExtensionSet {
        &self.extensions
    }

    /// Returns the same body carrying `extensions` instead.
    pub(crate) fn with_extensions(&self, extensions: ExtensionSet) -> Self {
        Self {
            extensions,
            ..self.clone()
        }
    }

    /// Converts the `TbsCertificate` into a `TbsCertificateInner` for DER encoding.
    pub fn to_tbs_certificate_inner(&self) -> Result<TbsCertificateInner> {
        let extensions = if self.extensions.is_empty() {
            None
        } else {
            Some(self.extensions.to_x509_extensions()?)
        };

        let validity = x509_cert::time::Validity {
            not_before: to_x509_time(self.validity.not_before)?,
            not_after: to_x509_time(self.validity.not_after)?,
        };

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number: SerialNumber::new(self.serial_number.as_slice())?,
            signature: self.signature_algorithm.into(),
            issuer: self.issuer.as_x509_name()?,
            validity,
            subject: self.subject.as_x509_name()?,
            subject_public_key_info: self.subject_public_key.to_spki()?,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions,
        })
    }

    /// Creates a `TbsCertificate` from a `TbsCertificateInner`.
    ///
    /// Critical extensions this crate does not know make the conversion fail.
    pub fn from_tbs_certificate_inner(inner: &TbsCertificateInner) -> Result<Self> {
        if inner.version != Version::V3 {
            return Err(HybridCertError::DecodingError(format!(
                "Unsupported certificate version {:?}",
                inner.version
            )));
        }

        let extensions = ExtensionSet::from_x509_extensions(
            inner.extensions.as_deref().unwrap_or_default(),
            &[],
        )?;

        Ok(Self {
            serial_number: inner.serial_number.as_bytes().to_vec(),
            signature_algorithm: SignatureAlgorithm::try_from(&inner.signature)?,
            issuer: DistinguishedName::from_x509_name(&inner.issuer)?,
            validity: Validity {
                not_before: from_x509_time(&inner.validity.not_before),
                not_after: from_x509_time(&inner.validity.not_after),
            },
            subject: DistinguishedName::from_x509_name(&inner.subject)?,
            subject_public_key: PublicKey::from_spki(&inner.subject_public_key_info)?,
            extensions,
        })
    }

    /// Encodes the `TbsCertificate` into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.to_tbs_certificate_inner()?
            .to_der()
            .map_err(|e| HybridCertError::EncodingError(e.to_string()))
    }

    /// Decodes a DER `TBSCertificate`.
    ///
    /// Fails with [`HybridCertError::EncodingMismatch`] when the decoded body
    /// does not re-encode to `bytes`.
    pub fn from_der(bytes: &[u8]) -> Result<Self> {
        let inner = TbsCertificateInner::from_der(bytes)?;
        let tbs = Self::from_tbs_certificate_inner(&inner)?;
        if tbs.to_der()? != bytes {
            return Err(HybridCertError::EncodingMismatch(
                "TBS certificate does not re-encode to its input".to_string(),
            ));
        }
        Ok(tbs)
    }
}

fn normalize_serial(serial_number: Vec<u8>) -> Result<Vec<u8>> {
    let start = serial_number
        .iter()
        .position(|byte| *byte != 0)
        .ok_or_else(|| HybridCertError::InvalidInput("serial number must be non-zero".to_string()))?;
    let mut serial = serial_number[start..].to_vec();
    // Keep the DER INTEGER positive.
    if serial[0] & 0x80 != 0 {
        serial.insert(0, 0);
    }
    if serial.len() > 20 {
        return Err(HybridCertError::InvalidInput(
            "serial number must be at most 20 bytes".to_string(),
        ));
    }
    Ok(serial)
}

fn truncate_to_seconds(at: OffsetDateTime) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(at.unix_timestamp())
        .map_err(|e| HybridCertError::InvalidInput(e.to_string()))
}

/// UTCTime through 2049, GeneralizedTime from 2050 (RFC 5280 section 4.1.2.5).
fn to_x509_time(at: OffsetDateTime) -> Result<Time> {
    let system_time = SystemTime::from(at);
    let time = if at.year() < 2050 {
        Time::UtcTime(UtcTime::from_system_time(system_time)?)
    } else {
        Time::GeneralTime(GeneralizedTime::from_system_time(system_time)?)
    };
    Ok(time)
}

fn from_x509_time(time: &Time) -> OffsetDateTime {
    match time {
        Time::UtcTime(ut) => OffsetDateTime::from(ut.to_system_time()),
        Time::GeneralTime(gt) => OffsetDateTime::from(gt.to_system_time()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::extensions::{BasicConstraints, Extension};
    use crate::key::{KeyMaterial, KeyPair};
    use time::Duration;

    fn name(cn: &str) -> DistinguishedName {
        DistinguishedName::builder().common_name(cn.to_string()).build()
    }

    #[test]
    fn test_inverted_validity_is_rejected() {
        let t = OffsetDateTime::now_utc();
        let err = TbsCertificate::builder()
            .issuer(name("issuer"))
            .subject(name("subject"))
            .validity(Validity {
                not_before: t + Duration::seconds(1),
                not_after: t,
            })
            .subject_public_key(KeyPair::generate_ed25519().public_key())
            .build()
            .unwrap_err();
        assert!(matches!(err, HybridCertError::InvalidValidityWindow { .. }));
    }

    #[test]
    fn test_serial_number_normalization() {
        let build = |serial: Vec<u8>| {
            TbsCertificate::builder()
                .issuer(name("issuer"))
                .subject(name("subject"))
                .serial_number(serial)
                .validity(Validity::for_days(1))
                .subject_public_key(KeyPair::generate_ed25519().public_key())
                .build()
        };
        assert_eq!(build(vec![0, 0, 7]).unwrap().serial_number(), &[7]);
        assert!(matches!(
            build(vec![0, 0]),
            Err(HybridCertError::InvalidInput(_))
        ));
        assert!(matches!(
            build(vec![1; 21]),
            Err(HybridCertError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_der_round_trip() {
        let key = KeyPair::generate_ecdsa_p256();
        let extensions = ExtensionSet::from_extensions([Extension::from_typed(
            &BasicConstraints {
                is_ca: true,
                max_path_length: None,
            },
            true,
        )
        .unwrap()])
        .unwrap();
        let tbs = TbsCertificate::builder()
            .issuer(name("issuer"))
            .subject(name("subject"))
            .serial_number(vec![0x42, 0x01])
            .validity(Validity::for_days(30))
            .subject_public_key(key.public_key())
            .extensions(extensions)
            .build()
            .unwrap();

        let der = tbs.to_der().unwrap();
        let decoded = TbsCertificate::from_der(&der).unwrap();
        assert_eq!(decoded, tbs);
        assert_eq!(decoded.signature_algorithm(), key.algorithm());
        assert_eq!(decoded.to_der().unwrap(), der);
    }

    #[test]
    fn test_generalized_time_after_2049() {
        let not_before = OffsetDateTime::from_unix_timestamp(2_524_608_000).unwrap(); // 2050-01-01
        let tbs = TbsCertificate::builder()
            .issuer(name("issuer"))
            .subject(name("subject"))
            .validity(Validity {
                not_before,
                not_after: not_before + Duration::days(1),
            })
            .subject_public_key(KeyPair::generate_ed25519().public_key())
            .build()
            .unwrap();
        let inner = tbs.to_tbs_certificate_inner().unwrap();
        assert!(matches!(inner.validity.not_before, Time::GeneralTime(_)));
        assert_eq!(TbsCertificate::from_der(&tbs.to_der().unwrap()).unwrap(), tbs);
    }

    #[test]
    fn test_generalized_time_before_2050_is_rejected() {
        let tbs = TbsCertificate::builder()
            .issuer(name("issuer"))
            .subject(name("subject"))
            .validity(Validity::for_days(30))
            .subject_public_key(KeyPair::generate_ed25519().public_key())
            .build()
            .unwrap();
        let mut inner = tbs.to_tbs_certificate_inner().unwrap();
        let not_before = SystemTime::from(tbs.validity().not_before);
        inner.validity.not_before =
            Time::GeneralTime(GeneralizedTime::from_system_time(not_before).unwrap());
        let der = inner.to_der().unwrap();

        let err = TbsCertificate::from_der(&der).unwrap_err();
        assert!(matches!(err, HybridCertError::EncodingMismatch(_)));
    }
}
