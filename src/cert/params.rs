use bon::Builder;
use const_oid::ObjectIdentifier;
use der::{Tag, Tagged};
use der::asn1::{Any, Ia5String, PrintableString, SetOfVec};
use time::Duration;
use time::OffsetDateTime;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{RdnSequence, RelativeDistinguishedName};

pub use crate::cert::extensions::ExtendedKeyUsage;
pub use crate::cert::extensions::ExtendedKeyUsageOption;
use crate::cert::extensions::Extension;
use crate::error::HybridCertError;
use crate::key::PublicKey;

/// Parameters for issuing a certificate.
///
/// # Fields
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key` - The primary public key of the certificate subject.
/// * `usages` - A list of extended key usage options.
/// * `is_ca` - Indicates if the certificate is a CA.
/// * `extensions` - Additional X.509 extensions, encoded before the derived ones.
/// * `serial_number` - Big-endian serial number; random when not given.
#[derive(Clone, Debug, Builder)]
pub struct CertificationRequestInfo {
    pub subject: DistinguishedName,
    pub subject_public_key: PublicKey,
    #[builder(default)]
    pub usages: Vec<ExtendedKeyUsageOption>,
    #[builder(default)]
    pub is_ca: bool,
    #[builder(default)]
    pub extensions: Vec<Extension>,
    #[builder(default = random_serial_number())]
    pub serial_number: Vec<u8>,
}

/// Returns a random positive 128-bit serial number.
pub fn random_serial_number() -> Vec<u8> {
    use rand_core::RngCore;

    let mut serial = vec![0u8; 16];
    rand_core::OsRng.fill_bytes(&mut serial);
    // Positive, and no leading zero byte to strip.
    serial[0] = (serial[0] & 0x7f) | 0x40;
    serial
}

const CN: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");
const C: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");
const L: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.7");
const ST: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.8");
const O: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");
const OU: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.11");

/// Distinguished name of a certificate subject or issuer.
///
/// Only the attributes set are encoded, one RDN each, in the order
/// C, ST, L, O, OU, CN. The country is a two-letter PrintableString
/// (RFC 5280 appendix A); every other value is a UTF8String.
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    pub common_name: String,
    pub country: Option<String>,
    pub state: Option<String>,
    pub locality: Option<String>,
    pub organization: Option<String>,
    pub organization_unit: Option<String>,
}

impl DistinguishedName {
    /// Converts the distinguished name to an X.509 `Name`.
    ///
    /// # Errors
    /// [`HybridCertError::InvalidInput`] if the country is not two printable
    /// characters.
    pub fn as_x509_name(&self) -> Result<x509_cert::name::Name, HybridCertError> {
        let bad_country = self
            .country
            .as_deref()
            .filter(|country| country.len() != 2 || PrintableString::new(country).is_err());
        if let Some(country) = bad_country {
            return Err(HybridCertError::InvalidInput(format!(
                "country {country:?} is not a two-letter code"
            )));
        }

        let attributes = [
            (C, self.country.as_deref()),
            (ST, self.state.as_deref()),
            (L, self.locality.as_deref()),
            (O, self.organization.as_deref()),
            (OU, self.organization_unit.as_deref()),
            (CN, Some(self.common_name.as_str())),
        ];

        let rdns = attributes
            .into_iter()
            .filter_map(|(oid, value)| value.map(|value| (oid, value)))
            .map(|(oid, value)| {
                let tag = if oid == C {
                    Tag::PrintableString
                } else {
                    Tag::Utf8String
                };
                let atv = AttributeTypeAndValue {
                    oid,
                    value: Any::new(tag, value.as_bytes())?,
                };
                Ok(RelativeDistinguishedName(SetOfVec::try_from(vec![atv])?))
            })
            .collect::<Result<Vec<_>, der::Error>>()
            .map_err(|e| HybridCertError::EncodingError(e.to_string()))?;

        Ok(RdnSequence(rdns))
    }

    /// Creates a `DistinguishedName` from an X.509 `Name`.
    ///
    /// Attributes other than CN, C, ST, L, O and OU are rejected.
    pub fn from_x509_name(name: &x509_cert::name::Name) -> Result<Self, HybridCertError> {
        let mut dn = DistinguishedName::default();

        for rdn in name.0.iter() {
            for attr in rdn.0.iter() {
                let value = decode_directory_string(&attr.value)?;
                match attr.oid {
                    CN => dn.common_name = value,
                    C => dn.country = Some(value),
                    ST => dn.state = Some(value),
                    L => dn.locality = Some(value),
                    O => dn.organization = Some(value),
                    OU => dn.organization_unit = Some(value),
                    other => {
                        return Err(HybridCertError::DecodingError(format!(
                            "Unsupported name attribute {other}"
                        )));
                    }
                }
            }
        }

        Ok(dn)
    }
}

fn decode_directory_string(value: &Any) -> Result<String, HybridCertError> {
    match value.tag() {
        Tag::Utf8String => Ok(value.decode_as::<String>()?),
        Tag::PrintableString => Ok(value.decode_as::<PrintableString>()?.to_string()),
        Tag::Ia5String => Ok(value.decode_as::<Ia5String>()?.to_string()),
        other => Err(HybridCertError::DecodingError(format!(
            "Unsupported directory string {other}"
        ))),
    }
}

/// Certificate validity period.
///
/// # Fields
/// * `not_before` - The start of the validity period.
/// * `not_after` - The end of the validity period.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// Creates a validity period starting now for the given number of days.
    pub fn for_days(days: i64) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            not_before: now,
            not_after: now + Duration::days(days),
        }
    }

    /// Reports whether `at` lies inside the window, bounds included.
    pub fn contains(&self, at: OffsetDateTime) -> bool {
        self.not_before <= at && at <= self.not_after
    }
}
