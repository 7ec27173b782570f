use std::collections::BTreeSet;

use const_oid::AssociatedOid;
use der::{
    Decode, Encode,
    asn1::{BitString, Ia5String, OctetString},
    oid::ObjectIdentifier,
};
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::error::HybridCertError;
use crate::key::{PublicKey, SignatureAlgorithm};

use super::params::DistinguishedName;

/// subjectAltPublicKeyInfo (X.509 2019): the alternate public key as a DER
/// `SubjectPublicKeyInfo`.
pub const ALT_PUBLIC_KEY_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.72");

/// altSignatureAlgorithm (X.509 2019): the `AlgorithmIdentifier` of the
/// alternate signature. Covered by the alternate signature.
pub const ALT_SIGNATURE_ALGORITHM_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.5.29.73");

/// altSignatureValue (X.509 2019): the alternate signature as a bare
/// `BIT STRING`. This is the one extension left out of the alternate
/// signing input.
pub const ALT_SIGNATURE_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.74");

/// The three alternate extensions, in the order they are appended.
pub const ALT_EXTENSIONS: [ObjectIdentifier; 3] =
    [ALT_PUBLIC_KEY_OID, ALT_SIGNATURE_ALGORITHM_OID, ALT_SIGNATURE_OID];

/// anyExtendedKeyUsage (RFC 5280 section 4.2.1.12).
pub const ANY_EXTENDED_KEY_USAGE_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.5.29.37.0");

/// Extensions this crate understands. A critical extension outside this list
/// makes decoding fail unless the caller asked to ignore it.
pub const KNOWN_EXTENSIONS: &[ObjectIdentifier] = &[
    <x509_cert::ext::pkix::SubjectAltName as AssociatedOid>::OID,
    <x509_cert::ext::pkix::BasicConstraints as AssociatedOid>::OID,
    <x509_cert::ext::pkix::KeyUsage as AssociatedOid>::OID,
    <x509_cert::ext::pkix::ExtendedKeyUsage as AssociatedOid>::OID,
    <x509_cert::ext::pkix::AuthorityKeyIdentifier as AssociatedOid>::OID,
    ALT_PUBLIC_KEY_OID,
    ALT_SIGNATURE_ALGORITHM_OID,
    ALT_SIGNATURE_OID,
];

/// Represents a single X.509 extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Extension {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl Extension {
    /// Creates an `Extension` from a typed extension value.
    ///
    /// # Arguments
    /// * `extension` - The extension to encode.
    /// * `critical` - Indicates if the extension is critical.
    pub fn from_typed<E: TypedExtension>(
        extension: &E,
        critical: bool,
    ) -> Result<Self, HybridCertError> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.encode_value()?,
        })
    }

    /// Decodes the value into a typed extension.
    pub fn to_typed<E: TypedExtension>(&self) -> Result<E, HybridCertError> {
        if self.oid != E::OID {
            return Err(HybridCertError::InvalidInput(format!(
                "extension {} is not {}",
                self.oid,
                E::OID
            )));
        }
        E::decode_value(&self.value)
    }

    fn to_x509(&self) -> Result<x509_cert::ext::Extension, HybridCertError> {
        Ok(x509_cert::ext::Extension {
            extn_id: self.oid,
            critical: self.critical,
            extn_value: OctetString::new(self.value.clone())?,
        })
    }
}

/// An ordered set of extensions keyed by OID.
///
/// Insertion order is the canonical encoding order, so the same sequence of
/// inserts always produces the same bytes. An OID appears at most once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtensionSet {
    entries: Vec<Extension>,
}

impl ExtensionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from a list, rejecting duplicate OIDs.
    pub fn from_extensions(
        extensions: impl IntoIterator<Item = Extension>,
    ) -> Result<Self, HybridCertError> {
        let mut set = Self::new();
        for extension in extensions {
            set.insert(extension)?;
        }
        Ok(set)
    }

    /// Appends an extension.
    pub fn insert(&mut self, extension: Extension) -> Result<(), HybridCertError> {
        if self.contains(&extension.oid) {
            return Err(HybridCertError::MalformedExtension(format!(
                "duplicate extension {}",
                extension.oid
            )));
        }
        self.entries.push(extension);
        Ok(())
    }

    pub fn get(&self, oid: &ObjectIdentifier) -> Option<&Extension> {
        self.entries.iter().find(|ext| ext.oid == *oid)
    }

    pub fn contains(&self, oid: &ObjectIdentifier) -> bool {
        self.get(oid).is_some()
    }

    /// Returns a copy of the set with `oid` removed, keeping the order of the rest.
    pub fn without(&self, oid: &ObjectIdentifier) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|ext| ext.oid != *oid)
                .cloned()
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Extension> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Converts the set into `x509_cert` extensions, preserving order.
    pub fn to_x509_extensions(&self) -> Result<Vec<x509_cert::ext::Extension>, HybridCertError> {
        self.entries.iter().map(Extension::to_x509).collect()
    }

    /// Builds a set from decoded `x509_cert` extensions.
    ///
    /// Fails on duplicate OIDs and on critical extensions that are neither in
    /// [`KNOWN_EXTENSIONS`] nor in `ignored`.
    pub fn from_x509_extensions(
        extensions: &[x509_cert::ext::Extension],
        ignored: &[ObjectIdentifier],
    ) -> Result<Self, HybridCertError> {
        let mut seen = BTreeSet::new();
        let mut entries = Vec::with_capacity(extensions.len());
        for ext in extensions {
            if !seen.insert(ext.extn_id) {
                return Err(HybridCertError::MalformedExtension(format!(
                    "duplicate extension {}",
                    ext.extn_id
                )));
            }
            if ext.critical
                && !KNOWN_EXTENSIONS.contains(&ext.extn_id)
                && !ignored.contains(&ext.extn_id)
            {
                return Err(HybridCertError::MalformedExtension(format!(
                    "unknown critical extension {}",
                    ext.extn_id
                )));
            }
            entries.push(Extension {
                oid: ext.extn_id,
                critical: ext.critical,
                value: ext.extn_value.as_bytes().to_vec(),
            });
        }
        Ok(Self { entries })
    }

    /// Encodes the set as a DER `SEQUENCE OF Extension` in insertion order.
    pub fn encode(&self) -> Result<Vec<u8>, HybridCertError> {
        self.to_x509_extensions()?
            .to_der()
            .map_err(|e| HybridCertError::EncodingError(e.to_string()))
    }

    /// Decodes a DER `SEQUENCE OF Extension`.
    pub fn decode(bytes: &[u8]) -> Result<Self, HybridCertError> {
        Self::decode_ignoring(bytes, &[])
    }

    /// Decodes a DER `SEQUENCE OF Extension`, tolerating the listed unknown
    /// critical extensions.
    pub fn decode_ignoring(
        bytes: &[u8],
        ignored: &[ObjectIdentifier],
    ) -> Result<Self, HybridCertError> {
        let extensions = Vec::<x509_cert::ext::Extension>::from_der(bytes)
            .map_err(|e| HybridCertError::MalformedExtension(e.to_string()))?;
        let set = Self::from_x509_extensions(&extensions, ignored)?;
        if set.encode()? != bytes {
            return Err(HybridCertError::EncodingMismatch(
                "extension set does not re-encode to its input".to_string(),
            ));
        }
        Ok(set)
    }
}

impl<'a> IntoIterator for &'a ExtensionSet {
    type Item = &'a Extension;
    type IntoIter = std::slice::Iter<'a, Extension>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Trait for extension values with a fixed OID.
///
/// # Example
/// ```
/// use hybridcert::cert::extensions::{AltName, SubjectAltName, TypedExtension};
/// let san = SubjectAltName { names: vec![AltName::Dns("example.com".to_string())] };
/// let encoded = san.encode_value().unwrap();
/// let decoded = SubjectAltName::decode_value(&encoded).unwrap();
/// assert_eq!(san.names, decoded.names);
/// ```
pub trait TypedExtension {
    /// The Object Identifier (OID) for the extension.
    const OID: ObjectIdentifier;

    /// Encodes the extension value into DER.
    fn encode_value(&self) -> Result<Vec<u8>, HybridCertError>;

    /// Decodes the extension value from DER.
    fn decode_value(value: &[u8]) -> Result<Self, HybridCertError>
    where
        Self: Sized;
}

/// A name in the Subject Alternative Name extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AltName {
    Dns(String),
    Email(String),
}

/// Represents the Subject Alternative Name (SAN) extension.
#[derive(Debug, Clone)]
pub struct SubjectAltName {
    pub names: Vec<AltName>,
}

impl TypedExtension for SubjectAltName {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::SubjectAltName::OID;

    fn encode_value(&self) -> Result<Vec<u8>, HybridCertError> {
        let san = x509_cert::ext::pkix::SubjectAltName(
            self.names
                .iter()
                .map(|name| {
                    let (value, wrap): (&String, fn(Ia5String) -> GeneralName) = match name {
                        AltName::Dns(dns) => (dns, GeneralName::DnsName),
                        AltName::Email(email) => (email, GeneralName::Rfc822Name),
                    };
                    Ia5String::try_from(value.clone())
                        .map(wrap)
                        .map_err(|e| HybridCertError::InvalidInput(e.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?,
        );

        Ok(san.to_der()?)
    }

    fn decode_value(value: &[u8]) -> Result<Self, HybridCertError> {
        let san = x509_cert::ext::pkix::SubjectAltName::from_der(value)?;
        let names = san
            .0
            .iter()
            .map(|name| match name {
                GeneralName::DnsName(dns) => Ok(AltName::Dns(dns.to_string())),
                GeneralName::Rfc822Name(email) => Ok(AltName::Email(email.to_string())),
                _ => Err(HybridCertError::InvalidInput(
                    "Unsupported general name type".to_string(),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { names })
    }
}

/// Represents the Basic Constraints extension.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BasicConstraints {
    pub is_ca: bool,
    pub max_path_length: Option<u8>,
}

impl TypedExtension for BasicConstraints {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::BasicConstraints::OID;

    fn encode_value(&self) -> Result<Vec<u8>, HybridCertError> {
        let bc = x509_cert::ext::pkix::BasicConstraints {
            ca: self.is_ca,
            path_len_constraint: self.max_path_length,
        };

        Ok(bc.to_der()?)
    }

    fn decode_value(value: &[u8]) -> Result<Self, HybridCertError> {
        let bc = x509_cert::ext::pkix::BasicConstraints::from_der(value)?;
        Ok(Self {
            is_ca: bc.ca,
            max_path_length: bc.path_len_constraint,
        })
    }
}

pub use der::flagset::FlagSet;
use x509_cert::ext::pkix::KeyUsage as X509KeyUsage;
pub use x509_cert::ext::pkix::KeyUsages;

/// Represents the Key Usage extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUsage(pub FlagSet<KeyUsages>);

impl TypedExtension for KeyUsage {
    const OID: ObjectIdentifier = <X509KeyUsage as AssociatedOid>::OID;

    fn encode_value(&self) -> Result<Vec<u8>, HybridCertError> {
        Ok(X509KeyUsage(self.0).to_der()?)
    }

    fn decode_value(value: &[u8]) -> Result<Self, HybridCertError> {
        let ku = X509KeyUsage::from_der(value)?;
        Ok(Self(ku.0))
    }
}

/// Represents the Extended Key Usage extension.
#[derive(Debug, Clone, Default)]
pub struct ExtendedKeyUsage {
    pub usage: Vec<ExtendedKeyUsageOption>,
}

impl TypedExtension for ExtendedKeyUsage {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::ExtendedKeyUsage::OID;

    fn encode_value(&self) -> Result<Vec<u8>, HybridCertError> {
        let oids: Vec<ObjectIdentifier> = self.usage.iter().map(|v| (*v).into()).collect();
        Ok(x509_cert::ext::pkix::ExtendedKeyUsage(oids).to_der()?)
    }

    fn decode_value(value: &[u8]) -> Result<Self, HybridCertError> {
        let eku = x509_cert::ext::pkix::ExtendedKeyUsage::from_der(value)?;
        let usage = eku
            .0
            .iter()
            .map(|v| match *v {
                const_oid::db::rfc5912::ID_KP_OCSP_SIGNING => {
                    Ok(ExtendedKeyUsageOption::OcspSigning)
                }
                const_oid::db::rfc5912::ID_KP_SERVER_AUTH => Ok(ExtendedKeyUsageOption::ServerAuth),
                const_oid::db::rfc5912::ID_KP_CLIENT_AUTH => Ok(ExtendedKeyUsageOption::ClientAuth),
                const_oid::db::rfc5912::ID_KP_CODE_SIGNING => {
                    Ok(ExtendedKeyUsageOption::CodeSigning)
                }
                const_oid::db::rfc5912::ID_KP_EMAIL_PROTECTION => {
                    Ok(ExtendedKeyUsageOption::EmailProtection)
                }
                const_oid::db::rfc5912::ID_KP_TIME_STAMPING => {
                    Ok(ExtendedKeyUsageOption::TimeStamping)
                }
                ANY_EXTENDED_KEY_USAGE_OID => Ok(ExtendedKeyUsageOption::Any),
                _ => Err(HybridCertError::InvalidInput(
                    "Unsupported extended key usage option".to_string(),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { usage })
    }
}

/// Represents an option for the Extended Key Usage extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendedKeyUsageOption {
    ServerAuth,
    ClientAuth,
    CodeSigning,
    EmailProtection,
    TimeStamping,
    OcspSigning,
    Any,
}

impl From<ExtendedKeyUsageOption> for ObjectIdentifier {
    fn from(value: ExtendedKeyUsageOption) -> Self {
        match value {
            ExtendedKeyUsageOption::OcspSigning => const_oid::db::rfc5912::ID_KP_OCSP_SIGNING,
            ExtendedKeyUsageOption::ServerAuth => const_oid::db::rfc5912::ID_KP_SERVER_AUTH,
            ExtendedKeyUsageOption::ClientAuth => const_oid::db::rfc5912::ID_KP_CLIENT_AUTH,
            ExtendedKeyUsageOption::CodeSigning => const_oid::db::rfc5912::ID_KP_CODE_SIGNING,
            ExtendedKeyUsageOption::EmailProtection => {
                const_oid::db::rfc5912::ID_KP_EMAIL_PROTECTION
            }
            ExtendedKeyUsageOption::TimeStamping => const_oid::db::rfc5912::ID_KP_TIME_STAMPING,
            ExtendedKeyUsageOption::Any => ANY_EXTENDED_KEY_USAGE_OID,
        }
    }
}

/// Represents the Authority Key Identifier (AKI) extension.
///
/// # Fields
/// * `key_identifier` - SHA-1 of the issuer's primary public key bits.
/// * `authority_cert_issuer` - The issuer's distinguished name.
/// * `authority_cert_serial_number` - The issuer's certificate serial number.
#[derive(Debug, Clone)]
pub struct AuthorityKeyIdentifier {
    pub key_identifier: Vec<u8>,
    pub authority_cert_issuer: DistinguishedName,
    pub authority_cert_serial_number: Vec<u8>,
}

impl TypedExtension for AuthorityKeyIdentifier {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::AuthorityKeyIdentifier::OID;

    fn encode_value(&self) -> Result<Vec<u8>, HybridCertError> {
        let general_names = vec![GeneralName::DirectoryName(
            self.authority_cert_issuer.as_x509_name()?,
        )];

        let aki = x509_cert::ext::pkix::AuthorityKeyIdentifier {
            key_identifier: Some(OctetString::new(self.key_identifier.as_slice())?),
            authority_cert_issuer: Some(general_names),
            authority_cert_serial_number: Some(x509_cert::serial_number::SerialNumber::new(
                self.authority_cert_serial_number.as_slice(),
            )?),
        };

        Ok(aki.to_der()?)
    }

    fn decode_value(value: &[u8]) -> Result<Self, HybridCertError> {
        let aki = x509_cert::ext::pkix::AuthorityKeyIdentifier::from_der(value)?;

        let authority_cert_issuer = aki
            .authority_cert_issuer
            .as_ref()
            .and_then(|names| {
                names.iter().find_map(|name| match name {
                    GeneralName::DirectoryName(dn) => Some(DistinguishedName::from_x509_name(dn)),
                    _ => None,
                })
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            key_identifier: aki
                .key_identifier
                .map(|id| id.as_bytes().to_vec())
                .unwrap_or_default(),
            authority_cert_issuer,
            authority_cert_serial_number: aki
                .authority_cert_serial_number
                .map(|sn| sn.as_bytes().to_vec())
                .unwrap_or_default(),
        })
    }
}

/// The alternate public key, stored as a DER `SubjectPublicKeyInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AltPublicKey(pub PublicKey);

impl TypedExtension for AltPublicKey {
    const OID: ObjectIdentifier = ALT_PUBLIC_KEY_OID;

    fn encode_value(&self) -> Result<Vec<u8>, HybridCertError> {
        Ok(self.0.to_spki()?.to_der()?)
    }

    fn decode_value(value: &[u8]) -> Result<Self, HybridCertError> {
        let spki = SubjectPublicKeyInfoOwned::from_der(value)?;
        Ok(Self(PublicKey::from_spki(&spki)?))
    }
}

/// The alternate signature algorithm extension value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AltSignatureAlgorithm(pub SignatureAlgorithm);

impl TypedExtension for AltSignatureAlgorithm {
    const OID: ObjectIdentifier = ALT_SIGNATURE_ALGORITHM_OID;

    fn encode_value(&self) -> Result<Vec<u8>, HybridCertError> {
        Ok(AlgorithmIdentifierOwned::from(self.0).to_der()?)
    }

    fn decode_value(value: &[u8]) -> Result<Self, HybridCertError> {
        let algorithm = AlgorithmIdentifierOwned::from_der(value)?;
        Ok(Self(SignatureAlgorithm::try_from(&algorithm)?))
    }
}

/// The alternate signature value extension: a bare `BIT STRING`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AltSignatureValue(pub Vec<u8>);

impl TypedExtension for AltSignatureValue {
    const OID: ObjectIdentifier = ALT_SIGNATURE_OID;

    fn encode_value(&self) -> Result<Vec<u8>, HybridCertError> {
        Ok(BitString::from_bytes(&self.0)?.to_der()?)
    }

    fn decode_value(value: &[u8]) -> Result<Self, HybridCertError> {
        let bits = BitString::from_der(value)?;
        let signature = bits.as_bytes().ok_or_else(|| {
            HybridCertError::DecodingError("alternate signature has unused bits".to_string())
        })?;
        Ok(Self(signature.to_vec()))
    }
}

/// The alternate signature: the algorithm of the secondary key and the
/// signature it produced over the pre-signature body.
///
/// Carried in two extensions, [`AltSignatureAlgorithm`] and
/// [`AltSignatureValue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AltSignature {
    pub algorithm: SignatureAlgorithm,
    pub signature: Vec<u8>,
}

impl AltSignature {
    /// Reads the alternate signature out of `extensions`.
    ///
    /// Returns `None` unless both the algorithm and the value extension are
    /// present.
    pub fn from_extensions(extensions: &ExtensionSet) -> Result<Option<Self>, HybridCertError> {
        let (Some(algorithm), Some(value)) = (
            extensions.get(&ALT_SIGNATURE_ALGORITHM_OID),
            extensions.get(&ALT_SIGNATURE_OID),
        ) else {
            return Ok(None);
        };
        Ok(Some(Self {
            algorithm: algorithm.to_typed::<AltSignatureAlgorithm>()?.0,
            signature: value.to_typed::<AltSignatureValue>()?.0,
        }))
    }
}
