use core::fmt;

use const_oid::ObjectIdentifier;
use der::asn1::{Any, AnyRef, BitString};
use der::{Decode, Encode};
use ed25519_dalek::{SigningKey as Ed25519SigningKey, VerifyingKey as Ed25519VerifyingKey};
use p256::ecdsa::{SigningKey as P256SigningKey, VerifyingKey as P256VerifyingKey};
use p384::ecdsa::{SigningKey as P384SigningKey, VerifyingKey as P384VerifyingKey};
use pkcs8::{DecodePublicKey, EncodePublicKey};
use pqcrypto_traits::sign::{DetachedSignature as _, PublicKey as _, SecretKey as _};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::error::HybridCertError;

type Result<T> = std::result::Result<T, HybridCertError>;

/// ML-DSA-44 (FIPS 204) algorithm identifier.
pub const ID_ML_DSA_44: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.3.17");
/// ML-DSA-65 (FIPS 204) algorithm identifier.
pub const ID_ML_DSA_65: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.3.18");
/// ML-DSA-87 (FIPS 204) algorithm identifier.
pub const ID_ML_DSA_87: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.3.19");

/// ML-DSA parameter sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MlDsaParameterSet {
    MlDsa44,
    MlDsa65,
    MlDsa87,
}

impl MlDsaParameterSet {
    /// The OID used both for the public key and for signatures.
    pub fn oid(self) -> ObjectIdentifier {
        match self {
            MlDsaParameterSet::MlDsa44 => ID_ML_DSA_44,
            MlDsaParameterSet::MlDsa65 => ID_ML_DSA_65,
            MlDsaParameterSet::MlDsa87 => ID_ML_DSA_87,
        }
    }

    fn from_oid(oid: ObjectIdentifier) -> Option<Self> {
        match oid {
            ID_ML_DSA_44 => Some(MlDsaParameterSet::MlDsa44),
            ID_ML_DSA_65 => Some(MlDsaParameterSet::MlDsa65),
            ID_ML_DSA_87 => Some(MlDsaParameterSet::MlDsa87),
            _ => None,
        }
    }

    fn sign(self, secret: &[u8], message: &[u8]) -> Result<Vec<u8>> {
        let unavailable =
            |_| HybridCertError::SignerUnavailable(format!("invalid {self:?} secret key"));
        let signature = match self {
            MlDsaParameterSet::MlDsa44 => {
                use pqcrypto_mldsa::mldsa44::{SecretKey, detached_sign};
                let sk = SecretKey::from_bytes(secret).map_err(unavailable)?;
                detached_sign(message, &sk).as_bytes().to_vec()
            }
            MlDsaParameterSet::MlDsa65 => {
                use pqcrypto_mldsa::mldsa65::{SecretKey, detached_sign};
                let sk = SecretKey::from_bytes(secret).map_err(unavailable)?;
                detached_sign(message, &sk).as_bytes().to_vec()
            }
            MlDsaParameterSet::MlDsa87 => {
                use pqcrypto_mldsa::mldsa87::{SecretKey, detached_sign};
                let sk = SecretKey::from_bytes(secret).map_err(unavailable)?;
                detached_sign(message, &sk).as_bytes().to_vec()
            }
        };
        Ok(signature)
    }

    fn verify(self, public: &[u8], message: &[u8], signature: &[u8]) -> bool {
        match self {
            MlDsaParameterSet::MlDsa44 => {
                use pqcrypto_mldsa::mldsa44::{
                    DetachedSignature, PublicKey, verify_detached_signature,
                };
                match (
                    PublicKey::from_bytes(public),
                    DetachedSignature::from_bytes(signature),
                ) {
                    (Ok(pk), Ok(sig)) => verify_detached_signature(&sig, message, &pk).is_ok(),
                    _ => false,
                }
            }
            MlDsaParameterSet::MlDsa65 => {
                use pqcrypto_mldsa::mldsa65::{
                    DetachedSignature, PublicKey, verify_detached_signature,
                };
                match (
                    PublicKey::from_bytes(public),
                    DetachedSignature::from_bytes(signature),
                ) {
                    (Ok(pk), Ok(sig)) => verify_detached_signature(&sig, message, &pk).is_ok(),
                    _ => false,
                }
            }
            MlDsaParameterSet::MlDsa87 => {
                use pqcrypto_mldsa::mldsa87::{
                    DetachedSignature, PublicKey, verify_detached_signature,
                };
                match (
                    PublicKey::from_bytes(public),
                    DetachedSignature::from_bytes(signature),
                ) {
                    (Ok(pk), Ok(sig)) => verify_detached_signature(&sig, message, &pk).is_ok(),
                    _ => false,
                }
            }
        }
    }
}

/// Represents the supported signature algorithms for certificates.
///
/// This is the algorithm tag that selects the signing and verification
/// implementation. Each variant maps to the OID written into the certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    /// RSA PKCS#1 v1.5 with SHA-256.
    Sha256WithRsa,
    /// ECDSA on P-256 with SHA-256.
    EcdsaWithSha256,
    /// ECDSA on P-384 with SHA-384.
    EcdsaWithSha384,
    /// Pure Ed25519.
    Ed25519,
    /// Pure ML-DSA.
    MlDsa(MlDsaParameterSet),
}

impl SignatureAlgorithm {
    /// Returns the signature algorithm OID.
    pub fn oid(self) -> ObjectIdentifier {
        match self {
            SignatureAlgorithm::Sha256WithRsa => const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::EcdsaWithSha256 => const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
            SignatureAlgorithm::EcdsaWithSha384 => const_oid::db::rfc5912::ECDSA_WITH_SHA_384,
            SignatureAlgorithm::Ed25519 => const_oid::db::rfc8410::ID_ED_25519,
            SignatureAlgorithm::MlDsa(parameter_set) => parameter_set.oid(),
        }
    }

    /// Looks up the algorithm for a signature algorithm OID.
    pub fn from_oid(oid: ObjectIdentifier) -> Result<Self> {
        match oid {
            const_oid::db::rfc5912::SHA_256_WITH_RSA_ENCRYPTION => {
                Ok(SignatureAlgorithm::Sha256WithRsa)
            }
            const_oid::db::rfc5912::ECDSA_WITH_SHA_256 => Ok(SignatureAlgorithm::EcdsaWithSha256),
            const_oid::db::rfc5912::ECDSA_WITH_SHA_384 => Ok(SignatureAlgorithm::EcdsaWithSha384),
            const_oid::db::rfc8410::ID_ED_25519 => Ok(SignatureAlgorithm::Ed25519),
            other => MlDsaParameterSet::from_oid(other)
                .map(SignatureAlgorithm::MlDsa)
                .ok_or_else(|| {
                    HybridCertError::DecodingError(format!(
                        "Unsupported signature algorithm {other}"
                    ))
                }),
        }
    }
}

impl From<SignatureAlgorithm> for AlgorithmIdentifierOwned {
    /// Converts a `SignatureAlgorithm` into an `AlgorithmIdentifierOwned`.
    ///
    /// RSA carries explicit NULL parameters (RFC 4055); every other algorithm
    /// omits them.
    fn from(value: SignatureAlgorithm) -> Self {
        let parameters = match value {
            SignatureAlgorithm::Sha256WithRsa => Some(Any::from(AnyRef::NULL)),
            _ => None,
        };
        AlgorithmIdentifierOwned {
            oid: value.oid(),
            parameters,
        }
    }
}

impl TryFrom<&AlgorithmIdentifierOwned> for SignatureAlgorithm {
    type Error = HybridCertError;

    fn try_from(value: &AlgorithmIdentifierOwned) -> Result<Self> {
        SignatureAlgorithm::from_oid(value.oid)
    }
}

/// The signing capability of a private key handle.
///
/// Implemented by [`KeyPair`] for in-memory keys. Callers holding keys
/// elsewhere (a token, a remote signer) implement it themselves and report a
/// key that cannot sign with [`HybridCertError::SignerUnavailable`].
pub trait KeyMaterial {
    /// The algorithm this key signs with.
    fn algorithm(&self) -> SignatureAlgorithm;

    /// The public half of the key.
    fn public_key(&self) -> PublicKey;

    /// Signs `message`, returning the signature in its X.509 encoding.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>>;
}

/// Supported key types for certificate operations.
#[derive(Clone)]
pub enum KeyPair {
    Rsa {
        private: Box<RsaPrivateKey>,
        public: RsaPublicKey,
    },
    EcdsaP256 {
        signing_key: P256SigningKey,
        verifying_key: P256VerifyingKey,
    },
    EcdsaP384 {
        signing_key: P384SigningKey,
        verifying_key: P384VerifyingKey,
    },
    Ed25519 {
        signing_key: Ed25519SigningKey,
    },
    MlDsa {
        parameter_set: MlDsaParameterSet,
        public: Vec<u8>,
        secret: Vec<u8>,
    },
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("algorithm", &self.algorithm())
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    /// Generate an RSA key pair with the specified number of bits.
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        let mut rng = rand_core::OsRng;
        let private = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| HybridCertError::KeyGenerationError(e.to_string()))?;
        let public = RsaPublicKey::from(&private);
        Ok(KeyPair::Rsa {
            private: Box::new(private),
            public,
        })
    }

    /// Generate an ECDSA P-256 key pair.
    pub fn generate_ecdsa_p256() -> Self {
        let mut rng = rand_core::OsRng;
        let signing_key = P256SigningKey::random(&mut rng);
        let verifying_key = *signing_key.verifying_key();
        KeyPair::EcdsaP256 {
            signing_key,
            verifying_key,
        }
    }

    /// Generate an ECDSA P-384 key pair.
    pub fn generate_ecdsa_p384() -> Self {
        let mut rng = rand_core::OsRng;
        let signing_key = P384SigningKey::random(&mut rng);
        let verifying_key = *signing_key.verifying_key();
        KeyPair::EcdsaP384 {
            signing_key,
            verifying_key,
        }
    }

    /// Generate an Ed25519 key pair.
    pub fn generate_ed25519() -> Self {
        let mut rng = rand_core::OsRng;
        let signing_key = Ed25519SigningKey::generate(&mut rng);
        KeyPair::Ed25519 { signing_key }
    }

    /// Generate an ML-DSA key pair for the given parameter set.
    pub fn generate_ml_dsa(parameter_set: MlDsaParameterSet) -> Self {
        let (public, secret) = match parameter_set {
            MlDsaParameterSet::MlDsa44 => {
                let (pk, sk) = pqcrypto_mldsa::mldsa44::keypair();
                (pk.as_bytes().to_vec(), sk.as_bytes().to_vec())
            }
            MlDsaParameterSet::MlDsa65 => {
                let (pk, sk) = pqcrypto_mldsa::mldsa65::keypair();
                (pk.as_bytes().to_vec(), sk.as_bytes().to_vec())
            }
            MlDsaParameterSet::MlDsa87 => {
                let (pk, sk) = pqcrypto_mldsa::mldsa87::keypair();
                (pk.as_bytes().to_vec(), sk.as_bytes().to_vec())
            }
        };
        KeyPair::MlDsa {
            parameter_set,
            public,
            secret,
        }
    }
}

impl KeyMaterial for KeyPair {
    fn algorithm(&self) -> SignatureAlgorithm {
        match self {
            KeyPair::Rsa { .. } => SignatureAlgorithm::Sha256WithRsa,
            KeyPair::EcdsaP256 { .. } => SignatureAlgorithm::EcdsaWithSha256,
            KeyPair::EcdsaP384 { .. } => SignatureAlgorithm::EcdsaWithSha384,
            KeyPair::Ed25519 { .. } => SignatureAlgorithm::Ed25519,
            KeyPair::MlDsa { parameter_set, .. } => SignatureAlgorithm::MlDsa(*parameter_set),
        }
    }

    fn public_key(&self) -> PublicKey {
        match self {
            KeyPair::Rsa { public, .. } => PublicKey::Rsa(public.clone()),
            KeyPair::EcdsaP256 { verifying_key, .. } => PublicKey::EcdsaP256(*verifying_key),
            KeyPair::EcdsaP384 { verifying_key, .. } => PublicKey::EcdsaP384(*verifying_key),
            KeyPair::Ed25519 { signing_key } => PublicKey::Ed25519(signing_key.verifying_key()),
            KeyPair::MlDsa {
                parameter_set,
                public,
                ..
            } => PublicKey::MlDsa {
                parameter_set: *parameter_set,
                bytes: public.clone(),
            },
        }
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        let unavailable = |e: rsa::signature::Error| HybridCertError::SignerUnavailable(e.to_string());
        match self {
            KeyPair::Rsa { private, .. } => {
                let signing_key =
                    rsa::pkcs1v15::SigningKey::<Sha256>::new(private.as_ref().clone());
                let signature = signing_key.try_sign(message).map_err(unavailable)?;
                Ok(signature.to_vec())
            }
            KeyPair::EcdsaP256 { signing_key, .. } => {
                let signature: p256::ecdsa::Signature =
                    signing_key.try_sign(message).map_err(unavailable)?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            KeyPair::EcdsaP384 { signing_key, .. } => {
                let signature: p384::ecdsa::Signature =
                    signing_key.try_sign(message).map_err(unavailable)?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            KeyPair::Ed25519 { signing_key } => {
                let signature = signing_key.try_sign(message).map_err(unavailable)?;
                Ok(signature.to_bytes().to_vec())
            }
            KeyPair::MlDsa {
                parameter_set,
                secret,
                ..
            } => parameter_set.sign(secret, message),
        }
    }
}

/// A public key of any supported algorithm.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    EcdsaP256(P256VerifyingKey),
    EcdsaP384(P384VerifyingKey),
    Ed25519(Ed25519VerifyingKey),
    MlDsa {
        parameter_set: MlDsaParameterSet,
        bytes: Vec<u8>,
    },
}

impl PublicKey {
    /// Returns the public key of the given key pair.
    pub fn from_key_pair(key_pair: &KeyPair) -> Self {
        key_pair.public_key()
    }

    /// The algorithm a certificate signed by this key's private half uses.
    pub fn default_signature_algorithm(&self) -> SignatureAlgorithm {
        match self {
            PublicKey::Rsa(_) => SignatureAlgorithm::Sha256WithRsa,
            PublicKey::EcdsaP256(_) => SignatureAlgorithm::EcdsaWithSha256,
            PublicKey::EcdsaP384(_) => SignatureAlgorithm::EcdsaWithSha384,
            PublicKey::Ed25519(_) => SignatureAlgorithm::Ed25519,
            PublicKey::MlDsa { parameter_set, .. } => SignatureAlgorithm::MlDsa(*parameter_set),
        }
    }

    /// Converts the key into a `SubjectPublicKeyInfo`.
    pub fn to_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        let document = match self {
            PublicKey::Rsa(public) => public.to_public_key_der()?,
            PublicKey::EcdsaP256(verifying_key) => verifying_key.to_public_key_der()?,
            PublicKey::EcdsaP384(verifying_key) => verifying_key.to_public_key_der()?,
            PublicKey::Ed25519(verifying_key) => verifying_key.to_public_key_der()?,
            PublicKey::MlDsa {
                parameter_set,
                bytes,
            } => {
                return Ok(SubjectPublicKeyInfoOwned {
                    algorithm: AlgorithmIdentifierOwned {
                        oid: parameter_set.oid(),
                        parameters: None,
                    },
                    subject_public_key: BitString::from_bytes(bytes)?,
                });
            }
        };
        Ok(SubjectPublicKeyInfoOwned::from_der(document.as_bytes())?)
    }

    /// Parses a key out of a `SubjectPublicKeyInfo`.
    pub fn from_spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self> {
        let oid = spki.algorithm.oid;
        if let Some(parameter_set) = MlDsaParameterSet::from_oid(oid) {
            let bytes = spki.subject_public_key.as_bytes().ok_or_else(|| {
                HybridCertError::DecodingError("ML-DSA key has unused bits".to_string())
            })?;
            return Ok(PublicKey::MlDsa {
                parameter_set,
                bytes: bytes.to_vec(),
            });
        }

        let der = spki.to_der()?;
        match oid {
            const_oid::db::rfc5912::RSA_ENCRYPTION => {
                Ok(PublicKey::Rsa(RsaPublicKey::from_public_key_der(&der)?))
            }
            const_oid::db::rfc8410::ID_ED_25519 => Ok(PublicKey::Ed25519(
                Ed25519VerifyingKey::from_public_key_der(&der)?,
            )),
            const_oid::db::rfc5912::ID_EC_PUBLIC_KEY => {
                let curve = spki
                    .algorithm
                    .parameters
                    .as_ref()
                    .ok_or_else(|| {
                        HybridCertError::DecodingError("EC key without named curve".to_string())
                    })?
                    .decode_as::<ObjectIdentifier>()?;
                match curve {
                    const_oid::db::rfc5912::SECP_256_R_1 => Ok(PublicKey::EcdsaP256(
                        P256VerifyingKey::from_public_key_der(&der)?,
                    )),
                    const_oid::db::rfc5912::SECP_384_R_1 => Ok(PublicKey::EcdsaP384(
                        P384VerifyingKey::from_public_key_der(&der)?,
                    )),
                    other => Err(HybridCertError::DecodingError(format!(
                        "Unsupported curve {other}"
                    ))),
                }
            }
            other => Err(HybridCertError::DecodingError(format!(
                "Unsupported public key algorithm {other}"
            ))),
        }
    }

    /// Checks `signature` over `message` under `algorithm`.
    ///
    /// Returns `false` for a malformed signature or when the algorithm does not
    /// belong to this key type.
    pub fn verify(&self, algorithm: SignatureAlgorithm, message: &[u8], signature: &[u8]) -> bool {
        match (self, algorithm) {
            (PublicKey::Rsa(public), SignatureAlgorithm::Sha256WithRsa) => {
                let verifying_key = rsa::pkcs1v15::VerifyingKey::<Sha256>::new(public.clone());
                rsa::pkcs1v15::Signature::try_from(signature)
                    .is_ok_and(|sig| verifying_key.verify(message, &sig).is_ok())
            }
            (PublicKey::EcdsaP256(verifying_key), SignatureAlgorithm::EcdsaWithSha256) => {
                p256::ecdsa::Signature::from_der(signature)
                    .is_ok_and(|sig| verifying_key.verify(message, &sig).is_ok())
            }
            (PublicKey::EcdsaP384(verifying_key), SignatureAlgorithm::EcdsaWithSha384) => {
                p384::ecdsa::Signature::from_der(signature)
                    .is_ok_and(|sig| verifying_key.verify(message, &sig).is_ok())
            }
            (PublicKey::Ed25519(verifying_key), SignatureAlgorithm::Ed25519) => {
                ed25519_dalek::Signature::from_slice(signature)
                    .is_ok_and(|sig| verifying_key.verify(message, &sig).is_ok())
            }
            (
                PublicKey::MlDsa {
                    parameter_set,
                    bytes,
                },
                SignatureAlgorithm::MlDsa(algorithm_set),
            ) if *parameter_set == algorithm_set => {
                parameter_set.verify(bytes, message, signature)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSAGE: &[u8] = b"to be signed";

    fn assert_sign_verify(key: &KeyPair) {
        let signature = key.sign(MESSAGE).unwrap();
        let public = key.public_key();
        assert!(public.verify(key.algorithm(), MESSAGE, &signature));
        assert!(!public.verify(key.algorithm(), b"something else", &signature));
    }

    #[test]
    fn test_sign_verify_ecdsa() {
        assert_sign_verify(&KeyPair::generate_ecdsa_p256());
        assert_sign_verify(&KeyPair::generate_ecdsa_p384());
    }

    #[test]
    fn test_sign_verify_ed25519() {
        assert_sign_verify(&KeyPair::generate_ed25519());
    }

    #[test]
    fn test_sign_verify_ml_dsa() {
        assert_sign_verify(&KeyPair::generate_ml_dsa(MlDsaParameterSet::MlDsa44));
        assert_sign_verify(&KeyPair::generate_ml_dsa(MlDsaParameterSet::MlDsa65));
        assert_sign_verify(&KeyPair::generate_ml_dsa(MlDsaParameterSet::MlDsa87));
    }

    #[test]
    fn test_sign_verify_rsa() {
        assert_sign_verify(&KeyPair::generate_rsa(2048).unwrap());
    }

    #[test]
    fn test_wrong_algorithm_does_not_verify() {
        let key = KeyPair::generate_ecdsa_p256();
        let signature = key.sign(MESSAGE).unwrap();
        assert!(
            !key.public_key()
                .verify(SignatureAlgorithm::EcdsaWithSha384, MESSAGE, &signature)
        );

        let ml_dsa = KeyPair::generate_ml_dsa(MlDsaParameterSet::MlDsa44);
        let signature = ml_dsa.sign(MESSAGE).unwrap();
        assert!(!ml_dsa.public_key().verify(
            SignatureAlgorithm::MlDsa(MlDsaParameterSet::MlDsa65),
            MESSAGE,
            &signature
        ));
    }

    #[test]
    fn test_spki_round_trip() {
        let keys = [
            KeyPair::generate_ecdsa_p256(),
            KeyPair::generate_ecdsa_p384(),
            KeyPair::generate_ed25519(),
            KeyPair::generate_ml_dsa(MlDsaParameterSet::MlDsa44),
        ];
        for key in &keys {
            let public = key.public_key();
            let spki = public.to_spki().unwrap();
            assert_eq!(PublicKey::from_spki(&spki).unwrap(), public);
        }
    }

    #[test]
    fn test_algorithm_oid_lookup() {
        for algorithm in [
            SignatureAlgorithm::Sha256WithRsa,
            SignatureAlgorithm::EcdsaWithSha256,
            SignatureAlgorithm::EcdsaWithSha384,
            SignatureAlgorithm::Ed25519,
            SignatureAlgorithm::MlDsa(MlDsaParameterSet::MlDsa87),
        ] {
            assert_eq!(SignatureAlgorithm::from_oid(algorithm.oid()).unwrap(), algorithm);
        }
        assert!(SignatureAlgorithm::from_oid(const_oid::db::rfc5912::ID_EC_PUBLIC_KEY).is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let key = KeyPair::generate_ml_dsa(MlDsaParameterSet::MlDsa44);
        let rendered = format!("{key:?}");
        assert!(rendered.contains("MlDsa44"));
        assert!(!rendered.contains("secret"));
    }
}
