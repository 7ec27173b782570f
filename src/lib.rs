//! # HybridCert - Hybrid X.509 Certificates in Pure Rust
//!
//! HybridCert builds and verifies X.509 v3 certificates that carry two
//! signatures: a primary one from a classical algorithm, readable by any
//! existing X.509 stack, and an alternate one from a post-quantum algorithm,
//! carried in the non-critical X.509 (2019) extensions subjectAltPublicKeyInfo,
//! altSignatureAlgorithm and altSignatureValue that legacy verifiers skip.
//!
//! ## Supported Algorithms
//!
//! - **RSA**: PKCS#1 v1.5 with SHA-256
//! - **ECDSA**: P-256 with SHA-256, P-384 with SHA-384
//! - **Ed25519**
//! - **ML-DSA**: ML-DSA-44, ML-DSA-65 and ML-DSA-87
//!
//! Any algorithm may be used in either role.
//!
//! ## Building a Hybrid Certificate
//!
//! The body is assembled first, the alternate key and signature are embedded
//! into it, and only then is the primary signature made. The primary
//! signature therefore covers the alternate extensions as well.
//!
//! ```rust,no_run
//! use hybridcert::{
//!     cert::{Certificate, params::{DistinguishedName, Validity}},
//!     hybrid::embed_alt_signature,
//!     key::{KeyMaterial, KeyPair, MlDsaParameterSet},
//!     tbs_certificate::TbsCertificate,
//!     verify::{VerificationPolicy, verify},
//! };
//!
//! # fn main() -> Result<(), hybridcert::error::HybridCertError> {
//! let primary = KeyPair::generate_ecdsa_p256();
//! let secondary = KeyPair::generate_ml_dsa(MlDsaParameterSet::MlDsa44);
//!
//! let name = DistinguishedName::builder()
//!     .common_name("example.com".to_string())
//!     .build();
//!
//! let tbs = TbsCertificate::builder()
//!     .issuer(name.clone())
//!     .subject(name)
//!     .validity(Validity::for_days(365))
//!     .subject_public_key(primary.public_key())
//!     .build()?;
//!
//! let tbs = embed_alt_signature(&tbs, &secondary)?;
//! let certificate = Certificate::assemble(tbs, &primary)?;
//!
//! let report = verify(&certificate, &primary.public_key(), VerificationPolicy::HybridStrict)?;
//! assert!(report.alt_verified());
//! # Ok(())
//! # }
//! ```
//!
//! ### Issuing from a CA
//!
//! ```rust,no_run
//! use hybridcert::{
//!     cert::{Certificate, CertificateWithKeys, params::{CertificationRequestInfo, DistinguishedName, Validity}},
//!     issuer::Issuer,
//!     key::{KeyMaterial, KeyPair, MlDsaParameterSet},
//! };
//!
//! # fn main() -> Result<(), hybridcert::error::HybridCertError> {
//! let ca_primary = KeyPair::generate_ecdsa_p384();
//! let ca_alternate = KeyPair::generate_ml_dsa(MlDsaParameterSet::MlDsa65);
//!
//! let ca_info = CertificationRequestInfo::builder()
//!     .subject(DistinguishedName::builder().common_name("Example CA".to_string()).build())
//!     .subject_public_key(ca_primary.public_key())
//!     .is_ca(true)
//!     .build();
//!
//! let ca = CertificateWithKeys {
//!     cert: Certificate::new_self_signed(&ca_info, &ca_primary, Some(&ca_alternate))?,
//!     primary: ca_primary,
//!     alternate: Some(ca_alternate),
//! };
//!
//! let server_key = KeyPair::generate_ecdsa_p256();
//! let server_info = CertificationRequestInfo::builder()
//!     .subject(DistinguishedName::builder().common_name("server.example.com".to_string()).build())
//!     .subject_public_key(server_key.public_key())
//!     .build();
//!
//! // Alternate extensions hold the CA's ML-DSA key, which verifies the
//! // alternate signature the CA made.
//! let server_cert = ca.issue(&server_info, Validity::for_days(90))?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`error::HybridCertError`]. Verification
//! names the reason it rejected a certificate:
//!
//! ```rust,no_run
//! use hybridcert::{cert::Certificate, error::HybridCertError, key::PublicKey, verify::{VerificationPolicy, verify}};
//!
//! fn check(cert: &Certificate, key: &PublicKey) {
//!     match verify(cert, key, VerificationPolicy::HybridStrict) {
//!         Ok(report) => println!("accepted: {:?}", report.alt_signature),
//!         Err(HybridCertError::PrimarySignatureInvalid) => println!("primary signature is bad"),
//!         Err(HybridCertError::AltExtensionMissing) => println!("not a hybrid certificate"),
//!         Err(HybridCertError::AltSignatureInvalid) => println!("alternate signature is bad"),
//!         Err(e) => println!("other error: {e}"),
//!     }
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`key`]: Key generation, signing and signature verification
//! - [`cert`]: Certificate assembly, extensions and encoding
//! - [`tbs_certificate`]: The to-be-signed body and its canonical encoding
//! - [`hybrid`]: Embedding the alternate public key and signature
//! - [`issuer`]: Certificate issuing from a self-signed or CA identity
//! - [`verify`]: Dual signature verification under a policy
//! - [`error`]: Error types

pub mod cert;
pub mod error;
pub mod hybrid;
pub mod issuer;
pub mod key;
pub mod tbs_certificate;
pub mod verify;
