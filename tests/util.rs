#![allow(dead_code)]

use hybridcert::cert::extensions::ExtendedKeyUsageOption;
use hybridcert::cert::params::{CertificationRequestInfo, DistinguishedName};
use hybridcert::cert::{Certificate, CertificateWithKeys};
use hybridcert::key::{KeyMaterial, KeyPair, MlDsaParameterSet};

pub fn generate_ca_cert() -> CertificateWithKeys<KeyPair> {
    let primary = KeyPair::generate_ecdsa_p256();
    let alternate = KeyPair::generate_ml_dsa(MlDsaParameterSet::MlDsa44);

    let subject_dn = DistinguishedName::builder()
        .common_name("myca.local".to_string())
        .build();

    let ca_cert_info = CertificationRequestInfo::builder()
        .subject(subject_dn)
        .subject_public_key(primary.public_key())
        .is_ca(true)
        .usages(vec![
            ExtendedKeyUsageOption::ServerAuth,
            ExtendedKeyUsageOption::ClientAuth,
        ])
        .build();

    CertificateWithKeys {
        cert: Certificate::new_self_signed(&ca_cert_info, &primary, Some(&alternate)).unwrap(),
        primary,
        alternate: Some(alternate),
    }
}

/// A self-signed P-256 certificate carrying an ML-DSA-44 alternate signature.
pub fn generate_hybrid_cert() -> (Certificate, KeyPair, KeyPair) {
    let primary = KeyPair::generate_ecdsa_p256();
    let alternate = KeyPair::generate_ml_dsa(MlDsaParameterSet::MlDsa44);

    let cert_info = CertificationRequestInfo::builder()
        .subject(
            DistinguishedName::builder()
                .common_name("ML-DSA ECDSA Alt Extension Certificate".to_string())
                .organization("Crab widgits SE".to_string())
                .country("HU".to_string())
                .build(),
        )
        .subject_public_key(primary.public_key())
        .usages(vec![ExtendedKeyUsageOption::ServerAuth])
        .build();

    let cert = Certificate::new_self_signed(&cert_info, &primary, Some(&alternate)).unwrap();
    (cert, primary, alternate)
}
