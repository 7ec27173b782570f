mod util;

use hybridcert::cert::Certificate;
use hybridcert::cert::extensions::ExtendedKeyUsageOption;
use hybridcert::cert::params::{CertificationRequestInfo, DistinguishedName, Validity};
use hybridcert::error::HybridCertError;
use hybridcert::issuer::Issuer;
use hybridcert::key::{KeyMaterial, KeyPair};
use hybridcert::verify::{AltSignatureStatus, VerificationPolicy, verify};
use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::PKey;
use openssl::x509::{X509, X509Builder, X509NameBuilder};
use regex::Regex;
use std::fs;
use std::process::Command;

#[test]
fn test_openssl_validate_cert() {
    let (cert, _, _) = util::generate_hybrid_cert();

    // Save the certificate to a temporary file
    let cert_path = std::env::temp_dir().join("hybridcert_test_cert.der");
    fs::write(&cert_path, cert.to_der().unwrap()).expect("Failed to write certificate");

    // Use OpenSSL CLI to dump the generated certificate
    let output = Command::new("openssl")
        .arg("x509")
        .arg("-inform")
        .arg("DER")
        .arg("-in")
        .arg(&cert_path)
        .arg("-noout")
        .arg("-text")
        .output()
        .expect("Failed to execute OpenSSL command");

    assert!(
        output.status.success(),
        "OpenSSL command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let output_text = String::from_utf8_lossy(&output.stdout);

    assert!(
        output_text.contains("Version: 3 (0x2)"),
        "Version field is incorrect"
    );
    let subject_regex = Regex::new(
        r"Subject: C\s*=\s*HU, O\s*=\s*Crab widgits SE, CN\s*=\s*ML-DSA ECDSA Alt Extension Certificate",
    )
    .unwrap();
    assert!(
        subject_regex.is_match(&output_text),
        "Subject field is incorrect"
    );
    assert!(
        output_text.contains("Signature Algorithm: ecdsa-with-SHA256"),
        "Signature Algorithm field is incorrect"
    );

    let not_before_regex = Regex::new(r"Not Before: .+").unwrap();
    let not_after_regex = Regex::new(r"Not After : .+").unwrap();
    assert!(
        not_before_regex.is_match(&output_text),
        "Missing or incorrect Not Before field"
    );
    assert!(
        not_after_regex.is_match(&output_text),
        "Missing or incorrect Not After field"
    );

    // OpenSSL names 2.5.29.72 to 2.5.29.74 by OID or by a short name
    // depending on its version.
    let alt_key_regex = Regex::new(r"(2\.5\.29\.72|[Aa]lt(ernative)?\s*[Pp]ublic\s*[Kk]ey)").unwrap();
    let alt_alg_regex =
        Regex::new(r"(2\.5\.29\.73|[Aa]lt(ernative)?\s*[Ss]ignature\s*[Aa]lgorithm)").unwrap();
    let alt_sig_regex =
        Regex::new(r"(2\.5\.29\.74|[Aa]lt(ernative)?\s*[Ss]ignature\s*[Vv]alue)").unwrap();
    assert!(alt_key_regex.is_match(&output_text), "Alternate public key missing");
    assert!(alt_alg_regex.is_match(&output_text), "Alternate signature algorithm missing");
    assert!(alt_sig_regex.is_match(&output_text), "Alternate signature missing");

    fs::remove_file(&cert_path).expect("Failed to remove test certificate");
}

#[test]
fn test_openssl_crate_verifies_primary_signature() {
    let (cert, _, _) = util::generate_hybrid_cert();

    // A verifier that knows nothing about the alternate extensions still
    // accepts the primary signature.
    let x509 = X509::from_der(&cert.to_der().unwrap()).expect("Failed to parse DER");
    let public_key = x509.public_key().unwrap();
    assert!(x509.verify(&public_key).unwrap());

    let subject = x509
        .subject_name()
        .entries_by_nid(openssl::nid::Nid::COMMONNAME)
        .next()
        .unwrap()
        .data()
        .as_utf8()
        .unwrap();
    assert_eq!(
        subject.to_string(),
        "ML-DSA ECDSA Alt Extension Certificate",
        "Subject CN mismatch"
    );

    assert_eq!(
        x509.version(),
        2,
        "X509 version should be 3 (0-based index)"
    );

    let sig_alg = x509.signature_algorithm().object().nid();
    assert_eq!(
        sig_alg,
        openssl::nid::Nid::ECDSA_WITH_SHA256,
        "Signature algorithm should be ecdsa-with-SHA256"
    );
}

#[test]
fn test_openssl_crate_verifies_ca_issued_cert() {
    let ca = util::generate_ca_cert();

    let server_key = KeyPair::generate_ecdsa_p256();
    let server_dn = DistinguishedName::builder()
        .common_name("server.myca.local".to_string())
        .build();
    let server_cert_info = CertificationRequestInfo::builder()
        .subject(server_dn)
        .subject_public_key(server_key.public_key())
        .usages(vec![ExtendedKeyUsageOption::ServerAuth])
        .build();
    let server_cert = ca
        .issue(&server_cert_info, Validity::for_days(365))
        .unwrap();

    let ca_x509 = X509::from_der(&ca.cert.to_der().unwrap()).unwrap();
    let server_x509 = X509::from_der(&server_cert.to_der().unwrap()).unwrap();

    assert!(server_x509.verify(&ca_x509.public_key().unwrap()).unwrap());

    let issuer = server_x509
        .issuer_name()
        .entries_by_nid(openssl::nid::Nid::COMMONNAME)
        .next()
        .unwrap()
        .data()
        .as_utf8()
        .unwrap();
    assert_eq!(issuer.to_string(), "myca.local", "Issuer CN mismatch");

    let serial = server_x509.serial_number().to_bn().unwrap().to_vec();
    assert_eq!(serial, server_cert.tbs().serial_number());
}

#[test]
fn test_openssl_country_is_printable_string() {
    let (cert, _, _) = util::generate_hybrid_cert();

    let cert_path = std::env::temp_dir().join("hybridcert_test_country.der");
    fs::write(&cert_path, cert.to_der().unwrap()).expect("Failed to write certificate");

    let output = Command::new("openssl")
        .arg("asn1parse")
        .arg("-inform")
        .arg("DER")
        .arg("-in")
        .arg(&cert_path)
        .output()
        .expect("Failed to execute OpenSSL command");
    fs::remove_file(&cert_path).expect("Failed to remove test certificate");

    assert!(
        output.status.success(),
        "OpenSSL command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let output_text = String::from_utf8_lossy(&output.stdout);

    let country_regex = Regex::new(r"PRINTABLESTRING\s*:HU").unwrap();
    let common_name_regex =
        Regex::new(r"UTF8STRING\s*:ML-DSA ECDSA Alt Extension Certificate").unwrap();
    // Once for the issuer, once for the subject.
    assert_eq!(country_regex.find_iter(&output_text).count(), 2);
    assert_eq!(common_name_regex.find_iter(&output_text).count(), 2);
}

#[test]
fn test_openssl_issued_cert_decodes() {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    let key = PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_nid(Nid::COUNTRYNAME, "HU").unwrap();
    name.append_entry_by_nid(Nid::COMMONNAME, "openssl.local").unwrap();
    let name = name.build();

    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(0x1234).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(30).unwrap())
        .unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();
    let der = builder.build().to_der().unwrap();

    let cert = Certificate::from_der(&der).expect("Failed to decode OpenSSL certificate");
    assert_eq!(cert.tbs().subject().country.as_deref(), Some("HU"));
    assert_eq!(cert.tbs().subject().common_name, "openssl.local");
    assert_eq!(cert.tbs().serial_number(), &[0x12, 0x34]);
    assert!(!cert.is_hybrid());
    assert_eq!(cert.to_der().unwrap(), der);

    let public_key = cert.tbs().subject_public_key().clone();
    let report = verify(&cert, &public_key, VerificationPolicy::ClassicalOnly).unwrap();
    assert_eq!(report.alt_signature, AltSignatureStatus::NotChecked);
    assert_eq!(
        verify(&cert, &public_key, VerificationPolicy::HybridStrict).unwrap_err(),
        HybridCertError::AltExtensionMissing
    );
}
