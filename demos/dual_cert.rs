use hybridcert::cert::Certificate;
use hybridcert::cert::extensions::ExtendedKeyUsageOption;
use hybridcert::cert::params::{CertificationRequestInfo, DistinguishedName};
use hybridcert::key::{KeyMaterial, KeyPair, MlDsaParameterSet};
use hybridcert::verify::{DualVerifier, VerificationPolicy};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Classical primary key, post-quantum alternate key
    let primary = KeyPair::generate_ecdsa_p256();
    let alternate = KeyPair::generate_ml_dsa(MlDsaParameterSet::MlDsa44);

    let subject = DistinguishedName::builder()
        .common_name("ML-DSA ECDSA Alt Extension Certificate".to_string())
        .organization("Example Corp".to_string())
        .country("US".to_string())
        .build();

    let cert_info = CertificationRequestInfo::builder()
        .subject(subject)
        .subject_public_key(primary.public_key())
        .usages(vec![ExtendedKeyUsageOption::ServerAuth])
        .build();

    let cert = Certificate::new_self_signed(&cert_info, &primary, Some(&alternate))?;
    let der = cert.to_der()?;
    info!(bytes = der.len(), hybrid = cert.is_hybrid(), "issued certificate");

    let decoded = Certificate::from_der(&der)?;
    for policy in [
        VerificationPolicy::ClassicalOnly,
        VerificationPolicy::HybridStrict,
        VerificationPolicy::HybridBestEffort,
    ] {
        let report = DualVerifier::builder()
            .policy(policy)
            .parallel(true)
            .build()
            .verify(&decoded, &primary.public_key())?;
        info!(?policy, alt_signature = ?report.alt_signature, "verified");
    }

    Ok(())
}
