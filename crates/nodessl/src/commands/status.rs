use std::path::PathBuf;

use nodessl_client::Endpoint;
use nodessl_crypto::CertificateInfo;
use nodessl_enroll::EnrollmentState;
use serde::Serialize;

use crate::commands::print_json;
use crate::context::Context;

#[derive(Debug, Serialize)]
struct StatusReport {
    certname: String,
    ssl_dir: PathBuf,
    state: String,
    ca_server: String,
    puppet_server: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    certificate: Option<CertificateSummary>,
}

#[derive(Debug, Serialize)]
struct CertificateSummary {
    subject: String,
    issuer: String,
    not_after: String,
    fingerprint: String,
}

impl From<CertificateInfo> for CertificateSummary {
    fn from(info: CertificateInfo) -> Self {
        Self {
            subject: info.subject,
            issuer: info.issuer,
            not_after: info.not_after,
            fingerprint: info.fingerprint,
        }
    }
}

pub fn run(ctx: &Context) -> anyhow::Result<()> {
    let layout = &ctx.layout;
    let state = EnrollmentState::of(layout);

    let certificate = if state == EnrollmentState::Signed {
        let pem = std::fs::read(layout.client_public_cert())?;
        match CertificateInfo::from_pem(&pem) {
            Ok(info) => Some(CertificateSummary::from(info)),
            Err(e) => {
                tracing::warn!(error = %e, "Stored certificate could not be parsed");
                None
            }
        }
    } else {
        None
    };

    let report = StatusReport {
        certname: layout.certname().to_string(),
        ssl_dir: layout.base_dir().to_path_buf(),
        state: state.to_string(),
        ca_server: Endpoint::puppet_ca(&ctx.config).to_string(),
        puppet_server: Endpoint::puppet_server(&ctx.config)?.to_string(),
        certificate,
    };

    if ctx.json {
        print_json(&report)?;
        return Ok(());
    }

    println!("Certname:      {}", report.certname);
    println!("SSL directory: {}", report.ssl_dir.display());
    println!("State:         {}", report.state);
    println!("CA server:     {}", report.ca_server);
    println!("Puppet server: {}", report.puppet_server);
    if let Some(cert) = &report.certificate {
        println!("Certificate:");
        println!("  Subject:     {}", cert.subject);
        println!("  Issuer:      {}", cert.issuer);
        println!("  Expires:     {}", cert.not_after);
        println!("  Fingerprint: {}", cert.fingerprint);
    }
    Ok(())
}
