//! `nodessl request-cert`: the enrollment loop the library leaves to callers.

use std::time::{Duration, Instant};

use anyhow::Context as _;

use crate::cli::RequestCertArgs;
use crate::commands::print_json;
use crate::context::Context;

pub fn run(ctx: &Context, args: &RequestCertArgs) -> anyhow::Result<()> {
    let layout = &ctx.layout;
    let certname = layout.certname();

    if layout.has_client_public_cert() {
        anyhow::bail!(
            "Already have a certificate '{}', cannot request a new one",
            layout.client_public_cert().display()
        );
    }

    layout
        .make_ssl_dirs()
        .with_context(|| format!("creating {}", layout.base_dir().display()))?;

    // The CA download runs unverified; everything after trusts it.
    let ca_path = ctx.bootstrapper()?.fetch_ca()?;
    let bootstrapper = ctx.bootstrapper()?;

    if bootstrapper.waiting_for_cert() {
        tracing::info!(%certname, "Key already present, waiting on the existing request");
    } else {
        bootstrapper.request_cert()?;
        if !ctx.json {
            println!(
                "Submitted certificate request for {certname} to {}",
                ctx.config.puppetca_server()
            );
        }
    }

    let interval = Duration::from_secs(args.interval.max(1));
    let deadline = Instant::now() + Duration::from_secs(args.wait);
    if !ctx.json {
        println!("Waiting up to {}s for the certificate to be signed...", args.wait);
    }

    loop {
        if bootstrapper.attempt_fetch_cert()? {
            break;
        }
        let now = Instant::now();
        if now >= deadline {
            anyhow::bail!(
                "Certificate for {certname} was not signed within {}s. \
                 Have the CA sign it, then run request-cert again.",
                args.wait
            );
        }
        std::thread::sleep(interval.min(deadline - now));
    }

    let cert_path = layout.client_public_cert();
    if ctx.json {
        print_json(&serde_json::json!({
            "certname": certname.as_str(),
            "certificate": cert_path,
            "ca": ca_path,
        }))?;
    } else {
        println!("Certificate for {certname} stored in {}", cert_path.display());
    }
    Ok(())
}
