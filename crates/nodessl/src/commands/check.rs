use nodessl_enroll::check_ssl_setup;

use crate::commands::print_json;
use crate::context::Context;

pub fn run(ctx: &Context) -> anyhow::Result<()> {
    check_ssl_setup(&ctx.layout)?;

    if ctx.json {
        print_json(&serde_json::json!({
            "certname": ctx.layout.certname().as_str(),
            "ssl_setup": true,
        }))?;
    } else {
        println!("SSL setup for {} is complete.", ctx.layout.certname());
    }
    Ok(())
}
