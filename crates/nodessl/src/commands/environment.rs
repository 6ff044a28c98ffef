use crate::context::Context;

pub fn run(ctx: &Context, name: Option<&str>) -> anyhow::Result<()> {
    let environment = name.unwrap_or(&ctx.environment);
    let document = ctx.environment_fetcher()?.fetch_environment(environment)?;

    let rendered = if ctx.json {
        serde_json::to_string(&document)?
    } else {
        serde_json::to_string_pretty(&document)?
    };
    println!("{rendered}");
    Ok(())
}
