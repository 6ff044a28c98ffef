pub mod check;
pub mod environment;
pub mod request_cert;
pub mod status;

/// Print one JSON document on stdout. Scripts parse this, so a value that
/// fails to serialize is an error rather than partial output.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string(value)?;
    println!("{json}");
    Ok(())
}
