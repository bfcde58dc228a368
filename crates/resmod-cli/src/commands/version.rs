use miette::{IntoDiagnostic, Result};
use resmod_core::version::{version_string, OUTPUT_SCHEMA_VERSION};
use resmod_core::VERSION;

pub fn run(json: bool) -> Result<()> {
    if json {
        let out = serde_json::json!({
            "schema_version": OUTPUT_SCHEMA_VERSION,
            "version": VERSION,
        });
        println!("{}", serde_json::to_string_pretty(&out).into_diagnostic()?);
    } else {
        println!("{}", version_string());
    }
    Ok(())
}
