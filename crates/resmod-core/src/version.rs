use std::fmt::Write;

/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Schema version of the JSON the CLI prints.
/// Bump this when changing the output shape.
pub const OUTPUT_SCHEMA_VERSION: u32 = 1;

/// Returns a formatted version string including build metadata if available.
#[must_use]
pub fn version_string() -> String {
    let mut s = format!("resmod {VERSION}");

    if let Some(hash) = option_env!("RESMOD_BUILD_GIT_HASH") {
        let _ = write!(s, " ({hash})");
    }

    s
}
