//! Version information display

use crate::cli::args::{OutputFormat, VersionArgs};
use crate::error::LullabyError;

/// Print version information.
///
/// # Errors
///
/// Returns a JSON error if serialization fails.
pub fn run(args: &VersionArgs) -> Result<(), LullabyError> {
    let name = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");

    match args.format {
        OutputFormat::Human => println!("{name} {version}"),
        OutputFormat::Json => {
            let info = serde_json::json!({ "name": name, "version": version });
            println!("{}", serde_json::to_string(&info)?);
        }
    }
    Ok(())
}
