// crates/shoal-cli/src/commands/keygen.rs
//
// `shoal keygen`: generate an ed25519 account key.

use serde::Serialize;

use crate::config::ShoalConfig;
use crate::keys;
use crate::output::{emit, FieldRow, OutputFormat};

#[derive(Serialize)]
struct KeyReport {
    name: String,
    address: String,
    keys_dir: String,
}

/// Run the keygen command.
pub fn run(
    config: &ShoalConfig,
    name: &str,
    force: bool,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let keypair = keys::generate(config, name, force)?;
    let report = KeyReport {
        name: name.to_string(),
        address: keypair.address().to_string(),
        keys_dir: config.keys_path().display().to_string(),
    };
    let rows = vec![
        FieldRow::new("Name", &report.name),
        FieldRow::new("Address", &report.address),
        FieldRow::new("Saved to", &report.keys_dir),
    ];
    emit(format, &rows, &report);
    if format == OutputFormat::Table {
        println!();
        println!("IMPORTANT: Back up the secret key file securely.");
    }
    Ok(())
}
