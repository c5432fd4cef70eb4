// crates/shoal-cli/src/commands/init.rs
//
// `shoal init`: write the configuration, make sure the acting account has a
// key, and create an empty protocol state.

use std::path::Path;

use serde::Serialize;

use crate::config::{resolve_path, ShoalConfig};
use crate::context::Session;
use crate::keys;
use crate::output::{emit, eth, FieldRow, OutputFormat};

#[derive(Serialize)]
struct InitReport {
    config_path: String,
    data_dir: String,
    account: String,
    governors: Vec<String>,
    unit_size: String,
    withhold_ratio: u32,
    cycle_length: u64,
}

/// Run the init command.
///
/// With no governors configured, the acting account becomes the sole
/// governor and the configuration file is rewritten to say so.
pub fn run(
    config_path: &str,
    mut config: ShoalConfig,
    key_name: &str,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let keypair = if keys::exists(&config, key_name) {
        keys::load(&config, key_name)?
    } else {
        let keypair = keys::generate(&config, key_name, false)?;
        tracing::info!(name = key_name, "Generated account key");
        keypair
    };
    let account = keypair.address();

    let mut rewrite = !Path::new(&resolve_path(config_path)).exists();
    if config.governors.is_empty() {
        config.governors.push(account.to_string());
        rewrite = true;
    }
    config.validate()?;
    if rewrite {
        config.save(config_path)?;
        tracing::info!(path = config_path, "Wrote configuration");
    }

    let session = Session::open(&config, key_name)?;
    session.initialize()?;

    let unit_size = config.unit_size_wei()?;
    let report = InitReport {
        config_path: resolve_path(config_path).display().to_string(),
        data_dir: config.data_path().display().to_string(),
        account: account.to_string(),
        governors: config.governors.clone(),
        unit_size: eth(unit_size),
        withhold_ratio: config.withhold_ratio,
        cycle_length: config.cycle_length,
    };
    let rows = vec![
        FieldRow::new("Config", &report.config_path),
        FieldRow::new("Data dir", &report.data_dir),
        FieldRow::new("Account", &report.account),
        FieldRow::new("Governors", report.governors.join(", ")),
        FieldRow::new("Unit size", &report.unit_size),
        FieldRow::new("Withhold ratio", report.withhold_ratio),
        FieldRow::new("Cycle length (s)", report.cycle_length),
    ];
    emit(format, &rows, &report);
    Ok(())
}
