// crates/shoal-cli/src/keys.rs
//
// Account key files. Each named account is a hex-encoded ed25519 secret in
// `<keys_dir>/<name>.secret` with its address alongside in `<name>.pub`.

use std::fs;
use std::path::PathBuf;

use shoal_core::crypto::Keypair;
use shoal_core::error::ShoalError;

use crate::config::ShoalConfig;

fn secret_path(config: &ShoalConfig, name: &str) -> PathBuf {
    config.keys_path().join(format!("{}.secret", name))
}

fn public_path(config: &ShoalConfig, name: &str) -> PathBuf {
    config.keys_path().join(format!("{}.pub", name))
}

pub fn exists(config: &ShoalConfig, name: &str) -> bool {
    secret_path(config, name).exists()
}

/// Generate and store a new keypair under `name`.
///
/// Refuses to overwrite an existing key unless `force` is set.
pub fn generate(config: &ShoalConfig, name: &str, force: bool) -> Result<Keypair, Box<dyn std::error::Error>> {
    if exists(config, name) && !force {
        return Err(format!(
            "Key {:?} already exists at {} (use --force to replace it)",
            name,
            secret_path(config, name).display()
        )
        .into());
    }

    let keypair = Keypair::generate();
    fs::create_dir_all(config.keys_path())?;
    fs::write(secret_path(config, name), hex::encode(keypair.signing_key.to_bytes()))?;
    fs::write(public_path(config, name), keypair.address().to_string())?;
    tracing::debug!(name, address = %keypair.address().short(), "Generated key");
    Ok(keypair)
}

/// Load the keypair stored under `name`.
pub fn load(config: &ShoalConfig, name: &str) -> Result<Keypair, Box<dyn std::error::Error>> {
    let path = secret_path(config, name);
    let contents = fs::read_to_string(&path).map_err(|e| {
        ShoalError::Config(format!(
            "Cannot read key {:?} at {}: {} (run `shoal keygen --name {}`)",
            name,
            path.display(),
            e,
            name
        ))
    })?;
    Ok(Keypair::from_secret_hex(&contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_config() -> ShoalConfig {
        let dir = std::env::temp_dir().join(format!("shoal_keys_{}", Uuid::now_v7()));
        ShoalConfig {
            keys_dir: dir.to_string_lossy().to_string(),
            ..ShoalConfig::default()
        }
    }

    #[test]
    fn test_generate_then_load() {
        let config = temp_config();
        let generated = generate(&config, "alice", false).unwrap();
        let loaded = load(&config, "alice").unwrap();
        assert_eq!(generated.address(), loaded.address());
        let _ = fs::remove_dir_all(config.keys_path());
    }

    #[test]
    fn test_generate_refuses_overwrite() {
        let config = temp_config();
        let first = generate(&config, "bob", false).unwrap();
        assert!(generate(&config, "bob", false).is_err());
        let second = generate(&config, "bob", true).unwrap();
        assert_ne!(first.address(), second.address());
        let _ = fs::remove_dir_all(config.keys_path());
    }

    #[test]
    fn test_load_missing_key() {
        let config = temp_config();
        assert!(load(&config, "nobody").is_err());
    }
}
