//! xc-config
//!
//! Configuration for the connector: which ledger server, which exchange
//! server, which ledger category tags the funding / spot-available /
//! spot-hold accounts carry.
//!
//! # Contract
//! - The YAML config file stores server locations and category ids only.
//! - Exchange API credentials live in a separate JSON file referenced from
//!   the config; `Debug` on [`Credentials`] redacts every field.
//! - Error messages reference file paths, never credential values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

mod category;

pub use category::Category;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Top-level connector configuration, loaded from one YAML file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub ledger: LedgerConfig,
    pub exchange: ExchangeConfig,
}

/// What the connector needs to talk to the bookkeeping ledger.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LedgerConfig {
    pub apikey: String,
    /// For example `http://ledger-host.example:3003`.
    pub base_url: String,

    /// Any account that is a funding account is tagged with this category.
    pub cat_funding: u32,
    /// ... spot available account is tagged with this category.
    pub cat_spot_available: u32,
    /// ... spot hold account is tagged with this category.
    pub cat_spot_hold: u32,
}

/// What the connector needs to talk to the exchange.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExchangeConfig {
    /// Path to the JSON credentials file. The file itself is loaded with
    /// [`load_credentials_file`]; the path is all the config carries.
    pub credentials: String,
    /// For example `https://www.exchange-host.example`.
    pub base_url: String,
}

/// Read and parse the YAML config file.
pub fn load_config_file(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let cfg: Config = serde_yaml::from_str(&raw)
        .with_context(|| format!("invalid config yaml: {}", path.display()))?;
    Ok(cfg)
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Exchange API credentials.
///
/// **Values are redacted in `Debug` output.** Never log fields of this
/// struct; error paths must reference the credentials *file*, not contents.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub api_key: String,
    pub secret_key: String,
    pub passphrase: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<REDACTED>")
            .field("secret_key", &"<REDACTED>")
            .field("passphrase", &"<REDACTED>")
            .finish()
    }
}

/// Read and parse the JSON credentials file referenced by
/// [`ExchangeConfig::credentials`].
pub fn load_credentials_file(path: impl AsRef<Path>) -> Result<Credentials> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read credentials file: {}", path.display()))?;
    let creds: Credentials = serde_json::from_str(&raw)
        .with_context(|| format!("invalid credentials json: {}", path.display()))?;
    Ok(creds)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
