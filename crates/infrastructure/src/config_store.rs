use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use domain::error::ConfigError;
use domain::settings::{self, PrinterSettings};

fn default_vendor_id() -> String {
    "0x0fe6".to_string()
}
fn default_product_id() -> String {
    "0x811e".to_string()
}
fn default_auto_max_count() -> u32 {
    10
}
fn default_auto_interval() -> f64 {
    1.0
}

/// The persisted configuration document.
///
/// Missing keys fill from defaults on load; unknown keys ride along in
/// `extra` and survive a load/save round trip untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardConfig {
    #[serde(default = "default_vendor_id")]
    pub vendor_id: String,
    #[serde(default = "default_product_id")]
    pub product_id: String,
    #[serde(default)]
    pub interface: u8,
    #[serde(default = "default_auto_max_count")]
    pub auto_max_count: u32,
    #[serde(default = "default_auto_interval")]
    pub auto_interval: f64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            vendor_id: default_vendor_id(),
            product_id: default_product_id(),
            interface: 0,
            auto_max_count: default_auto_max_count(),
            auto_interval: default_auto_interval(),
            extra: serde_json::Map::new(),
        }
    }
}

impl DashboardConfig {
    /// Parsed printer identity. Stored values that do not parse fall back
    /// per-field to the defaults, so a print attempt always has an identity
    /// to try.
    pub fn printer_settings(&self) -> PrinterSettings {
        PrinterSettings {
            vendor_id: settings::parse_hex_id(&self.vendor_id)
                .unwrap_or(settings::DEFAULT_VENDOR_ID),
            product_id: settings::parse_hex_id(&self.product_id)
                .unwrap_or(settings::DEFAULT_PRODUCT_ID),
            interface: self.interface,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if settings::parse_hex_id(&self.vendor_id).is_none() {
            return Err(ConfigError::InvalidVendorId(self.vendor_id.clone()));
        }
        if settings::parse_hex_id(&self.product_id).is_none() {
            return Err(ConfigError::InvalidProductId(self.product_id.clone()));
        }
        Ok(())
    }

    /// Settings-dialog boundary: validate every field, normalize a missing
    /// `0x` prefix, and mutate only when all fields pass.
    pub fn apply_settings_input(
        &mut self,
        vendor_id: &str,
        product_id: &str,
        interface: &str,
    ) -> Result<(), ConfigError> {
        let vendor = normalize_hex_input(vendor_id)
            .ok_or_else(|| ConfigError::InvalidVendorId(vendor_id.to_string()))?;
        let product = normalize_hex_input(product_id)
            .ok_or_else(|| ConfigError::InvalidProductId(product_id.to_string()))?;
        let interface: u8 = interface
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidInterface(interface.to_string()))?;
        self.vendor_id = vendor;
        self.product_id = product;
        self.interface = interface;
        Ok(())
    }
}

fn normalize_hex_input(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let prefixed = if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        trimmed.to_string()
    } else {
        format!("0x{trimmed}")
    };
    settings::parse_hex_id(&prefixed).map(|_| prefixed)
}

/// Loads and saves the dashboard configuration document.
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the config, merging defaults over any missing key. A missing or
    /// corrupt file falls back entirely to defaults; the error stays here.
    pub async fn load(&self) -> DashboardConfig {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(config) => config,
                Err(err) => {
                    warn!("corrupt config {:?}, using defaults: {err}", self.path);
                    DashboardConfig::default()
                }
            },
            Err(err) => {
                if err.kind() != ErrorKind::NotFound {
                    warn!("config {:?} not readable, using defaults: {err}", self.path);
                }
                DashboardConfig::default()
            }
        }
    }

    /// Validate and persist. Writes a sibling temp file and renames it into
    /// place so a crash mid-write cannot corrupt the document.
    pub async fn save(&self, config: &DashboardConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = serde_json::to_vec_pretty(config)
            .map_err(|err| ConfigError::SaveFailed(err.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|err| ConfigError::SaveFailed(err.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|err| ConfigError::SaveFailed(err.to_string()))?;
        Ok(())
    }
}
