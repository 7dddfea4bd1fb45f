use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_VENDOR_ID: u16 = 0x0fe6;
pub const DEFAULT_PRODUCT_ID: u16 = 0x811e;
pub const DEFAULT_INTERFACE: u8 = 0;

/// USB identity of the printer, in parsed form.
///
/// Immutable within a single print job: a settings change closes any open
/// transport handle so the next job reconnects with the new identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterSettings {
    pub vendor_id: u16,
    pub product_id: u16,
    pub interface: u8,
}

impl Default for PrinterSettings {
    fn default() -> Self {
        Self {
            vendor_id: DEFAULT_VENDOR_ID,
            product_id: DEFAULT_PRODUCT_ID,
            interface: DEFAULT_INTERFACE,
        }
    }
}

/// Parse a USB id such as "0x0fe6" or "0fe6".
pub fn parse_hex_id(raw: &str) -> Option<u16> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u16::from_str_radix(digits, 16).ok()
}

/// Parameters of one auto run, validated at the moment the run starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoRunConfig {
    pub max_count: u32,
    pub interval: Duration,
}

impl AutoRunConfig {
    pub const MIN_INTERVAL_SECS: f64 = 0.1;
    pub const DEFAULT_INTERVAL_SECS: f64 = 1.0;

    /// Clamp user input into the valid range: max_count below 1 becomes 1,
    /// interval below 100ms becomes 100ms, a non-finite interval falls back
    /// to the 1s default.
    pub fn clamped(max_count: u32, interval_secs: f64) -> Self {
        let interval_secs = if interval_secs.is_finite() {
            interval_secs.max(Self::MIN_INTERVAL_SECS)
        } else {
            Self::DEFAULT_INTERVAL_SECS
        };
        Self {
            max_count: max_count.max(1),
            interval: Duration::from_secs_f64(interval_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_id_with_prefix() {
        assert_eq!(parse_hex_id("0x0fe6"), Some(0x0fe6));
        assert_eq!(parse_hex_id("0X811E"), Some(0x811e));
    }

    #[test]
    fn test_parse_hex_id_without_prefix() {
        assert_eq!(parse_hex_id("811e"), Some(0x811e));
        assert_eq!(parse_hex_id("  0fe6 "), Some(0x0fe6));
    }

    #[test]
    fn test_parse_hex_id_rejects_garbage() {
        assert_eq!(parse_hex_id("zzzz"), None);
        assert_eq!(parse_hex_id(""), None);
        assert_eq!(parse_hex_id("0x"), None);
        assert_eq!(parse_hex_id("123456"), None); // overflows u16
    }

    #[test]
    fn test_clamp_max_count_floor() {
        let config = AutoRunConfig::clamped(0, 1.0);
        assert_eq!(config.max_count, 1);
    }

    #[test]
    fn test_clamp_interval_floor() {
        let config = AutoRunConfig::clamped(10, 0.01);
        assert_eq!(config.interval, Duration::from_millis(100));
    }

    #[test]
    fn test_non_finite_interval_falls_back_to_default() {
        let config = AutoRunConfig::clamped(10, f64::NAN);
        assert_eq!(config.interval, Duration::from_secs(1));
        let config = AutoRunConfig::clamped(10, f64::INFINITY);
        assert_eq!(config.interval, Duration::from_secs(1));
    }

    #[test]
    fn test_valid_input_passes_through() {
        let config = AutoRunConfig::clamped(25, 0.5);
        assert_eq!(config.max_count, 25);
        assert_eq!(config.interval, Duration::from_millis(500));
    }
}
