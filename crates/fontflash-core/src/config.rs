//! Tool configuration, loaded from a TOML file.
//!
//! ```toml
//! [flash]
//! port = "/dev/ttyUSB0"
//! baud_rate = 115200
//! input = "assets/CH_Font.bin"
//!
//! [flash.timings]
//! erase_timeout_ms = 15000
//!
//! [convert]
//! input_font_c = "assets/CH_Font_Data.h"
//! bytes_per_glyph = 32
//! ```
//!
//! Every field is optional and falls back to the values the firmware
//! expects by default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::constants::*;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "fontflash.toml";

/// Top-level configuration for both tools.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub flash: FlashConfig,
    pub convert: ConvertConfig,
}

impl ToolConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: ToolConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, using the defaults when the file does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }

    /// Save configuration to a TOML file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.flash.block_size == 0 {
            return Err(ConfigError::Invalid {
                field: "flash.block_size",
                message: "must be greater than zero".into(),
            });
        }
        if self.flash.baud_rate == 0 {
            return Err(ConfigError::Invalid {
                field: "flash.baud_rate",
                message: "must be greater than zero".into(),
            });
        }
        if self.convert.bytes_per_glyph == 0 {
            return Err(ConfigError::Invalid {
                field: "convert.bytes_per_glyph",
                message: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

/// Serial transfer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlashConfig {
    /// Serial port name (`COM7`, `/dev/ttyUSB0`, ...).
    pub port: String,
    pub baud_rate: u32,
    /// Font binary to send.
    pub input: PathBuf,
    /// Must match the receiver's staging buffer.
    pub block_size: usize,
    pub timings: ProtocolTimings,
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            input: PathBuf::from("assets/CH_Font.bin"),
            block_size: DEFAULT_BLOCK_SIZE,
            timings: ProtocolTimings::default(),
        }
    }
}

/// Handshake deadlines, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolTimings {
    pub ready_timeout_ms: u64,
    pub ack_timeout_ms: u64,
    pub erase_timeout_ms: u64,
    pub completion_timeout_ms: u64,
    pub post_ack_delay_ms: u64,
}

impl Default for ProtocolTimings {
    fn default() -> Self {
        Self {
            ready_timeout_ms: READY_TIMEOUT_MS,
            ack_timeout_ms: ACK_TIMEOUT_MS,
            erase_timeout_ms: ERASE_TIMEOUT_MS,
            completion_timeout_ms: COMPLETION_TIMEOUT_MS,
            post_ack_delay_ms: POST_ACK_DELAY_MS,
        }
    }
}

impl ProtocolTimings {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    pub fn erase_timeout(&self) -> Duration {
        Duration::from_millis(self.erase_timeout_ms)
    }

    pub fn completion_timeout(&self) -> Duration {
        Duration::from_millis(self.completion_timeout_ms)
    }

    pub fn post_ack_delay(&self) -> Duration {
        Duration::from_millis(self.post_ack_delay_ms)
    }
}

/// Font table conversion settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// C source holding the glyph table.
    pub input_font_c: PathBuf,
    pub output_bin: PathBuf,
    pub output_index: PathBuf,
    pub bytes_per_glyph: usize,
    pub layout: HeaderLayout,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            input_font_c: PathBuf::from("assets/CH_Font_Data.h"),
            output_bin: PathBuf::from("assets/CH_Font.bin"),
            output_index: PathBuf::from("assets/CH_Font_Index.h"),
            bytes_per_glyph: 32,
            layout: HeaderLayout::default(),
        }
    }
}

/// Constants emitted verbatim into the index header for the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderLayout {
    /// Flash address of the first glyph.
    pub base_addr: u32,
    pub width: u16,
    pub height: u16,
    /// Number of glyphs the firmware keeps in its RAM cache.
    pub cache_size: u16,
}

impl Default for HeaderLayout {
    fn default() -> Self {
        Self {
            base_addr: 0x000000,
            width: 16,
            height: 16,
            cache_size: 32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_firmware() {
        let config = ToolConfig::default();
        assert_eq!(config.flash.baud_rate, 115_200);
        assert_eq!(config.flash.block_size, 256);
        assert_eq!(config.flash.timings.ready_timeout(), Duration::from_secs(5));
        assert_eq!(config.flash.timings.erase_timeout(), Duration::from_secs(10));
        assert_eq!(config.flash.timings.post_ack_delay(), Duration::from_millis(2));
        assert_eq!(config.convert.bytes_per_glyph, 32);
        assert_eq!(config.convert.layout.cache_size, 32);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fontflash.toml");
        std::fs::write(
            &path,
            "[flash]\nport = \"COM3\"\n\n[flash.timings]\nerase_timeout_ms = 15000\n",
        )
        .unwrap();

        let config = ToolConfig::load_from_file(&path).unwrap();
        assert_eq!(config.flash.port, "COM3");
        assert_eq!(config.flash.baud_rate, 115_200);
        assert_eq!(config.flash.timings.erase_timeout_ms, 15_000);
        assert_eq!(config.flash.timings.ack_timeout_ms, 3_000);
        assert_eq!(config.convert, ConvertConfig::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.toml");
        let mut config = ToolConfig::default();
        config.flash.input = PathBuf::from("font.bin");
        config.convert.layout.base_addr = 0x10000;

        config.save_to_file(&path).unwrap();
        let loaded = ToolConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ToolConfig::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, ToolConfig::default());
    }

    #[test]
    fn test_zero_block_size_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[flash]\nblock_size = 0\n").unwrap();

        let err = ToolConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "flash.block_size",
                ..
            }
        ));
    }
}
