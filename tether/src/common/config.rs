/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::path::Path;
use std::time::Duration;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::remote::protocol::{Format, MAX_FRAME_SIZE};

/// Configuration for a tether engine and its transport.
///
/// Loaded from TOML in the XDG config directory (`$XDG_CONFIG_HOME/tether/config.toml`).
/// Every section and field is optional; missing values take the defaults below.
///
/// ```toml
/// [limits]
/// mailbox_capacity = 255
/// max_connections = 128
/// max_frame_size = 1048576
///
/// [timeouts]
/// dial_timeout_ms = 5000
/// write_timeout_ms = 5000
/// actor_shutdown_timeout_ms = 10000
///
/// [transport]
/// format = "json"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TetherConfig {
    /// Capacity limits.
    pub limits: LimitsConfig,
    /// Timeouts, in milliseconds.
    pub timeouts: TimeoutConfig,
    /// Wire settings for outbound frames.
    pub transport: TransportConfig,
}

/// Limits and capacity configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Bounded MPSC capacity of every actor mailbox.
    pub mailbox_capacity: usize,
    /// Maximum concurrently served inbound connections.
    pub max_connections: usize,
    /// Largest accepted frame payload in bytes, capped at 16 MiB.
    pub max_frame_size: usize,
}

/// Timeout-related configuration values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upper bound on opening an outbound connection.
    pub dial_timeout_ms: u64,
    /// Upper bound on writing one frame.
    pub write_timeout_ms: u64,
    /// How long `Engine::shutdown` waits for each actor to tear down.
    pub actor_shutdown_timeout_ms: u64,
}

/// Transport configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Serialization used for outbound envelopes. Inbound frames carry their own format byte.
    pub format: Format,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 255,
            max_connections: 128,
            max_frame_size: 1024 * 1024,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            dial_timeout_ms: 5_000,
            write_timeout_ms: 5_000,
            actor_shutdown_timeout_ms: 10_000,
        }
    }
}

impl TetherConfig {
    /// Dial timeout as a `Duration`.
    #[must_use]
    pub const fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.dial_timeout_ms)
    }

    /// Write timeout as a `Duration`.
    #[must_use]
    pub const fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.write_timeout_ms)
    }

    /// Per-actor shutdown timeout as a `Duration`.
    #[must_use]
    pub const fn actor_shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.actor_shutdown_timeout_ms)
    }

    /// The configured frame limit, never above the protocol's hard cap.
    #[must_use]
    pub fn max_frame_size(&self) -> usize {
        self.limits.max_frame_size.min(MAX_FRAME_SIZE)
    }

    /// Load configuration from XDG-compliant locations
    ///
    /// Looks for `tether/config.toml` under the XDG config directories. If no file is
    /// found, returns the default configuration. A file that exists but cannot be read
    /// or parsed is logged and the defaults are used.
    pub fn load() -> Self {
        use tracing::{error, info};

        let xdg_dirs = match xdg::BaseDirectories::with_prefix("tether") {
            Ok(dirs) => dirs,
            Err(e) => {
                error!("Failed to initialize XDG directories: {}", e);
                return Self::default();
            }
        };

        match xdg_dirs.find_config_file("config.toml") {
            Some(path) => Self::load_from(&path),
            None => {
                info!("No configuration file found, using defaults");
                Self::default()
            }
        }
    }

    /// Load configuration from an explicit TOML file, falling back to defaults on error.
    pub fn load_from(path: &Path) -> Self {
        use tracing::{error, info};

        info!("Loading configuration from: {}", path.display());
        match std::fs::read_to_string(path) {
            Ok(config_str) => match toml::from_str::<Self>(&config_str) {
                Ok(config) => {
                    info!("Successfully loaded configuration");
                    config
                }
                Err(e) => {
                    error!("Failed to parse configuration file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                error!("Failed to read configuration file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

lazy_static! {
    /// Global configuration instance loaded from XDG-compliant locations
    pub static ref CONFIG: TetherConfig = TetherConfig::load();
}

/// Settings for one [`Engine`](crate::Engine).
///
/// Without a listen address the engine is local-only and every send to a foreign
/// address is a dead letter.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// `host:port` to bind the transport on. Port `0` picks a free port.
    pub listen_address: Option<String>,
    /// Limits and timeouts.
    pub settings: TetherConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            listen_address: None,
            settings: CONFIG.clone(),
        }
    }
}

impl EngineConfig {
    /// Binds the transport on `address` when the engine launches.
    #[must_use]
    pub fn with_listen_address(mut self, address: impl Into<String>) -> Self {
        self.listen_address = Some(address.into());
        self
    }

    /// Replaces the loaded settings.
    #[must_use]
    pub fn with_settings(mut self, settings: TetherConfig) -> Self {
        self.settings = settings;
        self
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults() {
        let config = TetherConfig::default();
        assert_eq!(config.limits.mailbox_capacity, 255);
        assert_eq!(config.limits.max_connections, 128);
        assert_eq!(config.max_frame_size(), 1024 * 1024);
        assert_eq!(config.dial_timeout(), Duration::from_secs(5));
        assert_eq!(config.actor_shutdown_timeout(), Duration::from_secs(10));
        assert_eq!(config.transport.format, Format::Json);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[limits]\nmailbox_capacity = 8\n\n[timeouts]\ndial_timeout_ms = 250").unwrap();

        let config = TetherConfig::load_from(file.path());
        assert_eq!(config.limits.mailbox_capacity, 8);
        assert_eq!(config.limits.max_connections, 128);
        assert_eq!(config.dial_timeout(), Duration::from_millis(250));
        assert_eq!(config.write_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "limits = \"not a table\"").unwrap();

        assert_eq!(TetherConfig::load_from(file.path()), TetherConfig::default());
    }

    #[test]
    fn frame_limit_is_capped() {
        let mut config = TetherConfig::default();
        config.limits.max_frame_size = usize::MAX;
        assert_eq!(config.max_frame_size(), MAX_FRAME_SIZE);
    }
}
