//! Config file model and loader
//!
//! The file describes universes, transmit timing, logging and the pod layout.
//! Only [`TopologyParams`] and [`TransmitConfig`] leave this module; the rest
//! of the system never sees the file format.
//!
//! ```toml
//! [dmx]
//! universes = ["/dev/ttyUSB0"]
//!
//! [[pods]]
//! name = "A"
//! universe = 0
//! boards = [1, 33, 65, 97]
//!
//! [pods.branches]
//! "1-0" = [0, 1, 2, 3]   # limb 1, position 0 = board 0, channels 1/2/3
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{ConfigError, Result};
use crate::logging::LogConfig;
use crate::topology::{BranchParams, PodParams, TopologyParams};

/// Transmission timing and queueing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransmitConfig {
    /// Frames buffered per universe before new frames are dropped
    pub queue_capacity: usize,
    /// Line break held before each frame (protocol minimum is 88us)
    pub break_micros: u64,
    /// Idle time between clearing the break and the start code
    pub mark_after_break_micros: u64,
    pub baud_rate: u32,
}

impl Default for TransmitConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10,
            break_micros: 500,
            mark_after_break_micros: 0,
            baud_rate: 250_000,
        }
    }
}

impl TransmitConfig {
    pub fn break_duration(&self) -> Duration {
        Duration::from_micros(self.break_micros)
    }

    pub fn mark_after_break(&self) -> Duration {
        Duration::from_micros(self.mark_after_break_micros)
    }

    /// Queue capacity, never zero
    pub fn capacity(&self) -> usize {
        self.queue_capacity.max(1)
    }
}

/// `[dmx]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DmxSection {
    /// One transport identifier per universe
    pub universes: Vec<String>,
}

/// `[[pods]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodSection {
    pub name: String,
    pub universe: usize,
    /// Start address per board
    pub boards: Vec<u16>,
    /// `"<limb>-<position>" = [board, r, g, b]`
    #[serde(default)]
    pub branches: BTreeMap<String, [u16; 4]>,
}

/// Top-level config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuroraConfig {
    pub dmx: DmxSection,
    #[serde(default)]
    pub transmit: TransmitConfig,
    #[serde(default)]
    pub logging: LogConfig,
    #[serde(default)]
    pub pods: Vec<PodSection>,
}

impl AuroraConfig {
    /// Load a config file; format follows the extension (`.toml` or `.json`).
    ///
    /// # Errors
    ///
    /// I/O and parse errors, `UnsupportedFormat` for other extensions, and
    /// `NoUniverses` when the file configures no universe.
    pub fn load(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let text = fs::read_to_string(path)?;
        let config = match extension.as_str() {
            "toml" => Self::from_toml(&text)?,
            "json" => serde_json::from_str::<Self>(&text)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        config.validate()?;
        info!(
            "Loaded config {:?}: {} universe(s), {} pod(s)",
            path,
            config.dmx.universes.len(),
            config.pods.len()
        );
        Ok(config)
    }

    /// Parse TOML text
    ///
    /// # Errors
    ///
    /// TOML syntax or schema errors.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    fn validate(&self) -> Result<()> {
        if self.dmx.universes.is_empty() {
            return Err(ConfigError::NoUniverses);
        }
        Ok(())
    }

    /// Convert the file model into topology parameters.
    ///
    /// # Errors
    ///
    /// `InvalidBranchKey` for keys that are not `<limb>-<position>`.
    pub fn topology_params(&self) -> Result<TopologyParams> {
        let pods = self
            .pods
            .iter()
            .map(|pod| {
                let branches = pod
                    .branches
                    .iter()
                    .map(|(key, &[board, r, g, b])| {
                        let (limb, position) = parse_branch_key(key)?;
                        Ok(BranchParams {
                            limb,
                            position,
                            board: usize::from(board),
                            channels: [r, g, b],
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;

                Ok(PodParams {
                    name: pod.name.clone(),
                    link_id: pod.universe,
                    board_starts: pod.boards.clone(),
                    branches,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(TopologyParams {
            links: self.dmx.universes.clone(),
            pods,
        })
    }
}

/// `"2-4"` -> `(2, 4)`
fn parse_branch_key(key: &str) -> Result<(u32, u32)> {
    let invalid = || ConfigError::InvalidBranchKey(key.to_string());
    let (limb, position) = key.split_once('-').ok_or_else(invalid)?;
    let limb = limb.trim().parse().map_err(|_| invalid())?;
    let position = position.trim().parse().map_err(|_| invalid())?;
    Ok((limb, position))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[dmx]
universes = ["/dev/ttyUSB0", "/dev/ttyUSB1"]

[transmit]
queue_capacity = 12

[[pods]]
name = "A"
universe = 0
boards = [1, 33]

[pods.branches]
"1-0" = [0, 1, 2, 3]
"1-1" = [0, 4, 5, 6]
"10-0" = [1, 1, 2, 3]

[[pods]]
name = "E"
universe = 1
boards = [1]

[pods.branches]
"1-0" = [0, 1, 2, 3]
"#;

    #[test]
    fn test_parse_branch_key() {
        assert_eq!(parse_branch_key("1-0").unwrap(), (1, 0));
        assert_eq!(parse_branch_key("10-4").unwrap(), (10, 4));
        assert!(parse_branch_key("branch").is_err());
        assert!(parse_branch_key("1-x").is_err());
        assert!(parse_branch_key("-1").is_err());
    }

    #[test]
    fn test_from_toml() {
        let config = AuroraConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.dmx.universes.len(), 2);
        assert_eq!(config.transmit.queue_capacity, 12);
        assert_eq!(config.transmit.break_micros, 500);
        assert_eq!(config.pods.len(), 2);
        assert_eq!(config.pods[0].branches["1-1"], [0, 4, 5, 6]);
    }

    #[test]
    fn test_topology_params() {
        let params = AuroraConfig::from_toml(SAMPLE)
            .unwrap()
            .topology_params()
            .unwrap();

        assert_eq!(params.links, vec!["/dev/ttyUSB0", "/dev/ttyUSB1"]);
        assert_eq!(params.pods[1].link_id, 1);
        let limb_ten = params.pods[0]
            .branches
            .iter()
            .find(|b| b.limb == 10)
            .unwrap();
        assert_eq!(limb_ten.board, 1);
        assert_eq!(limb_ten.channels, [1, 2, 3]);
    }

    #[test]
    fn test_transmit_defaults() {
        let transmit = TransmitConfig::default();
        assert_eq!(transmit.break_duration(), Duration::from_micros(500));
        assert_eq!(transmit.mark_after_break(), Duration::ZERO);
        assert_eq!(transmit.baud_rate, 250_000);

        let zero = TransmitConfig {
            queue_capacity: 0,
            ..TransmitConfig::default()
        };
        assert_eq!(zero.capacity(), 1);
    }
}
