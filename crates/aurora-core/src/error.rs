//! Error types for topology resolution and config loading
use thiserror::Error;

/// Configuration errors. All of these are fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A local channel above 32, or a resolved address outside 0..=511
    #[error(
        "channel out of range for branch {branch}: local channel {local_channel} on board starting at {board_start}"
    )]
    ChannelOutOfRange {
        branch: String,
        local_channel: u16,
        board_start: u16,
    },

    /// Branch references a board with no configured start address
    #[error("branch {branch} references board {board}, but its pod only has {boards} boards")]
    UnknownBoard {
        branch: String,
        board: usize,
        boards: usize,
    },

    /// Same limb/position configured twice in one pod
    #[error("duplicate branch: {0}")]
    DuplicateBranch(String),

    /// Positions within a limb must run 0..n without holes
    #[error("limb {limb} is missing position {expected} (next configured position is {found})")]
    PositionGap {
        limb: String,
        expected: u32,
        found: u32,
    },

    /// Branch key that is not `<limb>-<position>`
    #[error("invalid branch key: {0:?} (expected \"<limb>-<position>\")")]
    InvalidBranchKey(String),

    /// Same pod name configured twice
    #[error("duplicate pod: {0}")]
    DuplicatePod(String),

    /// No DMX universes configured
    #[error("no universes configured")]
    NoUniverses,

    /// Config file extension we don't know how to parse
    #[error("unsupported config format: {0:?}")]
    UnsupportedFormat(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parse error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for config operations
pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_out_of_range_display() {
        let err = ConfigError::ChannelOutOfRange {
            branch: "A-1-0".to_string(),
            local_channel: 33,
            board_start: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("A-1-0"));
        assert!(msg.contains("33"));
    }

    #[test]
    fn test_invalid_key_display() {
        let err = ConfigError::InvalidBranchKey("branch-x".to_string());
        assert!(err.to_string().contains("branch-x"));
    }
}
