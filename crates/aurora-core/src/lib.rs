//! Aurora Core - topology and configuration for the Aurora lighting rig
//!
//! The rig is a fixed set of RGB light strips ("branches") mounted on pipes
//! ("limbs") and wired to DMX-32 boards grouped into "pods". Each pod sits on
//! one DMX universe. This crate turns the configured layout into a flat,
//! immutable [`TopologyIndex`] whose positions are the addressing handles used
//! by the rest of the system.
//!
//! ## Modules
//!
//! - [`topology`] - Branch/Limb/Pod model and address resolution
//! - [`config`] - Config file model and loader
//! - [`logging`] - Logging configuration
//! - [`error`] - Error types

pub mod config;
pub mod error;
pub mod logging;
pub mod topology;

pub use config::{AuroraConfig, TransmitConfig};
pub use error::{ConfigError, Result};
pub use logging::LogConfig;
pub use topology::{
    Branch, BranchParams, Limb, Pod, PodParams, TopologyIndex, TopologyParams, DMX_ADDRESSES,
    MAX_LOCAL_CHANNEL,
};
