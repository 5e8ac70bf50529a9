//! Aurora DMX - frame buffers and serial DMX512 output
//!
//! This crate turns branch colors into DMX512 frames and puts them on the
//! wire:
//! - **Frames**: one 513-byte buffer per universe (start code + 512 channels)
//! - **Queues**: bounded, non-blocking hand-off to the sender
//! - **Senders**: one thread per universe doing break + frame writes
//! - **Coordinator**: routes branch writes and triggers sends
//!
//! ## Modules
//!
//! - [`frame`] - Frame buffer and snapshots
//! - [`queue`] - Bounded transmission queue
//! - [`link`] - Transport trait, memory and file links
//! - [`serial`] - Serial port link for USB-DMX adapters
//! - [`sender`] - Per-universe sender thread
//! - [`coordinator`] - Universe coordinator
//! - [`color`] - Level and HSV conversions
//! - [`error`] - Error types

pub mod color;
pub mod coordinator;
pub mod error;
pub mod frame;
pub mod link;
pub mod queue;
pub mod sender;
pub mod serial;

pub use coordinator::{SendSummary, UniverseCoordinator};
pub use error::{DmxError, Result, TransportError};
pub use frame::{DmxFrame, FrameBuffer, FRAME_LEN, START_CODE};
pub use link::{FileLink, LinkEvent, MemoryLink, MemoryLinkHandle, SerialLink};
pub use queue::{transmission_queue, FrameConsumer, FrameProducer};
pub use sender::{LinkSender, LinkStats, SharedLinkStats};
pub use serial::{SerialPortLink, DMX_BAUD};
