//! Fan-out of branch colors across universes
//!
//! The [`UniverseCoordinator`] owns one frame buffer, queue and sender thread
//! per universe. Writes go to the buffer of the branch's universe;
//! [`send_all`](UniverseCoordinator::send_all) snapshots every buffer onto its
//! queue and returns immediately.
//!
//! ```rust,no_run
//! use aurora_core::{AuroraConfig, TopologyIndex};
//! use aurora_dmx::{FileLink, SerialLink, UniverseCoordinator};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AuroraConfig::load(Path::new("aurora.toml"))?;
//! let topology = TopologyIndex::resolve(&config.topology_params()?)?;
//! let links: Vec<Box<dyn SerialLink>> = topology
//!     .link_ids()
//!     .iter()
//!     .map(|path| Box::new(FileLink::new(path)) as Box<dyn SerialLink>)
//!     .collect();
//!
//! let mut dmx = UniverseCoordinator::new(topology, links, config.transmit)?;
//! dmx.set_branch_rgb(0, (255, 128, 0))?;
//! dmx.send_all();
//! # Ok(())
//! # }
//! ```

use aurora_core::{Branch, TopologyIndex, TransmitConfig};
use std::collections::HashSet;
use std::thread::JoinHandle;
use tracing::{error, info, warn};

use crate::color::{hsv_to_rgb, normalized_to_byte};
use crate::error::{DmxError, Result};
use crate::frame::{DmxFrame, FrameBuffer};
use crate::link::SerialLink;
use crate::queue::{transmission_queue, FrameProducer};
use crate::sender::{LinkSender, LinkStats, SharedLinkStats};

/// Outcome of one [`UniverseCoordinator::send_all`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendSummary {
    /// Universes that accepted the frame
    pub queued: usize,
    /// Universes whose queue was full or closed
    pub dropped: usize,
}

struct Universe {
    name: String,
    buffer: FrameBuffer,
    producer: Option<FrameProducer>,
    stats: SharedLinkStats,
    worker: Option<JoinHandle<()>>,
}

/// Routes branch writes to universes and triggers transmission
pub struct UniverseCoordinator {
    topology: TopologyIndex,
    universes: Vec<Universe>,
    warned_links: HashSet<usize>,
    unrouted_writes: u64,
}

impl UniverseCoordinator {
    /// Start one sender thread per transport. `links[n]` serves universe `n`.
    ///
    /// # Errors
    ///
    /// `Spawn` if a sender thread cannot be started; senders already running
    /// are shut down.
    pub fn new(
        topology: TopologyIndex,
        links: Vec<Box<dyn SerialLink>>,
        config: TransmitConfig,
    ) -> Result<Self> {
        if links.len() < topology.link_ids().len() {
            warn!(
                "{} universe(s) configured but only {} transport(s) given",
                topology.link_ids().len(),
                links.len()
            );
        }

        let mut coordinator = Self {
            topology,
            universes: Vec::with_capacity(links.len()),
            warned_links: HashSet::new(),
            unrouted_writes: 0,
        };

        for (link_id, link) in links.into_iter().enumerate() {
            let (producer, consumer) = transmission_queue(link_id, config.capacity());
            let stats = SharedLinkStats::default();
            let name = link.name().to_string();
            let worker = LinkSender::new(link, consumer, config, stats.clone()).spawn()?;

            coordinator.universes.push(Universe {
                name,
                buffer: FrameBuffer::new(),
                producer: Some(producer),
                stats,
                worker: Some(worker),
            });
        }

        info!(
            "DMX coordinator started: {} universe(s), {} branches",
            coordinator.universes.len(),
            coordinator.topology.len()
        );
        Ok(coordinator)
    }

    pub fn topology(&self) -> &TopologyIndex {
        &self.topology
    }

    /// Number of running universes
    pub fn link_count(&self) -> usize {
        self.universes.len()
    }

    /// Transport name of a universe
    pub fn link_name(&self, link: usize) -> Option<&str> {
        self.universes.get(link).map(|u| u.name.as_str())
    }

    /// Set a branch to an RGB color
    ///
    /// # Errors
    ///
    /// `UnitIndexOutOfRange` if `index` is not in the topology.
    pub fn set_branch_rgb(&mut self, index: usize, (r, g, b): (u8, u8, u8)) -> Result<()> {
        self.write_branch(index, [r, g, b])
    }

    /// Set a branch from 0.0-1.0 levels; out-of-range levels are clamped
    ///
    /// # Errors
    ///
    /// `UnitIndexOutOfRange` if `index` is not in the topology.
    pub fn set_branch_rgb_normalized(
        &mut self,
        index: usize,
        (r, g, b): (f32, f32, f32),
    ) -> Result<()> {
        self.write_branch(
            index,
            [
                normalized_to_byte(r),
                normalized_to_byte(g),
                normalized_to_byte(b),
            ],
        )
    }

    /// Set a branch from hue, saturation and value, each 0.0-1.0
    ///
    /// # Errors
    ///
    /// `UnitIndexOutOfRange` if `index` is not in the topology.
    pub fn set_branch_hsv(&mut self, index: usize, (h, s, v): (f32, f32, f32)) -> Result<()> {
        self.set_branch_rgb_normalized(index, hsv_to_rgb(h, s, v))
    }

    /// Set a raw channel on one universe. Unknown universes are skipped.
    ///
    /// # Errors
    ///
    /// `AddressOutOfRange` if `address >= 512`.
    pub fn set_channel(&mut self, link: usize, address: usize, value: u8) -> Result<()> {
        match self.universes.get_mut(link) {
            Some(universe) => universe.buffer.set_channel(address, value),
            None => {
                note_unrouted(&mut self.warned_links, &mut self.unrouted_writes, link, None);
                Ok(())
            }
        }
    }

    fn write_branch(&mut self, index: usize, values: [u8; 3]) -> Result<()> {
        let branch = self
            .topology
            .branch(index)
            .ok_or(DmxError::UnitIndexOutOfRange {
                index,
                len: self.topology.len(),
            })?;

        let Some(universe) = self.universes.get_mut(branch.link_id) else {
            note_unrouted(
                &mut self.warned_links,
                &mut self.unrouted_writes,
                branch.link_id,
                Some(branch),
            );
            return Ok(());
        };

        for (&address, value) in branch.addresses.iter().zip(values) {
            universe.buffer.set_channel(usize::from(address), value)?;
        }
        Ok(())
    }

    /// Zero every channel on every universe (does not send)
    pub fn blackout(&mut self) {
        for universe in &mut self.universes {
            universe.buffer.clear();
        }
    }

    /// Queue a snapshot of every universe for transmission.
    ///
    /// Never blocks. A full queue drops the new frame for that universe.
    pub fn send_all(&self) -> SendSummary {
        let mut summary = SendSummary::default();

        for (link, universe) in self.universes.iter().enumerate() {
            let Some(producer) = &universe.producer else {
                continue;
            };

            match producer.try_enqueue(universe.buffer.snapshot()) {
                Ok(()) => {
                    summary.queued += 1;
                    universe.stats.write().frames_enqueued += 1;
                }
                Err(e) => {
                    summary.dropped += 1;
                    universe.stats.write().frames_dropped += 1;
                    match e {
                        DmxError::Backpressure { capacity, .. } => warn!(
                            "Universe {} queue > {} frames, dropping frame",
                            link, capacity
                        ),
                        other => warn!("Universe {}: {}", link, other),
                    }
                }
            }
        }

        summary
    }

    /// Current contents of a universe's buffer
    pub fn frame(&self, link: usize) -> Option<DmxFrame> {
        self.universes.get(link).map(|u| u.buffer.snapshot())
    }

    /// `(address, value)` of every non-zero channel on a universe
    pub fn nonzero_channels(&self, link: usize) -> Vec<(usize, u8)> {
        self.frame(link)
            .map(|frame| frame.nonzero_channels().collect())
            .unwrap_or_default()
    }

    /// Counters for a universe
    pub fn link_stats(&self, link: usize) -> Option<LinkStats> {
        self.universes.get(link).map(|u| *u.stats.read())
    }

    /// Writes skipped because their universe has no transport
    pub fn unrouted_writes(&self) -> u64 {
        self.unrouted_writes
    }

    /// Close every queue, let the senders drain them, and join the threads.
    /// Later `send_all` calls queue nothing.
    pub fn shutdown(&mut self) {
        for universe in &mut self.universes {
            universe.producer.take();
        }

        for (link, universe) in self.universes.iter_mut().enumerate() {
            if let Some(worker) = universe.worker.take() {
                if worker.join().is_err() {
                    error!("Link sender for universe {} panicked", link);
                }
            }
        }
    }
}

impl Drop for UniverseCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn note_unrouted(
    warned: &mut HashSet<usize>,
    count: &mut u64,
    link: usize,
    branch: Option<&Branch>,
) {
    *count += 1;
    if warned.insert(link) {
        match branch {
            Some(branch) => warn!(
                "Universe {} is not configured; writes to {} and its pod are skipped",
                link, branch.name
            ),
            None => warn!("Universe {} is not configured; writes are skipped", link),
        }
    }
}
