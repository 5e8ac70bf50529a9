//! Per-universe sender thread
//!
//! Each universe gets one [`LinkSender`] that drains its queue and puts
//! every frame on the wire: break, optional mark-after-break, then all 513
//! bytes. Transport failures are logged and counted; the sender keeps
//! running and retries the open on the next frame.

use aurora_core::TransmitConfig;
use parking_lot::RwLock;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, trace, warn};

use crate::error::{DmxError, Result, TransportError};
use crate::frame::DmxFrame;
use crate::link::SerialLink;
use crate::queue::FrameConsumer;

/// Per-universe counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub frames_enqueued: u64,
    pub frames_dropped: u64,
    pub frames_sent: u64,
    pub write_errors: u64,
    pub open_failures: u64,
}

/// Counters shared between the coordinator and the sender thread
pub type SharedLinkStats = Arc<RwLock<LinkStats>>;

/// Drains one universe's queue onto its transport
pub struct LinkSender {
    link_id: usize,
    link: Box<dyn SerialLink>,
    consumer: FrameConsumer,
    config: TransmitConfig,
    stats: SharedLinkStats,
    opened: bool,
    open_failing: bool,
}

impl LinkSender {
    pub fn new(
        link: Box<dyn SerialLink>,
        consumer: FrameConsumer,
        config: TransmitConfig,
        stats: SharedLinkStats,
    ) -> Self {
        Self {
            link_id: consumer.link(),
            link,
            consumer,
            config,
            stats,
            opened: false,
            open_failing: false,
        }
    }

    /// Run on a dedicated thread until the queue is closed
    ///
    /// # Errors
    ///
    /// `Spawn` if the OS refuses the thread.
    pub fn spawn(self) -> Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(format!("dmx-link-{}", self.link_id))
            .spawn(move || self.run())
            .map_err(DmxError::Spawn)
    }

    /// Send frames until the queue is closed and drained
    pub fn run(mut self) {
        info!(
            "Link sender for universe {} started on {}",
            self.link_id,
            self.link.name()
        );

        while let Some(frame) = self.consumer.dequeue_blocking() {
            self.transmit(&frame);
        }

        if self.opened {
            self.link.close();
        }
        info!("Link sender for universe {} stopped", self.link_id);
    }

    fn transmit(&mut self, frame: &DmxFrame) {
        if let Err(e) = self.ensure_open() {
            self.stats.write().open_failures += 1;
            // Only the first failure in a row is worth a warning
            if self.open_failing {
                debug!("Universe {} still unavailable: {}", self.link_id, e);
            } else {
                warn!("Universe {} unavailable, dropping frames: {}", self.link_id, e);
                self.open_failing = true;
            }
            return;
        }

        match self.write_frame(frame) {
            Ok(()) => {
                self.stats.write().frames_sent += 1;
                trace!("Sent DMX frame on universe {}", self.link_id);
            }
            Err(e) => {
                self.stats.write().write_errors += 1;
                warn!("Universe {} write failed: {}", self.link_id, e);
                self.link.close();
                self.opened = false;
            }
        }
    }

    fn ensure_open(&mut self) -> std::result::Result<(), TransportError> {
        if self.opened {
            return Ok(());
        }

        self.link.open()?;
        if self.link.line_control() {
            if let Err(e) = self.link.configure_baud(self.config.baud_rate) {
                self.link.close();
                return Err(e);
            }
        }

        self.opened = true;
        if self.open_failing {
            info!("Universe {} reconnected on {}", self.link_id, self.link.name());
            self.open_failing = false;
        } else if self.link.line_control() {
            info!(
                "Universe {} opened {} at {} baud",
                self.link_id,
                self.link.name(),
                self.config.baud_rate
            );
        } else {
            warn!(
                "Universe {} opened {} without line control; writing raw frames, no break",
                self.link_id,
                self.link.name()
            );
        }
        Ok(())
    }

    fn write_frame(&mut self, frame: &DmxFrame) -> std::result::Result<(), TransportError> {
        if !self.link.line_control() {
            return self.link.write(frame.as_bytes());
        }

        self.link.assert_break()?;
        thread::sleep(self.config.break_duration());
        self.link.clear_break()?;

        let mark = self.config.mark_after_break();
        if !mark.is_zero() {
            thread::sleep(mark);
        }

        self.link.write(frame.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameBuffer;
    use crate::link::{FileLink, LinkEvent, MemoryLink};
    use tempfile::TempDir;
    use crate::queue::transmission_queue;

    fn quick_config() -> TransmitConfig {
        TransmitConfig {
            break_micros: 100,
            ..TransmitConfig::default()
        }
    }

    fn frame(marker: u8) -> DmxFrame {
        let mut buffer = FrameBuffer::new();
        buffer.set_channel(0, marker).unwrap();
        buffer.snapshot()
    }

    #[test]
    fn test_wire_sequence() {
        let (link, handle) = MemoryLink::new("mem0");
        let (tx, rx) = transmission_queue(0, 4);
        let stats = SharedLinkStats::default();

        tx.try_enqueue(frame(42)).unwrap();
        drop(tx);
        LinkSender::new(Box::new(link), rx, quick_config(), stats.clone()).run();

        let events = handle.events();
        assert_eq!(events[0], LinkEvent::Opened);
        assert_eq!(events[1], LinkEvent::Baud(250_000));
        assert_eq!(events[2], LinkEvent::BreakOn);
        assert_eq!(events[3], LinkEvent::BreakOff);
        match &events[4] {
            LinkEvent::Write(bytes) => {
                assert_eq!(bytes.len(), 513);
                assert_eq!(bytes[0], 0);
                assert_eq!(bytes[1], 42);
            }
            other => panic!("expected write, got {other:?}"),
        }
        assert_eq!(events[5], LinkEvent::Closed);
        assert_eq!(stats.read().frames_sent, 1);
    }

    #[test]
    fn test_frames_sent_in_order() {
        let (link, handle) = MemoryLink::new("mem0");
        let (tx, rx) = transmission_queue(0, 4);

        tx.try_enqueue(frame(1)).unwrap();
        tx.try_enqueue(frame(2)).unwrap();
        drop(tx);
        LinkSender::new(Box::new(link), rx, quick_config(), SharedLinkStats::default()).run();

        let markers: Vec<u8> = handle.writes().iter().map(|w| w[1]).collect();
        assert_eq!(markers, vec![1, 2]);
    }

    #[test]
    fn test_open_failure_is_not_fatal() {
        let (link, handle) = MemoryLink::new("mem0");
        handle.set_fail_open(true);
        let (tx, rx) = transmission_queue(0, 4);
        let stats = SharedLinkStats::default();

        let worker = LinkSender::new(Box::new(link), rx, quick_config(), stats.clone())
            .spawn()
            .unwrap();

        tx.try_enqueue(frame(1)).unwrap();
        tx.try_enqueue(frame(2)).unwrap();
        while stats.read().open_failures < 2 {
            thread::yield_now();
        }

        handle.set_fail_open(false);
        tx.try_enqueue(frame(3)).unwrap();
        drop(tx);
        worker.join().unwrap();

        assert_eq!(stats.read().open_failures, 2);
        assert_eq!(stats.read().frames_sent, 1);
        assert_eq!(handle.writes().len(), 1);
        assert_eq!(handle.writes()[0][1], 3);
    }

    #[test]
    fn test_write_failure_reopens() {
        let (link, handle) = MemoryLink::new("mem0");
        handle.set_fail_writes(true);
        let (tx, rx) = transmission_queue(0, 4);
        let stats = SharedLinkStats::default();

        let worker = LinkSender::new(Box::new(link), rx, quick_config(), stats.clone())
            .spawn()
            .unwrap();

        tx.try_enqueue(frame(1)).unwrap();
        while stats.read().write_errors < 1 {
            thread::yield_now();
        }

        handle.set_fail_writes(false);
        tx.try_enqueue(frame(2)).unwrap();
        drop(tx);
        worker.join().unwrap();

        let opens = handle
            .events()
            .iter()
            .filter(|e| **e == LinkEvent::Opened)
            .count();
        assert_eq!(opens, 2);
        assert_eq!(stats.read().write_errors, 1);
        assert_eq!(stats.read().frames_sent, 1);
    }

    #[test]
    fn test_raw_link_skips_baud_and_break() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("universe-0.dmx");
        let (tx, rx) = transmission_queue(0, 4);
        let stats = SharedLinkStats::default();

        tx.try_enqueue(frame(5)).unwrap();
        tx.try_enqueue(frame(6)).unwrap();
        drop(tx);
        LinkSender::new(Box::new(FileLink::new(&path)), rx, quick_config(), stats.clone()).run();

        let stats = *stats.read();
        assert_eq!(stats.frames_sent, 2);
        assert_eq!(stats.write_errors, 0);
        assert_eq!(stats.open_failures, 0);

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 2 * 513);
        assert_eq!(bytes[1], 5);
        assert_eq!(bytes[514], 6);
    }
}
