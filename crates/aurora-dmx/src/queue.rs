//! Bounded frame queue between the coordinator and a link sender
//!
//! The producer side never blocks: when the queue is full the new frame is
//! dropped and [`DmxError::Backpressure`] is returned. A stale light is fine;
//! a stalled animation loop is not. The consumer side blocks until a frame
//! arrives or every producer has been dropped.

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};

use crate::error::{DmxError, Result};
use crate::frame::DmxFrame;

/// Create a queue for universe `link` holding at most `capacity` frames
pub fn transmission_queue(link: usize, capacity: usize) -> (FrameProducer, FrameConsumer) {
    let capacity = capacity.max(1);
    let (tx, rx) = bounded(capacity);
    (
        FrameProducer { link, capacity, tx },
        FrameConsumer { link, rx },
    )
}

/// Sending half, owned by the coordinator. Dropping it closes the queue.
#[derive(Debug)]
pub struct FrameProducer {
    link: usize,
    capacity: usize,
    tx: Sender<DmxFrame>,
}

impl FrameProducer {
    /// Queue a frame without blocking.
    ///
    /// # Errors
    ///
    /// `Backpressure` when the queue is full (the frame is dropped),
    /// `QueueClosed` when the consumer is gone.
    pub fn try_enqueue(&self, frame: DmxFrame) -> Result<()> {
        self.tx.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => DmxError::Backpressure {
                link: self.link,
                capacity: self.capacity,
            },
            TrySendError::Disconnected(_) => DmxError::QueueClosed { link: self.link },
        })
    }

    /// Frames waiting to be sent
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn link(&self) -> usize {
        self.link
    }
}

/// Receiving half, owned by the link sender
#[derive(Debug)]
pub struct FrameConsumer {
    link: usize,
    rx: Receiver<DmxFrame>,
}

impl FrameConsumer {
    /// Wait for the next frame. `None` once the queue is closed and empty.
    pub fn dequeue_blocking(&self) -> Option<DmxFrame> {
        self.rx.recv().ok()
    }

    /// Next frame if one is waiting
    pub fn try_dequeue(&self) -> Option<DmxFrame> {
        match self.rx.try_recv() {
            Ok(frame) => Some(frame),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Discard every waiting frame, returning how many were dropped
    pub fn flush(&self) -> usize {
        self.rx.try_iter().count()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn link(&self) -> usize {
        self.link
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameBuffer;

    fn frame(marker: u8) -> DmxFrame {
        let mut buffer = FrameBuffer::new();
        buffer.set_channel(0, marker).unwrap();
        buffer.snapshot()
    }

    #[test]
    fn test_fifo_order() {
        let (tx, rx) = transmission_queue(0, 4);
        tx.try_enqueue(frame(1)).unwrap();
        tx.try_enqueue(frame(2)).unwrap();

        assert_eq!(rx.dequeue_blocking().unwrap().channel(0), Some(1));
        assert_eq!(rx.dequeue_blocking().unwrap().channel(0), Some(2));
    }

    #[test]
    fn test_overflow_drops_newest() {
        let capacity = 10;
        let (tx, rx) = transmission_queue(3, capacity);

        let mut dropped = 0;
        for marker in 0..(capacity + 5) {
            match tx.try_enqueue(frame(marker as u8)) {
                Ok(()) => {}
                Err(DmxError::Backpressure { link: 3, capacity: 10 }) => dropped += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(dropped, 5);
        assert_eq!(tx.len(), capacity);

        let retained: Vec<_> = std::iter::from_fn(|| rx.try_dequeue())
            .map(|f| f.channel(0).unwrap())
            .collect();
        assert_eq!(retained, (0..capacity as u8).collect::<Vec<_>>());
    }

    #[test]
    fn test_closed_queue() {
        let (tx, rx) = transmission_queue(0, 2);
        tx.try_enqueue(frame(7)).unwrap();
        drop(tx);

        // Remaining frames drain before the close is observed
        assert_eq!(rx.dequeue_blocking().unwrap().channel(0), Some(7));
        assert!(rx.dequeue_blocking().is_none());
    }

    #[test]
    fn test_enqueue_after_consumer_dropped() {
        let (tx, rx) = transmission_queue(2, 2);
        drop(rx);
        assert!(matches!(
            tx.try_enqueue(frame(1)),
            Err(DmxError::QueueClosed { link: 2 })
        ));
    }

    #[test]
    fn test_flush() {
        let (tx, rx) = transmission_queue(0, 4);
        tx.try_enqueue(frame(1)).unwrap();
        tx.try_enqueue(frame(2)).unwrap();
        assert_eq!(rx.flush(), 2);
        assert!(rx.is_empty());
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let (tx, _rx) = transmission_queue(0, 0);
        assert_eq!(tx.capacity(), 1);
        tx.try_enqueue(frame(1)).unwrap();
    }
}
