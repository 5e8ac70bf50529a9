//! DMX512 frame buffer
//!
//! A frame is the null start code followed by one byte per address:
//! byte 0 is always [`START_CODE`], byte `a + 1` holds address `a`.

use aurora_core::DMX_ADDRESSES;

use crate::color::normalized_to_byte;
use crate::error::{DmxError, Result};

/// Null start code for dimmer data
pub const START_CODE: u8 = 0x00;

/// Start code + 512 channel slots
pub const FRAME_LEN: usize = DMX_ADDRESSES + 1;

/// Immutable copy of a frame, as handed to a sender
#[derive(Clone, PartialEq, Eq)]
pub struct DmxFrame {
    bytes: [u8; FRAME_LEN],
}

impl DmxFrame {
    /// Raw wire bytes, start code first
    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.bytes
    }

    /// Value at DMX address `address` (0..512)
    pub fn channel(&self, address: usize) -> Option<u8> {
        if address < DMX_ADDRESSES {
            Some(self.bytes[address + 1])
        } else {
            None
        }
    }

    pub fn start_code(&self) -> u8 {
        self.bytes[0]
    }

    /// `(address, value)` for every non-zero channel
    pub fn nonzero_channels(&self) -> impl Iterator<Item = (usize, u8)> + '_ {
        self.bytes[1..]
            .iter()
            .enumerate()
            .filter(|&(_, &value)| value > 0)
            .map(|(address, &value)| (address, value))
    }
}

impl std::fmt::Debug for DmxFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DmxFrame")
            .field("start_code", &self.start_code())
            .field("nonzero", &self.nonzero_channels().collect::<Vec<_>>())
            .finish()
    }
}

/// Mutable frame for one universe
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    bytes: [u8; FRAME_LEN],
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    /// All channels zero
    pub fn new() -> Self {
        Self {
            bytes: [START_CODE; FRAME_LEN],
        }
    }

    /// Set DMX address `address` (0..512) to `value`
    ///
    /// # Errors
    ///
    /// `AddressOutOfRange` if `address >= 512`.
    pub fn set_channel(&mut self, address: usize, value: u8) -> Result<()> {
        if address >= DMX_ADDRESSES {
            return Err(DmxError::AddressOutOfRange { address });
        }
        self.bytes[address + 1] = value;
        Ok(())
    }

    /// Set a channel from a 0.0-1.0 level; out-of-range levels are clamped.
    ///
    /// # Errors
    ///
    /// `AddressOutOfRange` if `address >= 512`.
    pub fn set_channel_normalized(&mut self, address: usize, value: f32) -> Result<()> {
        self.set_channel(address, normalized_to_byte(value))
    }

    /// Current value at `address`
    pub fn channel(&self, address: usize) -> Option<u8> {
        if address < DMX_ADDRESSES {
            Some(self.bytes[address + 1])
        } else {
            None
        }
    }

    /// Zero every channel
    pub fn clear(&mut self) {
        self.bytes[1..].fill(0);
    }

    /// Copy of the current frame
    pub fn snapshot(&self) -> DmxFrame {
        DmxFrame { bytes: self.bytes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer_is_dark() {
        let frame = FrameBuffer::new().snapshot();
        assert_eq!(frame.as_bytes().len(), 513);
        assert!(frame.as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_set_channel_offsets_by_start_code() {
        let mut buffer = FrameBuffer::new();
        buffer.set_channel(0, 10).unwrap();
        buffer.set_channel(511, 20).unwrap();

        let frame = buffer.snapshot();
        assert_eq!(frame.as_bytes()[0], START_CODE);
        assert_eq!(frame.as_bytes()[1], 10);
        assert_eq!(frame.as_bytes()[512], 20);
        assert_eq!(frame.channel(511), Some(20));
        assert_eq!(frame.channel(512), None);
    }

    #[test]
    fn test_set_channel_out_of_range() {
        let mut buffer = FrameBuffer::new();
        assert!(matches!(
            buffer.set_channel(512, 1),
            Err(DmxError::AddressOutOfRange { address: 512 })
        ));
        assert!(buffer.snapshot().as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_normalized() {
        let mut buffer = FrameBuffer::new();
        buffer.set_channel_normalized(3, 0.0).unwrap();
        assert_eq!(buffer.channel(3), Some(0));

        buffer.set_channel_normalized(3, 1.0).unwrap();
        assert_eq!(buffer.channel(3), Some(255));

        buffer.set_channel_normalized(3, 0.5).unwrap();
        assert_eq!(buffer.channel(3), Some(128));

        buffer.set_channel_normalized(3, 7.0).unwrap();
        assert_eq!(buffer.channel(3), Some(255));

        buffer.set_channel_normalized(3, -2.0).unwrap();
        assert_eq!(buffer.channel(3), Some(0));
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut buffer = FrameBuffer::new();
        buffer.set_channel(5, 99).unwrap();
        let frame = buffer.snapshot();

        buffer.set_channel(5, 1).unwrap();
        assert_eq!(frame.channel(5), Some(99));
        assert_eq!(buffer.channel(5), Some(1));
    }

    #[test]
    fn test_clear_and_nonzero() {
        let mut buffer = FrameBuffer::new();
        buffer.set_channel(2, 7).unwrap();
        buffer.set_channel(9, 8).unwrap();
        assert_eq!(
            buffer.snapshot().nonzero_channels().collect::<Vec<_>>(),
            vec![(2, 7), (9, 8)]
        );

        buffer.clear();
        assert_eq!(buffer.snapshot().nonzero_channels().count(), 0);
    }
}
