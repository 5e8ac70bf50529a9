//! Transports for DMX frames
//!
//! [`SerialLink`] is the capability a link sender needs from the hardware:
//! open the device, set the baud rate, raise/lower the line break and write
//! bytes. Every call may fail; the sender treats failures as recoverable.

use parking_lot::{Condvar, Mutex};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::TransportError;

/// A byte-oriented transport with line-break control
pub trait SerialLink: Send {
    /// Identifier used in logs (device path, serial number, ...)
    fn name(&self) -> &str;

    /// Open (or reopen) the device
    fn open(&mut self) -> Result<(), TransportError>;

    fn configure_baud(&mut self, rate: u32) -> Result<(), TransportError>;

    /// Hold the line in the break condition
    fn assert_break(&mut self) -> Result<(), TransportError>;

    fn clear_break(&mut self) -> Result<(), TransportError>;

    /// Write all of `bytes`
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Release the device. Called after a failure and at shutdown.
    fn close(&mut self) {}

    /// Whether the link can set the baud rate and signal a break.
    ///
    /// Senders skip baud and break on links without line control and write
    /// the raw frame only.
    fn line_control(&self) -> bool {
        true
    }
}

/// One recorded [`MemoryLink`] operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Opened,
    Baud(u32),
    BreakOn,
    BreakOff,
    Write(Vec<u8>),
    Closed,
}

#[derive(Debug, Default)]
struct MemoryLinkState {
    events: Vec<LinkEvent>,
    fail_open: bool,
    fail_writes: bool,
    paused: bool,
}

#[derive(Debug, Default)]
struct MemoryLinkShared {
    state: Mutex<MemoryLinkState>,
    resumed: Condvar,
}

/// In-memory transport that records every operation.
///
/// Used for dry runs and tests. A [`MemoryLinkHandle`] inspects the recorded
/// events and injects failures from another thread.
#[derive(Debug)]
pub struct MemoryLink {
    name: String,
    shared: Arc<MemoryLinkShared>,
}

/// Observer/controller for a [`MemoryLink`]
#[derive(Debug, Clone)]
pub struct MemoryLinkHandle {
    shared: Arc<MemoryLinkShared>,
}

impl MemoryLink {
    pub fn new(name: impl Into<String>) -> (Self, MemoryLinkHandle) {
        let shared = Arc::new(MemoryLinkShared::default());
        (
            Self {
                name: name.into(),
                shared: shared.clone(),
            },
            MemoryLinkHandle { shared },
        )
    }

    fn record(&self, event: LinkEvent) {
        self.shared.state.lock().events.push(event);
    }
}

impl SerialLink for MemoryLink {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self) -> Result<(), TransportError> {
        if self.shared.state.lock().fail_open {
            return Err(TransportError::Unavailable(format!(
                "{} is not connected",
                self.name
            )));
        }
        self.record(LinkEvent::Opened);
        Ok(())
    }

    fn configure_baud(&mut self, rate: u32) -> Result<(), TransportError> {
        self.record(LinkEvent::Baud(rate));
        Ok(())
    }

    fn assert_break(&mut self) -> Result<(), TransportError> {
        self.record(LinkEvent::BreakOn);
        Ok(())
    }

    fn clear_break(&mut self) -> Result<(), TransportError> {
        self.record(LinkEvent::BreakOff);
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut state = self.shared.state.lock();
        while state.paused {
            self.shared.resumed.wait(&mut state);
        }
        if state.fail_writes {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                format!("{} write failed", self.name),
            )));
        }
        state.events.push(LinkEvent::Write(bytes.to_vec()));
        Ok(())
    }

    fn close(&mut self) {
        self.record(LinkEvent::Closed);
    }
}

impl MemoryLinkHandle {
    /// Everything recorded so far
    pub fn events(&self) -> Vec<LinkEvent> {
        self.shared.state.lock().events.clone()
    }

    /// Payloads of every successful write
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.shared
            .state
            .lock()
            .events
            .iter()
            .filter_map(|event| match event {
                LinkEvent::Write(bytes) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    /// Make `open` fail until cleared
    pub fn set_fail_open(&self, fail: bool) {
        self.shared.state.lock().fail_open = fail;
    }

    /// Make `write` fail until cleared
    pub fn set_fail_writes(&self, fail: bool) {
        self.shared.state.lock().fail_writes = fail;
    }

    /// Block writers until [`resume`](Self::resume)
    pub fn pause(&self) {
        self.shared.state.lock().paused = true;
    }

    pub fn resume(&self) {
        self.shared.state.lock().paused = false;
        self.shared.resumed.notify_all();
    }
}

/// Writes raw frames to a file, for capturing what would go on the wire.
///
/// A plain file handle has no line control: [`line_control`] is false and
/// baud or break requests fail with [`TransportError::Unsupported`]. The
/// output is a byte capture, not a DMX signal.
///
/// [`line_control`]: SerialLink::line_control
#[derive(Debug)]
pub struct FileLink {
    name: String,
    path: PathBuf,
    file: Option<File>,
}

impl FileLink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: path.display().to_string(),
            path,
            file: None,
        }
    }
}

impl SerialLink for FileLink {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&mut self) -> Result<(), TransportError> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| TransportError::Unavailable(format!("{}: {}", self.name, e)))?;
        self.file = Some(file);
        Ok(())
    }

    fn configure_baud(&mut self, _rate: u32) -> Result<(), TransportError> {
        Err(self.unsupported("baud rate"))
    }

    fn assert_break(&mut self) -> Result<(), TransportError> {
        Err(self.unsupported("line break"))
    }

    fn clear_break(&mut self) -> Result<(), TransportError> {
        Err(self.unsupported("line break"))
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| TransportError::Unavailable(format!("{} is not open", self.name)))?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(())
    }

    fn close(&mut self) {
        self.file = None;
    }

    fn line_control(&self) -> bool {
        false
    }
}

impl FileLink {
    fn unsupported(&self, operation: &'static str) -> TransportError {
        TransportError::Unsupported {
            link: self.name.clone(),
            operation,
        }
    }
}
