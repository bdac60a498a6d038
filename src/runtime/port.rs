//! Message ports connecting the control thread and the worker.
//!
//! A port pair behaves like `postMessage`: sends never block or wait for an
//! acknowledgement, each direction is FIFO, and nothing is ordered across
//! directions. Dropping one end closes the channel for the other.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

use super::surface::{ImageBitmap, OffscreenSurface};

/// Object whose ownership moves with a message instead of being copied.
#[derive(Debug)]
pub enum Transferable {
    Surface(OffscreenSurface),
    Bitmap(ImageBitmap),
}

/// A message as it crosses the thread boundary: JSON data plus the
/// transfer list.
#[derive(Debug)]
pub struct PostedMessage {
    pub data: String,
    pub transfer: Vec<Transferable>,
}

impl PostedMessage {
    /// A message with no transferables.
    pub fn data(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            transfer: Vec::new(),
        }
    }
}

/// The other end of the port is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Message port closed")]
pub struct PortClosed;

/// One end of a bidirectional message channel.
#[derive(Debug)]
pub struct Port {
    tx: Sender<PostedMessage>,
    rx: Receiver<PostedMessage>,
}

/// Create a connected pair of ports.
pub fn channel() -> (Port, Port) {
    let (a_tx, b_rx) = mpsc::channel();
    let (b_tx, a_rx) = mpsc::channel();
    (Port { tx: a_tx, rx: a_rx }, Port { tx: b_tx, rx: b_rx })
}

impl Port {
    /// Fire-and-forget send.
    pub fn post(&self, message: PostedMessage) -> Result<(), PortClosed> {
        self.tx.send(message).map_err(|_| PortClosed)
    }

    /// Block until a message arrives.
    pub fn recv(&self) -> Result<PostedMessage, PortClosed> {
        self.rx.recv().map_err(|_| PortClosed)
    }

    /// Wait up to `timeout` for a message. `Ok(None)` means the wait timed out.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<PostedMessage>, PortClosed> {
        match self.rx.recv_timeout(timeout) {
            Ok(message) => Ok(Some(message)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(PortClosed),
        }
    }

    /// Take a pending message without waiting. Messages queued before the
    /// other end closed are still delivered.
    pub fn try_recv(&self) -> Result<Option<PostedMessage>, PortClosed> {
        match self.rx.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(PortClosed),
        }
    }
}
