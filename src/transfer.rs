//! Per-transfer state: the context carried across every `produce`/`consume`
//! callback for the lifetime of one GET or PUT.
//!
//! This is a tagged union over codec kind — a [`Producer`] or [`Consumer`]
//! variant per codec, each holding its own named, typed fields — rather
//! than a handful of generic fields reused with different meanings by
//! different codecs. The line buffer in particular is promoted from what
//! would otherwise be a single shared buffer to a field inline in
//! [`Transfer`]: every transfer owns its own, so nothing here is shared
//! mutable state and nothing forecloses on a future engine running more
//! than one transfer at a time.

use crate::bus::Platform;
use crate::read::Producer;
use crate::write::Consumer;

/// Width of the per-transfer scratch line used by the hexdump write
/// parser. Must be at least as wide as the longest line a client may
/// reasonably send; see `DESIGN.md` for how this bound was chosen.
pub const LINE_BUFFER_CAPACITY: usize = 288;

static_assertions::const_assert!(LINE_BUFFER_CAPACITY >= 64);

/// A fixed-capacity accumulator for one line of hexdump input, owned
/// inline by the [`Consumer`] variant that needs it.
#[derive(Debug, Clone, Copy)]
pub struct LineBuffer {
    buf: [u8; LINE_BUFFER_CAPACITY],
    len: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        LineBuffer {
            buf: [0u8; LINE_BUFFER_CAPACITY],
            len: 0,
        }
    }
}

impl LineBuffer {
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Appends one byte. `Err(())` means the line overflowed the buffer;
    /// the caller should treat this as a fatal transfer error.
    pub fn push(&mut self, byte: u8) -> Result<(), ()> {
        if self.len == self.buf.len() {
            return Err(());
        }
        self.buf[self.len] = byte;
        self.len += 1;
        Ok(())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

/// Either side of a transfer: a producer feeding the engine bytes to send
/// to the client, or a consumer accepting bytes the client sent.
pub enum Body {
    Read(Producer),
    Write(Consumer),
}

/// A resource open for transfer, bound to the codec state and the
/// [`Platform`] it reads/writes through.
///
/// Borrows the platform for its entire lifetime: the engine guarantees no
/// other transfer is concurrently touching it, per the single-transfer
/// serialization model this crate assumes.
pub struct Transfer<'p> {
    platform: &'p mut dyn Platform,
    is_binary: bool,
    body: Body,
}

impl<'p> Transfer<'p> {
    pub fn new(platform: &'p mut dyn Platform, is_binary: bool, body: Body) -> Self {
        Transfer {
            platform,
            is_binary,
            body,
        }
    }

    pub fn is_binary(&self) -> bool {
        self.is_binary
    }

    /// Fills as much of `out` as the resource has remaining. A return less
    /// than `out.len()` means the transfer is complete; the engine will not
    /// call again. Calling this on a write-direction transfer always
    /// returns 0.
    pub fn produce(&mut self, out: &mut [u8]) -> usize {
        let Transfer { platform, body, .. } = self;
        match body {
            Body::Read(producer) => crate::read::produce(&mut **platform, producer, out),
            Body::Write(_) => 0,
        }
    }

    /// Consumes as much of `chain` as possible, writing through to the
    /// platform. Calling this on a read-direction transfer always returns
    /// `Ok(0)`.
    pub fn consume(&mut self, chain: &[&[u8]]) -> Result<usize, ConsumeError> {
        let Transfer { platform, body, .. } = self;
        match body {
            Body::Write(consumer) => crate::write::consume(&mut **platform, consumer, chain),
            Body::Read(_) => Ok(0),
        }
    }
}

/// Fatal errors that abort an in-progress write transfer. Hardware writes
/// already performed before the error are not rolled back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeError {
    /// The client sent more data than the bound resource has room for.
    Overflow,
    /// A hexdump line exceeded [`LINE_BUFFER_CAPACITY`] before a newline.
    LineTooLong,
}
