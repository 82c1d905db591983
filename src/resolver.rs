//! Filename parsing and dispatch: turns a requested path, mode and
//! direction into a bound [`Transfer`].
//!
//! A filename without a leading `/` is always a bare device reference. The
//! fixed top-level prefixes (`/help`, `/listdev`, `/temp`, `/fpga.`,
//! `/cpu.`, `/dev/`) are only recognized when the filename *does* start
//! with `/`, so a device can never be shadowed by a reserved name unless
//! the client supplies the leading slash itself.

use crate::bus::Platform;
use crate::hex;
use crate::read::{self, Producer};
use crate::transfer::{Body, Transfer};
use crate::write::{self, Consumer};

/// Read or write, as already decided by the engine from the incoming
/// request before it ever reaches [`open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Get,
    Put,
}

/// Resolution and bounds failures surfaced by [`open`]. None carry a
/// payload beyond what's needed to log usefully — the engine turns any of
/// these into a protocol-level file-not-found or access-violation reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenError {
    UnknownPath,
    UnknownDevice,
    ReadOnly,
    Bounds,
    MalformedOffset,
    Disallowed,
    UnsupportedMode,
}

/// Parses `filename`, consults the platform's catalog as needed, and
/// returns a [`Transfer`] bound to the matching codec, or the reason the
/// request was rejected.
pub fn open<'p>(
    platform: &'p mut dyn Platform,
    filename: &str,
    is_binary: bool,
    direction: Direction,
) -> Result<Transfer<'p>, OpenError> {
    let result = open_inner(platform, filename, is_binary, direction);
    match &result {
        Ok(_) => log::trace!("opened {:?} ({:?})", filename, direction),
        Err(err) => log::warn!("open failed for {:?}: {:?}", filename, err),
    }
    result
}

fn open_inner<'p>(
    platform: &'p mut dyn Platform,
    filename: &str,
    is_binary: bool,
    direction: Direction,
) -> Result<Transfer<'p>, OpenError> {
    if let Some(rest) = filename.strip_prefix('/') {
        if rest == "help" {
            return open_help(platform, direction, is_binary);
        }
        if rest == "listdev" {
            return open_listdev(platform, direction, is_binary);
        }
        if rest == "temp" {
            return open_temp(platform, direction, is_binary);
        }
        if let Some(args) = rest.strip_prefix("fpga.") {
            return open_memory(platform, args, is_binary, direction, Space::Fpga);
        }
        if let Some(args) = rest.strip_prefix("cpu.") {
            return open_memory(platform, args, is_binary, direction, Space::Cpu);
        }
        if let Some(devref) = rest.strip_prefix("dev/") {
            return open_device(platform, devref, is_binary, direction);
        }
        return Err(OpenError::UnknownPath);
    }

    open_device(platform, filename, is_binary, direction)
}

fn open_help<'p>(
    platform: &'p mut dyn Platform,
    direction: Direction,
    is_binary: bool,
) -> Result<Transfer<'p>, OpenError> {
    if direction != Direction::Get {
        return Err(OpenError::Disallowed);
    }
    let producer = Producer::Help(read::Help::default());
    Ok(Transfer::new(platform, is_binary, Body::Read(producer)))
}

/// Parses a device trailer of the form `OFF` or `OFF.LEN` (the leading
/// `.` before it has already been consumed by the caller's `splitn`).
/// Returns `(offset, length)`, where `length` is absent if not given.
fn parse_device_trailer(trailer: &str) -> Result<(u32, Option<u32>), OpenError> {
    let mut parts = trailer.splitn(2, '.');
    let off_str = parts.next().unwrap_or("");
    let (consumed, offset) = hex::parse_word(off_str.as_bytes());
    if consumed == 0 || consumed != off_str.len() {
        return Err(OpenError::MalformedOffset);
    }
    let len = match parts.next() {
        None => None,
        Some(len_str) => {
            let (consumed, len) = hex::parse_word(len_str.as_bytes());
            if consumed == 0 || consumed != len_str.len() {
                return Err(OpenError::MalformedOffset);
            }
            Some(len)
        }
    };
    Ok((offset, len))
}

enum Space {
    Fpga,
    Cpu,
}

fn open_memory<'p>(
    platform: &'p mut dyn Platform,
    args: &str,
    is_binary: bool,
    direction: Direction,
    space: Space,
) -> Result<Transfer<'p>, OpenError> {
    if matches!(space, Space::Cpu) && direction == Direction::Put {
        return Err(OpenError::Disallowed);
    }

    let mut parts = args.splitn(2, '.');
    let off_str = parts.next().unwrap_or("");
    if off_str.is_empty() {
        return Err(OpenError::MalformedOffset);
    }
    let (off_consumed, raw_offset) = hex::parse_word(off_str.as_bytes());
    if off_consumed == 0 || off_consumed != off_str.len() {
        return Err(OpenError::MalformedOffset);
    }

    // LEN is only meaningful on GET: on PUT the client's data length governs
    // and anything after the first `.` is ignored rather than parsed, so a
    // malformed trailer there must not fail the open.
    let raw_len = match direction {
        Direction::Get => match parts.next() {
            None => 1,
            Some(len_str) => {
                let (consumed, value) = hex::parse_word(len_str.as_bytes());
                if consumed == 0 || consumed != len_str.len() {
                    return Err(OpenError::MalformedOffset);
                }
                value
            }
        },
        Direction::Put => 1,
    };

    let offset = raw_offset & !0x3;
    let length = (raw_len + 3) & !0x3;

    match space {
        Space::Fpga => open_fpga_memory(platform, offset, length, is_binary, direction),
        Space::Cpu => open_cpu_memory(platform, offset, length, is_binary),
    }
}

fn open_fpga_memory<'p>(
    platform: &'p mut dyn Platform,
    offset: u32,
    length: u32,
    is_binary: bool,
    direction: Direction,
) -> Result<Transfer<'p>, OpenError> {
    let region_len = platform.fpga_region_len();

    match direction {
        Direction::Get => {
            if length == 0 || offset.checked_add(length).map_or(true, |end| end > region_len) {
                return Err(OpenError::Bounds);
            }
            let producer = if is_binary {
                Producer::FpgaWordsBinary(read::FpgaWordsBinary::new(offset, length))
            } else {
                Producer::FpgaWordsText(read::FpgaWordsText::new(offset, length))
            };
            Ok(Transfer::new(platform, is_binary, Body::Read(producer)))
        }
        Direction::Put => {
            if offset > region_len {
                return Err(OpenError::Bounds);
            }
            let remaining = Some(region_len - offset);
            let consumer = if is_binary {
                Consumer::FpgaWordsBinary(write::FpgaWordsBinary::new(offset, remaining))
            } else {
                Consumer::FpgaWordsText(write::FpgaWordsText::new(offset, remaining))
            };
            Ok(Transfer::new(platform, is_binary, Body::Write(consumer)))
        }
    }
}

fn open_cpu_memory<'p>(
    platform: &'p mut dyn Platform,
    offset: u32,
    length: u32,
    is_binary: bool,
) -> Result<Transfer<'p>, OpenError> {
    if length == 0 {
        return Err(OpenError::Bounds);
    }
    let producer = if is_binary {
        Producer::BytesBinary(read::BytesBinary {
            cursor: offset,
            remaining: length,
        })
    } else {
        Producer::BytesText(read::BytesText::new(offset, length))
    };
    Ok(Transfer::new(platform, is_binary, Body::Read(producer)))
}

fn open_device<'p>(
    platform: &'p mut dyn Platform,
    devref: &str,
    is_binary: bool,
    direction: Direction,
) -> Result<Transfer<'p>, OpenError> {
    let mut parts = devref.splitn(2, '.');
    let name = parts.next().unwrap_or("");
    let trailer = parts.next();

    let descriptor = platform
        .find_device(name)
        .ok_or(OpenError::UnknownDevice)?;

    if direction == Direction::Put && descriptor.read_only {
        return Err(OpenError::ReadOnly);
    }

    let (off, len) = match trailer {
        None => (0u32, None),
        Some(trailer) => parse_device_trailer(trailer)?,
    };

    let device_word_length = descriptor.word_length();

    match direction {
        Direction::Get => {
            let word_len = match len {
                Some(0) | None => {
                    if off >= device_word_length {
                        return Err(OpenError::Bounds);
                    }
                    device_word_length - off
                }
                Some(explicit) => explicit,
            };
            if off.checked_add(word_len).map_or(true, |end| end > device_word_length) {
                return Err(OpenError::Bounds);
            }
            let cursor = descriptor.offset + off * 4;
            let remaining = word_len * 4;
            let producer = if is_binary {
                Producer::FpgaWordsBinary(read::FpgaWordsBinary::new(cursor, remaining))
            } else {
                Producer::FpgaWordsText(read::FpgaWordsText::new(cursor, remaining))
            };
            Ok(Transfer::new(platform, is_binary, Body::Read(producer)))
        }
        Direction::Put => {
            if off > device_word_length {
                return Err(OpenError::Bounds);
            }
            let cursor = descriptor.offset + off * 4;
            let remaining = Some(descriptor.length - off * 4);
            let consumer = if is_binary {
                Consumer::FpgaWordsBinary(write::FpgaWordsBinary::new(cursor, remaining))
            } else {
                Consumer::FpgaWordsText(write::FpgaWordsText::new(cursor, remaining))
            };
            Ok(Transfer::new(platform, is_binary, Body::Write(consumer)))
        }
    }
}

fn open_listdev<'p>(
    platform: &'p mut dyn Platform,
    direction: Direction,
    is_binary: bool,
) -> Result<Transfer<'p>, OpenError> {
    if direction != Direction::Get {
        return Err(OpenError::Disallowed);
    }
    let producer = if is_binary {
        let total = crate::catalog::blob_len(platform.catalog()) as u32;
        Producer::ListingBinary(read::ListingBinary::new(total))
    } else {
        Producer::ListingText(read::ListingText::default())
    };
    Ok(Transfer::new(platform, is_binary, Body::Read(producer)))
}

#[cfg(feature = "temp")]
fn open_temp<'p>(
    platform: &'p mut dyn Platform,
    direction: Direction,
    is_binary: bool,
) -> Result<Transfer<'p>, OpenError> {
    if direction != Direction::Get {
        return Err(OpenError::Disallowed);
    }
    if !is_binary {
        return Err(OpenError::UnsupportedMode);
    }
    let value = platform.temperature().ok_or(OpenError::UnknownPath)?;
    let producer = Producer::Temp(read::Temp::new(value));
    Ok(Transfer::new(platform, is_binary, Body::Read(producer)))
}

/// Stub used when the `temp` feature is compiled out: `/temp` 404s
/// identically to a board with no sensor, without the codec or its state
/// existing in the binary at all.
#[cfg(not(feature = "temp"))]
fn open_temp<'p>(
    _platform: &'p mut dyn Platform,
    _direction: Direction,
    _is_binary: bool,
) -> Result<Transfer<'p>, OpenError> {
    Err(OpenError::UnknownPath)
}
