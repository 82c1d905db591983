//! Device catalog: a packed, read-only directory of named hardware
//! resources, as produced by the embedding application's build step and
//! handed to us as a flat byte blob via [`crate::bus::Platform::catalog`].
//!
//! Wire layout: a 2-byte big-endian length prefix, followed by that many
//! bytes of entries. Each entry is a NUL-terminated ASCII name followed by
//! a 9-byte payload: a 4-byte big-endian offset (low bit = read-only,
//! low two bits masked off for addressing), a 4-byte big-endian length in
//! bytes, and a 1-byte type code.

use byteorder::{BigEndian, ByteOrder};
use enum_primitive::FromPrimitive;

enum_from_primitive! {
    /// The type of value stored behind a device, as recorded in the
    /// catalog. Unrecognized codes decode to [`DeviceType::Unknown`]
    /// rather than failing iteration — the catalog is trusted but a
    /// forward-incompatible type code shouldn't break listing.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum DeviceType {
        Unknown = 0,
        UnsignedInt = 1,
        SignedInt = 2,
        Float = 3,
    }
}

/// A single device's catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Word-aligned byte offset into FPGA space.
    pub offset: u32,
    /// Length of the device's backing storage, in bytes.
    pub length: u32,
    pub type_code: u8,
    pub read_only: bool,
}

impl DeviceDescriptor {
    /// Length of the device's backing storage, in 32-bit words.
    pub fn word_length(&self) -> u32 {
        self.length / 4
    }

    pub fn device_type(&self) -> DeviceType {
        DeviceType::from_u8(self.type_code).unwrap_or(DeviceType::Unknown)
    }
}

const ENTRY_PAYLOAD_LEN: usize = 9;

/// Iterates the `(name, descriptor)` entries of a catalog blob.
///
/// Stops at the declared end of the entries region, or at the first
/// malformed/truncated entry, whichever comes first. A malformed tail is
/// treated as the end of the catalog rather than a panic: the blob is
/// produced by a trusted build step, but this reader must never be able to
/// be driven to panic by it.
pub struct CatalogIter<'a> {
    remaining: &'a [u8],
}

impl<'a> CatalogIter<'a> {
    pub fn new(blob: &'a [u8]) -> Self {
        if blob.len() < 2 {
            return CatalogIter { remaining: &[] };
        }
        let declared_len = BigEndian::read_u16(&blob[0..2]) as usize;
        let entries = &blob[2..];
        let end = declared_len.min(entries.len());
        CatalogIter {
            remaining: &entries[..end],
        }
    }

    /// Builds an iterator directly over an already-sliced entries region
    /// (no length prefix), for resuming iteration from an arbitrary byte
    /// offset within the entries.
    pub fn new_over_entries(entries: &'a [u8]) -> Self {
        CatalogIter { remaining: entries }
    }

    /// Bytes not yet consumed from the entries region.
    pub fn remaining_len(&self) -> usize {
        self.remaining.len()
    }
}

impl<'a> Iterator for CatalogIter<'a> {
    type Item = (&'a str, DeviceDescriptor);

    fn next(&mut self) -> Option<Self::Item> {
        let name_len = self.remaining.iter().position(|&b| b == 0)?;
        let name_bytes = &self.remaining[..name_len];
        let after_name = &self.remaining[name_len + 1..];
        if after_name.len() < ENTRY_PAYLOAD_LEN {
            self.remaining = &[];
            return None;
        }

        let name = core::str::from_utf8(name_bytes).ok()?;
        let raw_offset = BigEndian::read_u32(&after_name[0..4]);
        let length = BigEndian::read_u32(&after_name[4..8]);
        let type_code = after_name[8];

        let descriptor = DeviceDescriptor {
            offset: raw_offset & !0x3,
            length,
            type_code,
            read_only: raw_offset & 0x1 != 0,
        };

        self.remaining = &after_name[ENTRY_PAYLOAD_LEN..];
        Some((name, descriptor))
    }
}

/// Scans the catalog linearly for the first entry named `name`.
pub fn lookup(blob: &[u8], name: &str) -> Option<DeviceDescriptor> {
    CatalogIter::new(blob)
        .find(|(entry_name, _)| *entry_name == name)
        .map(|(_, descriptor)| descriptor)
}

/// Total byte length of the catalog blob, length prefix included, as
/// required by the binary listing producer.
pub fn blob_len(blob: &[u8]) -> usize {
    if blob.len() < 2 {
        return 0;
    }
    let declared_len = BigEndian::read_u16(&blob[0..2]) as usize;
    2 + declared_len.min(blob.len() - 2)
}

#[cfg(test)]
mod test {
    use super::*;

    fn build_entry(name: &str, offset: u32, length: u32, type_code: u8, buf: &mut std::vec::Vec<u8>) {
        buf.extend_from_slice(name.as_bytes());
        buf.push(0);
        buf.extend_from_slice(&offset.to_be_bytes());
        buf.extend_from_slice(&length.to_be_bytes());
        buf.push(type_code);
    }

    fn build_catalog(entries: &[(&str, u32, u32, u8)]) -> std::vec::Vec<u8> {
        let mut body = std::vec::Vec::new();
        for &(name, offset, length, type_code) in entries {
            build_entry(name, offset, length, type_code, &mut body);
        }
        let mut blob = std::vec::Vec::new();
        blob.extend_from_slice(&(body.len() as u16).to_be_bytes());
        blob.extend_from_slice(&body);
        blob
    }

    #[test]
    fn iterates_entries_in_order() {
        let blob = build_catalog(&[("adc0", 0x10, 16, 1), ("temp", 0x20, 4, 3)]);
        let mut it = CatalogIter::new(&blob);
        let (name, desc) = it.next().unwrap();
        assert_eq!(name, "adc0");
        assert_eq!(desc.offset, 0x10);
        assert_eq!(desc.length, 16);
        assert_eq!(desc.word_length(), 4);
        assert!(!desc.read_only);

        let (name, desc) = it.next().unwrap();
        assert_eq!(name, "temp");
        assert_eq!(desc.device_type(), DeviceType::Float);
        assert!(it.next().is_none());
    }

    #[test]
    fn masks_read_only_flag_from_offset() {
        let blob = build_catalog(&[("ro_dev", 0x101, 4, 1)]);
        let (_, desc) = CatalogIter::new(&blob).next().unwrap();
        assert!(desc.read_only);
        assert_eq!(desc.offset, 0x100);
    }

    #[test]
    fn lookup_finds_named_device() {
        let blob = build_catalog(&[("adc0", 0x10, 16, 1), ("dac0", 0x40, 8, 1)]);
        let found = lookup(&blob, "dac0").unwrap();
        assert_eq!(found.offset, 0x40);
        assert!(lookup(&blob, "missing").is_none());
    }

    #[test]
    fn truncated_entry_ends_iteration_without_panicking() {
        let mut blob = build_catalog(&[("adc0", 0x10, 16, 1)]);
        // Truncate the blob mid-entry for the next (nonexistent) device.
        blob.extend_from_slice(b"partial_name");
        // declared length only covers the first well-formed entry, so the
        // trailing garbage is never visited at all.
        let entries: std::vec::Vec<_> = CatalogIter::new(&blob).collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn empty_blob_yields_empty_iterator() {
        assert!(CatalogIter::new(&[]).next().is_none());
        assert!(CatalogIter::new(&[0, 0]).next().is_none());
    }
}
