//! The eight streaming read producers (spec-ambient naming: help text,
//! ASCII device listing, binary catalog dump, binary byte stream, ASCII
//! hexdump of CPU bytes, ASCII hexdump of FPGA words, binary FPGA words,
//! and board temperature).
//!
//! Every producer follows the same contract: `produce` fills as much of
//! the caller's buffer as the resource has left and returns how much it
//! wrote; a short return means the transfer is over. None of them ever
//! allocate — text codecs format one line at a time into a fixed
//! [`LineBuffer`] and drain it across as many `produce` calls as it takes.

use crate::banner::HELP_BANNER;
use crate::bus::Platform;
use crate::catalog::{self, CatalogIter};
use crate::hex;
use crate::transfer::LineBuffer;

/// Copies as much of `line`'s unread tail as fits in `out`, advancing
/// `pos`. Returns the number of bytes written.
fn drain_line(line: &LineBuffer, pos: &mut usize, out: &mut [u8]) -> usize {
    let src = &line.as_slice()[*pos..];
    let n = src.len().min(out.len());
    out[..n].copy_from_slice(&src[..n]);
    *pos += n;
    n
}

/// State for the `/help` producer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Help {
    pos: usize,
}

/// State for the `/listdev` text producer.
#[derive(Clone, Copy, Default)]
pub struct ListingText {
    /// Byte offset into the catalog's entries region (i.e. past the
    /// 2-byte length prefix) of the next entry to format.
    entry_offset: usize,
    line: LineBuffer,
    line_pos: usize,
    exhausted: bool,
}

/// State for the `/listdev` binary producer: a raw byte stream over the
/// catalog blob, length prefix included.
#[derive(Debug, Clone, Copy)]
pub struct ListingBinary {
    cursor: u32,
    remaining: u32,
}

/// State for a raw CPU-space binary read.
#[derive(Debug, Clone, Copy)]
pub struct BytesBinary {
    pub cursor: u32,
    pub remaining: u32,
}

/// State for a CPU-space ASCII hexdump read: 16 bytes per line, each a
/// 2-digit hex token, transfer-relative label incrementing by 16/line.
#[derive(Clone, Copy)]
pub struct BytesText {
    cursor: u32,
    remaining: u32,
    label: u32,
    line: LineBuffer,
    line_pos: usize,
}

impl BytesText {
    pub fn new(cursor: u32, remaining: u32) -> Self {
        BytesText {
            cursor,
            remaining,
            label: 0,
            line: LineBuffer::default(),
            line_pos: 0,
        }
    }
}

/// State for a binary FPGA-word read: streams bytes drawn from
/// word-aligned loads, one byte per call-slot.
#[derive(Debug, Clone, Copy)]
pub struct FpgaWordsBinary {
    pub cursor: u32,
    pub remaining: u32,
    word: [u8; 4],
}

impl FpgaWordsBinary {
    pub fn new(cursor: u32, remaining: u32) -> Self {
        FpgaWordsBinary {
            cursor,
            remaining,
            word: [0u8; 4],
        }
    }
}

/// State for an FPGA-word ASCII hexdump read: four 8-digit, zero-padded
/// words per line.
#[derive(Clone, Copy)]
pub struct FpgaWordsText {
    cursor: u32,
    remaining: u32,
    label: u32,
    line: LineBuffer,
    line_pos: usize,
}

impl FpgaWordsText {
    pub fn new(cursor: u32, remaining: u32) -> Self {
        FpgaWordsText {
            cursor,
            remaining,
            label: 0,
            line: LineBuffer::default(),
            line_pos: 0,
        }
    }
}

/// State for the board-temperature producer: 4 big-endian bytes of an
/// `f32`'s bit pattern.
#[cfg(feature = "temp")]
#[derive(Debug, Clone, Copy)]
pub struct Temp {
    bytes: [u8; 4],
    pos: usize,
}

#[cfg(feature = "temp")]
impl Temp {
    pub fn new(value: f32) -> Self {
        Temp {
            bytes: value.to_bits().to_be_bytes(),
            pos: 0,
        }
    }
}

impl ListingBinary {
    pub fn new(remaining: u32) -> Self {
        ListingBinary {
            cursor: 0,
            remaining,
        }
    }
}

/// The read-direction codec kinds, tagged by variant rather than a flat
/// struct of reused fields.
pub enum Producer {
    Help(Help),
    ListingText(ListingText),
    ListingBinary(ListingBinary),
    BytesBinary(BytesBinary),
    BytesText(BytesText),
    FpgaWordsBinary(FpgaWordsBinary),
    FpgaWordsText(FpgaWordsText),
    #[cfg(feature = "temp")]
    Temp(Temp),
}

/// Walks the catalog once to find the entry whose payload starts at
/// `entry_offset` within the entries region, formats its listing line, and
/// returns the byte offset of the following entry (or `None` past the
/// end).
fn next_listing_entry(
    blob: &[u8],
    entry_offset: usize,
) -> Option<(&str, catalog::DeviceDescriptor, usize)> {
    let entries = if blob.len() < 2 { &[][..] } else { &blob[2..] };
    if entry_offset >= entries.len() {
        return None;
    }
    let slice = &entries[entry_offset..];
    let mut it = CatalogIter::new_over_entries(slice);
    let (name, descriptor) = it.next()?;
    let consumed = slice.len() - it.remaining_len();
    Some((name, descriptor, entry_offset + consumed))
}

fn render_listing_line(name: &str, descriptor: &catalog::DeviceDescriptor, line: &mut LineBuffer) {
    line.clear();
    for &b in name.as_bytes() {
        let _ = line.push(b);
    }
    let _ = line.push(b'\t');
    let _ = line.push(if descriptor.read_only { b'1' } else { b'3' });
    let _ = line.push(b'\t');

    let mut digits = [0u8; 8];
    let n = hex::emit_word(descriptor.offset, &mut digits, false);
    for &b in &digits[..n] {
        let _ = line.push(b);
    }
    let _ = line.push(b'\t');

    let n = hex::emit_word(descriptor.length, &mut digits, false);
    for &b in &digits[..n] {
        let _ = line.push(b);
    }
    let _ = line.push(b'\t');

    let n = hex::emit_word(u32::from(descriptor.type_code), &mut digits, false);
    for &b in &digits[..n] {
        let _ = line.push(b);
    }
    let _ = line.push(b'\n');
}

fn produce_help(help: &mut Help, out: &mut [u8]) -> usize {
    let bytes = HELP_BANNER.as_bytes();
    let src = &bytes[help.pos.min(bytes.len())..];
    let n = src.len().min(out.len());
    out[..n].copy_from_slice(&src[..n]);
    help.pos += n;
    n
}

fn produce_listing_text(platform: &mut dyn Platform, state: &mut ListingText, out: &mut [u8]) -> usize {
    let mut written = 0;
    while written < out.len() {
        if state.line_pos >= state.line.as_slice().len() {
            if state.exhausted {
                break;
            }
            let blob = platform.catalog();
            match next_listing_entry(blob, state.entry_offset) {
                Some((name, descriptor, next_offset)) => {
                    render_listing_line(name, &descriptor, &mut state.line);
                    state.line_pos = 0;
                    state.entry_offset = next_offset;
                }
                None => {
                    state.exhausted = true;
                    break;
                }
            }
        }
        written += drain_line(&state.line, &mut state.line_pos, &mut out[written..]);
    }
    written
}

fn produce_listing_binary(platform: &mut dyn Platform, state: &mut ListingBinary, out: &mut [u8]) -> usize {
    let blob = platform.catalog();
    let total = catalog::blob_len(blob) as u32;
    let n = (out.len() as u32).min(state.remaining) as usize;
    let start = state.cursor as usize;
    let end = (start + n).min(total as usize);
    let n = end.saturating_sub(start);
    out[..n].copy_from_slice(&blob[start..end]);
    state.cursor += n as u32;
    state.remaining -= n as u32;
    n
}

fn produce_bytes_binary(platform: &mut dyn Platform, state: &mut BytesBinary, out: &mut [u8]) -> usize {
    let n = (out.len() as u32).min(state.remaining) as usize;
    platform.read_cpu(state.cursor, &mut out[..n]);
    state.cursor += n as u32;
    state.remaining -= n as u32;
    n
}

fn produce_bytes_text(platform: &mut dyn Platform, state: &mut BytesText, out: &mut [u8]) -> usize {
    const BYTES_PER_LINE: u32 = 16;
    let mut written = 0;
    while written < out.len() {
        if state.line_pos >= state.line.as_slice().len() {
            if state.remaining == 0 {
                break;
            }
            let n = BYTES_PER_LINE.min(state.remaining);
            let mut chunk = [0u8; BYTES_PER_LINE as usize];
            platform.read_cpu(state.cursor, &mut chunk[..n as usize]);

            state.line.clear();
            let mut digits = [0u8; 8];
            let written_label = hex::emit_word(state.label, &mut digits, true);
            for &b in &digits[..written_label] {
                let _ = state.line.push(b);
            }
            let _ = state.line.push(b':');
            for &byte in &chunk[..n as usize] {
                let _ = state.line.push(b' ');
                let mut hex_digits = [0u8; 2];
                let wn = hex::emit_byte(
                    byte,
                    &mut hex_digits,
                    hex::EmitByteFlags {
                        force_high: true,
                        force_low: true,
                    },
                );
                for &b in &hex_digits[..wn] {
                    let _ = state.line.push(b);
                }
            }
            let _ = state.line.push(b'\n');
            state.line_pos = 0;

            state.cursor += n;
            state.remaining -= n;
            state.label += BYTES_PER_LINE;
        }
        written += drain_line(&state.line, &mut state.line_pos, &mut out[written..]);
    }
    written
}

fn produce_fpga_words_binary(
    platform: &mut dyn Platform,
    state: &mut FpgaWordsBinary,
    out: &mut [u8],
) -> usize {
    let mut written = 0;
    while written < out.len() && state.remaining > 0 {
        if state.remaining % 4 == 0 {
            let word = platform.read_fpga_word(state.cursor);
            state.word = word.to_be_bytes();
            state.cursor += 4;
        }
        // Byte index within the currently loaded word: 0 right after a
        // fresh load, otherwise 4 minus however many bytes of this word
        // are still owed.
        let pos = if state.remaining % 4 == 0 {
            0
        } else {
            4 - (state.remaining % 4)
        };
        out[written] = state.word[pos as usize];
        written += 1;
        state.remaining -= 1;
    }
    written
}

fn produce_fpga_words_text(
    platform: &mut dyn Platform,
    state: &mut FpgaWordsText,
    out: &mut [u8],
) -> usize {
    const WORDS_PER_LINE: u32 = 4;
    let mut written = 0;
    while written < out.len() {
        if state.line_pos >= state.line.as_slice().len() {
            if state.remaining == 0 {
                break;
            }
            state.line.clear();
            let mut digits = [0u8; 8];
            let n = hex::emit_word(state.label, &mut digits, true);
            for &b in &digits[..n] {
                let _ = state.line.push(b);
            }
            let _ = state.line.push(b':');

            let mut emitted_words = 0u32;
            while emitted_words < WORDS_PER_LINE && state.remaining >= 4 {
                let word = platform.read_fpga_word(state.cursor);
                state.cursor += 4;
                state.remaining -= 4;

                let _ = state.line.push(b' ');
                let n = hex::emit_word(word, &mut digits, true);
                for &b in &digits[..n] {
                    let _ = state.line.push(b);
                }
                emitted_words += 1;
            }
            let _ = state.line.push(b'\n');
            state.line_pos = 0;
            state.label += 16;

            if emitted_words == 0 {
                // Fewer than 4 bytes remained and they don't form a full
                // word; nothing more can be rendered as a word line.
                state.remaining = 0;
            }
        }
        written += drain_line(&state.line, &mut state.line_pos, &mut out[written..]);
    }
    written
}

#[cfg(feature = "temp")]
fn produce_temp(temp: &mut Temp, out: &mut [u8]) -> usize {
    let src = &temp.bytes[temp.pos..];
    let n = src.len().min(out.len());
    out[..n].copy_from_slice(&src[..n]);
    temp.pos += n;
    n
}

/// Dispatches a `produce` call to the bound codec.
pub fn produce(platform: &mut dyn Platform, producer: &mut Producer, out: &mut [u8]) -> usize {
    match producer {
        Producer::Help(state) => produce_help(state, out),
        Producer::ListingText(state) => produce_listing_text(platform, state, out),
        Producer::ListingBinary(state) => produce_listing_binary(platform, state, out),
        Producer::BytesBinary(state) => produce_bytes_binary(platform, state, out),
        Producer::BytesText(state) => produce_bytes_text(platform, state, out),
        Producer::FpgaWordsBinary(state) => produce_fpga_words_binary(platform, state, out),
        Producer::FpgaWordsText(state) => produce_fpga_words_text(platform, state, out),
        #[cfg(feature = "temp")]
        Producer::Temp(state) => produce_temp(state, out),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bus::test_support::FakePlatform;

    fn catalog_with_one_device() -> std::vec::Vec<u8> {
        let mut body = std::vec::Vec::new();
        body.extend_from_slice(b"adc0\0");
        body.extend_from_slice(&0x10u32.to_be_bytes());
        body.extend_from_slice(&16u32.to_be_bytes());
        body.push(1);
        let mut blob = std::vec::Vec::new();
        blob.extend_from_slice(&(body.len() as u16).to_be_bytes());
        blob.extend_from_slice(&body);
        blob
    }

    #[test]
    fn help_streams_full_banner_across_small_buffers() {
        let mut state = Help::default();
        let mut collected = std::vec::Vec::new();
        loop {
            let mut buf = [0u8; 7];
            let n = produce_help(&mut state, &mut buf);
            collected.extend_from_slice(&buf[..n]);
            if n < buf.len() {
                break;
            }
        }
        assert_eq!(collected, HELP_BANNER.as_bytes());
    }

    #[test]
    fn listing_text_formats_minimal_width_hex_fields() {
        let blob = catalog_with_one_device();
        let mut platform = FakePlatform::new(blob, 0);
        let mut state = ListingText::default();
        let mut out = [0u8; 256];
        let n = produce_listing_text(&mut platform, &mut state, &mut out);
        assert_eq!(&out[..n], b"adc0\t1\t10\t10\t1\n");
    }

    #[test]
    fn listing_binary_emits_prefix_and_body() {
        let blob = catalog_with_one_device();
        let total_len = blob.len() as u32;
        let mut platform = FakePlatform::new(blob.clone(), 0);
        let mut state = ListingBinary::new(total_len);
        let mut out = std::vec![0u8; total_len as usize];
        let n = produce_listing_binary(&mut platform, &mut state, &mut out);
        assert_eq!(n, total_len as usize);
        assert_eq!(out, blob);
    }

    #[test]
    fn fpga_words_binary_emits_msb_first() {
        let mut platform = FakePlatform::new(std::vec![0, 0], 2);
        platform.write_fpga_word(0, 0xAABBCCDD);
        let mut state = FpgaWordsBinary::new(0, 4);
        let mut out = [0u8; 4];
        let n = produce_fpga_words_binary(&mut platform, &mut state, &mut out);
        assert_eq!(n, 4);
        assert_eq!(out, [0xAA, 0xBB, 0xCC, 0xDD]);
    }

    #[test]
    fn fpga_words_text_renders_full_width_words_with_label() {
        let mut platform = FakePlatform::new(std::vec![0, 0], 4);
        platform.write_fpga_word(0, 0x00000001);
        platform.write_fpga_word(4, 0x00000002);
        let mut state = FpgaWordsText::new(0, 8);
        let mut out = [0u8; 64];
        let n = produce_fpga_words_text(&mut platform, &mut state, &mut out);
        assert_eq!(&out[..n], b"00000000: 00000001 00000002\n");
    }

    #[test]
    fn bytes_text_labels_increment_by_sixteen_independent_of_address() {
        let mut platform = FakePlatform::new(std::vec::Vec::new(), 0);
        for i in 0..20u32 {
            platform.cpu[0x100 + i as usize] = i as u8;
        }
        let mut state = BytesText::new(0x100, 20);
        let mut out = [0u8; 256];
        let n = produce_bytes_text(&mut platform, &mut state, &mut out);
        let text = std::str::from_utf8(&out[..n]).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("00000000: "));
        assert!(lines.next().unwrap().starts_with("00000010: "));
    }

    #[cfg(feature = "temp")]
    #[test]
    fn temp_emits_big_endian_f32_bits() {
        let mut state = Temp::new(1.0f32);
        let mut out = [0u8; 4];
        let n = produce_temp(&mut state, &mut out);
        assert_eq!(n, 4);
        assert_eq!(out, 1.0f32.to_bits().to_be_bytes());
    }
}
