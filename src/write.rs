//! The two streaming write consumers: a binary FPGA-word writer and an
//! ASCII hexdump parser, both tolerant of the client's data arriving split
//! across arbitrarily many packets.

use crate::bus::Platform;
use crate::hex;
use crate::transfer::{ConsumeError, LineBuffer};

/// State for a binary FPGA-word write: accumulates 4 bytes MSB-first into
/// a word, then stores it and advances. A trailing partial word (1-3
/// leftover bytes when the transfer ends) is dropped silently rather than
/// flushed or rejected.
#[derive(Debug, Clone, Copy)]
pub struct FpgaWordsBinary {
    cursor: u32,
    remaining: Option<u32>,
    accumulator: u32,
    accumulated_bytes: u8,
}

impl FpgaWordsBinary {
    pub fn new(cursor: u32, remaining: Option<u32>) -> Self {
        FpgaWordsBinary {
            cursor,
            remaining,
            accumulator: 0,
            accumulated_bytes: 0,
        }
    }
}

/// State for an ASCII hexdump write: a per-transfer line buffer plus
/// whether a `:` label separator has already been seen on the current
/// line.
#[derive(Clone, Copy)]
pub struct FpgaWordsText {
    cursor: u32,
    remaining: Option<u32>,
    line: LineBuffer,
    colon_seen: bool,
}

impl FpgaWordsText {
    pub fn new(cursor: u32, remaining: Option<u32>) -> Self {
        FpgaWordsText {
            cursor,
            remaining,
            line: LineBuffer::default(),
            colon_seen: false,
        }
    }
}

/// The write-direction codec kinds.
pub enum Consumer {
    FpgaWordsBinary(FpgaWordsBinary),
    FpgaWordsText(FpgaWordsText),
}

fn consume_fpga_words_binary(
    platform: &mut dyn Platform,
    state: &mut FpgaWordsBinary,
    chain: &[&[u8]],
) -> Result<usize, ConsumeError> {
    let mut consumed = 0;
    for fragment in chain {
        for &byte in *fragment {
            if let Some(remaining) = state.remaining {
                if remaining == 0 {
                    return Err(ConsumeError::Overflow);
                }
            }

            state.accumulator = (state.accumulator << 8) | u32::from(byte);
            state.accumulated_bytes += 1;
            consumed += 1;
            if let Some(remaining) = state.remaining.as_mut() {
                *remaining -= 1;
            }

            if state.accumulated_bytes == 4 {
                platform.write_fpga_word(state.cursor, state.accumulator);
                state.cursor += 4;
                state.accumulator = 0;
                state.accumulated_bytes = 0;
            }
        }
    }
    Ok(consumed)
}

/// Writes one parsed word to the platform, honoring the remaining-byte
/// bound the same way the binary consumer does.
fn write_parsed_word(
    platform: &mut dyn Platform,
    state: &mut FpgaWordsText,
    word: u32,
) -> Result<(), ConsumeError> {
    if let Some(remaining) = state.remaining {
        if remaining < 4 {
            return Err(ConsumeError::Overflow);
        }
    }
    platform.write_fpga_word(state.cursor, word);
    state.cursor += 4;
    if let Some(remaining) = state.remaining.as_mut() {
        *remaining -= 4;
    }
    Ok(())
}

fn is_hex_digit(c: u8) -> bool {
    c.is_ascii_hexdigit()
}

fn is_ascii_space(c: u8) -> bool {
    c == b' ' || c == b'\t' || c == b'\r'
}

/// Parses one buffered, fully-formed line (colon label already stripped
/// by the caller) into successive 32-bit words, writing each through.
fn process_line(
    platform: &mut dyn Platform,
    state: &mut FpgaWordsText,
) -> Result<(), ConsumeError> {
    let mut rest = state.line.as_slice();
    while !rest.is_empty() {
        if is_ascii_space(rest[0]) {
            rest = &rest[1..];
            continue;
        }
        if !is_hex_digit(rest[0]) {
            break;
        }
        let run_end = rest
            .iter()
            .position(|&c| !is_hex_digit(c))
            .unwrap_or(rest.len());
        let mut run = &rest[..run_end];
        while !run.is_empty() {
            let (consumed, word) = hex::parse_word(run);
            if consumed == 0 {
                break;
            }
            write_parsed_word(platform, state, word)?;
            run = &run[consumed..];
        }
        rest = &rest[run_end..];
    }
    Ok(())
}

fn consume_fpga_words_text(
    platform: &mut dyn Platform,
    state: &mut FpgaWordsText,
    chain: &[&[u8]],
) -> Result<usize, ConsumeError> {
    let mut consumed = 0;
    for fragment in chain {
        for &c in *fragment {
            consumed += 1;

            if state.line.is_empty() && is_ascii_space(c) && c != b'\n' {
                continue;
            }

            if c == b':' && !state.colon_seen {
                state.colon_seen = true;
                state.line.clear();
                continue;
            }

            if c != b'\n' {
                state
                    .line
                    .push(c)
                    .map_err(|_| ConsumeError::LineTooLong)?;
                continue;
            }

            process_line(platform, state)?;
            state.line.clear();
            state.colon_seen = false;
        }
    }
    Ok(consumed)
}

/// Dispatches a `consume` call to the bound codec.
pub fn consume(
    platform: &mut dyn Platform,
    consumer: &mut Consumer,
    chain: &[&[u8]],
) -> Result<usize, ConsumeError> {
    match consumer {
        Consumer::FpgaWordsBinary(state) => consume_fpga_words_binary(platform, state, chain),
        Consumer::FpgaWordsText(state) => consume_fpga_words_text(platform, state, chain),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bus::test_support::FakePlatform;

    #[test]
    fn binary_writer_assembles_msb_first_words() {
        let mut platform = FakePlatform::new(std::vec::Vec::new(), 2);
        let mut state = FpgaWordsBinary::new(0, Some(8));
        let chain: [&[u8]; 1] = [&[0xAA, 0xBB, 0xCC, 0xDD, 0x11, 0x22, 0x33, 0x44]];
        let n = consume_fpga_words_binary(&mut platform, &mut state, &chain).unwrap();
        assert_eq!(n, 8);
        assert_eq!(platform.read_fpga_word(0), 0xAABBCCDD);
        assert_eq!(platform.read_fpga_word(4), 0x11223344);
    }

    #[test]
    fn binary_writer_drops_trailing_partial_word() {
        let mut platform = FakePlatform::new(std::vec::Vec::new(), 1);
        let mut state = FpgaWordsBinary::new(0, Some(8));
        let chain: [&[u8]; 1] = [&[0xAA, 0xBB, 0xCC]];
        let n = consume_fpga_words_binary(&mut platform, &mut state, &chain).unwrap();
        assert_eq!(n, 3);
        // Word never flushed: still zero.
        assert_eq!(platform.read_fpga_word(0), 0);
    }

    #[test]
    fn binary_writer_fails_past_bound() {
        let mut platform = FakePlatform::new(std::vec::Vec::new(), 1);
        let mut state = FpgaWordsBinary::new(0, Some(4));
        let chain: [&[u8]; 1] = [&[0, 0, 0, 0, 0xFF]];
        let err = consume_fpga_words_binary(&mut platform, &mut state, &chain).unwrap_err();
        assert_eq!(err, ConsumeError::Overflow);
    }

    #[test]
    fn text_writer_accepts_labeled_bytes() {
        let mut platform = FakePlatform::new(std::vec::Vec::new(), 1);
        let mut state = FpgaWordsText::new(0, Some(4));
        let chain: [&[u8]; 1] = [b"label: 00000011\n"];
        consume_fpga_words_text(&mut platform, &mut state, &chain).unwrap();
        assert_eq!(platform.read_fpga_word(0), 0x11);
    }

    #[test]
    fn text_writer_accepts_run_of_digits_without_spaces() {
        // A single run of 16 hex digits with no separating whitespace
        // yields two words, taken 8 digits at a time.
        let mut platform = FakePlatform::new(std::vec::Vec::new(), 2);
        let mut state = FpgaWordsText::new(0, Some(8));
        let chain: [&[u8]; 1] = [b"0000000000000011\n"];
        consume_fpga_words_text(&mut platform, &mut state, &chain).unwrap();
        assert_eq!(platform.read_fpga_word(0), 0x00000000);
        assert_eq!(platform.read_fpga_word(4), 0x00000011);
    }

    #[test]
    fn text_writer_line_can_straddle_packet_boundary() {
        let mut platform = FakePlatform::new(std::vec::Vec::new(), 1);
        let mut state = FpgaWordsText::new(0, Some(4));
        let chain: [&[u8]; 2] = [b"0000", b"00FF\n"];
        consume_fpga_words_text(&mut platform, &mut state, &chain).unwrap();
        assert_eq!(platform.read_fpga_word(0), 0xFF);
    }

    #[test]
    fn text_writer_overflowing_line_is_fatal() {
        let mut platform = FakePlatform::new(std::vec::Vec::new(), 64);
        let mut state = FpgaWordsText::new(0, None);
        let long_line = std::vec![b'0'; crate::transfer::LINE_BUFFER_CAPACITY + 1];
        let chain: [&[u8]; 1] = [&long_line];
        let err = consume_fpga_words_text(&mut platform, &mut state, &chain).unwrap_err();
        assert_eq!(err, ConsumeError::LineTooLong);
    }
}
