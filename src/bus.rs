//! The `Platform` trait: the hardware boundary every codec and the
//! resolver work against. The embedding firmware implements this once,
//! against its own bus/register driver, and hands a `&mut dyn Platform`
//! to [`crate::resolver::open`] for the lifetime of one transfer.
//!
//! Everything above this boundary treats FPGA words as logical big-endian
//! values and never branches on host endianness; whatever byte-swapping
//! the physical bus needs is the implementor's job, done inside
//! `read_fpga_word`/`write_fpga_word`.

use crate::catalog::{self, DeviceDescriptor};

/// Hardware access and catalog lookup, as required by the transfer codecs.
pub trait Platform {
    /// The raw catalog blob, as described in [`crate::catalog`].
    fn catalog(&self) -> &[u8];

    /// Looks up a device by name. The default implementation scans
    /// [`Platform::catalog`] linearly; a platform with a faster index is
    /// free to override it.
    fn find_device(&self, name: &str) -> Option<DeviceDescriptor> {
        catalog::lookup(self.catalog(), name)
    }

    /// Reads one 32-bit word from FPGA space at a word-aligned byte
    /// address.
    fn read_fpga_word(&mut self, addr: u32) -> u32;

    /// Writes one 32-bit word to FPGA space at a word-aligned byte
    /// address.
    fn write_fpga_word(&mut self, addr: u32, word: u32);

    /// Size of the FPGA address space, in bytes, for bounds checks.
    fn fpga_region_len(&self) -> u32;

    /// Reads a single byte from CPU space.
    fn read_cpu_byte(&mut self, addr: u32) -> u8;

    /// Reads `buf.len()` consecutive bytes from CPU space starting at
    /// `addr`. The default loops over [`Platform::read_cpu_byte`], the same
    /// way the teacher's `Uart::read` loops over `Uart::read_byte`;
    /// override this if the platform has a faster bulk path.
    fn read_cpu(&mut self, addr: u32, buf: &mut [u8]) {
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = self.read_cpu_byte(addr.wrapping_add(i as u32));
        }
    }

    /// Current board temperature, if this platform has a sensor. The
    /// default of `None` makes `/temp` 404 identically to the `temp`
    /// feature being compiled out.
    fn temperature(&mut self) -> Option<f32> {
        None
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use byteorder::{BigEndian, ByteOrder};

    /// A minimal in-memory `Platform` used by the other modules' unit
    /// tests and by `resolver`'s end-to-end scenario tests.
    pub struct FakePlatform {
        pub catalog: std::vec::Vec<u8>,
        pub fpga: std::vec::Vec<u8>,
        pub cpu: std::vec::Vec<u8>,
        pub temp: Option<f32>,
    }

    impl FakePlatform {
        pub fn new(catalog: std::vec::Vec<u8>, fpga_words: usize) -> Self {
            FakePlatform {
                catalog,
                fpga: std::vec![0u8; fpga_words * 4],
                cpu: std::vec![0u8; 4096],
                temp: None,
            }
        }
    }

    impl Platform for FakePlatform {
        fn catalog(&self) -> &[u8] {
            &self.catalog
        }

        fn read_fpga_word(&mut self, addr: u32) -> u32 {
            let addr = addr as usize;
            BigEndian::read_u32(&self.fpga[addr..addr + 4])
        }

        fn write_fpga_word(&mut self, addr: u32, word: u32) {
            let addr = addr as usize;
            BigEndian::write_u32(&mut self.fpga[addr..addr + 4], word);
        }

        fn fpga_region_len(&self) -> u32 {
            self.fpga.len() as u32
        }

        fn read_cpu_byte(&mut self, addr: u32) -> u8 {
            self.cpu[addr as usize]
        }

        fn temperature(&mut self) -> Option<f32> {
            self.temp
        }
    }
}
