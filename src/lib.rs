#![cfg_attr(not(test), no_std)]

//! Request resolver and transfer codecs for a TFTP-style file-transfer
//! server that exposes gateware registers, raw FPGA/CPU address space and
//! a device catalog as a virtual filesystem.
//!
//! The engine embedding this crate owns the wire protocol itself
//! (retransmission, block numbering, timeouts); this crate only answers
//! `open`/`produce`/`consume`. See [`resolver::open`] for the entry point
//! and [`bus::Platform`] for the hardware boundary the embedding
//! application implements.

#[macro_use]
extern crate enum_primitive;

#[macro_use]
extern crate static_assertions;

pub mod banner;
pub mod bus;
pub mod catalog;
pub mod hex;
pub mod read;
pub mod resolver;
pub mod transfer;
pub mod write;

pub use bus::Platform;
pub use catalog::DeviceDescriptor;
pub use resolver::{open, Direction, OpenError};
pub use transfer::{ConsumeError, Transfer};
