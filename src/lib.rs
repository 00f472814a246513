//! The serial protocol stack of a marine gateway: an embedded device that
//! bridges NMEA0183 instruments, a touch display, an SD card and a WiFi
//! co-processor to a host computer over USB serial.
//!
//! Everything is byte oriented and poll driven. Nothing here blocks or
//! allocates, and all buffers have a size fixed at compile time.
//!
//! - [`slip`] frames a byte stream (RFC 1055).
//! - [`kommand`] encodes and decodes the messages carried in frames.
//! - [`handler`] routes received kommands to whoever understands them.
//! - [`channel`] ties the three together into the host command channel.
//! - [`proxy`] bridges the host to the co-processor's ROM bootloader for
//!   flashing, following the session from the outside.
//! - [`mode`] picks which of those the host serial line is used for.
//!
//! With the `defmt` feature enabled, the stack logs through [defmt] and its
//! public data types implement `defmt::Format`.
//!
//! [defmt]: https://defmt.ferrous-systems.com/

#![no_std]

#[cfg(test)]
extern crate std;

mod buf;
pub mod channel;
pub mod clock;
pub mod handler;
mod id;
pub mod kommand;
pub mod mode;
pub mod proxy;
pub mod serial;
pub mod slip;

pub use buf::{Buf, BufMut};
pub use generic_array::typenum;
pub use id::KommandId;
pub use kommand::{Kommand, KommandReader, KommandWriter};
