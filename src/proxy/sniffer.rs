//! Follows SLIP frame boundaries in a relayed byte stream.
//!
//! Nothing is buffered beyond a bootloader header, so frames of any length
//! pass through the bridge while their opcode can still be read.

use super::bootloader::{BootloaderHeader, HEADER_LEN};
use crate::slip::{END, ESC, ESC_END, ESC_ESC};

/// A frame a [`FrameSniffer`] saw end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(super) struct Sniffed {
    /// `None` when the frame is shorter than a header.
    pub header: Option<BootloaderHeader>,
    /// Unescaped length of the whole frame.
    pub len: usize,
}

#[derive(Debug, Clone, Default)]
pub(super) struct FrameSniffer {
    head: [u8; HEADER_LEN],
    len: usize,
    escaping: bool,
    invalid: bool,
    invalid_frames: u32,
}

impl FrameSniffer {
    pub const fn new() -> Self {
        Self {
            head: [0; HEADER_LEN],
            len: 0,
            escaping: false,
            invalid: false,
            invalid_frames: 0,
        }
    }

    /// Look at the next byte of the stream. Returns the frame it ends, if
    /// any. Empty frames and frames with a bad escape sequence are not
    /// reported; the latter are counted in [`FrameSniffer::invalid_frames`].
    pub fn feed(&mut self, byte: u8) -> Option<Sniffed> {
        if byte == END {
            return self.finish();
        }

        if self.escaping {
            self.escaping = false;
            match byte {
                ESC_END => self.push(END),
                ESC_ESC => self.push(ESC),
                _ => self.invalid = true,
            }
        } else if byte == ESC {
            self.escaping = true;
        } else {
            self.push(byte);
        }

        None
    }

    /// Forget the frame in progress.
    pub fn reset(&mut self) {
        self.len = 0;
        self.escaping = false;
        self.invalid = false;
    }

    #[inline]
    pub fn invalid_frames(&self) -> u32 {
        self.invalid_frames
    }

    fn push(&mut self, byte: u8) {
        if let Some(slot) = self.head.get_mut(self.len) {
            *slot = byte;
        }
        self.len = self.len.saturating_add(1);
    }

    fn finish(&mut self) -> Option<Sniffed> {
        let invalid = self.invalid || self.escaping;
        let len = self.len;
        self.reset();

        if invalid {
            self.invalid_frames = self.invalid_frames.wrapping_add(1);
            return None;
        }

        (len > 0).then(|| Sniffed {
            header: BootloaderHeader::parse(&self.head[..len.min(HEADER_LEN)]),
            len,
        })
    }
}
