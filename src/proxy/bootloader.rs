//! Just enough of the ESP ROM bootloader's serial protocol to follow a
//! flashing session from the outside.
//!
//! Every packet is a SLIP frame starting with an 8-byte header:
//!
//! | offset | size | field                                   |
//! |--------|------|-----------------------------------------|
//! | 0      | 1    | direction, 0 for requests, 1 for replies |
//! | 1      | 1    | opcode                                  |
//! | 2      | 2    | size of the data that follows           |
//! | 4      | 4    | checksum (requests) or value (replies)  |

use crate::buf::Buf;

pub const HEADER_LEN: usize = 8;

pub const DIRECTION_REQUEST: u8 = 0x00;
pub const DIRECTION_RESPONSE: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Opcode {
    FlashBegin = 0x02,
    FlashData = 0x03,
    FlashEnd = 0x04,
    MemBegin = 0x05,
    MemEnd = 0x06,
    MemData = 0x07,
    Sync = 0x08,
    WriteReg = 0x09,
    ReadReg = 0x0a,
    SpiSetParams = 0x0b,
    SpiAttach = 0x0d,
    ChangeBaudrate = 0x0f,
    FlashDeflBegin = 0x10,
    FlashDeflData = 0x11,
    FlashDeflEnd = 0x12,
}

impl Opcode {
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0x02 => Self::FlashBegin,
            0x03 => Self::FlashData,
            0x04 => Self::FlashEnd,
            0x05 => Self::MemBegin,
            0x06 => Self::MemEnd,
            0x07 => Self::MemData,
            0x08 => Self::Sync,
            0x09 => Self::WriteReg,
            0x0a => Self::ReadReg,
            0x0b => Self::SpiSetParams,
            0x0d => Self::SpiAttach,
            0x0f => Self::ChangeBaudrate,
            0x10 => Self::FlashDeflBegin,
            0x11 => Self::FlashDeflData,
            0x12 => Self::FlashDeflEnd,
            _ => return None,
        })
    }

    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootloaderHeader {
    pub direction: u8,
    pub opcode: u8,
    pub size: u16,
    pub checksum: u32,
}

impl BootloaderHeader {
    /// Read the header at the start of a frame, or `None` if the frame is
    /// too short to hold one.
    #[must_use]
    pub fn parse(mut frame: &[u8]) -> Option<Self> {
        Some(Self {
            direction: frame.get_u8()?,
            opcode: frame.get_u8()?,
            size: frame.get_u16()?,
            checksum: frame.get_u32()?,
        })
    }

    #[inline]
    #[must_use]
    pub fn is_request(&self) -> bool {
        self.direction == DIRECTION_REQUEST
    }

    #[inline]
    #[must_use]
    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::from_u8(self.opcode)
    }

    /// Whether `frame`, of which this is the header, carries exactly the
    /// amount of data the header announces.
    #[inline]
    #[must_use]
    pub fn matches_len(&self, frame_len: usize) -> bool {
        frame_len == HEADER_LEN + usize::from(self.size)
    }
}
