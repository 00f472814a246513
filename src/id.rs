/// Kommand identifiers, the first two bytes (little-endian) of every frame
/// payload.
///
/// Requests and their replies come in pairs where one exists. Identifiers
/// not listed here can still travel through the stack as raw `u16`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum KommandId {
    Ping = 0x00,
    Pong = 0x01,
    /// Sent back when no handler claimed a kommand.
    Err = 0x0f,
    Log = 0x10,
    Screenshot = 0x30,
    ScreenshotData = 0x31,
    NmeaSentence = 0x40,
    FileRead = 0x50,
    FileReadReply = 0x51,
    FileWrite = 0x52,
    FileWriteReply = 0x53,
    FileError = 0x5f,
    WiFiConfiguration = 0x60,
    WiFiStatus = 0x61,
}

impl KommandId {
    #[must_use]
    pub const fn from_u16(value: u16) -> Option<Self> {
        Some(match value {
            0x00 => Self::Ping,
            0x01 => Self::Pong,
            0x0f => Self::Err,
            0x10 => Self::Log,
            0x30 => Self::Screenshot,
            0x31 => Self::ScreenshotData,
            0x40 => Self::NmeaSentence,
            0x50 => Self::FileRead,
            0x51 => Self::FileReadReply,
            0x52 => Self::FileWrite,
            0x53 => Self::FileWriteReply,
            0x5f => Self::FileError,
            0x60 => Self::WiFiConfiguration,
            0x61 => Self::WiFiStatus,
            _ => return None,
        })
    }

    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// The identifier a successful reply to this request carries.
    #[must_use]
    pub const fn reply(self) -> Option<Self> {
        match self {
            Self::Ping => Some(Self::Pong),
            Self::Screenshot => Some(Self::ScreenshotData),
            Self::FileRead => Some(Self::FileReadReply),
            Self::FileWrite => Some(Self::FileWriteReply),
            _ => None,
        }
    }
}

impl From<KommandId> for u16 {
    fn from(id: KommandId) -> Self {
        id.as_u16()
    }
}

impl TryFrom<u16> for KommandId {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::from_u16(value).ok_or(value)
    }
}
