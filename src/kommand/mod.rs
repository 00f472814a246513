//! Kommands are the messages exchanged over the command channel: a 2-byte
//! little-endian identifier followed by positional fields (fixed width
//! little-endian integers, NUL-terminated strings, raw bytes). There are no
//! tags and no lengths on the wire besides the frame itself, so both ends
//! must agree on the field order for every identifier.

use core::fmt;

use generic_array::ArrayLength;

use crate::KommandId;

mod reader;
pub mod well_known;
mod writer;

pub use reader::KommandReader;
pub use writer::KommandWriter;

/// Length of the identifier that starts every kommand.
pub const HEADER_LEN: usize = 2;

/// A kommand with a known layout, encoded into a writer sized for it.
pub trait Kommand<'a>: Sized {
    const ID: KommandId;

    /// Capacity of the writer this kommand is encoded into, identifier
    /// included. Encoding more than that truncates.
    type EncodedLen: ArrayLength;

    fn encode(&self, writer: &mut KommandWriter<Self::EncodedLen>);

    /// Decode the fields, the reader being positioned on the first one.
    fn decode_fields(reader: &mut KommandReader<'a>) -> Result<Self, DecodeError>;

    /// Decode a received kommand after checking its identifier.
    fn decode(kommand: &KommandReader<'a>) -> Result<Self, DecodeError> {
        let actual = kommand.identifier();
        if actual != Self::ID.as_u16() {
            return Err(DecodeError::WrongIdentifier {
                expected: Self::ID,
                actual,
            });
        }

        let mut fields = kommand.clone();
        fields.rewind();
        Self::decode_fields(&mut fields)
    }

    fn to_writer(&self) -> KommandWriter<Self::EncodedLen> {
        let mut writer = KommandWriter::new(Self::ID);
        self.encode(&mut writer);
        writer
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    WrongIdentifier { expected: KommandId, actual: u16 },
    /// A numeric or raw field extends past the end of the kommand.
    Truncated,
    /// A string field has no terminator or is not UTF-8.
    MissingString,
    /// A field holds a value outside its defined range.
    InvalidValue,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongIdentifier { expected, actual } => {
                write!(f, "expected kommand {expected:?}, got {actual:#06x}")
            }
            Self::Truncated => f.write_str("kommand ends before all fields were read"),
            Self::MissingString => f.write_str("string field is unterminated or not UTF-8"),
            Self::InvalidValue => f.write_str("field value out of range"),
        }
    }
}

impl<'a> KommandReader<'a> {
    pub(crate) fn field_u8(&mut self) -> Result<u8, DecodeError> {
        self.try_read_u8().ok_or(DecodeError::Truncated)
    }

    pub(crate) fn field_u16(&mut self) -> Result<u16, DecodeError> {
        self.try_read_u16().ok_or(DecodeError::Truncated)
    }

    pub(crate) fn field_u32(&mut self) -> Result<u32, DecodeError> {
        self.try_read_u32().ok_or(DecodeError::Truncated)
    }

    pub(crate) fn field_cstr(&mut self) -> Result<&'a str, DecodeError> {
        self.read_cstr().ok_or(DecodeError::MissingString)
    }
}
