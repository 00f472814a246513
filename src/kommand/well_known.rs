//! Kommands with fixed layouts that are shared between the gateway, the host
//! application and the WiFi co-processor.

use core::net::Ipv4Addr;

use generic_array::{
    typenum::{U10, U128, U256, U6, U96},
    ArrayLength,
};

use super::{DecodeError, Kommand, KommandReader, KommandWriter};
use crate::KommandId;

/// `Ping(echo_id)`, answered by a [`Pong`] carrying the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ping {
    pub echo_id: u32,
}

impl<'a> Kommand<'a> for Ping {
    const ID: KommandId = KommandId::Ping;

    type EncodedLen = U6;

    fn encode(&self, writer: &mut KommandWriter<U6>) {
        writer.append_u32(self.echo_id);
    }

    fn decode_fields(reader: &mut KommandReader<'a>) -> Result<Self, DecodeError> {
        Ok(Self {
            echo_id: reader.field_u32()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pong {
    pub echo_id: u32,
}

impl<'a> Kommand<'a> for Pong {
    const ID: KommandId = KommandId::Pong;

    type EncodedLen = U6;

    fn encode(&self, writer: &mut KommandWriter<U6>) {
        writer.append_u32(self.echo_id);
    }

    fn decode_fields(reader: &mut KommandReader<'a>) -> Result<Self, DecodeError> {
        Ok(Self {
            echo_id: reader.field_u32()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warning = 2,
    Error = 3,
}

impl LogLevel {
    #[must_use]
    pub const fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(Self::Debug),
            1 => Some(Self::Info),
            2 => Some(Self::Warning),
            3 => Some(Self::Error),
            _ => None,
        }
    }
}

/// A log line, emitted by the gateway in debug mode or relayed from the
/// co-processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Log<'a> {
    pub level: LogLevel,
    pub line: u16,
    pub filename: &'a str,
    pub message: &'a str,
}

impl<'a> Kommand<'a> for Log<'a> {
    const ID: KommandId = KommandId::Log;

    type EncodedLen = U256;

    fn encode(&self, writer: &mut KommandWriter<U256>) {
        writer.append_u16(self.level as u16);
        writer.append_u16(self.line);
        writer.append_u16(u16::try_from(self.filename.len()).unwrap_or(u16::MAX));
        writer.append_cstr(self.filename);
        writer.append_cstr(self.message);
    }

    fn decode_fields(reader: &mut KommandReader<'a>) -> Result<Self, DecodeError> {
        let level = LogLevel::from_u16(reader.field_u16()?).ok_or(DecodeError::InvalidValue)?;
        let line = reader.field_u16()?;
        let filename_len = reader.field_u16()?;
        let filename = reader.field_cstr()?;
        if filename.len() != filename_len as usize {
            return Err(DecodeError::InvalidValue);
        }

        Ok(Self {
            level,
            line,
            filename,
            message: reader.field_cstr()?,
        })
    }
}

/// One NMEA0183 sentence, checksum and all, without line terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NmeaSentence<'a> {
    pub sentence: &'a str,
}

impl<'a> Kommand<'a> for NmeaSentence<'a> {
    const ID: KommandId = KommandId::NmeaSentence;

    // 82 characters is the NMEA0183 maximum, some talkers exceed it
    type EncodedLen = U96;

    fn encode(&self, writer: &mut KommandWriter<U96>) {
        writer.append_cstr(self.sentence);
    }

    fn decode_fields(reader: &mut KommandReader<'a>) -> Result<Self, DecodeError> {
        Ok(Self {
            sentence: reader.field_cstr()?,
        })
    }
}

/// Sent by the gateway to the co-processor to (re)configure WiFi.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WiFiConfiguration<'a> {
    pub enabled: bool,
    pub ssid: &'a str,
    pub password: &'a str,
}

impl<'a> Kommand<'a> for WiFiConfiguration<'a> {
    const ID: KommandId = KommandId::WiFiConfiguration;

    type EncodedLen = U128;

    fn encode(&self, writer: &mut KommandWriter<U128>) {
        writer.append_u8(self.enabled as u8);
        writer.append_cstr(self.ssid);
        writer.append_cstr(self.password);
    }

    fn decode_fields(reader: &mut KommandReader<'a>) -> Result<Self, DecodeError> {
        Ok(Self {
            enabled: reader.field_u8()? != 0,
            ssid: reader.field_cstr()?,
            password: reader.field_cstr()?,
        })
    }
}

/// Reported by the co-processor whenever its connection changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WiFiStatus {
    pub status: u16,
    pub ip: Ipv4Addr,
}

impl<'a> Kommand<'a> for WiFiStatus {
    const ID: KommandId = KommandId::WiFiStatus;

    type EncodedLen = U10;

    fn encode(&self, writer: &mut KommandWriter<U10>) {
        writer.append_u16(self.status);
        writer.append_u32(u32::from_le_bytes(self.ip.octets()));
    }

    fn decode_fields(reader: &mut KommandReader<'a>) -> Result<Self, DecodeError> {
        Ok(Self {
            status: reader.field_u16()?,
            ip: Ipv4Addr::from(reader.field_u32()?.to_le_bytes()),
        })
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for WiFiStatus {
    fn format(&self, fmt: defmt::Formatter) {
        let [a, b, c, d] = self.ip.octets();
        defmt::write!(fmt, "WiFiStatus({}, {}.{}.{}.{})", self.status, a, b, c, d)
    }
}

/// Why a file request failed, as carried by [`FileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum FileErrorCode {
    NotFound = 1,
    ReadFailed = 2,
    WriteFailed = 3,
    /// The request is missing fields.
    InvalidRequest = 4,
    /// A declared size disagrees with the data that came with it.
    InvalidSize = 5,
}

impl FileErrorCode {
    #[must_use]
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::NotFound),
            2 => Some(Self::ReadFailed),
            3 => Some(Self::WriteFailed),
            4 => Some(Self::InvalidRequest),
            5 => Some(Self::InvalidSize),
            _ => None,
        }
    }
}

/// Failure reply to `FileRead` and `FileWrite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FileError {
    pub request_id: u32,
    pub code: FileErrorCode,
}

impl<'a> Kommand<'a> for FileError {
    const ID: KommandId = KommandId::FileError;

    type EncodedLen = U10;

    fn encode(&self, writer: &mut KommandWriter<U10>) {
        writer.append_u32(self.request_id);
        writer.append_u32(self.code as u32);
    }

    fn decode_fields(reader: &mut KommandReader<'a>) -> Result<Self, DecodeError> {
        Ok(Self {
            request_id: reader.field_u32()?,
            code: FileErrorCode::from_u32(reader.field_u32()?).ok_or(DecodeError::InvalidValue)?,
        })
    }
}

/// Header of the `FileReadReply` and `FileWriteReply` kommands, followed by
/// the data in a read reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FileChunk {
    pub request_id: u32,
    pub offset: u32,
    pub size: u32,
}

impl FileChunk {
    pub fn append_to<N: ArrayLength>(&self, writer: &mut KommandWriter<N>) {
        writer.append_u32(self.request_id);
        writer.append_u32(self.offset);
        writer.append_u32(self.size);
    }

    pub fn read_from(reader: &mut KommandReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            request_id: reader.field_u32()?,
            offset: reader.field_u32()?,
            size: reader.field_u32()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use core::net::Ipv4Addr;

    use super::{FileError, FileErrorCode, Log, LogLevel, Ping, Pong, WiFiConfiguration, WiFiStatus};
    use crate::kommand::{DecodeError, Kommand, KommandReader};
    use crate::KommandId;

    #[test]
    fn ping_wire_bytes() {
        let writer = Ping { echo_id: 42 }.to_writer();
        assert_eq!(writer.bytes(), &[0x00, 0x00, 0x2a, 0x00, 0x00, 0x00]);

        assert_eq!(Ping::decode(&writer.reader()), Ok(Ping { echo_id: 42 }));
    }

    #[test]
    fn decode_checks_identifier() {
        let writer = Pong { echo_id: 7 }.to_writer();

        assert_eq!(
            Ping::decode(&writer.reader()),
            Err(DecodeError::WrongIdentifier {
                expected: KommandId::Ping,
                actual: 0x01
            })
        );
    }

    #[test]
    fn decode_ignores_reader_position() {
        let writer = Ping { echo_id: 9 }.to_writer();
        let mut reader = writer.reader();
        reader.read_u32();

        assert_eq!(Ping::decode(&reader), Ok(Ping { echo_id: 9 }));
    }

    #[test]
    fn log_layout() {
        let log = Log {
            level: LogLevel::Warning,
            line: 312,
            filename: "proxy.rs",
            message: "header size mismatch",
        };
        let writer = log.to_writer();
        let bytes = writer.bytes();

        assert_eq!(&bytes[..8], &[0x10, 0x00, 0x02, 0x00, 0x38, 0x01, 0x08, 0x00]);
        assert_eq!(&bytes[8..17], b"proxy.rs\0");
        assert_eq!(Log::decode(&writer.reader()), Ok(log));
    }

    #[test]
    fn huge_filename_length_saturates() {
        let filename = "a".repeat(70_000);
        let writer = Log {
            level: LogLevel::Info,
            line: 1,
            filename: &filename,
            message: "",
        }
        .to_writer();

        assert_eq!(&writer.bytes()[6..8], &[0xff, 0xff]);
        assert!(writer.is_truncated());
    }

    #[test]
    fn log_with_lying_filename_length() {
        let bytes = b"\x10\x00\x01\x00\x01\x00\x03\x00main.rs\0hi\0";

        assert_eq!(
            Log::decode(&KommandReader::from(&bytes[..])),
            Err(DecodeError::InvalidValue)
        );
    }

    #[test]
    fn truncated_fields() {
        let bytes = [0x60, 0x00, 0x01, b'n', b'e', b't'];

        assert_eq!(
            WiFiConfiguration::decode(&KommandReader::from(&bytes[..])),
            Err(DecodeError::MissingString)
        );
        assert_eq!(
            FileError::decode(&KommandReader::from(&[0x5f, 0x00, 0x01][..])),
            Err(DecodeError::Truncated)
        );
    }

    #[test]
    fn wifi_status_address_order() {
        let status = WiFiStatus {
            status: 2,
            ip: Ipv4Addr::new(192, 168, 4, 1),
        };
        let writer = status.to_writer();

        assert_eq!(&writer.bytes()[4..], &[192, 168, 4, 1]);
        assert_eq!(WiFiStatus::decode(&writer.reader()), Ok(status));
    }

    #[test]
    fn file_error_codes() {
        let error = FileError {
            request_id: 3,
            code: FileErrorCode::InvalidSize,
        };

        assert_eq!(
            error.to_writer().bytes(),
            &[0x5f, 0x00, 3, 0, 0, 0, 5, 0, 0, 0]
        );
        assert_eq!(FileErrorCode::from_u32(9), None);
    }
}
