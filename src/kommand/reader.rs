use super::HEADER_LEN;
use crate::{buf::Buf, KommandId};

/// Reads the fields of a received kommand in order, without copying.
///
/// Reads never fail loudly: a numeric field past the end reads as 0 and a
/// string without terminator reads as `None`, leaving the cursor where it
/// was. Callers that need to tell a genuine 0 from an underrun check
/// [`KommandReader::remaining`] first or use the `try_` variants.
#[derive(Debug, Clone)]
pub struct KommandReader<'a> {
    buf: &'a [u8],
    cursor: usize,
}

impl<'a> KommandReader<'a> {
    /// Wrap the first `total_len` bytes of `buf`, identifier included.
    #[must_use]
    pub fn new(buf: &'a [u8], total_len: usize) -> Self {
        let buf = &buf[..total_len.min(buf.len())];

        Self {
            buf,
            cursor: HEADER_LEN.min(buf.len()),
        }
    }

    /// The identifier, or 0 if the kommand is too short to carry one.
    #[must_use]
    pub fn identifier(&self) -> u16 {
        let mut header = self.buf;
        header.get_u16().unwrap_or(0)
    }

    #[must_use]
    pub fn kommand_id(&self) -> Option<KommandId> {
        if self.buf.len() < HEADER_LEN {
            return None;
        }

        KommandId::from_u16(self.identifier())
    }

    pub fn read_u8(&mut self) -> u8 {
        self.try_read_u8().unwrap_or(0)
    }

    pub fn read_u16(&mut self) -> u16 {
        self.try_read_u16().unwrap_or(0)
    }

    pub fn read_u32(&mut self) -> u32 {
        self.try_read_u32().unwrap_or(0)
    }

    pub fn try_read_u8(&mut self) -> Option<u8> {
        self.advance(|rest| rest.get_u8())
    }

    pub fn try_read_u16(&mut self) -> Option<u16> {
        self.advance(|rest| rest.get_u16())
    }

    pub fn try_read_u32(&mut self) -> Option<u32> {
        self.advance(|rest| rest.get_u32())
    }

    /// Read a NUL-terminated string and step past its terminator.
    ///
    /// `None` if no terminator occurs before the end or the bytes are not
    /// UTF-8.
    pub fn read_cstr(&mut self) -> Option<&'a str> {
        let rest = self.rest();
        let nul = rest.iter().position(|&b| b == 0)?;
        let s = core::str::from_utf8(&rest[..nul]).ok()?;

        self.cursor += nul + 1;
        Some(s)
    }

    /// Read exactly `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        self.advance(|rest| rest.get_slice(len))
    }

    /// Everything after the cursor.
    #[inline]
    #[must_use]
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.cursor..]
    }

    /// Number of bytes after the cursor.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.cursor
    }

    /// Offset of the next field from the start of the kommand.
    #[inline]
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Total length, identifier included.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The whole kommand as received.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.buf
    }

    /// Move the cursor back to the first field.
    pub fn rewind(&mut self) {
        self.cursor = HEADER_LEN.min(self.buf.len());
    }

    fn advance<T>(&mut self, read: impl FnOnce(&mut &'a [u8]) -> Option<T>) -> Option<T> {
        let mut rest = self.rest();
        let value = read(&mut rest)?;

        self.cursor = self.buf.len() - rest.len();
        Some(value)
    }
}

impl<'a> From<&'a [u8]> for KommandReader<'a> {
    fn from(buf: &'a [u8]) -> Self {
        Self::new(buf, buf.len())
    }
}

#[cfg(test)]
mod tests {
    use super::KommandReader;
    use crate::KommandId;

    #[test]
    fn identifier_only() {
        let mut reader = KommandReader::from(&[0x2a, 0x00][..]);

        assert_eq!(reader.identifier(), 42);
        assert_eq!(reader.read_u8(), 0);
        assert_eq!(reader.read_u16(), 0);
        assert_eq!(reader.read_u32(), 0);
        assert_eq!(reader.read_cstr(), None);
        assert_eq!(reader.cursor(), 2);
    }

    #[test]
    fn degenerate_buffers() {
        let mut reader = KommandReader::from(&[0x01][..]);

        assert_eq!(reader.identifier(), 0);
        assert_eq!(reader.kommand_id(), None);
        assert_eq!(reader.read_u8(), 0);
        assert_eq!(reader.remaining(), 0);

        let reader = KommandReader::from(&[0u8; 0][..]);
        assert_eq!(reader.identifier(), 0);
        assert!(reader.is_empty());
    }

    #[test]
    fn total_len_limits_the_view() {
        let buf = [0x00, 0x00, 0x2a, 0x00, 0x00, 0x00, 0xff, 0xff];
        let mut reader = KommandReader::new(&buf, 6);

        assert_eq!(reader.kommand_id(), Some(KommandId::Ping));
        assert_eq!(reader.read_u32(), 42);
        assert_eq!(reader.read_u8(), 0);

        let reader = KommandReader::new(&buf, 100);
        assert_eq!(reader.len(), buf.len());
    }

    #[test]
    fn short_field_does_not_move_cursor() {
        let mut reader = KommandReader::from(&[0x40, 0x00, 0x01, 0x02, 0x03][..]);

        assert_eq!(reader.try_read_u32(), None);
        assert_eq!(reader.cursor(), 2);
        assert_eq!(reader.read_u16(), 0x0201);
        assert_eq!(reader.read_u8(), 3);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn strings_in_sequence() {
        let mut reader = KommandReader::from(&b"\x60\x00\x01home\0secret\0tail"[..]);

        assert_eq!(reader.read_u8(), 1);
        assert_eq!(reader.read_cstr(), Some("home"));
        assert_eq!(reader.read_cstr(), Some("secret"));
        assert_eq!(reader.read_cstr(), None);
        assert_eq!(reader.rest(), b"tail");
    }

    #[test]
    fn invalid_utf8_is_not_a_string() {
        let mut reader = KommandReader::from(&[0x10, 0x00, 0xff, 0xfe, 0x00][..]);

        assert_eq!(reader.read_cstr(), None);
        assert_eq!(reader.read_bytes(3), Some(&[0xff, 0xfe, 0x00][..]));
    }
}
