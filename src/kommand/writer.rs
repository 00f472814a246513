use core::fmt;

use generic_array::{ArrayLength, GenericArray};

use super::{KommandReader, HEADER_LEN};
use crate::{buf::BufMut, serial::FrameSink};

/// Builds one kommand in a buffer of `N` bytes, identifier included.
///
/// Fields are appended in order. A field that does not fit in the remaining
/// capacity is dropped whole and the writer remembers it was truncated; what
/// was written before stays valid and can still be sent.
#[derive(Clone)]
pub struct KommandWriter<N: ArrayLength> {
    buf: GenericArray<u8, N>,
    len: usize,
    truncated: bool,
}

impl<N: ArrayLength> KommandWriter<N> {
    /// Start a kommand with the identifier already written.
    pub fn new(id: impl Into<u16>) -> Self {
        let mut writer = Self {
            buf: GenericArray::default(),
            len: 0,
            truncated: false,
        };
        writer.append_u16(id.into());
        writer
    }

    pub fn append_u8(&mut self, value: u8) -> bool {
        self.put_u8(value)
    }

    pub fn append_u16(&mut self, value: u16) -> bool {
        self.put_u16(value)
    }

    pub fn append_u32(&mut self, value: u32) -> bool {
        self.put_u32(value)
    }

    /// Append `s` followed by a NUL byte, or nothing if both do not fit.
    ///
    /// `s` should not contain NUL itself or the reader will stop early.
    pub fn append_cstr(&mut self, s: &str) -> bool {
        if s.len() + 1 > self.remaining() {
            self.truncated = true;
            return false;
        }

        self.put_slice(s.as_bytes()) && self.put_u8(0)
    }

    pub fn append_bytes(&mut self, bytes: &[u8]) -> bool {
        self.put_slice(bytes)
    }

    #[inline]
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        N::USIZE
    }

    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        N::USIZE - self.len
    }

    /// Whether any append has been dropped for lack of space.
    #[inline]
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Reserve `len` bytes at the end of the kommand to be filled in place.
    pub(crate) fn spare_mut(&mut self, len: usize) -> Option<&mut [u8]> {
        if len > self.remaining() {
            return None;
        }

        let start = self.len;
        self.len += len;
        Some(&mut self.buf[start..start + len])
    }

    /// Read back what has been written so far.
    #[must_use]
    pub fn reader(&self) -> KommandReader<'_> {
        KommandReader::from(self.bytes())
    }

    /// Write the kommand as one frame.
    pub fn send(&self, sink: &mut (impl FrameSink + ?Sized)) {
        debug_assert!(self.len >= HEADER_LEN, "writer too small for its header");
        sink.write_frame(self.bytes());
    }
}

impl<N: ArrayLength> BufMut for KommandWriter<N> {
    #[inline]
    fn remaining_mut(&self) -> usize {
        self.remaining()
    }

    fn put_slice(&mut self, bytes: &[u8]) -> bool {
        let mut free = &mut self.buf[self.len..];

        if free.put_slice(bytes) {
            self.len += bytes.len();
            true
        } else {
            self.truncated = true;
            false
        }
    }
}

/// Text is appended without a terminator, one `write_str` chunk at a time;
/// a chunk that does not fit is dropped and formatting carries on.
impl<N: ArrayLength> fmt::Write for KommandWriter<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.put_slice(s.as_bytes());
        Ok(())
    }
}

impl<N: ArrayLength> fmt::Debug for KommandWriter<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KommandWriter")
            .field("bytes", &self.bytes())
            .field("capacity", &N::USIZE)
            .field("truncated", &self.truncated)
            .finish()
    }
}
