//! Little-endian fixed-width primitives over byte slices.
//!
//! Unlike a cursor that panics on underflow, every getter here leaves the
//! slice untouched and returns `None` when fewer bytes remain than the field
//! needs, and every putter refuses to write a field that does not fit.

pub trait Buf<'a> {
    fn get_u8(&mut self) -> Option<u8>;

    fn get_u16(&mut self) -> Option<u16>;

    fn get_u32(&mut self) -> Option<u32>;

    /// Split off the next `len` bytes.
    fn get_slice(&mut self, len: usize) -> Option<&'a [u8]>;
}

impl<'a> Buf<'a> for &'a [u8] {
    #[inline]
    fn get_u8(&mut self) -> Option<u8> {
        let (&first, rest) = self.split_first()?;
        *self = rest;
        Some(first)
    }

    #[inline]
    fn get_u16(&mut self) -> Option<u16> {
        get_array(self).map(u16::from_le_bytes)
    }

    #[inline]
    fn get_u32(&mut self) -> Option<u32> {
        get_array(self).map(u32::from_le_bytes)
    }

    #[inline]
    fn get_slice(&mut self, len: usize) -> Option<&'a [u8]> {
        if self.len() < len {
            return None;
        }

        let (head, rest) = self.split_at(len);
        *self = rest;
        Some(head)
    }
}

fn get_array<const N: usize>(buf: &mut &[u8]) -> Option<[u8; N]> {
    let mut array = [0; N];
    array.copy_from_slice(buf.get_slice(N)?);
    Some(array)
}

pub trait BufMut {
    /// Number of bytes that can still be written.
    fn remaining_mut(&self) -> usize;

    /// Write `bytes` entirely, or not at all. Returns whether it was written.
    fn put_slice(&mut self, bytes: &[u8]) -> bool;

    #[inline]
    fn put_u8(&mut self, value: u8) -> bool {
        self.put_slice(&[value])
    }

    #[inline]
    fn put_u16(&mut self, value: u16) -> bool {
        self.put_slice(&value.to_le_bytes())
    }

    #[inline]
    fn put_u32(&mut self, value: u32) -> bool {
        self.put_slice(&value.to_le_bytes())
    }
}

impl BufMut for &mut [u8] {
    #[inline]
    fn remaining_mut(&self) -> usize {
        self.len()
    }

    #[inline]
    fn put_slice(&mut self, bytes: &[u8]) -> bool {
        if self.len() < bytes.len() {
            return false;
        }

        let (head, rest) = core::mem::take(self).split_at_mut(bytes.len());
        head.copy_from_slice(bytes);
        *self = rest;
        true
    }
}
