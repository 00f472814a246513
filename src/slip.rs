//! SLIP framing (RFC 1055) of a continuous byte stream.
//!
//! A frame is `END`, the escaped payload, `END`. Inside a frame a literal
//! `END` is sent as `ESC ESC_END` and a literal `ESC` as `ESC ESC_ESC`, so a
//! raw `END` always marks a frame boundary and a receiver can pick up the
//! stream at any point. Runs of `END` with nothing in between are idle
//! filler and never produce empty frames.

use heapless::Vec;

use crate::serial::{FrameSink, SerialPort};

pub const END: u8 = 0xC0;
pub const ESC: u8 = 0xDB;
pub const ESC_END: u8 = 0xDC;
pub const ESC_ESC: u8 = 0xDD;

/// Largest frame the host command channel accepts.
pub const DEFAULT_MTU: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum State {
    Collecting { escaping: bool },
    /// Skipping the rest of an invalid frame, up to the next `END`.
    Discarding,
    /// A frame is waiting to be taken.
    Complete,
}

/// Incremental SLIP decoder with a fixed `MTU` byte buffer.
///
/// Frames longer than `MTU` and frames containing an invalid escape sequence
/// are dropped whole and counted in [`SlipDecoder::invalid_frames`]; the
/// decoder resynchronizes on the next `END`.
#[derive(Debug, Clone)]
pub struct SlipDecoder<const MTU: usize> {
    buf: Vec<u8, MTU>,
    state: State,
    invalid_frames: u32,
}

impl<const MTU: usize> Default for SlipDecoder<MTU> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const MTU: usize> SlipDecoder<MTU> {
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            state: State::Collecting { escaping: false },
            invalid_frames: 0,
        }
    }

    /// Consume one byte of the stream.
    ///
    /// A completed frame that has not been taken yet is dropped by the next
    /// byte fed in.
    pub fn feed(&mut self, byte: u8) {
        match self.state {
            State::Complete => {
                self.clear();
                self.feed(byte);
            }
            State::Discarding => {
                if byte == END {
                    self.clear();
                }
            }
            State::Collecting { escaping: true } => {
                let decoded = match byte {
                    ESC_END => END,
                    ESC_ESC => ESC,
                    _ => {
                        self.invalidate();
                        if byte == END {
                            // already sitting on a boundary
                            self.clear();
                        }
                        return;
                    }
                };

                self.state = State::Collecting { escaping: false };
                self.push(decoded);
            }
            State::Collecting { escaping: false } => match byte {
                END if self.buf.is_empty() => {}
                END => self.state = State::Complete,
                ESC => self.state = State::Collecting { escaping: true },
                _ => self.push(byte),
            },
        }
    }

    /// Length of the completed frame, if there is one.
    #[inline]
    #[must_use]
    pub fn poll(&self) -> Option<usize> {
        match self.state {
            State::Complete => Some(self.buf.len()),
            _ => None,
        }
    }

    /// Copy the completed frame into `dst` and discard it.
    ///
    /// Returns the number of bytes copied, which is less than the frame
    /// length if `dst` is too short. An empty `dst` just discards the frame.
    /// Without a completed frame nothing happens and 0 is returned.
    pub fn take(&mut self, dst: &mut [u8]) -> usize {
        if self.state != State::Complete {
            return 0;
        }

        let len = dst.len().min(self.buf.len());
        dst[..len].copy_from_slice(&self.buf[..len]);
        self.clear();
        len
    }

    /// The completed frame without copying it, or an empty slice.
    ///
    /// The view is only meaningful until the next call to `feed` or `take`.
    #[inline]
    #[must_use]
    pub fn peek(&self) -> &[u8] {
        match self.state {
            State::Complete => &self.buf,
            _ => &[],
        }
    }

    /// Number of frames dropped for being oversized or malformed.
    #[inline]
    #[must_use]
    pub fn invalid_frames(&self) -> u32 {
        self.invalid_frames
    }

    /// Forget any frame in progress or pending and start collecting afresh.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.state = State::Collecting { escaping: false };
    }

    fn push(&mut self, byte: u8) {
        if self.buf.push(byte).is_err() {
            #[cfg(feature = "defmt")]
            defmt::debug!("slip: frame exceeds MTU of {} bytes", MTU);

            self.invalidate();
        }
    }

    fn invalidate(&mut self) {
        self.invalid_frames = self.invalid_frames.wrapping_add(1);
        self.buf.clear();
        self.state = State::Discarding;
    }
}

/// Escape `payload`, handing the encoded output to `out` in runs.
///
/// No delimiters are added.
pub fn escape(payload: &[u8], mut out: impl FnMut(&[u8])) {
    let mut start = 0;

    for (i, &byte) in payload.iter().enumerate() {
        let escaped = match byte {
            END => [ESC, ESC_END],
            ESC => [ESC, ESC_ESC],
            _ => continue,
        };

        if start < i {
            out(&payload[start..i]);
        }
        out(&escaped);
        start = i + 1;
    }

    if start < payload.len() {
        out(&payload[start..]);
    }
}

/// Write `payload` to `port` as one delimited frame.
pub fn write_frame<S>(port: &mut S, payload: &[u8])
where
    S: SerialPort + ?Sized,
{
    port.write(&[END]);
    escape(payload, |run| port.write(run));
    port.write(&[END]);
}

/// Writes frames to a borrowed serial port.
pub struct FrameWriter<'a, S: ?Sized>(&'a mut S);

impl<'a, S> FrameWriter<'a, S>
where
    S: SerialPort + ?Sized,
{
    pub fn new(port: &'a mut S) -> Self {
        Self(port)
    }
}

impl<S> FrameSink for FrameWriter<'_, S>
where
    S: SerialPort + ?Sized,
{
    fn write_frame(&mut self, payload: &[u8]) {
        write_frame(&mut *self.0, payload);
    }
}

/// A serial port with SLIP framing in both directions.
pub struct FrameTransport<S, const MTU: usize = DEFAULT_MTU> {
    port: S,
    decoder: SlipDecoder<MTU>,
}

impl<S, const MTU: usize> FrameTransport<S, MTU>
where
    S: SerialPort,
{
    pub fn new(port: S) -> Self {
        Self {
            port,
            decoder: SlipDecoder::new(),
        }
    }

    /// Feed one byte obtained from elsewhere than the owned port.
    #[inline]
    pub fn feed(&mut self, byte: u8) {
        self.decoder.feed(byte);
    }

    /// Read whatever the port has available until a frame completes, and
    /// return its length.
    ///
    /// Bytes following a completed frame stay in the port until the frame
    /// has been taken, so calling this repeatedly is harmless.
    pub fn poll(&mut self) -> Option<usize> {
        while self.decoder.poll().is_none() {
            let byte = self.port.read()?;
            self.decoder.feed(byte);
        }

        self.decoder.poll()
    }

    /// See [`SlipDecoder::take`].
    #[inline]
    pub fn take(&mut self, dst: &mut [u8]) -> usize {
        self.decoder.take(dst)
    }

    /// See [`SlipDecoder::peek`].
    #[inline]
    #[must_use]
    pub fn peek(&self) -> &[u8] {
        self.decoder.peek()
    }

    /// Borrow the completed frame and a writer for replies at the same time.
    pub fn split(&mut self) -> (&[u8], FrameWriter<'_, S>) {
        (self.decoder.peek(), FrameWriter(&mut self.port))
    }

    #[inline]
    pub fn write(&mut self, payload: &[u8]) {
        write_frame(&mut self.port, payload);
    }

    #[inline]
    #[must_use]
    pub fn invalid_frames(&self) -> u32 {
        self.decoder.invalid_frames()
    }

    pub fn port(&self) -> &S {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut S {
        &mut self.port
    }

    pub fn into_port(self) -> S {
        self.port
    }
}

impl<S, const MTU: usize> FrameSink for FrameTransport<S, MTU>
where
    S: SerialPort,
{
    fn write_frame(&mut self, payload: &[u8]) {
        self.write(payload);
    }
}
