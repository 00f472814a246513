//! The byte-level endpoints this stack talks through.
//!
//! UART, USB CDC and the co-processor link are provided by the board
//! support code; this crate only needs a non-blocking byte source, a byte
//! sink, and the out-of-band signals carried by the serial line itself.

/// A non-blocking serial endpoint.
///
/// Writes are infallible at this layer: a driver that cannot accept more
/// bytes is responsible for its own buffering or dropping.
pub trait SerialPort {
    /// Read one byte if one is available, without blocking.
    fn read(&mut self) -> Option<u8>;

    fn write(&mut self, bytes: &[u8]);

    /// Current baud rate. Zero means the line is closed; for USB CDC this is
    /// what the host last configured.
    fn baud_rate(&self) -> u32;
}

/// The host side of the bridge: a USB serial line whose modem control lines
/// are driven by the computer.
pub trait HostPort: SerialPort {
    fn dtr(&self) -> bool;

    fn rts(&self) -> bool;
}

/// The co-processor side of the bridge.
pub trait PeerPort: SerialPort {
    fn set_baud_rate(&mut self, baud: u32);

    /// Reset the co-processor with its boot strap pins held so that it comes
    /// up in its ROM bootloader.
    fn reset_into_bootloader(&mut self);
}

/// Anything a complete frame payload can be written to.
pub trait FrameSink {
    /// Write one frame. The payload is escaped and delimited by the sink.
    fn write_frame(&mut self, payload: &[u8]);
}

impl<T> SerialPort for &mut T
where
    T: SerialPort + ?Sized,
{
    fn read(&mut self) -> Option<u8> {
        (**self).read()
    }

    fn write(&mut self, bytes: &[u8]) {
        (**self).write(bytes)
    }

    fn baud_rate(&self) -> u32 {
        (**self).baud_rate()
    }
}

impl<T> HostPort for &mut T
where
    T: HostPort + ?Sized,
{
    fn dtr(&self) -> bool {
        (**self).dtr()
    }

    fn rts(&self) -> bool {
        (**self).rts()
    }
}

impl<T> PeerPort for &mut T
where
    T: PeerPort + ?Sized,
{
    fn set_baud_rate(&mut self, baud: u32) {
        (**self).set_baud_rate(baud)
    }

    fn reset_into_bootloader(&mut self) {
        (**self).reset_into_bootloader()
    }
}
