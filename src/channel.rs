//! The framed command channel between the gateway and a host computer.

use generic_array::ArrayLength;

use crate::{
    handler::{dispatch, KommandHandler},
    kommand::{Kommand, KommandReader, KommandWriter},
    serial::SerialPort,
    slip::{FrameTransport, DEFAULT_MTU},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelConfig {
    /// Answer kommands no handler claims with an empty `Err` kommand.
    pub send_error_if_unhandled: bool,
}

impl ChannelConfig {
    pub const DEFAULT: Self = Self {
        send_error_if_unhandled: true,
    };
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Receives kommands from a serial port and runs them through a list of
/// handlers, one frame per call to [`CommandChannel::poll`].
pub struct CommandChannel<S, const MTU: usize = DEFAULT_MTU> {
    transport: FrameTransport<S, MTU>,
    config: ChannelConfig,
}

impl<S, const MTU: usize> CommandChannel<S, MTU>
where
    S: SerialPort,
{
    pub fn new(port: S) -> Self {
        Self::with_config(port, ChannelConfig::DEFAULT)
    }

    pub fn with_config(port: S, config: ChannelConfig) -> Self {
        Self {
            transport: FrameTransport::new(port),
            config,
        }
    }

    /// Handle at most one received kommand.
    ///
    /// Returns `None` if no complete frame has arrived yet, otherwise
    /// whether one of `handlers` claimed the kommand. The frame is consumed
    /// either way.
    pub fn poll(&mut self, handlers: &mut [&mut dyn KommandHandler]) -> Option<bool> {
        let len = self.transport.poll()?;

        let claimed = {
            let (frame, mut reply) = self.transport.split();
            let kommand = KommandReader::new(frame, len);

            #[cfg(feature = "defmt")]
            defmt::trace!("received kommand {=u16:#x} ({} bytes)", kommand.identifier(), len);

            dispatch(
                handlers,
                &kommand,
                &mut reply,
                self.config.send_error_if_unhandled,
            )
        };

        self.transport.take(&mut []);
        Some(claimed)
    }

    /// Send a kommand built by hand.
    pub fn send<N: ArrayLength>(&mut self, kommand: &KommandWriter<N>) {
        kommand.send(&mut self.transport);
    }

    pub fn send_kommand<'a, K: Kommand<'a>>(&mut self, kommand: &K) {
        self.send(&kommand.to_writer());
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> ChannelConfig {
        self.config
    }

    /// Frames dropped by the receiver for being malformed or too long.
    #[inline]
    #[must_use]
    pub fn invalid_frames(&self) -> u32 {
        self.transport.invalid_frames()
    }

    pub fn transport(&mut self) -> &mut FrameTransport<S, MTU> {
        &mut self.transport
    }

    pub fn into_port(self) -> S {
        self.transport.into_port()
    }
}
