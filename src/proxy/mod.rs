//! A serial bridge between a host computer and the co-processor's ROM
//! bootloader, so the co-processor can be flashed through the gateway's USB
//! port with stock tools.
//!
//! The bridge relays bytes verbatim until the host pulses the modem control
//! lines the way flashing tools do to reset a chip into its bootloader. From
//! then on the SLIP frames in both directions are followed so the bootloader
//! requests can be tracked, until the host ends the upload. Only the header
//! of each frame is looked at. Every byte is relayed unmodified as soon as it
//! arrives, whatever the bridge makes of it.

use embassy_time::{Duration, Instant};

use crate::{
    clock::Clock,
    serial::{HostPort, PeerPort, SerialPort},
};

pub mod bootloader;
mod sniffer;

use bootloader::{BootloaderHeader, Opcode};
use sniffer::{FrameSniffer, Sniffed};

const RELAY_CHUNK: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProxyState {
    /// The host has not opened the port.
    Disconnected,
    /// Relaying bytes verbatim.
    ByteMode,
    /// The co-processor was reset into its bootloader; relaying frames.
    FrameMode,
    /// The host is synchronizing with the bootloader.
    FrameModeSync,
    /// The host is uploading to RAM.
    FrameModeMem,
    /// The host is writing flash.
    FrameModeFlash,
    /// The session ended. Terminal.
    Done,
}

impl ProxyState {
    /// Whether traffic is followed as SLIP frames in this state.
    #[inline]
    #[must_use]
    pub fn is_framed(self) -> bool {
        matches!(
            self,
            Self::FrameMode | Self::FrameModeSync | Self::FrameModeMem | Self::FrameModeFlash
        )
    }

    fn in_session(self) -> bool {
        matches!(
            self,
            Self::FrameModeSync | Self::FrameModeMem | Self::FrameModeFlash
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProxyConfig {
    /// The session ends after this long without traffic or signalling.
    pub idle_timeout: Duration,
    /// A new host baud rate must hold this long before the co-processor
    /// port follows it. Tools step through rates when reconnecting.
    pub baud_settle: Duration,
    /// Upper bound of bytes relayed per direction in one [`FlashProxy::poll`].
    pub bytes_per_tick: usize,
}

impl ProxyConfig {
    pub const DEFAULT: Self = Self {
        idle_timeout: Duration::from_secs(5),
        baud_settle: Duration::from_millis(20),
        bytes_per_tick: 256,
    };
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// The state a request frame from the host moves the bridge to, if any.
fn transition(state: ProxyState, header: &BootloaderHeader) -> Option<ProxyState> {
    if !header.is_request() {
        return None;
    }

    match header.opcode()? {
        Opcode::Sync if state == ProxyState::FrameMode => Some(ProxyState::FrameModeSync),
        Opcode::FlashBegin | Opcode::FlashDeflBegin => Some(ProxyState::FrameModeFlash),
        Opcode::MemBegin => Some(ProxyState::FrameModeMem),
        Opcode::FlashEnd | Opcode::FlashDeflEnd | Opcode::MemEnd if state.in_session() => {
            Some(ProxyState::ByteMode)
        }
        _ => None,
    }
}

fn read_into(port: &mut impl SerialPort, buf: &mut [u8]) -> usize {
    let mut len = 0;
    while len < buf.len() {
        let Some(byte) = port.read() else {
            break;
        };
        buf[len] = byte;
        len += 1;
    }
    len
}

/// Follows the host's baud rate on the co-processor port once it settles.
#[derive(Debug, Clone, Copy)]
struct BaudFollower {
    applied: u32,
    pending: Option<(u32, Instant)>,
}

impl BaudFollower {
    /// Returns the rate to switch the co-processor to, if it is time.
    fn update(&mut self, host_baud: u32, now: Instant, settle: Duration) -> Option<u32> {
        if host_baud == 0 || host_baud == self.applied {
            self.pending = None;
            return None;
        }

        match self.pending {
            Some((baud, since)) if baud == host_baud => {
                if now.saturating_duration_since(since) < settle {
                    return None;
                }

                self.pending = None;
                self.applied = host_baud;
                Some(host_baud)
            }
            _ => {
                self.pending = Some((host_baud, now));
                None
            }
        }
    }
}

/// Bridges a [`HostPort`] and a [`PeerPort`], one step per [`poll`].
///
/// [`poll`]: FlashProxy::poll
pub struct FlashProxy<H, P, C> {
    host: H,
    peer: P,
    clock: C,
    config: ProxyConfig,
    state: ProxyState,
    host_frames: FrameSniffer,
    peer_frames: FrameSniffer,
    last_activity: Instant,
    lines: (bool, bool),
    baud: BaudFollower,
}

impl<H, P, C> FlashProxy<H, P, C>
where
    H: HostPort,
    P: PeerPort,
    C: Clock,
{
    pub fn new(host: H, peer: P, clock: C) -> Self {
        Self::with_config(host, peer, clock, ProxyConfig::DEFAULT)
    }

    pub fn with_config(host: H, peer: P, clock: C, config: ProxyConfig) -> Self {
        let lines = (host.dtr(), host.rts());
        let baud = BaudFollower {
            applied: peer.baud_rate(),
            pending: None,
        };
        let last_activity = clock.now();

        Self {
            host,
            peer,
            clock,
            config,
            state: ProxyState::Disconnected,
            host_frames: FrameSniffer::new(),
            peer_frames: FrameSniffer::new(),
            last_activity,
            lines,
            baud,
        }
    }

    /// Do one step of bridging: follow the host's signalling, relay what
    /// has arrived on either side, and check for the idle timeout.
    pub fn poll(&mut self) -> ProxyState {
        if self.state == ProxyState::Done {
            return ProxyState::Done;
        }

        let now = self.clock.now();
        let host_baud = self.host.baud_rate();

        if host_baud == 0 {
            self.enter(ProxyState::Disconnected);
        } else if self.state == ProxyState::Disconnected {
            self.enter(ProxyState::ByteMode);
            self.last_activity = now;
        }

        if let Some(baud) = self.baud.update(host_baud, now, self.config.baud_settle) {
            #[cfg(feature = "defmt")]
            defmt::debug!("proxy: co-processor baud rate {}", baud);

            self.peer.set_baud_rate(baud);
            self.last_activity = now;
        }

        self.watch_lines(now);

        if self.state != ProxyState::Disconnected {
            let moved = self.relay_from_host() + self.relay_from_peer();
            if moved > 0 {
                self.last_activity = now;
            }
        }

        if now.saturating_duration_since(self.last_activity) > self.config.idle_timeout {
            #[cfg(feature = "defmt")]
            defmt::info!(
                "proxy: idle for {} ms, ending session",
                self.config.idle_timeout.as_millis()
            );

            self.enter(ProxyState::Done);
        }

        self.state
    }

    /// End the session. Bytes still in either port are left there.
    pub fn cancel(&mut self) {
        self.enter(ProxyState::Done);
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> ProxyState {
        self.state
    }

    /// Frames with a bad escape sequence seen in either direction while in
    /// frame mode. They are relayed like any other.
    #[inline]
    #[must_use]
    pub fn invalid_frames(&self) -> u32 {
        self.host_frames
            .invalid_frames()
            .wrapping_add(self.peer_frames.invalid_frames())
    }

    pub fn into_parts(self) -> (H, P, C) {
        (self.host, self.peer, self.clock)
    }

    fn enter(&mut self, next: ProxyState) {
        if next == self.state {
            return;
        }

        #[cfg(feature = "defmt")]
        defmt::info!("proxy: {} -> {}", self.state, next);

        if !self.state.is_framed() && next.is_framed() {
            self.host_frames.reset();
            self.peer_frames.reset();
        }

        self.state = next;
    }

    /// Reset the co-processor into its bootloader when the host asserts DTR
    /// and releases RTS, which is how flashing tools end their reset pulse.
    fn watch_lines(&mut self, now: Instant) {
        let lines = (self.host.dtr(), self.host.rts());
        if lines == self.lines {
            return;
        }

        self.lines = lines;
        self.last_activity = now;

        if self.state == ProxyState::ByteMode && lines == (true, false) {
            self.peer.reset_into_bootloader();
            self.enter(ProxyState::FrameMode);
        }
    }

    fn relay_from_host(&mut self) -> usize {
        let mut moved = 0;
        let mut chunk = [0; RELAY_CHUNK];

        while moved < self.config.bytes_per_tick {
            let want = (self.config.bytes_per_tick - moved).min(RELAY_CHUNK);
            let len = read_into(&mut self.host, &mut chunk[..want]);
            if len == 0 {
                break;
            }

            self.peer.write(&chunk[..len]);
            moved += len;

            for &byte in &chunk[..len] {
                if !self.state.is_framed() {
                    break;
                }
                if let Some(frame) = self.host_frames.feed(byte) {
                    self.follow_request(frame);
                }
            }
        }

        moved
    }

    /// Move to the state a request from the host calls for. The request
    /// itself has already been relayed.
    fn follow_request(&mut self, frame: Sniffed) {
        let Some(header) = frame.header else {
            #[cfg(feature = "defmt")]
            defmt::warn!("proxy: {} byte host frame has no header", frame.len);

            return;
        };

        #[cfg(feature = "defmt")]
        defmt::trace!("proxy: host {}", header);

        if !header.matches_len(frame.len) {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "proxy: request {=u8:#x} announces {} bytes, frame has {}",
                header.opcode,
                header.size,
                frame.len - bootloader::HEADER_LEN
            );
        }

        if let Some(next) = transition(self.state, &header) {
            self.enter(next);
        }
    }

    fn relay_from_peer(&mut self) -> usize {
        let mut moved = 0;
        let mut chunk = [0; RELAY_CHUNK];

        while moved < self.config.bytes_per_tick {
            let want = (self.config.bytes_per_tick - moved).min(RELAY_CHUNK);
            let len = read_into(&mut self.peer, &mut chunk[..want]);
            if len == 0 {
                break;
            }

            self.host.write(&chunk[..len]);
            moved += len;

            if !self.state.is_framed() {
                continue;
            }
            for &byte in &chunk[..len] {
                if let Some(_frame) = self.peer_frames.feed(byte) {
                    #[cfg(feature = "defmt")]
                    defmt::trace!("proxy: peer {}", _frame.header);
                }
            }
        }

        moved
    }
}
