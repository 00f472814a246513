//! Picking what the host serial line is used for.
//!
//! A host selects a mode by opening the USB serial port at one of a few
//! agreed baud rates. USB CDC does not actually clock anything at that rate,
//! so the value is free to carry meaning.

/// The baud rates that select each [`SerialMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ModeSignals {
    pub bridge_baud: u32,
    pub command_baud: u32,
    pub debug_baud: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerialMode {
    /// Human readable log output.
    Debug,
    /// SLIP framed kommands, see [`crate::channel`].
    Command,
    /// Transparent bridge to the co-processor bootloader, see [`crate::proxy`].
    Bridge,
}

impl ModeSignals {
    pub const DEFAULT: Self = Self {
        bridge_baud: 230_400,
        command_baud: 921_600,
        debug_baud: 115_200,
    };

    /// The mode selected by `baud`, if any. The bridge takes precedence if
    /// signals are configured to collide.
    #[must_use]
    pub fn mode_for(&self, baud: u32) -> Option<SerialMode> {
        if baud == 0 {
            None
        } else if baud == self.bridge_baud {
            Some(SerialMode::Bridge)
        } else if baud == self.command_baud {
            Some(SerialMode::Command)
        } else if baud == self.debug_baud {
            Some(SerialMode::Debug)
        } else {
            None
        }
    }
}

impl Default for ModeSignals {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Tracks the host baud rate and reports mode changes.
#[derive(Debug, Clone)]
pub struct ModeWatcher {
    signals: ModeSignals,
    current: Option<SerialMode>,
}

impl ModeWatcher {
    pub const fn new(signals: ModeSignals) -> Self {
        Self {
            signals,
            current: None,
        }
    }

    /// Feed the host's current baud rate. Returns the new mode the first
    /// time a different one is selected.
    ///
    /// Rates that select nothing leave the current mode in place, so a host
    /// briefly reopening the port at some other rate does not tear down a
    /// running session.
    pub fn poll(&mut self, baud: u32) -> Option<SerialMode> {
        let mode = self.signals.mode_for(baud)?;
        if self.current == Some(mode) {
            return None;
        }

        #[cfg(feature = "defmt")]
        defmt::info!("serial mode {} selected at {} baud", mode, baud);

        self.current = Some(mode);
        Some(mode)
    }

    #[inline]
    #[must_use]
    pub fn current(&self) -> Option<SerialMode> {
        self.current
    }

    #[inline]
    #[must_use]
    pub fn signals(&self) -> &ModeSignals {
        &self.signals
    }
}

impl Default for ModeWatcher {
    fn default() -> Self {
        Self::new(ModeSignals::DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::{ModeSignals, ModeWatcher, SerialMode};

    #[test]
    fn default_signals() {
        let signals = ModeSignals::default();

        assert_eq!(signals.mode_for(230_400), Some(SerialMode::Bridge));
        assert_eq!(signals.mode_for(921_600), Some(SerialMode::Command));
        assert_eq!(signals.mode_for(115_200), Some(SerialMode::Debug));
        assert_eq!(signals.mode_for(9_600), None);
        assert_eq!(signals.mode_for(0), None);
    }

    #[test]
    fn reports_each_change_once() {
        let mut watcher = ModeWatcher::default();

        assert_eq!(watcher.poll(0), None);
        assert_eq!(watcher.poll(921_600), Some(SerialMode::Command));
        assert_eq!(watcher.poll(921_600), None);
        assert_eq!(watcher.poll(57_600), None);
        assert_eq!(watcher.current(), Some(SerialMode::Command));
        assert_eq!(watcher.poll(230_400), Some(SerialMode::Bridge));
        assert_eq!(watcher.poll(921_600), Some(SerialMode::Command));
    }

    #[test]
    fn custom_signals() {
        let mut watcher = ModeWatcher::new(ModeSignals {
            debug_baud: 9_600,
            ..ModeSignals::DEFAULT
        });

        assert_eq!(watcher.poll(115_200), None);
        assert_eq!(watcher.poll(9_600), Some(SerialMode::Debug));
    }
}
