use embassy_time::Instant;

/// A monotonic time source.
///
/// Timeouts in this crate (proxy idle detection, baud rate settling) are
/// computed from instants handed out by a `Clock`, so they can be driven by
/// a fake clock in tests.
pub trait Clock {
    fn now(&self) -> Instant;
}

impl<T> Clock for &T
where
    T: Clock + ?Sized,
{
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// The embassy time driver of the running target.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}
