//! Dispatching received kommands to the code that understands them.
//!
//! Handlers are offered a kommand one after the other, in the order they
//! were registered, until one claims it. Nothing arbitrates between two
//! handlers interested in the same identifier: the first registered always
//! wins and the second never sees it, so each identifier should be claimed
//! by exactly one handler.

use generic_array::typenum::U2;
use heapless::Vec;

use crate::{
    kommand::{KommandReader, KommandWriter},
    serial::FrameSink,
    KommandId,
};

mod file;
mod ping;
mod screenshot;

pub use file::{FileHandler, FileStore, MAX_READ_CHUNK};
pub use ping::PingHandler;
pub use screenshot::{ScreenCapture, ScreenshotHandler};

pub trait KommandHandler {
    /// Offer `kommand` to this handler.
    ///
    /// Returning `true` claims the kommand and stops the chain; the handler
    /// may have written any number of frames to `reply` by then. A handler
    /// that returns `false` should not have written anything.
    fn try_handle(&mut self, kommand: KommandReader<'_>, reply: &mut dyn FrameSink) -> bool;
}

impl<T> KommandHandler for &mut T
where
    T: KommandHandler + ?Sized,
{
    fn try_handle(&mut self, kommand: KommandReader<'_>, reply: &mut dyn FrameSink) -> bool {
        (**self).try_handle(kommand, reply)
    }
}

/// Offer `kommand` to each handler in turn until one claims it.
///
/// When nobody claims it and `send_error_if_unhandled` is set, an empty
/// `Err` kommand is written to `reply`. Returns whether it was claimed.
pub fn dispatch(
    handlers: &mut [&mut dyn KommandHandler],
    kommand: &KommandReader<'_>,
    reply: &mut dyn FrameSink,
    send_error_if_unhandled: bool,
) -> bool {
    for handler in handlers.iter_mut() {
        if handler.try_handle(kommand.clone(), reply) {
            return true;
        }
    }

    #[cfg(feature = "defmt")]
    defmt::debug!("kommand {=u16:#x} not handled", kommand.identifier());

    if send_error_if_unhandled {
        KommandWriter::<U2>::new(KommandId::Err).send(reply);
    }

    false
}

/// A fixed-capacity, ordered list of handlers.
pub struct HandlerChain<'h, const N: usize> {
    handlers: Vec<&'h mut dyn KommandHandler, N>,
}

impl<const N: usize> Default for HandlerChain<'_, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'h, const N: usize> HandlerChain<'h, N> {
    pub const fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Append a handler after those already registered. The handler is
    /// handed back if the chain is full.
    pub fn register(
        &mut self,
        handler: &'h mut dyn KommandHandler,
    ) -> Result<(), &'h mut dyn KommandHandler> {
        self.handlers.push(handler)
    }

    /// See [`dispatch`].
    pub fn dispatch(
        &mut self,
        kommand: &KommandReader<'_>,
        reply: &mut dyn FrameSink,
        send_error_if_unhandled: bool,
    ) -> bool {
        dispatch(&mut self.handlers, kommand, reply, send_error_if_unhandled)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// A handler backed by a closure, which carries whatever context it needs.
pub struct FnHandler<F>(F);

/// Build a handler from a closure.
///
/// ```
/// # use kommand::{handler::{handler_fn, KommandHandler}, KommandId};
/// let mut sentences = 0;
/// let mut count_sentences = handler_fn(|kommand, _reply| {
///     if kommand.kommand_id() != Some(KommandId::NmeaSentence) {
///         return false;
///     }
///     sentences += 1;
///     true
/// });
/// ```
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: FnMut(KommandReader<'_>, &mut dyn FrameSink) -> bool,
{
    FnHandler(f)
}

impl<F> KommandHandler for FnHandler<F>
where
    F: FnMut(KommandReader<'_>, &mut dyn FrameSink) -> bool,
{
    fn try_handle(&mut self, kommand: KommandReader<'_>, reply: &mut dyn FrameSink) -> bool {
        (self.0)(kommand, reply)
    }
}
