use crate::{Error, Signal, handler::signal_handler, platform};

pub use platform::FATAL_SIGNALS;

/// The outcome of binding the [`FATAL_SIGNALS`] to the dispatcher.
///
/// Binding does not stop at the first failure, so this can describe a
/// partial installation, in which case the signals in [`Self::failures`]
/// keep whatever disposition they had before.
#[derive(Debug, Default)]
#[must_use = "signals that failed to bind won't be dispatched"]
pub struct Registration {
    installed: Vec<Signal>,
    failures: Vec<Error>,
}

impl Registration {
    /// The signals now routed to the dispatcher
    #[inline]
    pub fn installed(&self) -> &[Signal] {
        &self.installed
    }

    /// The signals that could not be bound, and why
    #[inline]
    pub fn failures(&self) -> &[Error] {
        &self.failures
    }

    /// True if every signal was bound
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, signal: Signal, result: std::io::Result<()>) {
        match result {
            Ok(()) => {
                log::debug!("bound {signal} to the crash dispatcher");
                self.installed.push(signal);
            }
            Err(source) => {
                log::error!("can't set up a signal handler for {signal}: {source}");
                self.failures.push(Error::Register { signal, source });
            }
        }
    }
}

/// Binds every one of the [`FATAL_SIGNALS`] to the dispatcher.
///
/// This replaces the current disposition of each signal, so calling it again
/// simply binds the same handler again rather than stacking another one on
/// top. A signal that can't be bound is logged and recorded in the returned
/// [`Registration`], the remaining signals are still bound.
///
/// On unix the calling thread is also given an alternate signal stack if it
/// doesn't have one. Other threads need their own, the Rust runtime sets one
/// up for the threads it starts.
pub fn install_handlers() -> Registration {
    let mut registration = Registration::default();

    // SAFETY: syscalls, the stack is only ever used by the kernel
    #[cfg(unix)]
    match unsafe { platform::install_sigaltstack() } {
        Ok(true) => log::debug!("mapped an alternate signal stack for this thread"),
        Ok(false) => {}
        Err(err) => log::warn!(
            "can't set up an alternate signal stack, a stack overflow on this thread won't be reported: {err}"
        ),
    }

    for signal in FATAL_SIGNALS {
        // SAFETY: syscalls, and the handler only performs async signal safe
        // operations up to the point it hands off to the user callback
        let result = unsafe { platform::bind(signal, signal_handler) };
        registration.record(signal, result);
    }

    registration
}
