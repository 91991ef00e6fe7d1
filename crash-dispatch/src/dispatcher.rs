use std::{
    borrow::Cow,
    ffi::{CStr, CString},
    fmt, ptr,
    sync::atomic::{AtomicPtr, Ordering},
};

use crate::Registration;

/// The function invoked when a fatal signal is dispatched.
///
/// It receives the configured trace file path and is responsible for ending
/// the process, which is why it can't return. It runs inside the signal
/// handler, so it should restrict itself to
/// [async signal safe](https://man7.org/linux/man-pages/man7/signal-safety.7.html)
/// operations, eg. `write` and `_exit` rather than `println!` and
/// `std::process::exit`.
pub type CrashCallback = fn(&CStr) -> !;

/// The trace file used until one is configured, or when an empty path is
/// configured
pub const DEFAULT_TRACE_FILE: &CStr = c"stacktrace.txt";

/// An immutable snapshot of the dispatcher configuration.
///
/// Snapshots are published whole, so the signal handler sees either the
/// previous or the next configuration, never a mix of the two.
pub(crate) struct Config {
    pub(crate) trace_file: Cow<'static, CStr>,
    pub(crate) callback: Option<CrashCallback>,
}

impl PartialEq for Config {
    fn eq(&self, other: &Self) -> bool {
        let same_callback = match (self.callback, other.callback) {
            (Some(a), Some(b)) => std::ptr::fn_addr_eq(a, b),
            (None, None) => true,
            _ => false,
        };

        same_callback && self.trace_file == other.trace_file
    }
}

static DEFAULT_CONFIG: Config = Config {
    trace_file: Cow::Borrowed(DEFAULT_TRACE_FILE),
    callback: None,
};

static DISPATCHER: Dispatcher = Dispatcher::new();

/// The process wide crash dispatcher.
///
/// There is exactly one, retrieved with [`Dispatcher::get_instance`], which
/// lives for the lifetime of the process.
pub struct Dispatcher {
    /// The published configuration, null until the first update
    current: AtomicPtr<Config>,
    /// Serializes updates, never taken by the signal handler
    update: parking_lot::Mutex<()>,
}

impl Dispatcher {
    const fn new() -> Self {
        Self {
            current: AtomicPtr::new(ptr::null_mut()),
            update: parking_lot::const_mutex(()),
        }
    }

    /// Retrieves the dispatcher
    #[inline]
    pub fn get_instance() -> &'static Self {
        &DISPATCHER
    }

    /// Loads the current configuration without locking, this is safe to call
    /// from within a signal handler
    #[inline]
    pub(crate) fn snapshot(&self) -> &'static Config {
        let current = self.current.load(Ordering::Acquire);

        if current.is_null() {
            &DEFAULT_CONFIG
        } else {
            // SAFETY: non-null pointers are only ever stored by `publish`, and
            // point to leaked, never mutated, snapshots
            unsafe { &*current }
        }
    }

    /// Builds the next configuration from the current one and publishes it,
    /// unless it is identical to the current one.
    ///
    /// The superseded snapshot is intentionally leaked, a signal handler
    /// running on another thread may still be reading it.
    fn publish(&self, next: impl FnOnce(&Config) -> Config) {
        let _update = self.update.lock();
        let current = self.snapshot();
        let next = next(current);

        if next == *current {
            return;
        }

        let next: &'static mut Config = Box::leak(Box::new(next));
        self.current.store(next, Ordering::Release);
    }

    /// Sets the callback invoked when a fatal signal is dispatched, then binds
    /// all of the [`crate::FATAL_SIGNALS`] to the dispatcher.
    ///
    /// The signals are (re)bound on every call, regardless of the callback.
    /// Setting `None` makes the process exit with [`crate::EXIT_STATUS`] as
    /// soon as a fatal signal has been reported.
    ///
    /// Each call that actually changes the configuration keeps a small
    /// snapshot alive for the rest of the process, setting the callback that
    /// is already set costs nothing.
    ///
    /// # Safety
    ///
    /// The callback is run in a compromised context, from within a signal
    /// handler. It must only perform
    /// [async signal safe](https://man7.org/linux/man-pages/man7/signal-safety.7.html)
    /// operations, notably it must not allocate, and it must not assume the
    /// state of the thread that crashed is intact.
    pub unsafe fn set_callback(&self, callback: Option<CrashCallback>) -> Registration {
        self.publish(|current| Config {
            trace_file: current.trace_file.clone(),
            callback,
        });

        log::debug!(
            "crash callback {}",
            if callback.is_some() { "set" } else { "cleared" }
        );

        crate::install_handlers()
    }

    /// Retrieves the current callback
    #[inline]
    pub fn get_callback(&self) -> Option<CrashCallback> {
        self.snapshot().callback
    }

    /// Sets the path passed to the callback when a fatal signal is dispatched.
    ///
    /// An empty path resets to [`DEFAULT_TRACE_FILE`]. A path with an
    /// interior NUL byte can't be passed to the callback and is also replaced
    /// with the default. Nothing is created or written by this call.
    pub fn set_trace_file(&self, path: &str) {
        let trace_file = if path.is_empty() {
            Cow::Borrowed(DEFAULT_TRACE_FILE)
        } else {
            match CString::new(path) {
                Ok(path) => Cow::Owned(path),
                Err(err) => {
                    log::warn!(
                        "trace file path {path:?} contains a NUL byte at offset {}, using {DEFAULT_TRACE_FILE:?} instead",
                        err.nul_position()
                    );
                    Cow::Borrowed(DEFAULT_TRACE_FILE)
                }
            }
        };

        log::debug!("trace file set to {trace_file:?}");

        self.publish(|current| Config {
            trace_file,
            callback: current.callback,
        });
    }

    /// Retrieves the current trace file path
    #[inline]
    pub fn get_trace_file(&self) -> &'static CStr {
        &self.snapshot().trace_file
    }

    /// Dispatches the specified signal on the calling thread exactly as if it
    /// had been delivered by the OS. The signal is reported, then the callback
    /// is invoked, or the process exits if there is none.
    ///
    /// The signal number doesn't need to be one of the [`crate::FATAL_SIGNALS`],
    /// unknown numbers are reported as `UNKNOWN`.
    pub fn simulate_signal(&self, signum: libc::c_int) -> ! {
        crate::handler::dispatch(signum)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config = self.snapshot();
        f.debug_struct("Dispatcher")
            .field("trace_file", &config.trace_file)
            .field("callback", &config.callback.is_some())
            .finish()
    }
}

/// Retrieves the process wide [`Dispatcher`]
#[inline]
pub fn get_instance() -> &'static Dispatcher {
    Dispatcher::get_instance()
}

/// See [`Dispatcher::set_callback`]
///
/// # Safety
///
/// See [`Dispatcher::set_callback`]
#[inline]
pub unsafe fn set_callback(callback: Option<CrashCallback>) -> Registration {
    unsafe { get_instance().set_callback(callback) }
}

/// See [`Dispatcher::get_callback`]
#[inline]
pub fn get_callback() -> Option<CrashCallback> {
    get_instance().get_callback()
}

/// See [`Dispatcher::set_trace_file`]
#[inline]
pub fn set_trace_file(path: &str) {
    get_instance().set_trace_file(path);
}

/// See [`Dispatcher::get_trace_file`]
#[inline]
pub fn get_trace_file() -> &'static CStr {
    get_instance().get_trace_file()
}

#[cfg(test)]
mod test {
    use super::*;

    // These run against a private instance rather than the process wide one,
    // which the integration tests exercise

    #[test]
    fn defaults() {
        let dispatcher = Dispatcher::new();
        assert_eq!(dispatcher.get_trace_file(), c"stacktrace.txt");
        assert!(dispatcher.get_callback().is_none());
    }

    #[test]
    fn trace_file_normalization() {
        let dispatcher = Dispatcher::new();

        dispatcher.set_trace_file("crash.log");
        assert_eq!(dispatcher.get_trace_file(), c"crash.log");

        dispatcher.set_trace_file("");
        assert_eq!(dispatcher.get_trace_file(), DEFAULT_TRACE_FILE);

        dispatcher.set_trace_file("/var/tmp/app/trace.txt");
        assert_eq!(dispatcher.get_trace_file(), c"/var/tmp/app/trace.txt");

        dispatcher.set_trace_file("bad\0path");
        assert_eq!(dispatcher.get_trace_file(), DEFAULT_TRACE_FILE);
    }

    fn noop_callback(_trace_file: &CStr) -> ! {
        unreachable!("never dispatched")
    }

    #[test]
    fn unchanged_configuration_is_not_republished() {
        let dispatcher = Dispatcher::new();

        dispatcher.set_trace_file("");
        assert!(dispatcher.current.load(Ordering::Acquire).is_null());

        dispatcher.set_trace_file("crash.log");
        let published = dispatcher.current.load(Ordering::Acquire);
        assert!(!published.is_null());

        for _ in 0..10 {
            dispatcher.set_trace_file("crash.log");
        }
        assert_eq!(dispatcher.current.load(Ordering::Acquire), published);

        let with_callback = |current: &Config| Config {
            trace_file: current.trace_file.clone(),
            callback: Some(noop_callback),
        };

        dispatcher.publish(with_callback);
        let published = dispatcher.current.load(Ordering::Acquire);
        for _ in 0..10 {
            dispatcher.publish(with_callback);
        }
        assert_eq!(dispatcher.current.load(Ordering::Acquire), published);
        assert_eq!(dispatcher.get_trace_file(), c"crash.log");

        dispatcher.set_trace_file("other.log");
        assert_ne!(dispatcher.current.load(Ordering::Acquire), published);
    }

    #[test]
    fn snapshots_outlive_updates() {
        let dispatcher = Dispatcher::new();

        dispatcher.set_trace_file("first.txt");
        let first = dispatcher.get_trace_file();

        dispatcher.set_trace_file("second.txt");
        assert_eq!(first, c"first.txt");
        assert_eq!(dispatcher.get_trace_file(), c"second.txt");
    }
}
