//! `crash-dispatch` intercepts the fatal signals a process can receive,
//! reports which one arrived, and hands control to a single user-supplied
//! [`CrashCallback`] before the process goes away.
//!
//! The following signals are tracked
//!
//! ## `SIGSEGV`
//!
//! Signal sent to a process when it makes an invalid virtual memory reference,
//! a [segmentation fault](https://en.wikipedia.org/wiki/Segmentation_fault).
//!
//! ## `SIGBUS`
//!
//! Signal sent to a process when it causes a [bus error](https://en.wikipedia.org/wiki/Bus_error).
//! Not available on Windows.
//!
//! ## `SIGABRT`
//!
//! Signal sent to a process to tell it to abort. Usually raised by the process
//! itself via `std::process::abort` or `libc::abort`.
//!
//! ## `SIGFPE`
//!
//! Signal sent to a process when it executes an erroneous arithmetic operation,
//! integer division by zero included.
//!
//! ## `SIGILL`
//!
//! Signal sent to a process when it attempts to execute an **illegal**,
//! malformed, unknown, or privileged, instruction.
//!
//! ## `SIGTERM` and `SIGINT`
//!
//! Requests to terminate, eg. from `kill` or Ctrl + C. These are treated
//! exactly like the faults above.
//!
//! # Usage
//!
//! ```no_run
//! use std::ffi::CStr;
//!
//! fn on_crash(_trace_file: &CStr) -> ! {
//!     crash_dispatch::write_stderr("crashed, see trace file\n");
//!     unsafe { libc::_exit(1) }
//! }
//!
//! let dispatcher = crash_dispatch::get_instance();
//! dispatcher.set_trace_file("crash.log");
//!
//! // SAFETY: `on_crash` only performs async-signal-safe operations
//! let registration = unsafe { dispatcher.set_callback(Some(on_crash)) };
//! assert!(registration.is_complete());
//! ```
//!
//! No stack trace is captured. The trace file path is configuration that is
//! passed through to the callback, what (if anything) gets written there is
//! up to it.

#![allow(unsafe_code)]

#[cfg(feature = "debug-print")]
#[macro_export]
macro_rules! debug_print {
    ($s:literal) => {
        let cstr = concat!($s, "\n");
        $crate::write_stderr(cstr);
    };
}

#[cfg(not(feature = "debug-print"))]
#[macro_export]
macro_rules! debug_print {
    ($s:literal) => {};
}

/// Writes the specified string directly to stderr.
///
/// This is safe to be called from within a compromised context.
#[inline]
pub fn write_stderr(s: &'static str) {
    write_fd(2, s.as_bytes());
}

/// Writes the specified bytes directly to stdout with a single `write` call.
///
/// This is safe to be called from within a compromised context.
#[inline]
pub fn write_stdout(bytes: &[u8]) {
    write_fd(1, bytes);
}

#[inline]
fn write_fd(fd: libc::c_int, bytes: &[u8]) {
    unsafe {
        #[cfg(target_os = "windows")]
        libc::write(fd, bytes.as_ptr().cast(), bytes.len() as u32);

        #[cfg(not(target_os = "windows"))]
        libc::write(fd, bytes.as_ptr().cast(), bytes.len());
    }
}

mod dispatcher;
mod error;
mod handler;
mod registration;
mod signal;

pub use dispatcher::{
    CrashCallback, DEFAULT_TRACE_FILE, Dispatcher, get_callback, get_instance, get_trace_file,
    set_callback, set_trace_file,
};
pub use error::Error;
pub use handler::{EXIT_STATUS, Report};
pub use registration::{FATAL_SIGNALS, Registration, install_handlers};
pub use signal::{Signal, signal_name};

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;

        use unix as platform;
    } else if #[cfg(target_os = "windows")] {
        mod windows;

        use windows as platform;
    }
}
