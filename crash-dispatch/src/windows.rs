use std::io;

use libc::c_int;

use crate::Signal;

/// Returned by the CRT `signal` on failure
const SIG_ERR: libc::sighandler_t = !0;

/// The various signals we bind, in the order they are bound. The CRT has no
/// `SIGBUS`.
pub const FATAL_SIGNALS: [Signal; 6] = [
    Signal::Segv,
    Signal::Interrupt,
    Signal::Abort,
    Signal::Fpe,
    Signal::Terminate,
    Signal::Illegal,
];

/// Replaces the disposition of the signal with the specified handler
pub(crate) unsafe fn bind(signal: Signal, handler: extern "C" fn(c_int)) -> io::Result<()> {
    let prev = unsafe { libc::signal(signal.raw(), handler as libc::sighandler_t) };

    if prev == SIG_ERR {
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "signal() returned SIG_ERR",
        ))
    } else {
        Ok(())
    }
}
