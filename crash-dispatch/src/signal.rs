use std::fmt;

use libc::c_int;

/// Name to report for any signal number that falls outside [`SIGNAL_NAMES`]
const UNKNOWN: &str = "UNKNOWN";

/// Human readable names, indexed by signal number.
///
/// Slot 7 is `SIGBUS` on Linux, slot 10 is `SIGBUS` on the BSD derived
/// platforms, so both carry that name.
static SIGNAL_NAMES: [&str; 16] = [
    UNKNOWN,    /* 0 */
    "SIGHUP",   /* 1 */
    "SIGINT",   /* 2 */
    "SIGQUIT",  /* 3 */
    "SIGILL",   /* 4 */
    "SIGTRAP",  /* 5 */
    "SIGABRT",  /* 6 */
    "SIGBUS",   /* 7 */
    "SIGFPE",   /* 8 */
    "SIGKILL",  /* 9 */
    "SIGBUS",   /* 10 */
    "SIGSEGV",  /* 11 */
    "SIGUSER2", /* 12 */
    "SIGPIPE",  /* 13 */
    "SIGALRM",  /* 14 */
    "SIGTERM",  /* 15 */
];

/// Looks up the name to report for the specified signal number.
///
/// Never fails, any number without an entry in the table, negative ones
/// included, is reported as `"UNKNOWN"`. This does not allocate and is safe to
/// call from within a signal handler.
#[inline]
pub fn signal_name(signum: c_int) -> &'static str {
    usize::try_from(signum)
        .ok()
        .and_then(|index| SIGNAL_NAMES.get(index))
        .copied()
        .unwrap_or(UNKNOWN)
}

/// The fatal signals that we bind to the dispatcher
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Signal {
    /// Invalid memory reference
    Segv = libc::SIGSEGV,
    /// Bus error, eg. access to a truncated memory mapped file
    #[cfg(unix)]
    Bus = libc::SIGBUS,
    /// Abnormal termination, eg. `abort()`
    Abort = libc::SIGABRT,
    /// Erroneous arithmetic operation
    Fpe = libc::SIGFPE,
    /// Termination request
    Terminate = libc::SIGTERM,
    /// Interactive interrupt, eg. Ctrl + C
    Interrupt = libc::SIGINT,
    /// Illegal instruction
    Illegal = libc::SIGILL,
}

impl Signal {
    /// The raw signal number
    #[inline]
    pub fn raw(self) -> c_int {
        self as c_int
    }

    /// The conventional name of the signal.
    ///
    /// Unlike [`signal_name`] this doesn't depend on how the platform numbers
    /// the signal.
    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            Self::Segv => "SIGSEGV",
            #[cfg(unix)]
            Self::Bus => "SIGBUS",
            Self::Abort => "SIGABRT",
            Self::Fpe => "SIGFPE",
            Self::Terminate => "SIGTERM",
            Self::Interrupt => "SIGINT",
            Self::Illegal => "SIGILL",
        }
    }
}

impl TryFrom<c_int> for Signal {
    type Error = c_int;

    fn try_from(signum: c_int) -> Result<Self, Self::Error> {
        crate::FATAL_SIGNALS
            .iter()
            .copied()
            .find(|sig| sig.raw() == signum)
            .ok_or(signum)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
