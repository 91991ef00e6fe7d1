use libc::c_int;

use crate::{Dispatcher, signal_name};

/// The status the process exits with when a fatal signal arrives and no
/// callback has been configured
pub const EXIT_STATUS: c_int = -1;

const RULE: &[u8] = b"\n--------------------------------------------\n";
const PREFIX: &[u8] = b"\n   Crashed with signal [";
const SUFFIX: &[u8] = b"]\n";

/// Large enough for the two rules, the prefix and suffix, and the longest
/// name in the signal table
const REPORT_CAPACITY: usize = 160;

/// The message emitted to stdout when a signal is dispatched.
///
/// The report is assembled in a fixed size buffer on the stack so that it can
/// be built inside a signal handler, and is emitted with a single `write` so
/// that two threads dispatching at the same time don't interleave within a
/// report.
pub struct Report {
    buf: [u8; REPORT_CAPACITY],
    len: usize,
}

impl Report {
    /// Builds the report for the specified signal number. Numbers without a
    /// name are reported as `UNKNOWN`.
    pub fn new(signum: c_int) -> Self {
        let mut report = Self {
            buf: [0; REPORT_CAPACITY],
            len: 0,
        };

        report.push(RULE);
        report.push(PREFIX);
        report.push(signal_name(signum).as_bytes());
        report.push(SUFFIX);
        report.push(RULE);
        report
    }

    /// Appends as much of `bytes` as still fits
    fn push(&mut self, bytes: &[u8]) {
        let end = (self.len + bytes.len()).min(self.buf.len());
        let count = end - self.len;
        self.buf[self.len..end].copy_from_slice(&bytes[..count]);
        self.len = end;
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Writes the report to stdout
    #[inline]
    pub fn emit(&self) {
        crate::write_stdout(self.as_bytes());
    }
}

/// This is the actual function installed for each signal we track, invoked
/// by the kernel
pub(crate) extern "C" fn signal_handler(signum: c_int) {
    dispatch(signum)
}

/// Reports the signal then either hands off to the user callback or
/// terminates the process. There is no way back from here.
pub(crate) fn dispatch(signum: c_int) -> ! {
    debug_print!("dispatching signal");
    Report::new(signum).emit();

    let config = Dispatcher::get_instance().snapshot();

    match config.callback {
        Some(callback) => {
            debug_print!("invoking crash callback");
            callback(&config.trace_file)
        }
        None => {
            debug_print!("no crash callback, terminating");
            terminate()
        }
    }
}

#[inline]
fn terminate() -> ! {
    // SAFETY: `_exit`, unlike `exit`, is async-signal-safe as it doesn't run
    // atexit handlers or flush stdio
    unsafe { libc::_exit(EXIT_STATUS) }
}

#[cfg(test)]
mod test {
    use super::*;

    fn report(signum: c_int) -> String {
        String::from_utf8(Report::new(signum).as_bytes().to_vec()).expect("report is ascii")
    }

    #[test]
    fn report_layout() {
        let expected = format!(
            "\n--------------------------------------------\n\
             \n   Crashed with signal [{}]\n\
             \n--------------------------------------------\n",
            crate::Signal::Segv.name()
        );

        assert_eq!(report(libc::SIGSEGV), expected);
    }

    // The CRT's `SIGABRT` is outside the table and reported as `UNKNOWN`
    #[cfg(unix)]
    #[test]
    fn report_names_every_tracked_signal() {
        for sig in crate::FATAL_SIGNALS {
            let report = report(sig.raw());
            assert!(
                report.contains(&format!("Crashed with signal [{}]", sig.name())),
                "{report}"
            );
        }
    }

    #[test]
    fn report_survives_unknown_signals() {
        for signum in [-7, 0, 16, 99, c_int::MAX] {
            assert!(report(signum).contains("[UNKNOWN]"));
        }
    }

    #[test]
    fn longest_report_fits() {
        let longest = RULE.len() * 2 + PREFIX.len() + SUFFIX.len() + "SIGUSER2".len();
        assert!(longest <= REPORT_CAPACITY);
        assert_eq!(Report::new(12).as_bytes().len(), longest);
    }
}
