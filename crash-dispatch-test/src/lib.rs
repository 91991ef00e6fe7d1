use std::{fmt, process::ExitStatus};

use sadness_generator::SadnessFlavor;

/// The status the `crash-host` callback exits with
pub const CALLBACK_EXIT_CODE: i32 = 70;

/// What the `crash-host` callback writes before the trace file it received
pub const CALLBACK_MARKER: &str = "callback invoked with [";

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    Abort,
    Bus,
    Fpe,
    Illegal,
    Segv,
    StackOverflow,
    Terminate,
    Interrupt,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Abort => "abort",
            Self::Bus => "bus",
            Self::Fpe => "fpe",
            Self::Illegal => "illegal",
            Self::Segv => "segv",
            Self::StackOverflow => "stack-overflow",
            Self::Terminate => "terminate",
            Self::Interrupt => "interrupt",
        })
    }
}

impl Signal {
    /// The way `sadness-generator` raises this signal
    pub fn flavor(self) -> Option<SadnessFlavor> {
        Some(match self {
            Self::Abort => SadnessFlavor::Abort,
            #[cfg(unix)]
            Self::Bus => SadnessFlavor::Bus,
            #[cfg(not(unix))]
            Self::Bus => return None,
            Self::Fpe => SadnessFlavor::DivideByZero,
            Self::Illegal => SadnessFlavor::Illegal,
            Self::Segv => SadnessFlavor::Segfault,
            #[cfg(unix)]
            Self::StackOverflow => SadnessFlavor::StackOverflow,
            #[cfg(not(unix))]
            Self::StackOverflow => return None,
            Self::Terminate => SadnessFlavor::Terminate,
            Self::Interrupt => SadnessFlavor::Interrupt,
        })
    }

    /// The name the dispatcher should report for this signal
    pub fn reported_name(self) -> &'static str {
        match self {
            // The report table is indexed by the unix numbering, the CRT's
            // `SIGABRT` (22) falls outside of it
            Self::Abort if cfg!(windows) => "UNKNOWN",
            Self::Abort => "SIGABRT",
            Self::Bus => "SIGBUS",
            Self::Fpe => "SIGFPE",
            Self::Illegal => "SIGILL",
            Self::Segv => "SIGSEGV",
            // Guard page hits are delivered as a bus error on MacOS
            Self::StackOverflow if cfg!(target_os = "macos") => "SIGBUS",
            Self::StackOverflow => "SIGSEGV",
            Self::Terminate => "SIGTERM",
            Self::Interrupt => "SIGINT",
        }
    }
}

/// Options for a single `crash-host` run
#[derive(Clone, Debug)]
pub struct Host {
    signal: Signal,
    trace_file: Option<String>,
    no_callback: bool,
    reinstall: u32,
    use_thread: bool,
}

impl Host {
    pub fn new(signal: Signal) -> Self {
        Self {
            signal,
            trace_file: None,
            no_callback: false,
            reinstall: 0,
            use_thread: false,
        }
    }

    pub fn trace_file(mut self, path: impl Into<String>) -> Self {
        self.trace_file = Some(path.into());
        self
    }

    pub fn no_callback(mut self) -> Self {
        self.no_callback = true;
        self
    }

    pub fn reinstall(mut self, count: u32) -> Self {
        self.reinstall = count;
        self
    }

    pub fn use_thread(mut self, use_thread: bool) -> Self {
        self.use_thread = use_thread;
        self
    }

    /// Runs `crash-host` to completion
    pub fn run(&self) -> HostOutput {
        use std::env;

        // Adapted from
        // https://github.com/rust-lang/cargo/blob/485670b3983b52289a2f353d589c57fae2f60f82/tests/testsuite/support/mod.rs#L507
        let mut cmd_path = env::current_exe().expect("failed to get exe path");
        cmd_path.pop();
        if cmd_path.ends_with("deps") {
            cmd_path.pop();
        }

        cmd_path.push("crash-host");
        if !env::consts::EXE_SUFFIX.is_empty() {
            cmd_path.set_extension(env::consts::EXE_SUFFIX);
        }

        let mut cmd = std::process::Command::new(&cmd_path);
        cmd.stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());
        cmd.arg("--signal").arg(self.signal.to_string());
        if let Some(trace_file) = &self.trace_file {
            cmd.arg("--trace-file").arg(trace_file);
        }
        if self.no_callback {
            cmd.arg("--no-callback");
        }
        if self.reinstall > 0 {
            cmd.arg("--reinstall").arg(self.reinstall.to_string());
        }
        if self.use_thread {
            cmd.arg("--use-thread");
        }

        let output = cmd.output().expect("failed to run crash-host");

        let output = HostOutput {
            status: output.status,
            stdout: String::from_utf8(output.stdout).expect("invalid stdout"),
            stderr: String::from_utf8(output.stderr).expect("invalid stderr"),
        };

        println!("{}", output.stdout);
        eprintln!("{}", output.stderr);

        output
    }
}

pub struct HostOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl HostOutput {
    /// The number of crash reports the dispatcher emitted
    pub fn reports(&self) -> usize {
        self.stdout.matches("Crashed with signal [").count()
    }

    /// The trace file the callback received, once per invocation
    pub fn callback_paths(&self) -> Vec<&str> {
        self.stdout
            .lines()
            .filter_map(|line| line.strip_prefix(CALLBACK_MARKER)?.strip_suffix(']'))
            .collect()
    }

    /// Asserts the signal was reported once and the callback then ran once with
    /// the specified trace file
    pub fn assert_callback(&self, signal: Signal, trace_file: &str) {
        assert_eq!(
            self.status.code(),
            Some(CALLBACK_EXIT_CODE),
            "crash-host should exit from the callback"
        );
        self.assert_reported(signal);
        assert_eq!(self.callback_paths(), [trace_file]);
    }

    /// Asserts the signal was reported once and the process then exited on
    /// its own with the dispatcher's exit status
    pub fn assert_terminated(&self, signal: Signal) {
        // Only the low byte of the status survives on unix
        #[cfg(unix)]
        let expected = crash_dispatch::EXIT_STATUS & 0xff;
        #[cfg(not(unix))]
        let expected = crash_dispatch::EXIT_STATUS;

        assert!(!self.status.success());
        assert_eq!(self.status.code(), Some(expected));
        self.assert_reported(signal);
        assert!(self.callback_paths().is_empty(), "no callback was set");
    }

    fn assert_reported(&self, signal: Signal) {
        assert_eq!(self.reports(), 1, "expected exactly one crash report");
        let expected = format!("Crashed with signal [{}]", signal.reported_name());
        assert!(
            self.stdout.contains(&expected),
            "expected {expected:?} in stdout"
        );
    }
}

/// Crashes `crash-host` with the signal and checks the callback handled it
pub fn run_test(signal: Signal, counter: u32, use_thread: bool) {
    let trace_file = format!(
        "{}-{}-{}.trace",
        signal,
        counter,
        if use_thread { "threaded" } else { "simple" }
    );

    Host::new(signal)
        .trace_file(&trace_file)
        .use_thread(use_thread)
        .run()
        .assert_callback(signal, &trace_file);
}

/// Runs several crashing hosts at once, each raising the signal on a
/// secondary thread
pub fn run_threaded_test(signal: Signal, count: u32) {
    use rayon::prelude::*;

    (0..count).into_par_iter().for_each(|i| {
        run_test(signal, i, true);
    });
}
