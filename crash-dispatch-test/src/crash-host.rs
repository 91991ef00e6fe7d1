use std::ffi::CStr;

use clap::Parser;
use crash_dispatch_test::{CALLBACK_EXIT_CODE, CALLBACK_MARKER, Signal};

#[derive(Parser)]
struct Command {
    /// The signal to raise
    #[arg(long, value_enum)]
    signal: Signal,
    /// The trace file handed to the crash callback
    #[arg(long)]
    trace_file: Option<String>,
    /// Don't set a crash callback, the dispatcher should exit on its own
    #[arg(long)]
    no_callback: bool,
    /// Sets the crash callback this many more times before raising the signal
    #[arg(long, default_value_t = 0)]
    reinstall: u32,
    /// Raises the signal on a separate thread rather than the main thread
    #[arg(long)]
    use_thread: bool,
}

/// Reports the trace file it was handed and exits, only using async signal
/// safe operations to do so
fn on_crash(trace_file: &CStr) -> ! {
    crash_dispatch::write_stdout(CALLBACK_MARKER.as_bytes());
    crash_dispatch::write_stdout(trace_file.to_bytes());
    crash_dispatch::write_stdout(b"]\n");

    unsafe { libc::_exit(CALLBACK_EXIT_CODE) }
}

fn real_main() -> anyhow::Result<()> {
    let cmd = Command::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .init();

    println!("pid: {}", std::process::id());

    let dispatcher = crash_dispatch::get_instance();

    if let Some(trace_file) = &cmd.trace_file {
        dispatcher.set_trace_file(trace_file);
    }

    let callback = if cmd.no_callback {
        None
    } else {
        Some(on_crash as crash_dispatch::CrashCallback)
    };

    for _ in 0..=cmd.reinstall {
        // SAFETY: `on_crash` only performs async signal safe operations
        let registration = unsafe { dispatcher.set_callback(callback) };

        if !registration.is_complete() {
            anyhow::bail!(
                "failed to bind {} signal(s) to the dispatcher",
                registration.failures().len()
            );
        }
    }

    let Some(flavor) = cmd.signal.flavor() else {
        anyhow::bail!("{} can't be raised on this platform", cmd.signal);
    };

    let scratch_dir = std::env::temp_dir().join(format!("crash-host-{}", std::process::id()));
    std::fs::create_dir_all(&scratch_dir)?;

    let raise_signal = move || flavor.make_sad(&scratch_dir);

    if cmd.use_thread {
        std::thread::spawn(raise_signal)
            .join()
            .map_err(|_| anyhow::anyhow!("failed to join thread"))?;
    } else {
        raise_signal();
    }

    anyhow::bail!("we should have raised a signal and exited");
}

fn main() {
    // Every path through this program should end in the dispatcher, so emit a
    // distinct error code if we don't get there so that we can fail the test
    if let Err(e) = real_main() {
        eprintln!("error: {:#}", e);

        #[allow(clippy::exit)]
        std::process::exit(222);
    }
}
