//! Drives the dispatch path in process via [`Dispatcher::simulate_signal`].
//!
//! The callback can't return, so the one used here panics with the trace file
//! it was handed, which unwinds back out of the dispatcher to the test. This
//! only works because nothing here goes through the `extern "C"` signal
//! handler, where a panic would abort the process instead.

use std::{
    ffi::{CStr, CString},
    sync::atomic::{AtomicUsize, Ordering},
};

use crash_dispatch::{self as cd, Dispatcher};

static SERIAL: parking_lot::Mutex<()> = parking_lot::const_mutex(());
static CALLS: AtomicUsize = AtomicUsize::new(0);

fn record_crash(trace_file: &CStr) -> ! {
    CALLS.fetch_add(1, Ordering::SeqCst);
    std::panic::panic_any(trace_file.to_owned())
}

/// Simulates the signal, returning the trace file the callback received
fn simulate(signum: libc::c_int) -> CString {
    let before = CALLS.load(Ordering::SeqCst);

    let payload = std::panic::catch_unwind(|| -> () {
        Dispatcher::get_instance().simulate_signal(signum)
    })
    .expect_err("the dispatcher can't return");

    assert_eq!(
        CALLS.load(Ordering::SeqCst) - before,
        1,
        "callback should run exactly once for signal {signum}"
    );

    *payload
        .downcast::<CString>()
        .expect("the callback panics with the trace file")
}

fn install() {
    let registration = unsafe { cd::set_callback(Some(record_crash)) };
    assert!(registration.is_complete(), "{:?}", registration.failures());
}

#[test]
fn every_tracked_signal_reaches_the_callback() {
    let _serial = SERIAL.lock();
    install();
    cd::set_trace_file("crash.log");

    for sig in cd::FATAL_SIGNALS {
        assert_eq!(simulate(sig.raw()).as_c_str(), c"crash.log", "{sig}");
    }
}

#[test]
fn callback_receives_current_trace_file() {
    let _serial = SERIAL.lock();
    install();

    cd::set_trace_file("");
    assert_eq!(
        simulate(cd::Signal::Abort.raw()).as_c_str(),
        cd::DEFAULT_TRACE_FILE
    );

    cd::set_trace_file("first.trace");
    assert_eq!(simulate(cd::Signal::Segv.raw()).as_c_str(), c"first.trace");

    cd::set_trace_file("second.trace");
    assert_eq!(simulate(cd::Signal::Segv.raw()).as_c_str(), c"second.trace");
}

#[test]
fn rebinding_does_not_duplicate_dispatch() {
    let _serial = SERIAL.lock();

    for _ in 0..4 {
        install();
    }
    cd::set_trace_file("rebind.txt");

    // `simulate` asserts the callback ran exactly once
    assert_eq!(simulate(cd::Signal::Fpe.raw()).as_c_str(), c"rebind.txt");
}

#[test]
fn unknown_signals_are_still_dispatched() {
    let _serial = SERIAL.lock();
    install();
    cd::set_trace_file("unknown.txt");

    for signum in [0, -1, 16, 64, libc::c_int::MAX] {
        assert_eq!(simulate(signum).as_c_str(), c"unknown.txt");
    }
}
