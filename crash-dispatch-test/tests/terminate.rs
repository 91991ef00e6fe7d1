//! Termination requests are dispatched like any other fatal signal

use crash_dispatch_test::*;

#[test]
fn terminate() {
    run_test(Signal::Terminate, 0, false);
}

#[test]
fn interrupt() {
    run_test(Signal::Interrupt, 0, false);
}

#[test]
fn interrupt_threaded() {
    run_threaded_test(Signal::Interrupt, 4);
}
