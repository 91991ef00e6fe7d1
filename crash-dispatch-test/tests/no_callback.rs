//! Without a callback the dispatcher reports the signal and exits on its own

use crash_dispatch_test::*;

#[test]
fn abort_terminates() {
    Host::new(Signal::Abort)
        .no_callback()
        .run()
        .assert_terminated(Signal::Abort);
}

#[test]
fn segfault_terminates() {
    Host::new(Signal::Segv)
        .no_callback()
        .run()
        .assert_terminated(Signal::Segv);
}

#[test]
fn terminate_terminates() {
    Host::new(Signal::Terminate)
        .no_callback()
        .trace_file("ignored.txt")
        .run()
        .assert_terminated(Signal::Terminate);
}

#[test]
fn threaded_fpe_terminates() {
    Host::new(Signal::Fpe)
        .no_callback()
        .use_thread(true)
        .run()
        .assert_terminated(Signal::Fpe);
}
