use crash_dispatch_test::*;

#[test]
fn segfault_simple() {
    run_test(Signal::Segv, 0, false);
}

#[test]
fn segfault_threaded() {
    run_threaded_test(Signal::Segv, 8);
}

#[test]
fn segfault_is_an_actual_fault() {
    let output = Host::new(Signal::Segv).trace_file("segv.trace").run();
    output.assert_callback(Signal::Segv, "segv.trace");

    // A null dereference caught by the debug assertions aborts instead
    assert!(
        !output.stderr.contains("panicked"),
        "the fault should reach the dispatcher without a panic"
    );
    assert!(!output.stdout.contains("[SIGABRT]"));
}
