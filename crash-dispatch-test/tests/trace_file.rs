use crash_dispatch_test::*;

#[test]
fn callback_receives_configured_trace_file() {
    let output = Host::new(Signal::Abort).trace_file("crash.log").run();

    output.assert_callback(Signal::Abort, "crash.log");
    assert!(output.stdout.contains("SIGABRT"));

    // The path is only configuration, nothing writes to it
    assert!(!std::path::Path::new("crash.log").exists());
}

#[test]
fn callback_receives_default_trace_file() {
    Host::new(Signal::Segv)
        .run()
        .assert_callback(Signal::Segv, "stacktrace.txt");
}

#[test]
fn empty_trace_file_falls_back_to_default() {
    Host::new(Signal::Illegal)
        .trace_file("")
        .run()
        .assert_callback(Signal::Illegal, "stacktrace.txt");
}
