//! Panic hook capture.
//!
//! The panic hook is process-global, so this file holds a single test and
//! runs in its own test binary.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use comms_telemetry::collector::CommsTelemetry;
use comms_telemetry::error_capture::ErrorKind;
use comms_test_utils::test_collector;

#[test]
fn test_panic_captured_once_after_double_install() {
    let collector = test_collector();

    assert!(collector.install_error_capture());
    assert!(
        !collector.install_error_capture(),
        "second install must not register another hook"
    );

    let result = std::thread::spawn(|| {
        panic!("voice bridge exploded");
    })
    .join();
    assert!(result.is_err());

    let errors = collector.recent_errors(10);
    assert_eq!(errors.len(), 1, "exactly one record per panic");
    assert_eq!(errors[0].kind, ErrorKind::Uncaught);
    assert_eq!(errors[0].message, "voice bridge exploded");
    assert!(errors[0]
        .source_location
        .as_deref()
        .is_some_and(|loc| loc.contains("panic_capture.rs")));
}
