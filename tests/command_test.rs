#![cfg(unix)]

use port_reaper::{CommandRunner, SystemCommandRunner};
use std::io;
use std::time::{Duration, Instant};

#[test]
fn captures_output_and_exit_code() {
    let output = SystemCommandRunner::new()
        .run("sh", &["-c", "echo out; echo err >&2; exit 3"])
        .unwrap();

    assert_eq!(Some(3), output.status);
    assert_eq!("out\n", output.stdout);
    assert_eq!("err\n", output.stderr);
    assert!(!output.success());
}

#[test]
fn fast_program_finishes_within_timeout() {
    let output = SystemCommandRunner::new()
        .with_timeout(Duration::from_secs(5))
        .run("sh", &["-c", "echo ready"])
        .unwrap();

    assert!(output.success());
    assert_eq!("ready\n", output.stdout);
}

#[test]
fn slow_program_times_out() {
    let start = Instant::now();
    let err = SystemCommandRunner::new()
        .with_timeout(Duration::from_millis(200))
        .run("sleep", &["5"])
        .unwrap_err();

    assert_eq!(io::ErrorKind::TimedOut, err.kind());
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[test]
fn background_process_holding_output_times_out() {
    // The shell exits straight away but the backgrounded sleep keeps stdout open
    let start = Instant::now();
    let err = SystemCommandRunner::new()
        .with_timeout(Duration::from_millis(200))
        .run("sh", &["-c", "sleep 3 & echo started"])
        .unwrap_err();

    assert_eq!(io::ErrorKind::TimedOut, err.kind());
    assert!(
        start.elapsed() < Duration::from_secs(2),
        "took {:?}",
        start.elapsed()
    );
}

#[test]
fn missing_program_is_an_error() {
    let err = SystemCommandRunner::new()
        .run("port-reaper-no-such-program", &[])
        .unwrap_err();

    assert_eq!(io::ErrorKind::NotFound, err.kind());
}
