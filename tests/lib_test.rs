use assert_cmd::cargo::CommandCargoExt;
use std::io::{BufRead, BufReader};
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};

fn spawn_binder(bin: &str, port: u16) -> Child {
    let mut binder = Command::cargo_bin(bin).unwrap();
    binder.arg(port.to_string()).stdout(Stdio::piped());
    binder.spawn().unwrap()
}

/// Start the TCP binder on an ephemeral port and wait until it has bound
fn spawn_tcp_binder() -> (Child, u16) {
    let mut handle = spawn_binder("port-binder", 0);
    let mut line = String::new();
    BufReader::new(handle.stdout.as_mut().unwrap())
        .read_line(&mut line)
        .unwrap();
    let port = line.trim().parse().unwrap();
    (handle, port)
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[cfg(target_os = "linux")]
#[test]
fn socket_table_finds_binder() {
    use port_reaper::{PortDiscovery, Protocol, SocketTableDiscovery};

    let (mut handle, port) = spawn_tcp_binder();

    let bindings = SocketTableDiscovery::new().discover(port).unwrap();

    handle.kill().unwrap();

    assert_eq!(1, bindings.len());
    assert_eq!(handle.id(), bindings[0].pid);
    assert_eq!(Protocol::Tcp, bindings[0].protocol);
    assert_eq!(format!("127.0.0.1:{}", port), bindings[0].local_address);
}

#[cfg(target_os = "linux")]
#[test]
fn socket_table_finds_nothing_on_free_port() {
    use port_reaper::{PortDiscovery, SocketTableDiscovery};

    let bindings = SocketTableDiscovery::new().discover(free_port()).unwrap();

    assert!(bindings.is_empty());
}

#[cfg(target_os = "linux")]
#[test]
fn reap_port_kills_binder() {
    use port_reaper::TerminationOutcome;
    use retry::delay::Fixed;
    use retry::retry;
    use std::net::TcpStream;

    let (mut handle, port) = spawn_tcp_binder();

    let results = port_reaper::reap_port(port).unwrap();

    assert_eq!(1, results.len());
    assert_eq!(handle.id(), results[0].pid);
    assert_eq!(TerminationOutcome::Terminated, results[0].outcome);
    #[cfg(feature = "proc")]
    assert_eq!(Some("port-binder"), results[0].process_name.as_deref());

    let status = handle.wait().unwrap();
    assert!(!status.success());

    // The listener goes away with the process
    let refused = retry(Fixed::from_millis(100).take(10), || {
        match TcpStream::connect(("127.0.0.1", port)) {
            Ok(_) => Err("still accepting"),
            Err(_) => Ok(()),
        }
    });
    assert!(refused.is_ok());
}

#[cfg(target_os = "linux")]
#[test]
fn tcp_only_leaves_udp_binder_running() {
    use port_reaper::PortReaper;
    use retry::delay::Fixed;
    use retry::retry;

    let port = free_port();
    let mut handle = spawn_binder("udp-port-binder", port);

    // The binder has no way to say it's ready, wait until the socket shows up
    let udp_targets = retry(Fixed::from_millis(100).take(10), || {
        let report = PortReaper::platform_default()
            .port(port)
            .udp_only()
            .dry_run(true)
            .execute()
            .map_err(|e| e.to_string())?;
        if report.is_empty() {
            Err("udp socket not bound yet".to_string())
        } else {
            Ok(report.targets)
        }
    })
    .unwrap();

    let report = PortReaper::platform_default()
        .port(port)
        .tcp_only()
        .execute()
        .unwrap();

    let still_running = handle.try_wait().unwrap().is_none();
    handle.kill().unwrap();

    assert_eq!(vec![handle.id()], udp_targets);
    assert!(report.is_empty());
    assert!(still_running);
}

#[test]
fn cli_reports_free_port() {
    let port = free_port();

    let output = Command::cargo_bin("port-reaper")
        .unwrap()
        .args(["--port", &port.to_string()])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(
        format!("No active process on port {}.\n", port),
        String::from_utf8_lossy(&output.stdout)
    );
}

#[test]
fn cli_reads_port_from_environment() {
    let port = free_port();

    let output = Command::cargo_bin("port-reaper")
        .unwrap()
        .env("PORT_REAPER_PORT", port.to_string())
        .arg("--dry-run")
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(
        format!("No active process on port {}.\n", port),
        String::from_utf8_lossy(&output.stdout)
    );
}

#[test]
fn cli_rejects_port_zero() {
    let output = Command::cargo_bin("port-reaper")
        .unwrap()
        .args(["--port", "0"])
        .output()
        .unwrap();

    assert!(!output.status.success());
}

#[cfg(target_os = "linux")]
#[test]
fn cli_kills_binder() {
    let (mut handle, port) = spawn_tcp_binder();

    let output = Command::cargo_bin("port-reaper")
        .unwrap()
        .args(["--port", &port.to_string(), "--tcp-only"])
        .output()
        .unwrap();

    let status = handle.wait().unwrap();

    assert!(output.status.success());
    assert!(!status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.starts_with(&format!("PID {}", handle.id())),
        "unexpected output {}",
        stdout
    );
    assert!(stdout.trim_end().ends_with("terminated"));
}
