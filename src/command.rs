use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

/// Captured result of running an external program
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// The exit code, `None` if the program was killed by a signal
    pub status: Option<i32>,
    /// Standard output, lossily decoded
    pub stdout: String,
    /// Standard error, lossily decoded
    pub stderr: String,
}

impl CommandOutput {
    /// True when the program exited with code 0
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs external programs on behalf of discovery and termination strategies.
///
/// Strategies hold a runner rather than calling [`Command`] directly so that tests can substitute
/// canned output and exit codes.
pub trait CommandRunner {
    /// Run `program` with `args` to completion and capture its output.
    ///
    /// An `Err` means the program could not be run at all. A program that runs and exits non-zero
    /// is an `Ok` with the exit code recorded in [`CommandOutput::status`].
    fn run(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput>;
}

/// Runs programs with [`std::process::Command`]
#[derive(Debug, Clone, Default)]
pub struct SystemCommandRunner {
    timeout: Option<Duration>,
}

const POLL_INTERVAL: Duration = Duration::from_millis(10);

impl SystemCommandRunner {
    /// Create a runner that waits for as long as each program takes
    pub fn new() -> Self {
        SystemCommandRunner { timeout: None }
    }

    /// Kill any program that has not exited after `timeout` and report it as
    /// [`io::ErrorKind::TimedOut`].
    ///
    /// The same deadline covers reading output, so a program that exits but leaves a background
    /// process holding its stdout or stderr also times out.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput> {
        tracing::debug!(program, ?args, "running command");

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Drain both pipes on their own threads so a chatty program can't block on a full pipe
        // while we wait for it.
        let (tx, rx) = mpsc::channel();
        let mut pending = 0;
        if let Some(stdout) = child.stdout.take() {
            drain(Pipe::Stdout, stdout, tx.clone());
            pending += 1;
        }
        if let Some(stderr) = child.stderr.take() {
            drain(Pipe::Stderr, stderr, tx.clone());
            pending += 1;
        }
        drop(tx);

        let deadline = self.timeout.map(|timeout| (Instant::now() + timeout, timeout));

        let status = match deadline {
            Some((at, timeout)) => wait_until(&mut child, program, at, timeout)?,
            None => child.wait()?,
        };

        let mut output = CommandOutput {
            status: status.code(),
            ..CommandOutput::default()
        };
        for _ in 0..pending {
            let (pipe, buf) = match recv_until(&rx, deadline) {
                Ok(drained) => drained,
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    let timeout = deadline.map(|(_, t)| t).unwrap_or_default();
                    return Err(timed_out(program, timeout));
                }
            };

            let text = String::from_utf8_lossy(&buf).into_owned();
            match pipe {
                Pipe::Stdout => output.stdout = text,
                Pipe::Stderr => output.stderr = text,
            }
        }

        Ok(output)
    }
}

enum Pipe {
    Stdout,
    Stderr,
}

fn drain<R: Read + Send + 'static>(pipe: Pipe, mut source: R, tx: Sender<(Pipe, Vec<u8>)>) {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = source.read_to_end(&mut buf);
        // The receiver is gone once the caller has given up on us
        let _ = tx.send((pipe, buf));
    });
}

fn recv_until(
    rx: &Receiver<(Pipe, Vec<u8>)>,
    deadline: Option<(Instant, Duration)>,
) -> Result<(Pipe, Vec<u8>), RecvTimeoutError> {
    match deadline {
        Some((at, _)) => rx.recv_timeout(at.saturating_duration_since(Instant::now())),
        None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
    }
}

fn wait_until(
    child: &mut Child,
    program: &str,
    deadline: Instant,
    timeout: Duration,
) -> io::Result<ExitStatus> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }

        if Instant::now() >= deadline {
            // The child may exit between the check and the kill
            let _ = child.kill();
            let _ = child.wait();
            return Err(timed_out(program, timeout));
        }

        thread::sleep(POLL_INTERVAL);
    }
}

fn timed_out(program: &str, timeout: Duration) -> io::Error {
    io::Error::new(
        io::ErrorKind::TimedOut,
        format!("`{}` did not exit within {:?}", program, timeout),
    )
}
