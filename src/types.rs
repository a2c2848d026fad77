use std::fmt;

/// An operating system process identifier
pub type Pid = u32;
/// A TCP or UDP port number
pub type Port = u16;

/// The transport protocol of a socket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// A TCP socket
    Tcp,
    /// A UDP socket
    Udp,
}

impl Protocol {
    /// Parse a protocol column from an OS socket table, ignoring case and any IP version suffix
    /// such as `TCP6` or `udp4`.
    pub fn from_column(value: &str) -> Option<Protocol> {
        let lower = value.to_ascii_lowercase();
        let base = lower.trim_end_matches(|c: char| c.is_ascii_digit());
        match base {
            "tcp" => Some(Protocol::Tcp),
            "udp" => Some(Protocol::Udp),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => f.write_str("TCP"),
            Protocol::Udp => f.write_str("UDP"),
        }
    }
}

/// A process holding a socket on a local port, as seen at the moment the socket table was read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortBinding {
    /// The socket protocol
    pub protocol: Protocol,
    /// The local address in `host:port` form, as reported by the OS
    pub local_address: String,
    /// The local port
    pub port: Port,
    /// The process that owns the socket
    pub pid: Pid,
}

/// What happened when a process was asked to terminate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationOutcome {
    /// The process was killed
    Terminated,
    /// The process no longer existed
    NotFound,
    /// The OS refused to kill the process
    PermissionDenied(String),
    /// Termination failed for another reason
    Unknown(String),
}

impl TerminationOutcome {
    /// True when the process is no longer running, either because it was killed or because it had
    /// already exited.
    pub fn is_gone(&self) -> bool {
        matches!(self, TerminationOutcome::Terminated | TerminationOutcome::NotFound)
    }
}

/// The outcome of terminating a single process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminationResult {
    /// The process ID
    pub pid: Pid,
    /// The process name, when it could be looked up before termination
    pub process_name: Option<String>,
    /// The termination outcome
    pub outcome: TerminationOutcome,
}

impl fmt::Display for TerminationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.process_name {
            Some(name) => write!(f, "PID {} ({})", self.pid, name)?,
            None => write!(f, "PID {}", self.pid)?,
        }

        match &self.outcome {
            TerminationOutcome::Terminated => write!(f, " terminated"),
            TerminationOutcome::NotFound => write!(f, " not found, it may have already exited"),
            TerminationOutcome::PermissionDenied(msg) => {
                write!(f, " could not be terminated, permission denied: {}", msg)
            }
            TerminationOutcome::Unknown(msg) => write!(f, " could not be terminated: {}", msg),
        }
    }
}

/// Everything a reap of one port found and did
#[derive(Debug, Clone)]
pub struct ReapReport {
    /// The port that was reaped
    pub port: Port,
    /// The bindings found on the port that matched the protocol filter
    pub bindings: Vec<PortBinding>,
    /// The distinct processes selected for termination
    pub targets: Vec<Pid>,
    /// One result per distinct process that termination was attempted on
    pub results: Vec<TerminationResult>,
    /// Whether termination was skipped
    pub dry_run: bool,
}

impl ReapReport {
    /// True when no process was found on the port
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// True when every targeted process is no longer running
    pub fn all_freed(&self) -> bool {
        !self.dry_run && self.results.iter().all(|r| r.outcome.is_gone())
    }

    /// The results for processes that may still be running
    pub fn survivors(&self) -> impl Iterator<Item = &TerminationResult> {
        self.results.iter().filter(|r| !r.outcome.is_gone())
    }
}

impl fmt::Display for ReapReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "No active process on port {}.", self.port);
        }

        if self.dry_run {
            let mut pids = self.targets.iter().peekable();
            while let Some(pid) = pids.next() {
                write!(f, "Would terminate PID {}", pid)?;
                if pids.peek().is_some() {
                    writeln!(f)?;
                }
            }
            return Ok(());
        }

        let mut lines = self.results.iter().peekable();
        while let Some(result) = lines.next() {
            write!(f, "{}", result)?;
            if lines.peek().is_some() {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
