use crate::command::CommandRunner;
use crate::types::{Pid, TerminationOutcome};

/// Forcibly stop a process.
///
/// Termination never fails as a call: every error is folded into the returned outcome so that one
/// stubborn process can't stop the others from being handled.
pub trait ProcessTerminator {
    /// Kill `pid` without giving it a chance to clean up
    fn terminate(&self, pid: Pid) -> TerminationOutcome;
}

/// The termination strategy for the platform this crate was built for
pub fn platform_terminator() -> Box<dyn ProcessTerminator> {
    #[cfg(unix)]
    {
        Box::new(SignalTerminator)
    }

    #[cfg(windows)]
    {
        Box::new(TaskkillTerminator::new(
            crate::command::SystemCommandRunner::new(),
        ))
    }
}

/// Sends `SIGKILL` directly
#[cfg(unix)]
#[derive(Debug, Default)]
pub struct SignalTerminator;

#[cfg(unix)]
impl ProcessTerminator for SignalTerminator {
    fn terminate(&self, pid: Pid) -> TerminationOutcome {
        use nix::errno::Errno;
        use nix::sys::signal::{kill, Signal};

        // Anything above i32::MAX would be read as a process group by kill(2)
        let raw = match i32::try_from(pid) {
            Ok(raw) if raw > 0 => raw,
            _ => return TerminationOutcome::Unknown(format!("{} is not a valid process id", pid)),
        };

        match kill(nix::unistd::Pid::from_raw(raw), Signal::SIGKILL) {
            Ok(()) => TerminationOutcome::Terminated,
            Err(Errno::ESRCH) => TerminationOutcome::NotFound,
            Err(e @ Errno::EPERM) => TerminationOutcome::PermissionDenied(e.desc().to_string()),
            Err(e) => TerminationOutcome::Unknown(e.desc().to_string()),
        }
    }
}

/// `taskkill` exits with 128 when the target process does not exist
pub const TASKKILL_NOT_FOUND: i32 = 128;

/// Runs `taskkill /F /PID <pid>`, the Windows way of force-killing a process
pub struct TaskkillTerminator<R> {
    runner: R,
}

impl<R: CommandRunner> TaskkillTerminator<R> {
    /// Create a terminator that runs `taskkill` through `runner`
    pub fn new(runner: R) -> Self {
        TaskkillTerminator { runner }
    }
}

impl<R: CommandRunner> ProcessTerminator for TaskkillTerminator<R> {
    fn terminate(&self, pid: Pid) -> TerminationOutcome {
        let pid_arg = pid.to_string();
        let output = match self.runner.run("taskkill", &["/F", "/PID", &pid_arg]) {
            Ok(output) => output,
            Err(e) => return TerminationOutcome::Unknown(format!("unable to run taskkill: {}", e)),
        };

        if output.success() {
            return TerminationOutcome::Terminated;
        }

        let message = first_message(&output.stderr, &output.stdout);
        let lower = message.to_ascii_lowercase();
        if output.status == Some(TASKKILL_NOT_FOUND) || lower.contains("not found") {
            TerminationOutcome::NotFound
        } else if lower.contains("access is denied") {
            TerminationOutcome::PermissionDenied(message)
        } else {
            TerminationOutcome::Unknown(message)
        }
    }
}

/// Runs `kill -9 <pid>`, for unix systems where signalling directly isn't wanted
pub struct KillCommandTerminator<R> {
    runner: R,
}

impl<R: CommandRunner> KillCommandTerminator<R> {
    /// Create a terminator that runs `kill` through `runner`
    pub fn new(runner: R) -> Self {
        KillCommandTerminator { runner }
    }
}

impl<R: CommandRunner> ProcessTerminator for KillCommandTerminator<R> {
    fn terminate(&self, pid: Pid) -> TerminationOutcome {
        let pid_arg = pid.to_string();
        let output = match self.runner.run("kill", &["-9", &pid_arg]) {
            Ok(output) => output,
            Err(e) => return TerminationOutcome::Unknown(format!("unable to run kill: {}", e)),
        };

        if output.success() {
            return TerminationOutcome::Terminated;
        }

        let message = first_message(&output.stderr, &output.stdout);
        let lower = message.to_ascii_lowercase();
        if lower.contains("no such process") {
            TerminationOutcome::NotFound
        } else if lower.contains("not permitted") || lower.contains("permission denied") {
            TerminationOutcome::PermissionDenied(message)
        } else {
            TerminationOutcome::Unknown(message)
        }
    }
}

fn first_message(stderr: &str, stdout: &str) -> String {
    let message = if stderr.trim().is_empty() { stdout } else { stderr };
    message.trim().to_string()
}
