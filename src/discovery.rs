use crate::command::{CommandOutput, CommandRunner};
use crate::error::{ReapError, ReapResult};
use crate::types::{Port, PortBinding};

/// Find the processes bound to a local port.
///
/// Each implementation understands one OS socket table format. Finding nothing is not an error,
/// it's an empty list. An `Err` means the socket table could not be read at all.
pub trait PortDiscovery {
    /// A short name for logging
    fn name(&self) -> &'static str;

    /// List the sockets bound to `port` and the processes that own them
    fn discover(&self, port: Port) -> ReapResult<Vec<PortBinding>>;
}

/// The discovery strategy for the platform this crate was built for
pub fn platform_discovery() -> Box<dyn PortDiscovery> {
    #[cfg(target_os = "linux")]
    {
        Box::new(crate::socket_table::SocketTableDiscovery::new())
    }

    #[cfg(windows)]
    {
        Box::new(crate::netstat::NetstatDiscovery::new(
            crate::command::SystemCommandRunner::new(),
        ))
    }

    #[cfg(all(unix, not(target_os = "linux")))]
    {
        Box::new(crate::lsof::LsofDiscovery::new(
            crate::command::SystemCommandRunner::new(),
        ))
    }
}

/// Extract the port from a `host:port` socket address column.
///
/// Accepts the forms OS tools print, e.g. `0.0.0.0:5000`, `[::1]:5000`, `*:5000`. Wildcard ports
/// (`*:*`) are not ports.
pub fn local_port(address: &str) -> Option<Port> {
    let (_, port) = address.rsplit_once(':')?;
    port.parse().ok()
}

/// Run a discovery tool and decide whether it found something, found nothing or failed.
///
/// Some tools signal "no matches" with a dedicated exit code rather than 0. That code with empty
/// output is reported as `Ok(None)`; any other non-zero exit is a discovery failure. Tools without
/// such a code pass `None` and every non-zero exit is a failure.
pub(crate) fn run_discovery<R: CommandRunner>(
    runner: &R,
    program: &str,
    args: &[&str],
    no_match_code: Option<i32>,
) -> ReapResult<Option<String>> {
    let output = runner
        .run(program, args)
        .map_err(|source| ReapError::DiscoveryUnavailable {
            program: program.to_string(),
            source,
        })?;

    classify(program, output, no_match_code)
}

fn classify(
    program: &str,
    output: CommandOutput,
    no_match_code: Option<i32>,
) -> ReapResult<Option<String>> {
    if output.success() {
        return Ok(Some(output.stdout));
    }

    if let Some(code) = no_match_code {
        if output.status == Some(code) && output.stdout.trim().is_empty() {
            tracing::debug!(program, code, "no matches reported");
            return Ok(None);
        }
    }

    Err(ReapError::DiscoveryFailed {
        program: program.to_string(),
        code: output.status,
        stderr: output.stderr.trim().to_string(),
    })
}
