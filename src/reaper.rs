use crate::common::{resolve_port, MaybeHasPort};
use crate::discovery::{platform_discovery, PortDiscovery};
use crate::error::ReapResult;
use crate::terminate::{platform_terminator, ProcessTerminator};
use crate::types::{
    Pid, Port, PortBinding, Protocol, ReapReport, TerminationOutcome, TerminationResult,
};
use std::collections::HashSet;

/// Free a port by terminating every process bound to it
pub struct PortReaper {
    discovery: Box<dyn PortDiscovery>,
    terminator: Box<dyn ProcessTerminator>,
    port: Option<Port>,
    protocol: Option<Protocol>,
    dry_run: bool,
    resolve_process_names: bool,
}

impl PortReaper {
    /// Create a reaper from a discovery and a termination strategy.
    ///
    /// A port must be set with [`PortReaper::port`] before the reaper is usable.
    pub fn new(discovery: Box<dyn PortDiscovery>, terminator: Box<dyn ProcessTerminator>) -> Self {
        PortReaper {
            discovery,
            terminator,
            port: None,
            protocol: None,
            dry_run: false,
            resolve_process_names: cfg!(feature = "proc"),
        }
    }

    /// Create a reaper using the strategies for the platform this crate was built for
    pub fn platform_default() -> Self {
        PortReaper::new(platform_discovery(), platform_terminator())
    }

    /// Set the port to free
    pub fn port(mut self, port: Port) -> Self {
        self.port = Some(port);
        self
    }

    /// Only terminate processes with a TCP socket on the port
    pub fn tcp_only(mut self) -> Self {
        self.protocol = Some(Protocol::Tcp);
        self
    }

    /// Only terminate processes with a UDP socket on the port
    pub fn udp_only(mut self) -> Self {
        self.protocol = Some(Protocol::Udp);
        self
    }

    /// Find the processes on the port but don't terminate them
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Look up process names before terminating, for reporting. Has no effect without the `proc`
    /// feature.
    pub fn resolve_process_names(mut self, resolve: bool) -> Self {
        self.resolve_process_names = resolve;
        self
    }

    /// Discover the processes on the port and terminate each of them once.
    ///
    /// Only a failure to discover is an error. Per-process failures are recorded in the report and
    /// the remaining processes are still attempted.
    pub fn execute(&self) -> ReapResult<ReapReport> {
        let port = resolve_port(self)?;

        tracing::debug!(port, strategy = self.discovery.name(), "discovering processes");
        let bindings: Vec<PortBinding> = self
            .discovery
            .discover(port)?
            .into_iter()
            .filter(|b| self.protocol.map_or(true, |p| b.protocol == p))
            .collect();

        let targets = target_pids(&bindings);
        if targets.is_empty() {
            tracing::info!(port, "no active process on port");
        }

        let mut results = Vec::with_capacity(targets.len());
        if !self.dry_run {
            for &pid in &targets {
                let process_name = self.lookup_name(pid);
                let outcome = self.terminator.terminate(pid);
                log_outcome(pid, process_name.as_deref(), &outcome);

                results.push(TerminationResult {
                    pid,
                    process_name,
                    outcome,
                });
            }
        }

        Ok(ReapReport {
            port,
            bindings,
            targets,
            results,
            dry_run: self.dry_run,
        })
    }

    fn lookup_name(&self, pid: Pid) -> Option<String> {
        if !self.resolve_process_names {
            return None;
        }

        #[cfg(feature = "proc")]
        {
            crate::proc_query::ProcQuery::process_name(pid)
        }

        #[cfg(not(feature = "proc"))]
        {
            let _ = pid;
            None
        }
    }
}

impl MaybeHasPort for PortReaper {
    fn get_port(&self) -> Option<Port> {
        self.port
    }
}

/// Free `port` with the platform's default strategies and return one result per process.
pub fn reap_port(port: Port) -> ReapResult<Vec<TerminationResult>> {
    PortReaper::platform_default()
        .port(port)
        .execute()
        .map(|report| report.results)
}

/// The distinct processes to terminate, in the order they were first seen.
///
/// PID 0 is the kernel's placeholder for sockets without an owning process and is never a target.
pub fn target_pids(bindings: &[PortBinding]) -> Vec<Pid> {
    let mut seen = HashSet::new();
    bindings
        .iter()
        .map(|b| b.pid)
        .filter(|&pid| pid != 0 && seen.insert(pid))
        .collect()
}

fn log_outcome(pid: Pid, name: Option<&str>, outcome: &TerminationOutcome) {
    let name = name.unwrap_or("-");
    match outcome {
        TerminationOutcome::Terminated => tracing::info!(pid, name, "terminated process"),
        TerminationOutcome::NotFound => {
            tracing::info!(pid, name, "process not found, it may have already exited")
        }
        TerminationOutcome::PermissionDenied(msg) => {
            tracing::warn!(pid, name, "permission denied terminating process: {}", msg)
        }
        TerminationOutcome::Unknown(msg) => {
            tracing::warn!(pid, name, "failed to terminate process: {}", msg)
        }
    }
}
