use crate::command::CommandRunner;
use crate::discovery::{local_port, run_discovery, PortDiscovery};
use crate::error::ReapResult;
use crate::types::{Pid, Port, PortBinding, Protocol};

/// Discover port owners from the Windows `netstat -ano` table.
///
/// The whole table is read and filtered on the local port. `netstat` has no "no matches" exit
/// code, so any non-zero exit is a failure and a table without the port is the empty result.
pub struct NetstatDiscovery<R> {
    runner: R,
}

impl<R: CommandRunner> NetstatDiscovery<R> {
    /// Create a netstat discovery that runs commands through `runner`
    pub fn new(runner: R) -> Self {
        NetstatDiscovery { runner }
    }
}

impl<R: CommandRunner> PortDiscovery for NetstatDiscovery<R> {
    fn name(&self) -> &'static str {
        "netstat"
    }

    fn discover(&self, port: Port) -> ReapResult<Vec<PortBinding>> {
        match run_discovery(&self.runner, "netstat", &["-ano"], None)? {
            Some(table) => Ok(parse_netstat_table(&table, port)),
            None => Ok(Vec::new()),
        }
    }
}

/// Parse rows of `netstat -ano` output into bindings on `port`.
///
/// Rows look like `TCP 0.0.0.0:5000 0.0.0.0:0 LISTENING 1234`, UDP rows have no state column.
/// The PID is the last column. Headers, blank lines and rows where `port` only appears in the
/// foreign address are skipped.
pub fn parse_netstat_table(table: &str, port: Port) -> Vec<PortBinding> {
    table
        .lines()
        .filter_map(|line| {
            let binding = parse_netstat_row(line, port);
            if binding.is_none() && !line.trim().is_empty() {
                tracing::trace!(line, "skipping netstat row");
            }
            binding
        })
        .collect()
}

fn parse_netstat_row(line: &str, port: Port) -> Option<PortBinding> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 4 {
        return None;
    }

    let protocol = Protocol::from_column(fields[0])?;
    let local_address = fields[1];
    if local_port(local_address)? != port {
        return None;
    }

    let pid = fields.last()?.parse::<Pid>().ok()?;

    Some(PortBinding {
        protocol,
        local_address: local_address.to_string(),
        port,
        pid,
    })
}
