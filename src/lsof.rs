use crate::command::CommandRunner;
use crate::discovery::{local_port, run_discovery, PortDiscovery};
use crate::error::ReapResult;
use crate::types::{Pid, Port, PortBinding, Protocol};

/// `lsof` exits with 1 and prints nothing when no open file matched
pub const LSOF_NO_MATCH: i32 = 1;

/// Discover port owners with `lsof`, for macOS and the BSDs
pub struct LsofDiscovery<R> {
    runner: R,
}

impl<R: CommandRunner> LsofDiscovery<R> {
    /// Create an lsof discovery that runs commands through `runner`
    pub fn new(runner: R) -> Self {
        LsofDiscovery { runner }
    }
}

impl<R: CommandRunner> PortDiscovery for LsofDiscovery<R> {
    fn name(&self) -> &'static str {
        "lsof"
    }

    fn discover(&self, port: Port) -> ReapResult<Vec<PortBinding>> {
        let selector = format!(":{}", port);

        let args = ["-nP", "-i", selector.as_str()];

        match run_discovery(&self.runner, "lsof", &args, Some(LSOF_NO_MATCH))? {
            Some(table) => Ok(parse_lsof_table(&table, port)),
            None => Ok(Vec::new()),
        }
    }
}

/// Parse `lsof -nP -i` output into bindings on `port`.
///
/// The columns are `COMMAND PID USER FD TYPE DEVICE SIZE/OFF NODE NAME`, where NODE is the
/// protocol and NAME is either `local` or `local->remote`, optionally followed by a state such as
/// `(LISTEN)`. Only rows whose local side is on `port` are kept.
pub fn parse_lsof_table(table: &str, port: Port) -> Vec<PortBinding> {
    table
        .lines()
        .filter_map(|line| parse_lsof_row(line, port))
        .collect()
}

fn parse_lsof_row(line: &str, port: Port) -> Option<PortBinding> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let pid = fields.get(1)?.parse::<Pid>().ok()?;

    // Locate NODE by content, SIZE/OFF and DEVICE are not always populated
    let node = fields
        .iter()
        .enumerate()
        .skip(4)
        .find_map(|(i, f)| Protocol::from_column(f).map(|p| (i, p)));
    let (node_idx, protocol) = node?;

    let name = fields.get(node_idx + 1)?;
    let local_address = name.split("->").next()?;
    if local_port(local_address)? != port {
        return None;
    }

    Some(PortBinding {
        protocol,
        local_address: local_address.to_string(),
        port,
        pid,
    })
}
