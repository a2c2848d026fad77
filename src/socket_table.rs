use crate::discovery::PortDiscovery;
use crate::error::ReapResult;
use crate::types::{Pid, Port, PortBinding, Protocol};
use procfs::process::FDTarget;
use std::collections::HashMap;
use std::net::SocketAddr;

/// Discover port owners from the Linux kernel socket tables in `/proc/net`.
///
/// Sockets are matched to processes by inode through each process's `/proc/<pid>/fd`. Processes
/// whose file descriptors can't be read (another user's, or ones that exit mid-scan) are skipped,
/// so without privileges only your own processes are found.
#[derive(Debug, Default)]
pub struct SocketTableDiscovery;

impl SocketTableDiscovery {
    /// Create a socket table discovery
    pub fn new() -> Self {
        SocketTableDiscovery
    }
}

impl PortDiscovery for SocketTableDiscovery {
    fn name(&self) -> &'static str {
        "socket-table"
    }

    fn discover(&self, port: Port) -> ReapResult<Vec<PortBinding>> {
        let sockets = sockets_on_port(port)?;
        if sockets.is_empty() {
            return Ok(Vec::new());
        }

        let mut bindings = Vec::new();
        for process in procfs::process::all_processes()?.flatten() {
            let fds = match process.fd() {
                Ok(fds) => fds,
                Err(e) => {
                    tracing::trace!(pid = process.pid, "skipping process: {}", e);
                    continue;
                }
            };

            for fd in fds.flatten() {
                if let FDTarget::Socket(inode) = fd.target {
                    if let Some((protocol, address)) = sockets.get(&inode) {
                        bindings.push(PortBinding {
                            protocol: *protocol,
                            local_address: address.to_string(),
                            port,
                            pid: process.pid as Pid,
                        });
                    }
                }
            }
        }

        Ok(bindings)
    }
}

fn sockets_on_port(port: Port) -> ReapResult<HashMap<u64, (Protocol, SocketAddr)>> {
    let mut sockets = HashMap::new();

    // The IPv6 tables are absent when IPv6 is disabled
    let tcp = procfs::net::tcp()?
        .into_iter()
        .chain(procfs::net::tcp6().unwrap_or_default())
        .map(|e| (Protocol::Tcp, e.local_address, e.inode));
    let udp = procfs::net::udp()?
        .into_iter()
        .chain(procfs::net::udp6().unwrap_or_default())
        .map(|e| (Protocol::Udp, e.local_address, e.inode));

    for (protocol, address, inode) in tcp.chain(udp) {
        // Time-wait sockets have no owner and report inode 0
        if address.port() == port && inode != 0 {
            sockets.insert(inode, (protocol, address));
        }
    }

    Ok(sockets)
}
