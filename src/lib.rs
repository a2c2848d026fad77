#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

mod command;
mod common;
mod discovery;
mod error;
mod lsof;
mod netstat;
#[cfg(feature = "proc")]
mod proc_query;
mod reaper;
#[cfg(target_os = "linux")]
mod socket_table;
mod terminate;
mod types;

pub use crate::command::{CommandOutput, CommandRunner, SystemCommandRunner};
pub use crate::discovery::{local_port, platform_discovery, PortDiscovery};
pub use crate::error::{ReapError, ReapResult};
pub use crate::lsof::{parse_lsof_table, LsofDiscovery, LSOF_NO_MATCH};
pub use crate::netstat::{parse_netstat_table, NetstatDiscovery};
#[cfg(feature = "proc")]
pub use crate::proc_query::ProcQuery;
pub use crate::reaper::{reap_port, target_pids, PortReaper};
#[cfg(target_os = "linux")]
pub use crate::socket_table::SocketTableDiscovery;
#[cfg(unix)]
pub use crate::terminate::SignalTerminator;
pub use crate::terminate::{
    platform_terminator, KillCommandTerminator, ProcessTerminator, TaskkillTerminator,
    TASKKILL_NOT_FOUND,
};
pub use crate::types::*;
