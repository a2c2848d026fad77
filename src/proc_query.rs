use crate::Pid;
use std::sync::{Mutex, OnceLock};
use sysinfo::{ProcessRefreshKind, RefreshKind, System};

/// Look up a running process by ID
#[derive(Debug, Default)]
pub struct ProcQuery {
    process_id: Option<Pid>,
}

impl ProcQuery {
    /// Create a new process query
    pub fn new() -> Self {
        ProcQuery { process_id: None }
    }

    /// Set the process ID to match
    pub fn process_id(mut self, pid: Pid) -> Self {
        self.process_id = Some(pid);
        self
    }

    /// The name of the selected process, `None` if it isn't running or no process ID was set
    pub fn name(&self) -> Option<String> {
        let pid = sysinfo::Pid::from_u32(self.process_id?);

        let mut sys_handle = sys_handle().lock().ok()?;
        sys_handle.refresh_process_specifics(pid, ProcessRefreshKind::new());
        sys_handle.process(pid).map(|p| p.name().to_owned())
    }

    /// Shorthand for the name of a running process
    pub fn process_name(pid: Pid) -> Option<String> {
        ProcQuery::new().process_id(pid).name()
    }
}

fn sys_handle() -> &'static Mutex<System> {
    static SYS_HANDLE: OnceLock<Mutex<System>> = OnceLock::new();
    SYS_HANDLE.get_or_init(|| {
        Mutex::new(System::new_with_specifics(
            RefreshKind::new().with_processes(ProcessRefreshKind::new()),
        ))
    })
}
