use thiserror::Error;

/// Result type used throughout the crate
pub type ReapResult<T> = Result<T, ReapError>;

/// Errors that abort a reap before any process is terminated
#[derive(Error, Debug)]
pub enum ReapError {
    /// The discovery tool could not be started
    #[error("unable to run `{program}`: {source}")]
    DiscoveryUnavailable {
        /// The program that was invoked
        program: String,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The discovery tool ran but reported a failure other than "no matches"
    #[error("`{program}` failed with exit code {code:?}: {stderr}")]
    DiscoveryFailed {
        /// The program that was invoked
        program: String,
        /// The exit code, if the program exited normally
        code: Option<i32>,
        /// Whatever the program wrote to stderr
        stderr: String,
    },

    /// The kernel socket table could not be read
    #[cfg(target_os = "linux")]
    #[error("socket table error: {0}")]
    SocketTable(#[from] procfs::ProcError),

    /// The reap was set up incorrectly
    #[error("configuration error {0}")]
    ConfigurationError(String),
}
