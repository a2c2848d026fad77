use clap::{ArgAction, Parser, ValueEnum};
use port_reaper::{
    platform_terminator, LsofDiscovery, NetstatDiscovery, Port, PortDiscovery, PortReaper,
    SystemCommandRunner,
};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Strategy {
    /// Pick the strategy for this platform
    Auto,
    /// Windows `netstat -ano`
    Netstat,
    /// `lsof -nP -i`
    Lsof,
    /// Linux `/proc/net` tables
    SocketTable,
}

impl Strategy {
    fn for_platform() -> Strategy {
        if cfg!(target_os = "linux") {
            Strategy::SocketTable
        } else if cfg!(windows) {
            Strategy::Netstat
        } else {
            Strategy::Lsof
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "port-reaper")]
#[command(about = "Terminate every process bound to a port", long_about = None)]
struct Cli {
    /// Port to free
    #[arg(
        short,
        long,
        env = "PORT_REAPER_PORT",
        default_value_t = 5000,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    port: Port,

    /// How to find the processes on the port
    #[arg(long, value_enum, default_value_t = Strategy::Auto)]
    strategy: Strategy,

    /// Leave processes that only hold a UDP socket alone
    #[arg(long)]
    tcp_only: bool,

    /// List the processes that would be terminated
    #[arg(long)]
    dry_run: bool,

    /// Give up on an external discovery tool after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Increase logging detail (-v: debug, -vv: trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbosity: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbosity);

    let discovery = match discovery_for(&cli) {
        Ok(discovery) => discovery,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut reaper = PortReaper::new(discovery, platform_terminator())
        .port(cli.port)
        .dry_run(cli.dry_run);
    if cli.tcp_only {
        reaper = reaper.tcp_only();
    }

    match reaper.execute() {
        Ok(report) => {
            println!("{}", report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("discovery failed: {}", e);
            eprintln!("Failed to list processes on port {} - {}", cli.port, e);
            ExitCode::FAILURE
        }
    }
}

fn discovery_for(cli: &Cli) -> Result<Box<dyn PortDiscovery>, String> {
    let mut runner = SystemCommandRunner::new();
    if let Some(ms) = cli.timeout_ms {
        runner = runner.with_timeout(Duration::from_millis(ms));
    }

    let strategy = match cli.strategy {
        Strategy::Auto => Strategy::for_platform(),
        strategy => strategy,
    };

    match strategy {
        Strategy::Auto | Strategy::Netstat => Ok(Box::new(NetstatDiscovery::new(runner))),
        Strategy::Lsof => Ok(Box::new(LsofDiscovery::new(runner))),
        #[cfg(target_os = "linux")]
        Strategy::SocketTable => Ok(Box::new(port_reaper::SocketTableDiscovery::new())),
        #[cfg(not(target_os = "linux"))]
        Strategy::SocketTable => Err("the socket-table strategy is only available on Linux".into()),
    }
}

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "port_reaper=debug,info",
        _ => "port_reaper=trace,debug",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
