//! ctdash - terminal dashboard for a clang-tidy cache server.
//!
//! Refreshes the server's stats panel and its two histograms. While the
//! terminal window has focus everything refreshes on every tick; in the
//! background each part falls back to its own slower cadence.
//!
//! Usage:
//!   ctdash                                   # TUI against http://localhost:5000
//!   ctdash -s http://ci-cache:5000           # custom server
//!   ctdash --log-file /tmp/ctdash.log -v     # TUI with debug log
//!   ctdash --headless --focused              # no UI, refresh every tick

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::io;
use std::path::PathBuf;
use std::process;
use std::sync::{Arc, Mutex};

use clap::Parser;
use tokio::runtime::Runtime;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ctdash::actions::{SharedDashboard, dashboard_poller};
use ctdash::client::DashboardClient;
use ctdash::config::{Config, ConfigError, DEFAULT_SERVER, Frontend, LogLevel, MAX_TICK_SECS};
use ctdash::host::{Host, HostHandle};
use ctdash::poller::Poller;
use ctdash::tui::App;

/// Clang-tidy cache dashboard.
#[derive(Parser)]
#[command(name = "ctdash", about = "Clang-tidy cache dashboard", version)]
struct Args {
    /// Cache server base URL.
    #[arg(short, long, default_value = DEFAULT_SERVER, env = "CTDASH_SERVER")]
    server: String,

    /// Tick period in seconds. Refresh cadences are counted in ticks.
    #[arg(
        long,
        default_value = "6",
        env = "CTDASH_TICK",
        hide = true,
        value_parser = clap::value_parser!(u64).range(1..=MAX_TICK_SECS)
    )]
    tick_secs: u64,

    /// Run without the terminal UI, logging refreshes to stderr.
    #[arg(long)]
    headless: bool,

    /// Headless only: behave as a focused dashboard (refresh every tick).
    #[arg(long)]
    focused: bool,

    /// Append logs to this file. In TUI mode logs are discarded otherwise.
    #[arg(long, value_name = "PATH", env = "CTDASH_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only log errors.
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let args = Args::parse();

    let config = match Config::new(
        &args.server,
        args.tick_secs,
        args.headless,
        args.focused,
        args.log_file.clone(),
        LogLevel::from_flags(args.verbose, args.quiet),
    ) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = init_logging(&config) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to build tokio runtime: {}", e);
            process::exit(1);
        }
    };

    let client = match DashboardClient::new(&config.server) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        server = %client.base(),
        tick_secs = config.tick.as_secs(),
        frontend = ?config.frontend,
        "ctdash starting"
    );

    let dashboard = SharedDashboard::new();
    let poller = dashboard_poller(client, dashboard.clone());
    let (host, handle) = Host::new(config.tick);

    let result = match config.frontend {
        Frontend::Tui => run_tui(&runtime, &config, host, handle, poller, dashboard),
        Frontend::Headless { focused } => run_headless(&runtime, host, handle, poller, focused),
    };

    if let Err(e) = result {
        eprintln!("Error running ctdash: {}", e);
        process::exit(1);
    }
}

/// Initializes the tracing subscriber. `RUST_LOG` overrides the level flags.
fn init_logging(config: &Config) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ctdash={}", config.log_level.as_str())));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match (config.open_log_file()?, config.frontend) {
        (Some(file), _) => builder.with_writer(Mutex::new(file)).with_ansi(false).init(),
        (None, Frontend::Headless { .. }) => builder.with_writer(io::stderr).init(),
        // stdout and stderr belong to the terminal UI
        (None, Frontend::Tui) => {}
    }
    Ok(())
}

fn run_tui(
    runtime: &Runtime,
    config: &Config,
    host: Host,
    handle: HostHandle,
    poller: Poller,
    dashboard: SharedDashboard,
) -> io::Result<()> {
    let state = host.subscribe();
    let task = runtime.spawn(host.run(poller));

    let app = App::new(config.server.clone(), config.tick, handle, state, dashboard);
    let result = app.run();

    // App::run has asked the host to stop; wait for the loop to exit.
    let _ = runtime.block_on(task);
    info!("Shutdown complete");
    result
}

fn run_headless(
    runtime: &Runtime,
    host: Host,
    handle: HostHandle,
    poller: Poller,
    focused: bool,
) -> io::Result<()> {
    if focused {
        handle.focus_gained();
    }

    let shutdown = handle.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        shutdown.shutdown();
    })
    .map_err(io::Error::other)?;

    let poller = runtime.block_on(host.run(poller));
    for stream in poller.state().streams() {
        info!(stream = %stream.id, fires = stream.fires, "stream summary");
    }
    drop(handle);
    info!("Shutdown complete");
    Ok(())
}
