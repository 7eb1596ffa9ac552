//! DriftWatch CLI - run the drift-detection service and inspect its state.

use clap::Parser;
use driftwatch_core::Config;
use driftwatch_drift::TransitionChecker;
use driftwatch_ledger::AuditLog;
use driftwatch_server::{build_router, AppState};
use std::net::SocketAddr;

#[derive(Parser)]
#[command(name = "driftwatch")]
#[command(about = "DriftWatch - UI drift detection and forensic audit service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Start the HTTP service
    Serve {
        /// Bind address
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Bind port
        #[arg(long, default_value_t = 8000)]
        port: u16,
    },
    /// Validate the template directory and its transition graph
    Check,
    /// Show log size and integrity status
    Status,
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.clone()));

    if config.json_logs {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env();
    init_tracing(&config);

    match cli.command {
        Some(Commands::Serve { host, port }) => serve(config, &host, port),
        Some(Commands::Check) => check(config),
        Some(Commands::Status) => status(config),
        None => {
            println!("DriftWatch v{} - use --help for commands", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn serve(config: Config, host: &str, port: u16) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let state = AppState::new(config)?;
        let router = build_router(state.clone());

        let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(%addr, "driftwatch listening");

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        // Flush and close the audit log before exit.
        state.shutdown();
        Ok(())
    })
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!("failed to install ctrl-c handler");
    }
}

fn check(config: Config) -> anyhow::Result<()> {
    let store = driftwatch_baseline::TemplateStore::open(&config.templates_dir)?;
    println!(
        "loaded {} templates from {}",
        store.len(),
        config.templates_dir.display()
    );

    let errors = TransitionChecker::validate_transition_graph(&store.snapshot());
    if errors.is_empty() {
        println!("transition graph: OK");
    } else {
        for (screen_id, messages) in &errors {
            for message in messages {
                println!("{}: {}", screen_id, message);
            }
        }
        anyhow::bail!("transition graph has {} screen(s) with errors", errors.len());
    }
    Ok(())
}

fn status(config: Config) -> anyhow::Result<()> {
    if !config.log_path.exists() {
        println!("no log at {}", config.log_path.display());
        return Ok(());
    }

    let log = AuditLog::open(&config.log_path)?;
    println!("log: {}", config.log_path.display());
    println!("entries: {}", log.len());
    println!(
        "integrity: {}",
        if log.verify_integrity() { "valid" } else { "INVALID" }
    );
    Ok(())
}
