use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use superdesk_capabilities::CapabilityRegistry;
use superdesk_core::config::AppConfig;
use superdesk_core::event::EventChannel;
use superdesk_core::types::RunId;
use superdesk_flow::{generate, resolve, FlowOrchestrator, NodeExecutor};

#[derive(Parser)]
#[command(name = "superdesk", version, about = "IT-support troubleshooting flows")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "superdesk.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a troubleshooting flow for an issue
    Generate {
        /// Print the flow as JSON
        #[arg(long)]
        json: bool,
        /// The issue description
        #[arg(trailing_var_arg = true, required = true)]
        issue: Vec<String>,
    },
    /// Show which capability a step label is routed to
    Route {
        /// The step label
        #[arg(trailing_var_arg = true, required = true)]
        label: Vec<String>,
    },
    /// Generate a flow for an issue and execute it, streaming events as JSON lines
    Run {
        /// Run id (generated if not provided)
        #[arg(long)]
        run_id: Option<String>,
        /// The issue description
        #[arg(trailing_var_arg = true, required = true)]
        issue: Vec<String>,
    },
    /// Show current configuration
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("superdesk=info,warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Handle completions before config loading
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "superdesk", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Generate { json, issue } => {
            let flow = generate(&issue.join(" "));
            if json {
                println!("{}", serde_json::to_string_pretty(&flow)?);
            } else {
                println!("{} [{}]", flow.meta().title, flow.meta().category);
                for (i, node) in flow.nodes().iter().enumerate() {
                    let route = resolve(&node.label);
                    println!("  {}. {}  ->  {}", i + 1, node.label, route.capability);
                }
            }
        }
        Commands::Route { label } => {
            let route = resolve(&label.join(" "));
            println!("{}", serde_json::to_string_pretty(&route)?);
        }
        Commands::Run { run_id, issue } => {
            let succeeded = run_issue(&config, run_id, &issue.join(" ")).await?;
            if !succeeded {
                std::process::exit(1);
            }
        }
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Completions { .. } => unreachable!("handled before config loading"),
    }

    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    if path.exists() {
        info!(path = %path.display(), "Loading config");
        Ok(AppConfig::load(path)?)
    } else {
        warn!(path = %path.display(), "No config file found, using defaults");
        Ok(AppConfig::default())
    }
}

/// Execute one run, printing every event as a JSON line on stdout.
async fn run_issue(config: &AppConfig, run_id: Option<String>, issue: &str) -> anyhow::Result<bool> {
    let registry = Arc::new(CapabilityRegistry::with_builtins(&config.capabilities));
    let events = EventChannel::new(config.engine.event_capacity);
    let executor = NodeExecutor::new(registry, events.clone())
        .with_step_delay(Duration::from_millis(config.engine.step_delay_ms));
    let orchestrator = FlowOrchestrator::new(executor);

    let run_id = run_id.map(|id| RunId::from_str(&id)).unwrap_or_default();
    let flow = generate(issue);

    // Join before the run starts so no event is missed
    let subscription = events.subscribe(&run_id);
    let printer = tokio::spawn(async move {
        let mut stream = subscription.into_stream();
        while let Some(event) = stream.next().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!(error = %e, "Failed to serialize event"),
            }
        }
    });

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current step");
            ctrl_c.cancel();
        }
    });

    let run = orchestrator.run_with_cancel(run_id, &flow, cancel).await;
    printer.await?;

    if let Some(failure) = run.failure() {
        warn!(
            node_id = %failure.node_id,
            error = failure.error.as_deref().unwrap_or(""),
            "Run stopped at failing step"
        );
    }
    Ok(run.succeeded())
}
