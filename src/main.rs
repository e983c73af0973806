//! GradeSim - Consistency Models in a Classroom Gradebook
//!
//! Runs the simulator's HTTP API and batch job.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use gradesim::api::HttpServer;
use gradesim::config::{format_short, GradeSimConfig, Preset};
use gradesim::consistency::{BatchProcessor, Replicator};
use gradesim::error::Result;
use gradesim::store::Gradebook;

const DEFAULT_CONFIG: &str = "gradesim.toml";

/// GradeSim - strong, weak and eventual consistency in a gradebook
#[derive(Parser)]
#[command(name = "gradesim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the simulator
    Start {
        /// Listening port (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Timing preset
        #[arg(long, value_enum)]
        preset: Option<Preset>,

        /// Weak replication delay in milliseconds
        #[arg(long)]
        replication_delay_ms: Option<u64>,

        /// Eventual batch interval in milliseconds
        #[arg(long)]
        batch_interval_ms: Option<u64>,
    },

    /// Initialize a new configuration file
    Init {
        /// Output path for configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG)]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,

    /// Show effective configuration
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // an explicit --config must exist, the default path may be absent
    let required = cli.config != Path::new(DEFAULT_CONFIG);

    match cli.command {
        Commands::Start { port, preset, replication_delay_ms, batch_interval_ms } => {
            let mut config = GradeSimConfig::load(&cli.config, required)?;
            if let Some(preset) = preset {
                config.apply_preset(preset);
            }
            if let Some(ms) = replication_delay_ms {
                config.consistency.replication_delay_ms = ms;
            }
            if let Some(ms) = batch_interval_ms {
                config.consistency.batch_interval_ms = ms;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;

            let level = cli.log_level.unwrap_or_else(|| config.logging.level.clone());
            init_logging(&level, &config.logging.format);
            run_start(config).await
        }
        Commands::Init { output } => run_init(output),
        Commands::Validate => run_validate(&cli.config),
        Commands::Info => run_info(&cli.config, required),
    }
}

/// Initialize logging
fn init_logging(level: &str, format: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    let fmt_layer = match format {
        "json" => tracing_subscriber::fmt::layer().json().boxed(),
        "compact" => tracing_subscriber::fmt::layer().compact().boxed(),
        _ => tracing_subscriber::fmt::layer().pretty().boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

/// Start the simulator
async fn run_start(config: GradeSimConfig) -> Result<()> {
    tracing::info!("Starting GradeSim...");
    tracing::info!(
        "Weak replication delay {}, eventual batch every {}",
        format_short(config.consistency.replication_delay()),
        format_short(config.consistency.batch_interval())
    );

    let listen = config.listen_address()?;

    let book = Arc::new(Gradebook::new(&config.consistency));
    if config.demo.seed {
        book.seed_demo().await;
        tracing::info!("Demo data seeded");
    }

    let replicator = Arc::new(Replicator::new(Arc::clone(&book)));

    // Eventual-consistency batch job
    let batch = Arc::new(BatchProcessor::new(Arc::clone(&book)));
    let batch_runner = Arc::clone(&batch);
    let batch_handle = tokio::spawn(async move {
        batch_runner.start().await;
    });

    let server = HttpServer::new(config.server.clone(), book, replicator);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Received shutdown signal");
    };

    let result = server.start(listen, shutdown).await;

    batch.stop().await;
    batch_handle.abort();

    let pending = server.state().replicator.pending();
    if pending > 0 {
        tracing::warn!("{} replica writes still pending are dropped", pending);
    }
    tracing::info!("GradeSim stopped");

    result
}

/// Initialize configuration file
fn run_init(output: PathBuf) -> Result<()> {
    let config_content = r#"# GradeSim Configuration
# Generated configuration file

[server]
bind_address = "0.0.0.0"
port = 3000                  # the PORT environment variable takes precedence
static_dir = "public"
cors_enabled = false

[consistency]
# Weak model: how long a task score takes to reach the replica readers see
replication_delay_ms = 60000
# Eventual model: how often final scores are recomputed
batch_interval_ms = 5000

[logging]
level = "info"
format = "pretty"            # pretty | compact | json

[demo]
seed = true                  # start with student MHS001
"#;

    std::fs::write(&output, config_content)?;
    println!("Configuration file created: {}", output.display());
    println!("Then start with: gradesim --config {} start", output.display());

    Ok(())
}

/// Validate configuration
fn run_validate(config_path: &Path) -> Result<()> {
    match GradeSimConfig::from_file(config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!("  Listen:            {}:{}", config.server.bind_address, config.server.port);
            println!("  Replication delay: {}", format_short(config.consistency.replication_delay()));
            println!("  Batch interval:    {}", format_short(config.consistency.batch_interval()));
            Ok(())
        }
        Err(e) => {
            eprintln!("✗ Configuration error: {}", e);
            Err(e)
        }
    }
}

/// Show effective configuration
fn run_info(config_path: &Path, required: bool) -> Result<()> {
    let config = GradeSimConfig::load(config_path, required)?;

    println!("GradeSim Configuration");
    println!("======================");
    println!();
    println!("Server:");
    println!("  Listen:            {}:{}", config.server.bind_address, config.server.port);
    println!("  Static assets:     {}", config.server.static_dir.display());
    println!("  CORS:              {}", config.server.cors_enabled);
    println!();
    println!("Consistency:");
    println!("  Replication delay: {} ms", config.consistency.replication_delay_ms);
    println!("  Batch interval:    {} ms", config.consistency.batch_interval_ms);
    println!();
    println!("Logging:");
    println!("  Level:             {}", config.logging.level);
    println!("  Format:            {}", config.logging.format);
    println!();
    println!("Demo seed:           {}", config.demo.seed);

    Ok(())
}
