//! dbporter CLI - copy a table's schema and rows between databases.

mod prompt;

use clap::{Parser, Subcommand};
use dbporter::{create_adapter, DatabaseAdapter, MigrateError, Migrator, PipelineConfig, DEFAULT_BATCH_SIZE};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "dbporter")]
#[command(about = "Copy table schemas and rows between relational databases")]
#[command(version)]
struct Cli {
    /// Log format: text or json
    #[arg(long, default_value = "text", global = true)]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info", global = true)]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a pipeline document and transfer data from source to destination
    Transfer {
        /// Path to the pipeline document (YAML, or JSON with a .json extension)
        #[arg(short, long)]
        config: PathBuf,

        /// Table to migrate; without it only the pipeline is reported
        #[arg(long)]
        table: Option<String>,

        /// Drop and recreate the destination table from the source schema
        #[arg(long, requires = "table")]
        recreate: bool,

        /// Rows per insert transaction
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Print the migration report as JSON
        #[arg(long)]
        output_json: bool,
    },

    /// Interactively pick a source type
    SelectSource,

    /// List the tables visible to the source adapter
    ListTables {
        /// Path to the pipeline document
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    // Interactive prompt keeps the terminal free of log output
    if let Commands::SelectSource = cli.command {
        let choice = prompt::select_source_type().map_err(|e| match e {
            prompt::PromptError::Cancelled => MigrateError::Cancelled,
            other => MigrateError::Config(other.to_string()),
        })?;
        println!("Selected source type: {}", choice);
        return Ok(());
    }

    setup_logging(&cli.verbosity, &cli.log_format);

    match cli.command {
        Commands::SelectSource => unreachable!(), // Handled above
        Commands::Transfer {
            config,
            table,
            recreate,
            batch_size,
            output_json,
        } => {
            let pipeline = PipelineConfig::load(&config)?;
            info!("Loaded pipeline from {:?}", config);
            info!(
                source = %pipeline.source.r#type,
                destination = %pipeline.destination.r#type,
                "Pipeline adapters"
            );
            println!("Source type: {}", pipeline.source.r#type);
            println!("Destination type: {}", pipeline.destination.r#type);

            let Some(table) = table else {
                return Ok(());
            };

            let cancel = setup_signal_handler();
            let mut source = create_adapter(&pipeline.source)?;
            let mut destination = create_adapter(&pipeline.destination)?;

            let connected = async {
                source.connect(&cancel).await?;
                destination.connect(&cancel).await
            }
            .await;
            if let Err(e) = connected {
                source.close().await;
                destination.close().await;
                return Err(e);
            }

            let migrator = Migrator::new(source, destination).with_batch_size(batch_size);
            let result = migrator.migrate_table(&cancel, &table, recreate).await;

            let (mut source, mut destination) = migrator.into_adapters();
            source.close().await;
            destination.close().await;

            let report = result?;
            if output_json {
                println!("{}", report.to_json()?);
            } else {
                println!("\nMigration completed!");
                println!("  Table: {}", report.table);
                println!("  Rows: {}", report.rows_migrated);
                println!("  Recreated: {}", report.recreated);
                println!("  Duration: {:.2}s", report.duration_seconds);
            }
        }

        Commands::ListTables { config } => {
            let pipeline = PipelineConfig::load(&config)?;
            let cancel = setup_signal_handler();

            let mut source = create_adapter(&pipeline.source)?;
            source.connect(&cancel).await?;
            let tables = source.list_tables(&cancel).await;
            source.close().await;

            for name in tables? {
                println!("{}", name);
            }
        }
    }

    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Cancel the returned token on SIGINT or SIGTERM.
#[cfg(unix)]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();

    for (kind, name) in [
        (SignalKind::interrupt(), "SIGINT"),
        (SignalKind::terminate(), "SIGTERM"),
    ] {
        let token = cancel_token.clone();
        match signal(kind) {
            Ok(mut stream) => {
                tokio::spawn(async move {
                    stream.recv().await;
                    eprintln!("\nReceived {}. Cancelling...", name);
                    token.cancel();
                });
            }
            Err(e) => tracing::warn!("Failed to install {} handler: {}", name, e),
        }
    }

    cancel_token
}

/// Ctrl-C only outside unix.
#[cfg(not(unix))]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Cancelling...");
            token.cancel();
        }
    });

    cancel_token
}
