use std::{path::PathBuf, sync::Arc};

use backup_scheduler::{
    backend::kubernetes::KubeClient,
    config::{ConfigOverrides, SchedulerConfig},
    observability,
    sync::Synchronizer,
};
use clap::Parser;

/// CLI arguments for the backup scheduler
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Create Kanister ActionSets from resource annotations and prune old ones",
    long_about = None
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file (all defaults apply if omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Namespace ActionSets are created in and cleaned up from
    #[arg(short, long, global = true)]
    namespace: Option<String>,

    /// Number of ActionSets to keep per group
    #[arg(
        short = 'k',
        long = "keep-successful",
        global = true,
        allow_negative_numbers = true
    )]
    keep_completed: Option<i64>,

    /// Log what would be deleted without deleting anything
    #[arg(long, global = true)]
    dry_run: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Generate ActionSets, then apply retention (default)
    Run,
    /// Export the JSON schema for the configuration file
    Schema {
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    match args.command {
        Some(Command::Schema { output }) => {
            #[cfg(feature = "json-schema")]
            run_schema_export(output);
            #[cfg(not(feature = "json-schema"))]
            {
                let _ = output;
                eprintln!("Error: JSON schema export requires the 'json-schema' feature");
                std::process::exit(1);
            }
        }
        Some(Command::Run) | None => {
            run(args.config, args.run).await;
        }
    }
}

fn load_config(path: Option<&PathBuf>, run_args: RunArgs) -> SchedulerConfig {
    let config = match path {
        Some(path) => SchedulerConfig::from_file(path),
        None => Ok(SchedulerConfig::default()),
    };
    let config = config.and_then(|c| {
        c.with_overrides(ConfigOverrides {
            namespace: run_args.namespace,
            keep_completed: run_args.keep_completed,
            dry_run: run_args.dry_run,
        })
    });

    match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run(config_path: Option<PathBuf>, run_args: RunArgs) {
    let config = load_config(config_path.as_ref(), run_args);

    if let Err(e) = observability::init_tracing(&config.observability) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config_file = ?config_path,
        namespace = %config.sync.namespace,
        keep_completed = config.retention.keep_completed,
        dry_run = config.retention.dry_run,
        "Starting backup scheduler"
    );

    let client = match KubeClient::new(&config.kubernetes) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize Kubernetes client");
            std::process::exit(1);
        }
    };

    let synchronizer = Synchronizer::from_config(client.clone(), client, &config);

    match synchronizer.run().await {
        Ok(summary) => {
            if summary.cleanup.has_failures() {
                tracing::warn!(
                    failed = summary.cleanup.failures.len(),
                    "Some execution requests could not be deleted"
                );
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            std::process::exit(1);
        }
    }
}

/// Export configuration JSON schema to file or stdout
#[cfg(feature = "json-schema")]
fn run_schema_export(output: Option<PathBuf>) {
    let content = match SchedulerConfig::json_schema_string() {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Failed to serialize config schema: {}", e);
            std::process::exit(1);
        }
    };

    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(&path, &content) {
                eprintln!("Failed to write to {}: {}", path.display(), e);
                std::process::exit(1);
            }
            eprintln!("Config JSON schema written to {}", path.display());
        }
        None => {
            println!("{}", content);
        }
    }
}
