use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use sqlstage::commands::{self, RunSelection, SummaryFormat};
use sqlstage::config::{self, Config, ConfigInput, DatabaseArgs, MigrationsArgs};
use sqlstage::constants::CONFIG_FILENAME;
use sqlstage::output::CommandKind;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(long, default_value = CONFIG_FILENAME, global = true)]
    config_file: String,

    /// Enable verbose output (info level)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress all non-essential output (error level only)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Enable debug output (debug level)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
struct RunArgs {
    /// Stages to run (defaults to cli.stages, or cli.refresh_stages for refresh)
    stages: Vec<String>,

    /// Only run the migration with this name
    #[arg(long, short = 'n')]
    name: Option<String>,

    /// Skip migrations with this name (repeatable)
    #[arg(long)]
    skip: Vec<String>,

    #[command(flatten)]
    database_args: DatabaseArgs,

    #[command(flatten)]
    migrations_args: MigrationsArgs,
}

impl RunArgs {
    fn selection(&self) -> RunSelection {
        RunSelection {
            stages: self.stages.clone(),
            name: self.name.clone(),
            skip: self.skip.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create the ledger table if it does not exist
    Init {
        #[command(flatten)]
        database_args: DatabaseArgs,

        #[command(flatten)]
        migrations_args: MigrationsArgs,
    },

    /// Apply pending migrations for the given stages
    Up(RunArgs),

    /// Roll back applied migrations for the given stages
    Down(RunArgs),

    /// Roll back and reapply migrations for the given stages
    Refresh(RunArgs),

    /// Show applied migrations
    Summary {
        /// Only show this stage
        #[arg(long)]
        stage: Option<String>,

        #[arg(long, value_enum, default_value_t = SummaryFormat::Human)]
        format: SummaryFormat,

        #[command(flatten)]
        database_args: DatabaseArgs,

        #[command(flatten)]
        migrations_args: MigrationsArgs,
    },

    /// Create a new migration file
    New {
        /// Migration name, optionally prefixed with a subdirectory (`tenant/add users`)
        name: Option<String>,

        /// Stage to scaffold (repeatable, defaults to cli.stages)
        #[arg(long)]
        stage: Vec<String>,

        #[command(flatten)]
        migrations_args: MigrationsArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    initialize_logging(&cli);
    tokio::select! {
        result = run_main(cli) => result,
        _ = wait_for_shutdown_signal() => {
            info!("Received shutdown signal, cleaning up...");
            Ok(())
        }
    }
}

async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn initialize_logging(cli: &Cli) {
    let level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(level)
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config(
    file_config: ConfigInput,
    database_args: Option<&DatabaseArgs>,
    migrations_args: &MigrationsArgs,
) -> Result<Config> {
    let cli_config = ConfigInput {
        database: database_args.map(|args| args.clone().into()),
        migrations: Some(migrations_args.clone().into()),
        cli: None,
    };

    config::ConfigBuilder::new()
        .with_file(file_config)
        .with_cli_args(cli_config)
        .resolve()
}

async fn run_main(cli: Cli) -> Result<()> {
    let (file_config, root_dir): (ConfigInput, PathBuf) = config::load_config(&cli.config_file)?;

    match &cli.command {
        Commands::Init {
            database_args,
            migrations_args,
        } => {
            let config = resolve_config(file_config, Some(database_args), migrations_args)?;
            let migrator = commands::connect_migrator(&config, &root_dir).await?;
            commands::cmd_migrate_init(&migrator).await
        }
        Commands::Up(args) | Commands::Down(args) | Commands::Refresh(args) => {
            let kind = match &cli.command {
                Commands::Up(_) => CommandKind::Up,
                Commands::Down(_) => CommandKind::Down,
                _ => CommandKind::Refresh,
            };
            let config = resolve_config(
                file_config,
                Some(&args.database_args),
                &args.migrations_args,
            )?;

            // Fail on a missing stage before touching the database
            let selection = args.selection();
            commands::migrate::run::resolve_stages(kind, &selection, &config)?;

            let migrator = commands::connect_migrator(&config, &root_dir).await?;
            commands::cmd_migrate_run(&migrator, &config, kind, &selection).await?;
            Ok(())
        }
        Commands::Summary {
            stage,
            format,
            database_args,
            migrations_args,
        } => {
            let config = resolve_config(file_config, Some(database_args), migrations_args)?;
            let migrator = commands::connect_migrator(&config, &root_dir).await?;
            commands::cmd_migrate_summary(&migrator, stage.as_deref(), *format).await?;
            Ok(())
        }
        Commands::New {
            name,
            stage,
            migrations_args,
        } => {
            let config = resolve_config(file_config, None, migrations_args)?;
            commands::cmd_migrate_new(&config, &root_dir, name.as_deref(), stage)?;
            Ok(())
        }
    }
}
