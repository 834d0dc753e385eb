mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::store::StoreSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "relsync",
    about = "Sync release artifacts from GitHub and GitLab into a local tree",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: nearest relsync.yaml, then ~/.config/relsync/relsync.yaml)
    #[arg(long, global = true, env = "RELSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Debug logging
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync every configured repo
    Sync,

    /// Install one release without adding it to the config
    #[command(disable_version_flag = true)]
    Get {
        /// source/org/project, e.g. github.com/cli/cli
        repo: String,
        /// Tag to install
        #[arg(long, default_value = "latest")]
        version: String,
        /// Asset file name (template)
        #[arg(long)]
        file: Option<String>,
        /// Download from this URL instead of a release asset (template)
        #[arg(long)]
        url: Option<String>,
        /// Download the asset without unpacking or linking it
        #[arg(long)]
        download_only: bool,
    },

    /// Sync repeatedly until interrupted
    Watch {
        /// Seconds between syncs
        #[arg(long, default_value = "3600")]
        interval: u64,
    },

    /// Remove old versions beyond the retention threshold
    Clean {
        /// Log what would be removed without removing it
        #[arg(long)]
        dry_run: bool,
        /// Record installed versions found on disk before cleaning
        #[arg(long)]
        scan: bool,
        /// Versions to keep per repo (default: `keep` from the config)
        #[arg(long, value_name = "N")]
        keep: Option<usize>,
    },

    /// List installed versions recorded in the version store
    List,

    /// Raw access to the version store
    Store {
        #[command(subcommand)]
        subcommand: StoreSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        match &cli.command {
            Commands::Store { .. } | Commands::List => tracing::Level::WARN,
            _ => tracing::Level::INFO,
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = root::resolve_config(cli.config.as_deref());

    let result = match cli.command {
        Commands::Sync => cmd::sync::run(&config, cli.json),
        Commands::Get {
            repo,
            version,
            file,
            url,
            download_only,
        } => cmd::get::run(
            &config,
            cmd::get::GetArgs {
                repo,
                version,
                file,
                url,
                download_only,
            },
            cli.json,
        ),
        Commands::Watch { interval } => cmd::watch::run(&config, interval, cli.json),
        Commands::Clean {
            dry_run,
            scan,
            keep,
        } => cmd::clean::run(&config, dry_run, scan, keep, cli.json),
        Commands::List => cmd::list::run(&config, cli.json),
        Commands::Store { subcommand } => cmd::store::run(&config, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
