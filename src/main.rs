//! Constituency CLI - serve the API, import spreadsheets, inspect results

use clap::{Parser, Subcommand};
use constituency::config::{self, AppConfig};
use constituency::election::analytics::ElectionEngine;
use constituency::storage::SqliteStore;
use constituency::{import, ui};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "constituency")]
#[command(version = "0.1.0")]
#[command(about = "Constituency data backend - voter rolls, families and booth-level election analytics")]
#[command(long_about = r#"
Constituency serves a REST API over a local SQLite store, covering:
  • Voter rolls and household (family) linkage
  • Booth-level election analytics
  • Events, visitors, leadership roster and document uploads

Example usage:
  constituency init
  constituency import-results results.csv
  constituency serve --port 4000
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file (overrides config)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Write a default config file
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Replace election results with the rows of a CSV file
    ImportResults {
        csv: PathBuf,

        /// Where rows from failed batches are written
        #[arg(long, default_value = "failed_rows.log")]
        failed_log: PathBuf,
    },

    /// Replace the party leadership roster with the rows of a CSV file
    ImportLeadership {
        csv: PathBuf,

        #[arg(long, default_value = "failed_leadership_rows.log")]
        failed_log: PathBuf,
    },

    /// Party-wise vote totals and shares
    Summary,

    /// Booths won per party
    Winners,

    /// Booths where NTK or IJK reach a vote-share threshold
    Penetration {
        #[arg(short, long, default_value = "10")]
        threshold: f64,
    },

    /// Show record counts
    Stats,

    /// Create a login user
    AddUser {
        username: String,
        password: String,

        #[arg(long, default_value = "admin")]
        role: String,
    },
}

fn open_store(config: &AppConfig) -> anyhow::Result<SqliteStore> {
    config::ensure_db_dir(&config.database)?;
    Ok(SqliteStore::open(&config.database)?)
}

fn run_import(
    config: &AppConfig,
    csv: &Path,
    failed_log: &Path,
    label: &str,
    load: impl FnOnce(&SqliteStore, &Path, &Path, &mut dyn FnMut(usize)) -> constituency::Result<import::ImportReport>,
) -> anyhow::Result<()> {
    let store = open_store(config)?;
    ui::header(&format!("{} from {}", label, csv.display()));

    let started = Instant::now();
    let progress = ui::ImportProgress::new(label);
    let report = load(&store, csv, failed_log, &mut |rows| progress.inc(rows));
    progress.finish();

    let report = report?;
    ui::import_report(&report);
    ui::timing(started.elapsed());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins when set
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let mut config = config::load_config(Some(&config_path))?.apply_env();
    if let Some(database) = cli.database {
        config.database = database;
    }

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            ui::status(ui::Icons::DATABASE, "Database", &config.database.display().to_string());
            ui::status(ui::Icons::FILE, "Uploads", &config.upload_dir.display().to_string());

            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(constituency::server::start_server(config))?;
        }

        Commands::Init { force } => {
            config::write_config(&config_path, &AppConfig::default(), force)?;
            let store = open_store(&config)?;
            drop(store);
            ui::success(&format!("Wrote {}", config_path.display()));
            ui::status(ui::Icons::DATABASE, "Database", &config.database.display().to_string());
        }

        Commands::ImportResults { csv, failed_log } => {
            run_import(&config, &csv, &failed_log, "Importing election results", |store, csv, log, on_batch| {
                import::import_election_results(store, csv, log, on_batch)
            })?;
        }

        Commands::ImportLeadership { csv, failed_log } => {
            run_import(&config, &csv, &failed_log, "Importing party leadership", |store, csv, log, on_batch| {
                import::import_party_leadership(store, csv, log, on_batch)
            })?;
        }

        Commands::Summary => {
            let store = open_store(&config)?;
            let summary = ElectionEngine::new(&store).party_summary()?;

            ui::section(&format!("{} Party Summary", ui::Icons::BALLOT));
            println!("{}", ui::party_summary_table(&summary));
            ui::summary_row("Total valid votes:", &summary.total_valid_votes.to_string());
        }

        Commands::Winners => {
            let store = open_store(&config)?;
            let report = ElectionEngine::new(&store).winners()?;

            ui::section(&format!("{} Booths Won", ui::Icons::TROPHY));
            if report.per_booth.is_empty() {
                ui::warn("No election results imported yet.");
            } else {
                println!("{}", ui::winner_counts_table(&report));
                ui::summary_row("Booths:", &report.per_booth.len().to_string());
            }
        }

        Commands::Penetration { threshold } => {
            let store = open_store(&config)?;
            let report = ElectionEngine::new(&store).penetration(Some(threshold))?;

            ui::section(&format!("Small-party penetration (>= {}%)", threshold));
            if report.booths.is_empty() {
                println!("{}", ui::dim("No booths at or above the threshold."));
            } else {
                println!("{}", ui::penetration_table(&report));
            }
        }

        Commands::Stats => {
            let store = open_store(&config)?;
            let stats = store.stats()?;

            ui::section(&format!("{} Constituency Statistics ({})", ui::Icons::STATS, config.database.display()));
            let mut table = ui::TableBuilder::new();
            table
                .add_row("Voters", stats.voters)
                .add_row("Linked voters", stats.linked_voters)
                .add_row("Families", stats.families)
                .add_row("Booth results", stats.booth_results)
                .add_row("Leaders", stats.leaders);
            println!("{}", table.build());
        }

        Commands::AddUser { username, password, role } => {
            let store = open_store(&config)?;
            match store.add_user(&username, &password, &role) {
                Ok(id) => ui::success(&format!("{} Created user {} (id {})", ui::Icons::PERSON, username, id)),
                Err(e) if e.is_unique_violation() => {
                    ui::error(&format!("User {} already exists", username));
                    std::process::exit(1);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    Ok(())
}
