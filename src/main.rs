use anyhow::{Context, Result};
use candidate_directory::config::{ImportOptions, UpstreamConfig};
use candidate_directory::db::{self, CandidateFilter};
use candidate_directory::entities::{seed_reference_districts, ElectoralDistrict};
use candidate_directory::fetch::{self, UpstreamClient};
use candidate_directory::importer::{import_file, import_value, ImportOutcome};
use candidate_directory::{export, report, SourceShape};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use rusqlite::Connection;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Electoral candidate directory: import, scrape and inspect
#[derive(Parser, Debug)]
#[command(name = "candidate-directory")]
#[command(version)]
struct Args {
    /// SQLite database file
    #[arg(long, env = "CANDIDATES_DB", default_value = "candidates.db", global = true)]
    db: PathBuf,

    /// Base URL of the electoral authority API
    #[arg(long, env = "JNE_API_BASE_URL", global = true)]
    api_base_url: Option<String>,

    /// API token (sent as oToken when present)
    #[arg(long, env = "JNE_AUTH_TOKEN", global = true, hide_env_values = true)]
    auth_token: Option<String>,

    #[arg(long, env = "JNE_USER_ID", global = true)]
    user_id: Option<String>,

    /// Electoral process id
    #[arg(long, env = "JNE_PROCESS_ID", default_value_t = 124, global = true)]
    process_id: i64,

    /// Pause between consecutive upstream requests, in seconds
    #[arg(long, env = "SCRAPE_DELAY_SECS", default_value_t = 2, global = true)]
    delay_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the schema and load the reference electoral districts
    Seed,

    /// Import a JSON document (candidate list, organization catalog or scraped file)
    Import {
        file: PathBuf,

        #[arg(long, value_enum, default_value = "auto")]
        shape: ShapeArg,

        /// Match candidates to districts by department name (flat lists)
        #[arg(long)]
        match_geography: bool,

        /// Position type for records that carry none
        #[arg(long)]
        position_type: Option<String>,

        /// Errors tolerated before exiting with a failure status
        #[arg(long, default_value_t = 0)]
        max_errors: usize,

        /// Number of error details to print
        #[arg(long, default_value_t = 10)]
        show_errors: usize,
    },

    /// Fetch candidates from the upstream API
    Scrape {
        #[command(subcommand)]
        target: ScrapeTarget,
    },

    /// Print database totals and breakdowns
    Status,

    /// Write the candidate listing as CSV
    Export {
        #[arg(long)]
        position_type: Option<String>,

        /// Organization code
        #[arg(long)]
        organization: Option<String>,

        /// District code, or "nacional" for candidates without district
        #[arg(long)]
        district: Option<String>,

        /// Substring of a name or document number
        #[arg(long)]
        search: Option<String>,

        /// Include candidates that are not INSCRITO/ADMITIDO
        #[arg(long)]
        all: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum ScrapeTarget {
    /// Deputies, one request per department
    Deputies {
        /// Only these district codes (comma-separated)
        #[arg(long, value_delimiter = ',')]
        districts: Vec<String>,

        #[command(flatten)]
        common: ScrapeArgs,
    },

    /// Senators, single national list and multiple-district list
    Senators {
        #[command(flatten)]
        common: ScrapeArgs,
    },
}

#[derive(clap::Args, Debug)]
struct ScrapeArgs {
    /// Output JSON file (default: data/<kind>_completo_<timestamp>.json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Do not write the scraped document to disk
    #[arg(long)]
    no_save: bool,

    /// Import the scraped document right away
    #[arg(long)]
    import: bool,

    /// Back the database up here before importing
    #[arg(long)]
    backup_dir: Option<PathBuf>,

    #[arg(long, default_value_t = 0)]
    max_errors: usize,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ShapeArg {
    Auto,
    Flat,
    Organizations,
    Districts,
    Batches,
}

impl ShapeArg {
    fn forced(self) -> Option<SourceShape> {
        match self {
            ShapeArg::Auto => None,
            ShapeArg::Flat => Some(SourceShape::FlatList),
            ShapeArg::Organizations => Some(SourceShape::OrganizationCatalog),
            ShapeArg::Districts => Some(SourceShape::GroupedByDistrict),
            ShapeArg::Batches => Some(SourceShape::GroupedByBatch),
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(err) => {
            eprintln!("❌ {:#}", err);
            process::exit(1);
        }
    }
}

/// Ok(false) = completed, but the run counts as failed
fn run(args: Args) -> Result<bool> {
    let upstream = upstream_config(&args);
    let conn = db::open(&args.db)?;

    match args.command {
        Command::Seed => {
            println!("🔧 Database ready: {}", args.db.display());
            let summary = seed_reference_districts(&conn);
            report::print_seed_summary(&summary);
            Ok(summary.errors.is_empty())
        }

        Command::Import {
            file,
            shape,
            match_geography,
            position_type,
            max_errors,
            show_errors,
        } => {
            let options = ImportOptions {
                position_type,
                match_geography,
                max_errors,
                show_errors,
            };
            println!("📂 Importing {}...", file.display());
            let outcome = import_file(&conn, &file, shape.forced(), &options)?;
            Ok(finish_import(&outcome, &options))
        }

        Command::Scrape { target } => run_scrape(&conn, &args.db, upstream, target),

        Command::Status => {
            report::print_status(&conn)?;
            Ok(true)
        }

        Command::Export {
            position_type,
            organization,
            district,
            search,
            all,
            output,
        } => {
            let filter = CandidateFilter {
                position_type,
                organization_code: organization,
                district,
                search,
                include_inactive: all,
            };
            match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    let count = export::write_candidates_csv(&conn, &filter, file)?;
                    println!("📤 Exported {} candidates to {}", count, path.display());
                }
                None => {
                    export::write_candidates_csv(&conn, &filter, io::stdout().lock())?;
                }
            }
            Ok(true)
        }
    }
}

fn upstream_config(args: &Args) -> UpstreamConfig {
    let mut config = UpstreamConfig {
        process_id: args.process_id,
        auth_token: args.auth_token.clone(),
        user_id: args.user_id.clone(),
        delay: Duration::from_secs(args.delay_secs),
        ..Default::default()
    };
    if let Some(base_url) = &args.api_base_url {
        config.base_url = base_url.clone();
    }
    config
}

fn finish_import(outcome: &ImportOutcome, options: &ImportOptions) -> bool {
    report::print_import_summary(outcome, options.show_errors);
    let ok = outcome.summary.is_success(options.max_errors);
    if !ok {
        println!(
            "❌ {} errors (tolerated: {})",
            outcome.summary.errors.len(),
            options.max_errors
        );
    }
    ok
}

fn run_scrape(
    conn: &Connection,
    db_path: &Path,
    upstream: UpstreamConfig,
    target: ScrapeTarget,
) -> Result<bool> {
    let mut client = UpstreamClient::new(upstream)?;
    println!("🔍 Using {}", client.config().endpoint());

    let (value, stats, title, kind, common) = match target {
        ScrapeTarget::Deputies { districts, common } => {
            let mut departments = ElectoralDistrict::departments(conn)?;
            if departments.is_empty() {
                println!("🗺️  No districts in database, seeding reference list...");
                report::print_seed_summary(&seed_reference_districts(conn));
                departments = ElectoralDistrict::departments(conn)?;
            }
            if !districts.is_empty() {
                departments.retain(|d| districts.iter().any(|code| code.eq_ignore_ascii_case(&d.code)));
                if departments.is_empty() {
                    anyhow::bail!("None of the requested districts exist: {}", districts.join(", "));
                }
            }
            println!("📍 Scraping deputies for {} districts...", departments.len());

            let document = fetch::scrape_deputies(&mut client, &departments);
            let stats = document.stats();
            (serde_json::to_value(&document)?, stats, "Deputies", "diputados", common)
        }
        ScrapeTarget::Senators { common } => {
            println!("📍 Scraping senators...");
            let document = fetch::scrape_senators(&mut client);
            let stats = document.stats(client.request_count());
            (serde_json::to_value(&document)?, stats, "Senators", "senadores", common)
        }
    };

    let saved_to = if common.no_save {
        None
    } else {
        let path = common.output.clone().unwrap_or_else(|| {
            PathBuf::from("data").join(format!(
                "{}_completo_{}.json",
                kind,
                Local::now().format("%Y%m%d_%H%M%S")
            ))
        });
        fetch::save_document(&value, &path)?;
        Some(path)
    };
    report::print_scrape_summary(
        title,
        &stats,
        saved_to.as_ref().map(|p| p.display().to_string()).as_deref(),
    );

    if !common.import {
        return Ok(true);
    }

    if let Some(dir) = &common.backup_dir {
        let stem = db_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("candidates");
        let target = dir.join(format!("{}_backup_{}.sqlite3", stem, Local::now().format("%Y%m%d_%H%M%S")));
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        db::backup_to(conn, &target)?;
        println!("💾 Backup written to {}", target.display());
    }

    let options = ImportOptions {
        max_errors: common.max_errors,
        ..Default::default()
    };
    let outcome = match &saved_to {
        Some(path) => import_file(conn, path, None, &options)?,
        None => import_value(conn, &value, &format!("scrape:{}", kind), None, &options)?,
    };
    Ok(finish_import(&outcome, &options))
}
