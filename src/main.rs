use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use owner_resolution::{
    archive_run, compute_run_hash, load_sales_csv, logging, open_archive, profile_for,
    OutputWriter, PropertyRun, PropertySource, ResolverConfig, RunOutput,
};

#[derive(Parser)]
#[command(name = "owner-resolution")]
#[command(about = "Resolve scraped property owner text into canonical owners and an ownership timeline")]
#[command(version)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a property JSON document into output records
    Resolve {
        /// Property JSON document
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out_dir: PathBuf,
        /// Overrides the id found in the document / file name
        #[arg(long)]
        property_id: Option<String>,
        /// Extra sales (date, price, grantor, grantee)
        #[arg(long)]
        sales_csv: Option<PathBuf>,
        #[command(flatten)]
        settings: Settings,
    },
    /// Resolve a sales CSV (plus optional owner label text) into output records
    Sales {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long)]
        property_id: String,
        /// Current owner label text
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        out_dir: PathBuf,
        #[command(flatten)]
        settings: Settings,
    },
    /// Print the effective vocabulary as JSON (a starting point for --vocabulary files)
    Vocabulary {
        #[command(flatten)]
        settings: Settings,
    },
}

#[derive(clap::Args)]
struct Settings {
    /// Resolver configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
    /// County profile (generic, surname_first); overrides the config file
    #[arg(long)]
    county: Option<String>,
    /// SQLite archive to record the run in
    #[arg(long)]
    db: Option<PathBuf>,
}

impl Settings {
    fn resolver_config(&self) -> Result<ResolverConfig> {
        let mut config = match &self.config {
            Some(path) => ResolverConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => ResolverConfig::default(),
        };
        if let Some(county) = &self.county {
            config.county = county.clone();
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_json);

    match cli.command {
        Commands::Resolve {
            input,
            out_dir,
            property_id,
            sales_csv,
            settings,
        } => {
            let config = settings.resolver_config()?;
            let mut source = PropertySource::from_file(&input, property_id.as_deref())
                .with_context(|| format!("Failed to read property document {}", input.display()))?;

            let mut hash_input = read_for_hash(&input)?;
            if let Some(csv_path) = &sales_csv {
                let sales = load_sales_csv(csv_path)
                    .with_context(|| format!("Failed to read sales CSV {}", csv_path.display()))?;
                info!(sales = sales.len(), "sales loaded from CSV");
                source = source.with_sales(sales);
                hash_input.push_str(&read_for_hash(csv_path)?);
            }

            run_and_write(&source, &config, &out_dir, settings.db.as_deref(), &hash_input)?;
        }
        Commands::Sales {
            csv,
            property_id,
            owner,
            out_dir,
            settings,
        } => {
            let config = settings.resolver_config()?;
            let sales = load_sales_csv(&csv)
                .with_context(|| format!("Failed to read sales CSV {}", csv.display()))?;

            let mut source = PropertySource::new(&property_id).with_sales(sales);
            let mut hash_input = read_for_hash(&csv)?;
            if let Some(text) = &owner {
                source = source.with_owner_text(Some("current"), text);
                hash_input.push_str(text);
            }

            run_and_write(&source, &config, &out_dir, settings.db.as_deref(), &hash_input)?;
        }
        Commands::Vocabulary { settings } => {
            let config = settings.resolver_config()?;
            let profile = profile_for(&config.county)?;
            let mut vocabulary = config.load_vocabulary()?;
            profile.extend_vocabulary(&mut vocabulary);
            println!("{}", serde_json::to_string_pretty(&vocabulary)?);
        }
    }

    Ok(())
}

fn run_and_write(
    source: &PropertySource,
    config: &ResolverConfig,
    out_dir: &Path,
    db: Option<&Path>,
    hash_input: &str,
) -> Result<()> {
    let run = PropertyRun::new(config).context("Failed to build resolver from configuration")?;
    let output = run.execute(source);

    let written = OutputWriter::new(out_dir)
        .write(&output)
        .with_context(|| format!("Failed to write output to {}", out_dir.display()))?;

    if let Some(db_path) = db {
        archive(&output, config, db_path, hash_input)?;
    }

    print_summary(&output, written.len(), out_dir);
    Ok(())
}

fn archive(output: &RunOutput, config: &ResolverConfig, db_path: &Path, hash_input: &str) -> Result<()> {
    let mut conn = open_archive(db_path)
        .with_context(|| format!("Failed to open archive {}", db_path.display()))?;

    // Config is part of the input: a different profile is a different run
    let config_json = serde_json::to_string(config)?;
    let hash = compute_run_hash(&output.property_id, &format!("{}{}", config_json, hash_input));

    if archive_run(&mut conn, output, &hash)? {
        info!(db = %db_path.display(), "run archived");
    } else {
        warn!(db = %db_path.display(), "identical run already archived, skipped");
    }
    Ok(())
}

fn read_for_hash(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn print_summary(output: &RunOutput, files: usize, out_dir: &Path) {
    println!("🏠 Property {}", output.property_id);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✓ Entities: {}", output.entities.len());
    println!("✓ Temporal keys: {}", output.owners_by_date.len());
    println!("✓ Current owners: {}", output.owners_by_date.current().len());
    if !output.invalid_owners.is_empty() {
        println!("⚠️  Invalid owners: {}", output.invalid_owners.len());
    }
    if let Some(report) = &output.sales {
        println!("✓ {}", report.summary());
    }
    println!("✓ Wrote {} files to {}", files, out_dir.display());
}
