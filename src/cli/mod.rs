pub mod analyze;
pub mod categorize;
pub mod export;
pub mod init;
pub mod installments;
pub mod rules;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

use fatura::categorizer::Categorizer;
use fatura::importer::{ingest_file, IngestOptions};
use fatura::models::Transaction;
use fatura::reviewer::{categorize_batch, load_overrides, CategoryOverrides};
use fatura::rules::{load_rules, RuleTable};
use fatura::settings::{shellexpand_path, Settings};

#[derive(Parser)]
#[command(
    name = "fatura",
    about = "Credit card statement analyzer: keyword categorization and installment projection."
)]
pub struct Cli {
    /// Log debug detail to stderr (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest a statement, categorize it and print per-category totals.
    Analyze {
        /// Statement export (.xls, .xlsx or .csv)
        file: PathBuf,
        /// Rule file (default: from settings)
        #[arg(long)]
        rules: Option<PathBuf>,
        /// JSON file with manual category corrections
        #[arg(long)]
        overrides: Option<PathBuf>,
        /// Drop refunds and credits (negative amounts)
        #[arg(long)]
        drop_negative: bool,
        /// Category level to total by
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=2))]
        level: u8,
    },
    /// Suggest categories for a single description.
    Categorize {
        description: String,
        #[arg(long)]
        rules: Option<PathBuf>,
    },
    /// List the rule table in match order.
    Rules {
        #[arg(long)]
        rules: Option<PathBuf>,
    },
    /// Show open installment purchases and the monthly projection.
    Installments {
        file: PathBuf,
        /// First projected month: YYYY-MM (default: next month)
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        rules: Option<PathBuf>,
        /// JSON file with manual category corrections
        #[arg(long)]
        overrides: Option<PathBuf>,
        /// Drop refunds and credits (negative amounts)
        #[arg(long)]
        drop_negative: bool,
        /// Treat transaction dates as the original purchase date
        #[arg(long)]
        purchase_date: bool,
        /// Number of months to project (default: from settings)
        #[arg(long)]
        months: Option<u32>,
    },
    /// Write the categorized statement as CSV to stdout.
    Export {
        file: PathBuf,
        #[arg(long)]
        rules: Option<PathBuf>,
        #[arg(long)]
        overrides: Option<PathBuf>,
        /// Save the batch's categories as an overrides file
        #[arg(long = "write-overrides")]
        write_overrides: Option<PathBuf>,
    },
    /// Write ~/.config/fatura/settings.json.
    Init {
        /// Default rule file
        #[arg(long)]
        rules: Option<String>,
        /// Drop negative amounts by default
        #[arg(long)]
        drop_negative: bool,
    },
}

/// Rule table from the `--rules` flag, or the settings default.
pub(crate) fn resolve_rules(flag: Option<PathBuf>, settings: &Settings) -> RuleTable {
    let path = flag.unwrap_or_else(|| shellexpand_path(&settings.rules_path));
    load_rules(&path)
}

/// Ingest, categorize, then apply manual overrides.
pub(crate) fn load_batch(
    file: &Path,
    rules: &RuleTable,
    settings: &Settings,
    overrides: Option<&Path>,
    drop_negative: bool,
) -> anyhow::Result<Vec<Transaction>> {
    let options = IngestOptions {
        drop_negative_amounts: drop_negative || settings.drop_negative_amounts,
    };
    let transactions =
        ingest_file(file, &options).with_context(|| format!("reading {}", file.display()))?;
    let overrides = match overrides {
        Some(path) => load_overrides(path)?,
        None => CategoryOverrides::new(),
    };
    let categorizer = Categorizer::new(rules).with_post_fill(settings.post_fill);
    Ok(categorize_batch(transactions, &categorizer, &overrides))
}
