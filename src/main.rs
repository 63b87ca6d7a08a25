mod cli;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    // RUST_LOG > --verbose > warn
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();

    let result = match cli.command {
        Commands::Analyze {
            file,
            rules,
            overrides,
            drop_negative,
            level,
        } => cli::analyze::run(&file, rules, overrides, drop_negative, level),
        Commands::Categorize { description, rules } => cli::categorize::run(&description, rules),
        Commands::Rules { rules } => cli::rules::list(rules),
        Commands::Installments {
            file,
            from,
            rules,
            overrides,
            drop_negative,
            purchase_date,
            months,
        } => cli::installments::run(
            &file,
            from.as_deref(),
            rules,
            overrides,
            drop_negative,
            purchase_date,
            months,
        ),
        Commands::Export {
            file,
            rules,
            overrides,
            write_overrides,
        } => cli::export::run(&file, rules, overrides, write_overrides),
        Commands::Init {
            rules,
            drop_negative,
        } => cli::init::run(rules, drop_negative),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
