use std::path::{Path, PathBuf};

use anyhow::Context;

use fatura::reviewer::{overrides_from, save_overrides};
use fatura::settings::load_settings;

use super::{load_batch, resolve_rules};

pub fn run(
    file: &Path,
    rules: Option<PathBuf>,
    overrides: Option<PathBuf>,
    write_overrides: Option<PathBuf>,
) -> anyhow::Result<()> {
    let settings = load_settings();
    let rules = resolve_rules(rules, &settings);
    let transactions = load_batch(file, &rules, &settings, overrides.as_deref(), false)?;

    let mut wtr = csv::Writer::from_writer(std::io::stdout().lock());
    wtr.write_record(["date", "description", "amount", "category_l1", "category_l2"])?;
    for t in &transactions {
        wtr.write_record([
            t.date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
            t.description.clone(),
            t.amount.to_string(),
            t.category_l1.clone(),
            t.category_l2.clone().unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;

    if let Some(path) = write_overrides {
        save_overrides(&path, &overrides_from(&transactions))
            .with_context(|| format!("writing {}", path.display()))?;
        eprintln!("Wrote {}", path.display());
    }
    Ok(())
}
