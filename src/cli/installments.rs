use std::path::{Path, PathBuf};

use colored::Colorize;
use comfy_table::{Cell, Table};

use fatura::fmt::money;
use fatura::installments::{installment_entries, total_remaining_installments, InstallmentDating, Projector};
use fatura::month::YearMonth;
use fatura::settings::load_settings;

use super::{load_batch, resolve_rules};

pub fn run(
    file: &Path,
    from: Option<&str>,
    rules: Option<PathBuf>,
    overrides: Option<PathBuf>,
    drop_negative: bool,
    purchase_date: bool,
    months: Option<u32>,
) -> anyhow::Result<()> {
    let start = match from {
        Some(m) => m.parse::<YearMonth>()?,
        None => YearMonth::current().next(),
    };
    let settings = load_settings();
    let rules = resolve_rules(rules, &settings);
    let transactions = load_batch(file, &rules, &settings, overrides.as_deref(), drop_negative)?;

    let entries = installment_entries(&transactions);
    if entries.is_empty() {
        println!("No installment purchases found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Date",
        "Description",
        "Amount",
        "Installment",
        "Per installment",
        "Remaining",
    ]);
    for e in &entries {
        table.add_row(vec![
            Cell::new(e.date.map(|d| d.format("%d/%m/%Y").to_string()).unwrap_or_default()),
            Cell::new(&e.description),
            Cell::new(money(e.amount)),
            Cell::new(format!("{}/{}", e.current_installment, e.total_installments)),
            Cell::new(money(e.amount_per_installment)),
            Cell::new(money(e.remaining_amount)),
        ]);
    }
    println!("Installment purchases\n{table}");

    let dating = if purchase_date {
        InstallmentDating::PurchaseDate
    } else {
        settings.installment_dating
    };
    let projector = Projector::new(dating, Some(months.unwrap_or(settings.projection_months)));
    let projection = projector.project(&transactions, start);

    let mut table = Table::new();
    table.set_header(vec!["Month", "Projected"]);
    for (month, total) in &projection {
        table.add_row(vec![Cell::new(month), Cell::new(money(*total))]);
    }
    println!("\nProjection from {start}\n{table}");
    println!(
        "{} {}",
        "Total remaining:".bold(),
        money(total_remaining_installments(&transactions))
    );
    Ok(())
}
