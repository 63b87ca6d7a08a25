use std::path::{Path, PathBuf};

use colored::Colorize;
use comfy_table::{Cell, Table};

use fatura::fmt::{amount, money};
use fatura::reports::{self, CategoryFilter, CategoryLevel};
use fatura::settings::load_settings;

use super::{load_batch, resolve_rules};

pub fn run(
    file: &Path,
    rules: Option<PathBuf>,
    overrides: Option<PathBuf>,
    drop_negative: bool,
    level: u8,
) -> anyhow::Result<()> {
    let settings = load_settings();
    let rules = resolve_rules(rules, &settings);
    let transactions = load_batch(file, &rules, &settings, overrides.as_deref(), drop_negative)?;

    let mut table = Table::new();
    table.set_header(vec!["Date", "Description", "Amount", "Category", "Subcategory"]);
    for t in &transactions {
        table.add_row(vec![
            Cell::new(t.date.map(|d| d.format("%d/%m/%Y").to_string()).unwrap_or_default()),
            Cell::new(&t.description),
            Cell::new(amount(t.amount)),
            Cell::new(&t.category_l1),
            Cell::new(t.category_l2.as_deref().unwrap_or("")),
        ]);
    }
    println!("Transactions ({})\n{table}", transactions.len());

    let level = if level == 2 {
        CategoryLevel::Level2
    } else {
        CategoryLevel::Level1
    };
    let totals = reports::category_totals(&transactions, level, &CategoryFilter::default());
    let mut table = Table::new();
    table.set_header(vec!["Category", "Count", "Amount"]);
    for item in &totals {
        table.add_row(vec![
            Cell::new(&item.name),
            Cell::new(item.count),
            Cell::new(money(item.total)),
        ]);
    }
    println!("\nBy category\n{table}");

    let uncategorized = transactions
        .iter()
        .filter(|t| t.category_l1 == fatura::models::UNCATEGORIZED)
        .count();
    if uncategorized > 0 {
        println!("{}", format!("{uncategorized} transaction(s) uncategorized").yellow());
    }
    println!(
        "{} {}",
        "Total:".bold(),
        money(reports::summary_total(&transactions))
    );
    Ok(())
}
