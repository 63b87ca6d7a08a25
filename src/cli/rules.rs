use std::path::PathBuf;

use comfy_table::{Cell, Table};

use fatura::settings::load_settings;

use super::resolve_rules;

pub fn list(rules: Option<PathBuf>) -> anyhow::Result<()> {
    let settings = load_settings();
    let rules = resolve_rules(rules, &settings);
    if rules.is_empty() {
        println!("No rules loaded.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Keyword", "Category", "Subcategory"]);
    for (idx, rule) in rules.iter().enumerate() {
        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(&rule.keyword),
            Cell::new(&rule.category_l1),
            Cell::new(rule.category_l2.as_deref().unwrap_or("")),
        ]);
    }
    println!("Rules ({})\n{table}", rules.len());
    Ok(())
}
