use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::categorizer::Categorizer;
use crate::error::{FaturaError, Result};
use crate::models::{CategoryAssignment, Transaction};

/// Manual category corrections, keyed by transaction description.
pub type CategoryOverrides = HashMap<String, CategoryAssignment>;

/// Replace the categories of every transaction whose description has a
/// manual correction. Other rows are left untouched.
pub fn apply_manual_overrides(
    mut transactions: Vec<Transaction>,
    overrides: &CategoryOverrides,
) -> Vec<Transaction> {
    if overrides.is_empty() {
        return transactions;
    }
    let mut applied = 0usize;
    for txn in transactions.iter_mut() {
        if let Some(assignment) = overrides.get(&txn.description) {
            txn.set_categories(assignment.clone());
            applied += 1;
        }
    }
    debug!(applied, overrides = overrides.len(), "applied manual overrides");
    transactions
}

/// Snapshot the categories of a batch as an override map. When a
/// description repeats, the last row wins.
pub fn overrides_from(transactions: &[Transaction]) -> CategoryOverrides {
    transactions
        .iter()
        .map(|t| (t.description.clone(), t.categories()))
        .collect()
}

/// Rule suggestions for the whole batch, then manual corrections on top.
pub fn categorize_batch(
    mut transactions: Vec<Transaction>,
    categorizer: &Categorizer<'_>,
    overrides: &CategoryOverrides,
) -> Vec<Transaction> {
    categorizer.categorize_all(&mut transactions);
    apply_manual_overrides(transactions, overrides)
}

pub fn load_overrides(path: &Path) -> Result<CategoryOverrides> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| FaturaError::Other(format!("invalid overrides file {}: {e}", path.display())))
}

pub fn save_overrides(path: &Path, overrides: &CategoryOverrides) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    // sorted keys keep the file diff-friendly
    let sorted: std::collections::BTreeMap<&String, &CategoryAssignment> = overrides.iter().collect();
    let json = serde_json::to_string_pretty(&sorted).map_err(|e| FaturaError::Other(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::Amount;
    use crate::importer::{ingest, IngestOptions};
    use crate::rules::RuleTable;

    fn txn(description: &str) -> Transaction {
        Transaction::new(None, description, Amount::Value(10.0))
    }

    #[test]
    fn test_override_replaces_only_matching_rows() {
        let mut overrides = CategoryOverrides::new();
        overrides.insert("PADARIA".to_string(), CategoryAssignment::new("Alimentação", Some("Padaria")));
        let result = apply_manual_overrides(vec![txn("PADARIA"), txn("POSTO")], &overrides);
        assert_eq!(result[0].category_l1, "Alimentação");
        assert_eq!(result[0].category_l2.as_deref(), Some("Padaria"));
        assert_eq!(result[1].categories(), CategoryAssignment::uncategorized());
    }

    #[test]
    fn test_override_beats_rule_suggestion() {
        let rules = RuleTable::from_entries([("uber", "Transporte", Some("App"))]);
        let categorizer = Categorizer::new(&rules);
        let mut overrides = CategoryOverrides::new();
        overrides.insert("UBER EATS".to_string(), CategoryAssignment::new("Alimentação", None));
        let batch = categorize_batch(vec![txn("UBER EATS"), txn("UBER TRIP")], &categorizer, &overrides);
        assert_eq!(batch[0].categories(), CategoryAssignment::new("Alimentação", None));
        assert_eq!(batch[1].categories(), CategoryAssignment::new("Transporte", Some("App")));
    }

    #[test]
    fn test_overrides_from_last_row_wins() {
        let mut first = txn("LOJA");
        first.set_categories(CategoryAssignment::new("A", None));
        let mut second = txn("LOJA");
        second.set_categories(CategoryAssignment::new("B", Some("b")));
        let overrides = overrides_from(&[first, second]);
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides["LOJA"], CategoryAssignment::new("B", Some("b")));
    }

    #[test]
    fn test_reapplying_own_categories_is_identity() {
        let content = "data,descricao,valor\n\
                       01/01/2025,IFOOD RESTAURANTE,\"30,00\"\n\
                       02/01/2025,MAGAZINE 02/10,\"100,00\"\n\
                       03/01/2025,DESCONHECIDO,\"5,00\"\n";
        let rules = RuleTable::from_entries([("ifood", "Alimentação", Some("Delivery"))]);
        let categorizer = Categorizer::new(&rules);

        let first = ingest(content.as_bytes(), "f.csv", &IngestOptions::default()).unwrap();
        let first = categorize_batch(first, &categorizer, &CategoryOverrides::new());

        let overrides = overrides_from(&first);
        let second = ingest(content.as_bytes(), "f.csv", &IngestOptions::default()).unwrap();
        let second = categorize_batch(second, &categorizer, &overrides);
        assert_eq!(first, second);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("overrides.json");
        let mut overrides = CategoryOverrides::new();
        overrides.insert("PADARIA".to_string(), CategoryAssignment::new("Alimentação", Some("Padaria")));
        overrides.insert("POSTO".to_string(), CategoryAssignment::new("Transporte", None));
        save_overrides(&path, &overrides).unwrap();
        let loaded = load_overrides(&path).unwrap();
        assert_eq!(loaded, overrides);
    }

    #[test]
    fn test_load_accepts_missing_level2() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overrides.json");
        std::fs::write(&path, r#"{"POSTO": {"level1": "Transporte"}}"#).unwrap();
        let loaded = load_overrides(&path).unwrap();
        assert_eq!(loaded["POSTO"], CategoryAssignment::new("Transporte", None));
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overrides.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(load_overrides(&path), Err(FaturaError::Other(_))));
    }
}
