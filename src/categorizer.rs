use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{CategoryAssignment, Transaction, GENERAL, INSTALLMENT, UNCATEGORIZED};
use crate::rules::RuleTable;

/// Standalone `X/Y` installment marker, e.g. `05/10`.
pub(crate) fn installment_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})\b").expect("valid installment regex"))
}

pub fn has_installment_marker(description: &str) -> bool {
    installment_marker().is_match(description)
}

/// Which categories receive the `General` level-2 default when nothing else
/// set one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostFill {
    /// Every level-1 except `Uncategorized`.
    #[default]
    AllCategorized,
    /// Every level-1 except `Uncategorized` and `Installment`.
    SkipInstallment,
}

pub struct Categorizer<'a> {
    rules: &'a RuleTable,
    post_fill: PostFill,
}

impl<'a> Categorizer<'a> {
    pub fn new(rules: &'a RuleTable) -> Self {
        Self {
            rules,
            post_fill: PostFill::default(),
        }
    }

    pub fn with_post_fill(mut self, post_fill: PostFill) -> Self {
        self.post_fill = post_fill;
        self
    }

    /// Suggest categories for one description.
    ///
    /// The installment marker and the keyword rules are independent signals:
    /// the marker sets level-1 to `Installment`, then the first matching rule
    /// (longest keyword first) overwrites level-1 and, if it has one, sets
    /// level-2. A rule whose level-1 is not `Installment` therefore replaces
    /// the installment classification.
    pub fn categorize(&self, description: &str) -> CategoryAssignment {
        let mut level1 = UNCATEGORIZED.to_string();
        let mut level2: Option<String> = None;

        if has_installment_marker(description) {
            level1 = INSTALLMENT.to_string();
        }

        let lowered = description.to_lowercase();
        if let Some(rule) = self.rules.iter().find(|rule| rule.matches(&lowered)) {
            level1 = rule.category_l1.clone();
            if let Some(l2) = &rule.category_l2 {
                level2 = Some(l2.clone());
            }
        }

        if level2.is_none() && self.fills(&level1) {
            level2 = Some(GENERAL.to_string());
        }

        CategoryAssignment { level1, level2 }
    }

    /// Overwrite the categories of every transaction with rule suggestions.
    pub fn categorize_all(&self, transactions: &mut [Transaction]) {
        for txn in transactions.iter_mut() {
            let suggested = self.categorize(&txn.description);
            txn.set_categories(suggested);
        }
    }

    fn fills(&self, level1: &str) -> bool {
        match self.post_fill {
            PostFill::AllCategorized => level1 != UNCATEGORIZED,
            PostFill::SkipInstallment => level1 != UNCATEGORIZED && level1 != INSTALLMENT,
        }
    }
}

/// Categorize with the default post-fill policy.
pub fn categorize(description: &str, rules: &RuleTable) -> CategoryAssignment {
    Categorizer::new(rules).categorize(description)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::Amount;

    fn rules(entries: &[(&str, &str, Option<&str>)]) -> RuleTable {
        RuleTable::from_entries(entries.iter().copied())
    }

    #[test]
    fn test_no_rules_no_marker() {
        let result = categorize("PADARIA DO ZE", &RuleTable::new());
        assert_eq!(result, CategoryAssignment::uncategorized());
    }

    #[test]
    fn test_longest_keyword_wins() {
        let table = rules(&[("uber", "A", None), ("uber eats", "B", Some("Food"))]);
        assert_eq!(categorize("UBER EATS 12345", &table), CategoryAssignment::new("B", Some("Food")));
        assert_eq!(categorize("UBER TRIP", &table), CategoryAssignment::new("A", Some("General")));
    }

    #[test]
    fn test_installment_without_rule() {
        let result = categorize("PARCELA COMPRA 05/10", &RuleTable::new());
        assert_eq!(result, CategoryAssignment::new("Installment", Some("General")));
    }

    #[test]
    fn test_installment_skip_post_fill() {
        let table = RuleTable::new();
        let categorizer = Categorizer::new(&table).with_post_fill(PostFill::SkipInstallment);
        assert_eq!(
            categorizer.categorize("PARCELA COMPRA 05/10"),
            CategoryAssignment::new("Installment", None)
        );
        let table = rules(&[("mercado", "Mercado", None)]);
        let categorizer = Categorizer::new(&table).with_post_fill(PostFill::SkipInstallment);
        assert_eq!(
            categorizer.categorize("MERCADO CENTRAL"),
            CategoryAssignment::new("Mercado", Some("General"))
        );
    }

    #[test]
    fn test_rule_refines_installment_level2() {
        let table = rules(&[("magazine", "Installment", Some("Eletrônicos"))]);
        assert_eq!(
            categorize("MAGAZINE LUIZA 03/12", &table),
            CategoryAssignment::new("Installment", Some("Eletrônicos"))
        );
    }

    #[test]
    fn test_rule_overrides_installment_level1() {
        let table = rules(&[("netshoes", "Vestuário", Some("Calçados"))]);
        assert_eq!(
            categorize("NETSHOES 02/03", &table),
            CategoryAssignment::new("Vestuário", Some("Calçados"))
        );
        let table = rules(&[("netshoes", "Vestuário", None)]);
        assert_eq!(
            categorize("NETSHOES 02/03", &table),
            CategoryAssignment::new("Vestuário", Some("General"))
        );
    }

    #[test]
    fn test_marker_needs_word_boundaries() {
        assert!(has_installment_marker("LOJA 1/3"));
        assert!(has_installment_marker("LOJA 12/12 SP"));
        assert!(!has_installment_marker("LOJA 123/4"));
        assert!(!has_installment_marker("REF 2025/01"));
        assert!(!has_installment_marker("LOJAS AMERICANAS"));
    }

    #[test]
    fn test_substring_match_without_boundary() {
        let table = rules(&[("posto", "Transporte", Some("Combustível"))]);
        assert_eq!(
            categorize("AUTOPOSTO SHELL", &table),
            CategoryAssignment::new("Transporte", Some("Combustível"))
        );
    }

    #[test]
    fn test_first_match_stops() {
        let table = rules(&[("farmacia", "Saúde", None), ("drogasil", "Saúde", Some("Farmácia"))]);
        // both keywords have the same length, load order decides
        assert_eq!(
            categorize("DROGASIL FARMACIA", &table),
            CategoryAssignment::new("Saúde", Some("General"))
        );
    }

    #[test]
    fn test_deterministic() {
        let table = rules(&[("uber", "A", None), ("eats", "B", Some("Food"))]);
        let first = categorize("UBER EATS 01/02", &table);
        for _ in 0..10 {
            assert_eq!(categorize("UBER EATS 01/02", &table), first);
        }
    }

    #[test]
    fn test_categorize_all() {
        let table = rules(&[("ifood", "Alimentação", Some("Delivery"))]);
        let mut txns = vec![
            Transaction::new(None, "IFOOD *RESTAURANTE", Amount::Value(30.0)),
            Transaction::new(None, "LOJA X 01/04", Amount::Value(100.0)),
        ];
        Categorizer::new(&table).categorize_all(&mut txns);
        assert_eq!(txns[0].category_l1, "Alimentação");
        assert_eq!(txns[0].category_l2.as_deref(), Some("Delivery"));
        assert_eq!(txns[1].category_l1, "Installment");
    }
}
