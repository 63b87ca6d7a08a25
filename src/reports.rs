use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;

use crate::models::{Transaction, UNCATEGORIZED};
use crate::rules::RuleTable;

/// Level-1 categories offered even when no rule or row uses them.
pub const BASE_CATEGORIES_L1: &[&str] = &[
    "Uncategorized",
    "Alimentação",
    "Transporte",
    "Moradia",
    "Lazer",
    "Assinaturas",
    "Compras Online",
    "Vestuário/Compras",
    "Saúde",
    "Educação",
    "Mercado",
    "Pet",
    "Serviços",
    "Viagem",
    "Presentes",
    "Installment",
    "Outros",
];

pub const BASE_CATEGORIES_L2: &[&str] = &["General", "Não Aplicável", "Compra Parcelada"];

/// Label for rows without a level-2 category in level-2 totals.
pub const MISSING_L2_LABEL: &str = "N/A or General";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CategoryLevel {
    #[default]
    Level1,
    Level2,
}

/// Category selection for the summaries. An empty list selects everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryFilter {
    pub level1: Vec<String>,
    pub level2: Vec<String>,
}

impl CategoryFilter {
    pub fn accepts(&self, txn: &Transaction) -> bool {
        let l1_ok = self.level1.is_empty() || self.level1.iter().any(|c| *c == txn.category_l1);
        let l2_ok = self.level2.is_empty()
            || txn
                .category_l2
                .as_ref()
                .is_some_and(|l2| self.level2.iter().any(|c| c == l2));
        l1_ok && l2_ok
    }
}

// ---------------------------------------------------------------------------
// Totals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub name: String,
    pub total: f64,
    pub count: usize,
}

/// Sum of every parseable amount in the batch.
pub fn summary_total(transactions: &[Transaction]) -> f64 {
    transactions.iter().filter_map(|t| t.amount.value()).sum()
}

/// Totals per category at `level`, largest first. Uncategorized rows and
/// rows without a parseable amount are left out.
pub fn category_totals(
    transactions: &[Transaction],
    level: CategoryLevel,
    filter: &CategoryFilter,
) -> Vec<CategoryTotal> {
    let mut totals: HashMap<&str, (f64, usize)> = HashMap::new();
    for txn in transactions {
        if txn.category_l1 == UNCATEGORIZED || !filter.accepts(txn) {
            continue;
        }
        let Some(amount) = txn.amount.value() else {
            continue;
        };
        let name = match level {
            CategoryLevel::Level1 => txn.category_l1.as_str(),
            CategoryLevel::Level2 => txn.category_l2.as_deref().unwrap_or(MISSING_L2_LABEL),
        };
        let entry = totals.entry(name).or_insert((0.0, 0));
        entry.0 += amount;
        entry.1 += 1;
    }
    sorted_totals(totals)
}

/// Level-2 breakdown inside one level-1 category. Rows without a level-2
/// are skipped.
pub fn subcategory_totals(transactions: &[Transaction], level1: &str) -> Vec<CategoryTotal> {
    let mut totals: HashMap<&str, (f64, usize)> = HashMap::new();
    for txn in transactions.iter().filter(|t| t.category_l1 == level1) {
        let (Some(l2), Some(amount)) = (txn.category_l2.as_deref(), txn.amount.value()) else {
            continue;
        };
        let entry = totals.entry(l2).or_insert((0.0, 0));
        entry.0 += amount;
        entry.1 += 1;
    }
    sorted_totals(totals)
}

fn sorted_totals(totals: HashMap<&str, (f64, usize)>) -> Vec<CategoryTotal> {
    let mut out: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(name, (total, count))| CategoryTotal {
            name: name.to_string(),
            total,
            count,
        })
        .collect();
    out.sort_by(|a, b| b.total.total_cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    out
}

// ---------------------------------------------------------------------------
// Time series
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub total: f64,
    pub cumulative: f64,
}

/// Spending per day with a running total, over dated rows inside the
/// inclusive `from..=to` range.
pub fn daily_series(
    transactions: &[Transaction],
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Vec<DailyPoint> {
    let mut per_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for txn in transactions {
        let (Some(date), Some(amount)) = (txn.date, txn.amount.value()) else {
            continue;
        };
        if from.is_some_and(|f| date < f) || to.is_some_and(|t| date > t) {
            continue;
        }
        *per_day.entry(date).or_insert(0.0) += amount;
    }
    let mut cumulative = 0.0;
    per_day
        .into_iter()
        .map(|(date, total)| {
            cumulative += total;
            DailyPoint {
                date,
                total,
                cumulative,
            }
        })
        .collect()
}

/// The `n` largest transactions by amount.
pub fn largest(transactions: &[Transaction], n: usize) -> Vec<&Transaction> {
    let mut ranked: Vec<(f64, &Transaction)> = transactions
        .iter()
        .filter_map(|t| t.amount.value().map(|v| (v, t)))
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
    ranked.into_iter().take(n).map(|(_, t)| t).collect()
}

// ---------------------------------------------------------------------------
// Vocabulary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryVocabulary {
    pub level1: Vec<String>,
    pub level2: Vec<String>,
}

/// Every category name a reviewer may pick: the base lists plus whatever the
/// rules and the current batch use.
pub fn category_vocabulary(rules: &RuleTable, transactions: &[Transaction]) -> CategoryVocabulary {
    let mut level1: BTreeSet<String> = BASE_CATEGORIES_L1.iter().map(|s| s.to_string()).collect();
    let mut level2: BTreeSet<String> = BASE_CATEGORIES_L2.iter().map(|s| s.to_string()).collect();
    level1.extend(rules.categories_l1());
    level2.extend(rules.categories_l2());
    for txn in transactions {
        level1.insert(txn.category_l1.clone());
        if let Some(l2) = &txn.category_l2 {
            level2.insert(l2.clone());
        }
    }
    CategoryVocabulary {
        level1: level1.into_iter().collect(),
        level2: level2.into_iter().collect(),
    }
}
