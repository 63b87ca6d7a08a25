use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::categorizer::installment_marker;
use crate::models::{Transaction, INSTALLMENT};
use crate::month::YearMonth;

/// Extract `(current, total)` from the first `X/Y` marker in a description.
/// Markers with `current == 0` or `current > total` are not installments.
pub fn parse_installment_marker(description: &str) -> Option<(u32, u32)> {
    let caps = installment_marker().captures(description)?;
    let current: u32 = caps.get(1)?.as_str().parse().ok()?;
    let total: u32 = caps.get(2)?.as_str().parse().ok()?;
    (current >= 1 && current <= total).then_some((current, total))
}

/// How the transaction date relates to the installment schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentDating {
    /// The row is the statement line billing installment `current`, so the
    /// next one is due the following month.
    #[default]
    StatementDate,
    /// The row carries the original purchase date; installment `k` is due
    /// `k - 1` months after it.
    PurchaseDate,
}

/// Derived view of one open installment purchase.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallmentEntry {
    pub description: String,
    pub date: Option<NaiveDate>,
    pub amount: f64,
    pub current_installment: u32,
    pub total_installments: u32,
    pub remaining_installments: u32,
    pub amount_per_installment: f64,
    pub remaining_amount: f64,
}

impl InstallmentEntry {
    /// Only `Installment` rows with a parseable amount and a valid marker
    /// qualify.
    pub fn from_transaction(txn: &Transaction) -> Option<Self> {
        if txn.category_l1 != INSTALLMENT {
            return None;
        }
        let amount = txn.amount.value()?;
        let (current, total) = parse_installment_marker(&txn.description)?;
        let remaining = total - current;
        let per_installment = amount / current as f64;
        Some(Self {
            description: txn.description.clone(),
            date: txn.date,
            amount,
            current_installment: current,
            total_installments: total,
            remaining_installments: remaining,
            amount_per_installment: per_installment,
            remaining_amount: remaining as f64 * per_installment,
        })
    }

    /// Months in which the remaining installments fall due, in order.
    pub fn due_months(&self, dating: InstallmentDating) -> Vec<YearMonth> {
        let Some(date) = self.date else {
            return Vec::new();
        };
        let base = YearMonth::from_date(date);
        let first = match dating {
            InstallmentDating::StatementDate => 1,
            InstallmentDating::PurchaseDate => self.current_installment,
        };
        (0..self.remaining_installments)
            .map(|i| base.add_months(first + i))
            .collect()
    }
}

pub fn installment_entries(transactions: &[Transaction]) -> Vec<InstallmentEntry> {
    transactions
        .iter()
        .filter_map(InstallmentEntry::from_transaction)
        .collect()
}

/// Spreads open installments over future months.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Projector {
    pub dating: InstallmentDating,
    /// Number of months to project from the start month; `None` is unbounded.
    pub horizon: Option<u32>,
}

impl Projector {
    pub fn new(dating: InstallmentDating, horizon: Option<u32>) -> Self {
        Self { dating, horizon }
    }

    /// Total expected outflow per month, for months from `start` on.
    pub fn project(&self, transactions: &[Transaction], start: YearMonth) -> BTreeMap<YearMonth, f64> {
        let mut projection = BTreeMap::new();
        let entries = installment_entries(transactions);
        for entry in &entries {
            for month in entry.due_months(self.dating) {
                let offset = start.months_until(month);
                if offset < 0 || self.horizon.is_some_and(|h| offset >= i64::from(h)) {
                    continue;
                }
                *projection.entry(month).or_insert(0.0) += entry.amount_per_installment;
            }
        }
        debug!(
            entries = entries.len(),
            months = projection.len(),
            start = %start,
            "projected installments"
        );
        projection
    }
}

pub fn project_installments(transactions: &[Transaction], start: YearMonth) -> BTreeMap<YearMonth, f64> {
    Projector::default().project(transactions, start)
}

/// Sum of the unpaid balance of every open installment, regardless of month.
pub fn total_remaining_installments(transactions: &[Transaction]) -> f64 {
    installment_entries(transactions)
        .iter()
        .map(|e| e.remaining_amount)
        .sum()
}
