use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::month::YearMonth;

pub const UNCATEGORIZED: &str = "Uncategorized";
pub const INSTALLMENT: &str = "Installment";
pub const GENERAL: &str = "General";
/// Month key of a transaction without a date.
pub const NO_MONTH: &str = "N/A";

/// Two-level category tag: a coarse level-1 and an optional refinement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryAssignment {
    pub level1: String,
    #[serde(default)]
    pub level2: Option<String>,
}

impl CategoryAssignment {
    pub fn new(level1: impl Into<String>, level2: Option<&str>) -> Self {
        Self {
            level1: level1.into(),
            level2: level2.map(str::to_string),
        }
    }

    pub fn uncategorized() -> Self {
        Self::new(UNCATEGORIZED, None)
    }
}

impl Default for CategoryAssignment {
    fn default() -> Self {
        Self::uncategorized()
    }
}

/// One normalized statement row.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub date: Option<NaiveDate>,
    pub description: String,
    pub amount: Amount,
    pub category_l1: String,
    pub category_l2: Option<String>,
}

impl Transaction {
    pub fn new(date: Option<NaiveDate>, description: impl Into<String>, amount: Amount) -> Self {
        Self {
            date,
            description: description.into(),
            amount,
            category_l1: UNCATEGORIZED.to_string(),
            category_l2: None,
        }
    }

    /// `YYYY-MM` of the transaction date, or `N/A` when the date is missing.
    pub fn month_key(&self) -> String {
        self.date
            .map(|d| YearMonth::from_date(d).to_string())
            .unwrap_or_else(|| NO_MONTH.to_string())
    }

    pub fn categories(&self) -> CategoryAssignment {
        CategoryAssignment {
            level1: self.category_l1.clone(),
            level2: self.category_l2.clone(),
        }
    }

    pub fn set_categories(&mut self, categories: CategoryAssignment) {
        self.category_l1 = categories.level1;
        self.category_l2 = categories.level2;
    }
}
