//! Credit card statement analysis: ingestion of bank exports, keyword-rule
//! categorization with installment detection, manual overrides, summaries
//! and installment projection.

pub mod amount;
pub mod categorizer;
pub mod error;
pub mod fmt;
pub mod importer;
pub mod installments;
pub mod models;
pub mod month;
pub mod reports;
pub mod reviewer;
pub mod rules;
pub mod settings;
pub mod table;

pub use amount::{parse_amount, parse_amount_text, Amount};
pub use categorizer::{categorize, Categorizer, PostFill};
pub use error::{FaturaError, Result};
pub use importer::{ingest, ingest_file, IngestOptions};
pub use installments::{project_installments, total_remaining_installments, InstallmentDating, Projector};
pub use models::{CategoryAssignment, Transaction};
pub use month::YearMonth;
pub use reviewer::{apply_manual_overrides, CategoryOverrides};
pub use rules::{load_rules, RuleCache, RuleTable};
