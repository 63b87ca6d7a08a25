use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use regex::Regex;
use sha2::{Digest, Sha256};
use tracing::{debug, error, warn};

use crate::error::{FaturaError, Result};
use crate::models::UNCATEGORIZED;
use crate::table::{cell_at, read_table, CellValue, TableFormat};

// Header aliases, matched case-sensitively; the first alias present wins.
pub const KEYWORD_ALIASES: &[&str] = &[
    "lançamento",
    "Lançamento",
    "Descrição",
    "Descricao",
    "Estabelecimento",
    "PalavraChave",
    "Keyword",
    "Chave",
];
pub const LEVEL1_ALIASES: &[&str] = &["CategoriaNivel1", "CategoriaGeral", "CatNivel1", "Cat1"];
pub const LEVEL2_ALIASES: &[&str] = &["CategoriaNivel2", "CategoriaDetalhada", "CatNivel2", "Cat2"];

/// Level-2 placeholder treated as "no level-2".
const NO_LEVEL2: &str = "N/A";

#[derive(Debug, Clone)]
pub struct CategoryRule {
    pub keyword: String,
    pub category_l1: String,
    pub category_l2: Option<String>,
    word: Option<Regex>,
}

impl CategoryRule {
    /// Build a rule from already-normalized fields.
    pub fn new(keyword: &str, category_l1: &str, category_l2: Option<&str>) -> Self {
        let word = Regex::new(&format!(r"\b{}\b", regex::escape(keyword))).ok();
        Self {
            keyword: keyword.to_string(),
            category_l1: category_l1.to_string(),
            category_l2: category_l2.map(str::to_string),
            word,
        }
    }

    /// Whole-word match, or plain containment; `description` must be lower-cased.
    pub fn matches(&self, description: &str) -> bool {
        let whole_word = self.word.as_ref().map_or(false, |re| re.is_match(description));
        whole_word || description.contains(&self.keyword)
    }
}

impl PartialEq for CategoryRule {
    fn eq(&self, other: &Self) -> bool {
        self.keyword == other.keyword
            && self.category_l1 == other.category_l1
            && self.category_l2 == other.category_l2
    }
}

/// Keyword rules in priority order: longest keyword first, one rule per keyword.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleTable {
    rules: Vec<CategoryRule>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize raw `(keyword, level-1, level-2)` triples into a table.
    ///
    /// Keywords are lower-cased and trimmed; empty keywords are dropped. A
    /// level-2 of `N/A` or blank means "none". When a keyword repeats, the
    /// later entry's categories win. Ties in keyword length keep load order.
    pub fn from_entries<I, K, C1, C2>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, C1, Option<C2>)>,
        K: AsRef<str>,
        C1: AsRef<str>,
        C2: AsRef<str>,
    {
        let mut normalized: Vec<(String, String, Option<String>)> = entries
            .into_iter()
            .filter_map(|(keyword, l1, l2)| {
                let keyword = keyword.as_ref().trim().to_lowercase();
                if keyword.is_empty() {
                    return None;
                }
                let l1 = match l1.as_ref().trim() {
                    "" => UNCATEGORIZED.to_string(),
                    s => s.to_string(),
                };
                let l2 = l2
                    .map(|s| s.as_ref().trim().to_string())
                    .filter(|s| !s.is_empty() && s != NO_LEVEL2);
                Some((keyword, l1, l2))
            })
            .collect();
        normalized.sort_by_key(|(keyword, _, _)| std::cmp::Reverse(keyword.chars().count()));

        let mut rules: Vec<CategoryRule> = Vec::with_capacity(normalized.len());
        let mut positions: HashMap<String, usize> = HashMap::new();
        for (keyword, l1, l2) in normalized {
            let rule = CategoryRule::new(&keyword, &l1, l2.as_deref());
            match positions.get(&keyword) {
                Some(&idx) => rules[idx] = rule,
                None => {
                    positions.insert(keyword, rules.len());
                    rules.push(rule);
                }
            }
        }
        Self { rules }
    }

    /// Build a table from raw rows whose first row is the header.
    pub fn from_rows(rows: &[Vec<CellValue>]) -> Result<Self> {
        let Some((header, body)) = rows.split_first() else {
            return Err(FaturaError::Schema("rule file is empty".to_string()));
        };
        let header: Vec<String> = header.iter().map(|c| c.as_text().trim().to_string()).collect();
        let find = |aliases: &[&str]| {
            aliases
                .iter()
                .find_map(|alias| header.iter().position(|h| h.as_str() == *alias))
        };

        let (Some(idx_keyword), Some(idx_l1), Some(idx_l2)) =
            (find(KEYWORD_ALIASES), find(LEVEL1_ALIASES), find(LEVEL2_ALIASES))
        else {
            return Err(FaturaError::Schema(format!(
                "rule file needs a keyword column ({}), a level-1 column ({}) and a level-2 column ({})",
                KEYWORD_ALIASES.join(", "),
                LEVEL1_ALIASES.join(", "),
                LEVEL2_ALIASES.join(", "),
            )));
        };

        Ok(Self::from_entries(body.iter().map(|row| {
            (
                cell_at(row, idx_keyword).as_text(),
                cell_at(row, idx_l1).as_text(),
                Some(cell_at(row, idx_l2).as_text()),
            )
        })))
    }

    /// Load a rule file (.xlsx, .xls or .csv). A missing file is an empty table.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "rule file not found, using installment detection only");
            return Ok(Self::new());
        }
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes, &path.to_string_lossy())
    }

    pub fn from_bytes(bytes: &[u8], filename: &str) -> Result<Self> {
        let format = TableFormat::from_filename(filename)?;
        let rows = read_table(bytes, format)?;
        let table = Self::from_rows(&rows)?;
        debug!(file = filename, rules = table.len(), "loaded categorization rules");
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in match order.
    pub fn iter(&self) -> impl Iterator<Item = &CategoryRule> {
        self.rules.iter()
    }

    pub fn get(&self, keyword: &str) -> Option<&CategoryRule> {
        self.rules.iter().find(|r| r.keyword == keyword)
    }

    /// Distinct level-1 categories named by the rules, sorted.
    pub fn categories_l1(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self.rules.iter().map(|r| r.category_l1.as_str()).collect();
        set.into_iter().map(str::to_string).collect()
    }

    /// Distinct level-2 categories named by the rules, sorted.
    pub fn categories_l2(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self.rules.iter().filter_map(|r| r.category_l2.as_deref()).collect();
        set.into_iter().map(str::to_string).collect()
    }
}

/// Load rules for categorization, degrading any failure to an empty table.
pub fn load_rules(path: &Path) -> RuleTable {
    RuleTable::load(path).unwrap_or_else(|e| {
        error!(path = %path.display(), error = %e, "could not load rule file, continuing without rules");
        RuleTable::new()
    })
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

struct CachedRules {
    checksum: String,
    table: RuleTable,
}

/// Caller-owned memo of parsed rule files, keyed by path and revalidated
/// against a checksum of the file content.
#[derive(Default)]
pub struct RuleCache {
    entries: HashMap<PathBuf, CachedRules>,
}

impl RuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the rules for `path`, re-parsing only when the content changed.
    pub fn get(&mut self, path: &Path) -> Result<&RuleTable> {
        if !path.exists() {
            self.entries.remove(path);
            warn!(path = %path.display(), "rule file not found, using installment detection only");
            let entry = self.entries.entry(path.to_path_buf()).or_insert(CachedRules {
                checksum: String::new(),
                table: RuleTable::new(),
            });
            return Ok(&entry.table);
        }

        let bytes = std::fs::read(path)?;
        let checksum = checksum(&bytes);
        let stale = self
            .entries
            .get(path)
            .map_or(true, |cached| cached.checksum != checksum);
        if stale {
            let table = RuleTable::from_bytes(&bytes, &path.to_string_lossy())?;
            self.entries
                .insert(path.to_path_buf(), CachedRules { checksum, table });
        } else {
            debug!(path = %path.display(), "rule cache hit");
        }
        Ok(&self.entries[path].table)
    }

    pub fn invalidate(&mut self, path: &Path) {
        self.entries.remove(path);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_rows(rows: &[&[&str]]) -> Vec<Vec<CellValue>> {
        rows.iter()
            .map(|r| r.iter().map(|c| CellValue::text(c)).collect())
            .collect()
    }

    #[test]
    fn test_longest_keyword_first() {
        let table = RuleTable::from_entries(vec![
            ("uber", "Transporte", None::<&str>),
            ("uber eats", "Alimentação", Some("Delivery")),
            ("ifood", "Alimentação", Some("Delivery")),
        ]);
        let keywords: Vec<&str> = table.iter().map(|r| r.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["uber eats", "ifood", "uber"]);
    }

    #[test]
    fn test_normalization() {
        let table = RuleTable::from_entries(vec![
            ("  NETFLIX ", " Assinaturas ", Some("N/A")),
            ("Spotify", "Assinaturas", Some("  ")),
            ("   ", "Ignored", Some("X")),
            ("padaria", "", Some("Pão")),
        ]);
        assert_eq!(table.len(), 3);
        let netflix = table.get("netflix").unwrap();
        assert_eq!(netflix.category_l1, "Assinaturas");
        assert_eq!(netflix.category_l2, None);
        assert_eq!(table.get("spotify").unwrap().category_l2, None);
        assert_eq!(table.get("padaria").unwrap().category_l1, UNCATEGORIZED);
    }

    #[test]
    fn test_duplicate_keyword_last_wins() {
        let table = RuleTable::from_entries(vec![
            ("posto", "Transporte", Some("Combustível")),
            ("mercado", "Mercado", None),
            ("POSTO ", "Carro", None),
        ]);
        assert_eq!(table.len(), 2);
        let posto = table.get("posto").unwrap();
        assert_eq!(posto.category_l1, "Carro");
        assert_eq!(posto.category_l2, None);
        let keywords: Vec<&str> = table.iter().map(|r| r.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["mercado", "posto"]);
    }

    #[test]
    fn test_rule_matching_falls_back_to_substring() {
        let rule = CategoryRule::new("uber", "Transporte", None);
        assert!(rule.matches("uber trip 123"));
        assert!(rule.matches("ubereats sp"));
        assert!(!rule.matches("taxi"));
        let odd = CategoryRule::new("c++ (", "Cursos", None);
        assert!(odd.matches("curso c++ (online)"));
    }

    #[test]
    fn test_from_rows_resolves_aliases() {
        let rows = text_rows(&[
            &["Chave", "Cat1", "Cat2"],
            &["Uber", "Transporte", "App"],
            &["ifood", "Alimentação", ""],
        ]);
        let table = RuleTable::from_rows(&rows).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("uber").unwrap().category_l2.as_deref(), Some("App"));
        assert_eq!(table.get("ifood").unwrap().category_l2, None);
    }

    #[test]
    fn test_alias_priority_order() {
        let rows = text_rows(&[
            &["Keyword", "PalavraChave", "CategoriaNivel1", "CategoriaNivel2"],
            &["from keyword", "from palavra", "A", "B"],
        ]);
        let table = RuleTable::from_rows(&rows).unwrap();
        assert!(table.get("from palavra").is_some());
        assert!(table.get("from keyword").is_none());
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let rows = text_rows(&[&["PalavraChave", "CategoriaNivel1"], &["uber", "Transporte"]]);
        assert!(matches!(RuleTable::from_rows(&rows), Err(FaturaError::Schema(_))));
        // aliases are case-sensitive
        let rows = text_rows(&[&["palavrachave", "categorianivel1", "categorianivel2"], &["a", "b", "c"]]);
        assert!(matches!(RuleTable::from_rows(&rows), Err(FaturaError::Schema(_))));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let table = RuleTable::load(&dir.path().join("regras.xlsx")).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_load_csv_rules() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regras.csv");
        std::fs::write(&path, "PalavraChave;CategoriaNivel1;CategoriaNivel2\nuber;Transporte;App\n").unwrap();
        let table = RuleTable::load(&path).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.categories_l1(), vec!["Transporte".to_string()]);
        assert_eq!(table.categories_l2(), vec!["App".to_string()]);
    }

    #[test]
    fn test_load_xlsx_rules() {
        use rust_xlsxwriter::Workbook;

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let rows = [
            ["PalavraChave", "CategoriaNivel1", "CategoriaNivel2"],
            ["uber", "Transporte", "App"],
            ["Uber Eats", "Alimentação", "Delivery"],
            ["posto", "Transporte", ""],
        ];
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    sheet.write_string(r as u32, c as u16, *value).unwrap();
                }
            }
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regras.xlsx");
        workbook.save(&path).unwrap();

        let table = RuleTable::load(&path).unwrap();
        let keywords: Vec<&str> = table.iter().map(|r| r.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["uber eats", "posto", "uber"]);
        assert_eq!(table.get("uber eats").unwrap().category_l2.as_deref(), Some("Delivery"));
        assert_eq!(table.get("posto").unwrap().category_l2, None);
        assert_eq!(table.get("uber").unwrap().category_l1, "Transporte");
    }

    #[test]
    fn test_load_rules_degrades_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regras.csv");
        std::fs::write(&path, "a,b,c\n1,2,3\n").unwrap();
        assert!(RuleTable::load(&path).is_err());
        assert!(load_rules(&path).is_empty());
    }

    #[test]
    fn test_cache_reparses_on_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regras.csv");
        std::fs::write(&path, "Keyword,Cat1,Cat2\nuber,Transporte,App\n").unwrap();

        let mut cache = RuleCache::new();
        assert_eq!(cache.get(&path).unwrap().len(), 1);
        assert_eq!(cache.get(&path).unwrap().len(), 1);
        assert_eq!(cache.len(), 1);

        std::fs::write(&path, "Keyword,Cat1,Cat2\nuber,Transporte,App\n99,Pet,Ração\n").unwrap();
        assert_eq!(cache.get(&path).unwrap().len(), 2);

        cache.invalidate(&path);
        assert!(cache.is_empty());
        assert_eq!(cache.get(&path).unwrap().len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }
}
