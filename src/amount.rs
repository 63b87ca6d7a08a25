use std::fmt;

use crate::table::CellValue;

/// A parsed monetary amount. Unparseable input is carried as `NotANumber`
/// instead of failing the row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Amount {
    Value(f64),
    NotANumber,
}

impl Amount {
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(v),
            Self::NotANumber => None,
        }
    }

    pub fn is_nan(self) -> bool {
        matches!(self, Self::NotANumber)
    }
}

impl From<f64> for Amount {
    fn from(v: f64) -> Self {
        if v.is_finite() {
            Self::Value(v)
        } else {
            Self::NotANumber
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v:.2}"),
            Self::NotANumber => f.write_str("NaN"),
        }
    }
}

/// Normalize a raw amount cell. Numbers pass through; text goes through
/// [`parse_amount_text`]; anything else is `NotANumber`.
pub fn parse_amount(cell: &CellValue) -> Amount {
    match cell {
        CellValue::Number(f) => Amount::from(*f),
        CellValue::Int(i) => Amount::from(*i as f64),
        CellValue::Text(s) => parse_amount_text(s),
        CellValue::Empty | CellValue::Bool(_) | CellValue::DateTime(_) => Amount::NotANumber,
    }
}

/// Parse locale-formatted currency text such as `R$ 1.234,56`, `-42,10`,
/// `1,234.56` or `(50,00)`.
pub fn parse_amount_text(raw: &str) -> Amount {
    let cleaned = strip_currency(raw);
    let (negate, body) = match cleaned.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, cleaned.as_str()),
    };

    let parsed = parse_finite(&body.replace(',', ".")).or_else(|| {
        // Second attempt: whichever separator comes last is the decimal one,
        // the other one groups thousands.
        let alt = match (body.rfind(','), body.rfind('.')) {
            (Some(comma), Some(dot)) if dot > comma => body.replace(',', ""),
            _ => body.replace('.', "").replace(',', "."),
        };
        parse_finite(&alt)
    });

    match parsed {
        Some(v) if negate => Amount::Value(-v),
        Some(v) => Amount::Value(v),
        None => Amount::NotANumber,
    }
}

fn strip_currency(raw: &str) -> String {
    raw.replace("R$", "")
        .replace("US$", "")
        .chars()
        .filter(|c| *c != '$' && !c.is_whitespace())
        .collect()
}

fn parse_finite(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Amount {
        parse_amount(&CellValue::Text(s.to_string()))
    }

    #[test]
    fn test_brazilian_currency() {
        assert_eq!(text("R$ 1.234,56"), Amount::Value(1234.56));
        assert_eq!(text("R$1.234.567,89"), Amount::Value(1234567.89));
        assert_eq!(text("  42,10 "), Amount::Value(42.1));
        assert_eq!(text("-R$ 50,00"), Amount::Value(-50.0));
    }

    #[test]
    fn test_english_grouping_resolves_on_second_attempt() {
        assert_eq!(text("1,234.56"), Amount::Value(1234.56));
        assert_eq!(text("$1,234.56"), Amount::Value(1234.56));
    }

    #[test]
    fn test_plain_decimal() {
        assert_eq!(text("99.90"), Amount::Value(99.9));
        assert_eq!(text("-12"), Amount::Value(-12.0));
    }

    #[test]
    fn test_parenthesized_negative() {
        assert_eq!(text("(50,00)"), Amount::Value(-50.0));
        assert_eq!(text("R$ (1.000,00)"), Amount::Value(-1000.0));
    }

    #[test]
    fn test_unparseable_is_not_a_number() {
        assert_eq!(text("abc"), Amount::NotANumber);
        assert_eq!(text(""), Amount::NotANumber);
        assert_eq!(text("nan"), Amount::NotANumber);
        assert_eq!(text("inf"), Amount::NotANumber);
        assert!(text("1,2,3.4.5").is_nan());
    }

    #[test]
    fn test_numeric_cells_pass_through() {
        assert_eq!(parse_amount(&CellValue::Number(12.5)), Amount::Value(12.5));
        assert_eq!(parse_amount(&CellValue::Int(-3)), Amount::Value(-3.0));
    }

    #[test]
    fn test_unsupported_cells() {
        assert_eq!(parse_amount(&CellValue::Empty), Amount::NotANumber);
        assert_eq!(parse_amount(&CellValue::Bool(true)), Amount::NotANumber);
        assert_eq!(parse_amount(&CellValue::DateTime(45667.0)), Amount::NotANumber);
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Amount::Value(3.0).value(), Some(3.0));
        assert_eq!(Amount::NotANumber.value(), None);
        assert_eq!(Amount::from(f64::NAN), Amount::NotANumber);
        assert_eq!(Amount::NotANumber.to_string(), "NaN");
    }
}
