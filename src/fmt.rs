use crate::amount::Amount;

/// Format a float as Brazilian reais with thousands separators: R$ 1.234,56
pub fn money(val: f64) -> String {
    let negative = val < 0.0 && format!("{:.2}", val.abs()) != "0.00";
    let cents = format!("{:.2}", val.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut grouped = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    let grouped: String = grouped.chars().rev().collect();

    if negative {
        format!("-R$ {grouped},{dec_part}")
    } else {
        format!("R$ {grouped},{dec_part}")
    }
}

/// Like [`money`], with a dash for amounts that did not parse.
pub fn amount(val: Amount) -> String {
    match val {
        Amount::Value(v) => money(v),
        Amount::NotANumber => "-".to_string(),
    }
}
