use std::path::PathBuf;

use fatura::categorizer::Categorizer;
use fatura::settings::load_settings;

use super::resolve_rules;

pub fn run(description: &str, rules: Option<PathBuf>) -> anyhow::Result<()> {
    let settings = load_settings();
    let rules = resolve_rules(rules, &settings);
    let result = Categorizer::new(&rules)
        .with_post_fill(settings.post_fill)
        .categorize(description);
    match result.level2 {
        Some(l2) => println!("{} \u{2192} {l2}", result.level1),
        None => println!("{}", result.level1),
    }
    Ok(())
}
