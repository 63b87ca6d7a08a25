use fatura::settings::{load_settings, save_settings};

pub fn run(rules: Option<String>, drop_negative: bool) -> anyhow::Result<()> {
    let mut settings = load_settings();
    if let Some(rules) = rules {
        settings.rules_path = rules;
    }
    if drop_negative {
        settings.drop_negative_amounts = true;
    }
    let path = save_settings(&settings)?;
    println!("Settings saved to {}", path.display());
    println!("  Rules: {}", settings.rules_path);
    println!("  Drop negative amounts: {}", settings.drop_negative_amounts);
    Ok(())
}
