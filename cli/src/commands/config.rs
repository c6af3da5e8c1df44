use anyhow::{Context, Result};
use colored::Colorize;
use restable_arsc::structs::ResTableConfig;

fn parse(qualifiers: &str) -> Result<ResTableConfig> {
    qualifiers
        .parse::<ResTableConfig>()
        .with_context(|| format!("invalid configuration: {:?}", qualifiers))
}

fn display(config: &ResTableConfig) -> String {
    let printed = config.to_string();
    if printed.is_empty() {
        "default".to_owned()
    } else {
        printed
    }
}

pub(crate) fn command_config(qualifiers: &str, against: Option<&str>) -> Result<()> {
    let config = parse(qualifiers)?;

    println!("{}: {}", "Configuration", display(&config).green());
    println!("{}: {}", "Locale", config.bcp47_locale(true).green());

    let Some(against) = against else {
        return Ok(());
    };
    let requested = parse(against)?;

    println!("{}: {}", "Requested", display(&requested).green());

    let matches = config.matches(&requested);
    println!(
        "{}: {}",
        "Matches",
        if matches {
            "yes".green()
        } else {
            "no".red()
        }
    );

    let diff: Vec<_> = config.diff(&requested).iter_names().map(|(name, _)| name).collect();
    if diff.is_empty() {
        println!("{}: {}", "Differs in", "-".green());
    } else {
        println!("{}: {}", "Differs in", diff.join(", ").yellow());
    }

    Ok(())
}
