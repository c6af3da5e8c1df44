use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use restable::models::BagJson;

use crate::commands::{load_assets, parse_resource_id};

pub(crate) fn command_bag(path: &Path, id: &str, config: Option<&str>, json: bool) -> Result<()> {
    let assets = load_assets(path, config)?;
    let resid = parse_resource_id(id)?;

    let bag = assets
        .get_bag(resid)
        .with_context(|| format!("can't resolve bag 0x{:08x}", resid))?;
    let output = BagJson::new(&assets, resid, &bag);

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "{}: {} (0x{:08x})",
        "Bag".blue().bold(),
        output.name.as_deref().unwrap_or("-").green(),
        resid
    );

    for entry in &output.entries {
        let key = match &entry.key_name {
            Some(name) => name.clone(),
            None => format!("0x{:08x}", entry.key),
        };

        if entry.style == resid {
            println!("  {}: {}", key, entry.value.green());
        } else {
            println!(
                "  {}: {} {}",
                key,
                entry.value.green(),
                format!("(from 0x{:08x})", entry.style).dimmed()
            );
        }
    }

    Ok(())
}
