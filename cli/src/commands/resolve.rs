use std::path::Path;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use log::debug;
use restable::models::ValueJson;

use crate::commands::{load_assets, parse_resource_id};

pub(crate) fn command_resolve(
    path: &Path,
    id: Option<&str>,
    name: Option<&str>,
    config: Option<&str>,
    json: bool,
) -> Result<()> {
    let assets = load_assets(path, config)?;

    let resid = match (id, name) {
        (Some(id), _) => parse_resource_id(id)?,
        (None, Some(name)) => assets
            .get_resource_id(name, "", "")
            .with_context(|| format!("no resource named {:?}", name))?,
        (None, None) => bail!("either --id or --name is required"),
    };

    let value = assets
        .get_resource(resid, true, 0)
        .with_context(|| format!("can't find resource 0x{:08x}", resid))?;
    let resolved = assets.resolve_reference(value).unwrap_or_else(|e| {
        debug!("keeping unresolved value of 0x{:08x}: {}", resid, e);
        value
    });

    let output = ValueJson::new(&assets, resid, &resolved);

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "{}: {}",
        "Resource",
        output.name.as_deref().unwrap_or("-").green()
    );
    println!("{}: 0x{:08x}", "Id", resid);
    println!("{}: {}", "Type", output.data_type.green());
    println!("{}: {}", "Value", output.formatted.green());
    if resolved.resid != 0 && resolved.resid != resid {
        println!("{}: 0x{:08x}", "Resolved from", resolved.resid);
    }
    if !output.config.is_empty() {
        println!("{}: {}", "Configuration", output.config.green());
    }
    if !resolved.flags.is_empty() {
        let names: Vec<_> = resolved.flags.iter_names().map(|(name, _)| name).collect();
        println!("{}: {}", "Varies with", names.join(", ").yellow());
    }

    Ok(())
}
