use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use restable::ApkAssets;
use restable::models::PackageJson;

use crate::commands::path_helpers::get_all_files;

pub(crate) fn command_dump(paths: &[PathBuf], json: bool) -> Result<()> {
    let files = get_all_files(paths, &["arsc"]);

    for (i, path) in files.iter().enumerate() {
        dump(path, json)?;

        // Add a newline between tables except after the last one
        if i != files.len() - 1 {
            println!();
        }
    }

    Ok(())
}

fn dump(path: &Path, json: bool) -> Result<()> {
    let data = std::fs::read(path).with_context(|| format!("can't open file: {:?}", path))?;
    let assets = ApkAssets::load(path.to_string_lossy(), &data, false)
        .with_context(|| format!("got error while parsing resource table: {:?}", path))?;

    let packages: Vec<PackageJson> = assets
        .loaded_arsc()
        .packages()
        .iter()
        .map(PackageJson::from)
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&packages)?);
        return Ok(());
    }

    println!("{}: {}", "Table", path.display().to_string().green());

    for package in &packages {
        println!(
            "{}: {} (0x{:02x})",
            "Package".blue().bold(),
            package.name.green(),
            package.id
        );
        if package.dynamic {
            println!("  {}", "shared library".yellow());
        }
        if package.overlay {
            println!("  {}", "overlay".yellow());
        }
        for library in &package.libraries {
            println!("  {}: {}", "Library", library.green());
        }

        for ty in &package.types {
            println!(
                "  {} 0x{:02x} {}: {} entries",
                "Type",
                ty.id,
                ty.name.as_deref().unwrap_or("-").green(),
                ty.entry_count
            );
            for config in &ty.configurations {
                let config = if config.is_empty() { "default" } else { config };
                println!("    {}", config);
            }
        }
    }

    Ok(())
}
