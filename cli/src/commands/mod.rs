use std::path::Path;

use anyhow::{Context, Result, bail};
use restable::{ApkAssets, AssetManager};
use restable_arsc::structs::ResTableConfig;

pub(crate) mod bag;
pub(crate) mod config;
pub(crate) mod dump;
pub(crate) mod path_helpers;
pub(crate) mod resolve;

pub(crate) use bag::command_bag;
pub(crate) use config::command_config;
pub(crate) use dump::command_dump;
pub(crate) use resolve::command_resolve;

/// Load a single table and apply the configuration, if any
pub(crate) fn load_assets(path: &Path, config: Option<&str>) -> Result<AssetManager> {
    let data = std::fs::read(path).with_context(|| format!("can't open file: {:?}", path))?;
    let apk_assets = ApkAssets::load(path.to_string_lossy(), &data, false)
        .with_context(|| format!("got error while parsing resource table: {:?}", path))?;

    let mut assets = AssetManager::new();
    assets.set_apk_assets(vec![apk_assets]);

    if let Some(qualifiers) = config {
        let config = qualifiers
            .parse::<ResTableConfig>()
            .with_context(|| format!("invalid configuration: {:?}", qualifiers))?;
        assets.set_configuration(config);
    }

    Ok(assets)
}

/// Resource id in hex (with or without `0x`) or decimal
pub(crate) fn parse_resource_id(input: &str) -> Result<u32> {
    let input = input.trim();

    let parsed = match input.strip_prefix("0x").or_else(|| input.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None if input.len() == 8 => u32::from_str_radix(input, 16),
        None => input.parse::<u32>(),
    };

    match parsed {
        Ok(resid) if resid & 0x00ff_0000 != 0 => Ok(resid),
        Ok(resid) => bail!("0x{:08x} is not a valid resource id", resid),
        Err(_) => bail!("can't parse resource id: {:?}", input),
    }
}
