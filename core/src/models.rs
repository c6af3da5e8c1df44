use serde::Serialize;

use restable_arsc::LoadedPackage;
use restable_arsc::structs::{ResTableConfigFlags, ResValue};

use crate::asset_manager::{AssetManager, Cookie, SelectedValue};
use crate::bag::ResolvedBag;

#[derive(Serialize, Debug)]
pub struct ValueJson {
    #[serde(serialize_with = "hex_id")]
    pub resid: u32,

    pub name: Option<String>,

    pub data_type: String,

    pub data: u32,

    /// Value as aapt would print it, strings taken from the owning table
    pub formatted: String,

    pub cookie: Option<usize>,

    pub config: String,

    #[serde(serialize_with = "flag_names")]
    pub changing_configurations: ResTableConfigFlags,
}

impl ValueJson {
    pub fn new(assets: &AssetManager, resid: u32, selected: &SelectedValue) -> ValueJson {
        ValueJson {
            resid,
            name: assets.get_resource_name(resid).ok().map(|n| n.to_string()),
            data_type: format!("{:?}", selected.value.data_type),
            data: selected.value.data,
            formatted: format_value(assets, selected.cookie, &selected.value),
            cookie: selected.cookie.map(|c| c.0),
            config: selected.config.to_string(),
            changing_configurations: selected.flags,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct BagEntryJson {
    #[serde(serialize_with = "hex_id")]
    pub key: u32,

    pub key_name: Option<String>,

    pub value: String,

    #[serde(serialize_with = "hex_id")]
    pub style: u32,
}

#[derive(Serialize, Debug)]
pub struct BagJson {
    #[serde(serialize_with = "hex_id")]
    pub resid: u32,

    pub name: Option<String>,

    #[serde(serialize_with = "flag_names")]
    pub changing_configurations: ResTableConfigFlags,

    pub entries: Vec<BagEntryJson>,
}

impl BagJson {
    pub fn new(assets: &AssetManager, resid: u32, bag: &ResolvedBag) -> BagJson {
        let entries = bag
            .iter()
            .map(|entry| BagEntryJson {
                key: entry.key,
                key_name: assets.get_resource_name(entry.key).ok().map(|n| n.to_string()),
                value: format_value(assets, Some(entry.cookie), &entry.value),
                style: entry.style,
            })
            .collect();

        BagJson {
            resid,
            name: assets.get_resource_name(resid).ok().map(|n| n.to_string()),
            changing_configurations: bag.type_spec_flags,
            entries,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct TypeJson {
    pub id: u8,
    pub name: Option<String>,
    pub entry_count: usize,
    pub configurations: Vec<String>,
}

#[derive(Serialize, Debug)]
pub struct PackageJson {
    pub id: u8,
    pub name: String,
    pub dynamic: bool,
    pub overlay: bool,
    pub libraries: Vec<String>,
    pub types: Vec<TypeJson>,
}

impl From<&LoadedPackage> for PackageJson {
    fn from(package: &LoadedPackage) -> PackageJson {
        let types = package
            .type_specs()
            .map(|(type_idx, spec)| TypeJson {
                id: spec.id,
                name: package
                    .type_string_pool()
                    .and_then(|pool| pool.string_at(type_idx)),
                entry_count: spec.entry_count(),
                configurations: spec.types.iter().map(|ty| ty.config.to_string()).collect(),
            })
            .collect();

        PackageJson {
            id: package.package_id(),
            name: package.package_name().to_owned(),
            dynamic: package.is_dynamic(),
            overlay: package.is_overlay(),
            libraries: package
                .dynamic_package_map()
                .iter()
                .map(|entry| format!("0x{:02x} {}", entry.package_id, entry.package_name))
                .collect(),
            types,
        }
    }
}

/// Format a value with the global string pool of the table it came from
pub fn format_value(assets: &AssetManager, cookie: Option<Cookie>, value: &ResValue) -> String {
    let pool = cookie
        .and_then(|c| assets.apk_assets().get(c.0))
        .and_then(|apk| apk.loaded_arsc().string_pool());
    value.format(pool)
}

fn hex_id<S>(resid: &u32, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&format!("0x{:08x}", resid))
}

fn flag_names<S>(flags: &ResTableConfigFlags, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let names: Vec<_> = flags.iter_names().map(|(name, _)| name).collect();
    names.serialize(serializer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use restable_arsc::structs::ResourceValueType;

    #[test]
    fn ids_are_hex() {
        let assets = AssetManager::new();
        let selected = SelectedValue::from_value(ResValue::new(ResourceValueType::Dec, 7));

        let json = serde_json::to_value(ValueJson::new(&assets, 0x7f01_0002, &selected)).unwrap();
        assert_eq!(json["resid"], "0x7f010002");
        assert_eq!(json["data"], 7);
        assert_eq!(json["cookie"], serde_json::Value::Null);
        assert_eq!(json["changing_configurations"], serde_json::json!([]));
    }

    #[test]
    fn flags_by_name() {
        let bag = ResolvedBag {
            type_spec_flags: ResTableConfigFlags::CONFIG_MCC,
            entries: Vec::new(),
        };
        let json = serde_json::to_value(BagJson::new(&AssetManager::new(), 0x7f02_0000, &bag)).unwrap();
        assert_eq!(json["changing_configurations"], serde_json::json!(["CONFIG_MCC"]));
    }
}
