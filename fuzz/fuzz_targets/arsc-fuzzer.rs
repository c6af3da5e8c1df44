#![no_main]

use libfuzzer_sys::fuzz_target;
use restable::{ApkAssets, AssetManager};

fuzz_target!(|data: &[u8]| {
    // must provide at least 12 bytes
    if data.len() < 12 {
        return;
    }

    let Ok(apk_assets) = ApkAssets::load("fuzz.arsc", data, false) else {
        return;
    };

    // every id the table claims to have
    let resids: Vec<u32> = apk_assets
        .loaded_arsc()
        .packages()
        .iter()
        .flat_map(|package| {
            let package_id = package.package_id() as u32;
            let type_id_offset = package.type_id_offset() as u32;
            package.type_specs().flat_map(move |(type_idx, spec)| {
                let type_id = type_idx as u32 + type_id_offset + 1;
                (0..spec.entry_count() as u32)
                    .map(move |entry| (package_id << 24) | (type_id << 16) | entry)
            })
        })
        .collect();

    let mut assets = AssetManager::new();
    assets.set_apk_assets(vec![apk_assets]);

    for resid in resids {
        if let Ok(value) = assets.get_resource(resid, true, 0) {
            let _ = assets.resolve_reference(value);
        }
        let _ = assets.get_bag(resid);
        let _ = assets.get_resource_name(resid);
    }
});
