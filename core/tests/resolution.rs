use std::sync::Arc;

use restable::arsc::structs::{ResTableConfig, ResTableConfigFlags, ResValue, ResourceValueType};
use restable::arsc::testing::{EntryBuilder, IdmapBuilder, PackageBuilder, TableBuilder};
use restable::{ApkAssets, AssetManager, Cookie, LookupError, SelectedValue};

const ATTR_A: u32 = 0x7f01_0001;
const ATTR_B: u32 = 0x7f01_0002;
const ATTR_C: u32 = 0x7f01_0003;

fn int(data: u32) -> ResValue {
    ResValue::new(ResourceValueType::Dec, data)
}

fn reference(resid: u32) -> ResValue {
    ResValue::new(ResourceValueType::Reference, resid)
}

fn any() -> ResTableConfig {
    ResTableConfig::default()
}

fn app() -> PackageBuilder {
    PackageBuilder::new(0x7f, "com.example.app")
        .type_names(&["attr", "style", "integer", "drawable"])
        .keys(&["a", "b", "c", "Base", "Child", "value", "other"])
}

fn manager(tables: &[&[u8]]) -> AssetManager {
    let apk_assets = tables
        .iter()
        .enumerate()
        .map(|(idx, data)| ApkAssets::load(format!("{idx}.arsc"), data, false).unwrap())
        .collect();

    let mut assets = AssetManager::new();
    assets.set_apk_assets(apk_assets);
    assets
}

#[test]
fn density_scaling_down_is_preferred() {
    let density = |density| ResTableConfig {
        density,
        ..Default::default()
    };
    let data = TableBuilder::new()
        .package(
            app()
                .entry(4, 0, density(ResTableConfig::DENSITY_LOW), EntryBuilder::value(5, int(120)))
                .entry(4, 0, density(ResTableConfig::DENSITY_HIGH), EntryBuilder::value(5, int(240)))
                .spec_flags(4, 0, ResTableConfigFlags::CONFIG_DENSITY.bits()),
        )
        .build();
    let mut assets = manager(&[&data]);

    assets.set_configuration(density(ResTableConfig::DENSITY_MEDIUM));
    let value = assets.get_resource(0x7f04_0000, false, 0).unwrap();
    assert_eq!(value.value, int(240));
    assert_eq!(value.config.density, ResTableConfig::DENSITY_HIGH);

    assets.set_configuration(density(ResTableConfig::DENSITY_LOW));
    assert_eq!(assets.get_resource(0x7f04_0000, false, 0).unwrap().value, int(120));
}

#[test]
fn bag_merges_parent_with_child_winning() {
    let data = TableBuilder::new()
        .package(
            app()
                .entry(2, 0, any(), EntryBuilder::bag(3, 0, vec![(ATTR_B, int(2)), (ATTR_C, int(30))]))
                .entry(
                    2,
                    1,
                    any(),
                    EntryBuilder::bag(4, 0x7f02_0000, vec![(ATTR_A, int(1)), (ATTR_C, int(3))]),
                ),
        )
        .build();
    let assets = manager(&[&data]);

    let bag = assets.get_bag(0x7f02_0001).unwrap();
    let entries: Vec<(u32, u32, u32)> = bag
        .iter()
        .map(|entry| (entry.key, entry.value.data, entry.style))
        .collect();
    assert_eq!(
        entries,
        vec![
            (ATTR_A, 1, 0x7f02_0001),
            (ATTR_B, 2, 0x7f02_0000),
            (ATTR_C, 3, 0x7f02_0001),
        ]
    );

    // the same bag comes back from the cache
    assert!(Arc::ptr_eq(&bag, &assets.get_bag(0x7f02_0001).unwrap()));
}

#[test]
fn bag_parent_cycle_is_broken() {
    let data = TableBuilder::new()
        .package(
            app()
                .entry(2, 0, any(), EntryBuilder::bag(3, 0x7f02_0001, vec![(ATTR_A, int(1))]))
                .entry(2, 1, any(), EntryBuilder::bag(4, 0x7f02_0000, vec![(ATTR_B, int(2))]))
                .entry(2, 2, any(), EntryBuilder::bag(5, 0x7f02_0000, vec![(ATTR_C, int(3))])),
        )
        .build();
    let assets = manager(&[&data]);

    // leading into the cycle still inherits from the bag it points at
    let tail = assets.get_bag(0x7f02_0002).unwrap();
    let keys: Vec<u32> = tail.iter().map(|entry| entry.key).collect();
    assert_eq!(keys, vec![ATTR_A, ATTR_C]);

    let a = assets.get_bag(0x7f02_0000).unwrap();
    assert_eq!(a.len(), 1);
    assert_eq!(a.find(ATTR_A).map(|e| e.value), Some(int(1)));

    let b = assets.get_bag(0x7f02_0001).unwrap();
    assert_eq!(b.len(), 1);
    assert_eq!(b.find(ATTR_B).map(|e| e.value), Some(int(2)));
}

#[test]
fn bag_inheriting_from_itself() {
    let data = TableBuilder::new()
        .package(app().entry(2, 0, any(), EntryBuilder::bag(3, 0x7f02_0000, vec![(ATTR_A, int(1))])))
        .build();
    let assets = manager(&[&data]);

    assert_eq!(assets.get_bag(0x7f02_0000).unwrap().len(), 1);
}

#[test]
fn long_parent_chain_is_flattened() {
    const DEPTH: u32 = 5000;

    let mut package = app();
    for idx in 0..DEPTH {
        let (parent, map) = if idx + 1 < DEPTH {
            (0x7f02_0000 + idx + 1, vec![(ATTR_A, int(idx))])
        } else {
            (0, vec![(ATTR_A, int(idx)), (ATTR_B, int(DEPTH))])
        };
        package = package.entry(2, idx as u16, any(), EntryBuilder::bag(3, parent, map));
    }
    let data = TableBuilder::new().package(package).build();
    let assets = manager(&[&data]);

    let bag = assets.get_bag(0x7f02_0000).unwrap();
    let entries: Vec<(u32, u32, u32)> = bag
        .iter()
        .map(|entry| (entry.key, entry.value.data, entry.style))
        .collect();
    assert_eq!(
        entries,
        vec![
            (ATTR_A, 0, 0x7f02_0000),
            (ATTR_B, DEPTH, 0x7f02_0000 + DEPTH - 1),
        ]
    );

    // every level on the way was flattened too
    let middle = assets.get_bag(0x7f02_0000 + DEPTH / 2).unwrap();
    assert_eq!(middle.find(ATTR_A).map(|e| e.value), Some(int(DEPTH / 2)));
    assert_eq!(middle.len(), 2);
}

#[test]
fn bag_with_missing_parent_fails() {
    let data = TableBuilder::new()
        .package(app().entry(2, 0, any(), EntryBuilder::bag(3, 0x7f02_0009, vec![(ATTR_A, int(1))])))
        .build();
    let assets = manager(&[&data]);

    assert_eq!(
        assets.get_bag(0x7f02_0000).unwrap_err(),
        LookupError::NotFound(0x7f02_0009)
    );
}

#[test]
fn bag_with_untranslatable_key_fails() {
    let data = TableBuilder::new()
        .package(app().entry(2, 0, any(), EntryBuilder::bag(3, 0, vec![(0x1001_0000, int(1))])))
        .build();
    let assets = manager(&[&data]);

    assert_eq!(
        assets.get_bag(0x7f02_0000).unwrap_err(),
        LookupError::DynamicReference(0x1001_0000)
    );
}

#[test]
fn bags_are_dropped_on_relevant_configuration_change() {
    let land = ResTableConfig {
        orientation: ResTableConfig::ORIENTATION_LAND,
        ..Default::default()
    };
    let data = TableBuilder::new()
        .package(
            app()
                .entry(2, 0, any(), EntryBuilder::bag(3, 0, vec![(ATTR_A, int(1))]))
                .entry(2, 0, land, EntryBuilder::bag(3, 0, vec![(ATTR_A, int(2))]))
                .spec_flags(2, 0, ResTableConfigFlags::CONFIG_ORIENTATION.bits())
                .entry(2, 1, any(), EntryBuilder::bag(4, 0, vec![(ATTR_B, int(3))])),
        )
        .build();
    let mut assets = manager(&[&data]);

    let portrait = assets.get_bag(0x7f02_0000).unwrap();
    let stable = assets.get_bag(0x7f02_0001).unwrap();
    assert_eq!(portrait.find(ATTR_A).map(|e| e.value), Some(int(1)));
    assert_eq!(portrait.type_spec_flags, ResTableConfigFlags::CONFIG_ORIENTATION);

    assets.set_configuration(land);

    let landscape = assets.get_bag(0x7f02_0000).unwrap();
    assert_eq!(landscape.find(ATTR_A).map(|e| e.value), Some(int(2)));
    assert!(Arc::ptr_eq(&stable, &assets.get_bag(0x7f02_0001).unwrap()));
}

#[test]
fn overlay_wins_over_equal_configuration() {
    let land = ResTableConfig {
        orientation: ResTableConfig::ORIENTATION_LAND,
        ..Default::default()
    };
    let base = TableBuilder::new()
        .package(
            app()
                .entry(3, 0, any(), EntryBuilder::value(5, int(1)))
                .entry(3, 0, land, EntryBuilder::value(5, int(2)))
                .entry(3, 1, any(), EntryBuilder::value(6, int(7))),
        )
        .build();
    let overlay = TableBuilder::new()
        .package(
            PackageBuilder::new(0x7f, "com.example.app.overlay")
                .type_names(&["integer"])
                .keys(&["value"])
                .entry(1, 0, any(), EntryBuilder::value(0, int(100))),
        )
        .build();
    let idmap = IdmapBuilder::new(0x7f).type_map(3, 1, 0, vec![0]).build();

    let mut assets = AssetManager::new();
    assets.set_apk_assets(vec![
        ApkAssets::load("base.arsc", &base, false).unwrap(),
        ApkAssets::load_overlay("overlay.arsc", &idmap, &overlay, false).unwrap(),
    ]);

    let value = assets.get_resource(0x7f03_0000, false, 0).unwrap();
    assert_eq!(value.value, int(100));
    assert_eq!(value.cookie, Some(Cookie(1)));

    // entries without a mapping stay with the base
    let value = assets.get_resource(0x7f03_0001, false, 0).unwrap();
    assert_eq!(value.value, int(7));
    assert_eq!(value.cookie, Some(Cookie(0)));

    // a better configuration still wins over the overlay
    assets.set_configuration(land);
    assert_eq!(assets.get_resource(0x7f03_0000, false, 0).unwrap().value, int(2));
}

#[test]
fn dynamic_references_in_bags_are_remapped() {
    let lib = TableBuilder::new()
        .package(
            PackageBuilder::new(0x00, "com.example.lib")
                .type_names(&["attr", "style"])
                .keys(&["libAttr", "LibStyle"])
                .entry(1, 0, any(), EntryBuilder::value(0, int(0)))
                .entry(2, 0, any(), EntryBuilder::bag(1, 0, vec![(0x0001_0000, int(5))])),
        )
        .build();
    let app = TableBuilder::new()
        .package(app().library(0x10, "com.example.lib").entry(
            2,
            0,
            any(),
            EntryBuilder::bag(
                3,
                0x1002_0000,
                vec![(ATTR_A, ResValue::new(ResourceValueType::DynamicReference, 0x1002_0000))],
            ),
        ))
        .build();
    let assets = manager(&[&lib, &app]);

    let bag = assets.get_bag(0x7f02_0000).unwrap();
    let entries: Vec<(u32, ResValue, u32)> = bag
        .iter()
        .map(|entry| (entry.key, entry.value, entry.style))
        .collect();
    assert_eq!(
        entries,
        vec![
            (0x0201_0000, int(5), 0x0202_0000),
            (ATTR_A, reference(0x0202_0000), 0x7f02_0000),
        ]
    );
    assert_eq!(bag.find(0x0201_0000).map(|e| e.cookie), Some(Cookie(0)));
}

#[test]
fn reference_chain_is_capped() {
    // 25 integers, each referencing the next one
    let mut package = app();
    for idx in 0..25u16 {
        let next = 0x7f03_0000 | (idx as u32 + 1);
        package = package.entry(3, idx, any(), EntryBuilder::value(5, reference(next)));
    }
    let assets = manager(&[&TableBuilder::new().package(package).build()]);

    assert!(matches!(
        assets.resolve_reference(SelectedValue::from_value(reference(0x7f03_0000))),
        Err(LookupError::ResolutionLimitExceeded(_))
    ));

    // starting closer to the end the chain runs out on a missing entry
    assert_eq!(
        assets.resolve_reference(SelectedValue::from_value(reference(0x7f03_0014))),
        Err(LookupError::NotFound(0x7f03_0019))
    );
}

#[test]
fn self_reference_is_irreducible() {
    let data = TableBuilder::new()
        .package(app().entry(3, 0, any(), EntryBuilder::value(5, reference(0x7f03_0000))))
        .build();
    let assets = manager(&[&data]);

    let resolved = assets
        .resolve_reference(SelectedValue::from_value(reference(0x7f03_0000)))
        .unwrap();
    assert_eq!(resolved.value, reference(0x7f03_0000));
    assert_eq!(resolved.resid, 0x7f03_0000);
}

#[test]
fn names_round_trip() {
    let data = TableBuilder::new()
        .package(app().entry(3, 1, any(), EntryBuilder::value(6, int(1))))
        .build();
    let assets = manager(&[&data]);

    let name = assets.get_resource_name(0x7f03_0001).unwrap();
    assert_eq!(name.to_string(), "com.example.app:integer/other");
    assert_eq!(
        assets.get_resource_id("@com.example.app:integer/other", "", ""),
        Some(0x7f03_0001)
    );
    assert_eq!(assets.get_resource_id("other", "integer", "com.example.app"), Some(0x7f03_0001));
    assert_eq!(assets.get_resource_id("integer/missing", "", "com.example.app"), None);
}
