use restable::arsc::XmlTree;
use restable::arsc::structs::{ResTableConfig, ResTableConfigFlags, ResValue, ResourceValueType};
use restable::arsc::testing::{EntryBuilder, PackageBuilder, TableBuilder, XmlBuilder};
use restable::{
    ApkAssets, AssetManager, Cookie, LookupError, ThemeError, apply_style, resolve_attrs,
    retrieve_attributes,
};

const ATTR_A: u32 = 0x7f01_0000;
const ATTR_B: u32 = 0x7f01_0001;
const ATTR_C: u32 = 0x7f01_0002;
const ATTR_D: u32 = 0x7f01_0003;
const ATTR_E: u32 = 0x7f01_0004;
const ATTR_F: u32 = 0x7f01_0005;
const ATTR_DEFAULT_STYLE: u32 = 0x7f01_0006;

const STYLE_TAG: u32 = 0x7f02_0000;
const STYLE_DEFAULT: u32 = 0x7f02_0001;
const STYLE_THEME: u32 = 0x7f02_0002;
const STYLE_THEME_CHILD: u32 = 0x7f02_0003;
const STYLE_CHAIN: u32 = 0x7f02_0004;

const INTEGER_ANSWER: u32 = 0x7f03_0000;

fn int(data: u32) -> ResValue {
    ResValue::new(ResourceValueType::Dec, data)
}

fn reference(resid: u32) -> ResValue {
    ResValue::new(ResourceValueType::Reference, resid)
}

fn attribute(resid: u32) -> ResValue {
    ResValue::new(ResourceValueType::Attribute, resid)
}

fn any() -> ResTableConfig {
    ResTableConfig::default()
}

fn assets() -> AssetManager {
    // attributes pointing at the next one, the last points back at the first
    let chain: Vec<(u32, ResValue)> = (0..25u32)
        .map(|idx| (0x7f01_0100 + idx, attribute(0x7f01_0100 + (idx + 1) % 25)))
        .collect();

    let data = TableBuilder::new()
        .package(
            PackageBuilder::new(0x7f, "com.example.app")
                .type_names(&["attr", "style", "integer"])
                .keys(&["Tag", "Default", "Theme", "Theme.Child", "Chain", "answer"])
                .entry(
                    2,
                    0,
                    any(),
                    EntryBuilder::bag(
                        0,
                        0,
                        vec![(ATTR_A, int(100)), (ATTR_B, int(2)), (ATTR_F, reference(0))],
                    ),
                )
                .entry(
                    2,
                    1,
                    any(),
                    EntryBuilder::bag(1, 0, vec![(ATTR_B, int(200)), (ATTR_C, int(3))]),
                )
                .entry(
                    2,
                    2,
                    any(),
                    EntryBuilder::bag(
                        2,
                        0,
                        vec![
                            (ATTR_D, int(4)),
                            (ATTR_E, reference(INTEGER_ANSWER)),
                            (ATTR_DEFAULT_STYLE, reference(STYLE_DEFAULT)),
                        ],
                    ),
                )
                .entry(
                    2,
                    3,
                    any(),
                    EntryBuilder::bag(3, STYLE_THEME, vec![(ATTR_D, int(40))]),
                )
                .entry(2, 4, any(), EntryBuilder::bag(4, 0, chain))
                .entry(3, 0, any(), EntryBuilder::value(5, int(42))),
        )
        .build();

    let mut assets = AssetManager::new();
    assets.set_apk_assets(vec![ApkAssets::load("app.arsc", &data, false).unwrap()]);
    assets
}

#[test]
fn theme_inherits_and_keeps_first_value() {
    let assets = assets();
    let mut theme = assets.new_theme();

    theme.apply_style(STYLE_THEME_CHILD, false).unwrap();
    theme.apply_style(STYLE_THEME, false).unwrap();

    // child's own value, the parent's later application doesn't replace it
    assert_eq!(theme.get_attribute(ATTR_D).unwrap().value, int(40));
    assert_eq!(theme.get_attribute(ATTR_E).unwrap().value, reference(INTEGER_ANSWER));

    theme.apply_style(STYLE_THEME, true).unwrap();
    assert_eq!(theme.get_attribute(ATTR_D).unwrap().value, int(4));
}

#[test]
fn theme_resolves_references() {
    let assets = assets();
    let mut theme = assets.new_theme();
    theme.apply_style(STYLE_THEME, false).unwrap();

    let resolved = theme.resolve_attribute(ATTR_E).unwrap();
    assert_eq!(resolved.value, int(42));
    assert_eq!(resolved.resid, INTEGER_ANSWER);
    assert_eq!(resolved.cookie, Some(Cookie(0)));

    let resolved = theme
        .resolve_attribute_reference(restable::SelectedValue::from_value(attribute(ATTR_E)))
        .unwrap();
    assert_eq!(resolved.value, int(42));
}

#[test]
fn attribute_loop_hits_the_limit() {
    let assets = assets();
    let mut theme = assets.new_theme();
    theme.apply_style(STYLE_CHAIN, false).unwrap();

    assert!(matches!(
        theme.get_attribute(0x7f01_0100),
        Err(LookupError::ResolutionLimitExceeded(_))
    ));
}

#[test]
fn themes_of_different_managers_dont_mix() {
    let first = assets();
    let second = assets();

    let mut theme = first.new_theme();
    theme.apply_style(STYLE_THEME, false).unwrap();

    let mut other = second.new_theme();
    assert_eq!(other.set_to(&theme), Err(ThemeError::DifferentAssetManager));

    let mut same = first.new_theme();
    same.set_to(&theme).unwrap();
    assert_eq!(same.get_attribute(ATTR_D).unwrap().value, int(4));
    assert_eq!(same.changing_configurations(), theme.changing_configurations());
}

#[test]
fn apply_style_source_order() {
    let assets = assets();
    let mut theme = assets.new_theme();
    theme.apply_style(STYLE_THEME, false).unwrap();

    let tree = XmlTree::load(
        &XmlBuilder::new("View")
            .attribute(ATTR_A, "a", int(1))
            .style(reference(STYLE_TAG))
            .build(),
    )
    .unwrap();
    let mut parser = tree.parser(None);
    parser.next_element().unwrap();

    let attrs = [ATTR_A, ATTR_B, ATTR_C, ATTR_D, ATTR_E, ATTR_F, 0x7f01_0050];
    let out = apply_style(&theme, Some(&parser), ATTR_DEFAULT_STYLE, 0, &attrs);

    let values: Vec<ResValue> = out.values.iter().map(|v| v.value).collect();
    assert_eq!(
        values,
        vec![
            int(1),
            int(2),
            int(3),
            int(4),
            int(42),
            ResValue::null(),
            ResValue::null(),
        ]
    );
    assert_eq!(out.indices, vec![0, 1, 2, 3, 4]);

    // tag attributes have no cookie, everything else came from the table
    assert_eq!(out.values[0].cookie, None);
    assert_eq!(out.values[1].cookie, Some(Cookie(0)));
    assert_eq!(out.values[1].source_resource_id, STYLE_TAG);
    assert_eq!(out.values[2].source_resource_id, STYLE_DEFAULT);
    assert_eq!(out.values[4].resource_id, INTEGER_ANSWER);

    // @null clears the cookie
    assert_eq!(out.values[5].cookie, None);
}

#[test]
fn apply_style_without_a_tag() {
    let assets = assets();
    let theme = assets.new_theme();

    let out = apply_style(&theme, None, 0, STYLE_DEFAULT, &[ATTR_B, ATTR_C, ATTR_D]);
    assert_eq!(out.values[0].value, int(200));
    assert_eq!(out.values[1].value, int(3));
    assert_eq!(out.indices, vec![0, 1]);
}

#[test]
fn resolve_attrs_from_code() {
    let assets = assets();
    let mut theme = assets.new_theme();
    theme.apply_style(STYLE_THEME, false).unwrap();

    let out = resolve_attrs(
        &theme,
        0,
        STYLE_DEFAULT,
        &[ATTR_E, 0, 0, 0],
        &[ATTR_A, ATTR_C, ATTR_D, ATTR_F],
    );

    assert_eq!(out.values[0].value, int(42));
    assert_eq!(out.values[1].value, int(3));
    assert_eq!(out.values[1].source_resource_id, STYLE_DEFAULT);
    assert_eq!(out.values[2].value, int(4));
    assert_eq!(out.values[3].value, ResValue::null());
    assert_eq!(out.indices, vec![0, 1, 2]);
}

#[test]
fn retrieve_attributes_uses_the_tag_only() {
    let assets = assets();

    let tree = XmlTree::load(
        &XmlBuilder::new("View")
            .attribute(ATTR_A, "a", int(1))
            .attribute(ATTR_C, "c", reference(INTEGER_ANSWER))
            .attribute(ATTR_D, "d", reference(0))
            .build(),
    )
    .unwrap();
    let mut parser = tree.parser(None);
    parser.next_element().unwrap();

    let out = retrieve_attributes(&assets, &parser, &[ATTR_A, ATTR_B, ATTR_C, ATTR_D]);

    assert_eq!(out.values[0].value, int(1));
    assert_eq!(out.values[1].value, ResValue::null());
    assert_eq!(out.values[2].value, int(42));
    assert_eq!(out.values[2].resource_id, INTEGER_ANSWER);
    assert_eq!(out.values[3].value, ResValue::null());
    assert_eq!(out.indices, vec![0, 2]);
}

/// `integer/0` points at the missing `integer/1`, `integer/2` starts a chain
/// longer than the iteration cap
fn broken_chain_assets() -> AssetManager {
    const FIRST: u32 = 0x7f03_0000;
    const CHAIN: u32 = 0x7f03_0002;

    let mut package = PackageBuilder::new(0x7f, "com.example.app")
        .type_names(&["attr", "style", "integer"])
        .keys(&["Tag", "Theme", "value"])
        .entry(
            2,
            0,
            any(),
            EntryBuilder::bag(
                0,
                0,
                vec![(ATTR_A, reference(FIRST)), (ATTR_B, reference(CHAIN))],
            ),
        )
        .entry(2, 1, any(), EntryBuilder::bag(1, 0, vec![(ATTR_C, reference(FIRST))]))
        .entry(3, 0, any(), EntryBuilder::value(2, reference(FIRST + 1)))
        .spec_flags(3, 0, ResTableConfigFlags::CONFIG_DENSITY.bits());

    for entry_id in 2..30u16 {
        package = package.entry(
            3,
            entry_id,
            any(),
            EntryBuilder::value(2, reference(0x7f03_0000 + entry_id as u32 + 1)),
        );
    }
    package = package.entry(3, 30, any(), EntryBuilder::value(2, int(7)));

    let data = TableBuilder::new().package(package).build();
    let mut assets = AssetManager::new();
    assets.set_apk_assets(vec![ApkAssets::load("app.arsc", &data, false).unwrap()]);
    assets
}

#[test]
fn failed_chase_keeps_the_last_reference_reached() {
    let assets = broken_chain_assets();
    let mut theme = assets.new_theme();
    theme.apply_style(0x7f02_0001, false).unwrap();

    let tree =
        XmlTree::load(&XmlBuilder::new("View").style(reference(0x7f02_0000)).build()).unwrap();
    let mut parser = tree.parser(None);
    parser.next_element().unwrap();

    let out = apply_style(&theme, Some(&parser), 0, 0, &[ATTR_A, ATTR_C]);

    // from the tag's style: stops at the missing resource, keeps the style's cookie
    let from_style = out.values[0];
    assert_eq!(from_style.value, reference(0x7f03_0001));
    assert_eq!(from_style.resource_id, 0x7f03_0001);
    assert_eq!(from_style.cookie, Some(Cookie(0)));
    assert!(
        from_style
            .changing_configurations
            .contains(ResTableConfigFlags::CONFIG_DENSITY)
    );

    // from the theme: same value, the theme's cookie is dropped
    let from_theme = out.values[1];
    assert_eq!(from_theme.value, reference(0x7f03_0001));
    assert_eq!(from_theme.cookie, None);
    assert_eq!(out.indices, vec![0, 1]);

    assert_eq!(
        assets.resolve_reference(restable::SelectedValue::from_value(reference(0x7f03_0000))),
        Err(LookupError::NotFound(0x7f03_0001))
    );
}

#[test]
fn chase_over_the_limit_keeps_the_value_reached() {
    let assets = broken_chain_assets();
    let theme = assets.new_theme();

    let out = resolve_attrs(&theme, 0, 0x7f02_0000, &[], &[ATTR_B]);

    // twenty references followed from integer/2
    let resolved = out.values[0];
    assert_eq!(resolved.value, reference(0x7f03_0016));
    assert_eq!(resolved.resource_id, 0x7f03_0015);
    assert_eq!(resolved.cookie, Some(Cookie(0)));
    assert_eq!(out.indices, vec![0]);

    let unresolved = assets
        .follow_references(restable::SelectedValue::from_value(reference(0x7f03_0002)))
        .unwrap_err();
    assert_eq!(unresolved.error, LookupError::ResolutionLimitExceeded(0x7f03_0016));
    assert_eq!(unresolved.reached.value, reference(0x7f03_0016));
}
