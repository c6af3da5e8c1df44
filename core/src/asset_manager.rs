//! Resource lookups across an ordered set of loaded tables.
//!
//! See: https://cs.android.com/android/platform/superproject/+/android-9.0.0_r1:frameworks/base/libs/androidfw/AssetManager2.cpp

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use log::{debug, error, warn};
use restable_arsc::dynamic_ref::APP_PACKAGE_ID;
use restable_arsc::structs::{
    ResTableConfig, ResTableConfigFlags, ResTableEntry, ResTableType, ResValue, ResourceValueType,
    is_valid_resource_id, split_resource_id,
};
use restable_arsc::{DynamicRefTable, LoadedPackage};

use crate::apk_assets::ApkAssets;
use crate::bag::ResolvedBag;
use crate::errors::LookupError;
use crate::resource_name::{ResourceName, ResourceNameRef};
use crate::theme::Theme;

/// Upper bound for reference and attribute chains
pub const MAX_ITERATIONS: usize = 20;

/// Index of an [`ApkAssets`] in the order they were given to the [`AssetManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cookie(pub usize);

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A value together with where it came from and what it depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedValue {
    /// Assets the value was read from, `None` for values that didn't come from a table
    pub cookie: Option<Cookie>,

    pub value: ResValue,

    /// Configuration of the variant the value was picked from
    pub config: ResTableConfig,

    /// Configuration axes that can change this value
    pub flags: ResTableConfigFlags,

    /// Last reference followed to reach `value`, 0 if none
    pub resid: u32,
}

impl SelectedValue {
    /// Undefined null value without provenance
    pub fn empty() -> SelectedValue {
        SelectedValue::from_value(ResValue::null())
    }

    pub fn from_value(value: ResValue) -> SelectedValue {
        SelectedValue {
            cookie: None,
            value,
            config: ResTableConfig::default(),
            flags: ResTableConfigFlags::empty(),
            resid: 0,
        }
    }
}

/// Where following references stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unresolved {
    /// Last value reached before `error`
    pub reached: SelectedValue,
    pub error: LookupError,
}

/// Best entry for a resource id under the current configuration
#[derive(Debug, Clone, Copy)]
pub struct FindEntryResult<'a> {
    pub cookie: Cookie,
    pub entry: &'a ResTableEntry,

    /// Configuration of the variant the entry was picked from
    pub config: ResTableConfig,

    /// Flags of every package in the group that defines the entry, ORed together
    pub type_flags: ResTableConfigFlags,

    /// Package the entry was picked from
    pub package: &'a LoadedPackage,

    /// Index of the type name in the type string pool of `package`
    pub type_string_idx: usize,

    /// Translates references inside the entry
    pub dynamic_ref_table: &'a DynamicRefTable,
}

impl FindEntryResult<'_> {
    pub fn type_name(&self) -> Option<String> {
        self.package
            .type_string_pool()?
            .string_at(self.type_string_idx)
    }

    pub fn entry_name(&self) -> Option<String> {
        self.package
            .key_string_pool()?
            .string_at(self.entry.key() as usize)
    }
}

/// Indices of the variants of one type that match the current configuration
#[derive(Debug, Clone, Default)]
struct FilteredConfigGroup {
    types: Vec<usize>,
}

#[derive(Debug)]
struct ConfiguredPackage {
    assets: Arc<ApkAssets>,
    package_idx: usize,

    /// By package local type index
    filtered_configs: Vec<FilteredConfigGroup>,
}

impl ConfiguredPackage {
    #[inline]
    fn package(&self) -> &LoadedPackage {
        &self.assets.loaded_arsc().packages()[self.package_idx]
    }
}

/// Packages sharing one runtime package id, the base package first and its
/// overlays after it
#[derive(Debug)]
struct PackageGroup {
    packages: Vec<ConfiguredPackage>,
    cookies: Vec<Cookie>,
    dynamic_ref_table: DynamicRefTable,
}

/// Candidate picked while walking the variants of a type
#[derive(Clone, Copy)]
struct Candidate<'a> {
    package_idx: usize,
    ty: &'a ResTableType,
    entry: &'a ResTableEntry,
}

/// Lookups over an ordered list of [`ApkAssets`].
///
/// Later assets take precedence over earlier ones only through overlays,
/// regular packages are looked up by their runtime package id.
#[derive(Debug)]
pub struct AssetManager {
    apk_assets: Vec<Arc<ApkAssets>>,
    package_groups: Vec<PackageGroup>,

    /// Runtime package id to index in `package_groups`, 0xff if unused
    package_ids: [u8; 256],

    configuration: ResTableConfig,

    pub(crate) cached_bags: RefCell<AHashMap<u32, Arc<ResolvedBag>>>,
}

impl Default for AssetManager {
    fn default() -> Self {
        AssetManager::new()
    }
}

impl AssetManager {
    pub fn new() -> AssetManager {
        AssetManager {
            apk_assets: Vec::new(),
            package_groups: Vec::new(),
            package_ids: [0xff; 256],
            configuration: ResTableConfig::default(),
            cached_bags: RefCell::new(AHashMap::new()),
        }
    }

    /// Replace the assets to look resources up in, assigns runtime ids to
    /// shared libraries and drops every cached bag
    pub fn set_apk_assets(&mut self, apk_assets: Vec<Arc<ApkAssets>>) {
        self.apk_assets = apk_assets;
        self.build_dynamic_ref_table();
        self.rebuild_filter_list();
        self.invalidate_caches(ResTableConfigFlags::EVERYTHING);
    }

    #[inline]
    pub fn apk_assets(&self) -> &[Arc<ApkAssets>] {
        &self.apk_assets
    }

    fn build_dynamic_ref_table(&mut self) {
        self.package_groups.clear();
        self.package_ids = [0xff; 256];

        // 0x01 belongs to the framework, 0x7f to the app
        let mut next_package_id = 0x02u32;

        for (cookie, assets) in self.apk_assets.iter().enumerate() {
            for (package_idx, package) in assets.loaded_arsc().packages().iter().enumerate() {
                let package_id = if package.is_dynamic() {
                    if next_package_id > u8::MAX as u32 {
                        error!(
                            "no runtime package ID left for shared library {}",
                            package.package_name()
                        );
                        continue;
                    }
                    let assigned = next_package_id as u8;
                    next_package_id += 1;
                    assigned
                } else {
                    package.package_id()
                };

                let group_idx = match self.package_ids[package_id as usize] {
                    0xff => {
                        self.package_ids[package_id as usize] = self.package_groups.len() as u8;
                        self.package_groups.push(PackageGroup {
                            packages: Vec::new(),
                            cookies: Vec::new(),
                            dynamic_ref_table: DynamicRefTable::new(
                                package_id,
                                package.is_dynamic() && package.package_id() == APP_PACKAGE_ID,
                            ),
                        });
                        self.package_groups.len() - 1
                    }
                    idx => idx as usize,
                };

                let group = &mut self.package_groups[group_idx];
                group.packages.push(ConfiguredPackage {
                    assets: Arc::clone(assets),
                    package_idx,
                    filtered_configs: Vec::new(),
                });
                group.cookies.push(Cookie(cookie));

                for library in package.dynamic_package_map() {
                    group
                        .dynamic_ref_table
                        .add_entry(&library.package_name, library.package_id);
                }
            }
        }

        // every group can reference every other group by name
        let assigned: Vec<(String, u8)> = self
            .package_groups
            .iter()
            .map(|group| {
                (
                    group.packages[0].package().package_name().to_owned(),
                    group.dynamic_ref_table.assigned_package_id(),
                )
            })
            .collect();

        for group in &mut self.package_groups {
            for (name, package_id) in &assigned {
                group.dynamic_ref_table.add_mapping(name, *package_id);
            }
        }
    }

    /// Current configuration
    #[inline]
    pub fn configuration(&self) -> &ResTableConfig {
        &self.configuration
    }

    /// Switch to `configuration`, cached bags depending on a changed axis are dropped
    pub fn set_configuration(&mut self, configuration: ResTableConfig) {
        let diff = self.configuration.diff(&configuration);
        self.configuration = configuration;

        if !diff.is_empty() {
            self.rebuild_filter_list();
            self.invalidate_caches(diff);
        }
    }

    fn rebuild_filter_list(&mut self) {
        let configuration = self.configuration;

        for group in &mut self.package_groups {
            for configured in &mut group.packages {
                let filtered = filter_configs(configured.package(), &configuration);
                configured.filtered_configs = filtered;
            }
        }
    }

    fn invalidate_caches(&self, diff: ResTableConfigFlags) {
        let mut cache = self.cached_bags.borrow_mut();

        if diff == ResTableConfigFlags::EVERYTHING {
            cache.clear();
            return;
        }

        cache.retain(|_, bag| !bag.type_spec_flags.intersects(diff));
    }

    /// Create an empty theme bound to this asset manager
    #[inline]
    pub fn new_theme(&self) -> Theme<'_> {
        Theme::new(self)
    }

    /// Runtime package id of the loaded package called `package_name`
    pub fn package_id_of(&self, package_name: &str) -> Option<u8> {
        self.package_groups
            .iter()
            .find(|group| group.packages[0].package().package_name() == package_name)
            .map(|group| group.dynamic_ref_table.assigned_package_id())
    }

    pub fn get_dynamic_ref_table_for_package(&self, package_id: u8) -> Option<&DynamicRefTable> {
        match self.package_ids[package_id as usize] {
            0xff => None,
            idx => Some(&self.package_groups[idx as usize].dynamic_ref_table),
        }
    }

    /// Translation table of the group the assets behind `cookie` were loaded into
    pub fn get_dynamic_ref_table_for_cookie(&self, cookie: Cookie) -> Option<&DynamicRefTable> {
        self.package_groups
            .iter()
            .find(|group| group.cookies.contains(&cookie))
            .map(|group| &group.dynamic_ref_table)
    }

    /// Every configuration some resource is defined for
    pub fn get_resource_configurations(
        &self,
        exclude_system: bool,
        exclude_mipmap: bool,
    ) -> Vec<ResTableConfig> {
        let mut out: Vec<ResTableConfig> = Vec::new();

        for configured in self.package_groups.iter().flat_map(|g| g.packages.iter()) {
            let package = configured.package();
            if exclude_system && package.is_system() {
                continue;
            }

            for config in package.collect_configurations(exclude_mipmap) {
                if !out.contains(&config) {
                    out.push(config);
                }
            }
        }

        out
    }

    /// BCP-47 tags of every locale some resource is defined for
    pub fn get_resource_locales(&self, exclude_system: bool, canonicalize: bool) -> BTreeSet<String> {
        self.package_groups
            .iter()
            .flat_map(|g| g.packages.iter())
            .map(ConfiguredPackage::package)
            .filter(|package| !(exclude_system && package.is_system()))
            .flat_map(|package| package.collect_locales(canonicalize))
            .collect()
    }

    /// Find the entry that best matches the current configuration.
    ///
    /// A non-zero `density_override` replaces the configured density for this lookup only.
    pub fn find_entry(
        &self,
        resid: u32,
        density_override: u16,
    ) -> Result<FindEntryResult<'_>, LookupError> {
        if !is_valid_resource_id(resid) {
            error!("invalid ID 0x{:08x}", resid);
            return Err(LookupError::InvalidResourceId(resid));
        }

        // filtered variants are only valid for the configured density
        let use_fast_path =
            density_override == 0 || density_override == self.configuration.density;
        let desired = if use_fast_path {
            self.configuration
        } else {
            ResTableConfig {
                density: density_override,
                ..self.configuration
            }
        };

        let (package_id, type_id, entry_idx) = split_resource_id(resid);
        let type_idx = type_id as usize - 1;

        let group_idx = self.package_ids[package_id as usize];
        if group_idx == 0xff {
            error!("no package ID {:02x} found for ID 0x{:08x}", package_id, resid);
            return Err(LookupError::InvalidResourceId(resid));
        }
        let group = &self.package_groups[group_idx as usize];

        let mut best: Option<Candidate<'_>> = None;
        let mut type_flags = ResTableConfigFlags::empty();

        for (pi, configured) in group.packages.iter().enumerate() {
            let package = configured.package();

            let Some(local_type_idx) = type_idx.checked_sub(package.type_id_offset() as usize)
            else {
                continue;
            };
            let Some(spec) = package.type_spec_by_index(local_type_idx) else {
                continue;
            };

            let mut local_entry_idx = entry_idx;
            if let Some(idmap_entries) = &spec.idmap_entries {
                match idmap_entries.lookup(local_entry_idx) {
                    Some(idx) => local_entry_idx = idx,
                    // not overlaid by this package
                    None => continue,
                }
            }

            type_flags |= spec.flags(local_entry_idx);

            let candidates = Candidates {
                package_idx: pi,
                entry_idx: local_entry_idx,
                overlay: package.is_overlay(),
                desired: &desired,
            };

            if use_fast_path {
                let Some(filtered) = configured.filtered_configs.get(local_type_idx) else {
                    continue;
                };
                candidates.select(
                    &mut best,
                    filtered.types.iter().filter_map(|&idx| spec.types.get(idx)),
                );
            } else {
                candidates.select(
                    &mut best,
                    spec.types.iter().filter(|ty| ty.config.matches(&desired)),
                );
            }
        }

        let Some(best) = best else {
            debug!("no entry for 0x{:08x}", resid);
            return Err(LookupError::NotFound(resid));
        };

        let configured = &group.packages[best.package_idx];
        Ok(FindEntryResult {
            cookie: group.cookies[best.package_idx],
            entry: best.entry,
            config: best.ty.config,
            type_flags,
            package: configured.package(),
            type_string_idx: best.ty.id as usize - 1,
            dynamic_ref_table: &group.dynamic_ref_table,
        })
    }

    /// Value of a resource.
    ///
    /// Bags can't be expressed as a single value, they come back as a reference
    /// to themselves if `may_be_bag` is set and as [`LookupError::NotFound`] otherwise.
    pub fn get_resource(
        &self,
        resid: u32,
        may_be_bag: bool,
        density_override: u16,
    ) -> Result<SelectedValue, LookupError> {
        let entry = self.find_entry(resid, density_override)?;

        let value = match entry.entry {
            ResTableEntry::Complex { .. } => {
                if !may_be_bag {
                    error!("resource 0x{:08x} is a complex map type", resid);
                    return Err(LookupError::NotFound(resid));
                }
                ResValue::new(ResourceValueType::Reference, resid)
            }
            ResTableEntry::Simple { value, .. } => entry
                .dynamic_ref_table
                .lookup_resource_value(*value)
                .unwrap_or(*value),
        };

        Ok(SelectedValue {
            cookie: Some(entry.cookie),
            value,
            config: entry.config,
            flags: entry.type_flags,
            resid: 0,
        })
    }

    /// Follow references until a value that isn't one.
    ///
    /// Flags of every step are ORed into the result. A reference resolving to
    /// itself is returned as is, `@null` is never followed.
    pub fn resolve_reference(&self, selected: SelectedValue) -> Result<SelectedValue, LookupError> {
        self.follow_references(selected).map_err(|unresolved| unresolved.error)
    }

    /// Like [`AssetManager::resolve_reference`], but a failure keeps the last value reached.
    ///
    /// That value carries the flags and configuration of every step that
    /// succeeded, its `resid` is the reference that couldn't be followed.
    pub fn follow_references(&self, selected: SelectedValue) -> Result<SelectedValue, Unresolved> {
        let mut selected = SelectedValue { resid: 0, ..selected };

        for _ in 0..MAX_ITERATIONS {
            if selected.value.data_type != ResourceValueType::Reference || selected.value.data == 0
            {
                return Ok(selected);
            }

            let resid = selected.value.data;
            selected.resid = resid;

            let resolved = match self.get_resource(resid, true, 0) {
                Ok(resolved) => resolved,
                Err(error) => {
                    return Err(Unresolved {
                        reached: selected,
                        error,
                    });
                }
            };
            selected = SelectedValue {
                flags: selected.flags | resolved.flags,
                resid,
                ..resolved
            };

            if selected.value.data == resid {
                // can't be resolved any further
                return Ok(selected);
            }
        }

        if selected.value.data_type == ResourceValueType::Reference && selected.value.data != 0 {
            warn!(
                "gave up resolving 0x{:08x} after {} references",
                selected.value.data, MAX_ITERATIONS
            );
            return Err(Unresolved {
                reached: selected,
                error: LookupError::ResolutionLimitExceeded(selected.value.data),
            });
        }

        Ok(selected)
    }

    /// `package:type/entry` name of a resource
    pub fn get_resource_name(&self, resid: u32) -> Result<ResourceName, LookupError> {
        let entry = self.find_entry(resid, 0)?;

        let type_ = entry.type_name().ok_or(LookupError::NotFound(resid))?;
        let entry_name = entry.entry_name().ok_or(LookupError::NotFound(resid))?;

        Ok(ResourceName {
            package: entry.package.package_name().to_owned(),
            type_,
            entry: entry_name,
        })
    }

    /// Configuration axes the value of a resource varies with
    pub fn get_resource_flags(&self, resid: u32) -> Result<ResTableConfigFlags, LookupError> {
        self.find_entry(resid, 0).map(|entry| entry.type_flags)
    }

    /// Id of a resource by `[package:][type/]entry` name.
    ///
    /// Missing parts of the name are taken from `fallback_type` and
    /// `fallback_package`. Attributes not found under `attr` are looked up
    /// under `^attr-private` as well.
    pub fn get_resource_id(
        &self,
        name: &str,
        fallback_type: &str,
        fallback_package: &str,
    ) -> Option<u32> {
        let parsed = ResourceNameRef::parse(name)?;
        if parsed.entry.is_empty() {
            return None;
        }

        let package_name = match parsed.package {
            "" => fallback_package,
            package => package,
        };
        let type_name = match parsed.type_ {
            "" => fallback_type,
            type_ => type_,
        };

        for group in &self.package_groups {
            for configured in &group.packages {
                let package = configured.package();
                // packages of a group share their name
                if package.package_name() != package_name {
                    break;
                }

                let resid = package
                    .find_entry_by_name(type_name, parsed.entry)
                    .or_else(|| match type_name {
                        "attr" => package.find_entry_by_name("^attr-private", parsed.entry),
                        _ => None,
                    });

                if let Some(resid) = resid {
                    let package_id = group.dynamic_ref_table.assigned_package_id() as u32;
                    return Some((resid & 0x00ff_ffff) | (package_id << 24));
                }
            }
        }

        None
    }
}

/// Variant selection inside one package
struct Candidates<'c> {
    package_idx: usize,
    entry_idx: u16,
    overlay: bool,
    desired: &'c ResTableConfig,
}

impl Candidates<'_> {
    /// Replace `best` with a better variant that defines the entry.
    ///
    /// Overlays win over variants with an equal configuration.
    fn select<'a>(
        &self,
        best: &mut Option<Candidate<'a>>,
        types: impl Iterator<Item = &'a ResTableType>,
    ) {
        for ty in types {
            let replace = match best {
                None => true,
                Some(current) => {
                    ty.config.is_better_than(&current.ty.config, Some(self.desired))
                        || (self.overlay && ty.config.compare(&current.ty.config) == Ordering::Equal)
                }
            };

            if !replace {
                continue;
            }

            let Some(entry) = ty.entry(self.entry_idx) else {
                continue;
            };

            *best = Some(Candidate {
                package_idx: self.package_idx,
                ty,
                entry,
            });
        }
    }
}

fn filter_configs(package: &LoadedPackage, configuration: &ResTableConfig) -> Vec<FilteredConfigGroup> {
    let mut filtered: Vec<FilteredConfigGroup> = Vec::new();

    for (type_idx, spec) in package.type_specs() {
        if filtered.len() <= type_idx {
            filtered.resize_with(type_idx + 1, FilteredConfigGroup::default);
        }

        filtered[type_idx].types = spec
            .types
            .iter()
            .enumerate()
            .filter(|(_, ty)| ty.config.matches(configuration))
            .map(|(idx, _)| idx)
            .collect();
    }

    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use restable_arsc::testing::{EntryBuilder, PackageBuilder, TableBuilder};

    fn string(idx: u32) -> ResValue {
        ResValue::new(ResourceValueType::String, idx)
    }

    fn int(data: u32) -> ResValue {
        ResValue::new(ResourceValueType::Dec, data)
    }

    fn load(data: &[u8]) -> AssetManager {
        let mut assets = AssetManager::new();
        assets.set_apk_assets(vec![ApkAssets::load("base.arsc", data, false).unwrap()]);
        assets
    }

    fn app() -> PackageBuilder {
        PackageBuilder::new(0x7f, "com.example.app")
            .type_names(&["attr", "string", "integer"])
            .keys(&["colorPrimary", "app_name", "answer", "other"])
    }

    #[test]
    fn invalid_ids() {
        let assets = load(&TableBuilder::new().package(app()).build());

        assert_eq!(
            assets.find_entry(0x7f00_0001, 0).unwrap_err(),
            LookupError::InvalidResourceId(0x7f00_0001)
        );
        assert_eq!(
            assets.find_entry(0x0201_0000, 0).unwrap_err(),
            LookupError::InvalidResourceId(0x0201_0000)
        );
    }

    #[test]
    fn simple_value() {
        let data = TableBuilder::new()
            .strings(&["Example"])
            .package(app().entry(2, 0, ResTableConfig::default(), EntryBuilder::value(1, string(0))))
            .build();
        let assets = load(&data);

        let value = assets.get_resource(0x7f02_0000, false, 0).unwrap();
        assert_eq!(value.cookie, Some(Cookie(0)));
        assert_eq!(value.value, string(0));

        assert_eq!(
            assets.get_resource(0x7f02_0001, false, 0).unwrap_err(),
            LookupError::NotFound(0x7f02_0001)
        );
    }

    #[test]
    fn bag_as_value() {
        let data = TableBuilder::new()
            .package(app().entry(
                2,
                0,
                ResTableConfig::default(),
                EntryBuilder::bag(1, 0, vec![(0x7f01_0000, int(1))]),
            ))
            .build();
        let assets = load(&data);

        let value = assets.get_resource(0x7f02_0000, true, 0).unwrap();
        assert_eq!(value.value, ResValue::new(ResourceValueType::Reference, 0x7f02_0000));
        assert!(assets.get_resource(0x7f02_0000, false, 0).is_err());
    }

    #[test]
    fn type_flags_are_reported() {
        let land = ResTableConfig {
            orientation: ResTableConfig::ORIENTATION_LAND,
            ..Default::default()
        };
        let data = TableBuilder::new()
            .package(
                app()
                    .entry(3, 0, ResTableConfig::default(), EntryBuilder::value(2, int(1)))
                    .entry(3, 0, land, EntryBuilder::value(2, int(2)))
                    .spec_flags(3, 0, ResTableConfigFlags::CONFIG_ORIENTATION.bits()),
            )
            .build();
        let mut assets = load(&data);

        assert_eq!(
            assets.get_resource_flags(0x7f03_0000).unwrap(),
            ResTableConfigFlags::CONFIG_ORIENTATION
        );
        assert_eq!(assets.get_resource(0x7f03_0000, false, 0).unwrap().value, int(1));

        assets.set_configuration(land);
        let value = assets.get_resource(0x7f03_0000, false, 0).unwrap();
        assert_eq!(value.value, int(2));
        assert_eq!(value.config, land);
    }

    #[test]
    fn density_override() {
        let hdpi = ResTableConfig {
            density: ResTableConfig::DENSITY_HIGH,
            ..Default::default()
        };
        let data = TableBuilder::new()
            .package(
                app()
                    .entry(3, 0, ResTableConfig::default(), EntryBuilder::value(2, int(1)))
                    .entry(3, 0, hdpi, EntryBuilder::value(2, int(2))),
            )
            .build();
        let assets = load(&data);

        assert_eq!(assets.get_resource(0x7f03_0000, false, 0).unwrap().value, int(1));
        assert_eq!(
            assets
                .get_resource(0x7f03_0000, false, ResTableConfig::DENSITY_HIGH)
                .unwrap()
                .value,
            int(2)
        );
        // the configuration itself is untouched
        assert_eq!(assets.configuration().density, 0);
    }

    #[test]
    fn reference_chain() {
        let reference = |resid| ResValue::new(ResourceValueType::Reference, resid);
        let data = TableBuilder::new()
            .package(
                app()
                    .entry(3, 0, ResTableConfig::default(), EntryBuilder::value(2, reference(0x7f03_0001)))
                    .entry(3, 1, ResTableConfig::default(), EntryBuilder::value(3, reference(0x7f03_0002)))
                    .entry(3, 2, ResTableConfig::default(), EntryBuilder::value(3, int(42))),
            )
            .build();
        let assets = load(&data);

        let resolved = assets
            .resolve_reference(SelectedValue::from_value(reference(0x7f03_0000)))
            .unwrap();
        assert_eq!(resolved.value, int(42));
        assert_eq!(resolved.resid, 0x7f03_0002);
        assert_eq!(resolved.cookie, Some(Cookie(0)));
    }

    #[test]
    fn null_reference_is_not_followed() {
        let assets = load(&TableBuilder::new().package(app()).build());
        let null = SelectedValue::from_value(ResValue::new(ResourceValueType::Reference, 0));
        assert_eq!(assets.resolve_reference(null).unwrap(), null);
    }

    #[test]
    fn names_and_ids() {
        let data = TableBuilder::new()
            .package(
                app()
                    .entry(1, 0, ResTableConfig::default(), EntryBuilder::value(0, int(0)))
                    .entry(2, 0, ResTableConfig::default(), EntryBuilder::value(1, string(0))),
            )
            .build();
        let assets = load(&data);

        let name = assets.get_resource_name(0x7f02_0000).unwrap();
        assert_eq!(name.to_string(), "com.example.app:string/app_name");

        assert_eq!(
            assets.get_resource_id("com.example.app:string/app_name", "", ""),
            Some(0x7f02_0000)
        );
        assert_eq!(
            assets.get_resource_id("app_name", "string", "com.example.app"),
            Some(0x7f02_0000)
        );
        assert_eq!(
            assets.get_resource_id("@com.example.app:attr/colorPrimary", "", ""),
            Some(0x7f01_0000)
        );
        assert_eq!(assets.get_resource_id("android:string/app_name", "", ""), None);
        assert_eq!(assets.get_resource_id("com.example.app:string/", "", ""), None);
    }

    #[test]
    fn private_attributes() {
        let data = TableBuilder::new()
            .package(
                PackageBuilder::new(0x01, "android")
                    .type_names(&["attr", "^attr-private"])
                    .keys(&["internalLayout"])
                    .entry(2, 3, ResTableConfig::default(), EntryBuilder::value(0, int(0))),
            )
            .build();
        let assets = load(&data);

        assert_eq!(
            assets.get_resource_id("android:attr/internalLayout", "", ""),
            Some(0x0102_0003)
        );
    }

    #[test]
    fn shared_libraries_get_runtime_ids() {
        let lib = TableBuilder::new()
            .package(
                PackageBuilder::new(0x00, "com.example.lib")
                    .type_names(&["string"])
                    .keys(&["lib_name"])
                    .entry(1, 0, ResTableConfig::default(), EntryBuilder::value(0, string(0))),
            )
            .strings(&["Library"])
            .build();
        let app = TableBuilder::new()
            .package(
                app()
                    .library(0x10, "com.example.lib")
                    .entry(
                        3,
                        0,
                        ResTableConfig::default(),
                        EntryBuilder::value(
                            2,
                            ResValue::new(ResourceValueType::DynamicReference, 0x1001_0000),
                        ),
                    ),
            )
            .build();

        let mut assets = AssetManager::new();
        assets.set_apk_assets(vec![
            ApkAssets::load("lib.arsc", &lib, false).unwrap(),
            ApkAssets::load("app.arsc", &app, false).unwrap(),
        ]);

        assert_eq!(assets.package_id_of("com.example.lib"), Some(0x02));
        assert_eq!(assets.package_id_of("com.example.app"), Some(0x7f));
        assert_eq!(
            assets
                .get_dynamic_ref_table_for_cookie(Cookie(0))
                .map(DynamicRefTable::assigned_package_id),
            Some(0x02)
        );

        // the library is reachable under its runtime id
        let value = assets.get_resource(0x0201_0000, false, 0).unwrap();
        assert_eq!(value.cookie, Some(Cookie(0)));

        // and the app's dynamic reference is rewritten to it
        let value = assets.get_resource(0x7f03_0000, false, 0).unwrap();
        assert_eq!(value.value, ResValue::new(ResourceValueType::Reference, 0x0201_0000));

        assert_eq!(
            assets.get_resource_id("com.example.lib:string/lib_name", "", ""),
            Some(0x0201_0000)
        );
    }

    #[test]
    fn configurations_and_locales() {
        let mut fr = ResTableConfig::default();
        fr.set_bcp47_locale("fr-FR");
        let data = TableBuilder::new()
            .package(
                app()
                    .entry(2, 0, ResTableConfig::default(), EntryBuilder::value(1, string(0)))
                    .entry(2, 0, fr, EntryBuilder::value(1, string(0))),
            )
            .build();
        let assets = load(&data);

        assert_eq!(assets.get_resource_configurations(false, false).len(), 2);
        assert!(assets.get_resource_locales(false, false).contains("fr-FR"));
    }
}
