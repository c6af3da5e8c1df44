//! Loading of resource tables into an immutable, indexable form.
//!
//! Every chunk is validated once while loading, lookups afterwards only do
//! bounds checked indexing.
//!
//! See: https://cs.android.com/android/platform/superproject/+/android-9.0.0_r1:frameworks/base/libs/androidfw/LoadedArsc.cpp

use std::collections::{BTreeMap, BTreeSet};

use log::{error, warn};
use winnow::error::{ContextError, ErrMode};

use crate::chunk::{Chunk, ChunkIterator};
use crate::dynamic_ref::APP_PACKAGE_ID;
use crate::errors::ArscError;
use crate::idmap::{IdmapTypeMap, LoadedIdmap};
use crate::structs::{
    ResStringPool, ResTableConfig, ResTableConfigFlags, ResTableHeader, ResTableLibraryEntry,
    ResTablePackageHeader, ResTableType, ResTableTypeSpec, ResourceType, make_resource_id,
};

/// All configuration variants of one type, plus per entry flags
#[derive(Debug, Clone)]
pub struct TypeSpec {
    /// Type id as written in the package, overlays keep their own id here
    pub id: u8,

    /// Which configuration axes vary across the variants of each entry
    pub type_spec_flags: Vec<ResTableConfigFlags>,

    /// Target to overlay entry mapping, present only for overlay packages
    pub idmap_entries: Option<IdmapTypeMap>,

    pub types: Vec<ResTableType>,
}

impl TypeSpec {
    /// Flags of a package local entry, empty if out of range
    #[inline]
    pub fn flags(&self, entry_idx: u16) -> ResTableConfigFlags {
        self.type_spec_flags
            .get(entry_idx as usize)
            .copied()
            .unwrap_or_else(ResTableConfigFlags::empty)
    }

    #[inline]
    pub fn entry_count(&self) -> usize {
        self.type_spec_flags.len()
    }
}

/// Shared library a package was compiled against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicPackageEntry {
    pub package_name: String,

    /// Package id the library had at build time
    pub package_id: u8,
}

#[derive(Debug, Clone)]
pub struct LoadedPackage {
    package_name: String,
    package_id: u8,
    type_id_offset: u8,
    dynamic: bool,
    system: bool,
    overlay: bool,

    type_string_pool: Option<ResStringPool>,
    key_string_pool: Option<ResStringPool>,

    /// Indexed by type id - 1
    type_specs: Vec<Option<TypeSpec>>,

    dynamic_package_map: Vec<DynamicPackageEntry>,
}

impl LoadedPackage {
    /// Load a `RES_TABLE_PACKAGE_TYPE` chunk
    pub fn load(
        chunk: &Chunk<'_>,
        idmap: Option<&LoadedIdmap>,
        system: bool,
        load_as_shared_library: bool,
    ) -> Result<LoadedPackage, ArscError> {
        if chunk.header_size() < ResTablePackageHeader::min_size_of() {
            error!("RES_TABLE_PACKAGE_TYPE too small");
            return Err(ArscError::HeaderError("package"));
        }

        let header = ResTablePackageHeader::parse(&mut chunk.header_bytes())
            .map_err(|_: ErrMode<ContextError>| ArscError::HeaderError("package"))?;

        if header.id > u8::MAX as u32 {
            return Err(ArscError::InvalidPackage("package ID is too large"));
        }

        let mut package_id = header.id as u8;
        let dynamic =
            package_id == 0 || (package_id == APP_PACKAGE_ID && load_as_shared_library);

        let mut overlay = false;
        if let Some(idmap) = idmap {
            // overlay takes the place of its target
            package_id = idmap.target_package_id();
            overlay = true;
        }

        if header.type_id_offset > u8::MAX as u32 {
            error!("RES_TABLE_PACKAGE_TYPE type ID offset too large");
            return Err(ArscError::InvalidPackage("type ID offset is too large"));
        }
        let type_id_offset = header.type_id_offset as u8;

        let mut type_string_pool = None;
        let mut key_string_pool = None;
        let mut builders: BTreeMap<u8, TypeSpec> = BTreeMap::new();
        let mut dynamic_package_map = Vec::new();

        let mut iter = chunk.children();
        for child in iter.by_ref() {
            let Ok(child) = child else {
                break;
            };

            // pools are referenced by their offset from the package chunk
            let relative_offset = (child.offset() - chunk.offset()) as u32;

            match child.type_() {
                ResourceType::StringPool => {
                    if relative_offset == header.type_strings {
                        type_string_pool = Some(ResStringPool::load(child.bytes())?);
                    } else if relative_offset == header.key_strings {
                        key_string_pool = Some(ResStringPool::load(child.bytes())?);
                    } else {
                        warn!("too many RES_STRING_POOL_TYPEs found in RES_TABLE_PACKAGE_TYPE");
                    }
                }
                ResourceType::TableTypeSpec => {
                    let spec = ResTableTypeSpec::parse(&child)?;

                    if type_id_offset as usize + spec.id as usize > u8::MAX as usize {
                        error!("RES_TABLE_TYPE_SPEC_TYPE has out of range ID");
                        return Err(ArscError::InvalidTypeSpec(spec.id, "ID out of range"));
                    }

                    if builders.contains_key(&spec.id) {
                        warn!("RES_TABLE_TYPE_SPEC_TYPE already defined for ID {:02x}", spec.id);
                        continue;
                    }

                    let idmap_entries = idmap.and_then(|idmap| idmap.type_map(spec.id)).cloned();
                    builders.insert(
                        spec.id,
                        TypeSpec {
                            id: spec.id,
                            type_spec_flags: spec.type_spec_flags,
                            idmap_entries,
                            types: Vec::new(),
                        },
                    );
                }
                ResourceType::TableType => {
                    let ty = ResTableType::parse(&child)?;

                    match builders.get_mut(&ty.id) {
                        Some(builder) => builder.types.push(ty),
                        None => {
                            error!(
                                "RES_TABLE_TYPE_TYPE with ID {:02x} found without preceding RES_TABLE_TYPE_SPEC_TYPE",
                                ty.id
                            );
                            return Err(ArscError::InvalidType(ty.id, "missing type spec"));
                        }
                    }
                }
                ResourceType::TableLibrary => {
                    for entry in ResTableLibraryEntry::parse_chunk(&child)? {
                        dynamic_package_map.push(DynamicPackageEntry {
                            package_name: entry.package_name,
                            package_id: entry.package_id as u8,
                        });
                    }
                }
                other => {
                    warn!("unknown chunk type {:?} in package", other);
                }
            }
        }

        if let Some(e) = iter.error() {
            error!("{}", e);
            if e.is_fatal() {
                return Err(e.clone().into());
            }
        }

        let mut type_specs: Vec<Option<TypeSpec>> = Vec::new();
        for (id, spec) in builders {
            // with an idmap only types overlaying something are kept
            let type_idx = match (&spec.idmap_entries, idmap) {
                (Some(entries), _) => entries.target_type_id as usize - 1,
                (None, None) => id as usize - 1,
                (None, Some(_)) => continue,
            };

            if type_specs.len() <= type_idx {
                type_specs.resize_with(type_idx + 1, || None);
            }
            type_specs[type_idx] = Some(spec);
        }

        Ok(LoadedPackage {
            package_name: header.name(),
            package_id,
            type_id_offset,
            dynamic,
            system,
            overlay,
            type_string_pool,
            key_string_pool,
            type_specs,
            dynamic_package_map,
        })
    }

    #[inline]
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// Package id, 0 for shared libraries until assigned at runtime
    #[inline]
    pub fn package_id(&self) -> u8 {
        self.package_id
    }

    #[inline]
    pub fn type_id_offset(&self) -> u8 {
        self.type_id_offset
    }

    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    #[inline]
    pub fn is_system(&self) -> bool {
        self.system
    }

    #[inline]
    pub fn is_overlay(&self) -> bool {
        self.overlay
    }

    #[inline]
    pub fn type_string_pool(&self) -> Option<&ResStringPool> {
        self.type_string_pool.as_ref()
    }

    #[inline]
    pub fn key_string_pool(&self) -> Option<&ResStringPool> {
        self.key_string_pool.as_ref()
    }

    /// Type spec by 0-based type index, type offsets already removed
    #[inline]
    pub fn type_spec_by_index(&self, type_idx: usize) -> Option<&TypeSpec> {
        self.type_specs.get(type_idx).and_then(Option::as_ref)
    }

    /// Type specs with their 0-based type index
    pub fn type_specs(&self) -> impl Iterator<Item = (usize, &TypeSpec)> {
        self.type_specs
            .iter()
            .enumerate()
            .filter_map(|(idx, spec)| spec.as_ref().map(|spec| (idx, spec)))
    }

    #[inline]
    pub fn dynamic_package_map(&self) -> &[DynamicPackageEntry] {
        &self.dynamic_package_map
    }

    /// Package local id of `type_name/entry_name`, the package byte is left 0
    pub fn find_entry_by_name(&self, type_name: &str, entry_name: &str) -> Option<u32> {
        let type_idx = self.type_string_pool.as_ref()?.index_of_string(type_name)?;
        let key_idx = self.key_string_pool.as_ref()?.index_of_string(entry_name)? as u32;
        let spec = self.type_spec_by_index(type_idx)?;

        for ty in &spec.types {
            for (entry_idx, entry) in ty.entries.iter().enumerate() {
                if entry.as_ref().is_some_and(|entry| entry.key() == key_idx) {
                    let type_id = type_idx + self.type_id_offset as usize + 1;
                    return Some(make_resource_id(0, type_id as u8, entry_idx as u16));
                }
            }
        }

        None
    }

    /// Every distinct configuration with at least one variant.
    ///
    /// `mipmap` types are skipped if `exclude_mipmap` is set.
    pub fn collect_configurations(&self, exclude_mipmap: bool) -> Vec<ResTableConfig> {
        let mut out: Vec<ResTableConfig> = Vec::new();

        for (type_idx, spec) in self.type_specs() {
            if exclude_mipmap {
                let name = self
                    .type_string_pool
                    .as_ref()
                    .and_then(|pool| pool.string_at(type_idx));
                if name.as_deref() == Some("mipmap") {
                    continue;
                }
            }

            for ty in &spec.types {
                if !out.contains(&ty.config) {
                    out.push(ty.config);
                }
            }
        }

        out
    }

    /// BCP-47 tags of every locale some variant is defined for
    pub fn collect_locales(&self, canonicalize: bool) -> BTreeSet<String> {
        self.type_specs()
            .flat_map(|(_, spec)| spec.types.iter())
            .filter(|ty| ty.config.locale() != 0)
            .map(|ty| ty.config.bcp47_locale(canonicalize))
            .collect()
    }
}

/// Loaded `resources.arsc`
#[derive(Debug, Clone, Default)]
pub struct LoadedArsc {
    global_string_pool: Option<ResStringPool>,
    packages: Vec<LoadedPackage>,
    system: bool,
}

impl LoadedArsc {
    /// Load a table.
    ///
    /// With `idmap` the table is an overlay of the idmap's target package.
    /// `load_as_shared_library` makes a package built with id 0x7f dynamic.
    pub fn load(
        data: &[u8],
        idmap: Option<&LoadedIdmap>,
        system: bool,
        load_as_shared_library: bool,
    ) -> Result<LoadedArsc, ArscError> {
        if data.len() < ResTableHeader::size_of() {
            return Err(ArscError::TooSmallError);
        }

        let mut loaded = LoadedArsc {
            system,
            ..Default::default()
        };

        let mut iter = ChunkIterator::new(data);
        for chunk in iter.by_ref() {
            let Ok(chunk) = chunk else {
                break;
            };

            match chunk.type_() {
                ResourceType::Table => {
                    loaded.load_table(&chunk, idmap, load_as_shared_library)?;
                }
                other => {
                    warn!("unknown chunk type {:?}", other);
                }
            }
        }

        if let Some(e) = iter.error() {
            error!("{}", e);
            if e.is_fatal() {
                return Err(e.clone().into());
            }
        }

        Ok(loaded)
    }

    /// Table without packages
    #[inline]
    pub fn empty() -> LoadedArsc {
        LoadedArsc::default()
    }

    fn load_table(
        &mut self,
        chunk: &Chunk<'_>,
        idmap: Option<&LoadedIdmap>,
        load_as_shared_library: bool,
    ) -> Result<(), ArscError> {
        if chunk.header_size() < ResTableHeader::size_of() {
            error!("RES_TABLE_TYPE too small");
            return Err(ArscError::HeaderError("table"));
        }

        let header = ResTableHeader::parse(&mut chunk.header_bytes())
            .map_err(|_: ErrMode<ContextError>| ArscError::HeaderError("table"))?;
        let package_count = header.package_count;
        let mut packages_seen = 0u32;

        let mut iter = chunk.children();
        for child in iter.by_ref() {
            let Ok(child) = child else {
                break;
            };

            match child.type_() {
                ResourceType::StringPool => {
                    if self.global_string_pool.is_none() {
                        self.global_string_pool = Some(ResStringPool::load(child.bytes())?);
                    } else {
                        warn!("multiple RES_STRING_POOL_TYPEs found in RES_TABLE_TYPE");
                    }
                }
                ResourceType::TablePackage => {
                    packages_seen += 1;
                    if packages_seen > package_count {
                        error!("more package chunks were found than the {} declared in the header", package_count);
                        return Err(ArscError::TooManyPackages(package_count));
                    }

                    let package = LoadedPackage::load(&child, idmap, self.system, load_as_shared_library)?;
                    self.packages.push(package);
                }
                other => {
                    warn!("unknown chunk type {:?} in table", other);
                }
            }
        }

        if let Some(e) = iter.error() {
            error!("{}", e);
            if e.is_fatal() {
                return Err(e.clone().into());
            }
        }

        Ok(())
    }

    /// Global value string pool
    #[inline]
    pub fn string_pool(&self) -> Option<&ResStringPool> {
        self.global_string_pool.as_ref()
    }

    #[inline]
    pub fn packages(&self) -> &[LoadedPackage] {
        &self.packages
    }

    #[inline]
    pub fn is_system(&self) -> bool {
        self.system
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::{ResValue, ResourceValueType};
    use crate::testing::{
        EntryBuilder, IdmapBuilder, PackageBuilder, TableBuilder, TypeChunkBuilder,
    };

    fn dec(data: u32) -> ResValue {
        ResValue::new(ResourceValueType::Dec, data)
    }

    fn land() -> ResTableConfig {
        ResTableConfig {
            orientation: ResTableConfig::ORIENTATION_LAND,
            ..Default::default()
        }
    }

    fn app_package() -> PackageBuilder {
        PackageBuilder::new(0x7f, "com.example.app")
            .type_names(&["attr", "integer"])
            .keys(&["first", "second"])
            .entry(2, 0, ResTableConfig::default(), EntryBuilder::value(0, dec(1)))
            .entry(2, 1, ResTableConfig::default(), EntryBuilder::value(1, dec(2)))
            .entry(2, 1, land(), EntryBuilder::value(1, dec(3)))
            .spec_flags(2, 1, ResTableConfigFlags::CONFIG_ORIENTATION.bits())
    }

    #[test]
    fn load_table() {
        let data = TableBuilder::new()
            .strings(&["hello"])
            .package(app_package())
            .build();

        let arsc = LoadedArsc::load(&data, None, false, false).unwrap();
        assert_eq!(
            arsc.string_pool().and_then(|p| p.string_at(0)).as_deref(),
            Some("hello")
        );
        assert_eq!(arsc.packages().len(), 1);

        let package = &arsc.packages()[0];
        assert_eq!(package.package_name(), "com.example.app");
        assert_eq!(package.package_id(), 0x7f);
        assert!(!package.is_dynamic());
        assert!(!package.is_overlay());

        // attr type has no entries
        assert!(package.type_spec_by_index(0).is_none());
        let spec = package.type_spec_by_index(1).unwrap();
        assert_eq!(spec.types.len(), 2);
        assert_eq!(spec.flags(1), ResTableConfigFlags::CONFIG_ORIENTATION);
        assert_eq!(spec.flags(9), ResTableConfigFlags::empty());

        assert_eq!(package.collect_configurations(false).len(), 2);
    }

    #[test]
    fn find_entry_by_name() {
        let data = TableBuilder::new().package(app_package()).build();
        let arsc = LoadedArsc::load(&data, None, false, false).unwrap();
        let package = &arsc.packages()[0];

        assert_eq!(package.find_entry_by_name("integer", "second"), Some(0x0002_0001));
        assert_eq!(package.find_entry_by_name("integer", "third"), None);
        assert_eq!(package.find_entry_by_name("string", "first"), None);
    }

    #[test]
    fn type_id_offset_is_applied() {
        let data = TableBuilder::new()
            .package(app_package().type_id_offset(3))
            .build();
        let arsc = LoadedArsc::load(&data, None, false, false).unwrap();

        assert_eq!(
            arsc.packages()[0].find_entry_by_name("integer", "first"),
            Some(0x0005_0000)
        );
    }

    #[test]
    fn dynamic_packages() {
        let data = TableBuilder::new()
            .package(PackageBuilder::new(0, "com.example.lib"))
            .build();
        let arsc = LoadedArsc::load(&data, None, false, false).unwrap();
        assert!(arsc.packages()[0].is_dynamic());

        let data = TableBuilder::new().package(app_package()).build();
        let arsc = LoadedArsc::load(&data, None, false, true).unwrap();
        assert!(arsc.packages()[0].is_dynamic());
    }

    #[test]
    fn library_entries() {
        let data = TableBuilder::new()
            .package(app_package().library(0x02, "com.example.lib"))
            .build();
        let arsc = LoadedArsc::load(&data, None, false, false).unwrap();

        assert_eq!(
            arsc.packages()[0].dynamic_package_map(),
            &[DynamicPackageEntry {
                package_name: "com.example.lib".to_owned(),
                package_id: 0x02,
            }]
        );
    }

    #[test]
    fn too_many_packages() {
        let data = TableBuilder::new()
            .package(app_package())
            .package(PackageBuilder::new(0x02, "other"))
            .package_count(1)
            .build();

        assert_eq!(
            LoadedArsc::load(&data, None, false, false).unwrap_err(),
            ArscError::TooManyPackages(1)
        );
    }

    #[test]
    fn type_without_spec() {
        let stray = TypeChunkBuilder::new(5, ResTableConfig::default())
            .entries(vec![Some(EntryBuilder::value(0, dec(1)))])
            .build();
        let data = TableBuilder::new()
            .package(app_package().raw_chunk(stray))
            .build();

        assert!(matches!(
            LoadedArsc::load(&data, None, false, false),
            Err(ArscError::InvalidType(5, _))
        ));
    }

    #[test]
    fn type_id_offset_out_of_range() {
        let data = TableBuilder::new()
            .package(app_package().type_id_offset(0xff))
            .build();

        assert!(matches!(
            LoadedArsc::load(&data, None, false, false),
            Err(ArscError::InvalidTypeSpec(2, _))
        ));
    }

    #[test]
    fn overlay_types_move_to_target() {
        let overlay = PackageBuilder::new(0x7f, "com.example.overlay")
            .type_names(&["integer", "string"])
            .keys(&["second"])
            .entry(1, 0, ResTableConfig::default(), EntryBuilder::value(0, dec(20)))
            .entry(2, 0, ResTableConfig::default(), EntryBuilder::value(0, dec(30)));
        let data = TableBuilder::new().package(overlay).build();

        // overlay integer (1) replaces target integer (2) entry 1, strings aren't mapped
        let idmap = IdmapBuilder::new(0x7f)
            .type_map(2, 1, 1, vec![0])
            .build();
        let idmap = LoadedIdmap::load(&idmap).unwrap();

        let arsc = LoadedArsc::load(&data, Some(&idmap), false, false).unwrap();
        let package = &arsc.packages()[0];
        assert!(package.is_overlay());
        assert_eq!(package.package_id(), 0x7f);
        assert!(package.type_spec_by_index(0).is_none());

        let spec = package.type_spec_by_index(1).unwrap();
        assert_eq!(spec.id, 1);
        assert_eq!(spec.idmap_entries.as_ref().and_then(|m| m.lookup(1)), Some(0));
    }

    #[test]
    fn unknown_top_level_chunks_are_skipped() {
        let mut data = vec![0x99, 0x09, 0x08, 0x00, 0x08, 0x00, 0x00, 0x00];
        data.extend(TableBuilder::new().package(app_package()).build());

        let arsc = LoadedArsc::load(&data, None, true, false).unwrap();
        assert!(arsc.is_system());
        assert!(arsc.packages()[0].is_system());
    }
}
