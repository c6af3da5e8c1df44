use std::sync::Arc;

use log::debug;
use restable_arsc::{LoadedArsc, LoadedIdmap};

use crate::errors::AssetsError;

/// One set of resources handed to an [`AssetManager`](crate::AssetManager):
/// a loaded table and, for overlays, the idmap it was loaded through.
///
/// Reading the table out of an archive is up to the caller.
#[derive(Debug)]
pub struct ApkAssets {
    path: String,
    arsc: LoadedArsc,
    idmap: Option<LoadedIdmap>,
}

impl ApkAssets {
    fn init(
        path: String,
        data: &[u8],
        idmap: Option<LoadedIdmap>,
        system: bool,
        load_as_shared_library: bool,
    ) -> Result<Arc<ApkAssets>, AssetsError> {
        if data.is_empty() {
            return Err(AssetsError::InvalidInput("got empty resource table"));
        }

        let arsc = LoadedArsc::load(data, idmap.as_ref(), system, load_as_shared_library)?;
        debug!("loaded {} with {} package(s)", path, arsc.packages().len());

        Ok(Arc::new(ApkAssets { path, arsc, idmap }))
    }

    /// Load a `resources.arsc`
    pub fn load(
        path: impl Into<String>,
        data: &[u8],
        system: bool,
    ) -> Result<Arc<ApkAssets>, AssetsError> {
        Self::init(path.into(), data, None, system, false)
    }

    /// Load a table whose `0x7f` package gets a runtime assigned id
    pub fn load_as_shared_library(
        path: impl Into<String>,
        data: &[u8],
        system: bool,
    ) -> Result<Arc<ApkAssets>, AssetsError> {
        Self::init(path.into(), data, None, system, true)
    }

    /// Load an overlay table through the idmap that maps it onto its target
    pub fn load_overlay(
        path: impl Into<String>,
        idmap_data: &[u8],
        data: &[u8],
        system: bool,
    ) -> Result<Arc<ApkAssets>, AssetsError> {
        let idmap = LoadedIdmap::load(idmap_data)?;
        Self::init(path.into(), data, Some(idmap), system, false)
    }

    /// Assets without a resource table, for apks that ship none
    pub fn empty(path: impl Into<String>) -> Arc<ApkAssets> {
        Arc::new(ApkAssets {
            path: path.into(),
            arsc: LoadedArsc::empty(),
            idmap: None,
        })
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[inline]
    pub fn loaded_arsc(&self) -> &LoadedArsc {
        &self.arsc
    }

    #[inline]
    pub fn loaded_idmap(&self) -> Option<&LoadedIdmap> {
        self.idmap.as_ref()
    }

    #[inline]
    pub fn is_overlay(&self) -> bool {
        self.idmap.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restable_arsc::testing::{IdmapBuilder, PackageBuilder, TableBuilder};

    #[test]
    fn empty_buffer_is_rejected() {
        let err = ApkAssets::load("empty.arsc", &[], false).unwrap_err();
        assert!(matches!(err, AssetsError::InvalidInput(_)));
    }

    #[test]
    fn overlay_keeps_its_idmap() {
        let table = TableBuilder::new()
            .package(PackageBuilder::new(0x7f, "com.example.overlay").type_names(&["string"]))
            .build();
        let idmap = IdmapBuilder::new(0x7f).type_map(1, 1, 0, vec![0]).build();

        let assets = ApkAssets::load_overlay("overlay.apk", &idmap, &table, false).unwrap();
        assert!(assets.is_overlay());
        assert_eq!(assets.path(), "overlay.apk");
        assert!(assets.loaded_arsc().packages()[0].is_overlay());
    }

    #[test]
    fn empty_assets() {
        let assets = ApkAssets::empty("framework-res.apk");
        assert!(assets.loaded_arsc().packages().is_empty());
        assert!(!assets.is_overlay());
    }
}
