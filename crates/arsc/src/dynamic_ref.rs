//! Build time to runtime package id translation for shared libraries.
//!
//! See: https://cs.android.com/android/platform/superproject/+/android-9.0.0_r1:frameworks/base/libs/androidfw/ResourceTypes.cpp;l=6700

use ahash::AHashMap;
use log::warn;

use crate::structs::{ResValue, ResourceValueType};

pub const APP_PACKAGE_ID: u8 = 0x7f;
pub const SYS_PACKAGE_ID: u8 = 0x01;

/// Per package group translation table.
///
/// Slot `i` holds the runtime id of the package that was built with id `i`,
/// 0 means unknown.
#[derive(Debug, Clone)]
pub struct DynamicRefTable {
    assigned_package_id: u8,
    app_as_lib: bool,
    lookup_table: [u8; 256],

    /// Package name to build time id, from library chunks
    entries: AHashMap<String, u8>,
}

impl Default for DynamicRefTable {
    fn default() -> Self {
        DynamicRefTable::new(0, false)
    }
}

impl DynamicRefTable {
    pub fn new(assigned_package_id: u8, app_as_lib: bool) -> DynamicRefTable {
        let mut lookup_table = [0u8; 256];
        // reserved package ids
        lookup_table[APP_PACKAGE_ID as usize] = APP_PACKAGE_ID;
        lookup_table[SYS_PACKAGE_ID as usize] = SYS_PACKAGE_ID;

        DynamicRefTable {
            assigned_package_id,
            app_as_lib,
            lookup_table,
            entries: AHashMap::new(),
        }
    }

    #[inline]
    pub fn assigned_package_id(&self) -> u8 {
        self.assigned_package_id
    }

    #[inline]
    pub fn app_as_lib(&self) -> bool {
        self.app_as_lib
    }

    #[inline]
    pub fn entries(&self) -> &AHashMap<String, u8> {
        &self.entries
    }

    /// Remember which build time id a library name was compiled with, last one wins
    #[inline]
    pub fn add_entry(&mut self, package_name: &str, build_package_id: u8) {
        self.entries.insert(package_name.to_owned(), build_package_id);
    }

    /// Point the build time id of `package_name` at its runtime id.
    ///
    /// Returns `false` if this table never heard of `package_name`.
    pub fn add_mapping(&mut self, package_name: &str, runtime_package_id: u8) -> bool {
        match self.entries.get(package_name) {
            Some(&build_id) => {
                self.lookup_table[build_id as usize] = runtime_package_id;
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn add_id_mapping(&mut self, build_package_id: u8, runtime_package_id: u8) {
        self.lookup_table[build_package_id as usize] = runtime_package_id;
    }

    /// Rewrite the package part of `resid` to its runtime value.
    ///
    /// `None` when the build time package is unknown.
    pub fn lookup_resource_id(&self, resid: u32) -> Option<u32> {
        let package_id = (resid >> 24) as u8;

        // app package ids are absolute
        if package_id == APP_PACKAGE_ID && !self.app_as_lib {
            return Some(resid);
        }

        // library referencing its own resources
        if package_id == 0 || (package_id == APP_PACKAGE_ID && self.app_as_lib) {
            return Some((resid & 0x00ff_ffff) | (self.assigned_package_id as u32) << 24);
        }

        match self.lookup_table[package_id as usize] {
            0 => {
                warn!(
                    "DynamicRefTable(0x{:02x}): no mapping for build-time package ID 0x{:02x}",
                    self.assigned_package_id, package_id
                );
                None
            }
            translated => Some((resid & 0x00ff_ffff) | (translated as u32) << 24),
        }
    }

    /// Turn dynamic references and attributes into plain ones.
    ///
    /// Plain references only change when an app is loaded as a library.
    /// `None` when the reference can't be translated.
    pub fn lookup_resource_value(&self, value: ResValue) -> Option<ResValue> {
        let resolved_type = match value.data_type {
            ResourceValueType::Attribute | ResourceValueType::Reference if !self.app_as_lib => {
                return Some(value);
            }
            ResourceValueType::Attribute | ResourceValueType::DynamicAttribute => {
                ResourceValueType::Attribute
            }
            ResourceValueType::Reference | ResourceValueType::DynamicReference => {
                ResourceValueType::Reference
            }
            _ => return Some(value),
        };

        // @null stays @null
        if value.data == 0 {
            return Some(ResValue::new(resolved_type, 0));
        }

        let data = self.lookup_resource_id(value.data)?;
        Some(ResValue::new(resolved_type, data))
    }
}
