//! Themes: attribute values collected from applied styles.
//!
//! See: https://cs.android.com/android/platform/superproject/+/android-9.0.0_r1:frameworks/base/libs/androidfw/AssetManager2.cpp;l=1010

use std::ptr;

use log::debug;
use restable_arsc::structs::{
    ResTableConfigFlags, ResValue, ResourceValueType, is_valid_resource_id, split_resource_id,
};

use crate::asset_manager::{AssetManager, Cookie, MAX_ITERATIONS, SelectedValue, Unresolved};
use crate::errors::{LookupError, ThemeError};

const PACKAGE_COUNT: usize = 256;
const TYPE_COUNT: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ThemeEntry {
    cookie: Option<Cookie>,
    type_spec_flags: ResTableConfigFlags,
    value: ResValue,
}

impl Default for ThemeEntry {
    fn default() -> Self {
        ThemeEntry {
            cookie: None,
            type_spec_flags: ResTableConfigFlags::empty(),
            value: ResValue::null(),
        }
    }
}

/// Entries by type id, type 0 is never populated
#[derive(Debug, Clone)]
struct ThemePackage {
    types: [Option<Vec<ThemeEntry>>; TYPE_COUNT],
}

impl ThemePackage {
    fn new() -> ThemePackage {
        ThemePackage {
            types: std::array::from_fn(|_| None),
        }
    }
}

/// Attribute value stored in a theme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeAttribute {
    /// Assets the defining style came from
    pub cookie: Option<Cookie>,

    pub value: ResValue,

    /// Flags of every style on the attribute chain
    pub flags: ResTableConfigFlags,
}

/// Set of attribute values built up by applying styles.
///
/// A theme borrows the [`AssetManager`] it was created from, the manager
/// can't be reconfigured while themes exist.
#[derive(Debug, Clone)]
pub struct Theme<'a> {
    assets: &'a AssetManager,
    type_spec_flags: ResTableConfigFlags,

    /// Indexed by runtime package id
    packages: [Option<Box<ThemePackage>>; PACKAGE_COUNT],
}

impl<'a> Theme<'a> {
    pub(crate) fn new(assets: &'a AssetManager) -> Theme<'a> {
        Theme {
            assets,
            type_spec_flags: ResTableConfigFlags::empty(),
            packages: std::array::from_fn(|_| None),
        }
    }

    #[inline]
    pub fn asset_manager(&self) -> &'a AssetManager {
        self.assets
    }

    /// Configuration axes that can change any value of this theme
    #[inline]
    pub fn changing_configurations(&self) -> ResTableConfigFlags {
        self.type_spec_flags
    }

    /// Copy the attributes of the style `resid` into the theme.
    ///
    /// Attributes that already have a value are kept unless `force` is set.
    /// A style key that is not a resource id stops the application midway.
    pub fn apply_style(&mut self, resid: u32, force: bool) -> Result<(), ThemeError> {
        let bag = self
            .assets
            .get_bag(resid)
            .map_err(|e| ThemeError::Style(resid, e))?;

        self.type_spec_flags |= bag.type_spec_flags;

        // keys are sorted, walking backwards grows every type at most once
        for bag_entry in bag.entries.iter().rev() {
            let attr_resid = bag_entry.key;
            let (package_id, type_id, entry_id) = split_resource_id(attr_resid);
            if package_id == 0 || !is_valid_resource_id(attr_resid) {
                return Err(ThemeError::InvalidAttribute(resid, attr_resid));
            }

            let package = self.packages[package_id as usize]
                .get_or_insert_with(|| Box::new(ThemePackage::new()));
            let entries = package.types[type_id as usize].get_or_insert_with(Vec::new);

            let entry_idx = entry_id as usize;
            if entries.len() <= entry_idx {
                entries.resize(entry_idx + 1, ThemeEntry::default());
            }

            let entry = &mut entries[entry_idx];
            if force
                || (entry.value.data_type == ResourceValueType::Null
                    && entry.value.data != ResValue::DATA_NULL_EMPTY)
            {
                entry.cookie = Some(bag_entry.cookie);
                entry.type_spec_flags |= bag.type_spec_flags;
                entry.value = bag_entry.value;
            }
        }

        Ok(())
    }

    fn entry(&self, resid: u32) -> Option<&ThemeEntry> {
        let (package_id, type_id, entry_id) = split_resource_id(resid);
        self.packages[package_id as usize].as_ref()?.types[type_id as usize]
            .as_ref()?
            .get(entry_id as usize)
    }

    /// Value of attribute `resid`, following attributes that point at other attributes.
    ///
    /// References are not followed, see [`Theme::resolve_attribute_reference`].
    /// `@empty` is a value, undefined attributes and `@null` are not.
    pub fn get_attribute(&self, resid: u32) -> Result<ThemeAttribute, LookupError> {
        let mut resid = resid;
        let mut remaining = MAX_ITERATIONS;
        let mut flags = ResTableConfigFlags::empty();

        loop {
            let Some(entry) = self.entry(resid) else {
                return Err(LookupError::NotFound(resid));
            };
            flags |= entry.type_spec_flags;

            if entry.value.data_type == ResourceValueType::Attribute {
                if remaining == 0 {
                    debug!("too many attribute indirections at 0x{:08x}", resid);
                    return Err(LookupError::ResolutionLimitExceeded(resid));
                }
                remaining -= 1;
                resid = entry.value.data;
                continue;
            }

            if entry.value.data_type == ResourceValueType::Null
                && entry.value.data != ResValue::DATA_NULL_EMPTY
            {
                return Err(LookupError::NotFound(resid));
            }

            return Ok(ThemeAttribute {
                cookie: entry.cookie,
                value: entry.value,
                flags,
            });
        }
    }

    /// Like [`AssetManager::follow_references`], attributes are looked up in the theme first
    pub fn resolve_attribute_reference(
        &self,
        selected: SelectedValue,
    ) -> Result<SelectedValue, Unresolved> {
        let mut selected = selected;

        if selected.value.data_type == ResourceValueType::Attribute {
            let attribute = self
                .get_attribute(selected.value.data)
                .map_err(|error| Unresolved {
                    reached: selected,
                    error,
                })?;
            selected.cookie = attribute.cookie;
            selected.value = attribute.value;
            selected.flags |= attribute.flags;
        }

        self.assets.follow_references(selected)
    }

    /// Final value of attribute `resid`
    pub fn resolve_attribute(&self, resid: u32) -> Result<SelectedValue, LookupError> {
        let attribute = self.get_attribute(resid)?;

        self.assets.resolve_reference(SelectedValue {
            cookie: attribute.cookie,
            flags: attribute.flags,
            ..SelectedValue::from_value(attribute.value)
        })
    }

    /// Make this theme a copy of `other`, both must use the same asset manager
    pub fn set_to(&mut self, other: &Theme<'_>) -> Result<(), ThemeError> {
        if !ptr::eq(self.assets, other.assets) {
            return Err(ThemeError::DifferentAssetManager);
        }

        self.type_spec_flags = other.type_spec_flags;
        self.packages = other.packages.clone();
        Ok(())
    }

    /// Drop every applied style
    pub fn clear(&mut self) {
        self.type_spec_flags = ResTableConfigFlags::empty();
        self.packages = std::array::from_fn(|_| None);
    }
}
