//! Runtime resource overlay map: which target entries an overlay package replaces.
//!
//! See: https://cs.android.com/android/platform/superproject/+/android-9.0.0_r1:frameworks/base/libs/androidfw/Idmap.cpp

use std::collections::BTreeMap;

use log::error;
use winnow::binary::{le_u16, le_u32};
use winnow::combinator::repeat;
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take;

use crate::errors::ArscError;

/// Idmap header
///
/// [Source code](https://cs.android.com/android/platform/superproject/+/android-9.0.0_r1:frameworks/base/libs/androidfw/include/androidfw/ResourceTypes.h;l=1700)
#[derive(Debug, Clone)]
pub struct IdmapHeader {
    pub magic: u32,
    pub version: u32,
    pub target_crc32: u32,
    pub overlay_crc32: u32,
    pub target_path: String,
    pub overlay_path: String,
    pub target_package_id: u16,
    pub type_count: u16,
}

impl IdmapHeader {
    /// "IDMP"
    pub const MAGIC: u32 = 0x504D_4449;
    pub const CURRENT_VERSION: u32 = 0x0000_0001;

    #[inline(always)]
    pub const fn size_of() -> usize {
        // 4 bytes - magic
        // 4 bytes - version
        // 4 bytes - target_crc32
        // 4 bytes - overlay_crc32
        // 256 bytes - target_path
        // 256 bytes - overlay_path
        // 2 bytes - target_package_id
        // 2 bytes - type_count
        4 + 4 + 4 + 4 + 256 + 256 + 2 + 2
    }

    pub fn parse(input: &mut &[u8]) -> ModalResult<IdmapHeader> {
        (
            le_u32,
            le_u32,
            le_u32,
            le_u32,
            take(256usize),
            take(256usize),
            le_u16,
            le_u16,
        )
            .map(
                |(
                    magic,
                    version,
                    target_crc32,
                    overlay_crc32,
                    target_path,
                    overlay_path,
                    target_package_id,
                    type_count,
                ): (u32, u32, u32, u32, &[u8], &[u8], u16, u16)| IdmapHeader {
                    magic,
                    version,
                    target_crc32,
                    overlay_crc32,
                    target_path: fixed_path(target_path),
                    overlay_path: fixed_path(overlay_path),
                    target_package_id,
                    type_count,
                },
            )
            .parse_next(input)
    }
}

fn fixed_path(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

/// Entry map of one overlay type onto its target type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdmapTypeMap {
    pub target_type_id: u16,
    pub overlay_type_id: u16,

    /// First target entry covered by `entries`
    pub entry_id_offset: u16,

    /// Overlay entry per target entry, `0xffffffff` if not overlaid
    pub entries: Vec<u32>,
}

impl IdmapTypeMap {
    /// Fixed part size, entries follow
    pub const HEADER_SIZE: usize = 8;

    /// Overlay entry index for a target entry index
    pub fn lookup(&self, target_entry: u16) -> Option<u16> {
        let idx = target_entry.checked_sub(self.entry_id_offset)?;
        match self.entries.get(idx as usize) {
            Some(&0xffff_ffff) | None => None,
            Some(&overlay) => Some(overlay as u16),
        }
    }
}

/// Parsed idmap, keyed by overlay type id
#[derive(Debug, Clone)]
pub struct LoadedIdmap {
    header: IdmapHeader,
    type_maps: BTreeMap<u8, IdmapTypeMap>,
}

#[inline(always)]
fn is_valid_id(id: u16) -> bool {
    id != 0 && id <= 255
}

impl LoadedIdmap {
    pub fn load(data: &[u8]) -> Result<LoadedIdmap, ArscError> {
        if data.len() < IdmapHeader::size_of() {
            return Err(ArscError::InvalidIdmap("header is too small"));
        }

        let mut input = data;
        let header = IdmapHeader::parse(&mut input)
            .map_err(|_: ErrMode<ContextError>| ArscError::InvalidIdmap("header is too small"))?;

        if header.magic != IdmapHeader::MAGIC {
            error!(
                "invalid idmap file: bad magic value (was 0x{:08x}, expected 0x{:08x})",
                header.magic,
                IdmapHeader::MAGIC
            );
            return Err(ArscError::InvalidIdmap("bad magic value"));
        }

        if header.version != IdmapHeader::CURRENT_VERSION {
            error!(
                "version mismatch in idmap (was 0x{:08x}, expected 0x{:08x})",
                header.version,
                IdmapHeader::CURRENT_VERSION
            );
            return Err(ArscError::InvalidIdmap("version mismatch"));
        }

        if !is_valid_id(header.target_package_id) {
            return Err(ArscError::InvalidIdmap("target package ID is invalid"));
        }

        if header.type_count > 255 {
            return Err(ArscError::InvalidIdmap("too many type mappings"));
        }

        let mut type_maps = BTreeMap::new();
        let mut encountered = 0usize;

        while input.len() >= IdmapTypeMap::HEADER_SIZE {
            let (target_type_id, overlay_type_id, entry_count, entry_id_offset) =
                (le_u16, le_u16, le_u16, le_u16)
                    .parse_next(&mut input)
                    .map_err(|_: ErrMode<ContextError>| ArscError::InvalidIdmap("truncated"))?;

            if !is_valid_id(target_type_id) || !is_valid_id(overlay_type_id) {
                error!(
                    "invalid type map (0x{:02x} -> 0x{:02x})",
                    target_type_id, overlay_type_id
                );
                return Err(ArscError::InvalidIdmap("invalid type map"));
            }

            if input.len() / 4 < entry_count as usize {
                return Err(ArscError::InvalidIdmap(
                    "too small for the number of entries",
                ));
            }

            let entries: Vec<u32> = repeat(entry_count as usize, le_u32)
                .parse_next(&mut input)
                .map_err(|_: ErrMode<ContextError>| ArscError::InvalidIdmap("truncated"))?;

            // empty overlays are dropped
            if entry_count != 0 {
                type_maps.insert(
                    overlay_type_id as u8,
                    IdmapTypeMap {
                        target_type_id,
                        overlay_type_id,
                        entry_id_offset,
                        entries,
                    },
                );
            }

            encountered += 1;
        }

        if encountered != header.type_count as usize {
            error!(
                "parsed {} type maps but expected {}",
                encountered, header.type_count
            );
            return Err(ArscError::InvalidIdmap("type map count mismatch"));
        }

        Ok(LoadedIdmap { header, type_maps })
    }

    #[inline]
    pub fn target_package_id(&self) -> u8 {
        self.header.target_package_id as u8
    }

    #[inline]
    pub fn overlay_path(&self) -> &str {
        &self.header.overlay_path
    }

    #[inline]
    pub fn target_path(&self) -> &str {
        &self.header.target_path
    }

    #[inline]
    pub fn header(&self) -> &IdmapHeader {
        &self.header
    }

    /// Map for the overlay type with given id
    #[inline]
    pub fn type_map(&self, overlay_type_id: u8) -> Option<&IdmapTypeMap> {
        self.type_maps.get(&overlay_type_id)
    }
}
