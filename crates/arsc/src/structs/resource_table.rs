use std::fmt;

use bitflags::bitflags;
use log::warn;
use winnow::binary::{le_u16, le_u32, u8};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take;

use crate::chunk::Chunk;
use crate::errors::ArscError;
use crate::structs::{ResChunkHeader, ResTableConfig, ResTableConfigFlags, ResValue, ResourceValueType};

/// Header for a resource table
///
/// [Source code](https://cs.android.com/android/platform/superproject/+/android-latest-release:frameworks/base/libs/androidfw/include/androidfw/ResourceTypes.h;l=906)
#[derive(Debug, Clone, Copy)]
pub struct ResTableHeader {
    /// The number of [`ResTablePackageHeader`] structures
    pub package_count: u32,
}

impl ResTableHeader {
    #[inline(always)]
    pub fn parse(input: &mut &[u8]) -> ModalResult<ResTableHeader> {
        le_u32
            .map(|package_count| ResTableHeader { package_count })
            .parse_next(input)
    }

    #[inline(always)]
    pub const fn size_of() -> usize {
        // header - ResChunkHeader
        // 4 bytes - package_count
        ResChunkHeader::size_of() + 4
    }
}

/// Read a fixed size, zero terminated UTF-16 name
pub(crate) fn utf16_name(raw: &[u8]) -> String {
    let utf16_str: Vec<u16> = raw
        .chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
        .take_while(|&c| c != 0)
        .collect();

    String::from_utf16_lossy(&utf16_str)
}

/// A collection of resource data types within a package
///
/// Followed by one or more [`ResTableTypeSpec`] and type chunks containing the entry values for each resource type
///
/// [Source code](https://cs.android.com/android/platform/superproject/+/android-latest-release:frameworks/base/libs/androidfw/include/androidfw/ResourceTypes.h;l=920)
#[derive(Clone)]
pub struct ResTablePackageHeader {
    /// Package IDs start at 1 (corresponding to the value of the package bits in a resource identifier).
    /// 0 means this is a shared library
    pub id: u32,

    /// Actual name of this package, \0-terminated
    pub name: [u8; 256],

    /// Offset to the pool defining the resource type symbol table, relative to the chunk start
    pub type_strings: u32,

    /// Last index into `type_strings` that is for public use by others
    pub last_public_type: u32,

    /// Offset to the pool defining the resource key symbol table, relative to the chunk start
    pub key_strings: u32,

    /// Last index into `key_strings` that is for public use by other
    pub last_public_key: u32,

    /// Added to type ids of this package when forming resource ids.
    ///
    /// Old tools don't write this field, it reads as 0 then.
    pub type_id_offset: u32,
}

impl ResTablePackageHeader {
    /// Parse from the type specific header bytes of a package chunk
    pub fn parse(input: &mut &[u8]) -> ModalResult<ResTablePackageHeader> {
        let (id, name, type_strings, last_public_type, key_strings, last_public_key) = (
            le_u32,
            take(256usize),
            le_u32,
            le_u32,
            le_u32,
            le_u32,
        )
            .parse_next(input)?;

        let mut raw_name = [0u8; 256];
        raw_name.copy_from_slice(name);

        // old structure, without type_id_offset
        let type_id_offset = if input.len() >= 4 {
            le_u32.parse_next(input)?
        } else {
            0
        };

        Ok(ResTablePackageHeader {
            id,
            name: raw_name,
            type_strings,
            last_public_type,
            key_strings,
            last_public_key,
            type_id_offset,
        })
    }

    /// Get a real package name from `name` slice
    #[inline]
    pub fn name(&self) -> String {
        utf16_name(&self.name)
    }

    /// Header size of the oldest known package chunk, without `type_id_offset`
    #[inline(always)]
    pub const fn min_size_of() -> usize {
        // header - ResChunkHeader
        // 4 bytes - id
        // 256 bytes - name
        // 4 bytes - type_strings
        // 4 bytes - last_public_type
        // 4 bytes - key_strings
        // 4 bytes - last_public_key
        ResChunkHeader::size_of() + 4 + 256 + 4 + 4 + 4 + 4
    }

    /// Get size in bytes of this structure
    #[inline(always)]
    pub const fn size_of() -> usize {
        Self::min_size_of() + 4
    }
}

impl fmt::Debug for ResTablePackageHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResTablePackageHeader")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("type_strings", &self.type_strings)
            .field("last_public_type", &self.last_public_type)
            .field("key_strings", &self.key_strings)
            .field("last_public_key", &self.last_public_key)
            .field("type_id_offset", &self.type_id_offset)
            .finish()
    }
}

/// A specification of the resources defined by a particular type
///
/// [Source code](https://cs.android.com/android/platform/superproject/+/android-latest-release:frameworks/base/libs/androidfw/include/androidfw/ResourceTypes.h;l=1448)
#[derive(Debug, Clone)]
pub struct ResTableTypeSpec {
    /// The type identifier this chunk is holding, 0 is invalid
    pub id: u8,

    /// Must be 0, not checked
    pub res0: u8,

    /// Used to be reserved, if >0 specifies the number of type chunks for this spec
    pub types_count: u16,

    /// Configuration mask per entry, which axes vary across the entry's variants
    pub type_spec_flags: Vec<ResTableConfigFlags>,
}

impl ResTableTypeSpec {
    /// Parse and validate a `RES_TABLE_TYPE_SPEC_TYPE` chunk
    pub fn parse(chunk: &Chunk<'_>) -> Result<ResTableTypeSpec, ArscError> {
        let mut header = chunk.header_bytes();
        let (id, res0, types_count, entry_count) = (u8, u8, le_u16, le_u32)
            .parse_next(&mut header)
            .map_err(|_: ErrMode<ContextError>| ArscError::HeaderError("type spec"))?;

        if id == 0 {
            return Err(ArscError::InvalidTypeSpec(id, "invalid ID 0"));
        }

        // entry part of 0xPPTTEEEE is 16 bits wide
        if entry_count > u16::MAX as u32 {
            return Err(ArscError::InvalidTypeSpec(id, "too many entries"));
        }

        if entry_count as usize * 4 > chunk.data_size() {
            return Err(ArscError::InvalidTypeSpec(id, "too small to hold entries"));
        }

        let type_spec_flags = chunk.data()[..entry_count as usize * 4]
            .chunks_exact(4)
            .map(|c| {
                ResTableConfigFlags::from_bits_retain(u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            })
            .collect();

        Ok(ResTableTypeSpec {
            id,
            res0,
            types_count,
            type_spec_flags,
        })
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ResTableFlag: u16 {
        /// If set, this is a complex entry, holding a set of name/value mappings.
        const FLAG_COMPLEX = 0x0001;

        /// If set, this resource has been declared public, so libraries are allowed to reference it.
        const FLAG_PUBLIC = 0x0002;

        /// If set, this is a weak resource and may be overridden by strong resources of the same name/type.
        const FLAG_WEAK = 0x0004;

        /// If set, this is a compact entry with data type and value directly encoded in this entry.
        const FLAG_COMPACT = 0x0008;
    }
}

/// Single attribute/value pair of a bag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResTableMap {
    /// Attribute resource id, or one of the `ATTR_*` ids for `attr` resources
    pub name: u32,

    pub value: ResValue,
}

impl ResTableMap {
    /// Size of `ResTable_map` on disk
    pub const SIZE: usize = 4 + ResValue::SIZE;

    #[inline(always)]
    pub fn parse(input: &mut &[u8]) -> ModalResult<ResTableMap> {
        (le_u32, ResValue::parse)
            .map(|(name, value)| ResTableMap { name, value })
            .parse_next(input)
    }
}

/// Entry of a type chunk
///
/// [Source code](https://cs.android.com/android/platform/superproject/+/android-latest-release:frameworks/base/libs/androidfw/include/androidfw/ResourceTypes.h;l=1583)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResTableEntry {
    /// Plain value, compact entries are normalized into this form
    Simple {
        /// Index into the key pool
        key: u32,
        flags: ResTableFlag,
        value: ResValue,
    },

    /// Bag of attribute/value pairs, inheriting from `parent`
    Complex {
        /// Index into the key pool
        key: u32,
        flags: ResTableFlag,

        /// Parent bag, 0 if none. Always treated as a dynamic reference
        parent: u32,

        map: Vec<ResTableMap>,
    },
}

impl ResTableEntry {
    /// Size of `ResTable_entry` on disk
    pub const SIZE: usize = 8;

    /// Size of `ResTable_map_entry` on disk
    pub const MAP_SIZE: usize = 16;

    #[inline]
    pub fn key(&self) -> u32 {
        match self {
            ResTableEntry::Simple { key, .. } | ResTableEntry::Complex { key, .. } => *key,
        }
    }

    #[inline]
    pub fn flags(&self) -> ResTableFlag {
        match self {
            ResTableEntry::Simple { flags, .. } | ResTableEntry::Complex { flags, .. } => *flags,
        }
    }

    #[inline]
    pub fn is_complex(&self) -> bool {
        matches!(self, ResTableEntry::Complex { .. })
    }

    /// Read and bounds check the entry at `offset` of the type chunk
    pub fn parse(chunk: &[u8], offset: usize) -> Result<ResTableEntry, &'static str> {
        let chunk_size = chunk.len();

        if offset & 0x03 != 0 {
            return Err("entry offset is not aligned");
        }
        if offset > chunk_size.saturating_sub(Self::SIZE) || chunk_size < Self::SIZE {
            return Err("entry offset is beyond the chunk");
        }

        let mut input = &chunk[offset..];
        let (size, flags, key) = (le_u16, le_u16, le_u32)
            .parse_next(&mut input)
            .map_err(|_: ErrMode<ContextError>| "entry is truncated")?;

        let raw_flags = ResTableFlag::from_bits_retain(flags);

        if raw_flags.contains(ResTableFlag::FLAG_COMPACT) {
            // key is stored in `size`, type in the high byte of flags and data in `key`
            return Ok(ResTableEntry::Simple {
                key: size as u32,
                flags: ResTableFlag::from_bits_retain(flags & 0x00ff),
                value: ResValue::new(ResourceValueType::from((flags >> 8) as u8), key),
            });
        }

        let entry_size = size as usize;
        if entry_size < Self::SIZE {
            return Err("entry size is too small");
        }
        if entry_size > chunk_size - offset {
            return Err("entry size is too large");
        }

        if raw_flags.contains(ResTableFlag::FLAG_COMPLEX) {
            if entry_size < Self::MAP_SIZE {
                return Err("map entry size is too small");
            }

            let (parent, count) = (le_u32, le_u32)
                .parse_next(&mut input)
                .map_err(|_: ErrMode<ContextError>| "map entry is truncated")?;

            let map_start = offset + entry_size;
            if map_start & 0x03 != 0 {
                return Err("map entries are not aligned");
            }
            if count as usize > (chunk_size - map_start) / ResTableMap::SIZE {
                return Err("too many map entries");
            }

            let mut maps = &chunk[map_start..];
            let mut map = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let item = ResTableMap::parse(&mut maps)
                    .map_err(|_: ErrMode<ContextError>| "map entry is truncated")?;
                map.push(item);
            }

            return Ok(ResTableEntry::Complex {
                key,
                flags: raw_flags,
                parent,
                map,
            });
        }

        // room for a Res_value right after the entry
        let value_start = offset + entry_size;
        if value_start > chunk_size.saturating_sub(ResValue::SIZE) {
            return Err("no room for the value");
        }

        let (value_size, value) = ResValue::parse_sized(&mut &chunk[value_start..])
            .map_err(|_: ErrMode<ContextError>| "value is truncated")?;
        if (value_size as usize) < ResValue::SIZE {
            return Err("value size is too small");
        }
        if value_size as usize > chunk_size - value_start {
            return Err("value size is too large");
        }

        Ok(ResTableEntry::Simple {
            key,
            flags: raw_flags,
            value,
        })
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ResTableTypeFlags: u8 {
        /// Entries are (index, offset / 4) pairs sorted by index
        const SPARSE = 0x01;

        /// Offsets are encoded in 16 bits, real_offset = offset * 4, 0xffff means no entry
        const OFFSET16 = 0x02;
    }
}

/// One configuration variant of a type: the entries defined for `config`
///
/// [Source code](https://cs.android.com/android/platform/superproject/+/android-latest-release:frameworks/base/libs/androidfw/include/androidfw/ResourceTypes.h;l=1500)
#[derive(Debug, Clone)]
pub struct ResTableType {
    /// The type identifier this chunk is holding
    pub id: u8,

    pub flags: ResTableTypeFlags,

    /// Configuration this collection of entries is designed for
    pub config: ResTableConfig,

    /// Entries by entry index, sparse chunks are expanded
    pub entries: Vec<Option<ResTableEntry>>,
}

impl ResTableType {
    pub const NO_ENTRY: u32 = 0xffff_ffff;

    /// Header size up to and including `config.size`
    pub const MIN_HEADER_SIZE: usize = ResChunkHeader::size_of() + 12 + 4;

    /// Parse and validate a `RES_TABLE_TYPE_TYPE` chunk
    pub fn parse(chunk: &Chunk<'_>) -> Result<ResTableType, ArscError> {
        if chunk.header_size() < Self::MIN_HEADER_SIZE {
            return Err(ArscError::HeaderError("type"));
        }

        let mut header = chunk.header_bytes();
        let (id, flags, _reserved, entry_count, entries_start) = (u8, u8, le_u16, le_u32, le_u32)
            .parse_next(&mut header)
            .map_err(|_: ErrMode<ContextError>| ArscError::HeaderError("type"))?;

        let config = ResTableConfig::parse(&mut header)
            .map_err(|_: ErrMode<ContextError>| ArscError::InvalidType(id, "bad configuration"))?;

        if id == 0 {
            return Err(ArscError::InvalidType(id, "invalid ID 0"));
        }

        let flags = ResTableTypeFlags::from_bits_retain(flags);
        let entry_count = entry_count as usize;
        if entry_count > u16::MAX as usize {
            return Err(ArscError::InvalidType(id, "too many entries"));
        }

        let bytes = chunk.bytes();
        let offsets_offset = chunk.header_size();
        let entries_offset = entries_start as usize;
        let offset_size = if flags.contains(ResTableTypeFlags::OFFSET16) {
            2
        } else {
            4
        };

        if offsets_offset > entries_offset
            || entries_offset - offsets_offset < offset_size * entry_count
        {
            return Err(ArscError::InvalidType(id, "entry offsets overlap actual entry data"));
        }
        if entries_offset > bytes.len() {
            return Err(ArscError::InvalidType(id, "entry offsets extend beyond chunk"));
        }
        if entries_offset & 0x03 != 0 {
            return Err(ArscError::InvalidType(id, "entries start at unaligned address"));
        }

        let offsets = &bytes[offsets_offset..offsets_offset + offset_size * entry_count];
        let slots: Vec<(usize, Option<u32>)> = if flags.contains(ResTableTypeFlags::SPARSE) {
            offsets
                .chunks_exact(4)
                .map(|c| {
                    let idx = u16::from_le_bytes([c[0], c[1]]) as usize;
                    let offset = u16::from_le_bytes([c[2], c[3]]) as u32 * 4;
                    (idx, Some(offset))
                })
                .collect()
        } else if offset_size == 2 {
            offsets
                .chunks_exact(2)
                .enumerate()
                .map(|(idx, c)| {
                    let offset = u16::from_le_bytes([c[0], c[1]]);
                    (idx, (offset != 0xffff).then_some(offset as u32 * 4))
                })
                .collect()
        } else {
            offsets
                .chunks_exact(4)
                .enumerate()
                .map(|(idx, c)| {
                    let offset = u32::from_le_bytes([c[0], c[1], c[2], c[3]]);
                    (idx, (offset != Self::NO_ENTRY).then_some(offset))
                })
                .collect()
        };

        let len = slots.iter().map(|(idx, _)| idx + 1).max().unwrap_or(0);
        let mut entries = vec![None; len];

        for (idx, offset) in slots {
            let Some(offset) = offset else {
                continue;
            };

            let absolute = (offset as usize)
                .checked_add(entries_offset)
                .ok_or(ArscError::InvalidType(id, "entry offset overflows"))?;

            let entry = ResTableEntry::parse(bytes, absolute).map_err(|e| {
                warn!("type 0x{:02x} entry {}: {}", id, idx, e);
                ArscError::InvalidType(id, e)
            })?;
            entries[idx] = Some(entry);
        }

        Ok(ResTableType {
            id,
            flags,
            config,
            entries,
        })
    }

    #[inline]
    pub fn entry(&self, idx: u16) -> Option<&ResTableEntry> {
        self.entries.get(idx as usize).and_then(Option::as_ref)
    }

    #[inline]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

/// Build time package id to name mapping of a shared library reference
///
/// [Source code](https://cs.android.com/android/platform/superproject/+/android-latest-release:frameworks/base/libs/androidfw/include/androidfw/ResourceTypes.h;l=1730)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResTableLibraryEntry {
    pub package_id: u32,
    pub package_name: String,
}

impl ResTableLibraryEntry {
    /// 4 bytes id followed by 128 UTF-16 code units
    pub const SIZE: usize = 4 + 256;

    #[inline]
    pub fn parse(input: &mut &[u8]) -> ModalResult<ResTableLibraryEntry> {
        (le_u32, take(256usize))
            .map(|(package_id, name): (u32, &[u8])| ResTableLibraryEntry {
                package_id,
                package_name: utf16_name(name),
            })
            .parse_next(input)
    }

    /// Parse and validate a `RES_TABLE_LIBRARY_TYPE` chunk
    pub fn parse_chunk(chunk: &Chunk<'_>) -> Result<Vec<ResTableLibraryEntry>, ArscError> {
        let count = le_u32
            .parse_next(&mut chunk.header_bytes())
            .map_err(|_: ErrMode<ContextError>| ArscError::InvalidLibrary("too small"))?;

        if chunk.data_size() / Self::SIZE < count as usize {
            return Err(ArscError::InvalidLibrary("too small to hold entries"));
        }

        let mut data = chunk.data();
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let entry = Self::parse(&mut data)
                .map_err(|_: ErrMode<ContextError>| ArscError::InvalidLibrary("truncated entry"))?;
            if entry.package_id >= u8::MAX as u32 {
                return Err(ArscError::InvalidLibrary("package ID too large"));
            }
            entries.push(entry);
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkIterator;
    use crate::testing::{EntryBuilder, TypeChunkBuilder};

    fn simple(key: u32, data: u32) -> EntryBuilder {
        EntryBuilder::value(key, ResValue::new(ResourceValueType::Dec, data))
    }

    fn first_chunk(data: &[u8]) -> Chunk<'_> {
        ChunkIterator::new(data).next().unwrap().unwrap()
    }

    #[test]
    fn dense_type() {
        let bytes = TypeChunkBuilder::new(1, ResTableConfig::default())
            .entries(vec![Some(simple(0, 10)), None, Some(simple(2, 30))])
            .build();

        let ty = ResTableType::parse(&first_chunk(&bytes)).unwrap();
        assert_eq!(ty.entry_count(), 3);
        assert!(ty.entry(1).is_none());
        assert_eq!(
            ty.entry(2),
            Some(&ResTableEntry::Simple {
                key: 2,
                flags: ResTableFlag::empty(),
                value: ResValue::new(ResourceValueType::Dec, 30),
            })
        );
    }

    #[test]
    fn sparse_and_offset16_types() {
        let entries = vec![None, None, Some(simple(7, 1)), None, Some(simple(8, 2))];

        for builder in [
            TypeChunkBuilder::new(2, ResTableConfig::default()).sparse(),
            TypeChunkBuilder::new(2, ResTableConfig::default()).offset16(),
        ] {
            let bytes = builder.entries(entries.clone()).build();
            let ty = ResTableType::parse(&first_chunk(&bytes)).unwrap();
            assert!(ty.entry(0).is_none());
            assert_eq!(ty.entry(2).map(ResTableEntry::key), Some(7));
            assert_eq!(ty.entry(4).map(ResTableEntry::key), Some(8));
        }
    }

    #[test]
    fn complex_entry() {
        let bag = EntryBuilder::bag(
            3,
            0x7f02_0000,
            vec![(0x7f01_0000, ResValue::new(ResourceValueType::Dec, 5))],
        );
        let bytes = TypeChunkBuilder::new(2, ResTableConfig::default())
            .entries(vec![Some(bag)])
            .build();

        let ty = ResTableType::parse(&first_chunk(&bytes)).unwrap();
        match ty.entry(0) {
            Some(ResTableEntry::Complex { parent, map, .. }) => {
                assert_eq!(*parent, 0x7f02_0000);
                assert_eq!(map.len(), 1);
                assert_eq!(map[0].name, 0x7f01_0000);
            }
            other => panic!("unexpected entry {:?}", other),
        }
    }

    #[test]
    fn broken_offset_is_rejected() {
        let mut bytes = TypeChunkBuilder::new(1, ResTableConfig::default())
            .entries(vec![Some(simple(0, 1))])
            .build();

        // point the only offset far outside of the chunk
        let header_size = u16::from_le_bytes([bytes[2], bytes[3]]) as usize;
        bytes[header_size..header_size + 4].copy_from_slice(&0x1000u32.to_le_bytes());

        assert!(matches!(
            ResTableType::parse(&first_chunk(&bytes)),
            Err(ArscError::InvalidType(1, _))
        ));
    }

    #[test]
    fn compact_entry() {
        let mut chunk = vec![0u8; 8];
        chunk[0..2].copy_from_slice(&5u16.to_le_bytes());
        chunk[2..4].copy_from_slice(&(0x1000u16 | 0x0008).to_le_bytes());
        chunk[4..8].copy_from_slice(&42u32.to_le_bytes());

        assert_eq!(
            ResTableEntry::parse(&chunk, 0),
            Ok(ResTableEntry::Simple {
                key: 5,
                flags: ResTableFlag::FLAG_COMPACT,
                value: ResValue::new(ResourceValueType::Dec, 42),
            })
        );
    }
}
