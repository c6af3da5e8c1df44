use std::cmp::Ordering;
use std::fmt;

use bitflags::bitflags;
use log::warn;
use winnow::binary::le_u32;
use winnow::prelude::*;

use crate::errors::StringPoolError;
use crate::structs::ResChunkHeader;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StringType: u32 {
        const Sorted = 1 << 0;
        const Utf8 = 1 << 8;
    }
}

/// See: https://cs.android.com/android/platform/superproject/main/+/main:frameworks/base/libs/androidfw/include/androidfw/ResourceTypes.h;l=454
#[derive(Debug, Clone, Copy)]
pub struct ResStringPoolHeader {
    pub header: ResChunkHeader,

    /// Number of strings in this pool (number of u32 indices that follow in the data)
    pub string_count: u32,

    /// Number of style span arrays in the pool (number of u32 indices follow the string indices)
    pub style_count: u32,

    pub flags: StringType,

    /// Index from header of the string data
    pub strings_start: u32,

    /// Index from header of the style data
    pub styles_start: u32,
}

impl ResStringPoolHeader {
    pub fn parse(input: &mut &[u8]) -> ModalResult<ResStringPoolHeader> {
        let header = ResChunkHeader::parse(input)?;
        let (string_count, style_count, flags, strings_start, styles_start) =
            (le_u32, le_u32, le_u32, le_u32, le_u32).parse_next(input)?;

        Ok(ResStringPoolHeader {
            header,
            string_count,
            style_count,
            flags: StringType::from_bits_retain(flags),
            strings_start,
            styles_start,
        })
    }

    #[inline(always)]
    pub const fn size_of() -> usize {
        ResChunkHeader::size_of() + 4 * 5
    }
}

/// Validated string pool, strings are decoded on demand.
///
/// See: https://cs.android.com/android/platform/superproject/main/+/main:frameworks/base/libs/androidfw/ResourceTypes.cpp;l=480 (`ResStringPool::setTo`)
#[derive(Clone)]
pub struct ResStringPool {
    header: ResStringPoolHeader,

    /// Chunk bytes, header included
    data: Box<[u8]>,

    /// Size of the string data in characters (bytes for utf-8, code units for utf-16)
    string_pool_size: usize,
}

enum RawString<'a> {
    Utf8(&'a [u8]),
    Utf16(&'a [u8]),
}

impl RawString<'_> {
    fn to_utf16(&self) -> Vec<u16> {
        match self {
            RawString::Utf8(bytes) => String::from_utf8_lossy(bytes).encode_utf16().collect(),
            RawString::Utf16(bytes) => bytes
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .collect(),
        }
    }

    fn to_string(&self) -> String {
        match self {
            RawString::Utf8(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            RawString::Utf16(_) => String::from_utf16_lossy(&self.to_utf16()),
        }
    }
}

impl ResStringPool {
    /// Validate the pool located at the start of `chunk`
    pub fn load(chunk: &[u8]) -> Result<ResStringPool, StringPoolError> {
        if chunk.len() < ResStringPoolHeader::size_of() {
            return Err(StringPoolError::HeaderError);
        }

        let header = ResStringPoolHeader::parse(&mut &chunk[..])
            .map_err(|_| StringPoolError::HeaderError)?;

        let header_size = header.header.header_size as usize;
        let size = header.header.size as usize;

        if header_size < ResStringPoolHeader::size_of() {
            return Err(StringPoolError::HeaderError);
        }
        if header_size > size || size > chunk.len() {
            return Err(StringPoolError::BadFormat("header extends past chunk"));
        }

        let data: Box<[u8]> = chunk[..size].into();
        let char_size = if header.flags.contains(StringType::Utf8) {
            1
        } else {
            2
        };

        let string_count = header.string_count as usize;
        let style_count = header.style_count as usize;
        let strings_start = header.strings_start as usize;
        let styles_start = header.styles_start as usize;

        let mut string_pool_size = 0;
        if string_count > 0 {
            let entries_end = string_count
                .checked_mul(4)
                .and_then(|v| v.checked_add(header_size));
            if entries_end.is_none_or(|end| end > size) {
                return Err(StringPoolError::BadFormat(
                    "string entries extend past data size",
                ));
            }

            // at least the length prefix and a terminator must fit
            if strings_start >= size - 2 {
                return Err(StringPoolError::BadFormat(
                    "string pool starts after total size",
                ));
            }

            string_pool_size = if style_count == 0 {
                (size - strings_start) / char_size
            } else {
                if styles_start >= size - 2 {
                    return Err(StringPoolError::BadFormat(
                        "style pool starts after total size",
                    ));
                }
                if styles_start <= strings_start {
                    return Err(StringPoolError::BadFormat(
                        "style pool starts before string pool",
                    ));
                }
                (styles_start - strings_start) / char_size
            };

            if string_pool_size == 0 {
                return Err(StringPoolError::BadFormat("string pool is empty"));
            }

            let last = strings_start + (string_pool_size - 1) * char_size;
            let terminated = if char_size == 1 {
                data[last] == 0
            } else {
                data[last] == 0 && data[last + 1] == 0
            };
            if !terminated {
                return Err(StringPoolError::BadFormat(
                    "last string is not 0-terminated",
                ));
            }
        }

        if style_count > 0 {
            let style_entries_end = (string_count + style_count)
                .checked_mul(4)
                .and_then(|v| v.checked_add(header_size));
            if style_entries_end.is_none_or(|end| end > size) {
                return Err(StringPoolError::BadFormat(
                    "style entries extend past data size",
                ));
            }

            if styles_start >= size {
                return Err(StringPoolError::BadFormat(
                    "style pool starts after total size",
                ));
            }

            // pool must end with the three END markers of the last span
            let style_pool_size = (size - styles_start) / 4;
            if style_pool_size < 3 {
                return Err(StringPoolError::BadFormat("style pool is too small"));
            }
            let end = styles_start + style_pool_size * 4;
            if data[end - 12..end].iter().any(|&b| b != 0xff) {
                return Err(StringPoolError::BadFormat(
                    "style pool is not terminated by an end span",
                ));
            }
        }

        Ok(ResStringPool {
            header,
            data,
            string_pool_size,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.header.string_count as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn style_count(&self) -> usize {
        self.header.style_count as usize
    }

    #[inline]
    pub fn is_utf8(&self) -> bool {
        self.header.flags.contains(StringType::Utf8)
    }

    #[inline]
    pub fn is_sorted(&self) -> bool {
        self.header.flags.contains(StringType::Sorted)
    }

    fn read_u32(&self, offset: usize) -> Option<u32> {
        let bytes = self.data.get(offset..offset + 4)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_u16(&self, offset: usize) -> Option<u16> {
        let bytes = self.data.get(offset..offset + 2)?;
        Some(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Raw bytes of string `idx` without the terminator
    fn raw_at(&self, idx: usize) -> Option<RawString<'_>> {
        if idx >= self.len() {
            return None;
        }

        let entry_offset = self.header.header.header_size as usize + idx * 4;
        let strings_start = self.header.strings_start as usize;
        let pool_size = self.string_pool_size;

        if self.is_utf8() {
            let off = self.read_u32(entry_offset)? as usize;
            if off >= pool_size.saturating_sub(1) {
                warn!("bad string block: string #{idx} entry is at {off}, past end at {pool_size}");
                return None;
            }

            let pool = &self.data[strings_start..strings_start + pool_size];
            // utf-16 length comes first, only the utf-8 length is needed
            let (_, off) = decode_length8(pool, off)?;
            let (len, off) = decode_length8(pool, off)?;

            if off + len >= pool_size {
                warn!("bad string block: string #{idx} extends to {}, past end at {pool_size}", off + len);
                return None;
            }
            if pool[off + len] != 0 {
                warn!("bad string block: string #{idx} is not null-terminated");
                return None;
            }

            Some(RawString::Utf8(&pool[off..off + len]))
        } else {
            let off = (self.read_u32(entry_offset)? / 2) as usize;
            if off >= pool_size.saturating_sub(1) {
                warn!("bad string block: string #{idx} entry is at {off}, past end at {pool_size}");
                return None;
            }

            let unit = |i: usize| self.read_u16(strings_start + i * 2);
            let first = unit(off)? as usize;
            let (len, start) = if first & 0x8000 != 0 {
                let second = unit(off + 1)? as usize;
                (((first & 0x7fff) << 16) | second, off + 2)
            } else {
                (first, off + 1)
            };

            if start + len >= pool_size {
                warn!("bad string block: string #{idx} extends to {}, past end at {pool_size}", start + len);
                return None;
            }
            if unit(start + len)? != 0 {
                warn!("bad string block: string #{idx} is not null-terminated");
                return None;
            }

            let begin = strings_start + start * 2;
            Some(RawString::Utf16(&self.data[begin..begin + len * 2]))
        }
    }

    /// Decode string `idx`, `None` if missing or malformed
    pub fn string_at(&self, idx: usize) -> Option<String> {
        self.raw_at(idx).map(|raw| raw.to_string())
    }

    /// Find the index of `s`. Binary search for sorted pools, otherwise
    /// scan from the end where style tag names usually live.
    pub fn index_of_string(&self, s: &str) -> Option<usize> {
        if self.is_empty() {
            return None;
        }

        if self.is_sorted() {
            let needle: Vec<u16> = s.encode_utf16().collect();

            let (mut low, mut high) = (0isize, self.len() as isize - 1);
            while low <= high {
                let mid = low + (high - low) / 2;
                let ordering = match self.raw_at(mid as usize) {
                    Some(raw) => raw.to_utf16().cmp(&needle),
                    None => Ordering::Less,
                };

                match ordering {
                    Ordering::Equal => return Some(mid as usize),
                    Ordering::Less => low = mid + 1,
                    Ordering::Greater => high = mid - 1,
                }
            }

            None
        } else if self.is_utf8() {
            (0..self.len())
                .rev()
                .find(|&idx| matches!(self.raw_at(idx), Some(RawString::Utf8(b)) if b == s.as_bytes()))
        } else {
            let needle: Vec<u16> = s.encode_utf16().collect();
            (0..self.len())
                .rev()
                .find(|&idx| self.raw_at(idx).is_some_and(|raw| raw.to_utf16() == needle))
        }
    }

    /// Iterate over all decodable strings
    pub fn iter(&self) -> impl Iterator<Item = Option<String>> + '_ {
        (0..self.len()).map(|idx| self.string_at(idx))
    }
}

/// Utf-8 pools store lengths in one byte, or two with the high bit set
#[inline]
fn decode_length8(pool: &[u8], off: usize) -> Option<(usize, usize)> {
    let first = *pool.get(off)? as usize;
    if first & 0x80 != 0 {
        let second = *pool.get(off + 1)? as usize;
        Some((((first & 0x7f) << 8) | second, off + 2))
    } else {
        Some((first, off + 1))
    }
}

impl fmt::Debug for ResStringPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResStringPool")
            .field("header", &self.header)
            .field("string_pool_size", &self.string_pool_size)
            .finish()
    }
}
