//! Zero-copy walk over sibling chunks.
//!
//! See: https://cs.android.com/android/platform/superproject/main/+/main:frameworks/base/libs/androidfw/Chunk.cpp

use crate::errors::ChunkError;
use crate::structs::{ResChunkHeader, ResourceType};

/// View of a single chunk inside a buffer
#[derive(Debug, Clone, Copy)]
pub struct Chunk<'a> {
    header: ResChunkHeader,

    /// Whole chunk, header included
    bytes: &'a [u8],

    /// Offset of the chunk from the start of the iterated buffer
    offset: usize,
}

impl<'a> Chunk<'a> {
    #[inline(always)]
    pub fn type_(&self) -> ResourceType {
        self.header.type_
    }

    #[inline(always)]
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    #[inline(always)]
    pub fn header_size(&self) -> usize {
        self.header.header_size as usize
    }

    #[inline(always)]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Whole chunk, chunk header included
    #[inline(always)]
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Type specific header, right after `ResChunk_header`
    #[inline(always)]
    pub fn header_bytes(&self) -> &'a [u8] {
        &self.bytes[ResChunkHeader::size_of()..self.header_size()]
    }

    /// Payload after the full header
    #[inline(always)]
    pub fn data(&self) -> &'a [u8] {
        &self.bytes[self.header_size()..]
    }

    #[inline(always)]
    pub fn data_size(&self) -> usize {
        self.size() - self.header_size()
    }

    /// Iterate over chunks nested in the payload
    #[inline]
    pub fn children(&self) -> ChunkIterator<'a> {
        ChunkIterator::with_offset(self.data(), self.offset + self.header_size())
    }
}

/// Iterator over sibling chunks.
///
/// Yields `Err` at most once, afterwards the iteration is over.
/// Chunks yielded before the error stay valid, but the caller must drop
/// them if [`ChunkError::is_fatal`] says so.
#[derive(Debug, Clone)]
pub struct ChunkIterator<'a> {
    remaining: &'a [u8],
    offset: usize,
    error: Option<ChunkError>,
}

impl<'a> ChunkIterator<'a> {
    #[inline]
    pub fn new(data: &'a [u8]) -> ChunkIterator<'a> {
        Self::with_offset(data, 0)
    }

    #[inline]
    pub fn with_offset(data: &'a [u8], offset: usize) -> ChunkIterator<'a> {
        ChunkIterator {
            remaining: data,
            offset,
            error: None,
        }
    }

    #[inline]
    pub fn has_next(&self) -> bool {
        self.error.is_none() && !self.remaining.is_empty()
    }

    #[inline]
    pub fn had_error(&self) -> bool {
        self.error.is_some()
    }

    #[inline]
    pub fn had_fatal_error(&self) -> bool {
        self.error.as_ref().is_some_and(ChunkError::is_fatal)
    }

    #[inline]
    pub fn error(&self) -> Option<&ChunkError> {
        self.error.as_ref()
    }

    fn verify_next_chunk(&self) -> Result<Chunk<'a>, ChunkError> {
        let len = self.remaining.len();

        // legacy checks, bad trailing data is tolerated by callers
        if len < ResChunkHeader::size_of() {
            return Err(ChunkError::MalformedFormatRecoverable(
                "not enough space for header",
            ));
        }

        let header = ResChunkHeader::parse(&mut &self.remaining[..])
            .map_err(|_| ChunkError::MalformedFormatRecoverable("not enough space for header"))?;
        let size = header.size as usize;
        if size > len {
            return Err(ChunkError::MalformedFormatRecoverable(
                "chunk size is bigger than given data",
            ));
        }

        if self.offset & 0x03 != 0 {
            return Err(ChunkError::MalformedFormat(
                "header not aligned on 4-byte boundary",
            ));
        }

        let header_size = header.header_size as usize;
        if header_size < ResChunkHeader::size_of() {
            return Err(ChunkError::MalformedFormat("header size too small"));
        }

        if header_size > size {
            return Err(ChunkError::MalformedFormat(
                "header size is larger than entire chunk",
            ));
        }

        if (size | header_size) & 0x03 != 0 {
            return Err(ChunkError::MalformedFormat(
                "header sizes are not aligned on 4-byte boundary",
            ));
        }

        Ok(Chunk {
            header,
            bytes: &self.remaining[..size],
            offset: self.offset,
        })
    }
}

impl<'a> Iterator for ChunkIterator<'a> {
    type Item = Result<Chunk<'a>, ChunkError>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.has_next() {
            return None;
        }

        match self.verify_next_chunk() {
            Ok(chunk) => {
                self.remaining = &self.remaining[chunk.size()..];
                self.offset += chunk.size();
                Some(Ok(chunk))
            }
            Err(e) => {
                self.error = Some(e.clone());
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(type_: u16, header_size: u16, size: u32) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&type_.to_le_bytes());
        out.extend_from_slice(&header_size.to_le_bytes());
        out.extend_from_slice(&size.to_le_bytes());
        out.resize(size.max(8) as usize, 0);
        out
    }

    #[test]
    fn iterates_siblings() {
        let mut data = chunk(0x0001, 8, 16);
        data.extend(chunk(0x0202, 12, 12));

        let mut iter = ChunkIterator::new(&data);
        let first = iter.next().unwrap().unwrap();
        assert_eq!(first.type_(), ResourceType::StringPool);
        assert_eq!(first.data_size(), 8);

        let second = iter.next().unwrap().unwrap();
        assert_eq!(second.type_(), ResourceType::TableTypeSpec);
        assert_eq!(second.offset(), 16);
        assert_eq!(second.header_bytes().len(), 4);

        assert!(iter.next().is_none());
        assert!(!iter.had_error());
    }

    #[test]
    fn oversized_chunk_is_recoverable() {
        let mut data = chunk(0x0001, 8, 8);
        let mut broken = chunk(0x0001, 8, 8);
        broken[4..8].copy_from_slice(&64u32.to_le_bytes());
        data.extend(broken);

        let mut iter = ChunkIterator::new(&data);
        assert!(iter.next().unwrap().is_ok());

        let err = iter.next().unwrap().unwrap_err();
        assert!(!err.is_fatal());
        assert!(iter.had_error());
        assert!(!iter.had_fatal_error());
        assert!(iter.next().is_none());
    }

    #[test]
    fn short_trailing_data_is_recoverable() {
        let mut data = chunk(0x0001, 8, 8);
        data.extend_from_slice(&[0, 0, 0, 0]);

        let results: Vec<_> = ChunkIterator::new(&data).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(ChunkError::MalformedFormatRecoverable(
                "not enough space for header"
            ))
        ));
    }

    #[test]
    fn misaligned_header_size_is_fatal() {
        let data = chunk(0x0001, 10, 16);

        let mut iter = ChunkIterator::new(&data);
        let err = iter.next().unwrap().unwrap_err();
        assert!(err.is_fatal());
        assert!(iter.had_fatal_error());
    }

    #[test]
    fn tiny_header_is_fatal() {
        let mut data = chunk(0x0001, 8, 8);
        data[2..4].copy_from_slice(&4u16.to_le_bytes());

        let err = ChunkIterator::new(&data).next().unwrap().unwrap_err();
        assert_eq!(err, ChunkError::MalformedFormat("header size too small"));
    }

    #[test]
    fn header_larger_than_chunk_is_fatal() {
        let mut data = chunk(0x0001, 8, 16);
        data[2..4].copy_from_slice(&24u16.to_le_bytes());

        let err = ChunkIterator::new(&data).next().unwrap().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn unaligned_offset_is_fatal() {
        let data = chunk(0x0001, 8, 8);

        let err = ChunkIterator::with_offset(&data, 2).next().unwrap().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn children_are_offset() {
        let mut parent = chunk(0x0002, 12, 12);
        parent.extend(chunk(0x0001, 8, 8));
        parent[4..8].copy_from_slice(&20u32.to_le_bytes());

        let outer = ChunkIterator::new(&parent).next().unwrap().unwrap();
        let inner = outer.children().next().unwrap().unwrap();
        assert_eq!(inner.offset(), 12);
        assert_eq!(inner.type_(), ResourceType::StringPool);
    }
}
