use thiserror::Error;

/// Errors produced while walking sibling chunks
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkError {
    /// Chunk is broken, everything read from this buffer must be discarded
    #[error("malformed chunk: {0}")]
    MalformedFormat(&'static str),

    /// Trailing data is broken, chunks that were already yielded are still valid
    #[error("malformed chunk (recoverable): {0}")]
    MalformedFormatRecoverable(&'static str),
}

impl ChunkError {
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, ChunkError::MalformedFormat(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StringPoolError {
    /// Chunk is too small to hold `ResStringPool_header`
    #[error("got error while parsing string pool header")]
    HeaderError,

    /// Header fields point outside of the chunk or the pool is not terminated
    #[error("bad string block: {0}")]
    BadFormat(&'static str),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArscError {
    /// Provided buffer is too small to be a resource table
    #[error("file size too small for resources file")]
    TooSmallError,

    /// Chunk iteration failed
    #[error(transparent)]
    Chunk(#[from] ChunkError),

    /// Got error while parsing string pool
    #[error("got error while parsing string pool: {0}")]
    StringPool(#[from] StringPoolError),

    /// Fixed-size header can't be read
    #[error("got error while parsing {0} header")]
    HeaderError(&'static str),

    /// Table header declares fewer packages than present
    #[error("more package chunks than declared in header ({0})")]
    TooManyPackages(u32),

    /// Package chunk is inconsistent
    #[error("invalid package: {0}")]
    InvalidPackage(&'static str),

    /// Type spec chunk is inconsistent
    #[error("invalid type spec 0x{0:02x}: {1}")]
    InvalidTypeSpec(u8, &'static str),

    /// Type chunk is inconsistent
    #[error("invalid type 0x{0:02x}: {1}")]
    InvalidType(u8, &'static str),

    /// Library chunk is inconsistent
    #[error("invalid library chunk: {0}")]
    InvalidLibrary(&'static str),

    /// Idmap blob is inconsistent
    #[error("invalid idmap: {0}")]
    InvalidIdmap(&'static str),

    /// Binary xml document is inconsistent
    #[error("invalid binary xml: {0}")]
    InvalidXml(&'static str),
}

/// Errors produced while parsing a qualifier string like `en-rUS-land-v21`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QualifierError {
    /// Token is not a known qualifier or is out of place
    #[error("unknown configuration qualifier {0:?}")]
    Unknown(String),

    /// Numeric qualifier does not fit its field
    #[error("qualifier {0:?} is out of range")]
    OutOfRange(String),
}
