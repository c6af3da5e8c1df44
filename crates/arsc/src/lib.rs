//! Readers for the binary formats of compiled Android resources: resource
//! tables (`resources.arsc`), compiled XML and overlay idmaps.

pub mod chunk;
pub mod dynamic_ref;
pub mod errors;
pub mod idmap;
pub mod loaded_arsc;
pub mod structs;
pub mod xml;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use chunk::{Chunk, ChunkIterator};
pub use dynamic_ref::DynamicRefTable;
pub use errors::{ArscError, ChunkError, QualifierError, StringPoolError};
pub use idmap::LoadedIdmap;
pub use loaded_arsc::{LoadedArsc, LoadedPackage, TypeSpec};
pub use xml::{XmlParser, XmlTree};
