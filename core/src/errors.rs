use restable_arsc::errors::ArscError;
use thiserror::Error;

/// Reasons a lookup produced no value.
///
/// `NotFound` and `ResolutionLimitExceeded` are ordinary misses, attribute
/// resolution keeps falling through to the next source on them.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupError {
    /// Type id is 0, or no loaded package owns the package id
    #[error("invalid resource id 0x{0:08x}")]
    InvalidResourceId(u32),

    /// Well formed id without a matching entry
    #[error("resource 0x{0:08x} not found")]
    NotFound(u32),

    /// Reference or attribute chain longer than the iteration cap
    #[error("too many indirections while resolving 0x{0:08x}")]
    ResolutionLimitExceeded(u32),

    /// Shared library id without a runtime mapping
    #[error("can't translate dynamic reference 0x{0:08x}")]
    DynamicReference(u32),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeError {
    /// Themes belong to different asset managers
    #[error("themes don't share an asset manager")]
    DifferentAssetManager,

    /// Style bag could not be resolved
    #[error("can't apply style 0x{0:08x}")]
    Style(u32, #[source] LookupError),

    /// Style key that is not a resource id
    #[error("style 0x{0:08x} has invalid attribute 0x{1:08x}")]
    InvalidAttribute(u32, u32),
}

#[derive(Error, Debug)]
pub enum AssetsError {
    /// Table, idmap or xml couldn't be loaded
    #[error("got error while loading resources")]
    Load(#[from] ArscError),

    /// Got invalid input (for example, an empty buffer)
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
}
