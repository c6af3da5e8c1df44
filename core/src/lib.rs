//! Resolution engine for compiled Android resources: lookups under a device
//! configuration, style bags, themes and attribute resolution.

pub mod apk_assets;
pub mod asset_manager;
pub mod attribute_resolution;
pub mod bag;
pub mod errors;
pub mod models;
pub mod resource_name;
pub mod theme;

pub use apk_assets::ApkAssets;
pub use asset_manager::{
    AssetManager, Cookie, FindEntryResult, MAX_ITERATIONS, SelectedValue, Unresolved,
};
pub use attribute_resolution::{
    ResolvedAttribute, ResolvedAttributes, XmlAttributeSource, apply_style, resolve_attrs,
    retrieve_attributes,
};
pub use bag::{BagEntry, ResolvedBag};
pub use errors::{AssetsError, LookupError, ThemeError};
pub use resource_name::{ResourceName, ResourceNameRef};
pub use theme::{Theme, ThemeAttribute};

pub use restable_arsc as arsc;
