mod common;
mod config_match;
pub mod locale;
mod qualifiers;
mod res_table_config;
mod resource_table;
mod string_pool;

pub use common::*;
pub use res_table_config::*;
pub use resource_table::*;
pub use string_pool::*;
