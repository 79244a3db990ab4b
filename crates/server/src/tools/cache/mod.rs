//! Cache inspection and maintenance tools.

pub mod clear;
pub mod list;
pub mod meta;
pub mod purge;
pub mod status;

pub use clear::{CacheClearParams, clear_impl};
pub use list::list_impl;
pub use meta::{CacheMetaParams, meta_impl};
pub use purge::purge_impl;
pub use status::status_impl;
