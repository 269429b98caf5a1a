//! Core types - pure abstractions shared across the engine.

mod href;
mod meta;
mod path;

pub use href::{CanonicalHref, FALLBACK_ORIGIN, canonicalize_href};
pub use meta::{DEFAULT_DEV_PORT, SiteMeta};
pub use path::PagePath;
