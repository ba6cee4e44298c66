mod error;
mod fetcher;
mod loader;
mod parsing;
mod types;

pub use error::CatalogError;
pub use fetcher::{FeedSource, TleFetcher};
pub use loader::TleLoader;
pub use parsing::{classify_object, extract_norad_id, parse_multi_tle};
pub use types::{partition, CatalogEntry, ObjectType, OrbitalElement};
