pub(crate) mod addr;
mod cache;
mod inflight;
mod lru;

pub use cache::TierCache;
pub use inflight::{FillOrigin, InflightTable, RetiredFill};
pub use lru::LruSet;
