//! Public types for the Heimdall read path.

mod response;

pub use response::{CatalogPage, LatestSnapshot, RefreshStatus, Trend};
