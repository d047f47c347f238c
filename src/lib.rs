pub mod config;
pub mod errors;
pub mod merge;
pub mod metadata;
pub mod profile;
pub mod report;
pub mod resolve;
pub mod taxonomy;
pub mod taxprof;
pub mod utils;

pub use errors::{Error, Result};
