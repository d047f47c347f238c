pub mod client;
pub mod down;
pub mod utils;

pub use down::{download_file, Downloader};
