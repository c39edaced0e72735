pub mod cli;
pub mod clock;
pub mod config;
pub mod content;
pub mod error;
pub mod ping;
pub mod server;
pub mod sitemap;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
