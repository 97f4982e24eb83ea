pub mod config;
pub mod error;

pub use config::{Config, HttpConfig, RunOptions, Secrets};
pub use error::*;
