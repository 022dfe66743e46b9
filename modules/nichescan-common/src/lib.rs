pub mod config;
pub mod types;

pub use config::{load_file_config, CacheSettings, Config, CustomCategory, CustomNiche, FileConfig, PacingSettings};
pub use types::*;
