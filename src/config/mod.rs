//! Configuration module for Geo-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! A missing file section falls back to the built-in defaults.
//!
//! # Example
//!
//! ```no_run
//! use geo_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Harvest starts at: {}", config.site.root_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, HttpConfig, OutputConfig, SiteConfig, TierConfig, TiersConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
