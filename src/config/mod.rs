//! Configuration module for Mannerly
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files that describe a client: its netloc, headers, robots.txt policy,
//! cache settings and retry behaviour.
//!
//! # Example
//!
//! ```no_run
//! use mannerly::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("mannerly.toml")).unwrap();
//! println!("Cache root: {}", config.cache.dir);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{CacheConfig, ClientConfig, RetryConfig};

// Re-export parser functions
pub use parser::{load_config, parse_config};
pub use validation::validate;
