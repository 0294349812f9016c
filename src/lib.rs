//! Worker Configuration Library
//!
//! This library reads worker deployment configuration files (`wrangler.toml`,
//! `wrangler.json`, `wrangler.jsonc`) into a normalized model and writes
//! minimal-diff edits back to disk.
//!
//! # Modules
//!
//! - `config`: File discovery, parsing, normalization, and environment resolution
//! - `writer`: Binding, variable, cron, and environment mutations
//! - `error`: Unified error handling
//!
//! The model is read-only: after any write, parse the file again.

pub mod config;
pub mod error;
pub mod writer;

// Re-export commonly used types for convenience
pub use config::{
    discover_projects, find_config, find_config_up, parse, parse_str, Binding, BindingType,
    Config, DiscoveredProject, Environment, Format, Route, VarValue, DEFAULT_ENV,
};
pub use error::{ConfigError, ConfigResult};
pub use writer::{
    add_binding, add_cron, add_environment, delete_cron, delete_environment, delete_var,
    set_var, BindingDef,
};
