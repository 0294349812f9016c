//! Worker configuration reading.
//!
//! This module locates configuration files, decodes them (TOML, JSON, or
//! JSONC), and builds the normalized [`Config`] model.
//!
//! # File Resolution
//!
//! A project directory is probed for, in order:
//!
//! 1. `wrangler.jsonc`
//! 2. `wrangler.json`
//! 3. `wrangler.toml`
//!
//! # Example
//!
//! ```rust,ignore
//! use workercfg::config::{find_config_up, parse};
//!
//! let path = find_config_up(".").expect("no config");
//! let config = parse(&path)?;
//!
//! for env in config.env_names() {
//!     println!("{} -> {}", env, config.resolved_env_name(&env));
//! }
//! ```

mod jsonc;
mod locator;
mod model;
mod parser;
mod schema;

pub use jsonc::{strip_comments, strip_jsonc, strip_trailing_commas};
pub use locator::{
    discover_projects, find_config, find_config_up, DiscoveredProject, CONFIG_BASE_NAME,
    CONFIG_EXTENSIONS, MAX_DISCOVERY_DEPTH, SKIPPED_DIRS,
};
pub use model::{
    is_default_env, Binding, BindingType, Config, Environment, Format, Route, VarValue,
    DEFAULT_ENV,
};
pub use parser::{parse, parse_str};
