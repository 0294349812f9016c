//! Normalized, format-agnostic configuration model.
//!
//! A [`Config`] is produced fresh by every parse and offers no mutation API.
//! Edits go through the [`writer`](crate::writer) functions, after which the
//! caller parses the file again.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Name used for the top-level scope.
pub const DEFAULT_ENV: &str = "default";

static EMPTY_VARS: BTreeMap<String, VarValue> = BTreeMap::new();

/// True if `env` addresses the top-level scope (`""` or `"default"`).
pub fn is_default_env(env: &str) -> bool {
    env.is_empty() || env == DEFAULT_ENV
}

/// On-disk file format, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Toml,
    Json,
    Jsonc,
}

impl Format {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            Some("jsonc") => Ok(Self::Jsonc),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// JSON and JSONC share the comment-stripping JSON track.
    pub fn is_json_family(self) -> bool {
        matches!(self, Self::Json | Self::Jsonc)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Toml => write!(f, "toml"),
            Self::Json => write!(f, "json"),
            Self::Jsonc => write!(f, "jsonc"),
        }
    }
}

/// Kind of resource a binding points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingType {
    Kv,
    R2,
    D1,
    Service,
    DurableObject,
    QueueProducer,
    QueueConsumer,
    Ai,
    Vectorize,
    Hyperdrive,
    AnalyticsEngine,
}

impl BindingType {
    pub const ALL: [BindingType; 11] = [
        Self::Kv,
        Self::R2,
        Self::D1,
        Self::Service,
        Self::DurableObject,
        Self::QueueProducer,
        Self::QueueConsumer,
        Self::Ai,
        Self::Vectorize,
        Self::Hyperdrive,
        Self::AnalyticsEngine,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kv => "kv",
            Self::R2 => "r2",
            Self::D1 => "d1",
            Self::Service => "service",
            Self::DurableObject => "durable_object",
            Self::QueueProducer => "queue_producer",
            Self::QueueConsumer => "queue_consumer",
            Self::Ai => "ai",
            Self::Vectorize => "vectorize",
            Self::Hyperdrive => "hyperdrive",
            Self::AnalyticsEngine => "analytics_engine",
        }
    }

    /// Human label for display.
    pub fn label(self) -> &'static str {
        match self {
            Self::Kv => "KV Namespace",
            Self::R2 => "R2 Bucket",
            Self::D1 => "D1 Database",
            Self::Service => "Service",
            Self::DurableObject => "Durable Object",
            Self::QueueProducer => "Queue Producer",
            Self::QueueConsumer => "Queue Consumer",
            Self::Ai => "Workers AI",
            Self::Vectorize => "Vectorize Index",
            Self::Hyperdrive => "Hyperdrive",
            Self::AnalyticsEngine => "Analytics Engine",
        }
    }
}

impl fmt::Display for BindingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BindingType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "kv" | "kv_namespace" => Ok(Self::Kv),
            "r2" | "r2_bucket" => Ok(Self::R2),
            "d1" | "d1_database" => Ok(Self::D1),
            "service" => Ok(Self::Service),
            "durable_object" | "do" => Ok(Self::DurableObject),
            "queue" | "queue_producer" => Ok(Self::QueueProducer),
            "queue_consumer" => Ok(Self::QueueConsumer),
            "ai" => Ok(Self::Ai),
            "vectorize" => Ok(Self::Vectorize),
            "hyperdrive" => Ok(Self::Hyperdrive),
            "analytics_engine" | "analytics" => Ok(Self::AnalyticsEngine),
            _ => Err(ConfigError::invalid(format!("unknown binding type '{s}'"))),
        }
    }
}

/// One resource binding, flattened from its category-specific shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    /// Handle the worker code uses
    pub name: String,
    #[serde(rename = "type")]
    pub kind: BindingType,
    /// Namespace id, bucket name, database id, and so on
    pub resource_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub pattern: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_name: Option<String>,
}

/// A variable value, keeping the type it was declared with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    /// Arrays and tables
    Json(serde_json::Value),
}

impl fmt::Display for VarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::Json(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for VarValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for VarValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for VarValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for VarValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

/// Overrides declared under `env.<name>`.
///
/// Bindings, vars and routes are not inherited from the top level.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Environment {
    pub name: Option<String>,
    pub compatibility_date: Option<String>,
    pub compatibility_flags: Vec<String>,
    pub routes: Vec<Route>,
    pub bindings: Vec<Binding>,
    pub vars: BTreeMap<String, VarValue>,
}

/// Parsed configuration: the top-level scope plus named environments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    pub path: PathBuf,
    pub format: Format,
    pub name: Option<String>,
    pub main: Option<String>,
    pub account_id: Option<String>,
    pub workers_dev: Option<bool>,
    pub compatibility_date: Option<String>,
    pub compatibility_flags: Vec<String>,
    pub routes: Vec<Route>,
    pub bindings: Vec<Binding>,
    pub vars: BTreeMap<String, VarValue>,
    /// Cron expressions from `triggers.crons`
    pub crons: Vec<String>,
    pub environments: BTreeMap<String, Environment>,
}

impl Config {
    /// `"default"` followed by the named environments in sorted order.
    pub fn env_names(&self) -> Vec<String> {
        std::iter::once(DEFAULT_ENV.to_string())
            .chain(self.environments.keys().cloned())
            .collect()
    }

    /// True for the default scope or a declared named environment.
    pub fn has_env(&self, env: &str) -> bool {
        is_default_env(env) || self.environments.contains_key(env)
    }

    pub fn environment(&self, env: &str) -> Option<&Environment> {
        self.environments.get(env)
    }

    pub fn env_bindings(&self, env: &str) -> &[Binding] {
        if is_default_env(env) {
            return &self.bindings;
        }
        self.environments
            .get(env)
            .map(|e| e.bindings.as_slice())
            .unwrap_or(&[])
    }

    pub fn env_vars(&self, env: &str) -> &BTreeMap<String, VarValue> {
        if is_default_env(env) {
            return &self.vars;
        }
        self.environments
            .get(env)
            .map(|e| &e.vars)
            .unwrap_or(&EMPTY_VARS)
    }

    pub fn env_routes(&self, env: &str) -> &[Route] {
        if is_default_env(env) {
            return &self.routes;
        }
        self.environments
            .get(env)
            .map(|e| e.routes.as_slice())
            .unwrap_or(&[])
    }

    /// Worker name the external tool deploys `env` under.
    ///
    /// Named environments without an explicit `name` get `<name>-<env>`.
    pub fn resolved_env_name(&self, env: &str) -> String {
        if is_default_env(env) {
            return self.name.clone().unwrap_or_default();
        }
        if let Some(name) = self.environments.get(env).and_then(|e| e.name.as_ref()) {
            return name.clone();
        }
        match self.name.as_deref() {
            Some(top) if !top.is_empty() => format!("{top}-{env}"),
            _ => env.to_string(),
        }
    }

    pub fn resolved_compat_date(&self, env: &str) -> Option<&str> {
        if !is_default_env(env) {
            if let Some(date) = self
                .environments
                .get(env)
                .and_then(|e| e.compatibility_date.as_deref())
            {
                return Some(date);
            }
        }
        self.compatibility_date.as_deref()
    }

    /// Binding names declared more than once in a scope.
    ///
    /// Queue consumers share the synthetic name `consumer` and are skipped.
    pub fn duplicate_binding_names(&self, env: &str) -> Vec<String> {
        let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
        for binding in self.env_bindings(env) {
            if binding.kind == BindingType::QueueConsumer {
                continue;
            }
            *seen.entry(binding.name.as_str()).or_default() += 1;
        }
        seen.into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(name, _)| name.to_string())
            .collect()
    }
}
