//! Minimal-diff mutation of configuration files.
//!
//! Every operation reads the file, computes the complete new contents, checks
//! that they still parse, and only then overwrites the file. The in-memory
//! [`Config`] is never modified; callers parse the file again afterwards.
//!
//! TOML files are edited by splicing text at offsets found by a structural
//! scan, so comments and formatting outside the touched region survive. JSON
//! and JSONC files are rewritten as a whole (comments are dropped).
//!
//! # Example
//!
//! ```rust,ignore
//! use workercfg::writer::{add_binding, BindingDef};
//! use workercfg::config::{parse, BindingType};
//!
//! let def = BindingDef::new(BindingType::D1, "DB", "uuid-1").with_resource_name("mydb");
//! add_binding("wrangler.toml", "default", &def)?;
//! let config = parse("wrangler.toml")?;
//! ```

mod json_writer;
mod toml_layout;
mod toml_writer;

use crate::config::{is_default_env, parse_str, BindingType, Config, Format, VarValue};
use crate::error::{ConfigError, ConfigResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Binding handles must be JavaScript identifiers.
static BINDING_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("valid regex"));

static ENV_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("valid regex"));

/// A binding to append to a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingDef {
    pub kind: BindingType,
    pub binding_name: String,
    /// Namespace id, bucket name, database id, queue name, ...
    pub resource_id: String,
    /// Human-readable resource name (the D1 `database_name`)
    pub resource_name: String,
}

impl BindingDef {
    pub fn new(
        kind: BindingType,
        binding_name: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            binding_name: binding_name.into(),
            resource_id: resource_id.into(),
            resource_name: String::new(),
        }
    }

    pub fn with_resource_name(mut self, name: impl Into<String>) -> Self {
        self.resource_name = name.into();
        self
    }

    /// Resource id, falling back to the resource name.
    fn resource(&self) -> &str {
        if self.resource_id.is_empty() {
            &self.resource_name
        } else {
            &self.resource_id
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.kind != BindingType::QueueConsumer && !BINDING_NAME.is_match(&self.binding_name) {
            return Err(ConfigError::invalid(format!(
                "binding name '{}' is not a valid identifier",
                self.binding_name
            )));
        }
        if self.kind != BindingType::Ai && self.resource().is_empty() {
            return Err(ConfigError::invalid(format!(
                "{} binding requires a resource id",
                self.kind
            )));
        }
        Ok(())
    }

    /// Key/value pairs written for this binding, in file order.
    pub(crate) fn fields(&self) -> Vec<(&'static str, String)> {
        let name = self.binding_name.clone();
        let resource = self.resource().to_string();
        match self.kind {
            BindingType::Kv => vec![("binding", name), ("id", resource)],
            BindingType::R2 => vec![("binding", name), ("bucket_name", resource)],
            BindingType::D1 => {
                let mut fields = vec![("binding", name)];
                if !self.resource_name.is_empty() {
                    fields.push(("database_name", self.resource_name.clone()));
                }
                if !self.resource_id.is_empty() {
                    fields.push(("database_id", self.resource_id.clone()));
                }
                fields
            }
            BindingType::Service => vec![("binding", name), ("service", resource)],
            BindingType::DurableObject => vec![("name", name), ("class_name", resource)],
            BindingType::QueueProducer => vec![("binding", name), ("queue", resource)],
            BindingType::QueueConsumer => vec![("queue", resource)],
            BindingType::Ai => vec![("binding", name)],
            BindingType::Vectorize => vec![("binding", name), ("index_name", resource)],
            BindingType::Hyperdrive => vec![("binding", name), ("id", resource)],
            BindingType::AnalyticsEngine => vec![("binding", name), ("dataset", resource)],
        }
    }
}

/// Key path of a binding category inside one scope.
pub(crate) fn category_path(kind: BindingType) -> &'static [&'static str] {
    match kind {
        BindingType::Kv => &["kv_namespaces"],
        BindingType::R2 => &["r2_buckets"],
        BindingType::D1 => &["d1_databases"],
        BindingType::Service => &["services"],
        BindingType::DurableObject => &["durable_objects", "bindings"],
        BindingType::QueueProducer => &["queues", "producers"],
        BindingType::QueueConsumer => &["queues", "consumers"],
        BindingType::Ai => &["ai"],
        BindingType::Vectorize => &["vectorize"],
        BindingType::Hyperdrive => &["hyperdrive"],
        BindingType::AnalyticsEngine => &["analytics_engine_datasets"],
    }
}

/// Categories declared as a single table rather than an array of tables.
pub(crate) fn is_singleton(kind: BindingType) -> bool {
    kind == BindingType::Ai
}

/// Key prefix of a scope: empty for the top level, `env.<name>` otherwise.
pub(crate) fn scope_prefix(env: &str) -> Vec<&str> {
    if is_default_env(env) {
        Vec::new()
    } else {
        vec!["env", env]
    }
}

fn scope_label(env: &str) -> String {
    if is_default_env(env) {
        "top-level scope".to_string()
    } else {
        format!("environment '{env}'")
    }
}

/// A file loaded for editing.
pub(crate) struct Document {
    pub path: PathBuf,
    pub format: Format,
    pub content: String,
    pub config: Config,
}

/// Load, edit, verify, and write back a configuration file.
fn commit<F>(path: &Path, edit: F) -> ConfigResult<()>
where
    F: FnOnce(&Document) -> ConfigResult<String>,
{
    let format = Format::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    let config = parse_str(&content, format, path)?;
    let doc = Document {
        path: path.to_path_buf(),
        format,
        content,
        config,
    };

    let updated = edit(&doc)?;
    parse_str(&updated, format, path)
        .map_err(|e| ConfigError::write(path, format!("edit produced invalid {format}: {e}")))?;

    write_atomic(path, &updated)?;
    debug!(
        "Wrote {} ({} -> {} bytes)",
        path.display(),
        doc.content.len(),
        updated.len()
    );
    Ok(())
}

/// Replace `path` by writing a sibling temp file and renaming it over the original.
fn write_atomic(path: &Path, contents: &str) -> ConfigResult<()> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| ConfigError::io(path, e))?;
    tmp.write_all(contents.as_bytes())
        .map_err(|e| ConfigError::io(path, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| ConfigError::io(path, e))?;
    if let Ok(meta) = std::fs::metadata(path) {
        let _ = tmp.as_file().set_permissions(meta.permissions());
    }

    tmp.persist(path).map_err(|e| ConfigError::io(path, e.error))?;
    Ok(())
}

/// Append a binding to the `env` scope.
pub fn add_binding(path: impl AsRef<Path>, env: &str, def: &BindingDef) -> ConfigResult<()> {
    def.validate()?;
    let path = path.as_ref();

    commit(path, |doc| {
        let existing = doc.config.env_bindings(env);
        if def.kind == BindingType::Ai && existing.iter().any(|b| b.kind == BindingType::Ai) {
            return Err(ConfigError::already_exists(format!(
                "AI binding in {}",
                scope_label(env)
            )));
        }
        if def.kind != BindingType::QueueConsumer
            && existing.iter().any(|b| b.name == def.binding_name)
        {
            return Err(ConfigError::already_exists(format!(
                "binding '{}' in {}",
                def.binding_name,
                scope_label(env)
            )));
        }

        match doc.format {
            Format::Toml => toml_writer::add_binding(doc, env, def),
            Format::Json | Format::Jsonc => json_writer::add_binding(doc, env, def),
        }
    })?;

    info!(
        "Added {} binding '{}' to {} in {}",
        def.kind,
        def.binding_name,
        scope_label(env),
        path.display()
    );
    Ok(())
}

/// Set a variable in the `env` scope, replacing any previous value.
pub fn set_var(
    path: impl AsRef<Path>,
    env: &str,
    name: &str,
    value: impl Into<VarValue>,
) -> ConfigResult<()> {
    if name.trim().is_empty() {
        return Err(ConfigError::invalid("variable name must not be empty"));
    }
    let value = value.into();
    let path = path.as_ref();

    commit(path, |doc| match doc.format {
        Format::Toml => toml_writer::set_var(doc, env, name, &value),
        Format::Json | Format::Jsonc => json_writer::set_var(doc, env, name, &value),
    })?;

    info!("Set variable '{}' in {}", name, scope_label(env));
    Ok(())
}

/// Remove a variable from the `env` scope.
pub fn delete_var(path: impl AsRef<Path>, env: &str, name: &str) -> ConfigResult<()> {
    let path = path.as_ref();

    commit(path, |doc| {
        if !doc.config.env_vars(env).contains_key(name) {
            return Err(ConfigError::not_found(format!(
                "variable '{name}' in {}",
                scope_label(env)
            )));
        }
        match doc.format {
            Format::Toml => toml_writer::delete_var(doc, env, name),
            Format::Json | Format::Jsonc => json_writer::delete_var(doc, env, name),
        }
    })?;

    info!("Deleted variable '{}' from {}", name, scope_label(env));
    Ok(())
}

/// Add a cron expression to the top-level `triggers.crons`.
pub fn add_cron(path: impl AsRef<Path>, cron: &str) -> ConfigResult<()> {
    let cron = cron.trim();
    if cron.is_empty() {
        return Err(ConfigError::invalid("cron expression must not be empty"));
    }
    let path = path.as_ref();

    commit(path, |doc| {
        if doc.config.crons.iter().any(|c| c == cron) {
            return Err(ConfigError::already_exists(format!("cron '{cron}'")));
        }
        let mut crons = doc.config.crons.clone();
        crons.push(cron.to_string());
        write_crons(doc, &crons)
    })?;

    info!("Added cron '{}'", cron);
    Ok(())
}

/// Remove a cron expression from the top-level `triggers.crons`.
pub fn delete_cron(path: impl AsRef<Path>, cron: &str) -> ConfigResult<()> {
    let cron = cron.trim();
    let path = path.as_ref();

    commit(path, |doc| {
        if !doc.config.crons.iter().any(|c| c == cron) {
            return Err(ConfigError::not_found(format!("cron '{cron}'")));
        }
        let crons: Vec<String> = doc
            .config
            .crons
            .iter()
            .filter(|c| *c != cron)
            .cloned()
            .collect();
        write_crons(doc, &crons)
    })?;

    info!("Deleted cron '{}'", cron);
    Ok(())
}

fn write_crons(doc: &Document, crons: &[String]) -> ConfigResult<String> {
    match doc.format {
        Format::Toml => toml_writer::set_crons(doc, crons),
        Format::Json | Format::Jsonc => json_writer::set_crons(doc, crons),
    }
}

/// Declare a new, empty named environment.
pub fn add_environment(path: impl AsRef<Path>, name: &str) -> ConfigResult<()> {
    if is_default_env(name) || !ENV_NAME.is_match(name) {
        return Err(ConfigError::invalid(format!(
            "'{name}' is not a valid environment name"
        )));
    }
    let path = path.as_ref();

    commit(path, |doc| {
        if doc.config.environments.contains_key(name) {
            return Err(ConfigError::already_exists(format!("environment '{name}'")));
        }
        match doc.format {
            Format::Toml => toml_writer::add_environment(doc, name),
            Format::Json | Format::Jsonc => json_writer::add_environment(doc, name),
        }
    })?;

    info!("Added environment '{}'", name);
    Ok(())
}

/// Remove a named environment and everything declared under it.
pub fn delete_environment(path: impl AsRef<Path>, name: &str) -> ConfigResult<()> {
    if is_default_env(name) {
        return Err(ConfigError::invalid("the default scope cannot be deleted"));
    }
    let path = path.as_ref();

    commit(path, |doc| {
        if !doc.config.environments.contains_key(name) {
            return Err(ConfigError::not_found(format!("environment '{name}'")));
        }
        match doc.format {
            Format::Toml => toml_writer::delete_environment(doc, name),
            Format::Json | Format::Jsonc => json_writer::delete_environment(doc, name),
        }
    })?;

    info!("Deleted environment '{}'", name);
    Ok(())
}
