//! Decoding and normalization.
//!
//! Files are decoded into the raw schema (TOML directly, JSON after comment
//! stripping) and then every binding category is projected into a flat
//! [`Binding`] list.

use super::jsonc::strip_jsonc;
use super::model::{Binding, BindingType, Config, Environment, Format, Route};
use super::schema::{RawBindings, RawConfig, RawEnv, RawRoute};
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use tracing::debug;

/// Read and parse a configuration file, dispatching on its extension.
pub fn parse(path: impl AsRef<Path>) -> ConfigResult<Config> {
    let path = path.as_ref();
    let format = Format::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    parse_str(&content, format, path)
}

/// Parse configuration source that is already in memory.
///
/// `path` is recorded on the resulting [`Config`] and used in error messages.
pub fn parse_str(content: &str, format: Format, path: impl AsRef<Path>) -> ConfigResult<Config> {
    let path = path.as_ref();
    let raw = decode(content, format, path)?;
    let config = normalize(raw, format, path);

    debug!(
        "Parsed {} ({}): {} bindings, {} environments",
        path.display(),
        format,
        config.bindings.len(),
        config.environments.len()
    );

    Ok(config)
}

fn decode(content: &str, format: Format, path: &Path) -> ConfigResult<RawConfig> {
    match format {
        Format::Toml => toml::from_str(content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        }),
        Format::Json | Format::Jsonc => {
            serde_json::from_str(&strip_jsonc(content)).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

fn normalize(raw: RawConfig, format: Format, path: &Path) -> Config {
    let environments = raw
        .env
        .into_iter()
        .map(|(name, env)| (name, normalize_env(env)))
        .collect();

    Config {
        path: path.to_path_buf(),
        format,
        name: raw.name,
        main: raw.main,
        account_id: raw.account_id,
        workers_dev: raw.workers_dev,
        compatibility_date: raw.compatibility_date,
        compatibility_flags: raw.compatibility_flags,
        routes: collect_routes(raw.route, raw.routes),
        bindings: project_bindings(&raw.bindings),
        vars: raw.vars,
        crons: raw.triggers.map(|t| t.crons).unwrap_or_default(),
        environments,
    }
}

fn normalize_env(raw: RawEnv) -> Environment {
    Environment {
        name: raw.name,
        compatibility_date: raw.compatibility_date,
        compatibility_flags: raw.compatibility_flags,
        routes: collect_routes(raw.route, raw.routes),
        bindings: project_bindings(&raw.bindings),
        vars: raw.vars,
    }
}

/// `route` and `routes` may both be present; the single route comes first.
fn collect_routes(route: Option<RawRoute>, routes: Vec<RawRoute>) -> Vec<Route> {
    route
        .into_iter()
        .chain(routes)
        .map(|r| match r {
            RawRoute::Pattern(pattern) => Route {
                pattern,
                zone_name: None,
            },
            RawRoute::Detailed { pattern, zone_name } => Route { pattern, zone_name },
        })
        .collect()
}

fn binding(name: &str, kind: BindingType, resource_id: &str) -> Binding {
    Binding {
        name: name.to_string(),
        kind,
        resource_id: resource_id.to_string(),
    }
}

/// Flatten every binding category of one scope, in a fixed category order.
pub(crate) fn project_bindings(raw: &RawBindings) -> Vec<Binding> {
    let mut out = Vec::new();

    for kv in &raw.kv_namespaces {
        out.push(binding(&kv.binding, BindingType::Kv, &kv.id));
    }
    for bucket in &raw.r2_buckets {
        out.push(binding(&bucket.binding, BindingType::R2, &bucket.bucket_name));
    }
    for db in &raw.d1_databases {
        let id = db
            .database_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(&db.database_name);
        out.push(binding(&db.binding, BindingType::D1, id));
    }
    for svc in &raw.services {
        out.push(binding(&svc.binding, BindingType::Service, &svc.service));
    }
    if let Some(ref durable) = raw.durable_objects {
        for obj in &durable.bindings {
            out.push(binding(&obj.name, BindingType::DurableObject, &obj.class_name));
        }
    }
    if let Some(ref queues) = raw.queues {
        for producer in &queues.producers {
            out.push(binding(&producer.binding, BindingType::QueueProducer, &producer.queue));
        }
        for consumer in &queues.consumers {
            out.push(binding("consumer", BindingType::QueueConsumer, &consumer.queue));
        }
    }
    if let Some(ref ai) = raw.ai {
        out.push(binding(&ai.binding, BindingType::Ai, ""));
    }
    for index in &raw.vectorize {
        out.push(binding(&index.binding, BindingType::Vectorize, &index.index_name));
    }
    for hd in &raw.hyperdrive {
        out.push(binding(&hd.binding, BindingType::Hyperdrive, &hd.id));
    }
    for ds in &raw.analytics_engine_datasets {
        let dataset = ds.dataset.as_deref().unwrap_or(&ds.binding);
        out.push(binding(&ds.binding, BindingType::AnalyticsEngine, dataset));
    }

    out
}
