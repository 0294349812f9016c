//! Raw configuration schema.
//!
//! These types mirror the on-disk shape of a worker configuration file and are
//! shared by the TOML and JSON decoders. Nothing here is exposed to callers;
//! the parser projects them into the normalized [`Config`](super::Config).

use super::model::VarValue;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Root of a configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawConfig {
    /// Worker name
    pub name: Option<String>,
    /// Entry point module
    pub main: Option<String>,
    pub account_id: Option<String>,
    pub workers_dev: Option<bool>,
    pub compatibility_date: Option<String>,
    pub compatibility_flags: Vec<String>,
    /// Single route shorthand
    pub route: Option<RawRoute>,
    pub routes: Vec<RawRoute>,
    pub triggers: Option<RawTriggers>,
    pub vars: BTreeMap<String, VarValue>,
    #[serde(flatten)]
    pub bindings: RawBindings,
    /// Named environment overrides
    pub env: BTreeMap<String, RawEnv>,
}

/// A named environment override block.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawEnv {
    pub name: Option<String>,
    pub compatibility_date: Option<String>,
    pub compatibility_flags: Vec<String>,
    pub route: Option<RawRoute>,
    pub routes: Vec<RawRoute>,
    pub vars: BTreeMap<String, VarValue>,
    #[serde(flatten)]
    pub bindings: RawBindings,
}

/// Route given either as a bare pattern or as a table.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawRoute {
    Pattern(String),
    Detailed {
        pattern: String,
        #[serde(default)]
        zone_name: Option<String>,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawTriggers {
    pub crons: Vec<String>,
}

/// Every resource-binding category, as declared in one scope.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawBindings {
    pub kv_namespaces: Vec<RawKvNamespace>,
    pub r2_buckets: Vec<RawR2Bucket>,
    pub d1_databases: Vec<RawD1Database>,
    pub services: Vec<RawService>,
    pub durable_objects: Option<RawDurableObjects>,
    pub queues: Option<RawQueues>,
    pub ai: Option<RawAi>,
    pub vectorize: Vec<RawVectorize>,
    pub hyperdrive: Vec<RawHyperdrive>,
    pub analytics_engine_datasets: Vec<RawAnalyticsDataset>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawKvNamespace {
    pub binding: String,
    pub id: String,
    pub preview_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawR2Bucket {
    pub binding: String,
    pub bucket_name: String,
    pub preview_bucket_name: Option<String>,
    pub jurisdiction: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawD1Database {
    pub binding: String,
    pub database_name: String,
    pub database_id: Option<String>,
    pub preview_database_id: Option<String>,
    pub migrations_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawService {
    pub binding: String,
    pub service: String,
    pub environment: Option<String>,
    pub entrypoint: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawDurableObjects {
    pub bindings: Vec<RawDurableObjectBinding>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawDurableObjectBinding {
    pub name: String,
    pub class_name: String,
    pub script_name: Option<String>,
}

/// Queue bindings nest producers and consumers under one key.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawQueues {
    pub producers: Vec<RawQueueProducer>,
    pub consumers: Vec<RawQueueConsumer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawQueueProducer {
    pub binding: String,
    pub queue: String,
    pub delivery_delay: Option<u32>,
}

/// Consumers have no binding name upstream.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawQueueConsumer {
    pub queue: String,
    pub max_batch_size: Option<u32>,
    pub max_batch_timeout: Option<u32>,
    pub max_retries: Option<u32>,
    pub dead_letter_queue: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawAi {
    pub binding: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawVectorize {
    pub binding: String,
    pub index_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawHyperdrive {
    pub binding: String,
    pub id: String,
    #[serde(rename = "localConnectionString")]
    pub local_connection_string: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RawAnalyticsDataset {
    pub binding: String,
    pub dataset: Option<String>,
}
