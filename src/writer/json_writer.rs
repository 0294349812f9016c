//! JSON/JSONC edits.
//!
//! The document is comment-stripped, edited as a `serde_json::Value` through
//! dotted paths (`-1` appends to an array), and reserialized with the file's
//! own indentation. Comments do not survive.

use super::{category_path, is_singleton, scope_prefix, BindingDef, Document};
use crate::config::{strip_jsonc, VarValue};
use crate::error::{ConfigError, ConfigResult};
use serde::Serialize;
use serde_json::{Map, Value};

/// Path segment meaning "append to this array".
const APPEND: &str = "-1";

pub(super) fn add_binding(doc: &Document, env: &str, def: &BindingDef) -> ConfigResult<String> {
    let mut root = load(doc)?;
    let entry: Map<String, Value> = def
        .fields()
        .into_iter()
        .map(|(k, v)| (k.to_string(), Value::String(v)))
        .collect();

    let mut path = scope_prefix(env);
    path.extend_from_slice(category_path(def.kind));
    if !is_singleton(def.kind) {
        path.push(APPEND);
    }

    set_path(&mut root, &path, Value::Object(entry)).map_err(|m| ConfigError::write(&doc.path, m))?;
    render(doc, &root)
}

pub(super) fn set_var(
    doc: &Document,
    env: &str,
    name: &str,
    value: &VarValue,
) -> ConfigResult<String> {
    let mut root = load(doc)?;
    let value = serde_json::to_value(value)
        .map_err(|e| ConfigError::invalid(format!("value cannot be written as JSON: {e}")))?;

    let mut path = scope_prefix(env);
    path.extend_from_slice(&["vars", name]);
    set_path(&mut root, &path, value).map_err(|m| ConfigError::write(&doc.path, m))?;
    render(doc, &root)
}

pub(super) fn delete_var(doc: &Document, env: &str, name: &str) -> ConfigResult<String> {
    let mut root = load(doc)?;
    let mut path = scope_prefix(env);
    path.extend_from_slice(&["vars", name]);

    if !remove_path(&mut root, &path) {
        return Err(ConfigError::write(
            &doc.path,
            format!("variable '{name}' is not declared at {}", path.join(".")),
        ));
    }
    render(doc, &root)
}

pub(super) fn set_crons(doc: &Document, crons: &[String]) -> ConfigResult<String> {
    let mut root = load(doc)?;
    let value = Value::Array(crons.iter().cloned().map(Value::String).collect());
    set_path(&mut root, &["triggers", "crons"], value)
        .map_err(|m| ConfigError::write(&doc.path, m))?;
    render(doc, &root)
}

pub(super) fn add_environment(doc: &Document, name: &str) -> ConfigResult<String> {
    let mut root = load(doc)?;
    set_path(&mut root, &["env", name], Value::Object(Map::new()))
        .map_err(|m| ConfigError::write(&doc.path, m))?;
    render(doc, &root)
}

pub(super) fn delete_environment(doc: &Document, name: &str) -> ConfigResult<String> {
    let mut root = load(doc)?;
    if !remove_path(&mut root, &["env", name]) {
        return Err(ConfigError::write(
            &doc.path,
            format!("environment '{name}' is not declared under \"env\""),
        ));
    }
    render(doc, &root)
}

fn load(doc: &Document) -> ConfigResult<Value> {
    let root: Value =
        serde_json::from_str(&strip_jsonc(&doc.content)).map_err(|source| ConfigError::Json {
            path: doc.path.clone(),
            source,
        })?;
    if !root.is_object() {
        return Err(ConfigError::write(&doc.path, "top-level value is not an object"));
    }
    Ok(root)
}

/// Set `value` at `path`, creating objects and arrays along the way.
///
/// A trailing `-1` segment appends to the array at the preceding key.
pub(crate) fn set_path(root: &mut Value, path: &[&str], value: Value) -> Result<(), String> {
    let Some((last, parents)) = path.split_last() else {
        return Err("empty path".to_string());
    };

    let mut current = root;
    for (i, segment) in parents.iter().enumerate() {
        let wants_array = path[i + 1] == APPEND;
        current = child_mut(current, segment, wants_array)?;
    }

    match current {
        Value::Array(items) if *last == APPEND => {
            items.push(value);
            Ok(())
        }
        Value::Object(map) if *last != APPEND => {
            map.insert((*last).to_string(), value);
            Ok(())
        }
        other => Err(format!(
            "cannot set '{}' on a {} value",
            path.join("."),
            kind_name(other)
        )),
    }
}

fn child_mut<'a>(
    current: &'a mut Value,
    segment: &str,
    wants_array: bool,
) -> Result<&'a mut Value, String> {
    let kind = kind_name(current);
    let Value::Object(map) = current else {
        return Err(format!("cannot descend into '{segment}' of a {kind} value"));
    };

    let child = map.entry(segment.to_string()).or_insert(Value::Null);
    if child.is_null() {
        *child = if wants_array {
            Value::Array(Vec::new())
        } else {
            Value::Object(Map::new())
        };
    }
    Ok(child)
}

/// Remove the key at `path`. Returns false when nothing was there.
pub(crate) fn remove_path(root: &mut Value, path: &[&str]) -> bool {
    let Some((last, parents)) = path.split_last() else {
        return false;
    };

    let mut current = root;
    for segment in parents {
        match current.get_mut(*segment) {
            Some(next) => current = next,
            None => return false,
        }
    }
    current
        .as_object_mut()
        .map_or(false, |map| map.shift_remove(*last).is_some())
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Indentation unit of the first indented line, defaulting to two spaces.
fn detect_indent(src: &str) -> String {
    src.lines()
        .skip(1)
        .map(|line| {
            line.chars()
                .take_while(|c| *c == ' ' || *c == '\t')
                .collect::<String>()
        })
        .find(|indent| !indent.is_empty())
        .map(|indent| {
            if indent.starts_with('\t') {
                "\t".to_string()
            } else {
                indent
            }
        })
        .unwrap_or_else(|| "  ".to_string())
}

fn render(doc: &Document, root: &Value) -> ConfigResult<String> {
    let indent = detect_indent(&doc.content);
    let mut buf = Vec::with_capacity(doc.content.len() + 64);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    root.serialize(&mut serializer).map_err(|source| ConfigError::Json {
        path: doc.path.clone(),
        source,
    })?;

    let mut out = String::from_utf8(buf).map_err(|e| ConfigError::write(&doc.path, e.to_string()))?;
    out.push('\n');
    Ok(out)
}
