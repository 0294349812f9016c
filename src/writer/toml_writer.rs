//! TOML edits by byte-offset splicing.

use super::toml_layout::{inline_array, InlineArray, TomlLayout};
use super::{category_path, is_singleton, scope_prefix, BindingDef, Document};
use crate::config::{is_default_env, VarValue};
use crate::error::{ConfigError, ConfigResult};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static BARE_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid regex"));

pub(super) fn add_binding(doc: &Document, env: &str, def: &BindingDef) -> ConfigResult<String> {
    let layout = TomlLayout::scan(&doc.content);
    let nl = newline(&doc.content);
    let mut table = scope_prefix(env);
    table.extend_from_slice(category_path(def.kind));

    if !is_singleton(def.kind) {
        if let Some((item, exact)) = layout.inline_assignment(&table) {
            let array = inline_array(&doc.content, item).filter(|_| exact).ok_or_else(|| {
                ConfigError::write(
                    &doc.path,
                    format!(
                        "'{}' is assigned inline and is not an array; convert it to [[{}]] tables first",
                        item.key.join("."),
                        table.join(".")
                    ),
                )
            })?;
            debug!("Appending to inline array '{}'", table.join("."));
            return Ok(append_to_inline_array(
                &doc.content,
                &array,
                &render_inline_table(def),
                nl,
            ));
        }
    }

    let mut block = if is_singleton(def.kind) {
        format!("[{}]\n", render_path(&table))
    } else {
        format!("[[{}]]\n", render_path(&table))
    };
    for (key, value) in def.fields() {
        block.push_str(&format!("{key} = {}\n", render_string(&value)));
    }

    Ok(insert_in_scope(&doc.content, &layout, env, &block, nl))
}

pub(super) fn set_var(
    doc: &Document,
    env: &str,
    name: &str,
    value: &VarValue,
) -> ConfigResult<String> {
    let layout = TomlLayout::scan(&doc.content);
    let src = &doc.content;
    let nl = newline(src);
    let line = format!("{} = {}{nl}", render_key(name), render_value(value)?);

    let mut vars_key = scope_prefix(env);
    vars_key.push("vars");

    if let Some(index) = layout.find_table(&vars_key) {
        if let Some(entry) = layout.entries(index).iter().find(|e| e.key_is(&[name])) {
            let replacement = if src[..entry.end].ends_with('\n') {
                line
            } else {
                line.trim_end_matches(nl).to_string()
            };
            return Ok(splice(src, entry.start..entry.end, &replacement));
        }
        let at = layout.section_content_end(index);
        return Ok(insert_line(src, at, &line, nl));
    }

    reject_inline(doc, &layout, env, "vars")?;
    let block = format!("[{}]\n{line}", render_path(&vars_key));
    Ok(insert_in_scope(src, &layout, env, &block, nl))
}

pub(super) fn delete_var(doc: &Document, env: &str, name: &str) -> ConfigResult<String> {
    let layout = TomlLayout::scan(&doc.content);
    let mut vars_key = scope_prefix(env);
    vars_key.push("vars");

    let entry = layout
        .find_table(&vars_key)
        .and_then(|index| layout.entries(index).iter().find(|e| e.key_is(&[name])))
        .ok_or_else(|| {
            ConfigError::write(
                &doc.path,
                format!("variable '{name}' is not declared in a [{}] table", vars_key.join(".")),
            )
        })?;

    Ok(splice(&doc.content, entry.leading..entry.end, ""))
}

pub(super) fn set_crons(doc: &Document, crons: &[String]) -> ConfigResult<String> {
    let layout = TomlLayout::scan(&doc.content);
    let src = &doc.content;
    let nl = newline(src);
    let array = toml::Value::Array(crons.iter().cloned().map(toml::Value::String).collect());
    let line = format!("crons = {array}{nl}");

    if let Some(index) = layout.find_table(&["triggers"]) {
        if let Some(entry) = layout.entries(index).iter().find(|e| e.key_is(&["crons"])) {
            return Ok(splice(src, entry.start..entry.end, &line));
        }
        return Ok(insert_line(src, layout.items()[index].end, &line, nl));
    }

    reject_inline(doc, &layout, "", "triggers")?;
    let block = format!("[triggers]\n{line}");
    Ok(insert_block(src, layout.top_level_insertion_point(), &block, nl))
}

pub(super) fn add_environment(doc: &Document, name: &str) -> ConfigResult<String> {
    let block = format!("[{}]\n", render_path(&["env", name]));
    let nl = newline(&doc.content);
    Ok(insert_block(&doc.content, doc.content.len(), &block, nl))
}

pub(super) fn delete_environment(doc: &Document, name: &str) -> ConfigResult<String> {
    let layout = TomlLayout::scan(&doc.content);
    let ranges = layout.sections_under(&["env", name]);
    if ranges.is_empty() {
        return Err(ConfigError::write(
            &doc.path,
            format!("environment '{name}' is declared inline; remove it by hand"),
        ));
    }

    let src = &doc.content;
    let mut out = String::with_capacity(src.len());
    let mut cursor = 0;
    for range in &ranges {
        out.push_str(&src[cursor..range.start]);
        cursor = range.end;
    }
    out.push_str(&src[cursor..]);

    if cursor == src.len() {
        let trimmed = out.trim_end().len();
        out.truncate(trimmed);
        if !out.is_empty() {
            out.push_str(newline(src));
        }
    }
    Ok(out)
}

/// Insert a table block at the end of the `env` scope.
fn insert_in_scope(src: &str, layout: &TomlLayout, env: &str, block: &str, nl: &str) -> String {
    if is_default_env(env) {
        let at = layout.top_level_insertion_point();
        debug!("Inserting top-level block at offset {}", at);
        return insert_block(src, at, block, nl);
    }

    match layout.env_insertion_point(env) {
        Some(at) => {
            debug!("Inserting block for env '{}' at offset {}", env, at);
            insert_block(src, at, block, nl)
        }
        None => {
            let header = format!("[{}]\n\n{block}", render_path(&["env", env]));
            insert_block(src, src.len(), &header, nl)
        }
    }
}

/// Refuse to add a `[key]` table when the scope already assigns `key` inline.
fn reject_inline(doc: &Document, layout: &TomlLayout, env: &str, key: &str) -> ConfigResult<()> {
    let prefix = scope_prefix(env);
    let entries = if prefix.is_empty() {
        layout.root_entries()
    } else {
        match layout.find_table(&prefix) {
            Some(index) => layout.entries(index),
            None => &[],
        }
    };

    if entries.iter().any(|e| e.key.first().map(String::as_str) == Some(key)) {
        return Err(ConfigError::write(
            &doc.path,
            format!("'{key}' is assigned inline; convert it to a [{key}] table first"),
        ));
    }
    Ok(())
}

/// Insert a table block at `at`, separated from neighbours by blank lines.
fn insert_block(src: &str, at: usize, block: &str, nl: &str) -> String {
    let (head, tail) = src.split_at(at);
    let block = with_newline(block, nl);
    let mut out = String::with_capacity(src.len() + block.len() + 2 * nl.len());
    out.push_str(head);
    if !out.is_empty() && !out.ends_with('\n') {
        out.push_str(nl);
    }
    if !out.is_empty() && !ends_with_blank_line(&out) {
        out.push_str(nl);
    }
    out.push_str(&block);
    if !tail.is_empty() {
        out.push_str(nl);
        out.push_str(tail);
    }
    out
}

/// Insert one statement line at `at`, which must be a line boundary or EOF.
fn insert_line(src: &str, at: usize, line: &str, nl: &str) -> String {
    let (head, tail) = src.split_at(at);
    let mut out = String::with_capacity(src.len() + line.len() + nl.len());
    out.push_str(head);
    if !out.is_empty() && !out.ends_with('\n') {
        out.push_str(nl);
    }
    out.push_str(line);
    out.push_str(tail);
    out
}

/// Add `entry` as the last element of an inline array, following its layout.
///
/// One element per line keeps that shape (and the trailing comma, if any);
/// anything else gets `, entry` after the last element.
fn append_to_inline_array(src: &str, array: &InlineArray, entry: &str, nl: &str) -> String {
    let Some(last) = array.last else {
        return splice(src, array.open + 1..array.open + 1, entry);
    };
    let trailing_comma = src.as_bytes()[last] == b',';
    let close_line = line_start(src, array.close);
    let one_per_line = close_line > last && src[close_line..array.close].trim().is_empty();

    if !one_per_line {
        let text = if trailing_comma {
            format!(" {entry}")
        } else {
            format!(", {entry}")
        };
        return splice(src, last + 1..last + 1, &text);
    }

    let indent = leading_blanks(&src[line_start(src, last)..]);
    let comma = if trailing_comma { "," } else { "" };
    let mut out = splice(src, close_line..close_line, &format!("{indent}{entry}{comma}{nl}"));
    if !trailing_comma {
        out.insert(last + 1, ',');
    }
    out
}

fn line_start(src: &str, at: usize) -> usize {
    src[..at].rfind('\n').map_or(0, |i| i + 1)
}

fn leading_blanks(line: &str) -> &str {
    let end = line
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(line.len());
    &line[..end]
}

/// Line terminator used by the file: CRLF when it already has one.
fn newline(src: &str) -> &'static str {
    if src.contains("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

fn with_newline(text: &str, nl: &str) -> String {
    if nl == "\n" {
        text.to_string()
    } else {
        text.replace("\r\n", "\n").replace('\n', nl)
    }
}

fn splice(src: &str, range: std::ops::Range<usize>, replacement: &str) -> String {
    let mut out = String::with_capacity(src.len() + replacement.len());
    out.push_str(&src[..range.start]);
    out.push_str(replacement);
    out.push_str(&src[range.end..]);
    out
}

fn ends_with_blank_line(s: &str) -> bool {
    let mut lines = s.rsplit('\n');
    matches!(
        (lines.next(), lines.next(), lines.next()),
        (Some(""), Some(prev), Some(_)) if prev.trim().is_empty()
    )
}

fn render_string(s: &str) -> String {
    toml::Value::String(s.to_string()).to_string()
}

fn render_key(key: &str) -> String {
    if BARE_KEY.is_match(key) {
        key.to_string()
    } else {
        render_string(key)
    }
}

fn render_path(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|s| render_key(s))
        .collect::<Vec<_>>()
        .join(".")
}

fn render_inline_table(def: &BindingDef) -> String {
    let fields: Vec<String> = def
        .fields()
        .into_iter()
        .map(|(key, value)| format!("{key} = {}", render_string(&value)))
        .collect();
    format!("{{ {} }}", fields.join(", "))
}

fn render_value(value: &VarValue) -> ConfigResult<String> {
    let rendered = match value {
        VarValue::Text(s) => render_string(s),
        VarValue::Integer(i) => i.to_string(),
        VarValue::Bool(b) => b.to_string(),
        VarValue::Float(x) => toml::Value::Float(*x).to_string(),
        VarValue::Json(json) => toml::Value::try_from(json)
            .map_err(|e| ConfigError::invalid(format!("value cannot be written as TOML: {e}")))?
            .to_string(),
    };
    Ok(rendered)
}
