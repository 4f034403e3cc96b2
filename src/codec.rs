//! YAML codec: text to raw document tree and canonical tree back to text.
//!
//! Decoding goes through `serde_yaml`, which resolves anchors and aliases
//! during parsing. Merge keys (`<<:`) are applied here afterward with
//! deep-map semantics: explicit keys win on collision, except that when both
//! sides of a collision are mappings their entries merge recursively. Encoding
//! drops bookkeeping keys and empty values, then emits block-style YAML.

use serde_json::{Map as JsonMap, Number as JsonNumber, Value as JsonValue};

use crate::error::ComposeError;
use crate::model::ComposeDocument;
use crate::normalize::document_to_tree;
use crate::yaml_writer::to_yaml_string;

/// YAML mapping key used for merge entries.
const MERGE_KEY: &str = "<<";

/// Decodes YAML text into a raw document tree.
///
/// Fails only on syntactically invalid YAML; the error carries line/column
/// when the underlying parser reports a location. Empty input decodes to
/// `null`.
pub fn decode(text: &str) -> Result<JsonValue, ComposeError> {
    if text.trim().is_empty() {
        return Ok(JsonValue::Null);
    }

    let value: serde_yaml::Value = serde_yaml::from_str(text).map_err(yaml_error)?;
    let mut tree = yaml_to_json(value);
    apply_merge_keys(&mut tree);
    Ok(tree)
}

/// Serializes a document: canonical tree, cleaned, block-style YAML.
///
/// Entity names are load-bearing even when their declaration is empty, so
/// entries inside the five top-level sections survive cleaning as `null`
/// (`pgdata:` with no options stays a declared volume).
pub fn encode(document: &ComposeDocument) -> String {
    let tree = document_to_tree(document);
    let JsonValue::Object(map) = tree else {
        return to_yaml_string(&JsonValue::Object(JsonMap::new()));
    };

    let mut out = JsonMap::new();
    for (key, value) in map {
        if matches!(
            key.as_str(),
            "services" | "networks" | "volumes" | "secrets" | "configs"
        ) {
            let JsonValue::Object(entries) = value else {
                continue;
            };
            if entries.is_empty() {
                continue;
            }
            let mut section = JsonMap::new();
            for (name, entry) in entries {
                section.insert(name, clean_tree(&entry).unwrap_or(JsonValue::Null));
            }
            out.insert(key, JsonValue::Object(section));
        } else if let Some(cleaned) = clean_tree(&value) {
            out.insert(key, cleaned);
        }
    }
    to_yaml_string(&JsonValue::Object(out))
}

fn yaml_error(err: serde_yaml::Error) -> ComposeError {
    let location = err.location();
    ComposeError::Yaml {
        message: err.to_string(),
        line: location.as_ref().map(|l| l.line()),
        column: location.as_ref().map(|l| l.column()),
    }
}

/// Converts a parsed YAML value into the JSON tree used by the pipeline.
/// Non-string mapping keys are stringified; unrepresentable keys are skipped.
fn yaml_to_json(value: serde_yaml::Value) -> JsonValue {
    match value {
        serde_yaml::Value::Null => JsonValue::Null,
        serde_yaml::Value::Bool(b) => JsonValue::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                JsonValue::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                JsonValue::Number(u.into())
            } else {
                n.as_f64()
                    .and_then(JsonNumber::from_f64)
                    .map(JsonValue::Number)
                    .unwrap_or(JsonValue::Null)
            }
        }
        serde_yaml::Value::String(s) => JsonValue::String(s),
        serde_yaml::Value::Sequence(items) => {
            JsonValue::Array(items.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => {
            let mut out = JsonMap::new();
            for (key, val) in mapping {
                let key = match key {
                    serde_yaml::Value::String(s) => s,
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    _ => continue,
                };
                out.insert(key, yaml_to_json(val));
            }
            JsonValue::Object(out)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

/// Applies `<<:` merge entries throughout the tree.
///
/// A merge value may be a single mapping or a list of mappings; for lists,
/// earlier entries take precedence among themselves. Explicit keys on the
/// node override merged keys, except mapping-vs-mapping collisions, which
/// merge recursively so aliased blocks like shared `environment` maps
/// combine instead of disappearing.
fn apply_merge_keys(tree: &mut JsonValue) {
    match tree {
        JsonValue::Object(map) => {
            let merge_value = map.shift_remove(MERGE_KEY);

            for value in map.values_mut() {
                apply_merge_keys(value);
            }

            if let Some(merge_value) = merge_value {
                let sources = match merge_value {
                    JsonValue::Array(items) => items,
                    single => vec![single],
                };
                for source in sources {
                    let JsonValue::Object(source_map) = source else {
                        continue;
                    };
                    for (key, val) in source_map {
                        merge_entry(map, key, val);
                    }
                }
            }
        }
        JsonValue::Array(items) => {
            for item in items {
                apply_merge_keys(item);
            }
        }
        _ => {}
    }
}

fn merge_entry(target: &mut JsonMap<String, JsonValue>, key: String, mut val: JsonValue) {
    apply_merge_keys(&mut val);
    match target.get_mut(&key) {
        None => {
            target.insert(key, val);
        }
        Some(JsonValue::Object(existing)) => {
            if let JsonValue::Object(incoming) = val {
                for (inner_key, inner_val) in incoming {
                    merge_entry(existing, inner_key, inner_val);
                }
            }
            // Non-mapping merge source loses to the explicit mapping.
        }
        Some(_) => {
            // Explicit non-mapping value wins.
        }
    }
}

/// Recursively removes values that carry no information: `null`, empty
/// strings, empty containers, and any key starting with the bookkeeping
/// marker `_`. Returns `None` when nothing remains.
pub fn clean_tree(value: &JsonValue) -> Option<JsonValue> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) if s.is_empty() => None,
        JsonValue::Object(map) => {
            let mut out = JsonMap::new();
            for (key, val) in map {
                if key.starts_with('_') {
                    continue;
                }
                if let Some(cleaned) = clean_tree(val) {
                    out.insert(key.clone(), cleaned);
                }
            }
            if out.is_empty() {
                None
            } else {
                Some(JsonValue::Object(out))
            }
        }
        JsonValue::Array(items) => {
            let cleaned: Vec<JsonValue> = items.iter().filter_map(clean_tree).collect();
            if cleaned.is_empty() {
                None
            } else {
                Some(JsonValue::Array(cleaned))
            }
        }
        other => Some(other.clone()),
    }
}
