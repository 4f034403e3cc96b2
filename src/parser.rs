//! Compose parse pipeline: decode, interpolate, resolve `include` and
//! `extends`, filter profiles, normalize.
//!
//! Only a syntactically invalid primary document is fatal. Every other
//! stage is best-effort: failures degrade the affected subset and are
//! recorded as [`Diagnostic`] entries on the result, so a caller always
//! gets back the most complete document the input allows.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::{debug, warn};

use crate::codec;
use crate::error::ComposeError;
use crate::interpolate::{interpolate_tree, parse_env_file, VariableReport};
use crate::model::{ComposeDocument, IssueSeverity};
use crate::normalize::{document_from_tree, normalize_string_list, normalize_string_map, scalar_to_string};

/// Pseudo file key for the primary document in cycle tracking.
const PRIMARY_FILE: &str = "<primary>";

/// Service keys that concatenate (base first) when a service extends another.
const EXTENDS_CONCAT_KEYS: &[&str] = &["ports", "volumes", "networks", "env_file"];

/// Service keys that merge per entry, extension winning.
const EXTENDS_MERGE_KEYS: &[&str] = &["environment", "labels"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Pipeline stage a diagnostic belongs to.
pub enum Stage {
    Variables,
    Include,
    Extends,
    Profiles,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Non-fatal problem recorded while parsing.
pub struct Diagnostic {
    pub stage: Stage,
    pub severity: IssueSeverity,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Parse inputs. Plain serializable data so the whole pipeline can sit
/// behind a message boundary unchanged.
pub struct ParseOptions {
    /// Variables available to `${VAR}` interpolation. Wins over `.env`.
    #[serde(default)]
    pub environment: HashMap<String, String>,
    /// Profiles to keep when filtering. Empty disables filtering.
    #[serde(default)]
    pub active_profiles: Vec<String>,
    /// Auxiliary file contents by relative path, for `include`, `extends`
    /// with `file:`, and `.env`.
    #[serde(default)]
    pub files: HashMap<String, String>,
    /// Directory the primary document notionally lives in; auxiliary paths
    /// resolve against it.
    #[serde(default)]
    pub base_path: Option<String>,
    #[serde(default = "enabled")]
    pub enable_variables: bool,
    #[serde(default = "enabled")]
    pub enable_includes: bool,
    #[serde(default = "enabled")]
    pub enable_extends: bool,
    #[serde(default = "enabled")]
    pub enable_profiles: bool,
}

fn enabled() -> bool {
    true
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            environment: HashMap::new(),
            active_profiles: Vec::new(),
            files: HashMap::new(),
            base_path: None,
            enable_variables: true,
            enable_includes: true,
            enable_extends: true,
            enable_profiles: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Everything a parse produces besides the fatal-error channel.
pub struct ParseResult {
    pub document: ComposeDocument,
    /// Distinct profile names across all services, pre-filtering.
    pub profiles: Vec<String>,
    /// Services per profile, pre-filtering.
    pub profile_counts: IndexMap<String, usize>,
    /// Every `${VAR}` name encountered, first-seen order.
    pub variables: Vec<String>,
    /// Names with neither a supplied value nor a default.
    pub undefined_variables: Vec<String>,
    pub errors: Vec<Diagnostic>,
}

/// Parses Compose YAML with default options.
pub fn parse(text: &str) -> Result<ParseResult, ComposeError> {
    parse_with_options(text, &ParseOptions::default())
}

/// Parses Compose YAML: the full pipeline described in the module docs.
pub fn parse_with_options(text: &str, options: &ParseOptions) -> Result<ParseResult, ComposeError> {
    let mut tree = codec::decode(text)?;
    match &tree {
        JsonValue::Object(_) => {}
        JsonValue::Null => tree = JsonValue::Object(JsonMap::new()),
        _ => {
            return Err(ComposeError::Document(
                "top level of a Compose file must be a mapping".to_string(),
            ))
        }
    }

    let environment = build_environment(options);
    let mut report = VariableReport::default();
    let mut diagnostics = Vec::new();

    if options.enable_variables {
        debug!("interpolating variables");
        interpolate_tree(&mut tree, &environment, &mut report);
    }

    if options.enable_includes {
        let mut visited = HashSet::new();
        resolve_includes(
            &mut tree,
            options,
            &environment,
            &mut visited,
            &mut report,
            &mut diagnostics,
        );
    }

    if options.enable_extends {
        resolve_all_extends(&mut tree, options, &environment, &mut diagnostics);
    }

    let (profiles, profile_counts) = collect_profiles(&tree);
    if options.enable_profiles && !options.active_profiles.is_empty() {
        filter_profiles(&mut tree, &options.active_profiles);
    }

    let document = document_from_tree(&tree);

    let mut errors = report.diagnostics;
    errors.extend(diagnostics);
    debug!(
        services = document.services.len(),
        diagnostics = errors.len(),
        "parse complete"
    );

    Ok(ParseResult {
        document,
        profiles,
        profile_counts,
        variables: report.variables,
        undefined_variables: report.undefined,
        errors,
    })
}

/// Layers the supplied environment over `.env` content from the file map.
fn build_environment(options: &ParseOptions) -> HashMap<String, String> {
    let mut environment = HashMap::new();
    if let Some(text) = lookup_file(options, &join_path(options.base_path.as_deref(), ".env")) {
        environment.extend(parse_env_file(text));
    }
    environment.extend(
        options
            .environment
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
    );
    environment
}

// ---------------------------------------------------------------------------
// Include resolution
// ---------------------------------------------------------------------------

fn resolve_includes(
    tree: &mut JsonValue,
    options: &ParseOptions,
    environment: &HashMap<String, String>,
    visited: &mut HashSet<String>,
    report: &mut VariableReport,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let Some(map) = tree.as_object_mut() else {
        return;
    };
    let Some(include_value) = map.shift_remove("include") else {
        return;
    };

    let entries = match include_value {
        JsonValue::Array(items) => items,
        single => vec![single],
    };

    for entry in entries {
        let path = match &entry {
            JsonValue::String(path) => Some(path.clone()),
            JsonValue::Object(obj) => obj.get("path").and_then(scalar_to_string),
            _ => None,
        };
        let Some(path) = path else {
            push_warning(
                diagnostics,
                Stage::Include,
                "include entry has no usable path".to_string(),
            );
            continue;
        };

        let resolved = join_path(options.base_path.as_deref(), &path);
        if !visited.insert(resolved.clone()) {
            push_warning(
                diagnostics,
                Stage::Include,
                format!("include cycle detected at '{path}', skipping"),
            );
            continue;
        }

        let Some(text) = lookup_file(options, &resolved) else {
            push_warning(
                diagnostics,
                Stage::Include,
                format!("include file '{path}' not found"),
            );
            continue;
        };

        let mut included = match codec::decode(text) {
            Ok(JsonValue::Object(map)) => JsonValue::Object(map),
            Ok(_) => {
                push_warning(
                    diagnostics,
                    Stage::Include,
                    format!("include file '{path}' is not a mapping, skipping"),
                );
                continue;
            }
            Err(err) => {
                push_warning(
                    diagnostics,
                    Stage::Include,
                    format!("include file '{path}' failed to parse: {err}"),
                );
                continue;
            }
        };

        if options.enable_variables {
            interpolate_tree(&mut included, environment, report);
        }
        resolve_includes(&mut included, options, environment, visited, report, diagnostics);
        if options.enable_extends {
            resolve_all_extends(&mut included, options, environment, diagnostics);
        }

        merge_included(tree, &included);
        debug!(path = %path, "merged include");
    }
}

/// Shallow-merges the included file's top-level resource maps into the
/// parent. Parent entries win on key collision.
fn merge_included(parent: &mut JsonValue, included: &JsonValue) {
    let (Some(parent_map), Some(included_map)) = (parent.as_object_mut(), included.as_object())
    else {
        return;
    };

    for section in ["services", "networks", "volumes", "secrets", "configs"] {
        let Some(JsonValue::Object(incoming)) = included_map.get(section) else {
            continue;
        };
        let target = parent_map
            .entry(section.to_string())
            .or_insert_with(|| JsonValue::Object(JsonMap::new()));
        let Some(target_map) = target.as_object_mut() else {
            continue;
        };
        for (name, entry) in incoming {
            if !target_map.contains_key(name) {
                target_map.insert(name.clone(), entry.clone());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Extends resolution
// ---------------------------------------------------------------------------

/// Marker for a detected `extends` cycle; the offending service falls back
/// to its un-extended form at the top of the chain.
struct ExtendsCycle;

fn resolve_all_extends(
    tree: &mut JsonValue,
    options: &ParseOptions,
    environment: &HashMap<String, String>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let Some(JsonValue::Object(services)) = tree.get("services") else {
        return;
    };
    let snapshot = services.clone();

    let mut resolved_services = JsonMap::new();
    for (name, service) in &snapshot {
        let mut visiting = Vec::new();
        let resolved = match resolve_service_extends(
            PRIMARY_FILE,
            name,
            service,
            &snapshot,
            options,
            environment,
            &mut visiting,
            diagnostics,
        ) {
            Ok(resolved) => resolved,
            Err(ExtendsCycle) => {
                push_error(
                    diagnostics,
                    Stage::Extends,
                    format!("circular extends chain detected for service '{name}'"),
                );
                strip_extends(service)
            }
        };
        resolved_services.insert(name.clone(), resolved);
    }

    if let Some(map) = tree.as_object_mut() {
        map.insert("services".to_string(), JsonValue::Object(resolved_services));
    }
}

#[allow(clippy::too_many_arguments)]
fn resolve_service_extends(
    file_key: &str,
    name: &str,
    service: &JsonValue,
    local_services: &JsonMap<String, JsonValue>,
    options: &ParseOptions,
    environment: &HashMap<String, String>,
    visiting: &mut Vec<String>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<JsonValue, ExtendsCycle> {
    let id = format!("{file_key}::{name}");
    if visiting.contains(&id) {
        return Err(ExtendsCycle);
    }

    let Some(service_map) = service.as_object() else {
        return Ok(service.clone());
    };
    let Some(extends_value) = service_map.get("extends") else {
        return Ok(service.clone());
    };

    let (target_name, target_file) = match extends_value {
        JsonValue::String(target) => (Some(target.clone()), None),
        JsonValue::Object(spec) => (
            spec.get("service").and_then(scalar_to_string),
            spec.get("file").and_then(scalar_to_string),
        ),
        _ => (None, None),
    };
    let Some(target_name) = target_name else {
        push_warning(
            diagnostics,
            Stage::Extends,
            format!("service '{name}' has an extends entry without a service name"),
        );
        return Ok(strip_extends(service));
    };

    visiting.push(id);
    let base = resolve_extends_base(
        file_key,
        name,
        &target_name,
        target_file.as_deref(),
        local_services,
        options,
        environment,
        visiting,
        diagnostics,
    );
    visiting.pop();

    match base {
        Ok(Some(base)) => Ok(merge_extends(&base, service)),
        Ok(None) => Ok(strip_extends(service)),
        Err(cycle) => Err(cycle),
    }
}

#[allow(clippy::too_many_arguments)]
fn resolve_extends_base(
    file_key: &str,
    name: &str,
    target_name: &str,
    target_file: Option<&str>,
    local_services: &JsonMap<String, JsonValue>,
    options: &ParseOptions,
    environment: &HashMap<String, String>,
    visiting: &mut Vec<String>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Option<JsonValue>, ExtendsCycle> {
    match target_file {
        None => {
            let Some(base) = local_services.get(target_name) else {
                push_warning(
                    diagnostics,
                    Stage::Extends,
                    format!("service '{name}' extends unknown service '{target_name}'"),
                );
                return Ok(None);
            };
            resolve_service_extends(
                file_key,
                target_name,
                base,
                local_services,
                options,
                environment,
                visiting,
                diagnostics,
            )
            .map(Some)
        }
        Some(file) => {
            let resolved = join_path(options.base_path.as_deref(), file);
            let Some(text) = lookup_file(options, &resolved) else {
                push_warning(
                    diagnostics,
                    Stage::Extends,
                    format!("service '{name}' extends from missing file '{file}'"),
                );
                return Ok(None);
            };
            let mut foreign = match codec::decode(text) {
                Ok(tree) => tree,
                Err(err) => {
                    push_warning(
                        diagnostics,
                        Stage::Extends,
                        format!("extends file '{file}' failed to parse: {err}"),
                    );
                    return Ok(None);
                }
            };
            if options.enable_variables {
                let mut scratch = VariableReport::default();
                interpolate_tree(&mut foreign, environment, &mut scratch);
            }
            let Some(JsonValue::Object(foreign_services)) = foreign.get("services") else {
                push_warning(
                    diagnostics,
                    Stage::Extends,
                    format!("extends file '{file}' declares no services"),
                );
                return Ok(None);
            };
            let Some(base) = foreign_services.get(target_name) else {
                push_warning(
                    diagnostics,
                    Stage::Extends,
                    format!("service '{name}' extends unknown service '{target_name}' in '{file}'"),
                );
                return Ok(None);
            };
            resolve_service_extends(
                &resolved,
                target_name,
                base,
                foreign_services,
                options,
                environment,
                visiting,
                diagnostics,
            )
            .map(Some)
        }
    }
}

/// Deep-merges an extended service over its base, per the Compose extends
/// contract: extension keys win, the list-valued fields concatenate
/// base-first with exact string duplicates removed, and `environment`/
/// `labels` merge per key with the extension winning.
fn merge_extends(base: &JsonValue, extension: &JsonValue) -> JsonValue {
    let (Some(base_map), Some(ext_map)) = (base.as_object(), extension.as_object()) else {
        return strip_extends(extension);
    };

    let mut out = base_map.clone();
    out.shift_remove("extends");

    for (key, ext_val) in ext_map {
        if key == "extends" {
            continue;
        }
        if EXTENDS_CONCAT_KEYS.contains(&key.as_str()) {
            let merged = concat_values(base_map.get(key), ext_val);
            out.insert(key.clone(), merged);
        } else if EXTENDS_MERGE_KEYS.contains(&key.as_str()) {
            let merged = merge_string_maps(base_map.get(key), ext_val);
            out.insert(key.clone(), merged);
        } else {
            out.insert(key.clone(), ext_val.clone());
        }
    }

    JsonValue::Object(out)
}

/// Base-first concatenation with exact string de-duplication. Map-shaped
/// shorthand (e.g. `networks` in map form) merges shallowly instead.
fn concat_values(base: Option<&JsonValue>, extension: &JsonValue) -> JsonValue {
    match (base, extension) {
        (Some(JsonValue::Array(base_items)), JsonValue::Array(ext_items)) => {
            let mut out: Vec<JsonValue> = Vec::new();
            for item in base_items.iter().chain(ext_items) {
                if item.is_string() && out.contains(item) {
                    continue;
                }
                out.push(item.clone());
            }
            JsonValue::Array(out)
        }
        (Some(JsonValue::Object(base_map)), JsonValue::Object(ext_map)) => {
            let mut out = base_map.clone();
            for (key, val) in ext_map {
                out.insert(key.clone(), val.clone());
            }
            JsonValue::Object(out)
        }
        _ => extension.clone(),
    }
}

/// Key-by-key merge of two map-or-`K=V`-list values, extension winning.
fn merge_string_maps(base: Option<&JsonValue>, extension: &JsonValue) -> JsonValue {
    let mut merged = normalize_string_map(base);
    for (key, val) in normalize_string_map(Some(extension)) {
        merged.insert(key, val);
    }
    let mut out = JsonMap::new();
    for (key, val) in merged {
        out.insert(key, JsonValue::String(val));
    }
    JsonValue::Object(out)
}

fn strip_extends(service: &JsonValue) -> JsonValue {
    match service {
        JsonValue::Object(map) => {
            let mut out = map.clone();
            out.shift_remove("extends");
            JsonValue::Object(out)
        }
        other => other.clone(),
    }
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

fn collect_profiles(tree: &JsonValue) -> (Vec<String>, IndexMap<String, usize>) {
    let mut names = Vec::new();
    let mut counts = IndexMap::new();

    if let Some(JsonValue::Object(services)) = tree.get("services") {
        for service in services.values() {
            let profiles = normalize_string_list(service.get("profiles"));
            for profile in profiles {
                if !names.contains(&profile) {
                    names.push(profile.clone());
                }
                *counts.entry(profile).or_insert(0) += 1;
            }
        }
    }

    (names, counts)
}

fn filter_profiles(tree: &mut JsonValue, active: &[String]) {
    let Some(map) = tree.as_object_mut() else {
        return;
    };
    let Some(JsonValue::Object(services)) = map.get_mut("services") else {
        return;
    };

    services.retain(|name, service| {
        let profiles = normalize_string_list(service.get("profiles"));
        let keep = profiles.is_empty() || profiles.iter().any(|p| active.contains(p));
        if !keep {
            debug!(service = %name, "filtered out by profiles");
        }
        keep
    });
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn push_warning(diagnostics: &mut Vec<Diagnostic>, stage: Stage, message: String) {
    warn!(?stage, "{message}");
    diagnostics.push(Diagnostic {
        stage,
        severity: IssueSeverity::Warning,
        message,
    });
}

fn push_error(diagnostics: &mut Vec<Diagnostic>, stage: Stage, message: String) {
    warn!(?stage, "{message}");
    diagnostics.push(Diagnostic {
        stage,
        severity: IssueSeverity::Error,
        message,
    });
}

fn lookup_file<'a>(options: &'a ParseOptions, resolved: &str) -> Option<&'a String> {
    options
        .files
        .get(resolved)
        .or_else(|| options.files.get(resolved.trim_start_matches("./")))
}

/// Joins and normalizes a relative path against the base directory.
/// `.` segments drop, `..` pops, absolute paths ignore the base.
fn join_path(base: Option<&str>, path: &str) -> String {
    let combined = match base {
        Some(base) if !path.starts_with('/') => format!("{base}/{path}"),
        _ => path.to_string(),
    };

    let absolute = combined.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in combined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::{join_path, parse, parse_with_options, ParseOptions, Stage};
    use crate::model::IssueSeverity;

    #[test]
    fn join_path_normalizes_dot_segments() {
        assert_eq!(join_path(Some("deploy"), "./common.yml"), "deploy/common.yml");
        assert_eq!(join_path(Some("deploy"), "../base.yml"), "base.yml");
        assert_eq!(join_path(None, "stack/app.yml"), "stack/app.yml");
        assert_eq!(join_path(Some("deploy"), "/abs/base.yml"), "/abs/base.yml");
    }

    #[test]
    fn empty_input_parses_to_an_empty_document() {
        let result = parse("").unwrap();
        assert!(result.document.services.is_empty());
        assert!(result.errors.is_empty());
    }

    #[test]
    fn scalar_top_level_is_a_document_error() {
        let err = parse("just a string").unwrap_err();
        assert!(err.to_string().contains("must be a mapping"));
    }

    #[test]
    fn syntax_error_is_fatal() {
        assert!(parse("services:\n  web: {unclosed\n").is_err());
    }

    #[test]
    fn variable_stage_can_be_disabled() {
        let options = ParseOptions {
            enable_variables: false,
            ..Default::default()
        };
        let result =
            parse_with_options("services:\n  web:\n    image: \"${IMG:-nginx}\"\n", &options)
                .unwrap();
        assert_eq!(
            result.document.services["web"].image.as_deref(),
            Some("${IMG:-nginx}")
        );
        assert!(result.variables.is_empty());
    }

    #[test]
    fn missing_include_is_a_warning_not_an_error() {
        let result = parse("include:\n  - extra.yml\nservices:\n  web:\n    image: nginx\n")
            .unwrap();
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].stage, Stage::Include);
        assert_eq!(result.errors[0].severity, IssueSeverity::Warning);
        assert!(result.errors[0].message.contains("extra.yml"));
        assert_eq!(result.document.services.len(), 1);
    }
}
