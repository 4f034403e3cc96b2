//! `${VAR}` interpolation over a raw document tree.
//!
//! Supported forms: `${VAR}`, `${VAR:-default}`, and `${VAR:?message}`, plus
//! `$$` as a literal dollar escape. Substitution applies to scalar string
//! values only, never to mapping keys. The walk is total: a missing variable
//! without a default substitutes the empty string and is reported, and the
//! `:?` form leaves the literal token in place and records an error
//! diagnostic for that field alone.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::Value as JsonValue;

use crate::model::IssueSeverity;
use crate::parser::{Diagnostic, Stage};

fn variable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\$|\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*)|:\?([^}]*))?\}")
            .expect("variable pattern is valid")
    })
}

#[derive(Debug, Default)]
/// Bookkeeping collected while interpolating one document.
pub struct VariableReport {
    /// Every variable name encountered, deduplicated, first-seen order.
    pub variables: Vec<String>,
    /// Names with no supplied value and no default.
    pub undefined: Vec<String>,
    /// `:?` failures.
    pub diagnostics: Vec<Diagnostic>,
}

impl VariableReport {
    fn record_seen(&mut self, name: &str) {
        if !self.variables.iter().any(|v| v == name) {
            self.variables.push(name.to_string());
        }
    }

    fn record_undefined(&mut self, name: &str) {
        if !self.undefined.iter().any(|v| v == name) {
            self.undefined.push(name.to_string());
        }
    }
}

/// Substitutes variables in every scalar string of `tree`.
pub fn interpolate_tree(
    tree: &mut JsonValue,
    environment: &HashMap<String, String>,
    report: &mut VariableReport,
) {
    match tree {
        JsonValue::String(text) => {
            if text.contains('$') {
                *text = interpolate_scalar(text, environment, report);
            }
        }
        JsonValue::Array(items) => {
            for item in items {
                interpolate_tree(item, environment, report);
            }
        }
        JsonValue::Object(map) => {
            for value in map.values_mut() {
                interpolate_tree(value, environment, report);
            }
        }
        _ => {}
    }
}

fn interpolate_scalar(
    text: &str,
    environment: &HashMap<String, String>,
    report: &mut VariableReport,
) -> String {
    variable_pattern()
        .replace_all(text, |caps: &Captures<'_>| {
            let Some(name) = caps.get(1) else {
                // The `$$` escape.
                return "$".to_string();
            };
            let name = name.as_str();
            report.record_seen(name);

            if let Some(value) = environment.get(name) {
                return value.clone();
            }
            if let Some(default) = caps.get(2) {
                return default.as_str().to_string();
            }
            if let Some(message) = caps.get(3) {
                report.record_undefined(name);
                let detail = if message.as_str().is_empty() {
                    format!("required variable '{name}' is not set")
                } else {
                    format!("required variable '{name}' is not set: {}", message.as_str())
                };
                report.diagnostics.push(Diagnostic {
                    stage: Stage::Variables,
                    severity: IssueSeverity::Error,
                    message: detail,
                });
                // Leave the token for the user to see in context.
                return caps[0].to_string();
            }

            report.record_undefined(name);
            String::new()
        })
        .into_owned()
}

/// Parses `.env`-style text: `KEY=VALUE` lines, `#` comments, optional
/// single or double quotes around the value.
pub fn parse_env_file(text: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
            .unwrap_or(value);
        out.insert(key.to_string(), value.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::{interpolate_tree, parse_env_file, VariableReport};

    fn env(vars: &[(&str, &str)]) -> HashMap<String, String> {
        vars.iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn substitutes_plain_and_defaulted_forms() {
        let mut tree = json!({
            "image": "postgres:${PG_TAG:-16}",
            "environment": {"HOST": "${DB_HOST}"}
        });
        let mut report = VariableReport::default();
        interpolate_tree(&mut tree, &env(&[("DB_HOST", "db.internal")]), &mut report);

        assert_eq!(tree["image"], json!("postgres:16"));
        assert_eq!(tree["environment"]["HOST"], json!("db.internal"));
        assert_eq!(report.variables, vec!["PG_TAG", "DB_HOST"]);
        assert_eq!(report.undefined, Vec::<String>::new());
    }

    #[test]
    fn undefined_variable_becomes_empty_and_is_reported() {
        let mut tree = json!({"user": "${RUN_AS}"});
        let mut report = VariableReport::default();
        interpolate_tree(&mut tree, &env(&[]), &mut report);

        assert_eq!(tree["user"], json!(""));
        assert_eq!(report.undefined, vec!["RUN_AS"]);
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn required_form_keeps_token_and_records_error() {
        let mut tree = json!({"image": "${IMAGE:?image must be set}"});
        let mut report = VariableReport::default();
        interpolate_tree(&mut tree, &env(&[]), &mut report);

        assert_eq!(tree["image"], json!("${IMAGE:?image must be set}"));
        assert_eq!(report.diagnostics.len(), 1);
        assert!(report.diagnostics[0].message.contains("IMAGE"));
        assert!(report.diagnostics[0].message.contains("image must be set"));
    }

    #[test]
    fn double_dollar_escapes_interpolation() {
        let mut tree = json!({"command": "echo $${HOME}"});
        let mut report = VariableReport::default();
        interpolate_tree(&mut tree, &env(&[("HOME", "/root")]), &mut report);

        assert_eq!(tree["command"], json!("echo ${HOME}"));
        assert!(report.variables.is_empty());
    }

    #[test]
    fn env_file_parsing_handles_comments_and_quotes() {
        let parsed = parse_env_file("# comment\nA=1\nB=\"two words\"\nC='three'\nbroken\n");
        assert_eq!(parsed.get("A").map(String::as_str), Some("1"));
        assert_eq!(parsed.get("B").map(String::as_str), Some("two words"));
        assert_eq!(parsed.get("C").map(String::as_str), Some("three"));
        assert!(!parsed.contains_key("broken"));
    }
}
