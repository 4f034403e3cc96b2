//! Block-style YAML emission for canonical Compose output.
//!
//! Deterministic by construction: 2-space indentation, mapping keys in the
//! order they appear in the tree, scalars quoted only when plain style would
//! be ambiguous YAML. Flow style is used only for the empty document.

use serde_json::Value as JsonValue;

/// Renders a cleaned document tree as YAML text.
pub fn to_yaml_string(value: &JsonValue) -> String {
    let mut out = String::new();
    write_value(value, 0, &mut out);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

fn write_value(value: &JsonValue, indent: usize, out: &mut String) {
    match value {
        JsonValue::Object(map) => write_object(map, indent, out),
        JsonValue::Array(items) => write_array(items, indent, out),
        _ => {
            push_indent(indent, out);
            out.push_str(&render_scalar(value));
            out.push('\n');
        }
    }
}

fn write_object(map: &serde_json::Map<String, JsonValue>, indent: usize, out: &mut String) {
    if map.is_empty() {
        push_indent(indent, out);
        out.push_str("{}\n");
        return;
    }

    for (key, value) in map {
        push_indent(indent, out);
        out.push_str(&render_key(key));
        match value {
            JsonValue::Object(obj) => {
                if obj.is_empty() {
                    out.push_str(": {}\n");
                } else {
                    out.push_str(":\n");
                    write_object(obj, indent + 2, out);
                }
            }
            JsonValue::Array(arr) => {
                if arr.is_empty() {
                    out.push_str(": []\n");
                } else {
                    out.push_str(":\n");
                    write_array(arr, indent + 2, out);
                }
            }
            _ => {
                out.push_str(": ");
                out.push_str(&render_scalar(value));
                out.push('\n');
            }
        }
    }
}

fn write_array(items: &[JsonValue], indent: usize, out: &mut String) {
    if items.is_empty() {
        push_indent(indent, out);
        out.push_str("[]\n");
        return;
    }

    for item in items {
        match item {
            JsonValue::Object(map) if !map.is_empty() => {
                push_indent(indent, out);
                out.push_str("-\n");
                write_object(map, indent + 2, out);
            }
            JsonValue::Array(arr) if !arr.is_empty() => {
                push_indent(indent, out);
                out.push_str("-\n");
                write_array(arr, indent + 2, out);
            }
            _ => {
                push_indent(indent, out);
                out.push_str("- ");
                match item {
                    JsonValue::Object(map) if map.is_empty() => out.push_str("{}"),
                    JsonValue::Array(arr) if arr.is_empty() => out.push_str("[]"),
                    _ => out.push_str(&render_scalar(item)),
                }
                out.push('\n');
            }
        }
    }
}

fn render_key(input: &str) -> String {
    if is_plain_key(input) {
        input.to_string()
    } else {
        quote_string(input)
    }
}

fn render_scalar(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "null".to_string(),
        JsonValue::Bool(v) => v.to_string(),
        JsonValue::Number(v) => v.to_string(),
        JsonValue::String(v) => render_string(v),
        JsonValue::Array(_) | JsonValue::Object(_) => unreachable!("handled by callers"),
    }
}

fn render_string(input: &str) -> String {
    if is_plain_string(input) {
        input.to_string()
    } else {
        quote_string(input)
    }
}

fn quote_string(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 2);
    out.push('"');
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

fn is_plain_key(input: &str) -> bool {
    if input.is_empty() {
        return false;
    }
    input
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn is_plain_string(input: &str) -> bool {
    if input.is_empty() {
        return false;
    }
    if input.trim() != input {
        return false;
    }

    let reserved = ["true", "false", "yes", "no", "on", "off", "null", "~"];
    if reserved.contains(&input.to_ascii_lowercase().as_str()) {
        return false;
    }

    // Scalars YAML would reinterpret as numbers must stay strings.
    if input.parse::<i64>().is_ok() || input.parse::<f64>().is_ok() {
        return false;
    }

    // Leading indicator characters change how YAML reads the node.
    if input.starts_with(|c: char| matches!(c, '&' | '*' | '!' | '%' | '@' | '`' | '|' | '>' | '?' | '-')) {
        return false;
    }

    // A colon is only a mapping indicator before whitespace or at the end,
    // so `nginx:1.25` and `8080:80` stay plain.
    if input.ends_with(':') || input.contains(": ") || input.contains(":\t") {
        return false;
    }
    if input.starts_with('#') || input.contains(" #") {
        return false;
    }
    if input.starts_with('"') || input.starts_with('\'') {
        return false;
    }

    for ch in input.chars() {
        if ch.is_control() {
            return false;
        }
        if matches!(ch, '{' | '}' | '[' | ']' | ',') {
            return false;
        }
    }

    true
}

fn push_indent(indent: usize, out: &mut String) {
    for _ in 0..indent {
        out.push(' ');
    }
}
