//! Restricted YAML dialect for agent profiles embedded in free-text knowledge-store nodes.
//!
//! Handles exactly what hand-authored agent profile blocks need: flat or nested maps by
//! indentation, scalars, single/double-quoted strings, and `|`/`>` block scalars. Not a general
//! YAML parser — sequences, anchors, and flow collections are out of scope; anything else falls
//! through to [`super::decode`]'s JSON path.

use std::collections::HashMap;

use serde_json::Value;

#[derive(Debug, Clone)]
pub struct YamlSubsetError {
    pub message: String,
}

impl std::fmt::Display for YamlSubsetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "yaml subset: {}", self.message)
    }
}

struct Line<'a> {
    indent: usize,
    content: &'a str,
}

/// Parses a flat-object YAML subset into a JSON value (always an object at the top level).
pub fn parse_yaml_subset(input: &str) -> Result<Value, YamlSubsetError> {
    let lines: Vec<Line> = input
        .lines()
        .filter(|l| !l.trim().is_empty() && !l.trim_start().starts_with('#'))
        .map(|l| Line {
            indent: l.len() - l.trim_start().len(),
            content: l.trim_start(),
        })
        .collect();
    let mut pos = 0;
    let (value, _) = parse_block(&lines, &mut pos, 0)?;
    Ok(value)
}

fn parse_block(lines: &[Line], pos: &mut usize, min_indent: usize) -> Result<(Value, usize), YamlSubsetError> {
    let mut map = serde_json::Map::new();
    let base_indent = if *pos < lines.len() { lines[*pos].indent } else { min_indent };
    if base_indent < min_indent {
        return Ok((Value::Object(map), base_indent));
    }

    while *pos < lines.len() {
        let line = &lines[*pos];
        if line.indent < base_indent {
            break;
        }
        if line.indent > base_indent {
            return Err(YamlSubsetError {
                message: format!("unexpected indent at line {}", *pos + 1),
            });
        }

        let (key, rest) = split_key_value(line.content).ok_or_else(|| YamlSubsetError {
            message: format!("expected `key: value` at line {}", *pos + 1),
        })?;
        *pos += 1;

        let value = if rest.is_empty() {
            if *pos < lines.len() && lines[*pos].indent > base_indent {
                let (nested, _) = parse_block(lines, pos, base_indent + 1)?;
                nested
            } else {
                Value::Null
            }
        } else if rest == "|" || rest == ">" {
            parse_block_scalar(lines, pos, base_indent, rest == ">")
        } else {
            parse_scalar(rest)
        };

        map.insert(key.to_string(), value);
    }

    Ok((Value::Object(map), base_indent))
}

fn split_key_value(content: &str) -> Option<(&str, &str)> {
    let colon = find_unquoted_colon(content)?;
    let key = content[..colon].trim();
    let value = content[colon + 1..].trim();
    if key.is_empty() {
        None
    } else {
        Some((key, value))
    }
}

fn find_unquoted_colon(s: &str) -> Option<usize> {
    let mut in_quotes: Option<char> = None;
    for (i, c) in s.char_indices() {
        match in_quotes {
            Some(q) if c == q => in_quotes = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => in_quotes = Some(c),
            None if c == ':' && s[i + 1..].chars().next().map_or(true, |n| n == ' ' || n == '\t') => {
                return Some(i)
            }
            None if c == ':' && i + 1 == s.len() => return Some(i),
            None => {}
        }
    }
    None
}

fn parse_block_scalar(lines: &[Line], pos: &mut usize, parent_indent: usize, fold: bool) -> Value {
    let mut chunks = Vec::new();
    let block_indent = if *pos < lines.len() { lines[*pos].indent } else { parent_indent + 1 };
    while *pos < lines.len() && lines[*pos].indent >= block_indent {
        chunks.push(lines[*pos].content);
        *pos += 1;
    }
    let joined = if fold {
        chunks.join(" ")
    } else {
        chunks.join("\n")
    };
    Value::String(joined)
}

fn parse_scalar(raw: &str) -> Value {
    if (raw.starts_with('"') && raw.ends_with('"') && raw.len() >= 2)
        || (raw.starts_with('\'') && raw.ends_with('\'') && raw.len() >= 2)
    {
        return Value::String(raw[1..raw.len() - 1].to_string());
    }
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" | "~" | "" => return Value::Null,
        _ => {}
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(f) = raw.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(raw.to_string())
}

/// Loose dispatch used by the profile decoder: tries JSON first, then this dialect.
pub fn parse_json_or_yaml_subset(input: &str) -> Option<Value> {
    if let Ok(v) = serde_json::from_str::<Value>(input) {
        return Some(v);
    }
    parse_yaml_subset(input).ok()
}

/// Flattens a parsed subset document of `key: value` pairs with `.`-joined nested keys, used
/// only in tests to assert structure without caring about map ordering.
#[cfg(test)]
fn flatten(value: &Value, prefix: &str, out: &mut HashMap<String, Value>) {
    if let Value::Object(map) = value {
        for (k, v) in map {
            let key = if prefix.is_empty() { k.clone() } else { format!("{prefix}.{k}") };
            if v.is_object() {
                flatten(v, &key, out);
            } else {
                out.insert(key, v.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_scalars() {
        let doc = "id: researcher\nname: Researcher\nenabled: true\nweight: 3\n";
        let v = parse_yaml_subset(doc).unwrap();
        assert_eq!(v["id"], "researcher");
        assert_eq!(v["name"], "Researcher");
        assert_eq!(v["enabled"], true);
        assert_eq!(v["weight"], 3);
    }

    #[test]
    fn parses_quoted_strings_with_colon() {
        let doc = "description: \"handles: routing\"\n";
        let v = parse_yaml_subset(doc).unwrap();
        assert_eq!(v["description"], "handles: routing");
    }

    #[test]
    fn parses_nested_map_by_indentation() {
        let doc = "id: a\nmetadata:\n  source: library\n  version: 2\n";
        let v = parse_yaml_subset(doc).unwrap();
        let mut flat = HashMap::new();
        flatten(&v, "", &mut flat);
        assert_eq!(flat.get("metadata.source").unwrap(), "library");
        assert_eq!(flat.get("metadata.version").unwrap(), 2);
    }

    #[test]
    fn parses_literal_block_scalar_preserving_newlines() {
        let doc = "system_prompt: |\n  line one\n  line two\nid: a\n";
        let v = parse_yaml_subset(doc).unwrap();
        assert_eq!(v["system_prompt"], "line one\nline two");
        assert_eq!(v["id"], "a");
    }

    #[test]
    fn parses_folded_block_scalar_joining_with_spaces() {
        let doc = "system_prompt: >\n  line one\n  line two\n";
        let v = parse_yaml_subset(doc).unwrap();
        assert_eq!(v["system_prompt"], "line one line two");
    }

    #[test]
    fn json_or_yaml_subset_prefers_json_when_valid() {
        let v = parse_json_or_yaml_subset(r#"{"id": "a"}"#).unwrap();
        assert_eq!(v["id"], "a");
    }

    #[test]
    fn json_or_yaml_subset_falls_back_to_dialect() {
        let v = parse_json_or_yaml_subset("id: a\nname: A\n").unwrap();
        assert_eq!(v["id"], "a");
    }
}
