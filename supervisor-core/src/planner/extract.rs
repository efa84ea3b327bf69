//! Tolerant JSON extraction from raw LLM text (spec §4.6): fenced code blocks first, then a
//! balanced-brace scan, then a direct parse as a last resort.

use serde_json::Value;

pub fn extract_json_object(text: &str) -> Option<Value> {
    for block in fenced_blocks(text) {
        if let Ok(v) = serde_json::from_str::<Value>(block.trim()) {
            if v.is_object() {
                return Some(v);
            }
        }
    }

    if let Some(candidate) = scan_balanced_object(text) {
        if let Ok(v) = serde_json::from_str::<Value>(&candidate) {
            if v.is_object() {
                return Some(v);
            }
        }
    }

    if let Ok(v) = serde_json::from_str::<Value>(text.trim()) {
        if v.is_object() {
            return Some(v);
        }
    }
    None
}

/// Extracts the contents of ` ```(json)? ... ``` ` fenced blocks, in document order.
fn fenced_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut lines = text.lines().peekable();
    while let Some(line) = lines.next() {
        if line.trim_start().starts_with("```") {
            let mut body = Vec::new();
            for inner in lines.by_ref() {
                if inner.trim_start().starts_with("```") {
                    break;
                }
                body.push(inner);
            }
            blocks.push(body.join("\n"));
        }
    }
    blocks
}

/// Scans for the first top-level `{...}` span with correct brace/string/escape tracking, so a
/// stray `}` inside a quoted string doesn't end the scan early.
fn scan_balanced_object(text: &str) -> Option<String> {
    let bytes: Vec<char> = text.chars().collect();
    let start = bytes.iter().position(|&c| c == '{')?;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape = false;
    for (i, &c) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(bytes[start..=i].iter().collect());
                }
            }
            _ => {}
        }
    }
    None
}
