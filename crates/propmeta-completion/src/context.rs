//! Completion context detection.
//!
//! Determines whether the cursor is on a key or a value in a `.properties`
//! or YAML document, which key path it belongs to, and which sibling names
//! are already present at that position.

use propmeta_parser::document::TextDocument;
use propmeta_parser::path::split_path;
use propmeta_types::FileType;
use std::collections::HashSet;

/// The context in which completion was triggered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionContext {
    /// Completing a key. The last segment is the prefix being typed.
    Key {
        segments: Vec<String>,
        /// Leading segments implied by YAML nesting, not typed on this line.
        implied: usize,
        /// UTF-16 column where the typed key starts.
        start: u32,
        siblings: HashSet<String>,
    },

    /// Completing the value of `key`.
    Value {
        key: Vec<String>,
        prefix: String,
        /// UTF-16 column where the typed value starts.
        start: u32,
        siblings: HashSet<String>,
    },

    /// Comment, blank YAML list marker, or anything else not completable.
    None,
}

/// Determine the completion context at a position.
pub fn detect_context(doc: &TextDocument, line: u32, character: u32) -> CompletionContext {
    let text_before = doc.line_prefix(line as usize, character as usize);
    match doc.file_type() {
        FileType::Properties => detect_properties(doc, line as usize, &text_before),
        FileType::Yaml => detect_yaml(doc, line as usize, &text_before),
    }
}

/// Length in UTF-16 code units, the unit of LSP columns.
fn utf16_len(s: &str) -> u32 {
    s.encode_utf16().count() as u32
}

fn is_comment(trimmed: &str, file_type: FileType) -> bool {
    match file_type {
        FileType::Properties => trimmed.starts_with('#') || trimmed.starts_with('!'),
        FileType::Yaml => trimmed.starts_with('#'),
    }
}

/// Split a comma-separated value at the cursor into the typed prefix and
/// the items already present before it.
fn split_value_list(value: &str) -> (String, HashSet<String>, u32) {
    match value.rfind(',') {
        Some(comma) => {
            let siblings = value[..comma]
                .split(',')
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect();
            let rest = &value[comma + 1..];
            let trimmed = rest.trim_start();
            let offset =
                utf16_len(&value[..comma + 1]) + (utf16_len(rest) - utf16_len(trimmed));
            (trimmed.to_string(), siblings, offset)
        }
        None => (value.to_string(), HashSet::new(), 0),
    }
}

fn properties_key(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || is_comment(trimmed, FileType::Properties) {
        return None;
    }
    let end = trimmed.find(&['=', ':'][..]).unwrap_or(trimmed.len());
    let key = trimmed[..end].trim();
    (!key.is_empty()).then_some(key)
}

fn detect_properties(doc: &TextDocument, line: usize, text_before: &str) -> CompletionContext {
    let trimmed = text_before.trim_start();
    if is_comment(trimmed, FileType::Properties) {
        return CompletionContext::None;
    }
    let indent = utf16_len(text_before) - utf16_len(trimmed);

    if let Some(sep) = trimmed.find(&['=', ':'][..]) {
        let key = trimmed[..sep].trim();
        if key.is_empty() {
            return CompletionContext::None;
        }
        let after = &trimmed[sep + 1..];
        let value = after.trim_start();
        let value_start =
            indent + utf16_len(&trimmed[..sep + 1]) + (utf16_len(after) - utf16_len(value));
        let (prefix, siblings, offset) = split_value_list(value);
        return CompletionContext::Value {
            key: split_path(key),
            prefix,
            start: value_start + offset,
            siblings,
        };
    }

    let segments = split_path(trimmed);
    let parent = &segments[..segments.len() - 1];

    let mut siblings = HashSet::new();
    for n in 0..doc.line_count() {
        if n == line {
            continue;
        }
        let text = doc.line(n);
        let Some(key) = properties_key(&text) else {
            continue;
        };
        let other = split_path(key);
        if other.len() == segments.len() && other.starts_with(parent) {
            if let Some(last) = other.last() {
                siblings.insert(last.clone());
            }
        }
    }

    CompletionContext::Key {
        segments,
        implied: 0,
        start: indent,
        siblings,
    }
}

fn indent_of(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ').count()
}

/// `key` of a `key:` or `key: value` YAML line.
fn yaml_key(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.is_empty() || is_comment(trimmed, FileType::Yaml) || trimmed.starts_with('-') {
        return None;
    }
    let colon = trimmed.find(':')?;
    let rest = &trimmed[colon + 1..];
    if !(rest.is_empty() || rest.starts_with(' ')) {
        return None;
    }
    let key = trimmed[..colon].trim();
    (!key.is_empty()).then_some(key)
}

/// Key segments of the blocks enclosing `line`, outermost first.
fn yaml_ancestors(doc: &TextDocument, line: usize, indent: usize) -> Vec<String> {
    let mut ancestors: Vec<Vec<String>> = Vec::new();
    let mut threshold = indent;
    for n in (0..line).rev() {
        if threshold == 0 {
            break;
        }
        let text = doc.line(n);
        let Some(key) = yaml_key(&text) else {
            continue;
        };
        let level = indent_of(&text);
        if level < threshold {
            ancestors.push(split_path(key));
            threshold = level;
        }
    }
    ancestors.into_iter().rev().flatten().collect()
}

/// First segments of keys at `indent` inside the same block as `line`.
fn yaml_siblings(doc: &TextDocument, line: usize, indent: usize) -> HashSet<String> {
    let mut siblings = HashSet::new();
    let mut visit = |n: usize| -> bool {
        let text = doc.line(n);
        if text.trim().is_empty() || is_comment(text.trim(), FileType::Yaml) {
            return true;
        }
        let level = indent_of(&text);
        if level < indent {
            return false;
        }
        if level == indent {
            if let Some(first) = yaml_key(&text).and_then(|k| split_path(k).into_iter().next()) {
                siblings.insert(first);
            }
        }
        true
    };

    for n in (0..line).rev() {
        if !visit(n) {
            break;
        }
    }
    for n in line + 1..doc.line_count() {
        if !visit(n) {
            break;
        }
    }
    siblings
}

fn detect_yaml(doc: &TextDocument, line: usize, text_before: &str) -> CompletionContext {
    let trimmed = text_before.trim_start();
    if is_comment(trimmed, FileType::Yaml) || trimmed.starts_with('-') || trimmed.ends_with(':') {
        return CompletionContext::None;
    }
    let indent = indent_of(text_before);
    let ancestors = yaml_ancestors(doc, line, indent);

    if let Some(colon) = trimmed.find(": ") {
        let key = trimmed[..colon].trim();
        if key.is_empty() {
            return CompletionContext::None;
        }
        let mut full = ancestors;
        full.extend(split_path(key));
        let after = &trimmed[colon + 1..];
        let value = after.trim_start();
        let value_start =
            indent as u32 + utf16_len(&trimmed[..colon + 1]) + (utf16_len(after) - utf16_len(value));
        let (prefix, siblings, offset) = split_value_list(value);
        return CompletionContext::Value {
            key: full,
            prefix,
            start: value_start + offset,
            siblings,
        };
    }

    let implied = ancestors.len();
    let mut segments = ancestors;
    segments.extend(split_path(trimmed));

    let mut siblings = yaml_siblings(doc, line, indent);
    // Siblings only apply to the first typed segment
    if segments.len() != implied + 1 {
        siblings.clear();
    }

    CompletionContext::Key {
        segments,
        implied,
        start: indent as u32,
        siblings,
    }
}
