//! Completion item providers.
//!
//! Given a completion context and the engine, produces LSP completion items
//! whose edits replace the text typed so far.

use crate::context::CompletionContext;
use crate::engine::CompletionEngine;
use lsp_types::{
    CompletionItem, CompletionItemKind, CompletionItemTag, CompletionTextEdit, Documentation,
    MarkupContent, MarkupKind, Position, Range, TextEdit,
};
use propmeta_index::{CancellationToken, ResolveError};
use propmeta_types::{DeprecationLevel, FileType, Suggestion, SuggestionKind};

/// Provide completion items for a context at `position`.
pub fn provide_completions(
    context: &CompletionContext,
    engine: &CompletionEngine,
    file_type: FileType,
    position: Position,
    cancel: &CancellationToken,
) -> Result<Vec<CompletionItem>, ResolveError> {
    match context {
        CompletionContext::Key {
            segments,
            implied,
            start,
            siblings,
        } => {
            let suggestions = engine.suggest_keys_with(segments, siblings, file_type, cancel)?;
            let range = edit_range(position, *start);
            Ok(suggestions
                .iter()
                .map(|s| completion_item(s, *implied, range))
                .collect())
        }
        CompletionContext::Value {
            key,
            prefix,
            start,
            siblings,
        } => {
            if !engine.accepts_values(key, cancel)? {
                return Ok(Vec::new());
            }
            let suggestions = engine.suggest_values_with(key, prefix, siblings, cancel)?;
            let range = edit_range(position, *start);
            Ok(suggestions
                .iter()
                .map(|s| completion_item(s, 0, range))
                .collect())
        }
        CompletionContext::None => Ok(Vec::new()),
    }
}

fn edit_range(position: Position, start: u32) -> Range {
    Range {
        start: Position {
            line: position.line,
            character: start.min(position.character),
        },
        end: position,
    }
}

/// The text a key suggestion inserts, relative to the `implied` segments
/// already present in enclosing YAML blocks.
pub fn insert_text(suggestion: &Suggestion, implied: usize) -> String {
    if suggestion.kind == SuggestionKind::Value {
        return suggestion.display_text.clone();
    }
    let relative = suggestion
        .ancestor_path
        .get(implied..)
        .filter(|rest| !rest.is_empty())
        .map(|rest| rest.join("."))
        .unwrap_or_else(|| suggestion.display_text.clone());
    match suggestion.append_colon {
        Some(true) if suggestion.leaf => format!("{}: ", relative),
        Some(true) => format!("{}:", relative),
        _ => relative,
    }
}

fn suggestion_kind_to_completion_kind(kind: SuggestionKind) -> CompletionItemKind {
    match kind {
        SuggestionKind::Group => CompletionItemKind::MODULE,
        SuggestionKind::Property => CompletionItemKind::PROPERTY,
        SuggestionKind::MapKey => CompletionItemKind::ENUM_MEMBER,
        SuggestionKind::Field => CompletionItemKind::FIELD,
        SuggestionKind::Value => CompletionItemKind::VALUE,
    }
}

fn documentation(suggestion: &Suggestion) -> Option<Documentation> {
    let mut parts = Vec::new();
    if let Some(ref description) = suggestion.description {
        parts.push(description.clone());
    }
    if let Some(ref default) = suggestion.default_value_text {
        parts.push(format!("Default: `{}`", default));
    }
    match suggestion.deprecation_level {
        Some(DeprecationLevel::Error) => parts.push("**Deprecated** (no longer supported)".into()),
        Some(DeprecationLevel::Warning) => parts.push("**Deprecated**".into()),
        None => {}
    }
    if parts.is_empty() {
        return None;
    }
    Some(Documentation::MarkupContent(MarkupContent {
        kind: MarkupKind::Markdown,
        value: parts.join("\n\n"),
    }))
}

/// Deprecated entries sort after live ones, errors last.
fn sort_text(suggestion: &Suggestion) -> String {
    let rank = match suggestion.deprecation_level {
        None => 0,
        Some(DeprecationLevel::Warning) => 1,
        Some(DeprecationLevel::Error) => 2,
    };
    format!("{}{}", rank, suggestion.display_text)
}

pub fn completion_item(suggestion: &Suggestion, implied: usize, range: Range) -> CompletionItem {
    let new_text = insert_text(suggestion, implied);
    let label = new_text.trim_end_matches(&[':', ' '][..]).to_string();

    let tags = suggestion
        .deprecation_level
        .map(|_| vec![CompletionItemTag::DEPRECATED]);

    CompletionItem {
        label: label.clone(),
        kind: Some(suggestion_kind_to_completion_kind(suggestion.kind)),
        detail: suggestion.short_type.clone(),
        documentation: documentation(suggestion),
        tags,
        sort_text: Some(sort_text(suggestion)),
        filter_text: Some(label),
        text_edit: Some(CompletionTextEdit::Edit(TextEdit { range, new_text })),
        // Full dotted path for clients that want it back
        data: Some(serde_json::Value::String(suggestion.display_text.clone())),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propmeta_index::{CatalogResolver, MetadataIndex, TypeCatalog};
    use propmeta_parser::parse_metadata_str;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn suggestion(path: &[&str], kind: SuggestionKind, leaf: bool, yaml: bool) -> Suggestion {
        let ancestor_path: Vec<String> = path.iter().map(|s| s.to_string()).collect();
        Suggestion {
            display_text: ancestor_path.join("."),
            ancestor_path,
            kind,
            short_type: Some("Integer".to_string()),
            description: Some("Server HTTP port.".to_string()),
            default_value_text: Some("8080".to_string()),
            deprecation_level: None,
            append_colon: if yaml { Some(true) } else { None },
            leaf,
        }
    }

    fn range() -> Range {
        Range {
            start: Position { line: 3, character: 2 },
            end: Position { line: 3, character: 4 },
        }
    }

    fn new_text(item: &CompletionItem) -> String {
        match item.text_edit {
            Some(CompletionTextEdit::Edit(ref edit)) => edit.new_text.clone(),
            _ => panic!("Expected a plain text edit"),
        }
    }

    #[test]
    fn test_properties_key_item() {
        let s = suggestion(&["server", "port"], SuggestionKind::Property, true, false);
        let item = completion_item(&s, 0, range());
        assert_eq!(item.label, "server.port");
        assert_eq!(new_text(&item), "server.port");
        assert_eq!(item.kind, Some(CompletionItemKind::PROPERTY));
        assert_eq!(item.detail.as_deref(), Some("Integer"));
        assert!(item.tags.is_none());
        match item.documentation {
            Some(Documentation::MarkupContent(ref m)) => {
                assert!(m.value.contains("Server HTTP port."));
                assert!(m.value.contains("Default: `8080`"));
            }
            ref other => panic!("Expected markdown documentation, got {:?}", other),
        }
    }

    #[test]
    fn test_yaml_key_item_is_relative() {
        let leaf = suggestion(&["server", "port"], SuggestionKind::Property, true, true);
        assert_eq!(new_text(&completion_item(&leaf, 1, range())), "port: ");

        let block = suggestion(&["server", "compression"], SuggestionKind::Group, false, true);
        let item = completion_item(&block, 1, range());
        assert_eq!(new_text(&item), "compression:");
        assert_eq!(item.label, "compression");
        assert_eq!(item.kind, Some(CompletionItemKind::MODULE));
    }

    #[test]
    fn test_value_item_inserts_value_only() {
        let mut s = suggestion(&["spring", "main", "banner-mode"], SuggestionKind::Value, true, false);
        s.display_text = "CONSOLE".to_string();
        let item = completion_item(&s, 2, range());
        assert_eq!(new_text(&item), "CONSOLE");
        assert_eq!(item.kind, Some(CompletionItemKind::VALUE));
    }

    #[test]
    fn test_deprecated_sorting() {
        let mut live = suggestion(&["a", "z"], SuggestionKind::Property, true, false);
        let mut old = suggestion(&["a", "b"], SuggestionKind::Property, true, false);
        let mut gone = suggestion(&["a", "a"], SuggestionKind::Property, true, false);
        live.deprecation_level = None;
        old.deprecation_level = Some(DeprecationLevel::Warning);
        gone.deprecation_level = Some(DeprecationLevel::Error);

        let mut items: Vec<CompletionItem> = [&gone, &old, &live]
            .iter()
            .map(|s| completion_item(s, 0, range()))
            .collect();
        items.sort_by(|a, b| a.sort_text.cmp(&b.sort_text));
        let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["a.z", "a.b", "a.a"]);
        assert_eq!(items[2].tags, Some(vec![CompletionItemTag::DEPRECATED]));
    }

    fn engine() -> CompletionEngine {
        let index = Arc::new(MetadataIndex::new());
        index.update_source(
            "file:///meta.json",
            parse_metadata_str(
                r#"{
                    "properties": [
                        { "name": "server.port", "type": "java.lang.Integer" },
                        { "name": "server.address", "type": "java.lang.String" },
                        { "name": "debug", "type": "java.lang.Boolean" }
                    ]
                }"#,
            )
            .unwrap(),
        );
        let catalog = Arc::new(TypeCatalog::new(Arc::new(CatalogResolver::new())));
        CompletionEngine::new(index, catalog)
    }

    #[test]
    fn test_provide_key_completions() {
        let ctx = CompletionContext::Key {
            segments: vec!["server".to_string(), "p".to_string()],
            implied: 0,
            start: 0,
            siblings: HashSet::new(),
        };
        let position = Position { line: 0, character: 8 };
        let items = provide_completions(
            &ctx,
            &engine(),
            FileType::Properties,
            position,
            &CancellationToken::new(),
        )
        .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].label, "server.port");
        match items[0].text_edit {
            Some(CompletionTextEdit::Edit(ref edit)) => {
                assert_eq!(edit.range.start, Position { line: 0, character: 0 });
                assert_eq!(edit.range.end, position);
            }
            _ => panic!("Expected a plain text edit"),
        }
    }

    #[test]
    fn test_provide_value_completions() {
        let ctx = CompletionContext::Value {
            key: vec!["debug".to_string()],
            prefix: "t".to_string(),
            start: 6,
            siblings: HashSet::new(),
        };
        let items = provide_completions(
            &ctx,
            &engine(),
            FileType::Properties,
            Position { line: 0, character: 7 },
            &CancellationToken::new(),
        )
        .unwrap();
        let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["true"]);
    }

    #[test]
    fn test_values_for_group_are_empty() {
        let ctx = CompletionContext::Value {
            key: vec!["server".to_string()],
            prefix: String::new(),
            start: 7,
            siblings: HashSet::new(),
        };
        let items = provide_completions(
            &ctx,
            &engine(),
            FileType::Properties,
            Position { line: 0, character: 7 },
            &CancellationToken::new(),
        )
        .unwrap();
        assert!(items.is_empty());
    }
}
