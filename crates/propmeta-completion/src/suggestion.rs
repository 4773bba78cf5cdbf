//! Suggestion builder.

use propmeta_index::{Node, ValueCandidate};
use propmeta_types::{shorten_type, FileType, Suggestion, SuggestionKind};

fn names(chain: &[Node]) -> Vec<String> {
    chain.iter().map(Node::name).collect()
}

fn append_colon(file_type: FileType) -> Option<bool> {
    match file_type {
        FileType::Yaml => Some(true),
        FileType::Properties => None,
    }
}

/// Key suggestion for the last node of `chain` (root first).
pub fn key_suggestion(chain: &[Node], leaf: bool, file_type: FileType) -> Option<Suggestion> {
    let last = chain.last()?;
    let ancestor_path = names(chain);

    let mut suggestion = Suggestion {
        display_text: ancestor_path.join("."),
        ancestor_path,
        kind: SuggestionKind::Group,
        short_type: None,
        description: None,
        default_value_text: None,
        deprecation_level: None,
        append_colon: append_colon(file_type),
        leaf,
    };

    match last {
        Node::Tree(t) => match (t.property(), t.group()) {
            (Some(property), _) => {
                suggestion.kind = SuggestionKind::Property;
                suggestion.short_type = property.type_name.as_deref().map(shorten_type);
                suggestion.description = Some(
                    property
                        .description
                        .clone()
                        .unwrap_or_else(|| property.describe()),
                );
                suggestion.default_value_text = property.default_value_text();
                suggestion.deprecation_level = property.deprecation_level();
            }
            (None, Some(group)) => {
                suggestion.short_type = group.type_name.as_deref().map(shorten_type);
                suggestion.description = group.description.clone();
            }
            (None, None) => {}
        },
        Node::HintKey(h) => {
            suggestion.kind = SuggestionKind::MapKey;
            suggestion.description = h.value.description.clone();
        }
        Node::Class(c) => {
            suggestion.kind = SuggestionKind::Field;
            suggestion.short_type = Some(c.node.descriptor().short_name());
            suggestion.description = Some(c.node.describe());
        }
    }

    Some(suggestion)
}

/// Value suggestion for a leaf reached through `chain`.
pub fn value_suggestion(
    chain: &[Node],
    candidate: ValueCandidate,
    default_value_text: Option<String>,
) -> Suggestion {
    Suggestion {
        display_text: candidate.text,
        ancestor_path: names(chain),
        kind: SuggestionKind::Value,
        short_type: None,
        description: candidate.description,
        default_value_text,
        deprecation_level: None,
        append_colon: None,
        leaf: true,
    }
}
