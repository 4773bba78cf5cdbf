//! Ingestion diagnostics for metadata documents.
//!
//! None of these stop ingestion; they describe entries that were skipped or
//! shadowed so the caller can surface them.

use crate::metadata::MetadataDocument;
use propmeta_types::HintRole;
use std::collections::HashSet;

/// Severity of an ingestion problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
}

/// One problem found while checking a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataDiagnostic {
    pub severity: Severity,
    pub message: String,
}

/// Check a document for entries that ingestion will skip or shadow.
pub fn check_document(doc: &MetadataDocument) -> Vec<MetadataDiagnostic> {
    let mut diagnostics = Vec::new();
    let mut seen = HashSet::new();

    for (i, prop) in doc.properties.iter().enumerate() {
        if prop.name.trim().is_empty() {
            diagnostics.push(MetadataDiagnostic {
                severity: Severity::Warning,
                message: format!("Property #{} has no name and was skipped", i),
            });
            continue;
        }
        if !seen.insert(prop.name.as_str()) {
            diagnostics.push(MetadataDiagnostic {
                severity: Severity::Info,
                message: format!(
                    "Duplicate property '{}': later declaration shadows earlier one",
                    prop.name
                ),
            });
        }
    }

    for hint in &doc.hints {
        let (target, role) = HintRole::split_hint_name(&hint.name);
        if !seen.contains(target) {
            diagnostics.push(MetadataDiagnostic {
                severity: Severity::Warning,
                message: format!(
                    "Hint '{}' refers to unknown property '{}'",
                    hint.name, target
                ),
            });
        } else if hint.values.is_empty() && role == HintRole::Generic {
            diagnostics.push(MetadataDiagnostic {
                severity: Severity::Info,
                message: format!("Hint '{}' declares no values", hint.name),
            });
        }
    }

    diagnostics
}
