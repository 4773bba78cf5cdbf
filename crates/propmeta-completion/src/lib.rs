//! Completion engine for propmeta.
//!
//! Resolves dotted key paths against the metadata tree, builds ranked key
//! and value suggestions, detects the completion context in `.properties`
//! and YAML text, and converts suggestions into LSP completion items.

pub mod context;
pub mod engine;
pub mod provider;
pub mod suggestion;

pub use engine::CompletionEngine;
