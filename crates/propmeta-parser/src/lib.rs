//! Metadata ingestion for propmeta.
//!
//! Reads configuration metadata documents into declaration records,
//! reports ingestion problems, splits dotted key paths, and keeps
//! rope-backed buffers for open configuration files.

pub mod diagnostics;
pub mod document;
pub mod metadata;
pub mod path;

pub use metadata::{parse_metadata_file, parse_metadata_str, MetadataDocument, MetadataError};
