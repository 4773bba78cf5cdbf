//! LSP server implementation — LanguageServer trait.

use crate::settings::{Settings, SETTINGS_FILE};
use dashmap::DashMap;
use propmeta_completion::context::detect_context;
use propmeta_completion::provider::provide_completions;
use propmeta_completion::CompletionEngine;
use propmeta_index::resolver::load_catalogs;
use propmeta_index::{CancellationToken, CatalogResolver, MetadataIndex, ResolveError, TypeCatalog};
use propmeta_parser::document::TextDocument;
use propmeta_parser::{parse_metadata_file, parse_metadata_str};
use propmeta_types::FileType;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_lsp::jsonrpc::Result;
use tower_lsp::ls_types::*;
use tower_lsp::{Client, LanguageServer};

/// Suffix shared by `spring-configuration-metadata.json` and
/// `additional-spring-configuration-metadata.json`.
const METADATA_SUFFIX: &str = "configuration-metadata.json";

/// Main LSP backend holding all state.
pub struct PropMetaBackend {
    client: Client,
    /// Open configuration files (URI string → buffer).
    open_files: Arc<DashMap<String, TextDocument>>,
    index: Arc<MetadataIndex>,
    resolver: Arc<CatalogResolver>,
    engine: Arc<CompletionEngine>,
    /// Workspace root path (set during initialize).
    workspace_root: Mutex<Option<PathBuf>>,
    settings: Mutex<Settings>,
    /// Token of the completion request currently running.
    pending_completion: Mutex<Option<CancellationToken>>,
}

impl PropMetaBackend {
    pub fn new(client: Client) -> Self {
        let index = Arc::new(MetadataIndex::new());
        let resolver = Arc::new(CatalogResolver::new());
        let catalog = Arc::new(TypeCatalog::new(resolver.clone()));
        PropMetaBackend {
            client,
            open_files: Arc::new(DashMap::new()),
            engine: Arc::new(CompletionEngine::new(index.clone(), catalog)),
            index,
            resolver,
            workspace_root: Mutex::new(None),
            settings: Mutex::new(Settings::default()),
            pending_completion: Mutex::new(None),
        }
    }

    /// Ingest an open metadata document from its editor text.
    fn ingest_metadata_text(&self, uri: &str, text: &str) {
        match parse_metadata_str(text) {
            Ok(doc) => self.index.update_source(uri, doc),
            Err(e) => tracing::warn!("Ignoring metadata {}: {}", uri, e),
        }
    }
}

fn is_metadata_uri(uri: &str) -> bool {
    uri.ends_with(METADATA_SUFFIX)
}

/// Collect `META-INF/*configuration-metadata.json` files below `dir`.
fn collect_metadata_files(dir: &Path, files: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Failed to read directory {}: {}", dir.display(), e);
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        if path.is_dir() {
            if name_str.starts_with('.') || name_str == "node_modules" {
                continue;
            }
            collect_metadata_files(&path, files);
        } else if name_str.ends_with(METADATA_SUFFIX)
            && dir.file_name().and_then(|d| d.to_str()) == Some("META-INF")
        {
            files.push(path);
        }
    }
}

/// Convert a file:// URI to a filesystem path.
fn uri_to_path(uri: &str) -> Option<PathBuf> {
    uri.strip_prefix("file://").map(PathBuf::from)
}

/// Convert a file path to a file:// URI.
fn path_to_uri(path: &Path) -> String {
    format!("file://{}", path.display())
}

/// Load type catalogs, explicit metadata files and (optionally) workspace
/// metadata into the index. Returns the number of metadata files ingested.
fn load_sources(
    settings: &Settings,
    root: Option<&Path>,
    resolver: &CatalogResolver,
    engine: &CompletionEngine,
) -> usize {
    let types = load_catalogs(resolver, &settings.type_catalog_paths);
    if types > 0 {
        tracing::info!("Loaded {} type descriptors", types);
        engine.catalog().invalidate_all();
        engine.index().invalidate_delegates();
    }

    let mut files = settings.metadata_paths.clone();
    if settings.scan_workspace {
        if let Some(root) = root {
            let mut found = Vec::new();
            collect_metadata_files(root, &mut found);
            found.sort();
            files.extend(found);
        }
    }

    let mut loaded = 0;
    for path in &files {
        match parse_metadata_file(path) {
            Ok(doc) => {
                engine.index().update_source(&path_to_uri(path), doc);
                loaded += 1;
            }
            Err(e) => tracing::warn!("Skipping metadata file {}: {}", path.display(), e),
        }
    }
    loaded
}

fn lsp_completion_kind_to_ls(kind: lsp_types::CompletionItemKind) -> CompletionItemKind {
    match kind {
        lsp_types::CompletionItemKind::MODULE => CompletionItemKind::MODULE,
        lsp_types::CompletionItemKind::PROPERTY => CompletionItemKind::PROPERTY,
        lsp_types::CompletionItemKind::FIELD => CompletionItemKind::FIELD,
        lsp_types::CompletionItemKind::ENUM_MEMBER => CompletionItemKind::ENUM_MEMBER,
        lsp_types::CompletionItemKind::VALUE => CompletionItemKind::VALUE,
        _ => CompletionItemKind::TEXT,
    }
}

fn lsp_range_to_ls(range: lsp_types::Range) -> Range {
    Range {
        start: Position {
            line: range.start.line,
            character: range.start.character,
        },
        end: Position {
            line: range.end.line,
            character: range.end.character,
        },
    }
}

/// Convert lsp_types::CompletionItem to ls_types::CompletionItem.
fn lsp_item_to_ls(item: lsp_types::CompletionItem) -> CompletionItem {
    let tags = item.tags.map(|tags| {
        tags.into_iter()
            .filter(|t| *t == lsp_types::CompletionItemTag::DEPRECATED)
            .map(|_| CompletionItemTag::DEPRECATED)
            .collect()
    });

    let documentation = item.documentation.map(|doc| match doc {
        lsp_types::Documentation::String(s) => Documentation::String(s),
        lsp_types::Documentation::MarkupContent(m) => Documentation::MarkupContent(MarkupContent {
            kind: match m.kind {
                lsp_types::MarkupKind::Markdown => MarkupKind::Markdown,
                lsp_types::MarkupKind::PlainText => MarkupKind::PlainText,
            },
            value: m.value,
        }),
    });

    let text_edit = item.text_edit.and_then(|edit| match edit {
        lsp_types::CompletionTextEdit::Edit(e) => Some(CompletionTextEdit::Edit(TextEdit {
            range: lsp_range_to_ls(e.range),
            new_text: e.new_text,
        })),
        lsp_types::CompletionTextEdit::InsertAndReplace(_) => None,
    });

    CompletionItem {
        label: item.label,
        kind: item.kind.map(lsp_completion_kind_to_ls),
        detail: item.detail,
        documentation,
        tags,
        sort_text: item.sort_text,
        filter_text: item.filter_text,
        text_edit,
        data: item.data,
        ..Default::default()
    }
}

impl LanguageServer for PropMetaBackend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        tracing::info!("propmeta-lsp: initialize");

        #[allow(deprecated)]
        let root_path = params
            .root_uri
            .as_ref()
            .and_then(|uri| uri_to_path(uri.as_str()))
            .or_else(|| params.root_path.as_ref().map(PathBuf::from));

        let mut settings = match root_path {
            Some(ref root) => Settings::load(&root.join(SETTINGS_FILE)).unwrap_or_else(|e| {
                tracing::warn!("Using default settings: {}", e);
                Settings::default()
            }),
            None => Settings::default(),
        };
        if let Some(ref opts) = params.initialization_options {
            if let Err(e) = settings.merge_json(opts) {
                tracing::warn!("Ignoring initializationOptions: {}", e);
            }
        }

        if let Some(ref root) = root_path {
            tracing::info!("Workspace root: {}", root.display());
            settings.absolutize(root);
            *self.workspace_root.lock().await = Some(root.clone());
        }
        *self.settings.lock().await = settings;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::INCREMENTAL),
                        ..Default::default()
                    },
                )),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec![
                        ".".to_string(),
                        "=".to_string(),
                        ":".to_string(),
                    ]),
                    resolve_provider: Some(false),
                    ..Default::default()
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "propmeta-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            offset_encoding: None,
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        tracing::info!("propmeta-lsp: initialized");

        let settings = self.settings.lock().await.clone();
        let root = self.workspace_root.lock().await.clone();
        let resolver = self.resolver.clone();
        let engine = self.engine.clone();

        let loaded = tokio::task::spawn_blocking(move || {
            load_sources(&settings, root.as_deref(), &resolver, &engine)
        })
        .await;

        match loaded {
            Ok(count) => {
                self.client
                    .log_message(
                        MessageType::INFO,
                        format!(
                            "propmeta-lsp: loaded {} metadata files, {} properties",
                            count,
                            self.index.tree().len()
                        ),
                    )
                    .await;
            }
            Err(e) => {
                tracing::error!("Metadata loading failed: {}", e);
                self.client
                    .log_message(MessageType::ERROR, format!("Metadata loading failed: {}", e))
                    .await;
            }
        }
    }

    async fn shutdown(&self) -> Result<()> {
        tracing::info!("propmeta-lsp: shutdown");
        Ok(())
    }

    // --- Document Synchronization ---

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri_str = params.text_document.uri.as_str().to_string();
        let text = &params.text_document.text;
        tracing::debug!("didOpen: {}", uri_str);

        if is_metadata_uri(&uri_str) {
            self.ingest_metadata_text(&uri_str, text);
            return;
        }
        let Some(file_type) = FileType::from_path(&uri_str) else {
            return;
        };

        let mut doc = TextDocument::new(file_type);
        doc.set_text(text);
        self.open_files.insert(uri_str, doc);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri_str = params.text_document.uri.as_str().to_string();
        tracing::debug!("didChange: {}", uri_str);

        if is_metadata_uri(&uri_str) {
            // Metadata documents are re-read in full
            if let Some(change) = params.content_changes.iter().rev().find(|c| c.range.is_none()) {
                self.ingest_metadata_text(&uri_str, &change.text);
            }
            return;
        }

        if let Some(mut doc) = self.open_files.get_mut(&uri_str) {
            for change in &params.content_changes {
                if let Some(range) = change.range {
                    doc.apply_edit(
                        range.start.line,
                        range.start.character,
                        range.end.line,
                        range.end.character,
                        &change.text,
                    );
                } else {
                    doc.set_text(&change.text);
                }
            }
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri_str = params.text_document.uri.as_str().to_string();
        tracing::debug!("didClose: {}", uri_str);
        self.open_files.remove(&uri_str);
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri_str = params
            .text_document_position
            .text_document
            .uri
            .as_str()
            .to_string();
        let pos = params.text_document_position.position;
        tracing::debug!("completion: {}:{}:{}", uri_str, pos.line, pos.character);

        let (context, file_type) = match self.open_files.get(&uri_str) {
            Some(doc) => (
                detect_context(&doc, pos.line, pos.character),
                doc.file_type(),
            ),
            None => return Ok(None),
        };

        let cancel = CancellationToken::new();
        if let Some(previous) = self.pending_completion.lock().await.replace(cancel.clone()) {
            previous.cancel();
        }

        let engine = self.engine.clone();
        let position = lsp_types::Position {
            line: pos.line,
            character: pos.character,
        };
        let result = tokio::task::spawn_blocking(move || {
            provide_completions(&context, &engine, file_type, position, &cancel)
        })
        .await;

        let lsp_items = match result {
            Ok(Ok(items)) => items,
            Ok(Err(ResolveError::Cancelled)) => {
                tracing::debug!("completion superseded: {}", uri_str);
                return Ok(None);
            }
            Ok(Err(e)) => {
                tracing::warn!("completion failed for {}: {}", uri_str, e);
                return Ok(None);
            }
            Err(e) => {
                tracing::error!("completion task failed: {}", e);
                return Ok(None);
            }
        };

        if lsp_items.is_empty() {
            return Ok(None);
        }

        let max = self.settings.lock().await.max_suggestions;
        let is_incomplete = lsp_items.len() > max;
        let items: Vec<CompletionItem> = lsp_items
            .into_iter()
            .take(max)
            .map(lsp_item_to_ls)
            .collect();

        if is_incomplete {
            Ok(Some(CompletionResponse::List(CompletionList {
                is_incomplete: true,
                items,
            })))
        } else {
            Ok(Some(CompletionResponse::Array(items)))
        }
    }
}
