use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;
use tower_lsp::lsp_types::{
    CompletionItem, CompletionOptions, CompletionParams, CompletionResponse,
    DidChangeTextDocumentParams, DidChangeWatchedFilesParams, DidChangeWorkspaceFoldersParams,
    DidCloseTextDocumentParams, DidOpenTextDocumentParams, FileChangeType, GotoDefinitionParams,
    GotoDefinitionResponse, Hover, HoverContents, HoverParams, HoverProviderCapability,
    InitializeParams, InitializeResult, InitializedParams, Location, MarkupContent, MarkupKind,
    MessageType, OneOf, Position, ServerCapabilities, ServerInfo, TextDocumentContentChangeEvent,
    TextDocumentSyncCapability, TextDocumentSyncKind, Url, WorkDoneProgressOptions,
    WorkspaceFolder, WorkspaceFoldersServerCapabilities, WorkspaceServerCapabilities,
};
use tower_lsp::{Client, LanguageServer};
use tracing::{debug, info, warn};

use crate::color::build_hover_payload;
use crate::completion::build_completion_payload;
use crate::context::{variable_at_position, CompletionRequestContext};
use crate::error::LookupError;
use crate::index::VariableLookupIndex;
use crate::manager::VariableManager;
use crate::runtime_config::RuntimeConfig;
use crate::types::{position_to_offset, Config, InitOptions};
use crate::workspace::{scan_workspace, SourceMatcher};

/// An open editor buffer
#[derive(Debug, Clone)]
struct OpenDocument {
    text: String,
    language_id: String,
}

pub struct StyledVarsLsp {
    client: Client,
    manager: Arc<VariableManager>,
    document_map: Arc<RwLock<HashMap<Url, OpenDocument>>>,
    runtime_config: RuntimeConfig,
    workspace_folders: Arc<RwLock<Vec<Url>>>,
}

impl StyledVarsLsp {
    pub fn new(client: Client, runtime_config: RuntimeConfig) -> Self {
        let config = Config::from_runtime(&runtime_config);
        Self {
            client,
            manager: Arc::new(VariableManager::new(config)),
            document_map: Arc::new(RwLock::new(HashMap::new())),
            runtime_config,
            workspace_folders: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn capabilities() -> ServerCapabilities {
        ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Kind(
                TextDocumentSyncKind::INCREMENTAL,
            )),
            completion_provider: Some(CompletionOptions {
                resolve_provider: Some(false),
                trigger_characters: Some(vec!["-".to_string()]),
                work_done_progress_options: WorkDoneProgressOptions::default(),
                all_commit_characters: None,
                completion_item: None,
            }),
            hover_provider: Some(HoverProviderCapability::Simple(true)),
            definition_provider: Some(OneOf::Left(true)),
            workspace: Some(WorkspaceServerCapabilities {
                workspace_folders: Some(WorkspaceFoldersServerCapabilities {
                    supported: Some(true),
                    change_notifications: Some(OneOf::Left(true)),
                }),
                file_operations: None,
            }),
            ..Default::default()
        }
    }

    async fn set_workspace_folders(&self, folders: Vec<Url>) {
        let mut stored = self.workspace_folders.write().await;
        *stored = folders;
    }

    async fn workspace_roots(&self) -> Vec<PathBuf> {
        let folders = self.workspace_folders.read().await;
        folders
            .iter()
            .filter_map(|folder| folder.to_file_path().ok())
            .collect()
    }

    /// Whether `uri` is, or should become, a declaration source
    async fn is_lookup_file(&self, uri: &Url) -> bool {
        if self.manager.is_source(uri).await {
            return true;
        }

        let path = match uri.to_file_path() {
            Ok(path) => path,
            Err(_) => return false,
        };
        let config = self.manager.get_config().await;
        match SourceMatcher::from_config(&config) {
            Ok(matcher) => matcher.matches(&path, &self.workspace_roots().await),
            Err(e) => {
                warn!(error = %e, "cannot build source matcher");
                false
            }
        }
    }

    async fn is_document_open(&self, uri: &Url) -> bool {
        let docs = self.document_map.read().await;
        docs.contains_key(uri)
    }

    async fn document_snapshot(&self, uri: &Url) -> Option<OpenDocument> {
        let docs = self.document_map.read().await;
        docs.get(uri).cloned()
    }

    async fn update_source_from_disk(&self, uri: &Url) {
        let path = match uri.to_file_path() {
            Ok(path) => path,
            Err(_) => {
                self.manager.remove_source(uri).await;
                return;
            }
        };

        match tokio::fs::read_to_string(&path).await {
            Ok(text) => self.manager.upsert_source(uri.clone(), text).await,
            Err(e) => {
                debug!(%uri, error = %e, "source no longer readable");
                self.manager.remove_source(uri).await;
            }
        }
    }

    async fn apply_content_changes(
        &self,
        uri: &Url,
        changes: Vec<TextDocumentContentChangeEvent>,
    ) -> Option<String> {
        let mut docs = self.document_map.write().await;
        if !docs.contains_key(uri) {
            if changes.len() == 1 && changes[0].range.is_none() {
                let text = changes[0].text.clone();
                docs.insert(
                    uri.clone(),
                    OpenDocument {
                        text: text.clone(),
                        language_id: language_id_for_uri(uri).to_string(),
                    },
                );
                return Some(text);
            }
            return None;
        }

        let document = docs.get_mut(uri)?;

        for change in changes {
            apply_change_to_text(&mut document.text, &change);
        }

        Some(document.text.clone())
    }

    /// Snapshot an open document and build its lookup index, if its language is enabled
    async fn request_index(&self, uri: &Url) -> Option<(OpenDocument, Config, VariableLookupIndex)> {
        let document = self.document_snapshot(uri).await?;
        let config = self.manager.get_config().await;
        if !config.is_language_enabled(&document.language_id) {
            debug!(%uri, language = %document.language_id, "language not enabled");
            return None;
        }

        let index = self.manager.resolve(Some((uri, &document.text))).await;
        Some((document, config, index))
    }

    pub async fn scan_workspace_folders(&self, folders: Vec<Url>) {
        self.client
            .log_message(
                MessageType::INFO,
                format!("Scanning {} workspace folders...", folders.len()),
            )
            .await;

        let config = self.manager.get_config().await;
        let client = self.client.clone();

        let mut last_logged_percentage = 0;
        let result = scan_workspace(folders, &config, |current, total| {
            if total == 0 {
                return;
            }
            let percentage = ((current as f64 / total as f64) * 100.0).round() as i32;
            if percentage - last_logged_percentage >= 20 || current == total {
                last_logged_percentage = percentage;
                let client = client.clone();
                tokio::spawn(async move {
                    client
                        .log_message(
                            MessageType::INFO,
                            format!(
                                "Reading declaration files: {}/{} ({}%)",
                                current, total, percentage
                            ),
                        )
                        .await;
                });
            }
        })
        .await;

        match result {
            Ok(sources) => {
                let file_count = sources.len();
                self.manager.set_sources(sources).await;

                // Open buffers are newer than what is on disk
                let open_docs: Vec<(Url, String)> = {
                    let docs = self.document_map.read().await;
                    docs.iter()
                        .map(|(uri, doc)| (uri.clone(), doc.text.clone()))
                        .collect()
                };
                for (uri, text) in open_docs {
                    self.manager.update_source_if_known(&uri, &text).await;
                }

                let total_vars = self.manager.resolve(None).await.unique().len();
                info!(files = file_count, variables = total_vars, "workspace scan complete");
                self.client
                    .log_message(
                        MessageType::INFO,
                        format!(
                            "Workspace scan complete. Found {} variables in {} files.",
                            total_vars, file_count
                        ),
                    )
                    .await;
            }
            Err(e) => {
                warn!(error = %e, "workspace scan failed");
                self.client
                    .log_message(MessageType::ERROR, format!("Workspace scan failed: {}", e))
                    .await;
            }
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for StyledVarsLsp {
    async fn initialize(
        &self,
        params: InitializeParams,
    ) -> tower_lsp::jsonrpc::Result<InitializeResult> {
        info!("initializing");

        let mut config = Config::from_runtime(&self.runtime_config);
        if let Some(options) = params.initialization_options {
            match serde_json::from_value::<InitOptions>(options) {
                Ok(options) => config.apply_init_options(options),
                Err(e) => warn!(error = %e, "ignoring malformed initializationOptions"),
            }
        }
        self.manager.set_config(config).await;

        let folders = match params.workspace_folders {
            Some(folders) => folders.into_iter().map(|f| f.uri).collect(),
            None => params.root_uri.into_iter().collect(),
        };
        self.set_workspace_folders(folders).await;

        Ok(InitializeResult {
            capabilities: Self::capabilities(),
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "Styled vars LSP initialized")
            .await;

        if let Ok(Some(folders)) = self.client.workspace_folders().await {
            self.set_workspace_folders(folders.into_iter().map(|f| f.uri).collect())
                .await;
        }

        let folders = self.workspace_folders.read().await.clone();
        self.scan_workspace_folders(folders).await;
    }

    async fn shutdown(&self) -> tower_lsp::jsonrpc::Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let text = params.text_document.text;
        {
            let mut docs = self.document_map.write().await;
            docs.insert(
                uri.clone(),
                OpenDocument {
                    text: text.clone(),
                    language_id: params.text_document.language_id,
                },
            );
        }

        if self.is_lookup_file(&uri).await {
            self.manager.upsert_source(uri, text).await;
        }
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let updated_text = match self.apply_content_changes(&uri, params.content_changes).await {
            Some(text) => text,
            None => return,
        };

        if self.is_lookup_file(&uri).await {
            self.manager.upsert_source(uri, updated_text).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        {
            let mut docs = self.document_map.write().await;
            docs.remove(&uri);
        }

        if self.manager.is_source(&uri).await {
            self.update_source_from_disk(&uri).await;
        }
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        for change in params.changes {
            match change.typ {
                FileChangeType::DELETED => {
                    self.manager.remove_source(&change.uri).await;
                }
                FileChangeType::CREATED | FileChangeType::CHANGED => {
                    if !self.is_document_open(&change.uri).await
                        && self.is_lookup_file(&change.uri).await
                    {
                        self.update_source_from_disk(&change.uri).await;
                    }
                }
                _ => {}
            }
        }
    }

    async fn did_change_workspace_folders(&self, params: DidChangeWorkspaceFoldersParams) {
        let mut folders = self.workspace_folders.read().await.clone();

        for removed in params.event.removed {
            folders.retain(|uri| uri != &removed.uri);
        }
        for WorkspaceFolder { uri, .. } in params.event.added {
            if !folders.contains(&uri) {
                folders.push(uri);
            }
        }

        self.set_workspace_folders(folders.clone()).await;
        self.scan_workspace_folders(folders).await;
    }

    async fn completion(
        &self,
        params: CompletionParams,
    ) -> tower_lsp::jsonrpc::Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let (document, config, index) = match self.request_index(&uri).await {
            Some(resolved) => resolved,
            None => return Ok(None),
        };

        let context = match CompletionRequestContext::from_document(&document.text, position) {
            Some(context) => context,
            None => return Ok(None),
        };

        let items: Vec<CompletionItem> = index
            .unique()
            .into_iter()
            .map(|declaration| {
                build_completion_payload(declaration, &context, config.enable_color_preview)
                    .into()
            })
            .collect();

        Ok(Some(CompletionResponse::Array(items)))
    }

    async fn hover(&self, params: HoverParams) -> tower_lsp::jsonrpc::Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let (document, config, index) = match self.request_index(&uri).await {
            Some(resolved) => resolved,
            None => return Ok(None),
        };

        match hover_text(&document.text, position, &index, config.enable_color_preview) {
            Ok(value) => Ok(Some(Hover {
                contents: HoverContents::Markup(MarkupContent {
                    kind: MarkupKind::Markdown,
                    value,
                }),
                range: None,
            })),
            Err(e) => {
                debug!(%uri, error = %e, "no hover");
                Ok(None)
            }
        }
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> tower_lsp::jsonrpc::Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let (document, _, index) = match self.request_index(&uri).await {
            Some(resolved) => resolved,
            None => return Ok(None),
        };

        let mut locations = match definition_locations(&document.text, position, &index) {
            Ok(locations) => locations,
            Err(e) => {
                debug!(%uri, error = %e, "no definition");
                return Ok(None);
            }
        };

        if locations.len() == 1 {
            Ok(locations.pop().map(GotoDefinitionResponse::Scalar))
        } else {
            Ok(Some(GotoDefinitionResponse::Array(locations)))
        }
    }
}

/// Hover markdown for the variable under the cursor
fn hover_text(
    text: &str,
    position: Position,
    index: &VariableLookupIndex,
    color_preview: bool,
) -> Result<String, LookupError> {
    let name = variable_at_position(text, position)?;
    let declaration = index
        .first_by_name(&name)
        .ok_or(LookupError::NoDeclarationMatch { name })?;
    Ok(build_hover_payload(&declaration.value, color_preview))
}

/// Every declaration site for the variable under the cursor, in index order
fn definition_locations(
    text: &str,
    position: Position,
    index: &VariableLookupIndex,
) -> Result<Vec<Location>, LookupError> {
    let name = variable_at_position(text, position)?;
    let locations: Vec<Location> = index
        .lookup_by_name(&name)
        .into_iter()
        .map(|declaration| Location::new(declaration.uri.clone(), declaration.range))
        .collect();

    if locations.is_empty() {
        Err(LookupError::NoDeclarationMatch { name })
    } else {
        Ok(locations)
    }
}

fn language_id_for_uri(uri: &Url) -> &'static str {
    let path = uri.path().to_lowercase();
    match path.rsplit_once('.').map(|(_, ext)| ext) {
        Some("tsx") => "typescriptreact",
        Some("jsx") => "javascriptreact",
        Some("ts" | "mts" | "cts") => "typescript",
        Some("js" | "mjs" | "cjs") => "javascript",
        _ => "plaintext",
    }
}

fn apply_change_to_text(text: &mut String, change: &TextDocumentContentChangeEvent) {
    if let Some(range) = change.range {
        let start = position_to_offset(text, range.start);
        let end = position_to_offset(text, range.end);
        if let (Some(start), Some(end)) = (start, end) {
            if start <= end && end <= text.len() {
                text.replace_range(start..end, &change.text);
                return;
            }
        }
    }
    *text = change.text.clone();
}
