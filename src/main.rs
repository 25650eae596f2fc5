use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dashmap::DashMap;
use pytest_fixture_server::fixtures::cli::print_fixture_listing;
use pytest_fixture_server::{
    collect_fixtures, extract_word_at_position, parse_fixtures_report, resolve_definitions,
    should_suggest_fixtures, CommandSetting, FixtureCache, RunnerCommand, ServerSettings,
};
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};
use tracing::{debug, info, warn};

#[derive(Debug)]
struct Backend {
    client: Client,
    /// Discovered fixtures per file; wholesale replaced on each re-scan.
    cache: Arc<FixtureCache>,
    /// Current text of open documents, for line lookups at completion time.
    documents: Arc<DashMap<PathBuf, String>>,
    settings: Arc<RwLock<ServerSettings>>,
    workspace_root: Arc<RwLock<Option<PathBuf>>>,
    /// The missing-command warning is shown to the user only once.
    warned_missing_command: AtomicBool,
}

impl Backend {
    fn new(client: Client) -> Self {
        Self {
            client,
            cache: Arc::new(FixtureCache::new()),
            documents: Arc::new(DashMap::new()),
            settings: Arc::new(RwLock::new(ServerSettings::default())),
            workspace_root: Arc::new(RwLock::new(None)),
            warned_missing_command: AtomicBool::new(false),
        }
    }

    fn is_python_file(path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == "py")
    }

    async fn effective_workspace_root(&self, file_path: &Path) -> PathBuf {
        if let Some(root) = self.workspace_root.read().await.clone() {
            return root;
        }
        file_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Resolve the runner command from settings, degrading to the bare
    /// default and warning the user once when none is configured.
    async fn runner_command(&self) -> RunnerCommand {
        let settings = self.settings.read().await.clone();
        match settings.runner_command() {
            Some(command) => command,
            None => {
                if !self.warned_missing_command.swap(true, Ordering::Relaxed) {
                    self.client
                        .show_message(
                            MessageType::WARNING,
                            "No pytest command configured; falling back to `pytest`. \
                             Set `pytestFixtures.command` in your client settings.",
                        )
                        .await;
                }
                RunnerCommand::default_runner().with_python_path(settings.python_path)
            }
        }
    }

    /// Kick off a fixture collection for `file_path` in the background.
    ///
    /// On failure the cache entry is left unchanged, so stale results keep
    /// serving until a later scan succeeds. A newer scan's result simply
    /// overwrites an older one whenever it completes.
    async fn schedule_scan(&self, file_path: PathBuf) {
        if !Self::is_python_file(&file_path) {
            return;
        }

        let command = self.runner_command().await;
        let root = self.effective_workspace_root(&file_path).await;
        let client = self.client.clone();
        let cache = Arc::clone(&self.cache);

        tokio::spawn(async move {
            match collect_fixtures(&command, &root, &file_path).await {
                Ok(fixtures) => {
                    info!("Found {} fixtures for {:?}", fixtures.len(), file_path);
                    cache.insert(file_path, fixtures);
                }
                Err(err) => {
                    warn!("Fixture collection failed for {:?}: {}", file_path, err);
                    client
                        .log_message(
                            MessageType::ERROR,
                            format!("Fixture collection failed: {err}"),
                        )
                        .await;
                }
            }
        });
    }

    fn line_at(&self, file_path: &Path, line: u32) -> Option<String> {
        self.documents
            .get(file_path)
            .and_then(|text| text.lines().nth(line as usize).map(str::to_string))
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        info!("Initialize request received");

        #[allow(deprecated)]
        let root_uri = params.root_uri.clone();
        if let Some(root_uri) = root_uri {
            if let Ok(root_path) = root_uri.to_file_path() {
                info!("Workspace root: {:?}", root_path);
                *self.workspace_root.write().await = Some(root_path);
            }
        } else {
            warn!("No root URI provided in initialize");
        }

        let settings = ServerSettings::from_lsp_payload(params.initialization_options.as_ref());
        debug!("Initial settings: {:?}", settings);
        *self.settings.write().await = settings;

        Ok(InitializeResult {
            server_info: Some(ServerInfo {
                name: "pytest-fixture-server".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            capabilities: ServerCapabilities {
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec!["(".to_string(), ",".to_string()]),
                    ..Default::default()
                }),
                definition_provider: Some(OneOf::Left(true)),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                ..Default::default()
            },
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        info!("Server initialized notification received");
        self.client
            .log_message(MessageType::INFO, "pytest-fixture-server initialized")
            .await;
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        info!("did_open: {:?}", uri);
        if let Ok(file_path) = uri.to_file_path() {
            self.documents
                .insert(file_path.clone(), params.text_document.text);
            self.schedule_scan(file_path).await;
        }
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // Keep the document text current for completion; fixtures are only
        // re-collected on save, matching the save-triggered scan contract.
        if let Ok(file_path) = params.text_document.uri.to_file_path() {
            if let Some(change) = params.content_changes.into_iter().next() {
                self.documents.insert(file_path, change.text);
            }
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri;
        info!("did_save: {:?}", uri);
        if let Ok(file_path) = uri.to_file_path() {
            self.schedule_scan(file_path).await;
        }
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let mut settings = self.settings.write().await;
        *settings = settings.merged_with_payload(&params.settings);
        info!("Configuration updated: {:?}", *settings);
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let Ok(file_path) = uri.to_file_path() else {
            return Ok(None);
        };
        let Some(line) = self.line_at(&file_path, position.line) else {
            return Ok(None);
        };

        let document = self.documents.get(&file_path).map(|entry| entry.value().clone());
        if !should_suggest_fixtures(&line, position.character as usize, document.as_deref()) {
            return Ok(None);
        }

        let Some(fixtures) = self.cache.get(&file_path) else {
            debug!("No cached fixtures for {:?}", file_path);
            return Ok(None);
        };

        info!(
            "Suggesting {} fixtures for {:?}:{}",
            fixtures.len(),
            file_path,
            position.line
        );
        let items = fixtures
            .iter()
            .map(|fixture| CompletionItem {
                label: fixture.name.clone(),
                kind: Some(CompletionItemKind::VARIABLE),
                detail: Some(format!(
                    "{}:{}",
                    fixture.source_file.display(),
                    fixture.source_line
                )),
                documentation: fixture.docstring.as_ref().map(|docstring| {
                    Documentation::MarkupContent(MarkupContent {
                        kind: MarkupKind::Markdown,
                        value: docstring.clone(),
                    })
                }),
                ..Default::default()
            })
            .collect();

        Ok(Some(CompletionResponse::Array(items)))
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let Ok(file_path) = uri.to_file_path() else {
            return Ok(None);
        };
        let Some(line) = self.line_at(&file_path, position.line) else {
            return Ok(None);
        };
        let Some(word) = extract_word_at_position(&line, position.character as usize) else {
            return Ok(None);
        };
        let Some(records) = self.cache.get(&file_path) else {
            debug!("No cached fixtures for {:?}", file_path);
            return Ok(None);
        };

        let root = self.effective_workspace_root(&file_path).await;
        match resolve_definitions(&root, &records, word) {
            Ok(locations) if !locations.is_empty() => {
                info!("Found {} definition(s) for {}", locations.len(), word);
                let lsp_locations: Vec<Location> = locations
                    .into_iter()
                    .filter_map(|location| {
                        let uri = Url::from_file_path(&location.file_path).ok()?;
                        let line = location.line.saturating_sub(1) as u32;
                        Some(Location {
                            uri,
                            range: Range {
                                start: Position {
                                    line,
                                    character: location.start_char as u32,
                                },
                                end: Position {
                                    line,
                                    character: location.end_char as u32,
                                },
                            },
                        })
                    })
                    .collect();
                Ok(Some(GotoDefinitionResponse::Array(lsp_locations)))
            }
            Ok(_) => Ok(None),
            Err(err) => {
                warn!("Definition resolution failed for {}: {}", word, err);
                Ok(None)
            }
        }
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let Ok(file_path) = uri.to_file_path() else {
            return Ok(None);
        };
        let Some(line) = self.line_at(&file_path, position.line) else {
            return Ok(None);
        };
        let Some(word) = extract_word_at_position(&line, position.character as usize) else {
            return Ok(None);
        };
        let Some(records) = self.cache.get(&file_path) else {
            return Ok(None);
        };
        let Some(fixture) = records.iter().find(|f| f.name == word) else {
            return Ok(None);
        };

        let mut content = String::new();
        content.push_str(&format!(
            "```python\n@pytest.fixture\ndef {}(...):\n```\n",
            fixture.name
        ));
        content.push_str(&format!(
            "\n**Defined in:** `{}:{}`\n",
            fixture.source_file.display(),
            fixture.source_line
        ));
        if let Some(docstring) = &fixture.docstring {
            content.push_str("\n---\n\n");
            content.push_str(docstring);
        }

        Ok(Some(Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value: content,
            }),
            range: None,
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Parser)]
#[command(
    name = "pytest-fixture-server",
    version,
    about = "Discovers pytest fixtures via pytest's collection report and serves them over LSP"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Parse a saved fixture-collection report and print the fixtures.
    Parse {
        /// Path to a file holding `pytest --fixtures --collect-only` output.
        report: PathBuf,
    },
    /// Run a fixture collection for a Python file and print the fixtures.
    Scan {
        /// The Python file to collect fixtures for.
        file: PathBuf,
        /// The pytest command line, e.g. "python -m pytest".
        #[arg(long, default_value = "pytest")]
        pytest: String,
        /// PYTHONPATH override for the child process.
        #[arg(long)]
        python_path: Option<String>,
        /// Workspace root to run in; defaults to the current directory.
        #[arg(long)]
        workspace: Option<PathBuf>,
    },
}

fn run_parse(report: &Path) {
    match std::fs::read_to_string(report) {
        Ok(text) => print_fixture_listing(&parse_fixtures_report(&text)),
        Err(err) => {
            eprintln!("Failed to read {}: {}", report.display(), err);
            std::process::exit(1);
        }
    }
}

async fn run_scan(
    file: PathBuf,
    pytest: String,
    python_path: Option<String>,
    workspace: Option<PathBuf>,
) {
    let command =
        RunnerCommand::parse(&CommandSetting::CommandLine(pytest)).with_python_path(python_path);
    let workspace = workspace
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    let file = file.canonicalize().unwrap_or(file);

    match collect_fixtures(&command, &workspace, &file).await {
        Ok(fixtures) => print_fixture_listing(&fixtures),
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}

async fn serve() {
    info!("pytest-fixture-server starting");

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(Backend::new);

    info!("LSP server ready");
    Server::new(stdin, stdout, socket).serve(service).await;
}

#[tokio::main]
async fn main() {
    // Stderr logging with env-filter support; stdout carries the protocol.
    // Users control verbosity with RUST_LOG, e.g.:
    // RUST_LOG=debug pytest-fixture-server
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(CliCommand::Parse { report }) => run_parse(&report),
        Some(CliCommand::Scan {
            file,
            pytest,
            python_path,
            workspace,
        }) => run_scan(file, pytest, python_path, workspace).await,
        None => serve().await,
    }
}
