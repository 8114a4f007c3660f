use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_lsp::jsonrpc;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};
use tracing::{debug, info, warn};

use pasfix::fault::LineInfo;
use pasfix::line_index::LineIndex;
use pasfix::{compute_fix, edit::DATA_TYPES, structure, Config, Fault, Lexer};

const APPLY_FAULT: &str = "pasfix.applyFault";

const KEYWORDS: &[&str] = &[
    "program", "unit", "uses", "interface", "implementation", "initialization",
    "finalization", "var", "const", "type", "function", "procedure", "begin", "end", "if",
    "then", "else", "case", "of", "for", "to", "downto", "do", "while", "repeat", "until",
    "record",
];

struct Backend {
    client: Client,
    docs: Arc<RwLock<HashMap<Url, String>>>,
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, _: InitializeParams) -> jsonrpc::Result<InitializeResult> {
        let caps = ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
            completion_provider: Some(CompletionOptions {
                resolve_provider: Some(false),
                trigger_characters: Some(vec![":".to_string(), " ".to_string()]),
                ..Default::default()
            }),
            document_formatting_provider: Some(OneOf::Left(true)),
            code_action_provider: Some(CodeActionProviderCapability::Simple(true)),
            execute_command_provider: Some(ExecuteCommandOptions {
                commands: vec![APPLY_FAULT.to_string()],
                work_done_progress_options: Default::default(),
            }),
            ..Default::default()
        };
        Ok(InitializeResult {
            capabilities: caps,
            server_info: Some(ServerInfo {
                name: "pasfix-lsp".into(),
                version: Some(env!("CARGO_PKG_VERSION").into()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "pasfix LSP initialized")
            .await;
    }

    async fn shutdown(&self) -> jsonrpc::Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let text = params.text_document.text;
        self.docs.write().await.insert(uri.clone(), text.clone());
        self.publish_diagnostics(uri, text).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        if let Some(change) = params.content_changes.into_iter().last() {
            let text = change.text;
            self.docs.write().await.insert(uri.clone(), text.clone());
            self.publish_diagnostics(uri, text).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.docs.write().await.remove(&params.text_document.uri);
    }

    async fn completion(
        &self,
        _params: CompletionParams,
    ) -> jsonrpc::Result<Option<CompletionResponse>> {
        let mut items = Vec::new();
        for kw in KEYWORDS {
            items.push(CompletionItem {
                label: kw.to_string(),
                kind: Some(CompletionItemKind::KEYWORD),
                ..Default::default()
            });
        }
        for ty in DATA_TYPES {
            items.push(CompletionItem {
                label: ty.to_string(),
                kind: Some(CompletionItemKind::TYPE_PARAMETER),
                ..Default::default()
            });
        }
        Ok(Some(CompletionResponse::Array(items)))
    }

    async fn formatting(
        &self,
        params: DocumentFormattingParams,
    ) -> jsonrpc::Result<Option<Vec<TextEdit>>> {
        let uri = params.text_document.uri;
        let docs = self.docs.read().await;
        if let Some(text) = docs.get(&uri) {
            let config = match uri.to_file_path() {
                Ok(path) => Config::discover(&path).unwrap_or_else(|e| {
                    warn!("ignoring config: {e}");
                    Config::default()
                }),
                Err(()) => Config::default(),
            };
            let pretty = pasfix::format_source_with_options(text, &config.formatter_options());
            return Ok(Some(vec![whole_document(pretty)]));
        }
        Ok(Some(vec![]))
    }

    async fn code_action(
        &self,
        params: CodeActionParams,
    ) -> jsonrpc::Result<Option<CodeActionResponse>> {
        let uri = params.text_document.uri;
        let docs = self.docs.read().await;
        let Some(text) = docs.get(&uri) else {
            return Ok(None);
        };
        let mut actions = Vec::new();
        for diag in params.context.diagnostics {
            let Some(fault) = diag
                .data
                .clone()
                .and_then(|data| serde_json::from_value::<Fault>(data).ok())
            else {
                continue;
            };
            if let Some(edit) = fix_edit(&uri, text, &fault) {
                actions.push(CodeActionOrCommand::CodeAction(CodeAction {
                    title: format!("Fix: {}", fault.message()),
                    kind: Some(CodeActionKind::QUICKFIX),
                    diagnostics: Some(vec![diag]),
                    edit: Some(edit),
                    ..Default::default()
                }));
            }
        }
        Ok(Some(actions))
    }

    async fn execute_command(
        &self,
        params: ExecuteCommandParams,
    ) -> jsonrpc::Result<Option<serde_json::Value>> {
        if params.command != APPLY_FAULT {
            return Err(jsonrpc::Error::method_not_found());
        }
        let mut args = params.arguments.into_iter();
        let (Some(uri), Some(fault)) = (args.next(), args.next()) else {
            return Err(jsonrpc::Error::invalid_params("expected [uri, fault]"));
        };
        let uri: Url = serde_json::from_value(uri)
            .map_err(|e| jsonrpc::Error::invalid_params(e.to_string()))?;
        let fault: Fault = serde_json::from_value(fault)
            .map_err(|e| jsonrpc::Error::invalid_params(e.to_string()))?;

        let edit = {
            let docs = self.docs.read().await;
            docs.get(&uri).and_then(|text| fix_edit(&uri, text, &fault))
        };
        match edit {
            Some(edit) => {
                info!(fault = fault.name(), "applying fix");
                self.client.apply_edit(edit).await?;
            }
            None => debug!(fault = fault.name(), "no fix applies"),
        }
        Ok(None)
    }
}

impl Backend {
    async fn publish_diagnostics(&self, uri: Url, text: String) {
        let faults = structure::check(&Lexer::new(&text).lex());
        let diags = faults
            .iter()
            .map(|fault| Diagnostic {
                range: fault_range(&text, fault),
                severity: Some(DiagnosticSeverity::ERROR),
                code: Some(NumberOrString::String(fault.name().to_string())),
                code_description: None,
                source: Some("pasfix".into()),
                message: fault.message(),
                related_information: None,
                tags: None,
                data: serde_json::to_value(fault).ok(),
            })
            .collect();
        self.client.publish_diagnostics(uri, diags, None).await;
    }
}

fn whole_document(new_text: String) -> TextEdit {
    TextEdit {
        range: Range::new(Position::new(0, 0), Position::new(u32::MAX, u32::MAX)),
        new_text,
    }
}

fn fix_edit(uri: &Url, text: &str, fault: &Fault) -> Option<WorkspaceEdit> {
    let fix = compute_fix(text, fault)?;
    let changes = HashMap::from([(uri.clone(), vec![whole_document(fix.apply_to(text))])]);
    Some(WorkspaceEdit {
        changes: Some(changes),
        ..Default::default()
    })
}

// One character at the fault, or the last line for faults without a position.
fn fault_range(text: &str, fault: &Fault) -> Range {
    let index = LineIndex::new(text);
    let at = fault
        .position()
        .unwrap_or_else(|| LineInfo::new(index.line_count() - 1, 0));
    let line = at.line as u32;
    let col = index.utf16_column(at) as u32;
    Range::new(Position::new(line, col), Position::new(line, col + 1))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let (stdin, stdout) = (tokio::io::stdin(), tokio::io::stdout());
    let (service, socket) = LspService::new(|client| Backend {
        client,
        docs: Arc::new(RwLock::new(HashMap::new())),
    });
    Server::new(stdin, stdout, socket).serve(service).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pasfix::fault::GroupingKind;

    #[test]
    fn ranges_follow_fault_position() {
        let fault = Fault::Grouping {
            at: LineInfo::new(2, 4),
            grouping: GroupingKind::UnfinishedBeginEnd,
        };
        let range = fault_range("a\nb\n    begin", &fault);
        assert_eq!(range.start, Position::new(2, 4));
        assert_eq!(fault_range("a\nb", &Fault::ProgramNotFound).start, Position::new(1, 0));
    }

    #[test]
    fn ranges_count_utf16_units() {
        let fault = Fault::Grouping {
            at: LineInfo::new(0, 10),
            grouping: GroupingKind::ExtraEnd,
        };
        let range = fault_range("s := '😀'; end", &fault);
        assert_eq!(range.start, Position::new(0, 11));
        assert_eq!(range.end, Position::new(0, 12));
    }

    #[test]
    fn fix_becomes_whole_document_edit() {
        let uri = Url::parse("file:///tmp/p.pas").unwrap();
        let edit = fix_edit(&uri, "program P;", &Fault::ProgramNotFound).unwrap();
        let changes = edit.changes.unwrap();
        assert_eq!(changes[&uri][0].new_text, "program P;\nbegin\n    \nend.\n");
    }
}
