use styled_vars_lsp::{lsp_server, runtime_config};
use tower_lsp::{LspService, Server};

#[tokio::main]
async fn main() {
    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let runtime_config = runtime_config::build_runtime_config(&args);

    let (service, socket) =
        LspService::new(|client| lsp_server::StyledVarsLsp::new(client, runtime_config.clone()));

    Server::new(stdin, stdout, socket).serve(service).await;
}
