// Library interface for styled-vars-lsp
// This allows integration tests and external usage

pub mod color;
pub mod completion;
pub mod context;
pub mod error;
pub mod index;
pub mod lsp_server;
pub mod manager;
pub mod parsers;
pub mod registry;
pub mod runtime_config;
pub mod types;
pub mod workspace;
