use thiserror::Error;

/// Reasons a hover, definition or preview request produces nothing.
///
/// None of these are fatal; request handlers log them and answer with an empty result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("no variable token at the requested position")]
    NoRegionFound,

    #[error("variable '{name}' is not declared in any known source")]
    NoDeclarationMatch { name: String },

    #[error("'{value}' is not a color literal")]
    MalformedColorValue { value: String },
}

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to build {kind} glob set: {source}")]
    GlobSet {
        kind: &'static str,
        #[source]
        source: globset::Error,
    },

    #[error("workspace folder '{0}' is not a file URI")]
    NotAFileUri(String),
}
