use quickview_store::QueryError;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported configuration format `{0}` (expected .json, .yaml or .yml)")]
    UnsupportedFormat(String),
    #[error("malformed {kind} configuration: {message}")]
    Malformed { kind: &'static str, message: String },
    #[error("invalid {kind} rule for `{name}`: {message}")]
    InvalidRule {
        kind: &'static str,
        name: String,
        message: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ExploreError {
    #[error("no visible node with id `{0}`")]
    UnknownNode(String),
    #[error("expansion of `{0}` is still in flight")]
    ExpansionPending(String),
    #[error("no reduction is configured for type `{0}`")]
    UnknownReduction(String),
    #[error("no style group named `{0}`")]
    UnknownStyleGroup(String),
    #[error("no namespace filter named `{0}`")]
    UnknownNamespaceFilter(String),
    #[error(transparent)]
    Query(#[from] QueryError),
}
