use thiserror::Error;

/// Configuration errors (SPEC_FULL.md §7 kind 1): fatal, surfaced before transport begins.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required parameter '{0}'")]
    MissingParameter(&'static str),

    #[error("parameter file did not contain a 'source' entry")]
    MissingSourceEntry,

    #[error("unknown source location preset '{0}'")]
    UnknownSourceLocation(String),

    #[error("failed to parse run configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] IoError),
}

/// I/O errors (SPEC_FULL.md §7 kind 2): fatal at startup, cross-section files unreadable or
/// malformed.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("could not read cross-section file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cross-section file {path} line {line}: expected '<energy> <sigma>', got '{content}'")]
    MalformedLine {
        path: String,
        line: usize,
        content: String,
    },
}
