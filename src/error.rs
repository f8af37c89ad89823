/// Error types for the chattyhosts library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An ignore pattern failed to compile at startup.
    #[error("unable to compile ignore pattern {pattern:?}")]
    IgnorePattern {
        pattern: String,
        #[source]
        source: regex_automata::meta::BuildError,
    },

    /// The built-in IPv4 candidate pattern failed to compile.
    #[error("address pattern failed to compile")]
    AddrPattern(#[from] regex_automata::meta::BuildError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results using the library error.
pub type Result<T> = std::result::Result<T, Error>;
