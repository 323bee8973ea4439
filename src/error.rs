//! Error types for template rendering.
use thiserror::Error;

/// Result type for template rendering.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for template rendering.
///
/// Every kind is fatal: a render either completes or aborts with one of these,
/// leaving the caller to discard the partially rewritten tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A placeholder opened but never closed before the end of its paragraph
    #[error("Scan error: {0}")]
    Scan(String),

    /// A block start marker without a matching end marker
    #[error("Block match error: {0}")]
    BlockMatch(String),

    /// Block markers placed at incompatible tree locations
    #[error("Scope error: {0}")]
    Scope(String),

    /// Malformed expression or evaluator failure
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(String),
}

impl Error {
    /// Prefix the message with the markers of the block being resolved.
    ///
    /// The variant is kept, so callers can still match on the error kind.
    pub fn in_block(self, start: &str, end: &str) -> Self {
        let wrap = |msg: String| format!("Error in {start}..{end}: {msg}");
        match self {
            Error::Scan(m) => Error::Scan(wrap(m)),
            Error::BlockMatch(m) => Error::BlockMatch(wrap(m)),
            Error::Scope(m) => Error::Scope(wrap(m)),
            Error::Evaluation(m) => Error::Evaluation(wrap(m)),
            Error::Xml(m) => Error::Xml(wrap(m)),
        }
    }
}

#[cfg(feature = "xml")]
impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}
