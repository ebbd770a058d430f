use thiserror::Error;

/// Represents an error encountered while building a regex.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The pattern is malformed: bad syntax, an out of range backreference,
    /// inverted quantifier bounds, and so on.
    #[error("Invalid regular expression: {0}")]
    Syntax(String),

    /// The pattern is well formed but cannot be represented: too many
    /// capture groups or loops, too deeply nested, or a bytecode stream
    /// longer than the configured limit.
    #[error("Regular expression too large: {0}")]
    PatternTooLarge(String),
}

impl Error {
    /// A human-readable description, without the category prefix.
    pub fn text(&self) -> &str {
        match self {
            Error::Syntax(text) | Error::PatternTooLarge(text) => text,
        }
    }
}

pub(crate) fn syntax_error<S: ToString, T>(text: S) -> Result<T, Error> {
    Err(Error::Syntax(text.to_string()))
}

pub(crate) fn too_large<S: ToString, T>(text: S) -> Result<T, Error> {
    Err(Error::PatternTooLarge(text.to_string()))
}

/// A search which was abandoned before it could decide whether the input
/// matches. This is distinct from "no match".
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchError {
    #[error("Match aborted: backtracking budget of {limit} steps exceeded")]
    BudgetExceeded { limit: u64 },

    #[error("Match aborted: lookaround nesting exceeded depth {limit}")]
    DepthExceeded { limit: u32 },
}
