use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cannot resolve token {token} in template {template}")]
    UnresolvedToken {
        template: String,
        token:    String,
    },

    #[error("Unterminated string literal at offset {offset} in template {template}")]
    UnterminatedString {
        template: String,
        offset:   usize,
    },

    #[error("Unbalanced parentheses at offset {offset} in template {template}")]
    UnbalancedParens {
        template: String,
        offset:   usize,
    },

    #[error("Parse error at column {column}: {msg}")]
    ParseError {
        msg:    String,
        column: usize,
    },

    #[error("Signature {signature}: {msg}")]
    Signature {
        signature: String,
        msg:       String,
    },

    #[error("Argument {argument} of {function} is never referenced by an input capture")]
    Unreferenced {
        function: String,
        argument: String,
    },

    #[error("Wrapped function {0} does not wrap anything")]
    NothingWrapped(String),

    #[error("Generic function {0} cannot be used as a value")]
    GenericValue(String),

    #[error("{kind} expects {expected} record(s), got {got}")]
    Arity {
        kind:     String,
        expected: usize,
        got:      usize,
    },

    #[error("Verifier error: {0}")]
    VerifierError(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source:  Box<ConvertError>,
    },
}

impl ConvertError {
    /// Wraps `self` with one more layer of context.
    pub fn context(self, context: impl Into<String>) -> Self {
        ConvertError::Context {
            context: context.into(),
            source:  Box::new(self),
        }
    }

    /// The innermost error of a context chain.
    pub fn root(&self) -> &ConvertError {
        match self {
            ConvertError::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Adds `.context(..)` to results carrying a `ConvertError`.
pub trait ResultExt<T> {
    fn context<C: Into<String>>(self, context: impl FnOnce() -> C) -> Result<T, ConvertError>;
}

impl<T> ResultExt<T> for Result<T, ConvertError> {
    fn context<C: Into<String>>(self, context: impl FnOnce() -> C) -> Result<T, ConvertError> {
        self.map_err(|e| e.context(context()))
    }
}
