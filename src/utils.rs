use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building a grammar or running a membership query
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    #[error("Symbol names must not be empty")]
    EmptySymbolName,

    #[error("Symbol names cannot contain white space: '{0}'")]
    WhitespaceInSymbol(String),

    #[error("Symbol '{0}' is declared more than once")]
    DuplicateSymbol(String),

    #[error("Symbols cannot contain each other, '{container}' contains '{contained}'")]
    SymbolContainment { container: String, contained: String },

    #[error("Start variable '{0}' is not a declared variable")]
    UnknownStartVariable(String),

    #[error("Null symbol '{0}' is not a declared terminal")]
    NullSymbolNotTerminal(String),

    #[error("Rule given for '{0}', which is not a declared variable")]
    RuleForUnknownVariable(String),

    #[error("Empty production for '{0}'; use the null symbol for the empty string")]
    EmptyProduction(String),

    #[error("Rule cannot combine the null symbol with other symbols: '{variable} -> {production}'")]
    MixedNullProduction { variable: String, production: String },

    #[error("Cannot tokenize '{input}' at byte {position}")]
    Tokenization { input: String, position: usize },

    #[error("Variable '{0}' has no productions")]
    UndefinedVariable(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Broad classification of a [`GrammarError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed grammar declaration, raised at construction
    Validation,
    /// Input not covered by the declared symbols
    Tokenization,
    /// A variable without productions was reached during a search
    UndefinedVariable,
    /// Arrow-notation input could not be understood
    Parse,
}

impl GrammarError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GrammarError::Tokenization { .. } => ErrorKind::Tokenization,
            GrammarError::UndefinedVariable(_) => ErrorKind::UndefinedVariable,
            GrammarError::Parse(_) => ErrorKind::Parse,
            _ => ErrorKind::Validation,
        }
    }

    /// True for every error that rejects a grammar declaration
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

/// Result type for grammar operations
pub type Result<T> = std::result::Result<T, GrammarError>;

/// Trait extension for Option<T> to convert to GrammarError
pub trait OptionExt<T> {
    fn ok_or_parse_err<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_parse_err<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.ok_or_else(|| GrammarError::Parse(f()))
    }
}
