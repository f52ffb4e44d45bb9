//! Error types for configuration normalization and SCSS generation.
//!
//! Linting never produces an error: structural problems are reported as
//! `HtmlLintIssue`s. Only malformed configuration and ambiguous generation
//! entry points surface here.

/// Malformed configuration, qualified by the offending field path
/// (e.g. `selectorPolicy.variant.dataKeys[1]`).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ConfigError {
    pub field: String,
    pub message: String,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Generation needs exactly one deterministic entry point.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    #[error("no root element with a class attribute was found")]
    NoRoot,

    #[error("expected a single root element, found {0}")]
    MultipleRoots(usize),

    #[error("root element <{0}> has no class attribute")]
    MissingRootClass(String),

    #[error("root element class \"{0}\" is not a usable base class")]
    UnusableRootClass(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
