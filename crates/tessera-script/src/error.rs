//! Errors raised while parsing or running snippet source.

use thiserror::Error;

use crate::token::Span;

/// Failure surfaced by the lexer, parser or interpreter.
///
/// Runtime variants are wrapped in [`ScriptError::Located`] once they escape the
/// statement that raised them, so the caller sees the offending line.
#[derive(Debug, Clone, Error)]
pub enum ScriptError {
    #[error("syntax error at {span}: {message}")]
    Syntax { span: Span, message: String },
    #[error("name `{0}` is not defined")]
    UndefinedName(String),
    #[error("type error: {0}")]
    Type(String),
    #[error("value error: {0}")]
    Value(String),
    #[error("index error: {0}")]
    Index(String),
    #[error("key error: {0}")]
    Key(String),
    #[error("attribute error: {0}")]
    Attribute(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("maximum call depth of {0} exceeded")]
    Recursion(usize),
    #[error("capability unavailable: {0}")]
    Unavailable(String),
    #[error("figure error: {0}")]
    Figure(String),
    #[error("render error: {0}")]
    Render(String),
    #[error("line {line}: {error}")]
    Located { line: u32, error: Box<ScriptError> },
}

impl ScriptError {
    pub fn syntax(span: Span, message: impl Into<String>) -> Self {
        Self::Syntax {
            span,
            message: message.into(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type(message.into())
    }

    pub fn value(message: impl Into<String>) -> Self {
        Self::Value(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Attach a source line unless the error already carries a location.
    pub fn at_line(self, line: u32) -> Self {
        match self {
            Self::Syntax { .. } | Self::Located { .. } => self,
            other => Self::Located {
                line,
                error: Box::new(other),
            },
        }
    }

    /// The error without any location wrapper.
    pub fn root(&self) -> &ScriptError {
        match self {
            Self::Located { error, .. } => error.root(),
            other => other,
        }
    }
}

pub type ScriptResult<T> = Result<T, ScriptError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn located_errors_are_not_rewrapped() {
        let err = ScriptError::DivisionByZero.at_line(3).at_line(9);
        assert_eq!(err.to_string(), "line 3: division by zero");
        assert!(matches!(err.root(), ScriptError::DivisionByZero));
    }

    #[test]
    fn syntax_errors_keep_their_span() {
        let err = ScriptError::syntax(Span::new(2, 5), "unexpected `)`").at_line(7);
        assert_eq!(err.to_string(), "syntax error at 2:5: unexpected `)`");
    }
}
