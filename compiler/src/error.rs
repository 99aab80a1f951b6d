use std::fmt;

use thiserror::Error;

use crate::token::Token;

/// Source position attached to parse and validation errors. Offsets are
/// byte offsets into the originating file, suitable for rendering a
/// caret-pointed excerpt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub filename: Option<String>,
    pub start:    usize,
    pub end:      usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filename = self.filename.as_deref().unwrap_or("<input>");
        write!(f, "{}:{}..{}", filename, self.start, self.end)
    }
}

impl From<&Token> for Location {
    fn from(token: &Token) -> Self {
        Location {
            filename: token.filename.clone(),
            start:    token.start,
            end:      token.end,
        }
    }
}

#[derive(Debug, Error)]
pub enum VelaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid search pattern: {0}")]
    Pattern(String),

    #[error("parse error at {location}: {message}")]
    Parse { location: Location, message: String },

    #[error("validation error at {location}: {message}")]
    Validate { location: Location, message: String },
}

impl VelaError {
    pub fn parse(token: &Token, message: impl Into<String>) -> Self {
        VelaError::Parse {
            location: token.into(),
            message:  message.into(),
        }
    }

    pub fn validate(token: &Token, message: impl Into<String>) -> Self {
        VelaError::Validate {
            location: token.into(),
            message:  message.into(),
        }
    }
}
