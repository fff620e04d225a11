use std::fmt;

use brine_bebop_schema::{DecodeError, EncodeError};
use serde::Serialize;
use thiserror::Error;

/// A position in schema source text, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    pub line:   usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Span {
        Span { line, column }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

fn format_hint(hint: &Option<String>) -> String {
    match hint {
        Some(h) => format!(" ({})", h),
        None => String::new(),
    }
}

#[derive(Debug, Error)]
pub enum BebopError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Syntax error at {span}: {msg}")]
    Syntax {
        msg:  String,
        span: Span,
    },

    #[error("Unexpected token at {span}: expected {expected} but found {found}{}", format_hint(.hint))]
    UnexpectedToken {
        expected: String,
        found:    String,
        hint:     Option<String>,
        span:     Span,
    },

    #[error("Reserved identifier {name} used at {span}")]
    ReservedIdentifier {
        name: String,
        span: Span,
    },

    #[error("Invalid map key type {key} at {span}: map keys must be scalar types")]
    InvalidMapKeyType {
        key:  String,
        span: Span,
    },

    #[error("Union branch {name} at {span} is not a struct or message")]
    InvalidUnionBranch {
        name: String,
        span: Span,
    },

    #[error("Unrecognized type {name} used in {definition} at {span}")]
    UnrecognizedType {
        name:       String,
        definition: String,
        span:       Span,
    },

    #[error("The type {name} is defined more than once (at {span})")]
    MultipleDefinitions {
        name: String,
        span: Span,
    },

    #[error("{name} at {span} is marked readonly, but only structs can be readonly")]
    InvalidReadOnlyUsage {
        name: String,
        span: Span,
    },

    #[error("{name} at {span} has an opcode attribute, but enums cannot have opcodes")]
    InvalidOpcodeUsage {
        name: String,
        span: Span,
    },

    #[error("Invalid opcode on {name} at {span}: {reason}")]
    InvalidOpcodeValue {
        name:   String,
        reason: String,
        span:   Span,
    },

    #[error("Opcode 0x{opcode:08x} on {name} at {span} is already in use")]
    DuplicateOpcode {
        name:   String,
        opcode: u32,
        span:   Span,
    },

    #[error("Field {field} of struct {definition} at {span} cannot be deprecated")]
    InvalidDeprecatedUsage {
        definition: String,
        field:      String,
        span:       Span,
    },

    #[error("Invalid field {field} in {definition} at {span}: {reason}")]
    InvalidField {
        definition: String,
        field:      String,
        reason:     String,
        span:       Span,
    },

    #[error("Generator error: {0}")]
    Generator(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BebopError {
    /// Source position of the offending construct, when the error has one.
    pub fn span(&self) -> Option<Span> {
        match *self {
            BebopError::Syntax { span, .. }
            | BebopError::UnexpectedToken { span, .. }
            | BebopError::ReservedIdentifier { span, .. }
            | BebopError::InvalidMapKeyType { span, .. }
            | BebopError::InvalidUnionBranch { span, .. }
            | BebopError::UnrecognizedType { span, .. }
            | BebopError::MultipleDefinitions { span, .. }
            | BebopError::InvalidReadOnlyUsage { span, .. }
            | BebopError::InvalidOpcodeUsage { span, .. }
            | BebopError::InvalidOpcodeValue { span, .. }
            | BebopError::DuplicateOpcode { span, .. }
            | BebopError::InvalidDeprecatedUsage { span, .. }
            | BebopError::InvalidField { span, .. } => Some(span),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_token_display() {
        let err = BebopError::UnexpectedToken {
            expected: "{".to_string(),
            found:    "c".to_string(),
            hint:     Some("Definitions are enclosed in braces.".to_string()),
            span:     Span::new(1, 10),
        };
        assert_eq!(
            err.to_string(),
            "Unexpected token at line 1, column 10: expected { but found c (Definitions are enclosed in braces.)"
        );

        let err = BebopError::UnexpectedToken {
            expected: ";".to_string(),
            found:    "}".to_string(),
            hint:     None,
            span:     Span::new(2, 3),
        };
        assert_eq!(err.to_string(), "Unexpected token at line 2, column 3: expected ; but found }");
        assert_eq!(err.span(), Some(Span::new(2, 3)));
    }
}
