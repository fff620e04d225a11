use thiserror::Error;

/// Failure while reading an encoded payload. Decoding never panics on
/// malformed input; every truncated or inconsistent buffer ends up here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unexpected end of buffer at byte {index} (needed {needed} more)")]
    UnexpectedEof { index: usize, needed: usize },

    #[error("invalid UTF-8 in string at byte {index}")]
    InvalidUtf8 { index: usize },

    #[error("cannot seek to byte {index}, buffer holds {len}")]
    InvalidSeek { index: usize, len: usize },

    #[error("message length {length} goes past the end of the buffer ({remaining} bytes left)")]
    MessageLengthPastEnd { length: usize, remaining: usize },

    #[error("message body went past its declared length of {length} bytes (consumed {consumed})")]
    MessageBodyOverrun { length: usize, consumed: usize },

    #[error("unknown discriminator {discriminator} for union \"{union}\"")]
    UnknownDiscriminator { union: String, discriminator: u8 },

    #[error("type index {0} does not name a definition")]
    UnknownDefinition(usize),
}

/// Failure while writing a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("length {0} does not fit in a 32-bit prefix")]
    LengthOverflow(usize),

    #[error("definition \"{0}\" is not part of the schema")]
    UnknownDefinition(String),

    #[error("struct \"{definition}\" is missing required field \"{field}\"")]
    MissingField { definition: String, field: String },

    #[error("\"{definition}\" has no field named \"{field}\"")]
    UnknownField { definition: String, field: String },

    #[error("field \"{field}\" of \"{definition}\" has index {index}, which does not fit in a one-byte tag")]
    TagOverflow { definition: String, field: String, index: u32 },

    #[error("union \"{union}\" has no branch with discriminator {discriminator}")]
    UnknownBranch { union: String, discriminator: u8 },

    #[error("expected a value of type {expected} but found {found}")]
    TypeMismatch { expected: String, found: String },
}
