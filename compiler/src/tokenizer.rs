use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{BebopError, Span};
use crate::utils::quote;

lazy_static! {
    pub static ref TOKEN_REGEX: Regex = Regex::new(
        r#"(/\*[\s\S]*?\*/|//[^\n]*|\s+|0[xX][0-9A-Fa-f]+|\d+|"(?:[^"\\\n]|\\.)*"|[A-Za-z_][A-Za-z0-9_]*|[{}\[\]();,=\->])"#
    ).unwrap();
    pub static ref WHITESPACE_RX: Regex = Regex::new(r"^(//[^\n]*|\s+)$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    Number,
    StringLiteral,
    BlockComment,
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    OpenParenthesis,
    CloseParenthesis,
    Semicolon,
    Comma,
    Eq,
    Hyphen,
    CloseCaret,
    Enum,
    Struct,
    Message,
    Union,
    ReadOnly,
    Map,
    Array,
    Opcode,
    Deprecated,
    EndOfFile,
}

impl TokenKind {
    pub fn keyword(text: &str) -> Option<TokenKind> {
        Some(match text {
            "enum" => TokenKind::Enum,
            "struct" => TokenKind::Struct,
            "message" => TokenKind::Message,
            "union" => TokenKind::Union,
            "readonly" => TokenKind::ReadOnly,
            "map" => TokenKind::Map,
            "array" => TokenKind::Array,
            "opcode" => TokenKind::Opcode,
            "deprecated" => TokenKind::Deprecated,
            _ => return None,
        })
    }

    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Enum
                | TokenKind::Struct
                | TokenKind::Message
                | TokenKind::Union
                | TokenKind::ReadOnly
                | TokenKind::Map
                | TokenKind::Array
                | TokenKind::Opcode
                | TokenKind::Deprecated
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            TokenKind::Identifier => "identifier",
            TokenKind::Number => "number",
            TokenKind::StringLiteral => "string literal",
            TokenKind::BlockComment => "block comment",
            TokenKind::OpenBrace => "\"{\"",
            TokenKind::CloseBrace => "\"}\"",
            TokenKind::OpenBracket => "\"[\"",
            TokenKind::CloseBracket => "\"]\"",
            TokenKind::OpenParenthesis => "\"(\"",
            TokenKind::CloseParenthesis => "\")\"",
            TokenKind::Semicolon => "\";\"",
            TokenKind::Comma => "\",\"",
            TokenKind::Eq => "\"=\"",
            TokenKind::Hyphen => "\"-\"",
            TokenKind::CloseCaret => "\">\"",
            TokenKind::Enum => "\"enum\"",
            TokenKind::Struct => "\"struct\"",
            TokenKind::Message => "\"message\"",
            TokenKind::Union => "\"union\"",
            TokenKind::ReadOnly => "\"readonly\"",
            TokenKind::Map => "\"map\"",
            TokenKind::Array => "\"array\"",
            TokenKind::Opcode => "\"opcode\"",
            TokenKind::Deprecated => "\"deprecated\"",
            TokenKind::EndOfFile => "end of file",
        };
        f.write_str(s)
    }
}

/// A lexeme with its kind and the position where it starts. Block comment
/// tokens carry the trimmed comment body; string literals keep their quotes.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

fn classify(part: &str) -> TokenKind {
    match part {
        "{" => TokenKind::OpenBrace,
        "}" => TokenKind::CloseBrace,
        "[" => TokenKind::OpenBracket,
        "]" => TokenKind::CloseBracket,
        "(" => TokenKind::OpenParenthesis,
        ")" => TokenKind::CloseParenthesis,
        ";" => TokenKind::Semicolon,
        "," => TokenKind::Comma,
        "=" => TokenKind::Eq,
        "-" => TokenKind::Hyphen,
        ">" => TokenKind::CloseCaret,
        _ if part.starts_with("/*") => TokenKind::BlockComment,
        _ if part.starts_with('"') => TokenKind::StringLiteral,
        _ if part.starts_with(|c: char| c.is_ascii_digit()) => TokenKind::Number,
        _ => TokenKind::keyword(part).unwrap_or(TokenKind::Identifier),
    }
}

/// Splits schema text into tokens, ending with an [TokenKind::EndOfFile]
/// token. Line comments and whitespace are dropped.
pub fn tokenize_schema(text: &str) -> Result<Vec<Token>, BebopError> {
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut column = 1;
    let mut last_end = 0;

    let unexpected = |rest: &str, line, column| {
        let msg = if rest.starts_with("/*") {
            "unterminated block comment".to_string()
        } else if rest.starts_with('"') {
            "unterminated string literal".to_string()
        } else {
            let snippet: String = rest.chars().take(16).collect();
            format!("unexpected text {}", quote(&snippet))
        };
        BebopError::Syntax { msg, span: Span::new(line, column) }
    };

    for mat in TOKEN_REGEX.find_iter(text) {
        let start = mat.start();
        let part = mat.as_str();

        if start > last_end {
            return Err(unexpected(&text[last_end..], line, column));
        }

        if !WHITESPACE_RX.is_match(part) {
            let kind = classify(part);
            let text = match kind {
                TokenKind::BlockComment => part[2..part.len() - 2].trim().to_string(),
                _ => part.to_string(),
            };
            tokens.push(Token { kind, text, span: Span::new(line, column) });
        }

        let newline_count = part.matches('\n').count();
        if newline_count > 0 {
            line += newline_count;
            if let Some(last_line_part) = part.split('\n').last() {
                column = last_line_part.chars().count() + 1;
            }
        } else {
            column += part.chars().count();
        }

        last_end = mat.end();
    }

    if last_end != text.len() {
        return Err(unexpected(&text[last_end..], line, column));
    }

    tokens.push(Token {
        kind: TokenKind::EndOfFile,
        text: String::new(),
        span: Span::new(line, column),
    });
    Ok(tokens)
}

/// Joins the token streams of several files into one, keeping only the final
/// end-of-file token so definitions may refer to each other across files.
pub fn concat_token_streams(streams: Vec<Vec<Token>>) -> Vec<Token> {
    let mut tokens: Vec<Token> = streams
        .into_iter()
        .flatten()
        .filter(|t| t.kind != TokenKind::EndOfFile)
        .collect();
    let span = tokens.last().map(|t| t.span).unwrap_or_default();
    tokens.push(Token { kind: TokenKind::EndOfFile, text: String::new(), span });
    tokens
}
