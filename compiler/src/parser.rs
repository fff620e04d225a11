use std::collections::HashMap;

use tracing::{debug, trace};

use crate::{
    error::{BebopError, Span},
    tokenizer::{Token, TokenKind},
    types::{
        BaseType, Definition, DefinitionKind, Field, OpcodeAttribute, Schema, SchemaOptions,
        TypeExpr, UnionBranch,
    },
    utils::{parse_number, quote, unquote},
};

const MESSAGE_INDEX_HINT: &str =
    "Fields in a message must be of the form: index -> type name;";
const UNION_BRANCH_HINT: &str =
    "Branches in a union must be of the form: discriminator -> struct Name { ... }";
const MAP_HINT: &str = "Map types must be of the form: map[KeyType, ValueType]";
const ARRAY_HINT: &str = "Array types must be of the form: array[ElementType] or ElementType[]";

/// An `[name(value)]` attribute as it appeared in the source.
struct Attribute {
    value:     String,
    is_number: bool,
    span:      Span,
}

/// Recursive-descent parser over a fully materialized token stream.
///
/// A parser can be reused: [SchemaParser::evaluate] resets all state before
/// it starts.
pub struct SchemaParser {
    options:                  SchemaOptions,
    tokens:                   Vec<Token>,
    index:                    usize,
    definitions:              Vec<Definition>,
    definition_name_to_index: HashMap<String, usize>,
    /// (referenced type token, enclosing definition token), checked after
    /// the whole stream is parsed.
    type_references:          Vec<(Token, Token)>,
}

impl SchemaParser {
    pub fn new(options: SchemaOptions) -> SchemaParser {
        SchemaParser {
            options,
            tokens: Vec::new(),
            index: 0,
            definitions: Vec::new(),
            definition_name_to_index: HashMap::new(),
            type_references: Vec::new(),
        }
    }

    pub fn evaluate<I>(&mut self, tokens: I) -> Result<Schema, BebopError>
    where
        I: IntoIterator<Item = Token>,
    {
        self.tokens = tokens.into_iter().collect();
        self.index = 0;
        self.definitions.clear();
        self.definition_name_to_index.clear();
        self.type_references.clear();

        if self.tokens.last().map(|t| t.kind) != Some(TokenKind::EndOfFile) {
            let span = self.tokens.last().map(|t| t.span).unwrap_or_default();
            self.tokens.push(Token { kind: TokenKind::EndOfFile, text: String::new(), span });
        }
        debug!(tokens = self.tokens.len(), "parsing schema");

        loop {
            let documentation = self.consume_block_comments();
            if self.eat(TokenKind::EndOfFile) {
                break;
            }
            self.parse_definition(documentation)?;
        }

        for (type_token, definition_token) in &self.type_references {
            if !self.definition_name_to_index.contains_key(&type_token.text) {
                return Err(BebopError::UnrecognizedType {
                    name:       type_token.text.clone(),
                    definition: definition_token.text.clone(),
                    span:       type_token.span,
                });
            }
        }

        debug!(definitions = self.definitions.len(), "parsed schema");
        self.definition_name_to_index.clear();
        Ok(Schema::new(
            self.options.clone(),
            std::mem::take(&mut self.definitions),
        ))
    }

    fn current(&self) -> &Token {
        // `evaluate` guarantees a trailing end-of-file token, and nothing
        // advances past it.
        &self.tokens[self.index.min(self.tokens.len() - 1)]
    }

    fn checkpoint(&self) -> usize {
        self.index
    }

    fn restore(&mut self, checkpoint: usize) {
        self.index = checkpoint;
    }

    /// Consumes the next token if it has `kind`. Block comments in front of
    /// it are skipped either way.
    fn eat(&mut self, kind: TokenKind) -> bool {
        self.consume_block_comments();
        if self.current().kind == kind {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, hint: Option<&str>) -> Result<Token, BebopError> {
        self.consume_block_comments();
        let token = self.current().clone();
        if self.eat(kind) {
            return Ok(token);
        }
        Err(self.unexpected(&kind.to_string(), hint))
    }

    fn unexpected(&self, expected: &str, hint: Option<&str>) -> BebopError {
        let token = self.current();
        let found = match token.kind {
            TokenKind::EndOfFile => "end of file".to_string(),
            _ => quote(&token.text),
        };
        BebopError::UnexpectedToken {
            expected: expected.to_string(),
            found,
            hint: hint.map(str::to_string),
            span: token.span,
        }
    }

    /// Skips any run of block comments and returns the last one.
    fn consume_block_comments(&mut self) -> Option<String> {
        let mut documentation = None;
        while self.current().kind == TokenKind::BlockComment {
            documentation = Some(self.current().text.clone());
            self.index += 1;
        }
        documentation
    }

    /// Reads an unsigned literal, failing with `hint` when it is missing or
    /// larger than `max`.
    fn expect_unsigned(&mut self, max: u64, hint: &str) -> Result<u64, BebopError> {
        self.consume_block_comments();
        let token = self.current().clone();
        match parse_number(&token.text) {
            Some(n) if token.kind == TokenKind::Number && n <= max => {
                self.index += 1;
                Ok(n)
            }
            _ => Err(self.unexpected(&TokenKind::Number.to_string(), Some(hint))),
        }
    }

    fn expect_arrow(&mut self, hint: &str) -> Result<(), BebopError> {
        self.expect(TokenKind::Hyphen, Some(hint))?;
        self.expect(TokenKind::CloseCaret, Some(hint))?;
        Ok(())
    }

    fn expect_name(&mut self, hint: Option<&str>) -> Result<Token, BebopError> {
        self.consume_block_comments();
        let token = self.current().clone();
        if token.kind.is_keyword() {
            return Err(BebopError::ReservedIdentifier { name: token.text, span: token.span });
        }
        self.expect(TokenKind::Identifier, hint)
    }

    /// `[kind]` or `[kind(value)]`. Restores the cursor and returns `None`
    /// when the next tokens are not this attribute.
    fn eat_attribute(&mut self, kind: TokenKind) -> Result<Option<Attribute>, BebopError> {
        let checkpoint = self.checkpoint();
        let span = self.current().span;
        if !self.eat(TokenKind::OpenBracket) {
            return Ok(None);
        }
        if !self.eat(kind) {
            self.restore(checkpoint);
            return Ok(None);
        }

        let mut attribute = Attribute { value: String::new(), is_number: false, span };
        if self.eat(TokenKind::OpenParenthesis) {
            self.consume_block_comments();
            let token = self.current().clone();
            if self.eat(TokenKind::StringLiteral) {
                attribute.value = unquote(&token.text);
            } else if kind == TokenKind::Opcode && self.eat(TokenKind::Number) {
                attribute.value = token.text;
                attribute.is_number = true;
            } else {
                let expected = match kind {
                    TokenKind::Opcode => "string literal or number",
                    _ => "string literal",
                };
                return Err(self.unexpected(expected, None));
            }
            self.expect(TokenKind::CloseParenthesis, None)?;
        }
        self.expect(TokenKind::CloseBracket, None)?;
        Ok(Some(attribute))
    }

    fn register(&mut self, definition: Definition) -> Result<(), BebopError> {
        if self.definition_name_to_index.contains_key(&definition.name) {
            return Err(BebopError::MultipleDefinitions {
                name: definition.name,
                span: definition.span,
            });
        }
        trace!(name = %definition.name, kind = %definition.kind, "parsed definition");
        self.definition_name_to_index
            .insert(definition.name.clone(), self.definitions.len());
        self.definitions.push(definition);
        Ok(())
    }

    /// `documentation` is whatever preceded the definition; a comment closer
    /// to the keyword replaces it.
    fn parse_definition(&mut self, documentation: Option<String>) -> Result<Definition, BebopError> {
        let mut documentation = self.consume_block_comments().or(documentation);
        let opcode = self.eat_attribute(TokenKind::Opcode)?.map(|a| OpcodeAttribute {
            value:     a.value,
            is_number: a.is_number,
            span:      a.span,
        });
        if let Some(doc) = self.consume_block_comments() {
            documentation = Some(doc);
        }
        let read_only = self.eat(TokenKind::ReadOnly);

        let kind = if self.eat(TokenKind::Enum) {
            DefinitionKind::Enum
        } else if self.eat(TokenKind::Struct) {
            DefinitionKind::Struct
        } else if self.eat(TokenKind::Message) {
            DefinitionKind::Message
        } else if self.eat(TokenKind::Union) {
            DefinitionKind::Union
        } else {
            return Err(self.unexpected("\"enum\", \"struct\", \"message\" or \"union\"", None));
        };

        let hint = format!("Did you forget to specify a name for this {}?", kind);
        let name_token = self.expect_name(Some(&hint))?;
        self.expect(TokenKind::OpenBrace, None)?;

        let mut definition = Definition {
            name: name_token.text.clone(),
            kind,
            fields: Vec::new(),
            branches: Vec::new(),
            documentation,
            opcode,
            read_only,
            span: name_token.span,
        };

        if kind == DefinitionKind::Union {
            definition.branches = self.parse_union_branches()?;
        } else {
            definition.fields = self.parse_fields(kind, &name_token)?;
        }

        self.register(definition.clone())?;
        Ok(definition)
    }

    fn parse_fields(&mut self, kind: DefinitionKind, definition_token: &Token) -> Result<Vec<Field>, BebopError> {
        let mut fields = Vec::new();
        loop {
            let mut documentation = self.consume_block_comments();
            if self.eat(TokenKind::CloseBrace) {
                break;
            }
            let deprecated = self.eat_attribute(TokenKind::Deprecated)?.map(|a| a.value);
            if let Some(doc) = self.consume_block_comments() {
                documentation = Some(doc);
            }

            let mut constant = 0i64;
            if kind == DefinitionKind::Message {
                constant = self.expect_unsigned(u32::MAX as u64, MESSAGE_INDEX_HINT)? as i64;
                self.expect_arrow(MESSAGE_INDEX_HINT)?;
            }

            let type_ = match kind {
                DefinitionKind::Enum => TypeExpr::Scalar(BaseType::UInt32),
                _ => self.parse_type(definition_token)?,
            };

            let name_token = self.expect_name(None)?;

            if kind == DefinitionKind::Enum {
                self.expect(
                    TokenKind::Eq,
                    Some("Every constant in an enum must have an explicit literal value."),
                )?;
                let negative = self.eat(TokenKind::Hyphen);
                let value = self.expect_unsigned(
                    u32::MAX as u64,
                    "An enum constant must be an integer literal that fits in 32 bits.",
                )? as i64;
                constant = if negative { -value } else { value };
            }

            let hint = format!("Elements in a {} are delimited using semicolons.", kind);
            self.expect(TokenKind::Semicolon, Some(&hint))?;

            fields.push(Field {
                name: name_token.text,
                type_,
                constant,
                deprecated,
                documentation,
                span: name_token.span,
            });
        }
        Ok(fields)
    }

    fn parse_union_branches(&mut self) -> Result<Vec<UnionBranch>, BebopError> {
        let mut branches = Vec::new();
        loop {
            let documentation = self.consume_block_comments();
            if self.eat(TokenKind::CloseBrace) {
                break;
            }

            let discriminator = self.expect_unsigned(u8::MAX as u64, UNION_BRANCH_HINT)? as u8;
            self.expect_arrow(UNION_BRANCH_HINT)?;

            let definition = self.parse_definition(documentation.clone())?;
            if !matches!(definition.kind, DefinitionKind::Struct | DefinitionKind::Message) {
                return Err(BebopError::InvalidUnionBranch {
                    name: definition.name,
                    span: definition.span,
                });
            }
            self.eat(TokenKind::Semicolon);

            branches.push(UnionBranch { discriminator, definition, documentation });
        }
        Ok(branches)
    }

    fn parse_type(&mut self, definition_token: &Token) -> Result<TypeExpr, BebopError> {
        self.consume_block_comments();
        let start = self.current().clone();

        let mut type_ = if self.eat(TokenKind::Map) {
            self.expect(TokenKind::OpenBracket, Some(MAP_HINT))?;
            let key = self.parse_type(definition_token)?;
            if !key.is_scalar() {
                return Err(BebopError::InvalidMapKeyType { key: key.to_string(), span: start.span });
            }
            self.expect(TokenKind::Comma, Some(MAP_HINT))?;
            let value = self.parse_type(definition_token)?;
            self.expect(TokenKind::CloseBracket, Some(MAP_HINT))?;
            TypeExpr::Map(Box::new(key), Box::new(value))
        } else if self.eat(TokenKind::Array) {
            self.expect(TokenKind::OpenBracket, Some(ARRAY_HINT))?;
            let element = self.parse_type(definition_token)?;
            self.expect(TokenKind::CloseBracket, Some(ARRAY_HINT))?;
            TypeExpr::Array(Box::new(element))
        } else {
            let token = self.expect(TokenKind::Identifier, None)?;
            match BaseType::from_name(&token.text) {
                Some(base) => TypeExpr::Scalar(base),
                None => {
                    self.type_references.push((token.clone(), definition_token.clone()));
                    TypeExpr::Defined(token.text)
                }
            }
        };

        loop {
            let checkpoint = self.checkpoint();
            if !self.eat(TokenKind::OpenBracket) {
                break;
            }
            if !self.eat(TokenKind::CloseBracket) {
                self.restore(checkpoint);
                break;
            }
            type_ = TypeExpr::Array(Box::new(type_));
        }

        Ok(type_)
    }
}

/// Parses a complete token stream with default options.
pub fn parse_schema<I>(tokens: I) -> Result<Schema, BebopError>
where
    I: IntoIterator<Item = Token>,
{
    SchemaParser::new(SchemaOptions::default()).evaluate(tokens)
}
