//! The token definition for the query-string language.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// A classified piece of a query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// Length of the token text in characters.
    pub fn char_len(&self) -> usize {
        self.value.chars().count()
    }

    pub fn is_split(&self) -> bool {
        self.kind == TokenKind::Split
    }
}

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenKind {
    Key,            // status
    Method,         // : :* > < >= <=
    Value,          // active, "quoted value"
    Condition,      // AND, OR, AND NOT between clauses
    ValueCondition, // AND, OR inside a bracketed value list
    Bracket,        // ( ) [ ] { }
    Split,          // whitespace
}

impl TokenKind {
    /// Css class used by the renderer for spans of this kind.
    pub fn css_class(self) -> &'static str {
        match self {
            TokenKind::Key => "qs-key",
            TokenKind::Method => "qs-method",
            TokenKind::Value => "qs-value",
            TokenKind::Condition => "qs-condition",
            TokenKind::ValueCondition => "qs-value-condition",
            TokenKind::Bracket => "qs-bracket",
            TokenKind::Split => "qs-split",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let kind = match name.to_ascii_lowercase().as_str() {
            "key" => TokenKind::Key,
            "method" => TokenKind::Method,
            "value" => TokenKind::Value,
            "condition" => TokenKind::Condition,
            "valuecondition" | "value_condition" => TokenKind::ValueCondition,
            "bracket" => TokenKind::Bracket,
            "split" => TokenKind::Split,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Key => "key",
            TokenKind::Method => "method",
            TokenKind::Value => "value",
            TokenKind::Condition => "condition",
            TokenKind::ValueCondition => "valueCondition",
            TokenKind::Bracket => "bracket",
            TokenKind::Split => "split",
        };
        f.write_str(name)
    }
}

/// Represents a span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// The starting byte offset.
    pub start: usize,
    /// The ending byte offset.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Concatenates the token values back into a query string.
pub fn serialize(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.value.as_str()).collect()
}

/// Character range of every token inside the serialized query string.
pub fn token_ranges(tokens: &[Token]) -> Vec<Range<usize>> {
    let mut offset = 0;
    tokens
        .iter()
        .map(|token| {
            let start = offset;
            offset += token.char_len();
            start..offset
        })
        .collect()
}

pub fn is_opening_bracket(c: char) -> bool {
    matches!(c, '(' | '[' | '{')
}

pub fn is_closing_bracket(c: char) -> bool {
    matches!(c, ')' | ']' | '}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_ranges_count_chars() {
        let tokens = vec![
            Token::new(TokenKind::Key, "名字"),
            Token::new(TokenKind::Method, ":"),
            Token::new(TokenKind::Value, "值"),
        ];
        assert_eq!(token_ranges(&tokens), vec![0..2, 2..3, 3..4]);
        assert_eq!(serialize(&tokens), "名字:值");
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(TokenKind::parse("valueCondition"), Some(TokenKind::ValueCondition));
        assert_eq!(TokenKind::parse("KEY"), Some(TokenKind::Key));
        assert_eq!(TokenKind::parse("nope"), None);
        assert_eq!(TokenKind::ValueCondition.to_string(), "valueCondition");
    }
}
