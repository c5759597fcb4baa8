use arbor_core::Range;
use serde::{Deserialize, Serialize};

/// Coarse classification of a terminal, e.g. for syntax highlighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenCategory {
    Comment,
    Keyword,
    NumericLiteral,
    StringLiteral,
    PlainText,
}

/// A terminal produced by the first-stage tokenizer, with its line/column
/// span in the original source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub category: TokenCategory,
    pub text: String,
    pub range: Range,
}

impl Token {
    pub fn new(category: TokenCategory, text: impl Into<String>, range: Range) -> Token {
        Token {
            category,
            text: text.into(),
            range,
        }
    }
}
