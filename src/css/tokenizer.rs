//! logos-based CSS tokenizer.
//!
//! The rule extractor only needs the block structure of a stylesheet, so the
//! token set is coarse: punctuation that opens or closes a block, strings and
//! comments (so their contents never count as structure), at-keywords, and
//! [`Token::Word`] for every other run of characters. Escapes such as `\{`
//! or `\:` stay inside the word they belong to.
//!
//! Token priority in logos is determined by:
//! 1. Longest match wins (`/*` beats `/`, `@media` beats `@`)
//! 2. For equal length matches, the higher priority wins; [`Token::Delim`]
//!    has the lowest priority and only catches what nothing else matches

use logos::{Lexer, Logos};

/// Lexical failures. These end rule extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, thiserror::Error)]
pub enum LexError {
    #[default]
    #[error("unrecognized input")]
    Unrecognized,
    #[error("unterminated string")]
    UnterminatedString,
    #[error("unterminated comment")]
    UnterminatedComment,
}

/// A lexical failure with the byte offset where the bad token starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at offset {offset}")]
pub struct TokenError {
    pub offset: usize,
    pub kind: LexError,
}

/// CSS token produced by the lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(error = LexError)]
pub enum Token {
    // ── Trivia ───────────────────────────────────────────────────────

    /// Run of spaces, tabs, newlines, carriage returns or form feeds.
    #[regex(r"[ \t\n\r\f]+", priority = 3)]
    Whitespace,

    /// `/* ... */` block comment.
    #[token("/*", block_comment)]
    Comment,

    // ── Compound tokens ──────────────────────────────────────────────

    /// Single- or double-quoted string, including the quotes.
    #[token("\"", quoted_string)]
    #[token("'", quoted_string)]
    QuotedString,

    /// `@media`, `@supports`, `@font-face`, ...
    #[regex(r"@-?[a-zA-Z_][a-zA-Z0-9_-]*")]
    AtKeyword,

    /// Anything else that is not punctuation: identifiers, numbers,
    /// dimensions, hashes, escaped class names, `!important`.
    #[regex(r#"([^ \t\n\r\f{}()\[\];:,"'@/\\]|\\[^\n\r\f])+"#, priority = 3)]
    Word,

    // ── Single-character punctuation ─────────────────────────────────

    /// `{`
    #[token("{")]
    BraceOpen,

    /// `}`
    #[token("}")]
    BraceClose,

    /// `(`
    #[token("(")]
    ParenOpen,

    /// `)`
    #[token(")")]
    ParenClose,

    /// `[`
    #[token("[")]
    BracketOpen,

    /// `]`
    #[token("]")]
    BracketClose,

    /// `:`
    #[token(":")]
    Colon,

    /// `;`
    #[token(";")]
    Semicolon,

    /// `,`
    #[token(",")]
    Comma,

    /// Any other single character (`/`, a stray `@` or `\`).
    #[regex(r"[^\n]", priority = 1)]
    Delim,
}

impl Token {
    /// Whitespace and comments.
    pub fn is_trivia(self) -> bool {
        matches!(self, Token::Whitespace | Token::Comment)
    }
}

fn block_comment(lex: &mut Lexer<Token>) -> Result<(), LexError> {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            Ok(())
        }
        None => {
            lex.bump(lex.remainder().len());
            Err(LexError::UnterminatedComment)
        }
    }
}

fn quoted_string(lex: &mut Lexer<Token>) -> Result<(), LexError> {
    let quote = lex.slice().chars().next().unwrap_or('"');
    let rest = lex.remainder();
    let mut escaped = false;
    for (i, c) in rest.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '\n' | '\r' | '\x0c' => {
                lex.bump(i);
                return Err(LexError::UnterminatedString);
            }
            c if c == quote => {
                lex.bump(i + 1);
                return Ok(());
            }
            _ => {}
        }
    }
    lex.bump(rest.len());
    Err(LexError::UnterminatedString)
}

/// Tokenize a CSS string into `(Token, &str)` pairs, stopping at the first
/// lexical error.
pub fn tokenize(input: &str) -> Result<Vec<(Token, &str)>, TokenError> {
    Token::lexer(input)
        .spanned()
        .map(|(result, span)| match result {
            Ok(token) => Ok((token, &input[span])),
            Err(kind) => Err(TokenError {
                offset: span.start,
                kind,
            }),
        })
        .collect()
}
