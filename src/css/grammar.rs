//! Grammar-level event stream over the token lexer.
//!
//! [`GrammarParser`] is an iterator of [`Grammar`] events: at-rule and
//! ruleset begin/end pairs, declarations and custom-property declarations.
//! It knows block structure and nothing about which at-rules matter; that
//! policy lives in [`crate::css::rules`].
//!
//! Whether a block item is a ruleset or a declaration is decided by looking
//! ahead for the first `{`, `;` or `}` outside parentheses and brackets, so
//! `a:hover { ... }` and `color: red;` are told apart without knowing what
//! kind of block they sit in. Blocks left open at end of input are closed.

use std::ops::Range;

use logos::Logos;

use crate::css::tokenizer::{Token, TokenError};

/// One grammar event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grammar {
    /// An at-rule without a block, e.g. `@import url(x.css);`.
    AtRule { name: String, prelude: String },
    /// `@name prelude {`
    BeginAtRule { name: String, prelude: String },
    /// The `}` closing an at-rule block.
    EndAtRule,
    /// `selector {`, with the selector text as written.
    BeginRuleset { selector: String },
    /// The `}` closing a ruleset.
    EndRuleset,
    /// `property: value`, property lowercased.
    Declaration { property: String, value: String },
    /// `--name: value`, value as written.
    CustomProperty { property: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    AtRule,
    Ruleset,
}

impl Block {
    fn end_event(self) -> Grammar {
        match self {
            Block::AtRule => Grammar::EndAtRule,
            Block::Ruleset => Grammar::EndRuleset,
        }
    }
}

/// What stopped a lookahead scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    BraceOpen,
    Semicolon,
    BraceClose,
    Eof,
}

/// Iterator of [`Grammar`] events over a CSS source.
pub struct GrammarParser<'a> {
    source: &'a str,
    tokens: Vec<(Token, Range<usize>)>,
    /// The lexical error that cut `tokens` short, reported once they run out.
    lex_error: Option<TokenError>,
    cursor: usize,
    stack: Vec<Block>,
    /// Treat the top level as a declaration list (`style="..."` content).
    inline: bool,
}

impl<'a> GrammarParser<'a> {
    pub fn new(source: &'a str, inline: bool) -> Self {
        let mut tokens = Vec::new();
        let mut lex_error = None;
        for (result, span) in Token::lexer(source).spanned() {
            match result {
                Ok(token) => tokens.push((token, span)),
                Err(kind) => {
                    lex_error = Some(TokenError {
                        offset: span.start,
                        kind,
                    });
                    break;
                }
            }
        }
        Self {
            source,
            tokens,
            lex_error,
            cursor: 0,
            stack: Vec::new(),
            inline,
        }
    }

    fn in_declarations(&self) -> bool {
        match self.stack.last() {
            Some(Block::Ruleset) => true,
            Some(Block::AtRule) => false,
            None => self.inline,
        }
    }

    fn text(&self, span: Range<usize>) -> &'a str {
        &self.source[span]
    }

    /// Scan forward from `from` to the first `{`, `;` or `}` outside
    /// parentheses and brackets.
    fn find_terminator(&self, from: usize) -> (usize, Terminator) {
        let mut depth = 0usize;
        for (i, (token, _)) in self.tokens.iter().enumerate().skip(from) {
            match token {
                Token::ParenOpen | Token::BracketOpen => depth += 1,
                Token::ParenClose | Token::BracketClose => depth = depth.saturating_sub(1),
                Token::BraceOpen if depth == 0 => return (i, Terminator::BraceOpen),
                Token::Semicolon if depth == 0 => return (i, Terminator::Semicolon),
                Token::BraceClose if depth == 0 => return (i, Terminator::BraceClose),
                _ => {}
            }
        }
        (self.tokens.len(), Terminator::Eof)
    }

    /// Skip a `{ ... }` block whose opening brace sits at `open`.
    fn skip_block(&mut self, open: usize) {
        let mut depth = 0usize;
        for (i, (token, _)) in self.tokens.iter().enumerate().skip(open) {
            match token {
                Token::BraceOpen => depth += 1,
                Token::BraceClose => {
                    depth -= 1;
                    if depth == 0 {
                        self.cursor = i + 1;
                        return;
                    }
                }
                _ => {}
            }
        }
        self.cursor = self.tokens.len();
    }

    /// Raw source text covered by `tokens[range]`, trimmed.
    fn raw(&self, range: Range<usize>) -> &'a str {
        let tokens = &self.tokens[range];
        match (tokens.first(), tokens.last()) {
            (Some((_, first)), Some((_, last))) => self.text(first.start..last.end).trim(),
            _ => "",
        }
    }

    /// The tokens of `range` joined with insignificant whitespace removed.
    fn normalized(&self, range: Range<usize>) -> String {
        join_normalized(
            self.tokens[range]
                .iter()
                .map(|(token, span)| (*token, self.text(span.clone()))),
        )
    }

    fn at_rule(&mut self) -> Grammar {
        let (_, span) = &self.tokens[self.cursor];
        let name = self.text(span.clone())[1..].to_ascii_lowercase();
        let prelude_start = self.cursor + 1;
        let (end, terminator) = self.find_terminator(prelude_start);
        let prelude = self.normalized(prelude_start..end);
        match terminator {
            Terminator::BraceOpen => {
                self.cursor = end + 1;
                self.stack.push(Block::AtRule);
                Grammar::BeginAtRule { name, prelude }
            }
            Terminator::Semicolon => {
                self.cursor = end + 1;
                Grammar::AtRule { name, prelude }
            }
            Terminator::BraceClose | Terminator::Eof => {
                self.cursor = end;
                Grammar::AtRule { name, prelude }
            }
        }
    }

    /// Parse `tokens[range]` as `property: value`.
    fn declaration(&self, range: Range<usize>) -> Option<Grammar> {
        let mut items = range
            .clone()
            .filter(|&i| !self.tokens[i].0.is_trivia());
        let name_at = items.next()?;
        let colon_at = items.next()?;
        let (name_token, name_span) = &self.tokens[name_at];
        if *name_token != Token::Word || self.tokens[colon_at].0 != Token::Colon {
            return None;
        }
        let property = self.text(name_span.clone());
        let value = colon_at + 1..range.end;
        if property.starts_with("--") {
            return Some(Grammar::CustomProperty {
                property: property.to_string(),
                value: self.raw(value).to_string(),
            });
        }
        Some(Grammar::Declaration {
            property: property.to_ascii_lowercase(),
            value: self.normalized(value),
        })
    }
}

impl Iterator for GrammarParser<'_> {
    type Item = Result<Grammar, TokenError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some(token) = self.tokens.get(self.cursor).map(|(token, _)| *token) else {
                if let Some(err) = self.lex_error.take() {
                    self.stack.clear();
                    return Some(Err(err));
                }
                return self.stack.pop().map(|block| Ok(block.end_event()));
            };

            match token {
                Token::Whitespace | Token::Comment | Token::Semicolon => {
                    self.cursor += 1;
                }
                Token::BraceClose => {
                    self.cursor += 1;
                    match self.stack.pop() {
                        Some(block) => return Some(Ok(block.end_event())),
                        None => log::debug!("ignoring unmatched '}}'"),
                    }
                }
                Token::AtKeyword => return Some(Ok(self.at_rule())),
                _ => {
                    let start = self.cursor;
                    let (end, terminator) = self.find_terminator(start);
                    if terminator == Terminator::Eof && self.lex_error.is_some() {
                        // Cut short by a lexical error; never emit half an item.
                        self.cursor = end;
                        continue;
                    }
                    if terminator == Terminator::BraceOpen {
                        if self.in_declarations() {
                            log::debug!("skipping nested block {:?}", self.raw(start..end));
                            self.skip_block(end);
                            continue;
                        }
                        self.cursor = end + 1;
                        self.stack.push(Block::Ruleset);
                        return Some(Ok(Grammar::BeginRuleset {
                            selector: self.raw(start..end).to_string(),
                        }));
                    }

                    self.cursor = if terminator == Terminator::Semicolon { end + 1 } else { end };
                    if !self.in_declarations() {
                        log::debug!("skipping stray text {:?}", self.raw(start..end));
                        continue;
                    }
                    match self.declaration(start..end) {
                        Some(decl) => return Some(Ok(decl)),
                        None => log::debug!("skipping malformed declaration {:?}", self.raw(start..end)),
                    }
                }
            }
        }
    }
}

/// Join token texts, dropping whitespace and comments at the ends and next to
/// `,` `(` `)` `:`, and collapsing the rest to a single space.
pub fn join_normalized<'t>(tokens: impl IntoIterator<Item = (Token, &'t str)>) -> String {
    let mut out = String::new();
    let mut pending_space = false;
    let mut prev: Option<Token> = None;
    for (token, text) in tokens {
        if token.is_trivia() {
            pending_space = true;
            continue;
        }
        let glued = matches!(prev, None | Some(Token::Comma | Token::ParenOpen | Token::Colon))
            || matches!(token, Token::Comma | Token::ParenClose | Token::Colon);
        if pending_space && !glued {
            out.push(' ');
        }
        pending_space = false;
        out.push_str(text);
        prev = Some(token);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::tokenizer::LexError;
    use pretty_assertions::assert_eq;

    // ── Helper ───────────────────────────────────────────────────────

    fn events(input: &str) -> Vec<Grammar> {
        GrammarParser::new(input, false)
            .collect::<Result<_, _>>()
            .unwrap_or_else(|e| panic!("grammar failed: {e}"))
    }

    fn begin_ruleset(selector: &str) -> Grammar {
        Grammar::BeginRuleset {
            selector: selector.into(),
        }
    }

    fn decl(property: &str, value: &str) -> Grammar {
        Grammar::Declaration {
            property: property.into(),
            value: value.into(),
        }
    }

    // ── Rulesets ─────────────────────────────────────────────────────

    #[test]
    fn simple_ruleset() {
        assert_eq!(
            events(".p-1 { padding: 0.25rem; }"),
            vec![begin_ruleset(".p-1"), decl("padding", "0.25rem"), Grammar::EndRuleset]
        );
    }

    #[test]
    fn last_declaration_without_semicolon() {
        assert_eq!(
            events("a{color:red;COLOR : blue}"),
            vec![
                begin_ruleset("a"),
                decl("color", "red"),
                decl("color", "blue"),
                Grammar::EndRuleset,
            ]
        );
    }

    #[test]
    fn selector_text_is_raw() {
        assert_eq!(
            events(".group:hover   .group-hover\\:p-2{}"),
            vec![begin_ruleset(".group:hover   .group-hover\\:p-2"), Grammar::EndRuleset]
        );
    }

    #[test]
    fn values_are_normalized() {
        assert_eq!(
            events("a { grid-template-columns: repeat(2, minmax(0, 1fr)); }"),
            vec![
                begin_ruleset("a"),
                decl("grid-template-columns", "repeat(2,minmax(0,1fr))"),
                Grammar::EndRuleset,
            ]
        );
    }

    #[test]
    fn custom_property_keeps_raw_value() {
        assert_eq!(
            events(".ring { --tw-ring-shadow: calc(3px + var(--w)) , x; }"),
            vec![
                begin_ruleset(".ring"),
                Grammar::CustomProperty {
                    property: "--tw-ring-shadow".into(),
                    value: "calc(3px + var(--w)) , x".into(),
                },
                Grammar::EndRuleset,
            ]
        );
    }

    #[test]
    fn semicolon_inside_parens_does_not_end_declaration() {
        assert_eq!(
            events("a{background:url(data:image/png;base64,AA)}"),
            vec![
                begin_ruleset("a"),
                decl("background", "url(data:image/png;base64,AA)"),
                Grammar::EndRuleset,
            ]
        );
    }

    #[test]
    fn malformed_declaration_is_skipped() {
        assert_eq!(
            events("a{ oops; color: red }"),
            vec![begin_ruleset("a"), decl("color", "red"), Grammar::EndRuleset]
        );
    }

    #[test]
    fn nested_block_in_ruleset_is_skipped() {
        assert_eq!(
            events("a{ &:hover { color: blue } color: red }"),
            vec![begin_ruleset("a"), decl("color", "red"), Grammar::EndRuleset]
        );
    }

    // ── At-rules ─────────────────────────────────────────────────────

    #[test]
    fn media_block() {
        assert_eq!(
            events("@media (min-width: 640px) { .a { x: y } }"),
            vec![
                Grammar::BeginAtRule {
                    name: "media".into(),
                    prelude: "(min-width:640px)".into(),
                },
                begin_ruleset(".a"),
                decl("x", "y"),
                Grammar::EndRuleset,
                Grammar::EndAtRule,
            ]
        );
    }

    #[test]
    fn at_rule_statement() {
        assert_eq!(
            events("@import url(a.css) screen;"),
            vec![Grammar::AtRule {
                name: "import".into(),
                prelude: "url(a.css) screen".into(),
            }]
        );
    }

    #[test]
    fn unclosed_blocks_are_closed_at_eof() {
        assert_eq!(
            events("@media print { a { color: red"),
            vec![
                Grammar::BeginAtRule {
                    name: "media".into(),
                    prelude: "print".into(),
                },
                begin_ruleset("a"),
                decl("color", "red"),
                Grammar::EndRuleset,
                Grammar::EndAtRule,
            ]
        );
    }

    #[test]
    fn stray_close_brace_is_ignored() {
        assert_eq!(events("} a{}"), vec![begin_ruleset("a"), Grammar::EndRuleset]);
    }

    // ── Inline mode ──────────────────────────────────────────────────

    #[test]
    fn inline_declarations() {
        let got: Vec<Grammar> = GrammarParser::new("color: red; margin: 0 auto", true)
            .collect::<Result<_, _>>()
            .unwrap_or_else(|e| panic!("grammar failed: {e}"));
        assert_eq!(got, vec![decl("color", "red"), decl("margin", "0 auto")]);
    }

    // ── Errors ───────────────────────────────────────────────────────

    #[test]
    fn lex_error_ends_stream_after_earlier_events() {
        let mut parser = GrammarParser::new("a{color:red} b{content:'x\n}", false);
        assert_eq!(parser.next(), Some(Ok(begin_ruleset("a"))));
        assert_eq!(parser.next(), Some(Ok(decl("color", "red"))));
        assert_eq!(parser.next(), Some(Ok(Grammar::EndRuleset)));
        assert_eq!(parser.next(), Some(Ok(begin_ruleset("b"))));
        assert_eq!(
            parser.next(),
            Some(Err(TokenError {
                offset: 23,
                kind: LexError::UnterminatedString,
            }))
        );
        assert_eq!(parser.next(), None);
    }

    // ── join_normalized ──────────────────────────────────────────────

    #[test]
    fn join_keeps_meaningful_spaces() {
        let tokens = crate::css::tokenizer::tokenize("  var(--a) 0 0 #000 , calc(1px + 2px)  ")
            .unwrap_or_else(|e| panic!("tokenize failed: {e}"));
        assert_eq!(join_normalized(tokens), "var(--a) 0 0 #000,calc(1px + 2px)");
    }
}
