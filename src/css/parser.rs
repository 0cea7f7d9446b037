//! Recursive descent selector parser.
//!
//! Parses selector text into the AST from [`crate::css::model`]. The parser
//! works directly on the source string with a byte cursor, since selector
//! escapes (`.sm\:p-2`, `.\32 xl`) and quoted strings need character-level
//! handling that a token stream would lose.
//!
//! Two modes exist: the plain entry points reject pseudo-elements, the
//! `*_with_pseudo_element` variants accept a single trailing `::name` per
//! selector (or the legacy single-colon spelling for
//! [`LEGACY_PSEUDO_ELEMENTS`]).

use crate::css::model::*;

/// Errors from selector parsing.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("expected {expected}, found EOF instead")]
    UnexpectedEof { expected: &'static str },
    #[error("expected {expected} at offset {offset}, found {found:?} instead")]
    UnexpectedChar {
        offset: usize,
        found: char,
        expected: &'static str,
    },
    #[error("unknown pseudo-class or pseudo-element :{name} at offset {offset}")]
    UnknownPseudoClass { offset: usize, name: String },
    #[error("invalid an+b expression at offset {offset}: {message}")]
    InvalidNth { offset: usize, message: &'static str },
    #[error("unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },
    #[error("invalid escape sequence at offset {offset}")]
    InvalidEscape { offset: usize },
    #[error("invalid regular expression at offset {offset}: {source}")]
    InvalidRegex {
        offset: usize,
        #[source]
        source: regex::Error,
    },
    #[error("unsupported attribute operator {op:?} at offset {offset}")]
    UnsupportedOperator { offset: usize, op: String },
    #[error("pseudo-element ::{name} at offset {offset}: {reason}")]
    PseudoElement {
        offset: usize,
        name: String,
        reason: &'static str,
    },
    #[error("parsing {input:?}: {left} bytes left over")]
    TrailingInput { input: String, left: usize },
}

/// Parse a single selector. Pseudo-elements are rejected.
pub fn parse(input: &str) -> Result<Selector, ParseError> {
    Parser::new(input, false).complete(Parser::parse_selector)
}

/// Parse a single selector, accepting one trailing pseudo-element.
pub fn parse_with_pseudo_element(input: &str) -> Result<Selector, ParseError> {
    Parser::new(input, true).complete(Parser::parse_selector)
}

/// Parse a comma-separated selector group. Pseudo-elements are rejected.
pub fn parse_group(input: &str) -> Result<SelectorGroup, ParseError> {
    Parser::new(input, false).complete(Parser::parse_selector_group)
}

/// Parse a comma-separated selector group, accepting pseudo-elements.
pub fn parse_group_with_pseudo_element(input: &str) -> Result<SelectorGroup, ParseError> {
    Parser::new(input, true).complete(Parser::parse_selector_group)
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || !c.is_ascii()
}

fn is_name_char(c: char) -> bool {
    is_name_start(c) || c == '-' || c.is_ascii_digit()
}

/// Recursive descent parser state.
struct Parser<'a> {
    input: &'a str,
    cursor: usize,
    accept_pseudo_elements: bool,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str, accept_pseudo_elements: bool) -> Self {
        Self {
            input,
            cursor: 0,
            accept_pseudo_elements,
        }
    }

    /// Run `f` and require that it consumed the whole input.
    fn complete<T>(
        mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let out = f(&mut self)?;
        if !self.is_eof() {
            return Err(ParseError::TrailingInput {
                input: self.input.to_string(),
                left: self.input.len() - self.cursor,
            });
        }
        Ok(out)
    }

    fn is_eof(&self) -> bool {
        self.cursor >= self.input.len()
    }

    fn rest(&self) -> &'a str {
        &self.input[self.cursor..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.cursor += c.len_utf8();
        Some(c)
    }

    /// Consume `expected` or fail with a positioned error.
    fn expect(&mut self, expected: char, what: &'static str) -> Result<(), ParseError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.cursor += c.len_utf8();
                Ok(())
            }
            Some(c) => Err(self.unexpected(c, what)),
            None => Err(ParseError::UnexpectedEof { expected: what }),
        }
    }

    fn unexpected(&self, found: char, expected: &'static str) -> ParseError {
        ParseError::UnexpectedChar {
            offset: self.cursor,
            found,
            expected,
        }
    }

    /// An error for whatever sits at the cursor: a character or EOF.
    fn error_here(&self, expected: &'static str) -> ParseError {
        match self.peek() {
            Some(c) => self.unexpected(c, expected),
            None => ParseError::UnexpectedEof { expected },
        }
    }

    /// Skip whitespace and comments. Returns `true` if anything was skipped.
    fn skip_whitespace(&mut self) -> bool {
        let start = self.cursor;
        loop {
            let rest = self.rest();
            if let Some(c) = rest.chars().next().filter(char::is_ascii_whitespace) {
                self.cursor += c.len_utf8();
                continue;
            }
            if let Some(body) = rest.strip_prefix("/*") {
                if let Some(end) = body.find("*/") {
                    self.cursor += end + 4;
                    continue;
                }
            }
            break;
        }
        self.cursor > start
    }

    /// Consume `(` and any whitespace after it.
    fn consume_parenthesis(&mut self) -> Result<(), ParseError> {
        self.expect('(', "'('")?;
        self.skip_whitespace();
        Ok(())
    }

    /// Consume optional whitespace and `)`.
    fn consume_closing_parenthesis(&mut self) -> Result<(), ParseError> {
        self.skip_whitespace();
        self.expect(')', "')'")
    }

    // ── Lexical pieces ───────────────────────────────────────────────

    /// An identifier: optional leading dashes, then a name that does not
    /// start with a digit.
    fn parse_identifier(&mut self) -> Result<String, ParseError> {
        let mut dashes = 0;
        while self.peek() == Some('-') {
            self.cursor += 1;
            dashes += 1;
        }
        match self.peek() {
            Some(c) if is_name_start(c) || c == '\\' => {}
            _ => return Err(self.error_here("identifier")),
        }
        let name = self.parse_name()?;
        Ok("-".repeat(dashes) + &name)
    }

    /// A run of name characters and escapes.
    fn parse_name(&mut self) -> Result<String, ParseError> {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if is_name_char(c) {
                out.push(c);
                self.cursor += c.len_utf8();
            } else if c == '\\' {
                out.push(self.parse_escape()?);
            } else {
                break;
            }
        }
        if out.is_empty() {
            return Err(self.error_here("name"));
        }
        Ok(out)
    }

    /// A backslash escape: up to six hex digits plus one optional trailing
    /// whitespace character, or any single non-newline character.
    fn parse_escape(&mut self) -> Result<char, ParseError> {
        let start = self.cursor;
        let rest = self.rest();
        let mut chars = rest.chars();
        let next = match (chars.next(), chars.next()) {
            (Some('\\'), Some(next)) => next,
            _ => return Err(ParseError::InvalidEscape { offset: start }),
        };
        match next {
            '\r' | '\n' | '\x0c' => Err(ParseError::InvalidEscape { offset: start }),
            c if c.is_ascii_hexdigit() => {
                let digits = rest[1..]
                    .bytes()
                    .take(6)
                    .take_while(u8::is_ascii_hexdigit)
                    .count();
                let decoded = u32::from_str_radix(&rest[1..1 + digits], 16)
                    .ok()
                    .filter(|&v| v != 0)
                    .and_then(char::from_u32)
                    .unwrap_or(char::REPLACEMENT_CHARACTER);
                self.cursor = start + 1 + digits;
                match self.peek() {
                    Some('\r') => {
                        self.cursor += 1;
                        if self.peek() == Some('\n') {
                            self.cursor += 1;
                        }
                    }
                    Some(' ' | '\t' | '\n' | '\x0c') => self.cursor += 1,
                    _ => {}
                }
                Ok(decoded)
            }
            c => {
                self.cursor = start + 1 + c.len_utf8();
                Ok(c)
            }
        }
    }

    /// A single- or double-quoted string. Escaped newlines are line
    /// continuations; bare newlines are an error.
    fn parse_string(&mut self) -> Result<String, ParseError> {
        let start = self.cursor;
        let quote = match self.peek() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(self.error_here("string")),
        };
        self.cursor += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                None | Some('\r' | '\n' | '\x0c') => {
                    return Err(ParseError::UnterminatedString { offset: start })
                }
                Some(c) if c == quote => {
                    self.cursor += 1;
                    return Ok(out);
                }
                Some('\\') => match self.rest()[1..].chars().next() {
                    Some('\r') => {
                        self.cursor += 2;
                        if self.peek() == Some('\n') {
                            self.cursor += 1;
                        }
                    }
                    Some('\n' | '\x0c') => self.cursor += 2,
                    _ => out.push(self.parse_escape()?),
                },
                Some(c) => {
                    out.push(c);
                    self.cursor += c.len_utf8();
                }
            }
        }
    }

    /// A regular expression running up to the first unbalanced `)` or `]`.
    ///
    /// With `flag_suffix`, a trailing whitespace-separated `i` is left
    /// unconsumed for the attribute case-insensitivity flag.
    fn parse_regex(&mut self, flag_suffix: bool) -> Result<Pattern, ParseError> {
        let start = self.cursor;
        let mut depth = 0i32;
        let mut end = None;
        for (i, c) in self.rest().char_indices() {
            match c {
                '(' | '[' => depth += 1,
                ')' | ']' => {
                    depth -= 1;
                    if depth < 0 {
                        end = Some(start + i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let Some(mut end) = end else {
            return Err(ParseError::UnexpectedEof {
                expected: "')' after regular expression",
            });
        };
        if flag_suffix {
            let span = self.input[start..end].trim_end();
            if let Some(body) = span.strip_suffix(|c: char| c.eq_ignore_ascii_case(&'i')) {
                if body.ends_with(char::is_whitespace) {
                    end = start + body.trim_end().len();
                }
            }
        }
        let pattern = Pattern::new(&self.input[start..end])
            .map_err(|source| ParseError::InvalidRegex { offset: start, source })?;
        self.cursor = end;
        Ok(pattern)
    }

    /// A (possibly signed) decimal integer.
    fn parse_integer(&mut self) -> Result<i32, ParseError> {
        let start = self.cursor;
        let digits = self.rest().bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return Err(self.error_here("integer"));
        }
        self.cursor += digits;
        self.input[start..self.cursor]
            .parse()
            .map_err(|_| ParseError::InvalidNth {
                offset: start,
                message: "integer out of range",
            })
    }

    // ── an+b ─────────────────────────────────────────────────────────

    /// The `an+b` micro-syntax, plus the `odd` and `even` keywords.
    fn parse_nth(&mut self) -> Result<(i32, i32), ParseError> {
        let start = self.cursor;
        let invalid = |message| ParseError::InvalidNth {
            offset: start,
            message,
        };
        let a = match self.peek() {
            None => return Err(ParseError::UnexpectedEof { expected: "an+b" }),
            Some('o' | 'O' | 'e' | 'E') => {
                let keyword = self.parse_name()?.to_ascii_lowercase();
                return match keyword.as_str() {
                    "odd" => Ok((2, 1)),
                    "even" => Ok((2, 0)),
                    _ => Err(invalid("expected 'odd' or 'even'")),
                };
            }
            Some(c @ ('-' | '+')) => {
                self.cursor += 1;
                let sign = if c == '-' { -1 } else { 1 };
                match self.peek() {
                    Some('n' | 'N') => sign,
                    Some(d) if d.is_ascii_digit() => sign * self.parse_integer()?,
                    None => return Err(ParseError::UnexpectedEof { expected: "an+b" }),
                    Some(_) => return Err(invalid("unexpected character")),
                }
            }
            Some(d) if d.is_ascii_digit() => self.parse_integer()?,
            Some('n' | 'N') => 1,
            Some(_) => return Err(invalid("unexpected character")),
        };

        if !matches!(self.peek(), Some('n' | 'N')) {
            // What we read as `a` was really `b`.
            return Ok((0, a));
        }
        self.cursor += 1;

        self.skip_whitespace();
        match self.peek() {
            Some(c @ ('+' | '-')) => {
                self.cursor += 1;
                self.skip_whitespace();
                let b = self.parse_integer()?;
                Ok((a, if c == '-' { -b } else { b }))
            }
            _ => Ok((a, 0)),
        }
    }

    // ── Simple selectors ─────────────────────────────────────────────

    fn parse_type_selector(&mut self) -> Result<Selector, ParseError> {
        let tag = self.parse_identifier()?;
        Ok(Selector::Tag(tag.to_ascii_lowercase()))
    }

    fn parse_id_selector(&mut self) -> Result<Selector, ParseError> {
        self.expect('#', "id selector")?;
        Ok(Selector::Id(self.parse_name()?))
    }

    fn parse_class_selector(&mut self) -> Result<Selector, ParseError> {
        self.expect('.', "class selector")?;
        Ok(Selector::Class(self.parse_identifier()?))
    }

    fn parse_attribute_selector(&mut self) -> Result<Selector, ParseError> {
        self.expect('[', "attribute selector")?;
        self.skip_whitespace();
        let key = self.parse_identifier()?.to_ascii_lowercase();
        self.skip_whitespace();

        if self.peek() == Some(']') {
            self.cursor += 1;
            return Ok(Selector::Attribute(AttributeSelector {
                key,
                op: AttrOp::Exists,
                value: String::new(),
                pattern: None,
                case_insensitive: false,
            }));
        }

        let op_start = self.cursor;
        let op_text: String = match self.advance() {
            Some('=') => "=".into(),
            Some(c) => match self.advance() {
                Some('=') => format!("{c}="),
                Some(d) => {
                    return Err(ParseError::UnsupportedOperator {
                        offset: op_start,
                        op: format!("{c}{d}"),
                    })
                }
                None => return Err(ParseError::UnexpectedEof { expected: "']'" }),
            },
            None => return Err(ParseError::UnexpectedEof { expected: "']'" }),
        };
        let op = AttrOp::from_token(&op_text).ok_or(ParseError::UnsupportedOperator {
            offset: op_start,
            op: op_text,
        })?;
        self.skip_whitespace();

        let (value, pattern) = match (op, self.peek()) {
            (_, None) => return Err(ParseError::UnexpectedEof { expected: "attribute value" }),
            (AttrOp::Regex, Some(_)) => (String::new(), Some(self.parse_regex(true)?)),
            (_, Some('"' | '\'')) => (self.parse_string()?, None),
            (_, Some(_)) => (self.parse_identifier()?, None),
        };
        self.skip_whitespace();

        let case_insensitive = matches!(self.peek(), Some('i' | 'I'));
        if case_insensitive {
            self.cursor += 1;
            self.skip_whitespace();
        }
        self.expect(']', "']'")?;

        Ok(Selector::Attribute(AttributeSelector {
            key,
            op,
            value,
            pattern,
            case_insensitive,
        }))
    }

    /// A pseudo-class, or a pseudo-element name returned on the right.
    fn parse_pseudo(&mut self) -> Result<Result<Selector, String>, ParseError> {
        let start = self.cursor;
        self.expect(':', "pseudo-class")?;
        let double_colon = self.peek() == Some(':');
        if double_colon {
            self.cursor += 1;
        }
        let name = self.parse_identifier()?.to_ascii_lowercase();

        if double_colon || LEGACY_PSEUDO_ELEMENTS.contains(&name.as_str()) {
            return Ok(Err(name));
        }

        let pseudo = match name.as_str() {
            "not" | "has" | "haschild" | "is" | "where" => {
                self.consume_parenthesis()?;
                let group = self.parse_selector_group()?;
                self.consume_closing_parenthesis()?;
                match name.as_str() {
                    "not" => PseudoClass::Not(group),
                    "has" => PseudoClass::Has(group),
                    "haschild" => PseudoClass::HasChild(group),
                    "is" => PseudoClass::Is(group),
                    _ => PseudoClass::Where(group),
                }
            }
            "contains" | "containsown" => {
                self.consume_parenthesis()?;
                let value = match self.peek() {
                    Some('"' | '\'') => self.parse_string()?,
                    Some(_) => self.parse_identifier()?,
                    None => return Err(ParseError::UnexpectedEof { expected: "')'" }),
                };
                self.consume_closing_parenthesis()?;
                PseudoClass::Contains {
                    value: value.to_lowercase(),
                    own: name == "containsown",
                }
            }
            "matches" | "matchesown" => {
                self.consume_parenthesis()?;
                let pattern = self.parse_regex(false)?;
                self.consume_closing_parenthesis()?;
                PseudoClass::Matches {
                    pattern,
                    own: name == "matchesown",
                }
            }
            "nth-child" | "nth-last-child" | "nth-of-type" | "nth-last-of-type" => {
                self.consume_parenthesis()?;
                let (a, b) = self.parse_nth()?;
                self.consume_closing_parenthesis()?;
                PseudoClass::Nth {
                    a,
                    b,
                    last: name.starts_with("nth-last"),
                    of_type: name.ends_with("of-type"),
                }
            }
            "first-child" | "last-child" | "first-of-type" | "last-of-type" => PseudoClass::Nth {
                a: 0,
                b: 1,
                last: name.starts_with("last"),
                of_type: name.ends_with("of-type"),
            },
            "only-child" => PseudoClass::OnlyChild { of_type: false },
            "only-of-type" => PseudoClass::OnlyChild { of_type: true },
            "lang" => {
                self.consume_parenthesis()?;
                let lang = self.parse_identifier()?;
                self.consume_closing_parenthesis()?;
                PseudoClass::Lang(lang.to_ascii_lowercase())
            }
            "input" => PseudoClass::Input,
            "empty" => PseudoClass::Empty,
            "root" => PseudoClass::Root,
            "link" => PseudoClass::Link,
            "enabled" => PseudoClass::Enabled,
            "disabled" => PseudoClass::Disabled,
            "checked" => PseudoClass::Checked,
            "visited" => PseudoClass::Visited,
            "hover" => PseudoClass::Hover,
            "active" => PseudoClass::Active,
            "focus" => PseudoClass::Focus,
            "target" => PseudoClass::Target,
            "read-only" => PseudoClass::ReadOnly,
            "popover" => PseudoClass::Popover,
            other if STATE_PSEUDO_CLASSES.contains(&other) => PseudoClass::State(other.to_string()),
            _ => {
                return Err(ParseError::UnknownPseudoClass {
                    offset: start,
                    name: name.clone(),
                })
            }
        };
        Ok(Ok(Selector::Pseudo(pseudo)))
    }

    // ── Compound, combined, group ────────────────────────────────────

    /// A sequence of simple selectors with no combinator, e.g. `a.b#c:hover`.
    ///
    /// A lone simple selector is returned unwrapped; everything else
    /// (including the bare `*`) becomes a [`CompoundSelector`].
    fn parse_compound_selector(&mut self) -> Result<Selector, ParseError> {
        let mut selectors = Vec::new();
        match self.peek() {
            None => return Err(ParseError::UnexpectedEof { expected: "selector" }),
            Some('*') => {
                self.cursor += 1;
                if self.rest().starts_with("|*") {
                    self.cursor += 2;
                }
            }
            Some('#' | '.' | '[' | ':') => {}
            Some(_) => selectors.push(self.parse_type_selector()?),
        }

        let mut pseudo_element: Option<String> = None;
        loop {
            let offset = self.cursor;
            let parsed = match self.peek() {
                Some('#') => Ok(self.parse_id_selector()?),
                Some('.') => Ok(self.parse_class_selector()?),
                Some('[') => Ok(self.parse_attribute_selector()?),
                Some(':') => self.parse_pseudo()?,
                _ => break,
            };
            match parsed {
                Ok(sel) => {
                    if let Some(name) = pseudo_element {
                        return Err(ParseError::PseudoElement {
                            offset,
                            name,
                            reason: "must be at the end of the selector",
                        });
                    }
                    selectors.push(sel);
                }
                Err(name) => {
                    if pseudo_element.is_some() {
                        return Err(ParseError::PseudoElement {
                            offset,
                            name,
                            reason: "only one pseudo-element is accepted per selector",
                        });
                    }
                    if !self.accept_pseudo_elements {
                        return Err(ParseError::PseudoElement {
                            offset,
                            name,
                            reason: "pseudo-elements are not accepted here",
                        });
                    }
                    pseudo_element = Some(name);
                }
            }
        }

        if selectors.len() == 1 && pseudo_element.is_none() {
            return Ok(selectors.remove(0));
        }
        Ok(Selector::Compound(CompoundSelector {
            selectors,
            pseudo_element,
        }))
    }

    /// Compound selectors joined by combinators, nested to the left.
    fn parse_selector(&mut self) -> Result<Selector, ParseError> {
        self.skip_whitespace();
        let mut result = self.parse_compound_selector()?;
        loop {
            let whitespace = self.skip_whitespace();
            let combinator = match self.peek() {
                None | Some(',' | ')') => return Ok(result),
                Some('>') => Combinator::Child,
                Some('+') => Combinator::NextSibling,
                Some('~') => Combinator::SubsequentSibling,
                Some(_) if whitespace => Combinator::Descendant,
                Some(_) => return Ok(result),
            };
            if combinator != Combinator::Descendant {
                self.cursor += 1;
                self.skip_whitespace();
            }
            let second = self.parse_compound_selector()?;
            result = Selector::Combined {
                first: Box::new(result),
                combinator,
                second: Box::new(second),
            };
        }
    }

    fn parse_selector_group(&mut self) -> Result<SelectorGroup, ParseError> {
        let mut group = vec![self.parse_selector()?];
        while self.peek() == Some(',') {
            self.cursor += 1;
            group.push(self.parse_selector()?);
        }
        Ok(SelectorGroup(group))
    }
}
