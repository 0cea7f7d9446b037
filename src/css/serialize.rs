//! Canonical selector text via `Display`.
//!
//! Rendering a selector and parsing the result with
//! [`parse_group_with_pseudo_element`](crate::css::parser::parse_group_with_pseudo_element)
//! gives back a structurally equal value. Every identifier (tags, classes,
//! ids, attribute keys, `:lang()` codes, pseudo-element names) is escaped so
//! that Tailwind-style class names (`sm:p-2`, `w-1/2`, `[&>*]:underline`)
//! survive. Control characters are written as hex escapes in identifiers and
//! strings alike.

use std::fmt::{self, Display, Formatter, Write};

use crate::css::model::*;

/// ASCII characters that must be backslash-escaped inside identifiers.
pub const SPECIAL_CHARACTERS: &str = ",!\"#$%&'()*+ -./:;<=>?@[\\]^`{|}~";

/// Write `name` with every special character backslash-escaped.
///
/// A `-` keeps its escape too, which the parser accepts anywhere. A leading
/// digit becomes a hex escape since it cannot start an identifier.
pub fn write_escaped(f: &mut impl Write, name: &str) -> fmt::Result {
    for (i, c) in name.chars().enumerate() {
        if i == 0 && c.is_ascii_digit() {
            write_hex_escape(f, c)?;
        } else {
            write_escaped_char(f, c)?;
        }
    }
    Ok(())
}

/// `\a ` for a newline. The trailing space ends the escape.
fn write_hex_escape(f: &mut impl Write, c: char) -> fmt::Result {
    write!(f, "\\{:x} ", u32::from(c))
}

fn write_escaped_char(f: &mut impl Write, c: char) -> fmt::Result {
    if c.is_control() {
        write_hex_escape(f, c)
    } else if SPECIAL_CHARACTERS.contains(c) {
        f.write_char('\\')?;
        f.write_char(c)
    } else {
        f.write_char(c)
    }
}

/// `name` with special characters escaped.
pub fn escape(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 8);
    // Writing into a String cannot fail.
    let _ = write_escaped(&mut out, name);
    out
}

/// Drop every backslash, keeping the character after it literally.
///
/// This is a coarse inverse of [`escape`]: hex escapes are not decoded.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn write_string(f: &mut Formatter<'_>, value: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in value.chars() {
        if c.is_control() {
            write_hex_escape(f, c)?;
        } else {
            if c == '"' || c == '\\' {
                f.write_char('\\')?;
            }
            f.write_char(c)?;
        }
    }
    f.write_char('"')
}

impl Display for Selector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Tag(tag) => write_escaped(f, tag),
            Selector::Class(class) => {
                f.write_char('.')?;
                write_escaped(f, class)
            }
            Selector::Id(id) => {
                f.write_char('#')?;
                // Ids may start with a digit.
                for c in id.chars() {
                    write_escaped_char(f, c)?;
                }
                Ok(())
            }
            Selector::Attribute(attr) => attr.fmt(f),
            Selector::Compound(compound) => compound.fmt(f),
            Selector::Combined {
                first,
                combinator,
                second,
            } => match combinator {
                Combinator::Descendant => write!(f, "{first} {second}"),
                other => write!(f, "{first} {} {second}", other.as_char()),
            },
            Selector::Pseudo(pseudo) => pseudo.fmt(f),
        }
    }
}

impl Display for AttributeSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_char('[')?;
        write_escaped(f, &self.key)?;
        match (&self.op, &self.pattern) {
            (AttrOp::Exists, _) => {}
            (AttrOp::Regex, Some(pattern)) => write!(f, "#={}", pattern.as_str())?,
            (op, _) => {
                f.write_str(op.as_str())?;
                write_string(f, &self.value)?;
            }
        }
        if self.case_insensitive {
            f.write_str(" i")?;
        }
        f.write_char(']')
    }
}

impl Display for CompoundSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_universal() {
            return f.write_char('*');
        }
        for sel in &self.selectors {
            sel.fmt(f)?;
        }
        if let Some(element) = &self.pseudo_element {
            f.write_str("::")?;
            write_escaped(f, element)?;
        }
        Ok(())
    }
}

impl Display for SelectorGroup {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, sel) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            sel.fmt(f)?;
        }
        Ok(())
    }
}

impl Display for PseudoClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PseudoClass::Not(group) => write!(f, ":not({group})"),
            PseudoClass::Has(group) => write!(f, ":has({group})"),
            PseudoClass::HasChild(group) => write!(f, ":haschild({group})"),
            PseudoClass::Is(group) => write!(f, ":is({group})"),
            PseudoClass::Where(group) => write!(f, ":where({group})"),
            PseudoClass::Contains { value, own } => {
                f.write_str(if *own { ":containsOwn(" } else { ":contains(" })?;
                write_string(f, value)?;
                f.write_char(')')
            }
            PseudoClass::Matches { pattern, own } => {
                let name = if *own { "matchesOwn" } else { "matches" };
                write!(f, ":{name}({})", pattern.as_str())
            }
            PseudoClass::Nth {
                a,
                b,
                last,
                of_type,
            } => {
                let kind = if *of_type { "of-type" } else { "child" };
                if *a == 0 && *b == 1 {
                    let edge = if *last { "last" } else { "first" };
                    return write!(f, ":{edge}-{kind}");
                }
                let prefix = if *last { "nth-last" } else { "nth" };
                if *b < 0 {
                    write!(f, ":{prefix}-{kind}({a}n{b})")
                } else {
                    write!(f, ":{prefix}-{kind}({a}n+{b})")
                }
            }
            PseudoClass::OnlyChild { of_type } => {
                f.write_str(if *of_type { ":only-of-type" } else { ":only-child" })
            }
            PseudoClass::Lang(lang) => {
                f.write_str(":lang(")?;
                write_escaped(f, lang)?;
                f.write_char(')')
            }
            PseudoClass::Input => f.write_str(":input"),
            PseudoClass::Empty => f.write_str(":empty"),
            PseudoClass::Root => f.write_str(":root"),
            PseudoClass::Link => f.write_str(":link"),
            PseudoClass::Enabled => f.write_str(":enabled"),
            PseudoClass::Disabled => f.write_str(":disabled"),
            PseudoClass::Checked => f.write_str(":checked"),
            PseudoClass::Visited => f.write_str(":visited"),
            PseudoClass::Hover => f.write_str(":hover"),
            PseudoClass::Active => f.write_str(":active"),
            PseudoClass::Focus => f.write_str(":focus"),
            PseudoClass::Target => f.write_str(":target"),
            PseudoClass::ReadOnly => f.write_str(":read-only"),
            PseudoClass::Popover => f.write_str(":popover"),
            PseudoClass::State(name) => write!(f, ":{name}"),
        }
    }
}
