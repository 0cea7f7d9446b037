//! Selector AST: Selector, CompoundSelector, SelectorGroup, PseudoClass.
//!
//! Every variant supports the same three operations: structural equality
//! (`PartialEq`), [`Selector::specificity`], and canonical rendering through
//! `Display` (see [`crate::css::serialize`]). The parser in
//! [`crate::css::parser`] produces these values, and re-parsing the rendered
//! text yields a structurally equal value.

use std::fmt;

use regex::Regex;

use crate::css::specificity::Specificity;

/// A combinator between two compound selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    /// Descendant combinator (whitespace): `A B`.
    Descendant,
    /// Child combinator: `A > B`.
    Child,
    /// Next-sibling combinator: `A + B`.
    NextSibling,
    /// Subsequent-sibling combinator: `A ~ B`.
    SubsequentSibling,
}

impl Combinator {
    /// The source character for this combinator.
    pub fn as_char(self) -> char {
        match self {
            Combinator::Descendant => ' ',
            Combinator::Child => '>',
            Combinator::NextSibling => '+',
            Combinator::SubsequentSibling => '~',
        }
    }
}

/// Attribute selector operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrOp {
    /// `[key]`
    Exists,
    /// `[key=value]`
    Equals,
    /// `[key!=value]` (non-standard)
    NotEquals,
    /// `[key~=value]`: whitespace-separated list contains value.
    Includes,
    /// `[key|=value]`: equals value or starts with `value-`.
    DashMatch,
    /// `[key^=value]`
    Prefix,
    /// `[key$=value]`
    Suffix,
    /// `[key*=value]`
    Substring,
    /// `[key#=(regex)]` (non-standard)
    Regex,
}

impl AttrOp {
    /// The operator as written in source, empty for [`AttrOp::Exists`].
    pub fn as_str(self) -> &'static str {
        match self {
            AttrOp::Exists => "",
            AttrOp::Equals => "=",
            AttrOp::NotEquals => "!=",
            AttrOp::Includes => "~=",
            AttrOp::DashMatch => "|=",
            AttrOp::Prefix => "^=",
            AttrOp::Suffix => "$=",
            AttrOp::Substring => "*=",
            AttrOp::Regex => "#=",
        }
    }

    /// Look up a two-character operator such as `^=`.
    pub fn from_token(op: &str) -> Option<Self> {
        Some(match op {
            "=" => AttrOp::Equals,
            "!=" => AttrOp::NotEquals,
            "~=" => AttrOp::Includes,
            "|=" => AttrOp::DashMatch,
            "^=" => AttrOp::Prefix,
            "$=" => AttrOp::Suffix,
            "*=" => AttrOp::Substring,
            "#=" => AttrOp::Regex,
            _ => return None,
        })
    }
}

/// A compiled regular expression that compares by its source text.
#[derive(Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Regex::new(source).map(Pattern)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn regex(&self) -> &Regex {
        &self.0
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Pattern {}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.as_str()).finish()
    }
}

/// `[key op value i]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelector {
    /// Lowercased attribute name.
    pub key: String,
    pub op: AttrOp,
    /// Empty for [`AttrOp::Exists`] and [`AttrOp::Regex`].
    pub value: String,
    /// Set only for [`AttrOp::Regex`].
    pub pattern: Option<Pattern>,
    /// The `i` flag.
    pub case_insensitive: bool,
}

/// Pseudo-classes understood by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudoClass {
    /// `:not(group)`
    Not(SelectorGroup),
    /// `:has(group)`: any descendant matches.
    Has(SelectorGroup),
    /// `:haschild(group)`: any child matches.
    HasChild(SelectorGroup),
    /// `:is(group)`
    Is(SelectorGroup),
    /// `:where(group)`, always zero specificity.
    Where(SelectorGroup),
    /// `:contains("text")` / `:containsOwn("text")`. The value is lowercased.
    Contains { value: String, own: bool },
    /// `:matches(regex)` / `:matchesOwn(regex)`.
    Matches { pattern: Pattern, own: bool },
    /// `:nth-child(an+b)` and friends. `:first-child` is `a = 0, b = 1`.
    Nth {
        a: i32,
        b: i32,
        last: bool,
        of_type: bool,
    },
    /// `:only-child` / `:only-of-type`.
    OnlyChild { of_type: bool },
    /// `:lang(code)`, lowercased.
    Lang(String),
    Input,
    Empty,
    Root,
    Link,
    Enabled,
    Disabled,
    Checked,
    Visited,
    Hover,
    Active,
    Focus,
    Target,
    ReadOnly,
    Popover,
    /// Any other zero-argument state pseudo-class from [`STATE_PSEUDO_CLASSES`].
    State(String),
}

/// Zero-argument pseudo-classes without a dedicated variant.
pub const STATE_PSEUDO_CLASSES: &[&str] = &[
    "any-link",
    "autofill",
    "default",
    "defined",
    "focus-visible",
    "focus-within",
    "fullscreen",
    "in-range",
    "indeterminate",
    "invalid",
    "modal",
    "open",
    "optional",
    "out-of-range",
    "paused",
    "placeholder-shown",
    "playing",
    "read-write",
    "required",
    "scope",
    "user-invalid",
    "user-valid",
    "valid",
];

/// Pseudo-elements that may also be written with a single colon.
pub const LEGACY_PSEUDO_ELEMENTS: &[&str] = &[
    "after",
    "backdrop",
    "before",
    "cue",
    "first-letter",
    "first-line",
    "grammar-error",
    "marker",
    "placeholder",
    "selection",
    "spelling-error",
];

/// A sequence of simple selectors with no combinator between them, with an
/// optional trailing pseudo-element.
///
/// An empty `selectors` list with no pseudo-element is the universal selector
/// `*`. `.btn:hover::before` has `selectors = [Class("btn"), Pseudo(Hover)]`
/// and `pseudo_element = Some("before")`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompoundSelector {
    pub selectors: Vec<Selector>,
    pub pseudo_element: Option<String>,
}

impl CompoundSelector {
    /// The universal selector `*`.
    pub fn universal() -> Self {
        Self::default()
    }

    /// Returns `true` for the bare universal selector.
    pub fn is_universal(&self) -> bool {
        self.selectors.is_empty() && self.pseudo_element.is_none()
    }

    /// The pseudo-class members of this compound plus its pseudo-element,
    /// rendered and sorted so that `:hover:focus` and `:focus:hover` produce
    /// the same string.
    pub fn pseudo_elements_string(&self) -> String {
        let mut parts: Vec<String> = self
            .selectors
            .iter()
            .filter(|sel| sel.is_pseudo())
            .map(ToString::to_string)
            .collect();
        if let Some(element) = &self.pseudo_element {
            parts.push(format!("::{element}"));
        }
        parts.sort();
        parts.concat()
    }
}

/// A comma-separated list of selectors; matches if any member matches.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectorGroup(pub Vec<Selector>);

impl SelectorGroup {
    pub fn iter(&self) -> std::slice::Iter<'_, Selector> {
        self.0.iter()
    }

    /// The most specific member, or zero for an empty group.
    pub fn specificity(&self) -> Specificity {
        self.0
            .iter()
            .map(Selector::specificity)
            .max()
            .unwrap_or_default()
    }
}

impl<'a> IntoIterator for &'a SelectorGroup {
    type Item = &'a Selector;
    type IntoIter = std::slice::Iter<'a, Selector>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A parsed CSS selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Type selector, lowercased: `div`.
    Tag(String),
    /// `.name`
    Class(String),
    /// `#name`
    Id(String),
    Attribute(AttributeSelector),
    Compound(CompoundSelector),
    /// Two selectors joined by a combinator. Longer chains nest on the left:
    /// `a > b c` is `Combined(Combined(a, >, b), ' ', c)`.
    Combined {
        first: Box<Selector>,
        combinator: Combinator,
        second: Box<Selector>,
    },
    Pseudo(PseudoClass),
}

impl Selector {
    /// CSS specificity of this selector.
    pub fn specificity(&self) -> Specificity {
        match self {
            Selector::Tag(_) => Specificity::new(0, 0, 1),
            Selector::Class(_) | Selector::Attribute(_) => Specificity::new(0, 1, 0),
            Selector::Id(_) => Specificity::new(1, 0, 0),
            Selector::Compound(compound) => {
                let mut out = compound
                    .selectors
                    .iter()
                    .fold(Specificity::default(), |acc, sel| acc + sel.specificity());
                if compound.pseudo_element.is_some() {
                    out += Specificity::new(0, 0, 1);
                }
                out
            }
            Selector::Combined { first, second, .. } => first.specificity() + second.specificity(),
            Selector::Pseudo(pseudo) => match pseudo {
                PseudoClass::Not(group)
                | PseudoClass::Has(group)
                | PseudoClass::HasChild(group)
                | PseudoClass::Is(group) => group.specificity(),
                PseudoClass::Where(_) => Specificity::default(),
                PseudoClass::Contains { .. }
                | PseudoClass::Matches { .. }
                | PseudoClass::Nth { .. }
                | PseudoClass::OnlyChild { .. }
                | PseudoClass::Lang(_)
                | PseudoClass::Input
                | PseudoClass::Empty
                | PseudoClass::Root
                | PseudoClass::Link
                | PseudoClass::Enabled
                | PseudoClass::Disabled
                | PseudoClass::Checked
                | PseudoClass::Visited
                | PseudoClass::Hover
                | PseudoClass::Active
                | PseudoClass::Focus
                | PseudoClass::Target
                | PseudoClass::ReadOnly
                | PseudoClass::Popover
                | PseudoClass::State(_) => Specificity::new(0, 1, 0),
            },
        }
    }

    /// The pseudo-element of the subject compound, if any.
    pub fn pseudo_element(&self) -> Option<&str> {
        match self {
            Selector::Compound(compound) => compound.pseudo_element.as_deref(),
            Selector::Combined { second, .. } => second.pseudo_element(),
            _ => None,
        }
    }

    /// Returns `true` for any pseudo-class selector. [`Selector::walk`] never
    /// yields `:is()` or `:where()`, since it looks through them.
    pub fn is_pseudo(&self) -> bool {
        matches!(self, Selector::Pseudo(_))
    }

    pub fn is_class(&self) -> bool {
        matches!(self, Selector::Class(_))
    }

    /// Returns `true` for a compound of one class followed only by
    /// pseudo-classes and/or a pseudo-element, e.g. `.hover\:p-2:hover`.
    pub fn is_class_with_pseudo(&self) -> bool {
        if !matches!(self, Selector::Compound(_)) {
            return false;
        }
        let parts = self.walk();
        match parts.split_first() {
            Some((first, rest)) => first.is_class() && rest.iter().all(|sel| sel.is_pseudo()),
            None => false,
        }
    }

    /// Flatten combined, compound, `:is()` and `:where()` selectors into their
    /// component selectors, left to right.
    pub fn walk(&self) -> Vec<&Selector> {
        let mut out = Vec::new();
        self.walk_into(&mut out);
        out
    }

    fn walk_into<'a>(&'a self, out: &mut Vec<&'a Selector>) {
        match self {
            Selector::Combined { first, second, .. } => {
                first.walk_into(out);
                second.walk_into(out);
            }
            Selector::Compound(compound) => {
                for sel in &compound.selectors {
                    sel.walk_into(out);
                }
            }
            Selector::Pseudo(PseudoClass::Is(group)) | Selector::Pseudo(PseudoClass::Where(group)) => {
                for sel in group {
                    sel.walk_into(out);
                }
            }
            other => out.push(other),
        }
    }

    /// Every class name reachable through [`Selector::walk`].
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.walk().into_iter().filter_map(|sel| match sel {
            Selector::Class(name) => Some(name.as_str()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn class(name: &str) -> Selector {
        Selector::Class(name.into())
    }

    fn compound(selectors: Vec<Selector>, pseudo_element: Option<&str>) -> Selector {
        Selector::Compound(CompoundSelector {
            selectors,
            pseudo_element: pseudo_element.map(Into::into),
        })
    }

    // ── CompoundSelector ─────────────────────────────────────────────

    #[test]
    fn universal_compound() {
        let cs = CompoundSelector::universal();
        assert!(cs.is_universal());
        assert_eq!(cs.pseudo_elements_string(), "");
    }

    #[test]
    fn pseudo_elements_string_is_order_independent() {
        let a = CompoundSelector {
            selectors: vec![
                class("x"),
                Selector::Pseudo(PseudoClass::Hover),
                Selector::Pseudo(PseudoClass::Focus),
            ],
            pseudo_element: None,
        };
        let b = CompoundSelector {
            selectors: vec![
                class("x"),
                Selector::Pseudo(PseudoClass::Focus),
                Selector::Pseudo(PseudoClass::Hover),
            ],
            pseudo_element: None,
        };
        assert_eq!(a.pseudo_elements_string(), ":focus:hover");
        assert_eq!(a.pseudo_elements_string(), b.pseudo_elements_string());
    }

    #[test]
    fn pseudo_elements_string_includes_pseudo_element() {
        let cs = CompoundSelector {
            selectors: vec![class("x"), Selector::Pseudo(PseudoClass::Hover)],
            pseudo_element: Some("before".into()),
        };
        assert_eq!(cs.pseudo_elements_string(), "::before:hover");
    }

    // ── walk ─────────────────────────────────────────────────────────

    #[test]
    fn walk_flattens_combined_and_is() {
        let sel = Selector::Combined {
            first: Box::new(class("group")),
            combinator: Combinator::Descendant,
            second: Box::new(compound(
                vec![
                    class("a"),
                    Selector::Pseudo(PseudoClass::Is(SelectorGroup(vec![class("b")]))),
                ],
                None,
            )),
        };
        let names: Vec<&str> = sel.class_names().collect();
        assert_eq!(names, vec!["group", "a", "b"]);
    }

    #[test]
    fn walk_keeps_not_opaque() {
        let sel = Selector::Pseudo(PseudoClass::Not(SelectorGroup(vec![class("b")])));
        assert_eq!(sel.walk().len(), 1);
        assert_eq!(sel.class_names().count(), 0);
    }

    // ── class shape predicates ───────────────────────────────────────

    #[test]
    fn class_with_pseudo() {
        let sel = compound(vec![class("a"), Selector::Pseudo(PseudoClass::Hover)], None);
        assert!(sel.is_class_with_pseudo());
        assert!(!sel.is_class());

        let with_element = compound(vec![class("a")], Some("before"));
        assert!(with_element.is_class_with_pseudo());
    }

    #[test]
    fn class_with_attribute_is_not_class_with_pseudo() {
        let sel = compound(
            vec![
                class("a"),
                Selector::Attribute(AttributeSelector {
                    key: "data-open".into(),
                    op: AttrOp::Exists,
                    value: String::new(),
                    pattern: None,
                    case_insensitive: false,
                }),
            ],
            None,
        );
        assert!(!sel.is_class_with_pseudo());
    }

    #[test]
    fn combined_is_not_class_with_pseudo() {
        let sel = Selector::Combined {
            first: Box::new(class("a")),
            combinator: Combinator::Child,
            second: Box::new(Selector::Compound(CompoundSelector::universal())),
        };
        assert!(!sel.is_class_with_pseudo());
    }

    // ── misc ─────────────────────────────────────────────────────────

    #[test]
    fn pattern_equality_uses_source() {
        let a = Pattern::new(r"\d+").unwrap();
        let b = Pattern::new(r"\d+").unwrap();
        let c = Pattern::new(r"\w+").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn attr_op_round_trip() {
        for op in ["=", "!=", "~=", "|=", "^=", "$=", "*=", "#="] {
            assert_eq!(AttrOp::from_token(op).map(AttrOp::as_str), Some(op));
        }
        assert_eq!(AttrOp::from_token("%="), None);
    }

    #[test]
    fn combinator_chars() {
        assert_eq!(Combinator::Descendant.as_char(), ' ');
        assert_eq!(Combinator::Child.as_char(), '>');
        assert_eq!(Combinator::NextSibling.as_char(), '+');
        assert_eq!(Combinator::SubsequentSibling.as_char(), '~');
    }
}
