//! CSS rules and the rule extractor.
//!
//! [`extract_rules`] walks the [`GrammarParser`] event stream once and turns
//! every ruleset into one [`CssRule`] per selector in its selector list. Only
//! `@media` and `@supports` blocks are descended into; their preludes become
//! the rule's at-rule condition. Everything inside any other at-rule is
//! skipped, and so is a ruleset whose selector does not parse.

use std::fmt;

use crate::css::grammar::{Grammar, GrammarParser};
use crate::css::model::{CompoundSelector, Selector};
use crate::css::parser::parse_group_with_pseudo_element;
use crate::css::serialize::unescape;
use crate::css::tokenizer::TokenError;

/// At-rules whose blocks are read; the bodies of all others are skipped.
pub const CONDITIONAL_AT_RULES: &[&str] = &["media", "supports"];

/// Extraction stopped on a lexical error. Rules completed before the error
/// are kept in `partial`.
#[derive(Debug, thiserror::Error)]
#[error("CSS extraction stopped: {source}")]
pub struct ExtractError {
    #[source]
    pub source: TokenError,
    pub partial: Vec<CssRule>,
}

impl ExtractError {
    /// The rules collected before the error.
    pub fn into_partial(self) -> Vec<CssRule> {
        self.partial
    }
}

/// A single `property: value` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssDeclaration {
    pub property: String,
    /// Whitespace-collapsed and unescaped.
    pub value: String,
}

impl CssDeclaration {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
        }
    }

    /// `--name` declarations.
    pub fn is_custom_property(&self) -> bool {
        self.property.starts_with("--")
    }

    pub fn is_important(&self) -> bool {
        self.value.contains("!important")
    }
}

/// One selector with the declarations that apply to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssRule {
    pub selector: Selector,
    /// In source order.
    pub declarations: Vec<CssDeclaration>,
    /// Preludes of the enclosing `@media`/`@supports` blocks, outermost first
    /// and joined with ` and `. Empty at top level.
    pub at_rule_condition: String,
}

impl CssRule {
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            declarations: Vec::new(),
            at_rule_condition: String::new(),
        }
    }

    /// The context this rule applies in: the at-rule condition, followed by
    /// the sorted pseudo-classes and pseudo-element when the selector is a
    /// compound (`.hover\:p-2:hover` gives `:hover`).
    pub fn condition(&self) -> String {
        match &self.selector {
            Selector::Compound(compound) => {
                format!("{}{}", self.at_rule_condition, compound.pseudo_elements_string())
            }
            _ => self.at_rule_condition.clone(),
        }
    }

    /// Render as CSS text, wrapped in its at-rule condition if any.
    pub fn to_css(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CssRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.at_rule_condition.is_empty() {
            write!(f, "@media {} {{ ", self.at_rule_condition)?;
        }
        write!(f, "{} {{", self.selector)?;
        for decl in &self.declarations {
            write!(f, " {}: {};", decl.property, decl.value)?;
        }
        f.write_str(" }")?;
        if !self.at_rule_condition.is_empty() {
            f.write_str(" }")?;
        }
        Ok(())
    }
}

/// Collapse runs of whitespace to one space and trim the ends.
fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract rules from a stylesheet.
///
/// With `inline` set, `source` is a bare declaration list (the content of a
/// `style` attribute) and the result is a single rule on the universal
/// selector `*`, or nothing if there were no declarations.
pub fn extract_rules(source: &str, inline: bool) -> Result<Vec<CssRule>, ExtractError> {
    let mut rules = Vec::new();
    let mut inline_rule = CssRule::new(Selector::Compound(CompoundSelector::universal()));
    // Rules of the open ruleset, one per selector in its list.
    let mut current: Vec<CssRule> = Vec::new();
    let mut conditions: Vec<String> = Vec::new();
    // Depth inside a block being skipped; zero when reading normally.
    let mut skip_depth = 0usize;

    let finish = |rules: &mut Vec<CssRule>, inline_rule: CssRule| {
        if inline && !inline_rule.declarations.is_empty() {
            rules.push(inline_rule);
        }
    };

    for event in GrammarParser::new(source, inline) {
        let event = match event {
            Ok(event) => event,
            Err(source) => {
                finish(&mut rules, inline_rule);
                return Err(ExtractError {
                    source,
                    partial: rules,
                });
            }
        };

        match event {
            Grammar::BeginAtRule { .. } | Grammar::BeginRuleset { .. } if skip_depth > 0 => {
                skip_depth += 1;
            }
            Grammar::EndAtRule | Grammar::EndRuleset if skip_depth > 0 => {
                skip_depth -= 1;
            }
            _ if skip_depth > 0 => {}

            Grammar::BeginAtRule { name, prelude } => {
                if CONDITIONAL_AT_RULES.contains(&name.as_str()) {
                    conditions.push(unescape(&collapse_whitespace(&prelude)));
                } else {
                    log::debug!("skipping @{name} block");
                    skip_depth = 1;
                }
            }
            Grammar::EndAtRule => {
                conditions.pop();
            }
            Grammar::AtRule { .. } => {}

            Grammar::BeginRuleset { selector } => match parse_group_with_pseudo_element(&selector) {
                Ok(group) => {
                    let condition = conditions.join(" and ");
                    current = group
                        .0
                        .into_iter()
                        .map(|selector| CssRule {
                            at_rule_condition: condition.clone(),
                            ..CssRule::new(selector)
                        })
                        .collect();
                }
                Err(err) => {
                    log::debug!("skipping ruleset {selector:?}: {err}");
                    skip_depth = 1;
                }
            },
            Grammar::EndRuleset => {
                rules.append(&mut current);
            }

            Grammar::Declaration { property, value }
            | Grammar::CustomProperty { property, value } => {
                let decl = CssDeclaration {
                    property,
                    value: unescape(&collapse_whitespace(&value)),
                };
                if current.is_empty() {
                    inline_rule.declarations.push(decl);
                } else {
                    for rule in &mut current {
                        rule.declarations.push(decl.clone());
                    }
                }
            }
        }
    }

    finish(&mut rules, inline_rule);
    Ok(rules)
}
