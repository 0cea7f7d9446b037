//! CSS engine: tokenizer, grammar, selector parser, rule extraction.

pub mod tokenizer;
pub mod grammar;
pub mod model;
pub mod parser;
pub mod serialize;
pub mod specificity;
pub mod rules;
pub mod properties;
