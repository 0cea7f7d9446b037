//! Crate-level error type.

use crate::css::parser::ParseError;
use crate::css::properties::RegistryError;
use crate::css::rules::ExtractError;

/// Any error this crate returns.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Selector(#[from] ParseError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("failed to read CSS: {0}")]
    Io(#[from] std::io::Error),
}
