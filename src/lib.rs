//! # classmerge
//!
//! Resolve conflicting utility classes (Tailwind CSS and friends) by reading
//! the stylesheet that defines them.
//!
//! Instead of hard-coding class groups, classmerge parses the generated CSS,
//! records which longhand properties each class sets and under which
//! condition (media query, pseudo-classes, selector context), and keeps only
//! the last class to set each of them.
//!
//! ```no_run
//! use classmerge::{Merger, MergerConfig};
//!
//! let merger = Merger::new(MergerConfig::new())?;
//! merger.add_css(".p-1 { padding: 0.25rem } .p-2 { padding: 0.5rem }", false)?;
//! assert_eq!(merger.merge("p-1 p-2"), "p-2");
//! # Ok::<(), classmerge::Error>(())
//! ```
//!
//! ## Modules
//!
//! - **[`css`]**: Tokenizer, selector parser and serializer, specificity,
//!   rule extraction, property metadata
//! - **[`merge`]**: The [`Merger`] and its configuration
//! - **[`cache`]**: Pluggable memoization of merge results
//! - **[`error`]**: Crate-level [`Error`]

pub mod css;

pub mod cache;
pub mod error;
pub mod merge;

pub use cache::{Cache, SimpleCache};
pub use error::Error;
pub use merge::{Merger, MergerConfig};
