//! 3-tuple CSS specificity calculation and comparison.
//!
//! ```text
//! (id_count, class_count, type_count)
//! ```
//!
//! Fields are ordered so that `Ord` (lexicographic) gives the correct result:
//! - More IDs beat fewer IDs
//! - More classes, attributes and pseudo-classes beat fewer
//! - More type selectors and pseudo-elements beat fewer
//!
//! Per-variant rules live in [`Selector::specificity`](crate::css::model::Selector::specificity).

use std::fmt;
use std::ops::{Add, AddAssign};

/// CSS specificity as a 3-tuple, ordered from highest to lowest priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Specificity {
    /// Number of ID selectors (`#id`).
    pub id_count: u16,
    /// Number of class, attribute and pseudo-class selectors.
    pub class_count: u16,
    /// Number of type selectors and pseudo-elements.
    pub type_count: u16,
}

impl Specificity {
    #[must_use]
    pub const fn new(id_count: u16, class_count: u16, type_count: u16) -> Self {
        Self {
            id_count,
            class_count,
            type_count,
        }
    }

    /// The tuple as `[ids, classes, types]`.
    pub fn as_array(self) -> [u16; 3] {
        [self.id_count, self.class_count, self.type_count]
    }
}

impl Add for Specificity {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            id_count: self.id_count.saturating_add(rhs.id_count),
            class_count: self.class_count.saturating_add(rhs.class_count),
            type_count: self.type_count.saturating_add(rhs.type_count),
        }
    }
}

impl AddAssign for Specificity {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl fmt::Display for Specificity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.id_count, self.class_count, self.type_count)
    }
}
