//! Type Specs
//!
//! String selectors over item types: `"product,service"` matches either type,
//! `"~product"` matches everything else and `"~"` matches every item.

use std::{fmt, str::FromStr};

use smallvec::SmallVec;

use crate::filters::FilterError;

const NEGATION: char = '~';

/// A parsed type selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpec {
    types: SmallVec<[String; 5]>,
    negated: bool,
}

impl TypeSpec {
    /// Selector matching every item.
    #[must_use]
    pub fn all() -> Self {
        Self {
            types: SmallVec::new(),
            negated: true,
        }
    }

    /// Selector matching items whose type is in `types`.
    pub fn any_of<S: AsRef<str>>(types: &[S]) -> Self {
        Self {
            types: types.iter().map(|t| t.as_ref().to_string()).collect(),
            negated: false,
        }
    }

    /// Selector matching items whose type is not in `types`.
    pub fn none_of<S: AsRef<str>>(types: &[S]) -> Self {
        Self {
            negated: true,
            ..Self::any_of(types)
        }
    }

    /// Parse a type spec string.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::Malformed`] when `~` appears anywhere but the first character.
    pub fn parse(spec: &str) -> Result<Self, FilterError> {
        let (negated, list) = match spec.strip_prefix(NEGATION) {
            Some(rest) => (true, rest),
            None => (false, spec),
        };

        if list.contains(NEGATION) {
            return Err(FilterError::Malformed(spec.to_string()));
        }

        // "~" alone negates an empty list and so matches everything.
        // A bare "" lists the empty type.
        let types = if list.is_empty() && negated {
            SmallVec::new()
        } else {
            list.split(',').map(ToString::to_string).collect()
        };

        Ok(Self { types, negated })
    }

    /// Whether the selector is negated.
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Listed types, in declaration order.
    pub fn types(&self) -> &[String] {
        &self.types
    }

    /// Check if an item type is selected.
    pub fn matches(&self, item_type: &str) -> bool {
        let listed = self.types.iter().any(|t| t == item_type);

        listed != self.negated
    }
}

impl FromStr for TypeSpec {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "{NEGATION}")?;
        }

        write!(f, "{}", self.types.join(","))
    }
}
