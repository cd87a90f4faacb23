//! Probe categories derived from filename prefixes.

use crate::error::InvalidCategory;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A probe's grouping, taken from the substring before the first hyphen of
/// its filename (`security-redis-auth.sh` -> `security`).
///
/// Validated at discovery time so a typo in a filename cannot silently
/// create an ad-hoc category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Category(String);

/// Categories the check suite ships with. Discovery accepts any valid
/// token; these are the conventional ones.
pub const WELL_KNOWN: &[&str] = &[
    "security",
    "storage",
    "communication",
    "environment",
    "monitoring",
    "performance",
    "wsl2",
];

impl Category {
    /// Validate a filename prefix as a category token.
    ///
    /// Tokens are non-empty, lowercase ASCII alphanumeric (`wsl2` carries a
    /// digit).
    pub fn parse(s: &str) -> Result<Self, InvalidCategory> {
        if s.is_empty()
            || !s
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(InvalidCategory(s.to_string()));
        }
        Ok(Category(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is one of the conventional suite categories.
    pub fn is_well_known(&self) -> bool {
        WELL_KNOWN.contains(&self.0.as_str())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_categories() {
        for name in WELL_KNOWN {
            let cat = Category::parse(name).expect("well-known category rejected");
            assert!(cat.is_well_known());
            assert_eq!(cat.as_str(), *name);
        }
    }

    #[test]
    fn test_custom_category_accepted() {
        let cat = Category::parse("backup").expect("parse failed");
        assert!(!cat.is_well_known());
    }

    #[test]
    fn test_invalid_categories_rejected() {
        assert!(Category::parse("").is_err());
        assert!(Category::parse("Security").is_err());
        assert!(Category::parse("sec urity").is_err());
        assert!(Category::parse("sec_urity").is_err());
    }

    #[test]
    fn test_ordering_is_alphabetical() {
        let a = Category::parse("communication").unwrap();
        let b = Category::parse("security").unwrap();
        assert!(a < b);
    }
}
