//! Ordered module version strings.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A dotted version string with a total order.
///
/// Components are compared left to right: two numeric components compare
/// numerically, anything else compares as text, and a missing component
/// counts as `0` (so `1.2` equals `1.2.0`). A trailing text component marks
/// a pre-release, so `1.0.0-beta` sorts below `1.0.0`. The empty version
/// means "never installed" and sorts below every non-empty version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type), sqlx(transparent))]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    /// Wraps a raw version string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    /// The empty ("never installed") version.
    pub fn none() -> Self {
        Self(String::new())
    }

    /// Returns whether this is the empty version.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the raw version string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn components(&self) -> impl Iterator<Item = &str> {
        self.0
            .trim_start_matches(['v', 'V'])
            .split(['.', '-', '+'])
            .filter(|c| !c.is_empty())
    }
}

fn is_numeric(component: &str) -> bool {
    component.parse::<u64>().is_ok()
}

fn compare_component(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_empty(), other.is_empty()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }

        let mut left = self.components();
        let mut right = other.components();
        loop {
            let ordering = match (left.next(), right.next()) {
                (None, None) => return Ordering::Equal,
                (Some(a), None) if !is_numeric(a) => Ordering::Less,
                (None, Some(b)) if !is_numeric(b) => Ordering::Greater,
                (Some(a), None) => compare_component(a, "0"),
                (None, Some(b)) => compare_component("0", b),
                (Some(a), Some(b)) => compare_component(a, b),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Version {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Version {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_components() {
        assert!(Version::new("1.10.0") > Version::new("1.9.3"));
        assert!(Version::new("2") > Version::new("1.99"));
        assert_eq!(Version::new("1.2"), Version::new("1.2.0"));
    }

    #[test]
    fn test_empty_is_lowest() {
        assert!(Version::none() < Version::new("0.0.1"));
        assert_eq!(Version::none(), Version::new("  "));
    }

    #[test]
    fn test_text_components() {
        assert!(Version::new("1.0.0-beta") > Version::new("1.0.0-alpha"));
        assert_eq!(Version::new("v1.4"), Version::new("1.4"));
    }

    #[test]
    fn test_pre_release_sorts_below_release() {
        assert!(Version::new("1.0.0") > Version::new("1.0.0-beta"));
        assert!(Version::new("1.0") > Version::new("1.0.0-rc.1"));
        assert!(Version::new("1.0.0-beta") > Version::new("0.9"));
        assert!(Version::new("1.0.1-alpha") > Version::new("1.0.0"));
    }
}
