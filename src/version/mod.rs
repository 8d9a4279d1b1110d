// src/version/mod.rs

//! Version handling and range satisfaction for package dependencies
//!
//! Package versions are semantic versions. Requirements select versions
//! through half-open ranges `[low, high)`; an absent upper bound means the
//! range is unbounded above.

mod requirement;

pub use requirement::{DependencyRequirement, RangeOperator, validate_package_name};

use crate::error::{Error, Result};
use semver::Version;
use std::fmt;

/// Parse a package version string
pub fn parse_version(s: &str) -> Result<Version> {
    Version::parse(s.trim()).map_err(|e| Error::InvalidRequirement {
        input: s.to_string(),
        reason: format!("invalid version: {e}"),
    })
}

/// The first version of the next major release: `1.4.2` -> `2.0.0`
///
/// `None` when the major component is already `u64::MAX`.
pub fn next_major(v: &Version) -> Option<Version> {
    Some(Version::new(v.major.checked_add(1)?, 0, 0))
}

/// The first version of the next minor release: `1.4.2` -> `1.5.0`
pub fn next_minor(v: &Version) -> Option<Version> {
    match v.minor.checked_add(1) {
        Some(minor) => Some(Version::new(v.major, minor, 0)),
        None => next_major(v),
    }
}

/// The smallest release strictly greater than `v`.
///
/// For a pre-release this is the release it precedes (`1.2.3-beta` ->
/// `1.2.3`), otherwise the next patch.
pub fn next_patch(v: &Version) -> Option<Version> {
    if !v.pre.is_empty() {
        return Some(Version::new(v.major, v.minor, v.patch));
    }
    match v.patch.checked_add(1) {
        Some(patch) => Some(Version::new(v.major, v.minor, patch)),
        None => next_minor(v),
    }
}

/// A half-open version range `[low, high)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionRange {
    pub low: Version,
    /// Exclusive upper bound; `None` means unbounded
    pub high: Option<Version>,
}

impl VersionRange {
    pub fn new(low: Version, high: Option<Version>) -> Result<Self> {
        if let Some(ref h) = high
            && *h <= low
        {
            return Err(Error::InvalidRequirement {
                input: format!("[{low}, {h})"),
                reason: "upper bound must be greater than lower bound".to_string(),
            });
        }
        Ok(Self { low, high })
    }

    /// `[v, nextMajor(v))`, the default expansion of `name@v`
    pub fn caret(v: Version) -> Self {
        let high = next_major(&v);
        Self { low: v, high }
    }

    /// `[v, nextMinor(v))`
    pub fn tilde(v: Version) -> Self {
        let high = next_minor(&v);
        Self { low: v, high }
    }

    /// Only `v` itself
    pub fn exact(v: Version) -> Self {
        let high = next_patch(&v);
        Self { low: v, high }
    }

    /// `[v, ∞)`
    pub fn at_least(v: Version) -> Self {
        Self { low: v, high: None }
    }

    /// Check if a version falls within this range
    pub fn contains(&self, version: &Version) -> bool {
        if *version < self.low {
            return false;
        }
        match &self.high {
            Some(high) => version < high,
            None => true,
        }
    }

    /// Intersection of two ranges, or `None` when they are disjoint
    pub fn intersect(&self, other: &VersionRange) -> Option<VersionRange> {
        let low = std::cmp::max(&self.low, &other.low).clone();
        let high = match (&self.high, &other.high) {
            (Some(a), Some(b)) => Some(std::cmp::min(a, b).clone()),
            (Some(a), None) | (None, Some(a)) => Some(a.clone()),
            (None, None) => None,
        };
        match high {
            Some(ref h) if *h <= low => None,
            _ => Some(VersionRange { low, high }),
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.high {
            Some(high) => write!(f, "[{}, {})", self.low, high),
            None => write!(f, "[{}, ∞)", self.low),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_next_major() {
        assert_eq!(next_major(&v("4.1.3")), Some(v("5.0.0")));
        assert_eq!(next_major(&v("0.3.0")), Some(v("1.0.0")));
    }

    #[test]
    fn test_next_patch_prerelease() {
        assert_eq!(next_patch(&v("1.2.3")), Some(v("1.2.4")));
        assert_eq!(next_patch(&v("1.2.3-beta.1")), Some(v("1.2.3")));
    }

    #[test]
    fn test_bounds_at_component_limits() {
        let max = u64::MAX;
        assert_eq!(next_major(&Version::new(max, 0, 0)), None);
        assert_eq!(next_minor(&Version::new(1, max, 0)), Some(v("2.0.0")));
        assert_eq!(next_patch(&Version::new(1, 2, max)), Some(v("1.3.0")));
        assert_eq!(next_patch(&Version::new(max, max, max)), None);

        let r = VersionRange::caret(Version::new(max, 0, 0));
        assert_eq!(r.high, None);
        assert!(r.contains(&Version::new(max, 7, 1)));
        assert!(!r.contains(&Version::new(max - 1, 0, 0)));
    }

    #[test]
    fn test_caret_range_contains() {
        let r = VersionRange::caret(v("4.1.3"));
        assert!(r.contains(&v("4.1.3")));
        assert!(r.contains(&v("4.9.0")));
        assert!(!r.contains(&v("5.0.0")));
        assert!(!r.contains(&v("4.1.2")));
    }

    #[test]
    fn test_exact_range() {
        let r = VersionRange::exact(v("1.2.3"));
        assert!(r.contains(&v("1.2.3")));
        assert!(!r.contains(&v("1.2.4")));
    }

    #[test]
    fn test_at_least_is_unbounded() {
        let r = VersionRange::at_least(v("2.0.0"));
        assert!(r.contains(&v("99.0.0")));
        assert_eq!(r.to_string(), "[2.0.0, ∞)");
    }

    #[test]
    fn test_new_rejects_empty_range() {
        assert!(VersionRange::new(v("2.0.0"), Some(v("2.0.0"))).is_err());
        assert!(VersionRange::new(v("2.0.0"), Some(v("1.0.0"))).is_err());
    }

    #[test]
    fn test_intersect() {
        let a = VersionRange::caret(v("1.2.0"));
        let b = VersionRange::tilde(v("1.4.0"));
        let both = a.intersect(&b).unwrap();
        assert_eq!(both.low, v("1.4.0"));
        assert_eq!(both.high, Some(v("1.5.0")));

        let c = VersionRange::caret(v("2.0.0"));
        assert!(a.intersect(&c).is_none());
    }
}
