// src/version/requirement.rs

//! Dependency requirement strings
//!
//! A requirement names a package, a version range and the libraries of that
//! package the dependent intends to use:
//!
//! - `bar@4.1.3` → `[4.1.3, 5.0.0)`, using `[bar]`
//! - `bar^4.1.3` → same as `@`
//! - `bar~4.1.3` → `[4.1.3, 4.2.0)`
//! - `bar=4.1.3` → exactly `4.1.3`
//! - `bar+4.1.3` → `[4.1.3, ∞)`
//!
//! Any form may be followed by ` using lib1, lib2` to replace the default
//! `using` list, which is the package name itself.

use super::{VersionRange, parse_version};
use crate::error::{Error, Result};
use semver::Version;
use std::fmt;
use std::str::FromStr;

/// How a requirement's version expands into a range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOperator {
    /// `@` and `^`
    Caret,
    /// `~`
    Tilde,
    /// `=`
    Exact,
    /// `+`
    AtLeast,
}

impl RangeOperator {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '@' | '^' => Some(RangeOperator::Caret),
            '~' => Some(RangeOperator::Tilde),
            '=' => Some(RangeOperator::Exact),
            '+' => Some(RangeOperator::AtLeast),
            _ => None,
        }
    }

    /// Expand a version into the range this operator denotes
    pub fn range(self, version: Version) -> VersionRange {
        match self {
            RangeOperator::Caret => VersionRange::caret(version),
            RangeOperator::Tilde => VersionRange::tilde(version),
            RangeOperator::Exact => VersionRange::exact(version),
            RangeOperator::AtLeast => VersionRange::at_least(version),
        }
    }
}

/// A parsed dependency requirement
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyRequirement {
    pub name: String,
    pub range: VersionRange,
    /// Libraries of the target package this requirement uses
    pub using: Vec<String>,
}

impl DependencyRequirement {
    /// Build a requirement with explicit range and `using` list.
    ///
    /// An empty `using` list falls back to the package name.
    pub fn new(name: impl Into<String>, range: VersionRange, using: Vec<String>) -> Self {
        let name = name.into();
        let using = if using.is_empty() {
            vec![name.clone()]
        } else {
            using
        };
        Self { name, range, using }
    }

    /// Parse a requirement string such as `bar@4.1.3` or `bar~1.2.0 using bar, bar-extra`
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidRequirement {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = input.trim();
        let (spec, using) = match trimmed.split_once(" using ") {
            Some((spec, libs)) => {
                let libs: Vec<String> = libs
                    .split(',')
                    .map(|l| l.trim().to_string())
                    .collect();
                if libs.iter().any(|l| l.is_empty()) {
                    return Err(invalid("empty library name in 'using' list"));
                }
                (spec.trim(), libs)
            }
            None => (trimmed, Vec::new()),
        };

        let (op_pos, op) = spec
            .char_indices()
            .find_map(|(i, c)| RangeOperator::from_char(c).map(|op| (i, op)))
            .ok_or_else(|| invalid("expected a version operator (@, ^, ~, = or +)"))?;

        let name = &spec[..op_pos];
        validate_package_name(name).map_err(|reason| invalid(&reason))?;

        let version_str = &spec[op_pos + 1..];
        if version_str.is_empty() {
            return Err(invalid("missing version"));
        }
        let version = parse_version(version_str).map_err(|_| invalid("invalid version"))?;

        Ok(Self::new(name, op.range(version), using))
    }

    /// Check if a version satisfies this requirement's range
    pub fn accepts(&self, version: &Version) -> bool {
        self.range.contains(version)
    }
}

impl FromStr for DependencyRequirement {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DependencyRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.range)?;
        if self.using != [self.name.clone()] {
            write!(f, " using {}", self.using.join(", "))?;
        }
        Ok(())
    }
}

/// Check a package or library name: non-empty, ASCII alphanumerics plus `-`, `_`, `.`
pub fn validate_package_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("empty package name".to_string());
    }
    // Names become path components
    if name.starts_with('.') {
        return Err(format!("name '{name}' must not start with '.'"));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(format!("invalid character '{bad}' in name '{name}'"));
    }
    Ok(())
}
