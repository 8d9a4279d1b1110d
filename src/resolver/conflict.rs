// src/resolver/conflict.rs

//! Conflict types for dependency resolution
//!
//! Defines the ways a requirement set can fail to resolve. The solver
//! reports the last conflict it hit before giving up; its `Display` text
//! becomes the message of [`crate::Error::NoSolution`].

/// A conflict between package requirements
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conflict {
    /// No usable candidate exists for the package at all
    MissingPackage {
        package: String,
        required_by: Vec<String>,
    },
    /// Candidates exist, but none satisfies the accumulated constraint
    UnsatisfiableConstraint {
        package: String,
        constraint: String,
        required_by: Vec<String>,
    },
    /// Two requirements on the same package have disjoint ranges
    ConflictingConstraints {
        package: String,
        constraints: Vec<(String, String)>, // (requirer, constraint)
    },
    /// A package already chosen does not satisfy a later requirement
    IncompatibleSelection {
        package: String,
        version: String,
        constraint: String,
        required_by: String,
    },
    /// A candidate's stored metadata cannot be interpreted
    BrokenPackage { package: String, reason: String },
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Conflict::MissingPackage {
                package,
                required_by,
            } => write!(
                f,
                "no usable versions of {} are available (required by {})",
                package,
                required_by.join(", ")
            ),
            Conflict::UnsatisfiableConstraint {
                package,
                constraint,
                required_by,
            } => write!(
                f,
                "no version of {} satisfies {} (required by {})",
                package,
                constraint,
                required_by.join(", ")
            ),
            Conflict::ConflictingConstraints {
                package,
                constraints,
            } => {
                write!(f, "conflicting version requirements for {}:", package)?;
                for (requirer, constraint) in constraints {
                    write!(f, "\n  - {} requires {}", requirer, constraint)?;
                }
                Ok(())
            }
            Conflict::IncompatibleSelection {
                package,
                version,
                constraint,
                required_by,
            } => write!(
                f,
                "{} {} was selected, but {} requires {}",
                package, version, required_by, constraint
            ),
            Conflict::BrokenPackage { package, reason } => {
                write!(f, "package {} has unusable metadata: {}", package, reason)
            }
        }
    }
}
