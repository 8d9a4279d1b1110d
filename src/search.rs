// src/search.rs

//! Package name search across cataloged repositories

use crate::error::{Error, Result};
use crate::resolver::{CandidatePool, PackageSource};
use glob::Pattern;
use semver::Version;
use tracing::debug;

/// One package name matching a search, with every available version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub name: String,
    /// Ascending, without duplicates
    pub versions: Vec<Version>,
    /// Free-form description from the newest version's manifest, if any
    pub description: Option<String>,
}

/// Find package names matching a glob pattern (`*`, `?`, `[...]`)
///
/// Matching is case-sensitive against the whole name. `None` matches every
/// package. Results are sorted by name; no match at all is an error.
pub fn search<S: PackageSource + ?Sized>(
    source: &S,
    pattern: Option<&str>,
) -> Result<Vec<SearchResult>> {
    let pattern_str = pattern.unwrap_or("*");
    let pattern = Pattern::new(pattern_str).map_err(|e| Error::InvalidRequirement {
        input: pattern_str.to_string(),
        reason: format!("invalid search pattern: {e}"),
    })?;

    let pool = CandidatePool::build(source)?;
    let mut results = Vec::new();
    for name in pool.names().filter(|n| pattern.matches(n)) {
        let candidates = pool.candidates(name);
        let mut versions: Vec<Version> = candidates
            .iter()
            .map(|c| c.record.key.version.clone())
            .collect();
        versions.sort();
        versions.dedup();

        let description = candidates.first().and_then(|c| {
            c.record
                .manifest
                .meta
                .as_ref()
                .and_then(|m| m.get("description"))
                .and_then(|d| d.as_str())
                .map(str::to_string)
        });

        results.push(SearchResult {
            name: name.to_string(),
            versions,
            description,
        });
    }

    debug!("Search '{}' matched {} packages", pattern_str, results.len());
    if results.is_empty() {
        return Err(Error::SearchNoResult(pattern_str.to_string()));
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogPackage;
    use crate::resolver::tests::candidate;

    fn source() -> Vec<CatalogPackage> {
        vec![
            candidate("a", "neo-sqlite3", "0.2.3", 1, &[]),
            candidate("a", "neo-sqlite3", "0.3.0", 1, &[]),
            candidate("b", "neo-sqlite3", "0.2.3", 1, &[]),
            candidate("b", "neo-fun", "0.6.0", 1, &[]),
            candidate("b", "Neo-upper", "1.0.0", 1, &[]),
        ]
    }

    #[test]
    fn test_glob_match_sorted_and_deduplicated() {
        let results = search(&source(), Some("neo-*")).unwrap();
        let names: Vec<_> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["neo-fun", "neo-sqlite3"]);
        assert_eq!(
            results[1].versions,
            vec![Version::new(0, 2, 3), Version::new(0, 3, 0)]
        );
    }

    #[test]
    fn test_default_pattern_matches_all() {
        assert_eq!(search(&source(), None).unwrap().len(), 3);
    }

    #[test]
    fn test_no_result() {
        let err = search(&source(), Some("nonexistent")).unwrap_err();
        assert_eq!(err.id(), "search-no-result");

        let empty: Vec<CatalogPackage> = Vec::new();
        let err = search(&empty, None).unwrap_err();
        assert_eq!(err.id(), "search-no-result");
    }

    #[test]
    fn test_character_class() {
        let results = search(&source(), Some("neo-[fs]*")).unwrap();
        assert_eq!(results.len(), 2);
    }
}
