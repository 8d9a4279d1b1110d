// src/resolver/solver.rs

//! Backtracking constraint solver
//!
//! The solver keeps, per package name, the intersection of every range
//! required so far and the union of every `using` list. It repeatedly takes
//! the lexically smallest unselected name, tries its candidates from the
//! highest (version, meta_version) down, and for each choice adds the
//! requirements contributed by the libraries in use. A choice that leads to
//! a conflict is undone and the next candidate is tried.

use crate::catalog::CatalogPackage;
use crate::version::{DependencyRequirement, VersionRange};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

use super::conflict::Conflict;
use super::pool::CandidatePool;

/// Requirer label for requirements given directly to the solver
pub const ROOT_REQUIRER: &str = "(root)";

/// Everything required of one package name so far
#[derive(Debug, Clone)]
struct NameConstraint {
    range: VersionRange,
    using: BTreeSet<String>,
    /// (requirer, requirement) pairs, for error messages
    sources: Vec<(String, String)>,
}

impl NameConstraint {
    fn requirers(&self) -> Vec<String> {
        self.sources.iter().map(|(r, _)| r.clone()).collect()
    }

    fn describe(&self, name: &str) -> String {
        let using = self.using.iter().cloned().collect();
        DependencyRequirement::new(name, self.range.clone(), using).to_string()
    }

    fn accepts(&self, candidate: &CatalogPackage) -> bool {
        if !self.range.contains(&candidate.record.key.version) {
            return false;
        }
        let libs = candidate.record.manifest.library_names();
        self.using.iter().all(|l| libs.contains(l.as_str()))
    }
}

#[derive(Debug, Clone, Default)]
struct State {
    constraints: BTreeMap<String, NameConstraint>,
    /// name -> index into the pool's candidates for that name
    chosen: BTreeMap<String, usize>,
}

/// Solver over a fixed candidate pool
pub struct Solver<'p> {
    pool: &'p CandidatePool,
}

impl<'p> Solver<'p> {
    pub fn new(pool: &'p CandidatePool) -> Self {
        Self { pool }
    }

    /// Find one selection per required name, or the conflict that prevents it
    pub fn solve(
        &self,
        roots: &[DependencyRequirement],
    ) -> Result<BTreeMap<String, &'p CatalogPackage>, Conflict> {
        let mut state = State::default();
        for req in roots {
            self.add_requirement(&mut state, req, ROOT_REQUIRER)?;
        }

        let solved = self.search(state)?;
        Ok(solved
            .chosen
            .iter()
            .map(|(name, &idx)| (name.clone(), &self.pool.candidates(name)[idx]))
            .collect())
    }

    fn search(&self, state: State) -> Result<State, Conflict> {
        let Some(name) = state
            .constraints
            .keys()
            .find(|n| !state.chosen.contains_key(*n))
            .cloned()
        else {
            return Ok(state);
        };

        let constraint = &state.constraints[&name];
        let candidates = self.pool.candidates(&name);
        if candidates.is_empty() {
            return Err(Conflict::MissingPackage {
                package: name,
                required_by: constraint.requirers(),
            });
        }

        let mut last_conflict = None;
        for (idx, candidate) in candidates.iter().enumerate() {
            if !constraint.accepts(candidate) {
                continue;
            }
            trace!("Trying {} from '{}'", candidate.record.key, candidate.repo);

            let mut next = state.clone();
            next.chosen.insert(name.clone(), idx);
            let libs = candidate
                .record
                .manifest
                .lib_closure(constraint.using.iter().map(String::as_str));

            let attempt = self
                .add_dependencies(&mut next, candidate, &libs)
                .and_then(|()| self.search(next));
            match attempt {
                Ok(solved) => return Ok(solved),
                Err(conflict) => {
                    debug!(
                        "Backtracking from {}: {}",
                        candidate.record.key, conflict
                    );
                    last_conflict = Some(conflict);
                }
            }
        }

        Err(last_conflict.unwrap_or_else(|| Conflict::UnsatisfiableConstraint {
            package: name.clone(),
            constraint: constraint.describe(&name),
            required_by: constraint.requirers(),
        }))
    }

    /// Add the requirements of `libs` of an already-chosen candidate
    fn add_dependencies(
        &self,
        state: &mut State,
        candidate: &CatalogPackage,
        libs: &BTreeSet<String>,
    ) -> Result<(), Conflict> {
        let requirer = candidate.record.key.package_id().to_string();
        let reqs = candidate
            .record
            .manifest
            .requirements_of(libs)
            .map_err(|e| Conflict::BrokenPackage {
                package: requirer.clone(),
                reason: e.to_string(),
            })?;
        for req in &reqs {
            self.add_requirement(state, req, &requirer)?;
        }
        Ok(())
    }

    fn add_requirement(
        &self,
        state: &mut State,
        req: &DependencyRequirement,
        requirer: &str,
    ) -> Result<(), Conflict> {
        let source = (requirer.to_string(), req.to_string());
        let (old_using, new_using) = match state.constraints.get_mut(&req.name) {
            Some(existing) => {
                existing.sources.push(source);
                existing.range = existing.range.intersect(&req.range).ok_or_else(|| {
                    Conflict::ConflictingConstraints {
                        package: req.name.clone(),
                        constraints: existing.sources.clone(),
                    }
                })?;
                let old = existing.using.clone();
                existing.using.extend(req.using.iter().cloned());
                (old, existing.using.clone())
            }
            None => {
                state.constraints.insert(
                    req.name.clone(),
                    NameConstraint {
                        range: req.range.clone(),
                        using: req.using.iter().cloned().collect(),
                        sources: vec![source],
                    },
                );
                return Ok(());
            }
        };

        // Already chosen: the choice must still fit, and newly used
        // libraries bring their own requirements.
        let Some(&idx) = state.chosen.get(&req.name) else {
            return Ok(());
        };
        let chosen = &self.pool.candidates(&req.name)[idx];
        if !state.constraints[&req.name].accepts(chosen) {
            return Err(Conflict::IncompatibleSelection {
                package: req.name.clone(),
                version: chosen.record.key.version.to_string(),
                constraint: req.to_string(),
                required_by: requirer.to_string(),
            });
        }

        if new_using != old_using {
            let manifest = &chosen.record.manifest;
            let before = manifest.lib_closure(old_using.iter().map(String::as_str));
            let after = manifest.lib_closure(new_using.iter().map(String::as_str));
            let added: BTreeSet<String> = after.difference(&before).cloned().collect();
            self.add_dependencies(state, chosen, &added)?;
        }
        Ok(())
    }
}
