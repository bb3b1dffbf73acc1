//! The façade boundary (§9, §4.11): hydrates a [`crate::repository::Snapshot`]
//! from a [`crate::repository::Repository`], runs [`crate::reflow::reflow`],
//! and caches the result by a fingerprint of the snapshot, analogous to the
//! teacher's `MaterializationManager` (`rusk-core/src/recurrence.rs`)
//! coordinating a repository against a configurable policy.
//!
//! The reflow core itself never touches a timezone or a cache; both live
//! here, at the one seam between the synchronous solver and the async
//! adapter.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::error::CoreError;
use crate::reflow::{self, Assignment, ReflowInput, ReflowOutput};
use crate::repository::{Repository, Snapshot, SnapshotRepository};
use crate::time::LocalDate;
use crate::timezone;

/// A deterministic fingerprint of a [`Snapshot`] plus the window it was
/// hydrated for. Two snapshots that would produce byte-identical
/// [`ReflowInput`]s hash identically (§5: "the façade fingerprints the input
/// and reuses results").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u64);

impl Fingerprint {
    fn of(snapshot: &Snapshot) -> Self {
        // The in-memory types don't derive `Hash` (several carry floats-free
        // but chrono-backed fields that don't either); a JSON projection of
        // every field `reflow()` reads is cheap at this crate's scale and
        // gives a fingerprint that changes iff the solver's input would.
        let mut hasher = DefaultHasher::new();
        hash_json(&mut hasher, &snapshot.series);
        hash_json(&mut hasher, &snapshot.chain_links);
        hash_json(&mut hasher, &snapshot.constraints);
        hash_json(&mut hasher, &snapshot.exceptions);
        hash_json(&mut hasher, &snapshot.completions);
        hash_json(&mut hasher, &snapshot.series_tags);
        snapshot.window_start.to_canonical_string().hash(&mut hasher);
        snapshot.window_end.to_canonical_string().hash(&mut hasher);
        Fingerprint(hasher.finish())
    }
}

fn hash_json<H: Hasher, T: serde::Serialize>(hasher: &mut H, value: &T) {
    // `serde_json::to_string` on these in-memory DTOs never fails.
    serde_json::to_string(value).expect("snapshot fields always serialize").hash(hasher);
}

/// Caches schedule results by snapshot fingerprint (§9: "the façade owns
/// caches ... whose lifecycle is tied to the façade instance; cache
/// invalidation keys are the snapshot fingerprints").
pub struct ReflowFacade<R> {
    repo: R,
    cache: Mutex<HashMap<Fingerprint, ReflowOutput>>,
}

impl<R: Repository> ReflowFacade<R> {
    pub fn new(repo: R) -> Self {
        Self { repo, cache: Mutex::new(HashMap::new()) }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Drops every cached result. Call after a mutation so a stale schedule
    /// is never reused against a snapshot it no longer describes.
    pub fn invalidate(&self) {
        self.cache.lock().expect("facade cache mutex poisoned").clear();
    }

    /// Hydrates the snapshot for `[window_start, window_end]` and runs
    /// `reflow()`, reusing a cached result when the hydrated snapshot's
    /// fingerprint matches one already computed.
    pub async fn reflow_window(
        &self,
        window_start: LocalDate,
        window_end: LocalDate,
    ) -> Result<ReflowOutput, CoreError> {
        let snapshot = self.repo.load_snapshot(window_start, window_end).await?;
        let fingerprint = Fingerprint::of(&snapshot);

        if let Some(cached) = self.cache.lock().expect("facade cache mutex poisoned").get(&fingerprint) {
            return Ok(cached.clone());
        }

        let input = ReflowInput {
            series: &snapshot.series,
            chain_links: &snapshot.chain_links,
            constraints: &snapshot.constraints,
            exceptions: &snapshot.exceptions,
            completions: &snapshot.completions,
            series_tags: &snapshot.series_tags,
            window_start: snapshot.window_start,
            window_end: snapshot.window_end,
            workload: None,
        };
        let output = reflow::reflow(&input);

        self.cache.lock().expect("facade cache mutex poisoned").insert(fingerprint, output.clone());
        Ok(output)
    }

    /// Converts every assignment in `output` to a UTC instant in `timezone`,
    /// the boundary conversion the core itself never performs (§4.11).
    pub fn assignments_to_utc(
        &self,
        output: &ReflowOutput,
        timezone: &str,
    ) -> Result<Vec<(Assignment, DateTime<Utc>)>, CoreError> {
        output
            .assignments
            .iter()
            .map(|a| timezone::to_utc(a.time, timezone).map(|utc| (a.clone(), utc)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChainLink, Completion, Constraint, InstanceException};
    use crate::instance::SeriesWithPatterns;

    fn empty_snapshot(window_start: LocalDate, window_end: LocalDate) -> Snapshot {
        Snapshot {
            series: Vec::<SeriesWithPatterns>::new(),
            chain_links: Vec::<ChainLink>::new(),
            constraints: Vec::<Constraint>::new(),
            exceptions: Vec::<InstanceException>::new(),
            completions: Vec::<Completion>::new(),
            series_tags: HashMap::new(),
            window_start,
            window_end,
        }
    }

    #[test]
    fn identical_snapshots_fingerprint_identically() {
        let a = LocalDate::new(2025, 1, 1).unwrap();
        let b = LocalDate::new(2025, 1, 31).unwrap();
        let s1 = empty_snapshot(a, b);
        let s2 = empty_snapshot(a, b);
        assert_eq!(Fingerprint::of(&s1), Fingerprint::of(&s2));
    }

    #[test]
    fn differing_windows_fingerprint_differently() {
        let a = LocalDate::new(2025, 1, 1).unwrap();
        let b = LocalDate::new(2025, 1, 31).unwrap();
        let c = LocalDate::new(2025, 2, 1).unwrap();
        let s1 = empty_snapshot(a, b);
        let s2 = empty_snapshot(a, c);
        assert_ne!(Fingerprint::of(&s1), Fingerprint::of(&s2));
    }
}
