//! Constraint propagation (C6): AC-3 with selective cascade.
//!
//! Only `noOverlap` and `mustBeBefore` constraints produce AC-3 arcs here.
//! `Constraint::Chain` is deliberately not turned into an arc: a chain
//! child's time is derived, not domain-selected (§3), so it has no entry in
//! the [`crate::domain::DomainMap`] for an arc to prune in the first place.
//! Its propagation is [`crate::chain::prune_by_chain_shadow`], which runs
//! before this module in the pipeline and shrinks the *parent's* domain
//! directly against fixed occupiers.

use std::collections::{HashMap, HashSet, VecDeque};

use uuid::Uuid;

use crate::domain::DomainMap;
use crate::instance::{Instance, InstanceKey};
use crate::models::{Constraint, ConstraintTarget};
use crate::time::{Interval, Minutes};

#[derive(Debug, Clone, Copy)]
pub(crate) enum ArcKind {
    /// `target` is pruned of values that overlap every value of `other`.
    NoOverlap { other: InstanceKey },
    /// `target` is the "first" side of a `mustBeBefore`; prune values `>= max(dom(other))`.
    BeforeUsesMax { other: InstanceKey },
    /// `target` is the "second" side; prune values `<= min(dom(other))`.
    BeforeUsesMin { other: InstanceKey },
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Arc {
    pub(crate) target: InstanceKey,
    kind: ArcKind,
}

impl Arc {
    fn other(&self) -> InstanceKey {
        match self.kind {
            ArcKind::NoOverlap { other } | ArcKind::BeforeUsesMax { other } | ArcKind::BeforeUsesMin { other } => other,
        }
    }
}

fn resolve_target(target: &ConstraintTarget, series_tags: &HashMap<Uuid, Vec<String>>) -> HashSet<Uuid> {
    match target {
        ConstraintTarget::Series(id) => std::iter::once(*id).collect(),
        ConstraintTarget::Tag(tag) => series_tags
            .iter()
            .filter(|(_, tags)| tags.contains(tag))
            .map(|(id, _)| *id)
            .collect(),
    }
}

pub(crate) fn build_arcs(instances: &[Instance], constraints: &[Constraint], series_tags: &HashMap<Uuid, Vec<String>>, domain_keys: &HashSet<InstanceKey>) -> Vec<Arc> {
    let mut arcs = Vec::new();

    for constraint in constraints {
        match constraint {
            Constraint::NoOverlap { a, b } => {
                let set_a = resolve_target(a, series_tags);
                let set_b = resolve_target(b, series_tags);
                for inst_a in instances.iter().filter(|i| domain_keys.contains(&i.key) && set_a.contains(&i.series_id())) {
                    for inst_b in instances
                        .iter()
                        .filter(|i| domain_keys.contains(&i.key) && set_b.contains(&i.series_id()) && i.date() == inst_a.date() && i.key != inst_a.key)
                    {
                        arcs.push(Arc { target: inst_a.key, kind: ArcKind::NoOverlap { other: inst_b.key } });
                        arcs.push(Arc { target: inst_b.key, kind: ArcKind::NoOverlap { other: inst_a.key } });
                    }
                }
            }
            Constraint::MustBeBefore { first, second } => {
                let set_first = resolve_target(first, series_tags);
                let set_second = resolve_target(second, series_tags);
                for inst_f in instances.iter().filter(|i| domain_keys.contains(&i.key) && set_first.contains(&i.series_id())) {
                    for inst_s in instances
                        .iter()
                        .filter(|i| domain_keys.contains(&i.key) && set_second.contains(&i.series_id()) && i.date() == inst_f.date() && i.key != inst_f.key)
                    {
                        arcs.push(Arc { target: inst_f.key, kind: ArcKind::BeforeUsesMax { other: inst_s.key } });
                        arcs.push(Arc { target: inst_s.key, kind: ArcKind::BeforeUsesMin { other: inst_f.key } });
                    }
                }
            }
            Constraint::Chain { .. } => {}
        }
    }

    arcs
}

pub(crate) fn revise(arc: &Arc, domains: &mut DomainMap, durations: &HashMap<InstanceKey, Minutes>) -> bool {
    match arc.kind {
        ArcKind::NoOverlap { other } => {
            let other_domain = match domains.get(&other) {
                Some(d) if !d.is_empty() => d.clone(),
                // Empty partner: constraint is trivially satisfied, no cascade (INV-8).
                _ => return false,
            };
            let dur_t = durations[&arc.target];
            let dur_o = durations[&other];
            let Some(target_domain) = domains.get_mut(&arc.target) else { return false };
            let before = target_domain.len();
            target_domain.retain(|&t| {
                let ti = Interval::new(t, dur_t);
                other_domain.iter().any(|&o| !ti.overlaps(&Interval::new(o, dur_o)))
            });
            target_domain.len() != before
        }
        ArcKind::BeforeUsesMax { other } => {
            let Some(max_other) = domains.get(&other).filter(|d| !d.is_empty()).and_then(|d| d.iter().max().copied()) else {
                return false;
            };
            let Some(target_domain) = domains.get_mut(&arc.target) else { return false };
            let before = target_domain.len();
            target_domain.retain(|&t| t < max_other);
            target_domain.len() != before
        }
        ArcKind::BeforeUsesMin { other } => {
            let Some(min_other) = domains.get(&other).filter(|d| !d.is_empty()).and_then(|d| d.iter().min().copied()) else {
                return false;
            };
            let Some(target_domain) = domains.get_mut(&arc.target) else { return false };
            let before = target_domain.len();
            target_domain.retain(|&t| t > min_other);
            target_domain.len() != before
        }
    }
}

/// `propagateConstraints(instances, domains, constraints)` (§4.5): runs AC-3
/// to a fixed point over the `noOverlap`/`mustBeBefore` arcs derived from
/// `constraints`, mutating `domains` in place. `series_tags` resolves
/// `ConstraintTarget::Tag` to the series ids currently carrying that tag.
pub fn propagate_constraints(instances: &[Instance], domains: &mut DomainMap, constraints: &[Constraint], series_tags: &HashMap<Uuid, Vec<String>>) {
    let domain_keys: HashSet<InstanceKey> = domains.keys().copied().collect();
    let arcs = build_arcs(instances, constraints, series_tags, &domain_keys);
    let seeds: Vec<usize> = (0..arcs.len()).collect();
    run_worklist(instances, domains, &arcs, &seeds);
}

/// Runs AC-3 to a fixed point, but seeds the worklist with only `seed_arcs`
/// (by index into `arcs`) instead of every arc. Used by the backtracking
/// search (C7) to restrict each node's propagation pass to arcs incident on
/// the variable it just assigned, rather than re-running full propagation.
pub(crate) fn run_worklist(instances: &[Instance], domains: &mut DomainMap, arcs: &[Arc], seed_arcs: &[usize]) {
    let durations: HashMap<InstanceKey, Minutes> = instances.iter().map(|i| (i.key, i.duration)).collect();

    let mut dependents: HashMap<InstanceKey, Vec<usize>> = HashMap::new();
    for (idx, arc) in arcs.iter().enumerate() {
        dependents.entry(arc.other()).or_default().push(idx);
    }

    let mut queue: VecDeque<usize> = seed_arcs.iter().copied().collect();
    let mut queued = vec![false; arcs.len()];
    for &idx in seed_arcs {
        queued[idx] = true;
    }

    while let Some(idx) = queue.pop_front() {
        queued[idx] = false;
        let changed = revise(&arcs[idx], domains, &durations);
        if changed {
            if let Some(deps) = dependents.get(&arcs[idx].target) {
                for &d in deps {
                    if !queued[d] {
                        queued[d] = true;
                        queue.push_back(d);
                    }
                }
            }
        }
    }
}

/// Arcs whose `target` or dependency is `var` — the restricted seed set for
/// incremental propagation after assigning `var` (§4.6).
pub(crate) fn arcs_incident_on(arcs: &[Arc], var: InstanceKey) -> Vec<usize> {
    arcs.iter()
        .enumerate()
        .filter(|(_, arc)| arc.target == var || arc.other() == var)
        .map(|(idx, _)| idx)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::InstanceKey;
    use crate::time::{LocalDate, LocalDateTime, LocalTime};

    fn date(y: i32, m: u32, d: u32) -> LocalDate {
        LocalDate::new(y, m, d).unwrap()
    }

    fn dt(y: i32, m: u32, d: u32, h: u32, mi: u32) -> LocalDateTime {
        date(y, m, d).at(LocalTime::new(h, mi, 0).unwrap())
    }

    fn flexible_instance(series_id: Uuid, duration: Minutes) -> Instance {
        Instance {
            key: InstanceKey { series_id, pattern_id: Uuid::new_v4(), date: date(2025, 1, 15) },
            ideal_time: dt(2025, 1, 15, 9, 0),
            duration,
            fixed: false,
            all_day: false,
            time_window: None,
            days_before: 0,
            days_after: 0,
            parent_id: None,
            chain_distance: None,
            early_wobble: None,
            late_wobble: None,
            title: None,
        }
    }

    #[test]
    fn no_overlap_prunes_colliding_pairs() {
        let sid_a = Uuid::new_v4();
        let sid_b = Uuid::new_v4();
        let a = flexible_instance(sid_a, 60);
        let b = flexible_instance(sid_b, 60);

        let mut domains = DomainMap::new();
        domains.insert(a.key, vec![dt(2025, 1, 15, 9, 0), dt(2025, 1, 15, 10, 0)]);
        domains.insert(b.key, vec![dt(2025, 1, 15, 9, 0)]);

        let constraints = vec![Constraint::NoOverlap { a: ConstraintTarget::Series(sid_a), b: ConstraintTarget::Series(sid_b) }];
        propagate_constraints(&[a.clone(), b.clone()], &mut domains, &constraints, &HashMap::new());

        // a@9:00 overlaps b's only value (9:00); a@10:00 does not.
        assert_eq!(domains.get(&a.key).unwrap(), &vec![dt(2025, 1, 15, 10, 0)]);
    }

    #[test]
    fn empty_partner_does_not_cascade_for_no_overlap() {
        let sid_a = Uuid::new_v4();
        let sid_b = Uuid::new_v4();
        let a = flexible_instance(sid_a, 60);
        let b = flexible_instance(sid_b, 60);

        let mut domains = DomainMap::new();
        domains.insert(a.key, vec![dt(2025, 1, 15, 9, 0), dt(2025, 1, 15, 10, 0)]);
        domains.insert(b.key, vec![]);

        let constraints = vec![Constraint::NoOverlap { a: ConstraintTarget::Series(sid_a), b: ConstraintTarget::Series(sid_b) }];
        propagate_constraints(&[a.clone(), b.clone()], &mut domains, &constraints, &HashMap::new());

        assert_eq!(domains.get(&a.key).unwrap().len(), 2);
    }

    #[test]
    fn must_be_before_prunes_both_sides() {
        let sid_a = Uuid::new_v4();
        let sid_b = Uuid::new_v4();
        let a = flexible_instance(sid_a, 30);
        let b = flexible_instance(sid_b, 30);

        let mut domains = DomainMap::new();
        domains.insert(a.key, vec![dt(2025, 1, 15, 9, 0), dt(2025, 1, 15, 11, 0)]);
        domains.insert(b.key, vec![dt(2025, 1, 15, 10, 0)]);

        let constraints = vec![Constraint::MustBeBefore { first: ConstraintTarget::Series(sid_a), second: ConstraintTarget::Series(sid_b) }];
        propagate_constraints(&[a.clone(), b.clone()], &mut domains, &constraints, &HashMap::new());

        // a must be strictly before max(dom(b))=10:00, so 11:00 is pruned.
        assert_eq!(domains.get(&a.key).unwrap(), &vec![dt(2025, 1, 15, 9, 0)]);
    }

    #[test]
    fn empty_partner_does_not_cascade_for_must_be_before() {
        let sid_a = Uuid::new_v4();
        let sid_b = Uuid::new_v4();
        let a = flexible_instance(sid_a, 30);
        let b = flexible_instance(sid_b, 30);

        let mut domains = DomainMap::new();
        domains.insert(a.key, vec![dt(2025, 1, 15, 9, 0)]);
        domains.insert(b.key, vec![]);

        let constraints = vec![Constraint::MustBeBefore { first: ConstraintTarget::Series(sid_a), second: ConstraintTarget::Series(sid_b) }];
        propagate_constraints(&[a.clone(), b.clone()], &mut domains, &constraints, &HashMap::new());

        assert_eq!(domains.get(&a.key).unwrap().len(), 1);
    }

    #[test]
    fn tag_targets_resolve_through_series_tags() {
        let sid_a = Uuid::new_v4();
        let sid_b = Uuid::new_v4();
        let a = flexible_instance(sid_a, 60);
        let b = flexible_instance(sid_b, 60);

        let mut domains = DomainMap::new();
        domains.insert(a.key, vec![dt(2025, 1, 15, 9, 0)]);
        domains.insert(b.key, vec![dt(2025, 1, 15, 9, 0)]);

        let mut tags = HashMap::new();
        tags.insert(sid_a, vec!["chores".to_string()]);
        tags.insert(sid_b, vec!["chores".to_string()]);

        let constraints = vec![Constraint::NoOverlap { a: ConstraintTarget::Tag("chores".into()), b: ConstraintTarget::Tag("chores".into()) }];
        propagate_constraints(&[a.clone(), b.clone()], &mut domains, &constraints, &tags);

        // Whichever arc revises first empties that side's domain; per INV-8
        // the now-empty side is an unplaceable partner and does not cascade
        // emptiness back onto the other, so exactly one domain ends up
        // empty and the other still holds its only candidate.
        let a_empty = domains.get(&a.key).unwrap().is_empty();
        let b_empty = domains.get(&b.key).unwrap().is_empty();
        assert_ne!(a_empty, b_empty, "exactly one side should be emptied, not both (INV-8 selective cascade)");
        if a_empty {
            assert_eq!(domains.get(&b.key).unwrap(), &vec![dt(2025, 1, 15, 9, 0)]);
        } else {
            assert_eq!(domains.get(&a.key).unwrap(), &vec![dt(2025, 1, 15, 9, 0)]);
        }
    }
}
