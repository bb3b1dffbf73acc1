//! Best-effort fallback (C8): invoked when `backtrack_search` returns `None`.
//!
//! Unlike the solver, this phase is total: it must terminate with an
//! assignment for every non-all-day instance and with every detectable
//! conflict enumerated (§4.7).

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::chain::{derive_child_time, ChainNode, ChainTree, CompletionEndTimes};
use crate::conflict::Conflict;
use crate::domain::DomainMap;
use crate::instance::{Instance, InstanceKey};
use crate::models::{Constraint, ConstraintTarget};
use crate::time::{Interval, LocalDateTime, Minutes};

/// `handleNoSolution(instances, domains, constraints, chainTree?)` (§4.7).
pub fn handle_no_solution(
    instances: &[Instance],
    domains: &DomainMap,
    constraints: &[Constraint],
    series_tags: &HashMap<Uuid, Vec<String>>,
    chain_tree: Option<&ChainTree>,
    completion_end_times: &CompletionEndTimes,
) -> (HashMap<InstanceKey, LocalDateTime>, Vec<Conflict>) {
    let instance_by_key: HashMap<InstanceKey, &Instance> = instances.iter().map(|i| (i.key, i)).collect();
    let mut assignment: HashMap<InstanceKey, LocalDateTime> = HashMap::new();
    let mut occupied: Vec<(InstanceKey, Interval)> = Vec::new();
    let mut conflicts = Vec::new();

    let mut fixed_keys: Vec<InstanceKey> = instances.iter().filter(|i| i.fixed).map(|i| i.key).collect();
    fixed_keys.sort();

    // Step 1: place fixed instances at their ideal time; record fixed-fixed overlaps.
    for &key in &fixed_keys {
        let inst = instance_by_key[&key];
        let interval = Interval::new(inst.ideal_time, inst.duration);
        for (other_key, other_interval) in &occupied {
            if interval.overlaps(other_interval) {
                let other_inst = instance_by_key[other_key];
                conflicts.push(Conflict::overlap(&key, inst.series_id(), other_key, other_inst.series_id()));
            }
        }
        assignment.insert(key, inst.ideal_time);
        occupied.push((key, interval));
    }

    // Step 2: derive chain subtrees rooted at each fixed instance.
    if let Some(tree) = chain_tree {
        for &key in &fixed_keys {
            let start = assignment[&key];
            let duration = instance_by_key[&key].duration;
            derive_subtree(key, start, duration, tree.children_of(&key), &instance_by_key, &mut assignment, &mut occupied, &mut conflicts, completion_end_times);
        }
    }

    // Step 3/4: flexible instances in deterministic order (seriesId, then ideal time).
    let mut flex_keys: Vec<InstanceKey> =
        domains.keys().copied().filter(|k| !instance_by_key[k].fixed).collect();
    flex_keys.sort_by(|a, b| {
        let ia = instance_by_key[a];
        let ib = instance_by_key[b];
        ia.series_id().cmp(&ib.series_id()).then_with(|| ia.ideal_time.cmp(&ib.ideal_time)).then_with(|| a.cmp(b))
    });

    for key in flex_keys {
        let inst = instance_by_key[&key];
        let candidates = &domains[&key];

        if candidates.is_empty() {
            conflicts.push(Conflict::no_valid_slot(&key, inst.series_id()));
            let interval = Interval::new(inst.ideal_time, inst.duration);
            assignment.insert(key, inst.ideal_time);
            occupied.push((key, interval));
            if let Some(tree) = chain_tree {
                derive_subtree(key, inst.ideal_time, inst.duration, tree.children_of(&key), &instance_by_key, &mut assignment, &mut occupied, &mut conflicts, completion_end_times);
            }
            continue;
        }

        let clear = candidates.iter().copied().find(|&c| {
            let interval = Interval::new(c, inst.duration);
            !occupied.iter().any(|(_, o)| o.overlaps(&interval))
        });

        let chosen = match clear {
            Some(c) => c,
            None => {
                let best = candidates
                    .iter()
                    .copied()
                    .min_by_key(|c| c.diff_minutes(&inst.ideal_time).abs())
                    .expect("checked non-empty above");
                let interval = Interval::new(best, inst.duration);
                for (other_key, other_interval) in &occupied {
                    if interval.overlaps(other_interval) {
                        let other_inst = instance_by_key[other_key];
                        conflicts.push(Conflict::overlap(&key, inst.series_id(), other_key, other_inst.series_id()));
                    }
                }
                best
            }
        };

        assignment.insert(key, chosen);
        occupied.push((key, Interval::new(chosen, inst.duration)));

        if let Some(tree) = chain_tree {
            derive_subtree(key, chosen, inst.duration, tree.children_of(&key), &instance_by_key, &mut assignment, &mut occupied, &mut conflicts, completion_end_times);
        }
    }

    // Step 5: scan the final assignment for relational-constraint violations.
    check_constraint_violations(&assignment, &instance_by_key, constraints, series_tags, &mut conflicts);

    (assignment, conflicts)
}

#[allow(clippy::too_many_arguments)]
fn derive_subtree(
    parent_key: InstanceKey,
    parent_start: LocalDateTime,
    parent_duration: Minutes,
    children: &[ChainNode],
    instance_by_key: &HashMap<InstanceKey, &Instance>,
    assignment: &mut HashMap<InstanceKey, LocalDateTime>,
    occupied: &mut Vec<(InstanceKey, Interval)>,
    conflicts: &mut Vec<Conflict>,
    completion_end_times: &CompletionEndTimes,
) {
    for child in children {
        let occupied_intervals: Vec<Interval> = occupied.iter().map(|(_, iv)| *iv).collect();
        let derived = derive_child_time(parent_key, parent_start, parent_duration, child, &occupied_intervals, completion_end_times);
        let interval = Interval::new(derived, child.duration);

        if occupied_intervals.iter().any(|o| o.overlaps(&interval)) {
            let parent_inst = instance_by_key[&parent_key];
            let child_inst = instance_by_key[&child.instance_key];
            conflicts.push(Conflict::chain_cannot_fit(&parent_key, parent_inst.series_id(), &child.instance_key, child_inst.series_id()));
        }

        assignment.insert(child.instance_key, derived);
        occupied.push((child.instance_key, interval));

        derive_subtree(
            child.instance_key,
            derived,
            child.duration,
            &child.children,
            instance_by_key,
            assignment,
            occupied,
            conflicts,
            completion_end_times,
        );
    }
}

fn resolve_target(target: &ConstraintTarget, series_tags: &HashMap<Uuid, Vec<String>>) -> HashSet<Uuid> {
    match target {
        ConstraintTarget::Series(id) => std::iter::once(*id).collect(),
        ConstraintTarget::Tag(tag) => series_tags.iter().filter(|(_, tags)| tags.contains(tag)).map(|(id, _)| *id).collect(),
    }
}

fn check_constraint_violations(
    assignment: &HashMap<InstanceKey, LocalDateTime>,
    instance_by_key: &HashMap<InstanceKey, &Instance>,
    constraints: &[Constraint],
    series_tags: &HashMap<Uuid, Vec<String>>,
    conflicts: &mut Vec<Conflict>,
) {
    for constraint in constraints {
        match constraint {
            Constraint::NoOverlap { a, b } => {
                let set_a = resolve_target(a, series_tags);
                let set_b = resolve_target(b, series_tags);
                let mut seen: HashSet<(InstanceKey, InstanceKey)> = HashSet::new();

                for (&key_a, &time_a) in assignment.iter().filter(|(k, _)| set_a.contains(&instance_by_key[k].series_id())) {
                    let inst_a = instance_by_key[&key_a];
                    let interval_a = Interval::new(time_a, inst_a.duration);

                    for (&key_b, &time_b) in assignment.iter().filter(|(k, _)| {
                        **k != key_a && set_b.contains(&instance_by_key[k].series_id())
                    }) {
                        let inst_b = instance_by_key[&key_b];
                        if inst_a.date() != inst_b.date() {
                            continue;
                        }
                        let interval_b = Interval::new(time_b, inst_b.duration);
                        if !interval_a.overlaps(&interval_b) {
                            continue;
                        }
                        let pair = (key_a.min(key_b), key_a.max(key_b));
                        if !seen.insert(pair) {
                            continue;
                        }
                        conflicts.push(Conflict::constraint_violation(
                            format!("noOverlap violated between series {} and series {}", inst_a.series_id(), inst_b.series_id()),
                            vec![inst_a.series_id(), inst_b.series_id()],
                            vec![key_a, key_b],
                        ));
                    }
                }
            }
            Constraint::MustBeBefore { first, second } => {
                let set_first = resolve_target(first, series_tags);
                let set_second = resolve_target(second, series_tags);

                for (&key_f, &time_f) in assignment.iter().filter(|(k, _)| set_first.contains(&instance_by_key[k].series_id())) {
                    let inst_f = instance_by_key[&key_f];

                    for (&key_s, &time_s) in assignment.iter().filter(|(k, _)| {
                        **k != key_f && set_second.contains(&instance_by_key[k].series_id())
                    }) {
                        let inst_s = instance_by_key[&key_s];
                        if inst_f.date() != inst_s.date() {
                            continue;
                        }
                        if time_f < time_s {
                            continue;
                        }
                        conflicts.push(Conflict::constraint_violation(
                            format!("mustBeBefore violated: series {} is not before series {}", inst_f.series_id(), inst_s.series_id()),
                            vec![inst_f.series_id(), inst_s.series_id()],
                            vec![key_f, key_s],
                        ));
                    }
                }
            }
            Constraint::Chain { .. } => {}
        }
    }
}
