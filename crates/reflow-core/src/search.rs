//! Backtracking search (C7): finds a fully consistent assignment, if one exists.

use std::collections::HashMap;

use uuid::Uuid;

use crate::chain::{subtree_would_overlap, ChainTree, CompletionEndTimes};
use crate::domain::DomainMap;
use crate::instance::{Instance, InstanceKey};
use crate::models::Constraint;
use crate::propagate::{arcs_incident_on, build_arcs, run_worklist, Arc};
use crate::time::{Interval, LocalDate, LocalDateTime, Minutes};

/// Optional extras `backtrack_search` uses when the series being reflowed
/// has chains and/or a known workload map (§4.6).
#[derive(Default)]
pub struct SearchOptions<'a> {
    pub chain_tree: Option<&'a ChainTree>,
    pub workload: Option<&'a HashMap<LocalDate, Minutes>>,
    pub completion_end_times: Option<&'a CompletionEndTimes>,
}

/// `backtrackSearch(instances, domains, constraints, {chainTree?, workload?})` (§4.6).
///
/// Returns the complete assignment map, keyed only on domain-participating
/// instances, or `None` if no fully consistent assignment exists (the caller
/// then falls back to [`crate::fallback::handle_no_solution`]).
pub fn backtrack_search(
    instances: &[Instance],
    domains: &DomainMap,
    constraints: &[Constraint],
    series_tags: &HashMap<Uuid, Vec<String>>,
    options: &SearchOptions<'_>,
) -> Option<HashMap<InstanceKey, LocalDateTime>> {
    let instance_by_key: HashMap<InstanceKey, &Instance> = instances.iter().map(|i| (i.key, i)).collect();

    let fixed_occupied: Vec<Interval> = instances
        .iter()
        .filter(|i| i.fixed)
        .filter_map(|i| domains.get(&i.key).filter(|d| d.len() == 1).map(|d| Interval::new(d[0], i.duration)))
        .collect();

    // A fixed instance never moves (INV-1): two fixed instances that overlap
    // can never be reconciled, so no fully consistent solution exists at all.
    for (i, a) in fixed_occupied.iter().enumerate() {
        for b in &fixed_occupied[i + 1..] {
            if a.overlaps(b) {
                return None;
            }
        }
    }

    let domain_keys: std::collections::HashSet<InstanceKey> = domains.keys().copied().collect();
    let arcs = build_arcs(instances, constraints, series_tags, &domain_keys);

    let mut working = domains.clone();
    let mut assignment = HashMap::new();
    let empty_completion_end_times = CompletionEndTimes::new();
    let completion_end_times = options.completion_end_times.unwrap_or(&empty_completion_end_times);

    let solved = recurse(
        &mut working,
        &mut assignment,
        instances,
        &instance_by_key,
        &arcs,
        options.chain_tree,
        &fixed_occupied,
        options.workload,
        completion_end_times,
    );

    if solved {
        Some(assignment)
    } else {
        None
    }
}

#[allow(clippy::too_many_arguments)]
fn recurse(
    working: &mut DomainMap,
    assignment: &mut HashMap<InstanceKey, LocalDateTime>,
    instances: &[Instance],
    instance_by_key: &HashMap<InstanceKey, &Instance>,
    arcs: &[Arc],
    chain_tree: Option<&ChainTree>,
    fixed_occupied: &[Interval],
    workload: Option<&HashMap<LocalDate, Minutes>>,
    completion_end_times: &CompletionEndTimes,
) -> bool {
    let Some(var) = select_variable(working, assignment, instance_by_key, chain_tree) else {
        return true;
    };

    let inst = instance_by_key[&var];
    let mut candidates = working[&var].clone();
    order_candidates(&mut candidates, inst, workload);

    for candidate in candidates {
        if let Some(tree) = chain_tree {
            let children = tree.children_of(&var);
            let blocked = children
                .iter()
                .any(|child| subtree_would_overlap(var, candidate, inst.duration, child, fixed_occupied, completion_end_times));
            if blocked {
                continue;
            }
        }

        let saved = working.clone();
        working.insert(var, vec![candidate]);
        assignment.insert(var, candidate);

        let seed_arcs = arcs_incident_on(arcs, var);
        run_worklist(instances, working, arcs, &seed_arcs);

        let contradiction = working.iter().any(|(k, d)| !assignment.contains_key(k) && d.is_empty());
        if !contradiction
            && recurse(
                working,
                assignment,
                instances,
                instance_by_key,
                arcs,
                chain_tree,
                fixed_occupied,
                workload,
                completion_end_times,
            )
        {
            return true;
        }

        *working = saved;
        assignment.remove(&var);
    }

    false
}

fn select_variable(
    working: &DomainMap,
    assignment: &HashMap<InstanceKey, LocalDateTime>,
    instance_by_key: &HashMap<InstanceKey, &Instance>,
    chain_tree: Option<&ChainTree>,
) -> Option<InstanceKey> {
    let mut candidates: Vec<InstanceKey> = working.keys().copied().filter(|k| !assignment.contains_key(k)).collect();
    if candidates.is_empty() {
        return None;
    }

    let tier = |inst: &Instance| -> u8 {
        if inst.fixed {
            0
        } else if chain_tree.is_some_and(|t| t.is_chain_parent(&inst.key)) {
            1
        } else {
            2
        }
    };

    candidates.sort_by(|a, b| {
        let ia = instance_by_key[a];
        let ib = instance_by_key[b];
        let ta = tier(ia);
        let tb = tier(ib);
        ta.cmp(&tb)
            .then_with(|| {
                if ta == 2 {
                    working[a].len().cmp(&working[b].len())
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .then_with(|| ia.series_id().cmp(&ib.series_id()))
            .then_with(|| a.cmp(b))
    });

    Some(candidates[0])
}

fn order_candidates(candidates: &mut [LocalDateTime], inst: &Instance, workload: Option<&HashMap<LocalDate, Minutes>>) {
    candidates.sort_by(|a, b| {
        let da = a.diff_minutes(&inst.ideal_time).abs();
        let db = b.diff_minutes(&inst.ideal_time).abs();
        da.cmp(&db)
            .then_with(|| {
                let wa = workload.and_then(|w| w.get(&a.date())).copied().unwrap_or(0);
                let wb = workload.and_then(|w| w.get(&b.date())).copied().unwrap_or(0);
                wa.cmp(&wb)
            })
            .then_with(|| a.cmp(b))
    });
}
