//! The driver (§6.1): `reflow(input) -> ReflowOutput`, composing every
//! pure stage from generation through search or fallback.

use std::collections::HashMap;

use uuid::Uuid;

use crate::chain::{
    build_chain_tree, completion_end_times, derive_child_time, prune_by_chain_shadow, ChainNode, ChainTree,
    CompletionEndTimes,
};
use crate::conflict::Conflict;
use crate::domain::compute_domains;
use crate::fallback;
use crate::instance::{generate_instances, GenerationInput, Instance, InstanceKey, SeriesWithPatterns};
use crate::models::{ChainLink, Completion, Constraint, InstanceException};
use crate::propagate::propagate_constraints;
use crate::search::{backtrack_search, SearchOptions};
use crate::time::{Interval, LocalDate, LocalDateTime, Minutes};

/// Borrowed view of one `reflow()` call's input, assembled by the façade from
/// a [`crate::repository::Snapshot`] (or directly, in tests).
#[derive(Debug, Clone, Copy)]
pub struct ReflowInput<'a> {
    pub series: &'a [SeriesWithPatterns],
    pub chain_links: &'a [ChainLink],
    pub constraints: &'a [Constraint],
    pub exceptions: &'a [InstanceException],
    pub completions: &'a [Completion],
    pub series_tags: &'a HashMap<Uuid, Vec<String>>,
    pub window_start: LocalDate,
    pub window_end: LocalDate,
    /// Optional `Map<LocalDate, minutesScheduled>` used for value-ordering
    /// workload balance (§4.6). `None` disables the workload tie-break.
    pub workload: Option<&'a HashMap<LocalDate, Minutes>>,
}

#[derive(Debug, Clone)]
pub struct Assignment {
    pub series_id: Uuid,
    pub pattern_id: Uuid,
    pub date: LocalDate,
    pub time: LocalDateTime,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ReflowOutput {
    pub assignments: Vec<Assignment>,
    pub conflicts: Vec<Conflict>,
}

/// `reflow(input)` (§6.1): the whole pipeline in one call.
///
/// `Input → generate_instances → compute_domains + build_chain_tree →
/// prune_by_chain_shadow → propagate_constraints → backtrack_search` →
/// (success) `complete_with_chain_children` | (null) `handle_no_solution`.
pub fn reflow(input: &ReflowInput<'_>) -> ReflowOutput {
    let gen_input = GenerationInput {
        series: input.series,
        chain_links: input.chain_links,
        exceptions: input.exceptions,
        completions: input.completions,
        window_start: input.window_start,
        window_end: input.window_end,
    };
    let instances = generate_instances(&gen_input);

    let mut domains = compute_domains(&instances);
    let chain_tree = build_chain_tree(&instances, input.chain_links);
    prune_by_chain_shadow(&mut domains, &chain_tree, &instances, input.completions);
    propagate_constraints(&instances, &mut domains, input.constraints, input.series_tags);

    let completion_ends = completion_end_times(input.completions);
    let options =
        SearchOptions { chain_tree: Some(&chain_tree), workload: input.workload, completion_end_times: Some(&completion_ends) };

    let (assignment, conflicts) = match backtrack_search(&instances, &domains, input.constraints, input.series_tags, &options) {
        Some(solved) => complete_with_chain_children(&solved, &instances, &chain_tree, &completion_ends),
        None => fallback::handle_no_solution(
            &instances,
            &domains,
            input.constraints,
            input.series_tags,
            Some(&chain_tree),
            &completion_ends,
        ),
    };

    let instance_by_key: HashMap<InstanceKey, &Instance> = instances.iter().map(|i| (i.key, i)).collect();
    let mut assignments: Vec<Assignment> = assignment
        .into_iter()
        .filter_map(|(key, time)| {
            let inst = *instance_by_key.get(&key)?;
            Some(Assignment {
                series_id: inst.series_id(),
                pattern_id: key.pattern_id,
                date: key.date,
                time,
                title: inst.title.clone(),
            })
        })
        .collect();
    assignments.sort_by(|a, b| (a.series_id, a.date, a.time).cmp(&(b.series_id, b.date, b.time)));

    ReflowOutput { assignments, conflicts }
}

/// Derives chain-child times from a successful search assignment (which is
/// keyed only on domain-participating, i.e. non-derived, instances) and
/// checks the derived slots against every already-placed interval, the way
/// [`fallback::handle_no_solution`] does for its own placements.
fn complete_with_chain_children(
    solved: &HashMap<InstanceKey, LocalDateTime>,
    instances: &[Instance],
    chain_tree: &ChainTree,
    completion_end_times: &CompletionEndTimes,
) -> (HashMap<InstanceKey, LocalDateTime>, Vec<Conflict>) {
    let instance_by_key: HashMap<InstanceKey, &Instance> = instances.iter().map(|i| (i.key, i)).collect();
    let mut assignment = solved.clone();
    let mut occupied: Vec<Interval> =
        solved.iter().map(|(k, &t)| Interval::new(t, instance_by_key[k].duration)).collect();
    let mut conflicts = Vec::new();

    let mut roots: Vec<InstanceKey> = solved.keys().copied().filter(|k| chain_tree.is_chain_parent(k)).collect();
    roots.sort();

    for root in roots {
        let start = assignment[&root];
        let duration = instance_by_key[&root].duration;
        derive_and_check(
            root,
            start,
            duration,
            chain_tree.children_of(&root),
            &instance_by_key,
            &mut assignment,
            &mut occupied,
            &mut conflicts,
            completion_end_times,
        );
    }

    (assignment, conflicts)
}

#[allow(clippy::too_many_arguments)]
fn derive_and_check(
    parent_key: InstanceKey,
    parent_start: LocalDateTime,
    parent_duration: Minutes,
    children: &[ChainNode],
    instance_by_key: &HashMap<InstanceKey, &Instance>,
    assignment: &mut HashMap<InstanceKey, LocalDateTime>,
    occupied: &mut Vec<Interval>,
    conflicts: &mut Vec<Conflict>,
    completion_end_times: &CompletionEndTimes,
) {
    for child in children {
        let derived = derive_child_time(parent_key, parent_start, parent_duration, child, occupied, completion_end_times);
        let interval = Interval::new(derived, child.duration);

        if occupied.iter().any(|o| o.overlaps(&interval)) {
            let parent_inst = instance_by_key[&parent_key];
            let child_inst = instance_by_key[&child.instance_key];
            conflicts.push(Conflict::chain_cannot_fit(&parent_key, parent_inst.series_id(), &child.instance_key, child_inst.series_id()));
        }

        assignment.insert(child.instance_key, derived);
        occupied.push(interval);

        derive_and_check(
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PatternKind, Series};
    use crate::time::LocalTime;

    fn date(y: i32, m: u32, d: u32) -> LocalDate {
        LocalDate::new(y, m, d).unwrap()
    }

    fn series(id: Uuid) -> Series {
        Series { id, title: "t".into(), start_date: None, end_date: None, locked: false, tags: vec![], cycling: None }
    }

    fn fixed_pattern(series_id: Uuid, time: LocalTime, duration: Minutes) -> crate::models::Pattern {
        crate::models::Pattern {
            id: Uuid::new_v4(),
            series_id,
            kind: PatternKind::Daily,
            time: Some(time),
            duration_minutes: duration,
            fixed: true,
            all_day: false,
            time_window: None,
            days_before: 0,
            days_after: 0,
            condition: None,
            adaptive_duration: false,
        }
    }

    #[test]
    fn two_non_overlapping_fixed_instances_yield_zero_conflicts() {
        let sid_a = Uuid::new_v4();
        let sid_b = Uuid::new_v4();
        let sp_a = SeriesWithPatterns {
            series: series(sid_a),
            patterns: vec![fixed_pattern(sid_a, LocalTime::new(9, 0, 0).unwrap(), 60)],
        };
        let sp_b = SeriesWithPatterns {
            series: series(sid_b),
            patterns: vec![fixed_pattern(sid_b, LocalTime::new(10, 0, 0).unwrap(), 60)],
        };

        let series_tags = HashMap::new();
        let input = ReflowInput {
            series: &[sp_a, sp_b],
            chain_links: &[],
            constraints: &[],
            exceptions: &[],
            completions: &[],
            series_tags: &series_tags,
            window_start: date(2025, 1, 15),
            window_end: date(2025, 1, 15),
            workload: None,
        };

        let output = reflow(&input);
        assert_eq!(output.assignments.len(), 2);
        assert!(output.conflicts.is_empty());
    }
}
