//! Chain tree construction, derived-time computation, and shadow pruning (C5).

use std::collections::HashMap;

use crate::domain::DomainMap;
use crate::instance::{Instance, InstanceKey};
use crate::models::{ChainLink, Completion};
use crate::time::{grid_points_inclusive, Interval, LocalDate, LocalDateTime, Minutes};
use uuid::Uuid;

/// `(seriesId, instanceDate) → loggedCompletion.endTime`, consulted wherever
/// a chain node's own `parentEnd` is computed (§3 `chain` constraint, INV-3):
/// `parentEnd` is the completion's `endTime` when one has been logged for
/// that instance, else `start + duration`.
pub type CompletionEndTimes = HashMap<(Uuid, LocalDate), LocalDateTime>;

pub fn completion_end_times(completions: &[Completion]) -> CompletionEndTimes {
    completions.iter().filter_map(|c| c.end_time.map(|end| ((c.series_id, c.instance_date), end))).collect()
}

fn effective_end(
    key: InstanceKey,
    start: LocalDateTime,
    duration: Minutes,
    completion_end_times: &CompletionEndTimes,
) -> LocalDateTime {
    completion_end_times.get(&(key.series_id(), key.date())).copied().unwrap_or_else(|| start.add_minutes(duration))
}

/// One chain-child node, with its own subtree of further descendants.
#[derive(Debug, Clone)]
pub struct ChainNode {
    pub instance_key: InstanceKey,
    pub distance: Minutes,
    pub early_wobble: Minutes,
    pub late_wobble: Minutes,
    pub duration: Minutes,
    pub children: Vec<ChainNode>,
}

/// Parent→children forest, keyed by the parent's [`InstanceKey`]. Series not
/// appearing as a parent have no entry (§4.4).
#[derive(Debug, Clone, Default)]
pub struct ChainTree {
    children_by_parent: HashMap<InstanceKey, Vec<ChainNode>>,
}

impl ChainTree {
    pub fn children_of(&self, parent: &InstanceKey) -> &[ChainNode] {
        self.children_by_parent.get(parent).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_chain_parent(&self, key: &InstanceKey) -> bool {
        self.children_by_parent.contains_key(key)
    }

    pub fn parents(&self) -> impl Iterator<Item = &InstanceKey> {
        self.children_by_parent.keys()
    }
}

/// `buildChainTree(instances, chainLinks) → ChainTree` (§4.4). Parent and
/// child instances are paired by occurring on the same date: a chain link
/// models a same-occasion offset (e.g. "fold 30 minutes after wash"), not a
/// cross-date relationship.
pub fn build_chain_tree(instances: &[Instance], chain_links: &[ChainLink]) -> ChainTree {
    let by_series_date: HashMap<(Uuid, LocalDate), &Instance> =
        instances.iter().map(|i| ((i.series_id(), i.date()), i)).collect();

    fn build_node(
        parent_key: InstanceKey,
        chain_links: &[ChainLink],
        by_series_date: &HashMap<(Uuid, LocalDate), &Instance>,
    ) -> Vec<ChainNode> {
        chain_links
            .iter()
            .filter(|l| l.parent_id == parent_key.series_id)
            .filter_map(|l| {
                let child_inst = *by_series_date.get(&(l.child_id, parent_key.date))?;
                let children = build_node(child_inst.key, chain_links, by_series_date);
                Some(ChainNode {
                    instance_key: child_inst.key,
                    distance: l.distance_minutes,
                    early_wobble: l.early_wobble_minutes,
                    late_wobble: l.late_wobble_minutes,
                    duration: child_inst.duration,
                    children,
                })
            })
            .collect()
    }

    let mut children_by_parent = HashMap::new();
    for inst in instances {
        let nodes = build_node(inst.key, chain_links, &by_series_date);
        if !nodes.is_empty() {
            children_by_parent.insert(inst.key, nodes);
        }
    }
    ChainTree { children_by_parent }
}

/// `deriveChildTime(parentStart, parentDuration, childNode, occupiedRanges)` (§4.4).
///
/// `parentEnd` is the parent instance's logged completion `endTime` when one
/// exists for `(parent_key.series_id, parent_key.date)`, else
/// `parent_start + parent_duration` (§3 `chain` constraint, INV-3).
///
/// Falls back silently to `target` when every candidate in the wobble window
/// overlaps an occupier (§9 "Silent fallback"): the fallback phase (C8) is
/// responsible for detecting and reporting the resulting overlap.
pub fn derive_child_time(
    parent_key: InstanceKey,
    parent_start: LocalDateTime,
    parent_duration: Minutes,
    node: &ChainNode,
    occupied: &[Interval],
    completion_end_times: &CompletionEndTimes,
) -> LocalDateTime {
    let parent_end = effective_end(parent_key, parent_start, parent_duration, completion_end_times);
    let target = parent_end.add_minutes(node.distance);
    best_candidate(target, node, occupied).unwrap_or(target)
}

fn best_candidate(target: LocalDateTime, node: &ChainNode, occupied: &[Interval]) -> Option<LocalDateTime> {
    let window_start = target.add_minutes(-node.early_wobble);
    let window_end = target.add_minutes(node.late_wobble);
    let mut candidates = grid_points_inclusive(window_start, window_end);
    candidates.sort_by_key(|c| c.diff_minutes(&target).abs());

    candidates.into_iter().find(|&c| {
        let interval = Interval::new(c, node.duration);
        !occupied.iter().any(|o| o.overlaps(&interval))
    })
}

/// Whether placing `node`'s subtree under a parent (keyed by `parent_key`,
/// starting at `parent_start`) would, for at least one descendant, have no
/// clear slot in its wobble window against `occupied` — i.e. the silent
/// fallback in [`derive_child_time`] would trigger somewhere in the subtree.
pub(crate) fn subtree_would_overlap(
    parent_key: InstanceKey,
    parent_start: LocalDateTime,
    parent_duration: Minutes,
    node: &ChainNode,
    occupied: &[Interval],
    completion_end_times: &CompletionEndTimes,
) -> bool {
    let parent_end = effective_end(parent_key, parent_start, parent_duration, completion_end_times);
    let target = parent_end.add_minutes(node.distance);
    match best_candidate(target, node, occupied) {
        None => true,
        Some(child_start) => node
            .children
            .iter()
            .any(|child| subtree_would_overlap(node.instance_key, child_start, node.duration, child, occupied, completion_end_times)),
    }
}

/// `pruneByChainShadow(domains, chainTree, allInstances)` (§4.4): removes
/// parent domain values whose derived descendants would collide with a fixed
/// occupier, before search ever explores them.
pub fn prune_by_chain_shadow(
    domains: &mut DomainMap,
    chain_tree: &ChainTree,
    instances: &[Instance],
    completions: &[Completion],
) {
    let occupied: Vec<Interval> = instances
        .iter()
        .filter(|i| i.fixed)
        .filter_map(|i| {
            domains
                .get(&i.key)
                .filter(|d| d.len() == 1)
                .map(|d| Interval::new(d[0], i.duration))
        })
        .collect();

    let duration_by_key: HashMap<InstanceKey, Minutes> = instances.iter().map(|i| (i.key, i.duration)).collect();
    let completion_end_times = completion_end_times(completions);

    for parent_key in chain_tree.parents().cloned().collect::<Vec<_>>() {
        let children = chain_tree.children_of(&parent_key);
        if children.is_empty() {
            continue;
        }
        let Some(&parent_duration) = duration_by_key.get(&parent_key) else { continue };
        if let Some(domain) = domains.get_mut(&parent_key) {
            domain.retain(|&start| {
                !children.iter().any(|child| {
                    subtree_would_overlap(parent_key, start, parent_duration, child, &occupied, &completion_end_times)
                })
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::InstanceKey;
    use crate::time::LocalTime;

    fn date(y: i32, m: u32, d: u32) -> LocalDate {
        LocalDate::new(y, m, d).unwrap()
    }

    fn dt(y: i32, m: u32, d: u32, h: u32, mi: u32) -> LocalDateTime {
        date(y, m, d).at(LocalTime::new(h, mi, 0).unwrap())
    }

    fn instance(series_id: Uuid, date: LocalDate, ideal: LocalDateTime, duration: Minutes, fixed: bool, parent: Option<Uuid>, distance: Option<Minutes>) -> Instance {
        Instance {
            key: InstanceKey { series_id, pattern_id: Uuid::new_v4(), date },
            ideal_time: ideal,
            duration,
            fixed,
            all_day: false,
            time_window: None,
            days_before: 0,
            days_after: 0,
            parent_id: parent,
            chain_distance: distance,
            early_wobble: Some(0),
            late_wobble: Some(0),
            title: None,
        }
    }

    #[test]
    fn chain_distance_zero_derives_immediately_after_parent() {
        // Scenario 3: A fixed 09:00-60min; B chain-child of A, distance=0, wobble=0.
        let parent_key = InstanceKey { series_id: Uuid::new_v4(), pattern_id: Uuid::new_v4(), date: date(2025, 1, 15) };
        let node = ChainNode {
            instance_key: InstanceKey { series_id: Uuid::new_v4(), pattern_id: Uuid::new_v4(), date: date(2025, 1, 15) },
            distance: 0,
            early_wobble: 0,
            late_wobble: 0,
            duration: 60,
            children: vec![],
        };
        let parent_start = dt(2025, 1, 15, 9, 0);
        let derived = derive_child_time(parent_key, parent_start, 60, &node, &[], &CompletionEndTimes::new());
        assert_eq!(derived, dt(2025, 1, 15, 10, 0));
    }

    #[test]
    fn falls_back_to_target_when_wobble_window_fully_blocked() {
        let parent_key = InstanceKey { series_id: Uuid::new_v4(), pattern_id: Uuid::new_v4(), date: date(2025, 1, 15) };
        let node = ChainNode {
            instance_key: InstanceKey { series_id: Uuid::new_v4(), pattern_id: Uuid::new_v4(), date: date(2025, 1, 15) },
            distance: 0,
            early_wobble: 10,
            late_wobble: 10,
            duration: 15,
            children: vec![],
        };
        let parent_start = dt(2025, 1, 15, 9, 0);
        let target = dt(2025, 1, 15, 10, 0);
        let occupier = Interval::new(dt(2025, 1, 15, 9, 45), 30); // blocks the whole [9:50, 10:10] window
        let derived = derive_child_time(parent_key, parent_start, 60, &node, &[occupier], &CompletionEndTimes::new());
        assert_eq!(derived, target);
    }

    #[test]
    fn logged_completion_end_time_overrides_start_plus_duration_for_parent_end() {
        // INV-3: parentEnd is the completion's endTime when one was logged,
        // not start + duration, even though the two differ here (a 60-minute
        // slot finished 15 minutes early).
        let parent_key = InstanceKey { series_id: Uuid::new_v4(), pattern_id: Uuid::new_v4(), date: date(2025, 1, 15) };
        let node = ChainNode {
            instance_key: InstanceKey { series_id: Uuid::new_v4(), pattern_id: Uuid::new_v4(), date: date(2025, 1, 15) },
            distance: 0,
            early_wobble: 0,
            late_wobble: 0,
            duration: 15,
            children: vec![],
        };
        let parent_start = dt(2025, 1, 15, 9, 0);
        let mut completion_end_times = CompletionEndTimes::new();
        completion_end_times.insert((parent_key.series_id(), parent_key.date()), dt(2025, 1, 15, 9, 45));

        let derived = derive_child_time(parent_key, parent_start, 60, &node, &[], &completion_end_times);
        assert_eq!(derived, dt(2025, 1, 15, 9, 45));
    }

    #[test]
    fn build_chain_tree_pairs_parent_and_child_on_the_same_date() {
        let parent_id = Uuid::new_v4();
        let child_id = Uuid::new_v4();
        let parent = instance(parent_id, date(2025, 1, 15), dt(2025, 1, 15, 9, 0), 60, true, None, None);
        let child = instance(child_id, date(2025, 1, 15), dt(2025, 1, 15, 9, 0), 15, false, Some(parent_id), Some(0));
        let links = vec![ChainLink { parent_id, child_id, distance_minutes: 0, early_wobble_minutes: 0, late_wobble_minutes: 0 }];
        let tree = build_chain_tree(&[parent.clone(), child.clone()], &links);
        assert!(tree.is_chain_parent(&parent.key));
        assert_eq!(tree.children_of(&parent.key).len(), 1);
        assert_eq!(tree.children_of(&parent.key)[0].instance_key, child.key);
    }
}
