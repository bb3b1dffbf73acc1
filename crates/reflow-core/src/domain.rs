//! Domain computation (C4): legal start times per non-derived instance.

use std::collections::HashMap;

use crate::instance::{Instance, InstanceKey};
use crate::time::{grid_points_inclusive, LocalTime, DEFAULT_WAKING_WINDOW};

pub type DomainMap = HashMap<InstanceKey, Vec<crate::time::LocalDateTime>>;

/// `computeDomains(instances) → Map<Instance, List<LocalDateTime>>` (§4.3).
///
/// All-day and chain-child instances are not keyed in the result: all-day
/// instances are excluded from reflow entirely (INV-2), and chain children
/// are derived variables, not domain-selected (§3).
pub fn compute_domains(instances: &[Instance]) -> DomainMap {
    let mut domains = DomainMap::new();

    for inst in instances {
        if inst.all_day || inst.is_chain_child() {
            continue;
        }

        if inst.fixed {
            domains.insert(inst.key, vec![inst.ideal_time]);
            continue;
        }

        domains.insert(inst.key, flexible_candidates(inst));
    }

    domains
}

fn flexible_candidates(inst: &Instance) -> Vec<crate::time::LocalDateTime> {
    let (win_start, win_end) = inst.time_window.unwrap_or((
        LocalTime::from_const(DEFAULT_WAKING_WINDOW.0),
        LocalTime::from_const(DEFAULT_WAKING_WINDOW.1),
    ));

    let mut candidates = Vec::new();
    let base_date = inst.date();

    for offset in -(inst.days_before as i64)..=(inst.days_after as i64) {
        let day = base_date.add_days(offset);
        let window_start_dt = day.at(win_start);
        let window_end_dt = day.at(win_end);

        for start in grid_points_inclusive(window_start_dt, window_end_dt) {
            // Instances must END within the window, not merely start within it.
            if start.add_minutes(inst.duration) <= window_end_dt {
                candidates.push(start);
            }
        }
    }

    candidates.sort();
    candidates.dedup();
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::InstanceKey;
    use crate::time::{LocalDate, LocalDateTime};
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> LocalDate {
        LocalDate::new(y, m, d).unwrap()
    }

    fn base_instance() -> Instance {
        Instance {
            key: InstanceKey { series_id: Uuid::new_v4(), pattern_id: Uuid::new_v4(), date: date(2025, 1, 15) },
            ideal_time: date(2025, 1, 15).at(LocalTime::new(9, 0, 0).unwrap()),
            duration: 60,
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
    fn fixed_instance_has_singleton_domain() {
        let mut inst = base_instance();
        inst.fixed = true;
        let domains = compute_domains(&[inst.clone()]);
        assert_eq!(domains.get(&inst.key).unwrap(), &vec![inst.ideal_time]);
    }

    #[test]
    fn all_day_instance_is_not_keyed() {
        let mut inst = base_instance();
        inst.all_day = true;
        let domains = compute_domains(&[inst.clone()]);
        assert!(domains.get(&inst.key).is_none());
    }

    #[test]
    fn chain_child_instance_is_not_keyed() {
        let mut inst = base_instance();
        inst.parent_id = Some(Uuid::new_v4());
        inst.chain_distance = Some(30);
        let domains = compute_domains(&[inst.clone()]);
        assert!(domains.get(&inst.key).is_none());
    }

    #[test]
    fn default_waking_window_excludes_late_start_that_would_end_after_23() {
        let mut inst = base_instance();
        inst.duration = 60;
        let domains = compute_domains(&[inst.clone()]);
        let candidates = domains.get(&inst.key).unwrap();
        let latest_start = date(2025, 1, 15).at(LocalTime::new(22, 0, 0).unwrap());
        assert!(candidates.contains(&latest_start));
        let too_late = date(2025, 1, 15).at(LocalTime::new(22, 30, 0).unwrap());
        assert!(!candidates.contains(&too_late));
    }

    #[test]
    fn explicit_time_window_restricts_candidates() {
        let mut inst = base_instance();
        inst.time_window = Some((LocalTime::new(9, 0, 0).unwrap(), LocalTime::new(10, 0, 0).unwrap()));
        inst.duration = 60;
        let domains = compute_domains(&[inst.clone()]);
        let candidates = domains.get(&inst.key).unwrap();
        // Only the 09:00 start both begins and ends within [09:00, 10:00].
        assert_eq!(candidates, &vec![date(2025, 1, 15).at(LocalTime::new(9, 0, 0).unwrap())]);
    }

    #[test]
    fn days_before_and_after_expand_search_range() {
        let mut inst = base_instance();
        inst.days_before = 1;
        inst.days_after = 1;
        inst.time_window = Some((LocalTime::new(9, 0, 0).unwrap(), LocalTime::new(9, 0, 0).unwrap()));
        inst.duration = 0;
        let domains = compute_domains(&[inst.clone()]);
        let candidates = domains.get(&inst.key).unwrap();
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0], date(2025, 1, 14).at(LocalTime::new(9, 0, 0).unwrap()));
        assert_eq!(candidates[2], date(2025, 1, 16).at(LocalTime::new(9, 0, 0).unwrap()));
    }

    #[test]
    fn grid_is_five_minutes() {
        let _ = LocalDateTime::new(date(2025, 1, 15), LocalTime::new(9, 0, 0).unwrap());
        let mut inst = base_instance();
        inst.time_window = Some((LocalTime::new(9, 0, 0).unwrap(), LocalTime::new(9, 15, 0).unwrap()));
        inst.duration = 0;
        let domains = compute_domains(&[inst.clone()]);
        assert_eq!(domains.get(&inst.key).unwrap().len(), 4);
    }
}
