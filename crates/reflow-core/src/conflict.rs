//! Conflict taxonomy (C9).

use uuid::Uuid;

use crate::instance::InstanceKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// §4.8. `ChainCannotFit` is kept distinct from `Overlap` rather than
/// subsumed into it — see DESIGN.md's Open Question resolutions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    Overlap,
    ConstraintViolation,
    NoValidSlot,
    ChainCannotFit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub severity: Severity,
    pub message: String,
    pub series_ids: Vec<Uuid>,
    pub instances: Vec<InstanceKey>,
}

impl Conflict {
    pub fn overlap(a: &InstanceKey, a_series: Uuid, b: &InstanceKey, b_series: Uuid) -> Self {
        Conflict {
            kind: ConflictKind::Overlap,
            severity: Severity::Warning,
            message: format!("series {a_series} and series {b_series} overlap"),
            series_ids: vec![a_series, b_series],
            instances: vec![*a, *b],
        }
    }

    pub fn chain_cannot_fit(parent: &InstanceKey, parent_series: Uuid, child: &InstanceKey, child_series: Uuid) -> Self {
        Conflict {
            kind: ConflictKind::ChainCannotFit,
            severity: Severity::Warning,
            message: format!("chain child in series {child_series} could not fit within its wobble window of parent series {parent_series}"),
            series_ids: vec![parent_series, child_series],
            instances: vec![*parent, *child],
        }
    }

    pub fn no_valid_slot(instance: &InstanceKey, series: Uuid) -> Self {
        Conflict {
            kind: ConflictKind::NoValidSlot,
            severity: Severity::Warning,
            message: format!("series {series} has no valid slot for its instance on {}", instance.date),
            series_ids: vec![series],
            instances: vec![*instance],
        }
    }

    pub fn constraint_violation(message: String, series_ids: Vec<Uuid>, instances: Vec<InstanceKey>) -> Self {
        Conflict { kind: ConflictKind::ConstraintViolation, severity: Severity::Error, message, series_ids, instances }
    }
}
