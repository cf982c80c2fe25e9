// Group Resolver
// Partitions steps into ordered execution groups keyed by parallel_group

use crate::model::Step;

use indexmap::IndexMap;

/// Steps that execute concurrently, in the order they were listed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepGroup<'a> {
    pub key: &'a str,
    pub steps: Vec<&'a Step>,
}

impl StepGroup<'_> {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Resolve execution groups in a single pass.
///
/// Group order is the order in which each key first appears; within a group
/// steps keep their input order. Every step lands in exactly one group.
pub fn resolve_groups<'a>(steps: impl IntoIterator<Item = &'a Step>) -> Vec<StepGroup<'a>> {
    let mut groups: IndexMap<&'a str, Vec<&'a Step>> = IndexMap::new();

    for step in steps {
        groups.entry(step.group_key()).or_default().push(step);
    }

    groups
        .into_iter()
        .map(|(key, steps)| StepGroup { key, steps })
        .collect()
}
