//! Aggregate counts over the full (unfiltered, unpaged) job and worker sets.

use std::collections::BTreeMap;

use crate::job::Job;
use crate::worker::Worker;

/// A total plus counts grouped by a raw string key.
///
/// Keys are not normalised: `"Done"` and `"done"` are separate groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupCounts {
    pub total: u64,
    pub groups: BTreeMap<String, u64>,
}

impl GroupCounts {
    pub fn tally<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        let mut counts = Self::default();
        for key in keys {
            counts.total += 1;
            *counts.groups.entry(key.to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Build from pre-grouped rows (e.g. a `GROUP BY` result).
    pub fn from_groups(groups: impl IntoIterator<Item = (String, u64)>) -> Self {
        let groups: BTreeMap<String, u64> = groups.into_iter().collect();
        Self {
            total: groups.values().sum(),
            groups,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    /// Jobs grouped by status.
    pub jobs: GroupCounts,
    /// Workers grouped by role.
    pub workers: GroupCounts,
}

impl Stats {
    pub fn compute<'a>(
        jobs: impl IntoIterator<Item = &'a Job>,
        workers: impl IntoIterator<Item = &'a Worker>,
    ) -> Self {
        Self {
            jobs: GroupCounts::tally(jobs.into_iter().map(|j| j.status.as_str())),
            workers: GroupCounts::tally(workers.into_iter().map(|w| w.role.as_str())),
        }
    }
}
