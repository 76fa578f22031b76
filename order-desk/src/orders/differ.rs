//! Active-set snapshot differ
//!
//! Only membership of the active-id set matters: status changes among orders
//! that stay active are a plain refresh, not an arrival.

use std::collections::HashSet;

use shared::models::Order;

/// Result of comparing a new snapshot with the previously known ids
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffResult {
    /// Orders not present in the previous known set, in snapshot order
    pub arrived: Vec<Order>,
    /// Ids that were known but are no longer active
    pub departed: Vec<String>,
    /// Known ids after this snapshot (exactly the ids in the snapshot)
    pub still_known: HashSet<String>,
}

impl DiffResult {
    pub fn has_arrivals(&self) -> bool {
        !self.arrived.is_empty()
    }
}

/// Compare `snapshot` with `previous`
///
/// `previous == None` means the differ has not been seeded yet: the snapshot
/// only seeds the known set and nothing is reported as arrived.
pub fn diff(previous: Option<&HashSet<String>>, snapshot: &[Order]) -> DiffResult {
    let still_known: HashSet<String> = snapshot.iter().map(|o| o.id.clone()).collect();

    let Some(previous) = previous else {
        return DiffResult {
            arrived: Vec::new(),
            departed: Vec::new(),
            still_known,
        };
    };

    let mut seen = HashSet::new();
    let arrived = snapshot
        .iter()
        .filter(|o| !previous.contains(&o.id) && seen.insert(o.id.as_str()))
        .cloned()
        .collect();

    let mut departed: Vec<String> = previous
        .iter()
        .filter(|id| !still_known.contains(*id))
        .cloned()
        .collect();
    departed.sort();

    DiffResult {
        arrived,
        departed,
        still_known,
    }
}

/// Stateful differ owned by one reconciler
#[derive(Debug, Default)]
pub struct SnapshotDiffer {
    known: Option<HashSet<String>>,
    /// Id and creation time of the newest order seen so far
    latest: Option<(String, i64)>,
}

impl SnapshotDiffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_seeded(&self) -> bool {
        self.known.is_some()
    }

    pub fn known_ids(&self) -> Option<&HashSet<String>> {
        self.known.as_ref()
    }

    pub fn latest(&self) -> Option<(&str, i64)> {
        self.latest.as_ref().map(|(id, at)| (id.as_str(), *at))
    }

    /// Diff against the known set and adopt the snapshot as the new known set
    pub fn apply(&mut self, snapshot: &[Order]) -> DiffResult {
        let result = diff(self.known.as_ref(), snapshot);
        self.known = Some(result.still_known.clone());

        if let Some(newest) = snapshot.iter().max_by_key(|o| o.created_at)
            && self.latest.as_ref().is_none_or(|(_, at)| newest.created_at > *at)
        {
            self.latest = Some((newest.id.clone(), newest.created_at));
        }
        result
    }

    /// Forget everything; the next snapshot seeds again
    pub fn reset(&mut self) {
        self.known = None;
        self.latest = None;
    }
}
