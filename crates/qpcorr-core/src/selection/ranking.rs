use super::window::WindowCandidate;
use crate::domain::Plane;
use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap};

/// Heap entry ordered so that the best candidate is the greatest: higher beta,
/// then lexically smaller name, then nearer to the IP, then smaller row.
#[derive(Debug)]
struct RankedCandidate<'a> {
    beta: f64,
    candidate: WindowCandidate<'a>,
}

impl RankedCandidate<'_> {
    fn name(&self) -> &str {
        &self.candidate.element.name
    }

    fn distance(&self) -> usize {
        self.candidate.offset.unsigned_abs()
    }
}

impl Ord for RankedCandidate<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.beta
            .total_cmp(&other.beta)
            .then_with(|| other.name().cmp(self.name()))
            .then_with(|| other.distance().cmp(&self.distance()))
            .then_with(|| other.candidate.element.row.cmp(&self.candidate.element.row))
    }
}

impl PartialOrd for RankedCandidate<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RankedCandidate<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RankedCandidate<'_> {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Shortage {
    pub(super) found: usize,
}

/// Pops the highest-beta candidates of `plane` until `count` unclaimed names
/// are taken. Picks come back in ranking order and are added to `claimed`.
pub(super) fn pick_unclaimed<'a>(
    window: &[WindowCandidate<'a>],
    plane: Plane,
    count: usize,
    claimed: &mut BTreeSet<String>,
) -> Result<Vec<WindowCandidate<'a>>, Shortage> {
    let mut queue: BinaryHeap<RankedCandidate<'a>> = window
        .iter()
        .map(|candidate| RankedCandidate {
            beta: candidate.element.beta(plane),
            candidate: *candidate,
        })
        .collect();

    let mut picks = Vec::with_capacity(count);
    while picks.len() < count {
        let Some(best) = queue.pop() else {
            return Err(Shortage { found: picks.len() });
        };
        if !claimed.insert(best.name().to_string()) {
            continue;
        }
        picks.push(best.candidate);
    }

    Ok(picks)
}
