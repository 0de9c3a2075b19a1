use std::collections::HashSet;

use crate::error::Result;
use crate::geometry::End;
use crate::math::{distance_sq, Point2};

use super::fragments::{FragmentId, FragmentSet};
use super::observer::{Progress, RunContext};
use super::pairing::{CandidateKind, EndpointPairingIndex, Site};

/// End pairings tried between fragments `i` and `j`, as `(end of i, end of j)`.
///
/// `(Start, End)` covers the case where both fragments would be reversed
/// before appending `j` to `i`: it is the same join as appending `i` to `j`.
const ORIENTATIONS: [(End, End); 4] = [
    (End::End, End::Start),
    (End::Start, End::End),
    (End::End, End::End),
    (End::Start, End::Start),
];

/// Target-frame end points of one open fragment.
#[derive(Debug, Clone, Copy)]
struct Ends {
    id: FragmentId,
    start: Point2,
    end: Point2,
    len: usize,
}

impl Ends {
    fn point(&self, end: End) -> Point2 {
        match end {
            End::Start => self.start,
            End::End => self.end,
        }
    }
}

/// Fills `index` with the best pairing of every open fragment end.
///
/// The first pass offers every pair. Later passes only revisit fragments
/// with a site that lost its candidate during the previous pass: every
/// other site's best distance can only have shrunk, so offers rejected
/// there stay rejected. Once no site was freed every candidate is settled.
///
/// Sites in `pinned` are never paired.
///
/// # Errors
///
/// Returns [`AssemblyError::Cancelled`](crate::error::AssemblyError::Cancelled)
/// if cancellation is requested, or a transform error if an end point
/// cannot be brought into the target frame.
pub(crate) fn converge(
    fragments: &FragmentSet,
    index: &mut EndpointPairingIndex,
    pinned: &HashSet<Site>,
    ctx: &mut RunContext<'_>,
) -> Result<()> {
    let ends = collect_ends(fragments)?;
    let max_passes = ctx.params.max_passes;
    let mut dirty: HashSet<FragmentId> = ends.iter().map(|e| e.id).collect();
    let mut passes = 0;

    while !dirty.is_empty() {
        ctx.check_cancelled()?;
        if passes >= max_passes {
            tracing::warn!(max_passes, "stitching pass limit reached before convergence");
            break;
        }
        let accepted = stitch_pass(&ends, index, &mut dirty, pinned, ctx)?;
        passes += 1;
        ctx.passes += 1;
        ctx.observer.on_pass(ctx.passes);
        ctx.observer.on_status(Progress {
            passes: ctx.passes,
            remaining: ends.len(),
        });
        tracing::debug!(
            pass = ctx.passes,
            accepted,
            revisit = dirty.len(),
            fragments = ends.len(),
            candidates = index.len(),
            "stitching pass finished"
        );
    }

    index.settle_all();
    Ok(())
}

fn collect_ends(fragments: &FragmentSet) -> Result<Vec<Ends>> {
    let mut ends = Vec::new();
    for id in fragments.open_ids() {
        let Some(line) = fragments.get(id) else {
            continue;
        };
        if let (Some(start), Some(end)) = (line.first_point()?, line.last_point()?) {
            ends.push(Ends {
                id,
                start,
                end,
                len: line.len(),
            });
        }
    }
    Ok(ends)
}

/// Offers every candidate involving a dirty fragment and refills `dirty`
/// with the fragments whose sites were freed. Returns the number of
/// accepted offers.
fn stitch_pass(
    ends: &[Ends],
    index: &mut EndpointPairingIndex,
    dirty: &mut HashSet<FragmentId>,
    pinned: &HashSet<Site>,
    ctx: &RunContext<'_>,
) -> Result<usize> {
    let current = std::mem::take(dirty);
    let mut pass = Pass {
        index,
        dirty,
        pinned,
        accepted: 0,
    };

    for (i, fi) in ends.iter().enumerate() {
        ctx.check_cancelled()?;
        let i_dirty = current.contains(&fi.id);

        if i_dirty && fi.len >= 3 {
            pass.offer(
                Site::new(fi.id, End::Start),
                Site::new(fi.id, End::End),
                distance_sq(&fi.start, &fi.end),
                CandidateKind::Closing,
            );
        }

        for fj in &ends[i + 1..] {
            if !i_dirty && !current.contains(&fj.id) {
                continue;
            }
            for (ei, ej) in ORIENTATIONS {
                pass.offer(
                    Site::new(fi.id, ei),
                    Site::new(fj.id, ej),
                    distance_sq(&fi.point(ei), &fj.point(ej)),
                    CandidateKind::Merge,
                );
            }
        }
    }
    Ok(pass.accepted)
}

struct Pass<'a> {
    index: &'a mut EndpointPairingIndex,
    dirty: &'a mut HashSet<FragmentId>,
    pinned: &'a HashSet<Site>,
    accepted: usize,
}

impl Pass<'_> {
    fn offer(&mut self, a: Site, b: Site, distance_sq: f64, kind: CandidateKind) {
        if self.pinned.contains(&a) || self.pinned.contains(&b) {
            return;
        }
        if let Some(freed) = self.index.offer(a, b, distance_sq, kind) {
            self.accepted += 1;
            self.dirty.extend(freed.into_iter().map(|s| s.fragment));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::assembly::observer::NoopObserver;
    use crate::assembly::AssemblyParams;
    use crate::geometry::Polyline;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    fn run(fragments: &FragmentSet, pinned: &HashSet<Site>) -> (EndpointPairingIndex, usize) {
        let params = AssemblyParams::default();
        let mut ctx = RunContext {
            params: &params,
            observer: &NoopObserver,
            cancellation: None,
            passes: 0,
        };
        let mut index = EndpointPairingIndex::new();
        converge(fragments, &mut index, pinned, &mut ctx).unwrap();
        (index, ctx.passes)
    }

    fn square_sides() -> (FragmentSet, Vec<FragmentId>) {
        let corners = [p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0), p(0.0, 1.0)];
        let mut set = FragmentSet::default();
        let ids = (0..4)
            .map(|i| set.insert(Polyline::from_points(vec![corners[i], corners[(i + 1) % 4]])))
            .collect();
        (set, ids)
    }

    #[test]
    fn square_sides_pair_head_to_tail() {
        let (set, ids) = square_sides();
        let (index, _) = run(&set, &HashSet::new());
        assert_eq!(index.len(), 4);
        for i in 0..4 {
            let c = index.candidate_at(Site::new(ids[i], End::End)).unwrap();
            assert_eq!(
                c.partner(Site::new(ids[i], End::End)),
                Some(Site::new(ids[(i + 1) % 4], End::Start))
            );
            assert!(c.distance_sq < 1e-20);
            assert!(c.settled);
        }
    }

    #[test]
    fn terminates_within_fragment_count_passes() {
        // A fan of segments with distinct lengths forces displacements.
        let mut set = FragmentSet::default();
        for i in 0..12 {
            let x = f64::from(i) * 1.37;
            set.insert(Polyline::from_points(vec![p(x, 0.0), p(x + 0.5, f64::from(i % 5))]));
        }
        let (index, passes) = run(&set, &HashSet::new());
        assert!(passes <= set.len());
        assert!(index.iter().all(|c| c.settled));
        assert!(index.iter().all(|c| !c.is_self_pair()));
    }

    #[test]
    fn empty_input_leaves_empty_index() {
        let (index, passes) = run(&FragmentSet::default(), &HashSet::new());
        assert!(index.is_empty());
        assert_eq!(passes, 0);
    }

    #[test]
    fn closed_loop_yields_closing_candidate() {
        let mut set = FragmentSet::default();
        let id = set.insert(Polyline::from_points(vec![
            p(0.0, 0.0),
            p(2.0, 0.0),
            p(2.0, 2.0),
            p(0.0, 0.0),
        ]));
        let (index, _) = run(&set, &HashSet::new());
        let c = index.candidate_at(Site::new(id, End::Start)).unwrap();
        assert_eq!(c.kind, CandidateKind::Closing);
        assert!(c.is_self_pair());
    }

    #[test]
    fn pinned_sites_are_never_paired() {
        let (set, ids) = square_sides();
        let pinned_site = Site::new(ids[0], End::End);
        let pinned: HashSet<Site> = [pinned_site].into_iter().collect();
        let (index, _) = run(&set, &pinned);
        assert!(index.candidate_at(pinned_site).is_none());
        assert!(index.iter().all(|c| c.a != pinned_site && c.b != pinned_site));
    }
}
