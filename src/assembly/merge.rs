use crate::error::Result;
use crate::geometry::End;

use super::fragments::{FragmentId, FragmentSet};
use super::observer::RunContext;
use super::pairing::{CandidateKind, EndpointPairingIndex, PairCandidate, Site};

/// Counters for one merge phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct MergeStats {
    pub(crate) merges: usize,
    pub(crate) closes: usize,
    pub(crate) skipped: usize,
}

/// Greedily realises the candidates in `index`, shortest first, until it is
/// empty.
///
/// A self-referencing candidate closes its fragment. Any other candidate
/// joins the shorter fragment onto the longer one and moves the consumed
/// fragment's remaining candidate over to the survivor.
///
/// # Errors
///
/// Returns [`AssemblyError::Cancelled`](crate::error::AssemblyError::Cancelled)
/// if cancellation is requested, or a geometry/transform error if a join
/// fails.
pub(crate) fn merge_pairs(
    fragments: &mut FragmentSet,
    index: &mut EndpointPairingIndex,
    ctx: &RunContext<'_>,
) -> Result<MergeStats> {
    let max_sq = ctx.params.max_link_distance * ctx.params.max_link_distance;
    let coincident_sq = ctx.params.coincidence_tolerance * ctx.params.coincidence_tolerance;
    let total = index.len();
    let mut stats = MergeStats::default();

    while let Some(candidate) = index.pop_shortest() {
        ctx.check_cancelled()?;

        if candidate.distance_sq > max_sq {
            tracing::warn!(
                distance = candidate.distance_sq.sqrt(),
                limit = ctx.params.max_link_distance,
                "candidate exceeds maximum link distance, not merged"
            );
            stats.skipped += 1;
        } else if candidate.is_self_pair() {
            // Only a chain of merges can bring a point back onto itself.
            let drop_duplicate =
                candidate.kind == CandidateKind::Merge && candidate.distance_sq <= coincident_sq;
            close_fragment(fragments, candidate.a.fragment, drop_duplicate)?;
            stats.closes += 1;
        } else {
            merge_candidate(fragments, index, &candidate, candidate.distance_sq <= coincident_sq)?;
            stats.merges += 1;
        }

        if total > 0 {
            #[allow(clippy::cast_precision_loss)]
            let done = 1.0 - index.len() as f64 / total as f64;
            ctx.observer.on_progress(done);
        }
    }
    Ok(stats)
}

fn close_fragment(fragments: &mut FragmentSet, id: FragmentId, drop_duplicate: bool) -> Result<()> {
    let Some(line) = fragments.get_mut(id) else {
        return Ok(());
    };
    if drop_duplicate && line.len() > 1 {
        line.pop_point()?;
    }
    line.close()?;
    tracing::debug!(fragment = ?id, points = line.len(), drop_duplicate, "closed ring");
    Ok(())
}

/// Joins the two fragments of `candidate`.
fn merge_candidate(
    fragments: &mut FragmentSet,
    index: &mut EndpointPairingIndex,
    candidate: &PairCandidate,
    drop_duplicate: bool,
) -> Result<()> {
    let (Some(a), Some(b)) = (fragments.get(candidate.a.fragment), fragments.get(candidate.b.fragment)) else {
        return Ok(());
    };
    let (survivor, mut consumed) = if b.len() > a.len() {
        (candidate.b, candidate.a)
    } else {
        (candidate.a, candidate.b)
    };

    let Some([s_line, c_line]) = fragments.pair_mut(survivor.fragment, consumed.fragment) else {
        return Ok(());
    };

    if survivor.end == consumed.end {
        c_line.reverse()?;
        index.swap_ends(consumed.fragment);
        consumed.end = consumed.end.opposite();
    }
    s_line.join(c_line, survivor.end, drop_duplicate)?;
    tracing::debug!(
        survivor = ?survivor.fragment,
        consumed = ?consumed.fragment,
        points = s_line.len(),
        distance = candidate.distance_sq.sqrt(),
        "merged fragments"
    );

    // The consumed fragment's far end is now the survivor's end at the join.
    index.substitute(
        Site::new(consumed.fragment, consumed.end.opposite()),
        Site::new(survivor.fragment, survivor.end),
    );
    fragments.remove(consumed.fragment);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::assembly::converge::converge;
    use crate::assembly::observer::NoopObserver;
    use crate::assembly::AssemblyParams;
    use crate::geometry::Polyline;
    use crate::math::Point2;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    fn assemble(set: &mut FragmentSet, params: &AssemblyParams) -> MergeStats {
        let mut ctx = RunContext {
            params,
            observer: &NoopObserver,
            cancellation: None,
            passes: 0,
        };
        let mut index = EndpointPairingIndex::new();
        converge(set, &mut index, &HashSet::new(), &mut ctx).unwrap();
        let stats = merge_pairs(set, &mut index, &ctx).unwrap();
        assert!(index.is_empty());
        stats
    }

    #[test]
    fn head_to_tail_merge_drops_shared_point() {
        let mut set = FragmentSet::default();
        set.insert(Polyline::from_points(vec![p(0.0, 0.0), p(1.0, 0.0), p(2.0, 0.0)]));
        set.insert(Polyline::from_points(vec![p(2.0, 0.0), p(3.0, 1.0)]));
        // Keeps the merged chain from closing onto itself.
        let params = AssemblyParams {
            max_link_distance: 1.0,
            ..AssemblyParams::default()
        };
        let stats = assemble(&mut set, &params);
        assert_eq!(stats.merges, 1);
        let lines = set.into_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(
            lines[0].native_points(),
            &[p(0.0, 0.0), p(1.0, 0.0), p(2.0, 0.0), p(3.0, 1.0)]
        );
        assert!(!lines[0].is_closed());
    }

    #[test]
    fn same_end_flags_reverse_shorter_fragment() {
        let mut set = FragmentSet::default();
        set.insert(Polyline::from_points(vec![p(0.0, 0.0), p(1.0, 0.0), p(2.0, 0.0)]));
        set.insert(Polyline::from_points(vec![p(4.0, 0.0), p(2.0, 0.0)]));
        assemble(&mut set, &AssemblyParams::default());
        let lines = set.into_lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(
            lines[0].native_points(),
            &[p(0.0, 0.0), p(1.0, 0.0), p(2.0, 0.0), p(4.0, 0.0)]
        );
    }

    #[test]
    fn close_gap_keeps_both_points() {
        let mut set = FragmentSet::default();
        set.insert(Polyline::from_points(vec![p(0.0, 0.0), p(1.0, 0.0)]));
        set.insert(Polyline::from_points(vec![p(1.5, 0.0), p(2.0, 0.0)]));
        assemble(&mut set, &AssemblyParams::default());
        let lines = set.into_lines();
        assert_eq!(lines[0].len(), 4);
    }

    #[test]
    fn max_link_distance_blocks_far_merges() {
        let mut set = FragmentSet::default();
        set.insert(Polyline::from_points(vec![p(0.0, 0.0), p(1.0, 0.0)]));
        set.insert(Polyline::from_points(vec![p(5.0, 0.0), p(6.0, 0.0)]));
        let params = AssemblyParams {
            max_link_distance: 2.0,
            ..AssemblyParams::default()
        };
        let stats = assemble(&mut set, &params);
        assert_eq!(stats.merges, 0);
        assert_eq!(stats.skipped, 2);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn chain_closing_drops_duplicate_but_native_closing_does_not() {
        let mut set = FragmentSet::default();
        // Two halves of a diamond meeting exactly at both ends.
        set.insert(Polyline::from_points(vec![p(0.0, -1.0), p(1.0, 0.0), p(0.0, 1.0)]));
        set.insert(Polyline::from_points(vec![p(0.0, 1.0), p(-1.0, 0.0), p(0.0, -1.0)]));
        // An already looped fragment.
        set.insert(Polyline::from_points(vec![
            p(10.0, 0.0),
            p(11.0, 0.0),
            p(11.0, 1.0),
            p(10.0, 0.0),
        ]));
        let stats = assemble(&mut set, &AssemblyParams::default());
        assert_eq!(stats.merges, 1);
        assert_eq!(stats.closes, 2);

        let lines = set.into_lines();
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(Polyline::is_closed));
        assert_eq!(lines[0].len(), 4);
        assert_eq!(lines[1].len(), 4);
    }
}
