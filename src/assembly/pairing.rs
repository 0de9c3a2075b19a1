use std::collections::HashMap;

use slotmap::SlotMap;

use crate::geometry::End;

use super::fragments::FragmentId;

slotmap::new_key_type! {
    /// Identifier of a live candidate inside an [`EndpointPairingIndex`].
    pub struct CandidateId;
}

/// One end of one fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Site {
    pub fragment: FragmentId,
    pub end: End,
}

impl Site {
    #[must_use]
    pub fn new(fragment: FragmentId, end: End) -> Self {
        Self { fragment, end }
    }
}

/// How a candidate came into being.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    /// A fragment's own start and end: it is already a ring.
    Closing,
    /// Ends of two distinct fragments. May later become self-referencing
    /// once the fragments in between have been merged.
    Merge,
}

/// The best known match for two sites.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairCandidate {
    pub a: Site,
    pub b: Site,
    /// Squared target-frame distance between the two end points.
    pub distance_sq: f64,
    /// Set once a pass finished without replacing this candidate.
    pub settled: bool,
    pub kind: CandidateKind,
    seq: u64,
}

impl PairCandidate {
    /// Returns `true` if both sites belong to the same fragment.
    #[must_use]
    pub fn is_self_pair(&self) -> bool {
        self.a.fragment == self.b.fragment
    }

    /// Returns the site opposite to `site` in this pair.
    #[must_use]
    pub fn partner(&self, site: Site) -> Option<Site> {
        if self.a == site {
            Some(self.b)
        } else if self.b == site {
            Some(self.a)
        } else {
            None
        }
    }
}

/// Nearest-endpoint pairing table.
///
/// Every site is covered by at most one live candidate. Replacing a
/// candidate removes both of its reverse-lookup entries before the new one
/// is inserted, so no half-updated pair is ever observable.
#[derive(Debug, Default)]
pub struct EndpointPairingIndex {
    candidates: SlotMap<CandidateId, PairCandidate>,
    by_site: HashMap<Site, CandidateId>,
    next_seq: u64,
}

impl EndpointPairingIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Returns the candidate covering `site`, if any.
    #[must_use]
    pub fn candidate_at(&self, site: Site) -> Option<&PairCandidate> {
        self.by_site.get(&site).and_then(|id| self.candidates.get(*id))
    }

    /// Best squared distance recorded for `site`, or infinity.
    #[must_use]
    pub fn best_distance_sq(&self, site: Site) -> f64 {
        self.candidate_at(site)
            .map_or(f64::INFINITY, |c| c.distance_sq)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PairCandidate> {
        self.candidates.values()
    }

    /// Offers a candidate pairing `a` with `b`.
    ///
    /// The offer is accepted only if `distance_sq` is strictly smaller than
    /// the best distance currently recorded at both sites. On acceptance the
    /// displaced candidates are dropped and the sites they leave uncovered
    /// are returned; `None` means the offer was rejected.
    pub fn offer(&mut self, a: Site, b: Site, distance_sq: f64, kind: CandidateKind) -> Option<Vec<Site>> {
        if !(distance_sq < self.best_distance_sq(a) && distance_sq < self.best_distance_sq(b)) {
            return None;
        }

        let mut freed = Vec::new();
        for site in [a, b] {
            if let Some(old) = self.remove(site) {
                freed.extend([old.a, old.b].into_iter().filter(|s| *s != a && *s != b));
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        let id = self.candidates.insert(PairCandidate {
            a,
            b,
            distance_sq,
            settled: false,
            kind,
            seq,
        });
        self.by_site.insert(a, id);
        self.by_site.insert(b, id);
        Some(freed)
    }

    /// Removes the candidate covering `site` together with both its entries.
    pub fn remove(&mut self, site: Site) -> Option<PairCandidate> {
        let id = self.by_site.remove(&site)?;
        let candidate = self.candidates.remove(id)?;
        self.by_site.remove(&candidate.a);
        self.by_site.remove(&candidate.b);
        Some(candidate)
    }

    /// Exchanges the start and end flags of every candidate touching
    /// `fragment`, after that fragment was reversed.
    pub fn swap_ends(&mut self, fragment: FragmentId) {
        let mut ids: Vec<CandidateId> = [End::Start, End::End]
            .into_iter()
            .filter_map(|end| self.by_site.remove(&Site::new(fragment, end)))
            .collect();
        // A closing candidate covers both ends and must only flip once.
        ids.dedup();

        let mut relinked = Vec::with_capacity(4);
        for id in ids {
            let Some(candidate) = self.candidates.get_mut(id) else {
                continue;
            };
            for site in [&mut candidate.a, &mut candidate.b] {
                if site.fragment == fragment {
                    site.end = site.end.opposite();
                    relinked.push((*site, id));
                }
            }
        }
        self.by_site.extend(relinked);
    }

    /// Rewrites the candidate covering `from` so that it covers `to`
    /// instead. The distance is kept: `to` must denote the same point.
    ///
    /// Returns `false` if `from` was uncovered.
    pub fn substitute(&mut self, from: Site, to: Site) -> bool {
        let Some(id) = self.by_site.remove(&from) else {
            return false;
        };
        if let Some(candidate) = self.candidates.get_mut(id) {
            for site in [&mut candidate.a, &mut candidate.b] {
                if *site == from {
                    *site = to;
                }
            }
        }
        self.by_site.insert(to, id);
        true
    }

    /// Marks every candidate settled. Returns `true` if any candidate was
    /// still unsettled, i.e. something changed since the last call.
    pub fn settle_all(&mut self) -> bool {
        let mut changed = false;
        for candidate in self.candidates.values_mut() {
            changed |= !candidate.settled;
            candidate.settled = true;
        }
        changed
    }

    /// Removes and returns the globally shortest candidate. Ties go to the
    /// candidate that was accepted first.
    pub fn pop_shortest(&mut self) -> Option<PairCandidate> {
        let (_, shortest) = self.candidates.iter().min_by(|(_, x), (_, y)| {
            x.distance_sq
                .total_cmp(&y.distance_sq)
                .then(x.seq.cmp(&y.seq))
        })?;
        let site = shortest.a;
        self.remove(site)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<FragmentId> {
        let mut map = SlotMap::<FragmentId, ()>::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    #[test]
    fn offer_requires_strict_improvement_at_both_sites() {
        let f = ids(3);
        let mut index = EndpointPairingIndex::new();
        let a = Site::new(f[0], End::End);
        let b = Site::new(f[1], End::Start);
        let c = Site::new(f[2], End::Start);

        assert_eq!(index.offer(a, b, 4.0, CandidateKind::Merge), Some(vec![]));
        // Equal distance is not an improvement.
        assert!(index.offer(a, c, 4.0, CandidateKind::Merge).is_none());
        assert_eq!(index.len(), 1);

        let freed = index.offer(a, c, 1.0, CandidateKind::Merge).unwrap();
        assert_eq!(freed, vec![b]);
        assert!(index.candidate_at(b).is_none());
        assert_eq!(index.candidate_at(a).unwrap().partner(a), Some(c));
    }

    #[test]
    fn replacing_closing_candidate_frees_other_end() {
        let f = ids(2);
        let mut index = EndpointPairingIndex::new();
        let s0 = Site::new(f[0], End::Start);
        let e0 = Site::new(f[0], End::End);
        let s1 = Site::new(f[1], End::Start);

        index.offer(s0, e0, 9.0, CandidateKind::Closing).unwrap();
        let freed = index.offer(e0, s1, 0.0, CandidateKind::Merge).unwrap();
        assert_eq!(freed, vec![s0]);
        assert_eq!(index.len(), 1);
        assert!(index.candidate_at(s0).is_none());
    }

    #[test]
    fn swap_ends_relinks_sites() {
        let f = ids(2);
        let mut index = EndpointPairingIndex::new();
        let a = Site::new(f[0], End::End);
        let b = Site::new(f[1], End::End);
        index.offer(a, b, 1.0, CandidateKind::Merge).unwrap();

        index.swap_ends(f[1]);
        assert!(index.candidate_at(b).is_none());
        let moved = Site::new(f[1], End::Start);
        assert_eq!(index.candidate_at(moved).unwrap().partner(a), Some(moved));
    }

    #[test]
    fn swap_ends_on_closing_candidate_keeps_both_sites() {
        let f = ids(1);
        let mut index = EndpointPairingIndex::new();
        let s = Site::new(f[0], End::Start);
        let e = Site::new(f[0], End::End);
        index.offer(s, e, 2.0, CandidateKind::Closing).unwrap();
        index.swap_ends(f[0]);
        assert!(index.candidate_at(s).is_some());
        assert!(index.candidate_at(e).is_some());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn substitute_can_produce_self_pair() {
        let f = ids(2);
        let mut index = EndpointPairingIndex::new();
        let a_start = Site::new(f[0], End::Start);
        let b_end = Site::new(f[1], End::End);
        index.offer(b_end, a_start, 0.0, CandidateKind::Merge).unwrap();

        assert!(index.substitute(b_end, Site::new(f[0], End::End)));
        let c = index.candidate_at(a_start).unwrap();
        assert!(c.is_self_pair());
        assert_eq!(c.kind, CandidateKind::Merge);
        assert!(!index.substitute(b_end, a_start));
    }

    #[test]
    fn settle_all_reports_changes_once() {
        let f = ids(2);
        let mut index = EndpointPairingIndex::new();
        assert!(!index.settle_all());
        index
            .offer(Site::new(f[0], End::End), Site::new(f[1], End::Start), 1.0, CandidateKind::Merge)
            .unwrap();
        assert!(index.settle_all());
        assert!(!index.settle_all());
        assert!(index.iter().all(|c| c.settled));
    }

    #[test]
    fn pop_shortest_breaks_ties_by_acceptance_order() {
        let f = ids(4);
        let mut index = EndpointPairingIndex::new();
        let first = Site::new(f[2], End::End);
        index
            .offer(Site::new(f[0], End::End), Site::new(f[1], End::Start), 3.0, CandidateKind::Merge)
            .unwrap();
        index
            .offer(first, Site::new(f[3], End::Start), 0.0, CandidateKind::Merge)
            .unwrap();
        index
            .offer(Site::new(f[1], End::End), Site::new(f[2], End::Start), 0.0, CandidateKind::Merge)
            .unwrap();

        assert_eq!(index.pop_shortest().unwrap().a, first);
        assert!(index.pop_shortest().unwrap().distance_sq < 1.0);
        assert!(index.pop_shortest().unwrap().distance_sq > 1.0);
        assert!(index.pop_shortest().is_none());
        assert!(index.is_empty());
    }
}
