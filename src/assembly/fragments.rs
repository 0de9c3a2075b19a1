use slotmap::SlotMap;

use crate::geometry::Polyline;

slotmap::new_key_type! {
    /// Identifier of a fragment taking part in one assembly run.
    pub struct FragmentId;
}

/// Arena of the polylines taking part in one assembly run.
///
/// Keeps input order so that results and tie-breaks are reproducible.
#[derive(Debug, Default)]
pub(crate) struct FragmentSet {
    lines: SlotMap<FragmentId, Polyline>,
    order: Vec<FragmentId>,
}

impl FragmentSet {
    pub(crate) fn insert(&mut self, line: Polyline) -> FragmentId {
        let id = self.lines.insert(line);
        self.order.push(id);
        id
    }

    pub(crate) fn get(&self, id: FragmentId) -> Option<&Polyline> {
        self.lines.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: FragmentId) -> Option<&mut Polyline> {
        self.lines.get_mut(id)
    }

    /// Gives mutable access to two distinct fragments at once.
    pub(crate) fn pair_mut(&mut self, a: FragmentId, b: FragmentId) -> Option<[&mut Polyline; 2]> {
        self.lines.get_disjoint_mut([a, b])
    }

    pub(crate) fn remove(&mut self, id: FragmentId) -> Option<Polyline> {
        let line = self.lines.remove(id)?;
        self.order.retain(|other| *other != id);
        Some(line)
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    /// Ids of the fragments that are still open, in input order.
    pub(crate) fn open_ids(&self) -> Vec<FragmentId> {
        self.order
            .iter()
            .copied()
            .filter(|id| self.lines.get(*id).is_some_and(|l| !l.is_closed()))
            .collect()
    }

    pub(crate) fn open_count(&self) -> usize {
        self.lines.values().filter(|l| !l.is_closed()).count()
    }

    /// Consumes the set, yielding the polylines in input order.
    pub(crate) fn into_lines(mut self) -> Vec<Polyline> {
        self.order
            .iter()
            .filter_map(|id| self.lines.remove(*id))
            .collect()
    }
}
