use crate::error::{GeometryError, Result};
use crate::math::{Point2, Rect};
use crate::transform::SharedTransform;

use super::polyline::Polyline;

/// A closed shell with zero or more holes.
///
/// Each hole's target-frame bounds must lie within the shell's bounds. This
/// is a cheap necessary condition only; true nesting is not verified.
#[derive(Debug, Clone)]
pub struct Polygon {
    shell: Polyline,
    holes: Vec<Polyline>,
    frozen: bool,
}

impl Polygon {
    /// Wraps `shell`, closing it if it is still open.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Immutable`] if `shell` is frozen but open,
    /// or [`GeometryError::Degenerate`] if it has fewer than 3 points.
    pub fn new(mut shell: Polyline) -> Result<Self> {
        if shell.len() < 3 {
            return Err(GeometryError::Degenerate(format!(
                "polygon shell needs at least 3 points, got {}",
                shell.len()
            ))
            .into());
        }
        shell.close()?;
        Ok(Self {
            shell,
            holes: Vec::new(),
            frozen: false,
        })
    }

    #[must_use]
    pub fn shell(&self) -> &Polyline {
        &self.shell
    }

    #[must_use]
    pub fn holes(&self) -> &[Polyline] {
        &self.holes
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Freezes the polygon; no more holes may be added.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Closes `hole` and adds it.
    ///
    /// # Errors
    ///
    /// - [`GeometryError::Immutable`] if the polygon is frozen, or the hole
    ///   is frozen but open
    /// - [`GeometryError::Degenerate`] if the hole is empty
    /// - [`GeometryError::HoleOutsideShell`] if the hole's bounds are not
    ///   inside the shell's bounds
    /// - a transform error if either bounds cannot be computed
    pub fn add_hole(&mut self, mut hole: Polyline) -> Result<()> {
        if self.frozen {
            return Err(GeometryError::Immutable("polygon is frozen").into());
        }
        let Some(hole_bounds) = hole.bounds()? else {
            return Err(GeometryError::Degenerate("hole has no points".into()).into());
        };
        let inside = self
            .shell
            .bounds()?
            .is_some_and(|shell| shell.contains_rect(&hole_bounds));
        if !inside {
            return Err(GeometryError::HoleOutsideShell.into());
        }
        hole.close()?;
        self.holes.push(hole);
        Ok(())
    }

    /// Target-frame bounds of the shell.
    ///
    /// # Errors
    ///
    /// Returns a transform error if the shell cannot be transformed.
    pub fn bounds(&self) -> Result<Option<Rect>> {
        self.shell.bounds()
    }

    /// Replaces the transform of the shell and every hole.
    ///
    /// All new bounds are computed first; if any ring fails, nothing changes.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Immutable`] if the polygon is frozen, or a
    /// transform error if any ring cannot be transformed.
    pub fn set_transform(&mut self, transform: Option<SharedTransform>) -> Result<()> {
        if self.frozen {
            return Err(GeometryError::Immutable("polygon is frozen").into());
        }
        let shell_bounds = self.shell.prepare_transform(transform.as_ref())?;
        let hole_bounds = self
            .holes
            .iter()
            .map(|h| h.prepare_transform(transform.as_ref()))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        self.shell.commit_transform(transform.clone(), shell_bounds);
        for (hole, bounds) in self.holes.iter_mut().zip(hole_bounds) {
            hole.commit_transform(transform.clone(), bounds);
        }
        Ok(())
    }

    /// Returns `true` if `(x, y)` is inside the shell and outside every hole.
    #[must_use]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.shell.contains(x, y) && !self.holes.iter().any(|h| h.contains(x, y))
    }

    #[must_use]
    pub fn contains_point(&self, p: &Point2) -> bool {
        self.contains(p.x, p.y)
    }

    /// Returns `true` if `other` touches the polygon's area.
    ///
    /// A polyline lying entirely inside a hole does not intersect.
    #[must_use]
    pub fn intersects(&self, other: &Polyline) -> bool {
        self.shell.intersects(other) && !self.holes.iter().any(|h| h.contains_polyline(other))
    }

    /// Returns `true` if `other` is inside the shell and touches no hole.
    #[must_use]
    pub fn contains_polyline(&self, other: &Polyline) -> bool {
        self.shell.contains_polyline(other) && !self.holes.iter().any(|h| h.intersects(other))
    }
}
