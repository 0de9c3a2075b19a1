mod border;
mod converge;
mod fragments;
mod merge;
mod observer;
mod pairing;

pub use border::{Boundary, BoundaryPosition, BoundaryProjection, ClipBoundary, IntersectionPoint};
pub use fragments::FragmentId;
pub use observer::{AssemblyObserver, CancellationToken, NoopObserver, Phase, Progress};
pub use pairing::{CandidateId, CandidateKind, EndpointPairingIndex, PairCandidate, Site};

use std::collections::HashSet;
use std::fmt;

use crate::error::{AssemblyError, Result};
use crate::geometry::Shape;
use crate::math::{Point2, TOLERANCE};

use fragments::FragmentSet;
use observer::RunContext;

/// Tuning knobs for an assembly run.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyParams {
    /// Candidates whose ends are farther apart than this are never merged.
    pub max_link_distance: f64,
    /// Ends closer than this are the same point; the join drops one of them.
    pub coincidence_tolerance: f64,
    /// An end within this distance of the boundary lies on the border.
    pub border_tolerance: f64,
    /// A border level's reference point may be at most this far from the
    /// boundary.
    pub max_reference_distance: f64,
    /// Upper bound on stitching passes per convergence run.
    pub max_passes: usize,
}

impl Default for AssemblyParams {
    fn default() -> Self {
        Self {
            max_link_distance: f64::INFINITY,
            coincidence_tolerance: TOLERANCE,
            border_tolerance: 1e-6,
            max_reference_distance: f64::INFINITY,
            max_passes: 10_000,
        }
    }
}

impl AssemblyParams {
    fn validate(&self) -> std::result::Result<(), AssemblyError> {
        let distances = [
            ("max_link_distance", self.max_link_distance),
            ("coincidence_tolerance", self.coincidence_tolerance),
            ("border_tolerance", self.border_tolerance),
            ("max_reference_distance", self.max_reference_distance),
        ];
        for (name, value) in distances {
            if value.is_nan() || value < 0.0 {
                return Err(AssemblyError::InvalidParameters(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if self.max_passes == 0 {
            return Err(AssemblyError::InvalidParameters(
                "max_passes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// A level whose rings must be completed along the map boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorderLevel {
    pub value: f64,
    /// A point on or near the boundary known to lie outside every ring of
    /// this level, or inside when `inside` is set.
    pub reference: Point2,
    pub inside: bool,
}

impl BorderLevel {
    #[must_use]
    pub fn new(value: f64, reference: Point2, inside: bool) -> Self {
        Self {
            value,
            reference,
            inside,
        }
    }
}

/// The shapes drawn for one contour level.
#[derive(Debug, Clone, Default)]
pub struct Isoline {
    pub value: f64,
    pub shapes: Vec<Shape>,
}

impl Isoline {
    #[must_use]
    pub fn new(value: f64, shapes: Vec<Shape>) -> Self {
        Self { value, shapes }
    }

    /// Replaces this isoline's shapes by their assembly.
    ///
    /// If one of `levels` has this isoline's value, its rings are also
    /// completed along the assembler's boundary. On error the original
    /// shapes are put back untouched.
    ///
    /// # Errors
    ///
    /// Whatever [`Assembler::assemble`] returns.
    pub fn assemble(&mut self, assembler: &Assembler<'_>, levels: &[BorderLevel]) -> Result<()> {
        let level = levels
            .iter()
            .find(|l| (l.value - self.value).abs() <= TOLERANCE);
        let original = std::mem::take(&mut self.shapes);
        match assembler.assemble(original.clone(), level) {
            Ok(shapes) => {
                self.shapes = shapes;
                Ok(())
            }
            Err(err) => {
                self.shapes = original;
                Err(err)
            }
        }
    }
}

/// Stitches polyline fragments back into rings.
///
/// ```
/// use geoseam::assembly::{Assembler, AssemblyParams};
/// use geoseam::geometry::{Polyline, Shape};
/// use geoseam::math::Point2;
///
/// let sides = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
/// let shapes: Vec<Shape> = (0..4)
///     .map(|i| {
///         let (a, b) = (sides[i], sides[(i + 1) % 4]);
///         Polyline::from_points(vec![Point2::new(a.0, a.1), Point2::new(b.0, b.1)]).into()
///     })
///     .collect();
///
/// let assembler = Assembler::new(AssemblyParams::default()).unwrap();
/// let rings = assembler.assemble(shapes, None).unwrap();
/// assert_eq!(rings.len(), 1);
/// assert!(rings[0].is_closed());
/// ```
pub struct Assembler<'a> {
    params: AssemblyParams,
    boundary: Option<&'a dyn Boundary>,
    observer: &'a dyn AssemblyObserver,
    cancellation: Option<CancellationToken>,
}

impl fmt::Debug for Assembler<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assembler")
            .field("params", &self.params)
            .field("boundary", &self.boundary)
            .field("cancellation", &self.cancellation)
            .finish_non_exhaustive()
    }
}

impl<'a> Assembler<'a> {
    /// Creates an assembler without boundary, observer or cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError::InvalidParameters`] if a distance is
    /// negative or NaN, or `max_passes` is zero.
    pub fn new(params: AssemblyParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            boundary: None,
            observer: &NoopObserver,
            cancellation: None,
        })
    }

    /// Sets the clip boundary used by border completion.
    #[must_use]
    pub fn with_boundary(mut self, boundary: &'a dyn Boundary) -> Self {
        self.boundary = Some(boundary);
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: &'a dyn AssemblyObserver) -> Self {
        self.observer = observer;
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    #[must_use]
    pub fn params(&self) -> &AssemblyParams {
        &self.params
    }

    /// Assembles `shapes` and returns the result.
    ///
    /// Closed polylines and polygons pass through unchanged, ahead of the
    /// assembled fragments. Open polylines are paired end to end and merged;
    /// fragments whose ends link back to themselves are closed.
    ///
    /// With a `border` level, ends lying on the boundary are kept apart
    /// from ordinary pairing, joined along the boundary instead, and every
    /// fragment still open afterwards is closed.
    ///
    /// # Errors
    ///
    /// - [`AssemblyError::MissingBoundary`] if `border` is given without a
    ///   boundary
    /// - [`AssemblyError::ReferenceTooFar`] if the border level's reference
    ///   point is too far from the boundary; nothing has been merged yet
    /// - [`AssemblyError::Cancelled`] if the cancellation token fired
    /// - a geometry or transform error if a fragment cannot be extended
    pub fn assemble(&self, shapes: Vec<Shape>, border: Option<&BorderLevel>) -> Result<Vec<Shape>> {
        let completion = match border {
            Some(level) => {
                let boundary = self.boundary.ok_or(AssemblyError::MissingBoundary)?;
                let reference = border::locate_reference(
                    boundary,
                    &level.reference,
                    self.params.max_reference_distance,
                )?;
                Some((boundary, reference, level.inside))
            }
            None => None,
        };

        let mut ctx = RunContext {
            params: &self.params,
            observer: self.observer,
            cancellation: self.cancellation.as_ref(),
            passes: 0,
        };
        ctx.check_cancelled()?;

        let input = shapes.len();
        let mut output = Vec::with_capacity(input);
        let mut fragments = FragmentSet::default();
        for shape in shapes {
            match shape {
                Shape::Polyline(line) if !line.is_closed() => {
                    fragments.insert(line.thawed());
                }
                other => output.push(other),
            }
        }
        let open = fragments.len();

        ctx.phase(Phase::Assembling);
        let pinned = match completion {
            Some((boundary, _, _)) => {
                border::border_sites(&fragments, boundary, self.params.border_tolerance)?
            }
            None => HashSet::new(),
        };
        let mut stats = stitch(&mut fragments, &pinned, &mut ctx)?;

        if let Some((boundary, reference, inside)) = completion {
            ctx.phase(Phase::BorderCompletion);
            let stretches = border::complete_border(
                &mut fragments,
                boundary,
                reference,
                inside,
                self.params.border_tolerance,
                self.params.coincidence_tolerance,
            )?;
            let second = stitch(&mut fragments, &HashSet::new(), &mut ctx)?;
            let forced = border::close_remaining(&mut fragments)?;
            tracing::debug!(stretches, forced, "border completion finished");
            stats.merges += second.merges;
            stats.closes += second.closes + forced;
            stats.skipped += second.skipped;
        }

        ctx.observer.on_status(Progress {
            passes: ctx.passes,
            remaining: fragments.open_count(),
        });
        ctx.phase(Phase::Done);

        output.extend(fragments.into_lines().into_iter().map(Shape::Polyline));
        tracing::info!(
            input,
            open,
            output = output.len(),
            merges = stats.merges,
            closed = stats.closes,
            skipped = stats.skipped,
            passes = ctx.passes,
            "assembly finished"
        );
        Ok(output)
    }
}

/// One convergence round followed by the greedy merge it feeds.
fn stitch(
    fragments: &mut FragmentSet,
    pinned: &HashSet<Site>,
    ctx: &mut RunContext<'_>,
) -> Result<merge::MergeStats> {
    let mut index = EndpointPairingIndex::new();
    converge::converge(fragments, &mut index, pinned, ctx)?;
    merge::merge_pairs(fragments, &mut index, ctx)
}
