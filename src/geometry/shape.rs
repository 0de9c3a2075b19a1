use crate::math::{Point2, Rect};

use super::polygon::Polygon;
use super::polyline::Polyline;

/// Area queries shared by rings and polygons.
///
/// Every query works in the target frame and fails closed: a transform
/// error reads as "no bounds", "not contained" or "no intersection".
pub trait Region {
    /// Target-frame bounding rectangle, or `None` if empty or untransformable.
    fn bounds(&self) -> Option<Rect>;

    fn contains_point(&self, p: &Point2) -> bool;

    fn contains_polyline(&self, other: &Polyline) -> bool;

    fn intersects_polyline(&self, other: &Polyline) -> bool;
}

impl Region for Polyline {
    fn bounds(&self) -> Option<Rect> {
        self.try_bounds().ok().flatten()
    }

    fn contains_point(&self, p: &Point2) -> bool {
        self.contains(p.x, p.y)
    }

    fn contains_polyline(&self, other: &Polyline) -> bool {
        Polyline::contains_polyline(self, other)
    }

    fn intersects_polyline(&self, other: &Polyline) -> bool {
        self.intersects(other)
    }
}

impl Region for Polygon {
    fn bounds(&self) -> Option<Rect> {
        Polygon::bounds(self).ok().flatten()
    }

    fn contains_point(&self, p: &Point2) -> bool {
        self.contains(p.x, p.y)
    }

    fn contains_polyline(&self, other: &Polyline) -> bool {
        Polygon::contains_polyline(self, other)
    }

    fn intersects_polyline(&self, other: &Polyline) -> bool {
        self.intersects(other)
    }
}

/// An assembled or input shape: a bare polyline (open fragment or ring) or
/// a polygon with holes.
#[derive(Debug, Clone)]
pub enum Shape {
    Polyline(Polyline),
    Polygon(Polygon),
}

impl Shape {
    /// Returns `true` for closed polylines and for every polygon.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        match self {
            Self::Polyline(line) => line.is_closed(),
            Self::Polygon(_) => true,
        }
    }

    #[must_use]
    pub fn as_polyline(&self) -> Option<&Polyline> {
        match self {
            Self::Polyline(line) => Some(line),
            Self::Polygon(_) => None,
        }
    }

    #[must_use]
    pub fn as_polygon(&self) -> Option<&Polygon> {
        match self {
            Self::Polygon(poly) => Some(poly),
            Self::Polyline(_) => None,
        }
    }

    /// Returns the ring that bounds the shape: the polyline itself or the
    /// polygon's shell.
    #[must_use]
    pub fn outline(&self) -> &Polyline {
        match self {
            Self::Polyline(line) => line,
            Self::Polygon(poly) => poly.shell(),
        }
    }

    fn region(&self) -> &dyn Region {
        match self {
            Self::Polyline(line) => line,
            Self::Polygon(poly) => poly,
        }
    }
}

impl Region for Shape {
    fn bounds(&self) -> Option<Rect> {
        self.region().bounds()
    }

    fn contains_point(&self, p: &Point2) -> bool {
        self.region().contains_point(p)
    }

    fn contains_polyline(&self, other: &Polyline) -> bool {
        self.region().contains_polyline(other)
    }

    fn intersects_polyline(&self, other: &Polyline) -> bool {
        self.region().intersects_polyline(other)
    }
}

impl From<Polyline> for Shape {
    fn from(line: Polyline) -> Self {
        Self::Polyline(line)
    }
}

impl From<Polygon> for Shape {
    fn from(poly: Polygon) -> Self {
        Self::Polygon(poly)
    }
}
