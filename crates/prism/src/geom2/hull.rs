use nalgebra::Vector2;
use std::cmp::Ordering;

/// Point in the xy-plane.
pub type Point2 = Vector2<f64>;

/// Convex hull of a 2D point set.
///
/// Invariants:
/// - Vertices are distinct and in counter-clockwise order.
/// - The first vertex is the lexicographically smallest input point (x, then y).
/// - No three consecutive vertices are collinear.
/// - Fewer than 3 vertices means the input was degenerate (a point or a segment).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConvexHull {
    vertices: Vec<Point2>,
}

impl ConvexHull {
    #[inline]
    pub fn vertices(&self) -> &[Point2] {
        &self.vertices
    }
    #[inline]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
    /// True when the hull encloses a non-empty region (at least 3 vertices).
    #[inline]
    pub fn is_polygon(&self) -> bool {
        self.vertices.len() >= 3
    }
    /// Signed shoelace area; positive for the ccw hull.
    #[inline]
    pub fn signed_area(&self) -> f64 {
        signed_area(&self.vertices)
    }
    pub fn into_vertices(self) -> Vec<Point2> {
        self.vertices
    }
}

/// Andrew’s monotone chain convex hull (returns hull in CCW order).
///
/// Duplicates are removed first. With at most one distinct point the result
/// holds that point (or nothing); callers that need a polygon must check
/// [`ConvexHull::is_polygon`].
pub fn compute_hull(points: &[Point2]) -> ConvexHull {
    // `+ 0.0` folds -0.0 into 0.0 so signed zeros deduplicate.
    let mut pts: Vec<Point2> = points
        .iter()
        .map(|p| Vector2::new(p.x + 0.0, p.y + 0.0))
        .collect();
    pts.sort_by(lexicographic);
    pts.dedup();
    if pts.len() <= 1 {
        return ConvexHull { vertices: pts };
    }
    let mut lower: Vec<Point2> = Vec::with_capacity(pts.len());
    for p in &pts {
        push_ccw(&mut lower, *p);
    }
    let mut upper: Vec<Point2> = Vec::with_capacity(pts.len());
    for p in pts.iter().rev() {
        push_ccw(&mut upper, *p);
    }
    // The last point of each chain starts the other one.
    lower.pop();
    upper.pop();
    let mut vertices = lower;
    vertices.extend(upper);
    ConvexHull { vertices }
}

/// Pop until appending `p` keeps the chain turning strictly counter-clockwise.
#[inline]
fn push_ccw(chain: &mut Vec<Point2>, p: Point2) {
    while chain.len() >= 2 && cross(chain[chain.len() - 2], chain[chain.len() - 1], p) <= 0.0 {
        chain.pop();
    }
    chain.push(p);
}

#[inline]
fn lexicographic(a: &Point2, b: &Point2) -> Ordering {
    match a.x.total_cmp(&b.x) {
        Ordering::Equal => a.y.total_cmp(&b.y),
        o => o,
    }
}

/// z-component of `(b − a) × (c − a)`: positive for a ccw turn, zero if collinear.
#[inline]
pub fn cross(a: Point2, b: Point2, c: Point2) -> f64 {
    perp(b - a, c - a)
}

/// 2D cross product `a.x b.y − a.y b.x`.
#[inline]
pub fn perp(a: Vector2<f64>, b: Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Signed area of a simple polygon (shoelace). Positive for ccw order.
pub fn signed_area(vertices: &[Point2]) -> f64 {
    let n = vertices.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| perp(vertices[i], vertices[(i + 1) % n]))
        .sum();
    twice / 2.0
}
