//! Convex polygon in the xy-plane, extruded along z.
//!
//! Faces are the N hull edges (vertical rectangles) followed by the top and
//! bottom caps; `normals` and `face_areas` share that order.

use nalgebra::{Vector2, Vector3};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{
    check_origin, extremes, unit_direction, ArrivalFrame, ImpactRay, SamplingSurface, Surface,
    UprightSurface, NO_INTERSECTION,
};
use crate::cfg::{BOUNDARY_EPS, DET_EPS, Z_EPS};
use crate::error::{Result, SurfaceError};
use crate::geom2::{compute_hull, perp, signed_area, Point2};
use std::f64::consts::PI;

/// A convex polygon in the x-y plane, extruded in the z direction.
///
/// Invariants:
/// - `vertices` is the ccw hull of the construction points (N >= 3).
/// - `edge_lengths[i] > 0`; `normals[i]` is the outward unit normal of edge i.
/// - `normals[N]` and `normals[N + 1]` are the caps `+z` and `−z`.
/// - `face_areas.len() == normals.len() == N + 2`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PolygonRecord", into = "PolygonRecord")]
pub struct ExtrudedPolygon {
    vertices: Vec<Point2>,
    edge_vectors: Vec<Vector2<f64>>,
    edge_lengths: Vec<f64>,
    normals: Vec<Vector3<f64>>,
    face_areas: Vec<f64>,
    cap_area: f64,
    z_range: (f64, f64),
}

impl ExtrudedPolygon {
    /// Build from the convex hull of `xy_points`, spanning `z_range` in z.
    ///
    /// # Errors
    ///
    /// - [`SurfaceError::NonFinite`] for NaN or infinite coordinates.
    /// - [`SurfaceError::InvalidZRange`] unless `z_range.0 < z_range.1`.
    /// - [`SurfaceError::DegenerateGeometry`] if the hull has fewer than 3
    ///   vertices or is not counter-clockwise.
    pub fn build(xy_points: &[Point2], z_range: (f64, f64)) -> Result<Self> {
        if xy_points.iter().any(|p| !(p.x.is_finite() && p.y.is_finite())) {
            return Err(SurfaceError::NonFinite);
        }
        let (lo, hi) = z_range;
        if !(lo.is_finite() && hi.is_finite() && hi > lo) {
            return Err(SurfaceError::InvalidZRange { lo, hi });
        }
        let hull = compute_hull(xy_points);
        if !hull.is_polygon() {
            return Err(SurfaceError::degenerate(format!(
                "convex hull of {} points has {} vertices, need at least 3",
                xy_points.len(),
                hull.len()
            )));
        }
        let cap_area = hull.signed_area();
        if cap_area <= 0.0 {
            return Err(SurfaceError::degenerate(format!(
                "hull winding must be counter-clockwise (signed area {cap_area})"
            )));
        }
        let vertices = hull.into_vertices();
        let n = vertices.len();
        let height = hi - lo;

        let edge_vectors: Vec<Vector2<f64>> =
            (0..n).map(|i| vertices[(i + 1) % n] - vertices[i]).collect();
        let edge_lengths: Vec<f64> = edge_vectors.iter().map(|e| e.norm()).collect();

        let mut normals = Vec::with_capacity(n + 2);
        let mut face_areas = Vec::with_capacity(n + 2);
        for (e, &len) in edge_vectors.iter().zip(&edge_lengths) {
            // ccw winding: the outward normal is the edge turned clockwise.
            normals.push(Vector3::new(e.y / len, -e.x / len, 0.0));
            face_areas.push(len * height);
        }
        normals.push(Vector3::z());
        normals.push(-Vector3::z());
        face_areas.push(cap_area);
        face_areas.push(cap_area);
        debug_assert_eq!(face_areas.len(), normals.len());

        debug!(vertices = n, cap_area, lo, hi, "built extruded polygon");
        Ok(Self {
            vertices,
            edge_vectors,
            edge_lengths,
            normals,
            face_areas,
            cap_area,
            z_range,
        })
    }

    /// [`ExtrudedPolygon::build`] followed by [`ExtrudedPolygon::expand`]
    /// when `padding` is non-zero.
    pub fn with_padding(
        xy_points: &[Point2],
        z_range: (f64, f64),
        padding: f64,
    ) -> Result<Self> {
        if !padding.is_finite() {
            return Err(SurfaceError::NonFinite);
        }
        let surface = Self::build(xy_points, z_range)?;
        if padding != 0.0 {
            surface.expand(padding)
        } else {
            Ok(surface)
        }
    }

    /// Build from 3D positions: the hull of their xy-projection between the
    /// lowest and highest z, then expanded by `padding` if non-zero.
    pub fn from_positions(positions: &[Vector3<f64>], padding: f64) -> Result<Self> {
        if positions.iter().any(|p| !p.iter().all(|c| c.is_finite())) {
            return Err(SurfaceError::NonFinite);
        }
        let xy: Vec<Point2> = positions.iter().map(|p| p.xy()).collect();
        let z_range = positions
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.z), hi.max(p.z))
            });
        Self::with_padding(&xy, z_range, padding)
    }

    /// Offset every edge outwards by `padding` and pad the z range by the same
    /// amount on both ends. Returns a new surface; `self` is untouched.
    ///
    /// Each vertex moves along `prev_d − d` (unit edge directions) scaled by
    /// `padding / sin`, where `sin = prev_d × d` is the turn at that vertex.
    ///
    /// # Errors
    ///
    /// [`SurfaceError::DegenerateGeometry`] if two adjacent edges are
    /// [anti]parallel, or if a negative padding collapses or inverts the
    /// footprint (an offset edge vanishes or reverses). Errors from
    /// [`ExtrudedPolygon::build`] otherwise (e.g. a negative padding that
    /// collapses the z range).
    pub fn expand(&self, padding: f64) -> Result<Self> {
        if !padding.is_finite() {
            return Err(SurfaceError::NonFinite);
        }
        let n = self.vertices.len();
        let dirs: Vec<Vector2<f64>> = self
            .edge_vectors
            .iter()
            .zip(&self.edge_lengths)
            .map(|(e, len)| e / *len)
            .collect();
        let points = (0..n)
            .map(|i| {
                let d = dirs[i];
                let prev_d = dirs[(i + n - 1) % n];
                let det = perp(prev_d, d);
                if det.abs() <= DET_EPS {
                    return Err(SurfaceError::degenerate(format!(
                        "edges meeting at vertex {i} are [anti]parallel"
                    )));
                }
                Ok(self.vertices[i] + (prev_d - d) * (padding / det))
            })
            .collect::<Result<Vec<_>>>()?;
        // Offset edges must keep their direction.
        let reversed = (0..n).find(|&i| {
            (points[(i + 1) % n] - points[i]).dot(&self.edge_vectors[i]) <= 0.0
        });
        if let Some(i) = reversed {
            return Err(SurfaceError::degenerate(format!(
                "padding {padding} collapses edge {i} of the footprint"
            )));
        }
        if signed_area(&points) <= 0.0 {
            return Err(SurfaceError::degenerate(format!(
                "padding {padding} inverts the footprint"
            )));
        }
        let (lo, hi) = self.z_range;
        debug!(padding, vertices = n, "expanding extruded polygon");
        let expanded = Self::build(&points, (lo - padding, hi + padding))?;
        if expanded.vertices.len() != n {
            return Err(SurfaceError::degenerate(format!(
                "padding {padding} changes the vertex count from {n} to {}",
                expanded.vertices.len()
            )));
        }
        Ok(expanded)
    }

    #[inline]
    pub fn vertices(&self) -> &[Point2] {
        &self.vertices
    }
    /// x coordinates of the hull vertices.
    pub fn x(&self) -> Vec<f64> {
        self.vertices.iter().map(|v| v.x).collect()
    }
    /// y coordinates of the hull vertices.
    pub fn y(&self) -> Vec<f64> {
        self.vertices.iter().map(|v| v.y).collect()
    }
    #[inline]
    pub fn edge_vectors(&self) -> &[Vector2<f64>] {
        &self.edge_vectors
    }
    #[inline]
    pub fn edge_lengths(&self) -> &[f64] {
        &self.edge_lengths
    }
    #[inline]
    pub fn side_normals(&self) -> &[Vector3<f64>] {
        &self.normals[..self.vertices.len()]
    }
    #[inline]
    pub fn cap_normals(&self) -> &[Vector3<f64>] {
        &self.normals[self.vertices.len()..]
    }
    /// Side areas followed by the two cap areas.
    #[inline]
    pub fn face_areas(&self) -> &[f64] {
        &self.face_areas
    }
    #[inline]
    pub fn side_areas(&self) -> &[f64] {
        &self.face_areas[..self.vertices.len()]
    }
    pub fn perimeter(&self) -> f64 {
        self.edge_lengths.iter().sum()
    }

    fn on_boundary(&self, p: Point2) -> bool {
        self.vertices
            .iter()
            .zip(&self.edge_vectors)
            .zip(&self.edge_lengths)
            .any(|((v, e), &len)| {
                let rel = p - v;
                let s = (rel.dot(e) / (len * len)).clamp(0.0, 1.0);
                (rel - e * s).norm() <= BOUNDARY_EPS * (1.0 + len)
            })
    }

    /// Parity of edge crossings of a ray from `p` towards +x.
    ///
    /// Half-open rule: an edge spans `y` iff exactly one endpoint lies above
    /// it, so horizontal edges never count and shared vertices count once.
    fn crossings(&self, p: Point2) -> usize {
        let n = self.vertices.len();
        (0..n)
            .filter(|&i| {
                let a = self.vertices[i];
                let b = self.vertices[(i + 1) % n];
                if (a.y > p.y) == (b.y > p.y) {
                    return false;
                }
                let e = self.edge_vectors[i];
                let xc = a.x + (p.y - a.y) * e.x / e.y;
                p.x < xc
            })
            .count()
    }

    /// Distances along the unit horizontal direction `u` from `o` to every
    /// hull edge the line crosses (`0 <= alpha < 1` along the edge).
    fn side_crossings(&self, o: Point2, u: Vector2<f64>) -> impl Iterator<Item = f64> + '_ {
        self.vertices
            .iter()
            .zip(&self.edge_vectors)
            .filter_map(move |(v, e)| {
                let w = v - o;
                let denom = u.y * e.x - u.x * e.y;
                // NB: zero denominator means the ray runs parallel to the edge.
                if denom == 0.0 {
                    return None;
                }
                let alpha = (u.x * w.y - u.y * w.x) / denom;
                if !(0.0..1.0).contains(&alpha) {
                    return None;
                }
                let beta = if u.x.abs() >= u.y.abs() {
                    (w.x + alpha * e.x) / u.x
                } else {
                    (w.y + alpha * e.y) / u.y
                };
                Some(beta)
            })
    }

    fn distance_to_cap(&self, origin: &Vector3<f64>, direction: &Vector3<f64>, cap_z: f64) -> f64 {
        let t = (cap_z - origin.z) / direction.z;
        let hit = origin + direction * t;
        if self.contains_xy(hit.xy()) {
            t
        } else {
            f64::NAN
        }
    }

    fn distance_to_caps(&self, origin: &Vector3<f64>, direction: &Vector3<f64>) -> [f64; 2] {
        let (lo, hi) = self.z_range;
        [
            self.distance_to_cap(origin, direction, lo),
            self.distance_to_cap(origin, direction, hi),
        ]
    }

    /// Side crossings as ray parameters of `origin + t·direction`.
    ///
    /// The edge solve runs in the horizontal plane with a unit direction, so
    /// each distance is rescaled by the horizontal speed (`sin θ` for unit
    /// directions).
    fn distance_to_sides<'a>(
        &'a self,
        origin: &Vector3<f64>,
        direction: &Vector3<f64>,
    ) -> impl Iterator<Item = f64> + 'a {
        let horizontal = direction.xy();
        let speed = horizontal.norm();
        self.side_crossings(origin.xy(), horizontal / speed)
            .map(move |beta| beta / speed)
    }

    fn z_contains(&self, z: f64) -> bool {
        let (lo, hi) = self.z_range;
        let slack = Z_EPS * (1.0 + (hi - lo));
        z >= lo - slack && z <= hi + slack
    }

    /// Uniform point on the cap polygon, by fan triangulation from vertex 0.
    fn sample_cap<R: Rng>(&self, rng: &mut R, z: f64) -> Vector3<f64> {
        let v = &self.vertices;
        let fan: Vec<f64> = (1..v.len() - 1)
            .map(|k| perp(v[k] - v[0], v[k + 1] - v[0]) / 2.0)
            .collect();
        let k = pick_weighted(rng, &fan) + 1;
        let (mut a, mut b) = (rng.gen::<f64>(), rng.gen::<f64>());
        if a + b > 1.0 {
            (a, b) = (1.0 - a, 1.0 - b);
        }
        let p = v[0] + (v[k] - v[0]) * a + (v[k + 1] - v[0]) * b;
        Vector3::new(p.x, p.y, z)
    }
}

/// Index drawn with probability proportional to `weights` (all >= 0, sum > 0).
fn pick_weighted<R: Rng>(rng: &mut R, weights: &[f64]) -> usize {
    let total: f64 = weights.iter().sum();
    let mut target = rng.gen::<f64>() * total;
    for (i, w) in weights.iter().enumerate() {
        if target < *w {
            return i;
        }
        target -= w;
    }
    // Rounding can leave `target` just past the last bucket.
    weights.iter().rposition(|w| *w > 0.0).unwrap_or(0)
}

impl Surface for ExtrudedPolygon {
    fn intersect(&self, origin: Vector3<f64>, direction: Vector3<f64>) -> Result<(f64, f64)> {
        super::check_direction(&direction)?;
        check_origin(&origin)?;
        if direction.x == 0.0 && direction.y == 0.0 {
            // perfectly vertical track: only the caps can be crossed
            return Ok(extremes(self.distance_to_caps(&origin, &direction)));
        }
        if direction.z == 0.0 {
            // perfectly horizontal track: only the sides can be crossed
            if !self.z_contains(origin.z) {
                return Ok(NO_INTERSECTION);
            }
            return Ok(extremes(self.distance_to_sides(&origin, &direction)));
        }
        let sides = self
            .distance_to_sides(&origin, &direction)
            .filter(|t| self.z_contains(origin.z + t * direction.z));
        let caps = self.distance_to_caps(&origin, &direction);
        Ok(extremes(sides.chain(caps)))
    }

    fn projected_area(&self, direction: Vector3<f64>) -> Result<f64> {
        let d = unit_direction(&direction)?;
        // Only faces the ray enters through (n·d < 0) are visible.
        Ok(self
            .normals
            .iter()
            .zip(&self.face_areas)
            .map(|(n, area)| {
                let inner = n.dot(&d);
                if inner < 0.0 {
                    -inner * area
                } else {
                    0.0
                }
            })
            .sum())
    }

    fn contains_xy(&self, point: Point2) -> bool {
        self.on_boundary(point) || self.crossings(point) % 2 == 1
    }

    fn name(&self) -> &'static str {
        "extruded_polygon"
    }
}

impl UprightSurface for ExtrudedPolygon {
    fn cap_area(&self) -> f64 {
        self.cap_area
    }
    /// Mean width of a convex polygon over azimuth is `perimeter / π`.
    fn mean_side_area(&self) -> f64 {
        self.perimeter() * self.length() / PI
    }
    fn z_range(&self) -> (f64, f64) {
        self.z_range
    }
}

impl SamplingSurface for ExtrudedPolygon {
    /// Each silhouette point is covered by exactly one front face, so picking
    /// a face by its projected area and a uniform point on it is uniform over
    /// the silhouette.
    fn sample_impact_ray<R: Rng>(
        &self,
        rng: &mut R,
        cos_min: f64,
        cos_max: f64,
    ) -> Result<ImpactRay> {
        let frame = ArrivalFrame::sample(rng, cos_min, cos_max)?;
        let d = frame.direction;
        let weights: Vec<f64> = self
            .normals
            .iter()
            .zip(&self.face_areas)
            .map(|(n, area)| (-n.dot(&d)).max(0.0) * area)
            .collect();
        let projected_area: f64 = weights.iter().sum();
        let face = pick_weighted(rng, &weights);
        let n = self.vertices.len();
        let (lo, hi) = self.z_range;
        let position = if face < n {
            let p = self.vertices[face] + self.edge_vectors[face] * rng.gen::<f64>();
            Vector3::new(p.x, p.y, lo + (hi - lo) * rng.gen::<f64>())
        } else if face == n {
            self.sample_cap(rng, hi)
        } else {
            self.sample_cap(rng, lo)
        };
        trace!(face, cos_zenith = frame.cos_zenith, projected_area, "sampled impact");
        Ok(ImpactRay {
            position,
            direction: d,
            projected_area,
        })
    }
}

/// Persisted form of an [`ExtrudedPolygon`]: only the raw footprint and z
/// range; derived geometry is rebuilt (and validated) on load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolygonRecord {
    pub xy_points: Vec<[f64; 2]>,
    pub z_range: [f64; 2],
}

impl TryFrom<PolygonRecord> for ExtrudedPolygon {
    type Error = SurfaceError;

    fn try_from(record: PolygonRecord) -> Result<Self> {
        let points: Vec<Point2> = record
            .xy_points
            .iter()
            .map(|&[x, y]| Vector2::new(x, y))
            .collect();
        let [lo, hi] = record.z_range;
        Self::build(&points, (lo, hi))
    }
}

impl From<ExtrudedPolygon> for PolygonRecord {
    fn from(surface: ExtrudedPolygon) -> Self {
        let (lo, hi) = surface.z_range;
        Self {
            xy_points: surface.vertices.iter().map(|v| [v.x, v.y]).collect(),
            z_range: [lo, hi],
        }
    }
}
