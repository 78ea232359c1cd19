use super::*;
use nalgebra::{vector, Vector2};
use proptest::prelude::*;

fn pts(raw: &[(f64, f64)]) -> Vec<Point2> {
    raw.iter().map(|&(x, y)| Vector2::new(x, y)).collect()
}

#[test]
fn square_is_ccw_from_lexicographic_min() {
    let hull = compute_hull(&pts(&[(10.0, 10.0), (0.0, 10.0), (0.0, 0.0), (10.0, 0.0)]));
    assert_eq!(
        hull.vertices(),
        &pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)])[..]
    );
    assert!((hull.signed_area() - 100.0).abs() < 1e-12);
}

#[test]
fn interior_and_collinear_points_are_dropped() {
    let hull = compute_hull(&pts(&[
        (0.0, 0.0),
        (1.0, 0.0),
        (2.0, 0.0),
        (2.0, 2.0),
        (1.0, 1.0),
        (0.0, 2.0),
        (0.0, 1.0),
    ]));
    assert_eq!(
        hull.vertices(),
        &pts(&[(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)])[..]
    );
}

#[test]
fn degenerate_inputs() {
    let single = compute_hull(&pts(&[(1.0, 2.0), (1.0, 2.0), (1.0, 2.0)]));
    assert_eq!(single.vertices(), &[vector![1.0, 2.0]]);
    assert!(!single.is_polygon());

    let segment = compute_hull(&pts(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]));
    assert_eq!(segment.len(), 2);
    assert!(!segment.is_polygon());
    assert_eq!(segment.signed_area(), 0.0);

    assert!(compute_hull(&[]).is_empty());
}

#[test]
fn signed_zero_deduplicates() {
    let hull = compute_hull(&pts(&[(-0.0, 0.0), (0.0, -0.0), (1.0, 0.0), (0.0, 1.0)]));
    assert_eq!(hull.len(), 3);
}

#[test]
fn signed_area_flips_with_winding() {
    let ccw = pts(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]);
    let cw: Vec<_> = ccw.iter().rev().copied().collect();
    assert!((signed_area(&ccw) - 0.5).abs() < 1e-12);
    assert!((signed_area(&cw) + 0.5).abs() < 1e-12);
}

// Integer-valued coordinates keep every cross product exact in f64.
fn grid_points() -> impl Strategy<Value = Vec<Point2>> {
    prop::collection::vec((-1000i32..1000, -1000i32..1000), 1..64).prop_map(|raw| {
        raw.into_iter()
            .map(|(x, y)| Vector2::new(f64::from(x), f64::from(y)))
            .collect()
    })
}

proptest! {
    #[test]
    fn hull_contains_every_input_point(points in grid_points()) {
        let hull = compute_hull(&points);
        let v = hull.vertices();
        prop_assume!(hull.is_polygon());
        for p in &points {
            for i in 0..v.len() {
                prop_assert!(cross(v[i], v[(i + 1) % v.len()], *p) >= 0.0);
            }
        }
    }

    #[test]
    fn hull_is_strictly_convex_and_starts_at_min(points in grid_points()) {
        let hull = compute_hull(&points);
        let v = hull.vertices();
        prop_assume!(hull.is_polygon());
        for i in 0..v.len() {
            let turn = cross(v[i], v[(i + 1) % v.len()], v[(i + 2) % v.len()]);
            prop_assert!(turn > 0.0);
        }
        let min = points
            .iter()
            .copied()
            .fold(v[0], |m, p| if (p.x, p.y) < (m.x, m.y) { p } else { m });
        prop_assert_eq!(v[0], min);
    }

    #[test]
    fn hull_is_idempotent(points in grid_points()) {
        let hull = compute_hull(&points);
        prop_assert_eq!(compute_hull(hull.vertices()), hull);
    }

    #[test]
    fn duplicates_do_not_change_hull(points in grid_points()) {
        let mut doubled = points.clone();
        doubled.extend(points.iter().rev().copied());
        prop_assert_eq!(compute_hull(&doubled), compute_hull(&points));
    }
}
