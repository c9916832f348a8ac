//! Convex hull and convexity defects of a contour.

use crate::contour::Point;
use alloc::vec::Vec;

/// Gap between the hull and the contour
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Defect {
    /// Contour index where the gap starts (a hull vertex)
    pub start: usize,
    /// Contour index where the gap ends (the next hull vertex)
    pub end: usize,
    /// Contour index of the point deepest inside the gap
    pub far: usize,
    /// Distance from `far` to the hull edge
    pub depth: f32,
}

impl Defect {
    /// Angle at the far point between the lines to start and end, in degrees.
    /// `None` when the far point coincides with start or end.
    pub fn angle_degrees(&self, points: &[Point]) -> Option<f32> {
        let start = points[self.start];
        let end = points[self.end];
        let far = points[self.far];

        let a = end.distance_to(&start);
        let b = far.distance_to(&start);
        let c = end.distance_to(&far);

        let denominator = 2.0 * b * c;
        if denominator == 0.0 {
            return None;
        }
        let cos = ((b * b + c * c - a * a) / denominator).clamp(-1.0, 1.0);
        Some(libm::acosf(cos).to_degrees())
    }
}

fn cross(o: Point, a: Point, b: Point) -> i64 {
    i64::from(a.x - o.x) * i64::from(b.y - o.y) - i64::from(a.y - o.y) * i64::from(b.x - o.x)
}

/// Indices of the hull vertices, ascending by contour index.
/// Collinear points and repeated coordinates are left out.
pub fn convex_hull_indices(points: &[Point]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by_key(|&i| (points[i].x, points[i].y, i));
    order.dedup_by_key(|i| points[*i]);

    if order.len() < 3 {
        return order;
    }

    // Andrew's monotone chain
    let mut hull: Vec<usize> = Vec::with_capacity(2 * order.len());
    for &i in order.iter() {
        while hull.len() >= 2
            && cross(points[hull[hull.len() - 2]], points[hull[hull.len() - 1]], points[i]) <= 0
        {
            hull.pop();
        }
        hull.push(i);
    }
    let lower_len = hull.len() + 1;
    for &i in order.iter().rev().skip(1) {
        while hull.len() >= lower_len
            && cross(points[hull[hull.len() - 2]], points[hull[hull.len() - 1]], points[i]) <= 0
        {
            hull.pop();
        }
        hull.push(i);
    }
    hull.pop();

    hull.sort_unstable();
    hull
}

/// Distance from `p` to the line through `a` and `b`
fn distance_to_line(p: Point, a: Point, b: Point) -> f32 {
    let length = a.distance_to(&b);
    if length == 0.0 {
        return p.distance_to(&a);
    }
    (cross(a, b, p).abs() as f32) / length
}

/// Deepest contour point between each pair of neighbouring hull vertices.
/// Fewer than three hull vertices yield no defects.
pub fn convexity_defects(points: &[Point], hull: &[usize]) -> Vec<Defect> {
    let mut defects = Vec::new();
    if hull.len() < 3 || points.len() < 4 {
        return defects;
    }

    let n = points.len();
    for (i, &start) in hull.iter().enumerate() {
        let end = hull[(i + 1) % hull.len()];
        let mut best: Option<(usize, f32)> = None;

        let mut idx = (start + 1) % n;
        while idx != end {
            let depth = distance_to_line(points[idx], points[start], points[end]);
            match best {
                Some((_, d)) if d >= depth => {}
                _ => best = Some((idx, depth)),
            }
            idx = (idx + 1) % n;
        }

        if let Some((far, depth)) = best {
            if depth > 0.0 {
                defects.push(Defect {
                    start,
                    end,
                    far,
                    depth,
                });
            }
        }
    }

    defects
}
