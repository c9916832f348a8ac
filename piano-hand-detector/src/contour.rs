//! External contour extraction on binary masks.
//!
//! Each 8-connected foreground component yields one outer boundary starting
//! at its raster-first pixel and running counter-clockwise on screen (down
//! the left side first), the order OpenCV's `findContours` reports. The
//! boundary is then compressed so that only the points where it turns are kept.

use crate::mask::Mask;
use alloc::vec;
use alloc::vec::Vec;
use piano_shared::BoundingBox;

/// A point in image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        libm::sqrtf(dx * dx + dy * dy)
    }
}

/// Neighbour offsets, clockwise starting east (y grows downwards)
const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

fn direction_index(dx: i32, dy: i32) -> usize {
    DIRECTIONS
        .iter()
        .position(|&d| d == (dx, dy))
        .unwrap_or(4)
}

/// Closed boundary polygon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    points: Vec<Point>,
}

impl Contour {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Enclosed area by the shoelace formula
    pub fn area(&self) -> f32 {
        if self.points.len() < 3 {
            return 0.0;
        }
        let mut twice_area: i64 = 0;
        for (i, p) in self.points.iter().enumerate() {
            let q = self.points[(i + 1) % self.points.len()];
            twice_area += i64::from(p.x) * i64::from(q.y) - i64::from(q.x) * i64::from(p.y);
        }
        (twice_area.abs() as f32) / 2.0
    }

    /// First point with the smallest y
    pub fn topmost(&self) -> Option<Point> {
        self.extreme_by(|p| p.y)
    }

    pub fn leftmost(&self) -> Option<Point> {
        self.extreme_by(|p| p.x)
    }

    pub fn rightmost(&self) -> Option<Point> {
        self.extreme_by(|p| -p.x)
    }

    fn extreme_by<F: Fn(&Point) -> i32>(&self, key: F) -> Option<Point> {
        let mut best: Option<Point> = None;
        for p in &self.points {
            match best {
                Some(b) if key(&b) <= key(p) => {}
                _ => best = Some(*p),
            }
        }
        best
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let min_x = self.points.iter().map(|p| p.x).min()?;
        let max_x = self.points.iter().map(|p| p.x).max()?;
        let min_y = self.points.iter().map(|p| p.y).min()?;
        let max_y = self.points.iter().map(|p| p.y).max()?;
        Some(BoundingBox {
            x: min_x.max(0) as u32,
            y: min_y.max(0) as u32,
            width: (max_x - min_x + 1) as u32,
            height: (max_y - min_y + 1) as u32,
        })
    }
}

/// Outer boundaries of every foreground component, in raster order of their first pixel
pub fn find_external_contours(mask: &Mask) -> Vec<Contour> {
    let (width, height) = (mask.width(), mask.height());
    let mut visited = vec![false; width * height];
    let mut contours = Vec::new();
    let mut stack = Vec::new();

    for y in 0..height {
        for x in 0..width {
            let idx = y * width + x;
            if visited[idx] || !mask.get(x as isize, y as isize) {
                continue;
            }

            // Flood the component so its other pixels are not traced again
            let mut pixel_count = 0usize;
            visited[idx] = true;
            stack.push((x, y));
            while let Some((cx, cy)) = stack.pop() {
                pixel_count += 1;
                for (dx, dy) in DIRECTIONS {
                    let nx = cx as isize + dx as isize;
                    let ny = cy as isize + dy as isize;
                    if !mask.get(nx, ny) {
                        continue;
                    }
                    let nidx = ny as usize * width + nx as usize;
                    if !visited[nidx] {
                        visited[nidx] = true;
                        stack.push((nx as usize, ny as usize));
                    }
                }
            }

            let start = Point::new(x as i32, y as i32);
            let traced = trace_boundary(mask, start, pixel_count);
            contours.push(Contour::new(compress(traced)));
        }
    }

    contours
}

/// Contour with the greatest enclosed area
pub fn largest(contours: &[Contour]) -> Option<&Contour> {
    let mut best: Option<&Contour> = None;
    for contour in contours {
        match best {
            Some(b) if b.area() >= contour.area() => {}
            _ => best = Some(contour),
        }
    }
    best
}

/// Moore-neighbour tracing from the raster-first pixel of a component.
/// Stops once the walk leaves `start` towards the second boundary pixel again.
/// Returns the boundary counter-clockwise.
fn trace_boundary(mask: &Mask, start: Point, pixel_count: usize) -> Vec<Point> {
    let is_fg = |p: Point| mask.get(p.x as isize, p.y as isize);

    let mut contour = vec![start];
    // West of the raster-first pixel is always background
    let mut backtrack = Point::new(start.x - 1, start.y);
    let mut current = start;
    let mut second: Option<Point> = None;
    let max_steps = 4 * pixel_count + 8;

    for _ in 0..max_steps {
        let from = direction_index(backtrack.x - current.x, backtrack.y - current.y);
        let mut previous = backtrack;
        let mut next = None;
        for k in 1..=8 {
            let (dx, dy) = DIRECTIONS[(from + k) % 8];
            let candidate = Point::new(current.x + dx, current.y + dy);
            if is_fg(candidate) {
                next = Some(candidate);
                break;
            }
            previous = candidate;
        }

        // Isolated pixel
        let Some(next) = next else { break };

        if current == start {
            match second {
                Some(s) if s == next => break,
                Some(_) => {}
                None => second = Some(next),
            }
        }

        contour.push(next);
        backtrack = previous;
        current = next;
    }

    if contour.len() > 1 && contour.last() == Some(&start) {
        contour.pop();
    }
    // The walk above runs clockwise; keep `start` first and flip the rest
    contour[1..].reverse();
    contour
}

/// Drop points whose incoming and outgoing steps point the same way
fn compress(points: Vec<Point>) -> Vec<Point> {
    let n = points.len();
    if n < 3 {
        return points;
    }
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let prev = points[(i + n - 1) % n];
        let cur = points[i];
        let next = points[(i + 1) % n];
        let incoming = (cur.x - prev.x, cur.y - prev.y);
        let outgoing = (next.x - cur.x, next.y - cur.y);
        if incoming != outgoing {
            out.push(cur);
        }
    }
    out
}
