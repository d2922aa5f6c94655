//! 2-D geometry primitives: real/integer points, polylines, and the smoothing
//! filters used to tidy a traced coastline.

use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2D {
    x: f64,
    y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn set_xy(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    pub fn distance_to(&self, other: &Point2D) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Integer cell coordinate in the grid CRS: `col in [0, W)`, `row in [0, H)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point2I {
    pub col: i32,
    pub row: i32,
}

impl Point2I {
    pub fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }
}

/// Which side the sea lies on when walking a coastline from start to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
}

/// An ordered sequence of 2-D points: a coastline, a profile centre-line, or
/// any other polyline used by the simulation.
#[derive(Debug, Clone, Default)]
pub struct Polyline {
    points: Vec<Point2D>,
}

impl Polyline {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn from_points(points: Vec<Point2D>) -> Self {
        Self { points }
    }

    pub fn append(&mut self, pt: Point2D) {
        self.points.push(pt);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&Point2D> {
        self.points.get(i)
    }

    pub fn points(&self) -> &[Point2D] {
        &self.points
    }

    /// Euclidean sum of segment lengths. Matches `C2DShape::dGetLength`,
    /// which returns -1 for a degenerate (< 2 point) shape.
    pub fn length(&self) -> f64 {
        if self.points.len() < 2 {
            return -1.0;
        }
        self.points
            .windows(2)
            .map(|w| w[0].distance_to(&w[1]))
            .sum()
    }

    pub fn centroid(&self) -> Option<Point2D> {
        if self.points.is_empty() {
            return None;
        }
        let n = self.points.len() as f64;
        let (sx, sy) = self
            .points
            .iter()
            .fold((0.0, 0.0), |(ax, ay), p| (ax + p.x, ay + p.y));
        Some(Point2D::new(sx / n, sy / n))
    }

    /// Given `start`, a second point `other`, a desired length, and a
    /// handedness, returns the point `end` such that `start->end` is
    /// perpendicular to `start->other`, has length `desired_len`, and lies
    /// on the given side.
    pub fn perpendicular_endpoint(
        start: &Point2D,
        other: &Point2D,
        desired_len: f64,
        handedness: Handedness,
    ) -> Point2D {
        let dx = other.x - start.x;
        let dy = other.y - start.y;
        let len = dx.hypot(dy);
        let scale = desired_len / len;

        match handedness {
            Handedness::Right => Point2D::new(start.x + scale * dy, start.y - scale * dx),
            Handedness::Left => Point2D::new(start.x - scale * dy, start.y + scale * dx),
        }
    }

    /// Intersection point of two line segments `(a0, a1)` and `(b0, b1)`, if
    /// any (segments must actually overlap, not just their infinite lines).
    pub fn segment_intersection(
        a0: &Point2D,
        a1: &Point2D,
        b0: &Point2D,
        b1: &Point2D,
    ) -> Option<Point2D> {
        let (x1, y1) = (a0.x, a0.y);
        let (x2, y2) = (a1.x, a1.y);
        let (x3, y3) = (b0.x, b0.y);
        let (x4, y4) = (b1.x, b1.y);

        let denom = (x1 - x2) * (y3 - y4) - (y1 - y2) * (x3 - x4);
        if denom.abs() < 1e-12 {
            return None;
        }

        let t = ((x1 - x3) * (y3 - y4) - (y1 - y3) * (x3 - x4)) / denom;
        let u = ((x1 - x3) * (y1 - y2) - (y1 - y3) * (x1 - x2)) / denom;

        if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
            Some(Point2D::new(x1 + t * (x2 - x1), y1 + t * (y2 - y1)))
        } else {
            None
        }
    }

    /// Running-mean smoothing with an odd window `w`. Endpoints are left
    /// unsmoothed, and windows that would run off either end of the
    /// polyline are clamped (linear extension: the nearest valid point is
    /// reused).
    pub fn smooth_running_mean(&self, w: usize) -> Polyline {
        assert!(w % 2 == 1, "running-mean window must be odd");
        let n = self.points.len();
        if w <= 1 || n < 3 {
            return self.clone();
        }

        let half = (w / 2) as i64;
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            if i == 0 || i == n - 1 {
                out.push(self.points[i]);
                continue;
            }
            let mut sx = 0.0;
            let mut sy = 0.0;
            let mut count = 0.0;
            for k in -half..=half {
                let idx = (i as i64 + k).clamp(0, n as i64 - 1) as usize;
                sx += self.points[idx].x;
                sy += self.points[idx].y;
                count += 1.0;
            }
            out.push(Point2D::new(sx / count, sy / count));
        }
        Polyline::from_points(out)
    }

    /// Savitzky-Golay smoothing of polynomial order `p <= 6` over an odd
    /// window `w`, using precomputed least-squares convolution coefficients.
    pub fn smooth_savitzky_golay(&self, w: usize, p: usize) -> Polyline {
        assert!(w % 2 == 1, "Savitzky-Golay window must be odd");
        let n = self.points.len();
        if w <= 1 || n < w {
            return self.clone();
        }

        let coeffs = savitzky_golay_coefficients(w, p);
        let half = (w / 2) as i64;
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            if (i as i64) < half || i as i64 >= n as i64 - half {
                out.push(self.points[i]);
                continue;
            }
            let mut sx = 0.0;
            let mut sy = 0.0;
            for (j, c) in coeffs.iter().enumerate() {
                let idx = (i as i64 + j as i64 - half) as usize;
                sx += c * self.points[idx].x;
                sy += c * self.points[idx].y;
            }
            out.push(Point2D::new(sx, sy));
        }
        Polyline::from_points(out)
    }
}

/// Solves the least-squares convolution coefficients for a Savitzky-Golay
/// filter of polynomial order `p` over window `w`, evaluated at the centre
/// point (the only coefficient set the coastline smoother needs).
fn savitzky_golay_coefficients(w: usize, p: usize) -> Vec<f64> {
    let half = (w / 2) as i64;
    let p = p.min(w - 1).min(6);

    // Build the Vandermonde-like design matrix A (w x (p+1)): A[i][k] = i^k.
    let rows = w;
    let cols = p + 1;
    let mut a = vec![vec![0.0_f64; cols]; rows];
    for (i, row) in a.iter_mut().enumerate() {
        let x = (i as i64 - half) as f64;
        let mut xv = 1.0;
        for c in row.iter_mut() {
            *c = xv;
            xv *= x;
        }
    }

    // Normal equations: (A^T A) c = A^T e_0, solved by Gauss-Jordan.
    let mut ata = vec![vec![0.0_f64; cols]; cols];
    for i in 0..cols {
        for j in 0..cols {
            let mut s = 0.0;
            for r in 0..rows {
                s += a[r][i] * a[r][j];
            }
            ata[i][j] = s;
        }
    }

    let mut aug = ata.clone();
    for row in aug.iter_mut() {
        row.push(0.0);
    }
    // A^T e_0 is simply column 0 of A^T, i.e. A[.][0]'s contribution — but we
    // want the coefficients that reproduce the value at the centre sample,
    // which is row `half` of A (x = 0). Solve for coefficients `beta` such
    // that A beta minimizes ||A beta - y||, then the smoothed centre value is
    // beta_0 (since x=0 there); equivalently solve (A^T A) beta = A^T y and
    // pick out the weights on y via the pseudoinverse's first row.
    // Practically: compute pseudoinverse row 0 = (A^T A)^-1 A^T row 0.
    let inv = invert_matrix(&ata);

    let mut coeffs = vec![0.0_f64; rows];
    for (i, coeff) in coeffs.iter_mut().enumerate() {
        // weight on sample i is (A^T A)^-1 row0 dotted with A[i][.]
        let mut s = 0.0;
        for k in 0..cols {
            s += inv[0][k] * a[i][k];
        }
        *coeff = s;
    }
    coeffs
}

fn invert_matrix(m: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = m.len();
    let mut aug: Vec<Vec<f64>> = m
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut r = row.clone();
            r.extend((0..n).map(|j| if i == j { 1.0 } else { 0.0 }));
            r
        })
        .collect();

    for col in 0..n {
        let mut pivot = col;
        for r in col + 1..n {
            if aug[r][col].abs() > aug[pivot][col].abs() {
                pivot = r;
            }
        }
        aug.swap(col, pivot);
        let pv = aug[col][col];
        if pv.abs() < 1e-15 {
            continue;
        }
        for v in aug[col].iter_mut() {
            *v /= pv;
        }
        for r in 0..n {
            if r == col {
                continue;
            }
            let factor = aug[r][col];
            if factor == 0.0 {
                continue;
            }
            for c in 0..(2 * n) {
                aug[r][c] -= factor * aug[col][c];
            }
        }
    }

    aug.into_iter().map(|row| row[n..].to_vec()).collect()
}

/// Azimuth in degrees (clockwise from north) of the vector `(dx, dy)` in a
/// standard x-east/y-north CRS.
pub fn azimuth_degrees(dx: f64, dy: f64) -> f64 {
    const TOLERANCE: f64 = 1e-9;
    if dy.abs() < TOLERANCE {
        return if dx > 0.0 { 90.0 } else { 270.0 };
    }
    if dx.abs() < TOLERANCE {
        return if dy > 0.0 { 0.0 } else { 180.0 };
    }
    let az = if dx > 0.0 {
        (180.0 / PI) * (PI * 0.5 - (dy / dx).atan())
    } else {
        (180.0 / PI) * (PI * 1.5 - (dy / dx).atan())
    };
    az
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_of_unit_square_diagonal_path() {
        let mut p = Polyline::new();
        p.append(Point2D::new(0.0, 0.0));
        p.append(Point2D::new(3.0, 4.0));
        assert!((p.length() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_polyline_length_is_negative_one() {
        let mut p = Polyline::new();
        p.append(Point2D::new(0.0, 0.0));
        assert_eq!(p.length(), -1.0);
    }

    #[test]
    fn perpendicular_is_orthogonal_and_correct_length() {
        let start = Point2D::new(0.0, 0.0);
        let other = Point2D::new(10.0, 0.0);
        let end = Polyline::perpendicular_endpoint(&start, &other, 5.0, Handedness::Right);
        let dot = (other.x() - start.x()) * (end.x() - start.x())
            + (other.y() - start.y()) * (end.y() - start.y());
        assert!(dot.abs() < 1e-9);
        assert!((start.distance_to(&end) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn segment_intersection_finds_crossing() {
        let p = Polyline::segment_intersection(
            &Point2D::new(0.0, 0.0),
            &Point2D::new(2.0, 2.0),
            &Point2D::new(0.0, 2.0),
            &Point2D::new(2.0, 0.0),
        );
        let p = p.expect("segments cross");
        assert!((p.x() - 1.0).abs() < 1e-9);
        assert!((p.y() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn parallel_segments_do_not_intersect() {
        let p = Polyline::segment_intersection(
            &Point2D::new(0.0, 0.0),
            &Point2D::new(1.0, 0.0),
            &Point2D::new(0.0, 1.0),
            &Point2D::new(1.0, 1.0),
        );
        assert!(p.is_none());
    }

    #[test]
    fn running_mean_window_one_is_identity() {
        let mut p = Polyline::new();
        for i in 0..5 {
            p.append(Point2D::new(i as f64, (i * i) as f64));
        }
        let smoothed = p.smooth_running_mean(1);
        for (a, b) in p.points().iter().zip(smoothed.points().iter()) {
            assert!((a.x() - b.x()).abs() < 1e-9);
            assert!((a.y() - b.y()).abs() < 1e-9);
        }
    }

    #[test]
    fn savitzky_golay_order_equal_to_length_is_identity_on_straight_line() {
        // On a straight line, any-order SG reproduces the interior points exactly.
        let mut p = Polyline::new();
        for i in 0..9 {
            p.append(Point2D::new(i as f64, 2.0 * i as f64 + 1.0));
        }
        let smoothed = p.smooth_savitzky_golay(5, 2);
        for i in 2..7 {
            let a = p.get(i).unwrap();
            let b = smoothed.get(i).unwrap();
            assert!((a.x() - b.x()).abs() < 1e-6);
            assert!((a.y() - b.y()).abs() < 1e-6);
        }
    }

    #[test]
    fn azimuth_cardinal_directions() {
        assert!((azimuth_degrees(0.0, 1.0) - 0.0).abs() < 1e-9);
        assert!((azimuth_degrees(1.0, 0.0) - 90.0).abs() < 1e-9);
        assert!((azimuth_degrees(0.0, -1.0) - 180.0).abs() < 1e-9);
        assert!((azimuth_degrees(-1.0, 0.0) - 270.0).abs() < 1e-9);
    }
}
