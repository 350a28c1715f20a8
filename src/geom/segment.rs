//! Line segments and segment-segment intersection.
//!
//! The collider needs a cheap, exact test for whether two finite
//! segments cross; this is the basis every keep-out polygon check in
//! [`super::polygon`] is built from (spec §2, "Geometry primitives").

use cgmath::Point2;

/// A finite line segment between two points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Start point.
    pub a: Point2<f64>,
    /// End point.
    pub b: Point2<f64>,
}

impl Segment {
    /// Build a segment from two points.
    pub fn new(a: Point2<f64>, b: Point2<f64>) -> Self {
        Segment { a, b }
    }

    /// Whether `self` and `other` intersect, including touching endpoints.
    pub fn intersects(&self, other: &Segment) -> bool {
        let d1 = orientation(other.a, other.b, self.a);
        let d2 = orientation(other.a, other.b, self.b);
        let d3 = orientation(self.a, self.b, other.a);
        let d4 = orientation(self.a, self.b, other.b);

        if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
            && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
        {
            return true;
        }

        if d1 == 0.0 && on_segment(other.a, other.b, self.a) {
            return true;
        }
        if d2 == 0.0 && on_segment(other.a, other.b, self.b) {
            return true;
        }
        if d3 == 0.0 && on_segment(self.a, self.b, other.a) {
            return true;
        }
        if d4 == 0.0 && on_segment(self.a, self.b, other.b) {
            return true;
        }

        false
    }

    /// Shortest distance from `p` to this segment.
    pub fn distance_to_point(&self, p: Point2<f64>) -> f64 {
        let ab = self.b - self.a;
        let len2 = ab.x * ab.x + ab.y * ab.y;
        if len2 == 0.0 {
            return dist(self.a, p);
        }
        let t = ((p.x - self.a.x) * ab.x + (p.y - self.a.y) * ab.y) / len2;
        let t = t.clamp(0.0, 1.0);
        let proj = Point2::new(self.a.x + t * ab.x, self.a.y + t * ab.y);
        dist(proj, p)
    }
}

fn dist(a: Point2<f64>, b: Point2<f64>) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

/// Signed area of the triangle (p, q, r); sign gives turn direction.
fn orientation(p: Point2<f64>, q: Point2<f64>, r: Point2<f64>) -> f64 {
    (q.x - p.x) * (r.y - p.y) - (q.y - p.y) * (r.x - p.x)
}

/// Whether `r` lies within the bounding box of segment `p`-`q`, given `r` is collinear with it.
fn on_segment(p: Point2<f64>, q: Point2<f64>, r: Point2<f64>) -> bool {
    r.x <= p.x.max(q.x) && r.x >= p.x.min(q.x) && r.y <= p.y.max(q.y) && r.y >= p.y.min(q.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_segments_intersect() {
        let s1 = Segment::new(Point2::new(0.0, 0.0), Point2::new(4.0, 4.0));
        let s2 = Segment::new(Point2::new(0.0, 4.0), Point2::new(4.0, 0.0));
        assert!(s1.intersects(&s2));
    }

    #[test]
    fn parallel_segments_do_not_intersect() {
        let s1 = Segment::new(Point2::new(0.0, 0.0), Point2::new(4.0, 0.0));
        let s2 = Segment::new(Point2::new(0.0, 1.0), Point2::new(4.0, 1.0));
        assert!(!s1.intersects(&s2));
    }

    #[test]
    fn touching_endpoint_counts_as_intersection() {
        let s1 = Segment::new(Point2::new(0.0, 0.0), Point2::new(2.0, 0.0));
        let s2 = Segment::new(Point2::new(2.0, 0.0), Point2::new(2.0, 2.0));
        assert!(s1.intersects(&s2));
    }

    #[test]
    fn distance_to_point_is_perpendicular_when_projection_falls_inside() {
        let s = Segment::new(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0));
        assert!((s.distance_to_point(Point2::new(5.0, 3.0)) - 3.0).abs() < 1e-9);
    }
}
