//! Keep-out polygons: rigid outlines that rotate and translate with a
//! positioner's shafts, tested for intersection against each other and
//! against fixed boundaries (spec §3.4).

use cgmath::{Angle, Basis2, Point2, Rad, Rotation, Rotation2, Vector2};

use super::segment::Segment;

/// A rigid polygon outline in some local frame. Vertices are stored in
/// the order they should be connected; the last vertex connects back to
/// the first. Not required to be convex — the collider only needs
/// segment-segment intersection, not a support function.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    /// Vertices, in order, in the polygon's local frame.
    pub vertices: Vec<Point2<f64>>,
}

impl Polygon {
    /// Build a polygon from a vertex list.
    pub fn new(vertices: Vec<Point2<f64>>) -> Self {
        Polygon { vertices }
    }

    /// Return the polygon's edges as segments, including the closing edge.
    pub fn edges(&self) -> Vec<Segment> {
        let n = self.vertices.len();
        if n < 2 {
            return Vec::new();
        }
        (0..n)
            .map(|i| Segment::new(self.vertices[i], self.vertices[(i + 1) % n]))
            .collect()
    }

    /// Produce a copy of this polygon rotated by `angle_deg` about the origin of its own frame,
    /// then translated by `offset`. This is how a keep-out outline is placed in the petal frame
    /// at a given shaft angle (spec §3.4).
    pub fn placed(&self, angle_deg: f64, offset: Vector2<f64>) -> Polygon {
        let rot: Basis2<f64> = Rotation2::from_angle(Rad::from(cgmath::Deg(angle_deg)));
        let vertices = self
            .vertices
            .iter()
            .map(|v| rot.rotate_point(*v) + offset)
            .collect();
        Polygon::new(vertices)
    }

    /// Whether any edge of `self` crosses any edge of `other`.
    pub fn intersects(&self, other: &Polygon) -> bool {
        let self_edges = self.edges();
        let other_edges = other.edges();
        self_edges
            .iter()
            .any(|e1| other_edges.iter().any(|e2| e1.intersects(e2)))
    }

    /// Whether this polygon intersects a disk of the given radius centered at `center`
    /// (used for ferrule-tip endpoint tests, spec §3.4).
    pub fn intersects_disk(&self, center: Point2<f64>, radius: f64) -> bool {
        self.edges()
            .iter()
            .any(|e| e.distance_to_point(center) <= radius)
            || self.contains_point(center)
    }

    /// Even-odd point-in-polygon test, used so a disk fully inside the polygon still
    /// registers as intersecting.
    pub fn contains_point(&self, p: Point2<f64>) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let vi = self.vertices[i];
            let vj = self.vertices[j];
            if ((vi.y > p.y) != (vj.y > p.y))
                && (p.x < (vj.x - vi.x) * (p.y - vi.y) / (vj.y - vi.y) + vi.x)
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}
