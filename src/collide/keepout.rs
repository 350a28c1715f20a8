//! Per-positioner keep-out geometry and the neighbor graph (spec §3.4).

use std::collections::HashMap;

use cgmath::{Point2, Vector2};

use crate::calibration::{Calibration, CalibrationStore, PositionerId};
use crate::geom::Polygon;

/// The rotatable keep-out outlines and ferrule disk for one positioner, plus
/// its fixed center in petal coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct KeepoutGeometry {
    /// Central body outline, local frame, rotates with theta.
    pub keepout_t: Polygon,
    /// Phi arm outline, local frame, rotates with theta then phi.
    pub keepout_p: Polygon,
    /// Ferrule disk radius at the arm tip.
    pub ferrule_radius: f64,
    /// This positioner's theta-axis center, petal-local mm.
    pub center: Point2<f64>,
}

/// A positioner's keep-out outlines placed at a given shaft angle, in petal coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedPositioner {
    /// Placed central body outline.
    pub theta_body: Polygon,
    /// Placed phi arm outline.
    pub phi_arm: Polygon,
    /// Ferrule tip location.
    pub ferrule: Point2<f64>,
    /// Ferrule disk radius.
    pub ferrule_radius: f64,
}

impl KeepoutGeometry {
    /// Place this positioner's outlines at shaft angles `(t_deg, p_deg)`.
    pub fn place(&self, t_deg: f64, p_deg: f64, calib: &Calibration) -> PlacedPositioner {
        let center_vec = Vector2::new(self.center.x, self.center.y);
        let theta_body = self.keepout_t.placed(t_deg, center_vec);

        let arm_origin = Point2::new(
            self.center.x + calib.length_r1 * t_deg.to_radians().cos(),
            self.center.y + calib.length_r1 * t_deg.to_radians().sin(),
        );
        let phi_arm = self
            .keepout_p
            .placed(t_deg + p_deg, Vector2::new(arm_origin.x, arm_origin.y));

        let ferrule = Point2::new(
            arm_origin.x + calib.length_r2 * (t_deg + p_deg).to_radians().cos(),
            arm_origin.y + calib.length_r2 * (t_deg + p_deg).to_radians().sin(),
        );

        PlacedPositioner {
            theta_body,
            phi_arm,
            ferrule,
            ferrule_radius: self.ferrule_radius,
        }
    }
}

/// A fixed, non-rotating keep-out boundary: the petal edge or the GFA camera envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedBoundary {
    /// Identifying tag, e.g. `"PTL"` or `"GFA"`.
    pub tag: &'static str,
    /// Outline, petal-local mm.
    pub polygon: Polygon,
}

/// Precomputed, per-positioner neighbor lists (spec §3.4).
#[derive(Debug, Clone, Default)]
pub struct NeighborGraph {
    pos_neighbors: HashMap<PositionerId, Vec<PositionerId>>,
    fixed_neighbors: HashMap<PositionerId, Vec<&'static str>>,
}

impl NeighborGraph {
    /// Build the neighbor graph by a pairwise distance filter on positioner centers:
    /// two positioners are neighbors if their patrol disks (radius `r1+r2`, plus a
    /// safety margin) can overlap.
    pub fn build(
        store: &CalibrationStore,
        geometry: &HashMap<PositionerId, KeepoutGeometry>,
        fixed: &[FixedBoundary],
        margin_mm: f64,
    ) -> Self {
        let ids = store.sorted_ids();
        let mut pos_neighbors: HashMap<PositionerId, Vec<PositionerId>> = HashMap::new();
        let mut fixed_neighbors: HashMap<PositionerId, Vec<&'static str>> = HashMap::new();

        for id in &ids {
            pos_neighbors.insert(id.clone(), Vec::new());
            fixed_neighbors.insert(id.clone(), Vec::new());
        }

        for i in 0..ids.len() {
            let id_a = &ids[i];
            let calib_a = store.get(id_a).expect("id from store must resolve");
            let geom_a = match geometry.get(id_a) {
                Some(g) => g,
                None => continue,
            };
            let patrol_a = calib_a.length_r1 + calib_a.length_r2 + margin_mm;

            for j in (i + 1)..ids.len() {
                let id_b = &ids[j];
                let calib_b = store.get(id_b).expect("id from store must resolve");
                let geom_b = match geometry.get(id_b) {
                    Some(g) => g,
                    None => continue,
                };
                let patrol_b = calib_b.length_r1 + calib_b.length_r2 + margin_mm;
                let dx = geom_a.center.x - geom_b.center.x;
                let dy = geom_a.center.y - geom_b.center.y;
                let dist = (dx * dx + dy * dy).sqrt();
                if dist <= patrol_a + patrol_b {
                    pos_neighbors.get_mut(id_a).unwrap().push(id_b.clone());
                    pos_neighbors.get_mut(id_b).unwrap().push(id_a.clone());
                }
            }

            for boundary in fixed {
                let bbox_dist = nearest_vertex_distance(geom_a.center, &boundary.polygon);
                if bbox_dist <= patrol_a {
                    fixed_neighbors.get_mut(id_a).unwrap().push(boundary.tag);
                }
            }
        }

        NeighborGraph {
            pos_neighbors,
            fixed_neighbors,
        }
    }

    /// Positioner ids that may collide with `id`.
    pub fn pos_neighbors(&self, id: &str) -> &[PositionerId] {
        self.pos_neighbors
            .get(id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Fixed boundary tags that may collide with `id`.
    pub fn fixed_neighbors(&self, id: &str) -> &[&'static str] {
        self.fixed_neighbors
            .get(id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

fn nearest_vertex_distance(center: Point2<f64>, polygon: &Polygon) -> f64 {
    polygon
        .vertices
        .iter()
        .map(|v| ((v.x - center.x).powi(2) + (v.y - center.y).powi(2)).sqrt())
        .fold(f64::INFINITY, f64::min)
}
