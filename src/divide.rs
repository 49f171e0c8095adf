use glam::DVec2;
use log::debug;

use crate::{
    element::{EH, NH},
    error::Error,
    geometry::{self, Displacement},
    mesh::VertexMeshT,
};

impl<const DIM: usize, D> VertexMeshT<DIM, D>
where
    D: Displacement,
{
    /// Divide the element along its short axis, through its centroid. Returns
    /// the new element.
    pub fn divide_element_along_short_axis(
        &mut self,
        e: EH,
        place_original_below: bool,
    ) -> Result<EH, Error> {
        let axis = self.element_short_axis(e)?;
        self.divide_element_along_axis(e, axis, place_original_below)
    }

    /// Divide the element along the line through its centroid in the direction
    /// of `axis`.
    ///
    /// New nodes are created where the line crosses the boundary of the
    /// element, and are inserted into every element that shares the crossed
    /// edges. A crossing closer than the rearrangement threshold to an existing
    /// node is moved twice that distance away from it along the edge. Returns
    /// the new element.
    pub fn divide_element_along_axis(
        &mut self,
        e: EH,
        axis: DVec2,
        place_original_below: bool,
    ) -> Result<EH, Error> {
        Self::require_2d()?;
        self.topol.check_element(e)?;
        if !(axis.length_squared() > 0.0) {
            return Err(Error::DegenerateAxis);
        }
        let (origin, pts) = self.local_points_2d(e);
        let centroid = geometry::centroid(&pts);
        let normal = axis.perp();
        let side: Vec<bool> = pts
            .iter()
            .map(|p| (*p - centroid).dot(normal) >= 0.0)
            .collect();
        let len = pts.len();
        let crossed: Vec<usize> = (0..len).filter(|i| side[*i] != side[(i + 1) % len]).collect();
        if crossed.len() != 2 {
            return Err(Error::DivisionFailed(
                e,
                "the axis must cross exactly two edges",
            ));
        }
        let threshold = self.config.rearrangement_threshold;
        let mut cuts: Vec<(NH, NH, DVec2)> = Vec::with_capacity(2);
        for i in crossed {
            let (pa, pb) = (pts[i], pts[(i + 1) % len]);
            let t = geometry::line_segment_intersection(centroid, axis, pa, pb).ok_or(
                Error::DivisionFailed(e, "the axis is parallel to a crossed edge"),
            )?;
            let edge = pb - pa;
            let elen = edge.length();
            let mut p = pa + t * edge;
            if elen < 4.0 * threshold {
                p = pa + 0.5 * edge;
            } else if t * elen < threshold {
                p = pa + edge * (2.0 * threshold / elen);
            } else if (1.0 - t) * elen < threshold {
                p = pb - edge * (2.0 * threshold / elen);
            }
            let elem = self.topol.element(e);
            cuts.push((elem.node(i), elem.node(i + 1), p));
        }
        let mut created = [NH::from(0u32); 2];
        for (k, (a, b, p)) in cuts.into_iter().enumerate() {
            let n = self.topol.add_node(origin + p.extend(0.0));
            self.insert_into_edge(n, a, b);
            created[k] = n;
        }
        let elem = self.topol.element(e);
        let (Some(ia), Some(ib)) = (elem.local_index(created[0]), elem.local_index(created[1]))
        else {
            return Err(Error::DivisionFailed(e, "new nodes were not inserted"));
        };
        self.split_element(e, ia, ib, place_original_below)
    }

    /// Divide the element by cutting it between the nodes at the two local
    /// indices. The element keeps the nodes from the lower to the higher local
    /// index, and the new element gets the rest along with both cut nodes.
    /// If `place_original_below` is set, the two parts are swapped if needed so
    /// that the original element is the one with the lower centroid. Returns
    /// the new element.
    pub fn divide_element_at_nodes(
        &mut self,
        e: EH,
        local_a: usize,
        local_b: usize,
        place_original_below: bool,
    ) -> Result<EH, Error> {
        Self::require_2d()?;
        self.topol.check_element(e)?;
        let len = self.topol.element_valence(e);
        if local_a >= len || local_b >= len || local_a == local_b {
            return Err(Error::DivisionFailed(e, "invalid local indices"));
        }
        self.split_element(e, local_a, local_b, place_original_below)
    }

    fn split_element(
        &mut self,
        e: EH,
        local_a: usize,
        local_b: usize,
        place_original_below: bool,
    ) -> Result<EH, Error> {
        let (lo, hi) = (local_a.min(local_b), local_a.max(local_b));
        let nodes = self.topol.element_nodes(e);
        let mut original: Vec<NH> = nodes[lo..=hi].to_vec();
        let mut other: Vec<NH> = nodes[hi..].iter().chain(&nodes[..=lo]).copied().collect();
        if original.len() < 3 || other.len() < 3 {
            return Err(Error::DivisionFailed(
                e,
                "each part must have at least three nodes",
            ));
        }
        if place_original_below && self.arc_height(&original) > self.arc_height(&other) {
            std::mem::swap(&mut original, &mut other);
        }
        let region = self.topol.region(e);
        self.topol.set_element_nodes(e, original);
        let new = self.topol.add_element(&other, region)?;
        self.refresh_boundary_around(&[e, new]);
        debug!("Divided {e}, created {new}");
        Ok(new)
    }

    /// Height of the centroid of the polygon with the given nodes.
    fn arc_height(&self, nodes: &[NH]) -> f64 {
        let (origin, pts) = self.local_points_of(nodes);
        let pts: Vec<DVec2> = pts.into_iter().map(|p| p.truncate()).collect();
        origin.y + geometry::centroid(&pts).y
    }
}
