use std::collections::BTreeSet;

use glam::{DVec2, DVec3};
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
    /// Merge two nodes into one, at their midpoint.
    ///
    /// The node with the lower index survives. Elements that contain both
    /// nodes lose the other node, and elements that only contain the other
    /// node get the surviving node in its place. Returns the surviving node.
    pub fn merge_nodes(&mut self, a: NH, b: NH) -> Result<NH, Error> {
        self.topol.check_node(a)?;
        self.topol.check_node(b)?;
        if a == b {
            return Err(Error::EdgeNotFound(a, b));
        }
        let (keep, remove) = if a < b { (a, b) } else { (b, a) };
        if let Some(e) = self
            .topol
            .shared_elements(keep, remove)
            .into_iter()
            .find(|e| self.topol.element_valence(*e) <= 3)
        {
            return Err(Error::DegenerateElement(e));
        }
        let affected: Vec<EH> = self.topol.node_elements(remove).iter().copied().collect();
        let mid = self.point_along(keep, remove, 0.5);
        self.topol.set_position(keep, mid);
        for e in affected.iter().copied() {
            let Some(i) = self.topol.element(e).local_index(remove) else {
                continue;
            };
            if self.topol.element(e).contains(keep) {
                self.topol.remove_node_at(e, i);
            } else {
                self.topol.replace_node_at(e, i, keep);
            }
        }
        self.topol.delete_node(remove);
        let mut around: Vec<EH> = self.topol.node_elements(keep).iter().copied().collect();
        around.extend(affected);
        self.refresh_boundary_around(&around);
        debug!("Merged {remove} into {keep}");
        Ok(keep)
    }

    /// Divide the edge between two adjacent nodes, by inserting a new node at
    /// its midpoint into every element that contains the edge. Returns the new
    /// node.
    pub fn divide_edge(&mut self, a: NH, b: NH) -> Result<NH, Error> {
        self.topol.check_node(a)?;
        self.topol.check_node(b)?;
        let elements: Vec<EH> = self.topol.edge_elements(a, b).collect();
        if elements.is_empty() {
            return Err(Error::EdgeNotFound(a, b));
        }
        let mid = self.point_along(a, b, 0.5);
        let n = self.topol.add_node(mid);
        self.insert_into_edge(n, a, b);
        self.topol.refresh_boundary_flag(n);
        debug!("Divided the edge from {a} to {b} with {n}");
        Ok(n)
    }

    /// Inserts `n` between `a` and `b` in every element in which they are
    /// adjacent, and which doesn't already contain `n`.
    pub(crate) fn insert_into_edge(&mut self, n: NH, a: NH, b: NH) {
        let elements: Vec<EH> = self
            .topol
            .edge_elements(a, b)
            .filter(|e| !self.topol.element(*e).contains(n))
            .collect();
        for e in elements {
            if let Some(i) = self.topol.element(e).edge_start(a, b) {
                self.topol.insert_node_after(e, i, n);
            }
        }
    }

    /// Neighbour exchange between the nodes `a` and `b`.
    ///
    /// The nodes are moved symmetrically along the perpendicular bisector of
    /// the segment joining them, so they end up `rearrangement_ratio *
    /// rearrangement_threshold` apart. Then for each element containing either
    /// node: an element that only contains `b` gets `a` inserted after `b`, an
    /// element that only contains `a` gets `b` inserted after `a`, and an
    /// element that contains both loses `b` if `a` follows `b`, and loses `a`
    /// otherwise.
    pub(crate) fn perform_t1_swap(&mut self, a: NH, b: NH) -> Result<(), Error> {
        Self::require_2d()?;
        let elements: BTreeSet<EH> = self.topol.union_elements(a, b);
        let pa = self.topol.position(a);
        let ab = self.node_vector(a, b).truncate();
        let len = ab.length();
        let dir = if len > f64::EPSILON {
            ab.perp() / len
        } else {
            DVec2::X
        };
        let half = (0.5 * self.config.t1_edge_length() * dir).extend(0.0);
        let mid = pa + 0.5 * ab.extend(0.0);
        for e in &elements {
            let elem = self.topol.element(*e);
            if elem.contains(a) && elem.contains(b) && elem.num_nodes() <= 3 {
                return Err(Error::DegenerateElement(*e));
            }
        }
        self.topol.set_position(a, mid - half);
        self.topol.set_position(b, mid + half);
        for e in elements.iter().copied() {
            let elem = self.topol.element(e);
            match (elem.local_index(a), elem.local_index(b)) {
                (None, Some(ib)) => self.topol.insert_node_after(e, ib, a),
                (Some(ia), None) => self.topol.insert_node_after(e, ia, b),
                (Some(ia), Some(ib)) => {
                    if elem.next_local(ib) == ia {
                        self.topol.remove_node_at(e, ib);
                    } else {
                        self.topol.remove_node_at(e, ia);
                    }
                }
                (None, None) => {}
            }
        }
        let elements: Vec<EH> = elements.into_iter().collect();
        self.refresh_boundary_around(&elements);
        self.swaps.t1.push(mid.truncate());
        debug!("T1 swap between {a} and {b} at {mid}");
        Ok(())
    }

    /// Replace a small triangular element with a single node at its
    /// centroid. Each neighbouring element gets the new node in place of the
    /// run of triangle nodes it contains. Returns the new node.
    pub fn perform_t2_swap(&mut self, e: EH) -> Result<NH, Error> {
        Self::require_2d()?;
        self.topol.check_element(e)?;
        if self.topol.element_valence(e) != 3 {
            return Err(Error::NotATriangle(e));
        }
        let tri: Vec<NH> = self.topol.element_nodes(e).to_vec();
        let centroid = self.element_centroid(e)?;
        let neighbours: BTreeSet<EH> = tri
            .iter()
            .flat_map(|n| self.topol.node_elements(*n).iter().copied())
            .filter(|f| *f != e)
            .collect();
        let n = self.topol.add_node(centroid);
        // Compute the new node cycles before touching anything.
        let mut updates = Vec::with_capacity(neighbours.len());
        for f in neighbours.iter().copied() {
            let nodes = self.topol.element_nodes(f);
            let len = nodes.len();
            let mut out = Vec::with_capacity(len);
            for (i, m) in nodes.iter().enumerate() {
                if !tri.contains(m) {
                    out.push(*m);
                } else if !tri.contains(&nodes[(i + len - 1) % len]) {
                    out.push(n);
                }
            }
            if out.len() < 3 {
                self.topol.delete_node(n);
                return Err(Error::DegenerateElement(f));
            }
            updates.push((f, out));
        }
        for (f, nodes) in updates {
            self.topol.set_element_nodes(f, nodes);
        }
        self.topol.delete_element(e);
        for m in tri {
            if self.topol.node_elements(m).is_empty() {
                self.topol.delete_node(m);
            }
        }
        let neighbours: Vec<EH> = neighbours.into_iter().collect();
        self.refresh_boundary_around(&neighbours);
        self.topol.refresh_boundary_flag(n);
        self.swaps.t2.push(centroid.truncate());
        debug!("T2 swap removed {e}, replaced by {n} at {centroid}");
        Ok(n)
    }

    /// Resolve a boundary node `n` that has moved inside the element `e`.
    ///
    /// The node is projected onto the nearest edge of the element. If the
    /// projection is within the rearrangement threshold of one of the ends of
    /// that edge, the node is merged with it. Otherwise the node is moved to
    /// the projection and inserted into the edge.
    ///
    /// Inserting `n` between `a` and `b` must not repeat a directed edge of
    /// another element. If that element is the one across the edge, folded
    /// back over it as `b, a, n` or `n, b, a`, the end in the middle is
    /// removed from it. Otherwise `n` is merged with that end.
    pub fn perform_t3_swap(&mut self, n: NH, e: EH) -> Result<(), Error> {
        Self::require_2d()?;
        self.topol.check_node(n)?;
        self.topol.check_element(e)?;
        let (origin, pts) = self.local_points_2d(e);
        let p = self.vector(origin, self.topol.position(n)).truncate();
        let len = pts.len();
        let mut best: Option<(usize, DVec2, f64)> = None;
        for i in 0..len {
            let (q, _) = geometry::closest_point_on_segment(pts[i], pts[(i + 1) % len], p);
            let d = q.distance(p);
            if best.is_none_or(|(_, _, bd)| d < bd) {
                best = Some((i, q, d));
            }
        }
        let Some((i, q, _)) = best else {
            return Err(Error::DegenerateElement(e));
        };
        let (a, b) = (
            self.topol.element(e).node(i),
            self.topol.element(e).node(i + 1),
        );
        let location = origin + q.extend(0.0);
        self.swaps.t3.push(location.truncate());
        let threshold = self.config.rearrangement_threshold;
        if q.distance(pts[i]) < threshold {
            debug!("T3 swap merges {n} with {a}");
            self.merge_nodes(n, a)?;
        } else if q.distance(pts[(i + 1) % len]) < threshold {
            debug!("T3 swap merges {n} with {b}");
            self.merge_nodes(n, b)?;
        } else {
            let others: Vec<EH> = self
                .topol
                .node_elements(n)
                .iter()
                .copied()
                .filter(|f| *f != e)
                .collect();
            let mut folds = Vec::new();
            for f in others {
                let elem = self.topol.element(f);
                let (after_a, before_b) = (elem.has_edge(a, n), elem.has_edge(n, b));
                if !after_a && !before_b {
                    continue;
                }
                let end = if after_a { a } else { b };
                if !elem.has_edge(b, a) {
                    debug!("T3 swap merges {n} with its neighbour {end}");
                    self.merge_nodes(n, end)?;
                    return Ok(());
                }
                if elem.num_nodes() <= 3 {
                    return Err(Error::DegenerateElement(f));
                }
                folds.push((f, end));
            }
            for (f, end) in folds.iter().copied() {
                if let Some(i) = self.topol.element(f).local_index(end) {
                    self.topol.remove_node_at(f, i);
                    debug!("T3 swap removed {end} from {f}");
                }
            }
            self.topol.set_position(n, location);
            self.insert_into_edge(n, a, b);
            let mut around: Vec<EH> = self.topol.node_elements(n).iter().copied().collect();
            around.push(e);
            self.refresh_boundary_around(&around);
            debug!("T3 swap moved {n} onto the edge from {a} to {b} at {location}");
        }
        Ok(())
    }

    /// Position of the point `t` of the way from `a` to `b`.
    pub(crate) fn point_along(&self, a: NH, b: NH, t: f64) -> DVec3 {
        self.topol.position(a) + t * self.node_vector(a, b)
    }
}
