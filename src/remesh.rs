use glam::DVec2;
use log::{debug, trace, warn};

use crate::{
    element::{EH, NH},
    error::Error,
    geometry::Displacement,
    mesh::VertexMeshT,
    topol::{ElementMap, NodeMap},
};

/// Locations of the swaps performed on a mesh, in the order they happened.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SwapLocations {
    pub t1: Vec<DVec2>,
    pub t2: Vec<DVec2>,
    pub t3: Vec<DVec2>,
}

impl SwapLocations {
    pub fn clear(&mut self) {
        self.t1.clear();
        self.t2.clear();
        self.t3.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.t1.is_empty() && self.t2.is_empty() && self.t3.is_empty()
    }
}

/// What to do with two nodes that are too close to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapType {
    /// Merge the nodes into one.
    Merge,
    /// Neighbour exchange, where the nodes are shared by four elements.
    T1,
    /// Neighbour exchange near the boundary, where the nodes are shared by
    /// fewer than four elements.
    PartialT1,
}

impl<const DIM: usize, D> VertexMeshT<DIM, D>
where
    D: Displacement,
{
    /// Decide how to resolve the short edge between `a` and `b`, from the
    /// elements that contain them.
    pub fn identify_swap_type(&self, a: NH, b: NH) -> Result<SwapType, Error> {
        self.topol.check_node(a)?;
        self.topol.check_node(b)?;
        let na = self.topol.node_elements(a).len();
        let nb = self.topol.node_elements(b).len();
        match self.topol.union_elements(a, b).len() {
            0 | 1 => Ok(SwapType::Merge),
            2 if na == 2 && nb == 2 => {
                if self.topol.is_boundary_node(a) && self.topol.is_boundary_node(b) {
                    Ok(SwapType::T1)
                } else {
                    Ok(SwapType::Merge)
                }
            }
            2 | 3 => Ok(SwapType::PartialT1),
            4 => Ok(SwapType::T1),
            n => Err(Error::TooManyElements(a, b, n)),
        }
    }

    fn resolve_short_edge(&mut self, a: NH, b: NH) -> Result<(), Error> {
        match self.identify_swap_type(a, b)? {
            SwapType::Merge => {
                self.merge_nodes(a, b)?;
            }
            SwapType::T1 | SwapType::PartialT1 => self.perform_t1_swap(a, b)?,
        }
        Ok(())
    }

    /// True if the nodes are adjacent in a triangle. Such edges are left for
    /// the T2 swap to deal with.
    fn in_common_triangle(&self, a: NH, b: NH) -> bool {
        self.topol
            .edge_elements(a, b)
            .any(|e| self.topol.element_valence(e) <= 3)
    }

    /// Sweep over the edges of all the elements, resolving short edges and
    /// dividing long edges. The sweep restarts after every short edge, and
    /// ends when a full sweep finds nothing to resolve. Returns true if the
    /// mesh changed.
    ///
    /// The number of restarts is limited to `max_sweeps` per node, which is
    /// only reached by swaps that undo each other.
    fn swap_scan(&mut self) -> Result<bool, Error> {
        let threshold = self.config.rearrangement_threshold;
        let division = self.config.edge_division_threshold;
        let max_restarts = self
            .config
            .max_sweeps
            .saturating_mul(self.topol.num_all_nodes().max(1));
        let mut restarts = 0usize;
        let mut changed = false;
        'sweep: loop {
            trace!("Remeshing sweep after {restarts} restarts");
            let elements: Vec<EH> = self.topol.elements().collect();
            for e in elements {
                if !self.topol.is_live_element(e) {
                    continue;
                }
                let mut i = 0usize;
                while i < self.topol.element_valence(e) {
                    let elem = self.topol.element(e);
                    let (a, b) = (elem.node(i), elem.node(i + 1));
                    let dist = self.node_vector(a, b).length();
                    if dist < threshold {
                        if !self.in_common_triangle(a, b) {
                            self.resolve_short_edge(a, b)?;
                            changed = true;
                            restarts += 1;
                            if restarts > max_restarts {
                                return Err(Error::RemeshDidNotConverge(self.config.max_sweeps));
                            }
                            continue 'sweep;
                        }
                    } else if dist > division {
                        self.divide_edge(a, b)?;
                        changed = true;
                    }
                    i += 1;
                }
            }
            return Ok(changed);
        }
    }

    /// Remove all small triangles. Returns true if the mesh changed.
    fn t2_scan(&mut self) -> Result<bool, Error> {
        let mut changed = false;
        let elements: Vec<EH> = self.topol.elements().collect();
        for e in elements {
            if !self.topol.is_live_element(e) || self.topol.element_valence(e) != 3 {
                continue;
            }
            let area = self.element_area(e)?;
            if area <= self.config.t2_threshold {
                if area < 0.0 {
                    warn!("Removing inverted triangle {e} with area {area}");
                }
                self.perform_t2_swap(e)?;
                changed = true;
            }
        }
        Ok(changed)
    }

    /// Restore the invariants of the mesh after its nodes have been moved.
    ///
    /// Short edges are resolved by merges and T1 swaps, long edges are
    /// divided, small triangles are removed by T2 swaps, and boundary nodes
    /// that have moved into other elements are resolved by T3 swaps. This is
    /// repeated until nothing changes. Finally the deleted nodes and elements
    /// are removed and the rest are renumbered. Returns the map from the old
    /// element handles to the new ones.
    pub fn remesh(&mut self) -> Result<ElementMap, Error> {
        Self::require_2d()?;
        self.config.validate()?;
        let mut rounds = 0usize;
        loop {
            rounds += 1;
            if rounds > self.config.max_sweeps {
                return Err(Error::RemeshDidNotConverge(self.config.max_sweeps));
            }
            trace!("Remeshing round {rounds}");
            let mut changed = self.swap_scan()?;
            changed |= self.t2_scan()?;
            changed |= self.intersection_scan()?;
            if !changed {
                break;
            }
        }
        let (_, emap) = self.garbage_collection();
        debug!(
            "Remeshed in {rounds} rounds. {} nodes and {} elements remain",
            self.num_nodes(),
            self.num_elements()
        );
        Ok(emap)
    }

    /// Remove the deleted nodes and elements, and renumber the rest
    /// contiguously, preserving their order.
    pub fn garbage_collection(&mut self) -> (NodeMap, ElementMap) {
        let (nmap, emap) = self.topol.compact();
        if !emap.is_identity() {
            debug!("Compacted elements {emap:?}");
        }
        (nmap, emap)
    }

    /// Make the indices of deleted nodes and elements available for reuse by
    /// new nodes and elements, without renumbering anything.
    pub fn reclaim_deleted(&mut self) {
        let deleted = self.num_all_nodes() - self.num_nodes();
        if deleted > 0 {
            debug!("Reclaiming the indices of {deleted} deleted nodes");
        }
        self.topol.reclaim();
    }
}
