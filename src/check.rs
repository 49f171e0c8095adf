use std::collections::HashSet;

use crate::{
    element::{EH, NH},
    error::Error,
    geometry::Displacement,
    mesh::VertexMeshT,
    topol::Topology,
};

fn check_elements(mesh: &Topology, edges: &mut HashSet<(NH, NH)>) -> Result<(), Error> {
    edges.clear();
    for e in mesh.elements() {
        let nodes = mesh.element_nodes(e);
        if nodes.len() < 3 {
            return Err(Error::DegenerateElement(e));
        }
        for (i, n) in nodes.iter().enumerate() {
            if !mesh.is_live_node(*n) {
                return Err(Error::DeletedNodeInElement(e, *n));
            }
            if nodes[..i].contains(n) {
                return Err(Error::RepeatedNode(e, *n));
            }
            // Element must be registered with each of its nodes.
            if !mesh.node_elements(*n).contains(&e) {
                return Err(Error::InconsistentBackReference(*n, e));
            }
        }
        // Each directed edge belongs to at most one element.
        for (a, b) in mesh.element(e).edges() {
            if !edges.insert((a, b)) {
                return Err(Error::DuplicateEdge(e, a, b));
            }
        }
    }
    Ok(())
}

fn check_nodes(mesh: &Topology) -> Result<(), Error> {
    for n in mesh.nodes() {
        for e in mesh.node_elements(n) {
            if !mesh.is_live_element(*e) || !mesh.element(*e).contains(n) {
                return Err(Error::InconsistentBackReference(n, *e));
            }
        }
        let boundary = mesh.node_elements(n).is_empty()
            || mesh
                .neighbours(n)
                .into_iter()
                .any(|m| mesh.is_boundary_edge(n, m));
        if boundary != mesh.is_boundary_node(n) {
            return Err(Error::InconsistentBoundaryFlag(n));
        }
    }
    Ok(())
}

impl Topology {
    pub fn check(&self) -> Result<(), Error> {
        let mut edges = HashSet::with_capacity(self.num_all_nodes() * 2);
        check_elements(self, &mut edges)?;
        check_nodes(self)?;
        Ok(())
    }
}

impl<const DIM: usize, D> VertexMeshT<DIM, D>
where
    D: Displacement,
{
    /// Check the topology of the mesh.
    ///
    /// This function will return an error if the elements are degenerate or
    /// reference deleted nodes, if the back references from the nodes to their
    /// elements are inconsistent, if two elements traverse an edge in the same
    /// direction, if the boundary flags are stale, or if adjacent nodes
    /// coincide.
    pub fn check_topology(&self) -> Result<(), Error> {
        self.topol.check()?;
        for e in self.topol.elements() {
            for (a, b) in self.topol.element(e).edges() {
                if self.node_vector(a, b).length_squared() == 0.0 {
                    return Err(Error::CoincidentNodes(a, b));
                }
            }
        }
        Ok(())
    }

    /// Check that no edge is shorter than the rearrangement threshold. Edges
    /// of triangles are exempt, as these are removed by T2 swaps instead.
    pub fn check_edge_lengths(&self) -> Result<(), Error> {
        let threshold = self.config.rearrangement_threshold;
        for e in self.topol.elements() {
            let elem = self.topol.element(e);
            if elem.num_nodes() <= 3 {
                continue;
            }
            for (a, b) in elem.edges() {
                if self.node_vector(a, b).length() < threshold
                    && !self
                        .topol
                        .edge_elements(a, b)
                        .any(|f: EH| self.topol.element_valence(f) <= 3)
                {
                    return Err(Error::ShortEdge(a, b));
                }
            }
        }
        Ok(())
    }
}
