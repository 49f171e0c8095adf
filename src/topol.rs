use std::collections::BTreeSet;

use glam::DVec3;

use crate::{
    element::{EH, Element, NH, Node},
    error::Error,
    store::{IndexMap, Store},
};

pub type NodeMap = IndexMap<NH>;
pub type ElementMap = IndexMap<EH>;

/// Connectivity of the mesh: the node and element arenas, and the back
/// references from the nodes to the elements that contain them.
#[derive(Debug, Clone, Default)]
pub(crate) struct Topology {
    nodes: Store<NH, Node>,
    elements: Store<EH, Element>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(nnodes: usize, nelements: usize) -> Self {
        Topology {
            nodes: Store::with_capacity(nnodes),
            elements: Store::with_capacity(nelements),
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.num_live()
    }

    pub fn num_elements(&self) -> usize {
        self.elements.num_live()
    }

    pub fn num_all_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_all_elements(&self) -> usize {
        self.elements.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = NH> + use<'_> {
        self.nodes.handles()
    }

    pub fn elements(&self) -> impl Iterator<Item = EH> + use<'_> {
        self.elements.handles()
    }

    pub fn check_node(&self, n: NH) -> Result<(), Error> {
        if !self.nodes.is_valid(n) {
            Err(Error::InvalidNode(n))
        } else if self.nodes.status(n).deleted() {
            Err(Error::DeletedNode(n))
        } else {
            Ok(())
        }
    }

    pub fn check_element(&self, e: EH) -> Result<(), Error> {
        if !self.elements.is_valid(e) {
            Err(Error::InvalidElement(e))
        } else if self.elements.status(e).deleted() {
            Err(Error::DeletedElement(e))
        } else {
            Ok(())
        }
    }

    pub fn is_live_node(&self, n: NH) -> bool {
        self.nodes.is_live(n)
    }

    pub fn is_live_element(&self, e: EH) -> bool {
        self.elements.is_live(e)
    }

    pub fn position(&self, n: NH) -> DVec3 {
        self.nodes.get(n).pos
    }

    pub fn set_position(&mut self, n: NH, pos: DVec3) {
        self.nodes.get_mut(n).pos = pos;
    }

    pub fn node_elements(&self, n: NH) -> &BTreeSet<EH> {
        &self.nodes.get(n).elements
    }

    pub(crate) fn element(&self, e: EH) -> &Element {
        self.elements.get(e)
    }

    pub fn element_nodes(&self, e: EH) -> &[NH] {
        &self.elements.get(e).nodes
    }

    pub fn element_valence(&self, e: EH) -> usize {
        self.elements.get(e).num_nodes()
    }

    pub fn region(&self, e: EH) -> u32 {
        self.elements.get(e).region
    }

    pub fn set_region(&mut self, e: EH, region: u32) {
        self.elements.get_mut(e).region = region;
    }

    pub fn is_boundary_node(&self, n: NH) -> bool {
        self.nodes.status(n).boundary()
    }

    pub fn add_node(&mut self, pos: DVec3) -> NH {
        self.nodes.add(Node::new(pos))
    }

    /// Adds an element with the given nodes, and registers it with each of
    /// them. Boundary flags are not updated.
    pub fn add_element(&mut self, nodes: &[NH], region: u32) -> Result<EH, Error> {
        for n in nodes {
            self.check_node(*n)?;
        }
        let e = self.elements.add(Element::new(nodes.to_vec(), region));
        if nodes.len() < 3 {
            self.delete_element(e);
            return Err(Error::DegenerateElement(e));
        }
        for (i, n) in nodes.iter().enumerate() {
            if nodes[..i].contains(n) {
                self.delete_element(e);
                return Err(Error::RepeatedNode(e, *n));
            }
        }
        for n in nodes {
            self.nodes.get_mut(*n).elements.insert(e);
        }
        Ok(e)
    }

    /// Inserts `n` into the element, immediately after the given local index.
    pub fn insert_node_after(&mut self, e: EH, local: usize, n: NH) {
        self.elements.get_mut(e).nodes.insert(local + 1, n);
        self.nodes.get_mut(n).elements.insert(e);
    }

    /// Removes the node at the local index from the element, and returns it.
    pub fn remove_node_at(&mut self, e: EH, local: usize) -> NH {
        let n = self.elements.get_mut(e).nodes.remove(local);
        self.nodes.get_mut(n).elements.remove(&e);
        n
    }

    /// Replaces the node at the local index of the element with `n`.
    pub fn replace_node_at(&mut self, e: EH, local: usize, n: NH) {
        let old = std::mem::replace(&mut self.elements.get_mut(e).nodes[local], n);
        self.nodes.get_mut(old).elements.remove(&e);
        self.nodes.get_mut(n).elements.insert(e);
    }

    /// Replaces the whole node cycle of the element.
    pub fn set_element_nodes(&mut self, e: EH, nodes: Vec<NH>) {
        let old = std::mem::replace(&mut self.elements.get_mut(e).nodes, nodes);
        for n in old {
            self.nodes.get_mut(n).elements.remove(&e);
        }
        for i in 0..self.elements.get(e).nodes.len() {
            let n = self.elements.get(e).nodes[i];
            self.nodes.get_mut(n).elements.insert(e);
        }
    }

    /// Deletes the element and removes it from the back references of its
    /// nodes. The nodes themselves are left alone.
    pub fn delete_element(&mut self, e: EH) {
        let nodes = std::mem::take(&mut self.elements.get_mut(e).nodes);
        for n in nodes {
            self.nodes.get_mut(n).elements.remove(&e);
        }
        self.elements.delete(e);
    }

    /// Deletes the node. It must not be referenced by any element.
    pub fn delete_node(&mut self, n: NH) {
        debug_assert!(self.nodes.get(n).elements.is_empty());
        self.nodes.delete(n);
    }

    /// Elements that contain both nodes.
    pub fn shared_elements(&self, a: NH, b: NH) -> BTreeSet<EH> {
        self.node_elements(a)
            .intersection(self.node_elements(b))
            .copied()
            .collect()
    }

    /// Elements that contain either node.
    pub fn union_elements(&self, a: NH, b: NH) -> BTreeSet<EH> {
        self.node_elements(a)
            .union(self.node_elements(b))
            .copied()
            .collect()
    }

    /// Elements in which `a` and `b` are adjacent.
    pub fn edge_elements(&self, a: NH, b: NH) -> impl Iterator<Item = EH> + use<'_> {
        self.node_elements(a)
            .iter()
            .copied()
            .filter(move |e| self.element(*e).edge_start(a, b).is_some())
    }

    pub fn is_boundary_edge(&self, a: NH, b: NH) -> bool {
        self.edge_elements(a, b).count() == 1
    }

    /// Nodes adjacent to `n` in at least one element, in ascending order.
    pub fn neighbours(&self, n: NH) -> BTreeSet<NH> {
        let mut out = BTreeSet::new();
        for e in self.node_elements(n) {
            let elem = self.element(*e);
            if let Some(i) = elem.local_index(n) {
                out.insert(elem.node(elem.prev_local(i)));
                out.insert(elem.node(elem.next_local(i)));
            }
        }
        out
    }

    /// Updates the boundary flag of the node from the topology. A node is on the
    /// boundary if it is not contained in any element, or if one of its edges
    /// belongs to only one element.
    pub fn refresh_boundary_flag(&mut self, n: NH) {
        let flag = self.node_elements(n).is_empty()
            || self
                .neighbours(n)
                .into_iter()
                .any(|m| self.is_boundary_edge(n, m));
        self.nodes.status_mut(n).set_boundary(flag);
    }

    pub fn refresh_boundary_flags(&mut self, nodes: impl IntoIterator<Item = NH>) {
        for n in nodes {
            if self.nodes.is_live(n) {
                self.refresh_boundary_flag(n);
            }
        }
    }

    pub fn refresh_all_boundary_flags(&mut self) {
        let nodes: Vec<_> = self.nodes().collect();
        self.refresh_boundary_flags(nodes);
    }

    /// Makes the slots of deleted nodes and elements available for reuse.
    pub fn reclaim(&mut self) {
        self.nodes.reclaim();
        self.elements.reclaim();
    }

    /// Removes all deleted nodes and elements and renumbers the rest
    /// contiguously.
    pub fn compact(&mut self) -> (NodeMap, ElementMap) {
        let nmap = self.nodes.compact();
        let emap = self.elements.compact();
        let elements: Vec<_> = self.elements.handles().collect();
        for e in elements {
            self.elements
                .get_mut(e)
                .nodes
                .retain_mut(|n| match nmap.new_index(*n) {
                    Some(m) => {
                        *n = m;
                        true
                    }
                    None => false,
                });
        }
        let nodes: Vec<_> = self.nodes.handles().collect();
        for n in nodes {
            let node = self.nodes.get_mut(n);
            node.elements = node
                .elements
                .iter()
                .filter_map(|e| emap.new_index(*e))
                .collect();
        }
        (nmap, emap)
    }
}

#[cfg(test)]
mod test {
    use arrayvec::ArrayVec;
    use glam::dvec3;

    use super::Topology;
    use crate::{
        element::{EH, Handle, NH},
        error::Error,
    };

    /**
     * Two unit squares sharing an edge.
     * ```text
     *
     *   3-----4-----5
     *   |     |     |
     *   |  0  |  1  |
     *   |     |     |
     *   0-----1-----2
     * ```
     */
    fn two_squares() -> Topology {
        let mut topol = Topology::with_capacity(6, 2);
        for (x, y) in [(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (0.0, 1.0), (1.0, 1.0), (2.0, 1.0)] {
            topol.add_node(dvec3(x, y, 0.0));
        }
        for nodes in [[0u32, 1, 4, 3], [1, 2, 5, 4]] {
            let nodes = nodes.iter().map(|i| i.into()).collect::<ArrayVec<NH, 4>>();
            topol
                .add_element(&nodes, 0)
                .expect("Cannot add element");
        }
        topol.refresh_all_boundary_flags();
        topol
    }

    #[test]
    fn t_back_references() {
        let topol = two_squares();
        assert_eq!(topol.num_nodes(), 6);
        assert_eq!(topol.num_elements(), 2);
        assert_eq!(
            topol
                .node_elements(1.into())
                .iter()
                .map(|e| e.index())
                .collect::<Vec<_>>(),
            [0, 1]
        );
        assert_eq!(topol.node_elements(0.into()).len(), 1);
        assert_eq!(
            topol
                .shared_elements(1.into(), 4.into())
                .into_iter()
                .collect::<Vec<_>>(),
            [EH::from(0u32), EH::from(1u32)]
        );
        assert!(!topol.is_boundary_edge(1.into(), 4.into()));
        assert!(topol.is_boundary_edge(0.into(), 1.into()));
        // All nodes are on the boundary of this tiny mesh.
        assert!(topol.nodes().all(|n| topol.is_boundary_node(n)));
        assert_eq!(
            topol
                .neighbours(1.into())
                .into_iter()
                .map(|n| n.index())
                .collect::<Vec<_>>(),
            [0, 2, 4]
        );
    }

    #[test]
    fn t_add_invalid_element() {
        let mut topol = two_squares();
        assert_eq!(
            topol.add_element(&[0.into(), 1.into()], 0),
            Err(Error::DegenerateElement(2.into()))
        );
        assert_eq!(
            topol.add_element(&[0.into(), 1.into(), 0.into()], 0),
            Err(Error::RepeatedNode(3.into(), 0.into()))
        );
        assert_eq!(
            topol.add_element(&[0.into(), 1.into(), 17.into()], 0),
            Err(Error::InvalidNode(17.into()))
        );
        assert_eq!(topol.num_elements(), 2);
        // Back references were not touched.
        assert_eq!(topol.node_elements(0.into()).len(), 1);
    }

    #[test]
    fn t_insert_remove_replace() {
        let mut topol = two_squares();
        let n = topol.add_node(dvec3(1.0, 0.5, 0.0));
        // Split the shared edge, 1 -> 4 in element 0 and 4 -> 1 in element 1.
        topol.insert_node_after(0.into(), 1, n);
        topol.insert_node_after(1.into(), 3, n);
        assert_eq!(
            topol.element_nodes(0.into()),
            [0u32, 1, 6, 4, 3].map(NH::from).as_slice()
        );
        assert_eq!(
            topol.element_nodes(1.into()),
            [1u32, 2, 5, 4, 6].map(NH::from).as_slice()
        );
        assert_eq!(topol.node_elements(n).len(), 2);
        assert_eq!(topol.remove_node_at(1.into(), 4), n);
        assert_eq!(topol.node_elements(n).len(), 1);
        topol.replace_node_at(0.into(), 2, 2.into());
        assert!(topol.node_elements(n).is_empty());
        assert_eq!(topol.node_elements(2.into()).len(), 2);
    }

    #[test]
    fn t_delete_and_compact() {
        let mut topol = two_squares();
        topol.delete_element(0.into());
        for n in [0u32, 3] {
            assert!(topol.node_elements(n.into()).is_empty());
            topol.delete_node(n.into());
        }
        assert_eq!(topol.check_element(0.into()), Err(Error::DeletedElement(0.into())));
        assert_eq!(topol.check_node(3.into()), Err(Error::DeletedNode(3.into())));
        assert_eq!(topol.num_all_nodes(), 6);
        let (nmap, emap) = topol.compact();
        assert_eq!(topol.num_all_nodes(), 4);
        assert_eq!(topol.num_all_elements(), 1);
        assert!(emap.is_deleted(0.into()));
        assert_eq!(emap.new_index(1.into()), Some(0.into()));
        assert_eq!(nmap.new_index(4.into()), Some(2.into()));
        assert_eq!(
            topol.element_nodes(0.into()),
            [0u32, 1, 3, 2].map(NH::from).as_slice()
        );
        assert!(topol
            .nodes()
            .all(|n| topol.node_elements(n).iter().all(|e| e.index() == 0)));
    }
}
