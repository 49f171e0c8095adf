use glam::DVec3;
use std::{
    collections::BTreeSet,
    fmt::{Debug, Display},
};

/**
 * Nodes and elements of the mesh are identified by their index.
 */
pub trait Handle: Copy {
    /**
     * The index of the node / element.
     */
    fn index(&self) -> u32;

    /**
     * Make a handle from an index.
     */
    fn from_index(idx: u32) -> Self;
}

/**
 * Node handle.
 */
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NH {
    idx: u32,
}

/**
 * Element handle.
 */
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EH {
    idx: u32,
}

impl Handle for NH {
    fn index(&self) -> u32 {
        self.idx
    }

    fn from_index(idx: u32) -> Self {
        NH { idx }
    }
}

impl From<u32> for NH {
    fn from(idx: u32) -> Self {
        NH { idx }
    }
}

impl From<&u32> for NH {
    fn from(idx: &u32) -> Self {
        NH { idx: *idx }
    }
}

impl Handle for EH {
    fn index(&self) -> u32 {
        self.idx
    }

    fn from_index(idx: u32) -> Self {
        EH { idx }
    }
}

impl From<u32> for EH {
    fn from(idx: u32) -> Self {
        EH { idx }
    }
}

impl From<&u32> for EH {
    fn from(idx: &u32) -> Self {
        EH { idx: *idx }
    }
}

impl Display for NH {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NH({})", self.index())
    }
}

impl Display for EH {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EH({})", self.index())
    }
}

impl Debug for NH {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NH({})", self.index())
    }
}

impl Debug for EH {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EH({})", self.index())
    }
}

/// A point of the mesh, shared by the elements that reference it.
#[derive(Debug, Clone, Default)]
pub(crate) struct Node {
    pub(crate) pos: DVec3,
    /// Elements whose boundary currently contains this node.
    pub(crate) elements: BTreeSet<EH>,
}

impl Node {
    pub(crate) fn new(pos: DVec3) -> Self {
        Node {
            pos,
            elements: BTreeSet::new(),
        }
    }
}

/// A polygon, represented by the cyclic sequence of its nodes. In 2D the nodes
/// are ordered counter-clockwise.
#[derive(Debug, Clone, Default)]
pub(crate) struct Element {
    pub(crate) nodes: Vec<NH>,
    pub(crate) region: u32,
}

impl Element {
    pub(crate) fn new(nodes: Vec<NH>, region: u32) -> Self {
        Element { nodes, region }
    }

    pub(crate) fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn local_index(&self, n: NH) -> Option<usize> {
        self.nodes.iter().position(|m| *m == n)
    }

    pub(crate) fn contains(&self, n: NH) -> bool {
        self.nodes.contains(&n)
    }

    /// Node at the local index, wrapping around the cycle.
    pub(crate) fn node(&self, local: usize) -> NH {
        self.nodes[local % self.nodes.len()]
    }

    pub(crate) fn next_local(&self, local: usize) -> usize {
        (local + 1) % self.nodes.len()
    }

    pub(crate) fn prev_local(&self, local: usize) -> usize {
        (local + self.nodes.len() - 1) % self.nodes.len()
    }

    /// Iterate over the directed edges of the element, in order.
    pub(crate) fn edges(&self) -> impl Iterator<Item = (NH, NH)> + use<'_> {
        let n = self.nodes.len();
        (0..n).map(move |i| (self.nodes[i], self.nodes[(i + 1) % n]))
    }

    /// Whether `b` immediately follows `a` in this element.
    pub(crate) fn has_edge(&self, a: NH, b: NH) -> bool {
        self.local_index(a).is_some_and(|i| self.node(i + 1) == b)
    }

    /// If `a` and `b` are consecutive in this element, returns the local index
    /// of whichever comes first in the element's orientation.
    pub(crate) fn edge_start(&self, a: NH, b: NH) -> Option<usize> {
        let ia = self.local_index(a)?;
        let ib = self.local_index(b)?;
        if self.next_local(ia) == ib {
            Some(ia)
        } else if self.next_local(ib) == ia {
            Some(ib)
        } else {
            None
        }
    }
}
