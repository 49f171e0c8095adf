use thiserror::Error;

use crate::element::{EH, NH};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    // Access.
    #[error("{0} is out of bounds")]
    InvalidNode(NH),
    #[error("{0} is out of bounds")]
    InvalidElement(EH),
    #[error("{0} has been deleted")]
    DeletedNode(NH),
    #[error("{0} has been deleted")]
    DeletedElement(EH),
    #[error("{1} is not a node of {0}")]
    NodeNotInElement(EH, NH),
    #[error("{0} and {1} do not share an edge")]
    EdgeNotFound(NH, NH),
    // Topology.
    /// A live element would be left with fewer than three nodes.
    #[error("{0} has fewer than three nodes")]
    DegenerateElement(EH),
    #[error("{1} appears more than once in {0}")]
    RepeatedNode(EH, NH),
    #[error("{0} references the deleted node {1}")]
    DeletedNodeInElement(EH, NH),
    #[error("the back references of {0} do not match {1}")]
    InconsistentBackReference(NH, EH),
    /// The same directed edge is traversed by two elements, so their
    /// orientations disagree.
    #[error("the edge {1} -> {2} is traversed twice, by {0} and another element")]
    DuplicateEdge(EH, NH, NH),
    #[error("the boundary flag of {0} does not match the topology")]
    InconsistentBoundaryFlag(NH),
    #[error("{0} and {1} are adjacent and coincident")]
    CoincidentNodes(NH, NH),
    #[error("{0} and {1} are adjacent and closer than the rearrangement threshold")]
    ShortEdge(NH, NH),
    /// The nodes of a short edge belong to more than four elements between
    /// them. The local geometry is corrupt and cannot be remeshed.
    #[error("{0} and {1} are contained in {2} elements, at most 4 are supported")]
    TooManyElements(NH, NH, usize),
    /// A node that is not on the boundary of the tissue has been found inside
    /// an element that does not contain it.
    #[error("internal {0} has overlapped {1}")]
    InternalIntersection(NH, EH),
    #[error("remeshing did not reach a fixed point after {0} rounds")]
    RemeshDidNotConverge(usize),
    #[error("{0} is not a triangle")]
    NotATriangle(EH),
    #[error("cannot divide {0}: {1}")]
    DivisionFailed(EH, &'static str),
    // Geometry.
    #[error("operation is only implemented for 2D meshes, this mesh is {0}D")]
    UnsupportedDimension(usize),
    #[error("degenerate axis of division")]
    DegenerateAxis,
    #[error("axis {0} is out of bounds")]
    InvalidAxis(usize),
    // Configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    // Other.
    #[error("mismatched array lengths: {0} and {1}")]
    MismatchedArrayLengths(usize, usize),
}
