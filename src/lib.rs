/*!
A mutable polygonal mesh for vertex models of cell sheets, with local
remeshing.

# Overview

+ A mesh is a set of nodes, and a set of polygonal elements whose boundaries
  are cyclic sequences of those nodes. Neighbouring elements share nodes, and
  every node keeps track of the elements that contain it.

+ The generic mesh type [`VertexMeshT<DIM, D>`] is parameterized by the number
  of spatial dimensions, and by a [`Displacement`] that decides how the vector
  between two points is computed. [`Planar`] subtracts the points, while
  [`Cylindrical`] wraps the x coordinate around a periodic domain. The common
  instantiations are [`VertexMesh2d`], [`VertexMesh3d`] and
  [`CylindricalVertexMesh2d`].

+ A physics layer moves the nodes between time steps, and then calls
  [`VertexMeshT::remesh`] to restore the invariants of the mesh:

  + Nodes that are closer than the rearrangement threshold are merged, or
    swapped with a T1 neighbour exchange.

  + Triangles smaller than the T2 threshold are collapsed into a single
    node.

  + Boundary nodes that have moved into another element are placed on its
    boundary with a T3 swap.

  + Edges longer than the edge division threshold are divided.

  Remeshing finishes by removing deleted nodes and elements, and returns the
  map from the old element indices to the new ones, so that per element data
  held by the caller can be updated.

+ Elements can be divided along their short axis, or along any other axis,
  for simulating cell division.

+ Topological changes are only supported for 2d meshes. 3d meshes support
  geometric queries.
*/

mod check;
mod config;
mod divide;
mod edit;
mod element;
mod error;
mod geometry;
mod intersect;
mod macros;
mod mesh;
mod primitive;
mod remesh;
mod status;
mod store;
mod topol;

pub use config::RemeshConfig;
pub use element::{EH, Handle, NH};
pub use error::Error;
pub use geometry::{Cylindrical, Displacement, Moments, Planar};
pub use mesh::{CylindricalVertexMesh2d, VertexMesh2d, VertexMesh3d, VertexMeshT};
pub use remesh::{SwapLocations, SwapType};
pub use store::IndexMap;
pub use topol::{ElementMap, NodeMap};
