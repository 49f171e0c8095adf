use std::{cell::RefCell, collections::BTreeSet};

use glam::{DVec2, DVec3, dvec2};
use log::debug;
use rand::{SeedableRng, rngs::SmallRng};

use crate::{
    config::RemeshConfig,
    element::{EH, NH},
    error::Error,
    geometry::{self, Cylindrical, Displacement, Moments, Planar},
    remesh::SwapLocations,
    topol::Topology,
};

/// A mesh of polygonal elements that share nodes.
///
/// `DIM` is the number of spatial dimensions, and `D` decides how the vector
/// from one point to another is computed. Positions are always stored as 3d
/// points, and the z coordinate is ignored by 2d meshes. Topological changes
/// such as remeshing and element division are only supported in 2d.
#[derive(Debug, Clone)]
pub struct VertexMeshT<const DIM: usize, D: Displacement = Planar> {
    pub(crate) topol: Topology,
    pub(crate) config: RemeshConfig,
    pub(crate) disp: D,
    pub(crate) rng: RefCell<SmallRng>,
    pub(crate) swaps: SwapLocations,
}

pub type VertexMesh2d = VertexMeshT<2, Planar>;
pub type VertexMesh3d = VertexMeshT<3, Planar>;
/// 2d mesh that is periodic in x.
pub type CylindricalVertexMesh2d = VertexMeshT<2, Cylindrical>;

impl<const DIM: usize, D> VertexMeshT<DIM, D>
where
    D: Displacement + Default,
{
    /// Create a mesh from node positions and polygons, using the default
    /// configuration.
    pub fn new<P>(
        points: &[DVec3],
        polygons: impl IntoIterator<Item = P>,
    ) -> Result<Self, Error>
    where
        P: AsRef<[u32]>,
    {
        Self::with_displacement(points, polygons, D::default(), RemeshConfig::default())
    }

    pub fn with_config<P>(
        points: &[DVec3],
        polygons: impl IntoIterator<Item = P>,
        config: RemeshConfig,
    ) -> Result<Self, Error>
    where
        P: AsRef<[u32]>,
    {
        Self::with_displacement(points, polygons, D::default(), config)
    }
}

impl<const DIM: usize, D> VertexMeshT<DIM, D>
where
    D: Displacement,
{
    /// An empty mesh.
    pub fn empty(disp: D, config: RemeshConfig) -> Result<Self, Error> {
        config.validate()?;
        let rng = RefCell::new(SmallRng::seed_from_u64(config.seed));
        Ok(VertexMeshT {
            topol: Topology::new(),
            config,
            disp,
            rng,
            swaps: SwapLocations::default(),
        })
    }

    /// Create a mesh from node positions and polygons. Each polygon is a list
    /// of indices into `points`, in counter-clockwise order for 2d meshes.
    pub fn with_displacement<P>(
        points: &[DVec3],
        polygons: impl IntoIterator<Item = P>,
        disp: D,
        config: RemeshConfig,
    ) -> Result<Self, Error>
    where
        P: AsRef<[u32]>,
    {
        let mut mesh = Self::empty(disp, config)?;
        let polygons = polygons.into_iter();
        mesh.topol = Topology::with_capacity(points.len(), polygons.size_hint().0);
        for p in points {
            mesh.topol.add_node(*p);
        }
        let mut buf = Vec::new();
        for poly in polygons {
            buf.clear();
            buf.extend(poly.as_ref().iter().map(NH::from));
            mesh.topol.add_element(&buf, 0)?;
        }
        mesh.topol.refresh_all_boundary_flags();
        Ok(mesh)
    }

    pub(crate) fn require_2d() -> Result<(), Error> {
        if DIM == 2 {
            Ok(())
        } else {
            Err(Error::UnsupportedDimension(DIM))
        }
    }

    pub fn config(&self) -> &RemeshConfig {
        &self.config
    }

    /// Replace the configuration. The random number generator is reseeded.
    pub fn set_config(&mut self, config: RemeshConfig) -> Result<(), Error> {
        config.validate()?;
        *self.rng.borrow_mut() = SmallRng::seed_from_u64(config.seed);
        self.config = config;
        Ok(())
    }

    pub fn set_rearrangement_threshold(&mut self, threshold: f64) {
        self.config.rearrangement_threshold = threshold;
    }

    pub fn set_rearrangement_ratio(&mut self, ratio: f64) {
        self.config.rearrangement_ratio = ratio;
    }

    pub fn set_t2_threshold(&mut self, threshold: f64) {
        self.config.t2_threshold = threshold;
    }

    pub fn set_edge_division_threshold(&mut self, threshold: f64) {
        self.config.edge_division_threshold = threshold;
    }

    pub fn set_check_internal_intersections(&mut self, flag: bool) {
        self.config.check_internal_intersections = flag;
    }

    pub fn displacement(&self) -> &D {
        &self.disp
    }

    /// Number of live nodes.
    pub fn num_nodes(&self) -> usize {
        self.topol.num_nodes()
    }

    /// Number of live elements.
    pub fn num_elements(&self) -> usize {
        self.topol.num_elements()
    }

    /// Number of nodes including the deleted ones.
    pub fn num_all_nodes(&self) -> usize {
        self.topol.num_all_nodes()
    }

    /// Number of elements including the deleted ones.
    pub fn num_all_elements(&self) -> usize {
        self.topol.num_all_elements()
    }

    /// Live nodes in ascending order.
    pub fn nodes(&self) -> impl Iterator<Item = NH> + use<'_, DIM, D> {
        self.topol.nodes()
    }

    /// Live elements in ascending order.
    pub fn elements(&self) -> impl Iterator<Item = EH> + use<'_, DIM, D> {
        self.topol.elements()
    }

    pub fn node_location(&self, n: NH) -> Result<DVec3, Error> {
        self.topol.check_node(n)?;
        Ok(self.topol.position(n))
    }

    /// Move a node. This is how the physics layer updates the mesh between
    /// remeshing passes.
    pub fn set_node_location(&mut self, n: NH, pos: DVec3) -> Result<(), Error> {
        self.topol.check_node(n)?;
        self.topol.set_position(n, pos);
        Ok(())
    }

    /// Move all live nodes at once. `positions` holds one position per live
    /// node, in ascending order of the node handles.
    pub fn set_node_locations(&mut self, positions: &[DVec3]) -> Result<(), Error> {
        if positions.len() != self.num_nodes() {
            return Err(Error::MismatchedArrayLengths(
                positions.len(),
                self.num_nodes(),
            ));
        }
        let nodes: Vec<NH> = self.nodes().collect();
        for (n, p) in nodes.into_iter().zip(positions) {
            self.topol.set_position(n, *p);
        }
        Ok(())
    }

    pub fn is_boundary_node(&self, n: NH) -> Result<bool, Error> {
        self.topol.check_node(n)?;
        Ok(self.topol.is_boundary_node(n))
    }

    pub fn element_nodes(&self, e: EH) -> Result<&[NH], Error> {
        self.topol.check_element(e)?;
        Ok(self.topol.element_nodes(e))
    }

    pub fn element_region(&self, e: EH) -> Result<u32, Error> {
        self.topol.check_element(e)?;
        Ok(self.topol.region(e))
    }

    pub fn set_element_region(&mut self, e: EH, region: u32) -> Result<(), Error> {
        self.topol.check_element(e)?;
        self.topol.set_region(e, region);
        Ok(())
    }

    /// Elements whose boundary contains the node.
    pub fn containing_elements(&self, n: NH) -> Result<&BTreeSet<EH>, Error> {
        self.topol.check_node(n)?;
        Ok(self.topol.node_elements(n))
    }

    /// Nodes connected to `n` by an edge.
    pub fn neighbouring_nodes(&self, n: NH) -> Result<BTreeSet<NH>, Error> {
        self.topol.check_node(n)?;
        Ok(self.topol.neighbours(n))
    }

    /// Nodes connected to `n` by an edge, that are not in the element `e`.
    pub fn neighbouring_nodes_not_in_element(
        &self,
        n: NH,
        e: EH,
    ) -> Result<BTreeSet<NH>, Error> {
        self.topol.check_node(n)?;
        self.topol.check_element(e)?;
        let elem = self.topol.element(e);
        let mut out = self.topol.neighbours(n);
        out.retain(|m| !elem.contains(*m));
        Ok(out)
    }

    pub(crate) fn vector(&self, from: DVec3, to: DVec3) -> DVec3 {
        self.disp.vector(from, to)
    }

    pub(crate) fn node_vector(&self, a: NH, b: NH) -> DVec3 {
        self.vector(self.topol.position(a), self.topol.position(b))
    }

    /// Vector from node `a` to node `b`.
    pub fn vector_between(&self, a: NH, b: NH) -> Result<DVec3, Error> {
        self.topol.check_node(a)?;
        self.topol.check_node(b)?;
        Ok(self.node_vector(a, b))
    }

    pub fn distance_between_nodes(&self, a: NH, b: NH) -> Result<f64, Error> {
        Ok(self.vector_between(a, b)?.length())
    }

    /// Position of the first node of the element, and the positions of all its
    /// nodes relative to it.
    pub(crate) fn local_points(&self, e: EH) -> (DVec3, Vec<DVec3>) {
        self.local_points_of(self.topol.element_nodes(e))
    }

    pub(crate) fn local_points_of(&self, nodes: &[NH]) -> (DVec3, Vec<DVec3>) {
        let origin = self.topol.position(nodes[0]);
        let pts = nodes
            .iter()
            .map(|n| self.vector(origin, self.topol.position(*n)))
            .collect();
        (origin, pts)
    }

    pub(crate) fn local_points_2d(&self, e: EH) -> (DVec3, Vec<DVec2>) {
        let (origin, pts) = self.local_points(e);
        (origin, pts.into_iter().map(|p| p.truncate()).collect())
    }

    /// Area of the element. In 2d this is the signed area, which is positive
    /// for counter-clockwise elements. In 3d this is the unsigned area of the
    /// polygon.
    pub fn element_area(&self, e: EH) -> Result<f64, Error> {
        self.topol.check_element(e)?;
        Ok(if DIM == 2 {
            geometry::signed_area(&self.local_points_2d(e).1)
        } else {
            geometry::newell_area(&self.local_points(e).1)
        })
    }

    pub fn element_perimeter(&self, e: EH) -> Result<f64, Error> {
        self.topol.check_element(e)?;
        let pts = self.local_points(e).1;
        let n = pts.len();
        Ok((0..n).map(|i| pts[i].distance(pts[(i + 1) % n])).sum())
    }

    /// Area weighted centroid in 2d, and the average of the nodes in 3d.
    pub fn element_centroid(&self, e: EH) -> Result<DVec3, Error> {
        self.topol.check_element(e)?;
        if DIM == 2 {
            let (origin, pts) = self.local_points_2d(e);
            Ok(origin + geometry::centroid(&pts).extend(0.0))
        } else {
            let (origin, pts) = self.local_points(e);
            Ok(origin + pts.iter().sum::<DVec3>() / pts.len() as f64)
        }
    }

    /// Second moments of area of a 2d element, about its centroid.
    pub fn element_moments(&self, e: EH) -> Result<Moments, Error> {
        Self::require_2d()?;
        self.topol.check_element(e)?;
        Ok(geometry::moments(&self.local_points_2d(e).1))
    }

    /// Unit vector along which the 2d element is narrowest. Elements whose
    /// moments are isotropic get a random direction.
    pub fn element_short_axis(&self, e: EH) -> Result<DVec2, Error> {
        let moments = self.element_moments(e)?;
        Ok(geometry::short_axis(&moments, &mut *self.rng.borrow_mut()))
    }

    /// The nodes before and after `n` in the element.
    fn adjacent_in_element(&self, e: EH, n: NH) -> Result<(NH, NH), Error> {
        self.topol.check_element(e)?;
        self.topol.check_node(n)?;
        let elem = self.topol.element(e);
        let i = elem
            .local_index(n)
            .ok_or(Error::NodeNotInElement(e, n))?;
        Ok((elem.node(elem.prev_local(i)), elem.node(elem.next_local(i))))
    }

    /// Unit vector along the edge from `from` to `n`, which is the gradient of
    /// the length of that edge with respect to the position of `n`.
    fn edge_gradient(&self, from: NH, n: NH) -> Result<DVec2, Error> {
        let v = self.node_vector(from, n).truncate();
        let len = v.length();
        if len <= f64::EPSILON {
            return Err(Error::CoincidentNodes(from, n));
        }
        Ok(v / len)
    }

    /// Gradient of the area of the 2d element with respect to the position of
    /// its node `n`.
    pub fn element_area_gradient_at_node(&self, e: EH, n: NH) -> Result<DVec2, Error> {
        Self::require_2d()?;
        let (prev, next) = self.adjacent_in_element(e, n)?;
        let d = self.node_vector(prev, next).truncate();
        Ok(0.5 * dvec2(d.y, -d.x))
    }

    /// Gradient of the length of the edge ending at `n`, with respect to the
    /// position of `n`.
    pub fn element_previous_edge_gradient_at_node(
        &self,
        e: EH,
        n: NH,
    ) -> Result<DVec2, Error> {
        Self::require_2d()?;
        let (prev, _) = self.adjacent_in_element(e, n)?;
        self.edge_gradient(prev, n)
    }

    /// Gradient of the length of the edge starting at `n`, with respect to the
    /// position of `n`.
    pub fn element_next_edge_gradient_at_node(&self, e: EH, n: NH) -> Result<DVec2, Error> {
        Self::require_2d()?;
        let (_, next) = self.adjacent_in_element(e, n)?;
        self.edge_gradient(next, n)
    }

    /// Gradient of the perimeter of the 2d element with respect to the
    /// position of its node `n`.
    pub fn element_perimeter_gradient_at_node(&self, e: EH, n: NH) -> Result<DVec2, Error> {
        Ok(self.element_previous_edge_gradient_at_node(e, n)?
            + self.element_next_edge_gradient_at_node(e, n)?)
    }

    /// Whether the point is inside the 2d element. Points that coincide with a
    /// node, or lie on a horizontal edge, are reported as outside.
    pub fn element_includes_point(&self, point: DVec3, e: EH) -> Result<bool, Error> {
        Self::require_2d()?;
        self.topol.check_element(e)?;
        let (origin, pts) = self.local_points_2d(e);
        let p = self.vector(origin, point).truncate();
        let pts: Vec<DVec2> = pts.into_iter().map(|q| q - p).collect();
        Ok(geometry::contains_origin(&pts))
    }

    /// Smallest and largest coordinate of the live nodes along the given axis.
    pub fn width_extremes(&self, axis: usize) -> Result<(f64, f64), Error> {
        if axis >= DIM {
            return Err(Error::InvalidAxis(axis));
        }
        Ok(self
            .nodes()
            .map(|n| self.topol.position(n)[axis])
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
                (lo.min(x), hi.max(x))
            }))
    }

    /// Extent of the mesh along the given axis. Periodic axes report the
    /// period.
    pub fn width(&self, axis: usize) -> Result<f64, Error> {
        let (lo, hi) = self.width_extremes(axis)?;
        if let Some(w) = self.disp.period(axis) {
            return Ok(w);
        }
        Ok(if lo > hi { 0.0 } else { hi - lo })
    }

    /// Scale all node positions component wise.
    pub fn scale(&mut self, factor: DVec3) {
        let nodes: Vec<_> = self.nodes().collect();
        for n in nodes {
            let p = self.topol.position(n);
            self.topol.set_position(n, p * factor);
        }
    }

    pub fn translate(&mut self, offset: DVec3) {
        let nodes: Vec<_> = self.nodes().collect();
        for n in nodes {
            let p = self.topol.position(n);
            self.topol.set_position(n, p + offset);
        }
    }

    /// Adds a node that is not part of any element yet.
    pub fn add_node(&mut self, pos: DVec3) -> NH {
        let n = self.topol.add_node(pos);
        self.topol.refresh_boundary_flag(n);
        n
    }

    /// Adds an element. The nodes must be live, distinct and at least three.
    pub fn add_element(&mut self, nodes: &[NH]) -> Result<EH, Error> {
        let e = self.topol.add_element(nodes, 0)?;
        self.refresh_boundary_around(&[e]);
        Ok(e)
    }

    /// Deletes the element ahead of the next remeshing pass, for example when a
    /// cell dies. Nodes that are left without elements are deleted as well.
    /// Handles stay valid until the next call to `remesh`.
    pub fn delete_element_prior_to_remesh(&mut self, e: EH) -> Result<(), Error> {
        self.topol.check_element(e)?;
        let nodes = self.topol.element_nodes(e).to_vec();
        self.topol.delete_element(e);
        for n in &nodes {
            if self.topol.node_elements(*n).is_empty() {
                self.topol.delete_node(*n);
            }
        }
        let affected: BTreeSet<NH> = nodes
            .iter()
            .filter(|n| self.topol.is_live_node(**n))
            .flat_map(|n| self.topol.neighbours(*n).into_iter().chain([*n]))
            .collect();
        self.topol.refresh_boundary_flags(affected);
        debug!("Deleted {e} prior to remeshing");
        Ok(())
    }

    /// Removes the node from all its elements and deletes it, ahead of the next
    /// remeshing pass.
    pub fn delete_node_prior_to_remesh(&mut self, n: NH) -> Result<(), Error> {
        self.topol.check_node(n)?;
        let elements: Vec<EH> = self.topol.node_elements(n).iter().copied().collect();
        if let Some(e) = elements
            .iter()
            .find(|e| self.topol.element_valence(**e) <= 3)
        {
            return Err(Error::DegenerateElement(*e));
        }
        let neighbours = self.topol.neighbours(n);
        for e in elements {
            if let Some(i) = self.topol.element(e).local_index(n) {
                self.topol.remove_node_at(e, i);
            }
        }
        self.topol.delete_node(n);
        self.topol.refresh_boundary_flags(neighbours);
        debug!("Deleted {n} prior to remeshing");
        Ok(())
    }

    /// Refresh the boundary flags of the nodes of the given elements, and their
    /// neighbours.
    pub(crate) fn refresh_boundary_around(&mut self, elements: &[EH]) {
        let nodes: BTreeSet<NH> = elements
            .iter()
            .filter(|e| self.topol.is_live_element(**e))
            .flat_map(|e| self.topol.element_nodes(*e).iter().copied())
            .flat_map(|n| self.topol.neighbours(n).into_iter().chain([n]))
            .collect();
        self.topol.refresh_boundary_flags(nodes);
    }

    pub fn swap_locations(&self) -> &SwapLocations {
        &self.swaps
    }

    pub fn clear_swap_locations(&mut self) {
        self.swaps.clear();
    }
}
