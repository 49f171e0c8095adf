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
    /// First live element, not containing `n`, inside which the node lies.
    pub(crate) fn enclosing_element(&self, n: NH) -> Option<EH> {
        let pos = self.topol.position(n);
        self.topol.elements().find(|e| {
            let elem = self.topol.element(*e);
            if elem.contains(n) {
                return false;
            }
            let (origin, pts) = self.local_points_2d(*e);
            let p = self.vector(origin, pos).truncate();
            let pts: Vec<DVec2> = pts.into_iter().map(|q| q - p).collect();
            geometry::contains_origin(&pts)
        })
    }

    /// Look for nodes that have moved into elements they don't belong to.
    ///
    /// Boundary nodes are always checked, and are resolved with a T3 swap.
    /// Interior nodes are only checked if `check_internal_intersections` is
    /// set, and finding one inside another element is an error. Returns true
    /// if the mesh changed.
    pub(crate) fn intersection_scan(&mut self) -> Result<bool, Error> {
        let check_all = self.config.check_internal_intersections;
        let candidates: Vec<NH> = self
            .topol
            .nodes()
            .filter(|n| check_all || self.topol.is_boundary_node(*n))
            .collect();
        let mut changed = false;
        for n in candidates {
            // Earlier swaps may have deleted the node, or moved it off the
            // boundary.
            if !self.topol.is_live_node(n) || !(check_all || self.topol.is_boundary_node(n)) {
                continue;
            }
            let Some(e) = self.enclosing_element(n) else {
                continue;
            };
            if !self.topol.is_boundary_node(n) {
                return Err(Error::InternalIntersection(n, e));
            }
            debug!("Boundary node {n} is inside {e}");
            self.perform_t3_swap(n, e)?;
            changed = true;
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod test {
    use glam::dvec3;

    use crate::{
        config::RemeshConfig,
        element::{EH, NH},
        error::Error,
        mesh::{VertexMesh2d, test::two_squares},
    };

    /// Two rows of three unit squares, with nodes numbered row by row.
    fn grid() -> VertexMesh2d {
        let mut points = Vec::new();
        for j in 0..3 {
            for i in 0..4 {
                points.push(dvec3(i as f64, j as f64, 0.0));
            }
        }
        let mut polygons = Vec::new();
        for j in 0..2u32 {
            for i in 0..3u32 {
                let a = 4 * j + i;
                polygons.push([a, a + 1, a + 5, a + 4]);
            }
        }
        VertexMesh2d::with_config(
            &points,
            polygons,
            RemeshConfig::default().with_internal_intersection_check(true),
        )
        .expect("Cannot create mesh")
    }

    #[test]
    fn t_enclosing_element() {
        let mut mesh = two_squares();
        assert_eq!(mesh.enclosing_element(NH::from(4u32)), None);
        mesh.set_node_location(4.into(), dvec3(1.5, 0.5, 0.0)).unwrap();
        // Node 4 belongs to element 1, so it can only be found in element 0.
        assert_eq!(mesh.enclosing_element(NH::from(4u32)), None);
        mesh.set_node_location(4.into(), dvec3(0.5, 0.5, 0.0)).unwrap();
        assert_eq!(mesh.enclosing_element(NH::from(4u32)), None);
        mesh.set_node_location(4.into(), dvec3(1.0, 1.0, 0.0)).unwrap();
        mesh.set_node_location(2.into(), dvec3(0.5, 0.5, 0.0)).unwrap();
        assert_eq!(mesh.enclosing_element(NH::from(2u32)), Some(EH::from(0u32)));
    }

    #[test]
    fn t_internal_intersection() {
        let mut mesh = grid();
        // Node 5 is interior, and is moved inside element 2, which it is not
        // part of.
        assert_eq!(mesh.is_boundary_node(5.into()), Ok(false));
        mesh.set_node_location(5.into(), dvec3(2.5, 0.5, 0.0)).unwrap();
        assert_eq!(
            mesh.remesh(),
            Err(Error::InternalIntersection(5.into(), 2.into()))
        );
    }

    #[test]
    fn t_swap_moves_later_node_off_boundary() {
        // Node 2 is at the tip of a notch between elements 0 and 1, and lies
        // inside the thin element 2. Node 1 crosses into element 0, closing the
        // notch, which puts node 2 inside the tissue.
        let mut mesh = VertexMesh2d::new(
            &[
                dvec3(-1.0, -0.2, 0.0),
                dvec3(-0.5, -0.05, 0.0),
                dvec3(0.0, 0.0, 0.0),
                dvec3(0.5, 1.0, 0.0),
                dvec3(-1.0, 1.0, 0.0),
                dvec3(1.0, 1.0, 0.0),
                dvec3(-0.05, -1.0, 0.0),
                dvec3(0.05, -1.0, 0.0),
                dvec3(0.05, 2.0, 0.0),
                dvec3(-0.05, 2.0, 0.0),
            ],
            [
                vec![0u32, 2, 3, 4],
                vec![3, 2, 1, 5],
                vec![6, 7, 8, 9],
            ],
        )
        .expect("Cannot create mesh");
        assert!(!mesh.config().check_internal_intersections);
        assert_eq!(mesh.is_boundary_node(2.into()), Ok(true));
        assert_eq!(mesh.enclosing_element(NH::from(1u32)), Some(EH::from(0u32)));
        assert_eq!(mesh.enclosing_element(NH::from(2u32)), Some(EH::from(2u32)));
        assert_eq!(mesh.intersection_scan(), Ok(true));
        assert_eq!(mesh.swap_locations().t3.len(), 1);
        assert_eq!(
            mesh.element_nodes(0.into()).unwrap(),
            [0u32, 1, 2, 3, 4].map(NH::from)
        );
        assert_eq!(mesh.is_boundary_node(2.into()), Ok(false));
        assert_eq!(mesh.check_topology(), Ok(()));
    }

    #[test]
    fn t_internal_intersection_unchecked() {
        let mut mesh = grid();
        mesh.set_check_internal_intersections(false);
        mesh.set_node_location(5.into(), dvec3(2.5, 0.5, 0.0)).unwrap();
        assert_eq!(mesh.intersection_scan(), Ok(false));
    }
}
