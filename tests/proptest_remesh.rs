//! Property based tests for remeshing and element division.

use std::collections::BTreeSet;

use glam::{DVec3, dvec2, dvec3};
use proptest::prelude::*;
use rand::{Rng, SeedableRng, rngs::SmallRng};
use vertexmesh::{EH, NH, RemeshConfig, VertexMesh2d};

fn honeycomb(across: usize, up: usize) -> VertexMesh2d {
    VertexMesh2d::honeycomb(across, up, RemeshConfig::default()).expect("Cannot create honeycomb")
}

fn total_area(mesh: &VertexMesh2d) -> f64 {
    mesh.elements()
        .map(|e| mesh.element_area(e).expect("Cannot compute area"))
        .sum()
}

/// True if every element has positive area, and no node is inside an
/// element that doesn't contain it.
fn is_valid(mesh: &VertexMesh2d) -> bool {
    for e in mesh.elements() {
        if mesh.element_area(e).unwrap() <= 0.0 {
            return false;
        }
        for n in mesh.nodes() {
            if mesh.containing_elements(n).unwrap().contains(&e) {
                continue;
            }
            let p = mesh.node_location(n).unwrap();
            if mesh.element_includes_point(p, e).unwrap() {
                return false;
            }
        }
    }
    true
}

/// Edges between two interior nodes, whose ends are contained in four
/// elements between them, none of which is a triangle.
fn interior_edges(mesh: &VertexMesh2d) -> Vec<(NH, NH)> {
    let mut out = Vec::new();
    for a in mesh.nodes() {
        if mesh.is_boundary_node(a).unwrap() {
            continue;
        }
        for b in mesh.neighbouring_nodes(a).unwrap() {
            if b <= a || mesh.is_boundary_node(b).unwrap() {
                continue;
            }
            let union: BTreeSet<EH> = mesh
                .containing_elements(a)
                .unwrap()
                .union(mesh.containing_elements(b).unwrap())
                .copied()
                .collect();
            let triangle = union.iter().any(|e| mesh.element_nodes(*e).unwrap().len() <= 3);
            if union.len() == 4 && !triangle {
                out.push((a, b));
            }
        }
    }
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn t1_swap_on_compressed_edge(choice in 0usize..1000, frac in 0.1f64..0.9) {
        let mut mesh = honeycomb(4, 4);
        let area = total_area(&mesh);
        let edges = interior_edges(&mesh);
        prop_assert!(!edges.is_empty());
        let (a, b) = edges[choice % edges.len()];
        let threshold = mesh.config().rearrangement_threshold;
        // Shrink the edge about its midpoint.
        let pa = mesh.node_location(a).unwrap();
        let pb = mesh.node_location(b).unwrap();
        let mid = 0.5 * (pa + pb);
        let half = 0.5 * frac * threshold * (pb - pa).normalize();
        mesh.set_node_location(a, mid - half).unwrap();
        mesh.set_node_location(b, mid + half).unwrap();

        let map = mesh.remesh().expect("Cannot remesh");
        prop_assert!(map.is_identity());
        prop_assert_eq!(mesh.swap_locations().t1.len(), 1);
        prop_assert!(mesh.swap_locations().t2.is_empty());
        prop_assert!(mesh.swap_locations().t3.is_empty());
        let t1 = mesh.swap_locations().t1[0];
        prop_assert!(t1.distance(mid.truncate()) < 1e-12);
        let length = mesh.distance_between_nodes(a, b).unwrap();
        prop_assert!((length - mesh.config().t1_edge_length()).abs() < 1e-12);
        prop_assert!((total_area(&mesh) - area).abs() < 1e-10);
        prop_assert_eq!(mesh.check_topology(), Ok(()));
        prop_assert_eq!(mesh.check_edge_lengths(), Ok(()));
        // The nodes of the new edge no longer share an element with each
        // other's old neighbours across the edge.
        prop_assert_eq!(mesh.containing_elements(a).unwrap().len(), 3);
        prop_assert_eq!(mesh.containing_elements(b).unwrap().len(), 3);
        // Remeshing again changes nothing.
        prop_assert!(mesh.remesh().expect("Cannot remesh").is_identity());
        prop_assert_eq!(mesh.swap_locations().t1.len(), 1);
    }

    #[test]
    fn jittered_honeycomb_is_stable(
        offsets in prop::collection::vec((-0.05f64..0.05, -0.05f64..0.05), 30)
    ) {
        let mut mesh = honeycomb(3, 3);
        let moved: Vec<DVec3> = mesh
            .nodes()
            .zip(&offsets)
            .map(|(n, (dx, dy))| mesh.node_location(n).unwrap() + dvec3(*dx, *dy, 0.0))
            .collect();
        mesh.set_node_locations(&moved).expect("Cannot move nodes");
        let map = mesh.remesh().expect("Cannot remesh");
        prop_assert!(map.is_identity());
        prop_assert!(mesh.swap_locations().is_empty());
        prop_assert_eq!(mesh.num_nodes(), 30);
        prop_assert_eq!(mesh.check_topology(), Ok(()));
    }

    #[test]
    fn repeated_motion_keeps_mesh_valid(seed in any::<u64>()) {
        let mut mesh = honeycomb(4, 4);
        let mut rng = SmallRng::seed_from_u64(seed);
        let threshold = mesh.config().rearrangement_threshold;
        for _ in 0..8 {
            // Jitter the interior nodes, and squeeze one edge below the
            // threshold. Steps that tangle the mesh are skipped.
            let mut next = mesh.clone();
            let moved: Vec<DVec3> = next
                .nodes()
                .map(|n| {
                    let p = next.node_location(n).unwrap();
                    if next.is_boundary_node(n).unwrap() {
                        p
                    } else {
                        p + dvec3(
                            rng.gen_range(-0.003..0.003),
                            rng.gen_range(-0.003..0.003),
                            0.0,
                        )
                    }
                })
                .collect();
            next.set_node_locations(&moved).expect("Cannot move nodes");
            let edges = interior_edges(&next);
            if !edges.is_empty() {
                let (a, b) = edges[rng.gen_range(0..edges.len())];
                let frac: f64 = rng.gen_range(0.1..0.9);
                let pa = next.node_location(a).unwrap();
                let pb = next.node_location(b).unwrap();
                let mid = 0.5 * (pa + pb);
                let half = 0.5 * frac * threshold * (pb - pa).normalize();
                next.set_node_location(a, mid - half).unwrap();
                next.set_node_location(b, mid + half).unwrap();
            }
            if is_valid(&next) {
                mesh = next;
            }
            let result = mesh.remesh();
            prop_assert!(result.is_ok(), "{:?}", result);
            prop_assert_eq!(mesh.check_topology(), Ok(()));
            prop_assert_eq!(mesh.check_edge_lengths(), Ok(()));
            let swaps = mesh.swap_locations().clone();
            prop_assert!(mesh.remesh().expect("Cannot remesh").is_identity());
            prop_assert_eq!(mesh.swap_locations(), &swaps);
        }
        prop_assert!(!mesh.swap_locations().t1.is_empty());
    }

    #[test]
    fn division_conserves_area(index in 0u32..9, angle in 0.0f64..std::f64::consts::PI) {
        let mut mesh = honeycomb(3, 3);
        let e = EH::from(index);
        let area = mesh.element_area(e).unwrap();
        let total = total_area(&mesh);
        let new = mesh
            .divide_element_along_axis(e, dvec2(angle.cos(), angle.sin()), false)
            .expect("Cannot divide element");
        prop_assert_eq!(mesh.num_elements(), 10);
        prop_assert_eq!(mesh.num_nodes(), 32);
        let parts = mesh.element_area(e).unwrap() + mesh.element_area(new).unwrap();
        prop_assert!((parts - area).abs() < 1e-12);
        prop_assert!(mesh.element_area(e).unwrap() > 0.0);
        prop_assert!(mesh.element_area(new).unwrap() > 0.0);
        prop_assert!((total_area(&mesh) - total).abs() < 1e-10);
        prop_assert_eq!(mesh.check_topology(), Ok(()));
    }
}
