use std::collections::{HashMap, hash_map::Entry};

use glam::{DVec2, DVec3, dvec2};

use crate::{
    config::RemeshConfig,
    error::Error,
    geometry::{Cylindrical, Displacement},
    mesh::VertexMeshT,
};

/// Coordinates are rounded to this many parts per unit when deduplicating
/// the corners of adjacent hexagons.
const QUANTUM: f64 = 1e6;

/// Nodes and hexagons of a patch of `num_across` by `num_up` regular
/// hexagons, with unit distance between the centres of adjacent hexagons.
///
/// The hexagons have a vertex at the top, and alternate rows are shifted
/// right by half a hexagon. The bottom left corner of the patch is at the
/// origin. If `period` is given, the nodes are wrapped into `[0, period)` in
/// x, and nodes that coincide across the seam are shared.
fn honeycomb_cells(
    num_across: usize,
    num_up: usize,
    period: Option<f64>,
) -> (Vec<DVec3>, Vec<[u32; 6]>) {
    let radius = 1.0 / 3f64.sqrt();
    let corners: [DVec2; 6] = std::array::from_fn(|k| {
        let t = (30.0 + 60.0 * k as f64).to_radians();
        radius * dvec2(t.cos(), t.sin())
    });
    let mut index: HashMap<(i64, i64), u32> = HashMap::new();
    let mut points: Vec<DVec3> = Vec::new();
    let mut cells = Vec::with_capacity(num_across * num_up);
    for j in 0..num_up {
        for i in 0..num_across {
            let centre = dvec2(
                i as f64 + 0.5 * (j % 2) as f64 + 0.5,
                radius * (1.0 + 1.5 * j as f64),
            );
            let cell: [u32; 6] = std::array::from_fn(|k| {
                let mut p = centre + corners[k];
                let mut key = (
                    (p.x * QUANTUM).round() as i64,
                    (p.y * QUANTUM).round() as i64,
                );
                if let Some(w) = period {
                    p.x = p.x.rem_euclid(w);
                    key.0 = key.0.rem_euclid((w * QUANTUM).round() as i64);
                }
                match index.entry(key) {
                    Entry::Occupied(e) => *e.get(),
                    Entry::Vacant(e) => {
                        points.push(p.extend(0.0));
                        *e.insert((points.len() - 1) as u32)
                    }
                }
            });
            cells.push(cell);
        }
    }
    (points, cells)
}

impl<const DIM: usize, D> VertexMeshT<DIM, D>
where
    D: Displacement + Default,
{
    /// Create a honeycomb of `num_across` by `num_up` regular hexagons, each
    /// with unit distance to its neighbours.
    ///
    /// ```text
    ///      / \ / \ / \
    ///     |   |   |   |
    ///      \ / \ / \ / \
    ///       |   |   |   |
    ///      / \ / \ / \ /
    ///     |   |   |   |
    ///      \ / \ / \ /
    /// ```
    pub fn honeycomb(
        num_across: usize,
        num_up: usize,
        config: RemeshConfig,
    ) -> Result<Self, Error> {
        let (points, cells) = honeycomb_cells(num_across, num_up, None);
        Self::with_config(&points, cells, config)
    }

    /// Create a mesh with a single regular polygon with `n` nodes, at the
    /// given distance from the centre. The first node is on the positive x
    /// axis relative to the centre.
    pub fn regular_polygon(n: usize, radius: f64, centre: DVec2) -> Result<Self, Error> {
        let points: Vec<DVec3> = (0..n)
            .map(|k| {
                let t = std::f64::consts::TAU * k as f64 / n as f64;
                (centre + radius * dvec2(t.cos(), t.sin())).extend(0.0)
            })
            .collect();
        let polygon: Vec<u32> = (0..n as u32).collect();
        Self::new(&points, [polygon])
    }
}

impl VertexMeshT<2, Cylindrical> {
    /// Create a honeycomb that wraps around in x, so that the first and last
    /// hexagon of every row are neighbours. The width of the domain is
    /// `num_across`.
    pub fn cylindrical_honeycomb(
        num_across: usize,
        num_up: usize,
        config: RemeshConfig,
    ) -> Result<Self, Error> {
        let width = num_across as f64;
        let (points, cells) = honeycomb_cells(num_across, num_up, Some(width));
        Self::with_displacement(&points, cells, Cylindrical { width }, config)
    }
}
