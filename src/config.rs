use crate::error::Error;

/// Thresholds and options that control remeshing.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RemeshConfig {
    /// Adjacent nodes closer than this trigger a merge or a swap.
    /// Default: 0.01
    pub rearrangement_threshold: f64,

    /// The edge created by a T1 swap has length `rearrangement_ratio *
    /// rearrangement_threshold`. Must be greater than 1, so the new edge does
    /// not immediately trigger another swap.
    /// Default: 1.5
    pub rearrangement_ratio: f64,

    /// Triangular elements with area at or below this are removed by a T2
    /// swap.
    /// Default: 0.001
    pub t2_threshold: f64,

    /// Edges longer than this are divided at their midpoint.
    /// Default: 1.5
    pub edge_division_threshold: f64,

    /// Also check nodes that are not on the boundary of the tissue for
    /// intersections with other elements. Such an intersection is an error.
    /// Default: false
    pub check_internal_intersections: bool,

    /// Maximum number of rounds of swaps, T2 swaps and intersection checks in
    /// a single remeshing pass. A round resolves any number of short edges.
    /// Default: 10000
    pub max_sweeps: usize,

    /// Seed for the random directions chosen when dividing an isotropic
    /// element along its short axis.
    /// Default: 0
    pub seed: u64,
}

impl Default for RemeshConfig {
    fn default() -> Self {
        Self {
            rearrangement_threshold: 0.01,
            rearrangement_ratio: 1.5,
            t2_threshold: 0.001,
            edge_division_threshold: 1.5,
            check_internal_intersections: false,
            max_sweeps: 10_000,
            seed: 0,
        }
    }
}

impl RemeshConfig {
    pub fn with_rearrangement_threshold(mut self, threshold: f64) -> Self {
        self.rearrangement_threshold = threshold;
        self
    }

    pub fn with_rearrangement_ratio(mut self, ratio: f64) -> Self {
        self.rearrangement_ratio = ratio;
        self
    }

    pub fn with_t2_threshold(mut self, threshold: f64) -> Self {
        self.t2_threshold = threshold;
        self
    }

    pub fn with_edge_division_threshold(mut self, threshold: f64) -> Self {
        self.edge_division_threshold = threshold;
        self
    }

    pub fn with_internal_intersection_check(mut self, flag: bool) -> Self {
        self.check_internal_intersections = flag;
        self
    }

    pub fn with_max_sweeps(mut self, sweeps: usize) -> Self {
        self.max_sweeps = sweeps;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Length of the edge created by a T1 swap.
    pub fn t1_edge_length(&self) -> f64 {
        self.rearrangement_ratio * self.rearrangement_threshold
    }

    /// Checks that the thresholds are consistent with each other.
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.rearrangement_threshold > 0.0) {
            return Err(Error::InvalidConfig(
                "rearrangement threshold must be positive",
            ));
        }
        if !(self.rearrangement_ratio > 1.0) {
            return Err(Error::InvalidConfig(
                "rearrangement ratio must be greater than 1",
            ));
        }
        if !(self.t2_threshold >= 0.0) {
            return Err(Error::InvalidConfig("T2 threshold must not be negative"));
        }
        if !(self.edge_division_threshold > 2.0 * self.rearrangement_threshold) {
            return Err(Error::InvalidConfig(
                "edge division threshold must exceed twice the rearrangement threshold",
            ));
        }
        if self.max_sweeps == 0 {
            return Err(Error::InvalidConfig("at least one round is required"));
        }
        Ok(())
    }
}
