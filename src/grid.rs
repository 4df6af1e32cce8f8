//! Square sampling grid around a resolved center.
//!
//! The provider caps a single query at 60 results, so larger caps are spread
//! over an n x n grid of overlapping circular cells. The step is a tunable
//! empirical constant; the grid does not guarantee full coverage of large or
//! irregularly shaped areas.

use crate::config::{EngineConfig, SearchMode, PROVIDER_PER_QUERY_MAX};
use crate::model::{Coordinate, GridCell};

/// Side length `n` of the grid: `ceil(max(1, sqrt(result_cap / per_cell_max)))`.
pub fn grid_size(result_cap: usize, per_cell_max: usize) -> usize {
    let per_cell_max = per_cell_max.max(1) as f64;
    let ratio = result_cap as f64 / per_cell_max;
    ratio.sqrt().max(1.0).ceil() as usize
}

#[derive(Debug, Clone)]
pub struct GridPlanner {
    mode: SearchMode,
    step_degrees: f64,
    radius_meters: u32,
}

impl GridPlanner {
    pub fn new(mode: SearchMode, step_degrees: f64, radius_meters: u32) -> Self {
        Self {
            mode,
            step_degrees,
            radius_meters,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.search_mode,
            config.grid_step_degrees,
            config.search_radius_meters,
        )
    }

    /// Cells in row-major order (latitude rows outer, longitude columns inner).
    ///
    /// Row-major order decides which cell keeps an entity found twice.
    pub fn plan(&self, center: Coordinate, result_cap: usize) -> Vec<GridCell> {
        if self.mode == SearchMode::SingleQuery {
            return vec![GridCell {
                center,
                radius_meters: self.radius_meters,
            }];
        }

        let n = grid_size(result_cap, PROVIDER_PER_QUERY_MAX);
        let span = self.step_degrees * n as f64;
        let start_lat = center.latitude - span / 2.0;
        let start_lng = center.longitude - span / 2.0;

        let mut cells = Vec::with_capacity(n * n);
        for i in 0..n {
            for j in 0..n {
                cells.push(GridCell {
                    center: Coordinate::new(
                        start_lat + i as f64 * self.step_degrees,
                        start_lng + j as f64 * self.step_degrees,
                    ),
                    radius_meters: self.radius_meters,
                });
            }
        }
        cells
    }
}
