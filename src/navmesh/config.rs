// src/navmesh/config.rs
use crate::math::error::{NavResult, NavmeshError};
use bevy::log::warn;
use serde::{Deserialize, Serialize};

/// Stellschrauben des Navmesh. Alle Längen in Sektor-Einheiten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavmeshConfig {
    /// Zusätzliche Breite der Landbrücken an Übergangssegmenten
    pub crossover_dilation_slack: f64,
    /// Abstand der Sichtlinien-Barrieren von der Landkontur
    pub barrier_dilation: f64,
    /// Verlängerung jedes Barrierensegments an beiden Enden
    pub barrier_expansion: f64,
    pub offset_arc_segments: usize,
    pub hole_arc_segments: usize,
    /// Mindestabstand der äußeren Übergangspunkte vom Intervallende; mindestens der Agentenradius
    pub crossover_point_margin: f64,
    pub crossover_dedup_distance: f64,
    /// Erlaubter Abstand eines Weltpunkts von der Sektorebene
    pub sector_plane_tolerance: f64,
    pub hole_projection_tolerance: f64,
    pub triangle_aabb_padding: i32,
    pub quadtree_max_items: usize,
    pub quadtree_max_depth: usize,
    pub bvh_leaf_size: usize,
    /// Noch nicht ausgewertete Sichten durch die des Vorgänger-Jobs ersetzen
    pub use_preview_views: bool,
}

impl Default for NavmeshConfig {
    fn default() -> Self {
        Self {
            crossover_dilation_slack: 5.0,
            barrier_dilation: 2.0,
            barrier_expansion: 1.0,
            offset_arc_segments: 16,
            hole_arc_segments: 24,
            crossover_point_margin: 2.0,
            crossover_dedup_distance: 0.5,
            sector_plane_tolerance: 1.0,
            hole_projection_tolerance: 1.0,
            triangle_aabb_padding: 1,
            quadtree_max_items: 8,
            quadtree_max_depth: 8,
            bvh_leaf_size: 4,
            use_preview_views: false,
        }
    }
}

impl NavmeshConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_crossover_dilation_slack(mut self, slack: f64) -> Self {
        self.crossover_dilation_slack = slack;
        self
    }

    pub fn with_barrier(mut self, dilation: f64, expansion: f64) -> Self {
        self.barrier_dilation = dilation;
        self.barrier_expansion = expansion;
        self
    }

    pub fn with_offset_arc_segments(mut self, segments: usize) -> Self {
        self.offset_arc_segments = segments;
        self
    }

    pub fn with_preview_views(mut self, enabled: bool) -> Self {
        self.use_preview_views = enabled;
        self
    }

    pub fn with_sector_plane_tolerance(mut self, tolerance: f64) -> Self {
        self.sector_plane_tolerance = tolerance;
        self
    }

    pub fn validate(&self) -> NavResult<()> {
        let non_negative = [
            ("crossover_dilation_slack", self.crossover_dilation_slack),
            ("barrier_dilation", self.barrier_dilation),
            ("barrier_expansion", self.barrier_expansion),
            ("crossover_point_margin", self.crossover_point_margin),
            ("crossover_dedup_distance", self.crossover_dedup_distance),
            ("sector_plane_tolerance", self.sector_plane_tolerance),
            ("hole_projection_tolerance", self.hole_projection_tolerance),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(NavmeshError::InvalidConfiguration {
                    message: format!("{name} must be finite and non-negative, got {value}"),
                });
            }
        }

        if self.barrier_expansion >= self.barrier_dilation {
            return Err(NavmeshError::InvalidConfiguration {
                message: "barrier_expansion must be smaller than barrier_dilation".to_string(),
            });
        }

        if self.offset_arc_segments < 4 || self.hole_arc_segments < 4 {
            return Err(NavmeshError::InvalidConfiguration {
                message: "Arc approximations need at least 4 segments".to_string(),
            });
        }

        if self.quadtree_max_items == 0 || self.bvh_leaf_size == 0 {
            return Err(NavmeshError::InvalidConfiguration {
                message: "Quad tree and BVH leaves must hold at least one item".to_string(),
            });
        }

        if self.triangle_aabb_padding < 0 {
            return Err(NavmeshError::InvalidConfiguration {
                message: "triangle_aabb_padding must be non-negative".to_string(),
            });
        }

        if self.crossover_dilation_slack < self.barrier_dilation {
            warn!(
                "crossover_dilation_slack ({}) is below barrier_dilation ({}); crossover points may be occluded",
                self.crossover_dilation_slack, self.barrier_dilation
            );
        }
        if self.offset_arc_segments > 64 {
            warn!(
                "offset_arc_segments = {} makes every offset expensive",
                self.offset_arc_segments
            );
        }

        Ok(())
    }
}
