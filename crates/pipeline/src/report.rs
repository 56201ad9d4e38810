//! Serializable run summary for export.

use serde::Serialize;

use sarwatch_algorithms::imagery::{DamageSeverity, SeverityCounts, DISPLAY_RANGE};
use sarwatch_algorithms::impact::ImpactEstimate;

use crate::analysis::{AnalysisOutcome, ScoreSummary};

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub aoi: [f64; 4],
    pub pre_window: String,
    pub post_window: String,
    pub footprint_source: &'static str,
    pub footprint_collection: &'static str,
    pub footprint_count: usize,
    pub structure_cells: usize,
    pub grid: GridReport,
    pub scores: ScoreSummary,
    pub damaged_cells: usize,
    pub severity: SeverityCounts,
    pub legend: Vec<LegendEntry>,
    pub population: PopulationReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct GridReport {
    pub rows: usize,
    pub cols: usize,
    pub transform: [f64; 6],
}

#[derive(Debug, Clone, Serialize)]
pub struct LegendEntry {
    pub label: &'static str,
    pub min_score: f64,
    pub color: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct PopulationReport {
    pub collection: &'static str,
    pub country: Option<&'static str>,
    pub nominal_scale_m: u32,
    pub vintage: u16,
    #[serde(flatten)]
    pub estimate: ImpactEstimate,
}

/// Severity legend with the dashboard colours, lowest bucket first
pub fn legend() -> Vec<LegendEntry> {
    DamageSeverity::ALL
        .iter()
        .map(|s| LegendEntry {
            label: s.label(),
            min_score: s.min_score(),
            color: s.color(),
        })
        .collect()
}

/// Score range the damage palette spans
pub fn display_range() -> (f64, f64) {
    DISPLAY_RANGE
}

impl From<&AnalysisOutcome> for AnalysisReport {
    fn from(outcome: &AnalysisOutcome) -> Self {
        let request = &outcome.request;
        let source = outcome.population_source;
        Self {
            aoi: request.aoi.to_array(),
            pre_window: request.pre.to_string(),
            post_window: request.post.to_string(),
            footprint_source: request.footprints.label(),
            footprint_collection: request.footprints.collection_id(),
            footprint_count: outcome.footprint_count,
            structure_cells: outcome.structure_cells,
            grid: GridReport {
                rows: outcome.grid.rows,
                cols: outcome.grid.cols,
                transform: outcome.grid.transform.to_gdal(),
            },
            scores: outcome.scores,
            damaged_cells: outcome.damaged_cells,
            severity: outcome.severity,
            legend: legend(),
            population: PopulationReport {
                collection: source.collection_id(),
                country: source.country(),
                nominal_scale_m: source.nominal_scale_m(),
                vintage: outcome.population_vintage,
                estimate: outcome.impact,
            },
        }
    }
}
