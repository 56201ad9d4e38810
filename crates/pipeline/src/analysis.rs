//! End-to-end analysis run.
//!
//! footprints → structure mask → pre/post radar summaries → Welch score →
//! damage mask → population under the mask.

use serde::Serialize;
use tracing::{debug, info, warn};

use sarwatch_algorithms::imagery::{
    classify_severity, detect_damage, severity_counts, ChangeDetectionParams, SeverityCounts,
};
use sarwatch_algorithms::impact::{estimate_impact, select_population_source, ImpactEstimate};
use sarwatch_algorithms::vector::{rasterize_footprints, RasterizeParams};
use sarwatch_cloud::{FootprintProvider, PopulationProvider, RadarProvider, RadarQuery};
use sarwatch_core::{GridSpec, PopulationSource, Raster};

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::request::AnalysisRequest;

/// Data sources for a run.
#[derive(Clone, Copy)]
pub struct Providers<'a> {
    pub footprints: &'a dyn FootprintProvider,
    pub radar: &'a dyn RadarProvider,
    pub population: &'a dyn PopulationProvider,
}

impl<'a> Providers<'a> {
    /// Use one value for all three sources
    pub fn uniform<P>(provider: &'a P) -> Self
    where
        P: FootprintProvider + RadarProvider + PopulationProvider,
    {
        Self {
            footprints: provider,
            radar: provider,
            population: provider,
        }
    }
}

/// Steps reported to a progress observer, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Footprints,
    Rasterize,
    PreRadar,
    PostRadar,
    Score,
    Population,
    Aggregate,
}

impl Stage {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Footprints => "Fetching building footprints",
            Self::Rasterize => "Rasterizing structures",
            Self::PreRadar => "Summarizing pre-event radar stack",
            Self::PostRadar => "Summarizing post-event radar stack",
            Self::Score => "Scoring change",
            Self::Population => "Fetching population raster",
            Self::Aggregate => "Estimating affected population",
        }
    }
}

/// Range of scores over evaluated structure cells
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub evaluated_cells: usize,
    pub max_score: Option<f64>,
    pub mean_score: Option<f64>,
}

/// Everything one run produces.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub request: AnalysisRequest,
    pub grid: GridSpec,
    pub footprint_count: usize,
    pub structure_cells: usize,
    pub score: Raster<f64>,
    pub damage: Raster<u8>,
    /// Severity code per damaged cell: 1 likely, 2 significant, 3 severe
    pub severity_classes: Raster<u8>,
    pub scores: ScoreSummary,
    pub damaged_cells: usize,
    pub severity: SeverityCounts,
    pub population_source: PopulationSource,
    pub population_vintage: u16,
    pub impact: ImpactEstimate,
}

/// Run one analysis.
pub fn run_analysis(
    request: &AnalysisRequest,
    providers: Providers<'_>,
    config: &AnalysisConfig,
) -> Result<AnalysisOutcome> {
    run_analysis_with_progress(request, providers, config, |_| {})
}

/// Run one analysis, calling `progress` as each stage starts.
///
/// # Errors
/// - `EmptyResult` when the footprint source has nothing in the AOI; no radar
///   or population data is requested in that case
/// - `InsufficientData` for an empty radar window or missing population data
/// - `BudgetExceeded` when the analysis grid holds more than
///   `max_grid_cells` cells, or the population reduction is too large under a
///   failing budget
/// - `Provider` / `Configuration` from the data providers
pub fn run_analysis_with_progress(
    request: &AnalysisRequest,
    providers: Providers<'_>,
    config: &AnalysisConfig,
    mut progress: impl FnMut(Stage),
) -> Result<AnalysisOutcome> {
    config.validate()?;
    let aoi = &request.aoi;
    let grid = aoi.grid_spec(config.cell_size_deg)?;
    check_grid_size(&grid, config.max_grid_cells)?;
    info!(%aoi, rows = grid.rows, cols = grid.cols, "starting analysis");

    progress(Stage::Footprints);
    let features = providers.footprints.footprints(aoi, request.footprints)?;
    let footprint_count = features.len();
    info!(source = %request.footprints, footprint_count, "footprints loaded");
    if footprint_count == 0 {
        return Err(AnalysisError::EmptyResult {
            dataset: request.footprints,
            suggestion: request.footprints.fallback(),
        });
    }

    progress(Stage::Rasterize);
    let params = RasterizeParams {
        keep_small_footprints: config.keep_small_footprints,
    };
    let (structures, raster_stats) = rasterize_footprints(&features, &grid, &params)?;
    debug!(?raster_stats, "structure mask built");
    if raster_stats.structure_cells == 0 {
        return Err(AnalysisError::EmptyResult {
            dataset: request.footprints,
            suggestion: request.footprints.fallback(),
        });
    }

    let query = RadarQuery::new(config.polarization);
    progress(Stage::PreRadar);
    let pre = providers.radar.summarize(aoi, &request.pre, &query, &grid)?;
    progress(Stage::PostRadar);
    let post = providers.radar.summarize(aoi, &request.post, &query, &grid)?;

    progress(Stage::Score);
    let detection = detect_damage(
        &pre,
        &post,
        &structures,
        &ChangeDetectionParams {
            threshold: config.threshold,
        },
    )?;
    let scores = summarize_scores(&detection.score);
    let severity_classes = classify_severity(&detection.score, &detection.damage)?;
    let severity = severity_counts(&severity_classes);
    info!(
        evaluated = detection.evaluated_cells,
        damaged = detection.damaged_cells,
        "change detection complete"
    );

    progress(Stage::Population);
    let population_source = select_population_source(aoi, config.population_policy);
    let vintage = match population_source.fixed_vintage() {
        Some(v) => Some(v),
        None => providers.population.latest_vintage(population_source, aoi)?,
    };
    let Some(population_vintage) = vintage else {
        return Err(population_unavailable(population_source, "no vintage covers the AOI"));
    };
    let Some(population) = providers
        .population
        .population(population_source, population_vintage, aoi)?
    else {
        return Err(population_unavailable(
            population_source,
            &format!("no raster for vintage {population_vintage}"),
        ));
    };

    progress(Stage::Aggregate);
    let impact = estimate_impact(&detection.damage, &population, aoi, &config.budget)?;
    if impact.approximate {
        warn!(
            processed = impact.processed_cells,
            "population total covers only part of the AOI"
        );
    }
    info!(population = impact.population, source = %population_source, "impact estimated");

    Ok(AnalysisOutcome {
        request: request.clone(),
        grid,
        footprint_count,
        structure_cells: raster_stats.structure_cells,
        damaged_cells: detection.damaged_cells,
        score: detection.score,
        damage: detection.damage,
        severity_classes,
        scores,
        severity,
        population_source,
        population_vintage,
        impact,
    })
}

fn check_grid_size(grid: &GridSpec, max_cells: u64) -> Result<()> {
    let cells = grid.rows as u64 * grid.cols as u64;
    if cells > max_cells {
        return Err(AnalysisError::BudgetExceeded { cells, max_cells });
    }
    Ok(())
}

fn population_unavailable(source: PopulationSource, detail: &str) -> AnalysisError {
    AnalysisError::InsufficientData {
        reason: format!("population data unavailable from {source}: {detail}"),
    }
}

fn summarize_scores(score: &Raster<f64>) -> ScoreSummary {
    let stats = score.statistics();
    ScoreSummary {
        evaluated_cells: stats.valid_count,
        max_score: stats.max,
        mean_score: stats.mean,
    }
}
