//! End-to-end analysis runs over in-memory providers.

use std::sync::atomic::{AtomicUsize, Ordering};

use approx::assert_relative_eq;
use geo_types::{point, polygon, Geometry};

use sarwatch_algorithms::impact::PopulationPolicy;
use sarwatch_algorithms::statistics::{OnBudgetExceeded, ReductionBudget};
use sarwatch_cloud::{
    CachedRadarProvider, CloudError, FootprintProvider, PopulationProvider, RadarProvider, RadarQuery,
};
use sarwatch_core::vector::{Feature, FeatureCollection};
use sarwatch_core::{
    AreaOfInterest, FootprintSource, GeoTransform, GridSpec, PopulationSource, Raster, SampleStats,
    StackSummary, TimeWindow,
};
use sarwatch_pipeline::{
    run_analysis, run_analysis_with_progress, AnalysisConfig, AnalysisError, AnalysisReport,
    AnalysisRequest, Providers, Stage, DEFAULT_AOI, DEFAULT_PRE_WINDOW,
};

const POST_WINDOW: &str = "2024-06-01..2024-12-31";

/// In-memory stand-in for the processing service
struct Fixture {
    features: FeatureCollection,
    pre_window: TimeWindow,
    pre: SampleStats,
    post: SampleStats,
    vintage: Option<u16>,
    population: Option<Raster<f64>>,
    radar_calls: AtomicUsize,
    vintage_calls: AtomicUsize,
    population_calls: AtomicUsize,
}

impl Fixture {
    /// One building block over lon 37.50..37.54, lat 47.08..47.12 with the
    /// reference pre/post statistics and 250 people per population cell
    fn new() -> Self {
        Self {
            features: FeatureCollection::from_iter([building()]),
            pre_window: DEFAULT_PRE_WINDOW.parse().unwrap(),
            pre: SampleStats::new(-12.0, 1.0, 10),
            post: SampleStats::new(-18.0, 1.5, 8),
            vintage: Some(2020),
            population: Some(population_raster(250.0)),
            radar_calls: AtomicUsize::new(0),
            vintage_calls: AtomicUsize::new(0),
            population_calls: AtomicUsize::new(0),
        }
    }

    fn remote_calls(&self) -> usize {
        self.radar_calls.load(Ordering::SeqCst)
            + self.vintage_calls.load(Ordering::SeqCst)
            + self.population_calls.load(Ordering::SeqCst)
    }
}

impl FootprintProvider for Fixture {
    fn footprints(
        &self,
        _aoi: &AreaOfInterest,
        _source: FootprintSource,
    ) -> sarwatch_cloud::Result<FeatureCollection> {
        Ok(self.features.clone())
    }
}

impl RadarProvider for Fixture {
    fn summarize(
        &self,
        _aoi: &AreaOfInterest,
        window: &TimeWindow,
        _query: &RadarQuery,
        grid: &GridSpec,
    ) -> sarwatch_cloud::Result<StackSummary> {
        self.radar_calls.fetch_add(1, Ordering::SeqCst);
        let stats = if *window == self.pre_window { self.pre } else { self.post };
        Ok(StackSummary::uniform(grid, stats))
    }
}

impl PopulationProvider for Fixture {
    fn latest_vintage(
        &self,
        _source: PopulationSource,
        _aoi: &AreaOfInterest,
    ) -> sarwatch_cloud::Result<Option<u16>> {
        self.vintage_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vintage)
    }

    fn population(
        &self,
        _source: PopulationSource,
        _vintage: u16,
        _aoi: &AreaOfInterest,
    ) -> sarwatch_cloud::Result<Option<Raster<f64>>> {
        self.population_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.population.clone())
    }
}

fn building() -> Feature {
    Feature::new(Geometry::Polygon(polygon![
        (x: 37.50, y: 47.08),
        (x: 37.54, y: 47.08),
        (x: 37.54, y: 47.12),
        (x: 37.50, y: 47.12),
        (x: 37.50, y: 47.08),
    ]))
}

/// 5 x 10 population grid of 0.02 degree cells over the default AOI
fn population_raster(value: f64) -> Raster<f64> {
    let mut r = Raster::filled(5, 10, value);
    r.set_transform(GeoTransform::new(37.45, 47.15, 0.02, -0.02));
    r
}

fn request(source: FootprintSource) -> AnalysisRequest {
    AnalysisRequest::new(
        DEFAULT_AOI.parse().unwrap(),
        source,
        DEFAULT_PRE_WINDOW.parse().unwrap(),
        POST_WINDOW.parse().unwrap(),
    )
}

fn config() -> AnalysisConfig {
    AnalysisConfig {
        cell_size_deg: 0.01,
        ..AnalysisConfig::default()
    }
}

#[test]
fn reference_scenario_flags_damage_and_counts_people() {
    let fixture = Fixture::new();
    let outcome = run_analysis(
        &request(FootprintSource::GoogleOpenBuildings),
        Providers::uniform(&fixture),
        &config(),
    )
    .unwrap();

    assert_eq!(outcome.grid.shape(), (10, 20));
    assert_eq!(outcome.footprint_count, 1);
    assert_eq!(outcome.structure_cells, 16);
    assert_eq!(outcome.damaged_cells, 16);
    assert_eq!(outcome.severity.severe, 16);
    assert_relative_eq!(outcome.scores.max_score.unwrap(), 9.7167, epsilon = 1e-3);

    assert_eq!(outcome.population_source, PopulationSource::Regional);
    assert_eq!(outcome.population_vintage, 2020);
    // The 4 x 4 damaged block straddles 3 x 3 population cells: 16 of 4-cell
    // quarters, 16 / 4 = 4 cells' worth of people
    assert_eq!(outcome.impact.damaged_cells, 9);
    assert_relative_eq!(outcome.impact.population, 1000.0, epsilon = 1e-6);
    assert!(!outcome.impact.approximate);
}

#[test]
fn damage_stays_inside_structures() {
    let fixture = Fixture::new();
    let outcome = run_analysis(
        &request(FootprintSource::GoogleOpenBuildings),
        Providers::uniform(&fixture),
        &config(),
    )
    .unwrap();

    for row in 0..outcome.grid.rows {
        for col in 0..outcome.grid.cols {
            let score = outcome.score.get(row, col).unwrap();
            let damaged = outcome.damage.get(row, col).unwrap();
            if score.is_nan() {
                assert_eq!(damaged, 0, "unscored cell ({row}, {col}) marked damaged");
            } else {
                assert_eq!(damaged == 1, score > 3.5);
            }
        }
    }
}

#[test]
fn severity_counts_follow_configured_threshold() {
    let fixture = Fixture::new();
    let config = AnalysisConfig {
        threshold: 10.0,
        ..config()
    };
    let outcome = run_analysis(
        &request(FootprintSource::GoogleOpenBuildings),
        Providers::uniform(&fixture),
        &config,
    )
    .unwrap();

    // Scores of about 9.7 fall in the severe band but stay under the cut
    assert_eq!(outcome.damaged_cells, 0);
    assert_eq!(outcome.severity.total(), 0);
    assert_eq!(outcome.severity_classes.count_eq(0), outcome.grid.rows * outcome.grid.cols);
}

#[test]
fn empty_footprints_stop_before_radar() {
    let fixture = Fixture {
        features: FeatureCollection::new(),
        ..Fixture::new()
    };

    let err = run_analysis(
        &request(FootprintSource::GoogleOpenBuildings),
        Providers::uniform(&fixture),
        &config(),
    )
    .unwrap_err();

    match err {
        AnalysisError::EmptyResult { dataset, suggestion } => {
            assert_eq!(dataset, FootprintSource::GoogleOpenBuildings);
            assert_eq!(suggestion, Some(FootprintSource::OpenStreetMap));
        }
        other => panic!("expected EmptyResult, got {other:?}"),
    }
    assert_eq!(fixture.remote_calls(), 0);
}

#[test]
fn empty_osm_footprints_have_no_suggestion() {
    let fixture = Fixture {
        features: FeatureCollection::new(),
        ..Fixture::new()
    };
    let err = run_analysis(
        &request(FootprintSource::OpenStreetMap),
        Providers::uniform(&fixture),
        &config(),
    )
    .unwrap_err();
    assert!(matches!(err, AnalysisError::EmptyResult { suggestion: None, .. }));
    assert!(!err.is_fatal());
}

#[test]
fn point_only_footprints_are_empty() {
    let fixture = Fixture {
        features: FeatureCollection::from_iter([Feature::new(Geometry::Point(point!(x: 37.5, y: 47.1)))]),
        ..Fixture::new()
    };
    let err = run_analysis(
        &request(FootprintSource::MicrosoftBuildings),
        Providers::uniform(&fixture),
        &config(),
    )
    .unwrap_err();
    assert!(matches!(err, AnalysisError::EmptyResult { .. }));
    assert_eq!(fixture.remote_calls(), 0);
}

#[test]
fn empty_post_window_is_insufficient_data() {
    let fixture = Fixture {
        post: SampleStats::new(f64::NAN, f64::NAN, 0),
        ..Fixture::new()
    };
    let err = run_analysis(
        &request(FootprintSource::GoogleOpenBuildings),
        Providers::uniform(&fixture),
        &config(),
    )
    .unwrap_err();

    match err {
        AnalysisError::InsufficientData { reason } => assert!(reason.contains("post"), "{reason}"),
        other => panic!("expected InsufficientData, got {other:?}"),
    }
    // No population lookup once scoring failed
    assert_eq!(fixture.population_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn missing_vintage_is_unavailable_not_zero() {
    let fixture = Fixture {
        vintage: None,
        ..Fixture::new()
    };
    let err = run_analysis(
        &request(FootprintSource::GoogleOpenBuildings),
        Providers::uniform(&fixture),
        &config(),
    )
    .unwrap_err();
    assert!(matches!(err, AnalysisError::InsufficientData { ref reason } if reason.contains("unavailable")));
}

#[test]
fn missing_raster_is_unavailable() {
    let fixture = Fixture {
        population: None,
        ..Fixture::new()
    };
    let err = run_analysis(
        &request(FootprintSource::GoogleOpenBuildings),
        Providers::uniform(&fixture),
        &config(),
    )
    .unwrap_err();
    assert!(matches!(err, AnalysisError::InsufficientData { .. }));
}

#[test]
fn raster_without_values_is_unavailable() {
    let fixture = Fixture {
        population: Some(population_raster(f64::NAN)),
        ..Fixture::new()
    };
    let err = run_analysis(
        &request(FootprintSource::GoogleOpenBuildings),
        Providers::uniform(&fixture),
        &config(),
    )
    .unwrap_err();
    assert!(matches!(err, AnalysisError::InsufficientData { ref reason } if reason.contains("population")));
}

#[test]
fn unchanged_backscatter_means_zero_people() {
    let fixture = Fixture {
        post: SampleStats::new(-12.0, 1.0, 10),
        ..Fixture::new()
    };
    let outcome = run_analysis(
        &request(FootprintSource::GoogleOpenBuildings),
        Providers::uniform(&fixture),
        &config(),
    )
    .unwrap();
    assert_eq!(outcome.damaged_cells, 0);
    assert_relative_eq!(outcome.impact.population, 0.0);
}

#[test]
fn oversized_grid_is_refused_before_fetching() {
    let fixture = Fixture::new();
    let mut country = request(FootprintSource::GoogleOpenBuildings);
    country.aoi = AreaOfInterest::new(22.1, 44.4, 40.2, 52.4).unwrap();

    let err = run_analysis(&country, Providers::uniform(&fixture), &AnalysisConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        AnalysisError::BudgetExceeded { cells: 14_480_000_000, max_cells: 100_000_000 }
    ));
    assert_eq!(fixture.remote_calls(), 0);
}

#[test]
fn unaddressable_grid_is_an_error() {
    let fixture = Fixture::new();
    let mut world = request(FootprintSource::GoogleOpenBuildings);
    world.aoi = AreaOfInterest::new(-180.0, -90.0, 180.0, 90.0).unwrap();
    let config = AnalysisConfig {
        cell_size_deg: 1e-8,
        ..AnalysisConfig::default()
    };

    let err = run_analysis(&world, Providers::uniform(&fixture), &config).unwrap_err();
    assert!(matches!(err, AnalysisError::Configuration(_)));
    assert_eq!(fixture.remote_calls(), 0);
}

#[test]
fn failing_budget_refuses_large_reduction() {
    let fixture = Fixture::new();
    let config = AnalysisConfig {
        budget: ReductionBudget {
            max_cells: 10,
            on_exceed: OnBudgetExceeded::Fail,
        },
        ..config()
    };
    let err = run_analysis(
        &request(FootprintSource::GoogleOpenBuildings),
        Providers::uniform(&fixture),
        &config,
    )
    .unwrap_err();
    assert!(matches!(err, AnalysisError::BudgetExceeded { cells: 50, max_cells: 10 }));
}

#[test]
fn approximate_budget_labels_result() {
    let fixture = Fixture::new();
    let config = AnalysisConfig {
        budget: ReductionBudget {
            max_cells: 10,
            on_exceed: OnBudgetExceeded::Approximate,
        },
        ..config()
    };
    let outcome = run_analysis(
        &request(FootprintSource::GoogleOpenBuildings),
        Providers::uniform(&fixture),
        &config,
    )
    .unwrap();
    assert!(outcome.impact.approximate);
    assert_eq!(outcome.impact.processed_cells, 10);
}

#[test]
fn fixed_global_policy_skips_vintage_lookup() {
    let fixture = Fixture::new();
    let config = AnalysisConfig {
        population_policy: PopulationPolicy::FixedGlobal,
        ..config()
    };
    let outcome = run_analysis(
        &request(FootprintSource::GoogleOpenBuildings),
        Providers::uniform(&fixture),
        &config,
    )
    .unwrap();
    assert_eq!(outcome.population_source, PopulationSource::GlobalFine);
    assert_eq!(outcome.population_vintage, 2020);
    assert_eq!(fixture.vintage_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn invalid_config_is_fatal_before_any_call() {
    let fixture = Fixture::new();
    let config = AnalysisConfig {
        threshold: f64::NAN,
        ..config()
    };
    let err = run_analysis(
        &request(FootprintSource::GoogleOpenBuildings),
        Providers::uniform(&fixture),
        &config,
    )
    .unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(fixture.remote_calls(), 0);
}

#[test]
fn provider_failure_maps_to_provider_error() {
    struct Down;

    impl FootprintProvider for Down {
        fn footprints(
            &self,
            _aoi: &AreaOfInterest,
            _source: FootprintSource,
        ) -> sarwatch_cloud::Result<FeatureCollection> {
            Err(CloudError::Network("connection reset".into()))
        }
    }

    let fixture = Fixture::new();
    let providers = Providers {
        footprints: &Down,
        radar: &fixture,
        population: &fixture,
    };
    let err = run_analysis(&request(FootprintSource::GoogleOpenBuildings), providers, &config()).unwrap_err();
    assert!(matches!(err, AnalysisError::Provider(_)));
    assert!(!err.is_fatal());
}

#[test]
fn cached_radar_is_reused_across_runs() {
    let fixture = Fixture::new();
    let radar = CachedRadarProvider::new(&fixture, 8);
    let providers = Providers {
        footprints: &fixture,
        radar: &radar,
        population: &fixture,
    };

    let first = run_analysis(&request(FootprintSource::GoogleOpenBuildings), providers, &config()).unwrap();
    let second = run_analysis(&request(FootprintSource::GoogleOpenBuildings), providers, &config()).unwrap();

    assert_eq!(fixture.radar_calls.load(Ordering::SeqCst), 2);
    assert_relative_eq!(first.impact.population, second.impact.population);
}

#[test]
fn progress_reports_stages_in_order() {
    let fixture = Fixture::new();
    let mut stages = Vec::new();
    run_analysis_with_progress(
        &request(FootprintSource::GoogleOpenBuildings),
        Providers::uniform(&fixture),
        &config(),
        |stage| stages.push(stage),
    )
    .unwrap();

    assert_eq!(
        stages,
        [
            Stage::Footprints,
            Stage::Rasterize,
            Stage::PreRadar,
            Stage::PostRadar,
            Stage::Score,
            Stage::Population,
            Stage::Aggregate,
        ]
    );
}

#[test]
fn report_serializes_outcome() {
    let fixture = Fixture::new();
    let outcome = run_analysis(
        &request(FootprintSource::GoogleOpenBuildings),
        Providers::uniform(&fixture),
        &config(),
    )
    .unwrap();

    let json = serde_json::to_value(AnalysisReport::from(&outcome)).unwrap();
    assert_eq!(json["footprint_count"], 1);
    assert_eq!(json["population"]["country"], "UKR");
    assert_eq!(json["population"]["vintage"], 2020);
    assert_eq!(json["legend"][2]["color"], "#e31a1c");
    assert_eq!(json["post_window"], POST_WINDOW);
}
