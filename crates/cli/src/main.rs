//! SarWatch CLI - SAR change detection for structural damage

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use sarwatch_algorithms::imagery::{welch_t, DamageSeverity, DAMAGE_THRESHOLD, DISPLAY_RANGE};
use sarwatch_algorithms::impact::PopulationPolicy;
use sarwatch_algorithms::statistics::OnBudgetExceeded;
use sarwatch_cloud::{
    CachedRadarProvider, RadarProvider, ServiceAccount, ServiceAccountAuth, ServiceClient,
    ServiceClientOptions, ServiceProvider, SERVICE_URL_ENV,
};
use sarwatch_core::{FootprintSource, Polarization, SampleStats};
use sarwatch_pipeline::{
    default_post_window, run_analysis_with_progress, AnalysisConfig, AnalysisError,
    AnalysisOutcome, AnalysisReport, AnalysisRequest, Providers, DEFAULT_AOI, DEFAULT_PRE_WINDOW,
};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "sarwatch")]
#[command(author, version, about = "Structural damage mapping from Sentinel-1 radar", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Map likely structural damage in an area and estimate affected population
    Analyze {
        /// Area of interest: "minLon, minLat, maxLon, maxLat"
        #[arg(long, default_value = DEFAULT_AOI, allow_hyphen_values = true)]
        aoi: String,
        /// Building footprint set: google, osm, gba, microsoft
        #[arg(short, long, default_value = "google")]
        footprints: String,
        /// Pre-event window, START..END
        #[arg(long, default_value = DEFAULT_PRE_WINDOW)]
        pre: String,
        /// Assessment window, START..END [default: 2024-06-01..today]
        #[arg(long)]
        post: Option<String>,
        /// Processing service base URL
        #[arg(long, env = SERVICE_URL_ENV)]
        service_url: Option<String>,
        /// Service-account JSON file [default: $SARWATCH_CREDENTIALS]
        #[arg(long)]
        credentials: Option<PathBuf>,
        /// Analysis configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Damage score threshold
        #[arg(long)]
        threshold: Option<f64>,
        /// Analysis cell size in degrees
        #[arg(long)]
        cell_size: Option<f64>,
        /// Radar band: VV or VH
        #[arg(long)]
        polarization: Option<String>,
        /// Population source policy: geofenced, fixed-global
        #[arg(long)]
        population_policy: Option<String>,
        /// Maximum population cells to reduce
        #[arg(long)]
        max_cells: Option<u64>,
        /// Reduce only the first max-cells cells instead of failing
        #[arg(long)]
        approximate: bool,
        /// Write a JSON report
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Welch score of one location from its pre/post statistics
    Score {
        #[arg(long, allow_hyphen_values = true)]
        pre_mean: f64,
        #[arg(long)]
        pre_std: f64,
        #[arg(long)]
        pre_count: u32,
        #[arg(long, allow_hyphen_values = true)]
        post_mean: f64,
        #[arg(long)]
        post_std: f64,
        #[arg(long)]
        post_count: u32,
    },
    /// List building footprint sets
    Sources,
    /// Print the default analysis configuration as TOML
    Config,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

struct Overrides {
    threshold: Option<f64>,
    cell_size: Option<f64>,
    polarization: Option<String>,
    population_policy: Option<String>,
    max_cells: Option<u64>,
    approximate: bool,
}

fn load_config(path: Option<&PathBuf>, overrides: Overrides) -> Result<AnalysisConfig> {
    let mut config = match path {
        Some(p) => AnalysisConfig::from_toml_file(p)?,
        None => AnalysisConfig::default(),
    };

    if let Some(t) = overrides.threshold {
        config.threshold = t;
    }
    if let Some(c) = overrides.cell_size {
        config.cell_size_deg = c;
    }
    if let Some(p) = overrides.polarization {
        config.polarization = p.parse::<Polarization>()?;
    }
    if let Some(p) = overrides.population_policy {
        config.population_policy = p.parse::<PopulationPolicy>()?;
    }
    if let Some(m) = overrides.max_cells {
        config.budget.max_cells = m;
    }
    if overrides.approximate {
        config.budget.on_exceed = OnBudgetExceeded::Approximate;
    }

    config.validate()?;
    Ok(config)
}

fn connect(service_url: Option<String>, credentials: Option<&PathBuf>) -> Result<ServiceProvider> {
    let Some(url) = service_url else {
        bail!(AnalysisError::Configuration(format!(
            "no service URL; pass --service-url or set {SERVICE_URL_ENV}"
        )));
    };

    let account = match credentials {
        Some(path) => ServiceAccount::from_file(path),
        None => ServiceAccount::from_env(),
    }
    .map_err(AnalysisError::from)?;
    info!("Authenticated as {} ({})", account.client_email, account.project_id);

    let auth = ServiceAccountAuth::new(account).map_err(AnalysisError::from)?;
    let client = ServiceClient::new(url, Box::new(auth), ServiceClientOptions::default())
        .map_err(AnalysisError::from)?;
    Ok(ServiceProvider::new(client).map_err(AnalysisError::from)?)
}

fn print_outcome(outcome: &AnalysisOutcome) {
    let request = &outcome.request;
    println!("AOI: {}", request.aoi);
    println!("Pre-event window:  {}", request.pre);
    println!("Assessment window: {}", request.post);
    println!(
        "Grid: {} x {} cells ({}°)",
        outcome.grid.cols,
        outcome.grid.rows,
        outcome.grid.transform.cell_size()
    );
    println!();
    println!("Footprints ({}): {}", request.footprints, outcome.footprint_count);
    println!("  Structure cells: {}", outcome.structure_cells);
    println!("  Scored cells:    {}", outcome.scores.evaluated_cells);
    if let Some(max) = outcome.scores.max_score {
        println!("  Max score:       {:.2}", max);
    }
    println!("  Damaged cells:   {}", outcome.damaged_cells);

    println!("\nDamage confidence (display {:.1} - {:.1}):", DISPLAY_RANGE.0, DISPLAY_RANGE.1);
    for severity in DamageSeverity::ALL {
        println!(
            "  {} {:<28} {}",
            severity.color(),
            severity.label(),
            outcome.severity.get(severity)
        );
    }

    let impact = &outcome.impact;
    println!();
    println!(
        "Population: {} (vintage {})",
        outcome.population_source, outcome.population_vintage
    );
    println!(
        "Estimated people affected: {:.0}{}",
        impact.population,
        if impact.approximate { " (approximate)" } else { "" }
    );
    if impact.approximate {
        println!("  Only {} cells were reduced; raise --max-cells for an exact total", impact.processed_cells);
    }
}

fn write_report(outcome: &AnalysisOutcome, path: &PathBuf) -> Result<()> {
    let report = AnalysisReport::from(outcome);
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Report saved to: {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Analyze ──────────────────────────────────────────────────
        Commands::Analyze {
            aoi,
            footprints,
            pre,
            post,
            service_url,
            credentials,
            config,
            threshold,
            cell_size,
            polarization,
            population_policy,
            max_cells,
            approximate,
            output,
        } => {
            let post = match post {
                Some(p) => p,
                None => default_post_window(chrono::Local::now().date_naive())?.to_string(),
            };
            let request = AnalysisRequest::parse(&aoi, &footprints, &pre, &post)?;
            let config = load_config(
                config.as_ref(),
                Overrides {
                    threshold,
                    cell_size,
                    polarization,
                    population_policy,
                    max_cells,
                    approximate,
                },
            )?;

            let service = connect(service_url, credentials.as_ref())?;
            let cached;
            let radar: &dyn RadarProvider = if config.radar_cache_capacity > 0 {
                cached = CachedRadarProvider::new(&service, config.radar_cache_capacity);
                &cached
            } else {
                &service
            };
            let providers = Providers {
                footprints: &service,
                radar,
                population: &service,
            };

            let start = Instant::now();
            let pb = spinner("Starting analysis...");
            let result = run_analysis_with_progress(&request, providers, &config, |stage| {
                pb.set_message(stage.describe());
            });
            pb.finish_and_clear();

            let outcome = match result {
                Ok(outcome) => outcome,
                Err(err @ AnalysisError::EmptyResult { .. }) => {
                    println!("No footprints found in this AOI using {}.", request.footprints);
                    if let AnalysisError::EmptyResult { suggestion: Some(alt), .. } = &err {
                        println!(
                            "Tip: try switching to {}. It has broader coverage for Eastern Europe and Russia.",
                            alt
                        );
                    }
                    return Err(err.into());
                }
                Err(err) => return Err(err.into()),
            };

            print_outcome(&outcome);
            if let Some(path) = &output {
                write_report(&outcome, path)?;
            }
            println!("  Processing time: {:.2?}", start.elapsed());
        }

        // ── Score ────────────────────────────────────────────────────
        Commands::Score {
            pre_mean,
            pre_std,
            pre_count,
            post_mean,
            post_std,
            post_count,
        } => {
            let pre = SampleStats::new(pre_mean, pre_std, pre_count);
            let post = SampleStats::new(post_mean, post_std, post_count);
            match welch_t(pre, post) {
                Some(t) => {
                    println!("T = {:.4}", t);
                    match DamageSeverity::classify(t) {
                        Some(severity) => println!("{} ({})", severity.label(), severity.color()),
                        None => println!("Below damage threshold ({})", DAMAGE_THRESHOLD),
                    }
                }
                None => println!("No signal: a window has no observations or no variance"),
            }
        }

        // ── Sources ──────────────────────────────────────────────────
        Commands::Sources => {
            for source in FootprintSource::ALL {
                println!("{:<32} {}", source.label(), source.collection_id());
            }
        }

        // ── Config ───────────────────────────────────────────────────
        Commands::Config => {
            let text = toml::to_string_pretty(&AnalysisConfig::default())
                .context("Failed to serialize configuration")?;
            print!("{text}");
        }
    }

    Ok(())
}
