use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use bap_core::backend::{Backend, InMemoryBackend};
use bap_core::catalog::SensorId;
use bap_core::composite::{Bap, BapConfig, Reducer, Selection};
use bap_core::consts::DEFAULT_REDUCE_SET;
use bap_core::image::Rect;
use clap::Args;
use tracing::{debug, info};

use super::SeasonArg;
use crate::progress::BarReporter;
use crate::summary::{print_composite_summary, print_run_summary};

#[derive(Args)]
pub struct RunArgs {
    /// Input scene file (JSON)
    #[arg(long)]
    pub scene: PathBuf,

    /// Composite config file (TOML, or JSON by extension)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Central season year
    #[arg(long)]
    pub year: Option<i32>,

    /// Seasons gathered before the central year
    #[arg(long)]
    pub before: Option<u32>,

    /// Seasons gathered after the central year
    #[arg(long)]
    pub after: Option<u32>,

    /// Predefined season window
    #[arg(long, value_enum)]
    pub season: Option<SeasonArg>,

    /// Reduce the best candidates per pixel instead of taking the single best
    #[arg(long)]
    pub reducer: Option<Reducer>,

    /// Number of best candidates fed to the reducer
    #[arg(long, default_value_t = DEFAULT_REDUCE_SET)]
    pub top_k: usize,

    /// Comma-separated collections, replacing the yearly priority lists
    #[arg(long, value_delimiter = ',')]
    pub sensors: Vec<SensorId>,

    /// Site as row,col,rows,cols (whole grid when omitted)
    #[arg(long)]
    pub site: Option<Rect>,

    /// Keep every score band next to the summed score
    #[arg(long)]
    pub keep_scores: bool,

    /// Print the planned queries and exit
    #[arg(long)]
    pub plan_only: bool,

    /// Output file path
    #[arg(short, long, default_value = "composite.json")]
    pub output: PathBuf,
}

pub fn run(args: &RunArgs) -> Result<()> {
    let config = build_config(args)?;
    let bap = Bap::new(config).context("Invalid composite config")?;

    let backend = InMemoryBackend::load(&args.scene)
        .with_context(|| format!("Failed to load scene {}", args.scene.display()))?;
    let site = args.site.unwrap_or_else(|| backend.grid().extent());
    debug!(images = backend.image_count(), %site, "Loaded scene");

    if args.plan_only {
        for plan in bap.plan(site, backend.grid())? {
            println!("{} {}", plan.sensor, plan.year);
            for line in plan.query.describe() {
                println!("  {line}");
            }
        }
        return Ok(());
    }

    print_run_summary(&bap, &args.scene, &args.output, site);

    let reporter = Arc::new(BarReporter::new()?);
    let composite = bap.composite(&backend, site, reporter.clone())?;
    reporter.finish();

    let json = serde_json::to_string(&composite)?;
    std::fs::write(&args.output, &json)
        .with_context(|| format!("Failed to write composite to {}", args.output.display()))?;
    info!(path = %args.output.display(), bytes = json.len(), "Wrote composite");

    print_composite_summary(&composite);
    println!("\nOutput saved to {}", args.output.display());
    Ok(())
}

fn load_config(path: &Path) -> Result<BapConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let is_json = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        BapConfig::from_json(&contents).context("Invalid composite config")
    } else {
        toml::from_str(&contents).context("Invalid composite config")
    }
}

fn build_config(args: &RunArgs) -> Result<BapConfig> {
    let mut config = match args.config {
        Some(ref path) => load_config(path)?,
        None => BapConfig::default(),
    };

    if let Some(year) = args.year {
        config.year = year;
    }
    if let Some(before) = args.before {
        config.range.0 = before;
    }
    if let Some(after) = args.after {
        config.range.1 = after;
    }
    if let Some(season) = args.season {
        config.season = season.into();
    }
    if let Some(reducer) = args.reducer {
        config.selection = Selection::Reduce {
            reducer,
            top_k: args.top_k,
        };
    }
    if !args.sensors.is_empty() {
        config.sensors = Some(args.sensors.clone());
    }
    if args.keep_scores {
        config.keep_individual_scores = true;
    }
    Ok(config)
}
