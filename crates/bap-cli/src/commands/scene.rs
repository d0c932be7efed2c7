use std::path::PathBuf;

use anyhow::{Context, Result};
use bap_core::backend::InMemoryBackend;
use bap_core::season::Season;
use clap::Args;

use super::SeasonArg;

#[derive(Args)]
pub struct SceneArgs {
    /// Input scene file (JSON)
    pub file: PathBuf,

    /// Season used to bucket scene dates into years
    #[arg(long, value_enum, default_value = "south")]
    pub season: SeasonArg,
}

pub fn run(args: &SceneArgs) -> Result<()> {
    let backend = InMemoryBackend::load(&args.file)
        .with_context(|| format!("Failed to load scene {}", args.file.display()))?;
    let scene = backend.to_scene();
    let grid = scene.grid;
    let season: Season = args.season.into();

    println!("File:        {}", args.file.display());
    println!("Grid:        {}x{} @ {} m", grid.rows, grid.cols, grid.pixel_size);
    println!("Images:      {}", backend.image_count());
    println!();

    for (sensor, images) in &scene.collections {
        println!("{} ({})", sensor, sensor.descriptor().short_name);
        for image in images {
            let bucket = season
                .season_year(image.date)
                .map(|y| y.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {:<28} {}  season {:<5} bands {}",
                image.id,
                image.date,
                bucket,
                image.band_names().join(",")
            );
        }
    }

    Ok(())
}
