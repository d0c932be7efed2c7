use std::path::Path;

use bap_core::composite::{Bap, Composite, Selection};
use bap_core::image::Rect;
use console::Style;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

fn rule(s: &Styles, width: usize) -> String {
    s.title.apply_to("\u{2550}".repeat(width)).to_string()
}

pub fn print_run_summary(bap: &Bap, scene: &Path, output: &Path, site: Rect) {
    let s = Styles::new();
    let config = bap.config();

    println!();
    println!("  {}", s.title.apply_to("Best Available Pixel"));
    println!("  {}", rule(&s, 20));
    println!();

    println!("  {:<14}{}", s.label.apply_to("Scene"), s.path.apply_to(scene.display()));
    println!("  {:<14}{}", s.label.apply_to("Output"), s.path.apply_to(output.display()));
    println!("  {:<14}{}", s.label.apply_to("Region"), s.value.apply_to(site));
    println!();

    // Season
    println!("  {}", s.header.apply_to("Season"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Year"),
        s.value.apply_to(config.year)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Window"),
        s.value.apply_to(format!(
            "{} to {} (best {})",
            config.season.start, config.season.end, config.season.best_day
        ))
    );
    let (before, after) = config.range;
    if before > 0 || after > 0 {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Range"),
            s.value.apply_to(format!("-{before} / +{after}"))
        );
    }
    println!();

    // Collections
    println!("  {}", s.header.apply_to("Collections"));
    match config.sensors {
        Some(ref sensors) => {
            for sensor in sensors {
                println!("    {}", s.method.apply_to(sensor));
            }
        }
        None => println!("    {}", s.disabled.apply_to("yearly priority lists")),
    }
    println!(
        "    {:<12}{}",
        s.label.apply_to("Target"),
        s.method.apply_to(config.target)
    );
    println!();

    // Scores
    if bap.scores().is_empty() {
        println!(
            "  {:<14}{}",
            s.header.apply_to("Scores"),
            s.disabled.apply_to("none")
        );
    } else {
        println!("  {}", s.header.apply_to("Scores"));
        for (i, score) in bap.scores().iter().enumerate() {
            println!(
                "    {}. {:<18}{}",
                s.label.apply_to(i + 1),
                s.value.apply_to(score.name()),
                s.label.apply_to(score.kind())
            );
        }
    }
    println!();

    // Filters and masks
    let filters: Vec<&str> = config.filters.iter().map(|f| f.name()).collect();
    let masks: Vec<&str> = config.masks.iter().map(|m| m.name()).collect();
    for (header, names) in [("Filters", filters), ("Masks", masks)] {
        if names.is_empty() {
            println!("  {:<14}{}", s.header.apply_to(header), s.disabled.apply_to("none"));
        } else {
            println!("  {:<14}{}", s.header.apply_to(header), s.value.apply_to(names.join(", ")));
        }
    }
    println!();

    // Selection
    let selection = match config.selection {
        Selection::QualityMosaic => "quality mosaic".to_string(),
        Selection::Reduce { reducer, top_k } => format!("{reducer} of best {top_k}"),
    };
    println!("  {:<14}{}", s.header.apply_to("Selection"), s.method.apply_to(selection));
    println!();
}

pub fn print_composite_summary(composite: &Composite) {
    let s = Styles::new();
    let provenance = &composite.provenance;
    let image = &composite.image;

    println!();
    println!("  {}", s.title.apply_to("Composite"));
    println!("  {}", rule(&s, 9));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Id"),
        s.value.apply_to(&image.id)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Time start"),
        s.value.apply_to(provenance.time_start)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Bands"),
        s.value.apply_to(image.band_names().join(", "))
    );
    println!();

    println!("  {}", s.header.apply_to("Images used"));
    if provenance.image_counts.is_empty() {
        println!("    {}", s.disabled.apply_to("none (proxy only)"));
    }
    for (collection, count) in &provenance.image_counts {
        println!(
            "    {:<28}{}",
            s.label.apply_to(collection),
            s.value.apply_to(count)
        );
    }
    println!(
        "    {:<28}{}",
        s.label.apply_to("total"),
        s.value.apply_to(provenance.total_images())
    );
    println!();

    println!("  {}", s.header.apply_to("Seasons"));
    for (key, window) in provenance.season_properties() {
        println!("    {:<16}{}", s.label.apply_to(key), s.value.apply_to(window));
    }
}
