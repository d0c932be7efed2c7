use anyhow::{bail, Context, Result};
use bap_core::season::{Season, SeasonDate};
use chrono::{Datelike, Duration};
use clap::Args;

use super::SeasonArg;

#[derive(Args)]
pub struct SeasonArgs {
    /// Season start (MM-DD); a preset is used when omitted
    #[arg(requires = "end")]
    pub start: Option<SeasonDate>,

    /// Season end (MM-DD)
    pub end: Option<SeasonDate>,

    /// Best day (MM-DD), the middle of the window when omitted
    #[arg(long)]
    pub best: Option<SeasonDate>,

    /// Preset used without explicit dates
    #[arg(long, value_enum, default_value = "south")]
    pub preset: SeasonArg,

    /// Years as a single year or an inclusive range `first..last`
    #[arg(long)]
    pub years: String,
}

pub fn run(args: &SeasonArgs) -> Result<()> {
    let (first, last) = parse_years(&args.years)?;
    let season = match (args.start, args.end) {
        (Some(start), Some(end)) => {
            let best = match args.best {
                Some(best) => best,
                None => midpoint(start, end, last)?,
            };
            Season::new(start, end, best).context("Invalid season")?
        }
        _ => args.preset.into(),
    };

    println!(
        "Season {} to {} (best day {}), {} days",
        season.start,
        season.end,
        season.best_day,
        season.range_in_days()
    );
    for year in first..=last {
        let window = season.add_year(year)?;
        let best = season.best_date(year)?;
        println!("  {year}  {window}  best {best}");
    }
    Ok(())
}

fn parse_years(text: &str) -> Result<(i32, i32)> {
    let (first, last) = match text.split_once("..") {
        Some((a, b)) => (a.trim().parse::<i32>()?, b.trim().parse::<i32>()?),
        None => {
            let year = text.trim().parse::<i32>()?;
            (year, year)
        }
    };
    if first > last {
        bail!("Year range {text} is empty");
    }
    Ok((first, last))
}

/// Middle day of the window in `year`'s calendar.
fn midpoint(start: SeasonDate, end: SeasonDate, year: i32) -> Result<SeasonDate> {
    let provisional = Season::new(start, end, start)?;
    let window = provisional.add_year(year)?;
    let mid = window.start + Duration::days((window.end - window.start).num_days() / 2);
    Ok(SeasonDate::new(mid.month(), mid.day())?)
}
